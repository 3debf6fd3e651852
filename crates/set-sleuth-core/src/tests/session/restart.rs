use crate::RestartScheduler;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

fn counting_resume(
    fired: &Arc<AtomicUsize>,
) -> impl FnOnce(crate::RestartToken) -> std::future::Ready<()> + Send + 'static {
    let fired = Arc::clone(fired);
    move |_| {
        fired.fetch_add(1, Ordering::SeqCst);
        std::future::ready(())
    }
}

/// WHAT: An armed restart fires once after its delay
/// WHY: Continuous mode re-enters capture after a pause
#[tokio::test(start_paused = true)]
async fn given_armed_restart_when_delay_elapses_then_fires_once() {
    // Given: A restart armed for 2s
    let fired = Arc::new(AtomicUsize::new(0));
    let mut scheduler = RestartScheduler::new();
    scheduler.arm(Duration::from_millis(2_000), counting_resume(&fired));

    // When: Just before and after the delay
    tokio::time::sleep(Duration::from_millis(1_999)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    tokio::time::sleep(Duration::from_millis(2)).await;

    // Then: Fired exactly once
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

/// WHAT: A cancelled restart never fires
/// WHY: A stale restart after teardown would start an unwanted capture
#[tokio::test(start_paused = true)]
async fn given_cancelled_restart_when_delay_elapses_then_never_fires() {
    // Given: An armed restart
    let fired = Arc::new(AtomicUsize::new(0));
    let mut scheduler = RestartScheduler::new();
    let token = scheduler.arm(Duration::from_millis(3_000), counting_resume(&fired));

    // When: Cancelled twice before the delay, then time passes
    assert!(scheduler.cancel(token));
    assert!(!scheduler.cancel(token));
    tokio::time::sleep(Duration::from_secs(10)).await;

    // Then: Never fired, nothing armed
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(!scheduler.is_armed());
    assert!(!scheduler.is_current(token));
}

/// WHAT: Re-arming supersedes the previous token
/// WHY: At most one restart may be outstanding per controller
#[tokio::test(start_paused = true)]
async fn given_armed_restart_when_rearmed_then_only_latest_fires() {
    // Given: Two arms in a row
    let first_fired = Arc::new(AtomicUsize::new(0));
    let second_fired = Arc::new(AtomicUsize::new(0));
    let mut scheduler = RestartScheduler::new();
    let first = scheduler.arm(Duration::from_millis(1_000), counting_resume(&first_fired));
    let second = scheduler.arm(Duration::from_millis(2_000), counting_resume(&second_fired));

    // When: Both delays elapse
    tokio::time::sleep(Duration::from_secs(5)).await;

    // Then: Only the second fired; cancelling the stale first token is a no-op
    assert_eq!(first_fired.load(Ordering::SeqCst), 0);
    assert_eq!(second_fired.load(Ordering::SeqCst), 1);
    assert!(!scheduler.cancel(first));
    assert!(scheduler.is_current(second));
}

/// WHAT: take_fired claims the current token once and rejects stale ones
/// WHY: The controller double-checks a restart before acting on it
#[tokio::test(start_paused = true)]
async fn given_fired_token_when_taking_then_claimed_once() {
    // Given: An armed restart
    let fired = Arc::new(AtomicUsize::new(0));
    let mut scheduler = RestartScheduler::new();
    let token = scheduler.arm(Duration::from_millis(10), counting_resume(&fired));

    // When/Then: First claim succeeds, second is stale
    assert!(scheduler.take_fired(token));
    assert!(!scheduler.take_fired(token));
    assert!(!scheduler.is_armed());
}
