use crate::{
    AudioCapture, AudioFormat, CoreError,
    tests::support::FakeRecorder,
};

use std::{sync::Arc, time::Duration};

const MAX_DURATION: Duration = Duration::from_millis(15_000);

/// WHAT: A second start is refused while a recording is live
/// WHY: The microphone is a single exclusive resource
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_live_recording_when_starting_again_then_capture_busy() {
    // Given: A capture with one live handle
    let recorder = FakeRecorder::new();
    let capture = AudioCapture::new(recorder.clone(), MAX_DURATION);
    let _handle = capture.start().await.unwrap();

    // When: Starting a second recording
    let result = capture.start().await;

    // Then: CaptureBusy and the recorder was started only once
    assert!(matches!(result, Err(CoreError::CaptureBusy { .. })));
    assert_eq!(recorder.start_count(), 1);
}

/// WHAT: Finishing releases the microphone for the next recording
/// WHY: The exclusive slot must not leak across cycles
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_finished_recording_when_starting_again_then_succeeds() {
    // Given: A recording that has been finished
    let recorder = FakeRecorder::new();
    let capture = AudioCapture::new(recorder.clone(), MAX_DURATION);
    let handle = capture.start().await.unwrap();
    let clip = capture.finish(handle).await.unwrap();
    drop(clip);

    // When: Starting again
    let result = capture.start().await;

    // Then: The new recording starts
    assert!(result.is_ok());
    assert!(capture.is_live());
}

/// WHAT: The deadline is the max duration after start
/// WHY: Auto-finish must never let a recording exceed its bound
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_started_recording_when_reading_deadline_then_max_duration_after_start() {
    // Given/When: A started recording
    let capture = AudioCapture::new(FakeRecorder::new(), MAX_DURATION);
    let handle = capture.start().await.unwrap();

    // Then: Deadline is exactly max_duration after started_at
    assert_eq!(handle.deadline() - handle.started_at(), MAX_DURATION);
}

/// WHAT: The temp clip is deleted once the clip is dropped, not before
/// WHY: The file must survive until the identify request has read it
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_finished_clip_when_dropped_then_file_deleted_exactly_once() {
    // Given: A finished clip
    let recorder = FakeRecorder::new();
    let capture = AudioCapture::new(recorder.clone(), MAX_DURATION);
    let handle = capture.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;
    let clip = capture.finish(handle).await.unwrap();

    // Then: Clip carries the recorder's format and elapsed time, file still present
    assert_eq!(clip.format(), &AudioFormat::M4a);
    assert_eq!(clip.duration(), Duration::from_secs(4));
    assert!(!clip.bytes().is_empty());
    assert_eq!(recorder.discard_count(), 0);

    // When: The clip is dropped
    drop(clip);

    // Then: The file is deleted once
    assert_eq!(recorder.discard_count(), 1);
    assert_eq!(recorder.distinct_discards(), 1);
}

/// WHAT: Abort stops the recorder and deletes its output
/// WHY: Cancelled recordings must not leave audio on disk
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_live_recording_when_aborted_then_stopped_and_deleted() {
    // Given: A live recording
    let recorder = FakeRecorder::new();
    let capture = AudioCapture::new(recorder.clone(), MAX_DURATION);
    let handle = capture.start().await.unwrap();

    // When: Aborting
    capture.abort(handle).await;

    // Then: Recorder stopped, file deleted, slot released
    assert_eq!(recorder.stop_count(), 1);
    assert_eq!(recorder.discard_count(), 1);
    assert!(!capture.is_live());
}

/// WHAT: A recorder failing to start leaves the slot free
/// WHY: A hardware error must be retryable
#[tokio::test(start_paused = true)]
async fn given_failing_recorder_when_starting_then_error_and_slot_released() {
    // Given: A recorder that cannot start
    let capture = AudioCapture::new(FakeRecorder::failing(), MAX_DURATION);

    // When: Starting
    let result = capture.start().await;

    // Then: RecordingFailed and nothing is live
    assert!(matches!(result, Err(CoreError::RecordingFailed { .. })));
    assert!(!capture.is_live());
}

/// WHAT: Finish works after the recorder already stopped itself
/// WHY: Stop must be idempotent for auto-stopped recordings
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_recorder_already_stopped_when_finishing_then_clip_returned() {
    // Given: A recording whose recorder was stopped out of band
    let recorder = FakeRecorder::new();
    let capture = AudioCapture::new(recorder.clone(), MAX_DURATION);
    let handle = capture.start().await.unwrap();
    crate::Recorder::stop(recorder.as_ref()).await.unwrap();

    // When: Finishing
    let clip = capture.finish(handle).await;

    // Then: The same clip is produced and only one real stop was recorded
    assert!(clip.is_ok());
    assert_eq!(recorder.stop_times().len(), 1);
}

/// WHAT: Capture can be shared behind an Arc across tasks
/// WHY: The controller hands it to spawned work
#[tokio::test(start_paused = true)]
#[allow(clippy::unwrap_used)]
async fn given_shared_capture_when_started_from_task_then_live_visible() {
    // Given: Capture shared across tasks
    let capture = Arc::new(AudioCapture::new(FakeRecorder::new(), MAX_DURATION));
    let task_capture = Arc::clone(&capture);

    // When: A task starts recording and keeps the handle
    let handle = tokio::spawn(async move { task_capture.start().await.unwrap() })
        .await
        .unwrap();

    // Then: The slot is held until the handle is released
    assert!(capture.is_live());
    capture.abort(handle).await;
    assert!(!capture.is_live());
}
