use crate::{AppCommand, AppResult, config::Config, status_line::describe};

use set_sleuth_core::{
    CpalRecorder, FingerprintClient, HttpSessionRegistry, InputDeviceAccess, ListenMode,
    NoPlayback, NullRegistry, SessionController, SessionDeps, SessionHandle, SessionRegistry,
};

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinHandle,
};
use tracing::{error, info, instrument, warn};

const HELP: &str = "Commands: begin [single|continuous], stop, cancel, retry, end, status, quit";

/// Main application state.
///
/// Owns the handle to the session controller and drives it from lines read
/// on stdin. State changes are printed to stdout; logs go to stderr.
pub struct App {
    pub(crate) session: SessionHandle,
    pub(crate) controller: JoinHandle<()>,
    pub(crate) default_mode: ListenMode,
}

impl App {
    /// Wire the platform collaborators described by `config` and spawn the
    /// controller. Must be called inside a tokio runtime.
    #[instrument(skip(config))]
    pub(crate) fn new(config: &Config) -> AppResult<Self> {
        let settings = config.session_settings();
        let timeout = config.request_timeout();

        let registry: Arc<dyn SessionRegistry> = if config.registry_enabled() {
            Arc::new(HttpSessionRegistry::new(&config.service.base_url, timeout)?)
        } else {
            info!("No user_id configured, continuous sessions stay local");
            Arc::new(NullRegistry)
        };

        let deps = SessionDeps {
            access: Arc::new(InputDeviceAccess),
            recorder: Arc::new(CpalRecorder::new(settings.max_duration)?),
            identifier: Arc::new(FingerprintClient::new(&config.service.base_url, timeout)?),
            registry,
            playback: Arc::new(NoPlayback),
        };

        let (session, controller) = SessionController::spawn(deps, settings);

        Ok(Self {
            session,
            controller,
            default_mode: config.session.mode,
        })
    }

    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(self) -> AppResult<()> {
        info!("Set-Sleuth starting");
        println!("{}", HELP);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut updates = self.session.subscribe();
        println!("{}", describe(&updates.borrow_and_update()));

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => {
                            info!("Input closed, shutting down");
                            break;
                        }
                        Err(e) => {
                            error!(error = ?e, "Failed to read input");
                            break;
                        }
                    };

                    if line.trim().is_empty() {
                        continue;
                    }

                    match line.parse::<AppCommand>() {
                        Ok(AppCommand::Quit) => {
                            info!("Shutdown requested");
                            break;
                        }
                        Ok(command) => {
                            if let Err(e) = self.dispatch(command).await {
                                error!(?command, error = ?e, "Failed to dispatch command");
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Ignoring input");
                            println!("Unknown command {:?}. {}", line.trim(), HELP);
                        }
                    }
                }

                changed = updates.changed() => {
                    if changed.is_err() {
                        info!("Controller stopped, shutting down");
                        break;
                    }
                    println!("{}", describe(&updates.borrow_and_update()));
                }
            }
        }

        if let Err(e) = self.session.shutdown().await {
            warn!(error = ?e, "Controller already stopped");
        }

        match tokio::time::timeout(Duration::from_secs(1), self.controller).await {
            Ok(Ok(())) => info!("Controller stopped cleanly"),
            Ok(Err(e)) => error!(error = ?e, "Controller task panicked"),
            Err(_) => info!("Controller did not stop within timeout, will be cleaned up on exit"),
        }

        info!("Set-Sleuth shut down successfully");

        Ok(())
    }

    async fn dispatch(&self, command: AppCommand) -> AppResult<()> {
        match command {
            AppCommand::Begin(mode) => {
                self.session
                    .begin(mode.unwrap_or(self.default_mode))
                    .await?
            }
            AppCommand::Stop => self.session.stop().await?,
            AppCommand::Cancel => self.session.cancel().await?,
            AppCommand::Retry => self.session.retry().await?,
            AppCommand::End => self.session.end_session().await?,
            AppCommand::Status => println!("{}", describe(&self.session.snapshot())),
            AppCommand::Quit => {}
        }
        Ok(())
    }
}
