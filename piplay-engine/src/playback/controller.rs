//! External player process control
//!
//! Exactly one player process may run at a time. Every state transition
//! happens while holding the controller's state lock, and a running process is
//! fully reaped before its successor is spawned, so two concurrent `start`
//! calls never overlap playback.
//!
//! Each process is owned by a supervisor task that waits for whichever comes
//! first: the process exiting on its own, or a stop request. Exits are thus
//! observed (and broadcast) as they happen instead of on the next poll.

use chrono::Utc;
use piplay_common::config::PlayerConfig;
use piplay_common::PlayerEvent;
use serde::Serialize;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::queue::PlaybackQueue;
use crate::error::{Error, Result};

/// Buffer up to this many events per subscriber
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Program and leading arguments; queue URLs are appended on each start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl PlayerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Externally visible player state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum PlayerStatus {
    Idle,
    Running {
        session: Uuid,
        queue: PlaybackQueue,
        /// Always 0: advancing through the queue is up to the player
        position: usize,
        pid: Option<u32>,
    },
    /// Last session exited abnormally; cleared by the next start or stop
    Crashed {
        session: Uuid,
        exit_code: Option<i32>,
    },
}

/// How a supervised session ended
#[derive(Debug, Clone, PartialEq)]
enum SessionExit {
    /// Terminated on request
    Stopped,
    /// Exited with status 0
    Finished,
    /// Exited with a failure status or an unexpected signal
    Crashed(Option<i32>),
    /// Termination was requested but could not be confirmed
    TerminateFailed(String),
}

struct ActiveSession {
    id: Uuid,
    queue: PlaybackQueue,
    pid: Option<u32>,
    stop_tx: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<SessionExit>,
}

enum SessionState {
    Idle,
    Running(ActiveSession),
    Crashed { session: Uuid, exit_code: Option<i32> },
}

pub struct PlayerController {
    command: PlayerCommand,
    stop_timeout: Duration,
    startup_grace: Duration,
    state: Mutex<SessionState>,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl PlayerController {
    pub fn new(command: PlayerCommand, stop_timeout: Duration, startup_grace: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            command,
            stop_timeout,
            startup_grace,
            state: Mutex::new(SessionState::Idle),
            event_tx,
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(
            PlayerCommand::new(config.program.clone(), config.args.clone()),
            Duration::from_millis(config.stop_timeout_ms),
            Duration::from_millis(config.startup_grace_ms),
        )
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    /// Replace whatever is playing with `queue`
    ///
    /// An empty queue is rejected before anything else happens. A running
    /// session is terminated and reaped first. If the new process dies with a
    /// failure inside the startup grace window, `PlayerCrashed` is returned.
    pub async fn start(&self, queue: PlaybackQueue) -> Result<Uuid> {
        if queue.is_empty() {
            return Err(Error::EmptyQueue);
        }

        let mut state = self.state.lock().await;

        if let SessionState::Running(active) = std::mem::replace(&mut *state, SessionState::Idle) {
            self.terminate(active).await?;
        }

        let child = self.spawn(&queue)?;
        let pid = child.id();
        let session = Uuid::new_v4();
        let (stop_tx, stop_rx) = oneshot::channel();

        info!(
            session = %session,
            pid = ?pid,
            queue_len = queue.len(),
            "Player started"
        );
        self.broadcast(PlayerEvent::Started {
            session,
            pid,
            queue_len: queue.len(),
            timestamp: Utc::now(),
        });

        let mut supervisor = tokio::spawn(supervise(
            child,
            session,
            stop_rx,
            self.stop_timeout,
            self.event_tx.clone(),
        ));

        if !self.startup_grace.is_zero() {
            if let Ok(joined) = tokio::time::timeout(self.startup_grace, &mut supervisor).await {
                let exit = joined.unwrap_or_else(|e| SessionExit::Crashed(join_error_code(&e)));
                return match exit {
                    SessionExit::Crashed(exit_code) => {
                        *state = SessionState::Crashed { session, exit_code };
                        Err(Error::PlayerCrashed { exit_code })
                    }
                    other => {
                        debug!(session = %session, exit = ?other, "Player exited during startup");
                        Ok(session)
                    }
                };
            }
        }

        *state = SessionState::Running(ActiveSession {
            id: session,
            queue,
            pid,
            stop_tx: Some(stop_tx),
            supervisor,
        });

        Ok(session)
    }

    /// Stop playback; returns the stopped session, `None` if nothing was playing
    ///
    /// Never fails just because the player is idle or already gone.
    pub async fn stop(&self) -> Result<Option<Uuid>> {
        let mut state = self.state.lock().await;

        match std::mem::replace(&mut *state, SessionState::Idle) {
            SessionState::Running(active) => {
                let id = active.id;
                if self.terminate(active).await? {
                    Ok(Some(id))
                } else {
                    Ok(None)
                }
            }
            SessionState::Crashed { session, .. } => {
                debug!(session = %session, "Clearing crashed session on stop");
                Ok(None)
            }
            SessionState::Idle => {
                debug!("Stop requested while idle");
                Ok(None)
            }
        }
    }

    /// Current state, reaping a session whose process has already exited
    pub async fn status(&self) -> PlayerStatus {
        let mut state = self.state.lock().await;

        let finished = matches!(&*state, SessionState::Running(active) if active.supervisor.is_finished());
        if finished {
            if let SessionState::Running(active) = std::mem::replace(&mut *state, SessionState::Idle) {
                let id = active.id;
                *state = match active.supervisor.await {
                    Ok(SessionExit::Crashed(exit_code)) => SessionState::Crashed {
                        session: id,
                        exit_code,
                    },
                    Ok(_) => SessionState::Idle,
                    Err(e) => SessionState::Crashed {
                        session: id,
                        exit_code: join_error_code(&e),
                    },
                };
            }
        }

        match &*state {
            SessionState::Idle => PlayerStatus::Idle,
            SessionState::Running(active) => PlayerStatus::Running {
                session: active.id,
                queue: active.queue.clone(),
                position: 0,
                pid: active.pid,
            },
            SessionState::Crashed { session, exit_code } => PlayerStatus::Crashed {
                session: *session,
                exit_code: *exit_code,
            },
        }
    }

    fn spawn(&self, queue: &PlaybackQueue) -> Result<Child> {
        Command::new(&self.command.program)
            .args(&self.command.args)
            .args(queue.urls())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!(program = %self.command.program, error = %e, "Failed to spawn player");
                Error::PlaybackUnavailable(format!(
                    "failed to start {}: {}",
                    self.command.program, e
                ))
            })
    }

    /// Signal the supervisor and wait until the process is gone
    ///
    /// Returns `true` if the process was still running and got stopped,
    /// `false` if it had already exited by itself.
    async fn terminate(&self, mut active: ActiveSession) -> Result<bool> {
        if let Some(stop_tx) = active.stop_tx.take() {
            // Err means the supervisor already returned
            let _ = stop_tx.send(());
        }

        let exit = match active.supervisor.await {
            Ok(exit) => exit,
            Err(e) => {
                error!(session = %active.id, error = %e, "Player supervisor failed");
                return Err(Error::PlaybackUnavailable(format!(
                    "player supervisor failed: {}",
                    e
                )));
            }
        };

        match exit {
            SessionExit::Stopped => Ok(true),
            SessionExit::TerminateFailed(msg) => Err(Error::PlaybackUnavailable(msg)),
            SessionExit::Finished | SessionExit::Crashed(_) => {
                debug!(session = %active.id, exit = ?exit, "Player had already exited");
                Ok(false)
            }
        }
    }

    fn broadcast(&self, event: PlayerEvent) {
        // No receivers is OK
        let _ = self.event_tx.send(event);
    }
}

/// Own `child` until it exits or a stop is requested
async fn supervise(
    mut child: Child,
    session: Uuid,
    mut stop_rx: oneshot::Receiver<()>,
    stop_timeout: Duration,
    event_tx: broadcast::Sender<PlayerEvent>,
) -> SessionExit {
    // An exit that already happened is reported as such, even with a stop pending
    let exit = tokio::select! {
        biased;
        status = child.wait() => classify_exit(session, status),
        // A dropped sender also means stop
        _ = &mut stop_rx => terminate_child(&mut child, session, stop_timeout).await,
    };

    let event = match &exit {
        SessionExit::Stopped => Some(PlayerEvent::Stopped {
            session,
            timestamp: Utc::now(),
        }),
        SessionExit::Finished => Some(PlayerEvent::Finished {
            session,
            timestamp: Utc::now(),
        }),
        SessionExit::Crashed(exit_code) => Some(PlayerEvent::Crashed {
            session,
            exit_code: *exit_code,
            timestamp: Utc::now(),
        }),
        SessionExit::TerminateFailed(_) => None,
    };
    if let Some(event) = event {
        let _ = event_tx.send(event);
    }

    exit
}

fn classify_exit(session: Uuid, status: std::io::Result<ExitStatus>) -> SessionExit {
    match status {
        Ok(status) if status.success() => {
            info!(session = %session, "Player finished its queue");
            SessionExit::Finished
        }
        Ok(status) => {
            warn!(session = %session, code = ?status.code(), "Player exited abnormally");
            SessionExit::Crashed(status.code())
        }
        Err(e) => {
            error!(session = %session, error = %e, "Failed to wait on player");
            SessionExit::Crashed(None)
        }
    }
}

async fn terminate_child(child: &mut Child, session: Uuid, stop_timeout: Duration) -> SessionExit {
    if let Err(e) = child.start_kill() {
        // InvalidInput: the process has already been reaped
        if e.kind() != std::io::ErrorKind::InvalidInput {
            error!(session = %session, error = %e, "Failed to kill player");
            return SessionExit::TerminateFailed(format!("failed to kill player: {}", e));
        }
    }

    match tokio::time::timeout(stop_timeout, child.wait()).await {
        Ok(Ok(status)) => {
            info!(session = %session, code = ?status.code(), "Player stopped");
            SessionExit::Stopped
        }
        Ok(Err(e)) => {
            error!(session = %session, error = %e, "Player wait error after kill");
            SessionExit::TerminateFailed(format!("failed to reap player: {}", e))
        }
        Err(_) => {
            error!(session = %session, timeout = ?stop_timeout, "Player did not exit after kill");
            SessionExit::TerminateFailed(format!(
                "player did not exit within {:?}",
                stop_timeout
            ))
        }
    }
}

/// A supervisor that panicked or was cancelled leaves no exit code
fn join_error_code(err: &tokio::task::JoinError) -> Option<i32> {
    warn!(error = %err, "Player supervisor did not complete");
    None
}
