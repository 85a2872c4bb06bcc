use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Child;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::AppResult;

use super::aggregator::{OutputBuffer, Stream};
use super::driver::{spawn_driver, PromptScript};
use super::interpreter::{interpret, RunReport};
use super::latch::{TerminalEvent, TerminalLatch};
use super::launcher::{LaunchedProcess, Launcher};
use super::types::{AuthAction, AuthRequest, AuthResult, Termination};

/// Per-request lifecycle: `Idle -> Launching -> Running -> Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Launching,
    Running,
    Terminated,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Idle, SessionState::Launching)
                | (SessionState::Launching, SessionState::Running)
                | (SessionState::Launching, SessionState::Terminated)
                | (SessionState::Running, SessionState::Terminated)
        )
    }
}

struct Session {
    action: AuthAction,
    state: SessionState,
}

impl Session {
    fn advance(&mut self, next: SessionState) {
        debug_assert!(self.state.can_transition_to(next), "{:?} -> {:?}", self.state, next);
        debug!(action = %self.action, from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }
}

/// Owns every task attached to one child process. Dropping it aborts them all;
/// the exit watcher owns the child, so aborting it kills the process.
#[derive(Default)]
struct ProcessGuard {
    watcher: Option<JoinHandle<Option<i32>>>,
    timer: Option<JoinHandle<()>>,
    driver: Option<JoinHandle<()>>,
    readers: Vec<JoinHandle<()>>,
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        for handle in [self.timer.take(), self.driver.take()].into_iter().flatten() {
            handle.abort();
        }
        if let Some(w) = self.watcher.take() {
            w.abort();
        }
        for r in self.readers.drain(..) {
            r.abort();
        }
    }
}

/// Orchestrates the external biometric program for authentication and enrollment.
#[derive(Debug, Clone)]
pub struct BiometricBridge {
    config: Arc<BridgeConfig>,
}

impl BiometricBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    pub fn config(&self) -> &BridgeConfig { &self.config }

    pub fn program_for(&self, action: AuthAction) -> PathBuf {
        match action {
            AuthAction::Authenticate => self.config.auth_program_path(),
            AuthAction::Enroll => self.config.enroll_program_path(),
        }
    }

    /// Run one request against the external program and return its single result.
    ///
    /// `Err` is reserved for requests refused before anything was launched.
    pub async fn authenticate_or_enroll(&self, request: AuthRequest) -> AppResult<AuthResult> {
        let mut session = Session { action: request.action, state: SessionState::Idle };
        let request = request.validate()?;
        session.advance(SessionState::Launching);

        let program = self.program_for(request.action);
        let launcher = Launcher::new(&self.config.interpreters, &self.config.bridge_dir);
        let launched = match launcher.launch(&program) {
            Ok(p) => p,
            Err(err) => {
                warn!(action = %request.action, error = %err, "biometric program could not be started");
                session.advance(SessionState::Terminated);
                return Ok(AuthResult::launch_failure(request.action, &err));
            }
        };
        session.advance(SessionState::Running);

        let result = self.run(&request, launched).await;
        session.advance(SessionState::Terminated);
        Ok(result)
    }

    async fn run(&self, request: &AuthRequest, launched: LaunchedProcess) -> AuthResult {
        let LaunchedProcess { mut child, candidate, pid } = launched;
        let started = Instant::now();
        let cfg = &self.config;
        let mut guard = ProcessGuard::default();

        let buffer = OutputBuffer::new();
        if let Some(out) = child.stdout.take() {
            guard.readers.push(buffer.attach(Stream::Stdout, out));
        }
        if let Some(err) = child.stderr.take() {
            guard.readers.push(buffer.attach(Stream::Stderr, err));
        }

        let (alive_tx, alive_rx) = watch::channel(true);
        if let Some(stdin) = child.stdin.take() {
            let script = PromptScript::for_request(request, cfg.menu_delay, cfg.param_delay);
            guard.driver = Some(spawn_driver(stdin, script, alive_rx));
        }

        let (latch, terminal_rx) = TerminalLatch::new();
        let (kill_tx, kill_rx) = oneshot::channel();
        guard.watcher = Some(spawn_exit_watcher(child, latch.clone(), kill_rx));
        guard.timer = Some(spawn_timer(cfg.timeout, latch));

        let event = terminal_rx
            .await
            .unwrap_or_else(|_| TerminalEvent::ProcessError("terminal notification dropped".to_string()));
        let _ = alive_tx.send(false);
        if let Some(timer) = guard.timer.take() {
            timer.abort();
        }

        let (termination, exit_code, process_error) = match event {
            TerminalEvent::Exited { code } => (Termination::Exited, code, None),
            TerminalEvent::TimedOut => {
                warn!(
                    action = %request.action,
                    pid = ?pid,
                    timeout_ms = cfg.timeout.as_millis() as u64,
                    "biometric program timed out; killing"
                );
                let _ = kill_tx.send(());
                let code = match guard.watcher.as_mut() {
                    Some(watcher) => match tokio::time::timeout(cfg.drain_grace, watcher).await {
                        Ok(Ok(code)) => code,
                        Ok(Err(join_err)) => {
                            warn!(pid = ?pid, error = %join_err, "exit watcher failed after kill");
                            None
                        }
                        Err(_) => {
                            warn!(pid = ?pid, "process not reaped within grace period");
                            None
                        }
                    },
                    None => None,
                };
                (Termination::TimedOut, code, None)
            }
            TerminalEvent::ProcessError(err) => (Termination::ProcessError, None, Some(err)),
        };

        // output may still be in flight right after exit or kill
        let deadline = tokio::time::Instant::now() + cfg.drain_grace;
        for reader in guard.readers.iter_mut() {
            if tokio::time::timeout_at(deadline, reader).await.is_err() {
                debug!(pid = ?pid, "output reader still open after grace period");
                break;
            }
        }

        let captured = buffer.snapshot();
        info!(
            action = %request.action,
            candidate = %candidate,
            pid = ?pid,
            termination = ?termination,
            exit_code = ?exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_bytes = captured.stdout.len(),
            stderr_bytes = captured.stderr.len(),
            "biometric program finished"
        );

        interpret(RunReport {
            action: request.action,
            subject: request.subject_name.as_deref(),
            termination,
            exit_code,
            process_error,
            timeout: cfg.timeout,
            captured,
        })
    }
}

/// Waits for the child to exit, or kills and reaps it on request. Resolves the
/// latch on natural exit or wait failure and returns the reaped exit code.
fn spawn_exit_watcher(mut child: Child, latch: TerminalLatch, kill_rx: oneshot::Receiver<()>) -> JoinHandle<Option<i32>> {
    tokio::spawn(async move {
        tokio::select! {
            status = child.wait() => match status {
                Ok(status) => {
                    let code = status.code();
                    latch.resolve(TerminalEvent::Exited { code });
                    code
                }
                Err(err) => {
                    latch.resolve(TerminalEvent::ProcessError(err.to_string()));
                    None
                }
            },
            _ = kill_rx => {
                if let Err(err) = child.start_kill() {
                    warn!(error = %err, "failed to signal biometric program");
                    latch.resolve(TerminalEvent::ProcessError(err.to_string()));
                }
                match child.wait().await {
                    Ok(status) => {
                        debug!(status = %status, "killed biometric program reaped");
                        status.code()
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to reap killed biometric program");
                        None
                    }
                }
            }
        }
    })
}

fn spawn_timer(timeout: Duration, latch: TerminalLatch) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        latch.resolve(TerminalEvent::TimedOut);
    })
}
