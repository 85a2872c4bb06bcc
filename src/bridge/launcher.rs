use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// One failed spawn attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchAttempt {
    pub candidate: String,
    pub error: String,
}

/// Every candidate failed to spawn.
#[derive(Debug, Error)]
#[error("could not start {}: {}", .program.display(), describe_attempts(.attempts))]
pub struct LaunchError {
    pub program: PathBuf,
    pub attempts: Vec<LaunchAttempt>,
}

fn describe_attempts(attempts: &[LaunchAttempt]) -> String {
    if attempts.is_empty() {
        return "no candidate executables configured".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.candidate, a.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug)]
pub struct LaunchedProcess {
    pub child: Child,
    pub candidate: String,
    pub pid: Option<u32>,
}

/// Starts `<candidate> <program>` in a working directory, trying candidates in order.
#[derive(Debug, Clone)]
pub struct Launcher<'a> {
    candidates: &'a [String],
    working_dir: &'a Path,
}

impl<'a> Launcher<'a> {
    pub fn new(candidates: &'a [String], working_dir: &'a Path) -> Self {
        Self { candidates, working_dir }
    }

    /// Only a failed spawn moves on to the next candidate; what the program does
    /// after it starts is not a launch concern.
    pub fn launch(&self, program: &Path) -> Result<LaunchedProcess, LaunchError> {
        // the child runs in working_dir, so a relative program path must not be re-read from there
        let anchored;
        let program = if program.is_relative() && program.starts_with(self.working_dir) {
            anchored = std::env::current_dir().map(|cwd| cwd.join(program)).unwrap_or_else(|_| program.to_path_buf());
            anchored.as_path()
        } else {
            program
        };
        let mut attempts = Vec::with_capacity(self.candidates.len());
        for candidate in self.candidates {
            debug!(
                candidate = %candidate,
                program = %program.display(),
                workdir = %self.working_dir.display(),
                "trying to start biometric program"
            );
            let mut command = Command::new(candidate);
            command
                .arg(program)
                .current_dir(self.working_dir)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            match command.spawn() {
                Ok(child) => {
                    let pid = child.id();
                    info!(candidate = %candidate, pid = ?pid, program = %program.display(), "biometric program started");
                    return Ok(LaunchedProcess { child, candidate: candidate.clone(), pid });
                }
                Err(err) => {
                    warn!(candidate = %candidate, error = %err, raw_os_error = err.raw_os_error(), "failed to start candidate");
                    attempts.push(LaunchAttempt { candidate: candidate.clone(), error: err.to_string() });
                }
            }
        }
        Err(LaunchError { program: program.to_path_buf(), attempts })
    }
}
