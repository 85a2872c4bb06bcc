//! Classification of captured program output.
//!
//! The external program has no structured result channel. Success is decided
//! only by literal markers on stdout; the exit code is carried for diagnostics
//! and never overrides the markers.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use super::aggregator::CapturedOutput;
use super::launcher::LaunchError;
use super::types::{AuthAction, AuthResult, Termination};

/// Printed by the registration program once a subject is stored.
pub const ENROLL_SUCCESS_MARKERS: &[&str] = &["added successfully", "SUCCESS"];
/// Printed by the login program on a face + voice match.
pub const AUTH_SUCCESS_MARKERS: &[&str] = &["Login Successful ✅", "AUTHENTICATION SUCCESSFUL"];

// identity sits between "-- " and " -- Login Successful" on one line
static IDENTITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-- (.*?) -- Login Successful").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Matched { identity: String },
    MatchedNoIdentity,
    NoMatch,
}

impl Classification {
    pub fn is_success(&self) -> bool { !matches!(self, Classification::NoMatch) }

    pub fn identity(&self) -> Option<&str> {
        match self {
            Classification::Matched { identity } => Some(identity.as_str()),
            _ => None,
        }
    }
}

/// First non-empty identity announced on a login-success line.
pub fn extract_identity(stdout: &str) -> Option<String> {
    IDENTITY_RE
        .captures_iter(stdout)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

/// Classify stdout for `action`. Enrollment reports the enrolled subject as the
/// identity when one is given.
pub fn classify(action: AuthAction, stdout: &str, subject: Option<&str>) -> Classification {
    match action {
        AuthAction::Authenticate => {
            if !AUTH_SUCCESS_MARKERS.iter().any(|m| stdout.contains(m)) {
                return Classification::NoMatch;
            }
            match extract_identity(stdout) {
                Some(identity) => Classification::Matched { identity },
                None => Classification::MatchedNoIdentity,
            }
        }
        AuthAction::Enroll => {
            if !ENROLL_SUCCESS_MARKERS.iter().any(|m| stdout.contains(m)) {
                return Classification::NoMatch;
            }
            match subject {
                Some(name) => Classification::Matched { identity: name.to_string() },
                None => Classification::MatchedNoIdentity,
            }
        }
    }
}

/// Everything known about a finished run, handed to [`interpret`].
#[derive(Debug, Clone)]
pub struct RunReport<'a> {
    pub action: AuthAction,
    pub subject: Option<&'a str>,
    pub termination: Termination,
    pub exit_code: Option<i32>,
    pub process_error: Option<String>,
    pub timeout: Duration,
    pub captured: CapturedOutput,
}

/// Build the one result for a run that got past launch.
pub fn interpret(report: RunReport<'_>) -> AuthResult {
    let classification = classify(report.action, &report.captured.stdout, report.subject);
    info!(
        action = %report.action,
        termination = ?report.termination,
        exit_code = ?report.exit_code,
        classification = ?classification,
        "biometric run classified"
    );

    let mut raw_error = non_empty(report.captured.stderr);
    let (success, message) = match report.termination {
        Termination::Exited => {
            let message = match (&classification, report.action) {
                (Classification::Matched { identity }, AuthAction::Authenticate) => {
                    format!("Authentication successful for {identity}")
                }
                (Classification::MatchedNoIdentity, AuthAction::Authenticate) => {
                    "Authentication successful (identity not reported)".to_string()
                }
                (Classification::NoMatch, AuthAction::Authenticate) => "Authentication failed".to_string(),
                (Classification::NoMatch, AuthAction::Enroll) => match report.subject {
                    Some(name) => format!("Failed to add user {name}"),
                    None => "Failed to add user".to_string(),
                },
                (_, AuthAction::Enroll) => match report.subject {
                    Some(name) => format!("User {name} added successfully"),
                    None => "User added successfully".to_string(),
                },
            };
            (classification.is_success(), message)
        }
        Termination::TimedOut => {
            let mut message = format!(
                "{} process timed out after {} seconds",
                capitalized(report.action),
                report.timeout.as_secs_f64()
            );
            if classification.is_success() {
                message.push_str("; a success marker was printed before the timeout");
            }
            (false, message)
        }
        Termination::ProcessError | Termination::LaunchFailed => {
            let detail = report.process_error.unwrap_or_else(|| "unknown process error".to_string());
            raw_error = Some(match raw_error {
                Some(stderr) => format!("{stderr}\n{detail}"),
                None => detail.clone(),
            });
            (false, format!("{} process failed: {detail}", capitalized(report.action)))
        }
    };

    // identity is only reported alongside success
    let identity = if success { classification.identity().map(str::to_string) } else { None };

    AuthResult {
        success,
        identity,
        message,
        raw_output: report.captured.stdout,
        raw_error,
        exit_code: report.exit_code,
        termination: report.termination,
    }
}

impl AuthResult {
    /// Result for a request whose program could not be started at all.
    pub fn launch_failure(action: AuthAction, err: &LaunchError) -> Self {
        let tried: Vec<&str> = err.attempts.iter().map(|a| a.candidate.as_str()).collect();
        let message = if tried.is_empty() {
            format!("Could not start the {action} process: no candidate executables configured")
        } else {
            format!(
                "Could not start the {action} process (tried: {}). Please ensure Python is installed.",
                tried.join(", ")
            )
        };
        AuthResult {
            success: false,
            identity: None,
            message,
            raw_output: String::new(),
            raw_error: Some(err.to_string()),
            exit_code: None,
            termination: Termination::LaunchFailed,
        }
    }
}

fn capitalized(action: AuthAction) -> &'static str {
    match action {
        AuthAction::Authenticate => "Authentication",
        AuthAction::Enroll => "Enrollment",
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod interpreter_tests;
