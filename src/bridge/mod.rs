//! Bridge to the external biometric program.
//!
//! The external program is a line-oriented interactive prompt living in its own
//! working directory. This module launches it, types the prompt answers on a
//! fixed schedule, captures everything it prints and classifies the outcome once
//! it terminates. Keep the public surface thin; the pieces live in sub-modules:
//!
//! - `launcher`: candidate executable selection and spawn.
//! - `driver`: scripted stdin answers (`PromptScript`).
//! - `aggregator`: stdout/stderr capture.
//! - `latch`: resolve-once terminal event.
//! - `interpreter`: marker matching and identity extraction.
//! - `endpoint`: the per-request state machine tying it together.

mod aggregator;
mod driver;
mod endpoint;
mod interpreter;
mod latch;
mod launcher;
mod types;

pub use aggregator::{CapturedOutput, OutputBuffer, Stream};
pub use driver::{PromptScript, ScriptedLine, MENU_AUTHENTICATE, MENU_ENROLL};
pub use endpoint::{BiometricBridge, SessionState};
pub use interpreter::{
    classify, extract_identity, interpret, Classification, RunReport, AUTH_SUCCESS_MARKERS, ENROLL_SUCCESS_MARKERS,
};
pub use latch::{TerminalEvent, TerminalLatch};
pub use launcher::{LaunchAttempt, LaunchError, LaunchedProcess, Launcher};
pub use types::{AuthAction, AuthRequest, AuthRequestBody, AuthResult, Termination};
