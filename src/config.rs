//! Runtime configuration for the bridge and the HTTP server.
//!
//! Values come from built-in defaults, then `BIOGATE_*` environment variables.
//! The server binary applies CLI flags on top.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_HTTP_PORT: u16 = 7878;
pub const DEFAULT_BRIDGE_DIR: &str = "backend/audio_video_auth_system";
pub const DEFAULT_AUTH_PROGRAM: &str = "test_login_enhanced.py";
pub const DEFAULT_ENROLL_PROGRAM: &str = "add_delete_admin.py";
pub const DEFAULT_STORE_FILE: &str = "db.json";
pub const DEFAULT_INTERPRETERS: &[&str] = &["python", "python3", "py"];
pub const DEFAULT_TIMEOUT_SECS: u64 = 45;
pub const DEFAULT_MENU_DELAY_MS: u64 = 1000;
pub const DEFAULT_PARAM_DELAY_MS: u64 = 500;
pub const DEFAULT_DRAIN_GRACE_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub http_port: u16,
    /// Working directory of the external program; also holds its store file.
    pub bridge_dir: PathBuf,
    pub auth_program: PathBuf,
    pub enroll_program: PathBuf,
    /// Candidate executables tried in order to run the program.
    pub interpreters: Vec<String>,
    /// Ceiling from spawn to forced termination.
    pub timeout: Duration,
    pub menu_delay: Duration,
    pub param_delay: Duration,
    /// How long readers may keep draining after the process is gone.
    pub drain_grace: Duration,
    pub store_file: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            bridge_dir: PathBuf::from(DEFAULT_BRIDGE_DIR),
            auth_program: PathBuf::from(DEFAULT_AUTH_PROGRAM),
            enroll_program: PathBuf::from(DEFAULT_ENROLL_PROGRAM),
            interpreters: DEFAULT_INTERPRETERS.iter().map(|s| s.to_string()).collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            menu_delay: Duration::from_millis(DEFAULT_MENU_DELAY_MS),
            param_delay: Duration::from_millis(DEFAULT_PARAM_DELAY_MS),
            drain_grace: Duration::from_millis(DEFAULT_DRAIN_GRACE_MS),
            store_file: PathBuf::from(DEFAULT_STORE_FILE),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by whatever `BIOGATE_*` variables are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(port) = parse_var(&lookup, "BIOGATE_HTTP_PORT") { cfg.http_port = port; }
        if let Some(dir) = lookup("BIOGATE_BRIDGE_DIR").filter(|s| !s.trim().is_empty()) {
            cfg.bridge_dir = PathBuf::from(dir);
        }
        if let Some(p) = lookup("BIOGATE_AUTH_PROGRAM").filter(|s| !s.trim().is_empty()) {
            cfg.auth_program = PathBuf::from(p);
        }
        if let Some(p) = lookup("BIOGATE_ENROLL_PROGRAM").filter(|s| !s.trim().is_empty()) {
            cfg.enroll_program = PathBuf::from(p);
        }
        if let Some(list) = lookup("BIOGATE_INTERPRETERS") {
            let candidates = parse_candidates(&list);
            if candidates.is_empty() {
                warn!(value = %list, "BIOGATE_INTERPRETERS has no entries; keeping defaults");
            } else {
                cfg.interpreters = candidates;
            }
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "BIOGATE_TIMEOUT_SECS") {
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "BIOGATE_MENU_DELAY_MS") {
            cfg.menu_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "BIOGATE_PARAM_DELAY_MS") {
            cfg.param_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "BIOGATE_DRAIN_GRACE_MS") {
            cfg.drain_grace = Duration::from_millis(ms);
        }
        if let Some(f) = lookup("BIOGATE_STORE_FILE").filter(|s| !s.trim().is_empty()) {
            cfg.store_file = PathBuf::from(f);
        }
        cfg
    }

    pub fn auth_program_path(&self) -> PathBuf { resolve(&self.bridge_dir, &self.auth_program) }

    pub fn enroll_program_path(&self) -> PathBuf { resolve(&self.bridge_dir, &self.enroll_program) }

    pub fn store_path(&self) -> PathBuf { resolve(&self.bridge_dir, &self.store_file) }
}

fn resolve(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() { p.to_path_buf() } else { base.join(p) }
}

/// Split a comma separated candidate list, dropping blanks.
pub fn parse_candidates(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}
