//!
//! biogate server binary
//! ----------------------
//! Command-line entry point for the biogate HTTP server. Configuration comes
//! from `BIOGATE_*` environment variables, overridden by CLI flags.

use anyhow::Result;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use biogate::config::{parse_candidates, BridgeConfig};

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return args[i + 1].parse::<T>().ok();
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("biogate Server\n\nUSAGE:\n  biogate_server [--http-port N] [--bridge-dir PATH] [--timeout-secs N] [--interpreters a,b,c]\n\nOPTIONS:\n  --http-port N          HTTP API port (env: BIOGATE_HTTP_PORT, default 7878)\n  --bridge-dir PATH      Working directory of the biometric programs (env: BIOGATE_BRIDGE_DIR)\n  --timeout-secs N       Ceiling per biometric run (env: BIOGATE_TIMEOUT_SECS, default 45)\n  --interpreters LIST    Candidate executables, comma separated (env: BIOGATE_INTERPRETERS)\n");
        return Ok(());
    }

    // CLI arguments override environment
    let mut config = BridgeConfig::from_env();
    if let Some(port) = parse_arg::<u16>(&args, "--http-port") { config.http_port = port; }
    if let Some(dir) = parse_arg::<PathBuf>(&args, "--bridge-dir") { config.bridge_dir = dir; }
    if let Some(secs) = parse_arg::<u64>(&args, "--timeout-secs") { config.timeout = Duration::from_secs(secs); }
    if let Some(list) = parse_arg::<String>(&args, "--interpreters") {
        let candidates = parse_candidates(&list);
        if !candidates.is_empty() { config.interpreters = candidates; }
    }

    println!(
        "biogate starting: http={}, bridge_dir={}, timeout={}s",
        config.http_port,
        config.bridge_dir.display(),
        config.timeout.as_secs_f64()
    );
    tracing::info!(
        "Using port: http={}, bridge_dir={}, interpreters={:?}",
        config.http_port,
        config.bridge_dir.display(),
        config.interpreters
    );
    biogate::server::run_with_config(config).await
}
