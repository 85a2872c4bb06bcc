//!
//! biogate CLI binary
//! -------------------
//! Runs one authentication or enrollment through the biometric bridge, either
//! in-process or against a running biogate server (`--connect`), and lists
//! enrolled subjects.

use std::env;

use anyhow::{anyhow, Result};

use biogate::bridge::{AuthRequest, AuthResult, BiometricBridge};
use biogate::cli::connectivity::HttpSession;
use biogate::cli::{print_auth_result, print_users_table};
use biogate::config::BridgeConfig;
use biogate::store;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} authenticate [--connect <url>]\n  {program} enroll --name <name> [--workspace <code>] [--connect <url>]\n  {program} users [--connect <url>]\n\nFlags:\n  --connect <url>     Send the request to a running biogate server instead of running in-process\n  --name <name>       Subject to enroll\n  --workspace <code>  Optional workspace code for enrollment\n  -h, --help          Show this help\n\nEnvironment:\n  BIOGATE_* variables configure the in-process bridge (see biogate_server --help).\n  BIOGATE_OUTPUT=json prints raw JSON."
    );
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

async fn run_request(request: AuthRequest, connect: Option<&str>) -> Result<AuthResult> {
    match connect {
        Some(url) => HttpSession::connect(url)?.run(&request).await,
        None => {
            let bridge = BiometricBridge::new(BridgeConfig::from_env());
            bridge.authenticate_or_enroll(request).await.map_err(|e| anyhow!(e.to_string()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("warn"))?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(|s| s.as_str()).unwrap_or("biogate_cli");
    if args.len() < 2 || args.iter().any(|a| a == "-h" || a == "--help") {
        print_usage(program);
        return Ok(());
    }
    let connect = flag_value(&args, "--connect");

    match args[1].as_str() {
        "authenticate" | "auth" => {
            let result = run_request(AuthRequest::authenticate(), connect.as_deref()).await?;
            print_auth_result(&result);
            if !result.success { std::process::exit(1); }
        }
        "enroll" => {
            let name = flag_value(&args, "--name").ok_or_else(|| anyhow!("enroll requires --name <name>"))?;
            let request = AuthRequest::enroll(name, flag_value(&args, "--workspace"));
            let result = run_request(request, connect.as_deref()).await?;
            print_auth_result(&result);
            if !result.success { std::process::exit(1); }
        }
        "users" => {
            let listing = match connect.as_deref() {
                Some(url) => HttpSession::connect(url)?.users().await?,
                None => store::list_enrolled(&BridgeConfig::from_env().store_path())?,
            };
            print_users_table(&listing);
        }
        other => {
            print_usage(program);
            return Err(anyhow!("unknown command '{other}'"));
        }
    }
    Ok(())
}
