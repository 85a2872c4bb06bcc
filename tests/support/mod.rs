#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use biogate::config::BridgeConfig;

pub const AUTH_SCRIPT: &str = "auth.sh";
pub const ENROLL_SCRIPT: &str = "enroll.sh";

/// Bridge config running `sh` scripts from `dir` with short delays.
pub fn sh_config(dir: &Path) -> BridgeConfig {
    BridgeConfig {
        bridge_dir: dir.to_path_buf(),
        auth_program: AUTH_SCRIPT.into(),
        enroll_program: ENROLL_SCRIPT.into(),
        interpreters: vec!["biogate-missing-interpreter".to_string(), "sh".to_string()],
        timeout: Duration::from_secs(10),
        menu_delay: Duration::from_millis(20),
        param_delay: Duration::from_millis(20),
        drain_grace: Duration::from_millis(500),
        ..BridgeConfig::default()
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

pub const LOGIN_OK: &str = r#"read choice
if [ "$choice" = "1" ]; then
  echo "🔐 BIOMETRIC AUTHENTICATION SYSTEM"
  echo "🎉 AUTHENTICATION SUCCESSFUL!"
  echo "-- Alice -- Login Successful ✅"
else
  echo "ERROR: Invalid choice"
fi
"#;

pub const ENROLL_ECHO: &str = r#"read choice
read name
read code
echo "choice=[$choice] name=[$name] code=[$code]"
echo "SUCCESS: User added with biometric data"
"#;

/// True while a process with `pid` exists.
pub fn pid_alive(pid: &str) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid)
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
