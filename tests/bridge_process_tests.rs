#![cfg(unix)]

mod support;

use std::time::{Duration, Instant};

use biogate::bridge::{AuthAction, AuthRequest, BiometricBridge, Termination};
use support::*;

#[tokio::test]
async fn authenticate_success_extracts_identity() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), AUTH_SCRIPT, LOGIN_OK);
    let bridge = BiometricBridge::new(sh_config(dir.path()));

    let r = bridge.authenticate_or_enroll(AuthRequest::authenticate()).await.unwrap();
    assert!(r.success, "{r:?}");
    assert_eq!(r.identity.as_deref(), Some("Alice"));
    assert_eq!(r.exit_code, Some(0));
    assert_eq!(r.termination, Termination::Exited);
    assert!(r.raw_output.contains("BIOMETRIC AUTHENTICATION SYSTEM"));
}

#[tokio::test]
async fn enroll_stages_menu_name_and_workspace_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), ENROLL_SCRIPT, ENROLL_ECHO);
    let bridge = BiometricBridge::new(sh_config(dir.path()));

    let r = bridge
        .authenticate_or_enroll(AuthRequest::enroll("Alice Smith", Some("WS-9".into())))
        .await
        .unwrap();
    assert!(r.raw_output.contains("choice=[1] name=[Alice Smith] code=[WS-9]"), "{}", r.raw_output);
    assert!(r.success);
    assert_eq!(r.identity.as_deref(), Some("Alice Smith"));
    assert_eq!(r.message, "User Alice Smith added successfully");
}

#[tokio::test]
async fn enroll_without_workspace_sends_name_only() {
    let dir = tempfile::tempdir().unwrap();
    write_script(
        dir.path(),
        ENROLL_SCRIPT,
        "read choice\nread name\necho \"choice=[$choice] name=[$name]\"\necho \"✅ User '$name' added successfully!\"\n",
    );
    let bridge = BiometricBridge::new(sh_config(dir.path()));

    let r = bridge.authenticate_or_enroll(AuthRequest::enroll("Bob", None)).await.unwrap();
    assert!(r.raw_output.contains("choice=[1] name=[Bob]"), "{}", r.raw_output);
    assert!(r.success);
}

#[tokio::test]
async fn invalid_request_spawns_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), ENROLL_SCRIPT, "touch spawned.marker\n");
    let bridge = BiometricBridge::new(sh_config(dir.path()));

    let err = bridge
        .authenticate_or_enroll(AuthRequest { action: AuthAction::Enroll, subject_name: None, workspace_code: None })
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 400);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!dir.path().join("spawned.marker").exists());
}

#[tokio::test]
async fn launch_failure_when_no_candidate_starts() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), AUTH_SCRIPT, LOGIN_OK);
    let mut cfg = sh_config(dir.path());
    cfg.interpreters = vec!["biogate-no-such-a".into(), "biogate-no-such-b".into()];
    let bridge = BiometricBridge::new(cfg);

    let r = bridge.authenticate_or_enroll(AuthRequest::authenticate()).await.unwrap();
    assert!(!r.success);
    assert_eq!(r.exit_code, None);
    assert_eq!(r.termination, Termination::LaunchFailed);
    assert!(!r.message.is_empty());
    let diag = r.raw_error.unwrap();
    assert!(diag.contains("biogate-no-such-a") && diag.contains("biogate-no-such-b"), "{diag}");
}

#[tokio::test]
async fn missing_marker_with_zero_exit_is_failure() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), AUTH_SCRIPT, "read choice\necho \"❌ Authentication failed\"\nexit 0\n");
    let bridge = BiometricBridge::new(sh_config(dir.path()));

    let r = bridge.authenticate_or_enroll(AuthRequest::authenticate()).await.unwrap();
    assert!(!r.success);
    assert_eq!(r.exit_code, Some(0));
    assert_eq!(r.identity, None);
}

#[tokio::test]
async fn exit_code_does_not_override_marker() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), AUTH_SCRIPT, "read choice\necho \"-- Bob -- Login Successful ✅\"\nexit 3\n");
    let bridge = BiometricBridge::new(sh_config(dir.path()));

    let r = bridge.authenticate_or_enroll(AuthRequest::authenticate()).await.unwrap();
    assert!(r.success);
    assert_eq!(r.identity.as_deref(), Some("Bob"));
    assert_eq!(r.exit_code, Some(3));
}

#[tokio::test]
async fn stderr_is_captured() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), AUTH_SCRIPT, "read choice\necho \"Traceback: boom\" >&2\nexit 1\n");
    let bridge = BiometricBridge::new(sh_config(dir.path()));

    let r = bridge.authenticate_or_enroll(AuthRequest::authenticate()).await.unwrap();
    assert!(!r.success);
    assert_eq!(r.exit_code, Some(1));
    assert!(r.raw_error.unwrap().contains("Traceback: boom"));
}

#[tokio::test]
async fn stdin_write_failure_does_not_decide_the_result() {
    let dir = tempfile::tempdir().unwrap();
    // closing stdin makes the menu write hit a broken pipe while the program lives on
    write_script(
        dir.path(),
        AUTH_SCRIPT,
        "exec 0<&-\nsleep 0.4\necho \"-- Zed -- Login Successful ✅\"\n",
    );
    let bridge = BiometricBridge::new(sh_config(dir.path()));

    let r = bridge.authenticate_or_enroll(AuthRequest::authenticate()).await.unwrap();
    biogate::tprintln!("after stdin failure: {:?}", r);
    assert!(r.success, "{r:?}");
    assert_eq!(r.identity.as_deref(), Some("Zed"));
    assert_eq!(r.termination, Termination::Exited);
    assert_eq!(r.exit_code, Some(0));
    assert_eq!(r.raw_error, None);
}

#[tokio::test]
async fn timeout_kills_the_process_and_keeps_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), AUTH_SCRIPT, "echo \"PID $$\"\nexec sleep 30\n");
    let mut cfg = sh_config(dir.path());
    cfg.timeout = Duration::from_millis(600);
    let bridge = BiometricBridge::new(cfg);

    let started = Instant::now();
    let r = bridge.authenticate_or_enroll(AuthRequest::authenticate()).await.unwrap();
    biogate::tprintln!("timed out after {:?}: {:?}", started.elapsed(), r);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!r.success);
    assert!(r.timed_out());
    assert!(r.message.contains("timed out"), "{}", r.message);

    let pid = r
        .raw_output
        .lines()
        .find_map(|l| l.strip_prefix("PID "))
        .map(|p| p.trim().to_string())
        .expect("partial output kept");
    assert!(!pid_alive(&pid), "process {pid} outlived its request");
}

#[tokio::test]
async fn exit_racing_timeout_yields_one_consistent_result() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), AUTH_SCRIPT, "read choice\nsleep 0.3\necho \"AUTHENTICATION SUCCESSFUL\"\n");
    let mut cfg = sh_config(dir.path());
    cfg.timeout = Duration::from_millis(320);
    let bridge = BiometricBridge::new(cfg);

    let r = bridge.authenticate_or_enroll(AuthRequest::authenticate()).await.unwrap();
    biogate::tprintln!("race outcome: {:?}", r.termination);
    match r.termination {
        Termination::Exited => assert!(r.success),
        Termination::TimedOut => assert!(!r.success),
        other => panic!("unexpected termination {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_requests_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    write_script(dir.path(), AUTH_SCRIPT, LOGIN_OK);
    write_script(dir.path(), ENROLL_SCRIPT, ENROLL_ECHO);
    let bridge = BiometricBridge::new(sh_config(dir.path()));

    let (a, b) = tokio::join!(
        bridge.authenticate_or_enroll(AuthRequest::authenticate()),
        bridge.authenticate_or_enroll(AuthRequest::enroll("Carol", Some("W2".into()))),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.identity.as_deref(), Some("Alice"));
    assert!(b.raw_output.contains("name=[Carol] code=[W2]"));
    assert!(!a.raw_output.contains("Carol"));
}
