use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::types::{AuthAction, AuthRequest};

/// Menu line selecting authentication in the login program.
pub const MENU_AUTHENTICATE: &str = "1";
/// Menu line selecting "add user" in the registration program.
pub const MENU_ENROLL: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedLine {
    /// Pause before writing, measured from the previous write (or from spawn).
    pub delay: Duration,
    pub line: String,
}

/// The answers typed into the program's prompt, in order.
///
/// Prompt order is a contract with the external program:
/// menu choice, then for enrollment the subject name and the optional
/// workspace code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptScript {
    lines: Vec<ScriptedLine>,
}

impl PromptScript {
    pub fn for_request(request: &AuthRequest, menu_delay: Duration, param_delay: Duration) -> Self {
        let mut lines = Vec::with_capacity(3);
        match request.action {
            AuthAction::Authenticate => {
                lines.push(ScriptedLine { delay: menu_delay, line: MENU_AUTHENTICATE.to_string() });
            }
            AuthAction::Enroll => {
                lines.push(ScriptedLine { delay: menu_delay, line: MENU_ENROLL.to_string() });
                if let Some(name) = &request.subject_name {
                    lines.push(ScriptedLine { delay: param_delay, line: name.clone() });
                }
                if let Some(code) = &request.workspace_code {
                    lines.push(ScriptedLine { delay: param_delay, line: code.clone() });
                }
            }
        }
        Self { lines }
    }

    pub fn lines(&self) -> &[ScriptedLine] { &self.lines }

    pub fn text_lines(&self) -> Vec<&str> { self.lines.iter().map(|l| l.line.as_str()).collect() }
}

/// Write `script` into `stdin` on its schedule while `alive` stays true.
///
/// Write failures are logged and end the script; they never decide the
/// request's outcome. Stdin is held open until the session terminates.
pub fn spawn_driver<W>(mut stdin: W, script: PromptScript, mut alive: watch::Receiver<bool>) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        for (step, scripted) in script.lines.iter().enumerate() {
            tokio::time::sleep(scripted.delay).await;
            if !*alive.borrow() {
                debug!(step, "session terminated; suppressing remaining prompt input");
                return;
            }
            let payload = format!("{}\n", scripted.line);
            let mut written = stdin.write_all(payload.as_bytes()).await;
            if written.is_ok() {
                written = stdin.flush().await;
            }
            if let Err(err) = written {
                warn!(step, error = %err, "failed writing prompt input");
                return;
            }
            debug!(step, "prompt input written");
        }
        // Either a false value or a dropped sender ends the session.
        let _ = alive.wait_for(|live| !*live).await;
        let _ = stdin.shutdown().await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn authenticate_script_is_menu_only() {
        let script = PromptScript::for_request(
            &AuthRequest::authenticate(),
            Duration::from_millis(1000),
            Duration::from_millis(500),
        );
        assert_eq!(script.text_lines(), vec![MENU_AUTHENTICATE]);
        assert_eq!(script.lines()[0].delay, Duration::from_millis(1000));
    }

    #[test]
    fn enroll_script_orders_menu_name_workspace() {
        let req = AuthRequest::enroll("Alice", Some("WS-42".into()));
        let script = PromptScript::for_request(&req, Duration::from_millis(1000), Duration::from_millis(500));
        assert_eq!(script.text_lines(), vec![MENU_ENROLL, "Alice", "WS-42"]);
        let delays: Vec<_> = script.lines().iter().map(|l| l.delay.as_millis()).collect();
        assert_eq!(delays, vec![1000, 500, 500]);
    }

    #[test]
    fn enroll_script_without_workspace() {
        let req = AuthRequest::enroll("Bob", None);
        let script = PromptScript::for_request(&req, Duration::ZERO, Duration::ZERO);
        assert_eq!(script.text_lines(), vec![MENU_ENROLL, "Bob"]);
    }

    #[tokio::test]
    async fn driver_writes_lines_in_order() {
        let (writer, mut reader) = tokio::io::duplex(256);
        let (alive_tx, alive_rx) = watch::channel(true);
        let req = AuthRequest::enroll("Carol", Some("W1".into()));
        let script = PromptScript::for_request(&req, Duration::from_millis(5), Duration::from_millis(5));
        let handle = spawn_driver(writer, script, alive_rx);

        let mut got = Vec::new();
        let mut buf = [0u8; 64];
        while !got.ends_with(b"W1\n") {
            let n = reader.read(&mut buf).await.unwrap();
            assert!(n > 0, "driver closed stdin early");
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(String::from_utf8(got).unwrap(), "1\nCarol\nW1\n");

        alive_tx.send(false).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn no_writes_after_termination() {
        let (writer, mut reader) = tokio::io::duplex(256);
        let (alive_tx, alive_rx) = watch::channel(true);
        let script = PromptScript::for_request(&AuthRequest::authenticate(), Duration::from_millis(50), Duration::ZERO);
        let handle = spawn_driver(writer, script, alive_rx);
        alive_tx.send(false).unwrap();
        handle.await.unwrap();

        // writer dropped without writing anything: reader sees EOF immediately
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
