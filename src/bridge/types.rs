use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthAction {
    Authenticate,
    Enroll,
}

impl AuthAction {
    /// Parse a wire action name. `add_user` is the historical name for enrollment.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "authenticate" => Some(AuthAction::Authenticate),
            "enroll" | "add_user" => Some(AuthAction::Enroll),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthAction::Authenticate => "authenticate",
            AuthAction::Enroll => "enroll",
        }
    }
}

impl Display for AuthAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Body accepted by the execute endpoint, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequestBody {
    pub action: Option<String>,
    #[serde(alias = "subjectName")]
    pub user_name: Option<String>,
    pub workspace_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub action: AuthAction,
    pub subject_name: Option<String>,
    pub workspace_code: Option<String>,
}

impl AuthRequest {
    pub fn authenticate() -> Self {
        Self { action: AuthAction::Authenticate, subject_name: None, workspace_code: None }
    }

    pub fn enroll<S: Into<String>>(subject_name: S, workspace_code: Option<String>) -> Self {
        Self { action: AuthAction::Enroll, subject_name: Some(subject_name.into()), workspace_code }
    }

    /// Decode a JSON body. Malformed JSON and unknown actions are user input errors.
    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        let body: AuthRequestBody = serde_json::from_slice(bytes)
            .map_err(|e| AppError::user("invalid_json".to_string(), format!("request body is not valid JSON: {e}")))?;
        Self::from_body(body)
    }

    pub fn from_body(body: AuthRequestBody) -> AppResult<Self> {
        let raw = body
            .action
            .ok_or_else(|| AppError::user("missing_action", "field 'action' is required"))?;
        let action = AuthAction::parse(&raw)
            .ok_or_else(|| AppError::user("invalid_action".to_string(), format!("invalid action specified: '{raw}'")))?;
        Ok(Self { action, subject_name: body.user_name, workspace_code: body.workspace_code })
    }

    /// Normalize and check the request. Blank optional fields collapse to `None`.
    ///
    /// Prompt answers travel as stdin lines, so a value containing a line break
    /// would inject extra answers and is refused. Authentication types no
    /// answers beyond the menu choice, so its fields are dropped unchecked.
    pub fn validate(self) -> AppResult<Self> {
        if self.action == AuthAction::Authenticate {
            return Ok(Self::authenticate());
        }
        let subject_name = normalize(self.subject_name);
        let workspace_code = normalize(self.workspace_code);
        for (field, value) in [("userName", &subject_name), ("workspaceCode", &workspace_code)] {
            if value.as_deref().is_some_and(|v| v.contains(['\n', '\r'])) {
                return Err(AppError::user(
                    "invalid_field".to_string(),
                    format!("field '{field}' must be a single line"),
                ));
            }
        }
        if subject_name.is_none() {
            return Err(AppError::user("missing_user_name", "field 'userName' is required for enrollment"));
        }
        Ok(Self { action: self.action, subject_name, workspace_code })
    }
}

fn normalize(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// How the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    LaunchFailed,
    Exited,
    TimedOut,
    ProcessError,
}

/// Normalized outcome of one request. Field names on the wire follow the
/// front-end contract (`username`, `output`, `error`, `exitCode`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub success: bool,
    #[serde(rename = "username")]
    pub identity: Option<String>,
    pub message: String,
    #[serde(rename = "output", default)]
    pub raw_output: String,
    #[serde(rename = "error")]
    pub raw_error: Option<String>,
    pub exit_code: Option<i32>,
    pub termination: Termination,
}

impl AuthResult {
    pub fn timed_out(&self) -> bool { self.termination == Termination::TimedOut }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_actions() {
        assert_eq!(AuthAction::parse("authenticate"), Some(AuthAction::Authenticate));
        assert_eq!(AuthAction::parse(" ENROLL "), Some(AuthAction::Enroll));
        assert_eq!(AuthAction::parse("add_user"), Some(AuthAction::Enroll));
        assert_eq!(AuthAction::parse("delete_user"), None);
    }

    #[test]
    fn enroll_without_name_is_refused() {
        let err = AuthRequest { action: AuthAction::Enroll, subject_name: Some("   ".into()), workspace_code: None }
            .validate()
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code_str(), "missing_user_name");
    }

    #[test]
    fn multi_line_name_is_refused() {
        let err = AuthRequest::enroll("alice\n2", None).validate().unwrap_err();
        assert_eq!(err.code_str(), "invalid_field");
    }

    #[test]
    fn validate_trims_and_drops_blank_workspace() {
        let req = AuthRequest::enroll("  Alice ", Some(" ".into())).validate().unwrap();
        assert_eq!(req.subject_name.as_deref(), Some("Alice"));
        assert_eq!(req.workspace_code, None);
    }

    #[test]
    fn authenticate_needs_no_fields() {
        assert!(AuthRequest::authenticate().validate().is_ok());
    }

    #[test]
    fn authenticate_ignores_stray_fields() {
        let req = AuthRequest {
            action: AuthAction::Authenticate,
            subject_name: Some("alice\n2".into()),
            workspace_code: Some("WS\r1".into()),
        };
        assert_eq!(req.validate().unwrap(), AuthRequest::authenticate());
    }

    #[test]
    fn only_known_action_names_parse() {
        assert_eq!(AuthAction::parse("auth"), None);
        assert_eq!(AuthAction::parse("login"), None);
    }

    #[test]
    fn from_json_errors() {
        assert_eq!(AuthRequest::from_json(b"{not json").unwrap_err().code_str(), "invalid_json");
        assert_eq!(AuthRequest::from_json(b"{}").unwrap_err().code_str(), "missing_action");
        assert_eq!(AuthRequest::from_json(br#"{"action":"dance"}"#).unwrap_err().code_str(), "invalid_action");
    }

    #[test]
    fn from_json_accepts_front_end_shape() {
        let req = AuthRequest::from_json(br#"{"action":"add_user","userName":"Bob","workspaceCode":"WS-1"}"#).unwrap();
        assert_eq!(req, AuthRequest::enroll("Bob", Some("WS-1".into())));
    }

    #[test]
    fn result_wire_names() {
        let r = AuthResult {
            success: true,
            identity: Some("Alice".into()),
            message: "ok".into(),
            raw_output: "out".into(),
            raw_error: None,
            exit_code: Some(0),
            termination: Termination::Exited,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["username"], "Alice");
        assert_eq!(v["output"], "out");
        assert_eq!(v["exitCode"], 0);
        assert!(v["error"].is_null());
        assert_eq!(v["termination"], "exited");
    }
}
