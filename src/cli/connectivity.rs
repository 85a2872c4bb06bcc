use anyhow::{anyhow, Context, Result};
use reqwest::Url;

use crate::bridge::{AuthAction, AuthRequest, AuthResult};
use crate::store::EnrollmentListing;

/// Client for a running biogate server.
#[derive(Clone)]
pub struct HttpSession {
    base: Url,
    client: reqwest::Client,
}

impl HttpSession {
    pub fn connect(base: &str) -> Result<Self> {
        let base_url = Url::parse(base).context("invalid base URL")?;
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base: base_url, client })
    }

    /// Send one request to the server. Error bodies that still carry a
    /// normalized result (launch failures) are returned as results.
    pub async fn run(&self, request: &AuthRequest) -> Result<AuthResult> {
        let resp = match request.action {
            AuthAction::Authenticate => {
                let url = self.base.join("/api/python/authenticate")?;
                self.client.post(url).send().await?
            }
            AuthAction::Enroll => {
                let url = self.base.join("/api/python/execute")?;
                let body = serde_json::json!({
                    "action": "add_user",
                    "userName": request.subject_name,
                    "workspaceCode": request.workspace_code,
                });
                self.client.post(url).json(&body).send().await?
            }
        };
        let status = resp.status();
        let v: serde_json::Value = resp.json().await.context("server returned a non-JSON body")?;
        match serde_json::from_value::<AuthResult>(v.clone()) {
            Ok(result) => Ok(result),
            Err(_) => {
                let msg = v.get("message").and_then(|m| m.as_str()).unwrap_or("request failed");
                Err(anyhow!("HTTP {}: {}", status, msg))
            }
        }
    }

    pub async fn users(&self) -> Result<EnrollmentListing> {
        let url = self.base.join("/api/users")?;
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let v: serde_json::Value = resp.json().await.unwrap_or(serde_json::json!({}));
            let msg = v.get("message").and_then(|m| m.as_str()).unwrap_or("request failed").to_string();
            return Err(anyhow!("HTTP {}: {}", status, msg));
        }
        resp.json::<EnrollmentListing>().await.context("unexpected listing body")
    }
}
