//! Read-only view of the external program's enrollment file.
//!
//! The file maps subject name to `{ face: [...], voice: [...], ... }`. Only
//! counts and flags leave this module; embeddings never do.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read enrollment file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("enrollment file {} is not valid JSON: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledSubject {
    pub id: String,
    pub name: String,
    pub has_face_data: bool,
    pub has_voice_data: bool,
    pub face_embeddings: usize,
    pub voice_embeddings: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub workspace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentListing {
    pub success: bool,
    pub message: String,
    pub users: Vec<EnrolledSubject>,
    pub total_users: usize,
    pub source: String,
    pub timestamp: String,
}

/// Load the listing from `path`. A missing file is an empty, unsuccessful
/// listing rather than an error.
pub fn list_enrolled(path: &Path) -> Result<EnrollmentListing, StoreError> {
    let source = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let timestamp = chrono::Utc::now().to_rfc3339();

    if !path.exists() {
        debug!(path = %path.display(), "enrollment file not found");
        return Ok(EnrollmentListing {
            success: false,
            message: "Database file not found".to_string(),
            users: Vec::new(),
            total_users: 0,
            source,
            timestamp,
        });
    }

    let text = std::fs::read_to_string(path).map_err(|e| StoreError::Io { path: path.to_path_buf(), source: e })?;
    let users = parse_subjects(&text).map_err(|e| StoreError::Corrupt { path: path.to_path_buf(), source: e })?;
    Ok(EnrollmentListing {
        success: true,
        message: format!("Successfully loaded {} users from database", users.len()),
        total_users: users.len(),
        users,
        source,
        timestamp,
    })
}

/// Summaries in file order. Entries that are not objects are skipped.
pub fn parse_subjects(text: &str) -> Result<Vec<EnrolledSubject>, serde_json::Error> {
    let root: Map<String, Value> = if text.trim().is_empty() { Map::new() } else { serde_json::from_str(text)? };
    let mut out = Vec::with_capacity(root.len());
    for (name, record) in root.iter() {
        let Some(obj) = record.as_object() else {
            warn!(subject = %name, "skipping malformed enrollment record");
            continue;
        };
        let face = embedding_count(obj.get("face"));
        let voice = embedding_count(obj.get("voice"));
        out.push(EnrolledSubject {
            id: (out.len() + 1).to_string(),
            name: name.clone(),
            has_face_data: face > 0,
            has_voice_data: voice > 0,
            face_embeddings: face,
            voice_embeddings: voice,
            workspace: obj.get("workspace").and_then(Value::as_str).map(str::to_string),
            created_date: obj.get("created_date").and_then(Value::as_str).map(str::to_string),
        });
    }
    Ok(out)
}

/// A list of vectors counts its entries; a single flat vector counts as one.
fn embedding_count(v: Option<&Value>) -> usize {
    match v {
        Some(Value::Array(items)) if items.is_empty() => 0,
        Some(Value::Array(items)) => {
            if items.iter().all(Value::is_number) { 1 } else { items.len() }
        }
        _ => 0,
    }
}
