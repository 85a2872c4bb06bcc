pub mod connectivity;

use crate::bridge::AuthResult;
use crate::store::{EnrolledSubject, EnrollmentListing};

const MAX_CELL_CHARS: usize = 40;

fn json_forced() -> bool {
    std::env::var("BIOGATE_OUTPUT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false)
}

/// Print a bridge result as a short human summary, or raw JSON when
/// `BIOGATE_OUTPUT=json`.
pub fn print_auth_result(result: &AuthResult) {
    if json_forced() {
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
        return;
    }
    print!("{}", render_auth_result(result));
}

pub fn render_auth_result(result: &AuthResult) -> String {
    let mut s = String::new();
    let verdict = if result.success { "SUCCESS" } else { "FAILED" };
    s.push_str(&format!("{verdict}: {}\n", result.message));
    if let Some(id) = &result.identity {
        s.push_str(&format!("identity: {id}\n"));
    }
    let code = result.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string());
    s.push_str(&format!("termination: {:?}, exit code: {code}\n", result.termination));
    if !result.raw_output.trim().is_empty() {
        s.push_str("--- program output ---\n");
        s.push_str(result.raw_output.trim_end());
        s.push('\n');
    }
    if let Some(err) = &result.raw_error {
        s.push_str("--- program errors ---\n");
        s.push_str(err.trim_end());
        s.push('\n');
    }
    s
}

/// Print enrolled subjects as an ASCII table.
pub fn print_users_table(listing: &EnrollmentListing) {
    if json_forced() {
        println!("{}", serde_json::to_string_pretty(listing).unwrap_or_default());
        return;
    }
    print!("{}", render_users_table(listing));
}

pub fn render_users_table(listing: &EnrollmentListing) -> String {
    if listing.users.is_empty() {
        return format!("{}\n", listing.message);
    }
    let header = USER_HEADERS.map(String::from);
    let rows: Vec<[String; 6]> = listing.users.iter().map(user_cells).collect();

    let mut widths = USER_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let rule = widths.iter().fold(String::from("+"), |mut acc, w| {
        acc.push_str(&"-".repeat(w + 2));
        acc.push('+');
        acc
    });
    let line = |cells: &[String; 6]| {
        let mut s = String::from("|");
        for ((cell, &w), &right) in cells.iter().zip(&widths).zip(&RIGHT_ALIGNED) {
            if right {
                s.push_str(&format!(" {cell:>w$} |"));
            } else {
                s.push_str(&format!(" {cell:<w$} |"));
            }
        }
        s
    };

    let mut out = format!("{rule}\n{}\n{rule}\n", line(&header));
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out.push_str(&format!("{rule}\nusers: {} (source: {})\n", listing.total_users, listing.source));
    out
}

const USER_HEADERS: [&str; 6] = ["id", "name", "face", "voice", "workspace", "created"];
// ids and embedding counts
const RIGHT_ALIGNED: [bool; 6] = [true, false, true, true, false, false];

fn user_cells(u: &EnrolledSubject) -> [String; 6] {
    [
        u.id.clone(),
        clip(&u.name),
        u.face_embeddings.to_string(),
        u.voice_embeddings.to_string(),
        clip(u.workspace.as_deref().unwrap_or_default()),
        u.created_date.clone().unwrap_or_default(),
    ]
}

/// Subject names and workspace codes are free text; keep rows on one screen line.
fn clip(s: &str) -> String {
    if s.chars().count() <= MAX_CELL_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_CELL_CHARS - 1).collect();
    out.push('…');
    out
}
