//! Stored-session inspection.

use std::path::Path;

use repair_desk_admin::session::{FileSessionStorage, clear_stored_auth, read_stored_auth};

use crate::output::{self, OutputFormat};

/// Print what is stored on disk. The token itself is never printed.
pub fn show(state_dir: &Path, format: OutputFormat) {
    let storage = FileSessionStorage::new(state_dir);
    let stored = read_stored_auth(&storage);

    match format {
        OutputFormat::Text => {
            output::print_heading("Stored session");
            output::print_row("File", &storage.path().display().to_string());
            match &stored {
                Some(session) => {
                    output::print_row("Authenticated", &session.is_authenticated().to_string());
                    output::print_row("Has token", &session.token().is_some().to_string());
                    let user = session
                        .user()
                        .map_or_else(|| "-".to_string(), |u| format!("{} ({})", u.username, u.id));
                    output::print_row("User", &user);
                }
                None => output::print_row("State", "nothing stored"),
            }
        }
        OutputFormat::Json => {
            let state = stored.map(|session| {
                serde_json::json!({
                    "isAuthenticated": session.is_authenticated(),
                    "hasToken": session.token().is_some(),
                    "user": session.user(),
                })
            });
            output::print_json(&serde_json::json!({
                "path": storage.path(),
                "state": state,
            }));
        }
    }
}

/// Remove the stored session file.
pub fn clear(state_dir: &Path, format: OutputFormat) {
    clear_stored_auth(&FileSessionStorage::new(state_dir));
    output::print_success("Auth data cleared from storage", format);
}
