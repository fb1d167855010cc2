//! Authentication commands.

use repair_desk_admin::login::LoginState;
use repair_desk_admin::{AppShell, ShellError, View};
use serde_json::Value;

use super::{CliError, read_password};
use crate::output::{self, OutputFormat};

/// Sign in through the login form.
pub async fn login(
    shell: &AppShell,
    identifier: Option<String>,
    password_stdin: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    if shell.view() == View::Browser {
        let session = shell.session().read();
        let username = session.user().map_or("unknown", |u| u.username.as_str());
        output::print_success(&format!("Already logged in as {username}"), format);
        return Ok(());
    }

    let identifier = match identifier {
        Some(identifier) => identifier,
        None => output::prompt_line("Username or email: ")?,
    };
    let password = read_password(password_stdin)?;

    let form = shell
        .login_form()
        .on_success(|| tracing::debug!("Login succeeded, re-evaluating view"));

    match form.submit(&identifier, &password).await {
        LoginState::Authenticated => {
            let username = shell
                .session()
                .read()
                .user()
                .map_or_else(|| identifier.clone(), |u| u.username.clone());
            output::print_success(&format!("Logged in as {username}"), format);
            Ok(())
        }
        LoginState::Failed { message } => Err(CliError::LoginFailed(message)),
        other => Err(CliError::LoginFailed(format!("unexpected login state: {other:?}"))),
    }
}

/// Sign out and clear the stored session.
pub fn logout(shell: &AppShell, format: OutputFormat) {
    shell.auth().logout();
    output::print_success("Logged out", format);
}

/// Show the signed-in user.
pub fn whoami(shell: &AppShell, format: OutputFormat) -> Result<(), CliError> {
    shell
        .auth()
        .check_auth()
        .map_err(|_| ShellError::LoginRequired)?;

    let session = shell.session().read();
    let user = session.user().ok_or(ShellError::LoginRequired)?;

    match format {
        OutputFormat::Text => {
            output::print_heading(shell.title());
            output::print_row("User ID", &user.id.to_string());
            output::print_row("Username", &user.username);
            output::print_row("Email", &user.email);
        }
        OutputFormat::Json => output::print_json(user),
    }
    Ok(())
}

/// Create an account. Does not sign in.
pub async fn register(
    shell: &AppShell,
    username: &str,
    email: &str,
    password_stdin: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    let password = read_password(password_stdin)?;
    let mut response = shell.gateway().register(username, email, &password).await?;

    // The backend hands back a token; it is not meant for the terminal
    if let Value::Object(map) = &mut response {
        map.remove("jwt");
    }

    match format {
        OutputFormat::Text => output::print_success(&format!("Registered {username}"), format),
        OutputFormat::Json => output::print_json(&response),
    }
    Ok(())
}
