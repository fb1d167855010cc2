//! CLI command implementations.

pub mod auth;
pub mod resources;
pub mod session;

use std::io::{self, BufRead};

use repair_desk_admin::{ApiError, ConfigError, ShellError};
use repair_desk_core::{Filter, GetListParams, Pagination, ParamsError, Sort};
use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;

/// Shown when a command needs a session and there is none.
pub const LOGIN_REQUIRED_MESSAGE: &str = "Not logged in. Run 'rd-cli login' first.";

/// Errors surfaced by commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Shell operation failed.
    #[error(transparent)]
    Shell(#[from] ShellError),

    /// Backend request failed outside the shell.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Login attempt failed; the message is for the operator.
    #[error("{0}")]
    LoginFailed(String),

    /// A command-line argument could not be interpreted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<ParamsError> for CliError {
    fn from(e: ParamsError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

impl CliError {
    /// Message printed to the operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Shell(ShellError::LoginRequired) => LOGIN_REQUIRED_MESSAGE.to_string(),
            Self::Shell(ShellError::Api(e)) | Self::Api(e) => api_message(e),
            other => other.to_string(),
        }
    }
}

fn api_message(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized(_) => {
            format!("Session rejected by the backend and cleared. {LOGIN_REQUIRED_MESSAGE}")
        }
        ApiError::Backend { status: 403, .. } => {
            format!("Access denied; session cleared. {LOGIN_REQUIRED_MESSAGE}")
        }
        other => other
            .backend_message()
            .map_or_else(|| other.to_string(), str::to_string),
    }
}

/// Pagination, sort and filter flags shared by `list` and `refs`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Page number (1-indexed)
    #[arg(long)]
    pub page: Option<u32>,

    /// Records per page
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Sort as `field` or `field:ASC|DESC`
    #[arg(long)]
    pub sort: Option<String>,

    /// Filter as `key=value`; values are parsed as JSON when possible
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,
}

impl ListArgs {
    /// Convert into list parameters.
    ///
    /// Pagination is sent when either flag is given; the other one takes its
    /// default.
    pub fn to_params(&self) -> Result<GetListParams, CliError> {
        let pagination = (self.page.is_some() || self.per_page.is_some()).then(|| {
            let default = Pagination::default();
            Pagination::new(
                self.page.unwrap_or(default.page),
                self.per_page.unwrap_or(default.per_page),
            )
        });

        let sort = self.sort.as_deref().map(str::parse::<Sort>).transpose()?;

        Ok(GetListParams {
            pagination,
            sort,
            filter: parse_filters(&self.filters)?,
        })
    }
}

/// Parse `key=value` pairs into a filter.
pub fn parse_filters(raw: &[String]) -> Result<Filter, CliError> {
    raw.iter()
        .map(|pair| {
            let (key, value) = pair
                .split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| {
                    CliError::InvalidArgument(format!("filter '{pair}' is not KEY=VALUE"))
                })?;
            Ok::<_, CliError>((key.to_string(), parse_value(value)))
        })
        .collect()
}

/// A JSON value if `raw` parses as one, otherwise the raw string.
#[must_use]
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Parse a `--data` argument, which must be a JSON object.
pub fn parse_data(raw: &str) -> Result<Value, CliError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CliError::InvalidArgument(format!("--data is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(CliError::InvalidArgument(
            "--data must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Read the password from stdin, or prompt for it without echo.
pub fn read_password(from_stdin: bool) -> Result<SecretString, CliError> {
    let password = if from_stdin {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        rpassword::prompt_password("Password: ")?
    };
    Ok(SecretString::from(password))
}
