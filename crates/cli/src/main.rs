//! Repair Desk CLI - operator console for the repair-shop backend.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password is prompted without echo)
//! rd-cli login -u admin
//!
//! # Browse customers, newest first, filtered by name
//! rd-cli list customers --sort createdAt:DESC --filter name=สมชาย
//!
//! # Update a unit
//! rd-cli update units k2x9 --data '{"name":"กล่อง"}'
//!
//! # Inspect or wipe the stored session
//! rd-cli session show
//! rd-cli session clear
//! ```
//!
//! Configuration comes from the environment; see `repair_desk_admin::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use repair_desk_admin::{AdminConfig, AppShell};

mod commands;
mod output;
mod telemetry;

use commands::{CliError, ListArgs};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "rd-cli")]
#[command(author, version, about = "Repair Desk admin console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with username/email and password
    Login {
        /// Username or email (prompted if omitted)
        #[arg(short = 'u', long)]
        identifier: Option<String>,

        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Create a backend account
    Register {
        /// Username
        #[arg(short = 'u', long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },
    /// Inspect the stored session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// List registered resources
    Resources,
    /// List records of a resource
    List {
        resource: String,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show one record
    Get { resource: String, id: String },
    /// Show several records by id
    GetMany {
        resource: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// List records referencing another record
    Refs {
        resource: String,
        /// Relation field on `resource`
        #[arg(long)]
        target: String,
        /// documentId the relation must point at
        #[arg(long)]
        id: String,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Create a record
    Create {
        resource: String,
        /// Record fields as a JSON object
        #[arg(long)]
        data: String,
    },
    /// Update a record
    Update {
        resource: String,
        id: String,
        /// Changed fields as a JSON object
        #[arg(long)]
        data: String,
    },
    /// Apply the same change to several records
    UpdateMany {
        resource: String,
        #[arg(required = true)]
        ids: Vec<String>,
        /// Changed fields as a JSON object
        #[arg(long)]
        data: String,
    },
    /// Delete a record
    Delete { resource: String, id: String },
    /// Delete several records
    DeleteMany {
        resource: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show what is stored on disk
    Show,
    /// Remove the stored session
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.format;

    let config = match AdminConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&CliError::from(e).user_message(), format);
            return ExitCode::FAILURE;
        }
    };

    // Sentry first so the tracing layer has a client to report to
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing();

    match run(cli.command, &config, format).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            output::print_error(&e.user_message(), format);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &AdminConfig, format: OutputFormat) -> Result<(), CliError> {
    // Session inspection works on the file directly, without rehydrating
    if let Commands::Session { action } = &command {
        match action {
            SessionAction::Show => commands::session::show(&config.state_dir, format),
            SessionAction::Clear => commands::session::clear(&config.state_dir, format),
        }
        return Ok(());
    }

    let shell = AppShell::from_config(config)?;
    tracing::debug!(view = ?shell.view(), "Console started");

    match command {
        Commands::Login {
            identifier,
            password_stdin,
        } => commands::auth::login(&shell, identifier, password_stdin, format).await?,
        Commands::Logout => commands::auth::logout(&shell, format),
        Commands::Whoami => commands::auth::whoami(&shell, format)?,
        Commands::Register {
            username,
            email,
            password_stdin,
        } => commands::auth::register(&shell, &username, &email, password_stdin, format).await?,
        Commands::Resources => commands::resources::registered(&shell, format),
        Commands::List { resource, list } => {
            commands::resources::list(&shell, &resource, &list, format).await?;
        }
        Commands::Get { resource, id } => commands::resources::get(&shell, &resource, &id).await?,
        Commands::GetMany { resource, ids } => {
            commands::resources::get_many(&shell, &resource, &ids, format).await?;
        }
        Commands::Refs {
            resource,
            target,
            id,
            list,
        } => {
            commands::resources::references(&shell, &resource, &target, &id, &list, format)
                .await?;
        }
        Commands::Create { resource, data } => {
            commands::resources::create(&shell, &resource, &data).await?;
        }
        Commands::Update { resource, id, data } => {
            commands::resources::update(&shell, &resource, &id, &data).await?;
        }
        Commands::UpdateMany {
            resource,
            ids,
            data,
        } => commands::resources::update_many(&shell, &resource, &ids, &data, format).await?,
        Commands::Delete { resource, id } => {
            commands::resources::delete(&shell, &resource, &id).await?;
        }
        Commands::DeleteMany { resource, ids } => {
            commands::resources::delete_many(&shell, &resource, &ids, format).await?;
        }
        Commands::Session { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_flags() {
        let cli = Cli::try_parse_from([
            "rd-cli",
            "--format",
            "json",
            "list",
            "customers",
            "--page",
            "2",
            "--filter",
            "name=foo",
            "--filter",
            "age=5",
        ])
        .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::List { resource, list } = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(resource, "customers");
        assert_eq!(list.page, Some(2));
        assert_eq!(list.filters, vec!["name=foo", "age=5"]);
    }
}
