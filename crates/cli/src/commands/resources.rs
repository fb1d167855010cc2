//! Resource browsing commands.

use repair_desk_admin::AppShell;
use repair_desk_core::{
    CreateParams, DeleteManyParams, DeleteParams, GetManyParams, GetManyReferenceParams,
    GetOneParams, Identifier, IdentifiersResult, UpdateManyParams, UpdateParams,
};

use super::{CliError, ListArgs, parse_data};
use crate::output::{self, OutputFormat};

/// List registered resources. Works signed out.
pub fn registered(shell: &AppShell, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            output::print_heading(shell.title());
            for resource in shell.resources() {
                output::print_row(resource.name, resource.label);
            }
        }
        OutputFormat::Json => {
            let resources: Vec<_> = shell
                .resources()
                .iter()
                .map(|r| serde_json::json!({"name": r.name, "label": r.label}))
                .collect();
            output::print_json(&resources);
        }
    }
}

pub async fn list(
    shell: &AppShell,
    resource: &str,
    args: &ListArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    let params = args.to_params()?;
    let result = shell.browse(resource)?.list(&params).await?;
    output::print_records(&result.data, Some(result.total), format);
    Ok(())
}

pub async fn get(shell: &AppShell, resource: &str, id: &str) -> Result<(), CliError> {
    let params = GetOneParams { id: identifier(id) };
    let result = shell.browse(resource)?.get_one(&params).await?;
    output::print_record(&result.data);
    Ok(())
}

pub async fn get_many(
    shell: &AppShell,
    resource: &str,
    ids: &[String],
    format: OutputFormat,
) -> Result<(), CliError> {
    let params = GetManyParams {
        ids: identifiers(ids),
    };
    let result = shell.browse(resource)?.get_many(&params).await?;
    output::print_records(&result.data, None, format);
    Ok(())
}

pub async fn references(
    shell: &AppShell,
    resource: &str,
    target: &str,
    id: &str,
    args: &ListArgs,
    format: OutputFormat,
) -> Result<(), CliError> {
    let params = GetManyReferenceParams {
        target: target.to_string(),
        id: identifier(id),
        list: args.to_params()?,
    };
    let result = shell.browse(resource)?.get_many_reference(&params).await?;
    output::print_records(&result.data, Some(result.total), format);
    Ok(())
}

pub async fn create(shell: &AppShell, resource: &str, data: &str) -> Result<(), CliError> {
    let params = CreateParams {
        data: parse_data(data)?,
    };
    let result = shell.browse(resource)?.create(&params).await?;
    output::print_record(&result.data);
    Ok(())
}

pub async fn update(
    shell: &AppShell,
    resource: &str,
    id: &str,
    data: &str,
) -> Result<(), CliError> {
    let params = UpdateParams {
        id: identifier(id),
        data: parse_data(data)?,
        previous_data: None,
    };
    let result = shell.browse(resource)?.update(&params).await?;
    output::print_record(&result.data);
    Ok(())
}

pub async fn update_many(
    shell: &AppShell,
    resource: &str,
    ids: &[String],
    data: &str,
    format: OutputFormat,
) -> Result<(), CliError> {
    let params = UpdateManyParams {
        ids: identifiers(ids),
        data: parse_data(data)?,
    };
    let result = shell.browse(resource)?.update_many(&params).await?;
    print_identifiers("Updated", &result, format);
    Ok(())
}

pub async fn delete(shell: &AppShell, resource: &str, id: &str) -> Result<(), CliError> {
    let params = DeleteParams {
        id: identifier(id),
        previous_data: None,
    };
    let result = shell.browse(resource)?.delete(&params).await?;
    output::print_record(&result.data);
    Ok(())
}

pub async fn delete_many(
    shell: &AppShell,
    resource: &str,
    ids: &[String],
    format: OutputFormat,
) -> Result<(), CliError> {
    let params = DeleteManyParams {
        ids: identifiers(ids),
    };
    let result = shell.browse(resource)?.delete_many(&params).await?;
    print_identifiers("Deleted", &result, format);
    Ok(())
}

/// Identifiers typed on the command line are `documentId`s, so always text.
fn identifier(raw: &str) -> Identifier {
    Identifier::from(raw)
}

fn identifiers(raw: &[String]) -> Vec<Identifier> {
    raw.iter().map(|id| identifier(id)).collect()
}

fn print_identifiers(verb: &str, result: &IdentifiersResult, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            let ids: Vec<String> = result.data.iter().map(ToString::to_string).collect();
            output::print_success(&format!("{verb} {} record(s): {}", ids.len(), ids.join(", ")), format);
        }
        OutputFormat::Json => output::print_json(result),
    }
}
