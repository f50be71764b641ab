//! `rollcall inspect` and `rollcall validate`.

use std::path::PathBuf;

use rollcall_io::SheetSelector;
use rollcall_recon::model::{ColumnRole, StatusKey};
use rollcall_recon::normalize::{normalize, NormalizeOptions, NormalizeWarning};
use serde::Serialize;

use crate::exit_codes::EXIT_IO;
use crate::settings::Settings;
use crate::CliError;

#[derive(Debug, Serialize)]
struct ColumnView {
    source: String,
    name: String,
    role: &'static str,
}

#[derive(Debug, Serialize)]
struct InspectView {
    file: String,
    rows: usize,
    columns: Vec<ColumnView>,
    identity: Option<String>,
    display: Option<String>,
    status_columns: usize,
    warnings: Vec<NormalizeWarning>,
}

fn role_label(role: &ColumnRole) -> &'static str {
    match role {
        ColumnRole::Identity => "identity",
        ColumnRole::Display => "display",
        ColumnRole::Status(StatusKey::Date(_)) => "status",
        ColumnRole::Status(StatusKey::Label(_)) => "status (unparsed date)",
        ColumnRole::Inert(_) => "ignored",
    }
}

pub fn cmd_inspect(file: PathBuf, sheet: Option<String>, positional_fallback: bool, json: bool) -> Result<(), CliError> {
    let selector = match sheet {
        Some(name) => SheetSelector::Named(name),
        None => SheetSelector::First,
    };
    let raw = rollcall_io::load(&file, &selector)?;
    let rows = raw.row_count();

    let normalized = normalize(raw, &NormalizeOptions { positional_fallback });
    let table = &normalized.table;

    let columns: Vec<ColumnView> = table
        .columns()
        .iter()
        .map(|c| ColumnView {
            source: c.source.clone(),
            name: c.name(),
            role: role_label(&c.role),
        })
        .collect();

    let view = InspectView {
        file: file.display().to_string(),
        rows,
        identity: table.identity_position().map(|i| table.column(i).source.clone()),
        display: table.display_position().map(|i| table.column(i).source.clone()),
        status_columns: table.status_columns().count(),
        columns,
        warnings: normalized.warnings.clone(),
    };

    if json {
        let json_str = serde_json::to_string_pretty(&view)
            .map_err(|e| CliError::new(EXIT_IO, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    println!("{} ({} rows)", view.file, view.rows);
    let width = view.columns.iter().map(|c| c.source.chars().count()).max().unwrap_or(0);
    for column in &view.columns {
        println!("  {:<width$}  ->  {:<20} {}", column.source, column.name, column.role, width = width);
    }
    match &view.identity {
        Some(source) => println!("identity: {source}"),
        None => println!("identity: not found (use --id-column with `run`, or --positional-fallback)"),
    }
    match &view.display {
        Some(source) => println!("name:     {source}"),
        None => println!("name:     not found"),
    }
    println!("status columns: {}", view.status_columns);
    for warning in &view.warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let settings = Settings::from_file(&config_path)?;
    let config = &settings.config;

    let backend = match &config.backend.file {
        Some(file) => settings.resolve(file).display().to_string(),
        None => format!(
            "{}/{}.*",
            settings.resolve(&config.backend.dir).display(),
            config.backend.stem
        ),
    };
    eprintln!(
        "valid: '{}' (backend {} sheet '{}', submission sheet '{}', duplicates: {}, report {})",
        config.name,
        backend,
        config.backend.sheet,
        config.submission.sheet,
        config.policy.on_duplicate,
        config.output.report,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::EXIT_INVALID_CONFIG;
    use tempfile::tempdir;

    #[test]
    fn role_labels() {
        assert_eq!(role_label(&ColumnRole::Identity), "identity");
        assert_eq!(role_label(&ColumnRole::Inert("Dept".into())), "ignored");
        assert_eq!(role_label(&ColumnRole::Status(StatusKey::Label("Status (x)".into()))), "status (unparsed date)");
    }

    #[test]
    fn validate_rejects_bad_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rollcall.toml");
        std::fs::write(&path, "[output]\nreport = \"out.pdf\"\n").unwrap();

        let err = cmd_validate(path).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
    }

    #[test]
    fn validate_missing_file_is_io() {
        let dir = tempdir().unwrap();
        let err = cmd_validate(dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.code, EXIT_IO);
    }
}
