//! Document management CLI commands.

use std::path::PathBuf;

use bytes::Bytes;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use planroom_core::error::{AppError, ErrorKind};
use planroom_core::types::FileId;
use planroom_entity::file::{FileFilter, FileRecord};
use planroom_service::file::UploadParams;
use planroom_service::file::naming::parse_tags;
use planroom_storage::mime::mime_from_path;

use crate::output::{self, OutputFormat};

/// Arguments for file commands
#[derive(Debug, Args)]
pub struct FilesArgs {
    /// File subcommand
    #[command(subcommand)]
    pub command: FilesCommand,
}

/// File subcommands
#[derive(Debug, Subcommand)]
pub enum FilesCommand {
    /// List the latest version of every document
    List {
        /// Search names and descriptions
        #[arg(short, long)]
        search: Option<String>,
        /// Only documents with this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Show every version of a document
    Versions {
        /// Base name (file name without extension)
        base_name: String,
    },
    /// Upload a file as a new version
    Upload {
        /// Path to the file
        path: PathBuf,
        /// Description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,
        /// Uploader name
        #[arg(long)]
        uploaded_by: Option<String>,
    },
    /// Make a version the latest again
    Rollback {
        /// Record ID
        id: String,
    },
    /// Delete a version, or the whole document
    Delete {
        /// Record ID
        id: String,
        /// Delete every version of the document
        #[arg(long)]
        all_versions: bool,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// File display row
#[derive(Debug, Serialize, Tabled)]
struct FileRow {
    /// Record ID
    id: String,
    /// File name
    name: String,
    /// Version label
    version: String,
    /// Latest marker
    latest: String,
    /// Size
    size: String,
    /// Uploader
    uploaded_by: String,
    /// Upload time
    uploaded_at: String,
    /// Tags
    tags: String,
}

impl From<&FileRecord> for FileRow {
    fn from(record: &FileRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.original_name.clone(),
            version: record.version_label(),
            latest: if record.is_latest { "*" } else { "" }.to_string(),
            size: output::human_size(record.size_bytes),
            uploaded_by: record.uploaded_by.clone(),
            uploaded_at: record.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
            tags: record.tags.join(", "),
        }
    }
}

fn parse_id(raw: &str) -> Result<FileId, AppError> {
    uuid::Uuid::parse_str(raw)
        .map(FileId::from_uuid)
        .map_err(|_| AppError::validation(format!("Invalid file id: {raw}")))
}

/// Execute file commands
pub async fn execute(args: &FilesArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let state = super::open_state(env).await?;

    match &args.command {
        FilesCommand::List { search, tag } => {
            let filter = FileFilter {
                search: search.clone(),
                tag: tag.clone(),
            };
            let files = state.file_service.list(&filter).await?;
            match format {
                OutputFormat::Json => output::print_item(&files, format),
                OutputFormat::Table => {
                    let rows: Vec<FileRow> = files.iter().map(|f| FileRow::from(&f.record)).collect();
                    output::print_list(&rows, format);
                }
            }
        }
        FilesCommand::Versions { base_name } => {
            let history = state.version_service.list_versions(base_name).await?;
            let rows: Vec<FileRow> = history.versions.iter().map(FileRow::from).collect();
            output::print_list(&rows, format);
        }
        FilesCommand::Upload {
            path,
            description,
            tags,
            uploaded_by,
        } => {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| AppError::validation(format!("Not a file: {}", path.display())))?
                .to_string();
            let data = tokio::fs::read(path).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Validation,
                    format!("Failed to read {}", path.display()),
                    e,
                )
            })?;

            let change = state
                .upload_service
                .upload(UploadParams {
                    content_type: mime_from_path(&file_name),
                    file_name,
                    data: Bytes::from(data),
                    description: description.clone(),
                    tags: parse_tags(tags)?,
                    uploaded_by: uploaded_by.clone(),
                })
                .await?;

            output::print_success(&format!(
                "Uploaded '{}' as version {}",
                change.record.original_name,
                change.record.version_label()
            ));
            output::print_item(&change.record, format);
        }
        FilesCommand::Rollback { id } => {
            let change = state.version_service.rollback(parse_id(id)?).await?;
            match change.replaced_version {
                Some(previous) => output::print_success(&format!(
                    "'{}' rolled back from v{} to v{}",
                    change.record.base_name, previous, change.record.version
                )),
                None => output::print_warning(&format!(
                    "Version {} of '{}' is already the latest",
                    change.record.version, change.record.base_name
                )),
            }
        }
        FilesCommand::Delete {
            id,
            all_versions,
            yes,
        } => {
            let id = parse_id(id)?;
            let record = state.file_service.get(id).await?;

            if !yes {
                let prompt = if *all_versions {
                    format!("Delete ALL versions of '{}'?", record.base_name)
                } else {
                    format!(
                        "Delete version {} of '{}'?",
                        record.version, record.base_name
                    )
                };
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(prompt)
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;
                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let removed = state.file_service.delete(id, *all_versions).await?;
            output::print_success(&format!("Deleted {} record(s)", removed.len()));
        }
    }

    Ok(())
}
