use crate::config::{load_config, resolve_config_path, ConfigError};
use crate::model::{ComponentLogConfiguration, LogFile, LogFileGroup};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::signal;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error(
        "config not found; searched ~/.config/logmanager/config.yml and /etc/logmanager/config.yml \
         (use --config <path> or run 'logmanager config init')"
    )]
    ConfigNotFound,

    #[error("invalid file name pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("scan task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of scanning one component.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ComponentReport {
    Scanned(GroupSummary),
    Failed { component: String, error: String },
}

#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub component: String,
    pub last_processed: DateTime<Utc>,
    pub active: Option<String>,
    pub pending_bytes: u64,
    pub unprocessed: Vec<FileSummary>,
    pub processed: Vec<FileSummary>,
}

#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub identity: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub start_offset: u64,
}

impl FileSummary {
    fn new(group: &LogFileGroup, file: &LogFile) -> Self {
        Self {
            name: file.name().to_string(),
            identity: file.identity().to_string(),
            size: file.size(),
            last_modified: file.last_modified(),
            start_offset: group.start_offset(file),
        }
    }
}

impl GroupSummary {
    pub fn from_group(group: &LogFileGroup) -> Self {
        Self {
            component: group.component_name().to_string(),
            last_processed: group.last_processed(),
            active: group.active_file().map(|f| f.name().to_string()),
            pending_bytes: group.pending_bytes(),
            unprocessed: group
                .unprocessed_files()
                .iter()
                .map(|f| FileSummary::new(group, f))
                .collect(),
            processed: group
                .processed_files()
                .iter()
                .map(|f| FileSummary::new(group, f))
                .collect(),
        }
    }
}

/// Scan every component once, in order. A failing component does not stop
/// the others.
pub fn scan_components(components: &[ComponentLogConfiguration], work_dir: &Path) -> Vec<ComponentReport> {
    components
        .iter()
        .map(|component| match LogFileGroup::create_from_checkpoint(component, work_dir) {
            Ok(group) => {
                info!(
                    component = %group.component_name(),
                    unprocessed = group.unprocessed_files().len(),
                    processed = group.processed_files().len(),
                    pending_bytes = group.pending_bytes(),
                    "Scanned component"
                );
                ComponentReport::Scanned(GroupSummary::from_group(&group))
            }
            Err(e) => {
                error!(component = %component.component_name(), error = %e, "Scan failed");
                ComponentReport::Failed {
                    component: component.component_name().to_string(),
                    error: e.to_string(),
                }
            }
        })
        .collect()
}

fn load(
    config_path: Option<PathBuf>,
) -> Result<(PathBuf, Vec<ComponentLogConfiguration>, Duration), RunError> {
    // Resolve config path
    let path = resolve_config_path(config_path.as_deref()).ok_or(RunError::ConfigNotFound)?;
    info!(config_path = %path.display(), "Loading configuration");

    // Load and validate, then compile component patterns
    let config = load_config(&path)?;
    let components = config.log_configurations()?;
    Ok((config.work_dir, components, config.scan_interval))
}

/// Scan once and print the result.
pub fn scan(config_path: Option<PathBuf>, json: bool) -> Result<(), RunError> {
    let (work_dir, components, _) = load(config_path)?;
    let reports = scan_components(&components, &work_dir);

    // Output results
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }
    Ok(())
}

/// Rescan all components every scan interval until Ctrl-C.
pub async fn watch(config_path: Option<PathBuf>) -> Result<(), RunError> {
    let (work_dir, components, scan_interval) = load(config_path)?;
    info!(
        components = components.len(),
        interval = ?scan_interval,
        "Watching log directories"
    );

    // First tick fires immediately
    let mut ticker = tokio::time::interval(scan_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Directory scans block, keep them off the runtime threads
                let components = components.clone();
                let work_dir = work_dir.clone();
                tokio::task::spawn_blocking(move || scan_components(&components, &work_dir)).await?;
            }
            _ = signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    Ok(())
}

fn print_report(report: &ComponentReport) {
    match report {
        ComponentReport::Failed { component, error } => {
            println!("{}: scan failed: {}", component, error);
        }
        ComponentReport::Scanned(summary) => {
            println!(
                "{}: {} unprocessed, {} processed, {} bytes pending (last processed {})",
                summary.component,
                summary.unprocessed.len(),
                summary.processed.len(),
                summary.pending_bytes,
                summary.last_processed.to_rfc3339(),
            );
            for file in &summary.unprocessed {
                let marker = if summary.active.as_deref() == Some(file.name.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!(
                    "  {} {:<40} {:>10} B  from {:>10}  {}",
                    marker,
                    file.name,
                    file.size,
                    file.start_offset,
                    file.last_modified.to_rfc3339()
                );
            }
        }
    }
}
