use crate::model::ComponentLogConfiguration;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding agent state such as checkpoints.
    pub work_dir: PathBuf,
    #[serde(default = "default_scan_interval", with = "humantime_serde")]
    pub scan_interval: Duration,
    pub components: Vec<ComponentConfig>,
}

fn default_scan_interval() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    pub directory: PathBuf,
    /// Regex matched against file names (not full paths) in `directory`.
    pub file_name_pattern: String,
}

impl ComponentConfig {
    pub fn to_log_configuration(&self) -> Result<ComponentLogConfiguration, regex::Error> {
        let regex = Regex::new(&self.file_name_pattern)?;
        Ok(ComponentLogConfiguration::new(
            self.name.clone(),
            self.directory.clone(),
            regex,
        ))
    }
}

impl Config {
    /// Compile every component's pattern. Patterns are checked when the config
    /// is loaded, so this only fails for configs built by hand.
    pub fn log_configurations(&self) -> Result<Vec<ComponentLogConfiguration>, regex::Error> {
        self.components
            .iter()
            .map(ComponentConfig::to_log_configuration)
            .collect()
    }
}
