use super::types::Config;
use super::{env_var_regex, expand_env_vars, expand_tilde};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse and validate a config from YAML text.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand $env{VAR} before YAML sees the text
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    // Parse, then resolve ~ in paths
    let mut config: Config = serde_yaml::from_str(&yaml_string)?;
    expand_paths(&mut config);

    // Collect every validation problem before failing
    validate_config(&config)?;

    Ok(config)
}

fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = env_var_regex()
        .captures_iter(yaml_string)
        .map(|cap| cap[1].to_string())
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unexpanded_vars.join(", ")
    )))
}

fn expand_paths(config: &mut Config) {
    config.work_dir = expand_tilde(&config.work_dir);
    for component in &mut config.components {
        component.directory = expand_tilde(&component.directory);
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    // Top-level settings
    if config.work_dir.as_os_str().is_empty() {
        errors.push("work_dir cannot be empty".to_string());
    }

    if config.scan_interval.is_zero() {
        errors.push("scan_interval must be greater than zero".to_string());
    }

    if config.components.is_empty() {
        errors.push("config must define at least one component".to_string());
    }

    // Per-component checks
    let mut names = HashSet::new();
    for (i, component) in config.components.iter().enumerate() {
        let prefix = format!("components[{}]", i);

        if component.name.is_empty() {
            errors.push(format!("{}: name cannot be empty", prefix));
        } else if !names.insert(component.name.as_str()) {
            errors.push(format!("{}: duplicate component name '{}'", prefix, component.name));
        }

        if component.directory.as_os_str().is_empty() {
            errors.push(format!("{}: directory cannot be empty", prefix));
        }

        // Pattern must compile now rather than on the first scan
        if component.file_name_pattern.is_empty() {
            errors.push(format!("{}: file_name_pattern cannot be empty", prefix));
        } else if let Err(e) = Regex::new(&component.file_name_pattern) {
            errors.push(format!("{}: invalid file_name_pattern: {}", prefix, e));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const VALID: &str = r#"
work_dir: /var/lib/logmanager
scan_interval: 10s
components:
  - name: greengrass
    directory: /greengrass/v2/logs
    file_name_pattern: '^greengrass\.log\w*$'
  - name: sensor
    directory: /var/log/sensor
    file_name_pattern: '^sensor\.log'
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_config(VALID).unwrap();
        assert_eq!(config.components.len(), 2);
        assert_eq!(config.scan_interval, Duration::from_secs(10));
        assert_eq!(config.components[0].name, "greengrass");

        let logs = config.log_configurations().unwrap();
        assert!(logs[0].matches("greengrass.log_1"));
        assert!(!logs[0].matches("sensor.log"));
    }

    #[test]
    fn test_scan_interval_defaults() {
        let yaml = r#"
work_dir: /tmp/work
components:
  - name: a
    directory: /tmp/a
    file_name_pattern: 'a'
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.scan_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let yaml = r#"
work_dir: /tmp/work
components:
  - name: dup
    directory: /tmp/a
    file_name_pattern: '(unclosed'
  - name: dup
    directory: ''
    file_name_pattern: 'ok'
"#;
        let err = parse_config(yaml).unwrap_err();
        match err {
            ConfigError::ValidationList(errors) => {
                assert_eq!(errors.len(), 3, "{:?}", errors);
                assert!(errors.iter().any(|e| e.contains("invalid file_name_pattern")));
                assert!(errors.iter().any(|e| e.contains("duplicate component name 'dup'")));
                assert!(errors.iter().any(|e| e.contains("directory cannot be empty")));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_no_components_is_invalid() {
        let yaml = "work_dir: /tmp/work\ncomponents: []\n";
        assert!(matches!(
            parse_config(yaml),
            Err(ConfigError::ValidationList(_))
        ));
    }

    #[test]
    fn test_unexpanded_env_var_is_reported() {
        let yaml = r#"
work_dir: $env{LOGMANAGER_TEST_SURELY_UNSET}
components:
  - name: a
    directory: /tmp/a
    file_name_pattern: 'a'
"#;
        let err = parse_config(yaml).unwrap_err();
        assert!(err.to_string().contains("LOGMANAGER_TEST_SURELY_UNSET"));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/logmanager/config.yml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
