pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# LOGMANAGER CONFIGURATION
# =============================================================================
# Describes which components' log files are tracked and where checkpoint
# state is kept.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/logmanager/config.yml
#   3. /etc/logmanager/config.yml
#
# Paths may start with ~ and may reference environment variables with
# $env{NAME}.

# Directory for agent state. Checkpoints are written to <work_dir>/checkpoints.
work_dir: ~/.local/state/logmanager

# How often `logmanager watch` rescans every component.
scan_interval: 30s

# =============================================================================
# COMPONENTS
# =============================================================================
# Each component names a directory and a regex matched against file names in
# it. The regex must match the active file and all of its rotated variants.

components:
  - name: greengrass
    directory: /greengrass/v2/logs
    file_name_pattern: '^greengrass\.log\w*$'

  - name: application
    directory: /var/log/app
    file_name_pattern: '^app\.log(\.\d+)?$'
"#
    .to_string()
}
