use crate::config::generate::generate_starter_config;
use crate::config::{system_config_path, user_config_path};
use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = target_path();
    if config_path.exists() {
        return Err(format!(
            "config file already exists at {}; remove it first or use --stdout",
            config_path.display()
        )
        .into());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_path, config_content)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

/// `~/.config/logmanager/config.yml` when its directory can be created,
/// otherwise `/etc/logmanager/config.yml`.
fn target_path() -> PathBuf {
    let user_config = user_config_path().and_then(|path| {
        let parent = path.parent()?.to_path_buf();
        match fs::create_dir_all(&parent) {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(
                    directory = %parent.display(),
                    error = %e,
                    "Could not create user config directory, falling back to /etc/logmanager"
                );
                None
            }
        }
    });

    user_config.unwrap_or_else(system_config_path)
}
