//! Supervisor configuration management
//!
//! All paths and OS specifics the supervisor touches come in through this
//! configuration, never through module-level constants, so every collaborator
//! can be pointed at a temp directory under test.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub system: SystemSettings,
    #[serde(default)]
    pub install: InstallSettings,
}

/// Where the VirtualHere server lives and how it is launched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Directory the server binary is installed into
    pub install_dir: PathBuf,
    /// Path to the server executable
    pub executable: PathBuf,
    /// Path of the configuration file the server reads at launch
    pub config_path: PathBuf,
    /// Plugin installation directory holding the callback shell scripts
    pub plugin_dir: PathBuf,
    /// Default log filter when RUST_LOG is not set
    pub log_level: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let install_dir = default_data_dir().join("server");
        Self {
            executable: install_dir.join("vhusbdx86_64"),
            config_path: install_dir.join("config.ini"),
            plugin_dir: default_data_dir(),
            install_dir,
            log_level: "info".to_string(),
        }
    }
}

/// OS integration points for power and display state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    /// Sysfs brightness file of the built-in display
    pub brightness_file: PathBuf,
    /// Systemd units masked while a device is bound
    pub sleep_units: Vec<String>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            brightness_file: PathBuf::from("/sys/class/backlight/amdgpu_bl0/brightness"),
            sleep_units: vec![
                "sleep.target".to_string(),
                "suspend.target".to_string(),
                "hibernate.target".to_string(),
                "hybrid-sleep.target".to_string(),
            ],
        }
    }
}

/// Server binary installation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    /// Download the server binary at startup when it is missing
    pub auto_install: bool,
    /// Where to download it from
    pub download_url: String,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            auto_install: true,
            download_url:
                "https://www.virtualhere.com/sites/default/files/usbserver/vhusbdx86_64"
                    .to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        data_dir.join("vh-supervisor")
    } else {
        PathBuf::from("/var/lib/vh-supervisor")
    }
}

impl SupervisorConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref())
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/vh-supervisor/config.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: SupervisorConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("vh-supervisor").join("config.toml")
        } else {
            PathBuf::from(".config/vh-supervisor/config.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.server.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.server.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.system.sleep_units.is_empty() {
            return Err(anyhow!(
                "system.sleep_units must name at least one systemd unit"
            ));
        }
        for unit in &self.system.sleep_units {
            if unit.is_empty() || unit.contains(char::is_whitespace) {
                return Err(anyhow!("Invalid systemd unit name: '{}'", unit));
            }
        }

        if self.install.auto_install && !self.install.download_url.starts_with("http") {
            return Err(anyhow!(
                "Invalid download URL '{}', must be an http(s) URL",
                self.install.download_url
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SupervisorConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert!(config.install.auto_install);
        assert_eq!(config.system.sleep_units.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_executable_lives_under_install_dir() {
        let config = SupervisorConfig::default();
        assert!(config.server.executable.starts_with(&config.server.install_dir));
        assert!(config.server.config_path.starts_with(&config.server.install_dir));
    }

    #[test]
    fn test_config_serialization() {
        let config = SupervisorConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SupervisorConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.server.log_level, parsed.server.log_level);
        assert_eq!(config.system.sleep_units, parsed.system.sleep_units);
        assert_eq!(config.install.download_url, parsed.install.download_url);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SupervisorConfig = toml::from_str(
            r#"
[server]
log_level = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert!(!config.system.sleep_units.is_empty());
        assert!(config.install.auto_install);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = SupervisorConfig::default();
        config.server.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        config.server.log_level = "trace".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_sleep_units() {
        let mut config = SupervisorConfig::default();
        config.system.sleep_units.clear();
        assert!(config.validate().is_err());

        config.system.sleep_units = vec!["sleep.target; rm -rf /".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_download_url() {
        let mut config = SupervisorConfig::default();
        config.install.download_url = "ftp://example.com/vhusbd".to_string();
        assert!(config.validate().is_err());

        // An odd URL is fine when auto-install is off
        config.install.auto_install = false;
        assert!(config.validate().is_ok());
    }
}
