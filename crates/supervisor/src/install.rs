//! Server binary installation
//!
//! The VirtualHere server is third-party and not packaged; it is downloaded
//! straight from the vendor on first start. Everything else in the
//! supervisor assumes installation already happened and only deals with the
//! returned executable path.

use crate::config::SupervisorConfig;
use common::{Error, Result};
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info};

/// Makes sure the server executable exists, returning its path
pub trait BinaryInstaller {
    fn ensure_installed(&self) -> impl Future<Output = Result<PathBuf>> + Send;
}

/// Downloads the server binary from the vendor when it is missing
pub struct HttpInstaller {
    url: String,
    install_dir: PathBuf,
    executable: PathBuf,
}

impl HttpInstaller {
    pub fn new(url: String, install_dir: PathBuf, executable: PathBuf) -> Self {
        Self {
            url,
            install_dir,
            executable,
        }
    }

    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::new(
            config.install.download_url.clone(),
            config.server.install_dir.clone(),
            config.server.executable.clone(),
        )
    }
}

impl BinaryInstaller for HttpInstaller {
    async fn ensure_installed(&self) -> Result<PathBuf> {
        if self.executable.exists() {
            debug!(
                "Server already installed at {}",
                self.executable.display()
            );
            return Ok(self.executable.clone());
        }

        info!("Installing VirtualHere server from {}", self.url);
        tokio::fs::create_dir_all(&self.install_dir).await?;

        let response = reqwest::get(&self.url)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Other(format!("server download failed: {}", e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Other(format!("server download failed: {}", e)))?;

        tokio::fs::write(&self.executable, &bytes).await?;

        // The vendor ships a bare binary; it has to be made executable.
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(
                &self.executable,
                std::fs::Permissions::from_mode(0o755),
            )
            .await?;
        }

        info!(
            "Installed VirtualHere server to {}",
            self.executable.display()
        );
        Ok(self.executable.clone())
    }
}
