//! Server process lifecycle
//!
//! Owns the VirtualHere server child process: writes the configuration the
//! server reads at launch, spawns it with the callback port in its
//! environment, kills it on stop (the server has no graceful-shutdown
//! protocol), and restarts it preserving the callback port.

use common::{Error, Result};
use events::{CallbackCommands, EVENTS_HANDLER_PORT_ENV};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

pub struct ServerProcess {
    executable: PathBuf,
    config_path: PathBuf,
    commands: CallbackCommands,
    child: Option<Child>,
    callback_port: Option<u16>,
}

impl ServerProcess {
    pub fn new(executable: PathBuf, config_path: PathBuf, plugin_dir: &Path) -> Self {
        Self {
            executable,
            config_path,
            commands: CallbackCommands::for_plugin_dir(plugin_dir),
            child: None,
            callback_port: None,
        }
    }

    /// Write the server configuration and launch the server process
    ///
    /// The configuration is written fresh on every start so the callback
    /// command templates always match this installation. The callback port
    /// travels in the `VIRTUALHERE_SERVER_EVENTS_HANDLER_PORT` environment
    /// variable, where the callback shell scripts pick it up.
    pub async fn start(&mut self, callback_port: u16) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.config_path, self.commands.render_ini()).await?;

        let mut child = Command::new(&self.executable)
            .env(EVENTS_HANDLER_PORT_ENV, callback_port.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Launch(format!(
                    "failed to launch {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        // The server chatters on stdout; drain it into the log so the pipe
        // never fills up.
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(stderr, "stderr"));
        }

        info!(
            pid = child.id(),
            callback_port, "Server process started"
        );
        self.child = Some(child);
        self.callback_port = Some(callback_port);
        Ok(())
    }

    /// Forcibly terminate the server process
    ///
    /// Clears the stored callback port only when `release_port`; a restart
    /// passes false so the relaunched server keeps posting to the same
    /// listener. No-op when no process is running.
    pub async fn stop(&mut self, release_port: bool) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();
        if let Err(e) = child.kill().await {
            warn!(pid, "Failed to kill server process: {}", e);
        } else {
            info!(pid, "Server process stopped");
        }
        if release_port {
            self.callback_port = None;
        }
    }

    /// Stop and relaunch with the same callback port
    ///
    /// The server needs a restart to reset its internal state after a client
    /// disconnects; that is a contract of the server, not an optimization
    /// here. No-op when no process is running. The executable is not
    /// re-verified before relaunch; a binary that vanished since the first
    /// start surfaces as a launch error from the spawn itself.
    pub async fn restart(&mut self) -> Result<()> {
        if self.child.is_none() {
            return Ok(());
        }
        let Some(port) = self.callback_port else {
            return Ok(());
        };
        debug!("Restarting server process on callback port {}", port);
        self.stop(false).await;
        self.start(port).await
    }

    /// True iff a process handle is held
    ///
    /// Reflects "was started", not "still running": liveness is never
    /// re-verified after launch, so a crashed server stays "up" until the
    /// next stop.
    pub fn is_up(&self) -> bool {
        self.child.is_some()
    }

    /// Callback port the current (or last, if stopped without release)
    /// process was started with
    pub fn callback_port(&self) -> Option<u16> {
        self.callback_port
    }
}

async fn forward_output<R>(output: R, label: &'static str)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut lines = BufReader::new(output).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "vh_server", "[{}] {}", label, line);
    }
}
