//! System power and display state
//!
//! Production implementations of the capability traits (systemd sleep
//! masking, sysfs backlight) and [`SystemState`], the wrapper that gives the
//! supervisor its dim/restore pairing with one-shot brightness restore.

use crate::config::SystemSettings;
use common::{DisplayDimmer, Error, Result, SleepInhibitor};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

/// Brightness value written while a device is bound
pub const MINIMUM_BRIGHTNESS: &str = "0";

/// Masks systemd sleep targets to keep the host awake
///
/// Masking survives the supervisor process, which is exactly what is wanted:
/// a crash mid-session leaves the host awake for the remote client rather
/// than suspending under it. `stop()` unmasks defensively.
#[derive(Debug, Clone)]
pub struct SystemdSleepInhibitor {
    units: Vec<String>,
}

impl SystemdSleepInhibitor {
    pub fn new(units: Vec<String>) -> Self {
        Self { units }
    }

    fn systemctl(&self, verb: &str) -> Result<()> {
        let status = Command::new("systemctl")
            .arg(verb)
            .args(&self.units)
            .status()
            .map_err(|e| Error::Other(format!("failed to run systemctl {}: {}", verb, e)))?;

        if !status.success() {
            return Err(Error::Other(format!(
                "systemctl {} exited with {}",
                verb, status
            )));
        }

        debug!("systemctl {} {}", verb, self.units.join(" "));
        Ok(())
    }
}

impl SleepInhibitor for SystemdSleepInhibitor {
    fn inhibit(&self) -> Result<()> {
        self.systemctl("mask")
    }

    fn allow(&self) -> Result<()> {
        self.systemctl("unmask")
    }
}

/// Reads and writes the display brightness through a sysfs file
#[derive(Debug, Clone)]
pub struct SysfsBacklight {
    path: PathBuf,
}

impl SysfsBacklight {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DisplayDimmer for SysfsBacklight {
    fn read(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    fn write(&self, value: &str) -> Result<()> {
        Ok(fs::write(&self.path, value)?)
    }
}

/// Power/display state owned by the supervisor
///
/// Holds the brightness snapshot explicitly: it is set exactly while the
/// display is dimmed, and [`SystemState::restore_brightness`] is a no-op
/// otherwise. The supervisor keeps the snapshot single-slot by always
/// pairing dim with restore across bind/unbind.
pub struct SystemState {
    inhibitor: Box<dyn SleepInhibitor>,
    dimmer: Box<dyn DisplayDimmer>,
    brightness_snapshot: Option<String>,
}

impl SystemState {
    pub fn new(inhibitor: Box<dyn SleepInhibitor>, dimmer: Box<dyn DisplayDimmer>) -> Self {
        Self {
            inhibitor,
            dimmer,
            brightness_snapshot: None,
        }
    }

    /// Production capabilities for the configured OS integration points
    pub fn from_settings(settings: &SystemSettings) -> Self {
        Self::new(
            Box::new(SystemdSleepInhibitor::new(settings.sleep_units.clone())),
            Box::new(SysfsBacklight::new(settings.brightness_file.clone())),
        )
    }

    /// Disable system sleep/suspend/hibernate transitions. Idempotent.
    pub fn inhibit_sleep(&self) -> Result<()> {
        info!("Inhibiting system sleep");
        self.inhibitor.inhibit()
    }

    /// Reverse sleep inhibition. Idempotent.
    pub fn allow_sleep(&self) -> Result<()> {
        info!("Allowing system sleep");
        self.inhibitor.allow()
    }

    /// Snapshot the current brightness, then dim to minimum
    pub fn dim_to_minimum(&mut self) -> Result<()> {
        let previous = self.dimmer.read()?;
        self.dimmer.write(MINIMUM_BRIGHTNESS)?;
        debug!(previous = previous.trim(), "Display dimmed to minimum");
        self.brightness_snapshot = Some(previous);
        Ok(())
    }

    /// Write the snapshot back and clear it; no-op without a snapshot
    pub fn restore_brightness(&mut self) -> Result<()> {
        if let Some(previous) = &self.brightness_snapshot {
            self.dimmer.write(previous)?;
            debug!(restored = previous.trim(), "Display brightness restored");
            self.brightness_snapshot = None;
        }
        Ok(())
    }

    /// True while a dim is pending restore
    pub fn has_snapshot(&self) -> bool {
        self.brightness_snapshot.is_some()
    }
}
