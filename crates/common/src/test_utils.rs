//! Test utilities for vh-supervisor
//!
//! Provides recording fakes for the capability traits, sample events, and
//! helpers for testing against a stub server executable.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{FakeSleepInhibitor, sample_bind_event};
//! use common::SleepInhibitor;
//!
//! let inhibitor = FakeSleepInhibitor::new();
//! inhibitor.inhibit().unwrap();
//! assert!(inhibitor.is_inhibited());
//!
//! let event = sample_bind_event();
//! assert_eq!(event.client_ip, "10.0.0.5");
//! ```

use crate::error::{Error, Result};
use crate::system::{DisplayDimmer, SleepInhibitor};
use events::{BindEvent, UnbindEvent};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a future with a timeout, panicking if it does not complete in time
pub async fn with_timeout<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(DEFAULT_TEST_TIMEOUT, future)
        .await
        .expect("test timed out")
}

#[derive(Debug, Default)]
struct SleepState {
    inhibited: bool,
    inhibit_calls: usize,
    allow_calls: usize,
}

/// Recording fake for [`SleepInhibitor`]
///
/// Clones share state, so a clone can be handed to the code under test while
/// the original stays behind for assertions.
#[derive(Debug, Clone, Default)]
pub struct FakeSleepInhibitor {
    state: Arc<Mutex<SleepState>>,
}

impl FakeSleepInhibitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the last call was an inhibit
    pub fn is_inhibited(&self) -> bool {
        self.state.lock().unwrap().inhibited
    }

    pub fn inhibit_calls(&self) -> usize {
        self.state.lock().unwrap().inhibit_calls
    }

    pub fn allow_calls(&self) -> usize {
        self.state.lock().unwrap().allow_calls
    }
}

impl SleepInhibitor for FakeSleepInhibitor {
    fn inhibit(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.inhibited = true;
        state.inhibit_calls += 1;
        Ok(())
    }

    fn allow(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.inhibited = false;
        state.allow_calls += 1;
        Ok(())
    }
}

/// In-memory fake for [`DisplayDimmer`]
#[derive(Debug, Clone)]
pub struct FakeBacklight {
    level: Arc<Mutex<String>>,
}

impl FakeBacklight {
    pub fn new(initial: &str) -> Self {
        Self {
            level: Arc::new(Mutex::new(initial.to_string())),
        }
    }

    /// Current brightness value as the device would report it
    pub fn level(&self) -> String {
        self.level.lock().unwrap().clone()
    }
}

impl DisplayDimmer for FakeBacklight {
    fn read(&self) -> Result<String> {
        Ok(self.level())
    }

    fn write(&self, value: &str) -> Result<()> {
        *self.level.lock().unwrap() = value.to_string();
        Ok(())
    }
}

/// A brightness device that cannot be opened
///
/// Used to test that dim failures surface as IO errors without blocking
/// sleep inhibition.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreadableBacklight;

impl DisplayDimmer for UnreadableBacklight {
    fn read(&self) -> Result<String> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "brightness device inaccessible",
        )))
    }

    fn write(&self, _value: &str) -> Result<()> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "brightness device inaccessible",
        )))
    }
}

/// Write a stub server executable into `dir` and return its path
///
/// The stub just sleeps until killed, which is all the process-lifecycle
/// tests need from a child.
pub fn write_stub_server(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("vhusbd-stub");
    std::fs::write(&path, "#!/bin/sh\nexec sleep 600\n").expect("write stub server");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod stub server");
    path
}

/// A bind event with the field values used throughout the test suites
pub fn sample_bind_event() -> BindEvent {
    BindEvent {
        vendor_id: "046d".to_string(),
        product_id: "c52b".to_string(),
        client_ip: "10.0.0.5".to_string(),
        connection_id: "1".to_string(),
    }
}

/// The unbind counterpart of [`sample_bind_event`]
pub fn sample_unbind_event(surprise: bool) -> UnbindEvent {
    UnbindEvent {
        vendor_id: "046d".to_string(),
        product_id: "c52b".to_string(),
        client_ip: "10.0.0.5".to_string(),
        connection_id: "1".to_string(),
        surprise_unbound: surprise,
    }
}
