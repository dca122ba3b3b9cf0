//! vh-supervisor
//!
//! Supervisor for the VirtualHere USB sharing server on a handheld Linux
//! host. Owns the server process lifecycle, runs the loopback callback
//! listener the server reports device bind/unbind events to, and coordinates
//! system power and display state around those events: while a device is
//! bound to a remote client, sleep is inhibited and the display is dimmed to
//! minimum; both are restored on unbind and on shutdown.

pub mod callback;
pub mod config;
pub mod install;
pub mod plugin;
pub mod process;
pub mod supervisor;
pub mod system;

pub use callback::{CallbackHandler, CallbackListener};
pub use config::SupervisorConfig;
pub use install::{BinaryInstaller, HttpInstaller};
pub use plugin::PluginFacade;
pub use process::ServerProcess;
pub use supervisor::ServerSupervisor;
pub use system::SystemState;
