//! Callback wire contract for the VirtualHere server supervisor
//!
//! This crate defines the two lifecycle events the VirtualHere server process
//! reports back to the supervisor (device bind and device unbind), the JSON
//! payload decoding for the callback HTTP endpoints, and the shell command
//! templates written into the server's configuration file that make the
//! server deliver those callbacks in the first place.
//!
//! # Example
//!
//! ```
//! use events::decode_bind;
//!
//! let body = br#"{
//!     "vendor_id": "046d",
//!     "product_id": "c52b",
//!     "client_ip": "10.0.0.5",
//!     "connection_id": "1"
//! }"#;
//!
//! let event = decode_bind(body).unwrap();
//! assert_eq!(event.client_ip, "10.0.0.5");
//! ```

pub mod commands;
pub mod error;
pub mod types;

pub use commands::{CallbackCommands, EVENTS_HANDLER_PORT_ENV};
pub use error::{EventError, Result};
pub use types::{BindEvent, UnbindEvent, decode_bind, decode_unbind};

/// Callback path the server posts device-attach notifications to.
pub const ON_BIND_PATH: &str = "/onBind";

/// Callback path the server posts device-detach notifications to.
pub const ON_UNBIND_PATH: &str = "/onUnbind";
