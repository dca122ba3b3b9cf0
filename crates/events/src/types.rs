//! Bind/unbind event definitions and payload decoding
//!
//! The VirtualHere server invokes the supervisor's callback endpoints with
//! JSON bodies in which every field is a string, including the
//! `surprise_unbound` flag on unbind (the server substitutes placeholder
//! tokens into shell arguments, so everything arrives stringly-typed).
//! Decoding normalizes that into the typed events used by the supervisor.

use crate::error::{EventError, Result};
use serde::{Deserialize, Serialize};

/// Maximum accepted callback payload size in bytes
///
/// The real payloads are a handful of short strings; anything near this
/// limit is not a VirtualHere callback.
pub const MAX_PAYLOAD_SIZE: usize = 65_536;

/// A USB device was attached to a remote client
///
/// Produced when the server signals that a shared device has been bound.
/// Ephemeral: events are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindEvent {
    /// USB vendor ID as reported by the server (hex string, e.g. "046d")
    pub vendor_id: String,
    /// USB product ID as reported by the server
    pub product_id: String,
    /// Address of the client the device was attached to
    pub client_ip: String,
    /// Server-assigned connection identifier
    pub connection_id: String,
}

/// A USB device was detached from a remote client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbindEvent {
    /// USB vendor ID as reported by the server
    pub vendor_id: String,
    /// USB product ID as reported by the server
    pub product_id: String,
    /// Address of the client the device was detached from
    pub client_ip: String,
    /// Server-assigned connection identifier
    pub connection_id: String,
    /// True when the detachment was not graceful (e.g. cable pulled)
    pub surprise_unbound: bool,
}

/// Raw unbind payload as posted by the server
///
/// `surprise_unbound` arrives as a string flag: exactly the literal `"1"`
/// means true, any other value means false.
#[derive(Deserialize)]
struct RawUnbind {
    vendor_id: String,
    product_id: String,
    client_ip: String,
    connection_id: String,
    surprise_unbound: String,
}

fn check_size(body: &[u8]) -> Result<()> {
    if body.len() > MAX_PAYLOAD_SIZE {
        return Err(EventError::PayloadTooLarge {
            size: body.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }
    Ok(())
}

/// Decode a `/onBind` callback body
///
/// Fails when the body is not well-formed JSON or any field is absent.
pub fn decode_bind(body: &[u8]) -> Result<BindEvent> {
    check_size(body)?;
    Ok(serde_json::from_slice(body)?)
}

/// Decode a `/onUnbind` callback body
///
/// Same fields as a bind, plus the `surprise_unbound` string flag which is
/// normalized to a bool here.
pub fn decode_unbind(body: &[u8]) -> Result<UnbindEvent> {
    check_size(body)?;
    let raw: RawUnbind = serde_json::from_slice(body)?;
    Ok(UnbindEvent {
        vendor_id: raw.vendor_id,
        product_id: raw.product_id,
        client_ip: raw.client_ip,
        connection_id: raw.connection_id,
        surprise_unbound: raw.surprise_unbound == "1",
    })
}
