//! Plugin facade
//!
//! The thin surface the host plugin runtime calls into. Everything here
//! delegates to the supervisor; the only extra behavior is reporting the
//! machine's LAN address so the frontend can show clients where to connect.

use crate::supervisor::ServerSupervisor;
use common::Result;
use std::net::UdpSocket;

pub struct PluginFacade {
    supervisor: ServerSupervisor,
}

impl PluginFacade {
    pub fn new(supervisor: ServerSupervisor) -> Self {
        Self { supervisor }
    }

    /// Start supervising and return the address clients should connect to
    pub async fn start_server(&mut self) -> Result<String> {
        self.supervisor.start().await?;
        deck_ip()
    }

    /// Stop the server and reset all system state
    pub async fn stop_server(&mut self) {
        self.supervisor.stop().await;
    }

    /// True iff the server process and the callback listener are both up
    pub async fn server_is_up(&self) -> bool {
        self.supervisor.is_up().await
    }

    /// Address of the client currently using a shared device, if any
    pub async fn server_get_client_ip(&self) -> Option<String> {
        self.supervisor.client_ip().await
    }
}

/// The machine's LAN address
///
/// Learned from the local address of a connected UDP socket; connect() only
/// selects a route, no packet is sent. Resolving the hostname instead tends
/// to return 127.0.1.1 on Linux hosts.
pub fn deck_ip() -> Result<String> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip().to_string())
}
