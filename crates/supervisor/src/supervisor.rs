//! Server supervisor
//!
//! The coordinator that ties everything together: owns the system state, the
//! server process, and the callback listener, and is the sole source of
//! truth for "is a client currently served". Bind/unbind events arriving on
//! the listener drive the power/display transitions and the post-unbind
//! server restart.

use crate::callback::{CallbackHandler, CallbackListener};
use crate::process::ServerProcess;
use crate::system::SystemState;
use common::Result;
use events::{BindEvent, UnbindEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Mutable coordinator state
///
/// One lock over the lot: event handlers and the public start/stop
/// operations serialize through it, which is all the synchronization the
/// model needs since bind/unbind deliveries never overlap (a device is
/// bound by exactly one server process).
struct Shared {
    system: SystemState,
    process: ServerProcess,
    client_ip: Option<String>,
}

/// Routes callback events into the shared supervisor state
///
/// Separate from [`ServerSupervisor`] so the listener can own it without
/// closures over mutable fields; it is handed to the listener at
/// construction and never reregistered.
pub struct EventRouter {
    shared: Arc<Mutex<Shared>>,
}

impl CallbackHandler for EventRouter {
    /// A device was attached to a remote client
    ///
    /// Track the client, keep the host awake, dim the display. The three
    /// always fire together; there is no suspend-only or dim-only path.
    /// Sleep inhibition proceeds even when dimming then fails.
    async fn on_bind(&self, event: BindEvent) -> Result<()> {
        let mut shared = self.shared.lock().await;
        info!(
            client_ip = %event.client_ip,
            vendor_id = %event.vendor_id,
            product_id = %event.product_id,
            "Device bound to client"
        );
        shared.client_ip = Some(event.client_ip);
        shared.system.inhibit_sleep()?;
        shared.system.dim_to_minimum()?;
        Ok(())
    }

    /// The device was detached again
    ///
    /// Undo the bind transitions, then restart the server process: the
    /// server needs a relaunch to accept the next client cleanly, on the
    /// same callback port so its events keep reaching this listener.
    async fn on_unbind(&self, event: UnbindEvent) -> Result<()> {
        let mut shared = self.shared.lock().await;
        if event.surprise_unbound {
            warn!(client_ip = %event.client_ip, "Device surprise-unbound from client");
        } else {
            info!(client_ip = %event.client_ip, "Device unbound from client");
        }
        shared.system.allow_sleep()?;
        shared.system.restore_brightness()?;
        shared.client_ip = None;
        shared.process.restart().await?;
        Ok(())
    }
}

/// Supervises the server process and its callback listener as one unit
pub struct ServerSupervisor {
    shared: Arc<Mutex<Shared>>,
    listener: CallbackListener<EventRouter>,
}

impl ServerSupervisor {
    pub fn new(system: SystemState, process: ServerProcess) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            system,
            process,
            client_ip: None,
        }));
        let listener = CallbackListener::new(EventRouter {
            shared: Arc::clone(&shared),
        });
        Self { shared, listener }
    }

    /// Start the callback listener, then the server process
    ///
    /// Listener first: the server must be told a callback target that is
    /// already accepting connections. When the process fails to launch, the
    /// listener is stopped again so a failed start leaves nothing running.
    pub async fn start(&mut self) -> Result<()> {
        let port = self.listener.start().await?;
        let started = {
            let mut shared = self.shared.lock().await;
            shared.process.start(port).await
        };
        if let Err(e) = started {
            self.listener.stop().await;
            return Err(e);
        }
        info!("Supervisor started, callbacks on port {}", port);
        Ok(())
    }

    /// Stop everything and reset system state
    ///
    /// Sleep and brightness are reset unconditionally, whatever the current
    /// inhibition state; failures there are logged but never block the rest
    /// of the teardown. Process stops before the listener so a late callback
    /// never hits a dead listener.
    pub async fn stop(&mut self) {
        {
            let mut shared = self.shared.lock().await;
            if let Err(e) = shared.system.allow_sleep() {
                warn!("Failed to allow sleep during shutdown: {}", e);
            }
            if let Err(e) = shared.system.restore_brightness() {
                warn!("Failed to restore brightness during shutdown: {}", e);
            }
            shared.client_ip = None;
            shared.process.stop(true).await;
        }
        self.listener.stop().await;
        info!("Supervisor stopped");
    }

    /// True iff both the server process and the callback listener are up
    pub async fn is_up(&self) -> bool {
        self.listener.is_up() && self.shared.lock().await.process.is_up()
    }

    /// Address of the client currently served, if any
    pub async fn client_ip(&self) -> Option<String> {
        self.shared.lock().await.client_ip.clone()
    }

    /// Port the callback listener is bound to while running
    pub fn listener_port(&self) -> Option<u16> {
        self.listener.port()
    }

    /// Callback port the server process was started with
    pub async fn process_callback_port(&self) -> Option<u16> {
        self.shared.lock().await.process.callback_port()
    }
}
