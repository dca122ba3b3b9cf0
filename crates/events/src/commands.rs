//! Callback command templates for the server configuration
//!
//! The VirtualHere server decides how to announce bind/unbind events by
//! running the shell commands named `onBind`/`onUnbind` in its configuration
//! file. The supervisor ships two shell scripts that POST the event back to
//! the callback listener; this module renders the command templates pointing
//! at those scripts.
//!
//! The `$VENDOR_ID$`-style placeholder tokens are substituted by the server
//! itself when it runs the command, never by the supervisor.

use std::path::Path;

/// Environment variable carrying the callback port to the shell scripts
///
/// Set on the server process at launch; the scripts read it to know where
/// to deliver the HTTP callbacks.
pub const EVENTS_HANDLER_PORT_ENV: &str = "VIRTUALHERE_SERVER_EVENTS_HANDLER_PORT";

/// The two shell command templates written into the server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackCommands {
    /// Command the server runs when a device is bound to a client
    pub on_bind: String,
    /// Command the server runs when a device is unbound from a client
    pub on_unbind: String,
}

impl CallbackCommands {
    /// Build the command templates for scripts under `<plugin_dir>/shell/`
    pub fn for_plugin_dir(plugin_dir: &Path) -> Self {
        let shell_dir = plugin_dir.join("shell");
        Self {
            on_bind: format!(
                r#"{}/onBind.sh "$VENDOR_ID$" "$PRODUCT_ID$" "$CLIENT_IP$" "$CONNECTION_ID$""#,
                shell_dir.display()
            ),
            on_unbind: format!(
                r#"{}/onUnbind.sh "$VENDOR_ID$" "$PRODUCT_ID$" "$CLIENT_IP$" "$CONNECTION_ID$" "$SURPRISE_UNBOUND$""#,
                shell_dir.display()
            ),
        }
    }

    /// Render the INI-style configuration fragment the server reads at launch
    ///
    /// The server's configuration format is a foreign contract (plain
    /// `key=value` lines), so it is rendered by hand rather than through a
    /// serializer.
    pub fn render_ini(&self) -> String {
        format!("onBind={}\nonUnbind={}\n", self.on_bind, self.on_unbind)
    }
}
