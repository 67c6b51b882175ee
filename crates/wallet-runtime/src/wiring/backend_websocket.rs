//! Wiring for the backend websocket service.
//!
//! The service authenticates its connection with a bearer token and tears it
//! down or re-establishes it as the wallet locks, unlocks or signs out.

use messenger_bus::{Bus, Delegation, MessengerResult, ScopedHandle};
use tracing::info;

pub const BACKEND_WEBSOCKET_SERVICE: &str = "BackendWebSocketService";

pub const BACKEND_WEBSOCKET_SERVICE_ACTIONS: &[&str] = &["AuthenticationController:getBearerToken"];

pub const BACKEND_WEBSOCKET_SERVICE_EVENTS: &[&str] = &[
    "AuthenticationController:stateChange",
    "KeyringController:lock",
    "KeyringController:unlock",
];

/// Get the messenger for the backend websocket service.
pub fn get_backend_websocket_service_messenger(bus: &Bus) -> MessengerResult<ScopedHandle> {
    let messenger = bus
        .handle_builder(BACKEND_WEBSOCKET_SERVICE)
        .delegate(Delegation::new(
            BACKEND_WEBSOCKET_SERVICE_ACTIONS,
            BACKEND_WEBSOCKET_SERVICE_EVENTS,
        ))
        .build()?;
    info!(namespace = BACKEND_WEBSOCKET_SERVICE, "[websocket] Messenger wired");
    Ok(messenger)
}
