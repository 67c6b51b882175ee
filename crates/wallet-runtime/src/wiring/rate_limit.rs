//! # Rate Limit Messengers
//!
//! The rate-limit controller throttles Snap-initiated notifications. The
//! controller itself only registers its own actions; the foreign calls it
//! forwards to are granted on its init messenger, which builds the rate
//! limited API table at construction time.

use messenger_bus::{Bus, Delegation, MessengerResult, ScopedHandle};
use tracing::info;

pub const RATE_LIMIT_CONTROLLER: &str = "RateLimitController";
pub const RATE_LIMIT_CONTROLLER_INIT: &str = "RateLimitControllerInit";

/// Targets of the rate limited APIs.
pub const RATE_LIMIT_CONTROLLER_INIT_ACTIONS: &[&str] = &[
    "ApprovalController:showSnapNotification",
    "NotificationServicesController:updateMetamaskNotificationsList",
];

/// Get the messenger for the rate-limit controller.
pub fn get_rate_limit_controller_messenger(bus: &Bus) -> MessengerResult<ScopedHandle> {
    let messenger = bus.handle_builder(RATE_LIMIT_CONTROLLER).build()?;
    info!(namespace = RATE_LIMIT_CONTROLLER, "[rate-limit] Messenger wired");
    Ok(messenger)
}

/// Get the init messenger for the rate-limit controller.
pub fn get_rate_limit_controller_init_messenger(bus: &Bus) -> MessengerResult<ScopedHandle> {
    let messenger = bus
        .handle_builder(RATE_LIMIT_CONTROLLER_INIT)
        .delegate(Delegation::actions(RATE_LIMIT_CONTROLLER_INIT_ACTIONS))
        .build()?;
    info!(namespace = RATE_LIMIT_CONTROLLER_INIT, "[rate-limit] Init messenger wired");
    Ok(messenger)
}
