//! # Snap Messengers
//!
//! Wiring for the Snap controller, its init messenger and the execution
//! environment service.
//!
//! ## Phase 1 (No Dependencies):
//! - ExecutionService: runs Snaps in isolation; calls nothing foreign
//!
//! ## Phase 2 (Depends on ExecutionService, Approval, Permissions):
//! - SnapControllerInit: construction-time reads only
//! - SnapController: install, lifecycle and request routing for Snaps

use messenger_bus::{Bus, Delegation, MessengerResult, ScopedHandle};
use tracing::info;

pub const SNAP_CONTROLLER: &str = "SnapController";
pub const SNAP_CONTROLLER_INIT: &str = "SnapControllerInit";
pub const EXECUTION_SERVICE: &str = "ExecutionService";

/// Foreign actions the Snap controller may call.
pub const SNAP_CONTROLLER_ACTIONS: &[&str] = &[
    "ApprovalController:addRequest",
    "ApprovalController:updateRequestState",
    "PermissionController:getEndowments",
    "PermissionController:getPermissions",
    "PermissionController:grantPermissions",
    "PermissionController:hasPermission",
    "PermissionController:hasPermissions",
    "PermissionController:requestPermissions",
    "PermissionController:revokeAllPermissions",
    "PermissionController:revokePermissionForAllSubjects",
    "PermissionController:revokePermissions",
    "PermissionController:updateCaveat",
    "SubjectMetadataController:addSubjectMetadata",
    "SubjectMetadataController:getSubjectMetadata",
    "ExecutionService:executeSnap",
    "ExecutionService:handleRpcRequest",
    "ExecutionService:terminateAllSnaps",
    "ExecutionService:terminateSnap",
    "SnapsRegistry:get",
    "SnapsRegistry:getMetadata",
    "SnapsRegistry:resolveVersion",
    "SnapsRegistry:update",
];

/// Foreign events the Snap controller may subscribe to.
pub const SNAP_CONTROLLER_EVENTS: &[&str] = &[
    "ExecutionService:outboundRequest",
    "ExecutionService:outboundResponse",
    "ExecutionService:unhandledError",
    "KeyringController:lock",
];

/// Used only while the Snap controller is being constructed.
pub const SNAP_CONTROLLER_INIT_ACTIONS: &[&str] = &[
    "PreferencesController:getState",
    "MetaMetricsController:trackEvent",
];

pub const SNAP_CONTROLLER_INIT_EVENTS: &[&str] = &["KeyringController:unlock"];

/// Get the messenger for the Snap controller.
pub fn get_snap_controller_messenger(bus: &Bus) -> MessengerResult<ScopedHandle> {
    let messenger = bus
        .handle_builder(SNAP_CONTROLLER)
        .delegate(Delegation::new(SNAP_CONTROLLER_ACTIONS, SNAP_CONTROLLER_EVENTS))
        .build()?;
    info!(namespace = SNAP_CONTROLLER, "[snaps] Messenger wired");
    Ok(messenger)
}

/// Get the init messenger for the Snap controller.
pub fn get_snap_controller_init_messenger(bus: &Bus) -> MessengerResult<ScopedHandle> {
    let messenger = bus
        .handle_builder(SNAP_CONTROLLER_INIT)
        .delegate(Delegation::new(
            SNAP_CONTROLLER_INIT_ACTIONS,
            SNAP_CONTROLLER_INIT_EVENTS,
        ))
        .build()?;
    info!(namespace = SNAP_CONTROLLER_INIT, "[snaps] Init messenger wired");
    Ok(messenger)
}

/// Get the messenger for the execution service. It needs no foreign access.
pub fn get_execution_service_messenger(bus: &Bus) -> MessengerResult<ScopedHandle> {
    let messenger = bus.handle_builder(EXECUTION_SERVICE).build()?;
    info!(namespace = EXECUTION_SERVICE, "[snaps] Messenger wired");
    Ok(messenger)
}
