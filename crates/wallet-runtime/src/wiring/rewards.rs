//! # Rewards Messengers
//!
//! The rewards data service talks to the rewards backend; the rewards
//! controller drives it and reacts to account and keyring changes.
//!
//! ## Phase 1:
//! - RewardsDataService: reads preferences for locale and headers
//!
//! ## Phase 2 (Depends on RewardsDataService, Accounts, Keyring, Snaps):
//! - RewardsController: opt-in, season status, referral flows

use messenger_bus::{Bus, Delegation, MessengerResult, ScopedHandle};
use tracing::info;

pub const REWARDS_DATA_SERVICE: &str = "RewardsDataService";
pub const REWARDS_CONTROLLER: &str = "RewardsController";

pub const REWARDS_DATA_SERVICE_ACTIONS: &[&str] = &["PreferencesController:getState"];

/// Backend calls the controller forwards to the data service.
pub const REWARDS_CONTROLLER_DATA_ACTIONS: &[&str] = &[
    "RewardsDataService:login",
    "RewardsDataService:estimatePoints",
    "RewardsDataService:getOptInStatus",
    "RewardsDataService:mobileOptin",
    "RewardsDataService:mobileJoin",
    "RewardsDataService:siweLogin",
    "RewardsDataService:siweJoin",
    "RewardsDataService:generateChallenge",
    "RewardsDataService:getSeasonStatus",
    "RewardsDataService:fetchGeoLocation",
    "RewardsDataService:validateReferralCode",
    "RewardsDataService:getDiscoverSeasons",
    "RewardsDataService:getSeasonMetadata",
];

/// Account, signing and Snap access used to build opt-in challenges.
pub const REWARDS_CONTROLLER_WALLET_ACTIONS: &[&str] = &[
    "AccountTreeController:getAccountsFromSelectedAccountGroup",
    "AccountsController:getSelectedMultichainAccount",
    "AccountsController:listMultichainAccounts",
    "KeyringController:signPersonalMessage",
    "SnapController:handleRequest",
];

pub const REWARDS_CONTROLLER_EVENTS: &[&str] = &[
    "AccountTreeController:selectedAccountGroupChange",
    "KeyringController:unlock",
];

/// Get the messenger for the rewards data service.
pub fn get_rewards_data_service_messenger(bus: &Bus) -> MessengerResult<ScopedHandle> {
    let messenger = bus
        .handle_builder(REWARDS_DATA_SERVICE)
        .delegate(Delegation::actions(REWARDS_DATA_SERVICE_ACTIONS))
        .build()?;
    info!(namespace = REWARDS_DATA_SERVICE, "[rewards] Messenger wired");
    Ok(messenger)
}

/// Get the messenger for the rewards controller.
///
/// Granted in two delegations; they are merged.
pub fn get_rewards_controller_messenger(bus: &Bus) -> MessengerResult<ScopedHandle> {
    let messenger = bus
        .handle_builder(REWARDS_CONTROLLER)
        .delegate(Delegation::actions(REWARDS_CONTROLLER_DATA_ACTIONS))
        .delegate(Delegation::new(
            REWARDS_CONTROLLER_WALLET_ACTIONS,
            REWARDS_CONTROLLER_EVENTS,
        ))
        .build()?;
    info!(namespace = REWARDS_CONTROLLER, "[rewards] Messenger wired");
    Ok(messenger)
}
