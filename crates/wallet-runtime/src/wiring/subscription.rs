//! Wiring for the subscription service (paid protection plans).
//!
//! The service orchestrates checkout flows: it reads wallet state to decide
//! eligibility, drives the subscription controller and reports metrics.

use messenger_bus::{Bus, Delegation, MessengerResult, ScopedHandle};
use tracing::info;

pub const SUBSCRIPTION_SERVICE: &str = "SubscriptionService";

pub const SUBSCRIPTION_SERVICE_ACTIONS: &[&str] = &[
    "SubscriptionController:getState",
    "SubscriptionController:getSubscriptions",
    "SubscriptionController:linkRewards",
    "SubscriptionController:startShieldSubscriptionWithCard",
    "SubscriptionController:submitShieldSubscriptionCryptoApproval",
    "SubscriptionController:submitSponsorshipIntents",
    "SubscriptionController:updatePaymentMethod",
    "AccountsController:getState",
    "AppStateController:getState",
    "AppStateController:setPendingShieldCohort",
    "KeyringController:getState",
    "MetaMetricsController:trackEvent",
    "NetworkController:getState",
    "PreferencesController:getState",
    "RewardsController:getHasAccountOptedIn",
    "RewardsController:getSeasonMetadata",
    "SmartTransactionsController:getState",
    "SwapsController:getState",
    "TransactionController:getTransactions",
];

/// Get the messenger for the subscription service.
pub fn get_subscription_service_messenger(bus: &Bus) -> MessengerResult<ScopedHandle> {
    let messenger = bus
        .handle_builder(SUBSCRIPTION_SERVICE)
        .delegate(Delegation::actions(SUBSCRIPTION_SERVICE_ACTIONS))
        .build()?;
    info!(namespace = SUBSCRIPTION_SERVICE, "[subscription] Messenger wired");
    Ok(messenger)
}
