//! # Wallet Flows
//!
//! Modules wired by the runtime cooperating through their messengers:
//!
//! ```text
//! KeyringController ──lock──► BackendWebSocketService (disconnects)
//!                        └──► SnapController          (terminates Snaps)
//!
//! SubscriptionService ──RewardsController:getHasAccountOptedIn──► RewardsController
//!                                 RewardsController ──SnapController:handleRequest──► SnapController
//! ```
//!
//! Modules outside the wired set (keyring, preferences) are stood in by
//! handles created from the root bus, as the composition root would.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use messenger_bus::{create_scoped_handle, define_action, MessengerError, Payload};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use wallet_runtime::{RuntimeConfig, WalletRuntime, WIRING_ORDER};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn runtime() -> WalletRuntime {
        WalletRuntime::new(&RuntimeConfig::default()).unwrap()
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct SnapRequest {
        snap_id: String,
        method: String,
    }

    define_action!(HandleSnapRequest = "SnapController:handleRequest", SnapRequest => Payload);
    define_action!(HasAccountOptedIn = "RewardsController:getHasAccountOptedIn", String => bool);

    // =============================================================================
    // EVENT FLOWS
    // =============================================================================

    #[test]
    fn test_keyring_lock_reaches_listeners() {
        let runtime = runtime();
        let keyring = create_scoped_handle(runtime.bus(), "KeyringController", &[], &[]).unwrap();

        let notified = Arc::new(AtomicUsize::new(0));
        for namespace in ["BackendWebSocketService", "SnapController"] {
            let counter = Arc::clone(&notified);
            runtime
                .modules()
                .get(namespace)
                .unwrap()
                .subscribe("KeyringController:lock", move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        let listeners = keyring
            .publish("KeyringController:lock", Payload::Null)
            .unwrap();
        assert_eq!(listeners, 2);
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unwired_event_access_is_rejected() {
        let runtime = runtime();
        let subscription = runtime.modules().get("SubscriptionService").unwrap();

        let err = subscription
            .subscribe("KeyringController:lock", |_| {})
            .unwrap_err();
        assert!(matches!(err, MessengerError::EventNotAllowed { .. }));
        assert_eq!(runtime.bus().stats().capability_denials, 1);
    }

    #[test]
    fn test_denials_reach_prometheus() {
        messenger_telemetry::register_metrics().unwrap();
        let runtime = runtime();
        let subscription = runtime.modules().get("SubscriptionService").unwrap();

        let err = subscription
            .subscribe("KeyringController:lock", |_| {})
            .unwrap_err();
        messenger_telemetry::record_error(&err);
        let stats = runtime.publish_metrics();
        assert_eq!(stats.capability_denials, 1);
        assert_eq!(stats.live_handles, WIRING_ORDER.len() as u64);

        // Counters are process-wide; other tests may have added to them.
        assert!(messenger_telemetry::CAPABILITY_DENIALS.get() >= 1);
        assert!(
            messenger_telemetry::MESSENGER_ERRORS
                .with_label_values(&[err.kind()])
                .get()
                >= 1
        );
        let text = messenger_telemetry::encode_metrics().unwrap();
        assert!(text.contains("wm_broker_capability_denials_total"));
        assert!(text.contains("wm_messenger_errors_total"));
    }

    // =============================================================================
    // CALL CHAINS
    // =============================================================================

    #[tokio::test]
    async fn test_subscription_to_rewards_to_snaps() {
        let runtime = runtime();
        let modules = runtime.modules();

        modules
            .get("SnapController")
            .unwrap()
            .register_typed::<HandleSnapRequest, _, _>(|request: SnapRequest| async move {
                Ok(json!({ "snap": request.snap_id, "handled": request.method }))
            })
            .unwrap();

        let rewards_messenger = modules.get("RewardsController").unwrap();
        let snap_result = rewards_messenger
            .call_typed::<HandleSnapRequest>(SnapRequest {
                snap_id: "npm:@metamask/rewards".to_string(),
                method: "getCandidateSubscriptionId".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(snap_result["handled"], json!("getCandidateSubscriptionId"));

        rewards_messenger
            .register_typed::<HasAccountOptedIn, _, _>(|account: String| async move {
                Ok(account.starts_with("eip155:"))
            })
            .unwrap();

        let subscription = modules.get("SubscriptionService").unwrap();
        let opted_in = subscription
            .call_typed::<HasAccountOptedIn>("eip155:1:0xabc".to_string())
            .await
            .unwrap();
        assert!(opted_in);
        assert_eq!(runtime.bus().stats().actions_called, 2);
    }

    #[tokio::test]
    async fn test_reverse_call_is_rejected() {
        let runtime = runtime();
        let snaps = runtime.modules().get("SnapController").unwrap();

        let err = snaps
            .call("RewardsController:getHasAccountOptedIn", json!("eip155:1:0xabc"))
            .await
            .unwrap_err();
        assert!(matches!(err, MessengerError::ActionNotAllowed { .. }));
    }

    #[tokio::test]
    async fn test_allowed_but_missing_provider() {
        let runtime = runtime();
        let rewards_data = runtime.modules().get("RewardsDataService").unwrap();

        // PreferencesController is not running in this test.
        let err = rewards_data
            .call("PreferencesController:getState", Payload::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, MessengerError::UnknownAction { .. }));

        let preferences = create_scoped_handle(runtime.bus(), "PreferencesController", &[], &[]).unwrap();
        preferences
            .register_action("PreferencesController:getState", |_: Payload| async move {
                Ok(json!({ "currentLocale": "en" }))
            })
            .unwrap();
        let state = rewards_data
            .call("PreferencesController:getState", Payload::Null)
            .await
            .unwrap();
        assert_eq!(state["currentLocale"], json!("en"));
    }

    // =============================================================================
    // LIFECYCLE
    // =============================================================================

    #[test]
    fn test_shutdown_releases_everything() {
        let runtime = runtime();
        runtime
            .modules()
            .get("SubscriptionService")
            .unwrap()
            .register_action(
                "SubscriptionService:submitSubscriptionSponsorshipIntent",
                |_: Payload| async move { Ok(Payload::Null) },
            )
            .unwrap();
        assert_eq!(runtime.bus().live_namespaces().len(), WIRING_ORDER.len());

        let audit = runtime.audit();
        runtime.shutdown();

        assert_eq!(audit.modules.len(), WIRING_ORDER.len());
        let json = audit.to_json().unwrap();
        for (namespace, _) in WIRING_ORDER {
            assert!(json.contains(namespace));
        }
    }
}
