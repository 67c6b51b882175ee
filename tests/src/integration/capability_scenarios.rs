//! # Capability Scenarios
//!
//! The access rules every scoped messenger obeys, exercised across several
//! handles sharing one bus:
//!
//! 1. **Calls**: a handle calls a foreign action iff it is allow-listed
//! 2. **Subscriptions**: same rule for foreign events
//! 3. **Own namespace**: registration and publishing never cross it
//! 4. **Namespaces**: at most one live handle per namespace

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use messenger_bus::{
        create_scoped_handle, Bus, BusConfig, MessengerError, Payload, ScopedHandle,
    };
    use parking_lot::Mutex;
    use serde_json::json;
    use tokio_stream::StreamExt;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Bus with A (owns `A:foo`, may call `B:bar`), B (owns `B:bar`) and C
    /// (no foreign access).
    fn three_modules() -> (Bus, ScopedHandle, ScopedHandle, ScopedHandle) {
        let bus = Bus::new();
        let a = create_scoped_handle(&bus, "A", &["B:bar"], &["B:changed"]).unwrap();
        let b = create_scoped_handle(&bus, "B", &[], &[]).unwrap();
        let c = create_scoped_handle(&bus, "C", &[], &[]).unwrap();

        a.register_action("A:foo", |_: Payload| async move { Ok(json!("foo")) })
            .unwrap();
        b.register_action("B:bar", |args: Payload| async move { Ok(json!({ "bar": args })) })
            .unwrap();
        (bus, a, b, c)
    }

    // =============================================================================
    // CALLS
    // =============================================================================

    #[tokio::test]
    async fn test_allowed_call_is_delegated() {
        let (_bus, a, _b, _c) = three_modules();
        let result = a.call("B:bar", json!(1)).await.unwrap();
        assert_eq!(result, json!({ "bar": 1 }));
    }

    #[tokio::test]
    async fn test_unlisted_call_is_rejected_even_if_registered() {
        let (bus, _a, _b, c) = three_modules();
        assert!(bus.is_action_registered("B:bar"));

        let err = c.call("B:bar", Payload::Null).await.unwrap_err();
        assert!(matches!(
            err,
            MessengerError::ActionNotAllowed { ref namespace, ref action }
                if namespace == "C" && action == "B:bar"
        ));
        assert!(err.is_policy_violation());
    }

    #[tokio::test]
    async fn test_handler_failure_passes_through_unchanged() {
        #[derive(Debug, thiserror::Error)]
        #[error("insufficient funds")]
        struct InsufficientFunds;

        let bus = Bus::new();
        let vault = create_scoped_handle(&bus, "Vault", &[], &[]).unwrap();
        vault
            .register_action("Vault:withdraw", |_: Payload| async move {
                Err(anyhow::Error::new(InsufficientFunds))
            })
            .unwrap();
        let caller = create_scoped_handle(&bus, "Caller", &["Vault:withdraw"], &[]).unwrap();

        let err = caller.call("Vault:withdraw", Payload::Null).await.unwrap_err();
        assert!(!err.is_policy_violation());
        let MessengerError::Handler(inner) = err else {
            panic!("expected handler error");
        };
        assert!(inner.downcast_ref::<InsufficientFunds>().is_some());
    }

    // =============================================================================
    // NAMESPACES
    // =============================================================================

    #[test]
    fn test_foreign_registration_is_a_violation() {
        let (bus, a, _b, _c) = three_modules();
        let err = a
            .register_action("B:foo", |_: Payload| async move { Ok(Payload::Null) })
            .unwrap_err();

        assert!(matches!(err, MessengerError::NamespaceViolation { .. }));
        assert!(!bus.is_action_registered("B:foo"));
    }

    #[test]
    fn test_second_live_namespace_collides() {
        let bus = Bus::new();
        let x = create_scoped_handle(&bus, "X", &[], &[]).unwrap();
        assert!(matches!(
            create_scoped_handle(&bus, "X", &["A:foo"], &[]),
            Err(MessengerError::NamespaceCollision { .. })
        ));

        drop(x);
        assert!(create_scoped_handle(&bus, "X", &[], &[]).is_ok());
    }

    // =============================================================================
    // EVENTS
    // =============================================================================

    #[test]
    fn test_published_payload_reaches_allowed_subscribers_in_order() {
        let bus = Bus::new();
        let publisher = create_scoped_handle(&bus, "B", &[], &[]).unwrap();
        let first = create_scoped_handle(&bus, "First", &[], &["B:changed"]).unwrap();
        let second = create_scoped_handle(&bus, "Second", &[], &["B:changed"]).unwrap();
        let outsider = create_scoped_handle(&bus, "Outsider", &[], &[]).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        for (name, handle) in [("first", &first), ("second", &second)] {
            let log = Arc::clone(&log);
            handle
                .subscribe("B:changed", move |p| log.lock().push((name, p.clone())))
                .unwrap();
        }
        assert!(matches!(
            outsider.subscribe("B:changed", |_| {}),
            Err(MessengerError::EventNotAllowed { .. })
        ));

        let payload = json!({ "accounts": ["0x1"], "selected": 0 });
        assert_eq!(publisher.publish("B:changed", payload.clone()).unwrap(), 2);
        assert_eq!(
            *log.lock(),
            vec![("first", payload.clone()), ("second", payload)]
        );
    }

    #[tokio::test]
    async fn test_stream_consumer() {
        let (_bus, a, b, _c) = three_modules();
        let mut stream = a.subscribe_stream("B:changed").unwrap();

        for n in 0..3 {
            b.publish("B:changed", json!(n)).unwrap();
        }
        drop(b);

        let received: Vec<_> = (&mut stream).take(3).collect().await;
        assert_eq!(received, vec![json!(0), json!(1), json!(2)]);
    }

    #[test]
    fn test_strict_bus_requires_declared_events() {
        let bus = Bus::with_config(BusConfig {
            require_event_registration: true,
        });
        let owner = create_scoped_handle(&bus, "Keyring", &[], &[]).unwrap();
        let listener = create_scoped_handle(&bus, "Listener", &[], &["Keyring:lock"]).unwrap();

        assert!(matches!(
            listener.subscribe("Keyring:lock", |_| {}),
            Err(MessengerError::UnknownEvent { .. })
        ));

        owner.register_event("Keyring:lock").unwrap();
        assert!(listener.subscribe("Keyring:lock", |_| {}).is_ok());
    }

    #[test]
    fn test_selector_subscription_through_handle() {
        let bus = Bus::new();
        let prefs = create_scoped_handle(&bus, "Preferences", &[], &[]).unwrap();
        prefs
            .register_initial_event_payload("Preferences:stateChange", || {
                json!({ "currentLocale": "en", "theme": "dark" })
            })
            .unwrap();

        let reader = create_scoped_handle(&bus, "Reader", &[], &["Preferences:stateChange"]).unwrap();
        let locales = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&locales);
        reader
            .subscribe_with_selector(
                "Preferences:stateChange",
                |state: &Payload| state["currentLocale"].clone(),
                move |locale: &Payload, _previous: Option<&Payload>| sink.lock().push(locale.clone()),
            )
            .unwrap();

        // Theme changes are ignored; only the locale is selected.
        prefs
            .publish("Preferences:stateChange", json!({ "currentLocale": "en", "theme": "light" }))
            .unwrap();
        prefs
            .publish("Preferences:stateChange", json!({ "currentLocale": "de", "theme": "light" }))
            .unwrap();

        assert_eq!(*locales.lock(), vec![json!("de")]);
    }
}
