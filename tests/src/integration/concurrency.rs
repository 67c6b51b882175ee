//! # Concurrency
//!
//! The bus is shared across tasks and threads. These tests check that
//! dispatch, registration and publication stay consistent under contention:
//!
//! - Concurrent calls all reach their handler exactly once
//! - Re-registration while calls are in flight never loses a call
//! - Handlers may call back into the bus without deadlocking
//! - Subscribing during a publish never corrupts delivery

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use messenger_bus::{create_scoped_handle, Bus, MessengerError, Payload, ScopedHandle};
    use serde_json::json;

    const TASKS: usize = 64;

    // =============================================================================
    // CALL DISPATCH
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_hit_handler_once_each() {
        let bus = Arc::new(Bus::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        bus.register_action("Counter:increment", move |args: Payload| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::task::yield_now().await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(args)
            }
        })
        .unwrap();

        let caller = Arc::new(create_scoped_handle(&bus, "Caller", &["Counter:increment"], &[]).unwrap());
        let mut tasks = Vec::with_capacity(TASKS);
        for n in 0..TASKS {
            let caller = Arc::clone(&caller);
            tasks.push(tokio::spawn(async move {
                caller.call("Counter:increment", json!(n)).await
            }));
        }

        let mut echoed = Vec::with_capacity(TASKS);
        for task in tasks {
            echoed.push(task.await.unwrap().unwrap());
        }
        echoed.sort_by_key(|v| v.as_u64());

        assert_eq!(hits.load(Ordering::SeqCst), TASKS);
        assert_eq!(echoed, (0..TASKS).map(|n| json!(n)).collect::<Vec<_>>());
        assert_eq!(bus.stats().actions_called, TASKS as u64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reregistration_during_calls() {
        let bus = Arc::new(Bus::new());
        bus.register_action("Flip:value", |_: Payload| async move { Ok(json!("old")) })
            .unwrap();

        let caller = Arc::new(create_scoped_handle(&bus, "Caller", &["Flip:value"], &[]).unwrap());
        let mut tasks = Vec::with_capacity(TASKS);
        for _ in 0..TASKS {
            let caller = Arc::clone(&caller);
            tasks.push(tokio::spawn(async move { caller.call("Flip:value", Payload::Null).await }));
        }

        assert!(bus.unregister_action("Flip:value"));
        bus.register_action("Flip:value", |_: Payload| async move { Ok(json!("new")) })
            .unwrap();

        // Each call saw either handler or the brief gap between them.
        for task in tasks {
            match task.await.unwrap() {
                Ok(value) => assert!(value == json!("old") || value == json!("new")),
                Err(err) => assert!(matches!(err, MessengerError::UnknownAction { .. })),
            }
        }
        assert_eq!(caller.call("Flip:value", Payload::Null).await.unwrap(), json!("new"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_handler_can_reenter_bus() {
        let bus = Arc::new(Bus::new());
        let inner = create_scoped_handle(&bus, "Inner", &[], &[]).unwrap();
        inner
            .register_action("Inner:leaf", |_: Payload| async move { Ok(json!("leaf")) })
            .unwrap();

        let outer = Arc::new(create_scoped_handle(&bus, "Outer", &["Inner:leaf"], &[]).unwrap());
        let nested = Arc::clone(&outer);
        outer
            .register_action("Outer:branch", move |_: Payload| {
                let nested = Arc::clone(&nested);
                async move {
                    let leaf = nested.call("Inner:leaf", Payload::Null).await?;
                    Ok::<_, anyhow::Error>(json!({ "branch": leaf }))
                }
            })
            .unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            bus.call_action("Outer:branch", Payload::Null),
        )
        .await
        .expect("re-entrant call deadlocked")
        .unwrap();
        assert_eq!(result, json!({ "branch": "leaf" }));

        // Break the handle -> handler -> handle cycle.
        assert!(outer.unregister_action("Outer:branch").unwrap());
    }

    // =============================================================================
    // EVENTS
    // =============================================================================

    #[test]
    fn test_subscribe_while_publishing_from_threads() {
        let bus = Bus::new();
        let publisher = Arc::new(create_scoped_handle(&bus, "Ticker", &[], &[]).unwrap());
        let watcher: Arc<ScopedHandle> =
            Arc::new(create_scoped_handle(&bus, "Watcher", &[], &["Ticker:tick"]).unwrap());
        let delivered = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|scope| {
            let publisher = Arc::clone(&publisher);
            scope.spawn(move || {
                for n in 0..500 {
                    publisher.publish("Ticker:tick", json!(n)).unwrap();
                }
            });

            let watcher = Arc::clone(&watcher);
            let delivered = Arc::clone(&delivered);
            scope.spawn(move || {
                for _ in 0..50 {
                    let counter = Arc::clone(&delivered);
                    watcher
                        .subscribe("Ticker:tick", move |_| {
                            counter.fetch_add(1, Ordering::Relaxed);
                        })
                        .unwrap();
                }
            });
        });

        assert_eq!(bus.subscriber_count("Ticker:tick"), 50);
        let before = delivered.load(Ordering::Relaxed);
        assert_eq!(publisher.publish("Ticker:tick", Payload::Null).unwrap(), 50);
        assert_eq!(delivered.load(Ordering::Relaxed), before + 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_streams_receive_every_event_across_threads() {
        let bus = Bus::new();
        let publisher = Arc::new(create_scoped_handle(&bus, "Feed", &[], &[]).unwrap());
        let reader = create_scoped_handle(&bus, "Reader", &[], &["Feed:item"]).unwrap();
        let mut stream = reader.subscribe_stream("Feed:item").unwrap();

        let producers: Vec<_> = (0..4)
            .map(|worker| {
                let publisher = Arc::clone(&publisher);
                tokio::spawn(async move {
                    for n in 0..25 {
                        publisher
                            .publish("Feed:item", json!({ "worker": worker, "n": n }))
                            .unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }

        let mut per_worker = [0usize; 4];
        for _ in 0..100 {
            let item = stream.recv().await.unwrap();
            let worker = usize::try_from(item["worker"].as_u64().unwrap()).unwrap();
            // Items from one worker arrive in publish order.
            assert_eq!(item["n"], json!(per_worker[worker]));
            per_worker[worker] += 1;
        }
        assert_eq!(per_worker, [25; 4]);
        assert_eq!(stream.try_recv(), Ok(None));
    }
}
