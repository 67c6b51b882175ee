//! # Wallet Messenger Benchmarks
//!
//! | Path | Measured |
//! |------|----------|
//! | Scoped call | allow-list check + handler lookup + dispatch |
//! | Typed call | the above plus JSON encode/decode |
//! | Publish | fan-out across N plain subscribers |
//! | Selector publish | fan-out where the selected value rarely changes |
//! | Wiring | building every module messenger on a fresh bus |

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use messenger_bus::{create_scoped_handle, define_action, Bus, Payload};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Quote {
    from: String,
    to: String,
    amount: u64,
}

define_action!(GetQuote = "Swaps:getQuote", Quote => u64);

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("benchmark runtime")
}

// ============================================================================
// Action Dispatch
// ============================================================================

fn bench_action_calls(c: &mut Criterion) {
    let rt = runtime();
    let bus = Bus::new();
    let swaps = create_scoped_handle(&bus, "Swaps", &[], &[]).unwrap();
    swaps
        .register_action("Swaps:echo", |args: Payload| async move { Ok(args) })
        .unwrap();
    swaps
        .register_typed::<GetQuote, _, _>(|quote: Quote| async move { Ok(quote.amount * 997 / 1000) })
        .unwrap();
    let caller = create_scoped_handle(&bus, "Caller", &["Swaps:echo", "Swaps:getQuote"], &[]).unwrap();

    let mut group = c.benchmark_group("action-dispatch");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("scoped_call", |b| {
        b.iter(|| {
            rt.block_on(async {
                black_box(caller.call("Swaps:echo", json!({ "n": 1 })).await.unwrap())
            })
        })
    });

    group.bench_function("typed_call", |b| {
        let quote = Quote {
            from: "ETH".to_string(),
            to: "USDC".to_string(),
            amount: 1_000_000,
        };
        b.iter(|| {
            rt.block_on(async {
                black_box(caller.call_typed::<GetQuote>(quote.clone()).await.unwrap())
            })
        })
    });

    group.bench_function("rejected_call", |b| {
        b.iter(|| rt.block_on(async { black_box(caller.call("Swaps:unlisted", Payload::Null).await.is_err()) }))
    });

    group.finish();
}

// ============================================================================
// Event Fan-out
// ============================================================================

fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish-fanout");

    for subscribers in [1usize, 10, 100, 1000] {
        let bus = Bus::new();
        let publisher = create_scoped_handle(&bus, "Network", &[], &[]).unwrap();
        for _ in 0..subscribers {
            bus.subscribe("Network:stateChange", |payload| {
                black_box(payload);
            })
            .unwrap();
        }
        let payload = json!({ "selectedNetworkClientId": "mainnet", "networksMetadata": {} });

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(BenchmarkId::new("plain", subscribers), &payload, |b, payload| {
            b.iter(|| black_box(publisher.publish("Network:stateChange", payload.clone()).unwrap()))
        });
    }

    for subscribers in [10usize, 100] {
        let bus = Bus::new();
        let publisher = create_scoped_handle(&bus, "Network", &[], &[]).unwrap();
        for _ in 0..subscribers {
            bus.subscribe_with_selector(
                "Network:stateChange",
                |state: &Payload| state["selectedNetworkClientId"].clone(),
                |selected: &Payload, _previous: Option<&Payload>| {
                    black_box(selected);
                },
            )
            .unwrap();
        }

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_function(BenchmarkId::new("selector_unchanged", subscribers), |b| {
            let mut block = 0u64;
            b.iter(|| {
                block += 1;
                let payload = json!({ "selectedNetworkClientId": "mainnet", "block": block });
                black_box(publisher.publish("Network:stateChange", payload).unwrap())
            })
        });
    }

    group.finish();
}

// ============================================================================
// Wiring
// ============================================================================

fn bench_wiring(c: &mut Criterion) {
    c.bench_function("wire_all", |b| {
        b.iter(|| {
            let bus = Bus::new();
            let modules = wallet_runtime::wire_all(&bus).unwrap();
            black_box(modules.len())
        })
    });
}

criterion_group!(benches, bench_action_calls, bench_publish_fanout, bench_wiring);
criterion_main!(benches);
