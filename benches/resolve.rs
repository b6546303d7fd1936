//! Replay lookup benchmark suite.
//!
//! Measures `RequestStore::resolve` over a populated bucket, and a full
//! lookup round trip through the spawned background loop:
//! - Bucket sizes: 16, 256, 4096
//!
//! Run with: cargo bench --bench resolve
//! Results saved to: target/criterion/

use std::collections::BTreeMap;
use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use tokio::runtime::Runtime;

use frame_replay::background::{Background, RequestKey, RequestStore};
use frame_replay::protocol::{BackgroundCommand, CapturedRequest, Event};
use frame_replay::{FrameHref, ReplayConfig, RequestId, TabId};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BUCKET_SIZES: &[usize] = &[16, 256, 4096];

const WIDGET: &str = "https://embed.example.com/widget";

// ============================================================================
// Fixtures
// ============================================================================

fn tab() -> TabId {
    TabId::new(1).expect("valid tab id")
}

fn populated(size: usize) -> RequestStore {
    let mut store = RequestStore::new();
    for n in 0..size {
        let mut request = CapturedRequest::new(format!("https://api.example.com/item/{n}"), "POST");
        request.headers.insert("X-Seq".to_string(), n.to_string());
        store.insert(
            RequestKey::new(tab(), FrameHref::new(WIDGET), RequestId::new(n.to_string())),
            request,
        );
    }
    store
}

/// Frame commit followed by one captured POST per entry.
fn capture_events(size: usize) -> Vec<Event> {
    let mut events = vec![Event::new(
        "webNavigation.onCommitted",
        json!({ "tabId": 1, "frameId": 7, "url": WIDGET }),
    )];
    for n in 0..size {
        let url = format!("https://api.example.com/item/{n}");
        events.push(Event::new(
            "webRequest.onBeforeRequest",
            json!({ "tabId": 1, "frameId": 7, "requestId": n.to_string(), "url": url, "method": "POST" }),
        ));
        events.push(Event::new(
            "webRequest.onBeforeSendHeaders",
            json!({
                "tabId": 1, "frameId": 7, "requestId": n.to_string(), "url": url,
                "requestHeaders": [{ "name": "X-Seq", "value": n.to_string() }],
            }),
        ));
    }
    events
}

fn last_match(size: usize) -> (String, BTreeMap<String, String>) {
    let last = size - 1;
    let mut headers = BTreeMap::new();
    headers.insert("X-Seq".to_string(), last.to_string());
    (format!("/item/{last}"), headers)
}

// ============================================================================
// Benchmark: Store Resolve
// ============================================================================

fn bench_store_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_resolve");

    for &size in BUCKET_SIZES {
        let store = populated(size);
        let (fragment, headers) = last_match(size);

        group.bench_with_input(BenchmarkId::new("last_entry", size), &size, |b, _| {
            b.iter(|| {
                black_box(
                    store
                        .resolve(tab(), WIDGET, black_box(&fragment), black_box(&headers))
                        .is_ok(),
                )
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Background Round Trip
// ============================================================================

fn bench_background_lookup(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("background_lookup");

    for &size in BUCKET_SIZES {
        let (handle, _task) = rt.block_on(async { Background::new(&ReplayConfig::default()).spawn() });
        for event in capture_events(size) {
            handle.emit(event).expect("background running");
        }
        let (fragment, headers) = last_match(size);
        let (handle_ref, fragment_ref, headers_ref) = (&handle, &fragment, &headers);

        group.bench_with_input(BenchmarkId::new("dispatch", size), &size, |b, _| {
            b.to_async(&rt).iter(|| async move {
                let reply = handle_ref
                    .dispatch(
                        tab(),
                        BackgroundCommand::GetRequestForReplay {
                            url: fragment_ref.clone(),
                            headers: Some(headers_ref.clone()),
                            href: Some(WIDGET.to_string()),
                        },
                    )
                    .await;
                black_box(reply.map(|r| r.success).unwrap_or(false))
            });
        });

        handle.shutdown();
    }

    group.finish();
}

criterion_group!(benches, bench_store_resolve, bench_background_lookup);
criterion_main!(benches);
