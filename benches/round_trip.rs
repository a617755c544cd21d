//! Request round-trip benchmark suite.
//!
//! Measures channel setup and request/response latency over the loopback
//! transport at different levels of concurrency:
//! - In-flight requests: 1, 10, 50
//!
//! Run with: cargo bench --bench round_trip
//! Results saved to: target/criterion/

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

use wallet_bridge::transport::EmbeddedContext;
use wallet_bridge::{LoopbackHost, WalletApp, WalletClient, WalletListener};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const HOST_ORIGIN: &str = "https://host.example";
const WALLET_URL: &str = "https://wallet.example/app";
const CONCURRENCY: &[usize] = &[1, 10, 50];

// ============================================================================
// Wallet
// ============================================================================

struct EchoWallet;

#[async_trait]
impl WalletApp for EchoWallet {
    async fn items(&self) -> wallet_bridge::Result<Value> {
        Ok(json!([{ "name": "sword", "tokenId": "1" }]))
    }
}

fn host_with_wallet() -> Arc<LoopbackHost> {
    let host = LoopbackHost::new(HOST_ORIGIN);
    host.add_element("wallet", "div");
    host.set_wallet(|ctx: EmbeddedContext| {
        if let Ok(listener) = WalletListener::attach(ctx.window.surface(), ctx.parent, EchoWallet) {
            ctx.window.on_unload(move || listener.handle_unload());
        }
    });
    host
}

async fn open_channel(host: &LoopbackHost) -> WalletClient {
    WalletClient::builder()
        .wallet_app_url(WALLET_URL)
        .target_id("wallet")
        .frame(host)
        .await
        .expect("channel opens")
}

// ============================================================================
// Benchmark: Channel Setup
// ============================================================================

fn bench_channel_setup(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let host = rt.block_on(async { host_with_wallet() });

    c.bench_function("channel_setup", |b| {
        b.to_async(&rt).iter(|| async {
            let client = open_channel(&host).await;
            client.destroy();
        });
    });
}

// ============================================================================
// Benchmark: Request Round Trip
// ============================================================================

fn bench_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let (_host, client) = rt.block_on(async {
        let host = host_with_wallet();
        let client = open_channel(&host).await;
        (host, client)
    });

    let mut group = c.benchmark_group("round_trip");

    for &in_flight in CONCURRENCY {
        group.bench_with_input(
            BenchmarkId::new("items", in_flight),
            &in_flight,
            |b, &in_flight| {
                b.to_async(&rt).iter(|| async {
                    let requests: Vec<_> = (0..in_flight).map(|_| client.items()).collect();
                    futures_util::future::try_join_all(requests)
                        .await
                        .expect("responses")
                });
            },
        );
    }

    group.finish();
    client.destroy();
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_channel_setup, bench_round_trip);
criterion_main!(benches);
