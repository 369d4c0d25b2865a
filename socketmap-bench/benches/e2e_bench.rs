//! End-to-end client-server benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use socketmap_client::{Client, ConnectionConfig};
use socketmap_server::{Backend, MemoryBackend, RequestHandler, Server, ServerConfig, Session};
use std::sync::Arc;
use tokio::runtime::Runtime;

fn memory_backend() -> Arc<dyn Backend> {
    let backend = MemoryBackend::new();
    for i in 0..10_000 {
        backend.insert("aliases", format!("user{}", i), format!("user{}@example.com", i));
    }
    Arc::new(backend)
}

struct TestSetup {
    _server: Arc<Server>,
    client: Client,
}

fn setup_server_and_client(rt: &Runtime) -> TestSetup {
    let (server, addr) = rt.block_on(async {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Arc::new(Server::new(ServerConfig::new(addr), memory_backend()));
        let server_clone = server.clone();
        tokio::spawn(async move {
            let _ = server_clone.serve(listener).await;
        });
        (server, addr)
    });

    let client = Client::new(ConnectionConfig::new(addr));
    rt.block_on(async { client.connect().await.unwrap() });

    TestSetup {
        _server: server,
        client,
    }
}

fn bench_lookup_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let setup = setup_server_and_client(&rt);

    let mut group = c.benchmark_group("e2e_lookup");
    group.throughput(Throughput::Elements(1));

    group.bench_function("found", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(setup.client.lookup("aliases", "user42").await.unwrap()) });
    });

    group.bench_function("not_found", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(setup.client.lookup("aliases", "nobody").await.unwrap()) });
    });

    group.finish();
}

fn bench_handler_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let handler = RequestHandler::new(memory_backend());

    c.bench_function("handler_dispatch", |b| {
        b.to_async(&rt).iter(|| async {
            let mut session = Session::new("127.0.0.1:40000".parse().unwrap());
            black_box(handler.handle(&mut session, b"aliases user42").await)
        });
    });
}

criterion_group!(benches, bench_lookup_latency, bench_handler_dispatch);

criterion_main!(benches);
