use criterion::{criterion_group, criterion_main, Criterion};
use metacached::Client;
use tokio::runtime::Runtime;

const LARGE_PAYLOAD_SIZE: usize = 1000 * 1024; // Memcached's ~default maximum payload size

async fn setup_client() -> Client {
    let (client, mut pipeline) = Client::connect("tcp://127.0.0.1:11211")
        .await
        .expect("failed to create client");

    tokio::spawn(async move {
        let _ = pipeline.run().await;
    });

    client
}

fn bench_get(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    rt.block_on(async {
        let client = setup_client().await;
        client.set("foo", &String::from("bar"), None).await.unwrap();
    });

    c.bench_function("get_small", |b| {
        b.to_async(&rt).iter_custom(|iters| async move {
            let client = setup_client().await;
            let start = std::time::Instant::now();
            for _ in 0..iters {
                let _ = client.get::<_, String>("foo").await;
            }
            start.elapsed()
        });
    });
}

fn bench_set_with_string(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("set_small_with_string", |b| {
        b.to_async(&rt).iter_custom(|iters| async move {
            let client = setup_client().await;
            let payload = String::from("bar");
            let start = std::time::Instant::now();
            for _ in 0..iters {
                let _ = client.set("foo", &payload, None).await;
            }
            start.elapsed()
        });
    });
}

fn bench_set_with_large_string(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("set_with_large_string", |b| {
        b.to_async(&rt).iter_custom(|iters| async move {
            let client = setup_client().await;
            let large_payload = "a".repeat(LARGE_PAYLOAD_SIZE);
            let start = std::time::Instant::now();
            for _ in 0..iters {
                let _ = client.set("large_foo", &large_payload, None).await;
            }
            start.elapsed()
        });
    });
}

fn bench_pipelined_gets(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    rt.block_on(async {
        let client = setup_client().await;
        client.set("foo", &String::from("bar"), None).await.unwrap();
    });

    c.bench_function("get_small_pipelined_x8", |b| {
        b.to_async(&rt).iter_custom(|iters| async move {
            let client = setup_client().await;
            let start = std::time::Instant::now();
            for _ in 0..iters {
                let mut tasks = Vec::with_capacity(8);
                for _ in 0..8 {
                    let client = client.clone();
                    tasks.push(tokio::spawn(async move {
                        let _ = client.get::<_, String>("foo").await;
                    }));
                }
                for task in tasks {
                    let _ = task.await;
                }
            }
            start.elapsed()
        });
    });
}

criterion_group!(
    benches,
    bench_get,
    bench_set_with_string,
    bench_set_with_large_string,
    bench_pipelined_gets
);
criterion_main!(benches);
