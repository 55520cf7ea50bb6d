use std::sync::Arc;
use std::time::Duration;

use relayroute::handler::{from_async, from_fn};
use relayroute::{Disposition, HandlerChain, HandlerError, Pipeline, RecordingSink};
use serde_json::json;

mod common;
use common::{get, PassCounter};

fn shared_pipeline() -> Arc<Pipeline> {
    let mut pipeline = Pipeline::new();
    pipeline.register_middleware(from_fn("stamp", |ctx| {
        ctx.locals().insert("seen", json!(ctx.param("n")));
        Ok::<_, HandlerError>(())
    }));
    pipeline
        .get(
            "/work/:n",
            HandlerChain::new()
                .then(from_async("jitter", |ctx| async move {
                    let n: u64 = ctx.param("n").unwrap_or("0").parse()?;
                    tokio::time::sleep(Duration::from_millis(n % 7)).await;
                    Ok::<_, HandlerError>(())
                }))
                .then(from_fn("reply", |ctx| {
                    let n: u64 = ctx.param("n").unwrap_or("0").parse()?;
                    match n % 3 {
                        0 => Ok(Some(json!({ "n": n, "seen": ctx.locals().get("seen") }))),
                        1 => Err(HandlerError::bad_request(json!({ "n": n }))),
                        _ => Ok(None),
                    }
                })),
        )
        .unwrap();
    Arc::new(pipeline)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_stay_isolated() {
    let pipeline = shared_pipeline();
    let mut tasks = Vec::new();

    for n in 0..300u64 {
        let pipeline = Arc::clone(&pipeline);
        tasks.push(tokio::spawn(async move {
            let mut sink = RecordingSink::new();
            let passes = PassCounter::default();
            let d = pipeline
                .handle(get(&format!("/work/{n}")), &mut sink, passes.action())
                .await;
            (n, d, sink, passes.count())
        }));
    }

    for task in tasks {
        let (n, d, sink, passes) = task.await.unwrap();
        assert_eq!(sink.send_count() + passes, 1, "request {n}");
        match n % 3 {
            0 => {
                assert_eq!(d, Disposition::Responded { status: 200 });
                let body: serde_json::Value =
                    serde_json::from_str(&sink.body_text().unwrap()).unwrap();
                assert_eq!(body, json!({ "n": n, "seen": n.to_string() }));
            }
            1 => {
                assert_eq!(d, Disposition::Responded { status: 400 });
                assert_eq!(sink.body_text().unwrap(), format!("{{\"n\":{n}}}"));
            }
            _ => {
                assert_eq!(d, Disposition::PassedThrough);
                assert_eq!(passes, 1);
            }
        }
    }

    let stats = pipeline.stats();
    assert_eq!(stats.requests, 300);
    assert_eq!(stats.responded, 200);
    assert_eq!(stats.failed, 100);
    assert_eq!(stats.passed_through, 100);
}
