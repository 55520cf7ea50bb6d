use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use futures::executor::block_on;
use http::Method;
use relayroute::controller::{ActionTable, Controller, RouteDescription};
use relayroute::middleware::RequestLog;
use relayroute::{HandlerError, Pipeline, RawRequest, RecordingSink, RequestContext};
use serde_json::json;

fn example_routes() -> &'static str {
    r#"
GET:
  /: root
  /zoo/animals: list
  /zoo/animals/{id}: [load, show]
  /zoo/animals/{id}/toys/{toy_id}: show
  /zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}: show
  /complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}: show
POST:
  /zoo/animals: create
  /inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}: create
PUT:
  /zoo/animals/{id}: show
DELETE:
  /zoo/animals/{id}: show
"#
}

struct Zoo;

impl Controller for Zoo {
    fn routes(&self) -> RouteDescription {
        RouteDescription::from_yaml(example_routes()).unwrap_or_default()
    }

    fn actions() -> ActionTable<Self> {
        ActionTable::new()
            .action("root", |_: &Zoo, _: &RequestContext| Ok::<_, HandlerError>("zoo"))
            .action("list", |_: &Zoo, _: &RequestContext| {
                Ok::<_, HandlerError>(json!(["lion", "tiger"]))
            })
            .action("load", |_: &Zoo, ctx: &RequestContext| {
                ctx.locals().insert("animal", json!(ctx.param("id")));
                Ok::<_, HandlerError>(())
            })
            .action("show", |_: &Zoo, ctx: &RequestContext| {
                Ok::<_, HandlerError>(json!({ "params": ctx.params().len() }))
            })
            .action("create", |_: &Zoo, _: &RequestContext| {
                Err::<(), _>(HandlerError::http(405, "read only"))
            })
    }
}

fn pipeline() -> Pipeline {
    let mut pipeline = Pipeline::new();
    pipeline.register_middleware(RequestLog);
    pipeline
        .bind_controller(Arc::new(Zoo))
        .expect("failed to bind zoo controller");
    pipeline
}

const TEST_PATHS: [(Method, &str); 5] = [
    (Method::GET, "/zoo/animals/123"),
    (Method::GET, "/zoo/animals/123/toys/456"),
    (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
    (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
    (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
];

fn bench_route_throughput(c: &mut Criterion) {
    let pipeline = pipeline();
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in TEST_PATHS.iter() {
                let res = pipeline.routes().route(method, path);
                black_box(&res);
            }
        })
    });
}

fn bench_dispatch_throughput(c: &mut Criterion) {
    let pipeline = pipeline();
    c.bench_function("dispatch", |b| {
        b.iter(|| {
            for (method, path) in TEST_PATHS.iter() {
                let mut sink = RecordingSink::new();
                let d = block_on(pipeline.handle(
                    RawRequest::new(method.clone(), path),
                    &mut sink,
                    || {},
                ));
                black_box((d, sink));
            }
        })
    });
}

criterion_group!(benches, bench_route_throughput, bench_dispatch_throughput);
criterion_main!(benches);
