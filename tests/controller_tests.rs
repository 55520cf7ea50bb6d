use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::Method;
use relayroute::controller::{ActionTable, Controller, RouteDescription};
use relayroute::{
    Disposition, HandlerError, Pipeline, PipelineConfig, PipelineError, RequestContext,
};
use serde_json::json;

mod common;
use common::{get, post_json, run, TestTracing};

/// Controller with receiver state the actions must see.
struct Pets {
    names: Vec<&'static str>,
    lookups: AtomicUsize,
}

impl Pets {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            names: vec!["Rex", "Tom"],
            lookups: AtomicUsize::new(0),
        })
    }

    fn require_key(&self, ctx: &RequestContext) -> Result<(), HandlerError> {
        match ctx.header("x-api-key") {
            Some("k") => Ok(()),
            _ => Err(HandlerError::unauthorized(json!({ "error": "Unauthorized" }))),
        }
    }

    fn show(&self, ctx: &RequestContext) -> Result<serde_json::Value, HandlerError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let idx: usize = ctx.param("id").unwrap_or_default().parse()?;
        self.names
            .get(idx)
            .map(|name| json!({ "id": idx, "name": name }))
            .ok_or_else(|| HandlerError::not_found(json!({ "error": "no such pet" })))
    }
}

impl Controller for Pets {
    fn name(&self) -> &str {
        "Pets"
    }

    fn routes(&self) -> RouteDescription {
        RouteDescription::new()
            .route(Method::GET, "/pets", &["index"])
            .route(Method::GET, "/pets/:id", &["require_key", "show"])
            .route(Method::POST, "/pets", &["require_key", "create", "not_an_action"])
            .route(Method::DELETE, "/pets/:id", &["destroy"])
    }

    fn actions() -> ActionTable<Self> {
        ActionTable::new()
            .action("index", |pets: &Pets, _: &RequestContext| {
                Ok::<_, HandlerError>(json!(pets.names))
            })
            .action("require_key", Pets::require_key)
            .action("show", Pets::show)
            .async_action("create", |pets: Arc<Pets>, ctx: Arc<RequestContext>| async move {
                tokio::task::yield_now().await;
                let body = ctx.body().cloned().unwrap_or_default();
                Ok::<_, HandlerError>(json!({ "created": body, "known": pets.names.len() }))
            })
    }
}

#[tokio::test]
async fn test_bind_registers_resolvable_routes() {
    let _tracing = TestTracing::init();
    let mut pipeline = Pipeline::new();
    let bound = pipeline.bind_controller(Pets::new()).unwrap();

    // DELETE /pets/:id only names an unknown action, so it is skipped
    assert_eq!(bound, 3);
    assert_eq!(
        pipeline.routes().describe(),
        vec!["GET /pets", "GET /pets/:id", "POST /pets"]
    );

    let r = run(&pipeline, get("/pets")).await;
    assert_eq!(r.json(), json!(["Rex", "Tom"]));

    let r = run(&pipeline, get("/pets/1")).await;
    assert_eq!(r.disposition, Disposition::Responded { status: 401 });

    let r = run(&pipeline, get("/pets/1").with_header("x-api-key", "k")).await;
    assert_eq!(r.json(), json!({ "id": 1, "name": "Tom" }));

    let r = run(&pipeline, get("/pets/7").with_header("x-api-key", "k")).await;
    assert_eq!(r.status(), Some(404));

    let r = run(&pipeline, http_delete("/pets/1")).await;
    assert_eq!(r.disposition, Disposition::PassedThrough);
}

fn http_delete(target: &str) -> relayroute::RawRequest {
    relayroute::RawRequest::new(Method::DELETE, target)
}

#[tokio::test]
async fn test_unknown_action_is_dropped_from_chain() {
    let _tracing = TestTracing::init();
    let mut pipeline = Pipeline::new();
    pipeline.bind_controller(Pets::new()).unwrap();

    let entry = pipeline
        .routes()
        .iter()
        .find(|e| e.method() == Method::POST)
        .unwrap();
    let names: Vec<&str> = entry.handlers().iter().map(|h| h.name()).collect();
    assert_eq!(names, vec!["Pets.require_key", "Pets.create"]);

    let r = run(
        &pipeline,
        post_json("/pets", json!({ "name": "Kit" })).with_header("x-api-key", "k"),
    )
    .await;
    assert_eq!(r.json(), json!({ "created": { "name": "Kit" }, "known": 2 }));
}

#[tokio::test]
async fn test_actions_share_controller_instance() {
    let _tracing = TestTracing::init();
    let pets = Pets::new();
    let mut pipeline = Pipeline::new();
    pipeline.bind_controller(Arc::clone(&pets)).unwrap();

    for id in ["0", "1", "0"] {
        run(
            &pipeline,
            get(&format!("/pets/{id}")).with_header("x-api-key", "k"),
        )
        .await;
    }
    assert_eq!(pets.lookups.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_strict_binding_rejects_unknown_action() {
    let _tracing = TestTracing::init();
    let config = PipelineConfig {
        strict_binding: true,
        ..PipelineConfig::default()
    };
    let mut pipeline = Pipeline::with_config(config);
    let err = pipeline.bind_controller(Pets::new()).unwrap_err();
    assert_eq!(
        err,
        PipelineError::UnknownAction {
            controller: "Pets".to_string(),
            action: "not_an_action".to_string(),
        }
    );
    assert!(pipeline.routes().is_empty());
}

#[tokio::test]
async fn test_bind_from_json_description() {
    let _tracing = TestTracing::init();
    let description = RouteDescription::from_json(
        r#"{
            "get": {
                "/animals": "index",
                "/animals/{id}": ["require_key", "show"]
            }
        }"#,
    )
    .unwrap();

    let mut pipeline = Pipeline::new();
    let bound = pipeline
        .bind_controller_with(&description, Pets::new())
        .unwrap();
    assert_eq!(bound, 2);

    let r = run(&pipeline, get("/animals/0").with_header("x-api-key", "k")).await;
    assert_eq!(r.json(), json!({ "id": 0, "name": "Rex" }));
}

#[tokio::test]
async fn test_bind_from_yaml_description() {
    let _tracing = TestTracing::init();
    let description = RouteDescription::from_yaml(
        r#"
GET:
  /zoo: index
post:
  /zoo:
    - require_key
    - create
"#,
    )
    .unwrap();
    assert_eq!(description.len(), 2);

    let mut pipeline = Pipeline::new();
    pipeline
        .bind_controller_with(&description, Pets::new())
        .unwrap();

    let r = run(&pipeline, post_json("/zoo", json!({ "name": "Kit" }))).await;
    assert_eq!(r.status(), Some(401));
}

#[test]
fn test_description_rejects_unknown_method() {
    let err = RouteDescription::from_yaml("brew:\n  /pot: pour\n").unwrap_err();
    assert!(matches!(err, PipelineError::Description(msg) if msg.contains("brew")));
}

#[test]
fn test_bind_with_bad_pattern_registers_nothing() {
    let description = RouteDescription::new()
        .route(Method::GET, "/ok", &["index"])
        .route(Method::GET, "bad", &["index"]);

    let mut pipeline = Pipeline::new();
    let err = pipeline
        .bind_controller_with(&description, Pets::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidPattern { ref pattern, .. } if pattern == "bad"));
    assert!(pipeline.routes().is_empty());
}
