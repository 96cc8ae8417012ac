use bendf::demo::{self, TaskStore};
use bendf::dispatcher::{Dispatcher, DispatcherBuilder, HandlerResponse};
use bendf::route::{HandlerError, RouteDefinition};
use bendf::security::{AuthorizerError, JwtRoleAuthorizer, StaticTokenAuthorizer};
use bendf::server::RawRequest;
use http::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod common;
use common::multipart_body::MultipartBuilder;
use common::raw_request::unsigned_jwt;

fn demo_builder(store: &Arc<TaskStore>) -> DispatcherBuilder {
    Dispatcher::builder().routes(demo::routes(store).unwrap())
}

fn admin_dispatcher() -> Dispatcher {
    let store = Arc::new(TaskStore::new());
    demo_builder(&store)
        .authorizer(
            StaticTokenAuthorizer::new()
                .token("admin", json!({ "id": "1", "name": "Ada", "role": "ADMIN" }))
                .token("member", json!({ "id": "2", "name": "Bo", "role": "MEMBER" })),
        )
        .build()
}

fn post_json(path: &str, body: &Value) -> RawRequest {
    RawRequest::new(Method::POST, path).json(body)
}

fn counting_route(calls: &Arc<AtomicUsize>) -> RouteDefinition {
    let calls = Arc::clone(calls);
    RouteDefinition::builder()
        .method("DELETE")
        .path("/admin/things/{id}")
        .roles(["ADMIN"])
        .handler(move |_req| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "deleted": true }))
        })
        .build()
        .unwrap()
}

#[test]
fn test_unknown_route_is_404() {
    let resp = admin_dispatcher().dispatch(&RawRequest::new(Method::DELETE, "/nonexistent"));
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body, json!({ "error": "Route not found" }));
    assert_eq!(resp.get_header("content-type"), Some("application/json"));
    assert!(resp.get_header("x-request-id").is_some());
}

#[test]
fn test_request_id_is_echoed() {
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let req = RawRequest::new(Method::GET, "/hello").header("X-Request-ID", id);
    let resp = admin_dispatcher().dispatch(&req);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.get_header("x-request-id"), Some(id));
}

#[test]
fn test_forbidden_short_circuits_before_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = Dispatcher::builder()
        .route(counting_route(&calls))
        .authorizer_fn(|_req| Ok(Some(Value::Bool(false))))
        .build();

    let resp = dispatcher.dispatch(&RawRequest::new(Method::DELETE, "/admin/things/1"));
    assert_eq!(resp.status, 403);
    assert_eq!(
        resp.body,
        json!({ "error": "Forbidden", "message": "Insufficient permissions" })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_authorizer_error_is_403_without_details() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = Dispatcher::builder()
        .route(counting_route(&calls))
        .authorizer_fn(|_req| Err(AuthorizerError::new("database down: password=hunter2")))
        .build();

    let resp = dispatcher.dispatch(&RawRequest::new(Method::DELETE, "/admin/things/1"));
    assert_eq!(resp.status, 403);
    assert_eq!(resp.body, json!({ "error": "Authorization failed" }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_panicking_authorizer_is_403() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = Dispatcher::builder()
        .route(counting_route(&calls))
        .authorizer_fn(|_req| panic!("boom"))
        .build();

    let resp = dispatcher.dispatch(&RawRequest::new(Method::DELETE, "/admin/things/1"));
    assert_eq!(resp.status, 403);
    assert_eq!(resp.body, json!({ "error": "Authorization failed" }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The dispatcher stays usable after the panic.
    let again = dispatcher.dispatch(&RawRequest::new(Method::DELETE, "/admin/things/2"));
    assert_eq!(again.status, 403);
}

#[test]
fn test_no_authorizer_lets_role_routes_through() {
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatcher = Dispatcher::builder().route(counting_route(&calls)).build();

    let resp = dispatcher.dispatch(&RawRequest::new(Method::DELETE, "/admin/things/9"));
    assert_eq!(resp.status, 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_authorizer_only_consulted_for_role_routes() {
    let consulted = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&consulted);
    let store = Arc::new(TaskStore::new());
    let dispatcher = demo_builder(&store)
        .authorizer_fn(move |_req| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        })
        .build();

    assert_eq!(dispatcher.dispatch(&RawRequest::new(Method::GET, "/hello")).status, 200);
    assert_eq!(consulted.load(Ordering::SeqCst), 0);
    assert_eq!(dispatcher.dispatch(&RawRequest::new(Method::GET, "/tasks")).status, 403);
    assert_eq!(consulted.load(Ordering::SeqCst), 1);
}

#[test]
fn test_create_task_end_to_end() {
    let dispatcher = admin_dispatcher();
    let req = post_json("/tasks", &json!({ "title": "Write docs", "description": "All of them" }))
        .header("Authorization", "Bearer admin");

    let resp = dispatcher.dispatch(&req);
    assert_eq!(resp.status, 200, "{}", resp.body);
    assert_eq!(
        resp.body,
        json!({
            "task": {
                "id": "1",
                "title": "Write docs",
                "description": "All of them",
                "status": "active"
            }
        })
    );

    let member = post_json("/tasks", &json!({ "title": "t", "description": "d" }))
        .header("Authorization", "Bearer member");
    assert_eq!(dispatcher.dispatch(&member).status, 403);

    let listed = dispatcher
        .dispatch(&RawRequest::new(Method::GET, "/tasks").header("Authorization", "Bearer member"));
    assert_eq!(listed.status, 200);
    assert_eq!(listed.body["tasks"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_principal_reaches_handler() {
    let route = RouteDefinition::builder()
        .method("GET")
        .path("/me")
        .roles(["MEMBER"])
        .handler(|req| Ok(req.auth_data.unwrap_or(Value::Null)))
        .build()
        .unwrap();
    let token = unsigned_jwt(&json!({ "sub": "42", "role": "MEMBER" }));
    let dispatcher = Dispatcher::builder()
        .route(route)
        .authorizer(JwtRoleAuthorizer::new())
        .build();

    let resp = dispatcher.dispatch(
        &RawRequest::new(Method::GET, "/me").header("Authorization", format!("Bearer {token}")),
    );
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({ "sub": "42", "role": "MEMBER" }));

    let bad = dispatcher
        .dispatch(&RawRequest::new(Method::GET, "/me").header("Authorization", "Bearer not.a-jwt"));
    assert_eq!(bad.status, 403);
}

#[test]
fn test_input_validation_failure_is_500() {
    let dispatcher = admin_dispatcher();
    let req = post_json("/tasks", &json!({ "title": 5, "description": "d" }))
        .header("Authorization", "Bearer admin");
    let resp = dispatcher.dispatch(&req);
    assert_eq!(resp.status, 500);
    let message = resp.body["error"].as_str().unwrap();
    assert!(message.starts_with("Validation failed"), "{message}");
}

#[test]
fn test_invalid_json_is_500() {
    let dispatcher = admin_dispatcher();
    let req = RawRequest::new(Method::POST, "/upload")
        .header("Content-Type", "application/json")
        .body("{not json");
    let resp = dispatcher.dispatch(&req);
    assert_eq!(resp.status, 500);
    assert!(resp.body["error"].is_string());

    let empty = dispatcher.dispatch(&RawRequest::new(Method::POST, "/upload"));
    assert_eq!(empty.status, 500);
}

#[test]
fn test_multipart_upload() {
    let dispatcher = admin_dispatcher();
    let builder = MultipartBuilder::new()
        .field("description", "holiday")
        .file("photos", "a.jpg", Some("image/jpeg"), &[0xFF, 0xD8, 0x00, 0x01])
        .file("photos", "b.jpg", Some("image/jpeg"), &[0xFF, 0xD8])
        .file("notes", "n.txt", None, b"hello");
    let req = RawRequest::new(Method::POST, "/upload")
        .header("Content-Type", builder.content_type())
        .body(builder.build());

    let resp = dispatcher.dispatch(&req);
    assert_eq!(resp.status, 200, "{}", resp.body);
    assert_eq!(
        resp.body["message"],
        "Successfully uploaded 3 file(s). Description: holiday"
    );
    let files = resp.body["files"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert!(files.contains(&json!({ "filename": "n.txt", "mimetype": "text/plain", "size": 5 })));
}

#[test]
fn test_multipart_without_files_is_handler_error() {
    let dispatcher = admin_dispatcher();
    let builder = MultipartBuilder::new().field("description", "nothing attached");
    let req = RawRequest::new(Method::POST, "/upload")
        .header("Content-Type", builder.content_type())
        .body(builder.build());

    let resp = dispatcher.dispatch(&req);
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, json!({ "error": "No files uploaded" }));
}

#[test]
fn test_multipart_missing_boundary_is_500() {
    let dispatcher = admin_dispatcher();
    let req = RawRequest::new(Method::POST, "/upload")
        .header("Content-Type", "multipart/form-data")
        .body("--x\r\n\r\n");
    let resp = dispatcher.dispatch(&req);
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, json!({ "error": "Missing boundary in multipart data" }));
}

#[test]
fn test_query_and_path_params_merged() {
    let route = RouteDefinition::builder()
        .method("GET")
        .path("/orgs/{org}/members")
        .handler(|req| Ok(req.query_params.unwrap_or(Value::Null)))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::builder().route(route).build();

    let resp = dispatcher.dispatch(&RawRequest::new(
        Method::GET,
        "/orgs/acme/members?org=ignored&q=a%20b&page=2",
    ));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({ "org": "acme", "q": "a b", "page": "2" }));
}

#[test]
fn test_query_params_schema_is_enforced() {
    let dispatcher = admin_dispatcher();
    let auth = ("Authorization", "Bearer admin");

    let ok = dispatcher
        .dispatch(&RawRequest::new(Method::GET, "/tasks?status=active").header(auth.0, auth.1));
    assert_eq!(ok.status, 200);

    let bad = dispatcher
        .dispatch(&RawRequest::new(Method::GET, "/tasks?status=archived").header(auth.0, auth.1));
    assert_eq!(bad.status, 500);
}

#[test]
fn test_absent_query_params_is_none() {
    let route = RouteDefinition::builder()
        .method("GET")
        .path("/plain")
        .handler(|req| {
            Ok(json!({
                "has_query": req.query_params.is_some(),
                "has_input": req.input.is_some()
            }))
        })
        .build()
        .unwrap();
    let dispatcher = Dispatcher::builder().route(route).build();
    let resp = dispatcher.dispatch(&RawRequest::new(Method::GET, "/plain"));
    assert_eq!(resp.body, json!({ "has_query": false, "has_input": false }));
}

#[test]
fn test_handler_panic_is_500() {
    let route = RouteDefinition::builder()
        .method("GET")
        .path("/boom")
        .handler(|_req| -> Result<Value, HandlerError> { panic!("kaboom") })
        .build()
        .unwrap();
    let dispatcher = Dispatcher::builder().route(route).build();

    let resp = dispatcher.dispatch(&RawRequest::new(Method::GET, "/boom"));
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, json!({ "error": "Handler panicked: kaboom" }));

    // the dispatcher keeps serving
    assert_eq!(dispatcher.dispatch(&RawRequest::new(Method::GET, "/boom")).status, 500);
}

#[test]
fn test_opaque_handler_error() {
    let route = RouteDefinition::builder()
        .method("GET")
        .path("/opaque")
        .handler(|_req| Err(HandlerError::opaque()))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::builder().route(route).build();
    let resp = dispatcher.dispatch(&RawRequest::new(Method::GET, "/opaque"));
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, json!({ "error": "Internal server error" }));
}

#[test]
fn test_response_validation_failure_is_500() {
    let route = RouteDefinition::builder()
        .method("GET")
        .path("/wrong")
        .handler(|_req| Ok(json!({ "count": "three" })))
        .response_schema(json!({
            "type": "object",
            "properties": { "count": { "type": "integer" } },
            "required": ["count"]
        }))
        .build()
        .unwrap();
    let dispatcher = Dispatcher::builder().route(route).build();
    let resp = dispatcher.dispatch(&RawRequest::new(Method::GET, "/wrong"));
    assert_eq!(resp.status, 500);
    assert!(resp.body["error"].as_str().unwrap().starts_with("Validation failed"));
}

#[test]
fn test_body_cap() {
    let store = Arc::new(TaskStore::new());
    let dispatcher = demo_builder(&store).max_body_bytes(Some(16)).build();
    let req = post_json("/upload", &json!({ "description": "far more than sixteen bytes" }));
    let resp = dispatcher.dispatch(&req);
    assert_eq!(resp.status, 413);
    assert_eq!(resp.body["error"], "Request body too large");

    let unbounded = demo_builder(&store).max_body_bytes(None).build();
    // no files, so the handler rejects it, but the body was accepted
    assert_eq!(unbounded.dispatch(&req).body, json!({ "error": "No files uploaded" }));
}

#[test]
fn test_docs_catalog() {
    let store = Arc::new(TaskStore::new());
    let dispatcher = demo_builder(&store).docs_path("/docs").build();

    let resp = dispatcher.dispatch(&RawRequest::new(Method::GET, "/docs"));
    assert_eq!(resp.status, 200);
    let catalog = resp.body.as_array().unwrap();
    assert_eq!(catalog.len(), 5);

    let create = catalog
        .iter()
        .find(|r| r["method"] == "POST" && r["path"] == "/tasks")
        .unwrap();
    assert_eq!(create["roles"], json!(["ADMIN"]));
    assert_eq!(create["input"]["type"], "object");
    assert_eq!(create["input"]["properties"]["status"]["default"], "active");
    assert_eq!(create["queryParams"], Value::Null);

    // only GET is served from the docs path
    let post = dispatcher.dispatch(&RawRequest::new(Method::POST, "/docs"));
    assert_eq!(post.status, 404);
}

#[test]
fn test_docs_disabled_by_default() {
    let resp = admin_dispatcher().dispatch(&RawRequest::new(Method::GET, "/docs"));
    assert_eq!(resp.status, 404);
}

#[test]
fn test_concurrent_dispatch() {
    let dispatcher = Arc::new(admin_dispatcher());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                let req = post_json(
                    "/tasks",
                    &json!({ "title": format!("task {i}"), "description": "d" }),
                )
                .header("Authorization", "Bearer admin");
                dispatcher.dispatch(&req).status
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 200);
    }

    let listed: HandlerResponse = dispatcher
        .dispatch(&RawRequest::new(Method::GET, "/tasks").header("Authorization", "Bearer admin"));
    assert_eq!(listed.body["tasks"].as_array().map(Vec::len), Some(8));
}
