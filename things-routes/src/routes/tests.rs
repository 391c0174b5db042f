//! All tests in this module are intended to test the contract made by the API,
//! e.g. return codes, bodies, headers and how path ids are handled.
use super::build;
use super::responses::{DELETED_MESSAGE, SAVED_MESSAGE, UPDATED_MESSAGE};
use crate::cors::{ALLOW_HEADERS_VALUE, ALLOW_METHODS_VALUE};
use crate::state::ThingAppState;
use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum_test::{TestResponse, TestServer};
use mockall::{mock, predicate};
use serde_json::{Value, json};
use std::sync::Arc;
use things_core::model::{NewThing, Thing};
use things_core::result::{OptRepoResult, RepoResult};
use things_core::{ThingEngine, ThingFields, ThingRepository};
use uuid::Uuid;

mock! {
    pub ThingRepo {}

    impl ThingRepository for ThingRepo {
        type ThingId = Uuid;

        fn get(&self, id: Uuid) -> impl Future<Output = OptRepoResult<Thing<Uuid>>> + Send;

        fn list(&self) -> impl Future<Output = RepoResult<Vec<Thing<Uuid>>>> + Send;

        fn create(
            &self,
            new_thing: NewThing,
        ) -> impl Future<Output = RepoResult<Thing<Uuid>>> + Send;

        fn replace(
            &self,
            id: Uuid,
            thing: NewThing,
        ) -> impl Future<Output = OptRepoResult<()>> + Send;

        fn delete(&self, id: Uuid) -> impl Future<Output = OptRepoResult<()>> + Send;
    }
}

#[derive(Clone)]
struct TestEngine {
    repo: Arc<MockThingRepo>,
}

impl TestEngine {
    fn new(repo: MockThingRepo) -> Self {
        Self {
            repo: Arc::new(repo),
        }
    }
}

impl ThingEngine for TestEngine {
    type ThingId = Uuid;
    type Repo = Arc<MockThingRepo>;

    fn repo(&self) -> Self::Repo {
        Arc::clone(&self.repo)
    }
}

const ROOT: &str = "/api/stuff";

fn fields(value: Value) -> ThingFields {
    value.as_object().cloned().expect("test fields are an object")
}

fn thing_path(id: impl std::fmt::Display) -> String {
    format!("{ROOT}/{id}")
}

fn init_test_server(repo: MockThingRepo) -> TestServer {
    let routes = build(ThingAppState::new(TestEngine::new(repo)));

    TestServer::new(routes).expect("creation of test server")
}

fn assert_error_body(response: &TestResponse, root_cause: &str) {
    let body: Value = response.json();

    assert_eq!(json!("thing service failed"), body["error"]["message"]);
    let causes = body["error"]["causes"]
        .as_array()
        .expect("error causes are an array");
    assert_eq!(
        Some(&json!(root_cause)),
        causes.last(),
        "root cause is the last cause"
    );
}

mod return_scenario {
    use error_stack::IntoReport;
    use futures::{FutureExt, future::BoxFuture};
    use things_core::model::{NewThing, Thing};
    use things_core::result::{OptRepoResult, RepoResult, ThingRepoError};
    use uuid::Uuid;

    pub mod get {
        use super::*;

        pub fn not_found<'a>(_: Uuid) -> BoxFuture<'a, OptRepoResult<Thing<Uuid>>> {
            async { Ok(None) }.boxed()
        }

        pub fn found<'a>(
            thing: Thing<Uuid>,
        ) -> impl FnOnce(Uuid) -> BoxFuture<'a, OptRepoResult<Thing<Uuid>>> {
            move |_| async move { Ok(Some(thing)) }.boxed()
        }

        pub fn error<'a>() -> impl FnOnce(Uuid) -> BoxFuture<'a, OptRepoResult<Thing<Uuid>>> {
            |_| async { Err(ThingRepoError::Get.into_report()) }.boxed()
        }
    }

    pub mod list {
        use super::*;

        pub fn found<'a>(
            things: Vec<Thing<Uuid>>,
        ) -> impl FnOnce() -> BoxFuture<'a, RepoResult<Vec<Thing<Uuid>>>> {
            move || async move { Ok(things) }.boxed()
        }

        pub fn error<'a>() -> impl FnOnce() -> BoxFuture<'a, RepoResult<Vec<Thing<Uuid>>>> {
            || async { Err(ThingRepoError::List.into_report()) }.boxed()
        }
    }

    pub mod create {
        use super::*;

        pub fn stored_as<'a>(
            id: Uuid,
        ) -> impl FnOnce(NewThing) -> BoxFuture<'a, RepoResult<Thing<Uuid>>> {
            move |new_thing| async move { Ok(Thing::from_new(id, new_thing)) }.boxed()
        }

        pub fn error<'a>() -> impl FnOnce(NewThing) -> BoxFuture<'a, RepoResult<Thing<Uuid>>> {
            |_| async { Err(ThingRepoError::Create.into_report()) }.boxed()
        }
    }

    pub mod replace {
        use super::*;

        pub fn replaced<'a>(_: Uuid, _: NewThing) -> BoxFuture<'a, OptRepoResult<()>> {
            async { Ok(Some(())) }.boxed()
        }

        pub fn not_found<'a>(_: Uuid, _: NewThing) -> BoxFuture<'a, OptRepoResult<()>> {
            async { Ok(None) }.boxed()
        }

        pub fn error<'a>() -> impl FnOnce(Uuid, NewThing) -> BoxFuture<'a, OptRepoResult<()>> {
            |_, _| async { Err(ThingRepoError::Replace.into_report()) }.boxed()
        }
    }

    pub mod delete {
        use super::*;

        pub fn deleted<'a>(_: Uuid) -> BoxFuture<'a, OptRepoResult<()>> {
            async { Ok(Some(())) }.boxed()
        }

        pub fn not_found<'a>(_: Uuid) -> BoxFuture<'a, OptRepoResult<()>> {
            async { Ok(None) }.boxed()
        }

        pub fn error<'a>() -> impl FnOnce(Uuid) -> BoxFuture<'a, OptRepoResult<()>> {
            |_| async { Err(ThingRepoError::Delete.into_report()) }.boxed()
        }
    }
}

#[tokio::test]
async fn list_nothing_stored_returns_empty_array() {
    let mut repo = MockThingRepo::new();
    repo.expect_list()
        .once()
        .return_once(return_scenario::list::found(vec![]));

    let response = init_test_server(repo).get(ROOT).await;

    response.assert_status_ok();
    response.assert_json(&json!([]));
}

#[tokio::test]
async fn list_returns_every_thing() {
    let things = (0..3)
        .map(|i| Thing::new(Uuid::now_v7(), fields(json!({ "index": i }))))
        .collect::<Vec<_>>();
    let expected = things
        .iter()
        .map(|t| json!({ "_id": t.id, "index": t.fields["index"] }))
        .collect::<Vec<_>>();

    let mut repo = MockThingRepo::new();
    repo.expect_list()
        .once()
        .return_once(return_scenario::list::found(things));

    let response = init_test_server(repo).get(ROOT).await;

    response.assert_status_ok();
    response.assert_json(&expected);
}

#[tokio::test]
async fn list_storage_error_returns_bad_request() {
    let mut repo = MockThingRepo::new();
    repo.expect_list()
        .once()
        .return_once(return_scenario::list::error());

    let response = init_test_server(repo).get(ROOT).await;

    response.assert_status_bad_request();
    assert_error_body(&response, "failed to list things");
}

#[tokio::test]
async fn get_returns_stored_thing() {
    let id = Uuid::now_v7();
    let thing = Thing::new(id, fields(json!({ "title": "a", "price": 12 })));

    let mut repo = MockThingRepo::new();
    repo.expect_get()
        .with(predicate::eq(id))
        .once()
        .return_once(return_scenario::get::found(thing));

    let response = init_test_server(repo).get(&thing_path(id)).await;

    response.assert_status_ok();
    response.assert_json(&json!({ "_id": id, "title": "a", "price": 12 }));
}

// a missing thing is not a 404, only failing to read it is
#[tokio::test]
async fn get_nothing_stored_returns_ok_null() {
    let id = Uuid::now_v7();

    let mut repo = MockThingRepo::new();
    repo.expect_get()
        .with(predicate::eq(id))
        .once()
        .returning(return_scenario::get::not_found);

    let response = init_test_server(repo).get(&thing_path(id)).await;

    response.assert_status_ok();
    response.assert_json(&Value::Null);
}

#[tokio::test]
async fn get_storage_error_returns_not_found() {
    let mut repo = MockThingRepo::new();
    repo.expect_get()
        .once()
        .return_once(return_scenario::get::error());

    let response = init_test_server(repo).get(&thing_path(Uuid::now_v7())).await;

    response.assert_status_not_found();
    assert_error_body(&response, "failed to get thing");
}

#[tokio::test]
async fn get_malformed_id_returns_not_found_without_storage_call() {
    let mut repo = MockThingRepo::new();
    repo.expect_get().never();

    let response = init_test_server(repo).get(&thing_path("bad_id")).await;

    response.assert_status_not_found();
    let body: Value = response.json();
    assert_eq!(json!("thing service failed"), body["error"]["message"]);
}

#[tokio::test]
async fn create_returns_created_with_message_and_location() {
    let id = Uuid::now_v7();

    let mut repo = MockThingRepo::new();
    repo.expect_create()
        .once()
        .return_once(return_scenario::create::stored_as(id));

    let response = init_test_server(repo)
        .post(ROOT)
        .json(&json!({ "title": "a" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response.assert_json(&json!({ "message": SAVED_MESSAGE }));
    assert_eq!(thing_path(id), response.header(header::LOCATION));
}

#[tokio::test]
async fn create_drops_client_ids() {
    let mut repo = MockThingRepo::new();
    repo.expect_create()
        .with(predicate::eq(NewThing::from_fields(fields(
            json!({ "title": "a", "price": 3 }),
        ))))
        .once()
        .return_once(return_scenario::create::stored_as(Uuid::now_v7()));

    let response = init_test_server(repo)
        .post(ROOT)
        .json(&json!({ "_id": "client id", "id": 7, "title": "a", "price": 3 }))
        .await;

    response.assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn create_storage_error_returns_bad_request() {
    let mut repo = MockThingRepo::new();
    repo.expect_create()
        .once()
        .return_once(return_scenario::create::error());

    let response = init_test_server(repo)
        .post(ROOT)
        .json(&json!({ "title": "a" }))
        .await;

    response.assert_status_bad_request();
    assert_error_body(&response, "failed to create thing");
}

#[tokio::test]
async fn create_non_json_body_is_rejected_without_storage_call() {
    let mut repo = MockThingRepo::new();
    repo.expect_create().never();

    let response = init_test_server(repo).post(ROOT).text("title=a").await;

    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn create_non_object_json_body_is_rejected_without_storage_call() {
    let mut repo = MockThingRepo::new();
    repo.expect_create().never();

    let response = init_test_server(repo)
        .post(ROOT)
        .json(&json!(["title", "a"]))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn replace_uses_path_id_and_drops_body_ids() {
    let id = Uuid::now_v7();

    let mut repo = MockThingRepo::new();
    repo.expect_replace()
        .with(
            predicate::eq(id),
            predicate::eq(NewThing::from_fields(fields(json!({ "title": "b" })))),
        )
        .once()
        .returning(return_scenario::replace::replaced);

    let response = init_test_server(repo)
        .put(&thing_path(id))
        .json(&json!({ "_id": Uuid::now_v7(), "title": "b" }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "message": UPDATED_MESSAGE }));
}

#[tokio::test]
async fn replace_nothing_stored_still_returns_ok() {
    let mut repo = MockThingRepo::new();
    repo.expect_replace()
        .once()
        .returning(return_scenario::replace::not_found);

    let response = init_test_server(repo)
        .put(&thing_path(Uuid::now_v7()))
        .json(&json!({ "title": "b" }))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "message": UPDATED_MESSAGE }));
}

#[tokio::test]
async fn replace_storage_error_returns_bad_request() {
    let mut repo = MockThingRepo::new();
    repo.expect_replace()
        .once()
        .return_once(return_scenario::replace::error());

    let response = init_test_server(repo)
        .put(&thing_path(Uuid::now_v7()))
        .json(&json!({ "title": "b" }))
        .await;

    response.assert_status_bad_request();
    assert_error_body(&response, "failed to replace thing");
}

#[tokio::test]
async fn replace_malformed_id_returns_bad_request_without_storage_call() {
    let mut repo = MockThingRepo::new();
    repo.expect_replace().never();

    let response = init_test_server(repo)
        .put(&thing_path("bad_id"))
        .json(&json!({ "title": "b" }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn delete_returns_ok_with_message() {
    let id = Uuid::now_v7();

    let mut repo = MockThingRepo::new();
    repo.expect_delete()
        .with(predicate::eq(id))
        .once()
        .returning(return_scenario::delete::deleted);

    let response = init_test_server(repo).delete(&thing_path(id)).await;

    response.assert_status_ok();
    response.assert_json(&json!({ "message": DELETED_MESSAGE }));
}

#[tokio::test]
async fn delete_nothing_stored_still_returns_ok() {
    let mut repo = MockThingRepo::new();
    repo.expect_delete()
        .once()
        .returning(return_scenario::delete::not_found);

    let response = init_test_server(repo)
        .delete(&thing_path(Uuid::now_v7()))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({ "message": DELETED_MESSAGE }));
}

#[tokio::test]
async fn delete_storage_error_returns_bad_request() {
    let mut repo = MockThingRepo::new();
    repo.expect_delete()
        .once()
        .return_once(return_scenario::delete::error());

    let response = init_test_server(repo)
        .delete(&thing_path(Uuid::now_v7()))
        .await;

    response.assert_status_bad_request();
    assert_error_body(&response, "failed to delete thing");
}

#[tokio::test]
async fn delete_malformed_id_returns_bad_request_without_storage_call() {
    let mut repo = MockThingRepo::new();
    repo.expect_delete().never();

    let response = init_test_server(repo).delete(&thing_path("bad_id")).await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn every_response_allows_any_origin() {
    let mut repo = MockThingRepo::new();
    repo.expect_list()
        .once()
        .return_once(return_scenario::list::error());
    let server = init_test_server(repo);

    let response = server.get(ROOT).await;

    response.assert_status_bad_request();
    assert_eq!("*", response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert_eq!(
        ALLOW_HEADERS_VALUE,
        response.header(header::ACCESS_CONTROL_ALLOW_HEADERS)
    );
    assert_eq!(
        ALLOW_METHODS_VALUE,
        response.header(header::ACCESS_CONTROL_ALLOW_METHODS)
    );
}

#[tokio::test]
async fn preflight_is_answered_for_any_origin() {
    let server = init_test_server(MockThingRepo::new());

    let response = server
        .method(Method::OPTIONS, ROOT)
        .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:4200"))
        .add_header(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            HeaderValue::from_static("POST"),
        )
        .add_header(
            header::ACCESS_CONTROL_REQUEST_HEADERS,
            HeaderValue::from_static("content-type"),
        )
        .await;

    response.assert_status_ok();
    assert_eq!("*", response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert_eq!(
        ALLOW_METHODS_VALUE,
        response.header(header::ACCESS_CONTROL_ALLOW_METHODS)
    );
    assert_eq!(
        ALLOW_HEADERS_VALUE,
        response.header(HeaderName::from_static("access-control-allow-headers"))
    );
}

#[tokio::test]
async fn metrics_disabled_returns_service_unavailable() {
    let server = init_test_server(MockThingRepo::new());

    server
        .get("/metrics")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn create_malformed_json_is_rejected_without_storage_call() {
    let mut repo = MockThingRepo::new();
    repo.expect_create().never();

    let response = init_test_server(repo)
        .post(ROOT)
        .content_type("application/json")
        .bytes(Bytes::from_static(b"{\"title\": "))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn openapi_document_describes_thing_routes() {
    let server = init_test_server(MockThingRepo::new());

    let response = server.get("/api/api-docs/openapi.json").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(
        body["paths"]["/api/stuff/{thing_id}"].is_object(),
        "thing path is documented: {}",
        body["paths"]
    );
}

// the only test that installs the global recorder
#[tokio::test]
async fn metrics_enabled_renders_request_and_thing_counters() {
    let things = (0..2)
        .map(|i| Thing::new(Uuid::now_v7(), fields(json!({ "index": i }))))
        .collect::<Vec<_>>();

    let mut repo = MockThingRepo::new();
    repo.expect_list()
        .once()
        .return_once(return_scenario::list::found(things));

    let routes = build(ThingAppState::new(TestEngine::new(repo)).with_metrics(true));
    let server = TestServer::new(routes).expect("creation of test server");

    server.get(ROOT).await.assert_status_ok();

    let response = server.get("/metrics").await;

    response.assert_status_ok();
    let rendered = response.text();
    assert!(rendered.contains("http_requests_total"), "{rendered}");
    assert!(rendered.contains("method=\"GET\""), "{rendered}");
    assert!(rendered.contains("status=\"200\""), "{rendered}");
    assert!(rendered.contains("things_retrieved"), "{rendered}");
}
