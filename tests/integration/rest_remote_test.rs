//! PostgREST client against a mock HTTP server

use healss_sync::local_db::MemoryStore;
use healss_sync::offline::StorageOperation;
use healss_sync::remote::{RemoteAccessor, RestRemote};
use healss_sync::shared::{BackendConfig, EntityType, OperationKind, StorageError, SyncConfig};
use healss_sync::sync::{Connectivity, ConnectivitySignal, PassOutcome};
use healss_sync::UnifiedStorage;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{next_pass, record, workout, USER_ID};
use crate::{assert_ok, assert_queue_counts, assert_record_ids};

const TABLE_PATH: &str = "/rest/v1/workout_activities";

fn accessor(server: &MockServer) -> RemoteAccessor {
    let remote = RestRemote::new(server.uri(), "anon-key").with_access_token("user-token");
    RemoteAccessor::new(Arc::new(remote), USER_ID)
}

fn operation(kind: OperationKind, data: serde_json::Value) -> StorageOperation {
    StorageOperation::new(EntityType::Activity, kind, record(data))
}

#[tokio::test]
async fn test_load_sends_user_filter_and_ordering() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "*"))
        .and(query_param("user_id", format!("eq.{}", USER_ID)))
        .and(query_param("order", "created_at.desc"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "w2", "name": "Pull", "user_id": USER_ID},
            {"id": "w1", "name": "Push", "user_id": USER_ID}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = assert_ok!(accessor(&server).load(EntityType::Activity).await);
    assert_record_ids!(rows, ["w2", "w1"]);
}

#[tokio::test]
async fn test_create_posts_row_with_user_column() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("prefer", "return=minimal"))
        .and(body_partial_json(json!({"id": "w1", "name": "Leg Day", "user_id": USER_ID})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let op = operation(
        OperationKind::Create,
        json!({"id": "w1", "name": "Leg Day", "userId": USER_ID}),
    );
    assert_ok!(accessor(&server).apply(&op).await);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("userId").is_none());
}

#[tokio::test]
async fn test_update_and_delete_target_record_of_user() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.w1"))
        .and(query_param("user_id", format!("eq.{}", USER_ID)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.w1"))
        .and(query_param("user_id", format!("eq.{}", USER_ID)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let accessor = accessor(&server);
    assert_ok!(
        accessor
            .apply(&operation(OperationKind::Update, json!({"id": "w1", "name": "Squats"})))
            .await
    );
    assert_ok!(
        accessor
            .apply(&operation(OperationKind::Delete, json!({"id": "w1"})))
            .await
    );
}

#[tokio::test]
async fn test_error_status_becomes_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
        .mount(&server)
        .await;

    let result = accessor(&server)
        .apply(&operation(OperationKind::Create, json!({"id": "w1"})))
        .await;

    match result {
        Err(StorageError::Remote { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "JWT expired");
        }
        other => panic!("expected a remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_anon_key_is_bearer_without_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/sleep_data"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = BackendConfig {
        url: server.uri(),
        anon_key: "anon-key".into(),
        access_token: None,
        user_id: USER_ID.into(),
        db_path: std::env::temp_dir().join("unused.db"),
    };
    let accessor = RemoteAccessor::new(Arc::new(RestRemote::from_config(&config)), USER_ID);

    assert!(assert_ok!(accessor.load(EntityType::Sleep).await).is_empty());
}

#[tokio::test]
async fn test_coordinator_retries_against_failing_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&server)
        .await;

    let signal = ConnectivitySignal::new(Connectivity::Offline);
    let storage = UnifiedStorage::open(
        USER_ID,
        SyncConfig::default(),
        Arc::new(MemoryStore::new()),
        Arc::new(RestRemote::new(server.uri(), "anon-key")),
        signal.monitor(),
    )
    .await
    .unwrap();
    storage
        .save(EntityType::Activity, workout("w1", "Leg Day"), OperationKind::Create)
        .await
        .unwrap();

    assert_eq!(storage.force_sync_all().await, PassOutcome::Offline);

    let mut events = storage.subscribe();
    signal.set_online();
    next_pass(&mut events).await;
    storage.force_sync_all().await;
    storage.force_sync_all().await;

    assert_queue_counts!(storage.sync_status().await, pending: 0, failed: 1);
}
