//! End-to-end tests of the bulk operation state machine against a mock
//! Admin API.

mod common;

use futures::TryStreamExt;
use serde_json::{json, Value};
use shopify_client::bulk::{self, BulkOperation, BulkOperationError, BulkOperationStatus};
use shopify_client::{
    ApiVersion, BulkSettings, ConfigError, GraphqlClient, HostUrl, ShopifyConfig, ThrottleSettings,
};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OLD_ID: &str = "gid://shopify/BulkOperation/1";
const NEW_ID: &str = "gid://shopify/BulkOperation/2";
const QUERY: &str = "{ products { edges { node { id title } } } }";

fn current(id: &str, status: &str, url: Option<String>) -> Value {
    json!({"data": {"currentBulkOperation": {
        "id": id,
        "status": status,
        "errorCode": null,
        "url": url,
    }}})
}

/// Mounts one `currentBulkOperation` answer, used `times` times.
async fn mount_current(server: &MockServer, body: Value, times: u64) {
    Mock::given(method("POST"))
        .and(path(common::graphql_path()))
        .and(body_string_contains("currentBulkOperation"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

async fn mount_run_query(server: &MockServer, expect: u64) {
    Mock::given(method("POST"))
        .and(path(common::graphql_path()))
        .and(body_string_contains("bulkOperationRunQuery"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
            "bulkOperationRunQuery": {
                "bulkOperation": {"id": NEW_ID, "status": "CREATED"},
                "userErrors": []
            }
        }})))
        .expect(expect)
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> GraphqlClient {
    GraphqlClient::new(&common::session(), Some(&common::config(server)))
}

#[tokio::test]
async fn test_submit_cancels_running_operation_first() {
    let server = MockServer::start().await;
    mount_current(&server, current(OLD_ID, "RUNNING", None), 1).await;
    mount_current(&server, current(OLD_ID, "CANCELING", None), 1).await;
    mount_current(&server, current(OLD_ID, "CANCELED", None), 1).await;
    Mock::given(method("POST"))
        .and(path(common::graphql_path()))
        .and(body_string_contains("bulkOperationCancel"))
        .and(body_string_contains(OLD_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
            "bulkOperationCancel": {
                "bulkOperation": {"id": OLD_ID, "status": "CANCELING"},
                "userErrors": []
            }
        }})))
        .expect(1)
        .mount(&server)
        .await;
    mount_run_query(&server, 1).await;

    let operation = BulkOperation::submit(&client(&server), QUERY).await.unwrap();

    assert_eq!(operation.id(), NEW_ID);

    // The run mutation is only sent once the previous operation is CANCELED.
    let requests = server.received_requests().await.unwrap();
    let bodies: Vec<String> = requests
        .iter()
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect();
    let cancel = bodies.iter().position(|b| b.contains("bulkOperationCancel")).unwrap();
    let run = bodies.iter().position(|b| b.contains("bulkOperationRunQuery")).unwrap();
    assert!(cancel < run);
    assert_eq!(run, bodies.len() - 1);
    assert!(bodies[run - 1].contains("currentBulkOperation"));
}

#[tokio::test]
async fn test_submit_waits_for_canceling_operation() {
    let server = MockServer::start().await;
    mount_current(&server, current(OLD_ID, "CANCELING", None), 2).await;
    mount_current(&server, current(OLD_ID, "CANCELED", None), 1).await;
    mount_run_query(&server, 1).await;

    let operation = BulkOperation::submit(&client(&server), QUERY).await.unwrap();

    assert_eq!(operation.id(), NEW_ID);
    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|request| !String::from_utf8_lossy(&request.body).contains("bulkOperationCancel")));
}

#[tokio::test]
async fn test_submit_sends_query_as_variable() {
    let server = MockServer::start().await;
    mount_current(&server, json!({"data": {"currentBulkOperation": null}}), 1).await;
    mount_run_query(&server, 1).await;

    BulkOperation::submit(&client(&server), QUERY).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    assert_eq!(body["variables"]["query"], QUERY);
}

#[tokio::test]
async fn test_submit_requires_bulk_capable_version() {
    let server = MockServer::start().await;
    let client = GraphqlClient::with_version(
        &common::session(),
        Some(&common::config(&server)),
        ApiVersion::stable(2019, 7),
    );

    let error = BulkOperation::submit(&client, QUERY).await.unwrap_err();

    assert!(matches!(
        error,
        BulkOperationError::Config(ConfigError::UnsupportedApiVersion { .. })
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_poll_of_replaced_operation_is_obsolete() {
    let server = MockServer::start().await;
    mount_current(&server, current(OLD_ID, "COMPLETED", None), 1).await;

    let operation = BulkOperation::new(client(&server), NEW_ID);
    let error = operation.poll().await.unwrap_err();

    match error {
        BulkOperationError::Obsolete { expected, actual } => {
            assert_eq!(expected, NEW_ID);
            assert_eq!(actual.as_deref(), Some(OLD_ID));
        }
        other => panic!("expected Obsolete, got {other:?}"),
    }
}

fn variant(error: &BulkOperationError) -> &'static str {
    match error {
        BulkOperationError::Canceled { .. } => "CANCELED",
        BulkOperationError::Expired { .. } => "EXPIRED",
        BulkOperationError::Failed { .. } => "FAILED",
        _ => "other",
    }
}

#[tokio::test]
async fn test_terminal_failures_surface_without_download() {
    for status in ["CANCELED", "EXPIRED", "FAILED"] {
        let server = MockServer::start().await;
        let url = format!("{}/results/bulk.jsonl", server.uri());
        mount_current(&server, current(NEW_ID, status, Some(url)), 1).await;
        Mock::given(method("GET"))
            .and(path("/results/bulk.jsonl"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let operation = BulkOperation::new(client(&server), NEW_ID);
        let error = operation.call().await.unwrap_err();

        assert_eq!(variant(&error), status, "unexpected {error:?}");
    }
}

#[tokio::test]
async fn test_failed_operation_carries_error_code() {
    let server = MockServer::start().await;
    mount_current(
        &server,
        json!({"data": {"currentBulkOperation": {
            "id": NEW_ID, "status": "FAILED", "errorCode": "ACCESS_DENIED", "url": null
        }}}),
        1,
    )
    .await;

    let error = BulkOperation::new(client(&server), NEW_ID).wait().await.unwrap_err();

    assert_eq!(
        error.to_string(),
        format!("Bulk operation {NEW_ID} failed (ACCESS_DENIED)")
    );
}

#[tokio::test]
async fn test_run_streams_result_records() {
    let server = MockServer::start().await;
    let url = format!("{}/results/bulk.jsonl", server.uri());
    mount_current(&server, json!({"data": {"currentBulkOperation": null}}), 1).await;
    mount_current(&server, current(NEW_ID, "RUNNING", None), 2).await;
    mount_current(&server, current(NEW_ID, "COMPLETED", Some(url)), 1).await;
    mount_run_query(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/results/bulk.jsonl"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"id\":\"gid://shopify/Product/1\",\"title\":\"Hat\"}\n\
             {\"id\":\"gid://shopify/Product/2\",\"title\":\"Scarf\"}\n\
             \n\
             {\"id\":\"gid://shopify/Product/3\",\"title\":\"Gloves\"}\n",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let records: Vec<Value> = bulk::run(&client(&server), QUERY)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    let titles: Vec<&str> = records
        .iter()
        .map(|record| record["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Hat", "Scarf", "Gloves"]);
}

#[tokio::test]
async fn test_completed_without_url_yields_no_records() {
    let server = MockServer::start().await;
    mount_current(&server, current(NEW_ID, "COMPLETED", None), 1).await;

    let records: Vec<Value> = BulkOperation::new(client(&server), NEW_ID)
        .call()
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_invalid_result_line_is_decode_error() {
    let server = MockServer::start().await;
    let url = format!("{}/results/bulk.jsonl", server.uri());
    mount_current(&server, current(NEW_ID, "COMPLETED", Some(url)), 1).await;
    Mock::given(method("GET"))
        .and(path("/results/bulk.jsonl"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\":1}\n{oops\n"))
        .mount(&server)
        .await;

    let result: Result<Vec<Value>, _> = BulkOperation::new(client(&server), NEW_ID)
        .call()
        .await
        .unwrap()
        .try_collect()
        .await;

    assert!(matches!(result, Err(BulkOperationError::Decode { line: 2, .. })));
}

#[tokio::test]
async fn test_cancel_of_completed_operation_is_noop() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(common::graphql_path()))
        .and(body_string_contains("bulkOperationCancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
            "bulkOperationCancel": {
                "bulkOperation": null,
                "userErrors": [{
                    "field": null,
                    "message": "A bulk query operation cannot be canceled when it is completed"
                }]
            }
        }})))
        .expect(1)
        .mount(&server)
        .await;

    BulkOperation::new(client(&server), NEW_ID).cancel().await.unwrap();

    // No status poll follows the benign rejection.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_poll_until_times_out() {
    let server = MockServer::start().await;
    mount_current(&server, current(NEW_ID, "CANCELING", None), 1_000).await;
    let config = ShopifyConfig::builder()
        .api_host(HostUrl::new(server.uri()).unwrap())
        .throttle(ThrottleSettings::default().min_interval(Duration::ZERO))
        .bulk(
            BulkSettings::default()
                .poll_delay(Duration::from_millis(5))
                .poll_timeout(Duration::from_millis(50)),
        )
        .build()
        .unwrap();
    let client = GraphqlClient::new(&common::session(), Some(&config));

    let error = BulkOperation::new(client, NEW_ID)
        .poll_until(&[BulkOperationStatus::Canceled])
        .await
        .unwrap_err();

    assert!(matches!(error, BulkOperationError::Timeout { .. }));
    assert!(error.to_string().ends_with("polling for status CANCELED"));
}
