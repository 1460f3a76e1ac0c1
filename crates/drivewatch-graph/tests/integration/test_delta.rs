//! Delta feed queries: pagination, cursors, throttling, error mapping

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivewatch_core::domain::newtypes::{DeltaCursor, DriveId};
use drivewatch_core::ports::{GatewayError, IProviderGateway};

use crate::common::{mount_delta_single_page, setup_gateway};

fn drive() -> DriveId {
    DriveId::new("drive-1".to_string()).unwrap()
}

#[tokio::test]
async fn full_sync_single_page() {
    let (server, gateway) = setup_gateway().await;
    mount_delta_single_page(
        &server,
        serde_json::json!([
            { "id": "a", "name": "Docs", "folder": {} },
            { "id": "b", "name": "draft.txt", "parentReference": { "id": "a" }, "file": {} }
        ]),
        "C1",
    )
    .await;

    let (entries, final_cursor) = gateway.delta_complete(&drive(), None).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_folder);
    assert_eq!(
        entries[1].parent_external_id.as_ref().map(|p| p.as_str()),
        Some("a")
    );
    assert!(final_cursor.as_str().contains("token=C1"));
}

#[tokio::test]
async fn pagination_follows_next_link_and_keeps_final_cursor() {
    let (server, gateway) = setup_gateway().await;

    // Page 1: initial request, carries a nextLink
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [ { "id": "item-1", "name": "one.txt", "file": {} } ],
            "@odata.nextLink": format!(
                "{}/drives/drive-1/root/delta?token=page2", server.uri()
            )
        })))
        .mount(&server)
        .await;

    // Page 2: continuation, carries the deltaLink
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .and(query_param("token", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [ { "id": "item-2", "name": "two.txt", "file": {} } ],
            "@odata.deltaLink": format!(
                "{}/drives/drive-1/root/delta?token=FINAL", server.uri()
            )
        })))
        .mount(&server)
        .await;

    let (entries, final_cursor) = gateway.delta_complete(&drive(), None).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].external_id.as_str(), "item-1");
    assert_eq!(entries[1].external_id.as_str(), "item-2");
    assert!(final_cursor.as_str().contains("token=FINAL"));
}

#[tokio::test]
async fn incremental_sync_follows_stored_cursor_verbatim() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .and(query_param("token", "C1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [],
            "@odata.deltaLink": format!(
                "{}/drives/drive-1/root/delta?token=C2", server.uri()
            )
        })))
        .mount(&server)
        .await;

    let cursor = DeltaCursor::new(format!(
        "{}/drives/drive-1/root/delta?token=C1",
        server.uri()
    ))
    .unwrap();

    let (entries, final_cursor) = gateway
        .delta_complete(&drive(), Some(&cursor))
        .await
        .unwrap();

    assert!(entries.is_empty());
    assert!(final_cursor.as_str().contains("token=C2"));
}

#[tokio::test]
async fn throttled_request_retries_and_succeeds() {
    let (server, gateway) = setup_gateway().await;

    // First attempt is throttled with an immediate retry hint
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [],
            "@odata.deltaLink": format!(
                "{}/drives/drive-1/root/delta?token=after-429", server.uri()
            )
        })))
        .mount(&server)
        .await;

    let (entries, final_cursor) = gateway.delta_complete(&drive(), None).await.unwrap();
    assert!(entries.is_empty());
    assert!(final_cursor.as_str().contains("after-429"));
}

#[tokio::test]
async fn unauthorized_maps_to_auth_invalid() {
    let (server, gateway) = setup_gateway().await;
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = gateway.delta_complete(&drive(), None).await;
    assert!(matches!(result, Err(GatewayError::AuthInvalid)));
}

#[tokio::test]
async fn gone_cursor_maps_to_fatal() {
    let (server, gateway) = setup_gateway().await;
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let result = gateway.delta_complete(&drive(), None).await;
    match result {
        Err(GatewayError::Fatal(msg)) => assert!(msg.contains("full resync")),
        other => panic!("expected fatal, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_final_cursor_is_fatal() {
    let (server, gateway) = setup_gateway().await;
    Mock::given(method("GET"))
        .and(path("/drives/drive-1/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": []
        })))
        .mount(&server)
        .await;

    let result = gateway.delta_complete(&drive(), None).await;
    assert!(matches!(result, Err(GatewayError::Fatal(_))));
}
