//! Subscription CRUD against a mocked subscriptions endpoint

use chrono::{Duration, Utc};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use drivewatch_core::domain::newtypes::SubscriptionId;
use drivewatch_core::ports::{GatewayError, IProviderGateway, NewSubscription};

use crate::common::setup_gateway;

fn new_subscription_request() -> NewSubscription {
    NewSubscription {
        notification_url: "https://hooks.example.com/notify".to_string(),
        resource: "/drives/drive-1/root".to_string(),
        shared_secret: "fcd3a1be9a8f4e6c8b2d7f01a5c9e3d4".to_string(),
        expiry: Utc::now() + Duration::hours(70),
    }
}

#[tokio::test]
async fn create_sends_client_state_and_returns_local_record() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("POST"))
        .and(path("/subscriptions"))
        .and(body_partial_json(serde_json::json!({
            "changeType": "updated",
            "notificationUrl": "https://hooks.example.com/notify",
            "resource": "/drives/drive-1/root",
            "clientState": "fcd3a1be9a8f4e6c8b2d7f01a5c9e3d4"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "sub-created-1",
            "resource": "/drives/drive-1/root",
            "expirationDateTime": "2026-08-05T11:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = new_subscription_request();
    let sub = gateway.create_subscription(&request).await.unwrap();

    assert_eq!(sub.provider_id.as_str(), "sub-created-1");
    assert_eq!(sub.resource, request.resource);
    assert_eq!(sub.shared_secret, request.shared_secret);
    assert_eq!(sub.expiry.to_rfc3339(), "2026-08-05T11:00:00+00:00");
}

#[tokio::test]
async fn get_maps_404_to_none() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = SubscriptionId::new("sub-missing".to_string()).unwrap();
    assert!(gateway.get_subscription(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn get_returns_provider_record() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "sub-live",
            "resource": "/drives/drive-1/root",
            "expirationDateTime": "2026-08-10T09:30:00Z"
        })))
        .mount(&server)
        .await;

    let id = SubscriptionId::new("sub-live".to_string()).unwrap();
    let sub = gateway.get_subscription(&id).await.unwrap().unwrap();
    assert_eq!(sub.provider_id.as_str(), "sub-live");
    assert_eq!(sub.resource, "/drives/drive-1/root");
}

#[tokio::test]
async fn renew_patches_expiry() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("PATCH"))
        .and(path("/subscriptions/sub-live"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "sub-live",
            "expirationDateTime": "2026-08-12T09:30:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = SubscriptionId::new("sub-live".to_string()).unwrap();
    gateway
        .renew_subscription(&id, Utc::now() + Duration::hours(70))
        .await
        .unwrap();
}

#[tokio::test]
async fn renew_404_is_fatal() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("PATCH"))
        .and(path("/subscriptions/sub-gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = SubscriptionId::new("sub-gone".to_string()).unwrap();
    let result = gateway
        .renew_subscription(&id, Utc::now() + Duration::hours(70))
        .await;
    assert!(matches!(result, Err(GatewayError::Fatal(_))));
}

#[tokio::test]
async fn delete_treats_404_as_success() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("DELETE"))
        .and(path("/subscriptions/sub-gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let id = SubscriptionId::new("sub-gone".to_string()).unwrap();
    assert!(gateway.delete_subscription(&id).await.is_ok());
}

#[tokio::test]
async fn delete_succeeds_on_204() {
    let (server, gateway) = setup_gateway().await;

    Mock::given(method("DELETE"))
        .and(path("/subscriptions/sub-live"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let id = SubscriptionId::new("sub-live".to_string()).unwrap();
    assert!(gateway.delete_subscription(&id).await.is_ok());
}
