//! Identity probe outcomes against a mocked /me endpoint

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivewatch_core::ports::{IProviderGateway, IdentityProbe, InvalidReason};
use drivewatch_graph::{GraphClient, GraphGateway};

use crate::common::{mount_me_ok, setup_gateway};

#[tokio::test]
async fn probe_returns_principal_on_200() {
    let (server, gateway) = setup_gateway().await;
    mount_me_ok(&server).await;

    match gateway.probe_identity().await {
        IdentityProbe::Valid(principal) => {
            assert_eq!(principal.user_id, "user-test-001");
            assert_eq!(principal.principal_name, "test@example.com");
        }
        other => panic!("expected valid probe, got {other:?}"),
    }
}

#[tokio::test]
async fn probe_maps_401_to_expired() {
    let (server, gateway) = setup_gateway().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert_eq!(
        gateway.probe_identity().await,
        IdentityProbe::Invalid(InvalidReason::Expired)
    );
}

#[tokio::test]
async fn probe_maps_403_to_forbidden() {
    let (server, gateway) = setup_gateway().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    assert_eq!(
        gateway.probe_identity().await,
        IdentityProbe::Invalid(InvalidReason::Forbidden)
    );
}

#[tokio::test]
async fn probe_maps_unexpected_status_to_unknown() {
    let (server, gateway) = setup_gateway().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(418))
        .mount(&server)
        .await;

    assert_eq!(
        gateway.probe_identity().await,
        IdentityProbe::Invalid(InvalidReason::Unknown)
    );
}

#[tokio::test]
async fn probe_maps_connection_failure_to_transport() {
    // Point the gateway at a port with no listener
    let client = GraphClient::with_base_url("token", "http://127.0.0.1:1");
    let gateway = GraphGateway::new(client);

    assert_eq!(
        gateway.probe_identity().await,
        IdentityProbe::Invalid(InvalidReason::Transport)
    );
}

#[tokio::test]
async fn probe_falls_back_to_mail_for_principal_name() {
    let (server, gateway) = setup_gateway().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "user-2",
            "mail": "mail-only@example.com"
        })))
        .mount(&server)
        .await;

    match gateway.probe_identity().await {
        IdentityProbe::Valid(principal) => {
            assert_eq!(principal.principal_name, "mail-only@example.com");
        }
        other => panic!("expected valid probe, got {other:?}"),
    }
}
