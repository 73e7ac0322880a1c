use crate::*;

use ript_core::config::GatewayConfig;
use ript_core::{Packet, RiptError};

/// Discovery lists every configured trunk group.
#[tokio::test]
async fn test_discover_trunk_groups() {
    let gw = TestGateway::start_with(GatewayConfig {
        trunk_groups: vec!["trunk123".to_string(), "trunk456".to_string()],
        ..Default::default()
    })
    .await;
    let (face, mut rx) = gw.connect("edge-1").await;

    face.send(Packet::discovery_query()).await.unwrap();

    let event = rx.try_recv().expect("discovery reply delivered");
    let Packet::TrunkGroupDiscovery(info) = event.packet else {
        panic!("unexpected reply {:?}", event.packet);
    };
    let ids: Vec<&str> = info.trunk_groups.iter().map(|tg| tg.id.as_str()).collect();
    assert_eq!(ids, vec!["trunk123", "trunk456"]);
    assert_eq!(
        info.trunk_groups[1].uri,
        "/.well-known/ript/v1/providertgs/trunk456"
    );
}

/// A custom base path moves every RIPT endpoint but not join/leave.
#[tokio::test]
async fn test_custom_base_path() {
    let gw = TestGateway::start_with(GatewayConfig {
        base_path: "/ript/".to_string(),
        ..Default::default()
    })
    .await;
    let mut config = gw.client_config("edge-2");
    config.base_path = "/ript".to_string();
    let (face, mut rx) = gw.connect_with(config).await;

    face.send(Packet::discovery_query()).await.unwrap();
    let event = rx.try_recv().expect("discovery reply delivered");
    let Packet::TrunkGroupDiscovery(info) = event.packet else {
        panic!("unexpected reply {:?}", event.packet);
    };
    assert_eq!(info.trunk_groups[0].uri, "/ript/providertgs/trunk123");
}

/// Join against a gateway that is not running fails without a face.
#[tokio::test]
async fn test_join_unreachable_gateway() {
    let gw = TestGateway::start().await;
    let mut config = gw.client_config("edge-3");
    config.gateway_origin = "http://127.0.0.1:1".to_string();

    let err = ript_client::ClientFace::connect(&config).await.err().unwrap();
    assert!(matches!(err, RiptError::TransportFailure(_)));
    assert!(gw.directory.is_empty());
}
