use crate::*;

use ript_core::wire::REASON_HEADER;
use ript_core::CloseReason;

/// Join then leave through the real client updates the directory.
#[tokio::test]
async fn test_join_then_leave() {
    let gw = TestGateway::start().await;

    let (face, _rx) = gw.connect("edge-1").await;
    assert_eq!(gw.directory.peers(), vec!["edge-1"]);
    let server_face = gw.directory.lookup("edge-1").expect("face registered");
    let signal = server_face.on_close();

    face.close(CloseReason::Local("test done".to_string())).await;

    assert!(gw.directory.is_empty());
    assert_eq!(signal.closed().await, CloseReason::PeerLeft);
}

/// Leave for a peer that never joined still answers 200.
#[tokio::test]
async fn test_leave_without_join() {
    let gw = TestGateway::start().await;
    let resp = raw_client("ghost")
        .get(gw.url("/media/leave"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(gw.directory.is_empty());
}

/// Requests from a peer that has not joined are refused.
#[tokio::test]
async fn test_unknown_peer_forbidden() {
    let gw = TestGateway::start().await;
    let resp = raw_client("stranger")
        .get(gw.ript_url("/providertgs"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    assert_eq!(resp.headers().get(REASON_HEADER).unwrap(), "unknown-peer");
}

/// Without a peer header the socket address identifies the face.
#[tokio::test]
async fn test_socket_address_identity() {
    let gw = TestGateway::start().await;
    let resp = reqwest::Client::new()
        .get(gw.url("/media/join"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let peers = gw.directory.peers();
    assert_eq!(peers.len(), 1);
    let addr: std::net::SocketAddr = peers[0].parse().expect("socket address identity");
    assert!(addr.ip().is_loopback());
}

/// A second join from the same peer replaces the first face.
#[tokio::test]
async fn test_rejoin_supersedes() {
    let gw = TestGateway::start().await;
    let http = raw_client("edge-2");

    http.get(gw.url("/media/join")).send().await.unwrap();
    let first = gw.directory.lookup("edge-2").unwrap();
    http.post(gw.url("/media/join")).send().await.unwrap();
    let second = gw.directory.lookup("edge-2").unwrap();

    assert_eq!(gw.directory.len(), 1);
    assert_eq!(first.close_reason(), Some(CloseReason::Superseded));
    assert!(!second.is_closed());

    // The new face is served by the router.
    let resp = http.get(gw.ript_url("/providertgs")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

/// Undecodable bodies and wrong packet types are client errors.
#[tokio::test]
async fn test_bad_bodies_rejected() {
    let gw = TestGateway::start().await;
    let http = raw_client("edge-3");
    http.get(gw.url("/media/join")).send().await.unwrap();

    let resp = http
        .post(gw.ript_url("/providertgs/trunk123/handlers"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.headers().get(REASON_HEADER).unwrap(), "malformed-packet");

    let wrong_type = ript_core::Packet::discovery_query().to_json().unwrap();
    let resp = http
        .post(gw.ript_url("/providertgs/trunk123/calls"))
        .body(wrong_type)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

/// A blank trunk group id is a missing parameter and nothing is forwarded.
#[tokio::test]
async fn test_blank_trunk_group() {
    let gw = TestGateway::start().await;
    let http = raw_client("edge-4");
    http.get(gw.url("/media/join")).send().await.unwrap();

    let body = ript_core::Packet::RegisterHandler(ript_core::HandlerInfo {
        handler_id: "h1".to_string(),
        ..Default::default()
    })
    .to_json()
    .unwrap();
    let resp = http
        .post(gw.ript_url("/providertgs/%20/handlers"))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.headers().get(REASON_HEADER).unwrap(), "missing-parameter");
}

/// Closing every face at shutdown fails waiting pulls with 410.
#[tokio::test]
async fn test_shutdown_releases_waiters() {
    let gw = TestGateway::start().await;
    let http = raw_client("edge-5");
    http.get(gw.url("/media/join")).send().await.unwrap();

    let pull = {
        let url = gw.ript_url("/providertgs/trunk123/calls/0/media");
        tokio::spawn(async move { http.get(url).send().await.unwrap() })
    };
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(gw.directory.close_all(CloseReason::Shutdown), 1);

    let resp = pull.await.unwrap();
    assert_eq!(resp.status(), 410);
    assert_eq!(resp.headers().get(REASON_HEADER).unwrap(), "face-closed");
}
