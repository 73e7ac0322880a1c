use crate::*;

use std::time::{Duration, Instant};

use bytes::Bytes;
use ript_core::wire::REASON_HEADER;
use ript_core::{
    CloseReason, ContentFilter, ContentInfo, Packet, RiptError, StreamContentMedia, StreamMediaAck,
};

fn content(id: u32, body: &[u8]) -> Packet {
    Packet::Content(ContentInfo {
        id,
        filter: ContentFilter::MediaForward,
        content: Bytes::copy_from_slice(body),
    })
}

fn media(seq_no: u64) -> Packet {
    Packet::StreamMedia(StreamContentMedia {
        seq_no,
        timestamp: seq_no * 160,
        source_id: 0x1234,
        media: Bytes::from(vec![0x55; 160]),
    })
}

/// A pull with nothing available reports "no content", not a decode error.
#[tokio::test]
async fn test_pull_with_nothing_available() {
    let gw = TestGateway::with_timeout(300).await;
    let (face, mut rx) = gw.connect("edge-1").await;

    let started = Instant::now();
    let err = face.send(Packet::pull_request()).await.unwrap_err();
    assert_eq!(err, RiptError::CorrelationTimeout);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(rx.try_recv().is_err());
}

/// The raw pull timeout is a 404 tagged with its reason.
#[tokio::test]
async fn test_pull_timeout_status() {
    let gw = TestGateway::with_timeout(200).await;
    let http = raw_client("edge-2");
    http.get(gw.url("/media/join")).send().await.unwrap();

    let resp = http
        .get(gw.ript_url("/providertgs/trunk123/calls/0/media"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(
        resp.headers().get(REASON_HEADER).unwrap(),
        "correlation-timeout"
    );
}

/// Pushing content succeeds without delivering anything locally.
#[tokio::test]
async fn test_push_content() {
    let gw = TestGateway::start().await;
    let (face, mut rx) = gw.connect("edge-3").await;

    face.send(content(5, &[0xab; 128])).await.unwrap();
    assert!(rx.try_recv().is_err(), "push delivers nothing");
}

/// A lone participant's content comes back on the next pull.
#[tokio::test]
async fn test_pull_returns_echoed_content() {
    let gw = TestGateway::start().await;
    let (face, mut rx) = gw.connect("edge-4").await;

    face.send(content(5, b"hello")).await.unwrap();
    face.send(Packet::pull_request()).await.unwrap();

    let event = rx.try_recv().expect("pulled content delivered");
    assert_eq!(event.call_id.as_deref(), Some("0"));
    assert_eq!(
        event.packet,
        Packet::Content(ContentInfo {
            id: 5,
            filter: ContentFilter::MediaReverse,
            content: Bytes::from_static(b"hello"),
        })
    );
    assert_eq!(face.next_content_id(), 6);
}

/// Content echoed to a face that has left goes with it.
#[tokio::test]
async fn test_echo_does_not_outlive_face() {
    let gw = TestGateway::with_timeout(200).await;
    let (first, _first_rx) = gw.connect("edge-8").await;
    first.send(content(1, b"lost")).await.unwrap();
    first.close(CloseReason::PeerLeft).await;

    let (second, mut rx) = gw.connect("edge-8").await;
    assert_eq!(
        second.send(Packet::pull_request()).await.unwrap_err(),
        RiptError::CorrelationTimeout
    );
    assert!(rx.try_recv().is_err());
}

/// Media pushed by one participant reaches the other on the same call.
#[tokio::test]
async fn test_media_relayed_between_participants() {
    let gw = TestGateway::start().await;
    let mut alice_config = gw.client_config("alice");
    alice_config.call_id = "42".to_string();
    let mut bob_config = gw.client_config("bob");
    bob_config.call_id = "42".to_string();
    let (alice, _alice_rx) = gw.connect_with(alice_config).await;
    let (bob, mut bob_rx) = gw.connect_with(bob_config).await;

    // Bob is alone on the call at first, so his own media comes back.
    bob.send(media(1)).await.unwrap();
    bob.send(Packet::pull_request()).await.unwrap();
    assert_eq!(bob_rx.try_recv().unwrap().packet, media(1));

    alice.send(media(2)).await.unwrap();
    bob.send(Packet::pull_request()).await.unwrap();
    let event = bob_rx.try_recv().unwrap();
    assert_eq!(event.packet, media(2));
    assert_eq!(event.call_id.as_deref(), Some("42"));
}

/// A queued ack rides back on a later push response.
#[tokio::test]
async fn test_push_returns_queued_ack() {
    let gw = TestGateway::start().await;
    let http = raw_client("edge-5");
    http.get(gw.url("/media/join")).send().await.unwrap();
    let url = gw.ript_url("/providertgs/trunk123/calls/0/media");

    let first = http
        .put(&url)
        .body(media(1).to_binary().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = http
        .put(&url)
        .body(media(2).to_binary().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 200);
    let ack = Packet::from_binary(&second.bytes().await.unwrap()).unwrap();
    assert_eq!(ack, Packet::StreamMediaAck(StreamMediaAck { seq_no: 1 }));
}

/// Media endpoints only accept binary media packets.
#[tokio::test]
async fn test_push_rejects_bad_bodies() {
    let gw = TestGateway::start().await;
    let http = raw_client("edge-6");
    http.get(gw.url("/media/join")).send().await.unwrap();
    let url = gw.ript_url("/providertgs/trunk123/calls/0/media");

    let resp = http.put(&url).body("garbage").send().await.unwrap();
    assert_eq!(resp.status(), 400);

    let control = Packet::discovery_query().to_binary().unwrap();
    let resp = http.put(&url).body(control).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.headers().get(REASON_HEADER).unwrap(), "malformed-packet");
}

/// The client refuses to send acks.
#[tokio::test]
async fn test_client_ack_unroutable() {
    let gw = TestGateway::start().await;
    let (face, _rx) = gw.connect("edge-7").await;
    let err = face
        .send(Packet::StreamMediaAck(StreamMediaAck { seq_no: 1 }))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RiptError::Unroutable(ript_core::PacketType::StreamMediaAck)
    );
}
