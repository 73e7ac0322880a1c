use crate::*;

use ript_core::{CallInfo, HandlerInfo, Packet};

fn registration(handler_id: &str) -> Packet {
    Packet::RegisterHandler(HandlerInfo {
        handler_id: handler_id.to_string(),
        advertisement: "codecs=opus".to_string(),
        uri: String::new(),
    })
}

/// A registration delivers exactly one event carrying the gateway's reply.
#[tokio::test]
async fn test_register_delivers_reply() {
    let gw = TestGateway::start().await;
    let (face, mut rx) = gw.connect("edge-1").await;

    face.send(registration("h1")).await.unwrap();

    let event = rx.try_recv().expect("reply delivered");
    assert_eq!(event.sender.as_str(), "edge-1");
    assert_eq!(event.tg_id.as_deref(), Some("trunk123"));
    assert_eq!(
        event.packet,
        Packet::RegisterHandler(HandlerInfo {
            handler_id: "h1".to_string(),
            advertisement: "codecs=opus".to_string(),
            uri: "/.well-known/ript/v1/providertgs/trunk123/handlers/h1".to_string(),
        })
    );
    assert!(rx.try_recv().is_err(), "exactly one event per registration");
}

/// The reply body is the tagged JSON form.
#[tokio::test]
async fn test_register_reply_shape() {
    let gw = TestGateway::start().await;
    let http = raw_client("edge-2");
    http.get(gw.url("/media/join")).send().await.unwrap();

    let resp = http
        .post(gw.ript_url("/providertgs/trunk123/handlers"))
        .body(registration("h9").to_json().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = serde_json::from_slice(&resp.bytes().await.unwrap()).unwrap();
    assert_eq!(body["type"], "RegisterHandler");
    assert_eq!(body["data"]["handler_id"], "h9");
    assert_eq!(
        body["data"]["uri"],
        "/.well-known/ript/v1/providertgs/trunk123/handlers/h9"
    );
}

/// Two concurrent registrations on one face each get their own reply.
#[tokio::test]
async fn test_concurrent_registrations() {
    let gw = TestGateway::start().await;
    let http = raw_client("edge-3");
    http.get(gw.url("/media/join")).send().await.unwrap();

    let url = gw.ript_url("/providertgs/trunk123/handlers");
    let register = |id: &'static str| {
        let http = http.clone();
        let url = url.clone();
        async move {
            let resp = http
                .post(url)
                .body(registration(id).to_json().unwrap())
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 200);
            let reply = Packet::from_json(&resp.bytes().await.unwrap()).unwrap();
            (id, reply)
        }
    };

    let (a, b) = tokio::join!(register("alpha"), register("beta"));
    for (id, reply) in [a, b] {
        let Packet::RegisterHandler(info) = reply else {
            panic!("unexpected reply for {}: {:?}", id, reply);
        };
        assert_eq!(info.handler_id, id);
        assert!(info.uri.ends_with(&format!("/handlers/{}", id)));
    }
}

/// A registration for a trunk group the router does not serve times out.
#[tokio::test]
async fn test_unknown_trunk_group_times_out() {
    let gw = TestGateway::with_timeout(200).await;
    let mut config = gw.client_config("edge-4");
    config.trunk_group = "nope".to_string();
    let (face, mut rx) = gw.connect_with(config).await;

    let err = face.send(registration("h1")).await.unwrap_err();
    assert_eq!(err, ript_core::RiptError::CorrelationTimeout);
    assert!(rx.try_recv().is_err());
}

/// Call setup delivers the reply and moves media onto the new call.
#[tokio::test]
async fn test_call_setup_sets_call_id() {
    let gw = TestGateway::start().await;
    let (face, mut rx) = gw.connect("edge-5").await;
    assert_eq!(face.call_id(), "0");

    let call = Packet::Calls(CallInfo {
        handler_uri: "/.well-known/ript/v1/providertgs/trunk123/handlers/h1".to_string(),
        destination: "+15550100".to_string(),
        ..Default::default()
    });
    face.send(call).await.unwrap();

    let event = rx.try_recv().expect("call reply delivered");
    let Packet::Calls(info) = event.packet else {
        panic!("unexpected reply {:?}", event.packet);
    };
    assert_eq!(info.destination, "+15550100");
    assert_eq!(info.call_uri, "/.well-known/ript/v1/providertgs/trunk123/calls/1");
    assert_eq!(face.call_id(), "1");
}
