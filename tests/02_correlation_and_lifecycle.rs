mod support;

use serde_json::Value;
use tokio::io::AsyncWriteExt;

use coingate::shared_types::GatewayState;
use coingate::Transport;

#[tokio::test]
async fn indexed_response_resolves_the_pending_request() {
    let mut h = support::start_gateway();

    h.acm.write_all(b"algo -b 1 -p 100\n").await.unwrap();

    let line = support::read_until(&mut h.stm, b"\r\n").await;
    let value: Value = serde_json::from_slice(&line[..line.len() - 2]).unwrap();
    let idex = value["idex"].as_u64().expect("fresh idex");

    assert_eq!(h.gateway.pending_requests(), 1);

    let response = format!("{{\"MsgType\":\"M2\",\"idex\":{idex},\"ack\":true}}\r\n");
    h.stm.write_all(response.as_bytes()).await.unwrap();

    let reply = support::read_until(&mut h.acm, b"\n>").await;
    let reply_value: Value = serde_json::from_slice(&reply[..reply.len() - 2]).unwrap();

    assert_eq!(reply_value["idex"].as_u64(), Some(idex));
    assert_eq!(reply_value["ack"], Value::Bool(true));
    assert_eq!(h.gateway.pending_requests(), 0);
}

#[tokio::test]
async fn unanswered_request_expires() {
    let mut h = support::start_gateway();

    h.acm.write_all(b"algo -b 1\n").await.unwrap();
    let _ = support::read_until(&mut h.stm, b"\r\n").await;
    assert_eq!(h.gateway.pending_requests(), 1);

    // fast_settings uses a 200ms correlation timeout; the sweep runs often
    // enough that the entry disappears well within a second.
    support::wait_for("the pending entry to expire", || {
        h.gateway.pending_requests() == 0
    })
    .await;
}

#[tokio::test]
async fn response_without_a_pending_request_still_forwards() {
    let mut h = support::start_gateway();

    h.stm
        .write_all(b"{\"MsgType\":\"M2\",\"idex\":777,\"ack\":true}\r\n")
        .await
        .unwrap();

    let reply = support::read_until(&mut h.acm, b"\n>").await;
    let value: Value = serde_json::from_slice(&reply[..reply.len() - 2]).unwrap();
    assert_eq!(value["idex"].as_u64(), Some(777));
}

#[tokio::test]
async fn lifecycle_transitions_and_restart() {
    let h = support::start_gateway();
    assert_eq!(h.gateway.state(), GatewayState::Running);

    // A second start while running is refused.
    let (_spare_a, a) = tokio::io::duplex(64);
    let (_spare_b, b) = tokio::io::duplex(64);
    assert!(h
        .gateway
        .start(Transport::Memory(a), Transport::Memory(b))
        .is_err());
    assert_eq!(h.gateway.state(), GatewayState::Running);

    h.gateway.stop().await.unwrap();
    assert_eq!(h.gateway.state(), GatewayState::Stopped);

    // A stopped gateway starts again on fresh transports.
    let (mut acm2, a2) = tokio::io::duplex(4096);
    let (mut stm2, b2) = tokio::io::duplex(4096);
    h.gateway
        .start(Transport::Memory(a2), Transport::Memory(b2))
        .unwrap();
    assert_eq!(h.gateway.state(), GatewayState::Running);

    acm2.write_all(b"ver\n").await.unwrap();
    let line = support::read_until(&mut stm2, b"\r\n").await;
    assert_eq!(line, b"{\"MsgType\":\"M4\",\"action\":\"version\"}\r\n");

    h.gateway.stop().await.unwrap();
    assert_eq!(h.gateway.state(), GatewayState::Stopped);
}

#[tokio::test]
async fn counters_reflect_traffic_in_both_directions() {
    let mut h = support::start_gateway();

    h.acm.write_all(b"ver\n").await.unwrap();
    let _ = support::read_until(&mut h.stm, b"\r\n").await;

    h.stm
        .write_all(b"{\"MsgType\":\"M4\",\"action\":\"version\"}\r\n")
        .await
        .unwrap();
    let _ = support::read_until(&mut h.acm, b"\n>").await;

    let stats = h.gateway.statistics();
    assert_eq!(stats.front_end_frames, 1);
    assert_eq!(stats.back_end_frames, 1);
    assert_eq!(stats.errors, 0);
}
