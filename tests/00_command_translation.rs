mod support;

use serde_json::Value;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn ver_becomes_a_version_message_on_the_back_end() {
    let mut h = support::start_gateway();

    h.acm.write_all(b"ver\n").await.unwrap();

    let line = support::read_until(&mut h.stm, b"\r\n").await;
    assert_eq!(line, b"{\"MsgType\":\"M4\",\"action\":\"version\"}\r\n");
}

#[tokio::test]
async fn sta_becomes_a_status_message_on_the_back_end() {
    let mut h = support::start_gateway();

    h.acm.write_all(b"sta\n").await.unwrap();

    let line = support::read_until(&mut h.stm, b"\r\n").await;
    assert_eq!(line, b"{\"MsgType\":\"M4\",\"action\":\"status\"}\r\n");
}

#[tokio::test]
async fn unknown_command_is_rejected_synchronously() {
    let mut h = support::start_gateway();

    h.acm.write_all(b"unknowncmd\n").await.unwrap();

    let reply = support::read_until(&mut h.acm, b"\n>").await;
    assert_eq!(reply, b"Command not recognised: unknowncmd\n>");

    // Nothing may reach the controller for a rejected command.
    support::assert_silent(&mut h.stm).await;
}

#[tokio::test]
async fn algo_is_wrapped_into_an_indexed_request() {
    let mut h = support::start_gateway();

    h.acm.write_all(b"algo -b 1 -p 100\n").await.unwrap();

    let line = support::read_until(&mut h.stm, b"\r\n").await;
    let value: Value = serde_json::from_slice(&line[..line.len() - 2]).unwrap();

    assert_eq!(value["MsgType"], "M2");
    assert_eq!(value["cmd"], "algo -b 1 -p 100");
    assert!(value["idex"].as_u64().is_some());

    assert_eq!(h.gateway.pending_requests(), 1);
}

#[tokio::test]
async fn batched_commands_are_split_into_separate_messages() {
    let mut h = support::start_gateway();

    // One write, two commands; the assembler must find both boundaries.
    h.acm.write_all(b"ver\nsta\n").await.unwrap();

    let first = support::read_until(&mut h.stm, b"\r\n").await;
    let second = support::read_until(&mut h.stm, b"\r\n").await;

    assert_eq!(first, b"{\"MsgType\":\"M4\",\"action\":\"version\"}\r\n");
    assert_eq!(second, b"{\"MsgType\":\"M4\",\"action\":\"status\"}\r\n");

    let stats = h.gateway.statistics();
    assert_eq!(stats.front_end_frames, 2);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn command_split_across_writes_is_reassembled() {
    let mut h = support::start_gateway();

    h.acm.write_all(b"ve").await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    h.acm.write_all(b"r\n").await.unwrap();

    let line = support::read_until(&mut h.stm, b"\r\n").await;
    assert_eq!(line, b"{\"MsgType\":\"M4\",\"action\":\"version\"}\r\n");
}

#[tokio::test]
async fn operator_injection_uses_the_same_routing_table() {
    let mut h = support::start_gateway();

    h.gateway.inject_command("ver").await.unwrap();

    let line = support::read_until(&mut h.stm, b"\r\n").await;
    assert_eq!(line, b"{\"MsgType\":\"M4\",\"action\":\"version\"}\r\n");
}

#[tokio::test]
async fn provisioning_command_becomes_m3() {
    let mut h = support::start_gateway();

    h.acm
        .write_all(b"net arcade hunter2 /srv/games\n")
        .await
        .unwrap();

    let line = support::read_until(&mut h.stm, b"\r\n").await;
    let value: Value = serde_json::from_slice(&line[..line.len() - 2]).unwrap();

    assert_eq!(value["MsgType"], "M3");
    assert_eq!(value["ssid"], "arcade");
    assert_eq!(value["pass"], "hunter2");
    assert_eq!(value["path"], "/srv/games");
}
