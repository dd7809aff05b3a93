//! End-to-end checks driving a real [`Server`] over a loopback socket:
//! connect, send a frame, confirm the ack, confirm the sink received a
//! line.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use galileosky_network::Server;
use galileosky_sink::JsonlSink;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

async fn start_server(sink_path: &std::path::Path) -> SocketAddr {
    let sink = Arc::new(JsonlSink::new(sink_path));
    let server = Server::bind(
        "127.0.0.1:0".parse().unwrap(),
        sink,
        None,
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        server.serve().await;
    });
    addr
}

#[tokio::test]
async fn server_acks_a_fixed_length_tag_frame() {
    let dir = tempfile::tempdir().unwrap();
    let sink_path = dir.path().join("out.jsonl");
    let addr = start_server(&sink_path).await;

    let mut stream = timeout(Duration::from_secs(2), TcpStream::connect(addr)).await.unwrap().unwrap();

    // payload: tag 0x10 (record number) = 1234 (little-endian)
    let frame = [0x01u8, 0x03, 0x00, 0x10, 0xD2, 0x04, 0xAA, 0xBB];
    stream.write_all(&frame).await.unwrap();

    let mut ack = [0u8; 3];
    timeout(Duration::from_secs(2), stream.read_exact(&mut ack)).await.unwrap().unwrap();
    assert_eq!(ack, [0x02, 0xAA, 0xBB]);
}

#[tokio::test]
async fn server_writes_mercury_record_to_sink() {
    let dir = tempfile::tempdir().unwrap();
    let sink_path = dir.path().join("out.jsonl");
    let addr = start_server(&sink_path).await;

    let mut stream = timeout(Duration::from_secs(2), TcpStream::connect(addr)).await.unwrap().unwrap();

    let mut blob = vec![0u8; 93];
    blob[0] = 0x02;
    blob[1] = 0x5D; // mercury address

    let mut payload = vec![0xEA, blob.len() as u8];
    payload.extend(blob);
    let len = payload.len() as u16;
    let mut frame = vec![0x01u8];
    frame.extend(len.to_le_bytes());
    frame.extend(&payload);
    frame.extend(0xBEEFu16.to_le_bytes());

    stream.write_all(&frame).await.unwrap();

    let mut ack = [0u8; 3];
    timeout(Duration::from_secs(2), stream.read_exact(&mut ack)).await.unwrap().unwrap();
    assert_eq!(ack, [0x02, 0xEF, 0xBE]);

    // give the sink a moment to flush the append before reading it back
    tokio::time::sleep(Duration::from_millis(50)).await;
    let contents = tokio::fs::read_to_string(&sink_path).await.unwrap();
    let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(line["mercury_id"], serde_json::json!("93"));
    assert_eq!(line["imei"], serde_json::json!("unknown"));
    assert!(line["_received_at"].is_string());
}

#[tokio::test]
async fn idle_connection_is_closed_after_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let sink_path = dir.path().join("out.jsonl");
    let sink = Arc::new(JsonlSink::new(&sink_path));
    let server = Server::bind(
        "127.0.0.1:0".parse().unwrap(),
        sink,
        None,
        Duration::from_millis(100),
    )
    .await
    .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        server.serve().await;
    });

    let mut stream = timeout(Duration::from_secs(2), TcpStream::connect(addr)).await.unwrap().unwrap();
    let mut buf = [0u8; 1];
    // Peer sends nothing; the idle timeout should close the session,
    // which surfaces here as EOF on our end.
    let result = timeout(Duration::from_secs(2), stream.read(&mut buf)).await.unwrap().unwrap();
    assert_eq!(result, 0);
}
