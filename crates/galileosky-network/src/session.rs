//! One logical task per accepted TCP connection (§5): strictly sequential
//! byte processing, only the socket read and the sink write may suspend.
//!
//! This is the thin adapter the spec calls out as "out of scope" for the
//! core codec but still worth implementing: it drives
//! [`FrameAssembler`] → [`parse_packet`] → per-tag decode → Mercury
//! dispatch → [`build_record`], then pushes the result to the sink and
//! acks the frame, in that order (§5: "acknowledgements are sent after
//! the record is pushed").

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use galileosky_metrics::MercuryMetrics;
use galileosky_protocol::decode::DecodedValue;
use galileosky_protocol::{build_record, decode_tag, parse_packet, FrameAssembler};
use galileosky_sink::{JsonlSink, Sink};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

/// Bytes read per socket poll. Arbitrary but generous relative to a
/// typical Galileosky frame (well under a kilobyte); large frames still
/// assemble correctly across several reads, this just bounds memcpy churn.
const READ_CHUNK_SIZE: usize = 4096;

/// Everything a session needs that outlives any single connection:
/// where to push finished records, how to report them as gauges, and
/// how long to wait for bytes before giving up on an idle peer.
#[derive(Clone)]
pub struct SessionContext {
    pub sink: Arc<JsonlSink>,
    pub metrics: Option<Arc<MercuryMetrics>>,
    pub idle_timeout: Duration,
}

/// Drives one accepted connection to completion. Returns once the peer
/// closes the socket, the idle timeout elapses, or a socket write fails
/// (the three cancellation triggers named in §5).
pub async fn run(mut stream: TcpStream, peer_addr: SocketAddr, ctx: SessionContext) {
    info!(peer = %peer_addr, "session started");

    let mut assembler = FrameAssembler::new();
    let mut read_buf = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read_result = timeout(ctx.idle_timeout, stream.read(&mut read_buf)).await;

        let n = match read_result {
            Ok(Ok(0)) => {
                info!(peer = %peer_addr, "peer closed connection");
                break;
            }
            Ok(Ok(n)) => n,
            Ok(Err(err)) => {
                warn!(peer = %peer_addr, error = %err, "socket read error, ending session");
                break;
            }
            Err(_) => {
                warn!(peer = %peer_addr, timeout = ?ctx.idle_timeout, "idle timeout, ending session");
                break;
            }
        };

        assembler.feed(&read_buf[..n]);

        while let Some(frame) = assembler.next_frame() {
            let packet = parse_packet(&bytes::Bytes::copy_from_slice(frame.payload()));
            if !packet.skipped.is_empty() {
                debug!(peer = %peer_addr, skipped = packet.skipped.len(), "packet contained unrecognized bytes");
            }

            for tag in &packet.tags {
                if tag.id == 0xEA {
                    if let DecodedValue::Raw(hex) = decode_tag(tag.id, &tag.data) {
                        if let Err(err) = ctx
                            .sink
                            .save_error(&hex, "mercury 230 blob failed wrong-size/marker precondition")
                            .await
                        {
                            error!(peer = %peer_addr, error = %err, "failed to write mercury error sidecar");
                        }
                    }
                }
            }

            let imei = device_identity();
            let record = build_record(&packet, Some(imei.clone()));

            if let Some(metrics) = &ctx.metrics {
                if let Some(mercury_id) = &record.mercury_id {
                    metrics.update(&imei, mercury_id, &record);
                }
            }

            let mut line = record.to_json();
            if let Value::Object(map) = &mut line {
                map.insert("_received_at".into(), Value::String(chrono::Local::now().to_rfc3339()));
            }
            if let Err(err) = ctx.sink.save(line).await {
                error!(peer = %peer_addr, error = %err, "sink write failed, continuing session");
            }

            let ack = frame.ack();
            if let Err(err) = stream.write_all(&ack).await {
                warn!(peer = %peer_addr, error = %err, "ack write failed, ending session");
                return;
            }
            trace!(peer = %peer_addr, checksum = frame.checksum(), "ack sent");
        }
    }

    info!(peer = %peer_addr, "session ended");
}

/// The wire format carries no IMEI or other stable device identifier —
/// `0x10` is the archive record number, which increments every packet and
/// would defeat the `(imei, mercury_id)` grouping key if used here. Per
/// §6 ("imei ... placeholder if device identity is unknown"), this always
/// returns the placeholder.
fn device_identity() -> String {
    "unknown".to_string()
}
