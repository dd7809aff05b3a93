//! Walks a frame's payload as a sequence of tagged fields using
//! [`crate::catalog`]. Unlike the frame assembler, this parser runs over
//! an already-complete, in-memory payload slice — there is no partial
//! state to carry across reads.

use bytes::Bytes;
use tracing::trace;

use crate::catalog::{self, TagLength};

/// A single tag recognized in the payload, with its raw (still encoded)
/// data slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    pub id: u8,
    pub data: Bytes,
}

/// The result of walking one frame's payload: every tag recognized, in
/// wire order, plus the raw bytes that could not be matched to any tag
/// (either an unknown id, or a known id whose declared length ran past
/// the end of the payload).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPacket {
    pub tags: Vec<ParsedTag>,
    pub skipped: Vec<u8>,
}

/// Parses a frame payload into a [`ParsedPacket`].
///
/// Resync-forward on trouble: a byte that doesn't match any catalog entry,
/// or a catalog match whose declared length would run past the end of the
/// payload, is recorded in `skipped` and the cursor advances by exactly
/// one byte — the rest of the payload is still attempted. This mirrors the
/// original listener's behavior of never aborting a whole packet over one
/// bad tag.
pub fn parse_packet(payload: &Bytes) -> ParsedPacket {
    let mut packet = ParsedPacket::default();
    let mut cursor = 0usize;
    let len = payload.len();

    while cursor < len {
        let id = payload[cursor];

        let Some(descriptor) = catalog::lookup(id) else {
            trace!(tag = id, cursor, "no catalog entry, skipping byte");
            packet.skipped.push(id);
            cursor += 1;
            continue;
        };

        let header_start = cursor;
        cursor += 1;

        let data_len = match descriptor.length {
            TagLength::Fixed(n) => n as usize,
            TagLength::Prefixed1 => {
                if cursor >= len {
                    cursor = header_start;
                    packet.skipped.push(payload[cursor]);
                    cursor += 1;
                    continue;
                }
                let n = payload[cursor] as usize;
                cursor += 1;
                n
            }
            TagLength::Prefixed2 => {
                if cursor + 2 > len {
                    cursor = header_start;
                    packet.skipped.push(payload[cursor]);
                    cursor += 1;
                    continue;
                }
                let n = u16::from_le_bytes([payload[cursor], payload[cursor + 1]]) as usize;
                cursor += 2;
                n
            }
        };

        if cursor + data_len > len {
            trace!(tag = id, data_len, remaining = len - cursor, "truncated tag, resyncing");
            cursor = header_start;
            packet.skipped.push(payload[cursor]);
            cursor += 1;
            continue;
        }

        let data = payload.slice(cursor..cursor + data_len);
        packet.tags.push(ParsedTag { id, data });
        cursor += data_len;
    }

    packet
}
