//! A [`tokio_util::codec::Decoder`]/[`Encoder`] pair wrapping
//! [`FrameAssembler`], for callers that prefer driving the protocol
//! through a [`tokio_util::codec::Framed`] transport rather than feeding
//! bytes to the assembler by hand.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{Frame, FrameAssembler, MAX_FRAME_SIZE};
use galileosky_core::Error;

/// Decodes inbound bytes into [`Frame`]s and encodes outbound
/// acknowledgements (or any other raw byte sequence, via `Bytes`).
pub struct GalileoskyCodec {
    assembler: FrameAssembler,
}

impl Default for GalileoskyCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl GalileoskyCodec {
    pub fn new() -> Self {
        Self { assembler: FrameAssembler::new() }
    }
}

impl Decoder for GalileoskyCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            self.assembler.feed(src);
            src.advance(src.len());
        }

        if let Some(frame) = self.assembler.next_frame() {
            if frame.payload().len() > MAX_FRAME_SIZE {
                return Err(Error::FrameTooLarge(frame.payload().len()));
            }
            return Ok(Some(frame));
        }

        Ok(None)
    }
}

impl Encoder<bytes::Bytes> for GalileoskyCodec {
    type Error = Error;

    fn encode(&mut self, item: bytes::Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len());
        dst.put_slice(&item);
        Ok(())
    }
}
