pub mod catalog;
pub mod codec;
pub mod decode;
pub mod frame;
pub mod mercury;
pub mod record;
pub mod tags;

pub use codec::GalileoskyCodec;
pub use decode::{decode_tag, DecodedValue};
pub use frame::{crc16_modbus, Frame, FrameAssembler};
pub use mercury::MercuryRecord;
pub use record::{build_record, RecordFields};
pub use tags::{parse_packet, ParsedPacket, ParsedTag};
