//! The pluggable payload codec boundary (§4.8). Wire framing (`encode_query`
//! etc. in [`crate::frame`]) is mandatory and independent of this; this
//! trait only governs how a `Query`/`Response`'s opaque `message_data` is
//! turned into/from a handler's declared input/output type.
//!
//! A default `serde` + `bincode` implementation is supplied — the same
//! pairing `t51core` (the bushhammer game server in the retrieval pack)
//! uses for its own wire payloads.

use std::error::Error as StdError;

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::CodecError;

/// An external collaborator (§1: deliberately out of scope as a concrete
/// implementation, but the boundary itself is part of the core contract).
pub trait PayloadCodec: Send + Sync + 'static {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, CodecError>;
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// Default codec: `bincode`'s compact binary encoding over `serde`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeCodec;

impl PayloadCodec for BincodeCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, CodecError> {
        bincode::serialize(value)
            .map(Bytes::from)
            .map_err(|e| CodecError(e as Box<dyn StdError + Send + Sync>))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError(e as Box<dyn StdError + Send + Sync>))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn bincode_codec_round_trips_structs() {
        let codec = BincodeCodec;
        let point = Point { x: 1, y: -2 };
        let bytes = codec.encode(&point).unwrap();
        let decoded: Point = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, point);
    }

    #[test]
    fn bincode_codec_round_trips_primitives() {
        let codec = BincodeCodec;
        let bytes = codec.encode(&42i32).unwrap();
        let decoded: i32 = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, 42);
    }

    #[test]
    fn bincode_codec_reports_decode_errors() {
        let codec = BincodeCodec;
        let err = codec.decode::<Point>(&[0xFF]).unwrap_err();
        assert!(format!("{err}").contains("payload codec error"));
    }
}
