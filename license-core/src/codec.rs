//! Codecs encode license beans to a [`Sink`] and decode them from a
//! [`Source`].
//!
//! A codec serializes the complete value before it opens the output stream,
//! so a value that cannot be represented leaves the sink untouched. Streams
//! are dropped, and thereby closed, before any result is returned.

use std::io::{self, Read as _, Write as _};

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::io::{Sink, Source};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("could not open output stream")]
    Open(#[source] io::Error),
    #[error("could not write encoded value")]
    Write(#[source] io::Error),
    #[error("value cannot be encoded as {content_type}")]
    Serialize {
        content_type: &'static str,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Error)]
pub enum DecodingError {
    #[error("could not open input stream")]
    Open(#[source] io::Error),
    #[error("could not read encoded value")]
    Read(#[source] io::Error),
    #[error("input is not a valid {content_type} value of the expected type")]
    Deserialize {
        content_type: &'static str,
        #[source]
        source: BoxError,
    },
}

pub trait Codec {
    /// A MIME type identifying the encoding, for labeling purposes.
    fn content_type(&self) -> &str;

    /// The transfer encoding of the encoded bytes, as in RFC 2045.
    fn content_transfer_encoding(&self) -> &str;

    /// Write `value` to a new output stream of `sink`.
    ///
    /// The absent value is written by passing `&None::<T>`.
    fn encode<T: Serialize + ?Sized>(&self, sink: &dyn Sink, value: &T)
        -> Result<(), EncodingError>;

    /// Read a `T` from a new input stream of `source`.
    ///
    /// Use `T = Option<U>` to accept the absent value.
    fn decode<T: DeserializeOwned>(&self, source: &dyn Source) -> Result<T, DecodingError>;
}

const MSGPACK_CONTENT_TYPE: &str = "application/x-msgpack";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Binary MessagePack with named struct fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackCodec;

impl Codec for MsgpackCodec {
    fn content_type(&self) -> &str {
        MSGPACK_CONTENT_TYPE
    }

    fn content_transfer_encoding(&self) -> &str {
        "binary"
    }

    fn encode<T: Serialize + ?Sized>(
        &self,
        sink: &dyn Sink,
        value: &T,
    ) -> Result<(), EncodingError> {
        let bytes = rmp_serde::to_vec_named(value).map_err(|e| EncodingError::Serialize {
            content_type: MSGPACK_CONTENT_TYPE,
            source: e.into(),
        })?;
        write_encoded(sink, &bytes)
    }

    fn decode<T: DeserializeOwned>(&self, source: &dyn Source) -> Result<T, DecodingError> {
        let bytes = read_encoded(source)?;
        rmp_serde::from_slice(&bytes).map_err(|e| DecodingError::Deserialize {
            content_type: MSGPACK_CONTENT_TYPE,
            source: e.into(),
        })
    }
}

/// UTF-8 JSON. Readable by humans and by most other tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &str {
        JSON_CONTENT_TYPE
    }

    fn content_transfer_encoding(&self) -> &str {
        "8bit"
    }

    fn encode<T: Serialize + ?Sized>(
        &self,
        sink: &dyn Sink,
        value: &T,
    ) -> Result<(), EncodingError> {
        let bytes = serde_json::to_vec(value).map_err(|e| EncodingError::Serialize {
            content_type: JSON_CONTENT_TYPE,
            source: e.into(),
        })?;
        write_encoded(sink, &bytes)
    }

    fn decode<T: DeserializeOwned>(&self, source: &dyn Source) -> Result<T, DecodingError> {
        let bytes = read_encoded(source)?;
        serde_json::from_slice(&bytes).map_err(|e| DecodingError::Deserialize {
            content_type: JSON_CONTENT_TYPE,
            source: e.into(),
        })
    }
}

fn write_encoded(sink: &dyn Sink, bytes: &[u8]) -> Result<(), EncodingError> {
    let mut out = sink.output().map_err(EncodingError::Open)?;
    out.write_all(bytes).map_err(EncodingError::Write)?;
    out.flush().map_err(EncodingError::Write)
}

fn read_encoded(source: &dyn Source) -> Result<Vec<u8>, DecodingError> {
    let mut input = source.input().map_err(DecodingError::Open)?;
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes).map_err(DecodingError::Read)?;
    Ok(bytes)
}
