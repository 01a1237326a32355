//! Postcard encoding of stored documents.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use super::{Bucket, Document, RecentEvent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("failed to encode document: {0}")]
    Encode(postcard::Error),
    #[error("failed to decode document: {0}")]
    Decode(postcard::Error),
}

/// Body of the recent events document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsDocument {
    pub events: Vec<RecentEvent>,
}

pub fn encode_bucket(bucket: &Bucket) -> Result<Document, CodecError> {
    postcard::to_allocvec(bucket).map_err(CodecError::Encode)
}

pub fn decode_bucket(document: &[u8]) -> Result<Bucket, CodecError> {
    postcard::from_bytes(document).map_err(CodecError::Decode)
}

pub fn encode_events(events: &EventsDocument) -> Result<Document, CodecError> {
    postcard::to_allocvec(events).map_err(CodecError::Encode)
}

pub fn decode_events(document: &[u8]) -> Result<EventsDocument, CodecError> {
    postcard::from_bytes(document).map_err(CodecError::Decode)
}
