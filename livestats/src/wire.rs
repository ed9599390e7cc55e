//! Push message envelopes: `{"event":"stats","data":{..}}` and
//! `{"event":"error","data":{"error":".."}}`.

use serde::{Deserialize, Serialize};

use crate::types::Sample;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum StreamEvent {
    Stats(Sample),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed stream message: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn decode(text: &str) -> Result<StreamEvent, WireError> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode(event: &StreamEvent) -> Result<String, WireError> {
    Ok(serde_json::to_string(event)?)
}
