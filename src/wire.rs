//! Frame codec for transport messages.
//!
//! Server-to-client frames carry a [`TopicEvent`]; client-to-server frames
//! carry a [`ClientMessage`]. Both are tagged with the event name, e.g.
//! `{"topic":"rust","event":{"event":"commentDeleted","payload":{...}}}`.

use crate::channels::TopicEvent;
use crate::error::Result;
use crate::types::TopicId;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Frame encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    #[default]
    Json,
    MessagePack,
}

/// Outbound messages from a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    JoinTopic(TopicId),
    LeaveTopic(TopicId),
}

fn to_frame<T: Serialize>(value: &T, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Json => Ok(serde_json::to_vec(value)?),
        Encoding::MessagePack => Ok(rmp_serde::to_vec_named(value)?),
    }
}

fn from_frame<T: DeserializeOwned>(bytes: &[u8], encoding: Encoding) -> Result<T> {
    match encoding {
        Encoding::Json => Ok(serde_json::from_slice(bytes)?),
        Encoding::MessagePack => Ok(rmp_serde::from_slice(bytes)?),
    }
}

pub fn encode_event(event: &TopicEvent, encoding: Encoding) -> Result<Vec<u8>> {
    to_frame(event, encoding)
}

pub fn decode_event(bytes: &[u8], encoding: Encoding) -> Result<TopicEvent> {
    from_frame(bytes, encoding)
}

pub fn encode_client(message: &ClientMessage, encoding: Encoding) -> Result<Vec<u8>> {
    to_frame(message, encoding)
}

pub fn decode_client(bytes: &[u8], encoding: Encoding) -> Result<ClientMessage> {
    from_frame(bytes, encoding)
}
