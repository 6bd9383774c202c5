use derive_more::Display;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::codec::{expect_prefix, parse_number, WireFormat};
use crate::error::Error;
use crate::message::{TradeMessage, DECEPTIVE_PREFIX, TRADE_PREFIX};
use crate::offer::PlayerId;

lazy_static! {
    static ref EMBARGO_PATTERN: Regex =
        Regex::new(r"^EMBARGO:(\d+):(PROPOSE|COMPLY|LIFT):(\d+)$").unwrap();
    static ref DISTRUST_PATTERN: Regex = Regex::new(r"^ANN_DISTRUST:(\d+)$").unwrap();
}

const REQUEST_PREFIX: &str = "REQ:";
const ANNOUNCE_PREFIX: &str = "ANN:";

/// Subject of information requests and announcements.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[display(fmt = "BP")]
    BuildPlan,
    #[display(fmt = "RES")]
    Resources,
    #[display(fmt = "EXTRA")]
    Extra,
    #[display(fmt = "WANTED")]
    Wanted,
}

impl FromStr for Topic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BP" => Ok(Topic::BuildPlan),
            "RES" => Ok(Topic::Resources),
            "EXTRA" => Ok(Topic::Extra),
            "WANTED" => Ok(Topic::Wanted),
            other => Err(Error::malformed(other, "unknown topic")),
        }
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbargoAction {
    #[display(fmt = "PROPOSE")]
    Propose,
    #[display(fmt = "COMPLY")]
    Comply,
    #[display(fmt = "LIFT")]
    Lift,
}

/// Every chat line the negotiation layer understands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatMessage {
    Trade(TradeMessage),
    /// Trade offer marked as deceptive by its sender.
    Deceptive(TradeMessage),
    Request(Topic),
    Announce { topic: Topic, payload: String },
    Embargo {
        proposer: PlayerId,
        action: EmbargoAction,
        target: PlayerId,
    },
    Distrust(PlayerId),
}

impl WireFormat for ChatMessage {
    fn encode(&self) -> String {
        match self {
            ChatMessage::Trade(message) => message.encode_with(TRADE_PREFIX),
            ChatMessage::Deceptive(message) => message.encode_with(DECEPTIVE_PREFIX),
            ChatMessage::Request(topic) => format!("{}{}", REQUEST_PREFIX, topic),
            ChatMessage::Announce { topic, payload } => {
                format!("{}{}:{}", ANNOUNCE_PREFIX, topic, payload)
            }
            ChatMessage::Embargo {
                proposer,
                action,
                target,
            } => format!("EMBARGO:{}:{}:{}", proposer, action, target),
            ChatMessage::Distrust(player) => format!("ANN_DISTRUST:{}", player),
        }
    }

    fn decode(text: &str) -> Result<Self, Error> {
        if text.starts_with(TRADE_PREFIX) {
            return Ok(ChatMessage::Trade(TradeMessage::decode_with(
                text,
                TRADE_PREFIX,
            )?));
        }
        if text.starts_with(DECEPTIVE_PREFIX) {
            return Ok(ChatMessage::Deceptive(TradeMessage::decode_with(
                text,
                DECEPTIVE_PREFIX,
            )?));
        }
        if text.starts_with(REQUEST_PREFIX) {
            let topic = expect_prefix(text, REQUEST_PREFIX)?;
            return Ok(ChatMessage::Request(topic.parse()?));
        }
        if text.starts_with(ANNOUNCE_PREFIX) {
            let rest = expect_prefix(text, ANNOUNCE_PREFIX)?;
            let (topic, payload) = rest
                .split_once(':')
                .ok_or_else(|| Error::malformed(text, "announcement without payload"))?;
            return Ok(ChatMessage::Announce {
                topic: topic.parse()?,
                payload: payload.to_string(),
            });
        }
        if let Some(captures) = EMBARGO_PATTERN.captures(text) {
            let action = match &captures[2] {
                "PROPOSE" => EmbargoAction::Propose,
                "COMPLY" => EmbargoAction::Comply,
                _ => EmbargoAction::Lift,
            };
            return Ok(ChatMessage::Embargo {
                proposer: parse_number(&captures[1], text)?,
                action,
                target: parse_number(&captures[3], text)?,
            });
        }
        if let Some(captures) = DISTRUST_PATTERN.captures(text) {
            return Ok(ChatMessage::Distrust(parse_number(&captures[1], text)?));
        }
        Err(Error::malformed(text, "unknown message type"))
    }
}
