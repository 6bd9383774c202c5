use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::codec::{expect_prefix, parse_number, WireFormat};
use crate::error::Error;
use crate::offer::{Offer, PlayerId};
use crate::persuasion::Persuasion;
use crate::resources::ResourceSet;

pub const TRADE_PREFIX: &str = "TRADE:";
pub const DECEPTIVE_PREFIX: &str = "JTRD:";

const FORCED: &str = "FRC_ACC:";
const ACCEPT: &str = "ACC";
const REJECT: &str = "REJ";
const BLOCK: &str = "BLOCK#";
const BLOCK_COMPLY: &str = "BLOCK_COMPLY";
const NO_RESPONSE: &str = "NO_RESPONSE";
const NL_FIELD: &str = "|nlchatstring=";
const PERSUASION_FIELD: &str = "|persuasion=";

/// Natural-language text attached to implicit rejections.
pub const IMPLICIT_REJECT: &str = "Implicit reject message";

/// Content of a trade chat line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAct {
    Offer {
        offer: Offer,
        forced: bool,
        persuasion: Persuasion,
    },
    Accept,
    Reject,
    /// Asks the receivers not to trade the listed resources. Empty means "anything".
    Block(ResourceSet),
    BlockComply,
    NoResponse,
}

/// One player's answer to an outstanding offer, as recorded by the offerer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Accept,
    Reject,
    Counter {
        offer: Offer,
        forced: bool,
        persuasion: Persuasion,
    },
    Block(ResourceSet),
    NoResponse,
}

impl TradeAct {
    /// Interpretation of this act as an answer to our offer. `BlockComply` is no answer.
    pub fn into_response(self) -> Option<Response> {
        let response = match self {
            TradeAct::Offer {
                offer,
                forced,
                persuasion,
            } => Response::Counter {
                offer,
                forced,
                persuasion,
            },
            TradeAct::Accept => Response::Accept,
            TradeAct::Reject => Response::Reject,
            TradeAct::Block(resources) => Response::Block(resources),
            TradeAct::NoResponse => Response::NoResponse,
            TradeAct::BlockComply => return None,
        };
        Some(response)
    }
}

impl fmt::Display for TradeAct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAct::Offer {
                offer,
                forced,
                persuasion,
            } => {
                write!(f, "offer: {}", offer)?;
                if *forced {
                    write!(f, " (forced)")?;
                }
                if !persuasion.is_null() {
                    write!(f, " with {}", persuasion.identifier())?;
                }
                Ok(())
            }
            TradeAct::Accept => write!(f, "accept"),
            TradeAct::Reject => write!(f, "reject"),
            TradeAct::Block(resources) => write!(f, "block [{}]", resources),
            TradeAct::BlockComply => write!(f, "block comply"),
            TradeAct::NoResponse => write!(f, "no response"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeMessage {
    pub sender: PlayerId,
    pub receivers: BTreeSet<PlayerId>,
    pub act: TradeAct,
    /// Opaque natural-language rendering, passed through untouched.
    pub nl: String,
}

impl TradeMessage {
    pub fn new(
        sender: PlayerId,
        receivers: impl IntoIterator<Item = PlayerId>,
        act: TradeAct,
        nl: impl ToString,
    ) -> TradeMessage {
        TradeMessage {
            sender,
            receivers: receivers.into_iter().collect(),
            act,
            nl: nl.to_string(),
        }
    }

    pub fn is_for(&self, player: PlayerId) -> bool {
        self.receivers.contains(&player)
    }

    pub(crate) fn encode_with(&self, prefix: &str) -> String {
        let receivers = self
            .receivers
            .iter()
            .map(|pn| pn.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let (body, persuasion) = match &self.act {
            TradeAct::Offer {
                offer,
                forced,
                persuasion,
            } => {
                let forced = if *forced { FORCED } else { "" };
                (format!("{}{}", forced, offer.encode()), persuasion)
            }
            TradeAct::Accept => (ACCEPT.to_string(), &Persuasion::Null),
            TradeAct::Reject => (REJECT.to_string(), &Persuasion::Null),
            TradeAct::Block(resources) => {
                let resources = if resources.is_empty() {
                    String::new()
                } else {
                    resources.encode()
                };
                (format!("{}{}", BLOCK, resources), &Persuasion::Null)
            }
            TradeAct::BlockComply => (BLOCK_COMPLY.to_string(), &Persuasion::Null),
            TradeAct::NoResponse => (NO_RESPONSE.to_string(), &Persuasion::Null),
        };

        let mut text = format!(
            "{}{}:{}:{}{}{}",
            prefix, self.sender, receivers, body, NL_FIELD, self.nl
        );
        if !persuasion.is_null() {
            text.push_str(PERSUASION_FIELD);
            text.push_str(&persuasion.encode());
        }
        text
    }

    pub(crate) fn decode_with(text: &str, prefix: &str) -> Result<TradeMessage, Error> {
        let rest = expect_prefix(text, prefix)?;
        let mut parts = rest.splitn(3, ':');
        let sender = parts
            .next()
            .ok_or_else(|| Error::malformed(text, "missing sender"))?;
        let receivers = parts
            .next()
            .ok_or_else(|| Error::malformed(text, "missing receivers"))?;
        let tail = parts
            .next()
            .ok_or_else(|| Error::malformed(text, "missing body"))?;

        let sender = parse_number(sender, text)?;
        let receivers = receivers
            .split(',')
            .filter(|pn| !pn.is_empty())
            .map(|pn| parse_number(pn, text))
            .collect::<Result<BTreeSet<PlayerId>, _>>()?;

        let (body, annotations) = tail
            .split_once(NL_FIELD)
            .ok_or_else(|| Error::malformed(text, "missing nlchatstring"))?;
        let (nl, persuasion) = match annotations.rfind(PERSUASION_FIELD) {
            Some(idx) => (
                &annotations[..idx],
                Persuasion::decode(&annotations[idx + PERSUASION_FIELD.len()..])?,
            ),
            None => (annotations, Persuasion::Null),
        };

        let act = match body {
            ACCEPT => TradeAct::Accept,
            REJECT => TradeAct::Reject,
            BLOCK_COMPLY => TradeAct::BlockComply,
            NO_RESPONSE => TradeAct::NoResponse,
            _ if body.starts_with(BLOCK) => {
                let resources = &body[BLOCK.len()..];
                if resources.is_empty() {
                    TradeAct::Block(ResourceSet::new())
                } else {
                    TradeAct::Block(ResourceSet::decode(resources)?)
                }
            }
            _ => {
                let (forced, offer) = match body.strip_prefix(FORCED) {
                    Some(offer) => (true, offer),
                    None => (false, body),
                };
                TradeAct::Offer {
                    offer: Offer::decode(offer)?,
                    forced,
                    persuasion,
                }
            }
        };

        Ok(TradeMessage {
            sender,
            receivers,
            act,
            nl: nl.to_string(),
        })
    }
}

impl WireFormat for TradeMessage {
    fn encode(&self) -> String {
        self.encode_with(TRADE_PREFIX)
    }

    fn decode(text: &str) -> Result<Self, Error> {
        Self::decode_with(text, TRADE_PREFIX)
    }
}

impl fmt::Display for TradeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "player {} -> {:?}: {}",
            self.sender, self.receivers, self.act
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Resource, TradeType};

    fn offer() -> Offer {
        Offer::new(
            "g1",
            0,
            vec![1, 2],
            ResourceSet::single(Resource::Clay),
            ResourceSet::single(Resource::Ore),
        )
    }

    #[test]
    fn test_forced_offer_with_persuasion() {
        let message = TradeMessage::new(
            0,
            vec![1],
            TradeAct::Offer {
                offer: offer().restricted_to(1),
                forced: true,
                persuasion: Persuasion::ImmediateTrade {
                    trade_type: TradeType::Bank,
                    resource: Resource::Clay,
                },
            },
            "Come on, it lets you trade",
        );
        let encoded = message.encode();
        assert!(encoded.starts_with("TRADE:0:1:FRC_ACC:game=g1|from=0|to=false,true,false,false"));
        assert!(encoded.ends_with(
            "|nlchatstring=Come on, it lets you trade|persuasion=ITP|constraints=|params=TType=bank,res=clay"
        ));
        assert_eq!(TradeMessage::decode(&encoded).unwrap(), message);
    }

    #[test]
    fn test_block_without_resources() {
        let message = TradeMessage::new(2, vec![0], TradeAct::Block(ResourceSet::new()), "no");
        assert_eq!(message.encode(), "TRADE:2:0:BLOCK#|nlchatstring=no");
        assert_eq!(TradeMessage::decode(&message.encode()).unwrap(), message);
    }

    #[test]
    fn test_short_acts() {
        for act in vec![
            TradeAct::Accept,
            TradeAct::Reject,
            TradeAct::BlockComply,
            TradeAct::NoResponse,
            TradeAct::Block(ResourceSet::single(Resource::Wood)),
        ] {
            let message = TradeMessage::new(3, vec![0, 1, 2], act, "");
            assert_eq!(TradeMessage::decode(&message.encode()).unwrap(), message);
        }
    }

    #[test]
    fn test_malformed() {
        assert!(TradeMessage::decode("TRADE:0:1:ACC").is_err());
        assert!(TradeMessage::decode("TRADE:x:1:ACC|nlchatstring=").is_err());
        assert!(TradeMessage::decode("TRD:0:1:ACC|nlchatstring=").is_err());
        assert!(TradeMessage::decode("TRADE:0:1:MAYBE|nlchatstring=").is_err());
    }

    #[test]
    fn test_counter_response() {
        let act = TradeAct::Offer {
            offer: offer(),
            forced: false,
            persuasion: Persuasion::Null,
        };
        assert!(matches!(act.into_response(), Some(Response::Counter { .. })));
        assert_eq!(TradeAct::BlockComply.into_response(), None);
    }
}
