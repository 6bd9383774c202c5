use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::codec::{parse_bool, WireFormat};
use crate::error::Error;
use crate::resources::Resource;

/// Value of an unset parameter on the wire.
pub const PARAM_DEFAULT: &str = "DEFAULT";

/// How a persuaded player's standing in a bonus changes.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusChange {
    #[display(fmt = "keep")]
    Keep,
    #[display(fmt = "get")]
    Get,
    #[display(fmt = "equal")]
    Equal,
}

impl FromStr for BonusChange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(BonusChange::Keep),
            "get" => Ok(BonusChange::Get),
            "equal" => Ok(BonusChange::Equal),
            _ => Err(s.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    #[display(fmt = "bank")]
    Bank,
    #[display(fmt = "port")]
    Port,
}

impl FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank" => Ok(TradeType::Bank),
            "port" => Ok(TradeType::Port),
            _ => Err(s.to_string()),
        }
    }
}

/// Argument kinds, grouped the way they are configured and preferred.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArgumentKind {
    #[display(fmt = "road")]
    BuildRoad,
    #[display(fmt = "settlement")]
    BuildSettlement,
    #[display(fmt = "city")]
    BuildCity,
    #[display(fmt = "devcard")]
    BuildDevCard,
    #[display(fmt = "itp")]
    ImmediateTrade,
    #[display(fmt = "rbtmr")]
    TooManyResources,
    #[display(fmt = "rbcgr")]
    CantGetResource,
    #[display(fmt = "atpr")]
    PromiseResource,
    #[display(fmt = "atrp")]
    RobPromise,
}

impl ArgumentKind {
    pub const ALL: [ArgumentKind; 9] = [
        ArgumentKind::BuildRoad,
        ArgumentKind::BuildSettlement,
        ArgumentKind::BuildCity,
        ArgumentKind::BuildDevCard,
        ArgumentKind::ImmediateTrade,
        ArgumentKind::TooManyResources,
        ArgumentKind::CantGetResource,
        ArgumentKind::PromiseResource,
        ArgumentKind::RobPromise,
    ];

    pub fn is_immediate_build(self) -> bool {
        matches!(
            self,
            ArgumentKind::BuildRoad
                | ArgumentKind::BuildSettlement
                | ArgumentKind::BuildCity
                | ArgumentKind::BuildDevCard
        )
    }

    /// Resolves a preference token. Group tokens expand to several kinds.
    pub fn from_token(token: &str) -> Option<Vec<ArgumentKind>> {
        let kinds = match token {
            "ibp" => vec![
                ArgumentKind::BuildRoad,
                ArgumentKind::BuildSettlement,
                ArgumentKind::BuildCity,
                ArgumentKind::BuildDevCard,
            ],
            "rb" => vec![ArgumentKind::TooManyResources, ArgumentKind::CantGetResource],
            "at" => vec![ArgumentKind::PromiseResource, ArgumentKind::RobPromise],
            single => vec![*ArgumentKind::ALL
                .iter()
                .find(|kind| kind.to_string() == single)?],
        };
        Some(kinds)
    }
}

/// Argument attached to an offer to make it more attractive to its recipients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Persuasion {
    Null,
    /// The trade lets the recipient build a road right away.
    ImmediateBuildRoad {
        longest_road: bool,
        new_settlement: bool,
        road_change: Option<BonusChange>,
    },
    ImmediateBuildSettlement {
        access_new_resource: bool,
        victory_points: bool,
        vp_change: Option<BonusChange>,
        resource: Option<Resource>,
    },
    ImmediateBuildCity {
        victory_points: bool,
        vp_change: Option<BonusChange>,
    },
    ImmediateBuildDevCard {
        largest_army: bool,
        army_change: Option<BonusChange>,
    },
    /// The trade lets the recipient trade `resource` with the bank or a port.
    ImmediateTrade {
        trade_type: TradeType,
        resource: Resource,
    },
    /// The trade brings the recipient's hand to a safe size against the robber.
    TooManyResources,
    /// Nobody among the recipients produces `resource`.
    CantGetResource { resource: Resource },
    PromiseResource { resource: Resource },
    RobPromise,
}

impl Default for Persuasion {
    fn default() -> Self {
        Persuasion::Null
    }
}

const LONGEST_ROAD: &str = "longestRoad";
const NEW_SETTLEMENT: &str = "newSettlement";
const ACCESS_NEW_RES: &str = "accessNewRes";
const VICTORY_POINTS: &str = "VPs";
const LARGEST_ARMY: &str = "largestArmy";

const LR_TYPE: &str = "LRType";
const VP_TYPE: &str = "VPType";
const LA_TYPE: &str = "LAType";
const TRADE_TYPE: &str = "TType";
const RESOURCE: &str = "res";

impl Persuasion {
    pub fn is_null(&self) -> bool {
        matches!(self, Persuasion::Null)
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            Persuasion::Null => "NullPersuasion",
            Persuasion::ImmediateBuildRoad { .. } => "IBPRoad",
            Persuasion::ImmediateBuildSettlement { .. } => "IBPSettlement",
            Persuasion::ImmediateBuildCity { .. } => "IBPCity",
            Persuasion::ImmediateBuildDevCard { .. } => "IBPDevCard",
            Persuasion::ImmediateTrade { .. } => "ITP",
            Persuasion::TooManyResources => "RBTooManyRes",
            Persuasion::CantGetResource { .. } => "RBCantGetRes",
            Persuasion::PromiseResource { .. } => "ATPromiseResource",
            Persuasion::RobPromise => "ATRobPromise",
        }
    }

    pub fn kind(&self) -> Option<ArgumentKind> {
        let kind = match self {
            Persuasion::Null => return None,
            Persuasion::ImmediateBuildRoad { .. } => ArgumentKind::BuildRoad,
            Persuasion::ImmediateBuildSettlement { .. } => ArgumentKind::BuildSettlement,
            Persuasion::ImmediateBuildCity { .. } => ArgumentKind::BuildCity,
            Persuasion::ImmediateBuildDevCard { .. } => ArgumentKind::BuildDevCard,
            Persuasion::ImmediateTrade { .. } => ArgumentKind::ImmediateTrade,
            Persuasion::TooManyResources => ArgumentKind::TooManyResources,
            Persuasion::CantGetResource { .. } => ArgumentKind::CantGetResource,
            Persuasion::PromiseResource { .. } => ArgumentKind::PromiseResource,
            Persuasion::RobPromise => ArgumentKind::RobPromise,
        };
        Some(kind)
    }

    /// A constraint set to `true` needs its parameter assigned.
    pub fn validate(&self) -> Result<(), Error> {
        let missing = |param: &str| Error::IncompletePersuasion {
            identifier: self.identifier().to_string(),
            param: param.to_string(),
        };
        match self {
            Persuasion::ImmediateBuildRoad {
                longest_road: true,
                road_change: None,
                ..
            } => Err(missing(LR_TYPE)),
            Persuasion::ImmediateBuildSettlement {
                victory_points: true,
                vp_change: None,
                ..
            } => Err(missing(VP_TYPE)),
            Persuasion::ImmediateBuildSettlement {
                access_new_resource: true,
                resource: None,
                ..
            } => Err(missing(RESOURCE)),
            Persuasion::ImmediateBuildCity {
                victory_points: true,
                vp_change: None,
            } => Err(missing(VP_TYPE)),
            Persuasion::ImmediateBuildDevCard {
                largest_army: true,
                army_change: None,
            } => Err(missing(LA_TYPE)),
            _ => Ok(()),
        }
    }

    fn constraints(&self) -> Vec<(&'static str, bool)> {
        match self {
            Persuasion::ImmediateBuildRoad {
                longest_road,
                new_settlement,
                ..
            } => vec![(LONGEST_ROAD, *longest_road), (NEW_SETTLEMENT, *new_settlement)],
            Persuasion::ImmediateBuildSettlement {
                access_new_resource,
                victory_points,
                ..
            } => vec![
                (ACCESS_NEW_RES, *access_new_resource),
                (VICTORY_POINTS, *victory_points),
            ],
            Persuasion::ImmediateBuildCity { victory_points, .. } => {
                vec![(VICTORY_POINTS, *victory_points)]
            }
            Persuasion::ImmediateBuildDevCard { largest_army, .. } => {
                vec![(LARGEST_ARMY, *largest_army)]
            }
            _ => vec![],
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![];
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                params.push((key, value));
            }
        };
        match self {
            Persuasion::ImmediateBuildRoad { road_change, .. } => {
                push(LR_TYPE, road_change.map(|c| c.to_string()))
            }
            Persuasion::ImmediateBuildSettlement {
                vp_change,
                resource,
                ..
            } => {
                push(VP_TYPE, vp_change.map(|c| c.to_string()));
                push(RESOURCE, resource.map(|r| r.to_string()));
            }
            Persuasion::ImmediateBuildCity { vp_change, .. } => {
                push(VP_TYPE, vp_change.map(|c| c.to_string()))
            }
            Persuasion::ImmediateBuildDevCard { army_change, .. } => {
                push(LA_TYPE, army_change.map(|c| c.to_string()))
            }
            Persuasion::ImmediateTrade {
                trade_type,
                resource,
            } => {
                push(TRADE_TYPE, Some(trade_type.to_string()));
                push(RESOURCE, Some(resource.to_string()));
            }
            Persuasion::CantGetResource { resource } | Persuasion::PromiseResource { resource } => {
                push(RESOURCE, Some(resource.to_string()))
            }
            _ => (),
        }
        params
    }
}

/// Decoded `constraints=` and `params=` sections of a persuasion.
struct Fields<'a> {
    text: &'a str,
    identifier: &'a str,
    constraints: BTreeMap<&'a str, &'a str>,
    params: BTreeMap<&'a str, &'a str>,
}

impl<'a> Fields<'a> {
    fn parse(text: &'a str) -> Result<Fields<'a>, Error> {
        let mut parts = text.split('|');
        let identifier = parts.next().unwrap_or("");
        let mut fields = Fields {
            text,
            identifier,
            constraints: BTreeMap::new(),
            params: BTreeMap::new(),
        };

        for part in parts {
            let (target, list) = if let Some(list) = part.strip_prefix("constraints=") {
                (&mut fields.constraints, list)
            } else if let Some(list) = part.strip_prefix("params=") {
                (&mut fields.params, list)
            } else {
                return Err(Error::malformed(
                    text,
                    format!("expected 'constraints' or 'params', got '{}'", part),
                ));
            };
            for entry in list.split(',').filter(|entry| !entry.is_empty()) {
                let (key, value) = entry
                    .split_once('=')
                    .ok_or_else(|| Error::malformed(text, format!("bad entry '{}'", entry)))?;
                target.insert(key, value);
            }
        }
        Ok(fields)
    }

    fn constraint(&self, key: &str) -> Result<bool, Error> {
        match self.constraints.get(key) {
            Some(value) => parse_bool(value, self.text),
            None => Ok(false),
        }
    }

    fn param<T: FromStr>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.params.get(key) {
            None => Ok(None),
            Some(value) if *value == PARAM_DEFAULT => Ok(None),
            Some(value) => value.parse::<T>().map(Some).map_err(|_| {
                Error::malformed(self.text, format!("bad value '{}' of '{}'", value, key))
            }),
        }
    }

    fn required<T: FromStr>(&self, key: &str) -> Result<T, Error> {
        self.param(key)?.ok_or_else(|| Error::IncompletePersuasion {
            identifier: self.identifier.to_string(),
            param: key.to_string(),
        })
    }
}

impl WireFormat for Persuasion {
    fn encode(&self) -> String {
        let join = |entries: Vec<String>| entries.join(",");
        format!(
            "{}|constraints={}|params={}",
            self.identifier(),
            join(
                self.constraints()
                    .into_iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect()
            ),
            join(
                self.params()
                    .into_iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect()
            ),
        )
    }

    fn decode(text: &str) -> Result<Self, Error> {
        let fields = Fields::parse(text)?;
        let persuasion = match fields.identifier {
            "" | "NullPersuasion" => Persuasion::Null,
            "IBPRoad" => Persuasion::ImmediateBuildRoad {
                longest_road: fields.constraint(LONGEST_ROAD)?,
                new_settlement: fields.constraint(NEW_SETTLEMENT)?,
                road_change: fields.param(LR_TYPE)?,
            },
            "IBPSettlement" => Persuasion::ImmediateBuildSettlement {
                access_new_resource: fields.constraint(ACCESS_NEW_RES)?,
                victory_points: fields.constraint(VICTORY_POINTS)?,
                vp_change: fields.param(VP_TYPE)?,
                resource: fields.param(RESOURCE)?,
            },
            "IBPCity" => Persuasion::ImmediateBuildCity {
                victory_points: fields.constraint(VICTORY_POINTS)?,
                vp_change: fields.param(VP_TYPE)?,
            },
            "IBPDevCard" => Persuasion::ImmediateBuildDevCard {
                largest_army: fields.constraint(LARGEST_ARMY)?,
                army_change: fields.param(LA_TYPE)?,
            },
            "ITP" => Persuasion::ImmediateTrade {
                trade_type: fields.required(TRADE_TYPE)?,
                resource: fields.required(RESOURCE)?,
            },
            "RBTooManyRes" => Persuasion::TooManyResources,
            "RBCantGetRes" => Persuasion::CantGetResource {
                resource: fields.required(RESOURCE)?,
            },
            "ATPromiseResource" => Persuasion::PromiseResource {
                resource: fields.required(RESOURCE)?,
            },
            "ATRobPromise" => Persuasion::RobPromise,
            other => return Err(Error::UnknownPersuasion(other.to_string())),
        };
        persuasion.validate()?;
        Ok(persuasion)
    }
}
