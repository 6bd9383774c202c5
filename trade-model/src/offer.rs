use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::codec::{expect_field, parse_bool, parse_number, WireFormat};
use crate::error::Error;
use crate::resources::ResourceSet;

pub type PlayerId = usize;

/// Seats at the table. The `to` field of an offer is encoded as one flag per seat.
pub const MAX_PLAYERS: usize = 4;

const DISJ_GIVE: &str = "DISJ_GIVE:";
const DISJ_GET: &str = "DISJ_GET:";
const DISJ_BOTH: &str = "DISJ_BOTH:";

/// Proposal of `from` to exchange `give` for `get` with any player in `to`.
///
/// A disjunctive side means "any one of these resource kinds" instead of
/// "all of these". An empty side makes the offer partial: the recipient is
/// asked to complete it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub game: String,
    pub from: PlayerId,
    pub to: BTreeSet<PlayerId>,
    pub give: ResourceSet,
    pub get: ResourceSet,
    pub give_disjunctive: bool,
    pub get_disjunctive: bool,
}

impl Offer {
    pub fn new(
        game: &str,
        from: PlayerId,
        to: impl IntoIterator<Item = PlayerId>,
        give: ResourceSet,
        get: ResourceSet,
    ) -> Offer {
        Offer {
            game: game.to_string(),
            from,
            to: to.into_iter().collect(),
            give,
            get,
            give_disjunctive: false,
            get_disjunctive: false,
        }
    }

    pub fn with_disjunctive_give(mut self) -> Offer {
        self.give_disjunctive = true;
        self
    }

    pub fn with_disjunctive_get(mut self) -> Offer {
        self.get_disjunctive = true;
        self
    }

    pub fn is_partial(&self) -> bool {
        self.give.is_empty() || self.get.is_empty()
    }

    pub fn is_disjunctive(&self) -> bool {
        self.give_disjunctive || self.get_disjunctive
    }

    pub fn is_addressed_to(&self, player: PlayerId) -> bool {
        self.to.contains(&player)
    }

    pub fn give_disjuncts(&self) -> Vec<ResourceSet> {
        disjuncts(&self.give, self.give_disjunctive)
    }

    pub fn get_disjuncts(&self) -> Vec<ResourceSet> {
        disjuncts(&self.get, self.get_disjunctive)
    }

    /// Every conjunctive offer obtainable by picking one disjunct per side.
    pub fn concrete_variants(&self) -> Vec<Offer> {
        let mut variants = vec![];
        for give in self.give_disjuncts() {
            for get in self.get_disjuncts() {
                variants.push(Offer::new(
                    &self.game,
                    self.from,
                    self.to.iter().copied(),
                    give,
                    get,
                ));
            }
        }
        variants
    }

    /// Same offer, addressed only to `player`.
    pub fn restricted_to(&self, player: PlayerId) -> Offer {
        let mut offer = self.clone();
        offer.to = std::iter::once(player).collect();
        offer
    }

    pub fn restricted_to_set(&self, players: &BTreeSet<PlayerId>) -> Offer {
        let mut offer = self.clone();
        offer.to = players.clone();
        offer
    }

    /// The mirror offer made by `by` back to the author.
    pub fn inverted(&self, by: PlayerId) -> Offer {
        Offer {
            game: self.game.clone(),
            from: by,
            to: std::iter::once(self.from).collect(),
            give: self.get,
            get: self.give,
            give_disjunctive: self.get_disjunctive,
            get_disjunctive: self.give_disjunctive,
        }
    }

    /// Structural legality, independent of anybody's hand.
    pub fn validate_shape(&self) -> Result<(), String> {
        if self.game.contains('|') {
            return Err(format!("game name [{}] contains a field separator", self.game));
        }
        if self.from >= MAX_PLAYERS {
            return Err(format!("author {} is not a seat", self.from));
        }
        if self.to.is_empty() {
            return Err("offer has no recipients".to_string());
        }
        if self.to.contains(&self.from) {
            return Err(format!("player {} is among the recipients of own offer", self.from));
        }
        if let Some(pn) = self.to.iter().find(|pn| **pn >= MAX_PLAYERS) {
            return Err(format!("recipient {} is not a seat", pn));
        }
        if self.give.is_empty() && self.get.is_empty() {
            return Err("offer exchanges nothing".to_string());
        }
        if self.give.amount(crate::Resource::Unknown) > 0
            || self.get.amount(crate::Resource::Unknown) > 0
        {
            return Err("offer contains unknown resources".to_string());
        }
        if (self.give_disjunctive && self.give.is_empty())
            || (self.get_disjunctive && self.get.is_empty())
        {
            return Err("disjunctive side without alternatives".to_string());
        }
        Ok(())
    }
}

fn disjuncts(side: &ResourceSet, disjunctive: bool) -> Vec<ResourceSet> {
    if disjunctive {
        side.kinds()
            .map(|res| ResourceSet::new().with(res, side.amount(res)))
            .collect()
    } else {
        vec![*side]
    }
}

impl fmt::Display for Offer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joiner = |disjunctive: bool| if disjunctive { " or " } else { ", " };
        let side = |set: &ResourceSet, disjunctive: bool| {
            if set.is_empty() {
                "?".to_string()
            } else {
                set.entries()
                    .map(|(res, n)| format!("{} {}", n, res))
                    .collect::<Vec<_>>()
                    .join(joiner(disjunctive))
            }
        };
        write!(
            f,
            "player {} gives [{}] for [{}] to {:?}",
            self.from,
            side(&self.give, self.give_disjunctive),
            side(&self.get, self.get_disjunctive),
            self.to
        )
    }
}

impl WireFormat for Offer {
    fn encode(&self) -> String {
        let prefix = match (self.give_disjunctive, self.get_disjunctive) {
            (true, true) => DISJ_BOTH,
            (true, false) => DISJ_GIVE,
            (false, true) => DISJ_GET,
            (false, false) => "",
        };
        let to = (0..MAX_PLAYERS)
            .map(|pn| self.to.contains(&pn).to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}game={}|from={}|to={}|give={}|get={}",
            prefix,
            self.game,
            self.from,
            to,
            self.give.encode(),
            self.get.encode()
        )
    }

    fn decode(text: &str) -> Result<Self, Error> {
        let (body, give_disjunctive, get_disjunctive) = if let Some(body) = text.strip_prefix(DISJ_BOTH) {
            (body, true, true)
        } else if let Some(body) = text.strip_prefix(DISJ_GIVE) {
            (body, true, false)
        } else if let Some(body) = text.strip_prefix(DISJ_GET) {
            (body, false, true)
        } else {
            (text, false, false)
        };

        let mut fields = body.splitn(4, '|');
        let mut next = |key: &str| {
            fields
                .next()
                .ok_or_else(|| Error::malformed(text, format!("missing field '{}'", key)))
                .and_then(|field| expect_field(field, key))
        };
        let game = next("game")?.to_string();
        let from = parse_number(next("from")?, text)?;
        let to_flags = next("to")?;
        let sides = next("give")?;

        let to_flags = to_flags
            .split(',')
            .map(|flag| parse_bool(flag, text))
            .collect::<Result<Vec<_>, _>>()?;
        if to_flags.len() != MAX_PLAYERS {
            return Err(Error::malformed(
                text,
                format!("expected {} recipient flags", MAX_PLAYERS),
            ));
        }
        let to = to_flags
            .into_iter()
            .enumerate()
            .filter(|(_, flag)| *flag)
            .map(|(pn, _)| pn)
            .collect();

        let (give, get) = sides
            .split_once("|get=")
            .ok_or_else(|| Error::malformed(text, "missing field 'get'"))?;

        Ok(Offer {
            game,
            from,
            to,
            give: ResourceSet::decode(give)?,
            get: ResourceSet::decode(get)?,
            give_disjunctive,
            get_disjunctive,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resource;
    use test_case::test_case;

    fn clay_for_ore() -> Offer {
        Offer::new(
            "g1",
            0,
            vec![1, 2],
            ResourceSet::single(Resource::Clay),
            ResourceSet::single(Resource::Ore),
        )
    }

    #[test]
    fn test_encode_layout() {
        assert_eq!(
            clay_for_ore().encode(),
            "game=g1|from=0|to=false,true,true,false\
             |give=clay=1|ore=0|sheep=0|wheat=0|wood=0|unknown=0\
             |get=clay=0|ore=1|sheep=0|wheat=0|wood=0|unknown=0"
        );
    }

    #[test]
    fn test_disjunctive_prefix_survives() {
        let offer = Offer {
            get: ResourceSet::from_pairs(&[(Resource::Ore, 1), (Resource::Wheat, 1)]),
            ..clay_for_ore()
        }
        .with_disjunctive_get();

        let encoded = offer.encode();
        assert!(encoded.starts_with("DISJ_GET:game=g1"));
        assert_eq!(Offer::decode(&encoded).unwrap(), offer);
        assert_eq!(offer.get_disjuncts().len(), 2);
        assert_eq!(offer.concrete_variants().len(), 2);
    }

    #[test]
    fn test_decode_rejects_short_recipient_list() {
        let text = "game=g1|from=0|to=false,true\
                    |give=clay=1|ore=0|sheep=0|wheat=0|wood=0|unknown=0\
                    |get=clay=0|ore=1|sheep=0|wheat=0|wood=0|unknown=0";
        assert!(Offer::decode(text).is_err());
    }

    #[test]
    fn test_inverted() {
        let inverted = clay_for_ore().inverted(2);
        assert_eq!(inverted.from, 2);
        assert_eq!(inverted.to, std::iter::once(0).collect::<std::collections::BTreeSet<_>>());
        assert_eq!(inverted.give, ResourceSet::single(Resource::Ore));
        assert_eq!(inverted.get, ResourceSet::single(Resource::Clay));
    }

    #[test]
    fn test_validate_shape() {
        assert!(clay_for_ore().validate_shape().is_ok());

        let mut to_self = clay_for_ore();
        to_self.to.insert(0);
        assert!(to_self.validate_shape().is_err());

        let mut empty = clay_for_ore();
        empty.give = ResourceSet::new();
        empty.get = ResourceSet::new();
        assert!(empty.validate_shape().is_err());

        let mut partial = clay_for_ore();
        partial.get = ResourceSet::new();
        assert!(partial.validate_shape().is_ok());
        assert!(partial.is_partial());
    }

    #[test_case(Offer { from: 4, ..clay_for_ore() }; "author outside the table")]
    #[test_case(Offer { game: "g|1".to_string(), ..clay_for_ore() }; "separator in game name")]
    fn test_validate_shape_rejects(offer: Offer) {
        assert!(offer.validate_shape().is_err());
    }
}
