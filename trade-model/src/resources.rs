use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::codec::{expect_field, parse_number, WireFormat};
use crate::error::Error;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    #[display(fmt = "clay")]
    Clay,
    #[display(fmt = "ore")]
    Ore,
    #[display(fmt = "sheep")]
    Sheep,
    #[display(fmt = "wheat")]
    Wheat,
    #[display(fmt = "wood")]
    Wood,
    /// Units of an opponent's hand we could not observe.
    #[display(fmt = "unknown")]
    Unknown,
}

impl Resource {
    /// Resources that can be produced and traded, in wire order.
    pub const CONCRETE: [Resource; 5] = [
        Resource::Clay,
        Resource::Ore,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Wood,
    ];

    pub const ALL: [Resource; 6] = [
        Resource::Clay,
        Resource::Ore,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Wood,
        Resource::Unknown,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.to_string() == s)
            .ok_or_else(|| Error::UnknownResource(s.to_string()))
    }
}

/// Multiset over the five resource types plus `unknown`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceSet {
    counts: [u32; 6],
}

impl ResourceSet {
    pub fn new() -> ResourceSet {
        ResourceSet::default()
    }

    pub fn from_pairs(pairs: &[(Resource, u32)]) -> ResourceSet {
        pairs
            .iter()
            .fold(ResourceSet::new(), |set, (res, n)| set.with(*res, *n))
    }

    pub fn single(resource: Resource) -> ResourceSet {
        ResourceSet::new().with(resource, 1)
    }

    pub fn with(mut self, resource: Resource, amount: u32) -> ResourceSet {
        self.add(resource, amount);
        self
    }

    pub fn amount(&self, resource: Resource) -> u32 {
        self.counts[resource.index()]
    }

    pub fn set_amount(&mut self, resource: Resource, amount: u32) {
        self.counts[resource.index()] = amount;
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        self.counts[resource.index()] += amount;
    }

    /// Saturating. Callers check `contains` first when the difference matters.
    pub fn subtract(&mut self, resource: Resource, amount: u32) {
        let count = &mut self.counts[resource.index()];
        *count = count.saturating_sub(amount);
    }

    pub fn add_set(&mut self, other: &ResourceSet) {
        for res in Resource::ALL.iter() {
            self.add(*res, other.amount(*res));
        }
    }

    pub fn subtract_set(&mut self, other: &ResourceSet) {
        for res in Resource::ALL.iter() {
            self.subtract(*res, other.amount(*res));
        }
    }

    /// Subtracts `other` from a partially observed hand. A deficit of a concrete
    /// type is taken from the `unknown` units.
    pub fn subtract_hidden(&mut self, other: &ResourceSet) {
        for res in Resource::ALL.iter() {
            let have = self.amount(*res);
            let need = other.amount(*res);
            if have >= need {
                self.subtract(*res, need);
            } else {
                self.set_amount(*res, 0);
                self.subtract(Resource::Unknown, need - have);
            }
        }
    }

    pub fn contains(&self, other: &ResourceSet) -> bool {
        Resource::ALL
            .iter()
            .all(|res| self.amount(*res) >= other.amount(*res))
    }

    /// True when `other` could be paid assuming every unknown unit is whatever is missing.
    pub fn contains_optimistic(&self, other: &ResourceSet) -> bool {
        let deficit: u32 = Resource::CONCRETE
            .iter()
            .map(|res| other.amount(*res).saturating_sub(self.amount(*res)))
            .sum();
        deficit + other.amount(Resource::Unknown) <= self.amount(Resource::Unknown)
    }

    /// Concrete resources of `cost` that this set lacks.
    pub fn missing(&self, cost: &ResourceSet) -> ResourceSet {
        let mut missing = ResourceSet::new();
        for res in Resource::CONCRETE.iter() {
            missing.set_amount(*res, cost.amount(*res).saturating_sub(self.amount(*res)));
        }
        missing
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn known_total(&self) -> u32 {
        self.total() - self.amount(Resource::Unknown)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Concrete resource types present in the set.
    pub fn kinds(&self) -> impl Iterator<Item = Resource> + '_ {
        Resource::CONCRETE
            .iter()
            .copied()
            .filter(move |res| self.amount(*res) > 0)
    }

    /// Non-zero entries, `unknown` included.
    pub fn entries(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL
            .iter()
            .map(move |res| (*res, self.amount(*res)))
            .filter(|(_, n)| *n > 0)
    }
}

impl fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "nothing");
        }
        let parts = self
            .entries()
            .map(|(res, n)| format!("{} {}", n, res))
            .collect::<Vec<_>>();
        write!(f, "{}", parts.join(", "))
    }
}

impl WireFormat for ResourceSet {
    fn encode(&self) -> String {
        Resource::ALL
            .iter()
            .map(|res| format!("{}={}", res, self.amount(*res)))
            .collect::<Vec<_>>()
            .join("|")
    }

    fn decode(text: &str) -> Result<Self, Error> {
        let fields = text.split('|').collect::<Vec<_>>();
        if fields.len() != Resource::ALL.len() {
            return Err(Error::malformed(
                text,
                format!("expected {} resource fields", Resource::ALL.len()),
            ));
        }

        let mut set = ResourceSet::new();
        for (res, field) in Resource::ALL.iter().zip(fields) {
            let value = expect_field(field, &res.to_string())?;
            set.set_amount(*res, parse_number(value, text)?);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_wire_order() {
        let set = ResourceSet::from_pairs(&[(Resource::Wood, 2), (Resource::Clay, 1)]);
        assert_eq!(
            set.encode(),
            "clay=1|ore=0|sheep=0|wheat=0|wood=2|unknown=0"
        );
        assert_eq!(ResourceSet::decode(&set.encode()).unwrap(), set);
    }

    #[test_case("clay=1|ore=0|sheep=0|wheat=0|wood=2"; "missing unknown")]
    #[test_case("clay=1|ore=0|sheep=0|wheat=0|wood=x|unknown=0"; "not a number")]
    #[test_case("ore=1|clay=0|sheep=0|wheat=0|wood=0|unknown=0"; "wrong order")]
    fn test_decode_malformed(text: &str) {
        assert!(ResourceSet::decode(text).is_err());
    }

    #[test]
    fn test_subtract_hidden_takes_deficit_from_unknown() {
        let mut hand = ResourceSet::from_pairs(&[(Resource::Clay, 1), (Resource::Unknown, 3)]);
        hand.subtract_hidden(&ResourceSet::from_pairs(&[
            (Resource::Clay, 2),
            (Resource::Ore, 1),
        ]));
        assert_eq!(hand, ResourceSet::from_pairs(&[(Resource::Unknown, 1)]));
    }

    #[test_case(&[(Resource::Unknown, 2)], &[(Resource::Ore, 2)], true; "unknown covers")]
    #[test_case(&[(Resource::Unknown, 1)], &[(Resource::Ore, 2)], false; "not enough unknown")]
    #[test_case(&[(Resource::Ore, 1), (Resource::Unknown, 1)], &[(Resource::Ore, 2)], true; "mixed")]
    fn test_contains_optimistic(hand: &[(Resource, u32)], cost: &[(Resource, u32)], expected: bool) {
        let hand = ResourceSet::from_pairs(hand);
        let cost = ResourceSet::from_pairs(cost);
        assert_eq!(hand.contains_optimistic(&cost), expected);
        assert!(!hand.contains(&cost));
    }

    #[test]
    fn test_display() {
        assert_eq!(ResourceSet::new().to_string(), "nothing");
        assert_eq!(
            ResourceSet::from_pairs(&[(Resource::Ore, 3), (Resource::Wheat, 2)]).to_string(),
            "3 ore, 2 wheat"
        );
    }
}
