use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use catan_trade_model::{PlayerId, Resource, ResourceSet};

/// Things a player can spend resources on.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    #[display(fmt = "ROAD")]
    Road,
    #[display(fmt = "SETTLEMENT")]
    Settlement,
    #[display(fmt = "CITY")]
    City,
    #[display(fmt = "CARD")]
    DevCard,
}

impl Piece {
    pub const ALL: [Piece; 4] = [Piece::Road, Piece::Settlement, Piece::City, Piece::DevCard];

    pub fn cost(self) -> ResourceSet {
        match self {
            Piece::Road => ResourceSet::from_pairs(&[(Resource::Clay, 1), (Resource::Wood, 1)]),
            Piece::Settlement => ResourceSet::from_pairs(&[
                (Resource::Clay, 1),
                (Resource::Sheep, 1),
                (Resource::Wheat, 1),
                (Resource::Wood, 1),
            ]),
            Piece::City => ResourceSet::from_pairs(&[(Resource::Ore, 3), (Resource::Wheat, 2)]),
            Piece::DevCard => ResourceSet::from_pairs(&[
                (Resource::Ore, 1),
                (Resource::Sheep, 1),
                (Resource::Wheat, 1),
            ]),
        }
    }
}

impl FromStr for Piece {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Piece::ALL
            .iter()
            .copied()
            .find(|piece| piece.to_string() == s)
            .ok_or_else(|| format!("Unknown piece '{}'", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Port {
    /// 3:1 for any resource.
    Misc,
    /// 2:1 for one resource.
    Specific(Resource),
}

/// One producing hex adjacent to the player's buildings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub resource: Resource,
    #[serde(default)]
    pub robbed: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiecesLeft {
    pub roads: u32,
    pub settlements: u32,
    pub cities: u32,
}

/// Our belief about one player's state. Opponents' hands may contain `unknown` units.
///
/// Snapshots are cheap to clone. What-if questions are answered on disposable
/// copies produced by the `with_*` methods; the live state is never touched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub resources: ResourceSet,
    pub victory_points: u32,
    pub pieces_left: PiecesLeft,
    /// Legal spots for a new road.
    pub road_spots: u32,
    /// Legal spots for a new settlement.
    pub settlement_spots: u32,
    /// Settlements on the board, each can be upgraded to a city.
    pub settlements: u32,
    pub dev_cards_available: bool,
    pub longest_road_length: u32,
    pub has_longest_road: bool,
    pub knights: u32,
    pub has_largest_army: bool,
    pub ports: Vec<Port>,
    pub production: Vec<Production>,
}

impl PlayerSnapshot {
    pub fn new(id: PlayerId) -> PlayerSnapshot {
        PlayerSnapshot {
            id,
            resources: ResourceSet::new(),
            victory_points: 2,
            pieces_left: PiecesLeft {
                roads: 13,
                settlements: 3,
                cities: 4,
            },
            road_spots: 3,
            settlement_spots: 0,
            settlements: 2,
            dev_cards_available: true,
            longest_road_length: 1,
            has_longest_road: false,
            knights: 0,
            has_largest_army: false,
            ports: vec![],
            production: vec![],
        }
    }

    pub fn can_afford(&self, piece: Piece) -> bool {
        self.resources.contains(&piece.cost())
    }

    /// Whether the board and the remaining pieces allow building `piece`.
    pub fn can_place(&self, piece: Piece) -> bool {
        match piece {
            Piece::Road => self.pieces_left.roads > 0 && self.road_spots > 0,
            Piece::Settlement => self.pieces_left.settlements > 0 && self.settlement_spots > 0,
            Piece::City => self.pieces_left.cities > 0 && self.settlements > 0,
            Piece::DevCard => self.dev_cards_available,
        }
    }

    pub fn can_build(&self, piece: Piece) -> bool {
        self.can_place(piece) && self.can_afford(piece)
    }

    pub fn can_build_anything(&self) -> bool {
        Piece::ALL.iter().any(|piece| self.can_build(*piece))
    }

    /// Units of `resource` given to the bank for one unit of anything else.
    pub fn trade_ratio(&self, resource: Resource) -> u32 {
        if self.ports.contains(&Port::Specific(resource)) {
            2
        } else if self.ports.contains(&Port::Misc) {
            3
        } else {
            4
        }
    }

    /// Whether some concrete resource can be traded with the bank or a port right now.
    pub fn can_trade_with_bank(&self) -> bool {
        Resource::CONCRETE
            .iter()
            .any(|res| self.resources.amount(*res) >= self.trade_ratio(*res))
    }

    pub fn produces(&self, resource: Resource, discount_robber: bool) -> bool {
        self.production
            .iter()
            .any(|hex| hex.resource == resource && !(discount_robber && hex.robbed))
    }

    pub fn with_resources(&self, resources: ResourceSet) -> PlayerSnapshot {
        let mut copy = self.clone();
        copy.resources = resources;
        copy
    }

    pub fn with_road(&self, placement: &RoadPlacement) -> PlayerSnapshot {
        let mut copy = self.clone();
        copy.pieces_left.roads = copy.pieces_left.roads.saturating_sub(1);
        copy.longest_road_length = copy.longest_road_length.max(placement.road_length);
        copy.settlement_spots = placement.settlement_spots;
        copy
    }

    pub fn with_settlement(&self, placement: &SettlementPlacement) -> PlayerSnapshot {
        let mut copy = self.clone();
        copy.pieces_left.settlements = copy.pieces_left.settlements.saturating_sub(1);
        copy.settlements += 1;
        copy.victory_points += 1;
        copy.production.extend(placement.production.iter().map(|res| Production {
            resource: *res,
            robbed: false,
        }));
        copy
    }

    pub fn with_city(&self) -> PlayerSnapshot {
        let mut copy = self.clone();
        copy.pieces_left.cities = copy.pieces_left.cities.saturating_sub(1);
        copy.pieces_left.settlements += 1;
        copy.settlements = copy.settlements.saturating_sub(1);
        copy.victory_points += 1;
        copy
    }

    pub fn with_knight(&self) -> PlayerSnapshot {
        let mut copy = self.clone();
        copy.knights += 1;
        copy
    }
}

/// Best road the board offers a player, and its consequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadPlacement {
    /// Player's longest road length after placing it.
    pub road_length: u32,
    /// Legal settlement spots after placing it.
    pub settlement_spots: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlacement {
    pub production: Vec<Resource>,
}
