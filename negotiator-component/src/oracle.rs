//! Collaborators the negotiation core consults but does not implement.
use serde::{Deserialize, Serialize};

use catan_trade_model::{ResourceSet, TradeAct};

use crate::player::{Piece, PlayerSnapshot, RoadPlacement, SettlementPlacement};

/// What a player intends to build next.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub pieces: Vec<Piece>,
}

impl BuildPlan {
    pub fn single(piece: Piece) -> BuildPlan {
        BuildPlan {
            pieces: vec![piece],
        }
    }

    pub fn first(&self) -> Option<Piece> {
        self.pieces.first().copied()
    }

    pub fn cost(&self) -> ResourceSet {
        self.pieces
            .iter()
            .fold(ResourceSet::new(), |mut cost, piece| {
                cost.add_set(&piece.cost());
                cost
            })
    }
}

/// Build planning and time-to-build estimation.
pub trait BuildPlanner {
    /// Our own plan for ourselves, a prediction for everybody else.
    fn build_plan(&self, player: &PlayerSnapshot) -> Option<BuildPlan>;

    /// Estimated turns until a player holding `resources` can pay for `target`.
    fn eta(&self, player: &PlayerSnapshot, resources: &ResourceSet, target: &ResourceSet) -> u32;
}

/// Board queries answered for the best placement available to a player.
pub trait BoardOracle {
    fn best_road(&self, player: &PlayerSnapshot) -> Option<RoadPlacement>;
    fn best_settlement(&self, player: &PlayerSnapshot) -> Option<SettlementPlacement>;
}

/// Natural-language rendering of trade acts.
pub trait Verbalizer {
    fn verbalize(&self, act: &TradeAct) -> String;
}

/// Minimal English rendering.
pub struct PlainVerbalizer;

impl Verbalizer for PlainVerbalizer {
    fn verbalize(&self, act: &TradeAct) -> String {
        match act {
            TradeAct::Offer { offer, .. } => {
                format!("I give {} for {}.", offer.give, offer.get)
            }
            TradeAct::Accept => "Deal.".to_string(),
            TradeAct::Reject => "No, thanks.".to_string(),
            TradeAct::Block(resources) if resources.is_empty() => {
                "Nobody trade with them!".to_string()
            }
            TradeAct::Block(resources) => format!("Nobody give them {}!", resources),
            TradeAct::BlockComply => "Fine, no trades then.".to_string(),
            TradeAct::NoResponse => String::new(),
        }
    }
}
