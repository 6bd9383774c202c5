use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use catan_trade_model::{PlayerId, ResourceSet};

use crate::error::NegotiationError;
use crate::oracle::{BoardOracle, BuildPlan, BuildPlanner};
use crate::player::PlayerSnapshot;

/// State of the game as seen by one agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub name: String,
    /// Player whose turn it is.
    pub turn_player: PlayerId,
    /// Number of turns played so far.
    pub turn: u32,
    /// Indexed by player id.
    pub players: Vec<PlayerSnapshot>,
}

impl GameSnapshot {
    pub fn new(name: &str, players: Vec<PlayerSnapshot>) -> GameSnapshot {
        GameSnapshot {
            name: name.to_string(),
            turn_player: 0,
            turn: 0,
            players,
        }
    }

    pub fn validate(&self) -> Result<(), NegotiationError> {
        match self.players.iter().enumerate().find(|(idx, p)| *idx != p.id) {
            Some((_, player)) => Err(NegotiationError::UnknownPlayer(player.id)),
            None => Ok(()),
        }
    }
}

/// Everything a negotiation decision may consult, passed explicitly.
pub struct NegotiationContext<'a> {
    pub me: PlayerId,
    pub game: &'a GameSnapshot,
    pub planner: &'a dyn BuildPlanner,
    pub board: &'a dyn BoardOracle,
    /// Build plans players announced in chat.
    pub announced: &'a HashMap<PlayerId, BuildPlan>,
}

impl<'a> NegotiationContext<'a> {
    pub fn new(
        me: PlayerId,
        game: &'a GameSnapshot,
        planner: &'a dyn BuildPlanner,
        board: &'a dyn BoardOracle,
        announced: &'a HashMap<PlayerId, BuildPlan>,
    ) -> Result<NegotiationContext<'a>, NegotiationError> {
        game.validate()?;
        if me >= game.players.len() {
            return Err(NegotiationError::UnknownPlayer(me));
        }
        Ok(NegotiationContext {
            me,
            game,
            planner,
            board,
            announced,
        })
    }

    pub fn my(&self) -> &'a PlayerSnapshot {
        &self.game.players[self.me]
    }

    pub fn player(&self, id: PlayerId) -> Option<&'a PlayerSnapshot> {
        self.game.players.get(id)
    }

    pub fn opponents(&self) -> impl Iterator<Item = &'a PlayerSnapshot> + 'a {
        let me = self.me;
        self.game.players.iter().filter(move |p| p.id != me)
    }

    pub fn is_my_turn(&self) -> bool {
        self.game.turn_player == self.me
    }

    /// Announced plan if the player told us, otherwise the planner's guess.
    pub fn build_plan(&self, player: &PlayerSnapshot) -> Option<BuildPlan> {
        if player.id != self.me {
            if let Some(plan) = self.announced.get(&player.id) {
                return Some(plan.clone());
            }
        }
        self.planner.build_plan(player)
    }

    pub fn eta(&self, player: &PlayerSnapshot, resources: &ResourceSet, target: &ResourceSet) -> u32 {
        self.planner.eta(player, resources, target)
    }

    /// Exact check for our own hand, optimistic for a partially observed one.
    pub fn can_pay(&self, player: &PlayerSnapshot, resources: &ResourceSet) -> bool {
        if player.id == self.me {
            player.resources.contains(resources)
        } else {
            player.resources.contains_optimistic(resources)
        }
    }

    pub fn leader_vp(&self) -> u32 {
        self.game
            .players
            .iter()
            .map(|p| p.victory_points)
            .max()
            .unwrap_or(0)
    }

    /// Whether nobody has more victory points than `player`.
    pub fn is_leader(&self, player: PlayerId) -> bool {
        self.player(player)
            .map(|p| p.victory_points >= self.leader_vp())
            .unwrap_or(false)
    }

    /// Highest score among everybody except `player`.
    pub fn highest_vp_except(&self, player: PlayerId) -> u32 {
        self.game
            .players
            .iter()
            .filter(|p| p.id != player)
            .map(|p| p.victory_points)
            .max()
            .unwrap_or(0)
    }
}
