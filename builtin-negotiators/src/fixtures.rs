use std::collections::HashMap;

use catan_negotiator_component::{
    BoardOracle, BuildPlan, BuildPlanner, GameSnapshot, NegotiationContext, Piece,
    PlayerSnapshot, Production, RoadPlacement, SettlementPlacement,
};
use catan_trade_model::{PlayerId, Resource, ResourceSet};

/// Plans set by the test; a missing unit costs 2 turns if produced, 4 otherwise.
#[derive(Default)]
pub struct ScriptedPlanner {
    pub plans: HashMap<PlayerId, BuildPlan>,
}

impl BuildPlanner for ScriptedPlanner {
    fn build_plan(&self, player: &PlayerSnapshot) -> Option<BuildPlan> {
        self.plans.get(&player.id).cloned()
    }

    fn eta(&self, player: &PlayerSnapshot, resources: &ResourceSet, target: &ResourceSet) -> u32 {
        resources
            .missing(target)
            .entries()
            .map(|(res, n)| n * if player.produces(res, false) { 2 } else { 4 })
            .sum()
    }
}

#[derive(Default)]
pub struct ScriptedBoard {
    pub roads: HashMap<PlayerId, RoadPlacement>,
    pub settlements: HashMap<PlayerId, SettlementPlacement>,
}

impl BoardOracle for ScriptedBoard {
    fn best_road(&self, player: &PlayerSnapshot) -> Option<RoadPlacement> {
        self.roads.get(&player.id).copied()
    }

    fn best_settlement(&self, player: &PlayerSnapshot) -> Option<SettlementPlacement> {
        self.settlements.get(&player.id).cloned()
    }
}

pub struct Fixture {
    pub game: GameSnapshot,
    pub planner: ScriptedPlanner,
    pub board: ScriptedBoard,
    pub announced: HashMap<PlayerId, BuildPlan>,
}

impl Fixture {
    pub fn new(players: usize) -> Fixture {
        Fixture {
            game: GameSnapshot::new("test", (0..players).map(PlayerSnapshot::new).collect()),
            planner: ScriptedPlanner::default(),
            board: ScriptedBoard::default(),
            announced: HashMap::new(),
        }
    }

    pub fn context(&self, me: PlayerId) -> NegotiationContext<'_> {
        NegotiationContext::new(me, &self.game, &self.planner, &self.board, &self.announced)
            .unwrap()
    }

    pub fn hand(&mut self, player: PlayerId, pairs: &[(Resource, u32)]) -> &mut Self {
        self.game.players[player].resources = ResourceSet::from_pairs(pairs);
        self
    }

    pub fn plan(&mut self, player: PlayerId, piece: Piece) -> &mut Self {
        self.planner.plans.insert(player, BuildPlan::single(piece));
        self
    }

    pub fn produces(&mut self, player: PlayerId, resources: &[Resource]) -> &mut Self {
        self.game.players[player]
            .production
            .extend(resources.iter().map(|res| Production {
                resource: *res,
                robbed: false,
            }));
        self
    }
}
