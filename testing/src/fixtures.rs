use std::collections::HashMap;
use std::time::Duration;

use catan_negotiator_component::{
    BoardOracle, BuildPlan, BuildPlanner, GameSnapshot, NegotiationPolicy, Piece, PlayerSnapshot,
    Production, RoadPlacement, SettlementPlacement,
};
use catan_negotiators::factory::AgentConfig;
use catan_trade_model::{
    ChatMessage, Offer, Persuasion, PlayerId, Resource, ResourceSet, TradeAct, TradeMessage,
    WireFormat,
};

use crate::error::TableError;
use crate::table::Table;

/// Plans set by the test; a missing unit costs 2 turns if produced, 4 otherwise.
#[derive(Clone, Default)]
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

#[derive(Clone, Default)]
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

/// Game state shared by every agent of a test, built step by step.
#[derive(Clone)]
pub struct Scenario {
    pub game: GameSnapshot,
    pub planner: ScriptedPlanner,
    pub board: ScriptedBoard,
}

impl Scenario {
    pub fn new(players: usize) -> Scenario {
        Scenario {
            game: GameSnapshot::new("test", (0..players).map(PlayerSnapshot::new).collect()),
            planner: ScriptedPlanner::default(),
            board: ScriptedBoard::default(),
        }
    }

    pub fn hand(mut self, player: PlayerId, pairs: &[(Resource, u32)]) -> Self {
        self.game.players[player].resources = ResourceSet::from_pairs(pairs);
        self
    }

    pub fn plan(mut self, player: PlayerId, piece: Piece) -> Self {
        self.planner.plans.insert(player, BuildPlan::single(piece));
        self
    }

    pub fn victory_points(mut self, player: PlayerId, vp: u32) -> Self {
        self.game.players[player].victory_points = vp;
        self
    }

    pub fn produces(mut self, player: PlayerId, resources: &[Resource]) -> Self {
        self.game.players[player]
            .production
            .extend(resources.iter().map(|res| Production {
                resource: *res,
                robbed: false,
            }));
        self
    }

    pub fn turn_of(mut self, player: PlayerId) -> Self {
        self.game.turn_player = player;
        self
    }

    pub fn road_spot(mut self, player: PlayerId, placement: RoadPlacement) -> Self {
        self.board.roads.insert(player, placement);
        self
    }

    /// Table with an agent for each config. Players without config stay
    /// silent unless the test speaks for them.
    pub fn table(&self, configs: Vec<AgentConfig>) -> Result<Table, TableError> {
        let mut table = Table::new(self.game.clone());
        for config in configs {
            table = table.seat(
                config,
                Box::new(self.planner.clone()),
                Box::new(self.board.clone()),
            )?;
        }
        Ok(table)
    }
}

/// Response timeout of agents built by `agent_config`. Shorter than the
/// table's quiet period, so silent players time out within `run_until_quiet`.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(100);

/// Config with deterministic random choices and a short response timeout.
pub fn agent_config(player: PlayerId, policy: NegotiationPolicy) -> AgentConfig {
    AgentConfig {
        player,
        policy: NegotiationPolicy {
            seed: policy.seed.or(Some(player as u64)),
            response_timeout: RESPONSE_TIMEOUT,
            ..policy
        },
        gates: vec![],
    }
}

/// Trade chat line, as a scripted player would say it.
pub fn trade_line(
    sender: PlayerId,
    receivers: impl IntoIterator<Item = PlayerId>,
    act: TradeAct,
) -> String {
    ChatMessage::Trade(TradeMessage::new(sender, receivers, act, "")).encode()
}

pub fn offer_line(offer: Offer) -> String {
    let receivers = offer.to.clone();
    trade_line(
        offer.from,
        receivers,
        TradeAct::Offer {
            offer,
            forced: false,
            persuasion: Persuasion::Null,
        },
    )
}
