use std::sync::Arc;
use tokio::sync::mpsc;

use catan_negotiator_component::{BoardOracle, BuildPlanner, GameSnapshot};
use catan_negotiators::factory::{create_agent, AgentConfig};
use catan_negotiators::{AgentAddr, AgentCallbacks, AgentEvent};
use catan_trade_model::PlayerId;

/// Player at the table played by a negotiator agent.
pub struct Seat {
    pub player: PlayerId,
    pub agent: Arc<AgentAddr>,
}

impl Seat {
    /// Starts the agent and forwards everything it emits to `outbox`.
    /// Must be called from within an actix system.
    pub fn new(
        config: AgentConfig,
        game: GameSnapshot,
        planner: Box<dyn BuildPlanner>,
        board: Box<dyn BoardOracle>,
        outbox: mpsc::UnboundedSender<(PlayerId, AgentEvent)>,
    ) -> anyhow::Result<Seat> {
        let player = config.player;
        let (agent, callbacks) = create_agent(config, game, planner, board)?;

        let AgentCallbacks { mut events } = callbacks;
        tokio::task::spawn_local(async move {
            while let Some(event) = events.recv().await {
                if outbox.send((player, event)).is_err() {
                    break;
                }
            }
        });

        Ok(Seat {
            player,
            agent: Arc::new(agent),
        })
    }
}
