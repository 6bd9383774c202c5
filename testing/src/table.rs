use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use catan_negotiator_component::{BoardOracle, BuildPlanner, GameSnapshot};
use catan_negotiators::factory::AgentConfig;
use catan_negotiators::{AgentAddr, AgentEvent};
use catan_trade_model::PlayerId;

use crate::error::TableError;
use crate::negotiation_record::NegotiationRecord;
use crate::seat::Seat;

/// Emulates the game server relaying chat between players.
///
/// Agents sit at seats; other players are spoken for by the test with `say`.
/// Every line is delivered to all seated agents except its author.
pub struct Table {
    pub game: GameSnapshot,
    pub record: NegotiationRecord,

    /// Table is considered quiet after this long without any agent event.
    pub quiet_period: Duration,
    pub test_timeout: Duration,

    seats: BTreeMap<PlayerId, Seat>,
    outbox: mpsc::UnboundedSender<(PlayerId, AgentEvent)>,
    inbox: mpsc::UnboundedReceiver<(PlayerId, AgentEvent)>,
}

fn agent_error(player: PlayerId) -> impl FnOnce(anyhow::Error) -> TableError {
    move |error| TableError::Agent { player, error }
}

impl Table {
    pub fn new(game: GameSnapshot) -> Table {
        let _ = env_logger::builder().is_test(true).try_init();
        let (outbox, inbox) = mpsc::unbounded_channel();

        Table {
            game,
            record: NegotiationRecord::default(),
            quiet_period: Duration::from_millis(300),
            test_timeout: Duration::from_secs(10),
            seats: BTreeMap::new(),
            outbox,
            inbox,
        }
    }

    pub fn test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Starts an agent playing for `config.player`.
    pub fn seat(
        mut self,
        config: AgentConfig,
        planner: Box<dyn BuildPlanner>,
        board: Box<dyn BoardOracle>,
    ) -> Result<Self, TableError> {
        let player = config.player;
        if self.seats.contains_key(&player) {
            return Err(TableError::SeatTaken(player));
        }

        let seat = Seat::new(config, self.game.clone(), planner, board, self.outbox.clone())
            .map_err(agent_error(player))?;
        self.seats.insert(player, seat);
        Ok(self)
    }

    pub fn agent(&self, player: PlayerId) -> Result<Arc<AgentAddr>, TableError> {
        self.seats
            .get(&player)
            .map(|seat| seat.agent.clone())
            .ok_or(TableError::NoAgent(player))
    }

    pub fn players(&self) -> Vec<PlayerId> {
        self.seats.keys().cloned().collect()
    }

    /// Sends the current game state to every agent.
    pub async fn update_game(&mut self) -> Result<(), TableError> {
        for (player, seat) in &self.seats {
            seat.agent
                .update_game(&self.game)
                .await
                .map_err(agent_error(*player))?;
        }
        Ok(())
    }

    /// Hands the turn to `player`, refreshes every agent's game and starts the turn.
    pub async fn start_turn(&mut self, player: PlayerId) -> Result<(), TableError> {
        self.game.turn += 1;
        self.game.turn_player = player;
        self.update_game().await?;

        for (player, seat) in &self.seats {
            seat.agent.start_turn().await.map_err(agent_error(*player))?;
        }
        Ok(())
    }

    pub async fn end_turn(&mut self) -> Result<(), TableError> {
        for (player, seat) in &self.seats {
            seat.agent.end_turn().await.map_err(agent_error(*player))?;
        }
        Ok(())
    }

    /// Asks the agent of `player` to make an offer.
    pub async fn negotiate(&mut self, player: PlayerId) -> Result<(), TableError> {
        self.agent(player)?
            .negotiate()
            .await
            .map_err(agent_error(player))
    }

    /// Line spoken by a player without agent.
    pub async fn say(&mut self, sender: PlayerId, line: &str) -> Result<(), TableError> {
        self.broadcast(sender, line.to_string()).await
    }

    /// Relays agent events until nobody speaks for `quiet_period`.
    pub async fn run_until_quiet(&mut self) -> Result<&NegotiationRecord, TableError> {
        let limit = self.test_timeout;
        match timeout(limit, self.relay()).await {
            Ok(result) => result?,
            Err(_) => {
                log::error!("Negotiation traceback:\n{}", self.record);
                return Err(TableError::Timeout(limit));
            }
        }
        Ok(&self.record)
    }

    async fn relay(&mut self) -> Result<(), TableError> {
        loop {
            let (player, event) = match timeout(self.quiet_period, self.inbox.recv()).await {
                Err(_) => return Ok(()),
                Ok(None) => return Err(TableError::ChannelClosed),
                Ok(Some(received)) => received,
            };

            match event {
                AgentEvent::Say(line) => self.broadcast(player, line).await?,
                AgentEvent::TradeAgreed(offer) => {
                    log::info!("Player {} executes trade {}.", player, offer);
                    self.record.trades.push((player, offer));
                }
                AgentEvent::NoTrade => self.record.no_trades.push(player),
            }
        }
    }

    async fn broadcast(&mut self, sender: PlayerId, line: String) -> Result<(), TableError> {
        log::debug!("[{}] {}", sender, line);

        for (player, seat) in &self.seats {
            if *player == sender {
                continue;
            }
            seat.agent
                .hear(sender, &line)
                .await
                .map_err(agent_error(*player))?;
        }
        self.record.lines.push((sender, line));
        Ok(())
    }
}
