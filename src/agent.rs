use actix::prelude::*;
use anyhow::Result;
use derive_more::Display;
use std::time::Duration;
use tokio::sync::mpsc;

use catan_negotiator_component::{BoardOracle, BuildPlanner, GameSnapshot};
use catan_trade_model::{Offer, PlayerId, WireFormat};

use crate::coordinator::{Coordinator, Event, World};

/// What the agent wants the game to know.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum AgentEvent {
    /// Chat line to broadcast.
    #[display(fmt = "say: {}", _0)]
    Say(String),
    /// Our offer was agreed. The game should execute it.
    #[display(fmt = "trade agreed: {}", _0)]
    TradeAgreed(Offer),
    #[display(fmt = "no trade")]
    NoTrade,
}

pub struct AgentCallbacks {
    pub events: mpsc::UnboundedReceiver<AgentEvent>,
}

/// Chat line spoken by another player.
#[derive(Message)]
#[rtype(result = "Result<()>")]
pub struct Hear {
    pub sender: PlayerId,
    pub line: String,
}

/// Fresh view of the game. Replaces the previous one.
#[derive(Message)]
#[rtype(result = "Result<()>")]
pub struct UpdateGame {
    pub game: GameSnapshot,
}

#[derive(Message)]
#[rtype(result = "Result<()>")]
pub struct StartTurn;

/// Asks the agent to make an offer.
#[derive(Message)]
#[rtype(result = "Result<()>")]
pub struct Negotiate;

#[derive(Message)]
#[rtype(result = "Result<()>")]
pub struct EndTurn;

/// Actor owning one player's negotiation. Chat lines come in through
/// `AgentAddr`, everything the agent says or decides goes out on its
/// callbacks channel.
pub struct NegotiatorAgent {
    coordinator: Coordinator,
    game: GameSnapshot,
    planner: Box<dyn BuildPlanner>,
    board: Box<dyn BoardOracle>,
    events: mpsc::UnboundedSender<AgentEvent>,
    /// Episode of the offer we wait for and its timeout.
    timeout: Option<(u64, SpawnHandle)>,
}

impl NegotiatorAgent {
    pub fn new(
        coordinator: Coordinator,
        game: GameSnapshot,
        planner: Box<dyn BuildPlanner>,
        board: Box<dyn BoardOracle>,
    ) -> (NegotiatorAgent, AgentCallbacks) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let agent = NegotiatorAgent {
            coordinator,
            game,
            planner,
            board,
            events: sender,
            timeout: None,
        };
        (agent, AgentCallbacks { events: receiver })
    }

    fn player(&self) -> PlayerId {
        self.coordinator.me()
    }

    fn response_timeout(&self) -> Duration {
        self.coordinator.policy().response_timeout
    }

    fn dispatch(&mut self, events: Vec<Event>, ctx: &mut Context<Self>) {
        for event in events {
            let event = match event {
                Event::Say(message) => AgentEvent::Say(message.encode()),
                Event::TradeAgreed(offer) => AgentEvent::TradeAgreed(offer),
                Event::NoTrade => AgentEvent::NoTrade,
            };
            log::debug!("Player {} {}", self.player(), event);
            self.events
                .send(event)
                .map_err(|_| log::warn!("Nobody listens to player {}.", self.coordinator.me()))
                .ok();
        }
        self.schedule_timeout(ctx);
    }

    /// Keeps exactly one timeout running, for the offer currently outstanding.
    fn schedule_timeout(&mut self, ctx: &mut Context<Self>) {
        let pending = self.coordinator.pending_episode();
        if self.timeout.as_ref().map(|(episode, _)| *episode) == pending {
            return;
        }
        if let Some((_, handle)) = self.timeout.take() {
            ctx.cancel_future(handle);
        }
        if let Some(episode) = pending {
            let handle = ctx.run_later(self.response_timeout(), move |agent, ctx| {
                agent.timeout = None;
                let world = World::new(&agent.game, agent.planner.as_ref(), agent.board.as_ref());
                let events = agent.coordinator.timeout(episode, &world);
                agent.dispatch(events, ctx);
            });
            self.timeout = Some((episode, handle));
        }
    }
}

impl Actor for NegotiatorAgent {
    type Context = Context<Self>;
}

impl Handler<Hear> for NegotiatorAgent {
    type Result = Result<()>;

    fn handle(&mut self, msg: Hear, ctx: &mut Context<Self>) -> Self::Result {
        let world = World::new(&self.game, self.planner.as_ref(), self.board.as_ref());
        let events = self.coordinator.hear_line(msg.sender, &msg.line, &world);
        self.dispatch(events, ctx);
        Ok(())
    }
}

impl Handler<UpdateGame> for NegotiatorAgent {
    type Result = Result<()>;

    fn handle(&mut self, msg: UpdateGame, _: &mut Context<Self>) -> Self::Result {
        msg.game.validate()?;
        self.game = msg.game;
        Ok(())
    }
}

impl Handler<StartTurn> for NegotiatorAgent {
    type Result = Result<()>;

    fn handle(&mut self, _: StartTurn, ctx: &mut Context<Self>) -> Self::Result {
        log::debug!(
            "Player {} sees turn {} of player {} start.",
            self.player(),
            self.game.turn,
            self.game.turn_player
        );
        let world = World::new(&self.game, self.planner.as_ref(), self.board.as_ref());
        let events = self.coordinator.start_turn(&world);
        self.dispatch(events, ctx);
        Ok(())
    }
}

impl Handler<Negotiate> for NegotiatorAgent {
    type Result = Result<()>;

    fn handle(&mut self, _: Negotiate, ctx: &mut Context<Self>) -> Self::Result {
        let world = World::new(&self.game, self.planner.as_ref(), self.board.as_ref());
        let events = self.coordinator.negotiate(&world);
        self.dispatch(events, ctx);
        Ok(())
    }
}

impl Handler<EndTurn> for NegotiatorAgent {
    type Result = Result<()>;

    fn handle(&mut self, _: EndTurn, ctx: &mut Context<Self>) -> Self::Result {
        self.coordinator.end_turn();
        self.schedule_timeout(ctx);
        Ok(())
    }
}

#[derive(Clone)]
pub struct AgentAddr {
    pub player: PlayerId,
    pub on_hear: Recipient<Hear>,
    pub on_update: Recipient<UpdateGame>,
    pub on_start_turn: Recipient<StartTurn>,
    pub on_negotiate: Recipient<Negotiate>,
    pub on_end_turn: Recipient<EndTurn>,
}

impl AgentAddr {
    pub async fn hear(&self, sender: PlayerId, line: &str) -> Result<()> {
        self.on_hear
            .send(Hear {
                sender,
                line: line.to_string(),
            })
            .await?
    }

    pub async fn update_game(&self, game: &GameSnapshot) -> Result<()> {
        self.on_update.send(UpdateGame { game: game.clone() }).await?
    }

    pub async fn start_turn(&self) -> Result<()> {
        self.on_start_turn.send(StartTurn).await?
    }

    pub async fn negotiate(&self) -> Result<()> {
        self.on_negotiate.send(Negotiate).await?
    }

    pub async fn end_turn(&self) -> Result<()> {
        self.on_end_turn.send(EndTurn).await?
    }

    pub fn from(agent: NegotiatorAgent) -> AgentAddr {
        let player = agent.player();
        let addr = agent.start();
        AgentAddr {
            player,
            on_hear: addr.clone().recipient(),
            on_update: addr.clone().recipient(),
            on_start_turn: addr.clone().recipient(),
            on_negotiate: addr.clone().recipient(),
            on_end_turn: addr.recipient(),
        }
    }
}
