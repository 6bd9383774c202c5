//! Dispatch of chat lines heard at the table.
use catan_negotiator_component::{BuildPlan, NegotiationContext, Piece};
use catan_trade_model::{ChatMessage, EmbargoAction, PlayerId, Topic, WireFormat};

use crate::coordinator::{Coordinator, Event, World};

/// Build plan payload of players who plan nothing.
pub const NO_PLAN: &str = "NULL";

impl Coordinator {
    /// Decodes and handles a raw chat line. Lines we don't understand are dropped.
    pub fn hear_line(&mut self, sender: PlayerId, line: &str, world: &World) -> Vec<Event> {
        match ChatMessage::decode(line) {
            Ok(message) => self.hear(sender, message, world),
            Err(e) => {
                log::warn!("Dropping line from player {}. {}", sender, e);
                vec![]
            }
        }
    }

    pub fn hear(&mut self, sender: PlayerId, message: ChatMessage, world: &World) -> Vec<Event> {
        if sender == self.me {
            return vec![];
        }
        log::debug!("Player {} hears from player {}: {:?}", self.me, sender, message);

        self.with_context(world, |coordinator, ctx| match message {
            ChatMessage::Trade(trade) => {
                if trade.sender != sender {
                    log::warn!(
                        "Player {} speaks on behalf of player {}. Ignoring.",
                        sender,
                        trade.sender
                    );
                    return vec![];
                }
                coordinator.on_trade(trade, ctx)
            }
            ChatMessage::Deceptive(trade) => coordinator.on_deceptive(trade, ctx),
            ChatMessage::Request(topic) => coordinator.on_request(topic, ctx),
            ChatMessage::Announce { topic, payload } => {
                coordinator.on_announce(sender, topic, &payload);
                vec![]
            }
            ChatMessage::Embargo {
                proposer,
                action,
                target,
            } => coordinator.on_embargo(proposer, action, target, ctx),
            ChatMessage::Distrust(player) => {
                if player != coordinator.me {
                    coordinator.barriers.distrust(player);
                }
                vec![]
            }
        })
    }

    fn on_request(&mut self, topic: Topic, ctx: &NegotiationContext) -> Vec<Event> {
        let payload = match topic {
            Topic::BuildPlan if self.policy.sharing.build_plan => ctx
                .build_plan(ctx.my())
                .and_then(|plan| plan.first())
                .map(|piece| piece.to_string())
                .unwrap_or_else(|| NO_PLAN.to_string()),
            Topic::Resources if self.policy.sharing.resources => ctx.my().resources.encode(),
            _ => return vec![],
        };
        vec![Event::Say(ChatMessage::Announce { topic, payload })]
    }

    fn on_announce(&mut self, sender: PlayerId, topic: Topic, payload: &str) {
        match topic {
            Topic::BuildPlan if payload == NO_PLAN => {
                self.announced.remove(&sender);
            }
            Topic::BuildPlan => match payload.parse::<Piece>() {
                Ok(piece) => {
                    log::debug!("Player {} announced plan {}.", sender, piece);
                    self.announced.insert(sender, BuildPlan::single(piece));
                }
                Err(e) => log::warn!("Bad plan announced by player {}. {}", sender, e),
            },
            _ => log::debug!("Player {} announced {}: {}", sender, topic, payload),
        }
    }

    fn on_embargo(
        &mut self,
        proposer: PlayerId,
        action: EmbargoAction,
        target: PlayerId,
        ctx: &NegotiationContext,
    ) -> Vec<Event> {
        match action {
            EmbargoAction::Propose if proposer != self.me => self
                .barriers
                .embargo_proposed(self.me, target, ctx.game.turn)
                .map(Event::Say)
                .into_iter()
                .collect(),
            EmbargoAction::Lift => {
                self.barriers.embargo_lifted(target);
                vec![]
            }
            _ => vec![],
        }
    }
}
