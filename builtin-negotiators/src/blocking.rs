use std::collections::{BTreeMap, BTreeSet};

use catan_negotiator_component::{BlockingPolicy, NegotiationContext, PlayerSnapshot};
use catan_trade_model::{ChatMessage, EmbargoAction, Offer, PlayerId, ResourceSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Embargo {
    since_turn: u32,
    proposed_by_me: bool,
}

/// Barriers between us and other players: blocks we honour, embargoes
/// we joined or proposed, and players we stopped trusting.
pub struct BlockingManager {
    policy: BlockingPolicy,
    /// Blocks we complied with and the turn we did.
    complied_blocks: Vec<(ResourceSet, u32)>,
    embargoes: BTreeMap<PlayerId, Embargo>,
    distrusted: BTreeSet<PlayerId>,
    blocks_sent: u32,
    embargoes_proposed: u32,
}

impl BlockingManager {
    pub fn new(policy: BlockingPolicy) -> BlockingManager {
        BlockingManager {
            policy,
            complied_blocks: vec![],
            embargoes: BTreeMap::new(),
            distrusted: BTreeSet::new(),
            blocks_sent: 0,
            embargoes_proposed: 0,
        }
    }

    /// Whether we refuse any trade with `player`.
    pub fn is_barred(&self, player: PlayerId) -> bool {
        self.distrusted.contains(&player) || self.embargoes.contains_key(&player)
    }

    pub fn is_embargoed(&self, player: PlayerId) -> bool {
        self.embargoes.contains_key(&player)
    }

    pub fn is_distrusted(&self, player: PlayerId) -> bool {
        self.distrusted.contains(&player)
    }

    /// Resources we promised not to ask for.
    pub fn blocked_resources(&self) -> ResourceSet {
        let mut blocked = ResourceSet::new();
        for (resources, _) in &self.complied_blocks {
            blocked.add_set(resources);
        }
        blocked
    }

    pub fn comply_with_block(&mut self, resources: &ResourceSet, turn: u32) {
        log::info!("Complying with block on [{}].", resources);
        self.complied_blocks.push((*resources, turn));
    }

    /// Permanent, survives turns and embargo lifts.
    pub fn distrust(&mut self, player: PlayerId) {
        if self.distrusted.insert(player) {
            log::info!("No more trading with player {}.", player);
        }
    }

    /// Reaction to somebody else's embargo proposal. Returns our compliance notice.
    pub fn embargo_proposed(
        &mut self,
        me: PlayerId,
        target: PlayerId,
        turn: u32,
    ) -> Option<ChatMessage> {
        if !self.policy.comply_with_embargoes || target == me || self.is_embargoed(target) {
            return None;
        }
        log::info!("Joining embargo against player {}.", target);
        self.embargoes.insert(
            target,
            Embargo {
                since_turn: turn,
                proposed_by_me: false,
            },
        );
        Some(ChatMessage::Embargo {
            proposer: me,
            action: EmbargoAction::Comply,
            target,
        })
    }

    pub fn embargo_lifted(&mut self, target: PlayerId) {
        if self.embargoes.remove(&target).is_some() {
            log::info!("Embargo against player {} lifted.", target);
        }
    }

    /// Lifts expired blocks and embargoes and may propose an embargo against
    /// the player whose turn starts. Returns the broadcasts to send.
    pub fn on_turn_start(&mut self, ctx: &NegotiationContext) -> Vec<ChatMessage> {
        let turn = ctx.game.turn;
        let mut messages = vec![];

        if let Some(after) = self.policy.lift_block_after_turns {
            self.complied_blocks
                .retain(|(_, since)| turn.saturating_sub(*since) < after);
        }

        if let Some(after) = self.policy.lift_embargo_after_turns {
            let expired = self
                .embargoes
                .iter()
                .filter(|(_, embargo)| turn.saturating_sub(embargo.since_turn) >= after)
                .map(|(target, embargo)| (*target, embargo.proposed_by_me))
                .collect::<Vec<_>>();
            for (target, proposed_by_me) in expired {
                self.embargo_lifted(target);
                if proposed_by_me {
                    messages.push(ChatMessage::Embargo {
                        proposer: ctx.me,
                        action: EmbargoAction::Lift,
                        target,
                    });
                }
            }
        }

        if let Some(threshold) = self.policy.propose_embargo_at_vp {
            let candidate = ctx.game.turn_player;
            let reached = ctx
                .player(candidate)
                .map(|p| p.victory_points >= threshold)
                .unwrap_or(false);
            if reached {
                messages.extend(self.propose_embargo(candidate, ctx));
            }
        }
        messages
    }

    /// Resources to block in answer to `offer`, if blocking it is worth a message.
    /// `addressed` tells whether we are among the recipients, `would_reject`
    /// whether we are going to reject it.
    pub fn block_for(
        &mut self,
        offer: &Offer,
        addressed: bool,
        would_reject: bool,
        ctx: &NegotiationContext,
    ) -> Option<ResourceSet> {
        let wanted = if addressed {
            self.policy.block_trades_i_would_reject && would_reject
        } else {
            self.policy.block_trades_not_to_me
        };
        if !wanted || self.budget_spent(self.blocks_sent, self.policy.max_blocks) {
            return None;
        }

        let offerer = ctx.player(offer.from)?;
        if offerer.id == ctx.me
            || !ctx.is_leader(offerer.id)
            || offerer.victory_points < self.policy.min_leader_vp
        {
            return None;
        }
        if self.policy.block_only_for_immediate_build && !enables_plan(offerer, offer, ctx) {
            return None;
        }

        let resources = match ctx.build_plan(offerer) {
            Some(plan) if !self.policy.block_requested_resources => plan.cost(),
            _ => offer.get,
        };
        self.blocks_sent += 1;
        log::info!(
            "Blocking offer of player {}, resources [{}].",
            offer.from,
            resources
        );
        Some(resources)
    }

    /// Embargo proposal triggered by an offer letting its author build right away.
    pub fn embargo_after_offer(&mut self, offer: &Offer, ctx: &NegotiationContext) -> Option<ChatMessage> {
        if !self.policy.embargo_after_offer {
            return None;
        }
        let offerer = ctx.player(offer.from)?;
        if !enables_plan(offerer, offer, ctx) {
            return None;
        }
        self.propose_embargo(offer.from, ctx)
    }

    fn propose_embargo(&mut self, target: PlayerId, ctx: &NegotiationContext) -> Option<ChatMessage> {
        if target == ctx.me
            || !ctx.is_leader(target)
            || !self.embargoes.is_empty()
            || self.budget_spent(self.embargoes_proposed, self.policy.max_embargoes)
        {
            return None;
        }

        self.embargoes_proposed += 1;
        self.embargoes.insert(
            target,
            Embargo {
                since_turn: ctx.game.turn,
                proposed_by_me: true,
            },
        );
        log::info!("Proposing embargo against player {}.", target);
        Some(ChatMessage::Embargo {
            proposer: ctx.me,
            action: EmbargoAction::Propose,
            target,
        })
    }

    fn budget_spent(&self, used: u32, limit: Option<u32>) -> bool {
        limit.map(|limit| used >= limit).unwrap_or(false)
    }
}

/// Whether executing `offer` lets its author afford their predicted build.
pub(crate) fn enables_plan(offerer: &PlayerSnapshot, offer: &Offer, ctx: &NegotiationContext) -> bool {
    let cost = match ctx.build_plan(offerer) {
        Some(plan) => plan.cost(),
        None => return false,
    };
    let mut after = offerer.resources;
    after.subtract_hidden(&offer.give);
    after.add_set(&offer.get);
    !offerer.resources.contains_optimistic(&cost) && after.contains_optimistic(&cost)
}
