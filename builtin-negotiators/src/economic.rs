use std::collections::BTreeSet;

use catan_negotiator_component::{
    Decision, ForcedOfferResponse, ForcingPolicy, NegotiationContext, Piece, PlayerSnapshot,
    RejectReason,
};
use catan_trade_model::{Offer, PlayerId, Resource, ResourceSet};

/// Hand of a recipient of `offer` after executing it.
pub fn recipient_after(player: &PlayerSnapshot, offer: &Offer) -> ResourceSet {
    let mut after = player.resources;
    after.subtract_hidden(&offer.get);
    after.add_set(&offer.give);
    after
}

/// Judges trades by the number of turns they save on the way to the next build.
///
/// BATNA is the estimated time to build without the trade, the offer ETA the
/// estimate after executing it. Ties favour acceptance.
pub struct EconomicEvaluator {
    forced_offers: ForcedOfferResponse,
}

impl EconomicEvaluator {
    pub fn new(forced_offers: ForcedOfferResponse) -> EconomicEvaluator {
        EconomicEvaluator { forced_offers }
    }

    /// Evaluates `offer` as seen by `evaluator`, one of its recipients.
    /// `strength` turns are subtracted from the offer ETA.
    pub fn evaluate(
        &self,
        offer: &Offer,
        evaluator: PlayerId,
        ctx: &NegotiationContext,
        strength: u32,
    ) -> Decision {
        let player = match ctx.player(evaluator) {
            Some(player) => player,
            None => return Decision::reject(RejectReason::new("Unknown evaluator").entry("player", evaluator)),
        };
        let target = match ctx.build_plan(player) {
            Some(plan) => plan.cost(),
            None => return Decision::reject("No build plan"),
        };
        if !ctx.can_pay(player, &offer.get) {
            return Decision::reject(
                RejectReason::new("Can't pay requested resources")
                    .entry("requested", offer.get.to_string()),
            );
        }

        let after = recipient_after(player, offer);
        let batna = ctx.eta(player, &player.resources, &target);
        let offer_eta = ctx.eta(player, &after, &target).saturating_sub(strength);

        log::debug!(
            "Player {} evaluates [{}]: BATNA {}, offer ETA {} (strength {}).",
            evaluator,
            offer,
            batna,
            offer_eta,
            strength
        );

        if offer_eta <= batna {
            Decision::Accept
        } else if evaluator == ctx.me && self.make_counter_offer(offer, ctx).is_some() {
            Decision::Counter
        } else {
            Decision::reject(
                RejectReason::new("Offer ETA worse than BATNA")
                    .entry("batna", batna)
                    .entry("offer_eta", offer_eta),
            )
        }
    }

    /// Our decision about an offer addressed to us, without persuasion.
    pub fn consider(&self, offer: &Offer, forced: bool, ctx: &NegotiationContext) -> Decision {
        if forced {
            if let Some(decision) = self.consider_forced(offer, ctx) {
                return decision;
            }
        }
        self.evaluate(offer, ctx.me, ctx, 0)
    }

    /// Our best guess of how `recipient` would answer.
    pub fn guess_response(&self, offer: &Offer, recipient: PlayerId, ctx: &NegotiationContext) -> Decision {
        self.evaluate(&offer.restricted_to(recipient), recipient, ctx, 0)
    }

    /// Accepts forced offers matching the configured reaction. `None` means
    /// the offer should be evaluated like any other.
    pub fn consider_forced(&self, offer: &Offer, ctx: &NegotiationContext) -> Option<Decision> {
        let me = ctx.my();
        if !me.resources.contains(&offer.get) {
            return None;
        }

        let after = me.with_resources(recipient_after(me, offer));
        let enables_build = Piece::ALL
            .iter()
            .any(|piece| !me.can_build(*piece) && after.can_build(*piece));
        let enables_bank_trade = !me.can_trade_with_bank() && after.can_trade_with_bank();

        let accept = match self.forced_offers {
            ForcedOfferResponse::Ignore => false,
            ForcedOfferResponse::Gullible => true,
            ForcedOfferResponse::ImmediateBuild => enables_build,
            ForcedOfferResponse::ImmediateBankTrade => enables_bank_trade,
            ForcedOfferResponse::ImmediateBuildOrBankTrade => enables_build || enables_bank_trade,
        };

        if accept {
            log::info!(
                "Accepting forced offer from player {} ({:?}).",
                offer.from,
                self.forced_offers
            );
            Some(Decision::Accept)
        } else {
            None
        }
    }

    /// Whether our rejected `offer`, narrowed to `target`, meets the enabled
    /// conditions for forcing it without an argument.
    pub fn worth_forcing(
        &self,
        offer: &Offer,
        target: PlayerId,
        policy: &ForcingPolicy,
        ctx: &NegotiationContext,
    ) -> bool {
        let opponent = match ctx.player(target) {
            Some(player) => player,
            None => return false,
        };

        if policy.only_if_payable && !ctx.can_pay(opponent, &offer.get) {
            log::debug!("Player {} can't pay [{}], not forcing.", target, offer.get);
            return false;
        }

        if policy.only_for_my_immediate_build {
            let me = ctx.my();
            let mut after = me.resources;
            after.subtract_set(&offer.give);
            after.add_set(&offer.get);
            let builds = ctx
                .build_plan(me)
                .map(|plan| after.contains(&plan.cost()))
                .unwrap_or(false);
            if !builds {
                log::debug!("Trade [{}] doesn't complete our build plan, not forcing.", offer);
                return false;
            }
        }

        if policy.only_if_enables_opponent {
            let after = opponent.with_resources(recipient_after(opponent, offer));
            let enables_build = Piece::ALL
                .iter()
                .any(|piece| !opponent.can_build(*piece) && after.can_build(*piece));
            let enables_bank_trade = !opponent.can_trade_with_bank() && after.can_trade_with_bank();
            if !enables_build && !enables_bank_trade {
                log::debug!("Trade [{}] gives player {} nothing new, not forcing.", offer, target);
                return false;
            }
        }
        true
    }

    /// Builds the offer that brings our build plan closest, asking for a missing
    /// resource and giving away surplus. Resources in `blocked` are never requested.
    /// Recipients are the players in `candidates` who might hold the requested resource.
    pub fn make_offer(
        &self,
        ctx: &NegotiationContext,
        candidates: &BTreeSet<PlayerId>,
        blocked: &ResourceSet,
    ) -> Option<Offer> {
        let me = ctx.my();
        let target = ctx.build_plan(me)?.cost();
        let missing = me.resources.missing(&target);
        if missing.is_empty() {
            return None;
        }

        let surplus = surplus(me, &target);
        let batna = ctx.eta(me, &me.resources, &target);

        let mut best: Option<(u32, Offer)> = None;
        for wanted in missing.kinds().filter(|res| blocked.amount(*res) == 0) {
            let get = ResourceSet::single(wanted);
            let to = candidates
                .iter()
                .copied()
                .filter(|pn| *pn != ctx.me)
                .filter(|pn| {
                    ctx.player(*pn)
                        .map(|player| ctx.can_pay(player, &get))
                        .unwrap_or(false)
                })
                .collect::<BTreeSet<_>>();
            if to.is_empty() {
                continue;
            }

            for give in give_options(&surplus) {
                let mut after = me.resources;
                after.subtract_set(&give);
                after.add_set(&get);

                let eta = ctx.eta(me, &after, &target);
                if eta >= batna {
                    continue;
                }
                let better = match &best {
                    None => true,
                    Some((best_eta, best_offer)) => {
                        (eta, give.total()) < (*best_eta, best_offer.give.total())
                    }
                };
                if better {
                    best = Some((
                        eta,
                        Offer::new(&ctx.game.name, ctx.me, to.iter().copied(), give, get),
                    ));
                }
            }
        }
        best.map(|(_, offer)| offer)
    }

    /// Alternative exchange with the author of `offer`.
    pub fn make_counter_offer(&self, offer: &Offer, ctx: &NegotiationContext) -> Option<Offer> {
        let author = std::iter::once(offer.from).collect();
        self.make_offer(ctx, &author, &ResourceSet::new())
    }

    /// Picks the best acceptable concrete exchange out of a partial or disjunctive
    /// offer and returns it as our counter-offer to its author.
    pub fn complete_partial_or_disjunctive(&self, offer: &Offer, ctx: &NegotiationContext) -> Option<Offer> {
        let me = ctx.my();
        let author = ctx.player(offer.from)?;
        let target = ctx.build_plan(me)?.cost();
        let batna = ctx.eta(me, &me.resources, &target);
        let surplus = surplus(me, &target);
        let missing = me.resources.missing(&target);

        let mut best: Option<(u32, ResourceSet, ResourceSet)> = None;
        for variant in offer.concrete_variants() {
            // Our side of the exchange: (give, get).
            let options: Vec<(ResourceSet, ResourceSet)> = if variant.get.is_empty() {
                give_options(&surplus)
                    .into_iter()
                    .map(|give| (give, variant.give))
                    .collect()
            } else if variant.give.is_empty() {
                missing
                    .kinds()
                    .map(|res| (variant.get, ResourceSet::single(res)))
                    .collect()
            } else {
                vec![(variant.get, variant.give)]
            };

            for (give, get) in options {
                if give.is_empty()
                    || get.is_empty()
                    || !me.resources.contains(&give)
                    || !ctx.can_pay(author, &get)
                {
                    continue;
                }
                let mut after = me.resources;
                after.subtract_set(&give);
                after.add_set(&get);

                let eta = ctx.eta(me, &after, &target);
                let better = best.as_ref().map(|(best_eta, ..)| eta < *best_eta).unwrap_or(true);
                if eta <= batna && better {
                    best = Some((eta, give, get));
                }
            }
        }

        best.map(|(_, give, get)| Offer::new(&offer.game, ctx.me, vec![offer.from], give, get))
    }
}

fn surplus(player: &PlayerSnapshot, target: &ResourceSet) -> ResourceSet {
    let mut surplus = player.resources;
    surplus.subtract_set(target);
    surplus.set_amount(Resource::Unknown, 0);
    surplus
}

/// Candidate give sides, smallest first: single units, pairs of one kind, pairs of two kinds.
fn give_options(surplus: &ResourceSet) -> Vec<ResourceSet> {
    let kinds = surplus.kinds().collect::<Vec<_>>();
    let mut options = kinds
        .iter()
        .map(|res| ResourceSet::single(*res))
        .collect::<Vec<_>>();
    options.extend(
        kinds
            .iter()
            .filter(|res| surplus.amount(**res) >= 2)
            .map(|res| ResourceSet::new().with(*res, 2)),
    );
    for (idx, first) in kinds.iter().enumerate() {
        for second in &kinds[idx + 1..] {
            options.push(ResourceSet::single(*first).with(*second, 1));
        }
    }
    options
}
