//! Search for persuasive arguments to attach to our offers.
//!
//! Opponents' hands are only partially observed. The generator resolves
//! unknown units by case splitting: at depth `d` it assigns `d` unknown units
//! to concrete resources and tries every assignment, returning the arguments
//! found at the smallest depth that yields any.
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

use catan_negotiator_component::{
    NegotiationContext, PersuasionPolicy, Piece, PlayerSnapshot, RoadPlacement,
};
use catan_trade_model::{
    ArgumentKind, BonusChange, Offer, Persuasion, PlayerId, Resource, TradeType,
};

use crate::bonus::{
    agree, largest_army_change, longest_road_change, new_resources, opens_settlement_spot,
    victory_points_change,
};
use crate::economic::{recipient_after, EconomicEvaluator};

/// Bank trades go 4:1, anything cheaper needs a port.
const BANK_RATIO: u32 = 4;

pub struct PersuasionGenerator {
    policy: PersuasionPolicy,
}

impl PersuasionGenerator {
    pub fn new(policy: PersuasionPolicy) -> PersuasionGenerator {
        PersuasionGenerator { policy }
    }

    /// Arguments that hold for every recipient of `offer`.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        offer: &Offer,
        ctx: &NegotiationContext,
        rng: &mut R,
    ) -> Vec<Persuasion> {
        let addressees = offer
            .to
            .iter()
            .filter_map(|pn| ctx.player(*pn))
            .collect::<Vec<_>>();
        if addressees.is_empty() {
            return vec![];
        }

        let unknowns = addressees
            .iter()
            .map(|player| player.resources.amount(Resource::Unknown))
            .collect::<Vec<_>>();
        let max_depth = self.policy.max_unknowns.min(unknowns.iter().sum());

        for depth in 0..=max_depth {
            let slots = assign_slots(&unknowns, depth);
            let mut odometer = vec![0usize; slots.len()];
            loop {
                let hands = addressees
                    .iter()
                    .enumerate()
                    .map(|(idx, player)| {
                        let mut hand = player.resources;
                        for (slot, owner) in slots.iter().enumerate() {
                            if *owner == idx {
                                hand.subtract(Resource::Unknown, 1);
                                hand.add(Resource::CONCRETE[odometer[slot]], 1);
                            }
                        }
                        player.with_resources(hand)
                    })
                    .collect::<Vec<_>>();

                let found = self.arguments(offer, &hands, ctx, rng);
                if !found.is_empty() {
                    log::debug!(
                        "Found {} argument(s) for [{}] with {} unknown unit(s) assigned.",
                        found.len(),
                        offer,
                        depth
                    );
                    return found;
                }
                if !advance(&mut odometer, Resource::CONCRETE.len()) {
                    break;
                }
            }
        }
        vec![]
    }

    /// Most preferred argument, random within a preference tier.
    pub fn pick<R: Rng + ?Sized>(&self, candidates: &[Persuasion], rng: &mut R) -> Option<Persuasion> {
        for tier in self.policy.preference.tiers() {
            let in_tier = candidates
                .iter()
                .filter(|p| p.kind().map(|kind| tier.contains(&kind)).unwrap_or(false))
                .filter(|p| match p.validate() {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("Dropping generated argument: {}", e);
                        false
                    }
                })
                .collect::<Vec<_>>();
            if let Some(chosen) = in_tier.choose(rng) {
                return Some((*chosen).clone());
            }
        }
        None
    }

    /// Argument to send along with `offer`. When arguments can't cover every
    /// recipient and the policy allows it, the returned offer is narrowed to
    /// the largest subset of recipients an argument holds for.
    pub fn propose<R: Rng + ?Sized>(
        &self,
        offer: &Offer,
        economic: &EconomicEvaluator,
        after_reject: bool,
        ctx: &NegotiationContext,
        rng: &mut R,
    ) -> Option<(Offer, Persuasion)> {
        if !self.policy.persuade || (self.policy.only_after_reject && !after_reject) {
            return None;
        }
        if self.policy.only_when_trade_looks_possible
            && offer
                .to
                .iter()
                .any(|pn| economic.guess_response(offer, *pn, ctx).is_reject())
        {
            log::debug!("Not arguing for [{}], somebody would reject it anyway.", offer);
            return None;
        }

        let candidates = self.generate(offer, ctx, rng);
        if let Some(persuasion) = self.pick(&candidates, rng) {
            return Some((offer.clone(), persuasion));
        }
        if self.policy.require_all_recipients {
            return None;
        }

        for subset in subsets(&offer.to, rng) {
            let narrowed = offer.restricted_to_set(&subset);
            let candidates = self.generate(&narrowed, ctx, rng);
            if let Some(persuasion) = self.pick(&candidates, rng) {
                log::info!(
                    "Narrowing offer to {:?} to argue with {}.",
                    subset,
                    persuasion.identifier()
                );
                return Some((narrowed, persuasion));
            }
        }
        None
    }

    fn arguments<R: Rng + ?Sized>(
        &self,
        offer: &Offer,
        hands: &[PlayerSnapshot],
        ctx: &NegotiationContext,
        rng: &mut R,
    ) -> Vec<Persuasion> {
        let afters = hands
            .iter()
            .map(|hand| hand.with_resources(recipient_after(hand, offer)))
            .collect::<Vec<_>>();

        self.policy
            .preference
            .enabled()
            .into_iter()
            .filter(|kind| !self.policy.only_for_immediate_build_plan || kind.is_immediate_build())
            .filter_map(|kind| self.argument(kind, offer, hands, &afters, ctx, rng))
            .collect()
    }

    fn argument<R: Rng + ?Sized>(
        &self,
        kind: ArgumentKind,
        offer: &Offer,
        before: &[PlayerSnapshot],
        after: &[PlayerSnapshot],
        ctx: &NegotiationContext,
        rng: &mut R,
    ) -> Option<Persuasion> {
        let pairs = || before.iter().zip(after.iter());
        match kind {
            ArgumentKind::BuildRoad
            | ArgumentKind::BuildSettlement
            | ArgumentKind::BuildCity
            | ArgumentKind::BuildDevCard => {
                let piece = piece_of(kind)?;
                pairs()
                    .all(|(b, a)| b.can_place(piece) && !b.can_afford(piece) && a.can_afford(piece))
                    .then(|| self.build_argument(piece, before, ctx))
            }
            ArgumentKind::ImmediateTrade => Resource::CONCRETE.iter().copied().find_map(|res| {
                let expected = trade_type(&before[0], res);
                let holds = pairs().all(|(b, a)| {
                    let ratio = b.trade_ratio(res);
                    trade_type(b, res) == expected
                        && b.resources.amount(res) < ratio
                        && a.resources.amount(res) >= ratio
                });
                holds.then(|| Persuasion::ImmediateTrade {
                    trade_type: expected,
                    resource: res,
                })
            }),
            ArgumentKind::TooManyResources => {
                let threshold = self.policy.too_many_resources_threshold;
                pairs()
                    .all(|(b, a)| b.resources.total() > threshold && a.resources.total() <= threshold)
                    .then(|| Persuasion::TooManyResources)
            }
            ArgumentKind::CantGetResource => offer
                .give
                .kinds()
                .filter(|res| *res != Resource::Unknown)
                .find(|res| {
                    before
                        .iter()
                        .all(|b| !b.produces(*res, self.policy.discount_robber))
                })
                .map(|resource| Persuasion::CantGetResource { resource }),
            ArgumentKind::PromiseResource => Resource::CONCRETE
                .choose(rng)
                .map(|resource| Persuasion::PromiseResource {
                    resource: *resource,
                }),
            ArgumentKind::RobPromise => Some(Persuasion::RobPromise),
        }
    }

    /// Immediate build argument with every constraint that holds for all addressees.
    fn build_argument(&self, piece: Piece, players: &[PlayerSnapshot], ctx: &NegotiationContext) -> Persuasion {
        match piece {
            Piece::Road => {
                let placements = players
                    .iter()
                    .map(|p| ctx.board.best_road(p))
                    .collect::<Option<Vec<RoadPlacement>>>()
                    .unwrap_or_default();
                let placed = !placements.is_empty();

                let road_change = agree(
                    &players
                        .iter()
                        .zip(placements.iter())
                        .map(|(p, placement)| longest_road_change(ctx, p, placement))
                        .collect::<Vec<_>>(),
                )
                .filter(|_| placed);
                let new_settlement = placed
                    && players
                        .iter()
                        .zip(placements.iter())
                        .all(|(p, placement)| opens_settlement_spot(p, placement));

                Persuasion::ImmediateBuildRoad {
                    longest_road: road_change.is_some(),
                    new_settlement,
                    road_change,
                }
            }
            Piece::Settlement => {
                let vp_change = self.vp_change(players, ctx);
                let resource = self.common_new_resource(players, ctx);
                Persuasion::ImmediateBuildSettlement {
                    access_new_resource: resource.is_some(),
                    victory_points: vp_change.is_some(),
                    vp_change,
                    resource,
                }
            }
            Piece::City => {
                let vp_change = self.vp_change(players, ctx);
                Persuasion::ImmediateBuildCity {
                    victory_points: vp_change.is_some(),
                    vp_change,
                }
            }
            Piece::DevCard => {
                let army_change = agree(
                    &players
                        .iter()
                        .map(|p| largest_army_change(ctx, p))
                        .collect::<Vec<_>>(),
                );
                Persuasion::ImmediateBuildDevCard {
                    largest_army: army_change.is_some(),
                    army_change,
                }
            }
        }
    }

    fn vp_change(
        &self,
        players: &[PlayerSnapshot],
        ctx: &NegotiationContext,
    ) -> Option<BonusChange> {
        agree(
            &players
                .iter()
                .map(|p| victory_points_change(ctx, p))
                .collect::<Vec<_>>(),
        )
    }

    /// First resource every addressee would newly produce from their best settlement.
    fn common_new_resource(&self, players: &[PlayerSnapshot], ctx: &NegotiationContext) -> Option<Resource> {
        let mut common: Option<BTreeSet<Resource>> = None;
        for player in players {
            let placement = ctx.board.best_settlement(player)?;
            let gained = new_resources(player, &placement, self.policy.discount_robber)
                .into_iter()
                .collect::<BTreeSet<_>>();
            common = Some(match common {
                None => gained,
                Some(common) => common.intersection(&gained).copied().collect(),
            });
        }
        common?.into_iter().next()
    }
}

fn piece_of(kind: ArgumentKind) -> Option<Piece> {
    match kind {
        ArgumentKind::BuildRoad => Some(Piece::Road),
        ArgumentKind::BuildSettlement => Some(Piece::Settlement),
        ArgumentKind::BuildCity => Some(Piece::City),
        ArgumentKind::BuildDevCard => Some(Piece::DevCard),
        _ => None,
    }
}

pub(crate) fn trade_type(player: &PlayerSnapshot, resource: Resource) -> TradeType {
    if player.trade_ratio(resource) < BANK_RATIO {
        TradeType::Port
    } else {
        TradeType::Bank
    }
}

/// Owner index of each of `depth` unknown slots. Slots go one at a time to the
/// addressee with the most unknown units left.
fn assign_slots(unknowns: &[u32], depth: u32) -> Vec<usize> {
    let mut remaining = unknowns.to_vec();
    let mut slots = vec![];
    for _ in 0..depth {
        let owner = remaining
            .iter()
            .enumerate()
            .rev()
            .max_by_key(|(_, left)| **left)
            .map(|(idx, _)| idx);
        match owner {
            Some(owner) if remaining[owner] > 0 => {
                remaining[owner] -= 1;
                slots.push(owner);
            }
            _ => break,
        }
    }
    slots
}

/// Next assignment, first slot turning fastest. False after the last one.
fn advance(odometer: &mut [usize], base: usize) -> bool {
    for digit in odometer.iter_mut() {
        *digit += 1;
        if *digit < base {
            return true;
        }
        *digit = 0;
    }
    false
}

/// Proper non-empty subsets of `players`, larger ones first, shuffled within a size.
fn subsets<R: Rng + ?Sized>(players: &BTreeSet<PlayerId>, rng: &mut R) -> Vec<BTreeSet<PlayerId>> {
    let members = players.iter().copied().collect::<Vec<_>>();
    let mut result = vec![];
    for size in (1..members.len()).rev() {
        let mut of_size = (1u32..(1 << members.len()))
            .filter(|mask| mask.count_ones() as usize == size)
            .map(|mask| {
                members
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| mask & (1 << idx) != 0)
                    .map(|(_, pn)| *pn)
                    .collect::<BTreeSet<_>>()
            })
            .collect::<Vec<_>>();
        of_size.shuffle(rng);
        result.extend(of_size);
    }
    result
}
