use rand::Rng;

use catan_negotiator_component::{
    Decision, GateVerdict, GatesPack, NegotiationContext, NegotiationError, PersuasionPolicy,
    Piece, PlayerSnapshot, RejectReason, SkepticismGate,
};
use catan_trade_model::{Offer, Persuasion};

use crate::blocking::BlockingManager;
use crate::bonus::{
    largest_army_change, longest_road_change, new_resources, opens_settlement_spot,
    victory_points_change,
};
use crate::economic::{recipient_after, EconomicEvaluator};
use crate::generator;

/// Decides offers addressed to us, taking attached arguments into account.
pub struct PersuasionAcceptor {
    policy: PersuasionPolicy,
    gates: GatesPack,
}

impl PersuasionAcceptor {
    pub fn new(policy: PersuasionPolicy, gates: GatesPack) -> PersuasionAcceptor {
        PersuasionAcceptor { policy, gates }
    }

    /// Rejection decided before looking at the offer's merits: we don't trade
    /// with the sender, or the offer can't be executed.
    pub fn screen(
        &self,
        offer: &Offer,
        barriers: &BlockingManager,
        ctx: &NegotiationContext,
    ) -> Option<Decision> {
        if barriers.is_barred(offer.from) {
            return Some(Decision::reject(
                RejectReason::new("Not trading with the offerer").entry("player", offer.from),
            ));
        }
        legality(offer, ctx)
            .map_err(|e| {
                log::info!("Rejecting offer from player {}. {}", offer.from, e);
                Decision::reject(RejectReason::new(e))
            })
            .err()
    }

    pub fn consider<R: Rng + ?Sized>(
        &mut self,
        offer: &Offer,
        forced: bool,
        persuasion: &Persuasion,
        economic: &EconomicEvaluator,
        ctx: &NegotiationContext,
        rng: &mut R,
    ) -> Decision {
        if persuasion.is_null() || !self.policy.consider {
            return economic.consider(offer, forced, ctx);
        }

        if let Ok(GateVerdict::Ignore { .. }) = self.gates.inspect(offer, persuasion, ctx) {
            return economic.consider(offer, forced, ctx);
        }

        match self.validate(offer, persuasion, ctx, rng) {
            Ok(()) if self.policy.weigh_accepted => {
                log::info!(
                    "Weighing {} from player {} with strength {}.",
                    persuasion.identifier(),
                    offer.from,
                    self.policy.strength
                );
                economic.evaluate(offer, ctx.me, ctx, self.policy.strength)
            }
            Ok(()) => {
                log::info!(
                    "Persuaded by {} from player {}.",
                    persuasion.identifier(),
                    offer.from
                );
                Decision::Accept
            }
            Err(reason) => {
                log::info!(
                    "Argument {} from player {} doesn't hold: {}",
                    persuasion.identifier(),
                    offer.from,
                    reason
                );
                economic.consider(offer, forced, ctx)
            }
        }
    }

    /// Checks the claim made by `persuasion` against our own state.
    pub fn validate<R: Rng + ?Sized>(
        &self,
        offer: &Offer,
        persuasion: &Persuasion,
        ctx: &NegotiationContext,
        rng: &mut R,
    ) -> Result<(), RejectReason> {
        persuasion.validate().map_err(RejectReason::new)?;

        let me = ctx.my();
        let after = me.with_resources(recipient_after(me, offer));

        match persuasion {
            Persuasion::Null => Err("No argument".into()),
            Persuasion::ImmediateBuildRoad {
                longest_road,
                new_settlement,
                road_change,
            } => {
                immediate_build(Piece::Road, me, &after)?;
                if *longest_road || *new_settlement {
                    let placement = ctx.board.best_road(me).ok_or("No place for a road")?;
                    if *longest_road && longest_road_change(ctx, me, &placement) != *road_change {
                        return Err("Longest road claim doesn't hold".into());
                    }
                    if *new_settlement && !opens_settlement_spot(me, &placement) {
                        return Err("Road opens no settlement spot".into());
                    }
                }
                Ok(())
            }
            Persuasion::ImmediateBuildSettlement {
                access_new_resource,
                victory_points,
                vp_change,
                resource,
            } => {
                immediate_build(Piece::Settlement, me, &after)?;
                if *victory_points && victory_points_change(ctx, me) != *vp_change {
                    return Err("Victory points claim doesn't hold".into());
                }
                if *access_new_resource {
                    let placement = ctx
                        .board
                        .best_settlement(me)
                        .ok_or("No place for a settlement")?;
                    let gained = new_resources(me, &placement, self.policy.discount_robber);
                    if !resource.map(|res| gained.contains(&res)).unwrap_or(false) {
                        return Err("Settlement brings no new resource".into());
                    }
                }
                Ok(())
            }
            Persuasion::ImmediateBuildCity {
                victory_points,
                vp_change,
            } => {
                immediate_build(Piece::City, me, &after)?;
                if *victory_points && victory_points_change(ctx, me) != *vp_change {
                    return Err("Victory points claim doesn't hold".into());
                }
                Ok(())
            }
            Persuasion::ImmediateBuildDevCard {
                largest_army,
                army_change,
            } => {
                immediate_build(Piece::DevCard, me, &after)?;
                if *largest_army && largest_army_change(ctx, me) != *army_change {
                    return Err("Largest army claim doesn't hold".into());
                }
                Ok(())
            }
            Persuasion::ImmediateTrade {
                trade_type,
                resource,
            } => {
                let ratio = me.trade_ratio(*resource);
                if generator::trade_type(me, *resource) != *trade_type {
                    return Err(RejectReason::new("Wrong trade type").entry("ratio", ratio));
                }
                if me.resources.amount(*resource) >= ratio {
                    return Err("Trade already possible".into());
                }
                if after.resources.amount(*resource) < ratio {
                    return Err("Trade still impossible".into());
                }
                Ok(())
            }
            Persuasion::TooManyResources => {
                let threshold = self.policy.too_many_resources_threshold;
                if me.resources.total() > threshold && after.resources.total() <= threshold {
                    Ok(())
                } else {
                    Err(RejectReason::new("Hand size claim doesn't hold")
                        .entry("before", me.resources.total())
                        .entry("after", after.resources.total()))
                }
            }
            Persuasion::CantGetResource { resource } => {
                if offer.give.amount(*resource) == 0 {
                    Err("Offer doesn't give the resource".into())
                } else if me.produces(*resource, self.policy.discount_robber) {
                    Err(RejectReason::new("We produce the resource").entry("resource", resource.to_string()))
                } else {
                    Ok(())
                }
            }
            Persuasion::PromiseResource { .. } | Persuasion::RobPromise => {
                // NaN maps to 0.
                let probability = self.policy.always_true_acceptance.max(0.0).min(1.0);
                if rng.gen_bool(probability) {
                    Ok(())
                } else {
                    Err("Promise not believed".into())
                }
            }
        }
    }
}

/// The trade must be what enables building `piece`.
fn immediate_build(piece: Piece, me: &PlayerSnapshot, after: &PlayerSnapshot) -> Result<(), RejectReason> {
    if !me.can_place(piece) {
        Err(RejectReason::new("No place to build").entry("piece", piece.to_string()))
    } else if me.can_afford(piece) {
        Err(RejectReason::new("Can build without the trade").entry("piece", piece.to_string()))
    } else if !after.can_afford(piece) {
        Err(RejectReason::new("Can't build even after the trade").entry("piece", piece.to_string()))
    } else {
        Ok(())
    }
}

/// Whether `offer` is well formed and executable, as far as we can tell.
pub fn legality(offer: &Offer, ctx: &NegotiationContext) -> Result<(), NegotiationError> {
    offer.validate_shape().map_err(NegotiationError::IllegalOffer)?;
    if !offer.is_addressed_to(ctx.me) {
        return Err(NegotiationError::IllegalOffer(
            "offer is not addressed to us".to_string(),
        ));
    }
    let offerer = ctx
        .player(offer.from)
        .ok_or(NegotiationError::UnknownPlayer(offer.from))?;
    if offer.is_disjunctive() {
        return Ok(());
    }
    if !ctx.can_pay(ctx.my(), &offer.get) {
        return Err(NegotiationError::IllegalOffer(format!(
            "we don't have [{}]",
            offer.get
        )));
    }
    if !ctx.can_pay(offerer, &offer.give) {
        return Err(NegotiationError::IllegalOffer(format!(
            "player {} can't have [{}]",
            offer.from, offer.give
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Fixture;
    use crate::gates::PersuaderLeads;
    use catan_negotiator_component::{BlockingPolicy, ForcedOfferResponse};
    use catan_trade_model::Resource::*;
    use catan_trade_model::{ResourceSet, TradeType};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn road_offer() -> Offer {
        Offer::new(
            "test",
            0,
            vec![1],
            ResourceSet::single(Wood),
            ResourceSet::single(Sheep),
        )
    }

    fn road_argument() -> Persuasion {
        Persuasion::ImmediateBuildRoad {
            longest_road: false,
            new_settlement: false,
            road_change: None,
        }
    }

    fn acceptor(gates: GatesPack) -> PersuasionAcceptor {
        PersuasionAcceptor::new(
            PersuasionPolicy {
                consider: true,
                ..PersuasionPolicy::default()
            },
            gates,
        )
    }

    /// Player 1 can't build a road yet and would reject the trade economically.
    fn fixture() -> Fixture {
        let mut fixture = Fixture::new(3);
        fixture
            .hand(0, &[(Wood, 1)])
            .hand(1, &[(Clay, 1), (Sheep, 1)])
            .plan(1, Piece::DevCard);
        fixture
    }

    #[test]
    fn test_road_argument_overrides_economics() {
        let fixture = fixture();
        let ctx = fixture.context(1);
        let economic = EconomicEvaluator::new(ForcedOfferResponse::Ignore);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(economic.consider(&road_offer(), false, &ctx).is_reject());
        let decision = acceptor(GatesPack::new()).consider(
            &road_offer(),
            false,
            &road_argument(),
            &economic,
            &ctx,
            &mut rng,
        );
        assert_eq!(decision, Decision::Accept);
    }

    #[test]
    fn test_gate_routes_to_economics() {
        let mut fixture = fixture();
        fixture.game.players[0].victory_points = 5;
        let ctx = fixture.context(1);
        let economic = EconomicEvaluator::new(ForcedOfferResponse::Ignore);
        let mut rng = StdRng::seed_from_u64(1);

        let gates = GatesPack::new().add_gate("PersuaderLeads", Box::new(PersuaderLeads));
        let decision = acceptor(gates).consider(
            &road_offer(),
            false,
            &road_argument(),
            &economic,
            &ctx,
            &mut rng,
        );
        assert!(decision.is_reject());
    }

    #[test]
    fn test_false_claims_fall_back_to_economics() {
        let mut fixture = fixture();
        fixture.hand(1, &[(Clay, 1), (Wood, 1), (Sheep, 1)]);
        let ctx = fixture.context(1);
        let mut rng = StdRng::seed_from_u64(1);
        let acceptor = acceptor(GatesPack::new());

        // Already able to build.
        assert!(acceptor
            .validate(&road_offer(), &road_argument(), &ctx, &mut rng)
            .is_err());

        let longest = Persuasion::ImmediateBuildRoad {
            longest_road: true,
            new_settlement: false,
            road_change: Some(catan_trade_model::BonusChange::Get),
        };
        let fixture = self::fixture();
        let ctx = fixture.context(1);
        assert!(acceptor.validate(&road_offer(), &longest, &ctx, &mut rng).is_err());
    }

    #[test]
    fn test_weigh_accepted_argument() {
        let fixture = fixture();
        let ctx = fixture.context(1);
        let economic = EconomicEvaluator::new(ForcedOfferResponse::Ignore);
        let mut rng = StdRng::seed_from_u64(1);
        let mut weighing = PersuasionAcceptor::new(
            PersuasionPolicy {
                consider: true,
                weigh_accepted: true,
                strength: 0,
                ..PersuasionPolicy::default()
            },
            GatesPack::new(),
        );

        let decision = weighing.consider(&road_offer(), false, &road_argument(), &economic, &ctx, &mut rng);
        assert!(decision.is_reject());
    }

    #[test]
    fn test_immediate_trade_claim() {
        let mut fixture = fixture();
        fixture.hand(1, &[(Wood, 3), (Sheep, 1)]);
        let ctx = fixture.context(1);
        let mut rng = StdRng::seed_from_u64(1);
        let acceptor = acceptor(GatesPack::new());

        let bank = Persuasion::ImmediateTrade {
            trade_type: TradeType::Bank,
            resource: Wood,
        };
        let port = Persuasion::ImmediateTrade {
            trade_type: TradeType::Port,
            resource: Wood,
        };
        assert!(acceptor.validate(&road_offer(), &bank, &ctx, &mut rng).is_ok());
        assert!(acceptor.validate(&road_offer(), &port, &ctx, &mut rng).is_err());
    }

    #[test]
    fn test_always_true_acceptance_probability() {
        let fixture = fixture();
        let ctx = fixture.context(1);
        let mut rng = StdRng::seed_from_u64(1);
        let believer = PersuasionAcceptor::new(
            PersuasionPolicy {
                consider: true,
                always_true_acceptance: 1.0,
                ..PersuasionPolicy::default()
            },
            GatesPack::new(),
        );
        let cynic = PersuasionAcceptor::new(
            PersuasionPolicy {
                consider: true,
                always_true_acceptance: 0.0,
                ..PersuasionPolicy::default()
            },
            GatesPack::new(),
        );

        assert!(believer
            .validate(&road_offer(), &Persuasion::RobPromise, &ctx, &mut rng)
            .is_ok());
        assert!(cynic
            .validate(&road_offer(), &Persuasion::RobPromise, &ctx, &mut rng)
            .is_err());
    }

    #[test]
    fn test_nan_acceptance_disbelieves() {
        let fixture = fixture();
        let ctx = fixture.context(1);
        let mut rng = StdRng::seed_from_u64(1);
        let confused = PersuasionAcceptor::new(
            PersuasionPolicy {
                consider: true,
                always_true_acceptance: f64::NAN,
                ..PersuasionPolicy::default()
            },
            GatesPack::new(),
        );

        let promise = Persuasion::PromiseResource { resource: Clay };
        assert!(confused.validate(&road_offer(), &promise, &ctx, &mut rng).is_err());
    }

    #[test]
    fn test_screening() {
        let fixture = fixture();
        let ctx = fixture.context(1);
        let acceptor = acceptor(GatesPack::new());
        let mut barriers = BlockingManager::new(BlockingPolicy::default());

        assert_eq!(acceptor.screen(&road_offer(), &barriers, &ctx), None);

        let unpayable = Offer::new(
            "test",
            0,
            vec![1],
            ResourceSet::single(Wood),
            ResourceSet::single(Ore),
        );
        assert!(acceptor.screen(&unpayable, &barriers, &ctx).is_some());

        barriers.distrust(0);
        assert!(acceptor.screen(&road_offer(), &barriers, &ctx).is_some());
    }
}
