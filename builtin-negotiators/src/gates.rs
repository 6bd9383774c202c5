//! Builtin skepticism gates.
use anyhow::bail;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use catan_negotiator_component::{
    GateFactory, GateVerdict, NegotiationContext, Piece, RejectReason, SkepticismGate,
};
use catan_trade_model::{ArgumentKind, Offer, Persuasion};

use crate::blocking::enables_plan;

fn ignore(reason: RejectReason) -> anyhow::Result<GateVerdict> {
    Ok(GateVerdict::Ignore { reason })
}

/// Ignores arguments of players who already have `min_vp` victory points.
pub struct PersuaderMinVp {
    min_vp: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MinVpConfig {
    pub min_vp: u32,
}

impl GateFactory for PersuaderMinVp {
    fn new(_name: &str, params: serde_yaml::Value) -> anyhow::Result<PersuaderMinVp> {
        let config: MinVpConfig = serde_yaml::from_value(params)?;
        Ok(PersuaderMinVp {
            min_vp: config.min_vp,
        })
    }
}

impl SkepticismGate for PersuaderMinVp {
    fn inspect(
        &mut self,
        offer: &Offer,
        _persuasion: &Persuasion,
        ctx: &NegotiationContext,
    ) -> anyhow::Result<GateVerdict> {
        let persuader = match ctx.player(offer.from) {
            Some(player) => player,
            None => bail!("Unknown persuader {}", offer.from),
        };
        if persuader.victory_points >= self.min_vp {
            return ignore(
                RejectReason::new("Persuader has too many victory points")
                    .entry("vp", persuader.victory_points)
                    .entry("min_vp", self.min_vp),
            );
        }
        Ok(GateVerdict::Trust)
    }
}

/// Random distrust.
pub struct Skeptic {
    trust_probability: f64,
    rng: StdRng,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkepticConfig {
    pub trust_probability: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl GateFactory for Skeptic {
    fn new(_name: &str, params: serde_yaml::Value) -> anyhow::Result<Skeptic> {
        let config: SkepticConfig = serde_yaml::from_value(params)?;
        if !(0.0..=1.0).contains(&config.trust_probability) {
            bail!(
                "Trust probability {} out of range [0, 1].",
                config.trust_probability
            );
        }
        Ok(Skeptic {
            trust_probability: config.trust_probability,
            rng: match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        })
    }
}

impl SkepticismGate for Skeptic {
    fn inspect(
        &mut self,
        _offer: &Offer,
        _persuasion: &Persuasion,
        _ctx: &NegotiationContext,
    ) -> anyhow::Result<GateVerdict> {
        if self.rng.gen_bool(self.trust_probability) {
            Ok(GateVerdict::Trust)
        } else {
            ignore(RejectReason::new("Not in the mood to be persuaded"))
        }
    }
}

/// Trusts only immediate build arguments for the piece we plan to build ourselves.
pub struct OnlyOwnBuildPlan;

impl GateFactory for OnlyOwnBuildPlan {
    fn new(_name: &str, _params: serde_yaml::Value) -> anyhow::Result<OnlyOwnBuildPlan> {
        Ok(OnlyOwnBuildPlan)
    }
}

impl SkepticismGate for OnlyOwnBuildPlan {
    fn inspect(
        &mut self,
        _offer: &Offer,
        persuasion: &Persuasion,
        ctx: &NegotiationContext,
    ) -> anyhow::Result<GateVerdict> {
        let planned = ctx.build_plan(ctx.my()).and_then(|plan| plan.first());
        let argued = match persuasion.kind() {
            Some(ArgumentKind::BuildRoad) => Some(Piece::Road),
            Some(ArgumentKind::BuildSettlement) => Some(Piece::Settlement),
            Some(ArgumentKind::BuildCity) => Some(Piece::City),
            Some(ArgumentKind::BuildDevCard) => Some(Piece::DevCard),
            _ => None,
        };
        match (planned, argued) {
            (Some(planned), Some(argued)) if planned == argued => Ok(GateVerdict::Trust),
            _ => ignore(
                RejectReason::new("Argument unrelated to own build plan")
                    .entry("argument", persuasion.identifier()),
            ),
        }
    }
}

/// Ignores arguments of players with more victory points than us.
pub struct PersuaderAhead;

impl GateFactory for PersuaderAhead {
    fn new(_name: &str, _params: serde_yaml::Value) -> anyhow::Result<PersuaderAhead> {
        Ok(PersuaderAhead)
    }
}

impl SkepticismGate for PersuaderAhead {
    fn inspect(
        &mut self,
        offer: &Offer,
        _persuasion: &Persuasion,
        ctx: &NegotiationContext,
    ) -> anyhow::Result<GateVerdict> {
        let persuader = match ctx.player(offer.from) {
            Some(player) => player,
            None => bail!("Unknown persuader {}", offer.from),
        };
        if persuader.victory_points > ctx.my().victory_points {
            return ignore(RejectReason::new("Persuader is ahead of us"));
        }
        Ok(GateVerdict::Trust)
    }
}

/// Ignores arguments of the score leader, ties included.
pub struct PersuaderLeads;

impl GateFactory for PersuaderLeads {
    fn new(_name: &str, _params: serde_yaml::Value) -> anyhow::Result<PersuaderLeads> {
        Ok(PersuaderLeads)
    }
}

impl SkepticismGate for PersuaderLeads {
    fn inspect(
        &mut self,
        offer: &Offer,
        _persuasion: &Persuasion,
        ctx: &NegotiationContext,
    ) -> anyhow::Result<GateVerdict> {
        if ctx.is_leader(offer.from) {
            return ignore(RejectReason::new("Persuader leads the game").entry("vp", ctx.leader_vp()));
        }
        Ok(GateVerdict::Trust)
    }
}

/// Ignores arguments for trades that let the persuader build right away.
pub struct PersuaderBuilds;

impl GateFactory for PersuaderBuilds {
    fn new(_name: &str, _params: serde_yaml::Value) -> anyhow::Result<PersuaderBuilds> {
        Ok(PersuaderBuilds)
    }
}

impl SkepticismGate for PersuaderBuilds {
    fn inspect(
        &mut self,
        offer: &Offer,
        _persuasion: &Persuasion,
        ctx: &NegotiationContext,
    ) -> anyhow::Result<GateVerdict> {
        let persuader = match ctx.player(offer.from) {
            Some(player) => player,
            None => bail!("Unknown persuader {}", offer.from),
        };
        if enables_plan(persuader, offer, ctx) {
            return ignore(RejectReason::new("Trade lets the persuader build"));
        }
        Ok(GateVerdict::Trust)
    }
}
