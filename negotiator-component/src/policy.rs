use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::fmt;
use std::time::Duration;

use catan_trade_model::ArgumentKind;

/// Immutable negotiation behaviour of an agent, fixed at creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationPolicy {
    /// Prefer a strictly better counter-offer over plain acceptances.
    pub prefer_better_counter: bool,
    /// Withdraw an offer when somebody asks to block it.
    pub comply_with_blocks: bool,
    /// Re-send a rejected offer as forced, once per turn.
    pub force_on_rejection: bool,
    pub forcing: ForcingPolicy,
    pub acceptor_selection: AcceptorSelection,
    pub forced_offers: ForcedOfferResponse,
    /// How long to wait for responses to our offer.
    #[serde(with = "humantime_serde")]
    pub response_timeout: Duration,
    /// Seed for every random choice. Taken from entropy when absent.
    pub seed: Option<u64>,
    pub persuasion: PersuasionPolicy,
    pub blocking: BlockingPolicy,
    pub sharing: SharingPolicy,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        NegotiationPolicy {
            prefer_better_counter: true,
            comply_with_blocks: false,
            force_on_rejection: false,
            forcing: ForcingPolicy::default(),
            acceptor_selection: AcceptorSelection::Random,
            forced_offers: ForcedOfferResponse::Ignore,
            response_timeout: Duration::from_secs(5),
            seed: None,
            persuasion: PersuasionPolicy::default(),
            blocking: BlockingPolicy::default(),
            sharing: SharingPolicy::default(),
        }
    }
}

impl NegotiationPolicy {
    /// Checks values serde can't restrict.
    pub fn validate(&self) -> anyhow::Result<()> {
        let probability = self.persuasion.always_true_acceptance;
        if !(0.0..=1.0).contains(&probability) {
            anyhow::bail!(
                "Always-true argument acceptance {} out of range [0, 1].",
                probability
            );
        }
        Ok(())
    }
}

/// Conditions a rejected offer must meet to be re-sent as forced without an
/// argument. Every enabled condition has to hold for the player it is forced on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcingPolicy {
    /// The player seems to hold what we ask for.
    pub only_if_payable: bool,
    /// After the trade we can pay for our build plan.
    pub only_for_my_immediate_build: bool,
    /// After the trade the player can build something or trade with the bank,
    /// which they couldn't before.
    pub only_if_enables_opponent: bool,
}

/// Which of several accepting players gets the trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptorSelection {
    FewestVp,
    FewestRes,
    MostRes,
    Random,
}

/// Reaction to offers marked as forced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForcedOfferResponse {
    /// Evaluate like any other offer.
    Ignore,
    /// Always accept.
    Gullible,
    /// Accept if it newly lets us build something.
    ImmediateBuild,
    /// Accept if it newly lets us trade with the bank or a port.
    ImmediateBankTrade,
    ImmediateBuildOrBankTrade,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersuasionPolicy {
    /// Attach persuasive arguments to our offers.
    pub persuade: bool,
    /// Let persuasive arguments influence our decisions.
    pub consider: bool,
    pub preference: PreferenceOrder,
    /// Argue only when re-sending a rejected offer.
    pub only_after_reject: bool,
    /// Argue only if no recipient looks like rejecting on economic grounds.
    pub only_when_trade_looks_possible: bool,
    pub only_for_immediate_build_plan: bool,
    /// Unobserved cards the generator may assign when searching for arguments.
    pub max_unknowns: u32,
    /// When false, arguments valid for a subset of recipients narrow the offer.
    pub require_all_recipients: bool,
    /// Probability of accepting an always-true argument.
    pub always_true_acceptance: f64,
    /// Weigh a valid argument economically instead of accepting outright.
    pub weigh_accepted: bool,
    /// Turns subtracted from the offer ETA when weighing a valid argument.
    pub strength: u32,
    pub too_many_resources_threshold: u32,
    /// Robbed hexes do not count as production.
    pub discount_robber: bool,
}

impl Default for PersuasionPolicy {
    fn default() -> Self {
        PersuasionPolicy {
            persuade: false,
            consider: false,
            preference: PreferenceOrder::default(),
            only_after_reject: false,
            only_when_trade_looks_possible: false,
            only_for_immediate_build_plan: false,
            max_unknowns: 2,
            require_all_recipients: true,
            always_true_acceptance: 0.5,
            weigh_accepted: false,
            strength: 1,
            too_many_resources_threshold: 7,
            discount_robber: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingPolicy {
    /// Ask an offerer to withdraw offers made to somebody else.
    pub block_trades_not_to_me: bool,
    /// Ask an offerer to withdraw offers made to us that we reject.
    pub block_trades_i_would_reject: bool,
    /// Block the requested resources instead of the offerer's predicted build cost.
    pub block_requested_resources: bool,
    pub block_only_for_immediate_build: bool,
    /// Only block leaders with at least this many victory points.
    pub min_leader_vp: u32,
    pub max_blocks: Option<u32>,
    /// Forget blocks we complied with after this many turns.
    pub lift_block_after_turns: Option<u32>,
    pub comply_with_embargoes: bool,
    /// Propose an embargo against a leader with at least this many victory points.
    pub propose_embargo_at_vp: Option<u32>,
    /// Propose embargoes in reaction to offers that let the leader build.
    pub embargo_after_offer: bool,
    pub max_embargoes: Option<u32>,
    pub lift_embargo_after_turns: Option<u32>,
}

/// Answers to information requests.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingPolicy {
    pub build_plan: bool,
    pub resources: bool,
}

/// Tiers of argument kinds, most preferred first, written as `itp-road->rb->at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PreferenceOrder {
    tiers: Vec<Vec<ArgumentKind>>,
}

impl PreferenceOrder {
    pub fn tiers(&self) -> &[Vec<ArgumentKind>] {
        &self.tiers
    }

    pub fn enabled(&self) -> BTreeSet<ArgumentKind> {
        self.tiers.iter().flatten().copied().collect()
    }

    pub fn contains(&self, kind: ArgumentKind) -> bool {
        self.tiers.iter().any(|tier| tier.contains(&kind))
    }
}

impl Default for PreferenceOrder {
    fn default() -> Self {
        PreferenceOrder {
            tiers: vec![
                vec![ArgumentKind::ImmediateTrade],
                vec![
                    ArgumentKind::BuildRoad,
                    ArgumentKind::BuildSettlement,
                    ArgumentKind::BuildCity,
                    ArgumentKind::BuildDevCard,
                ],
                vec![ArgumentKind::TooManyResources, ArgumentKind::CantGetResource],
                vec![ArgumentKind::PromiseResource, ArgumentKind::RobPromise],
            ],
        }
    }
}

impl TryFrom<String> for PreferenceOrder {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut seen = BTreeSet::new();
        let mut tiers = vec![];
        for tier in value.split("->").map(str::trim).filter(|t| !t.is_empty()) {
            let mut kinds = vec![];
            for token in tier.split('-').map(str::trim) {
                let expanded = ArgumentKind::from_token(token)
                    .ok_or_else(|| format!("Unknown persuasion kind '{}' in '{}'", token, value))?;
                kinds.extend(expanded.into_iter().filter(|kind| seen.insert(*kind)));
            }
            if !kinds.is_empty() {
                tiers.push(kinds);
            }
        }
        Ok(PreferenceOrder { tiers })
    }
}

impl From<PreferenceOrder> for String {
    fn from(order: PreferenceOrder) -> Self {
        order.to_string()
    }
}

impl fmt::Display for PreferenceOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tiers = self
            .tiers
            .iter()
            .map(|tier| {
                tier.iter()
                    .map(|kind| kind.to_string())
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect::<Vec<_>>();
        write!(f, "{}", tiers.join("->"))
    }
}
