use derive_more::Display;
use serde::{Deserialize, Serialize};

use catan_trade_model::{Offer, Persuasion};

use crate::context::NegotiationContext;
use crate::reason::RejectReason;

/// Decision about an incoming offer.
#[derive(Clone, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Accept,
    #[display(fmt = "Reject ({})", reason)]
    Reject { reason: RejectReason },
    /// The offer is not good enough, but some other exchange with the offerer could be.
    Counter,
}

impl Decision {
    pub fn reject(reason: impl Into<RejectReason>) -> Decision {
        Decision::Reject {
            reason: reason.into(),
        }
    }

    pub fn is_reject(&self) -> bool {
        matches!(self, Decision::Reject { .. })
    }
}

/// Result of a skepticism gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateVerdict {
    /// The gate has no objection. Following gates are consulted.
    Trust,
    /// The persuasion is ignored and the offer evaluated on economic grounds only.
    Ignore { reason: RejectReason },
}

/// Pre-check deciding whether a persuasive argument deserves attention at all.
///
/// Gates are consulted in configured order before any argument-specific
/// validation. The first gate returning `Ignore` wins. A gate can keep state
/// (random generator, counters), but must not assume it will be called for
/// every offer, since gates after an ignoring one are skipped.
pub trait SkepticismGate: Send {
    fn inspect(
        &mut self,
        offer: &Offer,
        persuasion: &Persuasion,
        ctx: &NegotiationContext,
    ) -> anyhow::Result<GateVerdict>;
}
