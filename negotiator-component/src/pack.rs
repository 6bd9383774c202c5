use catan_trade_model::{Offer, Persuasion};

use crate::component::{GateVerdict, SkepticismGate};
use crate::context::NegotiationContext;

/// Ordered chain of named skepticism gates.
pub struct GatesPack {
    gates: Vec<(String, Box<dyn SkepticismGate>)>,
}

impl GatesPack {
    pub fn new() -> GatesPack {
        GatesPack { gates: vec![] }
    }

    pub fn add_gate(mut self, name: &str, gate: Box<dyn SkepticismGate>) -> GatesPack {
        self.gates.push((name.to_string(), gate));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.gates.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

impl Default for GatesPack {
    fn default() -> Self {
        GatesPack::new()
    }
}

impl SkepticismGate for GatesPack {
    fn inspect(
        &mut self,
        offer: &Offer,
        persuasion: &Persuasion,
        ctx: &NegotiationContext,
    ) -> anyhow::Result<GateVerdict> {
        for (name, gate) in &mut self.gates {
            let verdict = gate
                .inspect(offer, persuasion, ctx)
                .map_err(|e| {
                    log::warn!(
                        "Skepticism gate '{}' failed inspecting {} from player {}. {}",
                        name,
                        persuasion.identifier(),
                        offer.from,
                        e
                    )
                })
                .ok();

            if let Some(GateVerdict::Ignore { reason }) = verdict {
                log::info!(
                    "Skepticism gate '{}' ignores {} from player {}: {}",
                    name,
                    persuasion.identifier(),
                    offer.from,
                    reason
                );
                return Ok(GateVerdict::Ignore { reason });
            }
        }
        Ok(GateVerdict::Trust)
    }
}
