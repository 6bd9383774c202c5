pub mod acceptance;
pub mod blocking;
pub mod bonus;
pub mod economic;
pub mod gates;
pub mod generator;

#[cfg(test)]
mod fixtures;

pub use acceptance::PersuasionAcceptor;
pub use blocking::BlockingManager;
pub use economic::EconomicEvaluator;
pub use gates::{OnlyOwnBuildPlan, PersuaderAhead, PersuaderBuilds, PersuaderLeads, PersuaderMinVp, Skeptic};
pub use generator::PersuasionGenerator;

use catan_negotiator_component::static_lib::{factory, register_gate};

/// Makes builtin gates available to configs as `catan-negotiators::<Name>`.
pub fn register_gates() -> anyhow::Result<()> {
    register_gate("catan-negotiators", "PersuaderMinVp", factory::<PersuaderMinVp>())?;
    register_gate("catan-negotiators", "Skeptic", factory::<Skeptic>())?;
    register_gate("catan-negotiators", "OnlyOwnBuildPlan", factory::<OnlyOwnBuildPlan>())?;
    register_gate("catan-negotiators", "PersuaderAhead", factory::<PersuaderAhead>())?;
    register_gate("catan-negotiators", "PersuaderLeads", factory::<PersuaderLeads>())?;
    register_gate("catan-negotiators", "PersuaderBuilds", factory::<PersuaderBuilds>())?;
    Ok(())
}
