//! Multi-party trade negotiation for Catan agents: offers, persuasive
//! arguments, blocks and embargoes exchanged over the game chat.
pub mod agent;
mod coordinator;
mod dialogue;
pub mod factory;
mod session;

pub use agent::{AgentAddr, AgentCallbacks, AgentEvent, NegotiatorAgent};
pub use coordinator::{Coordinator, Event, Resolution, World};
pub use dialogue::NO_PLAN;
pub use session::{CollectedResponses, NegotiationSession, SessionState};

pub use catan_negotiator_component::{
    BoardOracle, BuildPlan, BuildPlanner, GameSnapshot, NegotiationPolicy, Piece,
    PlayerSnapshot, Verbalizer,
};
pub use catan_trade_model as model;

pub mod builtin {
    pub use catan_builtin_negotiators::{
        register_gates, BlockingManager, EconomicEvaluator, OnlyOwnBuildPlan, PersuaderAhead,
        PersuaderBuilds, PersuaderLeads, PersuaderMinVp, PersuasionAcceptor, PersuasionGenerator,
        Skeptic,
    };
}

pub mod component {
    pub use catan_negotiator_component::static_lib::{factory, register_gate};
    pub use catan_negotiator_component::{
        Decision, GateFactory, GateVerdict, GatesPack, NegotiationContext, RejectReason,
        SkepticismGate,
    };
}
