pub mod component;
pub mod context;
pub mod error;
pub mod oracle;
mod pack;
pub mod player;
pub mod policy;
pub mod reason;
pub mod static_lib;

pub use component::{Decision, GateVerdict, SkepticismGate};
pub use context::{GameSnapshot, NegotiationContext};
pub use error::NegotiationError;
pub use oracle::{BoardOracle, BuildPlan, BuildPlanner, PlainVerbalizer, Verbalizer};
pub use pack::GatesPack;
pub use player::{
    Piece, PiecesLeft, PlayerSnapshot, Port, Production, RoadPlacement, SettlementPlacement,
};
pub use policy::{
    AcceptorSelection, BlockingPolicy, ForcedOfferResponse, ForcingPolicy, NegotiationPolicy,
    PersuasionPolicy, PreferenceOrder, SharingPolicy,
};
pub use reason::RejectReason;
pub use static_lib::{GateFactory, register_gate};
