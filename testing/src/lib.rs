pub mod error;
pub mod fixtures;
mod negotiation_record;
mod seat;
mod table;

pub use error::TableError;
pub use fixtures::{
    agent_config, offer_line, trade_line, Scenario, ScriptedBoard, ScriptedPlanner,
    RESPONSE_TIMEOUT,
};
pub use negotiation_record::NegotiationRecord;
pub use seat::Seat;
pub use table::Table;
