//! Data model of multi-party trading: resources, offers, persuasive arguments
//! and the chat lines that carry them.
pub mod chat;
pub mod codec;
pub mod error;
pub mod message;
pub mod offer;
pub mod persuasion;
pub mod resources;

pub use chat::{ChatMessage, EmbargoAction, Topic};
pub use codec::WireFormat;
pub use error::Error;
pub use message::{Response, TradeAct, TradeMessage, IMPLICIT_REJECT};
pub use offer::{Offer, PlayerId, MAX_PLAYERS};
pub use persuasion::{ArgumentKind, BonusChange, Persuasion, TradeType};
pub use resources::{Resource, ResourceSet};
