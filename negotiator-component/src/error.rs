use catan_trade_model::PlayerId;

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("Illegal offer: {0}")]
    IllegalOffer(String),
    #[error("Inconsistent negotiation session: {0}")]
    InconsistentSession(String),
    #[error("Player {0} is not seated in this game")]
    UnknownPlayer(PlayerId),
}
