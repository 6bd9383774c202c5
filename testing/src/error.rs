use std::time::Duration;

use catan_trade_model::PlayerId;

#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("Player {0} already has a seat")]
    SeatTaken(PlayerId),
    #[error("No agent plays for player {0}")]
    NoAgent(PlayerId),
    #[error("Agent of player {player} failed: {error}")]
    Agent {
        player: PlayerId,
        error: anyhow::Error,
    },
    #[error("Agents stopped talking to the table")]
    ChannelClosed,
    #[error("Negotiation still running after {0:?}")]
    Timeout(Duration),
}
