use std::fmt;

use catan_trade_model::{ChatMessage, Offer, PlayerId, WireFormat};

/// Everything said and decided at the table, in order.
#[derive(Clone, Debug, Default)]
pub struct NegotiationRecord {
    pub lines: Vec<(PlayerId, String)>,
    pub trades: Vec<(PlayerId, Offer)>,
    pub no_trades: Vec<PlayerId>,
}

impl NegotiationRecord {
    pub fn said_by(&self, player: PlayerId) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(sender, _)| *sender == player)
            .map(|(_, line)| line.as_str())
            .collect()
    }

    /// Decoded messages of a player. Lines that don't decode are skipped.
    pub fn messages_of(&self, player: PlayerId) -> Vec<ChatMessage> {
        self.said_by(player)
            .into_iter()
            .filter_map(|line| ChatMessage::decode(line).ok())
            .collect()
    }

    /// Whether somebody said a line containing `pattern`.
    pub fn contains(&self, pattern: &str) -> bool {
        self.lines.iter().any(|(_, line)| line.contains(pattern))
    }

    pub fn trades_of(&self, player: PlayerId) -> Vec<&Offer> {
        self.trades
            .iter()
            .filter(|(owner, _)| *owner == player)
            .map(|(_, offer)| offer)
            .collect()
    }
}

impl fmt::Display for NegotiationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (sender, line) in &self.lines {
            writeln!(f, "[{}] {}", sender, line)?;
        }
        for (player, offer) in &self.trades {
            writeln!(f, "Player {} executes trade: {}", player, offer)?;
        }
        for player in &self.no_trades {
            writeln!(f, "Player {} ends negotiation without trade", player)?;
        }
        Ok(())
    }
}
