use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Explanation attached to rejections and ignored persuasions.
/// Mostly consumed by logs and tests.
#[derive(Clone, Display, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[display(fmt = "'{}'", message)]
pub struct RejectReason {
    pub message: String,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl RejectReason {
    pub fn new(message: impl ToString) -> RejectReason {
        RejectReason {
            message: message.to_string(),
            extra: serde_json::json!({}),
        }
    }

    pub fn entry<T: Into<serde_json::Value>>(
        mut self,
        key: impl ToString,
        value: T,
    ) -> RejectReason {
        if let Some(extra) = self.extra.as_object_mut() {
            extra.insert(key.to_string(), value.into());
        }
        self
    }
}

impl From<&str> for RejectReason {
    fn from(message: &str) -> Self {
        RejectReason::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_entries() {
        let reason = RejectReason::new("Offer ETA worse than BATNA")
            .entry("batna", 3)
            .entry("offer_eta", 5);

        assert_eq!(reason.to_string(), "'Offer ETA worse than BATNA'");
        assert_eq!(reason.extra["batna"], 3);
        assert_eq!(
            serde_json::to_value(&reason).unwrap()["offer_eta"],
            serde_json::json!(5)
        );
    }
}
