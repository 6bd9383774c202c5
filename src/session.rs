use std::collections::{BTreeMap, BTreeSet};

use catan_negotiator_component::NegotiationError;
use catan_trade_model::{Offer, Persuasion, PlayerId, Response};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Our offer is out, waiting for its recipients to answer.
    OfferSent,
}

/// Our offer and everything collected about it, taken out of the session for resolution.
#[derive(Clone, Debug)]
pub struct CollectedResponses {
    pub offer: Offer,
    pub persuasion: Persuasion,
    pub responses: BTreeMap<PlayerId, Response>,
}

/// Per-turn negotiation state of one agent.
///
/// Holds at most one outstanding offer of our own. Sending a new offer while
/// one is outstanding is an invariant violation: it is logged and the older
/// offer is dropped.
#[derive(Debug)]
pub struct NegotiationSession {
    state: SessionState,
    my_offer: Option<Offer>,
    my_persuasion: Persuasion,
    responses: BTreeMap<PlayerId, Response>,
    waiting: BTreeSet<PlayerId>,
    /// Set by the first forced offer of the turn, cleared only on reset.
    forced_this_turn: bool,
    /// Trade we agreed to and wait to see executed.
    negotiated: Option<Offer>,
    /// Incremented with each offer sent, so late timeouts can be recognized.
    episode: u64,
}

impl NegotiationSession {
    pub fn new() -> NegotiationSession {
        NegotiationSession {
            state: SessionState::Idle,
            my_offer: None,
            my_persuasion: Persuasion::Null,
            responses: BTreeMap::new(),
            waiting: BTreeSet::new(),
            forced_this_turn: false,
            negotiated: None,
            episode: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn my_offer(&self) -> Option<&Offer> {
        self.my_offer.as_ref()
    }

    pub fn waiting(&self) -> &BTreeSet<PlayerId> {
        &self.waiting
    }

    pub fn forced_this_turn(&self) -> bool {
        self.forced_this_turn
    }

    pub fn negotiated(&self) -> Option<&Offer> {
        self.negotiated.as_ref()
    }

    pub fn set_negotiated(&mut self, offer: Option<Offer>) {
        self.negotiated = offer;
    }

    /// Episode of the outstanding offer.
    pub fn pending_episode(&self) -> Option<u64> {
        match self.state {
            SessionState::OfferSent => Some(self.episode),
            SessionState::Idle => None,
        }
    }

    /// Records our new offer. Returns its episode.
    pub fn offer_sent(&mut self, offer: &Offer, persuasion: &Persuasion, forced: bool) -> u64 {
        if let Some(previous) = &self.my_offer {
            let e = NegotiationError::InconsistentSession(format!(
                "offer [{}] sent while [{}] is outstanding",
                offer, previous
            ));
            log::error!("{} Dropping the older offer.", e);
        }

        self.state = SessionState::OfferSent;
        self.my_offer = Some(offer.clone());
        self.my_persuasion = persuasion.clone();
        self.waiting = offer.to.clone();
        self.responses.clear();
        self.forced_this_turn |= forced;
        self.episode += 1;
        self.episode
    }

    /// Records an answer to our offer. Returns whether everybody has answered.
    ///
    /// Players outside the recipients may still block or stay silent; those
    /// answers are kept but nobody waits for them.
    pub fn record(&mut self, sender: PlayerId, response: Response) -> Result<bool, NegotiationError> {
        let offer = match &self.my_offer {
            Some(offer) => offer,
            None => {
                return Err(NegotiationError::InconsistentSession(format!(
                    "response from player {} without outstanding offer",
                    sender
                )))
            }
        };

        if self.waiting.remove(&sender) {
            self.responses.insert(sender, response);
        } else if !offer.is_addressed_to(sender)
            && matches!(response, Response::Block(_) | Response::NoResponse)
        {
            self.responses.entry(sender).or_insert(response);
        } else {
            return Err(NegotiationError::InconsistentSession(format!(
                "player {} is not expected to answer",
                sender
            )));
        }
        Ok(self.waiting.is_empty())
    }

    /// Gives up waiting for `episode`. Missing answers count as `NoResponse`.
    /// Returns false for timeouts of offers no longer outstanding.
    pub fn expire(&mut self, episode: u64) -> bool {
        if self.pending_episode() != Some(episode) {
            return false;
        }
        for player in std::mem::take(&mut self.waiting) {
            log::debug!("No answer from player {} before timeout.", player);
            self.responses.insert(player, Response::NoResponse);
        }
        true
    }

    /// Ends the offer's lifetime and hands over what was collected.
    /// The forced flag survives until the session is reset.
    pub fn finish(&mut self) -> Option<CollectedResponses> {
        self.state = SessionState::Idle;
        self.waiting.clear();
        let offer = self.my_offer.take()?;
        Some(CollectedResponses {
            offer,
            persuasion: std::mem::take(&mut self.my_persuasion),
            responses: std::mem::take(&mut self.responses),
        })
    }

    /// Turn boundary: forgets the offer, the answers and the forced flag.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.my_offer = None;
        self.my_persuasion = Persuasion::Null;
        self.responses.clear();
        self.waiting.clear();
        self.forced_this_turn = false;
        self.negotiated = None;
    }
}

impl Default for NegotiationSession {
    fn default() -> Self {
        NegotiationSession::new()
    }
}
