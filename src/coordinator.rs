use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::iter::once;

use catan_builtin_negotiators::acceptance::legality;
use catan_builtin_negotiators::{
    BlockingManager, EconomicEvaluator, PersuasionAcceptor, PersuasionGenerator,
};
use catan_negotiator_component::{
    AcceptorSelection, BoardOracle, BuildPlan, BuildPlanner, Decision, GameSnapshot, GatesPack,
    NegotiationContext, NegotiationError, NegotiationPolicy, PlainVerbalizer, Verbalizer,
};
use catan_trade_model::{
    ChatMessage, Offer, Persuasion, PlayerId, ResourceSet, Response, TradeAct, TradeMessage,
    IMPLICIT_REJECT,
};

use crate::session::{CollectedResponses, NegotiationSession};

/// Game knowledge owned by the caller and lent to the coordinator for one step.
pub struct World<'a> {
    pub game: &'a GameSnapshot,
    pub planner: &'a dyn BuildPlanner,
    pub board: &'a dyn BoardOracle,
}

impl<'a> World<'a> {
    pub fn new(
        game: &'a GameSnapshot,
        planner: &'a dyn BuildPlanner,
        board: &'a dyn BoardOracle,
    ) -> World<'a> {
        World {
            game,
            planner,
            board,
        }
    }

    pub(crate) fn context<'b>(
        &self,
        me: PlayerId,
        announced: &'b HashMap<PlayerId, BuildPlan>,
    ) -> Result<NegotiationContext<'b>, NegotiationError>
    where
        'a: 'b,
    {
        NegotiationContext::new(me, self.game, self.planner, self.board, announced)
    }
}

/// Output of the coordinator, to be delivered by its owner.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Say(ChatMessage),
    /// Trade of our own offer was agreed and should be executed.
    TradeAgreed(Offer),
    /// Our offer ended without a trade.
    NoTrade,
}

/// How collecting responses to our offer ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// Offer restricted to the chosen partner.
    Trade(Offer),
    /// Counter-offers we answered instead.
    Countered(Vec<Offer>),
    /// Rejected offer re-sent as forced.
    Forced(Offer),
    NoTrade,
}

#[derive(Default)]
struct Buckets {
    accepts: Vec<PlayerId>,
    rejects: Vec<PlayerId>,
    counters: Vec<(Offer, bool, Persuasion)>,
    blocks: Vec<(PlayerId, ResourceSet)>,
}

/// Drives one agent's trade negotiation: sends offers, collects and resolves
/// answers to them and reacts to everything other players say.
pub struct Coordinator {
    pub(crate) me: PlayerId,
    pub(crate) policy: NegotiationPolicy,
    pub(crate) session: NegotiationSession,
    pub(crate) economic: EconomicEvaluator,
    pub(crate) generator: PersuasionGenerator,
    pub(crate) acceptor: PersuasionAcceptor,
    pub(crate) barriers: BlockingManager,
    pub(crate) announced: HashMap<PlayerId, BuildPlan>,
    pub(crate) rng: StdRng,
    verbalizer: Box<dyn Verbalizer + Send>,
    last_resolution: Option<Resolution>,
}

impl Coordinator {
    pub fn new(me: PlayerId, policy: NegotiationPolicy, gates: GatesPack) -> Coordinator {
        let rng = match policy.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Coordinator {
            me,
            session: NegotiationSession::new(),
            economic: EconomicEvaluator::new(policy.forced_offers),
            generator: PersuasionGenerator::new(policy.persuasion.clone()),
            acceptor: PersuasionAcceptor::new(policy.persuasion.clone(), gates),
            barriers: BlockingManager::new(policy.blocking.clone()),
            announced: HashMap::new(),
            rng,
            verbalizer: Box::new(PlainVerbalizer),
            last_resolution: None,
            policy,
        }
    }

    pub fn with_verbalizer(mut self, verbalizer: Box<dyn Verbalizer + Send>) -> Coordinator {
        self.verbalizer = verbalizer;
        self
    }

    pub fn me(&self) -> PlayerId {
        self.me
    }

    pub fn policy(&self) -> &NegotiationPolicy {
        &self.policy
    }

    pub fn session(&self) -> &NegotiationSession {
        &self.session
    }

    pub fn barriers(&self) -> &BlockingManager {
        &self.barriers
    }

    pub fn announced(&self) -> &HashMap<PlayerId, BuildPlan> {
        &self.announced
    }

    pub fn last_resolution(&self) -> Option<&Resolution> {
        self.last_resolution.as_ref()
    }

    /// Episode of our outstanding offer, if any. Its timeout should be scheduled.
    pub fn pending_episode(&self) -> Option<u64> {
        self.session.pending_episode()
    }

    pub fn start_turn(&mut self, world: &World) -> Vec<Event> {
        self.session.reset();
        self.with_context(world, |coordinator, ctx| {
            coordinator
                .barriers
                .on_turn_start(ctx)
                .into_iter()
                .map(Event::Say)
                .collect()
        })
    }

    pub fn end_turn(&mut self) {
        if let Some(offer) = self.session.my_offer() {
            log::debug!("Turn ended with offer [{}] outstanding.", offer);
        }
        self.session.reset();
    }

    /// Makes our own offer, if anything is worth offering.
    pub fn negotiate(&mut self, world: &World) -> Vec<Event> {
        self.with_context(world, |coordinator, ctx| coordinator.negotiate_in(ctx))
    }

    /// Stops waiting for answers to the offer sent in `episode`.
    pub fn timeout(&mut self, episode: u64, world: &World) -> Vec<Event> {
        if !self.session.expire(episode) {
            return vec![];
        }
        log::debug!("Player {} stops waiting for answers.", self.me);
        self.with_context(world, |coordinator, ctx| coordinator.resolve(ctx))
    }

    pub(crate) fn with_context<F>(&mut self, world: &World, f: F) -> Vec<Event>
    where
        F: FnOnce(&mut Coordinator, &NegotiationContext) -> Vec<Event>,
    {
        let announced = self.announced.clone();
        match world.context(self.me, &announced) {
            Ok(ctx) => f(self, &ctx),
            Err(e) => {
                log::warn!(
                    "Player {} can't negotiate in game [{}]. {}",
                    self.me,
                    world.game.name,
                    e
                );
                vec![]
            }
        }
    }

    fn negotiate_in(&mut self, ctx: &NegotiationContext) -> Vec<Event> {
        let candidates: BTreeSet<PlayerId> = if ctx.is_my_turn() {
            ctx.opponents().map(|player| player.id).collect()
        } else {
            once(ctx.game.turn_player).filter(|pn| *pn != self.me).collect()
        };
        let candidates = candidates
            .into_iter()
            .filter(|pn| !self.barriers.is_barred(*pn))
            .collect::<BTreeSet<_>>();

        let blocked = self.barriers.blocked_resources();
        let offer = match self.economic.make_offer(ctx, &candidates, &blocked) {
            Some(offer) => offer,
            None => {
                log::debug!("Player {} has nothing worth offering.", self.me);
                return vec![Event::NoTrade];
            }
        };

        let (offer, persuasion) = self
            .generator
            .propose(&offer, &self.economic, false, ctx, &mut self.rng)
            .unwrap_or((offer, Persuasion::Null));
        vec![self.send_offer(offer, persuasion, false)]
    }

    pub(crate) fn trade(&self, receivers: impl IntoIterator<Item = PlayerId>, act: TradeAct) -> Event {
        let nl = self.verbalizer.verbalize(&act);
        Event::Say(ChatMessage::Trade(TradeMessage::new(
            self.me, receivers, act, nl,
        )))
    }

    pub(crate) fn implicit_reject(&self, player: PlayerId) -> Event {
        Event::Say(ChatMessage::Trade(TradeMessage::new(
            self.me,
            once(player),
            TradeAct::Reject,
            IMPLICIT_REJECT,
        )))
    }

    fn send_offer(&mut self, offer: Offer, persuasion: Persuasion, forced: bool) -> Event {
        log::info!(
            "Player {} offers [{}]{}{}.",
            self.me,
            offer,
            if forced { " forced" } else { "" },
            if persuasion.is_null() {
                String::new()
            } else {
                format!(" with {}", persuasion.identifier())
            }
        );
        self.session.offer_sent(&offer, &persuasion, forced);
        let receivers = offer.to.clone();
        self.trade(
            receivers,
            TradeAct::Offer {
                offer,
                forced,
                persuasion,
            },
        )
    }

    pub(crate) fn on_trade(&mut self, message: TradeMessage, ctx: &NegotiationContext) -> Vec<Event> {
        let TradeMessage {
            sender,
            receivers,
            act,
            ..
        } = message;
        if sender == self.me {
            return vec![];
        }
        let addressed = receivers.contains(&self.me);

        match act {
            TradeAct::Offer {
                offer,
                forced,
                persuasion,
            } => {
                if offer.from != sender {
                    log::warn!(
                        "Player {} sent offer authored by player {}. Ignoring.",
                        sender,
                        offer.from
                    );
                    return vec![];
                }
                if !addressed || !offer.is_addressed_to(self.me) {
                    return self.observe(&offer, ctx);
                }
                if self.session.waiting().contains(&sender) {
                    let counter = Response::Counter {
                        offer,
                        forced,
                        persuasion,
                    };
                    return self.on_response(sender, counter, ctx);
                }
                if !self.session.is_idle() {
                    log::info!(
                        "Player {} rejects [{}] while waiting for answers to our offer.",
                        self.me,
                        offer
                    );
                    return vec![self.trade(once(sender), TradeAct::Reject)];
                }
                self.handle_offers(vec![(offer, forced, persuasion)], ctx)
            }
            TradeAct::BlockComply => {
                if self.session.negotiated().map(|o| o.from) == Some(sender) {
                    log::info!("Player {} withdrew the offer we agreed to.", sender);
                    self.session.set_negotiated(None);
                }
                vec![]
            }
            act if addressed => {
                let awaited = self.session.waiting().contains(&sender)
                    || (self.session.my_offer().is_some()
                        && matches!(act, TradeAct::Block(_) | TradeAct::NoResponse));
                if awaited {
                    match act.into_response() {
                        Some(response) => self.on_response(sender, response, ctx),
                        None => vec![],
                    }
                } else {
                    self.on_confirmation(sender, act);
                    vec![]
                }
            }
            _ => vec![],
        }
    }

    /// The offer's author answers our acceptance.
    fn on_confirmation(&mut self, sender: PlayerId, act: TradeAct) {
        let pending = self.session.negotiated().map(|o| o.from) == Some(sender);
        match act {
            TradeAct::Accept if pending => {
                log::info!("Player {} confirmed our trade.", sender);
                self.session.set_negotiated(None);
            }
            TradeAct::Reject if pending => {
                log::debug!("Player {} traded with somebody else.", sender);
                self.session.set_negotiated(None);
            }
            act => log::warn!("Unexpected {} from player {}. Ignoring.", act, sender),
        }
    }

    fn on_response(&mut self, sender: PlayerId, response: Response, ctx: &NegotiationContext) -> Vec<Event> {
        log::debug!("Player {} answered our offer: {:?}", sender, response);
        match self.session.record(sender, response) {
            Ok(true) => self.resolve(ctx),
            Ok(false) => vec![],
            Err(e) => {
                log::warn!("{}", e);
                vec![]
            }
        }
    }

    /// Decides what to do with the answers collected for our offer.
    fn resolve(&mut self, ctx: &NegotiationContext) -> Vec<Event> {
        let CollectedResponses {
            offer, responses, ..
        } = match self.session.finish() {
            Some(collected) => collected,
            None => return vec![],
        };

        let mut buckets = Buckets::default();
        for (pn, response) in responses {
            match response {
                Response::Accept if offer.is_partial() || offer.is_disjunctive() => {
                    log::debug!("Player {} accepted an incomplete offer. Counting as reject.", pn);
                    buckets.rejects.push(pn)
                }
                Response::Accept => buckets.accepts.push(pn),
                Response::Reject => buckets.rejects.push(pn),
                Response::Counter {
                    offer,
                    forced,
                    persuasion,
                } => buckets.counters.push((offer, forced, persuasion)),
                Response::Block(resources) => buckets.blocks.push((pn, resources)),
                Response::NoResponse => {}
            }
        }

        let mut events = vec![];
        let resolution = self.resolve_buckets(&offer, buckets, ctx, &mut events);
        log::info!(
            "Player {} resolved offer [{}]: {:?}",
            self.me,
            offer,
            resolution
        );

        match &resolution {
            Resolution::Trade(trade) => events.push(Event::TradeAgreed(trade.clone())),
            Resolution::NoTrade => events.push(Event::NoTrade),
            _ => {}
        }
        self.last_resolution = Some(resolution);
        events
    }

    fn resolve_buckets(
        &mut self,
        offer: &Offer,
        buckets: Buckets,
        ctx: &NegotiationContext,
        events: &mut Vec<Event>,
    ) -> Resolution {
        let Buckets {
            accepts,
            rejects,
            counters,
            blocks,
        } = buckets;

        if !blocks.is_empty() && self.policy.comply_with_blocks {
            for (pn, resources) in &blocks {
                log::info!("Player {} asked us to stop trading [{}].", pn, resources);
                self.barriers.comply_with_block(resources, ctx.game.turn);
            }
            for (counter, ..) in &counters {
                events.push(self.trade(once(counter.from), TradeAct::Reject));
            }
            let everybody = ctx.opponents().map(|player| player.id).collect::<Vec<_>>();
            events.push(self.trade(everybody, TradeAct::BlockComply));
            return Resolution::NoTrade;
        }

        if offer.is_disjunctive() {
            let variants = offer.concrete_variants();
            let matching = counters
                .iter()
                .filter(|(counter, ..)| {
                    variants
                        .iter()
                        .any(|v| counter.give == v.get && counter.get == v.give)
                })
                .map(|(counter, ..)| counter.clone())
                .collect::<Vec<_>>();

            if let Some(chosen) = matching.choose(&mut self.rng).cloned() {
                log::info!("Player {} picked a disjunct we offered.", chosen.from);
                return self.take_counter(chosen, &accepts, &counters, events);
            }
        }

        if self.policy.prefer_better_counter && !accepts.is_empty() {
            let better = counters
                .iter()
                .map(|(counter, ..)| counter)
                .find(|counter| {
                    let strictly_better = offer.get.total() < counter.give.total()
                        || offer.give.total() > counter.get.total();
                    strictly_better
                        && self.economic.evaluate(counter, self.me, ctx, 0) == Decision::Accept
                })
                .cloned();
            if let Some(counter) = better {
                log::info!("Counter-offer of player {} beats our offer.", counter.from);
                return self.take_counter(counter, &accepts, &counters, events);
            }
        }

        if let Some(partner) = self.select_acceptor(&accepts, ctx) {
            let trade = offer.restricted_to(partner);
            events.push(self.trade(once(partner), TradeAct::Accept));
            for other in accepts.iter().copied().filter(|pn| *pn != partner) {
                events.push(self.implicit_reject(other));
            }
            for (counter, ..) in &counters {
                events.push(self.implicit_reject(counter.from));
            }
            self.session.set_negotiated(Some(trade.clone()));
            return Resolution::Trade(trade);
        }

        if !counters.is_empty() {
            let answered = counters.iter().map(|(counter, ..)| counter.clone()).collect();
            events.extend(self.handle_offers(counters, ctx));
            return Resolution::Countered(answered);
        }

        if ctx.is_my_turn() && self.policy.force_on_rejection && !self.session.forced_this_turn() {
            if let Some((forced, persuasion)) = self.forced_offer(offer, &rejects, ctx) {
                events.push(self.send_offer(forced.clone(), persuasion, true));
                return Resolution::Forced(forced);
            }
        }
        Resolution::NoTrade
    }

    /// Our offer narrowed to the first rejecting player it may be forced on.
    /// Without an argument to attach, the forcing conditions of the policy apply.
    fn forced_offer(
        &mut self,
        offer: &Offer,
        rejects: &[PlayerId],
        ctx: &NegotiationContext,
    ) -> Option<(Offer, Persuasion)> {
        for target in rejects.iter().copied() {
            if self.barriers.is_barred(target) {
                continue;
            }
            let narrowed = offer.restricted_to(target);
            if self.policy.persuasion.persuade {
                match self
                    .generator
                    .propose(&narrowed, &self.economic, true, ctx, &mut self.rng)
                {
                    Some(forced) => return Some(forced),
                    None => log::debug!("No argument to force [{}] with.", narrowed),
                }
            } else if self
                .economic
                .worth_forcing(&narrowed, target, &self.policy.forcing, ctx)
            {
                return Some((narrowed, Persuasion::Null));
            }
        }
        None
    }

    /// Accepts a counter-offer. Its author finalizes the trade.
    fn take_counter(
        &mut self,
        chosen: Offer,
        accepts: &[PlayerId],
        counters: &[(Offer, bool, Persuasion)],
        events: &mut Vec<Event>,
    ) -> Resolution {
        events.push(self.trade(once(chosen.from), TradeAct::Accept));
        for pn in accepts.iter().copied() {
            events.push(self.implicit_reject(pn));
        }
        for (counter, ..) in counters.iter().filter(|(counter, ..)| counter.from != chosen.from) {
            events.push(self.implicit_reject(counter.from));
        }
        self.session.set_negotiated(Some(chosen.clone()));
        Resolution::Countered(vec![chosen])
    }

    fn select_acceptor(&mut self, accepts: &[PlayerId], ctx: &NegotiationContext) -> Option<PlayerId> {
        let vp = |pn: PlayerId| ctx.player(pn).map(|p| p.victory_points).unwrap_or(0);
        let cards = |pn: PlayerId| ctx.player(pn).map(|p| p.resources.total()).unwrap_or(0);

        match self.policy.acceptor_selection {
            AcceptorSelection::FewestVp => accepts.iter().copied().min_by_key(|pn| (vp(*pn), *pn)),
            AcceptorSelection::FewestRes => {
                accepts.iter().copied().min_by_key(|pn| (cards(*pn), *pn))
            }
            AcceptorSelection::MostRes => accepts
                .iter()
                .copied()
                .min_by_key(|pn| (Reverse(cards(*pn)), *pn)),
            AcceptorSelection::Random => accepts.choose(&mut self.rng).copied(),
        }
    }

    /// Answers offers made to us. At most one of them is accepted. Once we
    /// accept one or send an offer of our own, the rest are rejected implicitly.
    pub(crate) fn handle_offers(
        &mut self,
        offers: Vec<(Offer, bool, Persuasion)>,
        ctx: &NegotiationContext,
    ) -> Vec<Event> {
        let mut events = vec![];
        let mut traded = false;

        for (offer, forced, persuasion) in offers {
            if traded || !self.session.is_idle() {
                events.push(self.implicit_reject(offer.from));
                continue;
            }
            if offer.is_partial() || offer.is_disjunctive() {
                events.push(self.complete(&offer, ctx));
                continue;
            }

            let decision = match self.acceptor.screen(&offer, &self.barriers, ctx) {
                Some(decision) => decision,
                None => self.acceptor.consider(
                    &offer,
                    forced,
                    &persuasion,
                    &self.economic,
                    ctx,
                    &mut self.rng,
                ),
            };
            log::info!(
                "Player {} decided {} on offer [{}].",
                self.me,
                decision,
                offer
            );

            match decision {
                Decision::Accept => {
                    events.push(self.trade(once(offer.from), TradeAct::Accept));
                    self.session.set_negotiated(Some(offer.restricted_to(self.me)));
                    traded = true;
                }
                Decision::Reject { .. } => events.extend(self.reject(&offer, ctx)),
                Decision::Counter => events.extend(self.counter(&offer, ctx)),
            }
        }
        events
    }

    /// Answers a partial or disjunctive offer with a concrete counter, if one suits us.
    fn complete(&mut self, offer: &Offer, ctx: &NegotiationContext) -> Event {
        if self.barriers.is_barred(offer.from) || !self.session.is_idle() {
            return self.trade(once(offer.from), TradeAct::Reject);
        }
        match self.economic.complete_partial_or_disjunctive(offer, ctx) {
            Some(counter) => self.send_offer(counter, Persuasion::Null, false),
            None => self.trade(once(offer.from), TradeAct::Reject),
        }
    }

    fn reject(&mut self, offer: &Offer, ctx: &NegotiationContext) -> Vec<Event> {
        if let Some(resources) = self.barriers.block_for(offer, true, true, ctx) {
            return vec![self.trade(once(offer.from), TradeAct::Block(resources))];
        }
        let mut events = vec![];
        if let Some(embargo) = self.barriers.embargo_after_offer(offer, ctx) {
            events.push(Event::Say(embargo));
        }
        events.push(self.trade(once(offer.from), TradeAct::Reject));
        events
    }

    fn counter(&mut self, offer: &Offer, ctx: &NegotiationContext) -> Vec<Event> {
        let counter = match self.economic.make_counter_offer(offer, ctx) {
            Some(counter) if self.session.is_idle() => counter,
            _ => return self.reject(offer, ctx),
        };
        let (counter, persuasion) = self
            .generator
            .propose(&counter, &self.economic, false, ctx, &mut self.rng)
            .unwrap_or((counter, Persuasion::Null));
        vec![self.send_offer(counter, persuasion, false)]
    }

    /// Reaction to an offer between other players.
    fn observe(&mut self, offer: &Offer, ctx: &NegotiationContext) -> Vec<Event> {
        if let Some(resources) = self.barriers.block_for(offer, false, false, ctx) {
            return vec![self.trade(once(offer.from), TradeAct::Block(resources))];
        }
        let mut events = vec![];
        if let Some(embargo) = self.barriers.embargo_after_offer(offer, ctx) {
            events.push(Event::Say(embargo));
        }
        events.push(self.trade(once(offer.from), TradeAct::NoResponse));
        events
    }

    /// Offer whose sender admits it is deceptive. Accepting it means we stop
    /// trading with them for good.
    pub(crate) fn on_deceptive(&mut self, message: TradeMessage, ctx: &NegotiationContext) -> Vec<Event> {
        if message.sender == self.me || !message.is_for(self.me) {
            return vec![];
        }
        let sender = message.sender;
        let offer = match message.act {
            TradeAct::Offer { offer, .. } => offer,
            act => {
                log::debug!("Ignoring deceptive {} from player {}.", act, sender);
                return vec![];
            }
        };

        if self.barriers.is_barred(sender) {
            return vec![self.trade(once(sender), TradeAct::Reject)];
        }
        if let Err(e) = legality(&offer, ctx) {
            log::info!("Rejecting deceptive offer from player {}. {}", sender, e);
            return vec![self.trade(once(sender), TradeAct::Reject)];
        }

        let events = vec![
            self.trade(once(sender), TradeAct::Accept),
            Event::Say(ChatMessage::Distrust(sender)),
        ];
        self.session.set_negotiated(Some(offer.restricted_to(self.me)));
        self.barriers.distrust(sender);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catan_negotiator_component::{ForcingPolicy, Piece, PlayerSnapshot};
    use catan_trade_model::Resource::{self, *};
    use catan_trade_model::WireFormat;

    use catan_negotiators_testing::fixtures::{ScriptedBoard, ScriptedPlanner};
    use test_case::test_case;

    struct Setup {
        game: GameSnapshot,
        planner: ScriptedPlanner,
        board: ScriptedBoard,
    }

    impl Setup {
        fn new(players: usize) -> Setup {
            let _ = env_logger::builder().is_test(true).try_init();
            Setup {
                game: GameSnapshot::new("test", (0..players).map(PlayerSnapshot::new).collect()),
                planner: ScriptedPlanner::default(),
                board: ScriptedBoard::default(),
            }
        }

        fn world(&self) -> World<'_> {
            World::new(&self.game, &self.planner, &self.board)
        }
    }

    fn policy() -> NegotiationPolicy {
        NegotiationPolicy {
            seed: Some(3),
            ..NegotiationPolicy::default()
        }
    }

    fn said(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Say(message) => Some(message.encode()),
                _ => None,
            })
            .collect()
    }

    fn answer(coordinator: &mut Coordinator, setup: &Setup, sender: PlayerId, act: TradeAct) -> Vec<Event> {
        let message = ChatMessage::Trade(TradeMessage::new(sender, once(0), act, ""));
        coordinator.hear(sender, message, &setup.world())
    }

    /// Player 0 needs wood for a road and holds spare ore.
    fn road_setup() -> Setup {
        let mut setup = Setup::new(3);
        setup.game.players[0].resources = ResourceSet::from_pairs(&[(Clay, 1), (Ore, 2)]);
        setup.game.players[1].resources = ResourceSet::from_pairs(&[(Wood, 2)]);
        setup.game.players[2].resources = ResourceSet::from_pairs(&[(Wood, 1)]);
        setup.planner.plans.insert(0, BuildPlan::single(Piece::Road));
        setup
    }

    #[test]
    fn test_offer_then_accept() {
        let setup = road_setup();
        let mut coordinator = Coordinator::new(0, policy(), GatesPack::new());

        let events = coordinator.negotiate(&setup.world());
        let offer = match &events[..] {
            [Event::Say(ChatMessage::Trade(TradeMessage {
                act: TradeAct::Offer { offer, forced, .. },
                ..
            }))] => {
                assert!(!forced);
                offer.clone()
            }
            other => panic!("Expected single offer, got {:?}", other),
        };
        assert_eq!(offer.get, ResourceSet::single(Wood));
        assert_eq!(offer.to, vec![1, 2].into_iter().collect::<BTreeSet<_>>());

        assert!(answer(&mut coordinator, &setup, 1, TradeAct::Reject).is_empty());
        let events = answer(&mut coordinator, &setup, 2, TradeAct::Accept);

        assert_eq!(
            said(&events),
            vec![format!("TRADE:0:2:ACC|nlchatstring={}", "Deal.")]
        );
        assert_eq!(
            events.last(),
            Some(&Event::TradeAgreed(offer.restricted_to(2)))
        );
        assert!(coordinator.session().is_idle());
    }

    #[test_case(AcceptorSelection::FewestVp, 1; "fewest victory points")]
    #[test_case(AcceptorSelection::FewestRes, 2; "fewest resources")]
    #[test_case(AcceptorSelection::MostRes, 1; "most resources")]
    fn test_acceptor_selection(selection: AcceptorSelection, expected: PlayerId) {
        let mut setup = road_setup();
        setup.game.players[1].victory_points = 2;
        setup.game.players[2].victory_points = 5;
        let mut coordinator = Coordinator::new(
            0,
            NegotiationPolicy {
                acceptor_selection: selection,
                ..policy()
            },
            GatesPack::new(),
        );

        coordinator.negotiate(&setup.world());
        answer(&mut coordinator, &setup, 2, TradeAct::Accept);
        let events = answer(&mut coordinator, &setup, 1, TradeAct::Accept);

        let other = 3 - expected;
        let lines = said(&events);
        assert!(lines.contains(&format!("TRADE:0:{}:ACC|nlchatstring=Deal.", expected)));
        assert!(lines.contains(&format!("TRADE:0:{}:REJ|nlchatstring={}", other, IMPLICIT_REJECT)));
        match coordinator.last_resolution() {
            Some(Resolution::Trade(trade)) => {
                assert_eq!(trade.to, once(expected).collect::<BTreeSet<_>>())
            }
            other => panic!("Expected trade, got {:?}", other),
        }
    }

    /// Counters are compared by unit counts only, so a counter that takes
    /// more from us still beats a plain accept.
    #[test]
    fn test_better_counter_by_total_count() {
        let setup = road_setup();
        let mut coordinator = Coordinator::new(0, policy(), GatesPack::new());

        coordinator.negotiate(&setup.world());
        answer(&mut coordinator, &setup, 2, TradeAct::Accept);
        let counter = Offer::new(
            "test",
            1,
            once(0),
            ResourceSet::from_pairs(&[(Wood, 1), (Sheep, 1)]),
            ResourceSet::from_pairs(&[(Ore, 2)]),
        );
        let events = answer(
            &mut coordinator,
            &setup,
            1,
            TradeAct::Offer {
                offer: counter.clone(),
                forced: false,
                persuasion: Persuasion::Null,
            },
        );

        let lines = said(&events);
        assert!(lines.contains(&"TRADE:0:1:ACC|nlchatstring=Deal.".to_string()));
        assert!(lines.contains(&format!("TRADE:0:2:REJ|nlchatstring={}", IMPLICIT_REJECT)));
        assert!(!events.iter().any(|event| matches!(event, Event::TradeAgreed(_))));
        assert_eq!(
            coordinator.last_resolution(),
            Some(&Resolution::Countered(vec![counter.clone()]))
        );
        assert_eq!(coordinator.session().negotiated(), Some(&counter));
    }

    #[test]
    fn test_comply_with_block() {
        let setup = road_setup();
        let mut coordinator = Coordinator::new(
            0,
            NegotiationPolicy {
                comply_with_blocks: true,
                ..policy()
            },
            GatesPack::new(),
        );

        coordinator.negotiate(&setup.world());
        answer(&mut coordinator, &setup, 1, TradeAct::Block(ResourceSet::single(Wood)));
        let events = answer(&mut coordinator, &setup, 2, TradeAct::Accept);

        let lines = said(&events);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("TRADE:0:1,2:BLOCK_COMPLY"));
        assert_eq!(events.last(), Some(&Event::NoTrade));
        assert_eq!(coordinator.barriers().blocked_resources(), ResourceSet::single(Wood));

        // Wood is blocked now, nothing else is missing for the road.
        let events = coordinator.negotiate(&setup.world());
        assert_eq!(events, vec![Event::NoTrade]);
    }

    #[test]
    fn test_forced_only_once() {
        let setup = road_setup();
        let mut coordinator = Coordinator::new(
            0,
            NegotiationPolicy {
                force_on_rejection: true,
                ..policy()
            },
            GatesPack::new(),
        );

        coordinator.negotiate(&setup.world());
        answer(&mut coordinator, &setup, 1, TradeAct::Reject);
        let events = answer(&mut coordinator, &setup, 2, TradeAct::Reject);

        let lines = said(&events);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("TRADE:0:1:FRC_ACC:"));
        assert!(matches!(coordinator.last_resolution(), Some(Resolution::Forced(_))));

        let events = answer(&mut coordinator, &setup, 1, TradeAct::Reject);
        assert_eq!(events, vec![Event::NoTrade]);

        // A normal offer in between doesn't allow forcing again.
        coordinator.negotiate(&setup.world());
        assert!(!coordinator.session().is_idle());
        answer(&mut coordinator, &setup, 1, TradeAct::Reject);
        let events = answer(&mut coordinator, &setup, 2, TradeAct::Reject);
        assert_eq!(events, vec![Event::NoTrade]);

        coordinator.start_turn(&setup.world());
        coordinator.negotiate(&setup.world());
        answer(&mut coordinator, &setup, 1, TradeAct::Reject);
        let events = answer(&mut coordinator, &setup, 2, TradeAct::Reject);
        assert!(said(&events)[0].starts_with("TRADE:0:1:FRC_ACC:"));
    }

    #[test_case(ForcingPolicy::default(), &[(Clay, 1), (Ore, 2)], Some(1); "first rejecting player")]
    #[test_case(
        ForcingPolicy { only_if_payable: true, ..ForcingPolicy::default() },
        &[(Clay, 1), (Ore, 2)],
        Some(2);
        "skips player without wood"
    )]
    #[test_case(
        ForcingPolicy { only_for_my_immediate_build: true, ..ForcingPolicy::default() },
        &[(Ore, 2)],
        None;
        "road still misses clay"
    )]
    fn test_forcing_conditions(
        forcing: ForcingPolicy,
        mine: &[(Resource, u32)],
        expected: Option<PlayerId>,
    ) {
        let mut setup = road_setup();
        setup.game.players[0].resources = ResourceSet::from_pairs(mine);
        setup.game.players[1].resources = ResourceSet::from_pairs(&[(Sheep, 1)]);
        let mut coordinator = Coordinator::new(
            0,
            NegotiationPolicy {
                force_on_rejection: true,
                forcing,
                ..policy()
            },
            GatesPack::new(),
        );

        let offer = Offer::new(
            "test",
            0,
            vec![1, 2],
            ResourceSet::single(Ore),
            ResourceSet::single(Wood),
        );
        coordinator.send_offer(offer.clone(), Persuasion::Null, false);
        answer(&mut coordinator, &setup, 1, TradeAct::Reject);
        answer(&mut coordinator, &setup, 2, TradeAct::Reject);

        let forced = match coordinator.last_resolution() {
            Some(Resolution::Forced(forced)) => Some(forced.clone()),
            Some(Resolution::NoTrade) => None,
            other => panic!("Unexpected resolution {:?}", other),
        };
        assert_eq!(forced, expected.map(|target| offer.restricted_to(target)));
    }

    #[test]
    fn test_offer_while_waiting_is_rejected() {
        let setup = road_setup();
        let mut coordinator = Coordinator::new(0, policy(), GatesPack::new());

        coordinator.negotiate(&setup.world());
        let ours = coordinator.session().my_offer().cloned().unwrap();
        assert!(answer(&mut coordinator, &setup, 1, TradeAct::Reject).is_empty());

        let theirs = Offer::new(
            "test",
            1,
            once(0),
            ResourceSet::single(Wood),
            ResourceSet::single(Ore),
        );
        let events = answer(
            &mut coordinator,
            &setup,
            1,
            TradeAct::Offer {
                offer: theirs,
                forced: false,
                persuasion: Persuasion::Null,
            },
        );
        assert_eq!(said(&events), vec!["TRADE:0:1:REJ|nlchatstring=No, thanks."]);
        assert_eq!(coordinator.session().negotiated(), None);
        assert!(!coordinator.session().is_idle());

        let events = answer(&mut coordinator, &setup, 2, TradeAct::Accept);
        let agreed = events
            .iter()
            .filter(|event| matches!(event, Event::TradeAgreed(_)))
            .collect::<Vec<_>>();
        assert_eq!(agreed, vec![&Event::TradeAgreed(ours.restricted_to(2))]);
        assert_eq!(coordinator.session().negotiated(), Some(&ours.restricted_to(2)));
    }

    #[test]
    fn test_counters_after_own_counter_rejected() {
        let setup = road_setup();
        let mut coordinator = Coordinator::new(0, policy(), GatesPack::new());
        coordinator.negotiate(&setup.world());

        // Player 1 asks us to name a price, player 2 makes a deal we would take.
        let partial = Offer::new(
            "test",
            1,
            once(0),
            ResourceSet::single(Wood),
            ResourceSet::new(),
        );
        let fair = Offer::new(
            "test",
            2,
            once(0),
            ResourceSet::single(Wood),
            ResourceSet::single(Ore),
        );
        let offer_of = |counter: &Offer| TradeAct::Offer {
            offer: counter.clone(),
            forced: false,
            persuasion: Persuasion::Null,
        };
        assert!(answer(&mut coordinator, &setup, 1, offer_of(&partial)).is_empty());
        let events = answer(&mut coordinator, &setup, 2, offer_of(&fair));

        let ours = match &events[..] {
            [Event::Say(ChatMessage::Trade(TradeMessage {
                act: TradeAct::Offer { offer, .. },
                ..
            })), Event::Say(_)] => offer.clone(),
            other => panic!("Expected our counter and a reject, got {:?}", other),
        };
        assert_eq!(ours.to, once(1).collect::<BTreeSet<_>>());
        assert_eq!(ours.get, ResourceSet::single(Wood));
        assert_eq!(
            said(&events)[1],
            format!("TRADE:0:2:REJ|nlchatstring={}", IMPLICIT_REJECT)
        );
        assert_eq!(
            coordinator.last_resolution(),
            Some(&Resolution::Countered(vec![partial, fair]))
        );
        assert_eq!(coordinator.session().negotiated(), None);
    }

    #[test]
    fn test_timeout_resolves() {
        let setup = road_setup();
        let mut coordinator = Coordinator::new(0, policy(), GatesPack::new());

        coordinator.negotiate(&setup.world());
        let episode = coordinator.pending_episode().unwrap();
        answer(&mut coordinator, &setup, 1, TradeAct::Accept);

        let events = coordinator.timeout(episode, &setup.world());
        assert!(matches!(events.last(), Some(Event::TradeAgreed(_))));
        assert!(coordinator.timeout(episode, &setup.world()).is_empty());
    }

    #[test]
    fn test_disjunctive_match_picks_one() {
        let mut setup = Setup::new(3);
        setup.game.players[0].resources = ResourceSet::from_pairs(&[(Wood, 1), (Clay, 1)]);
        let mut coordinator = Coordinator::new(0, policy(), GatesPack::new());

        let offer = Offer::new(
            "test",
            0,
            vec![1, 2],
            ResourceSet::from_pairs(&[(Wood, 1), (Clay, 1)]),
            ResourceSet::single(Ore),
        )
        .with_disjunctive_give();
        coordinator.send_offer(offer, Persuasion::Null, false);

        for (pn, wanted) in vec![(1, Wood), (2, Clay)] {
            let counter = Offer::new(
                "test",
                pn,
                once(0),
                ResourceSet::single(Ore),
                ResourceSet::single(wanted),
            );
            answer(
                &mut coordinator,
                &setup,
                pn,
                TradeAct::Offer {
                    offer: counter,
                    forced: false,
                    persuasion: Persuasion::Null,
                },
            );
        }

        let chosen = match coordinator.last_resolution() {
            Some(Resolution::Countered(chosen)) => chosen.clone(),
            other => panic!("Expected a chosen disjunct, got {:?}", other),
        };
        assert_eq!(chosen.len(), 1);
        assert_eq!(coordinator.session().negotiated(), Some(&chosen[0]));
    }

    #[test]
    fn test_deceptive_offer_distrusts_sender() {
        let mut setup = Setup::new(3);
        setup.game.players[0].resources = ResourceSet::from_pairs(&[(Ore, 1)]);
        setup.game.players[1].resources = ResourceSet::from_pairs(&[(Wheat, 1)]);
        let mut coordinator = Coordinator::new(0, policy(), GatesPack::new());

        let offer = Offer::new(
            "test",
            1,
            once(0),
            ResourceSet::single(Wheat),
            ResourceSet::single(Ore),
        );
        let message = ChatMessage::Deceptive(TradeMessage::new(
            1,
            once(0),
            TradeAct::Offer {
                offer,
                forced: false,
                persuasion: Persuasion::Null,
            },
            "",
        ));
        let events = coordinator.hear(1, message, &setup.world());

        let lines = said(&events);
        assert_eq!(lines[0], "TRADE:0:1:ACC|nlchatstring=Deal.");
        assert_eq!(lines[1], "ANN_DISTRUST:1");
        assert!(coordinator.barriers().is_distrusted(1));
    }
}
