use std::collections::BTreeSet;
use std::iter::once;
use std::time::Duration;

use catan_negotiators::factory::AgentConfig;
use catan_negotiators::model::Resource::*;
use catan_negotiators::model::{
    ChatMessage, EmbargoAction, Offer, ResourceSet, TradeAct, TradeMessage,
};
use catan_negotiators::{NegotiationPolicy, Piece};
use catan_negotiators_testing::{agent_config, offer_line, trade_line, Scenario};

/// Player 0 holds a spare wood and needs clay for a road.
fn road_scenario(players: usize) -> Scenario {
    Scenario::new(players)
        .hand(0, &[(Wood, 2)])
        .plan(0, Piece::Road)
        .hand(1, &[(Clay, 2)])
}

fn offers_of(messages: &[ChatMessage]) -> Vec<(Offer, bool)> {
    messages
        .iter()
        .filter_map(|message| match message {
            ChatMessage::Trade(TradeMessage {
                act: TradeAct::Offer { offer, forced, .. },
                ..
            }) => Some((offer.clone(), *forced)),
            _ => None,
        })
        .collect()
}

#[actix_rt::test]
async fn test_two_agents_trade() {
    let scenario = road_scenario(2).plan(1, Piece::Road);
    let mut table = scenario
        .table(vec![
            agent_config(0, NegotiationPolicy::default()),
            agent_config(1, NegotiationPolicy::default()),
        ])
        .unwrap();

    table.start_turn(0).await.unwrap();
    table.negotiate(0).await.unwrap();
    let record = table.run_until_quiet().await.unwrap();

    let offers = offers_of(&record.messages_of(0));
    assert_eq!(offers.len(), 1);
    let (offer, forced) = &offers[0];
    assert!(!forced);
    assert_eq!(offer.give, ResourceSet::single(Wood));
    assert_eq!(offer.get, ResourceSet::single(Clay));

    // Only the author of the offer executes the trade.
    assert_eq!(record.trades.len(), 1, "{}", record);
    assert_eq!(record.trades_of(0), vec![&offer.restricted_to(1)]);
    assert!(record.trades_of(1).is_empty());
    assert!(record.no_trades.is_empty());
}

#[actix_rt::test]
async fn test_silent_players_time_out() {
    let mut table = road_scenario(3)
        .hand(2, &[(Clay, 1)])
        .table(vec![agent_config(0, NegotiationPolicy::default())])
        .unwrap();

    table.start_turn(0).await.unwrap();
    table.negotiate(0).await.unwrap();
    let record = table.run_until_quiet().await.unwrap();

    assert_eq!(record.said_by(0).len(), 1);
    assert!(record.trades.is_empty());
    assert_eq!(record.no_trades, vec![0]);
}

#[actix_rt::test]
async fn test_accept_collected_before_timeout() {
    let mut table = road_scenario(3)
        .hand(2, &[(Clay, 1)])
        .table(vec![agent_config(0, NegotiationPolicy::default())])
        .unwrap();

    table.start_turn(0).await.unwrap();
    table.negotiate(0).await.unwrap();
    table
        .say(1, &trade_line(1, once(0), TradeAct::Accept))
        .await
        .unwrap();
    let record = table.run_until_quiet().await.unwrap();

    let trades = record.trades_of(0);
    assert_eq!(trades.len(), 1, "{}", record);
    assert_eq!(trades[0].to, once(1).collect::<BTreeSet<_>>());
}

#[actix_rt::test]
async fn test_single_commitment_per_offer() {
    let mut table = road_scenario(3)
        .hand(2, &[(Clay, 1)])
        .table(vec![agent_config(0, NegotiationPolicy::default())])
        .unwrap();

    table.start_turn(0).await.unwrap();
    table.negotiate(0).await.unwrap();
    table
        .say(1, &trade_line(1, once(0), TradeAct::Reject))
        .await
        .unwrap();
    let own = Offer::new(
        "test",
        1,
        once(0),
        ResourceSet::single(Clay),
        ResourceSet::single(Wood),
    );
    table.say(1, &offer_line(own)).await.unwrap();
    table
        .say(2, &trade_line(2, once(0), TradeAct::Accept))
        .await
        .unwrap();
    let record = table.run_until_quiet().await.unwrap();

    let answers = record
        .messages_of(0)
        .into_iter()
        .filter_map(|message| match message {
            ChatMessage::Trade(TradeMessage { receivers, act, .. })
                if act == TradeAct::Accept || act == TradeAct::Reject =>
            {
                Some((receivers, act))
            }
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        answers,
        vec![
            (once(1).collect::<BTreeSet<_>>(), TradeAct::Reject),
            (once(2).collect::<BTreeSet<_>>(), TradeAct::Accept),
        ],
        "{}",
        record
    );
    assert_eq!(record.trades_of(0).len(), 1);
}

#[actix_rt::test]
async fn test_forced_offer_sent_once() {
    let policy = NegotiationPolicy {
        force_on_rejection: true,
        ..NegotiationPolicy::default()
    };
    let mut table = road_scenario(3)
        .hand(2, &[(Clay, 1)])
        .table(vec![agent_config(0, policy)])
        .unwrap();

    table.start_turn(0).await.unwrap();
    table.negotiate(0).await.unwrap();
    for pn in 1..=2 {
        table
            .say(pn, &trade_line(pn, once(0), TradeAct::Reject))
            .await
            .unwrap();
    }
    table
        .say(1, &trade_line(1, once(0), TradeAct::Reject))
        .await
        .unwrap();
    let record = table.run_until_quiet().await.unwrap();

    let offers = offers_of(&record.messages_of(0));
    assert_eq!(offers.len(), 2, "{}", record);
    assert!(!offers[0].1);
    assert!(offers[1].1);
    assert_eq!(offers[1].0.to, once(1).collect::<BTreeSet<_>>());
    assert_eq!(record.no_trades, vec![0]);
}

#[actix_rt::test]
async fn test_comply_with_block_of_observer() {
    let mut withdrawing = agent_config(
        0,
        NegotiationPolicy {
            comply_with_blocks: true,
            ..NegotiationPolicy::default()
        },
    );
    withdrawing.policy.response_timeout = Duration::from_secs(5);
    let mut blocking = agent_config(1, NegotiationPolicy::default());
    blocking.policy.blocking.block_trades_not_to_me = true;

    // Only player 2 has clay, player 0 leads.
    let mut table = Scenario::new(3)
        .hand(0, &[(Wood, 2)])
        .plan(0, Piece::Road)
        .hand(2, &[(Clay, 1)])
        .victory_points(0, 4)
        .table(vec![withdrawing, blocking])
        .unwrap();

    table.start_turn(0).await.unwrap();
    table.negotiate(0).await.unwrap();
    table.run_until_quiet().await.unwrap();
    assert!(table.record.said_by(1)[0].contains("BLOCK#"));

    table
        .say(2, &trade_line(2, once(0), TradeAct::Accept))
        .await
        .unwrap();
    let record = table.run_until_quiet().await.unwrap();

    let comply = record.messages_of(0).into_iter().find(|message| {
        matches!(message, ChatMessage::Trade(TradeMessage { act: TradeAct::BlockComply, .. }))
    });
    match comply {
        Some(ChatMessage::Trade(message)) => {
            assert_eq!(message.receivers, vec![1, 2].into_iter().collect::<BTreeSet<_>>())
        }
        other => panic!("Expected block comply, got {:?}", other),
    }
    assert!(record.trades.is_empty());
    assert_eq!(record.no_trades, vec![0]);

    // Clay is blocked now, so nothing is worth offering.
    table.negotiate(0).await.unwrap();
    let record = table.run_until_quiet().await.unwrap();
    assert_eq!(record.no_trades, vec![0, 0]);
    assert_eq!(record.said_by(0).len(), 2);
}

#[actix_rt::test]
async fn test_join_embargo() {
    let mut policy = NegotiationPolicy::default();
    policy.blocking.comply_with_embargoes = true;
    let mut table = road_scenario(3)
        .hand(2, &[(Clay, 3), (Ore, 1)])
        .table(vec![agent_config(0, policy)])
        .unwrap();

    table.start_turn(0).await.unwrap();
    table.say(1, "EMBARGO:1:PROPOSE:2").await.unwrap();
    table.run_until_quiet().await.unwrap();
    assert_eq!(
        table.record.messages_of(0),
        vec![ChatMessage::Embargo {
            proposer: 0,
            action: EmbargoAction::Comply,
            target: 2
        }]
    );

    // Embargoed player gets no offers and is refused.
    let generous = Offer::new(
        "test",
        2,
        once(0),
        ResourceSet::single(Clay),
        ResourceSet::single(Wood),
    );
    table.say(2, &offer_line(generous)).await.unwrap();
    table.run_until_quiet().await.unwrap();
    match table.record.messages_of(0).last() {
        Some(ChatMessage::Trade(message)) => {
            assert_eq!(message.act, TradeAct::Reject);
            assert_eq!(message.receivers, once(2).collect::<BTreeSet<_>>());
        }
        other => panic!("Expected reject, got {:?}", other),
    }

    table.negotiate(0).await.unwrap();
    let record = table.run_until_quiet().await.unwrap();
    let offers = offers_of(&record.messages_of(0));
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].0.to, once(1).collect::<BTreeSet<_>>());
}

#[actix_rt::test]
async fn test_deceptive_offer_ends_trust() {
    let mut table = road_scenario(3)
        .hand(1, &[(Clay, 2), (Wheat, 1)])
        .table(vec![agent_config(0, NegotiationPolicy::default())])
        .unwrap();

    table.start_turn(1).await.unwrap();
    let offer = Offer::new(
        "test",
        1,
        once(0),
        ResourceSet::single(Wheat),
        ResourceSet::single(Wood),
    );
    let line = offer_line(offer).replacen("TRADE:", "JTRD:", 1);
    table.say(1, &line).await.unwrap();
    let record = table.run_until_quiet().await.unwrap();

    let messages = record.messages_of(0);
    assert!(matches!(
        &messages[0],
        ChatMessage::Trade(TradeMessage { act: TradeAct::Accept, .. })
    ));
    assert_eq!(messages[1], ChatMessage::Distrust(1));

    // Clay offered by the deceiver is refused, even though player 0 needs it.
    let offer = Offer::new(
        "test",
        1,
        once(0),
        ResourceSet::single(Clay),
        ResourceSet::single(Wood),
    );
    table.say(1, &offer_line(offer)).await.unwrap();
    let record = table.run_until_quiet().await.unwrap();
    assert!(matches!(
        record.messages_of(0).last(),
        Some(ChatMessage::Trade(TradeMessage { act: TradeAct::Reject, .. }))
    ));
}

#[actix_rt::test]
async fn test_share_build_plan() {
    let mut policy = NegotiationPolicy::default();
    policy.sharing.build_plan = true;
    let mut table = road_scenario(2)
        .table(vec![agent_config(0, policy)])
        .unwrap();

    table.say(1, "REQ:BP").await.unwrap();
    table.say(1, "REQ:RES").await.unwrap();
    let record = table.run_until_quiet().await.unwrap();

    assert_eq!(record.said_by(0), vec!["ANN:BP:ROAD"]);
}

#[actix_rt::test]
async fn test_agent_from_yaml_config() {
    let config: AgentConfig = serde_yaml::from_str(
        r#"
player: 1
policy:
  response_timeout: 100ms
  seed: 11
  persuasion:
    consider: true
gates:
  - name: PersuaderMinVp
    params:
      min_vp: 3
"#,
    )
    .unwrap();

    let mut table = road_scenario(2)
        .plan(1, Piece::Road)
        .table(vec![agent_config(0, NegotiationPolicy::default()), config])
        .unwrap();

    table.start_turn(0).await.unwrap();
    table.negotiate(0).await.unwrap();
    let record = table.run_until_quiet().await.unwrap();
    assert_eq!(record.trades_of(0).len(), 1, "{}", record);
}

#[actix_rt::test]
async fn test_seat_taken() {
    let table = road_scenario(2)
        .table(vec![agent_config(0, NegotiationPolicy::default())])
        .unwrap();
    let scenario = road_scenario(2);

    let result = table.seat(
        agent_config(0, NegotiationPolicy::default()),
        Box::new(scenario.planner.clone()),
        Box::new(scenario.board.clone()),
    );
    assert!(result.is_err());
}
