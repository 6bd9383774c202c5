//! Effects of a hypothetical build on the bonuses and score ranking.
//!
//! All functions work on snapshots and never modify shared state. What-ifs are
//! expressed with `PlayerSnapshot::with_*` copies by the callers.
use catan_negotiator_component::{
    NegotiationContext, PlayerSnapshot, RoadPlacement, SettlementPlacement,
};
use catan_trade_model::{BonusChange, Resource};

pub const MIN_LONGEST_ROAD: u32 = 5;
pub const MIN_LARGEST_ARMY: u32 = 3;

/// Longest road standing of `player` after adding the road described by `placement`.
pub fn longest_road_change(
    ctx: &NegotiationContext,
    player: &PlayerSnapshot,
    placement: &RoadPlacement,
) -> Option<BonusChange> {
    let new_length = placement.road_length;
    let holder = ctx.game.players.iter().find(|p| p.has_longest_road);
    match holder {
        Some(holder) if holder.id == player.id => {
            Some(BonusChange::Keep).filter(|_| new_length > player.longest_road_length)
        }
        Some(holder) if new_length > holder.longest_road_length => Some(BonusChange::Get),
        Some(holder) if new_length == holder.longest_road_length => Some(BonusChange::Equal),
        Some(_) => None,
        None => Some(BonusChange::Get).filter(|_| new_length >= MIN_LONGEST_ROAD),
    }
}

/// Largest army standing of `player`, assuming the bought card is a knight.
pub fn largest_army_change(ctx: &NegotiationContext, player: &PlayerSnapshot) -> Option<BonusChange> {
    let knights = player.with_knight().knights;
    let holder = ctx.game.players.iter().find(|p| p.has_largest_army);
    match holder {
        Some(holder) if holder.id == player.id => Some(BonusChange::Keep),
        Some(holder) if knights > holder.knights => Some(BonusChange::Get),
        Some(holder) if knights == holder.knights => Some(BonusChange::Equal),
        Some(_) => None,
        None => Some(BonusChange::Get).filter(|_| knights >= MIN_LARGEST_ARMY),
    }
}

/// Score ranking of `player` after gaining one victory point.
pub fn victory_points_change(ctx: &NegotiationContext, player: &PlayerSnapshot) -> Option<BonusChange> {
    let old = player.victory_points;
    let new = old + 1;
    let highest = ctx.highest_vp_except(player.id);

    if old > highest {
        Some(BonusChange::Keep)
    } else if new > highest {
        Some(BonusChange::Get)
    } else if new == highest {
        Some(BonusChange::Equal)
    } else {
        None
    }
}

pub fn opens_settlement_spot(player: &PlayerSnapshot, placement: &RoadPlacement) -> bool {
    player.with_road(placement).settlement_spots > player.settlement_spots
}

/// Resource types a new settlement would add to the player's production.
pub fn new_resources(
    player: &PlayerSnapshot,
    placement: &SettlementPlacement,
    discount_robber: bool,
) -> Vec<Resource> {
    let after = player.with_settlement(placement);
    Resource::CONCRETE
        .iter()
        .copied()
        .filter(|res| {
            !player.produces(*res, discount_robber) && after.produces(*res, discount_robber)
        })
        .collect()
}

/// Common change of several players. `Keep` can't be shared.
pub fn agree(changes: &[Option<BonusChange>]) -> Option<BonusChange> {
    let first = (*changes.first()?)?;
    if first == BonusChange::Keep && changes.len() > 1 {
        return None;
    }
    changes
        .iter()
        .all(|change| *change == Some(first))
        .then(|| first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Fixture;
    use catan_trade_model::PlayerId;
    use test_case::test_case;

    #[test]
    fn test_longest_road_get_without_holder() {
        let fixture = Fixture::new(3);
        let ctx = fixture.context(0);
        let player = &fixture.game.players[1];

        let short = RoadPlacement {
            road_length: 4,
            settlement_spots: 0,
        };
        let long = RoadPlacement {
            road_length: 5,
            settlement_spots: 0,
        };
        assert_eq!(longest_road_change(&ctx, player, &short), None);
        assert_eq!(longest_road_change(&ctx, player, &long), Some(BonusChange::Get));
    }

    #[test]
    fn test_longest_road_against_holder() {
        let mut fixture = Fixture::new(3);
        fixture.game.players[2].has_longest_road = true;
        fixture.game.players[2].longest_road_length = 6;
        let ctx = fixture.context(0);
        let player = &fixture.game.players[1];

        let placement = |road_length| RoadPlacement {
            road_length,
            settlement_spots: 0,
        };
        assert_eq!(longest_road_change(&ctx, player, &placement(6)), Some(BonusChange::Equal));
        assert_eq!(longest_road_change(&ctx, player, &placement(7)), Some(BonusChange::Get));
        assert_eq!(longest_road_change(&ctx, player, &placement(5)), None);
    }

    #[test_case(None, 2, Some(BonusChange::Get); "third knight without holder")]
    #[test_case(None, 1, None; "too few knights")]
    #[test_case(Some((1, 4)), 4, Some(BonusChange::Keep); "own army")]
    #[test_case(Some((2, 3)), 3, Some(BonusChange::Get); "overtakes holder")]
    #[test_case(Some((2, 3)), 2, Some(BonusChange::Equal); "ties holder")]
    #[test_case(Some((2, 5)), 2, None; "far behind holder")]
    fn test_largest_army_change(holder: Option<(PlayerId, u32)>, knights: u32, expected: Option<BonusChange>) {
        let mut fixture = Fixture::new(3);
        if let Some((holder, holder_knights)) = holder {
            fixture.game.players[holder].has_largest_army = true;
            fixture.game.players[holder].knights = holder_knights;
        }
        fixture.game.players[1].knights = knights;
        let ctx = fixture.context(0);

        assert_eq!(largest_army_change(&ctx, &fixture.game.players[1]), expected);
    }

    #[test]
    fn test_victory_points_change() {
        let mut fixture = Fixture::new(3);
        fixture.game.players[0].victory_points = 5;
        fixture.game.players[1].victory_points = 4;
        fixture.game.players[2].victory_points = 3;
        let ctx = fixture.context(0);

        assert_eq!(
            victory_points_change(&ctx, &fixture.game.players[0]),
            Some(BonusChange::Keep)
        );
        assert_eq!(
            victory_points_change(&ctx, &fixture.game.players[1]),
            Some(BonusChange::Equal)
        );
        assert_eq!(victory_points_change(&ctx, &fixture.game.players[2]), None);
    }

    #[test]
    fn test_agree() {
        use BonusChange::*;
        assert_eq!(agree(&[Some(Get), Some(Get)]), Some(Get));
        assert_eq!(agree(&[Some(Get), Some(Equal)]), None);
        assert_eq!(agree(&[Some(Keep)]), Some(Keep));
        assert_eq!(agree(&[Some(Keep), Some(Keep)]), None);
        assert_eq!(agree(&[None]), None);
    }
}
