//! Action outcome resolution.
//!
//! [`resolve_action`] is pure: it checks every precondition first and only
//! then mutates the player it was handed. The store calls it inside a sled
//! transaction on a freshly loaded record, so a rejection persists nothing.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::realm::actions::{ActionDefinition, ActionKind, ActionRolls, TravelLeg};
use crate::realm::calendar::{CalendarSnapshot, Season};
use crate::realm::energy::EnergyRules;
use crate::realm::errors::RealmError;
use crate::realm::types::{LevelChange, PlayerRecord, PlayerState, SkillKind};
use crate::realm::xp::XpCurve;

/// Numeric rules every resolution depends on.
#[derive(Debug, Clone, Default)]
pub struct GameRules {
    pub curve: XpCurve,
    pub energy: EnergyRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemDelta {
    pub item_id: String,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TravelReceipt {
    pub from: String,
    pub destination: String,
    pub minutes: i64,
    pub arrives_at: DateTime<Utc>,
}

/// Result of one resolved action, ready for the caller to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub id: Uuid,
    pub action_id: String,
    pub kind: ActionKind,
    pub energy_spent: u32,
    pub energy_remaining: u32,
    pub skill: Option<SkillKind>,
    pub xp_gained: u64,
    pub level_change: Option<LevelChange>,
    pub gold_delta: i64,
    pub items: Vec<ItemDelta>,
    pub season: Season,
    pub travel: Option<TravelReceipt>,
}

impl ActionOutcome {
    pub fn leveled_up(&self) -> bool {
        self.level_change.map(|c| c.leveled_up()).unwrap_or(false)
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "{}: -{} energy ({} left)",
            self.action_id, self.energy_spent, self.energy_remaining
        )];
        if let Some(skill) = self.skill {
            if self.xp_gained > 0 {
                parts.push(format!("+{} {} xp", self.xp_gained, skill));
            }
        }
        if let Some(change) = self.level_change.filter(|c| c.leveled_up()) {
            parts.push(format!("level {} -> {}", change.before, change.after));
        }
        if self.gold_delta != 0 {
            parts.push(format!("{:+} gold", self.gold_delta));
        }
        for item in &self.items {
            parts.push(format!("{:+} {}", item.delta, item.item_id));
        }
        if let Some(trip) = &self.travel {
            parts.push(format!(
                "arrive at {} in {} min",
                trip.destination, trip.minutes
            ));
        }
        parts.join(", ")
    }
}

/// Gathered quantity after the season's yield multiplier. A non-zero roll never
/// scales down to nothing.
pub fn scale_yield(rolled: u32, multiplier: f64) -> u32 {
    if rolled == 0 {
        return 0;
    }
    let scaled = (rolled as f64 * multiplier).round();
    if scaled < 1.0 {
        1
    } else if scaled > u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Journey length in minutes after the season's travel multiplier, at least one.
pub fn scale_travel_minutes(base_minutes: u32, multiplier: f64) -> i64 {
    ((base_minutes as f64 * multiplier).round() as i64).max(1)
}

/// Scaled journey length and arrival time, or `InvalidConfig` when the
/// arrival falls outside the representable time range.
fn plan_journey(
    leg: &TravelLeg,
    multiplier: f64,
    now: DateTime<Utc>,
) -> Result<TravelReceipt, RealmError> {
    let minutes = scale_travel_minutes(leg.base_minutes, multiplier);
    let arrives_at = Duration::try_minutes(minutes)
        .and_then(|length| now.checked_add_signed(length))
        .ok_or_else(|| {
            RealmError::InvalidConfig(format!(
                "journey {} -> {} of {} minutes is out of range",
                leg.from, leg.destination, minutes
            ))
        })?;
    Ok(TravelReceipt {
        from: leg.from.clone(),
        destination: leg.destination.clone(),
        minutes,
        arrives_at,
    })
}

/// Check every precondition of `action` against `player`, then apply it.
pub fn resolve_action(
    player: &mut PlayerRecord,
    action: &ActionDefinition,
    rolls: &ActionRolls,
    calendar: &CalendarSnapshot,
    rules: &GameRules,
    now: DateTime<Utc>,
) -> Result<ActionOutcome, RealmError> {
    player.settle_travel(now);
    if let PlayerState::Traveling {
        destination,
        arrives_at,
        ..
    } = &player.state
    {
        return Err(RealmError::InvalidActionState(format!(
            "travelling to {} until {}",
            destination,
            arrives_at.format("%H:%M UTC")
        )));
    }
    if let Some(leg) = &action.travel {
        if player.location != leg.from {
            return Err(RealmError::InvalidActionState(format!(
                "this road starts in {}, you are in {}",
                leg.from, player.location
            )));
        }
    }

    player.energy.regenerate(now, &rules.energy);
    if player.energy.current < action.energy_cost {
        return Err(RealmError::InsufficientEnergy {
            needed: action.energy_cost,
            available: player.energy.current,
        });
    }

    if let Some(skill) = action.skill {
        let current = player.skills.level(skill);
        if current < action.required_level {
            return Err(RealmError::LevelTooLow {
                skill,
                required: action.required_level,
                current,
            });
        }
    }

    let mut required: BTreeMap<&str, u64> = BTreeMap::new();
    for input in &action.inputs {
        *required.entry(input.item_id.as_str()).or_insert(0) += input.quantity as u64;
    }
    for (item_id, needed) in &required {
        let available = player.item_quantity(item_id) as u64;
        if available < *needed {
            return Err(RealmError::InsufficientResources {
                item: item_id.to_string(),
                needed: *needed,
                available,
            });
        }
    }
    if player.gold < action.gold_cost {
        return Err(RealmError::InsufficientResources {
            item: "gold".to_string(),
            needed: action.gold_cost,
            available: player.gold,
        });
    }

    let journey = match &action.travel {
        Some(leg) => Some(plan_journey(leg, calendar.modifiers.travel_multiplier, now)?),
        None => None,
    };

    // Every check passed; nothing below can fail.
    player.energy.spend(action.energy_cost)?;

    let mut deltas: BTreeMap<String, i64> = BTreeMap::new();
    for (item_id, needed) in &required {
        player.remove_item(item_id, *needed as u32);
        *deltas.entry(item_id.to_string()).or_insert(0) -= *needed as i64;
    }
    for (idx, out) in action.outputs.iter().enumerate() {
        let rolled = rolls.yields.get(idx).copied().unwrap_or(out.min);
        let quantity = if action.kind == ActionKind::Gather {
            scale_yield(rolled, calendar.modifiers.gathering_multiplier)
        } else {
            rolled
        };
        player.add_item(&out.item_id, quantity);
        *deltas.entry(out.item_id.clone()).or_insert(0) += quantity as i64;
    }

    player.gold = player.gold - action.gold_cost;
    player.gold = player.gold.saturating_add(rolls.gold);
    let gold_delta = rolls.gold as i64 - action.gold_cost as i64;

    let (xp_gained, level_change) = match action.skill {
        Some(skill) => {
            let change = player.skills.grant_xp(skill, rolls.xp, &rules.curve);
            (rolls.xp, Some(change))
        }
        None => (0, None),
    };

    let travel = journey.map(|receipt| {
        player.state = PlayerState::Traveling {
            from: receipt.from.clone(),
            destination: receipt.destination.clone(),
            departed_at: now,
            arrives_at: receipt.arrives_at,
        };
        receipt
    });

    player.updated_at = now;

    Ok(ActionOutcome {
        id: Uuid::new_v4(),
        action_id: action.id.clone(),
        kind: action.kind,
        energy_spent: action.energy_cost,
        energy_remaining: player.energy.current,
        skill: action.skill,
        xp_gained,
        level_change,
        gold_delta,
        items: deltas
            .into_iter()
            .filter(|(_, delta)| *delta != 0)
            .map(|(item_id, delta)| ItemDelta { item_id, delta })
            .collect(),
        season: calendar.season,
        travel,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::actions::ActionCatalog;
    use crate::realm::calendar::SeasonTable;
    use crate::realm::energy::EnergyState;
    use crate::realm::types::SkillSet;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
    }

    fn player(rules: &GameRules, energy: u32) -> PlayerRecord {
        let mut p = PlayerRecord::new(
            "bob",
            "Bob",
            "ashford",
            SkillSet::starting(&rules.curve),
            EnergyState::full(energy, now()),
            now(),
        );
        p.energy.max = energy.max(10);
        p
    }

    fn spring() -> CalendarSnapshot {
        CalendarSnapshot::for_day(1, &SeasonTable::default())
    }

    fn winter() -> CalendarSnapshot {
        CalendarSnapshot::for_day(274, &SeasonTable::default())
    }

    fn fixed_rolls(xp: u64, gold: u64, yields: Vec<u32>) -> ActionRolls {
        ActionRolls { xp, gold, yields }
    }

    #[test]
    fn insufficient_energy_leaves_player_untouched() {
        let rules = GameRules::default();
        let mut p = player(&rules, 10);
        let heavy = ActionDefinition::new("haul", "Haul stone", ActionKind::Work, 15);
        let before = format!("{:?}", p);
        let err = resolve_action(&mut p, &heavy, &fixed_rolls(0, 0, vec![]), &spring(), &rules, now())
            .unwrap_err();
        assert!(matches!(
            err,
            RealmError::InsufficientEnergy {
                needed: 15,
                available: 10
            }
        ));
        assert_eq!(format!("{:?}", p), before);
    }

    #[test]
    fn level_gate_rejects_low_skill() {
        let rules = GameRules::default();
        let mut p = player(&rules, 100);
        let catalog = ActionCatalog::builtin();
        let err = resolve_action(
            &mut p,
            catalog.get("mine_iron").unwrap(),
            &fixed_rolls(40, 0, vec![1]),
            &spring(),
            &rules,
            now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RealmError::LevelTooLow {
                skill: SkillKind::Mining,
                required: 15,
                current: 1
            }
        ));
        assert_eq!(p.energy.current, 100);
    }

    #[test]
    fn missing_inputs_and_gold_are_resource_errors() {
        let rules = GameRules::default();
        let catalog = ActionCatalog::builtin();
        let fence = catalog.get("build_fence").unwrap();

        let mut p = player(&rules, 100).with_item("oak_logs", 3).with_gold(50);
        let err = resolve_action(&mut p, fence, &fixed_rolls(45, 0, vec![1]), &spring(), &rules, now())
            .unwrap_err();
        assert!(matches!(
            err,
            RealmError::InsufficientResources { ref item, needed: 4, available: 3 } if item == "oak_logs"
        ));

        let mut p = player(&rules, 100).with_item("oak_logs", 4).with_gold(9);
        let err = resolve_action(&mut p, fence, &fixed_rolls(45, 0, vec![1]), &spring(), &rules, now())
            .unwrap_err();
        assert!(matches!(
            err,
            RealmError::InsufficientResources { ref item, needed: 10, available: 9 } if item == "gold"
        ));
        assert_eq!(p.item_quantity("oak_logs"), 4);
        assert_eq!(p.energy.current, 100);
    }

    #[test]
    fn construction_consumes_inputs_and_gold() {
        let rules = GameRules::default();
        let catalog = ActionCatalog::builtin();
        let mut p = player(&rules, 100).with_item("oak_logs", 6).with_gold(25);
        let out = resolve_action(
            &mut p,
            catalog.get("build_fence").unwrap(),
            &fixed_rolls(45, 0, vec![1]),
            &spring(),
            &rules,
            now(),
        )
        .expect("build");
        assert_eq!(out.energy_spent, 15);
        assert_eq!(out.energy_remaining, 85);
        assert_eq!(out.gold_delta, -10);
        assert_eq!(p.gold, 15);
        assert_eq!(p.item_quantity("oak_logs"), 2);
        assert_eq!(p.item_quantity("fence"), 1);
        assert_eq!(
            out.items,
            vec![
                ItemDelta { item_id: "fence".into(), delta: 1 },
                ItemDelta { item_id: "oak_logs".into(), delta: -4 },
            ]
        );
        assert_eq!(p.skills.xp(SkillKind::Construction), 45);
    }

    #[test]
    fn gathering_scales_with_season() {
        let rules = GameRules::default();
        let catalog = ActionCatalog::builtin();
        let wheat = catalog.get("harvest_wheat").unwrap();

        let mut summer_farmer = player(&rules, 100);
        let summer = CalendarSnapshot::for_day(92, &SeasonTable::default());
        resolve_action(&mut summer_farmer, wheat, &fixed_rolls(12, 0, vec![5]), &summer, &rules, now())
            .expect("summer harvest");
        // 5 * 1.2
        assert_eq!(summer_farmer.item_quantity("wheat"), 6);

        let mut winter_farmer = player(&rules, 100);
        resolve_action(&mut winter_farmer, wheat, &fixed_rolls(12, 0, vec![5]), &winter(), &rules, now())
            .expect("winter harvest");
        // 5 * 0.7 = 3.5 -> 4
        assert_eq!(winter_farmer.item_quantity("wheat"), 4);
    }

    #[test]
    fn crafting_outputs_are_not_season_scaled() {
        let rules = GameRules::default();
        let catalog = ActionCatalog::builtin();
        let mut p = player(&rules, 100).with_item("raw_trout", 1);
        resolve_action(
            &mut p,
            catalog.get("cook_trout").unwrap(),
            &fixed_rolls(30, 0, vec![1]),
            &winter(),
            &rules,
            now(),
        )
        .expect("cook");
        assert_eq!(p.item_quantity("cooked_trout"), 1);
        assert_eq!(p.item_quantity("raw_trout"), 0);
    }

    #[test]
    fn xp_grant_can_level_up() {
        let rules = GameRules::default();
        let catalog = ActionCatalog::builtin();
        let mut p = player(&rules, 100);
        let out = resolve_action(
            &mut p,
            catalog.get("chop_oak").unwrap(),
            &fixed_rolls(90, 0, vec![1]),
            &spring(),
            &rules,
            now(),
        )
        .expect("chop");
        assert!(out.leveled_up());
        assert_eq!(p.skills.level(SkillKind::Woodcutting), 2);
        assert_eq!(out.xp_gained, 90);
        assert!(out.summary().contains("level 1 -> 2"));
    }

    #[test]
    fn travel_blocks_further_actions_until_arrival() {
        let rules = GameRules::default();
        let catalog = ActionCatalog::builtin();
        let mut p = player(&rules, 100);
        let out = resolve_action(
            &mut p,
            catalog.get("travel_ashford_stonehelm").unwrap(),
            &fixed_rolls(0, 0, vec![]),
            &winter(),
            &rules,
            now(),
        )
        .expect("depart");
        let trip = out.travel.expect("travel receipt");
        // 120 * 1.5
        assert_eq!(trip.minutes, 180);
        assert_eq!(trip.arrives_at, now() + Duration::minutes(180));
        assert!(p.state.is_traveling());

        let chop = catalog.get("chop_oak").unwrap();
        let err = resolve_action(&mut p, chop, &fixed_rolls(20, 0, vec![1]), &winter(), &rules, now() + Duration::minutes(10))
            .unwrap_err();
        assert!(matches!(err, RealmError::InvalidActionState(_)));

        resolve_action(&mut p, chop, &fixed_rolls(20, 0, vec![1]), &winter(), &rules, trip.arrives_at)
            .expect("chop after arrival");
        assert_eq!(p.location, "stonehelm");
    }

    #[test]
    fn travel_from_wrong_town_is_invalid() {
        let rules = GameRules::default();
        let catalog = ActionCatalog::builtin();
        let mut p = player(&rules, 100);
        let err = resolve_action(
            &mut p,
            catalog.get("travel_brightwater_ashford").unwrap(),
            &fixed_rolls(0, 0, vec![]),
            &spring(),
            &rules,
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, RealmError::InvalidActionState(_)));
        assert!(err.is_rejection());
    }

    #[test]
    fn out_of_range_arrival_is_an_error_not_a_panic() {
        let rules = GameRules::default();
        let mut p = player(&rules, 100);
        let endless = ActionDefinition::new("endless", "Endless road", ActionKind::Travel, 10)
            .with_travel("ashford", "stonehelm", u32::MAX);
        let mut table = SeasonTable::default();
        table.spring.travel_multiplier = 1000.0;
        let calendar = CalendarSnapshot::for_day(1, &table);

        let before = format!("{:?}", p);
        let err = resolve_action(&mut p, &endless, &fixed_rolls(0, 0, vec![]), &calendar, &rules, now())
            .unwrap_err();
        assert!(matches!(err, RealmError::InvalidConfig(_)));
        assert!(!err.is_rejection());
        assert_eq!(format!("{:?}", p), before);
    }

    #[test]
    fn regeneration_happens_before_the_energy_check() {
        let rules = GameRules::default();
        let mut p = player(&rules, 100);
        p.energy.current = 3;
        let catalog = ActionCatalog::builtin();
        // default rules: 1 energy per 3 minutes; 6 minutes later we have 5
        let later = now() + Duration::minutes(6);
        let out = resolve_action(
            &mut p,
            catalog.get("chop_oak").unwrap(),
            &fixed_rolls(20, 0, vec![1]),
            &spring(),
            &rules,
            later,
        )
        .expect("chop with regenerated energy");
        assert_eq!(out.energy_remaining, 0);
    }

    #[test]
    fn yield_scaling_edges() {
        assert_eq!(scale_yield(0, 2.0), 0);
        assert_eq!(scale_yield(1, 0.1), 1);
        assert_eq!(scale_yield(3, 1.0), 3);
        assert_eq!(scale_travel_minutes(1, 0.1), 1);
        assert_eq!(scale_travel_minutes(60, 0.9), 54);
    }
}
