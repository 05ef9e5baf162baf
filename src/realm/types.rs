use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::realm::energy::EnergyState;
use crate::realm::xp::{XpCurve, MAX_LEVEL, MIN_LEVEL};

pub const PLAYER_SCHEMA_VERSION: u8 = 1;
pub const CALENDAR_SCHEMA_VERSION: u8 = 1;

/// Level every combat skill starts at when a character is created.
pub const COMBAT_STARTING_LEVEL: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Attack,
    Strength,
    Defence,
    Ranged,
    Hitpoints,
    Woodcutting,
    Mining,
    Fishing,
    Farming,
    Smithing,
    Crafting,
    Cooking,
    Construction,
}

impl SkillKind {
    pub const ALL: [SkillKind; 13] = [
        SkillKind::Attack,
        SkillKind::Strength,
        SkillKind::Defence,
        SkillKind::Ranged,
        SkillKind::Hitpoints,
        SkillKind::Woodcutting,
        SkillKind::Mining,
        SkillKind::Fishing,
        SkillKind::Farming,
        SkillKind::Smithing,
        SkillKind::Crafting,
        SkillKind::Cooking,
        SkillKind::Construction,
    ];

    pub fn is_combat(&self) -> bool {
        matches!(
            self,
            SkillKind::Attack
                | SkillKind::Strength
                | SkillKind::Defence
                | SkillKind::Ranged
                | SkillKind::Hitpoints
        )
    }

    pub fn starting_level(&self) -> u8 {
        if self.is_combat() {
            COMBAT_STARTING_LEVEL
        } else {
            MIN_LEVEL
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillKind::Attack => "attack",
            SkillKind::Strength => "strength",
            SkillKind::Defence => "defence",
            SkillKind::Ranged => "ranged",
            SkillKind::Hitpoints => "hitpoints",
            SkillKind::Woodcutting => "woodcutting",
            SkillKind::Mining => "mining",
            SkillKind::Fishing => "fishing",
            SkillKind::Farming => "farming",
            SkillKind::Smithing => "smithing",
            SkillKind::Crafting => "crafting",
            SkillKind::Cooking => "cooking",
            SkillKind::Construction => "construction",
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SkillKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown skill '{}'", s))
    }
}

/// Level transition produced by granting XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub before: u8,
    pub after: u8,
}

impl LevelChange {
    pub fn leveled_up(&self) -> bool {
        self.after > self.before
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub kind: SkillKind,
    pub level: u8,
    pub xp: u64,
}

impl Skill {
    /// A skill sitting exactly on the threshold of `level`.
    pub fn at_level(kind: SkillKind, level: u8, curve: &XpCurve) -> Self {
        let level = level.clamp(MIN_LEVEL, MAX_LEVEL);
        Self {
            kind,
            level,
            xp: curve.xp_for_level(level),
        }
    }

    /// Add XP and recompute the level. XP saturates instead of wrapping.
    pub fn grant_xp(&mut self, amount: u64, curve: &XpCurve) -> LevelChange {
        let before = self.level;
        self.xp = self.xp.saturating_add(amount);
        self.level = curve.level_for_xp(self.xp);
        LevelChange {
            before,
            after: self.level,
        }
    }

    pub fn progress_percent(&self, curve: &XpCurve) -> f64 {
        curve.progress_percent(self.level, self.xp)
    }
}

/// Every skill a character owns, keyed by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSet {
    skills: BTreeMap<SkillKind, Skill>,
}

impl SkillSet {
    /// Starting skills for a fresh character.
    pub fn starting(curve: &XpCurve) -> Self {
        let skills = SkillKind::ALL
            .iter()
            .map(|kind| (*kind, Skill::at_level(*kind, kind.starting_level(), curve)))
            .collect();
        Self { skills }
    }

    pub fn get(&self, kind: SkillKind) -> Option<&Skill> {
        self.skills.get(&kind)
    }

    pub fn level(&self, kind: SkillKind) -> u8 {
        self.skills.get(&kind).map(|s| s.level).unwrap_or(MIN_LEVEL)
    }

    pub fn xp(&self, kind: SkillKind) -> u64 {
        self.skills.get(&kind).map(|s| s.xp).unwrap_or(0)
    }

    /// Grant XP to one skill, creating it at level 1 if the record predates the skill.
    pub fn grant_xp(&mut self, kind: SkillKind, amount: u64, curve: &XpCurve) -> LevelChange {
        self.skills
            .entry(kind)
            .or_insert_with(|| Skill::at_level(kind, MIN_LEVEL, curve))
            .grant_xp(amount, curve)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Skill> {
        self.skills.values()
    }

    /// Sum of all skill levels.
    pub fn total_level(&self) -> u32 {
        self.skills.values().map(|s| s.level as u32).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Idle,
    Traveling {
        from: String,
        destination: String,
        departed_at: DateTime<Utc>,
        arrives_at: DateTime<Utc>,
    },
}

impl PlayerState {
    pub fn is_traveling(&self) -> bool {
        matches!(self, PlayerState::Traveling { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub username: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub location: String,
    pub state: PlayerState,
    pub energy: EnergyState,
    pub skills: SkillSet,
    pub gold: u64,
    #[serde(default)]
    pub inventory: BTreeMap<String, u32>,
    pub schema_version: u8,
}

impl PlayerRecord {
    pub fn new(
        username: &str,
        display_name: &str,
        location: &str,
        skills: SkillSet,
        energy: EnergyState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.to_ascii_lowercase(),
            display_name: display_name.to_string(),
            created_at: now,
            updated_at: now,
            location: location.to_string(),
            state: PlayerState::Idle,
            energy,
            skills,
            gold: 0,
            inventory: BTreeMap::new(),
            schema_version: PLAYER_SCHEMA_VERSION,
        }
    }

    pub fn with_gold(mut self, gold: u64) -> Self {
        self.gold = gold;
        self
    }

    pub fn with_item(mut self, item_id: &str, quantity: u32) -> Self {
        self.add_item(item_id, quantity);
        self
    }

    pub fn item_quantity(&self, item_id: &str) -> u32 {
        self.inventory.get(item_id).copied().unwrap_or(0)
    }

    pub fn add_item(&mut self, item_id: &str, quantity: u32) {
        if quantity == 0 {
            return;
        }
        let slot = self.inventory.entry(item_id.to_string()).or_insert(0);
        *slot = slot.saturating_add(quantity);
    }

    /// Remove items; returns false (and changes nothing) when the stack is too small.
    pub fn remove_item(&mut self, item_id: &str, quantity: u32) -> bool {
        let held = self.item_quantity(item_id);
        if held < quantity {
            return false;
        }
        if held == quantity {
            self.inventory.remove(item_id);
        } else {
            self.inventory.insert(item_id.to_string(), held - quantity);
        }
        true
    }

    /// Finish a journey whose arrival time has passed. Returns the arrival location.
    pub fn settle_travel(&mut self, now: DateTime<Utc>) -> Option<String> {
        let PlayerState::Traveling {
            destination,
            arrives_at,
            ..
        } = &self.state
        else {
            return None;
        };
        if now < *arrives_at {
            return None;
        }
        let destination = destination.clone();
        self.location = destination.clone();
        self.state = PlayerState::Idle;
        Some(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::energy::EnergyState;
    use chrono::Duration;

    fn fresh(curve: &XpCurve) -> PlayerRecord {
        let now = Utc::now();
        PlayerRecord::new(
            "Alice",
            "Alice of Ashford",
            "ashford",
            SkillSet::starting(curve),
            EnergyState::full(100, now),
            now,
        )
    }

    #[test]
    fn new_character_starting_levels() {
        let curve = XpCurve::classic();
        let player = fresh(&curve);
        assert_eq!(player.username, "alice");

        let attack = player.skills.get(SkillKind::Attack).expect("attack");
        assert_eq!(attack.level, 5);
        assert_eq!(attack.xp, curve.xp_for_level(5));

        let woodcutting = player.skills.get(SkillKind::Woodcutting).expect("woodcutting");
        assert_eq!(woodcutting.level, 1);
        assert_eq!(woodcutting.xp, curve.xp_for_level(1));

        assert_eq!(player.skills.total_level(), 5 * 5 + 8);
    }

    #[test]
    fn grant_xp_reports_level_ups() {
        let curve = XpCurve::classic();
        let mut skills = SkillSet::starting(&curve);
        let change = skills.grant_xp(SkillKind::Mining, 82, &curve);
        assert!(!change.leveled_up());
        let change = skills.grant_xp(SkillKind::Mining, 1, &curve);
        assert_eq!(change, LevelChange { before: 1, after: 2 });
        assert!(change.leveled_up());
    }

    #[test]
    fn xp_past_the_top_threshold_keeps_max_level() {
        let curve = XpCurve::classic();
        let mut skill = Skill::at_level(SkillKind::Fishing, 99, &curve);
        skill.grant_xp(5_000_000, &curve);
        assert_eq!(skill.level, 99);
        assert_eq!(skill.xp, curve.xp_for_level(99) + 5_000_000);
        assert_eq!(skill.progress_percent(&curve), 100.0);
    }

    #[test]
    fn inventory_removal_is_all_or_nothing() {
        let curve = XpCurve::classic();
        let mut player = fresh(&curve).with_item("logs", 3);
        assert!(!player.remove_item("logs", 4));
        assert_eq!(player.item_quantity("logs"), 3);
        assert!(player.remove_item("logs", 3));
        assert!(!player.inventory.contains_key("logs"));
    }

    #[test]
    fn travel_settles_only_after_arrival() {
        let curve = XpCurve::classic();
        let mut player = fresh(&curve);
        let now = Utc::now();
        player.state = PlayerState::Traveling {
            from: "ashford".into(),
            destination: "brightwater".into(),
            departed_at: now,
            arrives_at: now + Duration::minutes(30),
        };
        assert_eq!(player.settle_travel(now + Duration::minutes(29)), None);
        assert_eq!(
            player.settle_travel(now + Duration::minutes(30)).as_deref(),
            Some("brightwater")
        );
        assert_eq!(player.location, "brightwater");
        assert_eq!(player.state, PlayerState::Idle);
    }

    #[test]
    fn skill_names_parse_case_insensitively() {
        assert_eq!("Woodcutting".parse::<SkillKind>(), Ok(SkillKind::Woodcutting));
        assert!("sorcery".parse::<SkillKind>().is_err());
    }
}
