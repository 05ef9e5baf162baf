//! Action definitions and the catalog players pick from.
//!
//! Every gameplay verb (gathering, crafting, construction, paid work, travel)
//! is described by data. The built-in catalog can be extended or overridden
//! from a JSON seed file so admins can tune rewards without recompiling.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::realm::errors::RealmError;
use crate::realm::types::SkillKind;
use crate::realm::xp::{MAX_LEVEL, MIN_LEVEL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Gather,
    Craft,
    Construct,
    Work,
    Travel,
}

/// Inclusive reward range; `min == max` means a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewardRange {
    pub min: u64,
    pub max: u64,
}

impl RewardRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub const fn fixed(amount: u64) -> Self {
        Self {
            min: amount,
            max: amount,
        }
    }

    pub const fn none() -> Self {
        Self { min: 0, max: 0 }
    }

    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.min >= self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuantity {
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemYield {
    pub item_id: String,
    pub min: u32,
    pub max: u32,
}

/// Longest route a travel action may define, before seasonal scaling (one week).
pub const MAX_TRAVEL_MINUTES: u32 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelLeg {
    pub from: String,
    pub destination: String,
    /// Journey length before seasonal scaling.
    pub base_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub id: String,
    pub name: String,
    pub kind: ActionKind,
    #[serde(default)]
    pub skill: Option<SkillKind>,
    #[serde(default = "default_required_level")]
    pub required_level: u8,
    pub energy_cost: u32,
    #[serde(default)]
    pub xp: RewardRange,
    #[serde(default)]
    pub gold: RewardRange,
    #[serde(default)]
    pub gold_cost: u64,
    #[serde(default)]
    pub inputs: Vec<ItemQuantity>,
    #[serde(default)]
    pub outputs: Vec<ItemYield>,
    #[serde(default)]
    pub travel: Option<TravelLeg>,
}

fn default_required_level() -> u8 {
    MIN_LEVEL
}

impl ActionDefinition {
    pub fn new(id: &str, name: &str, kind: ActionKind, energy_cost: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            skill: None,
            required_level: MIN_LEVEL,
            energy_cost,
            xp: RewardRange::none(),
            gold: RewardRange::none(),
            gold_cost: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            travel: None,
        }
    }

    pub fn with_skill(mut self, skill: SkillKind, required_level: u8) -> Self {
        self.skill = Some(skill);
        self.required_level = required_level;
        self
    }

    pub fn with_xp(mut self, min: u64, max: u64) -> Self {
        self.xp = RewardRange::new(min, max);
        self
    }

    pub fn with_gold(mut self, min: u64, max: u64) -> Self {
        self.gold = RewardRange::new(min, max);
        self
    }

    pub fn with_gold_cost(mut self, cost: u64) -> Self {
        self.gold_cost = cost;
        self
    }

    pub fn with_input(mut self, item_id: &str, quantity: u32) -> Self {
        self.inputs.push(ItemQuantity {
            item_id: item_id.to_string(),
            quantity,
        });
        self
    }

    pub fn with_output(mut self, item_id: &str, min: u32, max: u32) -> Self {
        self.outputs.push(ItemYield {
            item_id: item_id.to_string(),
            min,
            max,
        });
        self
    }

    pub fn with_travel(mut self, from: &str, destination: &str, base_minutes: u32) -> Self {
        self.travel = Some(TravelLeg {
            from: from.to_string(),
            destination: destination.to_string(),
            base_minutes,
        });
        self
    }

    pub fn validate(&self) -> Result<(), RealmError> {
        let bad = |reason: String| Err(RealmError::InvalidConfig(format!("action {}: {}", self.id, reason)));
        if self.id.trim().is_empty() {
            return Err(RealmError::InvalidConfig("action with empty id".to_string()));
        }
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.required_level) {
            return bad(format!("required level {} out of range", self.required_level));
        }
        if self.xp.min > self.xp.max {
            return bad("xp range is inverted".to_string());
        }
        if self.gold.min > self.gold.max {
            return bad("gold range is inverted".to_string());
        }
        if self.skill.is_none() && self.xp.max > 0 {
            return bad("xp reward without a skill".to_string());
        }
        if let Some(out) = self.outputs.iter().find(|o| o.min > o.max) {
            return bad(format!("yield range for {} is inverted", out.item_id));
        }
        match (&self.kind, &self.travel) {
            (ActionKind::Travel, None) => return bad("travel action without a route".to_string()),
            (ActionKind::Travel, Some(leg)) if leg.from == leg.destination => {
                return bad("route starts and ends in the same place".to_string())
            }
            (ActionKind::Travel, Some(leg))
                if leg.base_minutes == 0 || leg.base_minutes > MAX_TRAVEL_MINUTES =>
            {
                return bad(format!(
                    "route length {} minutes outside 1..={}",
                    leg.base_minutes, MAX_TRAVEL_MINUTES
                ))
            }
            (kind, Some(_)) if *kind != ActionKind::Travel => {
                return bad("only travel actions may have a route".to_string())
            }
            _ => {}
        }
        Ok(())
    }
}

/// Every random value one resolution needs, drawn up front so a retried
/// storage transaction resolves identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRolls {
    pub xp: u64,
    pub gold: u64,
    /// One entry per `outputs` element, before seasonal scaling.
    pub yields: Vec<u32>,
}

impl ActionRolls {
    pub fn roll<R: Rng + ?Sized>(action: &ActionDefinition, rng: &mut R) -> Self {
        let yields = action
            .outputs
            .iter()
            .map(|out| {
                if out.min >= out.max {
                    out.min
                } else {
                    rng.gen_range(out.min..=out.max)
                }
            })
            .collect();
        Self {
            xp: action.xp.roll(rng),
            gold: action.gold.roll(rng),
            yields,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    actions: BTreeMap<String, ActionDefinition>,
}

impl ActionCatalog {
    pub fn from_actions(actions: Vec<ActionDefinition>) -> Result<Self, RealmError> {
        let mut catalog = Self::default();
        for action in actions {
            action.validate()?;
            if catalog.actions.contains_key(&action.id) {
                return Err(RealmError::InvalidConfig(format!(
                    "duplicate action id {}",
                    action.id
                )));
            }
            catalog.actions.insert(action.id.clone(), action);
        }
        Ok(catalog)
    }

    /// Stock actions for the Ashford / Brightwater / Stonehelm starter region.
    pub fn builtin() -> Self {
        let actions = vec![
            ActionDefinition::new("chop_oak", "Chop oak trees", ActionKind::Gather, 5)
                .with_skill(SkillKind::Woodcutting, 1)
                .with_xp(20, 30)
                .with_output("oak_logs", 1, 3),
            ActionDefinition::new("chop_willow", "Chop willow trees", ActionKind::Gather, 8)
                .with_skill(SkillKind::Woodcutting, 15)
                .with_xp(60, 75)
                .with_output("willow_logs", 1, 2),
            ActionDefinition::new("mine_copper", "Mine copper ore", ActionKind::Gather, 6)
                .with_skill(SkillKind::Mining, 1)
                .with_xp(15, 20)
                .with_output("copper_ore", 1, 2),
            ActionDefinition::new("mine_iron", "Mine iron ore", ActionKind::Gather, 10)
                .with_skill(SkillKind::Mining, 15)
                .with_xp(35, 45)
                .with_output("iron_ore", 1, 2),
            ActionDefinition::new("catch_trout", "Fish for trout", ActionKind::Gather, 5)
                .with_skill(SkillKind::Fishing, 1)
                .with_xp(18, 24)
                .with_output("raw_trout", 1, 2),
            ActionDefinition::new("harvest_wheat", "Harvest wheat", ActionKind::Gather, 4)
                .with_skill(SkillKind::Farming, 1)
                .with_xp(10, 14)
                .with_output("wheat", 2, 5),
            ActionDefinition::new("smelt_copper", "Smelt a copper bar", ActionKind::Craft, 8)
                .with_skill(SkillKind::Smithing, 1)
                .with_xp(12, 12)
                .with_input("copper_ore", 2)
                .with_output("copper_bar", 1, 1),
            ActionDefinition::new("smelt_iron", "Smelt an iron bar", ActionKind::Craft, 10)
                .with_skill(SkillKind::Smithing, 15)
                .with_xp(25, 25)
                .with_input("iron_ore", 2)
                .with_output("iron_bar", 1, 1),
            ActionDefinition::new("cook_trout", "Cook a trout", ActionKind::Craft, 3)
                .with_skill(SkillKind::Cooking, 1)
                .with_xp(30, 30)
                .with_input("raw_trout", 1)
                .with_output("cooked_trout", 1, 1),
            ActionDefinition::new("build_fence", "Build a fence", ActionKind::Construct, 15)
                .with_skill(SkillKind::Construction, 1)
                .with_xp(40, 50)
                .with_gold_cost(10)
                .with_input("oak_logs", 4)
                .with_output("fence", 1, 1),
            ActionDefinition::new("guard_duty", "Stand guard at the gate", ActionKind::Work, 20)
                .with_skill(SkillKind::Defence, 5)
                .with_xp(25, 35)
                .with_gold(15, 25),
            ActionDefinition::new(
                "travel_ashford_brightwater",
                "Travel from Ashford to Brightwater",
                ActionKind::Travel,
                10,
            )
            .with_travel("ashford", "brightwater", 60),
            ActionDefinition::new(
                "travel_brightwater_ashford",
                "Travel from Brightwater to Ashford",
                ActionKind::Travel,
                10,
            )
            .with_travel("brightwater", "ashford", 60),
            ActionDefinition::new(
                "travel_ashford_stonehelm",
                "Travel from Ashford to Stonehelm",
                ActionKind::Travel,
                20,
            )
            .with_travel("ashford", "stonehelm", 120),
            ActionDefinition::new(
                "travel_stonehelm_ashford",
                "Travel from Stonehelm to Ashford",
                ActionKind::Travel,
                20,
            )
            .with_travel("stonehelm", "ashford", 120),
        ];
        let actions = actions.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self { actions }
    }

    /// Add or replace actions by id.
    pub fn extend(&mut self, actions: Vec<ActionDefinition>) -> Result<usize, RealmError> {
        let mut count = 0;
        for action in actions {
            action.validate()?;
            self.actions.insert(action.id.clone(), action);
            count += 1;
        }
        Ok(count)
    }

    pub fn get(&self, id: &str) -> Result<&ActionDefinition, RealmError> {
        self.actions
            .get(id)
            .ok_or_else(|| RealmError::UnknownAction(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Load action definitions from a JSON seed file (an array of actions).
pub fn load_actions_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<ActionDefinition>, RealmError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let actions: Vec<ActionDefinition> = serde_json::from_str(&contents)?;
    for action in &actions {
        action.validate()?;
    }
    Ok(actions)
}
