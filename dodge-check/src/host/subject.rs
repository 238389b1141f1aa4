//! Subject Profiles
//!
//! Character data the arbiter's draft is prefilled from.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::game::state::{SessionConfig, SubjectRef};
use crate::host::SubjectRegistry;

/// DC proposed to the arbiter.
pub const DEFAULT_DIFFICULTY_CLASS: i32 = 15;

/// Rogue level granting reliable talent.
pub const RELIABLE_TALENT_ROGUE_LEVEL: u32 = 11;

/// Inventory item category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Armor, shields, clothing
    Equipment,
    /// Weapons
    Weapon,
    /// Potions, scrolls, ammunition
    Consumable,
    /// Kits and instruments
    Tool,
    /// Everything else
    Loot,
}

/// An inventory item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    /// Display name
    pub name: String,
    /// Category; only worn equipment affects stealth
    pub kind: ItemKind,
    /// Currently worn
    pub equipped: bool,
    /// Imposes disadvantage on stealth (heavy or medium armor)
    pub stealth_disadvantage: bool,
}

/// Character data relevant to a stealth check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    /// Reference
    pub subject_ref: SubjectRef,
    /// Display name
    pub name: String,
    /// Total stealth modifier
    pub stealth_bonus: i32,
    /// Inventory
    pub equipment: Vec<Equipment>,
    /// Levels in the rogue class
    pub rogue_level: u32,
}

impl SubjectProfile {
    /// Any worn equipment imposes stealth disadvantage.
    pub fn has_armor_disadvantage(&self) -> bool {
        self.equipment
            .iter()
            .any(|e| e.kind == ItemKind::Equipment && e.equipped && e.stealth_disadvantage)
    }

    /// Rogue 11+.
    pub fn has_reliable_talent(&self) -> bool {
        self.rogue_level >= RELIABLE_TALENT_ROGUE_LEVEL
    }

    /// Prefilled config for the arbiter to edit.
    pub fn draft_config(&self) -> SessionConfig {
        SessionConfig {
            subject_ref: self.subject_ref.clone(),
            difficulty_class: DEFAULT_DIFFICULTY_CLASS,
            skill_bonus: self.stealth_bonus,
            has_disadvantage: self.has_armor_disadvantage(),
            has_advantage: false,
            has_reliable_talent: self.has_reliable_talent(),
        }
    }
}

/// Registry backed by a map.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    subjects: BTreeMap<SubjectRef, SubjectProfile>,
}

impl InMemoryRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a subject.
    pub fn insert(&mut self, profile: SubjectProfile) {
        self.subjects.insert(profile.subject_ref.clone(), profile);
    }

    /// Builder-style insert.
    pub fn with(mut self, profile: SubjectProfile) -> Self {
        self.insert(profile);
        self
    }
}

impl SubjectRegistry for InMemoryRegistry {
    fn profile(&self, subject: &SubjectRef) -> Option<SubjectProfile> {
        self.subjects.get(subject).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SubjectProfile {
        SubjectProfile {
            subject_ref: SubjectRef::new("actor-1"),
            name: "Vex".to_string(),
            stealth_bonus: 7,
            equipment: vec![
                Equipment {
                    name: "Chain Mail".into(),
                    kind: ItemKind::Equipment,
                    equipped: false,
                    stealth_disadvantage: true,
                },
                Equipment {
                    name: "Cloak".into(),
                    kind: ItemKind::Equipment,
                    equipped: true,
                    stealth_disadvantage: false,
                },
            ],
            rogue_level: 5,
        }
    }

    #[test]
    fn test_draft_defaults() {
        let draft = profile().draft_config();
        assert_eq!(draft.difficulty_class, DEFAULT_DIFFICULTY_CLASS);
        assert_eq!(draft.skill_bonus, 7);
        assert!(!draft.has_disadvantage);
        assert!(!draft.has_advantage);
        assert!(!draft.has_reliable_talent);
    }

    #[test]
    fn test_only_equipped_armor_counts() {
        let mut p = profile();
        assert!(!p.has_armor_disadvantage());

        p.equipment[0].equipped = true;
        assert!(p.has_armor_disadvantage());
        assert!(p.draft_config().has_disadvantage);
    }

    #[test]
    fn test_non_equipment_items_ignored() {
        let mut p = profile();
        p.equipment.push(Equipment {
            name: "Clanking Warhammer".into(),
            kind: ItemKind::Weapon,
            equipped: true,
            stealth_disadvantage: true,
        });
        p.equipment.push(Equipment {
            name: "Bag of Bells".into(),
            kind: ItemKind::Loot,
            equipped: true,
            stealth_disadvantage: true,
        });

        assert!(!p.has_armor_disadvantage());
        assert!(!p.draft_config().has_disadvantage);
    }

    #[test]
    fn test_reliable_talent_threshold() {
        let mut p = profile();
        p.rogue_level = 10;
        assert!(!p.has_reliable_talent());
        p.rogue_level = 11;
        assert!(p.draft_config().has_reliable_talent);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = InMemoryRegistry::new().with(profile());
        assert!(registry.profile(&SubjectRef::new("actor-1")).is_some());
        assert!(registry.profile(&SubjectRef::new("actor-2")).is_none());
    }
}
