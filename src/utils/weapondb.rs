use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::domain::error::WeaponError;

/// How a weapon refills its magazine on `FinishReload`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReloadKind {
    /// Single keyframe moves everything that fits
    Lump,
    /// One keyframe per step, e.g. shells into a tube magazine
    PerRound { rounds_per_step: u32 },
}

/// Static weapon definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponData {
    pub id: u32,
    pub name: String,
    pub damage: f32,
    pub range: f32,
    pub capacity: f32,
    pub initial_reserve: f32,
    /// Widest scatter in degrees, reached at 0 accuracy
    pub base_scatter_angle: f32,
    /// 0..=100
    pub accuracy: f32,
    pub recoil: f32,
    pub view_range: f32,
    /// Seconds a dropped weapon lies in the world before despawning
    pub destroy_time_budget: f32,
    pub reload: ReloadKind,
}

impl WeaponData {
    /// Refuse definitions that would leave shoot/reload numerically undefined
    pub fn validate(&self) -> Result<(), WeaponError> {
        let finite = [
            self.damage,
            self.range,
            self.capacity,
            self.initial_reserve,
            self.base_scatter_angle,
            self.accuracy,
            self.recoil,
            self.view_range,
            self.destroy_time_budget,
        ]
        .iter()
        .all(|v| v.is_finite());

        if !finite {
            return Err(WeaponError::InvalidConfig("non-finite stat"));
        }
        if self.capacity <= 0.0 {
            return Err(WeaponError::InvalidConfig("capacity must be positive"));
        }
        if self.initial_reserve < 0.0 {
            return Err(WeaponError::InvalidConfig("negative reserve"));
        }
        if self.range <= 0.0 {
            return Err(WeaponError::InvalidConfig("range must be positive"));
        }
        if !(0.0..=100.0).contains(&self.accuracy) {
            return Err(WeaponError::InvalidConfig("accuracy must be within 0..=100"));
        }
        if self.recoil < 0.0 || self.view_range < 0.0 {
            return Err(WeaponError::InvalidConfig("negative recoil or view range"));
        }
        if self.destroy_time_budget <= 0.0 {
            return Err(WeaponError::InvalidConfig("destroy time budget must be positive"));
        }
        if let ReloadKind::PerRound { rounds_per_step: 0 } = self.reload {
            return Err(WeaponError::InvalidConfig("per-round reload needs a step size"));
        }
        Ok(())
    }
}

/// Immutable weapon database - loaded once at startup
/// Zero contention, passed by Arc reference
#[derive(Debug, Clone)]
pub struct WeaponDb {
    weapons: HashMap<u32, WeaponData>,
}

impl WeaponDb {
    /// Load weapon database with hardcoded data
    pub fn load() -> Self {
        let mut weapons = HashMap::new();

        weapons.insert(1, WeaponData {
            id: 1,
            name: "Golden Friend".to_string(),
            damage: 20.0,
            range: 100.0,
            capacity: 30.0,
            initial_reserve: 90.0,
            base_scatter_angle: 8.0,
            accuracy: 70.0,
            recoil: 1.0,
            view_range: 12.0,
            destroy_time_budget: 30.0,
            reload: ReloadKind::Lump,
        });

        weapons.insert(2, WeaponData {
            id: 2,
            name: "Prototype".to_string(),
            damage: 45.0,
            range: 30.0,
            capacity: 6.0,
            initial_reserve: 24.0,
            base_scatter_angle: 15.0,
            accuracy: 40.0,
            recoil: 2.5,
            view_range: 9.0,
            destroy_time_budget: 30.0,
            reload: ReloadKind::PerRound { rounds_per_step: 1 },
        });

        weapons.insert(3, WeaponData {
            id: 3,
            name: "Longshot".to_string(),
            damage: 80.0,
            range: 250.0,
            capacity: 5.0,
            initial_reserve: 20.0,
            base_scatter_angle: 4.0,
            accuracy: 90.0,
            recoil: 3.0,
            view_range: 20.0,
            destroy_time_budget: 45.0,
            reload: ReloadKind::Lump,
        });

        Self { weapons }
    }

    /// Get weapon by ID
    pub fn get(&self, id: u32) -> Option<&WeaponData> {
        self.weapons.get(&id)
    }

    /// Check if weapon exists
    pub fn contains(&self, id: u32) -> bool {
        self.weapons.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeaponData> {
        self.weapons.values()
    }

    /// Get default weapon ID (Golden Friend)
    pub fn default_weapon_id() -> u32 {
        1
    }
}
