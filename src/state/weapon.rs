use serde::{Deserialize, Serialize};
use crate::state::{PlayerId, WeaponId};
use crate::state::replicated::{FieldTag, FieldValue, ReplicatedField};

/// Replicated state of one weapon instance
#[derive(Debug)]
pub struct WeaponFields {
    pub is_in_reload: ReplicatedField<bool>,
    pub is_in_shoot: ReplicatedField<bool>,
    pub can_shoot: ReplicatedField<bool>,
    pub current_magazine_bullet_count: ReplicatedField<f32>,
    pub all_reserve_bullet_count: ReplicatedField<f32>,
    pub is_enter_aim_state: ReplicatedField<bool>,
    pub remaining_destroy_time: ReplicatedField<f32>,
    pub owner_player: ReplicatedField<Option<PlayerId>>,
    pub is_in_player_hand: ReplicatedField<bool>,
    pub is_gun_active: ReplicatedField<bool>,
    pub current_holder_candidate: ReplicatedField<Option<PlayerId>>,
}

impl WeaponFields {
    /// Fresh weapon lying in the world
    pub fn new(magazine: f32, reserve: f32, destroy_time_budget: f32) -> Self {
        Self {
            is_in_reload: ReplicatedField::new(FieldTag::IsInReload, false),
            is_in_shoot: ReplicatedField::new(FieldTag::IsInShoot, false),
            can_shoot: ReplicatedField::new(FieldTag::CanShoot, true),
            current_magazine_bullet_count: ReplicatedField::new(FieldTag::CurrentMagazineBulletCount, magazine),
            all_reserve_bullet_count: ReplicatedField::new(FieldTag::AllReserveBulletCount, reserve),
            is_enter_aim_state: ReplicatedField::new(FieldTag::IsEnterAimState, false),
            remaining_destroy_time: ReplicatedField::new(FieldTag::RemainingDestroyTime, destroy_time_budget),
            owner_player: ReplicatedField::new(FieldTag::OwnerPlayer, None),
            is_in_player_hand: ReplicatedField::new(FieldTag::IsInPlayerHand, false),
            is_gun_active: ReplicatedField::new(FieldTag::IsGunActive, true),
            current_holder_candidate: ReplicatedField::new(FieldTag::CurrentHolderCandidate, None),
        }
    }

    /// Apply a wire change to the matching field, firing its hooks
    pub fn apply(&mut self, field: FieldTag, value: FieldValue) -> bool {
        match field {
            FieldTag::IsInReload => self.is_in_reload.apply(value),
            FieldTag::IsInShoot => self.is_in_shoot.apply(value),
            FieldTag::CanShoot => self.can_shoot.apply(value),
            FieldTag::CurrentMagazineBulletCount => self.current_magazine_bullet_count.apply(value),
            FieldTag::AllReserveBulletCount => self.all_reserve_bullet_count.apply(value),
            FieldTag::IsEnterAimState => self.is_enter_aim_state.apply(value),
            FieldTag::RemainingDestroyTime => self.remaining_destroy_time.apply(value),
            FieldTag::OwnerPlayer => self.owner_player.apply(value),
            FieldTag::IsInPlayerHand => self.is_in_player_hand.apply(value),
            FieldTag::IsGunActive => self.is_gun_active.apply(value),
            FieldTag::CurrentHolderCandidate => self.current_holder_candidate.apply(value),
        }
    }

    pub fn snapshot(&self, weapon_id: WeaponId, kind: u32, seq: u64) -> WeaponSnapshot {
        WeaponSnapshot {
            weapon_id,
            kind,
            seq,
            is_in_reload: *self.is_in_reload.get(),
            is_in_shoot: *self.is_in_shoot.get(),
            can_shoot: *self.can_shoot.get(),
            current_magazine_bullet_count: *self.current_magazine_bullet_count.get(),
            all_reserve_bullet_count: *self.all_reserve_bullet_count.get(),
            is_enter_aim_state: *self.is_enter_aim_state.get(),
            remaining_destroy_time: *self.remaining_destroy_time.get(),
            owner_player: *self.owner_player.get(),
            is_in_player_hand: *self.is_in_player_hand.get(),
            is_gun_active: *self.is_gun_active.get(),
            current_holder_candidate: *self.current_holder_candidate.get(),
        }
    }

    /// Overwrite every field from a snapshot; hooks fire for the ones that differ
    pub fn restore(&mut self, snapshot: &WeaponSnapshot) {
        self.is_in_reload.set(snapshot.is_in_reload);
        self.is_in_shoot.set(snapshot.is_in_shoot);
        self.can_shoot.set(snapshot.can_shoot);
        self.current_magazine_bullet_count.set(snapshot.current_magazine_bullet_count);
        self.all_reserve_bullet_count.set(snapshot.all_reserve_bullet_count);
        self.is_enter_aim_state.set(snapshot.is_enter_aim_state);
        self.remaining_destroy_time.set(snapshot.remaining_destroy_time);
        self.owner_player.set(snapshot.owner_player);
        self.is_in_player_hand.set(snapshot.is_in_player_hand);
        self.is_gun_active.set(snapshot.is_gun_active);
        self.current_holder_candidate.set(snapshot.current_holder_candidate);
    }
}

/// Full replicated state at journal position `seq`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSnapshot {
    pub weapon_id: WeaponId,
    pub kind: u32,
    pub seq: u64,
    pub is_in_reload: bool,
    pub is_in_shoot: bool,
    pub can_shoot: bool,
    pub current_magazine_bullet_count: f32,
    pub all_reserve_bullet_count: f32,
    pub is_enter_aim_state: bool,
    pub remaining_destroy_time: f32,
    pub owner_player: Option<PlayerId>,
    pub is_in_player_hand: bool,
    pub is_gun_active: bool,
    pub current_holder_candidate: Option<PlayerId>,
}
