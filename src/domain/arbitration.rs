//! Who may pick up a dropped weapon.
//!
//! Each weapon keeps an insertion-ordered touch set of the players inside
//! its pickup volume and grants at most one of them the pickup right. A
//! player can hold a pending right on only one weapon at a time; that is
//! tracked in [`PendingRights`], shared by every weapon actor, so the check
//! is a single map lookup rather than a scan over weapons.

use std::sync::Arc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use crate::state::{PlayerId, WeaponId};
use crate::state::replicated::Journal;
use crate::state::weapon::WeaponFields;
use crate::utils::buffers::SmallPlayerVec;

/// Player -> weapon it currently holds a pending pickup right on
#[derive(Debug, Default)]
pub struct PendingRights {
    rights: DashMap<PlayerId, WeaponId>,
}

impl PendingRights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right for `player` on `weapon`.
    /// True if granted now or already held on the same weapon.
    pub fn try_claim(&self, player: PlayerId, weapon: WeaponId) -> bool {
        match self.rights.entry(player) {
            Entry::Occupied(entry) => *entry.get() == weapon,
            Entry::Vacant(entry) => {
                entry.insert(weapon);
                true
            }
        }
    }

    /// Drop `player`'s right, but only if it still points at `weapon`
    pub fn release(&self, player: PlayerId, weapon: WeaponId) {
        self.rights.remove_if(&player, |_, held| *held == weapon);
    }

    pub fn holder_of(&self, player: PlayerId) -> Option<WeaponId> {
        self.rights.get(&player).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.rights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rights.is_empty()
    }
}

#[derive(Debug)]
pub struct PickupArbitrator {
    weapon_id: WeaponId,
    touch_set: SmallPlayerVec,
    rights: Arc<PendingRights>,
}

impl PickupArbitrator {
    pub fn new(weapon_id: WeaponId, rights: Arc<PendingRights>) -> Self {
        Self {
            weapon_id,
            touch_set: SmallPlayerVec::new(),
            rights,
        }
    }

    pub fn touch_set(&self) -> &[PlayerId] {
        &self.touch_set
    }

    pub fn on_candidate_enter(
        &mut self,
        player: PlayerId,
        fields: &mut WeaponFields,
        journal: &mut Journal,
        is_present: impl Fn(PlayerId) -> bool,
    ) {
        if !*fields.is_gun_active.get() {
            log::debug!("Weapon {} inactive, ignoring contact from player {}", self.weapon_id, player);
            return;
        }
        if !is_present(player) {
            log::debug!("Weapon {} ignoring contact from absent player {}", self.weapon_id, player);
            return;
        }

        if !self.touch_set.contains(&player) {
            self.touch_set.push(player);
        }

        if fields.current_holder_candidate.get().is_none() && self.rights.try_claim(player, self.weapon_id) {
            log::debug!("Weapon {} granted pickup right to player {}", self.weapon_id, player);
            journal.record(fields.current_holder_candidate.set(Some(player)));
        }
    }

    pub fn on_candidate_exit(
        &mut self,
        player: PlayerId,
        fields: &mut WeaponFields,
        journal: &mut Journal,
        is_present: impl Fn(PlayerId) -> bool,
    ) {
        self.touch_set.retain(|p| *p != player);

        if *fields.current_holder_candidate.get() == Some(player) {
            self.rights.release(player, self.weapon_id);
            journal.record(fields.current_holder_candidate.set(None));
            self.transfer(fields, journal, is_present);
        }
    }

    /// A disconnected player leaves every touch set it was in
    pub fn on_player_left(
        &mut self,
        player: PlayerId,
        fields: &mut WeaponFields,
        journal: &mut Journal,
        is_present: impl Fn(PlayerId) -> bool,
    ) {
        self.on_candidate_exit(player, fields, journal, is_present);
    }

    /// Hand the vacant right to the earliest toucher without another pending right
    fn transfer(
        &mut self,
        fields: &mut WeaponFields,
        journal: &mut Journal,
        is_present: impl Fn(PlayerId) -> bool,
    ) {
        self.touch_set.retain(|p| is_present(*p));

        let weapon_id = self.weapon_id;
        let rights = &self.rights;
        let next = self
            .touch_set
            .iter()
            .copied()
            .find(|p| rights.try_claim(*p, weapon_id));

        match next {
            Some(player) => log::debug!("Weapon {} pickup right moved to player {}", weapon_id, player),
            None => log::debug!("Weapon {} pickup right vacant", weapon_id),
        }
        journal.record(fields.current_holder_candidate.set(next));
    }

    /// Weapon equipped: interaction off, all arbitration state cleared
    pub fn on_picked(&mut self, fields: &mut WeaponFields, journal: &mut Journal) {
        journal.record(fields.is_gun_active.set(false));
        self.clear(fields, journal);
    }

    /// Weapon back in the world: interaction on, sensing starts from scratch
    pub fn on_dropped(&mut self, fields: &mut WeaponFields, journal: &mut Journal) {
        self.clear(fields, journal);
        journal.record(fields.is_gun_active.set(true));
    }

    /// Release the granted right and forget every toucher
    pub fn clear(&mut self, fields: &mut WeaponFields, journal: &mut Journal) {
        if let Some(candidate) = *fields.current_holder_candidate.get() {
            self.rights.release(candidate, self.weapon_id);
        }
        self.touch_set.clear();
        journal.record(fields.current_holder_candidate.set(None));
    }
}
