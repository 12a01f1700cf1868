//! Canonical state machine for one weapon instance.
//!
//! The authority is owned by exactly one actor task. Every intent is
//! re-validated against the state held here; nothing a client sends is
//! trusted beyond "who is asking". Accepted transitions write replicated
//! fields and append to the journal, which the actor broadcasts in order.
//!
//! States are derived from the flags:
//!
//! | state     | is_in_shoot | is_in_reload |
//! |-----------|-------------|--------------|
//! | Idle      | false       | false        |
//! | Shooting  | true        | false        |
//! | Reloading | false       | true         |

use std::sync::Arc;
use crate::domain::arbitration::{PendingRights, PickupArbitrator};
use crate::domain::collaborators::{Combatants, Physics};
use crate::domain::destruction::{DestructionTimer, TimerTick};
use crate::domain::error::{Rejection, WeaponError};
use crate::domain::reload::{policy_for, ReloadPolicy};
use crate::domain::scatter::{scatter_direction, ScatterRng};
use crate::state::{PlayerId, WeaponId};
use crate::state::commands::{ContactKind, Intent, Origin};
use crate::state::messages::EffectBroadcast;
use crate::state::replicated::Journal;
use crate::state::weapon::{WeaponFields, WeaponSnapshot};
use crate::utils::buffers::JournalVec;
use crate::utils::weapondb::{WeaponData, WeaponDb};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponState {
    Idle,
    Shooting,
    Reloading,
}

/// What an accepted intent did; the actor uses it to drive timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    ShootStarted,
    ShotFired,
    ShootFinished,
    ReloadStarted,
    ReloadProgressed,
    ReloadFinished,
    AimChanged,
    PickedUp(PlayerId),
    Discarded,
}

/// Everything the authority needs from the world
#[derive(Clone)]
pub struct Collaborators {
    pub combatants: Arc<dyn Combatants>,
    pub physics: Arc<dyn Physics>,
    pub rights: Arc<PendingRights>,
}

pub struct WeaponAuthority {
    weapon_id: WeaponId,
    def: WeaponData,
    fields: WeaponFields,
    journal: Journal,
    arbitrator: PickupArbitrator,
    timer: DestructionTimer,
    reload: Box<dyn ReloadPolicy>,
    rng: ScatterRng,
    combatants: Arc<dyn Combatants>,
    physics: Arc<dyn Physics>,
    /// ExecuteShootLogic already ran for the current StartShoot
    shot_fired: bool,
    /// Bumped on pickup and discard; scheduled commands from an older epoch are stale
    epoch: u64,
    faulted: bool,
    destroyed: bool,
}

impl WeaponAuthority {
    /// Spawn a weapon of `kind` into the world, unclaimed, with a full magazine
    pub fn init(
        weapon_id: WeaponId,
        kind: u32,
        weapons: &WeaponDb,
        collaborators: Collaborators,
        rng: ScatterRng,
    ) -> Result<Self, WeaponError> {
        let def = weapons.get(kind).ok_or(WeaponError::MissingConfig(kind))?.clone();
        def.validate()?;

        let mut fields = WeaponFields::new(def.capacity, def.initial_reserve, def.destroy_time_budget);

        // Server-side observers: physics follows the replicated flags
        let physics = collaborators.physics.clone();
        fields.is_in_player_hand.observe(move |_, held| physics.set_simulated(weapon_id, !*held));
        let physics = collaborators.physics.clone();
        fields.is_gun_active.observe(move |_, active| physics.set_pickup_sensing(weapon_id, *active));
        fields.owner_player.observe(move |old, new| {
            log::info!("Weapon {} owner {:?} -> {:?}", weapon_id, old, new);
        });

        collaborators.physics.set_simulated(weapon_id, true);
        collaborators.physics.set_pickup_sensing(weapon_id, true);

        let mut timer = DestructionTimer::new(def.destroy_time_budget);
        timer.start();

        log::info!("Weapon {} ({}) spawned", weapon_id, def.name);

        Ok(Self {
            weapon_id,
            reload: policy_for(def.reload),
            arbitrator: PickupArbitrator::new(weapon_id, collaborators.rights),
            fields,
            journal: Journal::new(),
            timer,
            rng,
            combatants: collaborators.combatants,
            physics: collaborators.physics,
            def,
            shot_fired: false,
            epoch: 0,
            faulted: false,
            destroyed: false,
        })
    }

    /// Swap the reload strategy (weapon-specific variants)
    pub fn with_reload_policy(mut self, policy: Box<dyn ReloadPolicy>) -> Self {
        self.reload = policy;
        self
    }

    pub fn weapon_id(&self) -> WeaponId {
        self.weapon_id
    }

    pub fn definition(&self) -> &WeaponData {
        &self.def
    }

    pub fn fields(&self) -> &WeaponFields {
        &self.fields
    }

    pub fn touch_set(&self) -> &[PlayerId] {
        self.arbitrator.touch_set()
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn owner(&self) -> Option<PlayerId> {
        *self.fields.owner_player.get()
    }

    pub fn state(&self) -> WeaponState {
        if *self.fields.is_in_shoot.get() {
            WeaponState::Shooting
        } else if *self.fields.is_in_reload.get() {
            WeaponState::Reloading
        } else {
            WeaponState::Idle
        }
    }

    pub fn snapshot(&self) -> WeaponSnapshot {
        self.fields.snapshot(self.weapon_id, self.def.id, self.journal.last_seq())
    }

    /// Journal entries produced since the last drain, in order
    pub fn drain_journal(&mut self) -> JournalVec {
        self.journal.take()
    }

    pub fn handle_intent(&mut self, origin: Origin, intent: Intent) -> Result<Transition, Rejection> {
        if self.faulted || self.destroyed {
            return Err(Rejection::Faulted);
        }

        let result = match intent {
            Intent::StartShoot => self.start_shoot(origin),
            Intent::ExecuteShootLogic => self.execute_shoot_logic(origin),
            Intent::FinishShoot => self.finish_shoot(origin),
            Intent::StartReload => self.start_reload(origin),
            Intent::FinishReload => self.finish_reload(origin),
            Intent::SetAim { aiming } => self.set_aim(origin, aiming),
            Intent::Pickup => self.pickup(origin),
            Intent::ForceDiscard => self.force_discard(origin),
        };

        if result.is_ok() {
            if let Err(e) = self.check_invariants() {
                log::error!("Weapon {} {}; refusing further transitions", self.weapon_id, e);
                self.faulted = true;
            }
        }
        result
    }

    pub fn handle_contact(&mut self, player: PlayerId, kind: ContactKind) {
        if self.destroyed {
            return;
        }
        let combatants = self.combatants.clone();
        let is_present = |p: PlayerId| combatants.is_present(p);
        match kind {
            ContactKind::Enter => self.arbitrator.on_candidate_enter(player, &mut self.fields, &mut self.journal, is_present),
            ContactKind::Exit => self.arbitrator.on_candidate_exit(player, &mut self.fields, &mut self.journal, is_present),
        }
    }

    /// A player disconnected: drop the weapon if they held it, forget their contact
    pub fn handle_player_left(&mut self, player: PlayerId) -> Option<Transition> {
        if self.destroyed {
            return None;
        }
        let discarded = if self.owner() == Some(player) {
            self.discard()
        } else {
            None
        };
        let combatants = self.combatants.clone();
        self.arbitrator.on_player_left(player, &mut self.fields, &mut self.journal, |p| {
            p != player && combatants.is_present(p)
        });
        discarded
    }

    /// One destruction countdown step. True when the weapon just expired.
    pub fn destruction_tick(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        match self.timer.tick(1.0) {
            TimerTick::Idle => false,
            TimerTick::Counting(left) => {
                self.journal.record(self.fields.remaining_destroy_time.set(left));
                false
            }
            TimerTick::Expired => {
                self.journal.record(self.fields.remaining_destroy_time.set(0.0));
                log::info!("Weapon {} expired unclaimed", self.weapon_id);
                self.destroyed = true;
                true
            }
        }
    }

    /// The countdown should be ticking
    pub fn timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Tear down: release every right and stop sensing. Safe to call twice.
    pub fn dispose(&mut self) {
        self.arbitrator.clear(&mut self.fields, &mut self.journal);
        self.timer.stop();
        self.reload.cancel();
        self.physics.set_pickup_sensing(self.weapon_id, false);
        self.physics.forget(self.weapon_id);
        self.destroyed = true;
    }

    fn require_holder(&self, origin: Origin) -> Result<PlayerId, Rejection> {
        let owner = match self.owner() {
            Some(owner) if *self.fields.is_in_player_hand.get() => owner,
            _ => return Err(Rejection::NotHeld),
        };
        match origin {
            Origin::Server => Ok(owner),
            Origin::Client(player) if player == owner => Ok(owner),
            Origin::Client(_) => Err(Rejection::NotHolder),
        }
    }

    fn magazine(&self) -> f32 {
        *self.fields.current_magazine_bullet_count.get()
    }

    fn reserve(&self) -> f32 {
        *self.fields.all_reserve_bullet_count.get()
    }

    fn start_shoot(&mut self, origin: Origin) -> Result<Transition, Rejection> {
        self.require_holder(origin)?;
        if *self.fields.is_in_reload.get() {
            return Err(Rejection::AlreadyReloading);
        }
        if !*self.fields.can_shoot.get() {
            return Err(Rejection::CannotShoot);
        }
        if self.magazine() <= 0.0 {
            return Err(Rejection::EmptyMagazine);
        }

        self.shot_fired = false;
        self.journal.record(self.fields.is_in_shoot.set(true));
        self.journal.record(self.fields.can_shoot.set(false));
        Ok(Transition::ShootStarted)
    }

    fn execute_shoot_logic(&mut self, origin: Origin) -> Result<Transition, Rejection> {
        let shooter = self.require_holder(origin)?;
        if !*self.fields.is_in_shoot.get() {
            return Err(Rejection::NotShooting);
        }
        if self.shot_fired {
            return Err(Rejection::AlreadyFired);
        }
        if self.magazine() <= 0.0 {
            return Err(Rejection::EmptyMagazine);
        }
        let facing = self
            .combatants
            .facing_direction(shooter)
            .and_then(|f| f.try_normalize())
            .ok_or(Rejection::StaleHolder)?;
        let origin_point = self.combatants.muzzle_origin(shooter).ok_or(Rejection::StaleHolder)?;

        let accuracy = self.effective_accuracy(shooter);
        let direction = scatter_direction(facing, self.def.base_scatter_angle, accuracy, self.rng.as_mut());

        self.shot_fired = true;
        let magazine = (self.magazine() - 1.0).max(0.0);
        self.journal.record(self.fields.current_magazine_bullet_count.set(magazine));
        self.journal.effect(EffectBroadcast::PlayMuzzleVfx);

        let end = match self.physics.raycast(origin_point, direction, self.def.range, Some(shooter)) {
            Some(hit) => {
                match hit.target {
                    Some(target) => {
                        self.combatants.apply_damage(target, self.def.damage, hit.point, hit.normal, shooter);
                    }
                    None => {
                        self.journal.effect(EffectBroadcast::SpawnHitEffect { point: hit.point, normal: hit.normal });
                    }
                }
                hit.point
            }
            None => origin_point + direction * self.def.range,
        };

        self.journal.effect(EffectBroadcast::DrawTracer { start: origin_point, end, direction });
        self.journal.effect(EffectBroadcast::EjectCasing);
        Ok(Transition::ShotFired)
    }

    fn finish_shoot(&mut self, origin: Origin) -> Result<Transition, Rejection> {
        self.require_holder(origin)?;
        if !*self.fields.is_in_shoot.get() {
            return Err(Rejection::NotShooting);
        }
        self.journal.record(self.fields.is_in_shoot.set(false));
        self.journal.record(self.fields.can_shoot.set(true));
        Ok(Transition::ShootFinished)
    }

    fn start_reload(&mut self, origin: Origin) -> Result<Transition, Rejection> {
        self.require_holder(origin)?;
        if *self.fields.is_in_reload.get() {
            return Err(Rejection::AlreadyReloading);
        }
        if *self.fields.is_in_shoot.get() {
            return Err(Rejection::Shooting);
        }
        if self.reserve() <= 0.0 {
            return Err(Rejection::NoReserve);
        }
        if self.magazine() >= self.def.capacity {
            return Err(Rejection::MagazineFull);
        }

        self.reload.begin(self.magazine(), self.reserve(), self.def.capacity);
        self.journal.record(self.fields.is_in_reload.set(true));
        self.journal.record(self.fields.can_shoot.set(false));
        Ok(Transition::ReloadStarted)
    }

    fn finish_reload(&mut self, origin: Origin) -> Result<Transition, Rejection> {
        self.require_holder(origin)?;
        if !*self.fields.is_in_reload.get() {
            return Err(Rejection::NotReloading);
        }

        let step = self.reload.step(self.magazine(), self.reserve(), self.def.capacity);
        self.journal.record(self.fields.current_magazine_bullet_count.set(step.magazine));
        self.journal.record(self.fields.all_reserve_bullet_count.set(step.reserve));

        if step.finished {
            self.journal.record(self.fields.is_in_reload.set(false));
            self.journal.record(self.fields.can_shoot.set(true));
            Ok(Transition::ReloadFinished)
        } else {
            Ok(Transition::ReloadProgressed)
        }
    }

    fn set_aim(&mut self, origin: Origin, aiming: bool) -> Result<Transition, Rejection> {
        self.require_holder(origin)?;
        self.journal.record(self.fields.is_enter_aim_state.set(aiming));
        Ok(Transition::AimChanged)
    }

    fn pickup(&mut self, origin: Origin) -> Result<Transition, Rejection> {
        let Origin::Client(player) = origin else {
            return Err(Rejection::NotCandidate);
        };
        if *self.fields.is_in_player_hand.get() {
            return Err(Rejection::AlreadyHeld);
        }
        if !*self.fields.is_gun_active.get() {
            return Err(Rejection::Inactive);
        }
        if *self.fields.current_holder_candidate.get() != Some(player) || !self.combatants.is_present(player) {
            return Err(Rejection::NotCandidate);
        }

        self.arbitrator.on_picked(&mut self.fields, &mut self.journal);
        self.journal.record(self.fields.owner_player.set(Some(player)));
        self.journal.record(self.fields.is_in_player_hand.set(true));
        self.timer.stop();
        self.journal.record(self.fields.remaining_destroy_time.set(self.timer.remaining()));
        self.epoch += 1;
        Ok(Transition::PickedUp(player))
    }

    fn force_discard(&mut self, origin: Origin) -> Result<Transition, Rejection> {
        self.require_holder(origin)?;
        self.discard().ok_or(Rejection::NotHeld)
    }

    /// Hard cancel from any state; detaches the holder and puts the weapon back in the world
    fn discard(&mut self) -> Option<Transition> {
        let owner = self.owner()?;

        self.reload.cancel();
        self.shot_fired = false;
        self.epoch += 1;
        self.journal.record(self.fields.is_in_reload.set(false));
        self.journal.record(self.fields.is_in_shoot.set(false));
        self.journal.record(self.fields.is_enter_aim_state.set(false));
        self.journal.record(self.fields.can_shoot.set(true));
        self.journal.record(self.fields.owner_player.set(None));
        self.journal.record(self.fields.is_in_player_hand.set(false));

        self.arbitrator.on_dropped(&mut self.fields, &mut self.journal);
        self.timer.start();
        self.journal.record(self.fields.remaining_destroy_time.set(self.timer.remaining()));

        log::debug!("Weapon {} discarded by player {}", self.weapon_id, owner);
        Some(Transition::Discarded)
    }

    /// Accuracy used for the server-side scatter: aiming applies the holder's bonus
    fn effective_accuracy(&self, holder: PlayerId) -> f32 {
        let base = self.def.accuracy;
        if *self.fields.is_enter_aim_state.get() {
            let bonus = self.combatants.aim_stat_bonuses(holder).accuracy;
            (base * (1.0 + bonus)).clamp(0.0, 100.0)
        } else {
            base
        }
    }

    fn check_invariants(&self) -> Result<(), WeaponError> {
        let magazine = self.magazine();
        let reserve = self.reserve();
        if !magazine.is_finite() || !reserve.is_finite() {
            return Err(WeaponError::Faulted("non-finite ammunition count"));
        }
        if magazine < 0.0 || reserve < 0.0 {
            return Err(WeaponError::Faulted("negative ammunition count"));
        }
        if magazine > self.def.capacity {
            return Err(WeaponError::Faulted("magazine over capacity"));
        }
        if *self.fields.is_in_reload.get() && *self.fields.is_in_shoot.get() {
            return Err(WeaponError::Faulted("reloading while shooting"));
        }
        if *self.fields.is_in_shoot.get() && *self.fields.can_shoot.get() {
            return Err(WeaponError::Faulted("shooting while ready to shoot"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collaborators::{AimBonuses, RayHit};
    use crate::domain::geometry::Vec2;
    use crate::domain::reload::ReloadStep;
    use crate::domain::scatter::scatter_rng;
    use crate::state::replicated::JournalEntry;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeWorld {
        present: Mutex<HashSet<PlayerId>>,
        damage: Mutex<Vec<(PlayerId, f32, PlayerId)>>,
        hit: Mutex<Option<RayHit>>,
        simulated: Mutex<Option<bool>>,
        sensing: Mutex<Option<bool>>,
    }

    impl FakeWorld {
        fn with_players(players: &[PlayerId]) -> Arc<Self> {
            let world = FakeWorld::default();
            world.present.lock().unwrap().extend(players.iter().copied());
            Arc::new(world)
        }
    }

    impl Combatants for FakeWorld {
        fn facing_direction(&self, player: PlayerId) -> Option<Vec2> {
            self.is_present(player).then_some(Vec2::RIGHT)
        }

        fn muzzle_origin(&self, player: PlayerId) -> Option<Vec2> {
            self.is_present(player).then_some(Vec2::ZERO)
        }

        fn aim_stat_bonuses(&self, _player: PlayerId) -> AimBonuses {
            AimBonuses { recoil: 0.3, view_range: 0.2, accuracy: 0.2 }
        }

        fn is_present(&self, player: PlayerId) -> bool {
            self.present.lock().unwrap().contains(&player)
        }

        fn apply_damage(&self, target: PlayerId, amount: f32, _point: Vec2, _normal: Vec2, attacker: PlayerId) {
            self.damage.lock().unwrap().push((target, amount, attacker));
        }
    }

    impl Physics for FakeWorld {
        fn raycast(&self, _origin: Vec2, _direction: Vec2, _range: f32, _ignore: Option<PlayerId>) -> Option<RayHit> {
            *self.hit.lock().unwrap()
        }

        fn set_simulated(&self, _weapon: WeaponId, simulated: bool) {
            *self.simulated.lock().unwrap() = Some(simulated);
        }

        fn set_pickup_sensing(&self, _weapon: WeaponId, enabled: bool) {
            *self.sensing.lock().unwrap() = Some(enabled);
        }
    }

    fn spawn(kind: u32, world: &Arc<FakeWorld>) -> WeaponAuthority {
        let collaborators = Collaborators {
            combatants: world.clone(),
            physics: world.clone(),
            rights: Arc::new(PendingRights::new()),
        };
        WeaponAuthority::init(1, kind, &WeaponDb::load(), collaborators, scatter_rng(Some(3))).unwrap()
    }

    /// Spawned, touched and picked up by player 1
    fn held_by_one(world: &Arc<FakeWorld>) -> WeaponAuthority {
        let mut weapon = spawn(1, world);
        weapon.handle_contact(1, ContactKind::Enter);
        weapon.handle_intent(Origin::Client(1), Intent::Pickup).unwrap();
        weapon.drain_journal();
        weapon
    }

    fn set_ammo(weapon: &mut WeaponAuthority, magazine: f32, reserve: f32) {
        weapon.fields.current_magazine_bullet_count.set(magazine);
        weapon.fields.all_reserve_bullet_count.set(reserve);
    }

    fn assert_flag_invariants(weapon: &WeaponAuthority) {
        let f = weapon.fields();
        assert!(!(*f.is_in_reload.get() && *f.is_in_shoot.get()));
        assert!(!(*f.is_in_shoot.get() && *f.can_shoot.get()));
        assert!(*f.current_magazine_bullet_count.get() >= 0.0);
        assert!(*f.all_reserve_bullet_count.get() >= 0.0);
        assert!(*f.current_magazine_bullet_count.get() <= weapon.definition().capacity);
    }

    #[test]
    fn test_missing_config_refuses_init() {
        let world = FakeWorld::with_players(&[]);
        let collaborators = Collaborators {
            combatants: world.clone(),
            physics: world.clone(),
            rights: Arc::new(PendingRights::new()),
        };
        let result = WeaponAuthority::init(1, 999, &WeaponDb::load(), collaborators, scatter_rng(Some(1)));
        assert!(matches!(result, Err(WeaponError::MissingConfig(999))));
    }

    #[test]
    fn test_spawn_turns_on_physics_and_sensing() {
        let world = FakeWorld::with_players(&[]);
        let weapon = spawn(1, &world);
        assert_eq!(*world.simulated.lock().unwrap(), Some(true));
        assert_eq!(*world.sensing.lock().unwrap(), Some(true));
        assert!(weapon.timer_running());
        assert_eq!(weapon.state(), WeaponState::Idle);
    }

    #[test]
    fn test_pickup_requires_right() {
        let world = FakeWorld::with_players(&[1, 2]);
        let mut weapon = spawn(1, &world);
        weapon.handle_contact(1, ContactKind::Enter);
        weapon.handle_contact(2, ContactKind::Enter);

        assert_eq!(weapon.handle_intent(Origin::Client(2), Intent::Pickup), Err(Rejection::NotCandidate));
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::Pickup), Ok(Transition::PickedUp(1)));

        let f = weapon.fields();
        assert_eq!(*f.owner_player.get(), Some(1));
        assert!(*f.is_in_player_hand.get());
        assert!(!*f.is_gun_active.get());
        assert_eq!(*f.current_holder_candidate.get(), None);
        assert!(weapon.touch_set().is_empty());
        assert!(!weapon.timer_running());
        assert_eq!(*world.simulated.lock().unwrap(), Some(false));
        assert_eq!(*world.sensing.lock().unwrap(), Some(false));
    }

    #[test]
    fn test_reload_round_trip() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);
        set_ammo(&mut weapon, 10.0, 50.0);

        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::StartReload), Ok(Transition::ReloadStarted));
        assert_eq!(weapon.state(), WeaponState::Reloading);
        assert!(!*weapon.fields().can_shoot.get());
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::FinishReload), Ok(Transition::ReloadFinished));

        let f = weapon.fields();
        assert_eq!(*f.current_magazine_bullet_count.get(), 30.0);
        assert_eq!(*f.all_reserve_bullet_count.get(), 30.0);
        assert!(!*f.is_in_reload.get());
        assert!(*f.can_shoot.get());
    }

    #[test]
    fn test_reload_rejected_when_full() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);
        let before = weapon.snapshot();

        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::StartReload), Err(Rejection::MagazineFull));
        assert_eq!(weapon.snapshot(), before);
        assert!(weapon.drain_journal().is_empty());
    }

    #[test]
    fn test_reload_rejected_without_reserve() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);
        set_ammo(&mut weapon, 3.0, 0.0);
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::StartReload), Err(Rejection::NoReserve));
    }

    #[test]
    fn test_last_bullet_then_empty() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);
        set_ammo(&mut weapon, 1.0, 0.0);

        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::StartShoot), Ok(Transition::ShootStarted));
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::ExecuteShootLogic), Ok(Transition::ShotFired));
        assert_eq!(*weapon.fields().current_magazine_bullet_count.get(), 0.0);
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::FinishShoot), Ok(Transition::ShootFinished));

        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::StartShoot), Err(Rejection::EmptyMagazine));
        assert_eq!(weapon.state(), WeaponState::Idle);
    }

    #[test]
    fn test_cannot_shoot_twice_without_finishing() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);

        weapon.handle_intent(Origin::Client(1), Intent::StartShoot).unwrap();
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::StartShoot), Err(Rejection::CannotShoot));
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::StartReload), Err(Rejection::Shooting));
    }

    #[test]
    fn test_one_start_shoot_fires_one_bullet() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);

        weapon.handle_intent(Origin::Client(1), Intent::StartShoot).unwrap();
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::ExecuteShootLogic), Ok(Transition::ShotFired));
        for _ in 0..29 {
            assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::ExecuteShootLogic), Err(Rejection::AlreadyFired));
        }
        assert_eq!(weapon.handle_intent(Origin::Server, Intent::ExecuteShootLogic), Err(Rejection::AlreadyFired));
        assert_eq!(*weapon.fields().current_magazine_bullet_count.get(), 29.0);

        // The next shot re-arms the latch
        weapon.handle_intent(Origin::Client(1), Intent::FinishShoot).unwrap();
        weapon.handle_intent(Origin::Client(1), Intent::StartShoot).unwrap();
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::ExecuteShootLogic), Ok(Transition::ShotFired));
        assert_eq!(*weapon.fields().current_magazine_bullet_count.get(), 28.0);
    }

    #[test]
    fn test_discard_mid_shot_resets_latch_and_bumps_epoch() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);
        let held_epoch = weapon.epoch();

        weapon.handle_intent(Origin::Client(1), Intent::StartShoot).unwrap();
        weapon.handle_intent(Origin::Client(1), Intent::ExecuteShootLogic).unwrap();
        weapon.handle_intent(Origin::Client(1), Intent::ForceDiscard).unwrap();
        assert!(weapon.epoch() > held_epoch);

        weapon.handle_contact(1, ContactKind::Enter);
        weapon.handle_intent(Origin::Client(1), Intent::Pickup).unwrap();
        weapon.handle_intent(Origin::Client(1), Intent::StartShoot).unwrap();
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::ExecuteShootLogic), Ok(Transition::ShotFired));
    }

    #[test]
    fn test_non_holder_is_rejected() {
        let world = FakeWorld::with_players(&[1, 2]);
        let mut weapon = held_by_one(&world);

        assert_eq!(weapon.handle_intent(Origin::Client(2), Intent::StartShoot), Err(Rejection::NotHolder));
        assert_eq!(weapon.handle_intent(Origin::Client(2), Intent::ForceDiscard), Err(Rejection::NotHolder));
        assert_eq!(weapon.owner(), Some(1));
    }

    #[test]
    fn test_unheld_weapon_rejects_shooting() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = spawn(1, &world);
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::StartShoot), Err(Rejection::NotHeld));
        assert_eq!(weapon.handle_intent(Origin::Server, Intent::ForceDiscard), Err(Rejection::NotHeld));
    }

    #[test]
    fn test_shot_effects_on_miss() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);

        weapon.handle_intent(Origin::Client(1), Intent::StartShoot).unwrap();
        weapon.drain_journal();
        weapon.handle_intent(Origin::Client(1), Intent::ExecuteShootLogic).unwrap();

        let effects: Vec<EffectBroadcast> = weapon
            .drain_journal()
            .into_iter()
            .filter_map(|item| match item.entry {
                JournalEntry::Effect(effect) => Some(effect),
                _ => None,
            })
            .collect();

        assert_eq!(effects.len(), 3);
        assert_eq!(effects[0], EffectBroadcast::PlayMuzzleVfx);
        match effects[1] {
            EffectBroadcast::DrawTracer { start, end, direction } => {
                assert_eq!(start, Vec2::ZERO);
                let expected = direction * 100.0;
                assert!((end.x - expected.x).abs() < 1e-3 && (end.y - expected.y).abs() < 1e-3);
                // 70 accuracy, 8 degree base: within 2.4 degrees
                assert!(Vec2::RIGHT.angle_to(direction).abs() <= 2.4 + 1e-3);
            }
            other => panic!("expected tracer, got {:?}", other),
        }
        assert_eq!(effects[2], EffectBroadcast::EjectCasing);
    }

    #[test]
    fn test_shot_damages_player_hit() {
        let world = FakeWorld::with_players(&[1, 2]);
        *world.hit.lock().unwrap() = Some(RayHit {
            point: Vec2::new(5.0, 0.0),
            normal: Vec2::new(-1.0, 0.0),
            target: Some(2),
        });
        let mut weapon = held_by_one(&world);

        weapon.handle_intent(Origin::Client(1), Intent::StartShoot).unwrap();
        weapon.handle_intent(Origin::Client(1), Intent::ExecuteShootLogic).unwrap();

        assert_eq!(*world.damage.lock().unwrap(), vec![(2, 20.0, 1)]);
        let entries = weapon.drain_journal();
        assert!(!entries.iter().any(|item| matches!(item.entry, JournalEntry::Effect(EffectBroadcast::SpawnHitEffect { .. }))));
    }

    #[test]
    fn test_shot_into_wall_spawns_hit_effect() {
        let world = FakeWorld::with_players(&[1]);
        *world.hit.lock().unwrap() = Some(RayHit {
            point: Vec2::new(3.0, 0.0),
            normal: Vec2::new(-1.0, 0.0),
            target: None,
        });
        let mut weapon = held_by_one(&world);

        weapon.handle_intent(Origin::Client(1), Intent::StartShoot).unwrap();
        weapon.handle_intent(Origin::Client(1), Intent::ExecuteShootLogic).unwrap();

        let entries = weapon.drain_journal();
        assert!(entries.iter().any(|item| item.entry
            == JournalEntry::Effect(EffectBroadcast::SpawnHitEffect {
                point: Vec2::new(3.0, 0.0),
                normal: Vec2::new(-1.0, 0.0),
            })));
        assert!(world.damage.lock().unwrap().is_empty());
    }

    #[test]
    fn test_force_discard_from_every_state() {
        let world = FakeWorld::with_players(&[1]);
        for setup in [None, Some(Intent::StartShoot), Some(Intent::StartReload)] {
            let mut weapon = held_by_one(&world);
            set_ammo(&mut weapon, 10.0, 50.0);
            weapon.handle_intent(Origin::Client(1), Intent::SetAim { aiming: true }).unwrap();
            if let Some(intent) = setup {
                weapon.handle_intent(Origin::Client(1), intent).unwrap();
            }

            assert_eq!(weapon.handle_intent(Origin::Server, Intent::ForceDiscard), Ok(Transition::Discarded));

            let f = weapon.fields();
            assert_eq!(weapon.state(), WeaponState::Idle);
            assert!(*f.can_shoot.get());
            assert!(!*f.is_enter_aim_state.get());
            assert_eq!(*f.owner_player.get(), None);
            assert!(!*f.is_in_player_hand.get());
            assert!(*f.is_gun_active.get());
            assert!(weapon.timer_running());
            assert_eq!(*f.remaining_destroy_time.get(), weapon.definition().destroy_time_budget);
        }
    }

    #[test]
    fn test_late_reload_keyframe_after_discard_is_rejected() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);
        set_ammo(&mut weapon, 10.0, 50.0);
        weapon.handle_intent(Origin::Client(1), Intent::StartReload).unwrap();
        weapon.handle_intent(Origin::Client(1), Intent::ForceDiscard).unwrap();

        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::FinishReload), Err(Rejection::NotHeld));
        assert_eq!(*weapon.fields().current_magazine_bullet_count.get(), 10.0);
    }

    #[test]
    fn test_per_round_reload_needs_several_keyframes() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = spawn(2, &world);
        weapon.handle_contact(1, ContactKind::Enter);
        weapon.handle_intent(Origin::Client(1), Intent::Pickup).unwrap();
        set_ammo(&mut weapon, 3.0, 24.0);

        weapon.handle_intent(Origin::Client(1), Intent::StartReload).unwrap();
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::FinishReload), Ok(Transition::ReloadProgressed));
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::FinishReload), Ok(Transition::ReloadProgressed));
        assert_eq!(weapon.state(), WeaponState::Reloading);
        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::FinishReload), Ok(Transition::ReloadFinished));

        assert_eq!(*weapon.fields().current_magazine_bullet_count.get(), 6.0);
        assert_eq!(*weapon.fields().all_reserve_bullet_count.get(), 21.0);
        assert_eq!(weapon.state(), WeaponState::Idle);
    }

    #[derive(Debug)]
    struct OverfillingReload;

    impl ReloadPolicy for OverfillingReload {
        fn begin(&mut self, _magazine: f32, _reserve: f32, _capacity: f32) {}

        fn step(&mut self, _magazine: f32, reserve: f32, capacity: f32) -> ReloadStep {
            ReloadStep { magazine: capacity * 2.0, reserve, finished: true }
        }
    }

    #[test]
    fn test_broken_invariant_fails_closed() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world).with_reload_policy(Box::new(OverfillingReload));
        set_ammo(&mut weapon, 10.0, 50.0);

        weapon.handle_intent(Origin::Client(1), Intent::StartReload).unwrap();
        weapon.handle_intent(Origin::Client(1), Intent::FinishReload).unwrap();
        assert!(weapon.is_faulted());

        assert_eq!(weapon.handle_intent(Origin::Client(1), Intent::SetAim { aiming: true }), Err(Rejection::Faulted));
        assert_eq!(weapon.handle_intent(Origin::Server, Intent::ForceDiscard), Err(Rejection::Faulted));
    }

    #[test]
    fn test_destroyed_once_after_budget_ticks() {
        let world = FakeWorld::with_players(&[]);
        let mut weapon = spawn(1, &world);
        let budget = weapon.definition().destroy_time_budget as usize;

        let expiries = (0..budget + 5).filter(|_| weapon.destruction_tick()).count();
        assert_eq!(expiries, 1);
        assert!(weapon.is_destroyed());
        assert_eq!(*weapon.fields().remaining_destroy_time.get(), 0.0);
    }

    #[test]
    fn test_held_weapon_does_not_count_down() {
        let world = FakeWorld::with_players(&[1]);
        let mut weapon = held_by_one(&world);
        for _ in 0..100 {
            assert!(!weapon.destruction_tick());
        }
        assert_eq!(*weapon.fields().remaining_destroy_time.get(), weapon.definition().destroy_time_budget);
    }

    #[test]
    fn test_owner_leaving_drops_weapon() {
        let world = FakeWorld::with_players(&[1, 2]);
        let mut weapon = held_by_one(&world);
        world.present.lock().unwrap().remove(&1);

        assert_eq!(weapon.handle_player_left(1), Some(Transition::Discarded));
        assert_eq!(weapon.owner(), None);

        weapon.handle_contact(2, ContactKind::Enter);
        assert_eq!(*weapon.fields().current_holder_candidate.get(), Some(2));
    }

    #[test]
    fn test_random_intent_sequences_keep_invariants() {
        use rand::{Rng, SeedableRng};
        let intents = [
            Intent::StartShoot,
            Intent::ExecuteShootLogic,
            Intent::FinishShoot,
            Intent::StartReload,
            Intent::FinishReload,
            Intent::SetAim { aiming: true },
            Intent::SetAim { aiming: false },
        ];

        let world = FakeWorld::with_players(&[1]);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(11);
        for kind in [1, 2] {
            let mut weapon = spawn(kind, &world);
            weapon.handle_contact(1, ContactKind::Enter);
            weapon.handle_intent(Origin::Client(1), Intent::Pickup).unwrap();

            for _ in 0..2_000 {
                let intent = intents[rng.gen_range(0..intents.len())];
                let _ = weapon.handle_intent(Origin::Client(1), intent);
                assert_flag_invariants(&weapon);
            }
            assert!(!weapon.is_faulted());
        }
    }

    #[test]
    fn test_dispose_releases_right() {
        let world = FakeWorld::with_players(&[1]);
        let rights = Arc::new(PendingRights::new());
        let collaborators = Collaborators {
            combatants: world.clone(),
            physics: world.clone(),
            rights: rights.clone(),
        };
        let mut weapon = WeaponAuthority::init(5, 1, &WeaponDb::load(), collaborators, scatter_rng(Some(2))).unwrap();
        weapon.handle_contact(1, ContactKind::Enter);
        assert_eq!(rights.holder_of(1), Some(5));

        weapon.dispose();
        weapon.dispose();
        assert!(rights.is_empty());
        assert!(weapon.is_destroyed());
        assert_eq!(*world.sensing.lock().unwrap(), Some(false));
    }
}
