use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use smallvec::SmallVec;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use crate::domain::arbitration::PendingRights;
use crate::domain::collaborators::{AimBonuses, Combatants};
use crate::domain::geometry::Vec2;
use crate::state::{PlayerId, WeaponId};
use crate::state::commands::WeaponCommand;
use crate::state::weapon::WeaponSnapshot;
use crate::utils::buffers::SmallPlayerVec;

pub const MAX_HEALTH: f32 = 100.0;

/// Distance from a player's centre to the muzzle along its facing
pub const MUZZLE_OFFSET: f32 = 0.6;

/// Handle to a weapon with its command queue, actor task and latest published state
pub struct WeaponHandle {
    pub command_tx: mpsc::Sender<WeaponCommand>,
    pub task_handle: JoinHandle<()>,
    pub snapshot: watch::Receiver<WeaponSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// Same id from the same address
    Refreshed,
    /// Id is live at another address
    Refused,
}

/// Connected player as the weapon subsystem sees it
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub position: Vec2,
    pub facing: Vec2,
    pub health: f32,
    pub addr: SocketAddr,
    pub last_update: SystemTime,
    pub aim_bonuses: AimBonuses,
}

impl PlayerRecord {
    pub fn new(id: PlayerId, name: String, addr: SocketAddr) -> Self {
        Self {
            id,
            name,
            position: Vec2::ZERO,
            facing: Vec2::RIGHT,
            health: MAX_HEALTH,
            addr,
            last_update: SystemTime::now(),
            aim_bonuses: AimBonuses::default(),
        }
    }
}

/// Server state partitioned by weapon
/// Uses DashMap for concurrent access without global locks
pub struct ServerState {
    weapons: DashMap<WeaponId, WeaponHandle>,
    players: DashMap<PlayerId, PlayerRecord>,
    rights: Arc<PendingRights>,
    next_weapon_id: AtomicU32,
    /// Live weapons plus spawns in flight; bounded by `max_weapons`
    weapon_slots: AtomicUsize,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            weapons: DashMap::new(),
            players: DashMap::new(),
            rights: Arc::new(PendingRights::new()),
            next_weapon_id: AtomicU32::new(1),
            weapon_slots: AtomicUsize::new(0),
        }
    }

    /// Pending pickup rights shared by every weapon actor
    pub fn rights(&self) -> Arc<PendingRights> {
        self.rights.clone()
    }

    /// Generate next weapon ID (lock-free)
    pub fn next_weapon_id(&self) -> WeaponId {
        self.next_weapon_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Get command sender for a weapon (for UDP handlers)
    pub fn get_weapon_tx(&self, weapon_id: WeaponId) -> Option<mpsc::Sender<WeaponCommand>> {
        self.weapons.get(&weapon_id).map(|entry| entry.command_tx.clone())
    }

    /// Every weapon's command sender, for fan-out
    pub fn weapon_senders(&self) -> Vec<mpsc::Sender<WeaponCommand>> {
        self.weapons.iter().map(|entry| entry.command_tx.clone()).collect()
    }

    pub fn weapon_exists(&self, weapon_id: WeaponId) -> bool {
        self.weapons.contains_key(&weapon_id)
    }

    pub fn insert_weapon(&self, weapon_id: WeaponId, handle: WeaponHandle) {
        self.weapons.insert(weapon_id, handle);
    }

    /// Removing a weapon frees its slot
    pub fn remove_weapon(&self, weapon_id: WeaponId) -> Option<WeaponHandle> {
        let removed = self.weapons.remove(&weapon_id).map(|(_, handle)| handle);
        if removed.is_some() {
            self.release_weapon_slot();
        }
        removed
    }

    /// Claim a slot before spawning; false once `max` slots are taken
    pub fn try_reserve_weapon_slot(&self, max: usize) -> bool {
        self.weapon_slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| (taken < max).then_some(taken + 1))
            .is_ok()
    }

    /// Give back a slot whose spawn failed or whose weapon is gone
    pub fn release_weapon_slot(&self) {
        let _ = self
            .weapon_slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| taken.checked_sub(1));
    }

    pub fn reserved_weapon_slots(&self) -> usize {
        self.weapon_slots.load(Ordering::Acquire)
    }

    /// Latest state the weapon's actor published
    pub fn weapon_snapshot(&self, weapon_id: WeaponId) -> Option<WeaponSnapshot> {
        self.weapons.get(&weapon_id).map(|entry| entry.snapshot.borrow().clone())
    }

    pub fn weapon_snapshots(&self) -> Vec<WeaponSnapshot> {
        let mut snapshots: Vec<WeaponSnapshot> = self
            .weapons
            .iter()
            .map(|entry| entry.snapshot.borrow().clone())
            .collect();
        snapshots.sort_by_key(|s| s.weapon_id);
        snapshots
    }

    pub fn weapon_count(&self) -> usize {
        self.weapons.len()
    }

    /// Register a player, or refresh one re-joining from its registered address.
    /// A live id is never handed to another address; the inactivity sweep frees it first.
    pub fn upsert_player(&self, player_id: PlayerId, name: String, addr: SocketAddr) -> JoinOutcome {
        match self.players.entry(player_id) {
            Entry::Occupied(mut entry) => {
                let player = entry.get_mut();
                if player.addr != addr {
                    return JoinOutcome::Refused;
                }
                player.last_update = SystemTime::now();
                JoinOutcome::Refreshed
            }
            Entry::Vacant(entry) => {
                entry.insert(PlayerRecord::new(player_id, name, addr));
                JoinOutcome::Joined
            }
        }
    }

    pub fn remove_player(&self, player_id: PlayerId) -> Option<PlayerRecord> {
        self.players.remove(&player_id).map(|(_, player)| player)
    }

    pub fn player(&self, player_id: PlayerId) -> Option<PlayerRecord> {
        self.players.get(&player_id).map(|entry| entry.clone())
    }

    pub fn player_exists(&self, player_id: PlayerId) -> bool {
        self.players.contains_key(&player_id)
    }

    /// The datagram really comes from where `player_id` registered
    pub fn player_addr_matches(&self, player_id: PlayerId, addr: SocketAddr) -> bool {
        self.players.get(&player_id).map_or(false, |p| p.addr == addr)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Update position and facing; false for unknown players
    pub fn update_position(&self, player_id: PlayerId, position: Vec2, facing: Vec2) -> bool {
        let Some(mut player) = self.players.get_mut(&player_id) else {
            return false;
        };
        player.position = position;
        if let Some(facing) = facing.try_normalize() {
            player.facing = facing;
        }
        player.last_update = SystemTime::now();
        true
    }

    /// Heartbeat: refresh the timestamp; false for unknown players or a foreign address
    pub fn touch_player(&self, player_id: PlayerId, addr: SocketAddr) -> bool {
        match self.players.get_mut(&player_id) {
            Some(mut player) if player.addr == addr => {
                player.last_update = SystemTime::now();
                true
            }
            _ => false,
        }
    }

    pub fn set_aim_bonuses(&self, player_id: PlayerId, bonuses: AimBonuses) {
        if let Some(mut player) = self.players.get_mut(&player_id) {
            player.aim_bonuses = bonuses;
        }
    }

    /// Addresses of every connected player, for broadcast
    pub fn player_addrs(&self) -> SmallVec<[SocketAddr; 8]> {
        self.players.iter().map(|entry| entry.addr).collect()
    }

    pub fn player_positions(&self) -> SmallVec<[(PlayerId, Vec2); 8]> {
        self.players.iter().map(|entry| (entry.id, entry.position)).collect()
    }

    /// Players silent for longer than `timeout`
    pub fn stale_players(&self, timeout: Duration) -> SmallPlayerVec {
        let now = SystemTime::now();
        self.players
            .iter()
            .filter(|entry| {
                now.duration_since(entry.last_update)
                    .map(|elapsed| elapsed > timeout)
                    .unwrap_or(false)
            })
            .map(|entry| entry.id)
            .collect()
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

impl Combatants for ServerState {
    fn facing_direction(&self, player: PlayerId) -> Option<Vec2> {
        self.players.get(&player).map(|p| p.facing)
    }

    fn muzzle_origin(&self, player: PlayerId) -> Option<Vec2> {
        self.players.get(&player).map(|p| p.position + p.facing * MUZZLE_OFFSET)
    }

    fn aim_stat_bonuses(&self, player: PlayerId) -> AimBonuses {
        self.players.get(&player).map(|p| p.aim_bonuses).unwrap_or_default()
    }

    fn is_present(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }

    fn apply_damage(&self, target: PlayerId, amount: f32, point: Vec2, _normal: Vec2, attacker: PlayerId) {
        let Some(mut player) = self.players.get_mut(&target) else {
            log::debug!("Damage from {} to unknown player {} dropped", attacker, target);
            return;
        };
        player.health = (player.health - amount).max(0.0);
        log::info!(
            "Player {} hit by {} for {} at ({:.2}, {:.2}), health {}",
            target, attacker, amount, point.x, point.y, player.health
        );
    }
}
