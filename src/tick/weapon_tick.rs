use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;
use crate::domain::authority::{Transition, WeaponAuthority, WeaponState};
use crate::state::commands::{Intent, Origin, WeaponCommand};
use crate::state::messages::ServerMessage;
use crate::state::server_state::ServerState;
use crate::state::weapon::WeaponSnapshot;
use crate::tick::scheduler::{after, every, TimerHandle};
use crate::utils::buffers::PacketBuffer;
use crate::utils::config::Config;

/// What the loop has to do after a command was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Handled(Option<Transition>),
    SendSnapshot(SocketAddr),
    Expired,
    Despawn,
}

/// Timers owned by one weapon actor
#[derive(Default)]
pub struct ActorTimers {
    /// Ticker and the epoch its ticks are stamped with
    destruction: Option<(u64, TimerHandle)>,
    shot_keyframes: Vec<TimerHandle>,
    reload_keyframes: Option<TimerHandle>,
}

impl ActorTimers {
    /// Run the destruction countdown exactly while the authority wants it.
    /// A ticker from an older epoch is replaced.
    pub fn sync_destruction(&mut self, running: bool, epoch: u64, tx: &mpsc::Sender<WeaponCommand>, config: &Config) {
        if !running {
            self.destruction = None;
        } else if self.destruction_epoch() != Some(epoch) {
            let period = Duration::from_millis(config.destroy_tick_ms);
            let ticker = every(period, tx.clone(), WeaponCommand::DestructionTick { epoch });
            self.destruction = Some((epoch, ticker));
        }
    }

    /// Schedule or cancel server-driven keyframes after an accepted transition
    pub fn on_transition(&mut self, transition: Transition, epoch: u64, tx: &mpsc::Sender<WeaponCommand>, config: &Config) {
        match transition {
            Transition::ShootStarted if config.server_keyframes => {
                self.shot_keyframes.retain(|t| !t.is_finished());
                self.shot_keyframes.push(after(
                    Duration::from_millis(config.shot_keyframe_ms),
                    tx.clone(),
                    WeaponCommand::keyframe(epoch, Intent::ExecuteShootLogic),
                ));
                self.shot_keyframes.push(after(
                    Duration::from_millis(config.fire_cycle_ms),
                    tx.clone(),
                    WeaponCommand::keyframe(epoch, Intent::FinishShoot),
                ));
            }
            Transition::ReloadStarted if config.server_keyframes => {
                self.reload_keyframes = Some(every(
                    Duration::from_millis(config.reload_step_ms),
                    tx.clone(),
                    WeaponCommand::keyframe(epoch, Intent::FinishReload),
                ));
            }
            Transition::ReloadFinished => self.reload_keyframes = None,
            Transition::Discarded => self.cancel_keyframes(),
            _ => {}
        }
    }

    /// Drop keyframes the authority can no longer accept: everything once it
    /// has faulted, the reload ticker once it is not reloading
    pub fn reconcile(&mut self, authority: &WeaponAuthority) {
        if authority.is_faulted() {
            self.cancel_keyframes();
        } else if authority.state() != WeaponState::Reloading {
            self.reload_keyframes = None;
        }
    }

    pub fn cancel_keyframes(&mut self) {
        self.shot_keyframes.clear();
        self.reload_keyframes = None;
    }

    pub fn pending_keyframes(&self) -> usize {
        self.shot_keyframes.iter().filter(|t| !t.is_finished()).count()
            + usize::from(self.reload_keyframes.is_some())
    }

    pub fn destruction_running(&self) -> bool {
        self.destruction.is_some()
    }

    fn destruction_epoch(&self) -> Option<u64> {
        self.destruction.as_ref().map(|(e, _)| *e)
    }
}

/// Apply one command to the authority. Rejections are logged and swallowed.
/// Scheduled commands from an older epoch are dropped unseen.
pub fn process_command(authority: &mut WeaponAuthority, cmd: WeaponCommand) -> Step {
    match cmd {
        WeaponCommand::Intent { origin, intent } => apply_intent(authority, origin, intent),
        WeaponCommand::Keyframe { epoch, intent } => {
            if epoch != authority.epoch() {
                log::trace!("Weapon {} dropped stale {:?} keyframe from epoch {}", authority.weapon_id(), intent, epoch);
                return Step::Handled(None);
            }
            apply_intent(authority, Origin::Server, intent)
        }
        WeaponCommand::Contact { player_id, kind } => {
            authority.handle_contact(player_id, kind);
            Step::Handled(None)
        }
        WeaponCommand::PlayerLeft { player_id } => Step::Handled(authority.handle_player_left(player_id)),
        WeaponCommand::DestructionTick { epoch } => {
            if epoch != authority.epoch() {
                log::trace!("Weapon {} dropped stale destruction tick from epoch {}", authority.weapon_id(), epoch);
                Step::Handled(None)
            } else if authority.destruction_tick() {
                Step::Expired
            } else {
                Step::Handled(None)
            }
        }
        WeaponCommand::SendSnapshot { addr } => Step::SendSnapshot(addr),
        WeaponCommand::Despawn => Step::Despawn,
    }
}

fn apply_intent(authority: &mut WeaponAuthority, origin: Origin, intent: Intent) -> Step {
    match authority.handle_intent(origin, intent) {
        Ok(transition) => Step::Handled(Some(transition)),
        Err(rejection) => {
            log::debug!(
                "Weapon {} rejected {:?} from {:?}: {}",
                authority.weapon_id(), intent, origin, rejection
            );
            Step::Handled(None)
        }
    }
}

/// Per-weapon actor - the only writer of this weapon's state.
/// Applies commands one at a time and broadcasts the resulting journal in order.
pub async fn weapon_tick_loop(
    mut authority: WeaponAuthority,
    mut command_rx: mpsc::Receiver<WeaponCommand>,
    command_tx: mpsc::Sender<WeaponCommand>,
    snapshot_tx: watch::Sender<WeaponSnapshot>,
    socket: Arc<UdpSocket>,
    state: Arc<ServerState>,
    config: Arc<Config>,
) {
    let weapon_id = authority.weapon_id();
    let mut timers = ActorTimers::default();
    let mut send_buffer = PacketBuffer::default();

    timers.sync_destruction(authority.timer_running(), authority.epoch(), &command_tx, &config);

    while let Some(cmd) = command_rx.recv().await {
        let step = process_command(&mut authority, cmd);
        flush_journal(&mut authority, &socket, &state, &mut send_buffer).await;

        match step {
            Step::Handled(Some(transition)) => {
                timers.on_transition(transition, authority.epoch(), &command_tx, &config)
            }
            Step::Handled(None) => {}
            Step::SendSnapshot(addr) => {
                let msg = ServerMessage::WeaponSnapshot { snapshot: authority.snapshot() };
                send_one(&socket, &mut send_buffer, &msg, addr).await;
            }
            Step::Expired | Step::Despawn => break,
        }

        timers.reconcile(&authority);
        timers.sync_destruction(authority.timer_running(), authority.epoch(), &command_tx, &config);
        let _ = snapshot_tx.send(authority.snapshot());
    }

    // Teardown: nothing scheduled may outlive the weapon
    timers.cancel_keyframes();
    timers.sync_destruction(false, authority.epoch(), &command_tx, &config);

    state.remove_weapon(weapon_id);
    authority.dispose();
    flush_journal(&mut authority, &socket, &state, &mut send_buffer).await;
    let _ = snapshot_tx.send(authority.snapshot());

    broadcast(&socket, &state, &mut send_buffer, &ServerMessage::WeaponDestroyed { weapon_id }).await;
    log::info!("Weapon {} destroyed", weapon_id);
}

/// Broadcast everything the last command produced, in journal order
async fn flush_journal(
    authority: &mut WeaponAuthority,
    socket: &UdpSocket,
    state: &ServerState,
    buffer: &mut PacketBuffer,
) {
    let weapon_id = authority.weapon_id();
    for item in authority.drain_journal() {
        broadcast(socket, state, buffer, &ServerMessage::from_journal(weapon_id, &item)).await;
    }
}

/// Send to every connected player
async fn broadcast(socket: &UdpSocket, state: &ServerState, buffer: &mut PacketBuffer, msg: &ServerMessage) {
    let addrs = state.player_addrs();
    if addrs.is_empty() {
        return;
    }
    let data = match buffer.encode(msg) {
        Ok(data) => data,
        Err(e) => {
            log::error!("Failed to encode {:?}: {}", msg, e);
            return;
        }
    };
    for addr in addrs {
        if let Err(e) = socket.send_to(data, addr).await {
            log::debug!("Failed to send to {}: {:?}", addr, e);
        }
    }
}

async fn send_one(socket: &UdpSocket, buffer: &mut PacketBuffer, msg: &ServerMessage, addr: SocketAddr) {
    match buffer.encode(msg) {
        Ok(data) => {
            if let Err(e) = socket.send_to(data, addr).await {
                log::debug!("Failed to send to {}: {:?}", addr, e);
            }
        }
        Err(e) => log::error!("Failed to encode {:?}: {}", msg, e),
    }
}
