//! Client mirror of one weapon.
//!
//! Datagrams may arrive out of order or twice. Journal entries are applied
//! strictly in `seq` order; anything ahead of the next expected sequence is
//! buffered until the gap fills, anything at or below it is dropped. A
//! snapshot resets the mirror to its sequence number.

use std::collections::BTreeMap;
use crate::client::presentation::{dispatch, Presentation};
use crate::state::WeaponId;
use crate::state::messages::{EffectBroadcast, ServerMessage};
use crate::state::replicated::{FieldTag, FieldValue};
use crate::state::weapon::{WeaponFields, WeaponSnapshot};

/// Past this many buffered entries the replica should ask for a snapshot
pub const MAX_PENDING: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Field { field: FieldTag, new: FieldValue },
    Effect(EffectBroadcast),
}

pub struct WeaponReplica {
    weapon_id: WeaponId,
    kind: u32,
    fields: WeaponFields,
    applied_seq: u64,
    pending: BTreeMap<u64, Pending>,
    destroyed: bool,
}

impl WeaponReplica {
    pub fn from_snapshot(snapshot: &WeaponSnapshot) -> Self {
        let mut fields = WeaponFields::new(
            snapshot.current_magazine_bullet_count,
            snapshot.all_reserve_bullet_count,
            snapshot.remaining_destroy_time,
        );
        fields.restore(snapshot);
        Self {
            weapon_id: snapshot.weapon_id,
            kind: snapshot.kind,
            fields,
            applied_seq: snapshot.seq,
            pending: BTreeMap::new(),
            destroyed: false,
        }
    }

    pub fn weapon_id(&self) -> WeaponId {
        self.weapon_id
    }

    pub fn kind(&self) -> u32 {
        self.kind
    }

    pub fn fields(&self) -> &WeaponFields {
        &self.fields
    }

    /// Register local hooks here
    pub fn fields_mut(&mut self) -> &mut WeaponFields {
        &mut self.fields
    }

    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn needs_resync(&self) -> bool {
        self.pending.len() > MAX_PENDING
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Feed one server message; returns how many journal entries got applied
    pub fn receive(&mut self, msg: ServerMessage, presentation: &mut dyn Presentation) -> usize {
        if msg.weapon_id() != Some(self.weapon_id) {
            return 0;
        }

        match msg {
            ServerMessage::FieldChanged { seq, field, new, .. } => {
                self.buffer(seq, Pending::Field { field, new });
            }
            ServerMessage::Effect { seq, effect, .. } => {
                self.buffer(seq, Pending::Effect(effect));
            }
            ServerMessage::WeaponSnapshot { snapshot } => {
                if snapshot.seq < self.applied_seq {
                    return 0;
                }
                self.fields.restore(&snapshot);
                self.applied_seq = snapshot.seq;
                self.pending = self.pending.split_off(&(snapshot.seq + 1));
            }
            ServerMessage::WeaponDestroyed { .. } => {
                self.destroyed = true;
                return 0;
            }
            ServerMessage::Welcome { .. } => return 0,
        }

        self.drain(presentation)
    }

    fn buffer(&mut self, seq: u64, entry: Pending) {
        if seq <= self.applied_seq {
            log::trace!("weapon {} dropping stale seq {}", self.weapon_id, seq);
            return;
        }
        self.pending.insert(seq, entry);
    }

    fn drain(&mut self, presentation: &mut dyn Presentation) -> usize {
        let mut applied = 0;
        while let Some(entry) = self.pending.remove(&(self.applied_seq + 1)) {
            match entry {
                Pending::Field { field, new } => {
                    if !self.fields.apply(field, new) {
                        log::warn!("weapon {} got mistyped value for {:?}", self.weapon_id, field);
                    }
                }
                Pending::Effect(effect) => dispatch(presentation, self.weapon_id, effect),
            }
            self.applied_seq += 1;
            applied += 1;
        }
        applied
    }
}
