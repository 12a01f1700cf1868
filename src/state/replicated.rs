//! Server-owned values that report every change to their observers.
//!
//! A [`ReplicatedField`] is written through `&mut`, so only whoever owns the
//! weapon (its actor) can mutate it. `set` with an unchanged value does
//! nothing. A real change runs every hook synchronously in registration
//! order and hands back a [`FieldChange`] that the owner appends to its
//! [`Journal`], which is what goes out on the wire.

use std::fmt;
use serde::{Deserialize, Serialize};
use crate::state::PlayerId;
use crate::state::messages::EffectBroadcast;
use crate::utils::buffers::JournalVec;

/// Which replicated field of a weapon changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTag {
    IsInReload,
    IsInShoot,
    CanShoot,
    CurrentMagazineBulletCount,
    AllReserveBulletCount,
    IsEnterAimState,
    RemainingDestroyTime,
    OwnerPlayer,
    IsInPlayerHand,
    IsGunActive,
    CurrentHolderCandidate,
}

/// Wire form of a field value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Bool(bool),
    Float(f32),
    Player(Option<PlayerId>),
}

/// Types that can live in a replicated field
pub trait Replicable: Clone + PartialEq + Send + 'static {
    fn to_value(&self) -> FieldValue;
    fn from_value(value: FieldValue) -> Option<Self>;
}

impl Replicable for bool {
    fn to_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl Replicable for f32 {
    fn to_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl Replicable for Option<PlayerId> {
    fn to_value(&self) -> FieldValue {
        FieldValue::Player(*self)
    }

    fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Player(p) => Some(p),
            _ => None,
        }
    }
}

/// One applied mutation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: FieldTag,
    pub old: FieldValue,
    pub new: FieldValue,
}

pub type Hook<T> = Box<dyn FnMut(&T, &T) + Send>;

pub struct ReplicatedField<T: Replicable> {
    tag: FieldTag,
    value: T,
    hooks: Vec<Hook<T>>,
}

impl<T: Replicable> ReplicatedField<T> {
    pub fn new(tag: FieldTag, initial: T) -> Self {
        Self {
            tag,
            value: initial,
            hooks: Vec::new(),
        }
    }

    pub fn tag(&self) -> FieldTag {
        self.tag
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Register a `(old, new)` hook. Hooks only react; they cannot write back.
    pub fn observe(&mut self, hook: impl FnMut(&T, &T) + Send + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Write a new value. Returns the change, or `None` when nothing changed.
    pub fn set(&mut self, value: T) -> Option<FieldChange> {
        if self.value == value {
            return None;
        }
        let old = std::mem::replace(&mut self.value, value);
        for hook in self.hooks.iter_mut() {
            hook(&old, &self.value);
        }
        Some(FieldChange {
            field: self.tag,
            old: old.to_value(),
            new: self.value.to_value(),
        })
    }

    /// Apply a wire value; a type mismatch is ignored and reported as `false`
    pub fn apply(&mut self, value: FieldValue) -> bool {
        match T::from_value(value) {
            Some(v) => {
                self.set(v);
                true
            }
            None => false,
        }
    }
}

impl<T: Replicable + fmt::Debug> fmt::Debug for ReplicatedField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicatedField")
            .field("tag", &self.tag)
            .field("value", &self.value)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Something the authority produced for observers
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    Field(FieldChange),
    Effect(EffectBroadcast),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sequenced {
    pub seq: u64,
    pub entry: JournalEntry,
}

/// Ordered outbox of one weapon; `seq` is strictly increasing for its lifetime
#[derive(Debug, Default)]
pub struct Journal {
    next_seq: u64,
    entries: JournalVec,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, change: Option<FieldChange>) {
        if let Some(change) = change {
            self.push(JournalEntry::Field(change));
        }
    }

    pub fn effect(&mut self, effect: EffectBroadcast) {
        self.push(JournalEntry::Effect(effect));
    }

    fn push(&mut self, entry: JournalEntry) {
        self.next_seq += 1;
        self.entries.push(Sequenced {
            seq: self.next_seq,
            entry,
        });
    }

    /// Last sequence number handed out, 0 before the first entry
    pub fn last_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn take(&mut self) -> JournalVec {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_unchanged_set_is_silent() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let mut field = ReplicatedField::new(FieldTag::IsInShoot, false);
        field.observe(move |_, _| *counter.lock().unwrap() += 1);

        assert!(field.set(false).is_none());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_hook_sees_old_and_new() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let mut field = ReplicatedField::new(FieldTag::CurrentMagazineBulletCount, 10.0f32);
        field.observe(move |old, new| log.lock().unwrap().push((*old, *new)));

        let change = field.set(9.0).unwrap();
        field.set(8.0);

        assert_eq!(change.old, FieldValue::Float(10.0));
        assert_eq!(change.new, FieldValue::Float(9.0));
        assert_eq!(*seen.lock().unwrap(), vec![(10.0, 9.0), (9.0, 8.0)]);
    }

    #[test]
    fn test_apply_rejects_type_mismatch() {
        let mut field: ReplicatedField<Option<PlayerId>> =
            ReplicatedField::new(FieldTag::OwnerPlayer, None);
        assert!(!field.apply(FieldValue::Bool(true)));
        assert!(field.apply(FieldValue::Player(Some(4))));
        assert_eq!(*field.get(), Some(4));
    }

    #[test]
    fn test_journal_sequence_increases() {
        let mut journal = Journal::new();
        let mut a = ReplicatedField::new(FieldTag::IsInReload, false);
        let mut b = ReplicatedField::new(FieldTag::CanShoot, true);

        journal.record(a.set(true));
        journal.record(b.set(true)); // unchanged
        journal.record(b.set(false));
        journal.effect(EffectBroadcast::EjectCasing);

        let entries = journal.take();
        let seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert!(journal.is_empty());
        assert_eq!(journal.last_seq(), 3);
    }

    #[test]
    fn test_field_value_wire_shape() {
        let json = serde_json::to_value(FieldValue::Player(Some(3))).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "player", "value": 3 }));
        let back: FieldValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, FieldValue::Player(Some(3)));
    }
}
