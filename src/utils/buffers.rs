use smallvec::SmallVec;
use crate::state::PlayerId;
use crate::state::replicated::Sequenced;

/// Type alias for small collections that avoid allocations
pub type SmallPlayerVec = SmallVec<[PlayerId; 8]>;
pub type JournalVec = SmallVec<[Sequenced; 16]>;

/// Reusable buffer for packet serialization
pub struct PacketBuffer {
    buffer: Vec<u8>,
}

impl PacketBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Serialize `value` as JSON into the buffer, replacing its contents
    pub fn encode<T: serde::Serialize>(&mut self, value: &T) -> Result<&[u8], serde_json::Error> {
        self.buffer.clear();
        serde_json::to_writer(&mut self.buffer, value)?;
        Ok(&self.buffer)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_vec_creation() {
        let mut vec: SmallPlayerVec = SmallVec::new();
        vec.push(1);
        vec.push(2);
        assert_eq!(vec.len(), 2);
        assert!(!vec.spilled());
    }

    #[test]
    fn test_packet_buffer_reuse() {
        let mut buf = PacketBuffer::new(64);
        let first = buf.encode(&serde_json::json!({ "a": 1 })).unwrap().to_vec();
        let second = buf.encode(&serde_json::json!({ "b": 2 })).unwrap().to_vec();
        assert_eq!(first, br#"{"a":1}"#.to_vec());
        assert_eq!(second, br#"{"b":2}"#.to_vec());
        buf.clear();
        assert!(buf.as_slice().is_empty());
    }
}
