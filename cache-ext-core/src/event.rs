//! The policy-switch event stream: a fixed-layout record emitted whenever
//! the adaptive controller commits a switch, plus the sink abstraction that
//! ships records to an observer.

use bytes::{BufMut, BytesMut};

use crate::policy::Policy;

/// Whether the minimum-compatibility fields (`working_set_size`,
/// `working_set_ratio`) are included in an encoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityMode {
    Full,
    MinimumCompatible,
}

/// A snapshot of derived metrics taken at the instant a policy switch is
/// committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicySwitchEvent {
    pub old_policy: Policy,
    pub new_policy: Policy,
    pub timestamp: u64,
    pub hit_rate: u64,
    pub total_accesses: u64,
    pub one_time_ratio: u64,
    pub sequential_ratio: u64,
    pub avg_hits_per_page: u64,
    pub avg_reuse_distance: u64,
    pub dirty_ratio: u64,
    pub old_policy_hit_rate: u64,
    pub working_set_size: u64,
    pub working_set_ratio: u64,
}

/// Fixed record size when every field is emitted (`CompatibilityMode::Full`).
pub const FULL_RECORD_LEN: usize = 4 + 4 + 8 * 11;
/// Fixed record size omitting the two working-set fields.
pub const MIN_COMPAT_RECORD_LEN: usize = FULL_RECORD_LEN - 16;

impl PolicySwitchEvent {
    /// Encode this record in its fixed little-endian layout. No framing
    /// beyond the record's own fixed length is added.
    pub fn encode(&self, mode: CompatibilityMode) -> BytesMut {
        let cap = match mode {
            CompatibilityMode::Full => FULL_RECORD_LEN,
            CompatibilityMode::MinimumCompatible => MIN_COMPAT_RECORD_LEN,
        };
        let mut buf = BytesMut::with_capacity(cap);
        buf.put_u32_le(self.old_policy.as_u32());
        buf.put_u32_le(self.new_policy.as_u32());
        buf.put_u64_le(self.timestamp);
        buf.put_u64_le(self.hit_rate);
        buf.put_u64_le(self.total_accesses);
        buf.put_u64_le(self.one_time_ratio);
        buf.put_u64_le(self.sequential_ratio);
        buf.put_u64_le(self.avg_hits_per_page);
        buf.put_u64_le(self.avg_reuse_distance);
        buf.put_u64_le(self.dirty_ratio);
        buf.put_u64_le(self.old_policy_hit_rate);
        if mode == CompatibilityMode::Full {
            buf.put_u64_le(self.working_set_size);
            buf.put_u64_le(self.working_set_ratio);
        }
        buf
    }

    /// Decode a record previously produced by [`PolicySwitchEvent::encode`].
    pub fn decode(mut bytes: &[u8]) -> Option<Self> {
        use bytes::Buf;

        let full = match bytes.len() {
            FULL_RECORD_LEN => true,
            MIN_COMPAT_RECORD_LEN => false,
            _ => return None,
        };

        let old_policy = Policy::from_u32(bytes.get_u32_le())?;
        let new_policy = Policy::from_u32(bytes.get_u32_le())?;
        let timestamp = bytes.get_u64_le();
        let hit_rate = bytes.get_u64_le();
        let total_accesses = bytes.get_u64_le();
        let one_time_ratio = bytes.get_u64_le();
        let sequential_ratio = bytes.get_u64_le();
        let avg_hits_per_page = bytes.get_u64_le();
        let avg_reuse_distance = bytes.get_u64_le();
        let dirty_ratio = bytes.get_u64_le();
        let old_policy_hit_rate = bytes.get_u64_le();
        let (working_set_size, working_set_ratio) = if full {
            (bytes.get_u64_le(), bytes.get_u64_le())
        } else {
            (0, 0)
        };

        Some(Self {
            old_policy,
            new_policy,
            timestamp,
            hit_rate,
            total_accesses,
            one_time_ratio,
            sequential_ratio,
            avg_hits_per_page,
            avg_reuse_distance,
            dirty_ratio,
            old_policy_hit_rate,
            working_set_size,
            working_set_ratio,
        })
    }
}

/// A unidirectional byte-sink accepting policy-switch records.
///
/// Implementations may drop records when the sink is full; `offer` reports
/// whether the record was accepted so callers can count drops, but the
/// controller never treats a dropped record as an error.
pub trait EventSink: Send + Sync {
    fn offer(&self, event: &PolicySwitchEvent) -> bool;
}

/// A sink that discards every record, used in tests and as the default
/// when no observer is attached.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn offer(&self, _event: &PolicySwitchEvent) -> bool {
        true
    }
}
