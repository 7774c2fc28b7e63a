//! Lapping stereo sample ring shared by the frame loop and the audio callback

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use tracing::{trace, warn};

use super::AudioError;

/// Default ring size in samples (16K slots = 8192 stereo frames, ~186ms at 44.1kHz)
///
/// A 59.7 Hz frame produces ~1478 samples, so this leaves roughly eleven
/// frames of slack before the producer laps the reader.
pub const DEFAULT_CAPACITY: usize = 16 * 1024;

/// Smallest power-of-two capacity holding at least four frame bursts
pub fn recommended_capacity(sample_rate: u32, frame_rate: f64) -> usize {
    if !(frame_rate.is_finite() && frame_rate > 0.0) {
        return DEFAULT_CAPACITY;
    }
    let frames_per_tick = (f64::from(sample_rate) / frame_rate).ceil();
    if frames_per_tick >= usize::MAX as f64 {
        return DEFAULT_CAPACITY;
    }
    (frames_per_tick as usize)
        .checked_mul(2 * 4)
        .and_then(usize::checked_next_power_of_two)
        .map_or(DEFAULT_CAPACITY, |capacity| capacity.max(2))
}

/// Fixed-capacity interleaved stereo ring buffer
///
/// One producer calls [`push`](Self::push), one consumer calls
/// [`pull_stereo`](Self::pull_stereo) or [`pull_frames`](Self::pull_frames).
/// There is no fill counter: the producer may lap the consumer and overwrite
/// unread samples, and the consumer replays stale samples when the producer
/// falls behind.
///
/// Cursor ownership:
/// - `insert_pos` is only stored by the producer
/// - `read_pos` is stored by the consumer, and by the producer when it
///   relocates an overrun reader. Both stores are single atomic words, so any
///   value observed by either side is a valid slot index.
pub struct AudioBridge {
    /// Sample slots holding `f32` bit patterns
    slots: Box<[AtomicU32]>,
    capacity: usize,
    insert_pos: AtomicUsize,
    read_pos: AtomicUsize,
    /// Number of read cursor relocations since construction
    relocations: AtomicU64,
}

/// Point-in-time view of the bridge cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    pub capacity: usize,
    pub insert_pos: usize,
    pub read_pos: usize,
    /// Slots between the read cursor and the write head
    pub lag: usize,
    pub relocations: u64,
}

impl AudioBridge {
    /// Create a bridge with the read cursor half a ring ahead of the write head
    ///
    /// The consumer starts on zeroed slots instead of colliding with the first
    /// pushes.
    pub fn new(capacity: usize) -> Result<Self, AudioError> {
        Self::with_cursors(capacity, 0, capacity / 2)
    }

    /// Create a bridge with explicit cursor positions (reduced modulo capacity)
    pub fn with_cursors(
        capacity: usize,
        insert_pos: usize,
        read_pos: usize,
    ) -> Result<Self, AudioError> {
        if capacity < 2 || capacity % 2 != 0 {
            return Err(AudioError::InvalidCapacity(capacity));
        }

        let slots = (0..capacity)
            .map(|_| AtomicU32::new(0.0f32.to_bits()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            capacity,
            insert_pos: AtomicUsize::new(insert_pos % capacity),
            read_pos: AtomicUsize::new(read_pos % capacity),
            relocations: AtomicU64::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Next slot the producer will write
    pub fn insert_pos(&self) -> usize {
        self.insert_pos.load(Ordering::Acquire)
    }

    /// Next slot the consumer will read
    pub fn read_pos(&self) -> usize {
        self.read_pos.load(Ordering::Acquire)
    }

    /// Number of desync recoveries performed so far
    pub fn relocations(&self) -> u64 {
        self.relocations.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> BridgeStats {
        let insert_pos = self.insert_pos();
        let read_pos = self.read_pos();
        BridgeStats {
            capacity: self.capacity,
            insert_pos,
            read_pos,
            lag: (insert_pos + self.capacity - read_pos) % self.capacity,
            relocations: self.relocations(),
        }
    }

    /// Write interleaved samples at the insert cursor (producer side)
    ///
    /// Callers are expected to push whole L/R pairs. An odd count is accepted
    /// and shifts the channel interleave until a later odd push restores it.
    /// When more than `capacity` samples arrive in one call only the newest
    /// `capacity` of them remain in the ring.
    pub fn push(&self, samples: &[f32]) {
        let count = samples.len();
        if count == 0 {
            return;
        }

        let start = self.insert_pos.load(Ordering::Relaxed);

        // Everything before the last `capacity` samples would be overwritten
        // within this same call.
        let skipped = count.saturating_sub(self.capacity);
        let mut pos = (start + skipped % self.capacity) % self.capacity;
        for sample in &samples[skipped..] {
            self.slots[pos].store(sample.to_bits(), Ordering::Relaxed);
            pos = self.wrap(pos + 1);
        }

        self.insert_pos.store(pos, Ordering::Release);
        self.recover_overrun(pos, count);
    }

    /// Read `min(left.len(), right.len())` stereo pairs (consumer side)
    ///
    /// The read cursor advances two slots per pair. Stale or zeroed slots are
    /// replayed when no fresh data has been pushed.
    pub fn pull_stereo(&self, left: &mut [f32], right: &mut [f32]) {
        let start = self.read_pos.load(Ordering::Acquire);
        let mut pos = start;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            (*l, *r) = self.pair_at(pos);
            pos = self.wrap(pos + 2);
        }
        self.commit_read(start, pos);
    }

    /// Read frame-major output for a host stream with `channels` channels
    ///
    /// Stereo and wider layouts get L and R in the first two channels and
    /// silence in the rest; mono gets `(L + R) / 2`. A trailing partial frame
    /// is zero-filled without consuming a pair.
    pub fn pull_frames(&self, out: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }

        let start = self.read_pos.load(Ordering::Acquire);
        let mut pos = start;
        let mut frames = out.chunks_exact_mut(channels);
        for frame in frames.by_ref() {
            let (l, r) = self.pair_at(pos);
            if channels == 1 {
                frame[0] = (l + r) / 2.0;
            } else {
                frame[0] = l;
                frame[1] = r;
                frame[2..].fill(0.0);
            }
            pos = self.wrap(pos + 2);
        }
        frames.into_remainder().fill(0.0);

        self.commit_read(start, pos);
    }

    #[inline]
    fn wrap(&self, pos: usize) -> usize {
        pos % self.capacity
    }

    #[inline]
    fn sample_at(&self, pos: usize) -> f32 {
        f32::from_bits(self.slots[pos].load(Ordering::Relaxed))
    }

    #[inline]
    fn pair_at(&self, pos: usize) -> (f32, f32) {
        (self.sample_at(pos), self.sample_at(self.wrap(pos + 1)))
    }

    /// Publish the consumer's advance unless the producer relocated the cursor
    /// while the pull was in progress; the relocation wins.
    fn commit_read(&self, start: usize, end: usize) {
        if start != end {
            let _ = self.read_pos.compare_exchange(
                start,
                end,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }

    /// Move the reader half a ring away if the last push wrote over it
    fn recover_overrun(&self, insert: usize, count: usize) {
        let read = self.read_pos.load(Ordering::Acquire);
        if !overwritten_by_push(insert, read, count, self.capacity) {
            return;
        }

        let relocated = self.wrap(insert + self.capacity / 2);
        self.read_pos.store(relocated, Ordering::Release);
        let total = self.relocations.fetch_add(1, Ordering::Relaxed) + 1;
        if relocation_warns(total) {
            warn!(
                "Audio bridge overrun: read cursor {} -> {} (insert={}, pushed={}, total={})",
                read, relocated, insert, count, total
            );
        } else {
            trace!(
                "Audio bridge overrun: read cursor {} -> {} (insert={}, pushed={}, total={})",
                read, relocated, insert, count, total
            );
        }
    }
}

/// Overruns are logged at warn level on the 1st, 2nd, 4th, 8th... occurrence
pub(super) fn relocation_warns(total: u64) -> bool {
    total.is_power_of_two()
}

/// True when `read` lies strictly inside the wrapped window
/// `(insert - count, insert)` just written, or the push lapped the whole ring.
pub(super) fn overwritten_by_push(insert: usize, read: usize, count: usize, capacity: usize) -> bool {
    let mut behind = (insert + capacity - read) % capacity;
    if behind == 0 {
        behind = capacity;
    }
    behind < count
}
