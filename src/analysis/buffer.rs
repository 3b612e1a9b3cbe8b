// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Time-indexed ring buffer of per-station detection ratios
//!
//! Each slot stores the short, medium and special averages divided by the long
//! average, plus the raw and filtered sample when not in server mode. Slot times
//! are not stored: they are reconstructed from the newest timestamp and the
//! smoothed sample interval, which keeps a slot at a handful of bytes.

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::error::BufferError;

/// Computed channels kept by a client buffer
pub const COMPUTED_COUNT_CLIENT: usize = 4;
/// Computed channels kept by a server buffer (no filtered value)
pub const COMPUTED_COUNT_SERVER: usize = 3;

const RATIO: usize = 0;
const MEDIUM_RATIO: usize = 1;
const SPECIAL_RATIO: usize = 2;
const FILTERED_VALUE: usize = 3;

/// Gaps within this fraction of the nominal interval feed the interval estimate
const GAP_TOLERANCE: f64 = 0.05;

/// Headroom applied to extracted buffers for irregular sampling
const EXTRACT_HEADROOM: f64 = 1.4;

const EMPTY: i64 = i64::MIN;

/// Running averages of the filtered signal at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub short: f32,
    pub medium: f32,
    pub long: f32,
    pub special: f32,
}

/// One fully materialized slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub time: i64,
    pub raw: i32,
    pub filtered: f32,
    pub ratio: f32,
    pub medium_ratio: f32,
    pub special_ratio: f32,
}

/// Ring storage guarded by the buffer lock. Read accessors are public so callers
/// can hold one read guard across several lookups.
#[derive(Debug, Clone)]
pub struct RingState {
    sample_rate: f64,
    server: bool,
    expected_gap: f64,
    actual_sample_time: f64,

    size: usize,
    last_log: i64,
    raw: Vec<i32>,
    computed: Vec<Vec<f32>>,

    next_free_slot: usize,
    oldest_data_slot: usize,
}

impl RingState {
    fn new(sample_rate: f64, seconds: f64, server: bool) -> Result<Self, BufferError> {
        let size = slot_count(sample_rate, seconds)?;
        let expected_gap = 1000.0 / sample_rate;
        let channels = if server { COMPUTED_COUNT_SERVER } else { COMPUTED_COUNT_CLIENT };

        Ok(Self {
            sample_rate,
            server,
            expected_gap,
            actual_sample_time: expected_gap,
            size,
            last_log: EMPTY,
            raw: if server { Vec::new() } else { vec![0; size] },
            computed: vec![vec![0.0; size]; channels],
            next_free_slot: 0,
            oldest_data_slot: 0,
        })
    }

    /// Capacity in slots
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.last_log == EMPTY
    }

    pub fn is_server(&self) -> bool {
        self.server
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of slots holding data
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else if self.next_free_slot == self.oldest_data_slot {
            self.size
        } else {
            (self.next_free_slot + self.size - self.oldest_data_slot) % self.size
        }
    }

    pub fn next_slot(&self) -> usize {
        self.next_free_slot
    }

    pub fn oldest_slot(&self) -> usize {
        self.oldest_data_slot
    }

    pub fn newest_slot(&self) -> usize {
        if self.next_free_slot == 0 {
            self.size - 1
        } else {
            self.next_free_slot - 1
        }
    }

    /// Timestamp of the newest sample
    pub fn latest_log_time(&self) -> Option<i64> {
        (!self.is_empty()).then_some(self.last_log)
    }

    /// Smoothed sample interval in milliseconds
    pub fn sample_interval(&self) -> f64 {
        self.actual_sample_time
    }

    /// Reconstructed time of a slot. Slots past the newest one are treated as
    /// wrapped, one full ring older.
    pub fn time(&self, index: usize) -> i64 {
        let newest = self.newest_slot() as i64;
        let mut index = index as i64;
        if index > newest {
            index -= self.size as i64;
        }
        let offset = (self.actual_sample_time * (newest - index) as f64) as i64;
        self.last_log.saturating_sub(offset)
    }

    /// Earliest slot whose time is at or after `time`, or the newest slot when
    /// every sample is older.
    pub fn closest_index(&self, time: i64) -> Result<usize, BufferError> {
        if self.is_empty() {
            return Err(BufferError::EmptyBuffer);
        }

        let size = self.size;
        let mut low = self.oldest_data_slot;
        let mut high = self.newest_slot();
        if low > high {
            high += size;
        }

        if self.time(low % size) >= time {
            return Ok(low % size);
        }
        if self.time(high % size) < time {
            return Ok(high % size);
        }

        // time(low) < time <= time(high)
        while high - low > 1 {
            let mid = (low + high) / 2;
            if self.time(mid % size) >= time {
                high = mid;
            } else {
                low = mid;
            }
        }
        Ok(high % size)
    }

    /// # Panics
    /// When `index >= size()`.
    pub fn ratio(&self, index: usize) -> f64 {
        f64::from(self.computed[RATIO][index])
    }

    /// # Panics
    /// When `index >= size()`.
    pub fn medium_ratio(&self, index: usize) -> f64 {
        f64::from(self.computed[MEDIUM_RATIO][index])
    }

    /// # Panics
    /// When `index >= size()`.
    pub fn special_ratio(&self, index: usize) -> f64 {
        f64::from(self.computed[SPECIAL_RATIO][index])
    }

    pub fn raw(&self, index: usize) -> Result<i32, BufferError> {
        if self.server {
            return Err(BufferError::UnsupportedInServerMode);
        }
        Ok(self.raw[index])
    }

    pub fn filtered(&self, index: usize) -> Result<f32, BufferError> {
        if self.server {
            return Err(BufferError::UnsupportedInServerMode);
        }
        Ok(self.computed[FILTERED_VALUE][index])
    }

    pub fn to_log(&self, index: usize) -> Result<Log, BufferError> {
        if self.server {
            return Err(BufferError::UnsupportedInServerMode);
        }
        Ok(Log {
            time: self.time(index),
            raw: self.raw[index],
            filtered: self.computed[FILTERED_VALUE][index],
            ratio: self.computed[RATIO][index],
            medium_ratio: self.computed[MEDIUM_RATIO][index],
            special_ratio: self.computed[SPECIAL_RATIO][index],
        })
    }

    #[allow(clippy::too_many_arguments)]
    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        time: i64,
        raw: i32,
        filtered: f32,
        ratio: f32,
        medium: f32,
        special: f32,
        expand: bool,
    ) {
        if time <= self.last_log {
            return;
        }
        if expand && !self.is_empty() && self.next_free_slot == self.oldest_data_slot {
            self.resize_slots(self.size * 2);
        }

        let slot = self.next_free_slot;
        if !self.server {
            self.raw[slot] = raw;
            self.computed[FILTERED_VALUE][slot] = filtered;
        }
        self.computed[RATIO][slot] = ratio;
        self.computed[MEDIUM_RATIO][slot] = medium;
        self.computed[SPECIAL_RATIO][slot] = special;

        if self.next_free_slot == self.oldest_data_slot && !self.is_empty() {
            self.oldest_data_slot = (self.oldest_data_slot + 1) % self.size;
        }
        self.next_free_slot = (self.next_free_slot + 1) % self.size;

        if !self.is_empty() {
            let gap = (time - self.last_log) as f64;
            let diff = (gap - self.expected_gap).abs() / self.expected_gap;
            if diff < GAP_TOLERANCE {
                self.actual_sample_time -=
                    (self.actual_sample_time - gap) / (self.sample_rate * 200.0);
            }
        }
        self.last_log = time;
    }

    /// Reallocate to `new_size` slots, copying newest-first into the tail of the
    /// new arrays. Older samples that do not fit are dropped.
    fn resize_slots(&mut self, new_size: usize) {
        let count = self.len().min(new_size);
        let mut raw = if self.server { Vec::new() } else { vec![0; new_size] };
        let mut computed = vec![vec![0.0; new_size]; self.computed.len()];

        let mut src = self.next_free_slot;
        let mut dst = new_size;
        for _ in 0..count {
            src = if src == 0 { self.size - 1 } else { src - 1 };
            dst -= 1;

            if !self.server {
                raw[dst] = self.raw[src];
            }
            for (channel, values) in computed.iter_mut().enumerate() {
                values[dst] = self.computed[channel][src];
            }
        }

        self.raw = raw;
        self.computed = computed;
        self.oldest_data_slot = dst % new_size;
        self.next_free_slot = 0;
        self.size = new_size;
    }
}

fn slot_count(sample_rate: f64, seconds: f64) -> Result<usize, BufferError> {
    let slots = (seconds * sample_rate).ceil();
    if !slots.is_finite() || slots < 1.0 || sample_rate <= 0.0 {
        return Err(BufferError::InvalidConfiguration { sample_rate, seconds });
    }
    Ok(slots as usize)
}

/// Waveform buffer with single-writer, multi-reader locking
#[derive(Debug)]
pub struct WaveformBuffer {
    state: RwLock<RingState>,
}

impl WaveformBuffer {
    /// Buffer holding `seconds` of data at `sample_rate` Hz. Server buffers omit
    /// the raw and filtered channels.
    pub fn new(sample_rate: f64, seconds: f64, server: bool) -> Result<Self, BufferError> {
        Ok(Self {
            state: RwLock::new(RingState::new(sample_rate, seconds, server)?),
        })
    }

    /// Append a sample. Samples not newer than the last one are ignored. A full
    /// buffer doubles when `expand` is set and overwrites its oldest slot otherwise.
    pub fn log(&self, time: i64, raw: i32, filtered: f32, averages: Averages, expand: bool) {
        let ratio = averages.short / averages.long;
        let medium = averages.medium / averages.long;
        let special = averages.special / averages.long;
        self.state.write().push(time, raw, filtered, ratio, medium, special, expand);
    }

    /// Change capacity to `seconds` of data, keeping the newest samples
    pub fn resize(&self, seconds: f64) -> Result<(), BufferError> {
        let mut state = self.state.write();
        let new_size = slot_count(state.sample_rate, seconds)?;
        state.resize_slots(new_size);
        Ok(())
    }

    /// Copy every sample timed within `[start, end]` into a new buffer
    pub fn extract(&self, start: i64, end: i64) -> Result<WaveformBuffer, BufferError> {
        if end <= start {
            return Err(BufferError::InvalidRange { start, end });
        }

        let state = self.state.read();
        let seconds = ((end - start) as f64 / 1000.0).ceil();
        let mut result = RingState::new(
            state.sample_rate,
            (seconds * EXTRACT_HEADROOM).floor(),
            state.server,
        )?;

        if !state.is_empty() {
            let mut index = state.closest_index(start)?;
            let steps = (state.newest_slot() + state.size - index) % state.size + 1;
            for _ in 0..steps {
                let time = state.time(index);
                if time > end {
                    break;
                }
                if time >= start {
                    let (raw, filtered) = if state.server {
                        (0, 0.0)
                    } else {
                        (state.raw[index], state.computed[FILTERED_VALUE][index])
                    };
                    result.push(
                        time,
                        raw,
                        filtered,
                        state.computed[RATIO][index],
                        state.computed[MEDIUM_RATIO][index],
                        state.computed[SPECIAL_RATIO][index],
                        true,
                    );
                }
                index = (index + 1) % state.size;
            }
        }

        Ok(WaveformBuffer {
            state: RwLock::new(result),
        })
    }

    /// Read guard for several consistent lookups
    pub fn read(&self) -> RwLockReadGuard<'_, RingState> {
        self.state.read()
    }

    pub fn size(&self) -> usize {
        self.state.read().size()
    }

    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    pub fn time(&self, index: usize) -> i64 {
        self.state.read().time(index)
    }

    pub fn closest_index(&self, time: i64) -> Result<usize, BufferError> {
        self.state.read().closest_index(time)
    }

    pub fn to_log(&self, index: usize) -> Result<Log, BufferError> {
        self.state.read().to_log(index)
    }

    pub fn latest_log_time(&self) -> Option<i64> {
        self.state.read().latest_log_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn averages(short: f32, medium: f32, long: f32, special: f32) -> Averages {
        Averages { short, medium, long, special }
    }

    fn filled(seconds: f64, count: i64) -> WaveformBuffer {
        let buffer = WaveformBuffer::new(1.0, seconds, false).unwrap();
        for i in 0..count {
            let v = i as f32;
            buffer.log(i * 1000, i as i32, v, averages(v, v, 1.0, v), false);
        }
        buffer
    }

    #[test]
    fn test_size() {
        let buffer = WaveformBuffer::new(30.0, 10.0, false).unwrap();
        assert_eq!(buffer.size(), 300);
        let buffer = WaveformBuffer::new(2.5, 4.1, false).unwrap();
        assert_eq!(buffer.size(), 11);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            WaveformBuffer::new(1.0, 0.0, false),
            Err(BufferError::InvalidConfiguration { .. })
        ));
        assert!(WaveformBuffer::new(-5.0, 10.0, true).is_err());
    }

    #[test]
    fn test_ring() {
        let buffer = WaveformBuffer::new(1.0, 10.0, false).unwrap();
        {
            let state = buffer.read();
            assert_eq!(state.next_slot(), 0);
            assert_eq!(state.oldest_slot(), 0);
            assert!(state.is_empty());
        }

        buffer.log(0, 0, 0.0, averages(0.0, 0.0, 1.0, 0.0), false);
        assert_eq!(buffer.read().next_slot(), 1);
        assert_eq!(buffer.read().oldest_slot(), 0);

        for i in 0..9 {
            buffer.log(i + 1, 0, 0.0, averages(0.0, 0.0, 1.0, 0.0), false);
        }
        assert_eq!(buffer.read().next_slot(), 0);
        assert_eq!(buffer.read().oldest_slot(), 0);

        buffer.log(10, 0, 0.0, averages(0.0, 0.0, 1.0, 0.0), false);
        assert_eq!(buffer.read().next_slot(), 1);
        assert_eq!(buffer.read().oldest_slot(), 1);
    }

    #[test]
    fn test_ring_invariant_long_run() {
        let buffer = WaveformBuffer::new(1.0, 7.0, false).unwrap();
        for i in 0..50 {
            buffer.log(i * 1000, 0, 0.0, averages(1.0, 1.0, 1.0, 1.0), false);
            let state = buffer.read();
            assert!(state.next_slot() < state.size());
            assert!(state.oldest_slot() < state.size());
            if i + 1 >= 7 {
                assert_eq!(state.next_slot(), state.oldest_slot());
            }
        }
    }

    #[test]
    fn test_storage() {
        let buffer = WaveformBuffer::new(1.0, 10.0, false).unwrap();
        buffer.log(0, 10, 10.0, averages(10.0, 10.0, 1.0, 10.0), false);

        let log = buffer.to_log(0).unwrap();
        assert_eq!(log.time, 0);
        assert_eq!(log.raw, 10);
        assert!((log.ratio - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_log_older_sample_is_noop() {
        let buffer = filled(10.0, 2);
        let before = buffer.read().clone();

        buffer.log(500, 3, 3.0, averages(3.0, 3.0, 3.0, 3.0), false);
        buffer.log(1000, 3, 3.0, averages(3.0, 3.0, 3.0, 3.0), false);

        let after = buffer.read();
        assert_eq!(after.size(), before.size());
        assert_eq!(after.next_slot(), before.next_slot());
        assert_eq!(after.oldest_slot(), before.oldest_slot());
        assert_eq!(after.latest_log_time(), Some(1000));
        for i in 0..after.size() {
            assert_eq!(after.to_log(i).unwrap(), before.to_log(i).unwrap());
        }
    }

    #[test]
    fn test_resize() {
        let buffer = WaveformBuffer::new(1.0, 10.0, false).unwrap();
        for i in 0..10i64 {
            let v = i as f32;
            let avg = averages(v * 30.0, v * 40.0, 1.0, v * 60.0);
            buffer.log(i * 1000, i as i32 * 10, v * 20.0, avg, false);
        }

        buffer.resize(3.0).unwrap();
        assert_eq!(buffer.size(), 3);

        let oldest = buffer.read().oldest_slot();
        let log = buffer.to_log(oldest).unwrap();
        assert_eq!(log.time, 7000);
        assert!((log.ratio - 210.0).abs() < 1e-6);

        buffer.log(10000, 100, 100.0, averages(100.0, 100.0, 1.0, 100.0), false);

        let state = buffer.read();
        let log = state.to_log(state.oldest_slot()).unwrap();
        assert_eq!(log.time, 8000);
        assert!((log.ratio - 240.0).abs() < 1e-6);

        let log = state.to_log(state.newest_slot()).unwrap();
        assert_eq!(log.time, 10000);
        assert!((log.ratio - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_resize_to_smaller_keeps_newest() {
        let buffer = filled(10.0, 10);
        buffer.resize(5.0).unwrap();
        assert_eq!(buffer.size(), 5);

        let state = buffer.read();
        assert_eq!(state.len(), 5);
        for step in 0..5 {
            let index = (state.oldest_slot() + step) % state.size();
            let log = state.to_log(index).unwrap();
            assert_eq!(log.time, (5 + step as i64) * 1000);
            assert_eq!(log.raw, 5 + step as i32);
        }
    }

    #[test]
    fn test_resize_partial_buffer_grows() {
        let buffer = filled(10.0, 4);
        buffer.resize(20.0).unwrap();

        let state = buffer.read();
        assert_eq!(state.size(), 20);
        assert_eq!(state.len(), 4);
        let times: Vec<i64> = (0..4)
            .map(|step| state.time((state.oldest_slot() + step) % state.size()))
            .collect();
        assert_eq!(times, vec![0, 1000, 2000, 3000]);
    }

    #[test]
    fn test_expand() {
        let buffer = WaveformBuffer::new(1.0, 3.0, false).unwrap();
        for i in 0..3i64 {
            let v = i as f32;
            buffer.log(i * 1000, i as i32, v, averages(v, v, v, v), false);
        }
        assert_eq!(buffer.time(buffer.read().oldest_slot()), 0);

        buffer.log(3000, 3, 3.0, averages(3.0, 3.0, 3.0, 3.0), true);

        let state = buffer.read();
        assert_eq!(state.size(), 6);
        assert_eq!(state.time(state.oldest_slot()), 0);
        assert_eq!(state.time(state.newest_slot()), 3000);
    }

    #[test]
    fn test_single_element_buffer() {
        let buffer = WaveformBuffer::new(1.0, 1.0, false).unwrap();
        buffer.log(0, 1, 2.0, averages(3.0, 4.0, 5.0, 6.0), false);
        let state = buffer.read();
        assert_eq!(state.size(), 1);
        assert_eq!(state.next_slot(), 0);
        assert_eq!(state.oldest_slot(), 0);
        assert!(!state.is_empty());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_large_timestamps() {
        let buffer = WaveformBuffer::new(1.0, 1000.0, false).unwrap();
        for i in 0..1000i64 {
            buffer.log(2_000_000_000 + i * 1000, 0, 0.0, averages(1.0, 1.0, 1.0, 1.0), false);
        }
        let state = buffer.read();
        for i in 1..1000 {
            assert_eq!(state.time(i) - state.time(i - 1), 1000);
        }
    }

    #[test]
    fn test_closest_index() {
        let buffer = filled(10.0, 10);
        assert_eq!(buffer.closest_index(3000).unwrap(), 3);
        assert_eq!(buffer.closest_index(3500).unwrap(), 4);
        assert_eq!(buffer.closest_index(-100).unwrap(), 0);
        assert_eq!(buffer.closest_index(50_000).unwrap(), 9);

        let empty = WaveformBuffer::new(1.0, 10.0, false).unwrap();
        assert_eq!(empty.closest_index(0), Err(BufferError::EmptyBuffer));
    }

    #[test]
    fn test_closest_index_wrapped() {
        let buffer = filled(10.0, 14);
        let state = buffer.read();
        let index = state.closest_index(7000).unwrap();
        assert_eq!(state.time(index), 7000);
        let index = state.closest_index(4000).unwrap();
        assert_eq!(index, state.oldest_slot());
    }

    #[test]
    fn test_extract() {
        let buffer = filled(10.0, 10);
        let extracted = buffer.extract(3000, 7000).unwrap();
        assert_eq!(extracted.size(), 5);

        let state = extracted.read();
        for i in 0..5 {
            assert_eq!(state.time(i), 3000 + i as i64 * 1000);
            assert_eq!(state.raw(i).unwrap(), 3 + i as i32);
        }
    }

    #[test]
    fn test_extract_wrapped_source() {
        let buffer = filled(10.0, 15);
        let extracted = buffer.extract(6000, 13_000).unwrap();
        let state = extracted.read();
        assert_eq!(state.len(), 8);
        let times: Vec<i64> = (0..state.len())
            .map(|step| state.time((state.oldest_slot() + step) % state.size()))
            .collect();
        assert_eq!(times, (6..=13).map(|s| s * 1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_extract_no_data_in_range() {
        let buffer = filled(10.0, 10);
        let extracted = buffer.extract(10_000, 11_000).unwrap();
        assert!(extracted.is_empty());
        assert_eq!(extracted.len(), 0);
    }

    #[test]
    fn test_extract_invalid_range() {
        let buffer = filled(10.0, 10);
        assert_eq!(
            buffer.extract(5000, 5000).err(),
            Some(BufferError::InvalidRange { start: 5000, end: 5000 })
        );
    }

    #[test]
    fn test_server_mode() {
        let buffer = WaveformBuffer::new(1.0, 10.0, true).unwrap();
        buffer.log(0, 5, 5.0, averages(8.0, 4.0, 2.0, 2.0), false);

        let state = buffer.read();
        assert!(state.is_server());
        assert!((state.ratio(0) - 4.0).abs() < 1e-9);
        assert!((state.medium_ratio(0) - 2.0).abs() < 1e-9);
        assert_eq!(state.raw(0), Err(BufferError::UnsupportedInServerMode));
        assert_eq!(state.to_log(0).err(), Some(BufferError::UnsupportedInServerMode));
    }

    #[test]
    fn test_sample_interval_smoothing() {
        let buffer = WaveformBuffer::new(10.0, 10.0, true).unwrap();
        let mut t = 0;
        for _ in 0..50 {
            buffer.log(t, 0, 0.0, averages(1.0, 1.0, 1.0, 1.0), false);
            t += 102;
        }
        let interval = buffer.read().sample_interval();
        assert!(interval > 100.0 && interval < 102.0);
    }
}
