//! GPU inventory caching and inventory/reading pairing.

use std::time::{Duration, Instant};

use super::metrics::{GpuDevice, GpuReading, GpuSample};

/// A detected GPU together with the index of the backend that found it
#[derive(Debug, Clone, PartialEq)]
pub struct InventoryEntry {
    pub device: GpuDevice,
    pub backend: usize,
}

/// Detected GPUs and the moment they were captured
#[derive(Debug, Clone, Default)]
pub struct InventoryCache {
    pub entries: Vec<InventoryEntry>,
    pub captured_at: Option<Instant>,
}

impl InventoryCache {
    pub fn new(entries: Vec<InventoryEntry>, captured_at: Instant) -> Self {
        Self {
            entries,
            captured_at: Some(captured_at),
        }
    }

    /// True when the cache was never filled or is older than `window`
    pub fn is_stale(&self, now: Instant, window: Duration) -> bool {
        match self.captured_at {
            Some(captured) => now.saturating_duration_since(captured) >= window,
            None => true,
        }
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
        self.captured_at = None;
    }
}

/// Backend indices in first-seen order, each listed once
pub fn backend_order(entries: &[InventoryEntry]) -> Vec<usize> {
    let mut seen = Vec::new();
    for entry in entries {
        if !seen.contains(&entry.backend) {
            seen.push(entry.backend);
        }
    }
    seen
}

/// Join one backend's inventory bucket with that backend's readings.
///
/// Devices and readings are matched by id when both carry one. Anything
/// left over is paired by position within the bucket. A device without a
/// matching reading gets absent values.
pub fn pair_bucket(devices: &[&GpuDevice], readings: &[GpuReading]) -> Vec<GpuSample> {
    let mut used = vec![false; readings.len()];

    let mut matched: Vec<Option<usize>> = devices
        .iter()
        .map(|device| {
            let id = device.id.as_deref()?;
            let pos = readings
                .iter()
                .enumerate()
                .position(|(i, r)| !used[i] && r.id.as_deref() == Some(id))?;
            used[pos] = true;
            Some(pos)
        })
        .collect();

    // Positional fallback over the readings nobody claimed by id
    let mut free = (0..readings.len()).filter(|i| !used[*i]);
    for slot in matched.iter_mut() {
        if slot.is_none() {
            *slot = free.next();
        }
    }

    devices
        .iter()
        .zip(matched)
        .map(|(device, reading)| {
            let reading = reading.map(|i| &readings[i]);
            GpuSample {
                name: device.name.clone(),
                vendor: device.vendor,
                usage_percent: reading.and_then(|r| r.usage_percent),
                temp_celsius: reading.and_then(|r| r.temp_celsius),
            }
        })
        .collect()
}
