use crate::models::{HourlyLoadReading, RawTemperatureSample};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// An observation keyed by (entity, timestamp).
pub trait Observation {
    fn entity_id(&self) -> &str;
    fn timestamp(&self) -> DateTime<Utc>;
    fn has_value(&self) -> bool;
    fn value_bits(&self) -> Option<u64>;
}

impl Observation for RawTemperatureSample {
    fn entity_id(&self) -> &str {
        &self.station_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn has_value(&self) -> bool {
        self.temperature_c.is_some()
    }

    fn value_bits(&self) -> Option<u64> {
        self.temperature_c.map(f64::to_bits)
    }
}

impl Observation for HourlyLoadReading {
    fn entity_id(&self) -> &str {
        &self.region_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.hour_timestamp
    }

    fn has_value(&self) -> bool {
        self.load_mwh.is_some()
    }

    fn value_bits(&self) -> Option<u64> {
        self.load_mwh.map(f64::to_bits)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub input: usize,
    pub output: usize,
}

impl DedupStats {
    pub fn removed(&self) -> usize {
        self.input - self.output
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DedupPolicy {
    /// One representative per (entity, timestamp)
    #[default]
    FirstValued,
    /// Only rows repeating entity, timestamp and value collapse
    ExactRepeats,
}

/// Collapses repeated observations to one representative.
///
/// Under `FirstValued` the representative is the first occurrence in source
/// order that carries a value, or the first occurrence when none does. Values
/// are never summed: overlapping feeds repeat the same hour and adding them
/// would double count. `ExactRepeats` keeps differing readings that share a
/// timestamp so the resampler can average them.
#[derive(Debug, Default)]
pub struct Deduplicator {
    policy: DedupPolicy,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exact_repeats() -> Self {
        Self {
            policy: DedupPolicy::ExactRepeats,
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Output keeps the source order of each key's first occurrence.
    pub fn deduplicate<T: Observation>(&self, records: Vec<T>) -> (Vec<T>, DedupStats) {
        let input = records.len();
        let mut positions: HashMap<(String, DateTime<Utc>, Option<u64>), usize> =
            HashMap::with_capacity(input);
        let mut unique: Vec<T> = Vec::with_capacity(input);

        for record in records {
            let value = match self.policy {
                DedupPolicy::FirstValued => None,
                DedupPolicy::ExactRepeats => record.value_bits(),
            };
            let key = (record.entity_id().to_string(), record.timestamp(), value);

            match positions.get(&key) {
                Some(&pos) => {
                    if !unique[pos].has_value() && record.has_value() {
                        unique[pos] = record;
                    }
                }
                None => {
                    positions.insert(key, unique.len());
                    unique.push(record);
                }
            }
        }

        let stats = DedupStats {
            input,
            output: unique.len(),
        };
        if stats.removed() > 0 {
            debug!(removed = stats.removed(), kept = stats.output, "Removed duplicate observations");
        }

        (unique, stats)
    }
}
