mod persist;

pub use persist::{flush, OutputPaths, Session};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The physical-write attributes the harness recognises in the device's SMART table.
///
/// The set is closed on purpose: every sample carries exactly these keys, which is what keeps the
/// tabular output schema well-defined across a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrackedCounter {
    #[serde(rename = "Total_LBAs_Written")]
    TotalLbasWritten,
    #[serde(rename = "Host_Program_Page_Count")]
    HostProgramPageCount,
    #[serde(rename = "FTL_Program_Page_Count")]
    FtlProgramPageCount,
}

impl TrackedCounter {
    pub const ALL: [TrackedCounter; 3] = [
        TrackedCounter::TotalLbasWritten,
        TrackedCounter::HostProgramPageCount,
        TrackedCounter::FtlProgramPageCount,
    ];

    /// The attribute name as it appears in `smartctl` output and in persisted artifacts.
    pub fn name(&self) -> &'static str {
        match self {
            TrackedCounter::TotalLbasWritten => "Total_LBAs_Written",
            TrackedCounter::HostProgramPageCount => "Host_Program_Page_Count",
            TrackedCounter::FtlProgramPageCount => "FTL_Program_Page_Count",
        }
    }
}

/// One reading of the tracked counters. Always carries the full key set; a value is `None` when
/// the diagnostic tool did not report that attribute.
pub type CounterSet = BTreeMap<TrackedCounter, Option<u64>>;

/// A [CounterSet] with every value absent, as recorded on a tick where the diagnostic tool failed.
pub fn empty_counter_set() -> CounterSet {
    TrackedCounter::ALL.iter().map(|c| (*c, None)).collect()
}

/// Cumulative write statistics for the device as reported by the OS, since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsCounters {
    pub write_bytes: u64,
    pub write_count: u64,
    pub write_time: u64,
}

/// One observation at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the Unix epoch. Non-decreasing across a run.
    pub timestamp: i64,
    pub device_counters: CounterSet,
    /// `current - baseline` for every counter present in both this sample and the baseline.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub normalized_counters: BTreeMap<TrackedCounter, i64>,
    /// Absent when the device was not found in the OS statistics table this tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_counters: Option<OsCounters>,
}

impl Sample {
    pub fn new(
        timestamp: i64,
        device_counters: CounterSet,
        baseline: &CounterSet,
        os_counters: Option<OsCounters>,
    ) -> Self {
        let normalized_counters = normalize(&device_counters, baseline);
        Self {
            timestamp,
            device_counters,
            normalized_counters,
            os_counters,
        }
    }
}

/// Compute `current - baseline` per counter, skipping any counter absent on either side.
///
/// Deltas are signed: SMART raw values are cumulative, but a firmware reset mid-run would make
/// the difference negative and that is worth seeing in the output rather than panicking over.
pub fn normalize(current: &CounterSet, baseline: &CounterSet) -> BTreeMap<TrackedCounter, i64> {
    current
        .iter()
        .filter_map(|(counter, value)| {
            let now = (*value)?;
            let base = baseline.get(counter).copied().flatten()?;
            Some((*counter, now as i64 - base as i64))
        })
        .collect()
}

/// The ordered, append-only log of samples for one run. Serialized as-is to the structured
/// artifact, so the field names here are the output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleLog {
    pub device: String,
    #[serde(rename = "data")]
    pub samples: Vec<Sample>,
}

impl SampleLog {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            samples: Vec::new(),
        }
    }

    pub fn append(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counters(lbas: Option<u64>, host: Option<u64>, ftl: Option<u64>) -> CounterSet {
        let mut set = empty_counter_set();
        set.insert(TrackedCounter::TotalLbasWritten, lbas);
        set.insert(TrackedCounter::HostProgramPageCount, host);
        set.insert(TrackedCounter::FtlProgramPageCount, ftl);
        set
    }

    #[test]
    fn normalize_is_exact_delta() {
        let baseline = counters(Some(100), Some(50), None);
        let current = counters(Some(130), Some(55), Some(9));

        let normalized = normalize(&current, &baseline);

        assert_eq!(
            normalized.get(&TrackedCounter::TotalLbasWritten),
            Some(&30)
        );
        assert_eq!(
            normalized.get(&TrackedCounter::HostProgramPageCount),
            Some(&5)
        );
        // Absent in the baseline, so no delta even though the sample has a value.
        assert_eq!(normalized.get(&TrackedCounter::FtlProgramPageCount), None);
    }

    #[test]
    fn normalize_skips_counters_absent_from_sample() {
        let baseline = counters(Some(100), Some(50), Some(10));
        let current = counters(None, None, None);

        assert!(normalize(&current, &baseline).is_empty());
    }

    #[test]
    fn normalize_can_go_negative() {
        let baseline = counters(Some(100), None, None);
        let current = counters(Some(40), None, None);

        let normalized = normalize(&current, &baseline);
        assert_eq!(normalized.get(&TrackedCounter::TotalLbasWritten), Some(&-60));
    }

    #[test]
    fn sample_serializes_with_output_attribute_names() {
        let sample = Sample::new(
            1700000000,
            counters(Some(130), None, None),
            &counters(Some(100), None, None),
            Some(OsCounters {
                write_bytes: 4096,
                write_count: 2,
                write_time: 7,
            }),
        );

        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["timestamp"], 1700000000);
        assert_eq!(value["device_counters"]["Total_LBAs_Written"], 130);
        assert_eq!(
            value["device_counters"]["Host_Program_Page_Count"],
            serde_json::Value::Null
        );
        assert_eq!(value["normalized_counters"]["Total_LBAs_Written"], 30);
        assert_eq!(value["os_counters"]["write_bytes"], 4096);
    }

    #[test]
    fn optional_sample_fields_are_omitted_when_empty() {
        let sample = Sample::new(0, counters(None, None, None), &empty_counter_set(), None);

        let value = serde_json::to_value(&sample).unwrap();
        assert!(value.get("normalized_counters").is_none());
        assert!(value.get("os_counters").is_none());
    }

    #[test]
    fn log_serializes_device_and_data() {
        let mut log = SampleLog::new("/dev/sda");
        log.append(Sample::new(
            1,
            counters(None, None, None),
            &empty_counter_set(),
            None,
        ));

        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["device"], "/dev/sda");
        assert_eq!(value["data"].as_array().unwrap().len(), 1);
    }
}
