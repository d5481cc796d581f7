use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};

use crate::{OsCounters, Sample, SampleLog, TrackedCounter};

/// Identifies one run of the harness. The start time names every artifact the run produces, so
/// concurrent runs with different experiment names never collide.
#[derive(Debug, Clone)]
pub struct Session {
    started_at: DateTime<Local>,
}

impl Session {
    pub fn start() -> Self {
        Self {
            started_at: Local::now(),
        }
    }

    /// Compact timestamp used as the artifact file name prefix.
    pub fn stamp(&self) -> String {
        self.started_at.format("%Y%m%d_%H%M%S").to_string()
    }

    /// Directory name for this run, combining the start time with the experiment name.
    pub fn dir_name(&self, experiment_name: &str) -> String {
        format!(
            "{}_{}",
            self.started_at.format("%Y-%m-%d_%H-%M"),
            experiment_name
        )
    }
}

/// Where a run's artifacts live on disk.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub log_dir: PathBuf,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
    /// Prefix handed to the workload generator for its own result and bandwidth/IOPS logs.
    pub workload_log_prefix: PathBuf,
}

impl OutputPaths {
    pub fn new(out_dir: &Path, experiment_name: &str, session: &Session) -> Self {
        let log_dir = out_dir.join(session.dir_name(experiment_name));
        let stamp = session.stamp();
        Self {
            json_path: log_dir.join(format!("{stamp}_smart.json")),
            csv_path: log_dir.join(format!("{stamp}_smart.csv")),
            workload_log_prefix: log_dir.join(stamp),
            log_dir,
        }
    }

    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.log_dir).with_context(|| {
            format!("Failed to create log directory {}", self.log_dir.display())
        })
    }
}

/// Write both artifacts for the run: the structured JSON and the tabular CSV.
///
/// Both files are rewritten whole, so re-flushing an unchanged log is idempotent and the two
/// artifacts always agree on the sample count. Called periodically to bound data loss; the call
/// made when the run finishes is the one that counts.
pub fn flush(log: &SampleLog, paths: &OutputPaths) -> anyhow::Result<()> {
    write_structured(log, &paths.json_path)?;
    write_tabular(log, &paths.csv_path)?;
    Ok(())
}

fn write_structured(log: &SampleLog, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create structured artifact {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, log)
        .with_context(|| format!("Failed to write structured artifact {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush structured artifact {}", path.display()))?;
    Ok(())
}

fn write_tabular(log: &SampleLog, path: &Path) -> anyhow::Result<()> {
    let normalized_columns: Vec<TrackedCounter> = TrackedCounter::ALL
        .into_iter()
        .filter(|counter| {
            log.samples
                .iter()
                .any(|s| s.normalized_counters.contains_key(counter))
        })
        .collect();
    let include_os = log.samples.iter().any(|s| s.os_counters.is_some());

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create tabular artifact {}", path.display()))?;

    writer
        .write_record(header(&normalized_columns, include_os))
        .context("Failed to write tabular header")?;
    for sample in &log.samples {
        writer
            .write_record(row(sample, &normalized_columns, include_os))
            .context("Failed to write tabular row")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush tabular artifact {}", path.display()))?;
    Ok(())
}

/// Header union for the whole run: the fixed device counter columns always appear, normalized and
/// OS columns only when at least one sample in the run carries them.
fn header(normalized_columns: &[TrackedCounter], include_os: bool) -> Vec<String> {
    let mut columns = vec!["timestamp".to_string()];
    for counter in TrackedCounter::ALL {
        columns.push(counter.name().to_string());
    }
    for counter in normalized_columns {
        columns.push(format!("normalized_{}", counter.name()));
    }
    if include_os {
        columns.extend(
            ["os_write_bytes", "os_write_count", "os_write_time"]
                .iter()
                .map(|c| c.to_string()),
        );
    }
    columns
}

fn row(sample: &Sample, normalized_columns: &[TrackedCounter], include_os: bool) -> Vec<String> {
    let mut cells = vec![sample.timestamp.to_string()];
    for counter in TrackedCounter::ALL {
        let value = sample.device_counters.get(&counter).copied().flatten();
        cells.push(value.map(|v| v.to_string()).unwrap_or_default());
    }
    for counter in normalized_columns {
        let value = sample.normalized_counters.get(counter);
        cells.push(value.map(|v| v.to_string()).unwrap_or_default());
    }
    if include_os {
        match sample.os_counters {
            Some(OsCounters {
                write_bytes,
                write_count,
                write_time,
            }) => {
                cells.push(write_bytes.to_string());
                cells.push(write_count.to_string());
                cells.push(write_time.to_string());
            }
            None => cells.extend([String::new(), String::new(), String::new()]),
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{empty_counter_set, CounterSet};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn counters(lbas: Option<u64>, host: Option<u64>, ftl: Option<u64>) -> CounterSet {
        let mut set = empty_counter_set();
        set.insert(TrackedCounter::TotalLbasWritten, lbas);
        set.insert(TrackedCounter::HostProgramPageCount, host);
        set.insert(TrackedCounter::FtlProgramPageCount, ftl);
        set
    }

    fn paths_in(dir: &TempDir) -> OutputPaths {
        let paths = OutputPaths::new(dir.path(), "test", &Session::start());
        paths.ensure_dir().unwrap();
        paths
    }

    #[test]
    fn artifacts_have_matching_sample_counts() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);

        let baseline = counters(Some(100), Some(50), None);
        let mut log = SampleLog::new("/dev/sda");
        log.append(Sample::new(10, counters(Some(130), Some(55), None), &baseline, None));
        log.append(Sample::new(11, counters(None, None, None), &baseline, None));
        log.append(Sample::new(12, counters(Some(140), Some(60), None), &baseline, None));

        flush(&log, &paths).unwrap();

        let structured: SampleLog =
            serde_json::from_str(&std::fs::read_to_string(&paths.json_path).unwrap()).unwrap();
        let tabular = std::fs::read_to_string(&paths.csv_path).unwrap();
        let rows = tabular.lines().count() - 1;

        assert_eq!(structured.samples.len(), log.samples.len());
        assert_eq!(rows, log.samples.len());
        assert_eq!(structured, log);
    }

    #[test]
    fn flush_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);

        let baseline = counters(Some(100), None, None);
        let mut log = SampleLog::new("/dev/sda");
        log.append(Sample::new(10, counters(Some(110), None, None), &baseline, None));

        flush(&log, &paths).unwrap();
        let first_json = std::fs::read(&paths.json_path).unwrap();
        let first_csv = std::fs::read(&paths.csv_path).unwrap();

        flush(&log, &paths).unwrap();
        assert_eq!(std::fs::read(&paths.json_path).unwrap(), first_json);
        assert_eq!(std::fs::read(&paths.csv_path).unwrap(), first_csv);
    }

    #[test]
    fn os_columns_appear_only_when_observed() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);

        let mut log = SampleLog::new("/dev/sda");
        log.append(Sample::new(1, counters(None, None, None), &empty_counter_set(), None));
        flush(&log, &paths).unwrap();

        let tabular = std::fs::read_to_string(&paths.csv_path).unwrap();
        assert!(!tabular.lines().next().unwrap().contains("os_write_bytes"));

        // One sample with OS data is enough to add the columns for the whole run.
        log.append(Sample::new(
            2,
            counters(None, None, None),
            &empty_counter_set(),
            Some(OsCounters {
                write_bytes: 512,
                write_count: 1,
                write_time: 3,
            }),
        ));
        flush(&log, &paths).unwrap();

        let tabular = std::fs::read_to_string(&paths.csv_path).unwrap();
        let mut lines = tabular.lines();
        let header = lines.next().unwrap();
        assert!(header.ends_with("os_write_bytes,os_write_count,os_write_time"));
        // The first sample has no OS data, so its OS cells are empty.
        assert!(lines.next().unwrap().ends_with(",,"));
        assert!(lines.next().unwrap().ends_with("512,1,3"));
    }

    #[test]
    fn normalized_columns_follow_the_union_of_samples() {
        let dir = TempDir::new().unwrap();
        let paths = paths_in(&dir);

        let baseline = counters(Some(100), None, None);
        let mut log = SampleLog::new("/dev/sda");
        // Only Total_LBAs_Written ever normalizes; the failed tick renders as empty cells.
        log.append(Sample::new(1, counters(Some(130), Some(5), None), &baseline, None));
        log.append(Sample::new(2, counters(None, None, None), &baseline, None));
        flush(&log, &paths).unwrap();

        let tabular = std::fs::read_to_string(&paths.csv_path).unwrap();
        let mut lines = tabular.lines();
        let header = lines.next().unwrap();
        assert_eq!(
            header,
            "timestamp,Total_LBAs_Written,Host_Program_Page_Count,FTL_Program_Page_Count,\
             normalized_Total_LBAs_Written"
        );
        assert_eq!(lines.next().unwrap(), "1,130,5,,30");
        assert_eq!(lines.next().unwrap(), "2,,,,");
    }

    #[test]
    fn output_paths_are_keyed_by_session_and_experiment() {
        let session = Session::start();
        let paths = OutputPaths::new(Path::new("/tmp/waf_logs"), "precondition", &session);

        let dir = paths.log_dir.to_string_lossy().into_owned();
        assert!(dir.ends_with(&format!("_{}", "precondition")));
        assert!(paths
            .json_path
            .to_string_lossy()
            .ends_with(&format!("{}_smart.json", session.stamp())));
        assert!(paths
            .csv_path
            .to_string_lossy()
            .ends_with(&format!("{}_smart.csv", session.stamp())));
    }
}
