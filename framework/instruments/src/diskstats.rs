use waf_tunnel_sample_model::OsCounters;

const DISKSTATS_PATH: &str = "/proc/diskstats";

/// Bytes per sector in the kernel's iostats interface. Fixed at 512 regardless of the device's
/// physical sector size.
const SECTOR_SIZE: u64 = 512;

// /proc/diskstats columns, zero-indexed: 2 device name, 7 writes completed, 9 sectors written,
// 10 milliseconds spent writing.
const NAME_FIELD: usize = 2;
const WRITES_COMPLETED_FIELD: usize = 7;
const SECTORS_WRITTEN_FIELD: usize = 9;
const WRITE_TIME_FIELD: usize = 10;

/// Look up the device's cumulative write statistics in the OS block-device table.
///
/// Returns `None` when the device is not listed (name mismatch, device removed) or the table
/// cannot be read. The caller treats that as "no OS data this tick", not as an error.
pub fn read_os_counters(device_name: &str) -> Option<OsCounters> {
    let table = std::fs::read_to_string(DISKSTATS_PATH).ok()?;
    parse_diskstats(&table, device_name)
}

fn parse_diskstats(table: &str, device_name: &str) -> Option<OsCounters> {
    for line in table.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() <= WRITE_TIME_FIELD || fields[NAME_FIELD] != device_name {
            continue;
        }
        let sectors_written: u64 = fields[SECTORS_WRITTEN_FIELD].parse().ok()?;
        return Some(OsCounters {
            write_bytes: sectors_written * SECTOR_SIZE,
            write_count: fields[WRITES_COMPLETED_FIELD].parse().ok()?,
            write_time: fields[WRITE_TIME_FIELD].parse().ok()?,
        });
    }
    None
}
