//! In-memory ring plus periodic persistent flush for the four per-device
//! series.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::error::Error;
use crate::record::{Record, SeriesKind};

/// In-memory retention window for the ring: 10 minutes.
const RING_RETENTION_SECS: u64 = 10 * 60;

/// Persistent retention cap: 7 days per series.
const PERSIST_RETENTION_SECS: u64 = 7 * 24 * 60 * 60;

/// Rotate a series file by truncation once it exceeds this size.
const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

#[derive(Default)]
struct Ring {
    samples: VecDeque<Record>,
}

impl Ring {
    fn push(&mut self, record: Record) {
        self.samples.push_back(record);
        let cutoff = record.unix_seconds.saturating_sub(RING_RETENTION_SECS);
        while let Some(front) = self.samples.front() {
            if front.unix_seconds < cutoff {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn latest(&self) -> Option<Record> {
        self.samples.back().copied()
    }
}

/// Stores per-device history for the four tracked series, with a bounded
/// in-memory ring and downsampled persistent files under `history_dir`.
pub struct HistoryStore {
    history_dir: PathBuf,
    max_file_bytes: u64,
    rings: RwLock<HashMap<(String, SeriesKind), Ring>>,
}

impl HistoryStore {
    /// Creates a store persisting under `history_dir` with the default
    /// rotation size cap.
    pub fn new(history_dir: PathBuf) -> Self {
        Self::with_max_file_bytes(history_dir, DEFAULT_MAX_FILE_BYTES)
    }

    /// Creates a store with an explicit rotation size cap, for tests that
    /// want to exercise rotation without writing a megabyte of fixtures.
    pub fn with_max_file_bytes(history_dir: PathBuf, max_file_bytes: u64) -> Self {
        Self {
            history_dir,
            max_file_bytes,
            rings: RwLock::new(HashMap::new()),
        }
    }

    /// Records one sample per series for a device tick. Call this once per
    /// refresh while the device is present.
    pub async fn record_tick(
        &self,
        object_path: &str,
        now: u64,
        rate: f64,
        charge: f64,
        time_to_full: f64,
        time_to_empty: f64,
        state: upowerd_device::DeviceState,
    ) {
        let values = [
            (SeriesKind::Rate, rate),
            (SeriesKind::Charge, charge),
            (SeriesKind::TimeToFull, time_to_full),
            (SeriesKind::TimeToEmpty, time_to_empty),
        ];

        let mut rings = self.rings.write().await;
        for (kind, value) in values {
            let ring = rings.entry((object_path.to_string(), kind)).or_default();
            ring.push(Record {
                unix_seconds: now,
                value,
                state,
            });
        }
    }

    /// Drops all in-memory series for a device. Called when a peripheral is
    /// permanently removed (debounce window elapsed without a reconnect).
    pub async fn forget(&self, object_path: &str) {
        let mut rings = self.rings.write().await;
        rings.retain(|(path, _), _| path != object_path);
    }

    /// Appends the latest ring sample for every tracked series to its
    /// persistent file, rotating any file that has grown past the size cap.
    ///
    /// Intended to be called on a fixed interval (every two minutes) by the
    /// daemon's flush task; each call is what implements the "downsampled to
    /// one sample per two minutes" persistent retention rule.
    ///
    /// # Errors
    /// Returns the first I/O error encountered; later series are still
    /// attempted. Callers should log and continue rather than treat this as
    /// fatal.
    pub async fn flush(&self) -> Result<(), Error> {
        std::fs::create_dir_all(&self.history_dir).map_err(|source| Error::CreateDir {
            path: self.history_dir.clone(),
            source,
        })?;

        let rings = self.rings.read().await;
        let mut first_error = None;

        for ((object_path, kind), ring) in rings.iter() {
            let Some(latest) = ring.latest() else {
                continue;
            };

            let path = self.series_path(object_path, *kind);
            if let Err(err) = self.append_record(&path, latest) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Fsyncs and flushes on shutdown; identical to [`HistoryStore::flush`]
    /// but named for the call site's intent.
    ///
    /// # Errors
    /// See [`HistoryStore::flush`].
    pub async fn flush_on_shutdown(&self) -> Result<(), Error> {
        self.flush().await
    }

    /// Reads a downsampled window of `duration_secs` ending now, returning at
    /// most `resolution` uniformly-spaced points.
    pub fn read(
        &self,
        object_path: &str,
        kind: SeriesKind,
        now: u64,
        duration_secs: u64,
        resolution: usize,
    ) -> Vec<Record> {
        let path = self.series_path(object_path, kind);
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Vec::new();
        };

        let cutoff = now.saturating_sub(duration_secs);
        let records: Vec<Record> = contents
            .lines()
            .filter_map(Record::parse_line)
            .filter(|r| r.unix_seconds >= cutoff)
            .collect();

        downsample(&records, resolution)
    }

    fn series_path(&self, object_path: &str, kind: SeriesKind) -> PathBuf {
        self.history_dir
            .join(format!("history-{}-{}.dat", kind.slug(), identity_hash(object_path)))
    }

    fn append_record(&self, path: &Path, record: Record) -> Result<(), Error> {
        if let Ok(metadata) = std::fs::metadata(path) {
            if metadata.len() > self.max_file_bytes {
                self.rotate(path, record.unix_seconds)?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| Error::OpenFile {
                path: path.to_path_buf(),
                source,
            })?;

        writeln!(file, "{}", record.to_line()).map_err(|source| Error::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Rotates a series file by truncating it to just its most recent
    /// records within the 7-day retention cap, measured against `now` (the
    /// timestamp of the record about to be appended).
    fn rotate(&self, path: &Path, now: u64) -> Result<(), Error> {
        let contents = std::fs::read_to_string(path).unwrap_or_default();
        let cutoff = now.saturating_sub(PERSIST_RETENTION_SECS);

        let kept: Vec<&str> = contents
            .lines()
            .filter(|line| {
                Record::parse_line(line)
                    .map(|r| r.unix_seconds >= cutoff)
                    .unwrap_or(false)
            })
            .collect();

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| Error::OpenFile {
                path: path.to_path_buf(),
                source,
            })?;

        for line in kept {
            writeln!(file, "{line}").map_err(|source| Error::WriteFile {
                path: path.to_path_buf(),
                source,
            })?;
        }

        Ok(())
    }
}

fn identity_hash(object_path: &str) -> String {
    let mut hasher = DefaultHasher::new();
    object_path.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Picks `resolution` uniformly-spaced points from `records`, preserving
/// order. Returns everything if there are already fewer points than asked.
fn downsample(records: &[Record], resolution: usize) -> Vec<Record> {
    if resolution == 0 || records.len() <= resolution {
        return records.to_vec();
    }

    let stride = records.len() as f64 / resolution as f64;
    (0..resolution)
        .map(|i| records[((i as f64 * stride) as usize).min(records.len() - 1)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use upowerd_device::DeviceState;

    #[tokio::test]
    async fn record_tick_then_flush_writes_latest_sample() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().to_path_buf());

        store
            .record_tick("path0", 100, 10.0, 80.0, 0.0, 3600.0, DeviceState::Discharging)
            .await;
        store.flush().await.unwrap();

        let records = store.read("path0", SeriesKind::Charge, 100, 600, 10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, 80.0);
    }

    #[tokio::test]
    async fn forget_drops_in_memory_series() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().to_path_buf());

        store
            .record_tick("path0", 100, 10.0, 80.0, 0.0, 3600.0, DeviceState::Discharging)
            .await;
        store.forget("path0").await;
        store.flush().await.unwrap();

        let records = store.read("path0", SeriesKind::Charge, 100, 600, 10);
        assert!(records.is_empty());
    }

    #[test]
    fn downsample_returns_all_when_fewer_than_resolution() {
        let records: Vec<Record> = (0..5)
            .map(|i| Record {
                unix_seconds: i,
                value: i as f64,
                state: DeviceState::Unknown,
            })
            .collect();
        assert_eq!(downsample(&records, 10).len(), 5);
    }

    #[test]
    fn downsample_reduces_to_resolution() {
        let records: Vec<Record> = (0..100)
            .map(|i| Record {
                unix_seconds: i,
                value: i as f64,
                state: DeviceState::Unknown,
            })
            .collect();
        let downsampled = downsample(&records, 10);
        assert_eq!(downsampled.len(), 10);
        assert_eq!(downsampled[0].unix_seconds, 0);
    }

    #[test]
    fn identity_hash_is_stable() {
        assert_eq!(identity_hash("foo"), identity_hash("foo"));
        assert_ne!(identity_hash("foo"), identity_hash("bar"));
    }

    #[tokio::test]
    async fn rotation_drops_records_older_than_retention() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::with_max_file_bytes(dir.path().to_path_buf(), 10);

        store
            .record_tick("path0", 0, 1.0, 1.0, 0.0, 0.0, DeviceState::Discharging)
            .await;
        store.flush().await.unwrap();

        let far_future = PERSIST_RETENTION_SECS + 1000;
        store
            .record_tick("path0", far_future, 2.0, 2.0, 0.0, 0.0, DeviceState::Discharging)
            .await;
        store.flush().await.unwrap();

        let records = store.read("path0", SeriesKind::Charge, far_future, PERSIST_RETENTION_SECS * 2, 100);
        assert!(records.iter().all(|r| r.unix_seconds >= far_future - PERSIST_RETENTION_SECS));
    }
}
