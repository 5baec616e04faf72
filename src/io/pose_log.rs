//! Recorded tracking sessions.
//!
//! One pose per row, no header, `#` starts a comment:
//!
//! ```text
//! # timestamp_ns, qx, qy, qz, qw, tx, ty, tz
//! 1403636579763555584,0,0,0,1,0,0,0
//! ```

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::warn;

use crate::tracking::TrackingPose;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseEntry {
    pub timestamp_ns: u64,
    pub pose: TrackingPose,
}

#[derive(Debug, Deserialize)]
struct PoseRecord {
    timestamp_ns: u64,
    qx: f64,
    qy: f64,
    qz: f64,
    qw: f64,
    tx: f64,
    ty: f64,
    tz: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PoseLog {
    pub entries: Vec<PoseEntry>,
}

impl PoseLog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open pose log {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries: Vec<PoseEntry> = Vec::new();
        for (row, rec) in rdr.deserialize::<PoseRecord>().enumerate() {
            let rec = rec.with_context(|| format!("Bad pose record at row {}", row + 1))?;

            if let Some(last) = entries.last() {
                if rec.timestamp_ns < last.timestamp_ns {
                    bail!(
                        "timestamps go backwards at row {} ({} < {})",
                        row + 1,
                        rec.timestamp_ns,
                        last.timestamp_ns
                    );
                }
            }

            let pose = TrackingPose::new(rec.qx, rec.qy, rec.qz, rec.qw, rec.tx, rec.ty, rec.tz);
            if pose.to_se3().is_err() {
                warn!(row = row + 1, "degenerate pose in log, kept for replay");
            }
            entries.push(PoseEntry {
                timestamp_ns: rec.timestamp_ns,
                pose,
            });
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recording length in seconds.
    pub fn duration_s(&self) -> f64 {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => (last.timestamp_ns - first.timestamp_ns) as f64 / 1e9,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const LOG: &str = "\
# timestamp_ns, qx, qy, qz, qw, tx, ty, tz
1000000000, 0, 0, 0, 1, 0.0, 0.0, 0.0
1500000000, 0, 0.0998334, 0, 0.9950042, 0.1, 0.0, -0.2
# pause
3000000000, 0, 0, 0, 1, 0.5, 0.0, -1.0
";

    #[test]
    fn test_parse_log() {
        let log = PoseLog::from_reader(LOG.as_bytes()).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log.entries[1].timestamp_ns, 1_500_000_000);
        assert_relative_eq!(log.entries[2].pose.translation.z, -1.0);
        assert_relative_eq!(log.duration_s(), 2.0);
    }

    #[test]
    fn test_backwards_timestamps_rejected() {
        let bad = "2,0,0,0,1,0,0,0\n1,0,0,0,1,0,0,0\n";
        assert!(PoseLog::from_reader(bad.as_bytes()).is_err());
    }

    #[test]
    fn test_short_row_rejected() {
        let bad = "1,0,0,0,1,0,0\n";
        assert!(PoseLog::from_reader(bad.as_bytes()).is_err());
    }
}
