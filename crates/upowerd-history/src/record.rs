//! The four tracked series kinds and the record format shared by the
//! in-memory ring and the persistent file store.

use upowerd_device::DeviceState;

/// Which of the four per-device series a sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    /// Instantaneous charge/discharge rate, in W.
    Rate,
    /// Charge percentage.
    Charge,
    /// Estimated time-to-full, in seconds.
    TimeToFull,
    /// Estimated time-to-empty, in seconds.
    TimeToEmpty,
}

impl SeriesKind {
    /// All four series, in a fixed order used when recording a device tick.
    pub const ALL: [SeriesKind; 4] = [
        SeriesKind::Rate,
        SeriesKind::Charge,
        SeriesKind::TimeToFull,
        SeriesKind::TimeToEmpty,
    ];

    /// The `<kind>` component of `history-<kind>-<hash>.dat`.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Rate => "rate",
            Self::Charge => "charge",
            Self::TimeToFull => "time-full",
            Self::TimeToEmpty => "time-empty",
        }
    }
}

/// One `(timestamp, value, state)` sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    /// Unix timestamp, in seconds.
    pub unix_seconds: u64,
    /// The series value at this timestamp.
    pub value: f64,
    /// Device state at the time of the sample, for context when charting.
    pub state: DeviceState,
}

impl Record {
    /// Formats as the on-disk line: `unix_seconds<TAB>value<TAB>state_tag`.
    pub fn to_line(self) -> String {
        format!("{}\t{}\t{}", self.unix_seconds, self.value, self.state.slug())
    }

    /// Parses a line written by [`Record::to_line`]. Returns `None` for a
    /// malformed line rather than failing the whole read.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split('\t');
        let unix_seconds = parts.next()?.parse().ok()?;
        let value = parts.next()?.parse().ok()?;
        let state = DeviceState::parse(parts.next()?);
        Some(Self {
            unix_seconds,
            value,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips_through_line_format() {
        let record = Record {
            unix_seconds: 12345,
            value: 42.5,
            state: DeviceState::Discharging,
        };
        let line = record.to_line();
        let parsed = Record::parse_line(&line).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn malformed_line_yields_none() {
        assert!(Record::parse_line("not-a-record").is_none());
    }
}
