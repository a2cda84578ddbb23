use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Miles per kilometer.
pub const KM_TO_MILES: Decimal = dec!(0.621371);

/// Cumulative totals are shown with this many decimal places.
pub const ROUND_DIGITS: u32 = 2;

/// Timestamp layout of the export, e.g. `Aug 7, 2021, 12:44:45 AM`.
pub const TIMESTAMP_FORMAT: &str = "%b %d, %Y, %I:%M:%S %p";

/// Column positions (0-indexed) in the activity export.
pub const DATE_COLUMN: usize = 1;
pub const TYPE_COLUMN: usize = 3;
pub const DISTANCE_COLUMN: usize = 6;

/// One activity that survived the filter. The distance is already in miles, conversion
/// happens exactly once, when the row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ActivityRecord {
    pub date: NaiveDateTime,
    pub mileage: Decimal,
}

/// Total for one calendar day. `date` is the timestamp of the first activity of that day,
/// or midnight when nothing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DailyMileage {
    pub date: NaiveDateTime,
    pub mileage: Decimal,
}

/// Running total up to and including `date`. The total is kept exact, see `rounded_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "PointSerializer")]
pub(crate) struct CumulativePoint {
    pub date: NaiveDateTime,
    pub mileage: Decimal,
    pub total_mileage: Decimal,
}

impl CumulativePoint {
    pub fn rounded_total(&self) -> Decimal {
        self.total_mileage.round_dp(ROUND_DIGITS)
    }
}

/// CSV shape of a `CumulativePoint`: a plain day and both figures rounded, computed just
/// before serialization so the series itself never accumulates rounding error.
#[derive(Serialize)]
pub(crate) struct PointSerializer {
    pub date: NaiveDate,
    pub mileage: Decimal,
    pub total_mileage: Decimal,
}

impl From<CumulativePoint> for PointSerializer {
    fn from(point: CumulativePoint) -> Self {
        Self {
            date: point.date.date(),
            mileage: point.mileage.round_dp(ROUND_DIGITS),
            total_mileage: point.rounded_total(),
        }
    }
}

/// Everything that can stop a run. None of these are retried: the pipeline is one pass
/// and the first failure ends it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot open {}: {source}", path.display())]
    InputNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: column {column} is missing")]
    MissingColumn { line: u64, column: usize },
    #[error("line {line}: timestamp {value:?} doesn't look like \"Aug 7, 2021, 12:44:45 AM\"")]
    BadTimestamp { line: u64, value: String },
    #[error("line {line}: distance {value:?} is not a number")]
    BadDistance { line: u64, value: String },
    #[error("mileage total overflows on {0}")]
    MileageOverflow(NaiveDate),
    #[error("year {0} is out of the supported calendar range")]
    InvalidYear(i32),
    #[error("nothing to plot")]
    EmptySeries,
    #[error("cannot render chart to {}: {message}", path.display())]
    Render { path: PathBuf, message: String },
}

impl Error {
    /// Whether this is a bad row in the input, as opposed to an I/O or rendering problem.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::Csv(_)
                | Error::MissingColumn { .. }
                | Error::BadTimestamp { .. }
                | Error::BadDistance { .. }
        )
    }
}
