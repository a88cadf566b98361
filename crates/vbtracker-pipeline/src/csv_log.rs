//! Loader for recorded blob logs.
//!
//! Each line after the header holds
//! `refx, refy, refz, refqw, refqx, refqy, refqz, sec, usec` followed by
//! zero or more `x, y, size` blob triples.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, error, info, warn};
use nalgebra::Translation3;
use thiserror::Error;
use vbtracker_core::{BeaconMeasurement, Iso3, Quat, Real, TimeValue, UnitQuat, Vec3};

/// Errors that prevent a log from being read at all.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("could not open log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("header row is empty or missing")]
    MissingHeader,
    #[error("i/o error while reading log: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error while reading log: {0}")]
    Csv(#[from] csv::Error),
}

/// Reasons a single data row is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("missing field {index} ({name})")]
    MissingField { index: usize, name: &'static str },
    #[error("field {index} ({name}) is not a valid number: {text:?}")]
    InvalidNumber {
        index: usize,
        name: &'static str,
        text: String,
    },
}

const REQUIRED_FIELDS: [&str; 9] = [
    "refx", "refy", "refz", "refqw", "refqx", "refqy", "refqz", "sec", "usec",
];
const BEACON_FIELDS: [&str; 3] = ["x", "y", "size"];

/// One recorded frame: ground-truth pose, time stamp and detected blobs.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub timestamp: TimeValue,
    pub reference_translation: Vec3,
    /// Reference rotation exactly as recorded (not renormalised).
    pub reference_rotation: Quat,
    pub measurements: Vec<BeaconMeasurement>,
}

fn parse_field<T: std::str::FromStr>(
    fields: &[&str],
    index: usize,
    name: &'static str,
) -> Result<T, RowError> {
    let text = fields
        .get(index)
        .ok_or(RowError::MissingField { index, name })?;
    text.parse().map_err(|_| RowError::InvalidNumber {
        index,
        name,
        text: text.to_string(),
    })
}

impl MeasurementRow {
    /// Parse a row from its already-split, trimmed fields.
    ///
    /// Trailing empty fields are ignored. Blob values are grouped in
    /// triples; one or two leftover values at the end are dropped.
    pub fn parse_fields(fields: &[&str]) -> Result<Self, RowError> {
        let mut end = fields.len();
        while end > REQUIRED_FIELDS.len() && fields[end - 1].is_empty() {
            end -= 1;
        }
        let fields = &fields[..end];

        let mut req = [0.0 as Real; 7];
        for (i, slot) in req.iter_mut().enumerate() {
            *slot = parse_field(fields, i, REQUIRED_FIELDS[i])?;
        }
        let seconds: i64 = parse_field(fields, 7, REQUIRED_FIELDS[7])?;
        let microseconds: i32 = parse_field(fields, 8, REQUIRED_FIELDS[8])?;

        let blob_fields = &fields[REQUIRED_FIELDS.len()..];
        let mut measurements = Vec::with_capacity(blob_fields.len() / 3);
        for (k, _) in blob_fields.chunks_exact(3).enumerate() {
            let base = REQUIRED_FIELDS.len() + 3 * k;
            let mut v = [0.0 as Real; 3];
            for (j, slot) in v.iter_mut().enumerate() {
                *slot = parse_field(fields, base + j, BEACON_FIELDS[j])?;
            }
            measurements.push(BeaconMeasurement::at_reference_size(v[0], v[1], v[2]));
        }
        let leftover = blob_fields.len() % 3;
        if leftover != 0 {
            debug!("dropping {} trailing blob value(s)", leftover);
        }

        Ok(Self {
            timestamp: TimeValue::new(seconds, microseconds),
            reference_translation: Vec3::new(req[0], req[1], req[2]),
            reference_rotation: Quat::new(req[3], req[4], req[5], req[6]),
            measurements,
        })
    }

    /// Reference pose with the rotation renormalised.
    pub fn reference_pose(&self) -> Iso3 {
        Iso3::from_parts(
            Translation3::from(self.reference_translation),
            UnitQuat::from_quaternion(self.reference_rotation),
        )
    }
}

/// Ordered, immutable set of the valid rows of a recorded log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementLog {
    rows: Vec<MeasurementRow>,
}

impl MeasurementLog {
    pub fn from_rows(rows: Vec<MeasurementRow>) -> Self {
        Self { rows }
    }

    /// Load a log, degrading any file-level failure to an empty log.
    ///
    /// An empty log means there is nothing to replay; the cause is reported
    /// through the `log` facade.
    pub fn load(path: impl AsRef<Path>, delimiter: u8) -> Self {
        let path = path.as_ref();
        match Self::try_load(path, delimiter) {
            Ok(log) => log,
            Err(err) => {
                error!("could not load {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    pub fn try_load(path: impl AsRef<Path>, delimiter: u8) -> Result<Self, LogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| LogError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let log = Self::from_reader(BufReader::new(file), delimiter)?;
        info!("loaded {} rows from {}", log.len(), path.display());
        Ok(log)
    }

    /// Parse a log from any buffered reader. The first line is the header.
    pub fn from_reader<R: BufRead>(mut reader: R, delimiter: u8) -> Result<Self, LogError> {
        // Only the presence of a header matters, not its encoding.
        let mut header = Vec::new();
        if reader.read_until(b'\n', &mut header)? == 0 || header.iter().all(u8::is_ascii_whitespace) {
            return Err(LogError::MissingHeader);
        }

        let mut csv = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(Trim::All)
            .delimiter(delimiter)
            .from_reader(reader);

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        loop {
            match csv.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => {}
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    warn!("skipping unreadable row: {}", err);
                    continue;
                }
            }
            // The header was consumed before the csv reader saw the input.
            let line = record.position().map_or(0, |p| p.line() + 1);
            let fields: Vec<&str> = record.iter().collect();
            if fields.iter().all(|f| f.is_empty()) {
                continue;
            }
            match MeasurementRow::parse_fields(&fields) {
                Ok(row) => {
                    debug!("line {}: {} blobs", line, row.measurements.len());
                    rows.push(row);
                }
                Err(err) => warn!(
                    "line {}: dropping row ({}): {}",
                    line,
                    err,
                    fields.join(char::from(delimiter).to_string().as_str())
                ),
            }
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&MeasurementRow> {
        self.rows.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MeasurementRow> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a MeasurementLog {
    type Item = &'a MeasurementRow;
    type IntoIter = std::slice::Iter<'a, MeasurementRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
