//! Dataset loading, label derivation, and the per-session dataset cache.
//!
//! Loading is a two-pass affair: the first pass reads and type-checks every
//! raw row, the second derives display records once the country groups are
//! known. Country groups are computed over the whole file before any filter
//! runs and never change for the lifetime of the [`Dataset`].

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    config::DEFAULT_COUNTRY_THRESHOLD,
    filter::DateRange,
    io_utils::{self, CsvSource},
    labels::LabelSet,
    record::{Booking, CountryGroups, REQUIRED_COLUMNS, RawBooking, UnmappedCode},
};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{path:?} is missing required column(s): {}", columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },
    #[error("Row {row}: cannot parse field: {source}")]
    InvalidField {
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("Row {row}: unrecognised month name '{value}'")]
    UnknownMonth { row: usize, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub country_threshold: usize,
    pub strict_months: bool,
    pub labels: LabelSet,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            country_threshold: DEFAULT_COUNTRY_THRESHOLD,
            strict_months: false,
            labels: LabelSet::default(),
        }
    }
}

/// The full, read-only booking table for a session.
#[derive(Debug, Clone)]
pub struct Dataset {
    bookings: Vec<Booking>,
    countries: CountryGroups,
    labels: LabelSet,
}

impl Dataset {
    /// Derives a dataset from raw rows already in memory.
    pub fn from_raw(rows: &[RawBooking], options: &LoadOptions) -> Result<Self> {
        let countries = CountryGroups::from_raw(rows, options.country_threshold);
        let mut bookings = Vec::with_capacity(rows.len());
        let mut unmapped: BTreeMap<UnmappedCode, (usize, usize)> = BTreeMap::new();

        for (idx, raw) in rows.iter().enumerate() {
            let row_number = idx + 2;
            let (booking, issues) = Booking::derive(raw, &options.labels, &countries);
            for issue in issues {
                if options.strict_months && issue.column == "arrival_date_month" {
                    return Err(LoadError::UnknownMonth {
                        row: row_number,
                        value: issue.value,
                    }
                    .into());
                }
                unmapped
                    .entry(issue)
                    .and_modify(|(_, count)| *count += 1)
                    .or_insert((row_number, 1));
            }
            bookings.push(booking);
        }

        for (code, (first_row, count)) in &unmapped {
            warn!(
                "Column '{}' value '{}' has no mapping; labelled '{}' ({} row(s), first at row {})",
                code.column, code.value, options.labels.unspecified, count, first_row
            );
        }

        Ok(Self {
            bookings,
            countries,
            labels: options.labels.clone(),
        })
    }

    pub fn load(source: &CsvSource, options: &LoadOptions) -> Result<Self> {
        let rows = read_raw_rows(source)?;
        let dataset = Self::from_raw(&rows, options)
            .with_context(|| format!("Deriving labels for {:?}", source.path))?;
        info!(
            "Loaded {} booking(s) from {:?}; {} country group(s) above {}",
            dataset.len(),
            source.path,
            dataset.countries.top_countries().count(),
            dataset.countries.threshold()
        );
        Ok(dataset)
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Borrowed view over every row.
    pub fn all(&self) -> Vec<&Booking> {
        self.bookings.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn countries(&self) -> &CountryGroups {
        &self.countries
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Earliest and latest valid arrival dates; `None` when no row has one.
    pub fn date_bounds(&self) -> Option<DateRange> {
        let mut dates = self.bookings.iter().filter_map(|b| b.arrival_date);
        let first = dates.next()?;
        let (start, end) = dates.fold((first, first), |(lo, hi): (NaiveDate, NaiveDate), d| {
            (lo.min(d), hi.max(d))
        });
        Some(DateRange::new(start, end))
    }
}

pub fn read_raw_rows(source: &CsvSource) -> Result<Vec<RawBooking>> {
    let mut reader = source.open()?;
    let headers = io_utils::reader_headers(&mut reader, source.encoding)?;
    validate_headers(&source.path, &headers)?;

    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let row_number = idx + 2;
        let record = record.with_context(|| format!("Reading row {row_number}"))?;
        let decoded = io_utils::decode_record(&record, source.encoding)
            .with_context(|| format!("Decoding row {row_number}"))?;
        let raw: RawBooking = decoded
            .deserialize(Some(&headers))
            .map_err(|source| LoadError::InvalidField {
                row: row_number,
                source,
            })?;
        rows.push(raw);
    }
    debug!("Read {} raw row(s) from {:?}", rows.len(), source.path);
    Ok(rows)
}

fn validate_headers(path: &Path, headers: &csv::StringRecord) -> Result<(), LoadError> {
    let missing = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !headers.iter().any(|header| header == **required))
        .map(|name| name.to_string())
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        })
    }
}

/// Memoises loaded datasets by source path and modification time.
#[derive(Debug, Default)]
pub struct DatasetCache {
    options: LoadOptions,
    entries: HashMap<PathBuf, (SystemTime, Arc<Dataset>)>,
}

impl DatasetCache {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            entries: HashMap::new(),
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn load(&mut self, source: &CsvSource) -> Result<Arc<Dataset>> {
        let key = source
            .path
            .canonicalize()
            .with_context(|| format!("Resolving input path {:?}", source.path))?;
        let modified = source.modified()?;
        if let Some((stamp, dataset)) = self.entries.get(&key)
            && *stamp == modified
        {
            debug!("Dataset cache hit for {key:?}");
            return Ok(Arc::clone(dataset));
        }
        debug!("Dataset cache miss for {key:?}");
        let dataset = Arc::new(Dataset::load(source, &self.options)?);
        self.entries
            .insert(key, (modified, Arc::clone(&dataset)));
        Ok(dataset)
    }

    pub fn invalidate(&mut self, path: &Path) {
        if let Ok(key) = path.canonicalize() {
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::raw;

    #[test]
    fn missing_headers_are_all_listed() {
        let headers = csv::StringRecord::from(vec!["hotel_type", "is_canceled"]);
        let err = validate_headers(Path::new("x.csv"), &headers).expect_err("must fail");
        match err {
            LoadError::MissingColumns { columns, .. } => {
                assert_eq!(columns.len(), REQUIRED_COLUMNS.len() - 2);
                assert!(columns.contains(&"adr".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn strict_months_turns_unknown_month_into_error() {
        let mut row = raw("PRT");
        row.arrival_date_month = "Thermidor".into();
        let options = LoadOptions {
            strict_months: true,
            ..LoadOptions::default()
        };
        let err = Dataset::from_raw(&[row.clone()], &options).expect_err("strict");
        assert!(err.to_string().contains("Thermidor"));

        let lenient = Dataset::from_raw(&[row], &LoadOptions::default()).expect("lenient");
        assert_eq!(lenient.bookings()[0].arrival_date, None);
    }

    #[test]
    fn date_bounds_skip_missing_dates() {
        let mut late = raw("PRT");
        late.arrival_date_year = 2017;
        let mut broken = raw("PRT");
        broken.arrival_date_month = "Nope".into();
        let dataset =
            Dataset::from_raw(&[raw("PRT"), late, broken], &LoadOptions::default()).expect("load");
        let bounds = dataset.date_bounds().expect("bounds");
        assert_eq!(bounds.start, NaiveDate::from_ymd_opt(2016, 3, 14).unwrap());
        assert_eq!(bounds.end, NaiveDate::from_ymd_opt(2017, 3, 14).unwrap());
    }

    #[test]
    fn empty_dataset_has_no_bounds() {
        let dataset = Dataset::from_raw(&[], &LoadOptions::default()).expect("load");
        assert!(dataset.is_empty());
        assert!(dataset.date_bounds().is_none());
    }
}
