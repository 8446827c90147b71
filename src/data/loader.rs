//! Accident File Loader Module
//! Resolves per-year file names and reads bzip2-compressed FARS CSV files using Polars.

use bzip2::read::MultiBzDecoder;
use polars::prelude::*;
use rayon::prelude::*;
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("file '{}' does not exist", .0.display())]
    FileNotFound(PathBuf),
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse '{}': {source}", path.display())]
    Csv { path: PathBuf, source: PolarsError },
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a numeric year")]
pub struct ParseYearError(String);

/// Report year, used both as a file lookup key and as a summary column label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Year(i32);

impl Year {
    pub fn new(year: i32) -> Self {
        Self(year)
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Year {
    fn from(year: i32) -> Self {
        Self(year)
    }
}

impl From<u16> for Year {
    fn from(year: u16) -> Self {
        Self(i32::from(year))
    }
}

/// Text is coerced the way numeric input would be: "2013", " 2013 " and
/// "2013.0" all name the same year. Fractions truncate toward zero.
impl FromStr for Year {
    type Err = ParseYearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(year) = trimmed.parse::<i32>() {
            return Ok(Self(year));
        }

        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= i32::MIN as f64 && v < i32::MAX as f64 + 1.0 => {
                Ok(Self(v.trunc() as i32))
            }
            _ => Err(ParseYearError(s.to_string())),
        }
    }
}

impl TryFrom<&str> for Year {
    type Error = ParseYearError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Canonical file name for a report year, e.g. `accident_2013.csv.bz2`.
///
/// No range check is made: every year yields a well-formed name whether or
/// not such a file exists.
pub fn make_filename(year: impl Into<Year>) -> String {
    format!("accident_{}.csv.bz2", year.into())
}

/// Read one compressed accident file into memory.
///
/// Malformed cells are read as null instead of failing the whole file.
pub fn read_file(path: impl AsRef<Path>) -> Result<DataFrame, LoaderError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoaderError::FileNotFound(path.to_path_buf()));
    }

    let start = Instant::now();
    let io_err = |source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut raw = Vec::new();
    MultiBzDecoder::new(file)
        .read_to_end(&mut raw)
        .map_err(io_err)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .with_ignore_errors(true)
        .into_reader_with_file_handle(Cursor::new(raw))
        .finish()
        .map_err(|source| LoaderError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "accident file loaded"
    );
    Ok(df)
}

/// Project a loaded file down to its (MONTH, year) pairs.
///
/// `year` is always the requested year, never a value read from the file.
pub fn month_year_table(df: &DataFrame, year: Year) -> PolarsResult<DataFrame> {
    df.clone()
        .lazy()
        .select([
            col("MONTH").cast(DataType::Int64),
            lit(year.get()).alias("year"),
        ])
        .collect()
}

/// Reads yearly accident files from a data directory.
#[derive(Debug, Clone)]
pub struct FarsReader {
    data_dir: PathBuf,
}

impl Default for FarsReader {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FarsReader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Full path of the file holding `year`'s records.
    pub fn path_for(&self, year: Year) -> PathBuf {
        self.data_dir.join(make_filename(year))
    }

    /// Load the complete file for one year.
    pub fn read_year(&self, year: Year) -> Result<DataFrame, LoaderError> {
        read_file(self.path_for(year))
    }

    /// Load each year independently, keeping every failure in its slot.
    ///
    /// The output has the same length and order as `years`; duplicates are
    /// read once per occurrence.
    pub fn try_read_years(&self, years: &[Year]) -> Vec<Result<DataFrame, LoaderError>> {
        years
            .par_iter()
            .map(|&year| -> Result<DataFrame, LoaderError> {
                let df = self.read_year(year)?;
                Ok(month_year_table(&df, year)?)
            })
            .collect()
    }

    /// Load (MONTH, year) tables for each year, substituting `None` for
    /// years that could not be read. Each failure is logged as a warning.
    pub fn read_years(&self, years: &[Year]) -> Vec<Option<DataFrame>> {
        self.try_read_years(years)
            .into_iter()
            .zip(years)
            .map(|(result, year)| match result {
                Ok(df) => Some(df),
                Err(e) => {
                    warn!(%year, error = %e, "invalid year, skipping");
                    None
                }
            })
            .collect()
    }
}
