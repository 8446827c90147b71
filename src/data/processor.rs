//! Summary Processor Module
//! Stacks per-year (MONTH, year) tables and pivots accident counts into a month-by-year table.

use crate::data::{FarsReader, Year};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Builds the month-by-year accident count table.
pub struct Summarizer;

impl Summarizer {
    /// Read every requested year and summarize the ones that loaded.
    ///
    /// Output columns: ["MONTH", <year>...]
    pub fn summarize_years(reader: &FarsReader, years: &[Year]) -> Result<DataFrame, SummaryError> {
        let loaded: Vec<(Year, DataFrame)> = years
            .iter()
            .copied()
            .zip(reader.read_years(years))
            .filter_map(|(year, table)| Some((year, table?)))
            .collect();
        Self::summarize_tables(&loaded)
    }

    /// Stack (MONTH, year) tables, count rows per (year, MONTH) and pivot
    /// years into columns. Every listed year gets a column, even one whose
    /// table has no rows. Missing combinations stay null.
    pub fn summarize_tables(loaded: &[(Year, DataFrame)]) -> Result<DataFrame, SummaryError> {
        let Some(((_, first), rest)) = loaded.split_first() else {
            return Ok(Self::empty_summary()?);
        };

        let mut stacked = first.clone();
        for (_, df) in rest {
            stacked.vstack_mut(df)?;
        }

        let counts = stacked
            .lazy()
            .group_by([col("year"), col("MONTH")])
            .agg([len().cast(DataType::UInt32).alias("n")])
            .collect()?;

        debug!(rows = counts.height(), "grouped accident counts");
        let years: BTreeSet<i32> = loaded.iter().map(|(year, _)| year.get()).collect();
        Self::pivot_counts(&counts, &years)
    }

    /// Turn long (year, MONTH, n) counts into one row per month and one
    /// column per entry of `years`.
    fn pivot_counts(counts: &DataFrame, years: &BTreeSet<i32>) -> Result<DataFrame, SummaryError> {
        let year_col = counts.column("year")?.cast(&DataType::Int32)?;
        let months = counts.column("MONTH")?.cast(&DataType::Int64)?;
        let n = counts.column("n")?;

        let mut cells: BTreeMap<i64, HashMap<i32, u32>> = BTreeMap::new();

        for ((year, month), count) in year_col
            .i32()?
            .into_iter()
            .zip(months.i64()?.into_iter())
            .zip(n.u32()?.into_iter())
        {
            if let (Some(year), Some(month), Some(count)) = (year, month, count) {
                cells.entry(month).or_default().insert(year, count);
            }
        }

        let month_keys: Vec<i64> = cells.keys().copied().collect();
        let mut columns = vec![Column::new("MONTH".into(), month_keys)];

        for year in years {
            let values: Vec<Option<u32>> = cells
                .values()
                .map(|by_year| by_year.get(year).copied())
                .collect();
            columns.push(Column::new(year.to_string().into(), values));
        }

        Ok(DataFrame::new(columns)?)
    }

    fn empty_summary() -> PolarsResult<DataFrame> {
        DataFrame::new(vec![Column::new("MONTH".into(), Vec::<i64>::new())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{write_accidents, write_raw, Row};
    use tempfile::tempdir;

    fn cell(df: &DataFrame, column: &str, row: usize) -> Option<u32> {
        df.column(column).unwrap().u32().unwrap().get(row)
    }

    fn total(df: &DataFrame) -> u64 {
        df.get_columns()
            .iter()
            .filter(|c| c.name().as_str() != "MONTH")
            .map(|c| c.u32().unwrap().into_iter().flatten().map(u64::from).sum::<u64>())
            .sum()
    }

    #[test]
    fn test_summarize_two_years() {
        let dir = tempdir().unwrap();
        write_accidents(
            dir.path(),
            2013,
            &[
                Row::new(1, 1, 34.0, -86.0),
                Row::new(1, 1, 34.1, -86.1),
                Row::new(2, 6, 36.0, -119.0),
            ],
        );
        write_accidents(
            dir.path(),
            2014,
            &[Row::new(2, 1, 34.0, -86.0), Row::new(12, 6, 36.0, -119.0)],
        );
        let reader = FarsReader::new(dir.path());

        let summary =
            Summarizer::summarize_years(&reader, &[Year::new(2014), Year::new(2013)]).unwrap();

        let names: Vec<String> = summary
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["MONTH", "2013", "2014"]);

        let months: Vec<Option<i64>> =
            summary.column("MONTH").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(months, vec![Some(1), Some(2), Some(12)]);

        assert_eq!(cell(&summary, "2013", 0), Some(2));
        assert_eq!(cell(&summary, "2013", 1), Some(1));
        assert_eq!(cell(&summary, "2013", 2), None);
        assert_eq!(cell(&summary, "2014", 0), None);
        assert_eq!(cell(&summary, "2014", 1), Some(1));
        assert_eq!(cell(&summary, "2014", 2), Some(1));
        assert_eq!(total(&summary), 5);
    }

    #[test]
    fn test_summarize_single_year_keeps_shape() {
        let dir = tempdir().unwrap();
        write_accidents(
            dir.path(),
            2015,
            &[Row::new(7, 1, 34.0, -86.0), Row::new(7, 1, 34.0, -86.0)],
        );
        let reader = FarsReader::new(dir.path());

        let summary = Summarizer::summarize_years(&reader, &[Year::new(2015)]).unwrap();
        assert_eq!(summary.width(), 2);
        assert_eq!(summary.height(), 1);
        assert_eq!(cell(&summary, "2015", 0), Some(2));
    }

    #[test]
    fn test_summarize_skips_missing_years() {
        let dir = tempdir().unwrap();
        write_accidents(dir.path(), 2013, &[Row::new(4, 1, 34.0, -86.0)]);
        let reader = FarsReader::new(dir.path());

        let summary =
            Summarizer::summarize_years(&reader, &[Year::new(2013), Year::new(2016)]).unwrap();
        assert_eq!(summary.width(), 2);
        assert!(summary.column("2016").is_err());
        assert_eq!(total(&summary), 1);
    }

    #[test]
    fn test_summarize_all_missing_is_empty() {
        let dir = tempdir().unwrap();
        let reader = FarsReader::new(dir.path());

        let summary =
            Summarizer::summarize_years(&reader, &[Year::new(2016), Year::new(2017)]).unwrap();
        assert_eq!(summary.height(), 0);
        assert_eq!(summary.width(), 1);
    }

    #[test]
    fn test_summarize_duplicate_years_share_column() {
        let dir = tempdir().unwrap();
        write_accidents(dir.path(), 2013, &[Row::new(5, 1, 34.0, -86.0)]);
        let reader = FarsReader::new(dir.path());

        let summary =
            Summarizer::summarize_years(&reader, &[Year::new(2013), Year::new(2013)]).unwrap();
        assert_eq!(summary.width(), 2);
        assert_eq!(cell(&summary, "2013", 0), Some(2));
    }

    #[test]
    fn test_summarize_header_only_year_keeps_column() {
        let dir = tempdir().unwrap();
        write_raw(dir.path(), 2013, "STATE,ST_CASE,MONTH,LATITUDE,LONGITUD\n");
        write_accidents(dir.path(), 2014, &[Row::new(6, 1, 34.0, -86.0)]);
        let reader = FarsReader::new(dir.path());

        let summary =
            Summarizer::summarize_years(&reader, &[Year::new(2013), Year::new(2014)]).unwrap();

        let names: Vec<String> = summary
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["MONTH", "2013", "2014"]);
        assert_eq!(summary.height(), 1);
        assert_eq!(cell(&summary, "2013", 0), None);
        assert_eq!(cell(&summary, "2014", 0), Some(1));
    }

    #[test]
    fn test_summarize_only_header_only_year() {
        let dir = tempdir().unwrap();
        write_raw(dir.path(), 2013, "STATE,ST_CASE,MONTH,LATITUDE,LONGITUD\n");
        let reader = FarsReader::new(dir.path());

        let summary = Summarizer::summarize_years(&reader, &[Year::new(2013)]).unwrap();
        assert_eq!(summary.height(), 0);
        assert_eq!(summary.width(), 2);
        assert!(summary.column("2013").is_ok());
    }
}
