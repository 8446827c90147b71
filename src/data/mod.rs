//! Data module - accident file loading and monthly summaries

mod loader;
mod processor;

#[cfg(test)]
pub(crate) mod fixtures;

pub use loader::{
    make_filename, month_year_table, read_file, FarsReader, LoaderError, ParseYearError, Year,
};
pub use processor::{SummaryError, Summarizer};
