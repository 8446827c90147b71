//! FARS - accident file loading, monthly summaries and state maps
//!
//! Reads yearly `accident_<year>.csv.bz2` files from the Fatality Analysis
//! Reporting System, counts accidents per month and year, and plots accident
//! locations for a single state.

pub mod charts;
pub mod config;
pub mod data;

pub use charts::{MapError, MapOutcome, StateOutlines, StatePlotter};
pub use config::FarsConfig;
pub use data::{make_filename, read_file, FarsReader, LoaderError, Summarizer, Year};
