//! Charts module - State map rendering

mod outline;
mod plotter;

pub use outline::{Bounds, OutlineError, StateOutlines};
pub use plotter::{MapError, MapOutcome, StatePlotter, LATITUDE_SENTINEL, LONGITUDE_SENTINEL};
