//! Test fixtures: small bzip2-compressed accident files.

use crate::data::make_filename;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use std::fmt::{self, Write as _};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// One accident record as written to a fixture file.
#[derive(Debug, Clone, Copy)]
pub struct Row {
    pub month: i64,
    pub state: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl Row {
    pub fn new(month: i64, state: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            month,
            state,
            latitude,
            longitude,
        }
    }
}

/// Write `accident_<year>.csv.bz2` into `dir` with the given rows.
pub fn write_accidents(dir: &Path, year: i32, rows: &[Row]) -> PathBuf {
    let mut csv = String::from("STATE,ST_CASE,MONTH,LATITUDE,LONGITUD\n");
    for (i, row) in rows.iter().enumerate() {
        csv.push_str(&format!(
            "{},{},{},{:.4},{:.4}\n",
            row.state,
            row.state * 10000 + i as i64,
            row.month,
            row.latitude,
            row.longitude
        ));
    }
    write_raw(dir, year, &csv)
}

/// Compress arbitrary CSV text into the file for `year`.
pub fn write_raw(dir: &Path, year: i32, csv: &str) -> PathBuf {
    let path = dir.join(make_filename(year));
    let file = File::create(&path).unwrap();
    let mut encoder = BzEncoder::new(file, Compression::default());
    encoder.write_all(csv.as_bytes()).unwrap();
    encoder.finish().unwrap();
    path
}

/// Layer that records the fields of every WARN event, one line per event.
#[derive(Clone, Default)]
pub struct WarningLog(Arc<Mutex<Vec<String>>>);

impl WarningLog {
    /// Run `f` with this log installed as the thread's subscriber.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for WarningLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::WARN {
            return;
        }
        let mut line = String::new();
        event.record(&mut FieldText(&mut line));
        self.0.lock().unwrap().push(line);
    }
}

struct FieldText<'a>(&'a mut String);

impl Visit for FieldText<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = write!(self.0, "{}={:?} ", field.name(), value);
    }
}
