//! CSV market data feed.
//!
//! Expected columns: `timestamp,instrument_id,price,volume`, one event per
//! row, timestamps in RFC 3339. Rows are read lazily, so a run that aborts
//! early never reads the rest of the file.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use tradesim_core::data::{EventIter, FeedError, InMemoryFeed, MarketDataFeed};
use tradesim_core::domain::MarketEvent;

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: DateTime<Utc>,
    instrument_id: String,
    price: f64,
    volume: f64,
}

impl From<CsvRow> for MarketEvent {
    fn from(row: CsvRow) -> Self {
        MarketEvent::new(row.timestamp, row.instrument_id, row.price, row.volume)
    }
}

fn feed_error(err: csv::Error) -> FeedError {
    let line = err.position().map_or(0, |p| p.line());
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io) => FeedError::Io(io),
        _ => FeedError::Malformed { line, message },
    }
}

/// Feed backed by a CSV file on disk. Each call to `events` reopens the file.
#[derive(Debug, Clone)]
pub struct CsvFeed {
    path: PathBuf,
    name: String,
}

impl CsvFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map_or_else(|| "csv".to_string(), |s| s.to_string_lossy().into_owned());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file into memory, for runs that share one dataset.
    pub fn load(&self) -> Result<InMemoryFeed, FeedError> {
        let events = self.events().collect::<Result<Vec<_>, _>>()?;
        Ok(InMemoryFeed::new(events).with_name(self.name.clone()))
    }
}

impl MarketDataFeed for CsvFeed {
    fn events(&self) -> EventIter<'_> {
        let reader = match csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
        {
            Ok(reader) => reader,
            Err(err) => return Box::new(std::iter::once(Err(feed_error(err)))),
        };
        Box::new(
            reader
                .into_deserialize::<CsvRow>()
                .map(|row| row.map(MarketEvent::from).map_err(feed_error)),
        )
    }

    fn name(&self) -> &str {
        &self.name
    }
}
