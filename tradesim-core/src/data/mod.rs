//! Market data feeds.
//!
//! Data acquisition lives outside this crate. A feed only has to replay
//! already-available events in order, and be restartable so the same data
//! can drive several runs.

pub mod feed;

pub use feed::{EventIter, FeedError, InMemoryFeed, MarketDataFeed};
