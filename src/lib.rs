#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the NDN segmented-object fetcher library.
//! NDN 分段对象抓取器库的根。

pub mod config;
pub mod error;
pub mod packet;
pub mod fetcher;

pub mod congestion;
pub mod core;

pub use config::{Config, SegmentRange, TaskDef};
pub use error::{Error, ErrorKind, Result};
pub use fetcher::{Fetcher, TaskContext, TaskId};
