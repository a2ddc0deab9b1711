#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickerdata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching for ticker data.
//!
//! - [`TtlCache`] - bounded, TTL-expiring, LRU-evicting memoizing cache

/// TTL cache implementation.
pub mod ttl;

pub use ttl::{CacheStats, TtlCache};
