//! Bird call downloader engine.
//!
//! Two independent pipelines pull recordings into a local tree:
//! Xeno-Canto (paginated JSON catalog, ranked and capped per species) and the
//! Macaulay Library (eBird taxonomy plus HTML catalog scraping with region
//! fallback). See [`pipeline::DownloadOrchestrator`] for the entry points.

pub mod config;
pub mod dedupe;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod logging;
pub mod macaulay;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod sanitize;
pub mod selector;
pub mod store;
pub mod tui;
pub mod xeno_canto;
