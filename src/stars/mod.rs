//! Star-neighbour computation layer
//!
//! This module provides the core functionality for fetching star data from
//! GitHub, caching it locally, and aggregating it into a ranked neighbour
//! list.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Fetcher   │────▶│    Cache    │◀────│ Aggregator  │
//! │ (GitHub API)│     │  (SQLite)   │     │  (ranking)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! The aggregator never talks to the fetcher directly: every star list goes
//! through [`cache::StarCache::get_or_fetch`], which deduplicates concurrent
//! fetches per key and persists results across restarts.
//!
//! # Modules
//!
//! - [`cache`]: SQLite-based star-list cache with single-flight fetches
//! - [`fetcher`]: Paginated, rate-limited GitHub API client
//! - [`neighbors`]: Neighbour aggregation and ranking
//! - [`error`]: Error types for fetch and cache operations
//! - [`types`]: Common types like `NeighborRecord`

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod neighbors;
pub mod types;
