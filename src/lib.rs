//! Feed-directory search with subscription reconciliation.
//!
//! `braid` answers one question well: for a search query, which matching
//! feeds does the user already follow, and which ones does the remote
//! directory know about that they don't? The two result sets arrive from
//! different worlds — a local SQLite store and an HTTP JSON API — and are
//! merged into two disjoint groups, "following" and "directory", with
//! local subscriptions taking precedence on identity collisions.
//!
//! # Architecture
//!
//! ```text
//! storage (local query) ──┐
//!                         ├── search::reconcile ── grouped results
//! directory (remote)  ────┘
//!                               │ selection
//!                               ▼
//!                       resolve (upsert-by-identity)
//! ```
//!
//! - [`storage`] - SQLite subscription store
//! - [`directory`] - remote directory search client
//! - [`search`] - result reconciliation and query sessions
//! - [`resolve`] - selection resolution into persisted feeds
//! - [`feed`] - feed document fetching and metadata extraction
//! - [`config`] - TOML configuration
//! - [`util`] - URL validation and identity normalization

pub mod config;
pub mod directory;
pub mod feed;
pub mod resolve;
pub mod search;
pub mod storage;
pub mod util;
