//! # Salespipe
//!
//! A harmonizing ingestion pipeline and cursor-paginated query engine for
//! heterogeneous sales records.
//!
//! Salespipe ingests delimited and structured source documents (CSV, JSON),
//! reconciles their inconsistent column names, types, and missing-value
//! conventions into one canonical schema, and installs each ingestion run
//! as a full-replace snapshot in SQLite. The snapshot is served through a
//! filtered, cursor-paginated read API with a stable total order over
//! store-assigned ids.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌──────────────┐
//! │ Landing  │──▶│ Normalize │──▶│ Harmonize │──▶│   Snapshot   │
//! │ CSV/JSON │   │ per file  │   │   batch   │   │ replace (A/B)│
//! └──────────┘   └───────────┘   └───────────┘   └──────┬───────┘
//!                                                       │
//!                                     ┌─────────────────┤
//!                                     ▼                 ▼
//!                               ┌──────────┐      ┌──────────┐
//!                               │   CLI    │      │   HTTP   │
//!                               │  (spp)   │      │ /records │
//!                               └──────────┘      └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! spp init                      # create database
//! spp ingest                    # harmonize and persist the landing directory
//! spp query --gender Female --limit 20
//! spp serve                     # start the read API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | Per-document record normalization |
//! | [`harmonize`] | Cross-document batch harmonization |
//! | [`sources`] | Landing-directory scan |
//! | [`ingest`] | Write-path orchestration |
//! | [`store`] | Double-buffered snapshot replace |
//! | [`query`] | Filter compilation and cursor pagination |
//! | [`server`] | Read API HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod config;
pub mod db;
pub mod error;
pub mod harmonize;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod query;
pub mod server;
pub mod sources;
pub mod stats;
pub mod store;
