//! # Consultant Index
//!
//! Keeps a local, semantically searchable index of the consultants held in
//! a Zoho CRM.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────┐
//! │  Zoho CRM   │──▶│  Sync orchestrator    │──▶│  SQLite   │
//! │  Contacts   │   │ canonicalize + embed │   │ + vectors │
//! └─────────────┘   └──────────┬───────────┘   └────┬─────┘
//!                              │                    │
//!                              ▼                    ▼
//!                     ┌────────────────┐      ┌──────────┐
//!                     │ JSON snapshot  │      │   CLI    │
//!                     │  (rotated)     │      │  (cidx)  │
//!                     └────────────────┘      └──────────┘
//! ```
//!
//! Pure logic (data model, canonical text, ranking, the `Store` and
//! `Embedder` traits) lives in the `consultant-index-core` crate; this
//! crate holds everything that does I/O.
//!
//! ## Quick Start
//!
//! ```bash
//! cidx init                          # create database
//! cidx sync                          # full sync from Zoho
//! cidx search "nonprofit finance"    # semantic search
//! cidx find-name rich                # name lookup
//! cidx schedule                      # sync now, then every 24h
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment secrets |
//! | [`error`] | Typed errors for config, CRM calls, sync and records |
//! | [`connector_zoho`] | Zoho CRM connector |
//! | [`extract`] | Attachment text extraction |
//! | [`embedding`] | Embedding providers |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`sync`] | Sync orchestrator |
//! | [`scheduler`] | Periodic sync |
//! | [`snapshot`] | Recovery snapshot rotation |
//! | [`db`] / [`migrate`] | Database connection and schema |

pub mod config;
pub mod connector_zoho;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod get;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod scheduler;
pub mod search;
pub mod snapshot;
pub mod sqlite_store;
pub mod stats;
pub mod sync;
pub mod traits;
