//! # Consultant Index Core
//!
//! Pure logic shared by the Consultant Index application: data models,
//! canonical text construction, the embedding and store abstractions, and
//! the similarity-search algorithm.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! I/O-performing implementations of [`store::Store`] and
//! [`embedding::Embedder`] live in the `consultant-index` crate.

pub mod canonical;
pub mod embedding;
pub mod error;
pub mod models;
pub mod search;
pub mod store;
