// src/ingest/providers/mod.rs
pub mod board;
pub mod fixture;
pub mod rss;
