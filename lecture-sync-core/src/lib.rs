#![doc = "lecture-sync-core: core pipeline for lecture-sync."]

//! Downloads the upstream lecture archive, merges its lecture folder into a
//! local content directory and rewrites the markdown so it runs under a WASM
//! notebook kernel.
//!
//! # Usage
//! Build a [`config::SyncConfig`], pick a [`contract::Fetcher`] (normally
//! [`download::HttpFetcher`]) and call [`synchronise::synchronise`].

pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod extract;
pub mod merge;
pub mod progress;
pub mod synchronise;
pub mod transform;
