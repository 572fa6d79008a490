//! dartfin core: registry, classification, statement retrieval, XBRL facts.
//!
//! This crate contains the acquisition side of the pipeline:
//! - Domain types (corporate records, statement fragments, facts)
//! - The `DisclosureApi` trait, its OpenDART client and an in-memory stub
//! - A token-bucket rate limiter shared by every outbound call
//! - Registry resolution with a checksummed, TTL-bounded snapshot cache
//! - Listing-status classification
//! - Year-window statement retrieval with consolidated → separate fallback
//! - XBRL fact extraction and keyword statement classification

pub mod api;
pub mod classify;
pub mod domain;
pub mod facts;
pub mod registry;
pub mod retrieval;

pub use classify::{ClassificationService, Unclassifiable};
pub use retrieval::{CallFailure, EntityRetrieval, RetrievalConfig, RetrievalEngine};
