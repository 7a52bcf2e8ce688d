//! Data model shared by the acquisition, matching and backfill stages.

pub mod candidate;
pub mod config;
pub mod document;
pub mod order;
