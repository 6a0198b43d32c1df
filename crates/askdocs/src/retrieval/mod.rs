//! Passage retrieval

pub mod client;

pub use client::RetrievalClient;
