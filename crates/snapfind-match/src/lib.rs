//! # snapfind-match
//!
//! Batched face search over a list of candidate photos.
//!
//! A [`FaceMatcher`] partitions the candidates, asks a vision oracle which
//! photos in each batch show the reference person, and merges the confirmed
//! IDs into one [`MatchReport`](snapfind_core::MatchReport).

pub mod batch;
pub mod config;
pub mod orchestrator;

pub use batch::{batch_count, partition};
pub use config::{FaceMatchConfig, MatcherConfig};
pub use orchestrator::FaceMatcher;
