//! Resolution of identifiers into canonical records
//!
//! - `Resolver`: runs the fallback strategies against the source adapters
//! - `is_complete`: the acceptance gate every candidate record must pass
//! - `fill_gaps`: merges supplementary records into the accepted one
//! - `Method` / `StrategyCounters`: strategy tags and their statistics

mod completeness;
mod merge;
mod orchestrator;
mod strategy;

pub use completeness::{is_complete, PRICE_UNAVAILABLE, UNKNOWN_NAME};
pub use merge::fill_gaps;
pub use orchestrator::{Resolve, Resolver, ResolverOptions, EXHAUSTED_REASON};
pub use strategy::{Method, StrategyCounters, StrategyTally};
