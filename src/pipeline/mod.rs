//! Message processing pipeline.
//!
//! Every fetched message flows through:
//! 1. `Extractor::classify()`: LLM judgment (fail-open to no action)
//! 2. `MessageProcessor::act()`: event creation and mark-read for schedulable intents
//! 3. Bookkeeping: stats and the recent-items feed for notable messages

pub mod extraction;
pub mod processor;
pub mod types;
