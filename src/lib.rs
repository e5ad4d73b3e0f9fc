//! Calendar Agent: turns actionable inbox messages into calendar events.

pub mod agent;
pub mod calendar;
pub mod config;
pub mod error;
pub mod inbox;
pub mod pipeline;
pub mod server;

#[cfg(test)]
mod test_support;
