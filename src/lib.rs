pub mod error;
pub mod model;
pub mod resolver;
pub mod tiers;
pub mod cache;
pub mod context;
pub mod callers;
pub mod chains;
pub mod graph;
pub mod config;
pub mod scanner;
pub mod logging;
pub mod server;

#[cfg(test)]
mod testing;
