pub mod api;
pub mod app;
pub mod attendance;
pub mod backend;
pub mod cli;
pub mod config;
pub mod doubts;
pub mod export;
pub mod global;
pub mod hands;
pub mod join;
pub mod lecture;
pub mod metadata;
pub mod protocol;
pub mod quiz;
pub mod schedule;
pub mod session;
pub mod speech;
pub mod transport;
pub mod voice;

#[cfg(test)]
mod testing;
