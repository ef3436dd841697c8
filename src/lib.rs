//! SCOUT: crypto narrative and on-chain opportunity scanner
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod engine;
pub mod notify;
pub mod signals;
pub mod storage;
pub mod strategy;
pub mod types;
