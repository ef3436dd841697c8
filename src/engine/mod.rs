//! Core engine: the list → score → select → persist → notify loop.

pub mod cycle;
pub mod report;
pub mod scanner;

pub use cycle::ScanOrchestrator;
pub use report::{CycleOutcome, CycleReport};
pub use scanner::UniverseScanner;
