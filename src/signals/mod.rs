//! Per-asset signal extraction: technical indicators, narrative tags,
//! on-chain presence and optional flow and event signals.
//!
//! Everything here is deterministic given its inputs; fetching the inputs
//! is the `data` module's job.

pub mod events;
pub mod flow;
pub mod indicators;
pub mod narrative;
pub mod presence;

pub use events::{EventSignal, NoEventSignal, PartnershipSignal};
pub use flow::{FlowInput, FlowSignal, NoFlowSignal, SmartMoneyFlow};
pub use indicators::IndicatorEngine;
pub use narrative::NarrativeTagger;
pub use presence::{PresenceDatasets, PresenceResolver};
