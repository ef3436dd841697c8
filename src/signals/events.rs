//! Optional event signals.
//!
//! An event signal looks at an asset's recent event titles and descriptions
//! and answers yes or no. As with flow signals, [`NoEventSignal`] is used
//! when the provider is disabled and leaves scores untouched.

use crate::config::EventsConfig;

pub trait EventSignal: Send + Sync {
    fn detect(&self, events: &[String]) -> bool;

    fn name(&self) -> &str;
}

/// Default provider: never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEventSignal;

impl EventSignal for NoEventSignal {
    fn detect(&self, _events: &[String]) -> bool {
        false
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Fires when any recent event mentions one of the configured keywords
/// (partnership, integration, launch and similar).
#[derive(Debug, Clone)]
pub struct PartnershipSignal {
    keywords: Vec<String>,
}

impl PartnershipSignal {
    pub fn new(keywords: impl IntoIterator<Item = String>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &EventsConfig) -> Self {
        Self::new(config.keywords.iter().cloned())
    }
}

impl EventSignal for PartnershipSignal {
    fn detect(&self, events: &[String]) -> bool {
        events.iter().any(|e| {
            let text = e.to_lowercase();
            self.keywords.iter().any(|k| text.contains(k.as_str()))
        })
    }

    fn name(&self) -> &str {
        "partnership"
    }
}

/// Build the configured event signal.
pub fn from_config(config: &EventsConfig) -> Box<dyn EventSignal> {
    if config.enabled {
        Box::new(PartnershipSignal::from_config(config))
    } else {
        Box::new(NoEventSignal)
    }
}
