//! Strategy engine: composite scoring and pick selection.

pub mod scorer;
pub mod selector;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::signals::events::{self, EventSignal};
use crate::signals::flow::{self, FlowInput};
use crate::signals::{IndicatorEngine, NarrativeTagger, PresenceDatasets, PresenceResolver};
use crate::types::{AssetQuote, Narrative, PriceSeries, ScoredAsset};
use scorer::{ScoreInput, Scorer};
use selector::{Selection, Selector};

/// Raw inputs for one asset in one cycle.
#[derive(Debug, Clone)]
pub struct AssetInputs {
    pub quote: AssetQuote,
    /// `None` when the series fetch failed or returned nothing.
    pub series: Option<PriceSeries>,
    /// Recent event titles and descriptions; empty unless event fetching
    /// is enabled.
    pub events: Vec<String>,
}

impl AssetInputs {
    pub fn new(quote: AssetQuote, series: Option<PriceSeries>) -> Self {
        Self {
            quote,
            series,
            events: Vec::new(),
        }
    }

    pub fn with_events(mut self, events: Vec<String>) -> Self {
        self.events = events;
        self
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Pipelines indicators → tags → presence → flow → composite score → selection.
///
/// Instantiate once per process; the presence cache carries over between
/// cycles, everything else is stateless.
pub struct ScoringPipeline {
    indicators: IndicatorEngine,
    tagger: NarrativeTagger,
    presence: PresenceResolver,
    scorer: Scorer,
    selector: Selector,
    events: Box<dyn EventSignal>,
    flow_span: usize,
}

impl ScoringPipeline {
    pub fn new(
        indicators: IndicatorEngine,
        tagger: NarrativeTagger,
        presence: PresenceResolver,
        scorer: Scorer,
        selector: Selector,
        events: Box<dyn EventSignal>,
        flow_span: usize,
    ) -> Self {
        Self {
            indicators,
            tagger,
            presence,
            scorer,
            selector,
            events,
            flow_span,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            IndicatorEngine::new(config.indicators.clone()),
            NarrativeTagger::new(config.scoring.weight_per_tag),
            PresenceResolver::from_config(config.presence.clone()),
            Scorer::new(config.scoring.clone(), flow::from_config(&config.flow)),
            Selector::new(config.selection.clone()),
            events::from_config(&config.events),
            config.flow.volume_span,
        )
    }

    pub fn flow_signal_name(&self) -> &str {
        self.scorer.flow_signal_name()
    }

    pub fn event_signal_name(&self) -> &str {
        self.events.name()
    }

    /// Score a single asset.
    pub fn score_asset(&mut self, inputs: &AssetInputs, datasets: &PresenceDatasets, now: DateTime<Utc>) -> ScoredAsset {
        let quote = &inputs.quote;
        let indicators = inputs.series.as_ref().and_then(|s| self.indicators.compute(s));
        let flow = inputs
            .series
            .as_ref()
            .and_then(|s| FlowInput::from_series(s, self.flow_span));
        let (tags, narrative_strength) = self.tagger.tag_with_strength(&quote.narrative_text());
        let presence = self.presence.resolve(&quote.symbol, datasets, now);
        let event_signal = self.events.detect(&inputs.events);

        if indicators.is_none() {
            debug!(symbol = %quote.symbol, "No indicators, technical score is 0");
        }

        self.scorer.score(ScoreInput {
            quote,
            indicators,
            tags,
            narrative_strength,
            presence,
            flow,
            event_signal,
        })
    }

    /// Score every asset. Output is sorted by symbol so that results do not
    /// depend on fetch completion order.
    pub fn score_universe(
        &mut self,
        inputs: &[AssetInputs],
        datasets: &PresenceDatasets,
        now: DateTime<Utc>,
    ) -> Vec<ScoredAsset> {
        self.presence.evict_expired(now);

        let mut scored: Vec<ScoredAsset> = inputs
            .iter()
            .map(|i| self.score_asset(i, datasets, now))
            .collect();
        scored.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let with_indicators = scored.iter().filter(|s| s.indicators.is_some()).count();
        let real_presence = scored.iter().filter(|s| s.is_real_presence()).count();
        info!(
            assets = scored.len(),
            with_indicators,
            real_presence,
            presence_cached = self.presence.cached_len(),
            "Scoring complete"
        );
        scored
    }

    pub fn select(&self, scored: &[ScoredAsset]) -> Selection {
        let selection = self.selector.select(scored);
        info!(
            tier = %selection.tier,
            picks = selection.picks.len(),
            top_k = self.selector.config().top_k,
            "Selection complete"
        );
        for pick in &selection.picks {
            debug!(pick = %pick, "Selected");
        }
        selection
    }

    /// Most-mentioned narratives across a batch of trending texts.
    pub fn trending_narratives<S: AsRef<str>>(&self, texts: &[S], top_n: usize) -> Vec<(Narrative, usize)> {
        self.tagger.rank_mentions(texts, top_n)
    }
}

impl Default for ScoringPipeline {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
