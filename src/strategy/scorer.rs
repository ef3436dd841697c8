//! Composite opportunity scoring.
//!
//! Combines technical, narrative, on-chain and volume components into one
//! score in [0, 1] using the weights in [`ScoringConfig`]. The weights are
//! fixed for the lifetime of a `Scorer`; identical inputs always produce an
//! identical score.
//!
//! Technical sub-score (weights sum to 1.0):
//! - trend (fast EMA > slow EMA and MACD histogram > 0)
//! - RSI tier: full credit above `rsi_strong`, half credit in
//!   [`rsi_neutral`, `rsi_strong`], none below
//! - MACD bullish cross
//! - volume spike
//!
//! Volume sub-score: 1.0 on a volume spike, otherwise `flow_volume_credit`
//! when the flow signal fires, otherwise 0.
//!
//! Narrative sub-score: tag strength, plus `event_narrative_credit` when the
//! event signal fired, capped at 1.0.

use crate::config::ScoringConfig;
use crate::signals::flow::{FlowInput, FlowSignal, NoFlowSignal};
use crate::types::{round_dp, AssetQuote, IndicatorSet, NarrativeTags, PresenceInfo, ScoredAsset, SubScores};

/// Everything the scorer needs for one asset.
#[derive(Debug, Clone)]
pub struct ScoreInput<'a> {
    pub quote: &'a AssetQuote,
    /// Absent when the price series could not be fetched.
    pub indicators: Option<IndicatorSet>,
    pub tags: NarrativeTags,
    pub narrative_strength: f64,
    pub presence: PresenceInfo,
    pub flow: Option<FlowInput>,
    /// Outcome of the event signal, already evaluated by the caller.
    pub event_signal: bool,
}

pub struct Scorer {
    config: ScoringConfig,
    flow: Box<dyn FlowSignal>,
}

impl Scorer {
    pub fn new(config: ScoringConfig, flow: Box<dyn FlowSignal>) -> Self {
        Self { config, flow }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn flow_signal_name(&self) -> &str {
        self.flow.name()
    }

    fn rsi_tier(&self, rsi: f64) -> f64 {
        if rsi > self.config.rsi_strong {
            1.0
        } else if rsi >= self.config.rsi_neutral {
            0.5
        } else {
            0.0
        }
    }

    /// Weighted technical sub-score in [0, 1].
    pub fn technical_score(&self, ind: &IndicatorSet) -> f64 {
        let c = &self.config;
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let raw = c.trend_weight * flag(ind.trend_up())
            + c.rsi_weight * self.rsi_tier(ind.rsi)
            + c.cross_weight * flag(ind.bullish_cross())
            + c.spike_weight * flag(ind.volume_spike);
        raw.clamp(0.0, 1.0)
    }

    fn volume_score(&self, indicators: Option<&IndicatorSet>, flow_fired: bool) -> f64 {
        if indicators.is_some_and(|i| i.volume_spike) {
            1.0
        } else if flow_fired {
            self.config.flow_volume_credit.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn narrative_score(&self, strength: f64, event_fired: bool) -> f64 {
        let credit = if event_fired { self.config.event_narrative_credit } else { 0.0 };
        (strength + credit).clamp(0.0, 1.0)
    }

    /// Score one asset.
    pub fn score(&self, input: ScoreInput<'_>) -> ScoredAsset {
        let c = &self.config;
        let flow_fired = input.flow.as_ref().is_some_and(|f| self.flow.detect(f));

        let sub_scores = SubScores {
            technical: input
                .indicators
                .as_ref()
                .map(|i| self.technical_score(i))
                .unwrap_or(0.0),
            narrative: self.narrative_score(input.narrative_strength, input.event_signal),
            onchain: input.presence.onchain_score.clamp(0.0, 1.0),
            volume: self.volume_score(input.indicators.as_ref(), flow_fired),
        };

        let total = c.technical_weight * sub_scores.technical
            + c.narrative_weight * sub_scores.narrative
            + c.onchain_weight * sub_scores.onchain
            + c.volume_weight * sub_scores.volume;

        ScoredAsset {
            symbol: input.quote.symbol.clone(),
            name: input.quote.name.clone(),
            price: input.quote.price,
            market_cap: input.quote.market_cap,
            volume_24h: input.quote.volume_24h,
            sub_scores,
            score: round_dp(total.clamp(0.0, 1.0), 3),
            tags: input.tags,
            indicators: input.indicators,
            presence: input.presence,
            flow_signal: flow_fired,
            event_signal: input.event_signal,
        }
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default(), Box::new(NoFlowSignal))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
