//! Decides which alerts fire for one observation.
//!
//! Everything here is pure: no store access, no notifications, no clock.
//! Calling it twice with the same inputs gives the same events.

use crate::models::{
    alert::normalize_symbol, Alert, FiringEvent, MarketObservation, SentimentObservation, Trigger,
};

pub const DEFAULT_REFERENCE_AVG_VOLUME: f64 = 1_000_000.0;

// absorbs rounding in (price - base) * 100 / base at the exact threshold
const PERCENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    /// Baseline volume a `VolumeSpike` multiplier is applied to.
    pub reference_avg_volume: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            reference_avg_volume: DEFAULT_REFERENCE_AVG_VOLUME,
        }
    }
}

impl Evaluator {
    pub fn new(reference_avg_volume: f64) -> Self {
        Self {
            reference_avg_volume,
        }
    }

    pub fn evaluate(&self, alerts: &[Alert], obs: &MarketObservation) -> Vec<FiringEvent> {
        let sym = normalize_symbol(&obs.symbol);

        alerts
            .iter()
            .filter(|a| a.is_active && a.symbol.eq_ignore_ascii_case(&sym))
            .filter_map(|a| {
                self.price_message(a, obs).map(|message| FiringEvent {
                    alert_id: a.id.clone(),
                    symbol: a.symbol.clone(),
                    message,
                })
            })
            .collect()
    }

    pub fn evaluate_sentiment(&self, alerts: &[Alert], obs: &SentimentObservation) -> Vec<FiringEvent> {
        let sym = normalize_symbol(&obs.symbol);
        let Some(current) = obs.label.direction() else {
            return Vec::new();
        };

        alerts
            .iter()
            .filter(|a| a.is_active && a.symbol.eq_ignore_ascii_case(&sym))
            .filter_map(|a| match a.trigger {
                Trigger::SentimentChange { direction } if direction == current => Some(FiringEvent {
                    alert_id: a.id.clone(),
                    symbol: a.symbol.clone(),
                    message: format!("{} sentiment turned {}", a.symbol, direction),
                }),
                _ => None,
            })
            .collect()
    }

    fn price_message(&self, a: &Alert, obs: &MarketObservation) -> Option<String> {
        match a.trigger {
            Trigger::PriceAbove { target_price } => (obs.price >= target_price)
                .then(|| format!("{} crossed ABOVE ${}", a.symbol, target_price)),

            Trigger::PriceBelow { target_price } => (obs.price <= target_price)
                .then(|| format!("{} dropped BELOW ${}", a.symbol, target_price)),

            Trigger::PercentChange {
                percent,
                initial_price,
            } => {
                if initial_price == 0.0 || !initial_price.is_finite() {
                    return None;
                }
                let diff = (obs.price - initial_price) * 100.0 / initial_price;
                (diff.abs() + PERCENT_EPSILON >= percent.abs())
                    .then(|| format!("{} moved {:+.2}% (Target: {}%)", a.symbol, diff, percent))
            }

            Trigger::VolumeSpike { multiplier } => {
                let volume = obs.volume?;
                let threshold = self.reference_avg_volume * multiplier;
                (volume > threshold).then(|| {
                    format!(
                        "Unusual volume spike for {}: {} vs {} avg ({}x)",
                        a.symbol, volume, self.reference_avg_volume, multiplier
                    )
                })
            }

            // only a sentiment observation can fire these
            Trigger::SentimentChange { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SentimentDirection, SentimentLabel};

    fn alert(id: &str, symbol: &str, trigger: Trigger) -> Alert {
        Alert {
            id: id.to_string(),
            user_id: "u1".to_string(),
            symbol: symbol.to_string(),
            trigger,
            is_active: true,
            created_at: 0,
            last_triggered_at: None,
        }
    }

    fn obs(symbol: &str, price: f64) -> MarketObservation {
        MarketObservation {
            symbol: symbol.to_string(),
            price,
            percent_change: 0.0,
            volume: None,
            observed_at: 0,
        }
    }

    #[test]
    fn price_above_fires_at_and_over_target() {
        let ev = Evaluator::default();
        let alerts = vec![alert("a1", "AAPL", Trigger::PriceAbove { target_price: 185.0 })];

        assert_eq!(ev.evaluate(&alerts, &obs("AAPL", 185.0)).len(), 1);
        assert_eq!(ev.evaluate(&alerts, &obs("AAPL", 190.0)).len(), 1);
        assert!(ev.evaluate(&alerts, &obs("AAPL", 184.99)).is_empty());
    }

    #[test]
    fn price_above_message_names_symbol_and_target() {
        let ev = Evaluator::default();
        let alerts = vec![alert("a1", "AAPL", Trigger::PriceAbove { target_price: 185.0 })];

        let events = ev.evaluate(&alerts, &obs("AAPL", 185.01));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].alert_id, "a1");
        assert_eq!(events[0].message, "AAPL crossed ABOVE $185");
    }

    #[test]
    fn price_below_fires_at_and_under_target() {
        let ev = Evaluator::default();
        let alerts = vec![alert("a1", "MSFT", Trigger::PriceBelow { target_price: 300.0 })];

        assert_eq!(ev.evaluate(&alerts, &obs("MSFT", 300.0)).len(), 1);
        assert!(ev.evaluate(&alerts, &obs("MSFT", 300.5)).is_empty());
        assert_eq!(
            ev.evaluate(&alerts, &obs("MSFT", 250.0))[0].message,
            "MSFT dropped BELOW $300"
        );
    }

    #[test]
    fn skips_inactive_and_other_symbols() {
        let ev = Evaluator::default();
        let mut inactive = alert("a1", "AAPL", Trigger::PriceAbove { target_price: 1.0 });
        inactive.is_active = false;
        let other = alert("a2", "MSFT", Trigger::PriceAbove { target_price: 1.0 });

        assert!(ev.evaluate(&[inactive, other], &obs("AAPL", 500.0)).is_empty());
    }

    #[test]
    fn symbol_compare_ignores_case() {
        let ev = Evaluator::default();
        let alerts = vec![alert("a1", "AAPL", Trigger::PriceAbove { target_price: 1.0 })];

        assert_eq!(ev.evaluate(&alerts, &obs("aapl", 2.0)).len(), 1);
    }

    #[test]
    fn percent_change_boundary_is_inclusive() {
        let ev = Evaluator::default();
        let alerts = vec![alert(
            "a1",
            "TSLA",
            Trigger::PercentChange {
                percent: 5.0,
                initial_price: 100.0,
            },
        )];

        assert_eq!(ev.evaluate(&alerts, &obs("TSLA", 100.0 * (1.0 + 5.0 / 100.0))).len(), 1);
        assert_eq!(ev.evaluate(&alerts, &obs("TSLA", 95.0)).len(), 1);
        assert!(ev.evaluate(&alerts, &obs("TSLA", 104.99)).is_empty());
        assert!(ev.evaluate(&alerts, &obs("TSLA", 95.01)).is_empty());
    }

    #[test]
    fn percent_change_reports_signed_move() {
        let ev = Evaluator::default();
        let alerts = vec![alert(
            "a1",
            "TSLA",
            Trigger::PercentChange {
                percent: 5.0,
                initial_price: 100.0,
            },
        )];

        assert!(ev.evaluate(&alerts, &obs("TSLA", 103.0)).is_empty());

        let up = ev.evaluate(&alerts, &obs("TSLA", 106.0));
        assert_eq!(up.len(), 1);
        assert!(up[0].message.contains("+6.00%"));

        let down = ev.evaluate(&alerts, &obs("TSLA", 92.5));
        assert!(down[0].message.contains("-7.50%"));
    }

    #[test]
    fn percent_change_uses_threshold_magnitude() {
        let ev = Evaluator::default();
        let alerts = vec![alert(
            "a1",
            "TSLA",
            Trigger::PercentChange {
                percent: -5.0,
                initial_price: 100.0,
            },
        )];

        assert_eq!(ev.evaluate(&alerts, &obs("TSLA", 106.0)).len(), 1);
    }

    #[test]
    fn percent_change_without_baseline_never_fires() {
        let ev = Evaluator::default();
        let alerts = vec![alert(
            "a1",
            "TSLA",
            Trigger::PercentChange {
                percent: 5.0,
                initial_price: 0.0,
            },
        )];

        assert!(ev.evaluate(&alerts, &obs("TSLA", 1_000.0)).is_empty());
    }

    #[test]
    fn volume_spike_uses_injected_reference() {
        let ev = Evaluator::new(2_000.0);
        let alerts = vec![alert("a1", "GME", Trigger::VolumeSpike { multiplier: 3.0 })];

        let mut o = obs("GME", 20.0);
        assert!(ev.evaluate(&alerts, &o).is_empty(), "no volume, no firing");

        o.volume = Some(6_000.0);
        assert!(ev.evaluate(&alerts, &o).is_empty(), "strictly greater than");

        o.volume = Some(6_001.0);
        let events = ev.evaluate(&alerts, &o);
        assert_eq!(events.len(), 1);
        assert!(events[0].message.contains("GME"));
    }

    #[test]
    fn sentiment_alerts_ignore_price_observations() {
        let ev = Evaluator::default();
        let alerts = vec![alert(
            "a1",
            "AAPL",
            Trigger::SentimentChange {
                direction: SentimentDirection::Bullish,
            },
        )];

        assert!(ev.evaluate(&alerts, &obs("AAPL", 1.0)).is_empty());
    }

    #[test]
    fn sentiment_fires_on_matching_direction_only() {
        let ev = Evaluator::default();
        let alerts = vec![
            alert(
                "bull",
                "AAPL",
                Trigger::SentimentChange {
                    direction: SentimentDirection::Bullish,
                },
            ),
            alert(
                "bear",
                "AAPL",
                Trigger::SentimentChange {
                    direction: SentimentDirection::Bearish,
                },
            ),
            alert("price", "AAPL", Trigger::PriceAbove { target_price: 1.0 }),
        ];

        let mk = |label| SentimentObservation {
            symbol: "AAPL".into(),
            label,
            score: 70,
        };

        let bull = ev.evaluate_sentiment(&alerts, &mk(SentimentLabel::Bullish));
        assert_eq!(bull.len(), 1);
        assert_eq!(bull[0].alert_id, "bull");
        assert_eq!(bull[0].message, "AAPL sentiment turned Bullish");

        assert_eq!(ev.evaluate_sentiment(&alerts, &mk(SentimentLabel::Bearish))[0].alert_id, "bear");
        assert!(ev.evaluate_sentiment(&alerts, &mk(SentimentLabel::Neutral)).is_empty());
    }

    #[test]
    fn evaluation_is_repeatable() {
        let ev = Evaluator::default();
        let alerts = vec![
            alert("a1", "AAPL", Trigger::PriceAbove { target_price: 100.0 }),
            alert("a2", "AAPL", Trigger::PriceBelow { target_price: 200.0 }),
        ];
        let o = obs("AAPL", 150.0);

        let first = ev.evaluate(&alerts, &o);
        let second = ev.evaluate(&alerts, &o);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
