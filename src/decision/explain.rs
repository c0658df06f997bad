//! Short natural-language explanation of a snapshot.

use super::types::{DataQuality, FusedResult, MarketState};
use super::urgency::Urgency;
use crate::core::types::Signal;

pub const LOW_DATA_DISCLAIMER: &str = "Limited local price data, relying on regional trend.";

/// Scraped week-over-week moves smaller than this are not mentioned.
const MENTION_CHANGE_PCT: f64 = 0.5;

fn state_clause(state: MarketState) -> &'static str {
    match state {
        MarketState::Favorable => "Prices are trending down, a good time to buy",
        MarketState::Elevated => "Prices are trending up, consider ordering before they climb further",
        MarketState::Typical => "Prices are in their usual range for this time of year",
        MarketState::OrderNow => "Your tank needs filling regardless of market conditions",
    }
}

fn sentence(s: &str) -> String {
    let trimmed = s.trim_end();
    if trimmed.ends_with(&['.', '!', '?'][..]) {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

/// Explanation for a fused result. `scraped` supplies the local
/// week-over-week change.
pub fn explain(fused: &FusedResult, scraped: &Signal) -> String {
    if fused.data_quality == DataQuality::Low {
        return LOW_DATA_DISCLAIMER.to_string();
    }

    let mut parts = Vec::with_capacity(2);
    let pct = scraped.diagnostics.pct_change;
    if pct.abs() > MENTION_CHANGE_PCT {
        let movement = if pct > 0.0 { "up" } else { "down" };
        parts.push(sentence(&format!("Local prices are {movement} {:.1}% from last week", pct.abs())));
    }
    parts.push(sentence(state_clause(fused.market_state)));
    parts.join(" ")
}

/// Fixed explanation for urgency-gated responses.
pub fn explain_urgency(urgency: Urgency) -> String {
    match urgency {
        Urgency::Critical => "Your tank is critically low. Order now to avoid running out.".to_string(),
        Urgency::LowTank => "Your tank is getting low. Order soon to avoid an emergency delivery.".to_string(),
    }
}
