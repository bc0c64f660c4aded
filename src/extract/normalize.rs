//! Post-processing of supplier candidates.
//!
//! Two modes are supported:
//! - **Savings**: recompute `potential_savings` from the caller's current price
//!   (used for live search results)
//! - **Ratio**: keep each candidate's savings/price ratio and rescale it to the
//!   caller's current price (used for the fixture tables)
//!
//! Both modes round money to cents, preserve input order and truncate to the
//! configured cap.

use crate::models::AlternativeSupplier;

/// Default maximum number of candidates returned.
pub const DEFAULT_MAX_ALTERNATIVES: usize = 5;

/// Round a monetary amount to 2 decimal places.
pub fn round_currency(amount: f64) -> f64 {
    if !amount.is_finite() {
        return 0.0;
    }
    (amount * 100.0).round() / 100.0
}

/// `max(0, current - estimated)`, rounded to cents.
pub fn potential_savings(current_price: f64, estimated_price: f64) -> f64 {
    round_currency((current_price - estimated_price).max(0.0))
}

/// Recompute savings against `current_price` and cap the list.
pub fn normalize_alternatives(
    candidates: Vec<AlternativeSupplier>,
    current_price: f64,
    cap: usize,
) -> Vec<AlternativeSupplier> {
    candidates
        .into_iter()
        .take(cap)
        .map(|mut candidate| {
            let estimated = candidate.estimated_price.max(0.0);
            candidate.potential_savings = potential_savings(current_price, estimated);
            candidate.estimated_price = round_currency(estimated);
            candidate
        })
        .collect()
}

/// Rescale fixture candidates to `current_price`, keeping their savings ratio.
///
/// When `current_price` is not positive the candidates are only rounded.
pub fn rescale_by_ratio(
    candidates: Vec<AlternativeSupplier>,
    current_price: f64,
    cap: usize,
) -> Vec<AlternativeSupplier> {
    candidates
        .into_iter()
        .take(cap)
        .map(|mut candidate| {
            if current_price > 0.0 {
                let ratio = if candidate.estimated_price > 0.0 {
                    candidate.potential_savings.max(0.0) / candidate.estimated_price
                } else {
                    0.0
                };
                let estimated = (current_price - current_price * ratio).max(0.0);
                candidate.estimated_price = estimated;
                candidate.potential_savings = (current_price - estimated).max(0.0);
            }
            candidate.estimated_price = round_currency(candidate.estimated_price.max(0.0));
            candidate.potential_savings = round_currency(candidate.potential_savings.max(0.0));
            candidate
        })
        .collect()
}
