//! Usage metering: the incremental-update routines that maintain rolling
//! statistics from usage events, plus cost calculation and vote bookkeeping.
//!
//! The arithmetic lives here as pure functions over plain values so it can be
//! tested without a database; [`engine`] applies it transactionally with
//! row-level locks on the aggregate rows.
//!
//! The rolling statistics are maintained incrementally, without storing the
//! full sample history:
//!
//! - `average_response_time` is the mean latency over *successful* events.
//!   The prior successful-sample count is reconstructed from the success
//!   rate, so no extra counter column is needed.
//! - `success_rate` is a percentage over *all* recorded events; after `k`
//!   successes out of `n` events it equals `100 * k / n` exactly (modulo
//!   float rounding).

pub mod engine;

use crate::api::models::listings::PricingMode;
use crate::api::models::reviews::VoteKind;
use rust_decimal::Decimal;

/// Rolling aggregate state for one model listing.
///
/// Single-writer semantics: the caller must hold the listing row lock while
/// a snapshot is mutated and written back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingStats {
    pub total_requests: i64,
    pub average_response_time: f64,
    pub success_rate: f64,
}

impl RollingStats {
    /// Fold one recorded event into the aggregates.
    ///
    /// Update order is fixed: counter increment, then latency mean, then
    /// success rate. The latency mean only includes successful events; the
    /// success rate covers every event.
    pub fn record(&mut self, success: bool, latency_ms: f64) {
        self.total_requests += 1;

        if success {
            // Successful samples seen so far, reconstructed from the rate
            // over the n-1 prior events.
            let prior_successes = self.success_rate / 100.0 * (self.total_requests - 1) as f64;
            self.average_response_time = rolling_mean(self.average_response_time, prior_successes + 1.0, latency_ms);
        }

        self.success_rate = rolling_success_rate(self.success_rate, self.total_requests, success);
    }
}

/// Incremental arithmetic mean: `new_count` is the number of samples
/// including the new one. Equivalent to the mean over all included samples.
pub fn rolling_mean(prev_mean: f64, new_count: f64, sample: f64) -> f64 {
    if new_count <= 1.0 {
        sample
    } else {
        (prev_mean * (new_count - 1.0) + sample) / new_count
    }
}

/// Incremental success rate as a percentage. `new_total` is the event count
/// including the new one; `n <= 1` bootstraps directly to 100 or 0.
pub fn rolling_success_rate(prev_rate: f64, new_total: i64, success: bool) -> f64 {
    if new_total <= 1 {
        if success { 100.0 } else { 0.0 }
    } else {
        let mut successes = prev_rate / 100.0 * (new_total - 1) as f64;
        if success {
            successes += 1.0;
        }
        successes / new_total as f64 * 100.0
    }
}

/// Per-event cost for the given pricing mode. Subscription-mode settlement
/// is owned by the billing collaborator, so it contributes no per-event
/// cost here.
pub fn event_cost(
    pricing_mode: PricingMode,
    price_per_request: Decimal,
    price_per_token: Decimal,
    input_tokens: i32,
    output_tokens: i32,
) -> Decimal {
    match pricing_mode {
        PricingMode::PerRequest => price_per_request,
        PricingMode::PerToken => price_per_token * Decimal::from(i64::from(input_tokens) + i64::from(output_tokens)),
        PricingMode::Subscription | PricingMode::Free => Decimal::ZERO,
    }
}

/// Round to two decimal places (used for the recomputed average rating).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Full rating recompute over a model's current review set: average rounded
/// to two decimals, plus the count. An empty set resets to (0.0, 0).
///
/// Deliberately not incremental (unlike the latency/success-rate updates):
/// recomputing from the whole set tolerates out-of-order deletes and edits
/// without drift, and running it twice with no intervening changes yields
/// the same result.
pub fn recomputed_rating(ratings: &[i32]) -> (f64, i64) {
    if ratings.is_empty() {
        return (0.0, 0);
    }

    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    let average = sum as f64 / ratings.len() as f64;

    (round2(average), ratings.len() as i64)
}

/// Whether a trailing-window event count has reached the configured
/// threshold.
pub fn window_exhausted(used: i64, limit: i64) -> bool {
    used >= limit
}

/// Counter adjustment `(helpful_delta, total_delta)` for a vote transition.
///
/// Covers the whole upsert protocol: `None -> Some` casts a vote,
/// `Some -> Some` changes it (total unchanged), `Some -> None` removes it.
pub fn vote_counter_delta(previous: Option<VoteKind>, next: Option<VoteKind>) -> (i64, i64) {
    match (previous, next) {
        (None, Some(VoteKind::Helpful)) => (1, 1),
        (None, Some(VoteKind::NotHelpful)) => (0, 1),
        (Some(VoteKind::Helpful), Some(VoteKind::NotHelpful)) => (-1, 0),
        (Some(VoteKind::NotHelpful), Some(VoteKind::Helpful)) => (1, 0),
        (Some(VoteKind::Helpful), None) => (-1, -1),
        (Some(VoteKind::NotHelpful), None) => (0, -1),
        // Unchanged revote, or no vote either side
        (Some(_), Some(_)) | (None, None) => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> RollingStats {
        // Column defaults for a newly published listing
        RollingStats {
            total_requests: 0,
            average_response_time: 0.0,
            success_rate: 100.0,
        }
    }

    #[test]
    fn first_success_bootstraps_average_and_rate() {
        let mut stats = fresh();
        stats.record(true, 250.0);

        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.average_response_time, 250.0);
        assert_eq!(stats.success_rate, 100.0);
    }

    #[test]
    fn first_failure_bootstraps_rate_to_zero() {
        let mut stats = fresh();
        stats.record(false, 9_999.0);

        assert_eq!(stats.total_requests, 1);
        // Failed events contribute no latency sample
        assert_eq!(stats.average_response_time, 0.0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn rolling_average_matches_arithmetic_mean() {
        let latencies = [120.0, 80.0, 310.0, 95.5, 47.25, 1000.0, 3.0, 88.8];
        let mut stats = fresh();
        for &x in &latencies {
            stats.record(true, x);
        }

        let expected = latencies.iter().sum::<f64>() / latencies.len() as f64;
        assert!((stats.average_response_time - expected).abs() < 1e-9);
        assert_eq!(stats.total_requests, latencies.len() as i64);
    }

    #[test]
    fn success_rate_is_k_over_n() {
        // 5 successes out of 8 events, interleaved
        let outcomes = [true, false, true, true, false, true, false, true];
        let mut stats = fresh();
        for &ok in &outcomes {
            stats.record(ok, 100.0);
        }

        assert_eq!(stats.total_requests, 8);
        assert!((stats.success_rate - 100.0 * 5.0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn failures_do_not_disturb_latency_mean() {
        let mut stats = fresh();
        stats.record(true, 100.0);
        stats.record(false, 50_000.0);
        stats.record(true, 200.0);

        // Mean over the two successful samples only
        assert!((stats.average_response_time - 150.0).abs() < 1e-9);
        assert!((stats.success_rate - 100.0 * 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn rate_is_order_independent_for_fixed_counts() {
        let a = [true, true, false, false, true];
        let b = [false, true, true, true, false];

        let mut sa = fresh();
        let mut sb = fresh();
        for &ok in &a {
            sa.record(ok, 10.0);
        }
        for &ok in &b {
            sb.record(ok, 10.0);
        }

        assert!((sa.success_rate - sb.success_rate).abs() < 1e-9);
    }

    #[test]
    fn per_token_cost_scenario() {
        // price_per_token = 0.000001, 100 input + 50 output tokens
        let cost = event_cost(PricingMode::PerToken, Decimal::ZERO, Decimal::new(1, 6), 100, 50);
        assert_eq!(cost, Decimal::new(15, 5)); // 0.00015
    }

    #[test]
    fn per_request_cost_is_flat() {
        let price = Decimal::new(1, 2); // 0.01
        let cost = event_cost(PricingMode::PerRequest, price, Decimal::new(1, 6), 100, 50);
        assert_eq!(cost, price);

        // Two events at 0.01 accrue 0.02 of revenue
        assert_eq!(cost + cost, Decimal::new(2, 2));
    }

    #[test]
    fn free_and_subscription_cost_nothing_per_event() {
        for mode in [PricingMode::Free, PricingMode::Subscription] {
            assert_eq!(event_cost(mode, Decimal::ONE, Decimal::ONE, 10, 10), Decimal::ZERO);
        }
    }

    #[test]
    fn round2_behaviour() {
        assert_eq!(round2(4.666666), 4.67);
        assert_eq!(round2(3.0), 3.0);
        assert_eq!(round2(2.345), 2.35);
    }

    #[test]
    fn rating_recompute_rounds_to_two_decimals() {
        assert_eq!(recomputed_rating(&[5, 4, 4]), (4.33, 3));
        assert_eq!(recomputed_rating(&[1, 2]), (1.5, 2));
    }

    #[test]
    fn rating_recompute_is_idempotent() {
        let ratings = [3, 5, 4, 1];
        assert_eq!(recomputed_rating(&ratings), recomputed_rating(&ratings));
    }

    #[test]
    fn rating_recompute_of_empty_set_resets() {
        assert_eq!(recomputed_rating(&[]), (0.0, 0));
    }

    #[test]
    fn rating_recompute_after_delete_averages_remaining() {
        // A full recompute over the remaining set, not a running-sum subtraction
        let (avg_before, count_before) = recomputed_rating(&[5, 1]);
        assert_eq!((avg_before, count_before), (3.0, 2));

        let (avg_after, count_after) = recomputed_rating(&[5]);
        assert_eq!(count_after, count_before - 1);
        assert_eq!(avg_after, 5.0);
    }

    #[test]
    fn window_exhausted_boundary() {
        // False one event before the threshold, true once it is reached
        assert!(!window_exhausted(59, 60));
        assert!(window_exhausted(60, 60));
        assert!(window_exhausted(61, 60));
    }

    #[test]
    fn vote_cast_deltas() {
        assert_eq!(vote_counter_delta(None, Some(VoteKind::Helpful)), (1, 1));
        assert_eq!(vote_counter_delta(None, Some(VoteKind::NotHelpful)), (0, 1));
    }

    #[test]
    fn vote_change_moves_helpful_without_touching_total() {
        assert_eq!(vote_counter_delta(Some(VoteKind::NotHelpful), Some(VoteKind::Helpful)), (1, 0));
        assert_eq!(vote_counter_delta(Some(VoteKind::Helpful), Some(VoteKind::NotHelpful)), (-1, 0));
    }

    #[test]
    fn vote_revote_same_value_is_noop() {
        assert_eq!(vote_counter_delta(Some(VoteKind::Helpful), Some(VoteKind::Helpful)), (0, 0));
        assert_eq!(vote_counter_delta(Some(VoteKind::NotHelpful), Some(VoteKind::NotHelpful)), (0, 0));
    }

    #[test]
    fn vote_removal_deltas() {
        assert_eq!(vote_counter_delta(Some(VoteKind::Helpful), None), (-1, -1));
        assert_eq!(vote_counter_delta(Some(VoteKind::NotHelpful), None), (0, -1));
    }
}
