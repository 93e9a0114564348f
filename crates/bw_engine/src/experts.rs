//! Expert Activation Estimator
//!
//! Expected number of distinct experts touched in one decode step when a batch
//! of `B` tokens each routes to `k` experts out of `E`.
//!
//! The `B × k` selections are treated as independent uniform draws *with*
//! replacement. Real top-k routing picks `k` distinct experts per token, so this
//! slightly overstates overlap inside a single token. The approximation is kept
//! as-is so figures stay comparable with published S-MBU tables.

use crate::error::{EstimateError, Result};

/// Expected distinct experts hit by `selections` uniform draws over `num_experts`.
///
/// `E × (1 − (1 − 1/E)^n)`, clamped to `min(E, n)` so rounding can never push
/// the result past either bound.
pub fn expected_unique_for_selections(num_experts: u32, selections: u64) -> Result<f64> {
    if num_experts == 0 {
        return Err(EstimateError::invalid(
            "num_experts",
            "a MoE layer needs at least one expert",
        ));
    }
    if selections == 0 {
        return Ok(0.0);
    }

    let e = f64::from(num_experts);
    let n = selections as f64;
    let miss_all = (1.0 - 1.0 / e).powf(n);
    let expected = e * (1.0 - miss_all);

    Ok(expected.min(e).min(n))
}

/// Expected distinct experts for batch size `batch_size` under top-`top_k` routing.
pub fn expected_unique_experts(num_experts: u32, top_k: u32, batch_size: u64) -> Result<f64> {
    let selections = batch_size.saturating_mul(u64::from(top_k));
    expected_unique_for_selections(num_experts, selections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_point_qwen3() {
        let got = expected_unique_experts(128, 8, 1).unwrap();
        let closed_form = 128.0 * (1.0 - (1.0f64 - 1.0 / 128.0).powi(8));
        assert!((got - closed_form).abs() < 1e-12);
        assert!((got - 7.75).abs() < 0.05, "got {got}");
    }

    #[test]
    fn test_large_batch_approaches_but_never_reaches_e() {
        let got = expected_unique_experts(128, 8, 256).unwrap();
        assert!(got < 128.0);
        assert!(got > 127.99);
    }

    #[test]
    fn test_zero_selections() {
        assert_eq!(expected_unique_experts(128, 0, 16).unwrap(), 0.0);
        assert_eq!(expected_unique_experts(128, 8, 0).unwrap(), 0.0);
        assert_eq!(expected_unique_experts(1, 1, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_single_expert_always_one() {
        for b in [1u64, 2, 7, 1000] {
            assert_eq!(expected_unique_experts(1, 1, b).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_single_selection_is_exactly_one() {
        // One draw always hits exactly one expert, regardless of E.
        for e in [2u32, 8, 128, 256] {
            assert_eq!(expected_unique_experts(e, 1, 1).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_zero_experts_rejected() {
        assert!(matches!(
            expected_unique_experts(0, 1, 1),
            Err(EstimateError::InvalidInput { field: "num_experts", .. })
        ));
    }

    #[test]
    fn test_non_decreasing_in_batch() {
        let mut prev = 0.0;
        for b in 0..=512u64 {
            let cur = expected_unique_experts(64, 4, b).unwrap();
            assert!(cur >= prev, "b={b}: {cur} < {prev}");
            prev = cur;
        }
    }

    #[test]
    fn test_saturating_selection_count() {
        let got = expected_unique_experts(8, u32::MAX, u64::MAX).unwrap();
        assert_eq!(got, 8.0);
    }
}
