//! Weighted score aggregation
//!
//! Audit scores come from plugins. Everything above them is derived here:
//!
//! ```text
//! group score    = Σ(wᵢ × audit scoreᵢ) / Σwᵢ      (audits of the same plugin)
//! category score = Σ(wᵢ × ref scoreᵢ)   / Σwᵢ      (audits or groups of any plugin)
//! ```
//!
//! A ref with weight 0 is informational: it is listed in reports but never
//! moves the average. A zero weight sum is a configuration error, never NaN.
//!
//! # Binary categories
//!
//! A category with `isBinary = true` collapses to 0 or 1. What counts as a
//! pass is a [`BinaryScorePolicy`]:
//!
//! - `weighted-average` (default): pass iff the weighted average is exactly 1
//! - `all-refs-perfect`: pass iff every ref, zero-weight ones included, scores 1

mod engine;

pub use engine::{calculate_score, score_report, BinaryScorePolicy, Weighted};
