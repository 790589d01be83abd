//! Seven-indicator scoring engine.
//!
//! Five indicator scores are deterministic functions of the raw measures
//! the analysis model reports (talk ratio, question counts, emotion
//! ratios, keyword list, proposal timing). Proposal quality and
//! conversion require semantic judgment and keep the model's score. The
//! overall score is always recomputed here from the fixed weights; the
//! model's self-reported aggregate is discarded.

use stylecoach_db::models::AnalysisMetrics;

pub const WEIGHT_TALK_RATIO: f64 = 0.15;
pub const WEIGHT_QUESTION_QUALITY: f64 = 0.15;
pub const WEIGHT_EMOTION: f64 = 0.15;
pub const WEIGHT_CONCERN_KEYWORDS: f64 = 0.10;
pub const WEIGHT_PROPOSAL_TIMING: f64 = 0.15;
pub const WEIGHT_PROPOSAL_QUALITY: f64 = 0.15;
pub const WEIGHT_CONVERSION: f64 = 0.15;

/// Neutral score when an indicator has nothing to measure (no questions
/// asked, no proposal made).
pub const NEUTRAL_SCORE: f64 = 50.0;

const IDEAL_STYLIST_RATIO: f64 = 40.0;
const IDEAL_OPEN_RATIO: f64 = 60.0;
const IDEAL_POSITIVE_RATIO: f64 = 70.0;
const IDEAL_TIMING_MS: i64 = 180_000;
const LATE_TIMING_MS: i64 = 300_000;

/// Ideal stylist share is 40%: full score there, minus 2.5 points per
/// percentage point of deviation.
pub fn talk_ratio_score(stylist_ratio: f64) -> f64 {
    (100.0 - (stylist_ratio - IDEAL_STYLIST_RATIO).abs() * 2.5).max(0.0)
}

pub fn question_quality_score(open_count: u32, closed_count: u32) -> f64 {
    let total = open_count + closed_count;
    if total == 0 {
        return NEUTRAL_SCORE;
    }
    let open_ratio = open_count as f64 / total as f64 * 100.0;
    if open_ratio < IDEAL_OPEN_RATIO {
        open_ratio / IDEAL_OPEN_RATIO * 80.0
    } else {
        (80.0 + (open_ratio - IDEAL_OPEN_RATIO) / 40.0 * 20.0).min(100.0)
    }
}

pub fn emotion_score(positive_ratio: f64, negative_ratio: f64) -> f64 {
    if positive_ratio < IDEAL_POSITIVE_RATIO {
        (positive_ratio / IDEAL_POSITIVE_RATIO * 80.0 - 0.5 * negative_ratio).max(0.0)
    } else {
        (80.0 + (positive_ratio - IDEAL_POSITIVE_RATIO) / 30.0 * 20.0).min(100.0)
    }
}

/// Stepwise: detecting two or more concern keywords is already a strong
/// signal; more than two keeps climbing to the cap.
pub fn concern_keywords_score(count: usize) -> f64 {
    match count {
        0 => 20.0,
        1 => 60.0,
        2 => 85.0,
        n => (85.0 + 5.0 * n as f64).min(100.0),
    }
}

/// Time from concern detection to proposal; within 3 minutes is ideal,
/// then a linear decay to 5 minutes and a slower tail after that. No
/// proposal at all is neutral.
pub fn proposal_timing_score(timing_ms: Option<i64>) -> f64 {
    let Some(t) = timing_ms else {
        return NEUTRAL_SCORE;
    };
    if t <= IDEAL_TIMING_MS {
        100.0
    } else if t <= LATE_TIMING_MS {
        100.0 - (t - IDEAL_TIMING_MS) as f64 / 120_000.0 * 40.0
    } else {
        (60.0 - (t - LATE_TIMING_MS) as f64 / 60_000.0 * 10.0).max(0.0)
    }
}

/// Weighted overall score from the seven sub-scores, rounded to the
/// nearest integer.
pub fn overall_score(m: &AnalysisMetrics) -> i32 {
    let total = m.talk_ratio.score * WEIGHT_TALK_RATIO
        + m.question_quality.score * WEIGHT_QUESTION_QUALITY
        + m.emotion.score * WEIGHT_EMOTION
        + m.concern_keywords.score * WEIGHT_CONCERN_KEYWORDS
        + m.proposal_timing.score * WEIGHT_PROPOSAL_TIMING
        + m.proposal_quality.score * WEIGHT_PROPOSAL_QUALITY
        + m.conversion.score * WEIGHT_CONVERSION;
    total.round() as i32
}

/// Replaces the model's self-reported sub-scores with the deterministic
/// formulas (where one exists), clamps everything into [0, 100], and
/// returns the recomputed overall score.
pub fn rescore(m: &mut AnalysisMetrics) -> i32 {
    m.talk_ratio.score = talk_ratio_score(m.talk_ratio.stylist_ratio);
    m.question_quality.score =
        question_quality_score(m.question_quality.open_count, m.question_quality.closed_count);
    m.emotion.score = emotion_score(m.emotion.positive_ratio, m.emotion.negative_ratio);
    m.concern_keywords.score = concern_keywords_score(m.concern_keywords.keywords.len());
    m.proposal_timing.score = proposal_timing_score(m.proposal_timing.timing_ms);
    m.proposal_quality.score = m.proposal_quality.score.clamp(0.0, 100.0);
    m.conversion.score = m.conversion.score.clamp(0.0, 100.0);
    overall_score(m)
}
