use serde::{Deserialize, Serialize};

/// Base limits declared on a problem.
#[derive(Clone, Copy, Debug)]
pub struct ProblemLimits {
    pub time_limit_ms: i32,
    pub memory_limit_kb: i32,
}

/// Default limit parameters declared on a language.
#[derive(Clone, Copy, Debug, Default)]
pub struct LanguageLimits {
    /// Multiplier applied to the problem time limit (e.g. 2.0 for interpreted
    /// languages). `None` means 1.0.
    pub time_factor: Option<f64>,
    /// Language-wide memory limit replacing the problem limit when set.
    pub memory_kb: Option<i32>,
}

/// Per-problem overrides from the problem/language pairing. Each field beats
/// the language default when set.
#[derive(Clone, Copy, Debug, Default)]
pub struct PairingOverrides {
    pub time_factor: Option<f64>,
    pub memory_kb: Option<i32>,
}

/// Limits a judge job actually runs under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveLimits {
    pub time_limit_ms: i32,
    pub memory_kb: i32,
}

/// Resolve the limits for one (problem, language) pair.
///
/// Time: problem limit scaled by the pairing factor when present, else the
/// language factor, else unscaled. Memory: pairing override, else language
/// default, else the problem limit.
pub fn effective_limits(
    problem: ProblemLimits,
    language: LanguageLimits,
    overrides: PairingOverrides,
) -> EffectiveLimits {
    let factor = overrides
        .time_factor
        .or(language.time_factor)
        .unwrap_or(1.0);
    let time_limit_ms = (problem.time_limit_ms as f64 * factor).ceil() as i32;

    let memory_kb = overrides
        .memory_kb
        .or(language.memory_kb)
        .unwrap_or(problem.memory_limit_kb);

    EffectiveLimits {
        time_limit_ms,
        memory_kb,
    }
}
