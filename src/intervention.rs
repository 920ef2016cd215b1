//! Graduated intervention policy
//!
//! Maps (context, patterns, dwell time) to an escalation level. Nothing is
//! remembered between calls: the level is recomputed from inputs every time,
//! and the caller supplies today's intervention count for message rotation.

use crate::agent::Agent;
use crate::config::{InterventionThresholds, MessagePools};
use crate::types::{Classification, DecisionRequest, InterventionDecision, InterventionLevel};
use log::debug;

/// Below this classifier confidence no intervention is considered
const MIN_CONFIDENCE: f64 = 0.3;
/// Risk assumed for domains absent from the history
const UNKNOWN_DOMAIN_RISK: f64 = 0.5;
const MIN_RISK_MULTIPLIER: f64 = 0.5;
const SESSION_MULTIPLIER: f64 = 0.7;
/// Lower bound on the re-check delay when below the nudge threshold
const MIN_RECHECK_SECONDS: u64 = 5;

/// Dwell thresholds after risk and session adjustment, in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustedThresholds {
    pub nudge: u64,
    pub warn: u64,
    pub soft_block: u64,
    pub hard_block: u64,
}

impl AdjustedThresholds {
    fn for_level(&self, level: InterventionLevel) -> Option<u64> {
        match level {
            InterventionLevel::None => None,
            InterventionLevel::Nudge => Some(self.nudge),
            InterventionLevel::Warn => Some(self.warn),
            InterventionLevel::SoftBlock => Some(self.soft_block),
            InterventionLevel::HardBlock => Some(self.hard_block),
        }
    }

    /// Highest level whose threshold the dwell time has reached
    pub fn level_for(&self, dwell_seconds: u64) -> InterventionLevel {
        InterventionLevel::ACTIVE
            .iter()
            .rev()
            .copied()
            .find(|level| {
                self.for_level(*level)
                    .is_some_and(|threshold| dwell_seconds >= threshold)
            })
            .unwrap_or(InterventionLevel::None)
    }
}

/// Decides whether and how strongly to intervene
#[derive(Debug, Clone, Default)]
pub struct InterventionPolicy {
    thresholds: InterventionThresholds,
    messages: MessagePools,
}

impl InterventionPolicy {
    pub fn new(thresholds: InterventionThresholds, messages: MessagePools) -> Self {
        Self {
            thresholds,
            messages,
        }
    }

    pub fn thresholds(&self) -> &InterventionThresholds {
        &self.thresholds
    }

    /// Scale base thresholds by domain risk and session state.
    ///
    /// `multiplier = max(0.5, 1 - risk * 0.5)`, then `* 0.7` during a session.
    /// Each step truncates to whole seconds.
    pub fn adjusted_thresholds(&self, risk: f64, session_active: bool) -> AdjustedThresholds {
        let multiplier = (1.0 - risk * 0.5).max(MIN_RISK_MULTIPLIER);
        let scale = |base: u64| {
            let mut seconds = (base as f64 * multiplier) as u64;
            if session_active {
                seconds = (seconds as f64 * SESSION_MULTIPLIER) as u64;
            }
            seconds
        };

        AdjustedThresholds {
            nudge: scale(self.thresholds.nudge),
            warn: scale(self.thresholds.warn),
            soft_block: scale(self.thresholds.soft_block),
            hard_block: scale(self.thresholds.hard_block),
        }
    }

    pub fn decide(&self, request: &DecisionRequest) -> InterventionDecision {
        let context = &request.context;
        if context.classification != Classification::Distraction
            || context.confidence < MIN_CONFIDENCE
        {
            return InterventionDecision::none(InterventionLevel::None.cooldown_seconds());
        }

        let risk = request
            .domain
            .as_deref()
            .and_then(|domain| request.patterns.risk_for(domain))
            .unwrap_or(UNKNOWN_DOMAIN_RISK);
        let adjusted = self.adjusted_thresholds(risk, request.session_active);
        let dwell = request.dwell_seconds;

        let level = adjusted.level_for(dwell);
        if level == InterventionLevel::None {
            let recheck = adjusted.nudge.saturating_sub(dwell).max(MIN_RECHECK_SECONDS);
            return InterventionDecision::none(recheck);
        }

        debug!(
            "intervention {} for {:?} after {}s (risk {:.2}, session {})",
            level.as_str(),
            request.domain,
            dwell,
            risk,
            request.session_active
        );

        InterventionDecision {
            should_intervene: true,
            level,
            message: self.message_for(level, dwell, request.interventions_today),
            urgency: level.urgency(),
            cooldown_seconds: level.cooldown_seconds(),
        }
    }

    /// Round-robin message for a level with `{duration}` filled in
    pub fn message_for(&self, level: InterventionLevel, dwell_seconds: u64, counter: u32) -> String {
        let pool = self.messages.pool(level);
        if pool.is_empty() {
            return String::new();
        }
        let template = &pool[counter as usize % pool.len()];
        template.replace("{duration}", &format_duration(dwell_seconds))
    }
}

/// Human-readable duration: `45s`, `2m`, `2m 5s`
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let minutes = seconds / 60;
    let rest = seconds % 60;
    if rest == 0 {
        format!("{minutes}m")
    } else {
        format!("{minutes}m {rest}s")
    }
}

impl Agent<DecisionRequest> for InterventionPolicy {
    type Output = InterventionDecision;

    fn name(&self) -> &'static str {
        "Intervention Agent"
    }

    fn analyze(&self, input: &DecisionRequest) -> InterventionDecision {
        self.decide(input)
    }
}
