//! Focus summaries over labeled history
//!
//! Aggregates a window of [`BrowsingEvent`]s and intervention outcomes into
//! the totals a dashboard shows: focus share, top domains, intervention
//! success and an hour-by-hour breakdown.

use crate::types::{BrowsingEvent, InterventionLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const TOP_DOMAINS: usize = 5;

/// Seconds spent on one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSeconds {
    pub domain: String,
    pub seconds: u64,
}

/// Focus and distraction seconds in one hour of the day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyBreakdown {
    pub hour: u32,
    pub focus: u64,
    pub distraction: u64,
    pub total: u64,
}

/// Whether an issued intervention got the user back on track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionOutcome {
    pub level: InterventionLevel,
    pub was_effective: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusSummary {
    pub total_events: usize,
    pub distraction_events: usize,
    pub total_seconds: u64,
    pub focus_seconds: u64,
    pub distraction_seconds: u64,
    /// 0.0 - 100.0, one decimal
    pub focus_percentage: f64,
    pub top_distracting_domains: Vec<DomainSeconds>,
    pub top_productive_domains: Vec<DomainSeconds>,
    pub interventions: usize,
    /// 0.0 - 100.0, one decimal
    pub intervention_success_rate: f64,
    pub hourly: Vec<HourlyBreakdown>,
}

impl FocusSummary {
    pub fn from_events(events: &[BrowsingEvent], interventions: &[InterventionOutcome]) -> Self {
        let mut distracting = DomainTotals::default();
        let mut productive = DomainTotals::default();
        let mut hourly: Vec<HourlyBreakdown> = (0..24)
            .map(|hour| HourlyBreakdown {
                hour,
                ..Default::default()
            })
            .collect();

        let mut total_seconds = 0;
        let mut distraction_seconds = 0;
        let mut distraction_events = 0;

        for event in events {
            let seconds = event.duration_secs();
            total_seconds += seconds;
            if event.is_distraction {
                distraction_seconds += seconds;
                distraction_events += 1;
            }

            if let Some(domain) = event.resolved_domain() {
                let totals = if event.is_distraction {
                    &mut distracting
                } else {
                    &mut productive
                };
                totals.add(domain, seconds);
            }

            if let Some(hour) = event.hour() {
                let slot = &mut hourly[hour as usize % 24];
                slot.total += seconds;
                if event.is_distraction {
                    slot.distraction += seconds;
                } else {
                    slot.focus += seconds;
                }
            }
        }

        let focus_seconds = total_seconds - distraction_seconds;
        let effective = interventions.iter().filter(|i| i.was_effective).count();

        Self {
            total_events: events.len(),
            distraction_events,
            total_seconds,
            focus_seconds,
            distraction_seconds,
            focus_percentage: percentage(focus_seconds as f64, total_seconds as f64),
            top_distracting_domains: distracting.top(TOP_DOMAINS),
            top_productive_domains: productive.top(TOP_DOMAINS),
            interventions: interventions.len(),
            intervention_success_rate: percentage(effective as f64, interventions.len() as f64),
            hourly,
        }
    }
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole * 1000.0).round() / 10.0
    } else {
        0.0
    }
}

/// Per-domain seconds in first-seen order
#[derive(Default)]
struct DomainTotals {
    index: HashMap<String, usize>,
    totals: Vec<DomainSeconds>,
}

impl DomainTotals {
    fn add(&mut self, domain: String, seconds: u64) {
        match self.index.get(&domain) {
            Some(&i) => self.totals[i].seconds += seconds,
            None => {
                self.index.insert(domain.clone(), self.totals.len());
                self.totals.push(DomainSeconds { domain, seconds });
            }
        }
    }

    /// Largest first; equal totals keep first-seen order
    fn top(mut self, n: usize) -> Vec<DomainSeconds> {
        self.totals.sort_by(|a, b| b.seconds.cmp(&a.seconds));
        self.totals.truncate(n);
        self.totals
    }
}
