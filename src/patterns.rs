//! Longitudinal pattern mining
//!
//! Mines an ordered browsing history for time-of-day vulnerability, per-domain
//! risk, repeated distraction chains and long dwell on distracting sites.
//!
//! Pipeline: events → per-event (domain, hour, duration, distraction) → four
//! independent analyses → [`PatternReport`]

use crate::agent::Agent;
use crate::catalog::{default_history_distraction_domains, DomainCatalog, DomainCategory};
use crate::config::DEFAULT_LONG_DWELL_SECONDS;
use crate::types::{round3, BrowsingEvent, Pattern, PatternKind, PatternReport};
use log::debug;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Hourly distraction share above which an hour is vulnerable
const VULNERABLE_HOUR_CUTOFF: f64 = 0.5;
/// Domain risk above which a domain is high risk
const HIGH_RISK_CUTOFF: f64 = 0.6;
/// Minimum occurrences for a bigram chain
const MIN_BIGRAM_COUNT: usize = 3;
/// Minimum occurrences for a trigram chain
const MIN_TRIGRAM_COUNT: usize = 2;
/// Chains of each length considered
const TOP_CHAINS: usize = 5;

const CHAIN_CONFIDENCE: f64 = 0.7;
const LONG_DWELL_CONFIDENCE: f64 = 0.8;

/// One event reduced to what the analyses need
struct Visit {
    domain: Option<String>,
    hour: Option<u32>,
    duration: u64,
    is_distraction: bool,
}

/// Discovers distraction patterns from browsing history
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    catalog: Arc<DomainCatalog>,
    history_domains: BTreeSet<String>,
    long_dwell_seconds: u64,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(DomainCatalog::default()), DEFAULT_LONG_DWELL_SECONDS)
    }
}

impl PatternAnalyzer {
    pub fn new(catalog: Arc<DomainCatalog>, long_dwell_seconds: u64) -> Self {
        Self {
            catalog,
            history_domains: default_history_distraction_domains(),
            long_dwell_seconds,
        }
    }

    /// Replace the domains counted as distraction when an event is unflagged
    pub fn with_history_domains(mut self, domains: BTreeSet<String>) -> Self {
        self.history_domains = domains;
        self
    }

    /// Whether a history visit to `domain` counts as distraction without a flag.
    ///
    /// History domains match exactly; the catalog's distraction set also
    /// matches subdomains.
    pub fn is_history_distraction(&self, domain: &str) -> bool {
        self.history_domains.contains(domain)
            || self.catalog.category_of(domain) == Some(DomainCategory::Distraction)
    }

    pub fn analyze_events(&self, events: &[BrowsingEvent]) -> PatternReport {
        if events.is_empty() {
            return PatternReport::default();
        }

        let visits: Vec<Visit> = events.iter().map(|e| self.visit(e)).collect();
        let mut patterns = Vec::new();

        let hourly_vulnerability = hourly_vulnerability(&visits);
        if let Some(pattern) = time_vulnerability_pattern(&hourly_vulnerability) {
            patterns.push(pattern);
        }

        let domain_risk_scores = domain_risks(&visits);
        if let Some(pattern) = high_risk_pattern(&domain_risk_scores) {
            patterns.push(pattern);
        }

        let distraction_chains = distraction_chains(&visits);
        if let Some(first) = distraction_chains.first() {
            patterns.push(Pattern {
                kind: PatternKind::DistractionChain,
                description: format!(
                    "Common distraction sequences detected: {}",
                    first.join(" → ")
                ),
                confidence: CHAIN_CONFIDENCE,
                data: json!({ "chains": distraction_chains.iter().take(TOP_CHAINS).collect::<Vec<_>>() }),
            });
        }

        let dwells = long_dwells(&visits, self.long_dwell_seconds);
        if !dwells.is_empty() {
            let listed: Vec<String> = dwells
                .iter()
                .take(3)
                .map(|(domain, avg)| format!("{domain} ({avg}s avg)"))
                .collect();
            let data: serde_json::Map<String, serde_json::Value> = dwells
                .iter()
                .take(10)
                .map(|(domain, avg)| (domain.clone(), json!(avg)))
                .collect();
            patterns.push(Pattern {
                kind: PatternKind::LongDwell,
                description: format!(
                    "Excessive time on distracting sites: {}",
                    listed.join(", ")
                ),
                confidence: LONG_DWELL_CONFIDENCE,
                data: json!({ "domains": data }),
            });
        }

        debug!(
            "analyzed {} events: {} patterns, {} chains",
            events.len(),
            patterns.len(),
            distraction_chains.len()
        );

        PatternReport {
            patterns,
            hourly_vulnerability,
            domain_risk_scores,
            distraction_chains,
        }
    }

    fn visit(&self, event: &BrowsingEvent) -> Visit {
        let domain = event.resolved_domain();
        let listed = domain
            .as_deref()
            .is_some_and(|d| self.is_history_distraction(d));
        Visit {
            hour: event.hour(),
            duration: event.duration_secs(),
            is_distraction: event.is_distraction || listed,
            domain,
        }
    }
}

/// Distraction share of time for each hour 0-23
fn hourly_vulnerability(visits: &[Visit]) -> BTreeMap<u32, f64> {
    let mut total = [0u64; 24];
    let mut distracted = [0u64; 24];

    for visit in visits {
        let Some(hour) = visit.hour else { continue };
        let slot = hour as usize % 24;
        total[slot] += visit.duration;
        if visit.is_distraction {
            distracted[slot] += visit.duration;
        }
    }

    (0..24u32)
        .map(|h| {
            let i = h as usize;
            let ratio = if total[i] > 0 {
                round3(distracted[i] as f64 / total[i] as f64)
            } else {
                0.0
            };
            (h, ratio)
        })
        .collect()
}

fn time_vulnerability_pattern(hourly: &BTreeMap<u32, f64>) -> Option<Pattern> {
    let vulnerable: Vec<(u32, f64)> = hourly
        .iter()
        .filter(|(_, ratio)| **ratio > VULNERABLE_HOUR_CUTOFF)
        .map(|(h, r)| (*h, *r))
        .collect();
    if vulnerable.is_empty() {
        return None;
    }

    let hours: Vec<u32> = vulnerable.iter().map(|(h, _)| *h).collect();
    let mean = vulnerable.iter().map(|(_, r)| r).sum::<f64>() / vulnerable.len() as f64;
    let listed: Vec<String> = hours.iter().map(|h| format!("{h}:00")).collect();

    Some(Pattern {
        kind: PatternKind::TimeVulnerability,
        description: format!("High distraction risk during hours: {}", listed.join(", ")),
        confidence: round3(mean),
        data: json!({ "vulnerable_hours": hours }),
    })
}

/// Distraction share of time per domain; domains with no time are omitted
fn domain_risks(visits: &[Visit]) -> BTreeMap<String, f64> {
    let mut totals: HashMap<&str, (u64, u64)> = HashMap::new();
    for visit in visits {
        let Some(domain) = visit.domain.as_deref() else {
            continue;
        };
        let entry = totals.entry(domain).or_default();
        entry.0 += visit.duration;
        if visit.is_distraction {
            entry.1 += visit.duration;
        }
    }

    totals
        .into_iter()
        .filter(|(_, (total, _))| *total > 0)
        .map(|(domain, (total, distracted))| {
            (domain.to_string(), round3(distracted as f64 / total as f64))
        })
        .collect()
}

fn high_risk_pattern(risks: &BTreeMap<String, f64>) -> Option<Pattern> {
    let mut flagged: Vec<(&str, f64)> = risks
        .iter()
        .filter(|(_, risk)| **risk > HIGH_RISK_CUTOFF)
        .map(|(d, r)| (d.as_str(), *r))
        .collect();
    if flagged.is_empty() {
        return None;
    }
    flagged.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mean = flagged.iter().map(|(_, r)| r).sum::<f64>() / flagged.len() as f64;
    let named: Vec<&str> = flagged.iter().take(5).map(|(d, _)| *d).collect();
    let data: serde_json::Map<String, serde_json::Value> = flagged
        .iter()
        .take(10)
        .map(|(d, r)| (d.to_string(), json!(r)))
        .collect();

    Some(Pattern {
        kind: PatternKind::HighRiskDomains,
        description: format!(
            "These domains consistently lead to extended distraction: {}",
            named.join(", ")
        ),
        confidence: round3(mean),
        data: serde_json::Value::Object(data),
    })
}

/// Frequent back-to-back sequences over the distraction-only domain stream.
///
/// Trigrams (≥2 occurrences) come first, then bigrams (≥3), each drawn from
/// the five most common of its length. Ties keep first-seen order.
fn distraction_chains(visits: &[Visit]) -> Vec<Vec<String>> {
    let sequence: Vec<&str> = visits
        .iter()
        .filter(|v| v.is_distraction)
        .filter_map(|v| v.domain.as_deref())
        .collect();
    if sequence.len() < 2 {
        return Vec::new();
    }

    let mut bigrams = OrderedCounter::default();
    for pair in sequence.windows(2) {
        if pair[0] != pair[1] {
            bigrams.add(pair);
        }
    }

    let mut trigrams = OrderedCounter::default();
    for triple in sequence.windows(3) {
        if !(triple[0] == triple[1] && triple[1] == triple[2]) {
            trigrams.add(triple);
        }
    }

    let mut chains = Vec::new();
    chains.extend(trigrams.most_common(TOP_CHAINS, MIN_TRIGRAM_COUNT));
    chains.extend(bigrams.most_common(TOP_CHAINS, MIN_BIGRAM_COUNT));
    chains
}

/// Counts n-grams while remembering first-seen order for stable ties
#[derive(Default)]
struct OrderedCounter<'a> {
    index: HashMap<&'a [&'a str], usize>,
    counts: Vec<(&'a [&'a str], usize)>,
}

impl<'a> OrderedCounter<'a> {
    fn add(&mut self, gram: &'a [&'a str]) {
        match self.index.get(gram) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(gram, self.counts.len());
                self.counts.push((gram, 1));
            }
        }
    }

    fn most_common(&self, top: usize, min_count: usize) -> Vec<Vec<String>> {
        let mut ranked: Vec<&(&[&str], usize)> = self.counts.iter().collect();
        // Stable sort keeps insertion order among equal counts
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(top)
            .filter(|(_, count)| *count >= min_count)
            .map(|(gram, _)| gram.iter().map(|d| d.to_string()).collect())
            .collect()
    }
}

/// Distracting domains whose average visit meets the threshold, longest first
fn long_dwells(visits: &[Visit], threshold_seconds: u64) -> Vec<(String, u64)> {
    let mut per_domain: HashMap<&str, (u64, u64)> = HashMap::new();
    for visit in visits.iter().filter(|v| v.is_distraction) {
        if let Some(domain) = visit.domain.as_deref() {
            let entry = per_domain.entry(domain).or_default();
            entry.0 += visit.duration;
            entry.1 += 1;
        }
    }

    let mut dwells: Vec<(String, u64)> = per_domain
        .into_iter()
        .filter_map(|(domain, (total, count))| {
            let avg = total as f64 / count as f64;
            (avg >= threshold_seconds as f64).then(|| (domain.to_string(), avg.round() as u64))
        })
        .collect();
    dwells.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    dwells
}

impl Agent<[BrowsingEvent]> for PatternAnalyzer {
    type Output = PatternReport;

    fn name(&self) -> &'static str {
        "Pattern Agent"
    }

    fn analyze(&self, input: &[BrowsingEvent]) -> PatternReport {
        self.analyze_events(input)
    }
}
