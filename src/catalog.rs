//! Domain and keyword catalogs
//!
//! Catalogs are immutable configuration data: four prioritized domain sets and
//! three keyword pattern sets. The built-in defaults live here; overrides and
//! extensions arrive through [`crate::config::EngineConfig`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category of a registered domain, in matching priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainCategory {
    /// Explicit/adult content, always blocked
    Severe,
    Study,
    /// Content decides (video hosts, forums)
    Ambiguous,
    Distraction,
}

impl DomainCategory {
    /// All categories in priority order (severe > study > ambiguous > distraction)
    pub const PRIORITY: [DomainCategory; 4] = [
        DomainCategory::Severe,
        DomainCategory::Study,
        DomainCategory::Ambiguous,
        DomainCategory::Distraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainCategory::Severe => "severe",
            DomainCategory::Study => "study",
            DomainCategory::Ambiguous => "ambiguous",
            DomainCategory::Distraction => "distraction",
        }
    }
}

/// How a hostname matched a registered domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    /// Hostname is a subdomain (`host` ends with `.<registered>`)
    Suffix,
}

/// Categorized domain sets with exact and suffix matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainCatalog {
    pub severe: BTreeSet<String>,
    pub study: BTreeSet<String>,
    pub ambiguous: BTreeSet<String>,
    pub distraction: BTreeSet<String>,
}

impl Default for DomainCatalog {
    fn default() -> Self {
        Self {
            severe: to_set(DEFAULT_SEVERE_DOMAINS),
            study: to_set(DEFAULT_STUDY_DOMAINS),
            ambiguous: to_set(DEFAULT_AMBIGUOUS_DOMAINS),
            distraction: to_set(DEFAULT_DISTRACTION_DOMAINS),
        }
    }
}

impl DomainCatalog {
    /// Catalog with no registered domains
    pub fn empty() -> Self {
        Self {
            severe: BTreeSet::new(),
            study: BTreeSet::new(),
            ambiguous: BTreeSet::new(),
            distraction: BTreeSet::new(),
        }
    }

    /// Registered domains for a category
    pub fn set(&self, category: DomainCategory) -> &BTreeSet<String> {
        match category {
            DomainCategory::Severe => &self.severe,
            DomainCategory::Study => &self.study,
            DomainCategory::Ambiguous => &self.ambiguous,
            DomainCategory::Distraction => &self.distraction,
        }
    }

    fn set_mut(&mut self, category: DomainCategory) -> &mut BTreeSet<String> {
        match category {
            DomainCategory::Severe => &mut self.severe,
            DomainCategory::Study => &mut self.study,
            DomainCategory::Ambiguous => &mut self.ambiguous,
            DomainCategory::Distraction => &mut self.distraction,
        }
    }

    /// Register additional domains under a category
    pub fn extend<I, S>(&mut self, category: DomainCategory, domains: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = self.set_mut(category);
        for domain in domains {
            let domain = domain.as_ref().trim().to_lowercase();
            if !domain.is_empty() {
                set.insert(domain);
            }
        }
    }

    /// Look up a hostname.
    ///
    /// Exact matches are tried across every category first, then suffix
    /// matches, each pass in priority order.
    pub fn lookup(&self, host: &str) -> Option<(DomainCategory, MatchKind)> {
        if host.is_empty() {
            return None;
        }

        for category in DomainCategory::PRIORITY {
            if self.set(category).contains(host) {
                return Some((category, MatchKind::Exact));
            }
        }

        for category in DomainCategory::PRIORITY {
            let is_subdomain = self.set(category).iter().any(|registered| {
                host.len() > registered.len() + 1
                    && host.ends_with(registered.as_str())
                    && host.as_bytes()[host.len() - registered.len() - 1] == b'.'
            });
            if is_subdomain {
                return Some((category, MatchKind::Suffix));
            }
        }

        None
    }

    /// Category of a hostname, ignoring how it matched
    pub fn category_of(&self, host: &str) -> Option<DomainCategory> {
        self.lookup(host).map(|(category, _)| category)
    }

    /// Total number of registered domains
    pub fn len(&self) -> usize {
        DomainCategory::PRIORITY
            .iter()
            .map(|c| self.set(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keyword pattern sets used by the title classifier.
///
/// Patterns are regular expressions matched case-insensitively against titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordCatalog {
    pub severe: Vec<String>,
    pub study: Vec<String>,
    pub distraction: Vec<String>,
}

impl Default for KeywordCatalog {
    fn default() -> Self {
        Self {
            severe: to_vec(DEFAULT_SEVERE_KEYWORDS),
            study: to_vec(DEFAULT_STUDY_KEYWORDS),
            distraction: to_vec(DEFAULT_DISTRACTION_KEYWORDS),
        }
    }
}

/// Domains whose history visits count as distraction even when unflagged.
///
/// Wider than the context scorer's distraction set: sites that are ambiguous
/// for a single page still count as distraction once they show up in history.
pub fn default_history_distraction_domains() -> BTreeSet<String> {
    to_set(DEFAULT_HISTORY_DISTRACTION_DOMAINS)
}

fn to_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn to_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const DEFAULT_SEVERE_DOMAINS: &[&str] = &[
    "pornhub.com",
    "xvideos.com",
    "xnxx.com",
    "xhamster.com",
    "redtube.com",
    "youporn.com",
    "chaturbate.com",
    "onlyfans.com",
];

const DEFAULT_STUDY_DOMAINS: &[&str] = &[
    // Academic
    "scholar.google.com",
    "arxiv.org",
    "ieee.org",
    "ieeexplore.ieee.org",
    "acm.org",
    "dl.acm.org",
    "researchgate.net",
    "semanticscholar.org",
    "sciencedirect.com",
    "springer.com",
    "jstor.org",
    // Development
    "github.com",
    "gitlab.com",
    "stackoverflow.com",
    "stackexchange.com",
    "developer.mozilla.org",
    "docs.python.org",
    "docs.rs",
    "devdocs.io",
    // Productivity
    "docs.google.com",
    "sheets.google.com",
    "slides.google.com",
    "notion.so",
    "overleaf.com",
    "sharelatex.com",
    // Learning
    "coursera.org",
    "edx.org",
    "udemy.com",
    "khanacademy.org",
    "leetcode.com",
    "hackerrank.com",
    "geeksforgeeks.org",
    // Universities
    "mit.edu",
    "ocw.mit.edu",
    "stanford.edu",
    "harvard.edu",
    "ox.ac.uk",
    "cam.ac.uk",
    "berkeley.edu",
];

const DEFAULT_AMBIGUOUS_DOMAINS: &[&str] = &[
    "youtube.com",
    "reddit.com",
    "medium.com",
    "quora.com",
    "twitter.com",
    "x.com",
];

const DEFAULT_DISTRACTION_DOMAINS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "netflix.com",
    "hulu.com",
    "twitch.tv",
    "9gag.com",
    "buzzfeed.com",
    "disneyplus.com",
    "primevideo.com",
];

const DEFAULT_HISTORY_DISTRACTION_DOMAINS: &[&str] = &[
    "youtube.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "tiktok.com",
    "reddit.com",
    "netflix.com",
    "hulu.com",
    "twitch.tv",
    "9gag.com",
    "buzzfeed.com",
];

const DEFAULT_SEVERE_KEYWORDS: &[&str] =
    &[r"\b(porn|porno|pornography|xxx|nsfw|sex|camgirl|adult\s*video)s?\b"];

const DEFAULT_STUDY_KEYWORDS: &[&str] = &[
    r"\b(algorithm|data\s*structure|machine\s*learning|deep\s*learning|neural\s*network)s?\b",
    r"\b(research|paper|thesis|dissertation|survey|abstract)s?\b",
    r"\b(programming|coding|software|developer|engineering)s?\b",
    r"\b(lecture|tutorial|course|lesson|class|assignment|homework|syllabus)s?\b",
    r"\b(database|network|security|system\s*design|architecture)s?\b",
    r"\b(python|java|javascript|typescript|c\+\+|rust|golang|react|node)s?\b",
    r"\b(ieee|acm|arxiv|conference|journal|proceedings)s?\b",
    r"\b(exam|quiz|test|study|review|notes|textbook)s?\b",
    r"\b(math|calculus|algebra|statistics|probability|physics|chemistry|biology)s?\b",
    r"\b(MIT|Stanford|Harvard|Oxford|Cambridge|Berkeley)\b",
    r"\b(CS\s?\d|6\.\d{3}|CS\d{2,3}|COMP\s?\d|EE\s?\d|MATH\s?\d)\b",
    r"\b(introduction\s+to|fundamentals\s+of|principles\s+of|learn)\b",
    r"\b(how\s+to\s+(code|program|build|implement|solve|debug))s?\b",
    r"\b(documentation|docs|reference|guide|manual|handbook|API)s?\b",
    r"\b(open\s*courseware|OCW|MOOC|coursework|curriculum)s?\b",
    r"\b(analysis|computing|informatics|data\s*science|AI|NLP|CV)\b",
];

const DEFAULT_DISTRACTION_KEYWORDS: &[&str] = &[
    r"\b(viral|meme|celebrity|gossip|prank|fails?|bloopers?)s?\b",
    r"\b(gaming|gameplay|twitch|lets?\s*play|walkthrough|speedrun)s?\b",
    r"\b(funny|comedy|entertainment|trending|react(ion)?s?)s?\b",
    r"\b(shopping|sale|discount|deal|coupon|unboxing)s?\b",
    r"\b(drama|reality\s*TV|vlog|mukbang|ASMR|compilation)s?\b",
    r"\b(shorts|reel|story|tiktok|snap)s?\b",
];
