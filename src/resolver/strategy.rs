//! Strategy tags and per-strategy counters

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The resolution strategies, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// Vendor naming family rewritten and searched by name on the primary catalog
    BrandSpecial,
    /// Site-restricted web search pointing straight at a primary catalog page
    CrossReference,
    /// Secondary catalog supplies a display name the primary catalog is searched by
    NameResolution,
    /// Primary catalog searched with the raw identifier
    Direct,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::BrandSpecial,
        Method::CrossReference,
        Method::NameResolution,
        Method::Direct,
    ];

    /// Tag persisted in `method_used`
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::BrandSpecial => "gsmarena_moto_direct",
            Self::CrossReference => "google_gsmarena",
            Self::NameResolution => "gsmchoice_gsmarena",
            Self::Direct => "gsmarena_direct",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_tag() == tag)
    }

    fn index(&self) -> usize {
        match self {
            Self::BrandSpecial => 0,
            Self::CrossReference => 1,
            Self::NameResolution => 2,
            Self::Direct => 3,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Attempts and hits of one strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrategyTally {
    pub attempts: u64,
    pub hits: u64,
}

impl StrategyTally {
    pub fn hit_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.hits as f64 / self.attempts as f64
        }
    }
}

/// Observability counters shared by every resolver of a run
#[derive(Debug, Default)]
pub struct StrategyCounters {
    attempts: [AtomicU64; 4],
    hits: [AtomicU64; 4],
    web_searches: AtomicU64,
    secondary_lookups: AtomicU64,
    date_enrichments: AtomicU64,
}

impl StrategyCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&self, method: Method) {
        self.attempts[method.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self, method: Method) {
        self.hits[method.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_web_search(&self) {
        self.web_searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_secondary_lookup(&self) {
        self.secondary_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_date_enrichment(&self) {
        self.date_enrichments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tally(&self, method: Method) -> StrategyTally {
        StrategyTally {
            attempts: self.attempts[method.index()].load(Ordering::Relaxed),
            hits: self.hits[method.index()].load(Ordering::Relaxed),
        }
    }

    /// Tallies for every strategy, in strategy order
    pub fn snapshot(&self) -> BTreeMap<Method, StrategyTally> {
        Method::ALL
            .into_iter()
            .map(|method| (method, self.tally(method)))
            .collect()
    }

    pub fn web_searches(&self) -> u64 {
        self.web_searches.load(Ordering::Relaxed)
    }

    pub fn secondary_lookups(&self) -> u64 {
        self.secondary_lookups.load(Ordering::Relaxed)
    }

    pub fn date_enrichments(&self) -> u64 {
        self.date_enrichments.load(Ordering::Relaxed)
    }
}
