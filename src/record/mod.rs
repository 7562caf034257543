//! Records flowing through the resolution pipeline
//!
//! - `Identifier`: the normalized model code every other record is keyed by
//! - `CandidateLink`: one search hit from an adapter, before detail extraction
//! - `PartialRecord`: what one adapter extracted from one detail page
//! - `ResolvedRecord` / `FailureRecord`: the terminal outcome for an identifier

use crate::normalize::{infer_brand, Brand};
use crate::resolver::Method;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// A manufacturer model code, whitespace-collapsed and uppercased
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Normalizes a raw model code
    ///
    /// Returns `None` when nothing but whitespace remains.
    ///
    /// # Example
    ///
    /// ```
    /// use device_resolver::Identifier;
    ///
    /// let id = Identifier::parse("  moto  g(30) ").unwrap();
    /// assert_eq!(id.as_str(), "MOTO G(30)");
    /// assert!(Identifier::parse("   ").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return None;
        }
        Some(Self(collapsed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One entry of a batch: the identifier plus an optional manufacturer hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub identifier: Identifier,
    pub manufacturer: Option<String>,
}

impl BatchItem {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            manufacturer: None,
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        let manufacturer = manufacturer.into();
        let trimmed = manufacturer.trim();
        self.manufacturer = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// Manufacturer hint when it names a known brand, else inferred from the code
    pub fn brand(&self) -> Brand {
        self.manufacturer
            .as_deref()
            .and_then(Brand::from_hint)
            .unwrap_or_else(|| infer_brand(self.identifier.as_str()))
    }
}

/// A search hit emitted by an adapter
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateLink {
    /// Name as displayed by the source
    pub display_name: String,

    /// Absolute URL of the detail page
    pub target: String,

    /// 1-based position in the source's result list
    pub rank: usize,

    /// The source listed this under "closest matches" rather than exact hits
    pub closest_match: bool,
}

impl CandidateLink {
    pub fn new(display_name: impl Into<String>, target: impl Into<String>, rank: usize) -> Self {
        Self {
            display_name: display_name.into(),
            target: target.into(),
            rank,
            closest_match: false,
        }
    }
}

/// Single-source detail extraction result; any field may be empty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub source: String,
    pub device_name: String,
    pub announced_date: String,
    pub price: String,
    pub specifications: BTreeMap<String, String>,
    pub source_reference: String,
    pub is_closest_match: bool,
}

impl PartialRecord {
    pub fn new(source: impl Into<String>, source_reference: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_reference: source_reference.into(),
            ..Self::default()
        }
    }
}

/// Final, merged record for one identifier
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRecord {
    pub identifier: Identifier,
    pub device_name: String,
    pub announced_date: String,
    pub announced_date_source: String,
    pub price: String,
    pub price_source: String,
    pub inferred_brand: Brand,
    pub source_reference: String,
    pub method_used: Method,
    pub is_closest_match: bool,
    pub specifications: BTreeMap<String, String>,
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedRecord {
    /// Builds a resolved record from the accepted partial record
    ///
    /// Field sources start out as the accepted record's own source.
    pub fn from_partial(
        identifier: Identifier,
        partial: PartialRecord,
        inferred_brand: Brand,
        method_used: Method,
    ) -> Self {
        let announced_date_source = if partial.announced_date.trim().is_empty() {
            String::new()
        } else {
            partial.source.clone()
        };
        let price_source = if partial.price.trim().is_empty() {
            String::new()
        } else {
            partial.source.clone()
        };

        Self {
            identifier,
            device_name: partial.device_name,
            announced_date: partial.announced_date,
            announced_date_source,
            price: partial.price,
            price_source,
            inferred_brand,
            source_reference: partial.source_reference,
            method_used,
            is_closest_match: partial.is_closest_match,
            specifications: partial.specifications,
            resolved_at: Utc::now(),
        }
    }
}

/// Terminal record for an identifier no strategy could resolve
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub identifier: Identifier,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(identifier: Identifier, reason: impl Into<String>) -> Self {
        Self {
            identifier,
            reason: reason.into(),
            failed_at: Utc::now(),
        }
    }
}

/// Outcome of resolving one identifier: exactly one of the two
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedRecord),
    Failed(FailureRecord),
}

impl Resolution {
    pub fn identifier(&self) -> &Identifier {
        match self {
            Self::Resolved(record) => &record.identifier,
            Self::Failed(record) => &record.identifier,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn method(&self) -> Option<Method> {
        match self {
            Self::Resolved(record) => Some(record.method_used),
            Self::Failed(_) => None,
        }
    }
}
