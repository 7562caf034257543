use std::fmt;

/// Device manufacturers the pipeline can recognize from a model code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Brand {
    Samsung,
    Motorola,
    Zte,
    Lg,
    Huawei,
    Xiaomi,
    Oppo,
    Vivo,
    Hisense,
    Tecno,
    Cubot,
    Ulefone,
    Wiko,
    Stellar,
    Shark,
    Logic,
    Unknown,
}

/// A single brand detection rule, applied to the lowercased model code
#[derive(Debug, Clone, Copy)]
enum BrandRule {
    Prefix(&'static str),
    Contains(&'static str),
    /// Prefix immediately followed by an ASCII digit
    PrefixDigits(&'static str),
}

impl BrandRule {
    fn matches(&self, lowered: &str) -> bool {
        match self {
            Self::Prefix(prefix) => lowered.starts_with(prefix),
            Self::Contains(needle) => lowered.contains(needle),
            Self::PrefixDigits(prefix) => lowered
                .strip_prefix(prefix)
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit()),
        }
    }
}

/// Ordered rule table; earlier entries win
const BRAND_RULES: &[(Brand, &[BrandRule])] = &[
    (
        Brand::Samsung,
        &[BrandRule::Prefix("sm-"), BrandRule::Contains("galaxy")],
    ),
    (
        Brand::Motorola,
        &[BrandRule::Prefix("moto"), BrandRule::Contains("motorola")],
    ),
    (Brand::Zte, &[BrandRule::Prefix("zte")]),
    (Brand::Lg, &[BrandRule::Prefix("lm-")]),
    (
        Brand::Huawei,
        &[BrandRule::Prefix("alt-"), BrandRule::Contains("huawei")],
    ),
    (
        Brand::Xiaomi,
        &[BrandRule::Prefix("mi "), BrandRule::Contains("redmi")],
    ),
    (Brand::Oppo, &[BrandRule::Prefix("cph")]),
    (Brand::Vivo, &[BrandRule::PrefixDigits("v")]),
    (Brand::Hisense, &[BrandRule::Contains("hisense")]),
    (Brand::Tecno, &[BrandRule::Contains("tecno")]),
    (Brand::Cubot, &[BrandRule::Contains("kingkong")]),
    (Brand::Ulefone, &[BrandRule::Contains("tank")]),
    (Brand::Wiko, &[BrandRule::Prefix("w-")]),
    (Brand::Stellar, &[BrandRule::Contains("stellar")]),
    (Brand::Shark, &[BrandRule::Contains("shark")]),
    (Brand::Logic, &[BrandRule::Contains("logic")]),
];

impl Brand {
    /// Display name, as catalogs spell it
    pub fn name(&self) -> &'static str {
        match self {
            Self::Samsung => "Samsung",
            Self::Motorola => "Motorola",
            Self::Zte => "ZTE",
            Self::Lg => "LG",
            Self::Huawei => "Huawei",
            Self::Xiaomi => "Xiaomi",
            Self::Oppo => "OPPO",
            Self::Vivo => "Vivo",
            Self::Hisense => "Hisense",
            Self::Tecno => "Tecno",
            Self::Cubot => "Cubot",
            Self::Ulefone => "Ulefone",
            Self::Wiko => "Wiko",
            Self::Stellar => "Stellar",
            Self::Shark => "Shark",
            Self::Logic => "Logic",
            Self::Unknown => "Unknown",
        }
    }

    /// Parses a stored brand name back into a `Brand`
    pub fn from_name(name: &str) -> Self {
        BRAND_RULES
            .iter()
            .map(|(brand, _)| *brand)
            .find(|brand| brand.name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Self::Unknown)
    }

    /// Maps a free-text manufacturer hint (e.g. "Motorola Mobility LLC") onto a brand
    ///
    /// Returns `None` when the hint names no known manufacturer.
    pub fn from_hint(hint: &str) -> Option<Self> {
        let lowered = hint.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }
        BRAND_RULES
            .iter()
            .map(|(brand, _)| *brand)
            .find(|brand| lowered.contains(&brand.name().to_lowercase()))
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Infers the manufacturer of a raw model code
///
/// Rules are tried in table order and the first match wins, so a code such
/// as `SM-G991B` is Samsung before any later substring rule is considered.
///
/// # Examples
///
/// ```
/// use device_resolver::{infer_brand, Brand};
///
/// assert_eq!(infer_brand("SM-A245F"), Brand::Samsung);
/// assert_eq!(infer_brand("moto g(30)"), Brand::Motorola);
/// assert_eq!(infer_brand("V2111"), Brand::Vivo);
/// assert_eq!(infer_brand("ZX-100"), Brand::Unknown);
/// ```
pub fn infer_brand(raw: &str) -> Brand {
    let lowered = raw.trim().to_lowercase();

    BRAND_RULES
        .iter()
        .find(|(_, rules)| rules.iter().any(|rule| rule.matches(&lowered)))
        .map(|(brand, _)| *brand)
        .unwrap_or(Brand::Unknown)
}
