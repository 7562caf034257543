use crate::normalize::normalize_name;
use crate::record::CandidateLink;
use std::collections::HashSet;

const EXACT_SCORE: f64 = 1.0;
const CONTAINMENT_SCORE: f64 = 0.8;
const BRAND_BONUS: f64 = 0.1;

/// Brand words that earn a bonus when both names mention them
const BRAND_KEYWORDS: &[&str] = &[
    "samsung", "motorola", "moto", "zte", "lg", "huawei", "xiaomi", "oppo", "vivo",
];

fn words(name: &str) -> HashSet<&str> {
    name.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Scores how likely two device names refer to the same device
///
/// - exact match (case-folded, trimmed): 1.0
/// - one name contains the other: 0.8
/// - otherwise Jaccard similarity of the word sets, +0.1 when both
///   sides mention the same brand keyword, clipped to 1.0
///
/// # Examples
///
/// ```
/// use device_resolver::normalize::similarity;
///
/// assert_eq!(similarity("Moto G30", "moto g30"), 1.0);
/// assert_eq!(similarity("Galaxy A24", "Samsung Galaxy A24"), 0.8);
/// assert_eq!(similarity("", "anything"), 0.0);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    if a == b {
        return EXACT_SCORE;
    }

    if a.contains(&b) || b.contains(&a) {
        return CONTAINMENT_SCORE;
    }

    let words_a = words(&a);
    let words_b = words(&b);
    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();
    let mut score = intersection as f64 / union as f64;

    if BRAND_KEYWORDS
        .iter()
        .any(|brand| words_a.contains(brand) && words_b.contains(brand))
    {
        score += BRAND_BONUS;
    }

    score.min(1.0)
}

/// Picks the candidate whose display name best matches `target`
///
/// Both sides are normalized first. The highest score wins and ties keep
/// input order. When every candidate scores zero the first candidate is
/// returned anyway, so a search that produced hits always yields one.
///
/// # Examples
///
/// ```
/// use device_resolver::rank;
/// use device_resolver::record::CandidateLink;
///
/// let candidates = vec![
///     CandidateLink::new("Acme Model X1", "https://example.com/x1.php", 1),
///     CandidateLink::new("Acme Model X1 Plus", "https://example.com/x1p.php", 2),
/// ];
/// assert_eq!(rank(&candidates, "acme x1").unwrap().display_name, "Acme Model X1");
/// ```
pub fn rank<'a>(candidates: &'a [CandidateLink], target: &str) -> Option<&'a CandidateLink> {
    let first = candidates.first()?;
    let normalized_target = normalize_name(target, None);

    let mut best: Option<(&CandidateLink, f64)> = None;
    for candidate in candidates {
        let normalized = normalize_name(&candidate.display_name, None);
        let score = similarity(&normalized_target, &normalized);
        tracing::trace!(
            "Candidate '{}' (normalized '{}') scored {:.2}",
            candidate.display_name,
            normalized,
            score
        );

        if score > best.map_or(0.0, |(_, s)| s) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, score)) => {
            tracing::debug!(
                "Best match for '{}': '{}' ({:.2})",
                target,
                candidate.display_name,
                score
            );
            Some(candidate)
        }
        None => {
            tracing::debug!(
                "No candidate matched '{}', falling back to '{}'",
                target,
                first.display_name
            );
            Some(first)
        }
    }
}
