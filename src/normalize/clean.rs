/// Title suffixes catalogs append to device names
const NOISE_SUFFIXES: &[&str] = &[
    " - Full phone specifications",
    " - Specifications",
    " | GSMChoice",
    " specifications",
    " specs",
    " review",
    " price",
    " features",
];

/// Placeholder names that never identify a device
const PLACEHOLDER_PREFIXES: &[&str] = &["unknown", "n/a", "tbd", "coming soon"];

/// Collapses whitespace and strips page-title noise from a scraped name
///
/// ```
/// use device_resolver::normalize::clean_device_name;
///
/// assert_eq!(
///     clean_device_name("Samsung Galaxy A24  - Full phone specifications"),
///     "Samsung Galaxy A24"
/// );
/// ```
pub fn clean_device_name(name: &str) -> String {
    let mut name = name.split_whitespace().collect::<Vec<_>>().join(" ");

    for suffix in NOISE_SUFFIXES {
        let cut = name.len().saturating_sub(suffix.len());
        if cut > 0 && name.is_char_boundary(cut) && name[cut..].eq_ignore_ascii_case(suffix) {
            name.truncate(cut);
        }
    }

    name.trim().to_string()
}

/// Whether a scraped name looks like a real device name
pub fn is_valid_device_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return false;
    }

    let lowered = trimmed.to_lowercase();
    if PLACEHOLDER_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return false;
    }

    trimmed.chars().any(|c| c.is_ascii_alphabetic())
}
