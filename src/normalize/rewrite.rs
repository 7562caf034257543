use crate::normalize::Brand;
use regex::Regex;
use std::sync::OnceLock;

/// Motorola rewrites, applied in sequence (case-insensitive)
const MOTOROLA_PATTERNS: &[(&str, &str)] = &[
    (r"moto g\((\d+)\) 5G", "Moto G${1} 5G"),
    (r"moto g\((\d+)\) plus", "Moto G${1} Plus"),
    (r"moto g\((\d+)\)", "Moto G${1}"),
    (r"moto g (\d+)G", "Moto G ${1}G"),
    (r"moto g stylus 5G - (\d+)", "Moto G Stylus 5G (${1})"),
    (r"moto g stylus 5G", "Moto G Stylus 5G"),
    (r"moto g stylus", "Moto G Stylus"),
    (r"moto e\((\d+)\) plus", "Moto E${1} Plus"),
    (r"moto e(\d+)", "Moto E${1}"),
    (r"moto g", "Moto G"),
    (r"moto e", "Moto E"),
    (r"^moto\s+", "Moto "),
];

const SAMSUNG_NAMES: &[(&str, &str)] = &[
    ("SM-J415G", "Samsung Galaxy J4+"),
    ("SM-A217M", "Samsung Galaxy A21s"),
    ("SM-J810M", "Samsung Galaxy J8"),
    ("SM-A730F", "Samsung Galaxy A8+ (2018)"),
    ("SM-N976U", "Samsung Galaxy Note10+ 5G"),
    ("SM-A920F", "Samsung Galaxy A9 (2018)"),
    ("SM-A137F", "Samsung Galaxy A13"),
    ("SM-A245F", "Samsung Galaxy A24"),
    ("SM-G991B", "Samsung Galaxy S21"),
];

const ZTE_NAMES: &[(&str, &str)] = &[
    ("ZTE 8050", "ZTE Blade A73"),
    ("ZTE 8010", "ZTE Blade V20"),
    ("ZTE 9050N", "ZTE Blade A71"),
    ("ZTE A7040", "ZTE Blade A7 (2020)"),
    ("ZTE 9046", "ZTE Blade A51"),
    ("ZTE 9045", "ZTE Blade A31"),
    ("ZTE A2022L", "ZTE Blade A52"),
    ("ZTE Blade V10", "ZTE Blade V10"),
    ("ZTE Blade A33s", "ZTE Blade A33s"),
    ("ZTE Blade L210", "ZTE Blade L210"),
];

fn motorola_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        MOTOROLA_PATTERNS
            .iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(&format!("(?i){}", pattern))
                    .ok()
                    .map(|re| (re, *replacement))
            })
            .collect()
    })
}

fn lookup(table: &[(&str, &'static str)], name: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(name))
        .map(|(_, display)| *display)
}

fn normalize_motorola(name: &str) -> String {
    let mut name = name.to_string();
    for (re, replacement) in motorola_rules() {
        name = re.replace_all(&name, *replacement).into_owned();
    }

    if name.len() >= 4 && name.is_char_boundary(4) && name[..4].eq_ignore_ascii_case("moto") {
        name = format!("Moto{}", &name[4..]);
    }
    name
}

fn normalize_samsung(name: &str) -> String {
    if name.len() >= 3 && name.is_char_boundary(3) && name[..3].eq_ignore_ascii_case("sm-") {
        if let Some(display) = lookup(SAMSUNG_NAMES, name) {
            return display.to_string();
        }
    }
    name.to_string()
}

fn normalize_zte(name: &str) -> String {
    lookup(ZTE_NAMES, name)
        .map(str::to_string)
        .unwrap_or_else(|| name.to_string())
}

/// Rewrites a raw model code into the form catalogs list it under
///
/// A known `hint` selects the brand table first; otherwise the table is
/// chosen from the code's own prefix. Inputs no table knows about pass
/// through unchanged (apart from trimming).
///
/// # Examples
///
/// ```
/// use device_resolver::{normalize_name, Brand};
///
/// assert_eq!(normalize_name("moto g(30)", None), "Moto G30");
/// assert_eq!(normalize_name("SM-A245F", Some(Brand::Samsung)), "Samsung Galaxy A24");
/// assert_eq!(normalize_name("ZX-100", None), "ZX-100");
/// ```
pub fn normalize_name(raw: &str, hint: Option<Brand>) -> String {
    let name = raw.trim();
    if name.is_empty() {
        return String::new();
    }

    match hint {
        Some(Brand::Motorola) => return normalize_motorola(name),
        Some(Brand::Samsung) => return normalize_samsung(name),
        Some(Brand::Zte) => return normalize_zte(name),
        _ => {}
    }

    let lowered = name.to_lowercase();
    if lowered.starts_with("moto") {
        normalize_motorola(name)
    } else if lowered.starts_with("sm-") {
        normalize_samsung(name)
    } else if lowered.starts_with("zte") {
        normalize_zte(name)
    } else {
        name.to_string()
    }
}
