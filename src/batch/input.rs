//! Batch input loading
//!
//! One model code per line, optionally followed by a comma and a manufacturer
//! hint. A `model_code` header, blank lines and `#` comments are skipped.

use crate::record::{BatchItem, Identifier};
use crate::ResolverError;
use std::collections::HashSet;
use std::path::Path;

/// Reads batch items from a text or CSV file
pub fn load_batch_items(path: &Path) -> Result<Vec<BatchItem>, ResolverError> {
    let content = std::fs::read_to_string(path)?;
    parse_batch_items(&content)
}

/// Parses batch items, keeping the first occurrence of each identifier
///
/// # Errors
///
/// `ResolverError::Input` for a line whose model code is empty.
pub fn parse_batch_items(content: &str) -> Result<Vec<BatchItem>, ResolverError> {
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut header_checked = false;

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split(',').map(|field| field.trim().trim_matches('"').trim());
        let code = fields.next().unwrap_or_default();

        if !header_checked {
            header_checked = true;
            if code.eq_ignore_ascii_case("model_code") {
                continue;
            }
        }

        let identifier = Identifier::parse(code).ok_or_else(|| ResolverError::Input {
            line: index + 1,
            message: "empty model code".to_string(),
        })?;

        if !seen.insert(identifier.clone()) {
            tracing::debug!("Skipping duplicate {} on line {}", identifier, index + 1);
            continue;
        }

        let mut item = BatchItem::new(identifier);
        if let Some(manufacturer) = fields.next() {
            item = item.with_manufacturer(manufacturer);
        }
        items.push(item);
    }

    Ok(items)
}
