//! Name normalization and candidate matching
//!
//! Pure functions used by the resolver to turn raw model codes into
//! catalog-friendly names and to pick the best of several search hits:
//!
//! - `infer_brand`: ordered prefix/substring rules, first match wins
//! - `normalize_name`: per-brand rewrite tables
//! - `similarity` / `rank`: scoring of candidate display names
//! - `clean_device_name`: strips page-title noise from scraped names

mod brand;
mod clean;
mod matcher;
mod rewrite;

pub use brand::{infer_brand, Brand};
pub use clean::{clean_device_name, is_valid_device_name};
pub use matcher::{rank, similarity};
pub use rewrite::normalize_name;
