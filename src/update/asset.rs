use crate::update::error::UpdateResult;
use crate::update::release::{Asset, Release};
use regex::Regex;

/// Compiles `pattern` so that it only matches at the start of a name, the
/// way a match (rather than a full-match) works: trailing text is allowed.
pub fn compile_pattern(pattern: &str) -> UpdateResult<Regex> {
    Ok(Regex::new(&format!("^(?:{pattern})"))?)
}

/// First asset of `release`, in order, whose name matches `pattern`.
pub fn resolve_asset<'a>(release: &'a Release, pattern: &Regex) -> Option<&'a Asset> {
    release
        .assets
        .iter()
        .find(|asset| pattern.is_match(&asset.name))
}
