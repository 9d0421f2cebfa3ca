//! Page image naming contract shared with the rendering service.
//!
//! Rendered images are named `<base>_p<N>.<ext>` where `N` is the 1-based
//! page number. Anything else is rejected.

use once_cell::sync::Lazy;
use regex::Regex;

static PAGE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_p(\d+)\.[A-Za-z0-9]+$").expect("valid page suffix pattern"));

/// Extracts the page number from a rendered image filename
pub fn parse_page_number(filename: &str) -> Option<u32> {
    let captures = PAGE_SUFFIX.captures(filename)?;
    let number: u32 = captures.get(1)?.as_str().parse().ok()?;

    (number > 0).then_some(number)
}

/// Builds the image filename for a page
pub fn page_file_name(base: &str, page_number: u32, extension: &str) -> String {
    format!("{}_p{}.{}", base, page_number, extension)
}

/// Filename without its last extension
pub fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}
