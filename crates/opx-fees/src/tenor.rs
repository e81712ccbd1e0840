//! Tenor extraction from venue display names.
//!
//! Repo instruments usually embed the loan duration in the display name
//! (`"USD CAUCION 7D"`, `"caucion 1d"`). When the venue omits the explicit
//! tenor field, this parser is the fallback.

use std::sync::LazyLock;

use regex::Regex;

static TENOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d+)\s*[dD]\b").expect("tenor pattern is valid"));

/// Parse the tenor in days from a display name.
///
/// Returns `0` when no `<N>D` token is present — callers treat any
/// non-positive tenor as unresolvable.
pub fn parse_tenor_days(display_name: &str) -> i64 {
    TENOR_RE
        .captures(display_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}
