//! Path handling ahead of route lookup.

use wdrelay_protocol::routes::normalise_path;

/// Tracing target for dispatch decisions.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Removes `base` from the front of `path`.
///
/// The base only matches on a segment boundary; a path outside the base is
/// returned normalised but otherwise unchanged.
pub(crate) fn strip_base_path<'a>(path: &'a str, base: &str) -> &'a str {
    let path = normalise_path(path);
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return path;
    }
    match path.strip_prefix(base) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Session id named by a `/session/:id/...` path.
pub(crate) fn path_session_id(path: &str) -> Option<&str> {
    let mut segments = path.split('/').filter(|segment| !segment.is_empty());
    segments
        .by_ref()
        .find(|segment| *segment == "session")
        .and_then(|_| segments.next())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::base_stripped("/wd/hub/session/abc/url", "/wd/hub", "/session/abc/url")]
    #[case::base_only("/wd/hub", "/wd/hub", "/")]
    #[case::trailing_slash_base("/wd/hub/status", "/wd/hub/", "/status")]
    #[case::partial_segment("/wd/hubble/status", "/wd/hub", "/wd/hubble/status")]
    #[case::no_base("/status?x=1", "", "/status")]
    #[case::outside_base("/session", "/wd/hub", "/session")]
    fn base_path_stripping(#[case] path: &str, #[case] base: &str, #[case] expected: &str) {
        assert_eq!(strip_base_path(path, base), expected);
    }

    #[rstest]
    #[case::session_command("/session/abc/url", Some("abc"))]
    #[case::bare_session("/session", None)]
    #[case::sessions_list("/sessions", None)]
    #[case::with_base("/wd/hub/session/xyz", Some("xyz"))]
    fn session_id_from_path(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(path_session_id(path), expected);
    }
}
