//! Derived local paths for mirrored resources.
//!
//! The derived path is a pure function of the URL. The existence check in
//! the resource store is only a coherent cache as long as that holds.

use crate::core::{ReplayError, Result};
use reqwest::Url;

/// Derives the mirror-relative path for a resource URL.
pub fn derive_resource_path(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| ReplayError::ResourceFetch {
        resource: url.to_string(),
        status: None,
        body: format!("invalid resource URL: {e}"),
    })?;

    let derived = canonicalize_resource_path(parsed.path());
    if derived.is_empty() {
        return Err(ReplayError::ResourceFetch {
            resource: url.to_string(),
            status: None,
            body: "resource URL has no path".to_string(),
        });
    }
    Ok(derived)
}

/// Lower-cases a URL path, drops a leading `resources/` segment and
/// replaces every `..` segment with `...`.
///
/// Empty segments are dropped so the result is always relative.
pub fn canonicalize_resource_path(path: &str) -> String {
    let lowered = path.to_lowercase();
    let trimmed = lowered.strip_prefix('/').unwrap_or(&lowered);
    let trimmed = trimmed.strip_prefix("resources/").unwrap_or(trimmed);

    trimmed
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| if segment == ".." { "..." } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_resources_prefix_and_lowercases() {
        assert_eq!(
            derive_resource_path("https://api.lp1.av5ja.srv.nintendo.net/resources/prod/v2/Weapon/Image.png?x=1")
                .unwrap(),
            "prod/v2/weapon/image.png"
        );
        assert_eq!(canonicalize_resource_path("/ui/A.PNG"), "ui/a.png");
    }

    #[test]
    fn only_a_leading_resources_segment_is_stripped() {
        assert_eq!(
            canonicalize_resource_path("/a/resources/b.png"),
            "a/resources/b.png"
        );
        assert_eq!(
            canonicalize_resource_path("/resources/resources/b.png"),
            "resources/b.png"
        );
    }

    #[test]
    fn parent_segments_are_defused() {
        assert_eq!(
            canonicalize_resource_path("/resources/.../../../etc/passwd"),
            ".../.../.../etc/passwd"
        );
        assert_eq!(canonicalize_resource_path("/../x"), ".../x");
        assert_eq!(canonicalize_resource_path("/a/.."), "a/...");
        assert_eq!(canonicalize_resource_path("/a..b/c"), "a..b/c");
    }

    #[test]
    fn url_paths_never_escape_the_mirror_root() {
        for url in [
            "https://api.lp1.av5ja.srv.nintendo.net/resources/../../etc/passwd",
            "https://api.lp1.av5ja.srv.nintendo.net/resources/%2e%2e/%2E%2E/etc/passwd",
            "https://api.lp1.av5ja.srv.nintendo.net//etc/passwd",
        ] {
            let derived = derive_resource_path(url).unwrap();
            assert!(!derived.starts_with('/'), "{url} -> {derived}");
            assert!(
                derived.split('/').all(|segment| segment != ".."),
                "{url} -> {derived}"
            );
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let url = "https://api.lp1.av5ja.srv.nintendo.net/resources/Prod/a.png";
        assert_eq!(
            derive_resource_path(url).unwrap(),
            derive_resource_path(url).unwrap()
        );
    }

    #[test]
    fn root_url_has_no_resource_path() {
        assert!(matches!(
            derive_resource_path("https://api.lp1.av5ja.srv.nintendo.net/"),
            Err(ReplayError::ResourceFetch { .. })
        ));
    }
}
