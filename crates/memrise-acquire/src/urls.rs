use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use uuid::Uuid;

use crate::error::{AcquireError, Result};

fn course_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https://community-courses\.memrise\.com/community/course/(\d+)/.+/")
            .expect("valid regex")
    })
}

/// Whether `url` looks like a community course page.
pub fn check_course_url(url: &str) -> bool {
    course_url_pattern().is_match(url.trim())
}

/// Extract the numeric course id from a course page URL.
///
/// Runs before any network activity so a typo fails fast.
pub fn course_id_from_url(url: &str) -> Result<u64> {
    course_url_pattern()
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse().ok())
        .ok_or_else(|| AcquireError::InvalidCourseUrl(url.to_string()))
}

/// Resolve a media path from a payload against the static asset host.
///
/// Legacy payloads carry `/static/xyz` for what lives at `<static>/xyz`,
/// so that prefix is reduced to `/` first. Absolute URLs pass through.
pub fn to_absolute_media_url(static_url: &str, url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    let path = url.strip_prefix("/static/").map_or_else(|| url.to_string(), |rest| format!("/{rest}"));

    match Url::parse(static_url).and_then(|base| base.join(&path)) {
        Ok(absolute) => absolute.to_string(),
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Could not resolve media URL");
            path
        }
    }
}

/// Deterministic local file name for a remote asset.
///
/// A name-based UUID of the URL plus the original extension, so repeated
/// runs map the same asset to the same file.
pub fn local_media_name(url: &str) -> String {
    let path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_else(|_| url.to_string());
    let extension = Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
    format!("{}{extension}", Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_id_from_url() {
        let url = "https://community-courses.memrise.com/community/course/1098515/spanish-vocab/";
        assert!(check_course_url(url));
        assert_eq!(course_id_from_url(url).unwrap(), 1098515);
        assert_eq!(course_id_from_url(&format!("  {url}garden/  ")).unwrap(), 1098515);
    }

    #[test]
    fn test_invalid_course_urls() {
        for url in [
            "",
            "https://www.memrise.com/course/1098515/spanish-vocab/",
            "https://community-courses.memrise.com/community/course/abc/spanish/",
            "https://community-courses.memrise.com/community/course/1098515/",
            "http://community-courses.memrise.com/community/course/1098515/spanish/",
        ] {
            assert!(!check_course_url(url), "{url}");
            let err = course_id_from_url(url).unwrap_err();
            assert!(matches!(err, AcquireError::InvalidCourseUrl(_)));
        }
    }

    #[test]
    fn test_absolute_media_url() {
        let host = "https://static.memrise.com/";
        assert_eq!(
            to_absolute_media_url(host, "/static/uploads/a.mp3"),
            "https://static.memrise.com/uploads/a.mp3"
        );
        assert_eq!(
            to_absolute_media_url(host, "uploads/things/images/b.jpg"),
            "https://static.memrise.com/uploads/things/images/b.jpg"
        );
        assert_eq!(
            to_absolute_media_url(host, "https://cdn.example.com/c.png"),
            "https://cdn.example.com/c.png"
        );
        assert_eq!(to_absolute_media_url(host, ""), "");
    }

    #[test]
    fn test_local_media_name_is_stable() {
        let url = "https://static.memrise.com/uploads/a.mp3?x=1";
        let first = local_media_name(url);
        assert_eq!(first, local_media_name(url));
        assert!(first.ends_with(".mp3"));
        assert_eq!(first.len(), 36 + 4);
        assert_ne!(first, local_media_name("https://static.memrise.com/uploads/b.mp3"));
    }

    #[test]
    fn test_local_media_name_without_extension() {
        let name = local_media_name("https://static.memrise.com/uploads/noext");
        assert_eq!(name.len(), 36);
    }
}
