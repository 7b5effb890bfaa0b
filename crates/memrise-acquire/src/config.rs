use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://community-courses.memrise.com";
pub const DEFAULT_API_VERSION: &str = "v1.23";
pub const DEFAULT_STATIC_URL: &str = "https://static.memrise.com/";
pub const DEFAULT_OEMBED_URL: &str = "https://noembed.com/embed";
pub const DEFAULT_USER_AGENT: &str = "memrise-import/0.1 (course importer)";

/// Where and how the client talks to Memrise.
///
/// Every endpoint is derived from `base_url`, so a test can point the whole
/// client at a local responder.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_version: String,
    pub static_url: String,
    /// oEmbed provider used to turn video links into embeddable HTML.
    pub oembed_url: String,
    pub user_agent: String,
    /// Directory media files are saved to. Without one, downloads are
    /// skipped and remote URLs are kept.
    pub download_dir: Option<PathBuf>,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            static_url: DEFAULT_STATIC_URL.to_string(),
            oembed_url: DEFAULT_OEMBED_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            download_dir: None,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ServiceConfig {
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn api(&self, path: &str) -> String {
        format!("{}/{}/{path}", self.base(), self.api_version)
    }

    pub fn signin_url(&self) -> String {
        format!("{}/signin", self.base())
    }

    pub fn access_token_url(&self) -> String {
        self.api("auth/access_token/")
    }

    pub fn web_session_url(&self) -> String {
        self.api("auth/web/")
    }

    pub fn me_url(&self) -> String {
        self.api("me/")
    }

    pub fn html_course_url(&self, course_id: u64) -> String {
        format!("{}/community/course/{course_id}/", self.base())
    }

    pub fn html_level_url(&self, course_id: u64, level_index: u32) -> String {
        format!(
            "{}/aprender/preview?course_id={course_id}&level_index={level_index}",
            self.base()
        )
    }

    pub fn json_level_url(&self) -> String {
        self.api("learning_sessions/preview/")
    }
}
