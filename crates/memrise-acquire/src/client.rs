use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{CONNECTION, REFERER};
use reqwest::{StatusCode, Url, Version};
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::config::ServiceConfig;
use crate::course_page::{parse_course_page, parse_oauth_client_id};
use crate::error::{AcquireError, Result};
use crate::retry::{classify_error, RetryDecision};
use crate::types::{CourseData, LevelPayload};
use crate::urls::{local_media_name, to_absolute_media_url};

/// Authenticated session against Memrise.
///
/// Cookies from login persist in a shared jar for every later request.
/// Transport failures are retried according to the configured policy.
pub struct Service {
    config: ServiceConfig,
    client: reqwest::Client,
    /// Same jar, no pooling: used for HTTP/1.0 retries after a truncated body.
    fallback_client: reqwest::Client,
    cookies: Arc<Jar>,
}

/// A fully read response.
pub(crate) struct Fetched {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self, url: &str) -> Result<Value> {
        serde_json::from_slice(&self.body).map_err(|source| AcquireError::Payload {
            url: url.to_string(),
            source,
        })
    }

    fn ensure_success(self, url: &str) -> Result<Self> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(AcquireError::Http {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// Outcome of a single attempt inside the retry loop.
pub(crate) enum AttemptError {
    /// Classified and possibly retried.
    Transport(reqwest::Error),
    /// Returned as is.
    Fatal(AcquireError),
}

impl From<reqwest::Error> for AttemptError {
    fn from(error: reqwest::Error) -> Self {
        AttemptError::Transport(error)
    }
}

impl Service {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        Self::with_cookie_jar(config, Arc::new(Jar::default()))
    }

    /// Build a client around an existing jar, e.g. one shared with a
    /// previous session.
    pub fn with_cookie_jar(config: ServiceConfig, cookies: Arc<Jar>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .cookie_provider(cookies.clone())
            .timeout(config.timeout)
            .build()
            .map_err(AcquireError::Client)?;

        let fallback_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .cookie_provider(cookies.clone())
            .timeout(config.timeout)
            .http1_only()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(AcquireError::Client)?;

        Ok(Self {
            config,
            client,
            fallback_client,
            cookies,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.cookies.clone()
    }

    /// Value of a session cookie for the service host.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let url = Url::parse(&self.config.base_url).ok()?;
        let header = self.cookies.cookies(&url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    /// Whether the session cookies belong to a signed-in user.
    ///
    /// Any failure counts as signed out.
    pub async fn is_logged_in(&self) -> bool {
        let url = self.config.me_url();
        let referer = format!("{}/app", self.config.base_url.trim_end_matches('/'));
        match self.fetch(&url, |c| c.get(&url).header(REFERER, &referer)).await {
            Ok(response) => response.status == StatusCode::OK,
            Err(e) => {
                tracing::debug!(error = %e, "Session check failed");
                false
            }
        }
    }

    /// Sign in with a username and password.
    ///
    /// Returns whether the service accepted the credentials. Network and
    /// payload errors are logged and reported as a failed login.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        match self.try_login(username, password).await {
            Ok(true) => {
                tracing::info!(username = %username, "Logged in");
                true
            }
            Ok(false) => {
                tracing::warn!(username = %username, "Login rejected");
                false
            }
            Err(e) => {
                tracing::warn!(username = %username, error = %e, "Login failed");
                false
            }
        }
    }

    async fn try_login(&self, username: &str, password: &str) -> Result<bool> {
        let signin_url = self.config.signin_url();
        let signin = self
            .fetch(&signin_url, |c| c.get(&signin_url))
            .await?
            .ensure_success(&signin_url)?;
        let Some(client_id) = parse_oauth_client_id(&signin.text()) else {
            tracing::warn!(url = %signin_url, "No OAuth client id on sign-in page");
            return Ok(false);
        };

        let token_url = self.config.access_token_url();
        let credentials = json!({
            "username": username,
            "password": password,
            "client_id": client_id,
            "grant_type": "password",
        });
        let token_response = self
            .fetch(&token_url, |c| {
                c.post(&token_url).header(REFERER, &signin_url).json(&credentials)
            })
            .await?;
        if !token_response.status.is_success() {
            tracing::debug!(status = %token_response.status, "Access token refused");
            return Ok(false);
        }
        let token_json = token_response.json(&token_url)?;
        let Some(token) = token_json
            .pointer("/access_token/access_token")
            .and_then(Value::as_str)
        else {
            return Ok(false);
        };

        let web_url = self.config.web_session_url();
        let activation = self
            .fetch(&web_url, |c| {
                c.get(&web_url)
                    .query(&[("invalidate_token_after", "true"), ("token", token)])
            })
            .await?
            .ensure_success(&web_url)?;
        let result = activation.json(&web_url)?;
        Ok(result.get("success").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Scrape the course landing page.
    pub async fn load_course_data(&self, course_id: u64) -> Result<CourseData> {
        let url = self.config.html_course_url(course_id);
        tracing::info!(url = %url, "Fetching course page");
        let page = self.fetch(&url, |c| c.get(&url)).await?.ensure_success(&url)?;
        let html = page.text();
        tracing::debug!(bytes = html.len(), "Received HTML");
        parse_course_page(&html, &url)
    }

    /// Fetch one level from the learning-session endpoint.
    ///
    /// A 400 or 404 status, or an error `code` in the body, means the level
    /// does not exist. Deleted levels leave such holes in a course.
    pub async fn load_level_data(&self, course_id: u64, level_index: u32) -> Result<LevelPayload> {
        let url = self.config.json_level_url();
        let referer = self.config.html_level_url(course_id, level_index);
        let body = json!({
            "session_source_id": course_id,
            "session_source_type": "course_id_and_level_index",
            "session_source_sub_index": level_index,
        });
        let csrf = self.cookie("csrftoken");

        tracing::debug!(course_id, level = level_index, "Fetching level");
        let response = self
            .fetch(&url, |c| {
                let request = c.post(&url).header(REFERER, &referer).json(&body);
                match &csrf {
                    Some(token) => request.header("X-CSRFToken", token),
                    None => request,
                }
            })
            .await?;

        if matches!(response.status, StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND) {
            return Err(AcquireError::LevelNotFound { level: level_index });
        }
        let response = response.ensure_success(&url)?;
        let value = response.json(&url)?;
        if value.get("code").is_some_and(|code| !code.is_null()) {
            return Err(AcquireError::LevelNotFound { level: level_index });
        }
        serde_json::from_value(value).map_err(|source| AcquireError::Payload { url, source })
    }

    pub fn to_absolute_media_url(&self, url: &str) -> String {
        to_absolute_media_url(&self.config.static_url, url)
    }

    /// Save a remote asset into the download directory.
    ///
    /// Returns the local file name, or the URL unchanged when no download
    /// directory is configured. The file is written to a temporary sibling
    /// and moved into place, so an interrupted download never leaves a
    /// partial file under the final name.
    pub async fn download_media(&self, url: &str, skip_existing: bool) -> Result<String> {
        let Some(dir) = self.config.download_dir.clone() else {
            return Ok(url.to_string());
        };
        let name = local_media_name(url);
        let target = dir.join(&name);

        if skip_existing && is_non_empty_file(&target).await {
            tracing::debug!(url = %url, file = %name, "Media already downloaded");
            return Ok(name);
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| AcquireError::Io {
                path: dir.clone(),
                source,
            })?;

        self.with_retry(url, |client, fallback| {
            let request = fallback_request(client.get(url), fallback);
            let url = url.to_string();
            let dir = dir.clone();
            let target = target.clone();
            async move {
                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AttemptError::Fatal(AcquireError::Http { url, status }));
                }
                write_body(response, &dir, &target).await
            }
        })
        .await?;

        tracing::debug!(url = %url, file = %name, "Downloaded media");
        Ok(name)
    }

    /// Send a request built by `make` and read the whole body.
    pub(crate) async fn fetch<F>(&self, url: &str, make: F) -> Result<Fetched>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        self.with_retry(url, |client, fallback| {
            let request = fallback_request(make(&client), fallback);
            async move {
                let response = request.send().await?;
                let status = response.status();
                let body = response.bytes().await?;
                Ok::<_, AttemptError>(Fetched {
                    status,
                    body: body.to_vec(),
                })
            }
        })
        .await
    }

    /// Run `attempt` until it succeeds, fails fatally or the policy runs out.
    ///
    /// `attempt` receives the client to use and whether this is an HTTP/1.0
    /// fallback attempt.
    pub(crate) async fn with_retry<T, F, Fut>(&self, url: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut(reqwest::Client, bool) -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let policy = self.config.retry;
        let mut fallback = false;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let client = if fallback {
                self.fallback_client.clone()
            } else {
                self.client.clone()
            };

            let error = match attempt(client, fallback).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Transport(e)) => e,
            };

            let decision = classify_error(&error);
            if decision == RetryDecision::Fail || !policy.allows_another(attempts) {
                return Err(AcquireError::Network {
                    url: url.to_string(),
                    attempts,
                    source: error,
                });
            }

            if decision == RetryDecision::RetryWithFallback {
                fallback = true;
            }
            tracing::warn!(
                url = %url,
                attempt = attempts,
                http10 = fallback,
                error = %error,
                "Request failed, retrying"
            );
            tokio::time::sleep(policy.delay(attempts)).await;
        }
    }
}

fn fallback_request(request: reqwest::RequestBuilder, fallback: bool) -> reqwest::RequestBuilder {
    if fallback {
        request.version(Version::HTTP_10).header(CONNECTION, "close")
    } else {
        request
    }
}

async fn is_non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

/// Stream a response body into a temporary file in `dir`, then move it to
/// `target`.
async fn write_body(
    mut response: reqwest::Response,
    dir: &Path,
    target: &Path,
) -> std::result::Result<(), AttemptError> {
    let temp_dir = dir.to_path_buf();
    let temp = blocking(dir, move || NamedTempFile::new_in(temp_dir)).await?;
    let (file, temp_path) = temp.into_parts();

    let mut file = tokio::fs::File::from_std(file);
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|source| io_error(&temp_path, source))?;
    }
    file.flush().await.map_err(|source| io_error(&temp_path, source))?;
    drop(file);

    let destination = target.to_path_buf();
    blocking(target, move || {
        temp_path.persist(&destination).map_err(|e| e.error)
    })
    .await
}

async fn blocking<T, F>(path: &Path, task: F) -> std::result::Result<T, AttemptError>
where
    F: FnOnce() -> std::io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(std::io::Error::other)
        .and_then(|result| result)
        .map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> AttemptError {
    AttemptError::Fatal(AcquireError::Io {
        path: PathBuf::from(path),
        source,
    })
}
