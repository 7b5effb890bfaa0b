pub mod client;
pub mod config;
pub mod course_page;
pub mod error;
pub mod oembed;
pub mod retry;
pub mod types;
pub mod urls;

#[cfg(test)]
mod test_server;

use std::future::Future;

pub use client::Service;
pub use config::ServiceConfig;
pub use error::{AcquireError, Result};
pub use retry::RetryPolicy;
pub use types::*;
pub use urls::{check_course_url, course_id_from_url};

/// Where course data comes from.
///
/// [`Service`] talks to Memrise; loaders are generic over this so they can
/// be driven by canned payloads.
pub trait CourseSource: Send + Sync {
    fn load_course_data(&self, course_id: u64) -> impl Future<Output = Result<CourseData>> + Send;

    fn load_level_data(
        &self,
        course_id: u64,
        level_index: u32,
    ) -> impl Future<Output = Result<LevelPayload>> + Send;

    /// Resolve a media reference from a payload to an absolute URL.
    fn to_absolute_media_url(&self, url: &str) -> String;

    /// Download `url` and return the name to reference it by.
    fn download_media(
        &self,
        url: &str,
        skip_existing: bool,
    ) -> impl Future<Output = Result<String>> + Send;
}

impl CourseSource for Service {
    fn load_course_data(&self, course_id: u64) -> impl Future<Output = Result<CourseData>> + Send {
        Service::load_course_data(self, course_id)
    }

    fn load_level_data(
        &self,
        course_id: u64,
        level_index: u32,
    ) -> impl Future<Output = Result<LevelPayload>> + Send {
        Service::load_level_data(self, course_id, level_index)
    }

    fn to_absolute_media_url(&self, url: &str) -> String {
        Service::to_absolute_media_url(self, url)
    }

    fn download_media(
        &self,
        url: &str,
        skip_existing: bool,
    ) -> impl Future<Output = Result<String>> + Send {
        Service::download_media(self, url, skip_existing)
    }
}

impl<T: CourseSource> CourseSource for std::sync::Arc<T> {
    fn load_course_data(&self, course_id: u64) -> impl Future<Output = Result<CourseData>> + Send {
        (**self).load_course_data(course_id)
    }

    fn load_level_data(
        &self,
        course_id: u64,
        level_index: u32,
    ) -> impl Future<Output = Result<LevelPayload>> + Send {
        (**self).load_level_data(course_id, level_index)
    }

    fn to_absolute_media_url(&self, url: &str) -> String {
        (**self).to_absolute_media_url(url)
    }

    fn download_media(
        &self,
        url: &str,
        skip_existing: bool,
    ) -> impl Future<Output = Result<String>> + Send {
        (**self).download_media(url, skip_existing)
    }
}
