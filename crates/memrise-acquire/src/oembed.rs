use serde_json::Value;

use crate::client::Service;
use crate::error::Result;

/// Embeddable HTML from an oEmbed response, if the provider knew the URL.
pub fn parse_embed_response(response: &Value) -> Option<String> {
    if response.get("error").is_some() {
        return None;
    }
    response.get("html").and_then(Value::as_str).map(str::to_string)
}

impl Service {
    /// Resolve a video link to embeddable HTML through the oEmbed provider.
    pub async fn load_embed_code(&self, url: &str) -> Result<Option<String>> {
        let endpoint = self.config().oembed_url.clone();
        let response = self
            .fetch(&endpoint, |c| c.post(&endpoint).form(&[("url", url)]))
            .await?;
        let value = response.json(&endpoint)?;
        let html = parse_embed_response(&value);
        if html.is_none() {
            tracing::debug!(url = %url, "No embed code available");
        }
        Ok(html)
    }
}
