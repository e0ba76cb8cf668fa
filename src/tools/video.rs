//! Video search capability backed by the YouTube Data API v3.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{html_decode, required_str, Tool, ToolOutcome};

const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const API_KEY_HEADER: &str = "x-goog-api-key";
const WATCH_URL: &str = "https://www.youtube.com/watch";
const DEFAULT_MAX_RESULTS: usize = 10;

/// One video search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoResult {
    pub rank: usize,
    pub title: String,
    pub description: String,
    pub channel: String,
    pub published_at: String,
    pub url: String,
}

/// Search a video platform for a query.
pub struct VideoSearch {
    api_key: Option<String>,
    max_results: usize,
    timeout: Duration,
}

impl VideoSearch {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            api_key,
            max_results: DEFAULT_MAX_RESULTS,
            timeout,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        // The API caps maxResults at 50.
        self.max_results = max_results.clamp(1, 50);
        self
    }

    async fn search(&self, query: &str) -> anyhow::Result<Vec<VideoResult>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("YouTube API key is not configured"))?;

        let max_results = self.max_results.to_string();
        let url = url::Url::parse_with_params(
            YOUTUBE_SEARCH_URL,
            &[
                ("part", "snippet"),
                ("type", "video"),
                ("q", query),
                ("maxResults", max_results.as_str()),
            ],
        )?;

        // The key travels in a header and errors drop the URL, so failure
        // values never carry the credential.
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let response = client
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        let status = response.status();
        let body = response.text().await.map_err(reqwest::Error::without_url)?;

        if !status.is_success() {
            let reason = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(anyhow::anyhow!("YouTube search failed: {}", reason));
        }

        let parsed: SearchListResponse = serde_json::from_str(&body)
            .map_err(|e| anyhow::anyhow!("Malformed YouTube response: {}", e))?;
        Ok(collect_results(parsed))
    }
}

#[async_trait]
impl Tool for VideoSearch {
    fn name(&self) -> &str {
        "search_youtube_videos"
    }

    fn description(&self) -> &str {
        "Search YouTube for videos matching a query. Returns an ordered list of videos with title, description, channel, publish time and url."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let result = async {
            let query = required_str(&args, "query")?;
            tracing::info!(query, "Searching videos");
            let results = self.search(query).await?;
            tracing::debug!(count = results.len(), "Video search finished");
            Ok::<Value, anyhow::Error>(serde_json::to_value(results)?)
        }
        .await;

        if let Err(e) = &result {
            tracing::warn!("Video search failed: {:#}", e);
        }
        ToolOutcome::from_result(result)
    }
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    published_at: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn collect_results(response: SearchListResponse) -> Vec<VideoResult> {
    response
        .items
        .into_iter()
        .filter_map(|item| {
            let video_id = item.id.video_id?;
            Some((video_id, item.snippet))
        })
        .enumerate()
        .map(|(i, (video_id, snippet))| VideoResult {
            rank: i + 1,
            title: html_decode(&snippet.title),
            description: html_decode(&snippet.description),
            channel: html_decode(&snippet.channel_title),
            published_at: snippet.published_at,
            url: format!("{}?v={}", WATCH_URL, video_id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_videos_and_skips_non_video_items() {
        let raw = r#"{
            "kind": "youtube#searchListResponse",
            "items": [
                {
                    "id": {"kind": "youtube#video", "videoId": "abc123"},
                    "snippet": {
                        "publishedAt": "2024-05-01T09:00:00Z",
                        "title": "Miyazaki &#39;Chicken Nanban&#39;",
                        "description": "Food tour",
                        "channelTitle": "Kyushu Eats"
                    }
                },
                {
                    "id": {"kind": "youtube#channel", "channelId": "UCxyz"},
                    "snippet": {"title": "A channel"}
                },
                {
                    "id": {"kind": "youtube#video", "videoId": "def456"},
                    "snippet": {"title": "Second", "channelTitle": "Other"}
                }
            ]
        }"#;

        let parsed: SearchListResponse = serde_json::from_str(raw).expect("parse");
        let results = collect_results(parsed);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].title, "Miyazaki 'Chicken Nanban'");
        assert_eq!(results[0].channel, "Kyushu Eats");
        assert_eq!(results[0].published_at, "2024-05-01T09:00:00Z");
        assert_eq!(results[0].url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(results[1].rank, 2);
        assert_eq!(results[1].description, "");
    }

    #[test]
    fn empty_response_has_no_results() {
        let parsed: SearchListResponse = serde_json::from_str("{}").expect("parse");
        assert!(collect_results(parsed).is_empty());
    }

    #[tokio::test]
    async fn missing_api_key_is_a_failure_value() {
        let tool = VideoSearch::new(None, Duration::from_secs(1));
        let outcome = tool.execute(json!({"query": "ramen"})).await;
        assert_eq!(
            outcome,
            ToolOutcome::failure("YouTube API key is not configured")
        );
    }

    #[tokio::test]
    async fn failed_request_does_not_leak_api_key() {
        let tool = VideoSearch::new(Some("SECRET_KEY_123".to_string()), Duration::from_millis(1));
        let outcome = tool.execute(json!({"query": "ramen"})).await;

        assert!(outcome.is_failure());
        let content = outcome.to_content();
        assert!(!content.contains("SECRET_KEY_123"), "key leaked: {}", content);
    }

    #[test]
    fn max_results_is_clamped() {
        let tool = VideoSearch::new(None, Duration::from_secs(1)).with_max_results(500);
        assert_eq!(tool.max_results, 50);
    }
}
