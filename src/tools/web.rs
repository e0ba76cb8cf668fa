//! Web search capability backed by the DuckDuckGo HTML endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use super::{html_decode, required_str, Tool, ToolOutcome};

const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";
const DEFAULT_MAX_RESULTS: usize = 10;

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebResult {
    pub rank: usize,
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Search the web for a keyword.
pub struct WebSearch {
    region: String,
    max_results: usize,
    timeout: Duration,
}

impl WebSearch {
    pub fn new(region: impl Into<String>, timeout: Duration) -> Self {
        Self {
            region: region.into(),
            max_results: DEFAULT_MAX_RESULTS,
            timeout,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    async fn search(&self, keyword: &str) -> anyhow::Result<Vec<WebResult>> {
        let url = format!(
            "{}?q={}&kl={}",
            DDG_HTML_URL,
            urlencoding::encode(keyword),
            urlencoding::encode(&self.region)
        );

        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; HandoffRouter/0.1)")
            .timeout(self.timeout)
            .build()?;

        let response = client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Web search returned HTTP {}", status));
        }

        let html = response.text().await?;
        Ok(extract_ddg_results(&html, self.max_results))
    }
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        "search_web"
    }

    fn description(&self) -> &str {
        "Search the web for a keyword. Returns an ordered list of results with title, url and snippet."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "Keyword or phrase to search for"
                }
            },
            "required": ["keyword"]
        })
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        let result = async {
            let keyword = required_str(&args, "keyword")?;
            tracing::info!(keyword, region = %self.region, "Searching the web");
            let results = self.search(keyword).await?;
            tracing::debug!(count = results.len(), "Web search finished");
            Ok::<Value, anyhow::Error>(serde_json::to_value(results)?)
        }
        .await;

        if let Err(e) = &result {
            tracing::warn!("Web search failed: {:#}", e);
        }
        ToolOutcome::from_result(result)
    }
}

/// Extract search results from DuckDuckGo HTML.
fn extract_ddg_results(html: &str, max_results: usize) -> Vec<WebResult> {
    let mut results = Vec::new();

    for chunk in html.split("result__body").skip(1) {
        if results.len() >= max_results {
            break;
        }

        let Some(anchor) = chunk.split("class=\"result__a\"").nth(1) else {
            continue;
        };

        let href = anchor
            .split('>')
            .next()
            .and_then(|attrs| attrs.split("href=\"").nth(1))
            .and_then(|s| s.split('"').next())
            .unwrap_or("");

        let title = anchor
            .split_once('>')
            .and_then(|(_, rest)| rest.split("</a>").next())
            .map(strip_tags)
            .unwrap_or_default();

        let snippet = chunk
            .split("class=\"result__snippet\"")
            .nth(1)
            .and_then(|s| s.split_once('>'))
            .and_then(|(_, rest)| rest.split("</a>").next())
            .map(strip_tags)
            .unwrap_or_default();

        if title.is_empty() {
            continue;
        }

        results.push(WebResult {
            rank: results.len() + 1,
            title: html_decode(&title),
            url: resolve_href(&html_decode(href)),
            snippet: html_decode(&snippet),
        });
    }

    results
}

/// DuckDuckGo wraps targets in a redirect (`//duckduckgo.com/l/?uddg=<url>`).
fn resolve_href(href: &str) -> String {
    if let Some(target) = href
        .split("uddg=")
        .nth(1)
        .and_then(|s| s.split('&').next())
    {
        if let Ok(decoded) = urlencoding::decode(target) {
            return decoded.into_owned();
        }
    }

    if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        href.to_string()
    }
}

fn strip_tags(fragment: &str) -> String {
    let mut text = String::new();
    let mut in_tag = false;

    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
<div class="result results_links results_links_deep web-result">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.jp%2Fmiyazaki%2Dgourmet&amp;rut=abc">Miyazaki <b>Gourmet</b> Guide</a>
    </h2>
    <a class="result__url" href="//duckduckgo.com/l/?uddg=x">example.jp/miyazaki-gourmet</a>
    <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">Chicken nanban &amp; more in <b>Miyazaki</b>.</a>
  </div>
</div>
<div class="result results_links results_links_deep web-result">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://ramen.example.com/">Ramen &quot;Top 10&quot;</a>
    </h2>
    <a class="result__snippet" href="https://ramen.example.com/">Best bowls</a>
  </div>
</div>
"#;

    #[test]
    fn extracts_title_url_and_snippet() {
        let results = extract_ddg_results(SAMPLE, 10);
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].title, "Miyazaki Gourmet Guide");
        assert_eq!(results[0].url, "https://example.jp/miyazaki-gourmet");
        assert_eq!(results[0].snippet, "Chicken nanban & more in Miyazaki.");

        assert_eq!(results[1].rank, 2);
        assert_eq!(results[1].title, "Ramen \"Top 10\"");
        assert_eq!(results[1].url, "https://ramen.example.com/");
    }

    #[test]
    fn respects_max_results() {
        let results = extract_ddg_results(SAMPLE, 1);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn no_results_in_unrelated_html() {
        assert!(extract_ddg_results("<html><body>nothing</body></html>", 10).is_empty());
    }

    #[test]
    fn protocol_relative_href_gets_https() {
        assert_eq!(resolve_href("//example.com/a"), "https://example.com/a");
    }

    #[tokio::test]
    async fn missing_keyword_is_a_failure_value() {
        let tool = WebSearch::new("jp-jp", Duration::from_secs(1));
        let outcome = tool.execute(json!({})).await;
        assert_eq!(outcome, ToolOutcome::failure("Missing 'keyword' argument"));
    }
}
