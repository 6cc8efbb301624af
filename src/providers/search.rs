use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub engine: String,
    pub location: String,
    pub device: String,
    pub count: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            engine: "google".to_string(),
            location: "United States".to_string(),
            device: "desktop".to_string(),
            count: 10,
        }
    }
}

impl SearchOptions {
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>>;
}

/// Interest-over-time series, one value per queried keyword at each point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendTimeline {
    pub points: Vec<Vec<Value>>,
}

impl TrendTimeline {
    /// Value for the keyword at `index` in the most recent point.
    pub fn latest_value(&self, index: usize) -> Option<&Value> {
        self.points.last().and_then(|values| values.get(index))
    }
}

/// Autocomplete and trends lookups backing keyword research.
#[async_trait]
pub trait KeywordSource: Send + Sync {
    async fn autocomplete(&self, query: &str) -> Result<Vec<String>>;

    /// `None` when the trends service has no interest-over-time data.
    async fn trends(&self, queries: &[String]) -> Result<Option<TrendTimeline>>;
}

const SERPER_ENDPOINT: &str = "https://google.serper.dev/search";

/// serper.dev Google search.
#[derive(Debug, Clone)]
pub struct SerperSearchProvider {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

impl SerperSearchProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: SERPER_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchProvider for SerperSearchProvider {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "q": query, "num": options.count }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("Serper API error {}: {}", status, body);
        }

        let result: SerperResponse = response.json().await?;

        Ok(result
            .organic
            .into_iter()
            .take(options.count)
            .map(|r| SearchResult {
                title: r.title,
                url: r.link,
                snippet: r.snippet,
            })
            .collect())
    }
}

const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";

/// serpapi.com: organic search across engines, Google autocomplete and Google Trends.
#[derive(Debug, Clone)]
pub struct SerpApiClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SerpApiSearchResponse {
    #[serde(default)]
    organic_results: Vec<SerpApiOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerpApiOrganic {
    #[serde(default)]
    title: String,
    link: Option<String>,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct SerpApiAutocomplete {
    #[serde(default)]
    suggestions: Vec<SerpApiSuggestion>,
}

#[derive(Debug, Deserialize)]
struct SerpApiSuggestion {
    value: String,
}

#[derive(Debug, Deserialize)]
struct SerpApiTrends {
    interest_over_time: Option<SerpApiInterest>,
}

#[derive(Debug, Deserialize)]
struct SerpApiInterest {
    #[serde(default)]
    timeline_data: Vec<SerpApiTimelinePoint>,
}

#[derive(Debug, Deserialize)]
struct SerpApiTimelinePoint {
    #[serde(default)]
    values: Vec<SerpApiTrendValue>,
}

#[derive(Debug, Deserialize)]
struct SerpApiTrendValue {
    #[serde(default)]
    value: Value,
}

impl SerpApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: SERPAPI_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("SerpApi error {}: {}", status, body);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let result: SerpApiSearchResponse = self
            .get(&[
                ("engine", options.engine.as_str()),
                ("q", query),
                ("location", options.location.as_str()),
                ("device", options.device.as_str()),
            ])
            .await?;

        // The first `count` results are kept; those without a link are then dropped.
        Ok(result
            .organic_results
            .into_iter()
            .take(options.count)
            .filter_map(|r| {
                r.link.filter(|url| !url.is_empty()).map(|url| SearchResult {
                    title: r.title,
                    url,
                    snippet: r.snippet,
                })
            })
            .collect())
    }
}

#[async_trait]
impl KeywordSource for SerpApiClient {
    async fn autocomplete(&self, query: &str) -> Result<Vec<String>> {
        let result: SerpApiAutocomplete = self
            .get(&[("engine", "google_autocomplete"), ("q", query)])
            .await?;
        Ok(result.suggestions.into_iter().map(|s| s.value).collect())
    }

    async fn trends(&self, queries: &[String]) -> Result<Option<TrendTimeline>> {
        let joined = queries.join(", ");
        let result: SerpApiTrends = self
            .get(&[
                ("engine", "google_trends"),
                ("q", joined.as_str()),
                ("data_type", "TIMESERIES"),
            ])
            .await?;

        Ok(result.interest_over_time.map(|interest| TrendTimeline {
            points: interest
                .timeline_data
                .into_iter()
                .map(|point| point.values.into_iter().map(|v| v.value).collect())
                .collect(),
        }))
    }
}

pub struct MockSearchProvider;

impl Default for MockSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchResult>> {
        Ok((1..=options.count.min(10))
            .map(|i| SearchResult {
                title: format!("Mock Result {} for {}", i, query),
                url: format!("https://example.com/{}", i),
                snippet: "This is a mock search result".to_string(),
            })
            .collect())
    }
}

/// Fixed suggestions and trend data.
#[derive(Debug, Clone, Default)]
pub struct MockKeywordSource {
    pub suggestions: Vec<String>,
    pub timeline: Option<TrendTimeline>,
}

#[async_trait]
impl KeywordSource for MockKeywordSource {
    async fn autocomplete(&self, _query: &str) -> Result<Vec<String>> {
        Ok(self.suggestions.clone())
    }

    async fn trends(&self, _queries: &[String]) -> Result<Option<TrendTimeline>> {
        Ok(self.timeline.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_options_defaults() {
        let options = SearchOptions::default();
        assert_eq!(options.engine, "google");
        assert_eq!(options.location, "United States");
        assert_eq!(options.device, "desktop");
        assert_eq!(SearchOptions::with_count(5).count, 5);
    }

    #[test]
    fn test_serper_response_parsing() {
        let parsed: SerperResponse = serde_json::from_str(
            r#"{"organic":[{"title":"A","link":"https://a.dev","snippet":"s","position":1}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.organic[0].link, "https://a.dev");

        let empty: SerperResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.organic.is_empty());
    }

    #[test]
    fn test_serpapi_trends_parsing() {
        let parsed: SerpApiTrends = serde_json::from_str(
            r#"{"interest_over_time":{"timeline_data":[
                {"date":"a","values":[{"query":"x","value":"10","extracted_value":10}]},
                {"date":"b","values":[{"query":"x","value":"42","extracted_value":42}]}
            ]}}"#,
        )
        .unwrap();
        let interest = parsed.interest_over_time.unwrap();
        assert_eq!(interest.timeline_data.len(), 2);
        assert_eq!(interest.timeline_data[1].values[0].value, "42");
    }

    #[test]
    fn test_trend_timeline_latest_value() {
        let timeline = TrendTimeline {
            points: vec![
                vec![Value::from("1"), Value::from("2")],
                vec![Value::from("3"), Value::from("4")],
            ],
        };
        assert_eq!(timeline.latest_value(1), Some(&Value::from("4")));
        assert_eq!(timeline.latest_value(2), None);
        assert_eq!(TrendTimeline::default().latest_value(0), None);
    }

    #[tokio::test]
    async fn test_mock_search_respects_count() {
        let provider = MockSearchProvider::new();
        let results = provider
            .search("rust", &SearchOptions::with_count(3))
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].title.contains("rust"));
    }

    async fn spawn(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_serper_posts_query_with_key() {
        use axum::{http::HeaderMap, routing::post, Json};

        let app = axum::Router::new().route(
            "/search",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["x-api-key"], "serper-key");
                assert_eq!(body["num"], 5);
                Json(serde_json::json!({
                    "organic": [
                        {"title": "A", "link": "https://a.dev", "snippet": format!("about {}", body["q"])},
                        {"title": "B", "link": "https://b.dev"}
                    ]
                }))
            }),
        );
        let base = spawn(app).await;

        let provider = SerperSearchProvider::new("serper-key".to_string())
            .with_endpoint(format!("{}/search", base));
        let results = provider
            .search("rust", &SearchOptions::with_count(5))
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].snippet, "about \"rust\"");
        assert_eq!(results[1].snippet, "");
    }

    #[tokio::test]
    async fn test_serper_error_status_is_reported() {
        use axum::{http::StatusCode, routing::post};

        let app = axum::Router::new().route(
            "/search",
            post(|| async { (StatusCode::FORBIDDEN, "bad key") }),
        );
        let base = spawn(app).await;

        let provider =
            SerperSearchProvider::new("k".to_string()).with_endpoint(format!("{}/search", base));
        let err = provider
            .search("rust", &SearchOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("bad key"));
    }

    #[tokio::test]
    async fn test_serpapi_engines_against_local_endpoint() {
        use axum::{extract::Query, routing::get, Json};
        use std::collections::HashMap;

        let app = axum::Router::new().route(
            "/search.json",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q["api_key"], "serpapi-key");
                let body = match q["engine"].as_str() {
                    "google_autocomplete" => serde_json::json!({
                        "suggestions": [{"value": format!("{} ideas", q["q"])}, {"value": "hub"}]
                    }),
                    "google_trends" => serde_json::json!({
                        "interest_over_time": {"timeline_data": [
                            {"values": [{"value": "1"}, {"value": "2"}]},
                            {"values": [{"value": q["q"].clone()}]}
                        ]}
                    }),
                    _ => serde_json::json!({
                        "organic_results": [
                            {"title": "a", "link": "https://a.dev"},
                            {"title": "no link"},
                            {"title": "b", "link": "https://b.dev"},
                            {"title": "c", "link": "https://c.dev"},
                            {"title": "d", "link": "https://d.dev"},
                            {"title": "e", "link": "https://e.dev"},
                            {"title": "f", "link": "https://f.dev"}
                        ]
                    }),
                };
                Json(body)
            }),
        );
        let base = spawn(app).await;
        let client = SerpApiClient::new("serpapi-key".to_string())
            .with_endpoint(format!("{}/search.json", base));

        let results = client
            .search("ai", &SearchOptions::with_count(5))
            .await
            .unwrap();
        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.dev", "https://b.dev", "https://c.dev", "https://d.dev"]);

        let suggestions = client.autocomplete("home").await.unwrap();
        assert_eq!(suggestions, vec!["home ideas", "hub"]);

        let timeline = client
            .trends(&["x".to_string(), "y".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(timeline.latest_value(0), Some(&Value::from("x, y")));
    }

    #[test]
    fn test_search_result_serialization() {
        let result = SearchResult {
            title: "Test".to_string(),
            url: "https://test.com".to_string(),
            snippet: "Test snippet".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["url"], "https://test.com");
    }
}
