//! HTML web search backend.
//!
//! Fetches a results page from an HTML search frontend and extracts the
//! result links. Redirect links of the form `/l/?uddg=<encoded target>` are
//! unwrapped to the target URL.

use entnorm_core::{CollaboratorError, SearchBackend};
use reqwest::{Client, StatusCode, Url};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;

const BACKEND_NAME: &str = "web-search";
const USER_AGENT: &str = concat!("entnorm/", env!("CARGO_PKG_VERSION"));
const REDIRECT_PARAM: &str = "uddg";

static RESULT_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a.result__a, a.result-link").expect("result link selector is valid")
});

/// [`SearchBackend`] over an HTML results page taking `q` (query) and `s` (offset).
pub struct HttpSearchBackend {
    http: Client,
    endpoint: Url,
}

impl HttpSearchBackend {
    pub fn new(endpoint: &str) -> Result<Self, CollaboratorError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| CollaboratorError::Malformed(format!("search endpoint {endpoint}: {e}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

/// Result links from a results page, in page order, with redirects unwrapped.
/// Relative links are resolved against `base`.
pub fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(|url| unwrap_redirect(&url).unwrap_or_else(|| url.to_string()))
        .collect()
}

fn unwrap_redirect(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == REDIRECT_PARAM)
        .map(|(_, v)| v.into_owned())
}

#[async_trait::async_trait]
impl SearchBackend for HttpSearchBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn page(
        &self,
        query: &str,
        start: usize,
        count: usize,
    ) -> Result<Vec<String>, CollaboratorError> {
        let offset = start.to_string();
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("q", query), ("s", offset.as_str())])
            .send()
            .await
            .map_err(|e| CollaboratorError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CollaboratorError::Unavailable(format!(
                "{BACKEND_NAME} rate limited ({status})"
            )));
        }
        if !status.is_success() {
            return Err(CollaboratorError::Transport(format!(
                "{BACKEND_NAME} returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        let mut links = extract_links(&body, &self.endpoint);
        links.truncate(count);
        tracing::debug!(
            target: "entnorm::search",
            query,
            start,
            links = links.len(),
            "Fetched results page"
        );
        Ok(links)
    }
}
