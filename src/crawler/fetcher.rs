//! Page fetcher collaborator boundary and its HTTP implementation
//!
//! The crawl engine never touches the network directly: it sees pages only
//! through the [`PageFetcher`] trait, which yields extracted links, form
//! descriptors, and enough response metadata to classify downloads.
//! [`HttpFetcher`] is the production implementation built on reqwest and
//! the HTML parser in this module's sibling; tests substitute in-memory
//! stubs.

use crate::auth::{Credential, FormDescriptor};
use crate::crawler::parser::parse_page;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Response};
use std::time::Duration;
use url::Url;

/// Response metadata relevant to download classification
#[derive(Debug, Clone, Default)]
pub struct PageMeta {
    /// Content-Type header value, if present
    pub content_type: Option<String>,

    /// Content-Disposition header value, if present
    pub content_disposition: Option<String>,
}

/// Result of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// Final URL after redirects
    pub final_url: Url,

    /// Response headers relevant to classification
    pub meta: PageMeta,

    /// Absolute link URLs extracted from the page
    pub links: Vec<String>,

    /// Form descriptors extracted from the page
    pub forms: Vec<FormDescriptor>,

    /// Raw body bytes when the response was not HTML; None for HTML pages
    pub body: Option<Vec<u8>>,
}

/// External collaborator that performs network fetches
///
/// Implementations must be safe to share across the worker pool.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches a URL and interrogates the resulting document
    ///
    /// HTML responses come back with links and forms extracted; non-HTML
    /// responses carry their raw bytes instead so a target file discovered
    /// mid-navigation is not fetched twice.
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;

    /// Fetches raw bytes for a download target
    async fn fetch_bytes(&self, url: &Url) -> Result<(Vec<u8>, PageMeta), FetchError>;

    /// Fills and submits a login form, returning the resulting page
    async fn submit_form(
        &self,
        page_url: &Url,
        form: &FormDescriptor,
        credential: &Credential,
    ) -> Result<FetchedPage, FetchError>;

    /// Fetches a robots.txt document
    ///
    /// `Ok(None)` means the server answered but served no usable document
    /// (404 and other non-2xx responses); the caller treats that the same
    /// as any transport error: allow-all.
    async fn fetch_robots(&self, robots_url: &Url) -> Result<Option<String>, FetchError>;
}

/// Production fetcher built on reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds the fetcher with the crawl session's user agent
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }

    fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
        let url = url.to_string();
        if error.is_timeout() {
            FetchError::Timeout { url }
        } else if error.is_connect() {
            FetchError::Network {
                url,
                message: "connection failed".to_string(),
            }
        } else {
            FetchError::Navigation {
                url,
                message: error.to_string(),
            }
        }
    }

    fn extract_meta(response: &Response) -> PageMeta {
        let header = |name| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        PageMeta {
            content_type: header(CONTENT_TYPE),
            content_disposition: header(CONTENT_DISPOSITION),
        }
    }

    /// Converts a successful response into a FetchedPage, parsing HTML
    /// bodies and passing other bodies through as raw bytes
    async fn response_to_page(&self, url: &Url, response: Response) -> Result<FetchedPage, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let meta = Self::extract_meta(&response);
        let is_html = meta
            .content_type
            .as_deref()
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);

        if is_html {
            let body = response
                .text()
                .await
                .map_err(|e| Self::classify_error(url, e))?;
            let parsed = parse_page(&body, &final_url);
            Ok(FetchedPage {
                status: status.as_u16(),
                final_url,
                meta,
                links: parsed.links,
                forms: parsed.forms,
                body: None,
            })
        } else {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| Self::classify_error(url, e))?;
            Ok(FetchedPage {
                status: status.as_u16(),
                final_url,
                meta,
                links: Vec::new(),
                forms: Vec::new(),
                body: Some(bytes.to_vec()),
            })
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::classify_error(url, e))?;

        self.response_to_page(url, response).await
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<(Vec<u8>, PageMeta), FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let meta = Self::extract_meta(&response);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::classify_error(url, e))?;

        Ok((bytes.to_vec(), meta))
    }

    async fn submit_form(
        &self,
        page_url: &Url,
        form: &FormDescriptor,
        credential: &Credential,
    ) -> Result<FetchedPage, FetchError> {
        let target = Url::parse(&form.action).unwrap_or_else(|_| page_url.clone());
        let params = form.fill(credential);

        let request = if form.method.eq_ignore_ascii_case("post") {
            self.client.post(target.clone()).form(&params)
        } else {
            self.client.get(target.clone()).query(&params)
        };

        let response = request
            .send()
            .await
            .map_err(|e| Self::classify_error(&target, e))?;

        self.response_to_page(&target, response).await
    }

    async fn fetch_robots(&self, robots_url: &Url) -> Result<Option<String>, FetchError> {
        let response = self
            .client
            .get(robots_url.clone())
            .send()
            .await
            .map_err(|e| Self::classify_error(robots_url, e))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        match response.text().await {
            Ok(content) => Ok(Some(content)),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InputDescriptor;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("grabnet-test/0.1").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_html_extracts_links_and_forms() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    r#"<html><body>
                        <a href="/a.pdf">File</a>
                        <form action="/login" method="post">
                            <input type="text" name="user">
                            <input type="password" name="pass">
                        </form>
                        </body></html>"#,
                    "text/html",
                ),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let page = fetcher().fetch(&url).await.unwrap();

        assert_eq!(page.status, 200);
        assert!(page.body.is_none());
        assert_eq!(page.links.len(), 1);
        assert!(page.links[0].ends_with("/a.pdf"));
        assert_eq!(page.forms.len(), 1);
        assert_eq!(page.forms[0].method, "post");
    }

    #[tokio::test]
    async fn test_fetch_non_html_carries_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0x25, 0x50, 0x44, 0x46])
                    .insert_header("content-type", "application/pdf"),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/report.pdf", server.uri())).unwrap();
        let page = fetcher().fetch(&url).await.unwrap();

        assert_eq!(page.body.as_deref(), Some(&b"%PDF"[..]));
        assert!(page.links.is_empty());
        assert_eq!(page.meta.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let result = fetcher().fetch(&url).await;
        assert!(matches!(result, Err(FetchError::Http { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_fetch_bytes_returns_meta() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.csv"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("a,b\n1,2\n", "text/csv")
                    .insert_header("content-disposition", "attachment; filename=\"data.csv\""),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/data.csv", server.uri())).unwrap();
        let (bytes, meta) = fetcher().fetch_bytes(&url).await.unwrap();

        assert_eq!(bytes, b"a,b\n1,2\n");
        assert_eq!(meta.content_type.as_deref(), Some("text/csv"));
        assert!(meta
            .content_disposition
            .as_deref()
            .unwrap()
            .contains("data.csv"));
    }

    #[tokio::test]
    async fn test_submit_form_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_string_contains("user=alice"))
            .and(body_string_contains("pass=s3cret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>Welcome</body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let page_url = Url::parse(&format!("{}/account", server.uri())).unwrap();
        let form = FormDescriptor {
            action: format!("{}/login", server.uri()),
            method: "post".to_string(),
            inputs: vec![
                InputDescriptor::new("user", "text", None),
                InputDescriptor::new("pass", "password", None),
            ],
        };
        let credential = Credential::new("alice", "s3cret");

        let page = fetcher()
            .submit_form(&page_url, &form, &credential)
            .await
            .unwrap();
        assert_eq!(page.status, 200);
        assert!(page.forms.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_robots_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/robots.txt", server.uri())).unwrap();
        let result = fetcher().fetch_robots(&url).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fetch_robots_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/robots.txt", server.uri())).unwrap();
        let content = fetcher().fetch_robots(&url).await.unwrap().unwrap();
        assert!(content.contains("User-agent"));
    }
}
