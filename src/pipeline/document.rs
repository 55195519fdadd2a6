//! Document service interaction: content tree and the remote client.
//!
//! The service stores articles as a tree of DOM-like nodes,
//! `{tag, attrs?, children?}` where a child is either a node or a bare
//! string. [`build_content`] turns the successful outcomes into that tree;
//! [`DocumentService`] wraps the three remote calls the assembly protocol
//! needs.

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::UploadOutcome;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ── Content tree ─────────────────────────────────────────────────────────

/// Element tags used by a gallery page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    P,
    Figure,
    Img,
    Figcaption,
}

/// Element attributes. Only `src` is ever set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attrs {
    pub src: String,
}

/// A child in the content tree: either an element or a text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: Tag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::Element(Element {
            tag: Tag::P,
            attrs: None,
            children: Some(vec![Node::text(text)]),
        })
    }

    pub fn image(src: impl Into<String>) -> Self {
        Node::Element(Element {
            tag: Tag::Img,
            attrs: Some(Attrs { src: src.into() }),
            children: None,
        })
    }

    pub fn caption(text: impl Into<String>) -> Self {
        Node::Element(Element {
            tag: Tag::Figcaption,
            attrs: None,
            children: Some(vec![Node::text(text)]),
        })
    }

    /// `<figure><img src/><figcaption>caption</figcaption></figure>`
    pub fn figure(src: impl Into<String>, caption: impl Into<String>) -> Self {
        Node::Element(Element {
            tag: Tag::Figure,
            attrs: None,
            children: Some(vec![Node::image(src), Node::caption(caption)]),
        })
    }

    pub fn tag(&self) -> Option<Tag> {
        match self {
            Node::Element(e) => Some(e.tag),
            Node::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(Element {
                children: Some(c), ..
            }) => c,
            _ => &[],
        }
    }
}

/// Opening paragraph stating how many images the page holds.
pub fn summary_text(count: usize) -> String {
    match count {
        1 => "This gallery contains 1 image.".to_string(),
        n => format!("This gallery contains {n} images."),
    }
}

/// Build the page body: one summary paragraph, then one figure per
/// successful outcome in input order. Failed outcomes are skipped.
pub fn build_content(outcomes: &[UploadOutcome]) -> Vec<Node> {
    let figures: Vec<Node> = outcomes
        .iter()
        .filter_map(|o| o.success_url().map(|url| Node::figure(url, &o.filename)))
        .collect();

    let mut content = Vec::with_capacity(figures.len() + 1);
    content.push(Node::paragraph(summary_text(figures.len())));
    content.extend(figures);
    content
}

// ── Remote client ────────────────────────────────────────────────────────

/// Request body for phase 1.
pub struct NewPage<'a> {
    pub access_token: &'a str,
    pub title: &'a str,
    pub content: &'a [Node],
}

/// Request body for phase 2.
pub struct PageEdit<'a> {
    pub access_token: &'a str,
    /// Path assigned by the service in phase 1.
    pub path: &'a str,
    pub title: &'a str,
    pub content: &'a [Node],
    pub author_name: &'a str,
    pub author_url: &'a str,
}

/// The remote publishing API.
///
/// No call is retried by callers: none carries an idempotency key.
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Create an account and return its secret access token.
    async fn create_account(&self, short_name: &str, author_name: &str)
        -> Result<String, PublishError>;

    /// Create a page and return its public URL.
    async fn create_page(&self, req: NewPage<'_>) -> Result<String, PublishError>;

    /// Rewrite an existing page in place and return its public URL.
    async fn edit_page(&self, req: PageEdit<'_>) -> Result<String, PublishError>;
}

/// Envelope shared by every document service response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, String> {
        match (self.ok, self.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err("ok response without result".to_string()),
            (false, _) => Err(self.error.unwrap_or_else(|| "unknown error".to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountResult {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PageResult {
    url: String,
}

/// [`DocumentService`] speaking the form-encoded HTTP API.
pub struct HttpDocumentService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentService {
    pub fn new(client: reqwest::Client, config: &PublishConfig) -> Self {
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a service client with its own HTTP client.
    pub fn from_config(config: &PublishConfig) -> Result<Self, PublishError> {
        let client = crate::publish::http_client(config)?;
        Ok(Self::new(client, config))
    }

    async fn post<T>(&self, method: &str, form: &[(&str, &str)]) -> Result<T, String>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, method);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("reading response failed: {e}"))?;

        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                format!("malformed response: {e}")
            } else {
                format!("HTTP {status}")
            }
        })?;
        parsed.into_result()
    }
}

fn serialize_content(content: &[Node]) -> Result<String, PublishError> {
    serde_json::to_string(content)
        .map_err(|e| PublishError::Internal(format!("content serialisation: {e}")))
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn create_account(
        &self,
        short_name: &str,
        author_name: &str,
    ) -> Result<String, PublishError> {
        let result: AccountResult = self
            .post(
                "createAccount",
                &[("short_name", short_name), ("author_name", author_name)],
            )
            .await
            .map_err(|reason| PublishError::AccountCreation { reason })?;
        Ok(result.access_token)
    }

    async fn create_page(&self, req: NewPage<'_>) -> Result<String, PublishError> {
        let content = serialize_content(req.content)?;
        let result: PageResult = self
            .post(
                "createPage",
                &[
                    ("access_token", req.access_token),
                    ("title", req.title),
                    ("content", content.as_str()),
                    ("return_content", "false"),
                ],
            )
            .await
            .map_err(|reason| PublishError::PageCreation { reason })?;
        Ok(result.url)
    }

    async fn edit_page(&self, req: PageEdit<'_>) -> Result<String, PublishError> {
        let content = serialize_content(req.content)?;
        let method = format!("editPage/{}", req.path);
        let result: PageResult = self
            .post(
                &method,
                &[
                    ("access_token", req.access_token),
                    ("title", req.title),
                    ("content", content.as_str()),
                    ("author_name", req.author_name),
                    ("author_url", req.author_url),
                ],
            )
            .await
            .map_err(|reason| PublishError::PageEdit {
                path: req.path.to_string(),
                reason,
            })?;
        Ok(result.url)
    }
}

/// Extract the page path (`Gallery-10-19`) from its public URL.
pub fn page_path_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let path = parsed.path().trim_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn figure_serialises_to_node_shape() {
        let json = serde_json::to_value(Node::figure("https://host/a", "a.png")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tag": "figure",
                "children": [
                    {"tag": "img", "attrs": {"src": "https://host/a"}},
                    {"tag": "figcaption", "children": ["a.png"]}
                ]
            })
        );
    }

    #[test]
    fn build_content_orders_figures_and_skips_failures() {
        let outcomes = vec![
            UploadOutcome::success("a.png", "https://host/a", 0),
            UploadOutcome::failure("x.png", "HTTP 500", 3),
            UploadOutcome::success("b.jpg", "https://host/b", 1),
        ];
        let content = build_content(&outcomes);
        assert_eq!(content.len(), 3);
        assert_eq!(content[0], Node::paragraph("This gallery contains 2 images."));
        assert_eq!(content[1], Node::figure("https://host/a", "a.png"));
        assert_eq!(content[2], Node::figure("https://host/b", "b.jpg"));
    }

    #[test]
    fn summary_text_singular() {
        assert_eq!(summary_text(1), "This gallery contains 1 image.");
        assert_eq!(summary_text(0), "This gallery contains 0 images.");
    }

    #[test]
    fn node_roundtrips_through_json() {
        let tree = build_content(&[UploadOutcome::success("a.png", "https://host/a", 0)]);
        let json = serde_json::to_string(&tree).unwrap();
        let back: Vec<Node> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn page_path_extraction() {
        assert_eq!(
            page_path_from_url("https://telegra.ph/Gallery-2026-10-19"),
            Some("Gallery-2026-10-19".to_string())
        );
        assert_eq!(page_path_from_url("https://telegra.ph/"), None);
        assert_eq!(page_path_from_url("not a url"), None);
    }

    #[test]
    fn api_envelope_error() {
        let resp: ApiResponse<AccountResult> =
            serde_json::from_str(r#"{"ok":false,"error":"SHORT_NAME_REQUIRED"}"#).unwrap();
        assert_eq!(resp.into_result().unwrap_err(), "SHORT_NAME_REQUIRED");
    }

    #[test]
    fn api_envelope_ok() {
        let resp: ApiResponse<PageResult> = serde_json::from_str(
            r#"{"ok":true,"result":{"path":"A-1","url":"https://telegra.ph/A-1"}}"#,
        )
        .unwrap();
        assert_eq!(resp.into_result().unwrap().url, "https://telegra.ph/A-1");
    }

    // ── HTTP client against a local stub ────────────────────────────────

    use crate::pipeline::http_stub;

    fn http_service(base: &str) -> HttpDocumentService {
        let config = PublishConfig::builder().api_base_url(base).build().unwrap();
        HttpDocumentService::from_config(&config).unwrap()
    }

    #[tokio::test]
    async fn http_create_account_posts_form() {
        let (base, server) = http_stub::serve(vec![(
            200,
            r#"{"ok":true,"result":{"short_name":"trip","access_token":"tok-9"}}"#,
        )])
        .await;
        let token = http_service(&base).create_account("trip", "Sam K").await.unwrap();
        assert_eq!(token, "tok-9");

        let req = &server.await.unwrap()[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.path, "/createAccount");
        assert!(req
            .header("content-type")
            .unwrap()
            .starts_with("application/x-www-form-urlencoded"));
        assert_eq!(req.field("short_name").as_deref(), Some("trip"));
        assert_eq!(req.field("author_name").as_deref(), Some("Sam K"));
    }

    #[tokio::test]
    async fn http_create_then_edit_page_sends_both_phases() {
        let (base, server) = http_stub::serve(vec![
            (200, r#"{"ok":true,"result":{"path":"trip-2026","url":"https://pages.test/trip-2026"}}"#),
            (200, r#"{"ok":true,"result":{"path":"trip-2026","url":"https://pages.test/trip-2026"}}"#),
        ])
        .await;
        let service = http_service(&base);
        let content = build_content(&[UploadOutcome::success("a.png", "https://host/a", 0)]);

        let url = service
            .create_page(NewPage {
                access_token: "tok-9",
                title: "trip 2026",
                content: &content,
            })
            .await
            .unwrap();
        assert_eq!(url, "https://pages.test/trip-2026");
        service
            .edit_page(PageEdit {
                access_token: "tok-9",
                path: "trip-2026",
                title: "Summer Trip",
                content: &content,
                author_name: "Sam",
                author_url: "https://example.com",
            })
            .await
            .unwrap();

        let requests = server.await.unwrap();
        let create = &requests[0];
        assert_eq!(create.path, "/createPage");
        assert_eq!(create.field("access_token").as_deref(), Some("tok-9"));
        assert_eq!(create.field("title").as_deref(), Some("trip 2026"));
        assert_eq!(create.field("return_content").as_deref(), Some("false"));
        let sent: Vec<Node> = serde_json::from_str(&create.field("content").unwrap()).unwrap();
        assert_eq!(sent, content);

        let edit = &requests[1];
        assert_eq!(edit.path, "/editPage/trip-2026");
        assert_eq!(edit.field("title").as_deref(), Some("Summer Trip"));
        assert_eq!(edit.field("author_name").as_deref(), Some("Sam"));
        assert_eq!(edit.field("author_url").as_deref(), Some("https://example.com"));
        assert_eq!(edit.field("content").unwrap(), create.field("content").unwrap());
    }

    #[tokio::test]
    async fn http_service_error_maps_to_phase_variant() {
        let (base, server) = http_stub::serve(vec![
            (200, r#"{"ok":false,"error":"SHORT_NAME_REQUIRED"}"#),
            (400, r#"{"ok":false,"error":"PAGE_ACCESS_DENIED"}"#),
            (502, "<html>bad gateway</html>"),
        ])
        .await;
        let service = http_service(&base);

        let err = service.create_account("", "").await.unwrap_err();
        assert!(
            matches!(err, PublishError::AccountCreation { ref reason } if reason == "SHORT_NAME_REQUIRED"),
            "got {err:?}"
        );

        let err = service
            .edit_page(PageEdit {
                access_token: "t",
                path: "p-1",
                title: "T",
                content: &[],
                author_name: "",
                author_url: "",
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, PublishError::PageEdit { ref path, ref reason } if path == "p-1" && reason == "PAGE_ACCESS_DENIED"),
            "got {err:?}"
        );

        let err = service
            .create_page(NewPage {
                access_token: "t",
                title: "T",
                content: &[],
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, PublishError::PageCreation { ref reason } if reason.contains("502")),
            "got {err:?}"
        );
        server.await.unwrap();
    }
}
