//! Document assembly: the two-phase create-then-rewrite protocol.
//!
//! The document service assigns a page's address when the page is created
//! and derives it from the title. To publish under a chosen final title the
//! page is first created with a provisional title (`{page_id} {year}`) and
//! then rewritten in place:
//!
//! ```text
//! createAccount ──▶ createPage(provisional) ──▶ path from URL ──▶ editPage(final)
//! ```
//!
//! Every step is fatal on failure and nothing is retried. Phase 2 runs only
//! once phase 1 has produced a usable path.

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::{PublishedDocument, UploadOutcome};
use crate::pipeline::document::{build_content, page_path_from_url, DocumentService, NewPage, PageEdit};
use chrono::Datelike;
use tracing::{info, warn};

/// Title used for phase 1.
pub fn provisional_title(page_id: &str, year: i32) -> String {
    format!("{page_id} {year}")
}

/// Publish the successful outcomes as one page.
///
/// Returns `Ok(None)` without touching the service when no outcome
/// succeeded.
pub async fn assemble_document<S>(
    outcomes: &[UploadOutcome],
    service: &S,
    config: &PublishConfig,
) -> Result<Option<PublishedDocument>, PublishError>
where
    S: DocumentService + ?Sized,
{
    assemble_document_for_year(outcomes, service, config, chrono::Local::now().year()).await
}

/// [`assemble_document`] with an explicit year for the provisional title.
pub async fn assemble_document_for_year<S>(
    outcomes: &[UploadOutcome],
    service: &S,
    config: &PublishConfig,
    year: i32,
) -> Result<Option<PublishedDocument>, PublishError>
where
    S: DocumentService + ?Sized,
{
    let images = outcomes.iter().filter(|o| o.is_success()).count();
    if images == 0 {
        warn!("No successful uploads; skipping page creation");
        return Ok(None);
    }

    // ── Phase 1: account + provisional page ──────────────────────────────
    let access_token = service
        .create_account(&config.short_name, &config.author_name)
        .await?;
    info!("Created account '{}'", config.short_name);

    let title = provisional_title(&config.page_id, year);
    let content = build_content(outcomes);
    let created_url = service
        .create_page(NewPage {
            access_token: &access_token,
            title: &title,
            content: &content,
        })
        .await?;

    let path = page_path_from_url(&created_url).ok_or_else(|| PublishError::PageCreation {
        reason: format!("no page path in returned URL '{created_url}'"),
    })?;
    info!("Created page '{}' with {} images", path, images);

    // ── Phase 2: rewrite with the final title ────────────────────────────
    let content = build_content(outcomes);
    let url = service
        .edit_page(PageEdit {
            access_token: &access_token,
            path: &path,
            title: &config.title,
            content: &content,
            author_name: &config.author_name,
            author_url: &config.author_url,
        })
        .await?;
    info!("Published '{}' at {}", config.title, url);

    Ok(Some(PublishedDocument {
        url,
        path,
        title: config.title.clone(),
        access_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::document::{Node, Tag};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Account(String, String),
        Create { title: String, content: Vec<Node> },
        Edit { path: String, title: String, content: Vec<Node>, token: String },
    }

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<Call>>,
        fail_account: bool,
        fail_create: bool,
        created_url: Option<String>,
    }

    #[async_trait]
    impl DocumentService for RecordingService {
        async fn create_account(&self, short_name: &str, author_name: &str) -> Result<String, PublishError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Account(short_name.into(), author_name.into()));
            if self.fail_account {
                return Err(PublishError::AccountCreation {
                    reason: "SHORT_NAME_REQUIRED".into(),
                });
            }
            Ok("token-1".into())
        }

        async fn create_page(&self, req: NewPage<'_>) -> Result<String, PublishError> {
            self.calls.lock().unwrap().push(Call::Create {
                title: req.title.into(),
                content: req.content.to_vec(),
            });
            if self.fail_create {
                return Err(PublishError::PageCreation {
                    reason: "CONTENT_TOO_BIG".into(),
                });
            }
            Ok(self
                .created_url
                .clone()
                .unwrap_or_else(|| "https://telegra.ph/trip-2026-10-19".into()))
        }

        async fn edit_page(&self, req: PageEdit<'_>) -> Result<String, PublishError> {
            self.calls.lock().unwrap().push(Call::Edit {
                path: req.path.into(),
                title: req.title.into(),
                content: req.content.to_vec(),
                token: req.access_token.into(),
            });
            Ok(format!("https://telegra.ph/{}", req.path))
        }
    }

    fn config() -> PublishConfig {
        PublishConfig::builder()
            .page_id("trip")
            .title("Summer Trip")
            .short_name("trip-bot")
            .author_name("Sam")
            .author_url("https://example.com")
            .build()
            .unwrap()
    }

    fn outcomes() -> Vec<UploadOutcome> {
        vec![
            UploadOutcome::success("a.png", "https://host/a", 0),
            UploadOutcome::success("b.jpg", "https://host/b", 1),
        ]
    }

    #[test]
    fn provisional_title_appends_year() {
        assert_eq!(provisional_title("trip", 2026), "trip 2026");
    }

    #[test]
    fn two_phase_protocol_in_order() {
        let service = RecordingService::default();
        let doc = tokio_test::block_on(assemble_document_for_year(&outcomes(), &service, &config(), 2026))
            .unwrap()
            .unwrap();

        assert_eq!(doc.url, "https://telegra.ph/trip-2026-10-19");
        assert_eq!(doc.path, "trip-2026-10-19");
        assert_eq!(doc.title, "Summer Trip");
        assert_eq!(doc.access_token, "token-1");

        let calls = service.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], Call::Account("trip-bot".into(), "Sam".into()));
        let Call::Create { title, content: created } = &calls[1] else {
            panic!("expected create, got {:?}", calls[1]);
        };
        assert_eq!(title, "trip 2026");
        let Call::Edit { path, title, content: edited, token } = &calls[2] else {
            panic!("expected edit, got {:?}", calls[2]);
        };
        assert_eq!(path, "trip-2026-10-19");
        assert_eq!(title, "Summer Trip");
        assert_eq!(token, "token-1");
        assert_eq!(created, edited);
    }

    #[test]
    fn content_has_summary_and_figures() {
        let service = RecordingService::default();
        tokio_test::block_on(assemble_document_for_year(&outcomes(), &service, &config(), 2026)).unwrap();

        let calls = service.calls.lock().unwrap();
        let Call::Create { content, .. } = &calls[1] else {
            panic!("expected create");
        };
        assert_eq!(content.len(), 3);
        assert_eq!(content[0].tag(), Some(Tag::P));
        for (node, (src, name)) in content[1..]
            .iter()
            .zip([("https://host/a", "a.png"), ("https://host/b", "b.jpg")])
        {
            assert_eq!(node.tag(), Some(Tag::Figure));
            let children = node.children();
            assert_eq!(children.len(), 2);
            assert_eq!(children[0], Node::image(src));
            assert_eq!(children[1].tag(), Some(Tag::Figcaption));
            assert_eq!(children[1].children(), &[Node::text(name)]);
        }
    }

    #[test]
    fn no_successes_makes_no_calls() {
        let service = RecordingService::default();
        let failed = vec![UploadOutcome::failure("a.png", "HTTP 500", 3)];
        let doc = tokio_test::block_on(assemble_document(&failed, &service, &config())).unwrap();
        assert!(doc.is_none());
        assert!(service.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn account_failure_stops_protocol() {
        let service = RecordingService {
            fail_account: true,
            ..Default::default()
        };
        let err = tokio_test::block_on(assemble_document(&outcomes(), &service, &config())).unwrap_err();
        assert!(matches!(err, PublishError::AccountCreation { .. }));
        assert_eq!(service.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn create_failure_skips_edit() {
        let service = RecordingService {
            fail_create: true,
            ..Default::default()
        };
        let err = tokio_test::block_on(assemble_document(&outcomes(), &service, &config())).unwrap_err();
        assert!(matches!(err, PublishError::PageCreation { .. }));
        let calls = service.calls.lock().unwrap();
        assert!(!calls.iter().any(|c| matches!(c, Call::Edit { .. })));
    }

    #[test]
    fn unusable_page_url_skips_edit() {
        let service = RecordingService {
            created_url: Some("https://telegra.ph/".into()),
            ..Default::default()
        };
        let err = tokio_test::block_on(assemble_document(&outcomes(), &service, &config())).unwrap_err();
        assert!(matches!(err, PublishError::PageCreation { .. }));
        assert_eq!(service.calls.lock().unwrap().len(), 2);
    }
}
