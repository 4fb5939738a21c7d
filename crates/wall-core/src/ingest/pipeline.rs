//! The ingestion sequence: envelope to stored post.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::envelope::{RawEnvelope, extract_envelope};
use super::message::ParsedMessage;
use super::render::render;
use super::IngestError;
use crate::media::{MediaStore, SubstitutionTable, materialize};
use crate::schedule::{BlockSchedule, resolve_current_block};
use crate::store::{BlockId, NewPost, PostId, Store, User};

/// Step of the pipeline, reported when ingestion stops early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Pulling the email out of the request.
    ReceivingEnvelope,
    /// Parsing the email.
    Parsing,
    /// Matching the sender to a user.
    ResolvingUser,
    /// Finding or opening the current block.
    SchedulingBlock,
    /// Storing media and rendering the body.
    TransformingContent,
    /// Inserting the post.
    Persisting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReceivingEnvelope => "receiving envelope",
            Self::Parsing => "parsing",
            Self::ResolvingUser => "resolving user",
            Self::SchedulingBlock => "scheduling block",
            Self::TransformingContent => "transforming content",
            Self::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// Ingestion stopped before a post was stored.
#[derive(Debug, Error)]
#[error("Ingestion aborted while {stage}: {error}")]
pub struct Aborted {
    /// Where it stopped.
    pub stage: Stage,
    /// Why.
    #[source]
    pub error: IngestError,
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    /// The new post.
    pub post_id: PostId,
    /// Block it was filed under.
    pub block_id: BlockId,
    /// Its author.
    pub user: User,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, Aborted>;
}

impl<T> AtStage<T> for Result<T, IngestError> {
    fn at(self, stage: Stage) -> Result<T, Aborted> {
        self.map_err(|error| Aborted { stage, error })
    }
}

/// Turns delivered emails into posts.
///
/// Holds its collaborators explicitly so tests can substitute fakes.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn Store>,
    media: Arc<dyn MediaStore>,
    schedule: BlockSchedule,
}

impl Ingestor {
    /// Creates an ingestor.
    pub fn new(store: Arc<dyn Store>, media: Arc<dyn MediaStore>, schedule: BlockSchedule) -> Self {
        Self {
            store,
            media,
            schedule,
        }
    }

    /// The block schedule in use.
    #[must_use]
    pub const fn schedule(&self) -> &BlockSchedule {
        &self.schedule
    }

    /// Ingests a webhook request body.
    ///
    /// # Errors
    ///
    /// Returns [`Aborted`] naming the stage that failed. Nothing is written
    /// to the store if the envelope cannot be extracted.
    pub async fn ingest_request(
        &self,
        content_type: Option<&str>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Ingested, Aborted> {
        let envelope = extract_envelope(content_type, body).at(Stage::ReceivingEnvelope)?;
        self.ingest_envelope(&envelope, now).await
    }

    /// Ingests one raw email.
    ///
    /// # Errors
    ///
    /// Returns [`Aborted`] naming the stage that failed. A block opened
    /// before a later failure is kept.
    pub async fn ingest_envelope(
        &self,
        envelope: &RawEnvelope,
        now: DateTime<Utc>,
    ) -> Result<Ingested, Aborted> {
        let message = ParsedMessage::parse(envelope).at(Stage::Parsing)?;

        let sender = &message
            .primary_sender()
            .ok_or(IngestError::NoSender)
            .at(Stage::Parsing)?
            .address;
        let user = self
            .store
            .find_user_by_email(sender)
            .await
            .map_err(IngestError::from)
            .and_then(|user| user.ok_or_else(|| IngestError::UnknownSender(sender.clone())))
            .at(Stage::ResolvingUser)?;

        let block_id = resolve_current_block(self.store.as_ref(), &self.schedule, now)
            .await
            .at(Stage::SchedulingBlock)?;

        let body = self.transform(&message).await;

        let post_id = self
            .store
            .insert_post(&NewPost {
                block_id,
                user_id: user.id,
                title: message.subject.clone(),
                body,
                created_at: now,
            })
            .await
            .map_err(IngestError::from)
            .at(Stage::Persisting)?;

        info!(block_id = %block_id, post_id = %post_id, user = %user.name, "Added a post");
        Ok(Ingested {
            post_id,
            block_id,
            user,
        })
    }

    /// Stores embedded media and renders the body. Media failures only cost
    /// the image substitutions.
    async fn transform(&self, message: &ParsedMessage) -> String {
        for attachment in &message.attachments {
            debug!(
                file_name = attachment.file_name.as_deref().unwrap_or_default(),
                media_type = %attachment.media_type,
                bytes = attachment.data.len(),
                "Ignoring attachment"
            );
        }

        let substitutions = match materialize(self.media.as_ref(), &message.embedded_files).await {
            Ok(table) => table,
            Err(e) => {
                warn!(stage = %Stage::TransformingContent, error = %e, "Rendering without embedded images");
                SubstitutionTable::new()
            }
        };

        render(&message.text_body, &substitutions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryMediaStore, RecordingStore, StoreCall};
    use chrono::{TimeDelta, TimeZone};

    const FORM_TYPE: &str = "multipart/form-data; boundary=b0und";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn form(email: &str) -> Vec<u8> {
        format!(
            "--b0und\r\nContent-Disposition: form-data; name=\"email\"\r\n\r\n{email}\r\n--b0und--\r\n"
        )
        .into_bytes()
    }

    fn ingestor(store: &Arc<RecordingStore>, media: &Arc<MemoryMediaStore>) -> Ingestor {
        Ingestor::new(store.clone(), media.clone(), BlockSchedule::default())
    }

    fn seeded_store() -> Arc<RecordingStore> {
        let store = RecordingStore::default();
        store.add_user("ann", "ann@example.com");
        store.seed_block(t0());
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_missing_email_field_touches_nothing() {
        let store = seeded_store();
        let media = Arc::new(MemoryMediaStore::default());
        let body = b"--b0und\r\nContent-Disposition: form-data; name=\"text\"\r\n\r\nhi\r\n--b0und--\r\n";

        let err = ingestor(&store, &media)
            .ingest_request(Some(FORM_TYPE), body, t0())
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::ReceivingEnvelope);
        assert!(matches!(err.error, IngestError::MissingEmailField));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_senders_aborts_before_lookup() {
        let store = seeded_store();
        let media = Arc::new(MemoryMediaStore::default());

        let err = ingestor(&store, &media)
            .ingest_request(Some(FORM_TYPE), &form("Subject: Hi\r\n\r\nbody"), t0())
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::Parsing);
        assert!(matches!(err.error, IngestError::NoSender));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_sender_creates_no_post() {
        let store = seeded_store();
        let media = Arc::new(MemoryMediaStore::default());
        let email = "From: mallory@example.com\r\nSubject: Hi\r\n\r\nbody";

        let err = ingestor(&store, &media)
            .ingest_request(Some(FORM_TYPE), &form(email), t0())
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::ResolvingUser);
        assert!(
            matches!(err.error, IngestError::UnknownSender(ref a) if a == "mallory@example.com")
        );
        assert_eq!(
            store.calls(),
            vec![StoreCall::FindUser("mallory@example.com".to_string())]
        );
        assert!(store.posts().is_empty());
    }

    #[tokio::test]
    async fn test_no_blocks_aborts() {
        let store = RecordingStore::default();
        store.add_user("ann", "ann@example.com");
        let store = Arc::new(store);
        let media = Arc::new(MemoryMediaStore::default());
        let email = "From: ann@example.com\r\nSubject: Hi\r\n\r\nbody";

        let err = ingestor(&store, &media)
            .ingest_request(Some(FORM_TYPE), &form(email), t0())
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::SchedulingBlock);
        assert!(matches!(err.error, IngestError::NoBlocksConfigured));
        assert!(store.posts().is_empty());
    }

    #[tokio::test]
    async fn test_post_stored() {
        let store = seeded_store();
        let media = Arc::new(MemoryMediaStore::default());
        let email = "From: Ann <ann@example.com>\r\nSubject: Hello\r\n\r\nWorld #1";
        let now = t0() + TimeDelta::hours(2);

        let ingested = ingestor(&store, &media)
            .ingest_request(Some(FORM_TYPE), &form(email), now)
            .await
            .unwrap();

        assert_eq!(ingested.user.name, "ann");
        let posts = store.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Hello");
        assert_eq!(posts[0].block_id, ingested.block_id);
        assert_eq!(posts[0].user_id, ingested.user.id);
        assert_eq!(posts[0].created_at, now);
        assert_eq!(
            posts[0].body,
            "<p>World <a href=\"/post?id=1\">#1</a></p>\n"
        );
    }

    #[tokio::test]
    async fn test_stale_block_is_replaced() {
        let store = seeded_store();
        let media = Arc::new(MemoryMediaStore::default());
        let email = "From: ann@example.com\r\nSubject: Late\r\n\r\nbody";

        let ingested = ingestor(&store, &media)
            .ingest_request(Some(FORM_TYPE), &form(email), t0() + TimeDelta::hours(50))
            .await
            .unwrap();

        assert!(
            store
                .calls()
                .contains(&StoreCall::CreateBlock(t0() + TimeDelta::hours(48)))
        );
        assert_eq!(store.posts()[0].block_id, ingested.block_id);
    }

    #[tokio::test]
    async fn test_embedded_image_rendered() {
        let store = seeded_store();
        let media = Arc::new(MemoryMediaStore::default());
        let email = concat!(
            "From: ann@example.com\r\n",
            "Subject: Cat\r\n",
            "Content-Type: multipart/related; boundary=\"rel\"\r\n",
            "\r\n",
            "--rel\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "Look\n\n[image: foo.png]\n\nnice\r\n",
            "--rel\r\n",
            "Content-Type: image/png; name=\"foo.png\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "Content-ID: <ii_1>\r\n",
            "\r\n",
            "iVBORw0KGgo=\r\n",
            "--rel--\r\n",
        );

        ingestor(&store, &media)
            .ingest_request(Some(FORM_TYPE), &form(email), t0())
            .await
            .unwrap();

        let body = &store.posts()[0].body;
        assert_eq!(body.matches("<img src=\"/images/ii_1-foo.png\">").count(), 1);
        assert_eq!(body.matches("<img").count(), 1);
        assert!(!body.contains("[image: foo.png]"));
        assert_eq!(store_bytes(&media, "ii_1-foo.png"), b"\x89PNG\r\n\x1a\n");
    }

    #[tokio::test]
    async fn test_media_failure_keeps_post() {
        let store = seeded_store();
        let media = Arc::new(MemoryMediaStore::failing_on("ii_1-foo.png"));
        let email = concat!(
            "From: ann@example.com\r\n",
            "Subject: Cat\r\n",
            "Content-Type: multipart/related; boundary=\"rel\"\r\n",
            "\r\n",
            "--rel\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "[image: foo.png]\r\n",
            "--rel\r\n",
            "Content-Type: image/png; name=\"foo.png\"\r\n",
            "Content-ID: <ii_1>\r\n",
            "\r\n",
            "png\r\n",
            "--rel--\r\n",
        );

        ingestor(&store, &media)
            .ingest_request(Some(FORM_TYPE), &form(email), t0())
            .await
            .unwrap();

        let posts = store.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].body, "<p>[image: foo.png]</p>\n");
    }

    #[tokio::test]
    async fn test_insert_failure_is_persisting_stage() {
        let store = seeded_store();
        store.fail_inserts();
        let media = Arc::new(MemoryMediaStore::default());
        let email = "From: ann@example.com\r\nSubject: Hi\r\n\r\nbody";

        let err = ingestor(&store, &media)
            .ingest_request(Some(FORM_TYPE), &form(email), t0())
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::Persisting);
        assert!(matches!(err.error, IngestError::Database(_)));
    }

    fn store_bytes(media: &MemoryMediaStore, name: &str) -> Vec<u8> {
        media.bytes_of(name).unwrap()
    }
}
