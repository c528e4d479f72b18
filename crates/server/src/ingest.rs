//! Asset-bearing writes kept in lock-step with their database rows.
//!
//! Every create/update runs as one [`UploadAttempt`] whose phases only move
//! forward:
//!
//! `Validating -> SavingAsset[1..k] -> PersistingRecord -> Committed`
//!
//! Any failure jumps to `RollingBack -> Failed`, removing every asset the
//! attempt wrote. Old assets are removed only after the row stops
//! referencing them, so a row never points at a missing file. The reverse
//! (an unreferenced file) is possible if the process dies between writing
//! an asset and committing its row; nothing sweeps those.

use aifriend_core::{
    AssetPurpose, AssetReference, ImageType, Subject, UploadValidator, ValidationError,
};
use aifriend_metadata::{
    CharacterChanges, CharacterRow, MetadataError, MetadataStore, NewCharacter, UserRow,
};
use aifriend_storage::{AssetStore, NamingContext, PersistedAsset, StorageError};
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

/// Errors from an ingestion operation.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not the owner of this {0}")]
    Ownership(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// Phase of an upload attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptPhase {
    Validating,
    /// Writing the n-th asset (1-based).
    SavingAsset(usize),
    PersistingRecord,
    Committed,
    RollingBack,
    Failed,
}

impl AttemptPhase {
    fn rank(&self) -> (u8, usize) {
        match self {
            Self::Validating => (0, 0),
            Self::SavingAsset(n) => (1, *n),
            Self::PersistingRecord => (2, 0),
            Self::Committed => (3, 0),
            Self::RollingBack => (4, 0),
            Self::Failed => (5, 0),
        }
    }
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validating => write!(f, "validating"),
            Self::SavingAsset(n) => write!(f, "saving_asset_{n}"),
            Self::PersistingRecord => write!(f, "persisting_record"),
            Self::Committed => write!(f, "committed"),
            Self::RollingBack => write!(f, "rolling_back"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Assets written during one coordinator invocation, in write order.
///
/// Lives only as long as the invocation. Dropped after [`commit`] or
/// [`rollback`].
///
/// [`commit`]: UploadAttempt::commit
/// [`rollback`]: UploadAttempt::rollback
pub struct UploadAttempt<'a> {
    assets: &'a AssetStore,
    phase: AttemptPhase,
    written: Vec<AssetReference>,
}

impl<'a> UploadAttempt<'a> {
    pub fn new(assets: &'a AssetStore) -> Self {
        Self {
            assets,
            phase: AttemptPhase::Validating,
            written: Vec::new(),
        }
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn written(&self) -> &[AssetReference] {
        &self.written
    }

    fn enter(&mut self, next: AttemptPhase) {
        debug_assert!(
            next.rank() > self.phase.rank(),
            "attempt moved backwards: {} -> {next}",
            self.phase
        );
        debug!(from = %self.phase, to = %next, "attempt phase");
        self.phase = next;
    }

    /// Persist one asset and record it for rollback.
    pub async fn persist(
        &mut self,
        data: Bytes,
        naming: &NamingContext,
    ) -> Result<PersistedAsset, StorageError> {
        self.enter(AttemptPhase::SavingAsset(self.written.len() + 1));
        let asset = self.assets.persist(data, naming).await?;
        self.written.push(AssetReference {
            path: asset.path.clone(),
            purpose: naming.purpose,
        });
        Ok(asset)
    }

    /// Fail the attempt before anything was written.
    ///
    /// Returns `error` so call sites can `return Err(attempt.reject(e).into())`.
    pub fn reject<E: fmt::Display>(&mut self, error: E) -> E {
        debug!(phase = %self.phase, error = %error, "upload rejected");
        self.enter(AttemptPhase::Failed);
        error
    }

    pub fn persisting_record(&mut self) {
        self.enter(AttemptPhase::PersistingRecord);
    }

    /// Keep everything written. Returns what the attempt wrote.
    pub fn commit(mut self) -> Vec<AssetReference> {
        self.enter(AttemptPhase::Committed);
        std::mem::take(&mut self.written)
    }

    /// Remove every asset this attempt wrote, newest first.
    ///
    /// Removal failures are logged and skipped; the caller still returns the
    /// original error.
    pub async fn rollback(mut self) {
        self.enter(AttemptPhase::RollingBack);
        for reference in self.written.iter().rev() {
            if let Err(e) = self.assets.remove(&reference.path).await {
                warn!(
                    path = %reference.path,
                    purpose = %reference.purpose,
                    error = %e,
                    "failed to roll back asset, leaving orphan"
                );
            }
        }
        self.enter(AttemptPhase::Failed);
    }
}

/// Fields of a new character, as submitted.
#[derive(Clone, Debug, Default)]
pub struct CharacterDraft {
    pub name: String,
    pub profile: String,
    pub photo: Option<Bytes>,
    pub background_image: Option<Bytes>,
}

/// Partial character update, as submitted. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct CharacterPatch {
    pub name: Option<String>,
    pub profile: Option<String>,
    pub photo: Option<Bytes>,
    pub background_image: Option<Bytes>,
}

impl CharacterPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.profile.is_none()
            && self.photo.is_none()
            && self.background_image.is_none()
    }
}

/// A validated upload waiting to be persisted.
struct AcceptedUpload {
    data: Bytes,
    naming: NamingContext,
}

/// Orchestrates validation, asset persistence and the row write.
#[derive(Clone)]
pub struct IngestionCoordinator {
    metadata: Arc<dyn MetadataStore>,
    assets: AssetStore,
    validator: UploadValidator,
}

impl IngestionCoordinator {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        assets: AssetStore,
        validator: UploadValidator,
    ) -> Self {
        Self {
            metadata,
            assets,
            validator,
        }
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Validate an optional upload. Empty uploads count as absent.
    fn accept(
        &self,
        subject: &Subject,
        purpose: AssetPurpose,
        data: Option<Bytes>,
    ) -> Result<Option<AcceptedUpload>, ValidationError> {
        let Some(data) = data.filter(|d| !d.is_empty()) else {
            return Ok(None);
        };
        let image: ImageType = self.validator.validate(purpose.class(), &data)?;
        Ok(Some(AcceptedUpload {
            data,
            naming: NamingContext::new(purpose, subject.id.get(), image),
        }))
    }

    /// Look up a live character and check the caller owns it.
    pub async fn get_owned_character(
        &self,
        subject: &Subject,
        character_id: i64,
    ) -> Result<CharacterRow, IngestError> {
        let row = self
            .metadata
            .get_character(character_id)
            .await?
            .ok_or(IngestError::NotFound("character"))?;
        if !subject.owns(row.user_id) {
            return Err(IngestError::Ownership("character"));
        }
        Ok(row)
    }

    /// Create a character with up to two images.
    ///
    /// Images are written photo first, then background. The row is inserted
    /// only once both are durable.
    #[instrument(skip(self, draft), fields(user_id = %subject.id))]
    pub async fn create_character(
        &self,
        subject: &Subject,
        draft: CharacterDraft,
    ) -> Result<CharacterRow, IngestError> {
        let mut attempt = UploadAttempt::new(&self.assets);

        let name = draft.name.trim();
        if name.is_empty() {
            let e = IngestError::InvalidInput("name is required".to_string());
            return Err(attempt.reject(e));
        }

        let accepted = self
            .accept(subject, AssetPurpose::CharacterPhoto, draft.photo)
            .and_then(|photo| {
                let background =
                    self.accept(subject, AssetPurpose::CharacterBackground, draft.background_image)?;
                Ok((photo, background))
            });
        let (photo, background) = match accepted {
            Ok(uploads) => uploads,
            Err(e) => return Err(attempt.reject(e).into()),
        };

        let result = async {
            let mut record = NewCharacter {
                user_id: subject.id.get(),
                name: name.to_string(),
                profile: draft.profile,
                ..NewCharacter::default()
            };
            if let Some(upload) = photo {
                record.photo = Some(attempt.persist(upload.data, &upload.naming).await?.public_path);
            }
            if let Some(upload) = background {
                record.background_image =
                    Some(attempt.persist(upload.data, &upload.naming).await?.public_path);
            }

            attempt.persisting_record();
            Ok::<_, IngestError>(self.metadata.create_character(&record).await?)
        }
        .await;

        match result {
            Ok(row) => {
                attempt.commit();
                info!(character_id = row.id, "character created");
                Ok(row)
            }
            Err(e) => {
                attempt.rollback().await;
                Err(e)
            }
        }
    }

    /// Apply a partial update, replacing images without ever deleting one the
    /// row still references.
    #[instrument(skip(self, patch), fields(user_id = %subject.id))]
    pub async fn update_character(
        &self,
        subject: &Subject,
        character_id: i64,
        patch: CharacterPatch,
    ) -> Result<CharacterRow, IngestError> {
        let current = self.get_owned_character(subject, character_id).await?;
        let mut attempt = UploadAttempt::new(&self.assets);

        let name = match patch.name {
            Some(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    let e = IngestError::InvalidInput("name cannot be empty".to_string());
                    return Err(attempt.reject(e));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };

        let accepted = self
            .accept(subject, AssetPurpose::CharacterPhoto, patch.photo)
            .and_then(|photo| {
                let background =
                    self.accept(subject, AssetPurpose::CharacterBackground, patch.background_image)?;
                Ok((photo, background))
            });
        let (photo, background) = match accepted {
            Ok(uploads) => uploads,
            Err(e) => return Err(attempt.reject(e).into()),
        };

        let mut changes = CharacterChanges {
            name,
            profile: patch.profile,
            ..CharacterChanges::default()
        };
        if changes.is_empty() && photo.is_none() && background.is_none() {
            let e = IngestError::InvalidInput("nothing to update".to_string());
            return Err(attempt.reject(e));
        }

        let result = async {
            if let Some(upload) = photo {
                changes.photo = Some(attempt.persist(upload.data, &upload.naming).await?.public_path);
            }
            if let Some(upload) = background {
                changes.background_image =
                    Some(attempt.persist(upload.data, &upload.naming).await?.public_path);
            }

            attempt.persisting_record();
            Ok::<_, IngestError>(
                self.metadata
                    .update_character(character_id, &changes)
                    .await?,
            )
        }
        .await;

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                attempt.rollback().await;
                return Err(match e {
                    IngestError::Metadata(MetadataError::NotFound(_)) => {
                        IngestError::NotFound("character")
                    }
                    other => other,
                });
            }
        };
        attempt.commit();

        // The row no longer references the replaced images.
        if changes.photo.is_some() {
            self.detach(current.photo.as_deref()).await;
        }
        if changes.background_image.is_some() {
            self.detach(current.background_image.as_deref()).await;
        }

        info!("character updated");
        Ok(row)
    }

    /// Replace the caller's avatar.
    #[instrument(skip(self, data), fields(user_id = %subject.id, size = data.len()))]
    pub async fn replace_avatar(
        &self,
        subject: &Subject,
        data: Bytes,
    ) -> Result<UserRow, IngestError> {
        let mut attempt = UploadAttempt::new(&self.assets);
        let upload = match self.accept(subject, AssetPurpose::Avatar, Some(data)) {
            Ok(Some(upload)) => upload,
            Ok(None) => {
                let e = IngestError::InvalidInput("avatar file is required".to_string());
                return Err(attempt.reject(e));
            }
            Err(e) => return Err(attempt.reject(e).into()),
        };

        let user_id = subject.id.get();
        let current = match self.metadata.get_user(user_id).await {
            Ok(Some(row)) => row,
            Ok(None) => return Err(attempt.reject(IngestError::NotFound("user"))),
            Err(e) => return Err(attempt.reject(e).into()),
        };

        let result = async {
            let asset = attempt.persist(upload.data, &upload.naming).await?;
            attempt.persisting_record();
            Ok::<_, IngestError>(
                self.metadata
                    .update_avatar(user_id, &asset.public_path)
                    .await?,
            )
        }
        .await;

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                attempt.rollback().await;
                return Err(e);
            }
        };
        attempt.commit();

        self.detach(current.avatar.as_deref()).await;
        info!("avatar replaced");
        Ok(row)
    }

    /// Tombstone a character, then remove its images.
    #[instrument(skip(self), fields(user_id = %subject.id))]
    pub async fn remove_character(
        &self,
        subject: &Subject,
        character_id: i64,
    ) -> Result<(), IngestError> {
        let current = self.get_owned_character(subject, character_id).await?;

        let row = self
            .metadata
            .tombstone_character(current.id, OffsetDateTime::now_utc())
            .await
            .map_err(|e| match e {
                MetadataError::NotFound(_) => IngestError::NotFound("character"),
                other => other.into(),
            })?;

        for public_path in row.asset_paths() {
            self.detach(Some(public_path)).await;
        }

        info!("character removed");
        Ok(())
    }

    /// Best-effort removal of an asset that is no longer referenced.
    async fn detach(&self, public_path: Option<&str>) {
        let Some(public_path) = public_path else {
            return;
        };
        if let Err(e) = self.assets.remove_public(public_path).await {
            warn!(path = %public_path, error = %e, "failed to remove detached asset, leaving orphan");
        }
    }
}

impl fmt::Debug for IngestionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionCoordinator")
            .field("assets", &self.assets)
            .field("validator", &self.validator)
            .finish()
    }
}
