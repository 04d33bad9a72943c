//! Write paths.
//!
//! Every mutation authorizes and writes inside a single store transaction. A denial aborts the
//! transaction and surfaces as a [`StashError`]; nothing is persisted.

use crate::access;
use crate::identity::IdentityProvider;
use crate::model::{BlobId, FavoriteState, File, FileId, MediaType};
use crate::scope::Scope;
use crate::store::MemoryStore;
use crate::{StashError, StashResult};
use chrono::Utc;
use stash_blobs::{BlobError, BlobStore};
use stash_types::NonEmptyText;
use std::sync::Arc;

/// Unvalidated input for [`FileMutationService::create_file`].
#[derive(Clone, Debug)]
pub struct NewFile {
    pub name: String,
    pub scope: Scope,
    pub blob_id: BlobId,
    /// Kind name (`image`, `pdf`, `csv`) or the content type reported at upload.
    pub media_type: String,
}

#[derive(Clone)]
pub struct FileMutationService {
    store: Arc<MemoryStore>,
    blobs: Arc<dyn BlobStore>,
}

impl FileMutationService {
    pub fn new(store: Arc<MemoryStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Issues a single-use upload URL.
    ///
    /// # Errors
    ///
    /// Returns `StashError::Unauthenticated` without an identity, or a wrapped blob error.
    pub fn generate_upload_url(&self, caller: &impl IdentityProvider) -> StashResult<String> {
        caller
            .current_identity()
            .ok_or(StashError::Unauthenticated)?;
        Ok(self.blobs.generate_upload_url()?)
    }

    /// Records a new file in `new_file.scope`.
    ///
    /// The media type and name are validated before the transaction opens, so an unsupported
    /// upload never reaches the store. Once the scope check passes, the blob must exist and its
    /// recorded content type must agree with the claimed media type.
    ///
    /// # Errors
    ///
    /// - `StashError::UnsupportedMediaType` for anything other than image, PDF or CSV, claimed or
    ///   recorded
    /// - `StashError::InvalidInput` for a blank name or a media type the blob does not have
    /// - `StashError::Unauthenticated`, `UnknownUser` or `Forbidden` when the scope check fails
    /// - `StashError::BlobNotFound` when nothing was uploaded under `blob_id`
    pub fn create_file(
        &self,
        caller: &impl IdentityProvider,
        new_file: NewFile,
    ) -> StashResult<File> {
        let media_type: MediaType = new_file.media_type.parse()?;
        let name = NonEmptyText::new(&new_file.name)
            .map_err(|_| StashError::InvalidInput("file name cannot be empty".into()))?;
        let identity = caller.current_identity();

        let file = self.store.transaction(|tables| {
            access::check_scope(tables, identity.as_ref(), &new_file.scope).into_result()?;
            self.check_blob(&new_file.blob_id, media_type)?;

            let file = File {
                id: FileId::new(),
                name,
                scope: new_file.scope,
                blob_id: new_file.blob_id,
                media_type,
                created_at: Utc::now(),
            };
            tables.insert_file(file.clone());
            Ok(file)
        })?;

        tracing::info!(file_id = %file.id, scope = %file.scope, media_type = %file.media_type, "file created");
        Ok(file)
    }

    fn check_blob(&self, blob_id: &BlobId, claimed: MediaType) -> StashResult<()> {
        let recorded = self.blobs.content_type(blob_id).map_err(|e| match e {
            BlobError::NotFound(id) => StashError::BlobNotFound(id),
            other => StashError::Blob(other),
        })?;

        let recorded_media = recorded
            .as_ref()
            .and_then(|content_type| MediaType::from_content_type(content_type.as_str()));
        match recorded_media {
            Some(media) if media == claimed => Ok(()),
            Some(media) => Err(StashError::InvalidInput(format!(
                "blob {} holds {}, not {}",
                blob_id, media, claimed
            ))),
            None => Err(StashError::UnsupportedMediaType(
                recorded.map_or_else(|| "unknown".to_owned(), |t| t.as_str().to_owned()),
            )),
        }
    }

    /// Deletes a file and every favorite marker pointing at it.
    ///
    /// The referenced blob is left in place.
    pub fn delete_file(&self, caller: &impl IdentityProvider, file_id: &FileId) -> StashResult<()> {
        let identity = caller.current_identity();

        let (file, removed_favorites) = self.store.transaction(|tables| {
            let (_, file) = access::check_file(tables, identity.as_ref(), file_id).into_result()?;
            tables.delete_file(&file.id);
            let removed = tables.delete_favorites_for_file(&file.id);
            Ok((file, removed))
        })?;

        tracing::info!(file_id = %file.id, scope = %file.scope, removed_favorites, "file deleted");
        Ok(())
    }

    /// Flips the caller's favorite marker on a file and returns the new state.
    pub fn toggle_favorite(
        &self,
        caller: &impl IdentityProvider,
        file_id: &FileId,
    ) -> StashResult<FavoriteState> {
        let identity = caller.current_identity();

        self.store.transaction(|tables| {
            let (user, file) = access::check_file(tables, identity.as_ref(), file_id).into_result()?;

            let existing = tables
                .favorite(&user.id, &file.scope, &file.id)
                .map(|favorite| favorite.id);
            let state = match existing {
                Some(favorite_id) => {
                    tables.delete_favorite(&favorite_id);
                    FavoriteState::Unfavorited
                }
                None => {
                    tables.insert_favorite(user.id, file.scope, file.id);
                    FavoriteState::Favorited
                }
            };
            tracing::debug!(file_id = %file.id, user_id = %user.id, ?state, "favorite toggled");
            Ok(state)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::scope::OrgId;
    use crate::services::fixtures::{harness, Harness};
    use crate::services::FileFilter;
    use stash_blobs::ShardableUuid;
    use std::thread;

    fn org(id: &str) -> Scope {
        Scope::Organization(OrgId::new(id).unwrap())
    }

    /// Uploads a blob matching `media_type` and describes a file over it.
    fn new_file(h: &Harness, name: &str, scope: &Scope, media_type: &str) -> NewFile {
        let content_type = match media_type {
            "image" => "image/png",
            "pdf" => "application/pdf",
            "csv" => "text/csv",
            other => other,
        };
        NewFile {
            name: name.into(),
            scope: scope.clone(),
            blob_id: h.stored_blob(content_type),
            media_type: media_type.into(),
        }
    }

    fn list(h: &Harness, caller: &Identity, scope: &Scope) -> Vec<File> {
        h.services
            .queries
            .get_files(caller, scope, &FileFilter::new())
            .unwrap()
    }

    #[test]
    fn test_create_file_accepts_kind_names_and_content_types() {
        let h = harness();
        let (alice, user) = h.sign_in("issuer|alice");
        let scope = user.personal_scope();
        let mutations = &h.services.mutations;

        let png = mutations
            .create_file(&alice, new_file(&h, "scan.png", &scope, "image/png"))
            .unwrap();
        let pdf = mutations
            .create_file(&alice, new_file(&h, "form.pdf", &scope, "pdf"))
            .unwrap();
        let csv = mutations
            .create_file(&alice, new_file(&h, "data.csv", &scope, "text/csv; charset=utf-8"))
            .unwrap();

        assert_eq!(png.media_type, MediaType::Image);
        assert_eq!(pdf.media_type, MediaType::Pdf);
        assert_eq!(csv.media_type, MediaType::Csv);
        assert_eq!(list(&h, &alice, &scope).len(), 3);
    }

    #[test]
    fn test_create_file_unsupported_media_type_persists_nothing() {
        let h = harness();
        let (alice, user) = h.sign_in("issuer|alice");
        let scope = user.personal_scope();

        let result = h
            .services
            .mutations
            .create_file(&alice, new_file(&h, "notes.docx", &scope, "application/msword"));

        assert!(matches!(result, Err(StashError::UnsupportedMediaType(_))));
        assert!(list(&h, &alice, &scope).is_empty());
    }

    #[test]
    fn test_create_file_rejects_blank_name() {
        let h = harness();
        let (alice, user) = h.sign_in("issuer|alice");

        let result = h
            .services
            .mutations
            .create_file(&alice, new_file(&h, "   ", &user.personal_scope(), "csv"));

        assert!(matches!(result, Err(StashError::InvalidInput(_))));
    }

    #[test]
    fn test_create_file_requires_access_to_scope() {
        let h = harness();
        let (alice, _) = h.sign_in("issuer|alice");
        let (_, bob_user) = h.sign_in("issuer|bob");
        let mutations = &h.services.mutations;

        assert!(matches!(
            mutations.create_file(&alice, new_file(&h, "a.csv", &org("org_acme"), "csv")),
            Err(StashError::Forbidden)
        ));
        assert!(matches!(
            mutations.create_file(&alice, new_file(&h, "a.csv", &bob_user.personal_scope(), "csv")),
            Err(StashError::Forbidden)
        ));

        let nobody: Option<Identity> = None;
        assert!(matches!(
            mutations.create_file(&nobody, new_file(&h, "a.csv", &org("org_acme"), "csv")),
            Err(StashError::Unauthenticated)
        ));
    }

    #[test]
    fn test_personal_scope_lifecycle_without_memberships() {
        let h = harness();
        let (alice, user) = h.sign_in("issuer|alice");
        let scope = user.personal_scope();
        let mutations = &h.services.mutations;

        let file = mutations
            .create_file(&alice, new_file(&h, "taxes.pdf", &scope, "pdf"))
            .unwrap();
        assert_eq!(list(&h, &alice, &scope), vec![file.clone()]);

        mutations.delete_file(&alice, &file.id).unwrap();
        assert!(list(&h, &alice, &scope).is_empty());
        assert!(matches!(
            mutations.delete_file(&alice, &file.id),
            Err(StashError::FileNotFound(id)) if id == file.id
        ));
    }

    #[test]
    fn test_delete_file_of_other_organization_is_forbidden() {
        let h = harness();
        let (alice, _) = h.sign_in("issuer|alice");
        let (bob, _) = h.sign_in("issuer|bob");
        h.join("issuer|alice", "org_acme");
        h.join("issuer|bob", "org_globex");
        let file = h
            .services
            .mutations
            .create_file(&alice, new_file(&h, "Report.csv", &org("org_acme"), "csv"))
            .unwrap();

        assert!(matches!(
            h.services.mutations.delete_file(&bob, &file.id),
            Err(StashError::Forbidden)
        ));
        assert_eq!(list(&h, &alice, &org("org_acme")), vec![file]);
    }

    #[test]
    fn test_delete_file_removes_favorite_markers() {
        let h = harness();
        let (alice, _) = h.sign_in("issuer|alice");
        let (bob, _) = h.sign_in("issuer|bob");
        h.join("issuer|alice", "org_acme");
        h.join("issuer|bob", "org_acme");
        let mutations = &h.services.mutations;
        let file = mutations
            .create_file(&alice, new_file(&h, "Report.csv", &org("org_acme"), "csv"))
            .unwrap();
        mutations.toggle_favorite(&alice, &file.id).unwrap();
        mutations.toggle_favorite(&bob, &file.id).unwrap();

        mutations.delete_file(&bob, &file.id).unwrap();

        let queries = &h.services.queries;
        assert!(queries.get_all_favorites(&alice, &org("org_acme")).unwrap().is_empty());
        assert!(queries.get_all_favorites(&bob, &org("org_acme")).unwrap().is_empty());
    }

    #[test]
    fn test_toggle_favorite_twice_restores_state() {
        let h = harness();
        let (alice, _) = h.sign_in("issuer|alice");
        h.join("issuer|alice", "org_acme");
        let mutations = &h.services.mutations;
        let file = mutations
            .create_file(&alice, new_file(&h, "Report.csv", &org("org_acme"), "csv"))
            .unwrap();

        let before = h
            .services
            .queries
            .get_all_favorites(&alice, &org("org_acme"))
            .unwrap();
        assert_eq!(
            mutations.toggle_favorite(&alice, &file.id).unwrap(),
            FavoriteState::Favorited
        );
        assert_eq!(
            mutations.toggle_favorite(&alice, &file.id).unwrap(),
            FavoriteState::Unfavorited
        );
        let after = h
            .services
            .queries
            .get_all_favorites(&alice, &org("org_acme"))
            .unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_toggle_favorite_rejects_missing_and_foreign_files() {
        let h = harness();
        let (alice, _) = h.sign_in("issuer|alice");
        let (bob, bob_user) = h.sign_in("issuer|bob");
        let mutations = &h.services.mutations;
        let private = mutations
            .create_file(&bob, new_file(&h, "diary.pdf", &bob_user.personal_scope(), "pdf"))
            .unwrap();

        assert!(matches!(
            mutations.toggle_favorite(&alice, &private.id),
            Err(StashError::Forbidden)
        ));
        let missing = FileId::new();
        assert!(matches!(
            mutations.toggle_favorite(&alice, &missing),
            Err(StashError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_generate_upload_url_requires_identity() {
        let h = harness();
        let (alice, _) = h.sign_in("issuer|alice");

        let url = h.services.mutations.generate_upload_url(&alice).unwrap();
        assert!(url.starts_with("http://localhost:3000/blobs/upload/"));

        let nobody: Option<Identity> = None;
        assert!(matches!(
            h.services.mutations.generate_upload_url(&nobody),
            Err(StashError::Unauthenticated)
        ));
    }

    #[test]
    fn test_create_file_rejects_missing_blob() {
        let h = harness();
        let (alice, user) = h.sign_in("issuer|alice");
        let scope = user.personal_scope();
        let missing = ShardableUuid::new();

        let result = h.services.mutations.create_file(
            &alice,
            NewFile {
                name: "ghost.pdf".into(),
                scope: scope.clone(),
                blob_id: missing,
                media_type: "pdf".into(),
            },
        );

        assert!(matches!(result, Err(StashError::BlobNotFound(id)) if id == missing));
        assert!(list(&h, &alice, &scope).is_empty());
    }

    #[test]
    fn test_create_file_media_type_must_match_blob() {
        let h = harness();
        let (alice, user) = h.sign_in("issuer|alice");
        let scope = user.personal_scope();
        let mutations = &h.services.mutations;
        let csv_blob = h.stored_blob("text/csv");

        let claimed_pdf = NewFile {
            name: "report.pdf".into(),
            scope: scope.clone(),
            blob_id: csv_blob,
            media_type: "application/pdf".into(),
        };
        assert!(matches!(
            mutations.create_file(&alice, claimed_pdf),
            Err(StashError::InvalidInput(_))
        ));

        let untyped = NewFile {
            name: "notes.csv".into(),
            scope: scope.clone(),
            blob_id: h.stored_blob("text/plain"),
            media_type: "csv".into(),
        };
        assert!(matches!(
            mutations.create_file(&alice, untyped),
            Err(StashError::UnsupportedMediaType(_))
        ));
        assert!(list(&h, &alice, &scope).is_empty());
    }

    #[test]
    fn test_concurrent_toggles_leave_consistent_marker() {
        let h = harness();
        let (alice, _) = h.sign_in("issuer|alice");
        h.join("issuer|alice", "org_acme");
        let file = h
            .services
            .mutations
            .create_file(&alice, new_file(&h, "Report.csv", &org("org_acme"), "csv"))
            .unwrap();

        for threads in [8, 7] {
            thread::scope(|s| {
                for _ in 0..threads {
                    let mutations = h.services.mutations.clone();
                    let (alice, file_id) = (alice.clone(), file.id);
                    s.spawn(move || mutations.toggle_favorite(&alice, &file_id).unwrap());
                }
            });

            let favorites = h
                .services
                .queries
                .get_all_favorites(&alice, &org("org_acme"))
                .unwrap();
            assert_eq!(favorites.len(), threads % 2, "after {} toggles", threads);
        }
    }
}
