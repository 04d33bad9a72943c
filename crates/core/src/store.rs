//! In-memory document store.
//!
//! [`MemoryStore`] keeps users, files and favorites in [`Tables`] with equality indexes for every
//! lookup the services make (`by_token`, `by_scope`, `by_owner`, `by_file`). There are no range
//! scans.
//!
//! ## Transactions
//!
//! Readers share an `RwLock`. A write transaction holds the exclusive lock and writes to the live
//! tables while journaling an undo entry for every change. When the closure returns `Err` the
//! journal is replayed in reverse, so a failed mutation leaves nothing behind. Authorization
//! checks made inside the closure see the same snapshot as the writes that follow them.

use crate::model::{Favorite, FavoriteId, File, FileId, Membership, User, UserId};
use crate::scope::Scope;
use crate::{StashError, StashResult};
use stash_types::NonEmptyText;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

/// Inverse of one write, recorded while a transaction is open.
#[derive(Debug)]
enum Undo {
    InsertUser(UserId),
    AppendMembership(UserId),
    InsertFile(FileId),
    DeleteFile {
        file: File,
        scope_position: usize,
    },
    InsertFavorite(FavoriteId),
    DeleteFavorite {
        favorite: Favorite,
        owner_position: usize,
        file_position: usize,
    },
}

#[derive(Debug, Default)]
pub struct Tables {
    users: HashMap<UserId, User>,
    users_by_token: HashMap<String, UserId>,

    files: HashMap<FileId, File>,
    files_by_scope: HashMap<Scope, Vec<FileId>>,

    favorites: HashMap<FavoriteId, Favorite>,
    favorites_by_owner: HashMap<(UserId, Scope), Vec<FavoriteId>>,
    favorites_by_file: HashMap<FileId, Vec<FavoriteId>>,

    /// `Some` while a transaction is open.
    journal: Option<Vec<Undo>>,
}

impl Tables {
    // ------------------------------------------------------------------
    // users
    // ------------------------------------------------------------------

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    pub fn user_by_token(&self, token_identifier: &str) -> Option<&User> {
        self.users_by_token
            .get(token_identifier)
            .and_then(|id| self.users.get(id))
    }

    pub fn insert_user(&mut self, token_identifier: NonEmptyText) -> User {
        let user = User {
            id: UserId::new(),
            token_identifier,
            memberships: Vec::new(),
        };
        self.users_by_token
            .insert(user.token_identifier.as_str().to_owned(), user.id);
        self.users.insert(user.id, user.clone());
        self.record(Undo::InsertUser(user.id));
        user
    }

    /// Appends a membership unless the user already belongs to that organization.
    ///
    /// Returns the patched user, or `None` if no such user exists.
    pub fn append_membership(&mut self, user_id: &UserId, membership: Membership) -> Option<&User> {
        let user = self.users.get_mut(user_id)?;
        if !user.is_member_of(&membership.org_id) {
            user.memberships.push(membership);
            self.record(Undo::AppendMembership(*user_id));
        }
        self.users.get(user_id)
    }

    // ------------------------------------------------------------------
    // files
    // ------------------------------------------------------------------

    pub fn file(&self, id: &FileId) -> Option<&File> {
        self.files.get(id)
    }

    /// Files owned by `scope`, in insertion order.
    pub fn files_by_scope<'a>(&'a self, scope: &Scope) -> impl Iterator<Item = &'a File> + 'a {
        self.files_by_scope
            .get(scope)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.files.get(id))
    }

    pub fn insert_file(&mut self, file: File) {
        self.files_by_scope
            .entry(file.scope.clone())
            .or_default()
            .push(file.id);
        self.record(Undo::InsertFile(file.id));
        self.files.insert(file.id, file);
    }

    pub fn delete_file(&mut self, id: &FileId) -> Option<File> {
        let file = self.files.remove(id)?;
        let scope_position = remove_from_index(&mut self.files_by_scope, &file.scope, id);
        self.record(Undo::DeleteFile {
            file: file.clone(),
            scope_position: scope_position.unwrap_or(usize::MAX),
        });
        Some(file)
    }

    // ------------------------------------------------------------------
    // favorites
    // ------------------------------------------------------------------

    /// Favorites `user_id` holds within `scope`, in insertion order.
    pub fn favorites_by_owner<'a>(
        &'a self,
        user_id: &UserId,
        scope: &Scope,
    ) -> impl Iterator<Item = &'a Favorite> + 'a {
        self.favorites_by_owner
            .get(&(*user_id, scope.clone()))
            .into_iter()
            .flatten()
            .filter_map(move |id| self.favorites.get(id))
    }

    pub fn favorite(&self, user_id: &UserId, scope: &Scope, file_id: &FileId) -> Option<&Favorite> {
        self.favorites_by_owner(user_id, scope)
            .find(|favorite| &favorite.file_id == file_id)
    }

    pub fn insert_favorite(&mut self, user_id: UserId, scope: Scope, file_id: FileId) -> Favorite {
        let favorite = Favorite {
            id: FavoriteId::new(),
            user_id,
            scope,
            file_id,
        };
        self.favorites_by_owner
            .entry((favorite.user_id, favorite.scope.clone()))
            .or_default()
            .push(favorite.id);
        self.favorites_by_file
            .entry(favorite.file_id)
            .or_default()
            .push(favorite.id);
        self.favorites.insert(favorite.id, favorite.clone());
        self.record(Undo::InsertFavorite(favorite.id));
        favorite
    }

    pub fn delete_favorite(&mut self, id: &FavoriteId) -> Option<Favorite> {
        let favorite = self.favorites.remove(id)?;
        let owner_position = remove_from_index(
            &mut self.favorites_by_owner,
            &(favorite.user_id, favorite.scope.clone()),
            id,
        );
        let file_position = remove_from_index(&mut self.favorites_by_file, &favorite.file_id, id);
        self.record(Undo::DeleteFavorite {
            favorite: favorite.clone(),
            owner_position: owner_position.unwrap_or(usize::MAX),
            file_position: file_position.unwrap_or(usize::MAX),
        });
        Some(favorite)
    }

    /// Deletes every favorite pointing at `file_id` and returns how many were removed.
    pub fn delete_favorites_for_file(&mut self, file_id: &FileId) -> usize {
        let ids = self
            .favorites_by_file
            .get(file_id)
            .cloned()
            .unwrap_or_default();
        ids.iter()
            .filter(|id| self.delete_favorite(id).is_some())
            .count()
    }

    // ------------------------------------------------------------------
    // journal
    // ------------------------------------------------------------------

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(undo);
        }
    }

    fn begin(&mut self) {
        self.journal = Some(Vec::new());
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    /// Reverts every write journaled since [`Tables::begin`], newest first.
    fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };

        for undo in journal.into_iter().rev() {
            match undo {
                Undo::InsertUser(id) => {
                    if let Some(user) = self.users.remove(&id) {
                        self.users_by_token.remove(user.token_identifier.as_str());
                    }
                }
                Undo::AppendMembership(id) => {
                    if let Some(user) = self.users.get_mut(&id) {
                        user.memberships.pop();
                    }
                }
                Undo::InsertFile(id) => {
                    if let Some(file) = self.files.remove(&id) {
                        remove_from_index(&mut self.files_by_scope, &file.scope, &id);
                    }
                }
                Undo::DeleteFile {
                    file,
                    scope_position,
                } => {
                    insert_into_index(
                        &mut self.files_by_scope,
                        file.scope.clone(),
                        scope_position,
                        file.id,
                    );
                    self.files.insert(file.id, file);
                }
                Undo::InsertFavorite(id) => {
                    if let Some(favorite) = self.favorites.remove(&id) {
                        remove_from_index(
                            &mut self.favorites_by_owner,
                            &(favorite.user_id, favorite.scope),
                            &id,
                        );
                        remove_from_index(&mut self.favorites_by_file, &favorite.file_id, &id);
                    }
                }
                Undo::DeleteFavorite {
                    favorite,
                    owner_position,
                    file_position,
                } => {
                    insert_into_index(
                        &mut self.favorites_by_owner,
                        (favorite.user_id, favorite.scope.clone()),
                        owner_position,
                        favorite.id,
                    );
                    insert_into_index(
                        &mut self.favorites_by_file,
                        favorite.file_id,
                        file_position,
                        favorite.id,
                    );
                    self.favorites.insert(favorite.id, favorite);
                }
            }
        }
    }
}

/// Removes `value` from the list under `key` and returns where it was.
fn remove_from_index<K, V>(index: &mut HashMap<K, Vec<V>>, key: &K, value: &V) -> Option<usize>
where
    K: Eq + Hash,
    V: PartialEq,
{
    let values = index.get_mut(key)?;
    let position = values.iter().position(|v| v == value)?;
    values.remove(position);
    if values.is_empty() {
        index.remove(key);
    }
    Some(position)
}

fn insert_into_index<K, V>(index: &mut HashMap<K, Vec<V>>, key: K, position: usize, value: V)
where
    K: Eq + Hash,
{
    let values = index.entry(key).or_default();
    let position = position.min(values.len());
    values.insert(position, value);
}

/// Thread-safe store with snapshot reads and all-or-nothing write transactions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a consistent read snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> StashResult<R> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StashError::StoreUnavailable)?;
        Ok(f(&tables))
    }

    /// Runs `f` as a single transaction.
    ///
    /// Changes made by `f` stay only if it returns `Ok`; on `Err` they are undone before the
    /// lock is released.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Tables) -> StashResult<R>) -> StashResult<R> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StashError::StoreUnavailable)?;

        tables.begin();
        match f(&mut tables) {
            Ok(out) => {
                tables.commit();
                Ok(out)
            }
            Err(e) => {
                tables.rollback();
                Err(e)
            }
        }
    }
}
