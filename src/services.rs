use crate::cache::{AUTHORS_KEY, CacheStore, author_key};
use crate::models::{
    Author, CreateAuthorError, CreateAuthorRequest, DeleteAuthorError, DeleteAuthorRequest,
    FindAuthorError, FindAuthorRequest, LifeDates, ListAuthorsError, ListAuthorsRequest,
    UpdateAuthorError, UpdateAuthorRequest,
};
use crate::repositories::AuthorRepository;
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Author use cases on top of a repository and a cache.
///
/// Reads go to the cache first and fill it on a miss. Writes go to the
/// repository and, once committed, evict both the author's own key and the
/// listing key. Cache failures never fail a request: reads fall back to the
/// repository and a failed eviction is left to the entry's ttl.
pub struct AuthorService<R: AuthorRepository> {
    repo: R,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl<R: AuthorRepository> AuthorService<R> {
    pub fn new(repo: R, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { repo, cache, ttl }
    }

    pub async fn create_author(
        &self,
        req: &CreateAuthorRequest,
    ) -> Result<Author, CreateAuthorError> {
        let author = self.repo.create_author(req).await?;
        info!(id = author.id(), "created author");

        self.invalidate(author.id()).await;
        Ok(author)
    }

    pub async fn list_authors(
        &self,
        req: &ListAuthorsRequest,
    ) -> Result<Vec<Author>, ListAuthorsError> {
        let authors = match self.read_cached::<Vec<Author>>(AUTHORS_KEY).await {
            Some(authors) => authors,
            None => {
                let authors = self.repo.find_all_authors().await?;
                if !authors.is_empty() {
                    self.write_cached(AUTHORS_KEY, &authors).await;
                }
                authors
            }
        };

        if authors.is_empty() {
            return Err(ListAuthorsError::Empty);
        }

        Ok(req.apply(&authors))
    }

    pub async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError> {
        let key = author_key(req.id());
        if let Some(author) = self.read_cached(&key).await {
            return Ok(author);
        }

        let author = self.repo.find_author(req).await?;
        self.write_cached(&key, &author).await;
        Ok(author)
    }

    /// Applies the supplied fields after checking the merged record's dates
    /// against `today`. Nothing is written when any check fails.
    pub async fn update_author(
        &self,
        req: &UpdateAuthorRequest,
        today: NaiveDate,
    ) -> Result<Author, UpdateAuthorError> {
        let current = self
            .repo
            .find_author(&FindAuthorRequest::new(req.id()))
            .await?;

        if req.is_empty() {
            return Err(UpdateAuthorError::Empty);
        }

        let merged = req.merge_into(current.profile());
        let dates = merged.life_dates();
        LifeDates::new(dates.birth_date(), dates.death_date(), today)?;

        let author = self.repo.update_author(req).await?;
        info!(id = author.id(), "updated author");

        self.invalidate(author.id()).await;
        Ok(author)
    }

    pub async fn delete_author(&self, req: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError> {
        self.repo.delete_author(req).await?;
        info!(id = req.id(), "deleted author");

        self.invalidate(req.id()).await;
        Ok(())
    }

    async fn read_cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(err) => {
                warn!(key, error = %err, "cache read failed, falling back to the database");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(err) => {
                warn!(key, error = %err, "ignoring undecodable cache entry");
                None
            }
        }
    }

    async fn write_cached<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %err, "failed to encode cache entry");
                return;
            }
        };

        if let Err(err) = self.cache.set(key, raw, self.ttl).await {
            warn!(key, error = %err, "cache write failed");
        }
    }

    async fn invalidate(&self, id: i64) {
        let key = author_key(id);
        if let Err(err) = self.cache.delete(&[key.as_str(), AUTHORS_KEY]).await {
            warn!(id, error = %err, "cache invalidation failed");
        }
    }
}
