use crate::models::{
    Author, CreateAuthorError, CreateAuthorRequest, DeleteAuthorError, DeleteAuthorRequest,
    FindAllAuthorsError, FindAuthorError, FindAuthorRequest, UpdateAuthorError, UpdateAuthorRequest,
};
use async_trait::async_trait;

/// Persistent storage of authors. The store is the system of record.
///
/// Implementations reject a create or update that would give two authors the
/// same first name, last name and patronymic with a `Duplicate` error, even
/// when two such writes race each other.
#[async_trait]
pub trait AuthorRepository: Send + Sync + 'static {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError>;

    async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError>;

    /// All authors ordered by id.
    async fn find_all_authors(&self) -> Result<Vec<Author>, FindAllAuthorsError>;

    /// Writes only the fields supplied in `req` and returns the stored result.
    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<Author, UpdateAuthorError>;

    async fn delete_author(&self, req: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError>;
}
