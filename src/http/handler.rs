use crate::http::AppState;
use crate::models::{
    Author, AuthorProfile, CreateAuthorError, CreateAuthorRequest, DeleteAuthorError,
    DeleteAuthorRequest, FindAuthorError, FindAuthorRequest, InvalidAuthorError, LifeDates,
    ListAuthorsError, ListAuthorsRequest, PersonName, PhotoPath, UpdateAuthorError,
    UpdateAuthorRequest,
};
use crate::repositories::AuthorRepository;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<T>);

impl<T: Serialize> ApiSuccess<T> {
    pub const fn new(status: StatusCode, data: T) -> Self {
        Self(status, Json(data))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> axum::response::Response {
        (self.0, self.1).into_response()
    }
}

/// Body of every error response and of the delete confirmation.
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    detail: String,
}

impl ApiMessage {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    InternalServerError(String),
    BadRequest(String),
    NotFound(String),
}

impl ApiError {
    fn internal(cause: &anyhow::Error) -> Self {
        error!("{cause:?}");
        Self::InternalServerError("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg) = match self {
            Self::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        (status, Json(ApiMessage::new(msg))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl From<InvalidAuthorError> for ApiError {
    fn from(err: InvalidAuthorError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<CreateAuthorError> for ApiError {
    fn from(err: CreateAuthorError) -> Self {
        match err {
            CreateAuthorError::Duplicate { .. } | CreateAuthorError::Invalid(_) => {
                Self::BadRequest(err.to_string())
            }
            CreateAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindAuthorError> for ApiError {
    fn from(err: FindAuthorError) -> Self {
        match err {
            FindAuthorError::NotFound { .. } => Self::NotFound(err.to_string()),
            FindAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<ListAuthorsError> for ApiError {
    fn from(err: ListAuthorsError) -> Self {
        match err {
            ListAuthorsError::Empty => Self::NotFound(err.to_string()),
            ListAuthorsError::Other(cause) => Self::internal(&cause.0),
        }
    }
}

impl From<UpdateAuthorError> for ApiError {
    fn from(err: UpdateAuthorError) -> Self {
        match err {
            UpdateAuthorError::NotFound { .. } => Self::NotFound(err.to_string()),
            UpdateAuthorError::Empty
            | UpdateAuthorError::Invalid(_)
            | UpdateAuthorError::Duplicate { .. } => Self::BadRequest(err.to_string()),
            UpdateAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<DeleteAuthorError> for ApiError {
    fn from(err: DeleteAuthorError) -> Self {
        match err {
            DeleteAuthorError::NotFound { .. } => Self::NotFound(err.to_string()),
            DeleteAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAuthorHttpRequest {
    first_name: String,
    last_name: String,
    patronymic: Option<String>,
    photo: Option<String>,
    bio: Option<String>,
    birth_date: NaiveDate,
    death_date: Option<NaiveDate>,
}

impl CreateAuthorHttpRequest {
    fn into_domain(self, today: NaiveDate) -> Result<CreateAuthorRequest, InvalidAuthorError> {
        let first_name = PersonName::new(&self.first_name).map_err(InvalidAuthorError::FirstName)?;
        let last_name = PersonName::new(&self.last_name).map_err(InvalidAuthorError::LastName)?;
        let patronymic = self
            .patronymic
            .as_deref()
            .map(PersonName::new)
            .transpose()
            .map_err(InvalidAuthorError::Patronymic)?;
        let photo = self.photo.as_deref().map(PhotoPath::new).transpose()?;
        let life_dates = LifeDates::new(self.birth_date, self.death_date, today)?;

        let profile = AuthorProfile::new(first_name, last_name, life_dates)
            .with_patronymic(patronymic)
            .with_photo(photo)
            .with_bio(self.bio);
        Ok(CreateAuthorRequest::new(profile))
    }
}

/// Every field is optional; `null` and a missing field both leave the stored
/// value untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateAuthorHttpRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    patronymic: Option<String>,
    photo: Option<String>,
    bio: Option<String>,
    birth_date: Option<NaiveDate>,
    death_date: Option<NaiveDate>,
}

impl UpdateAuthorHttpRequest {
    fn into_domain(self, id: i64) -> Result<UpdateAuthorRequest, InvalidAuthorError> {
        let mut req = UpdateAuthorRequest::new(id);

        if let Some(first_name) = self.first_name {
            req.set_first_name(
                PersonName::new(&first_name).map_err(InvalidAuthorError::FirstName)?,
            );
        }
        if let Some(last_name) = self.last_name {
            req.set_last_name(PersonName::new(&last_name).map_err(InvalidAuthorError::LastName)?);
        }
        if let Some(patronymic) = self.patronymic {
            req.set_patronymic(
                PersonName::new(&patronymic).map_err(InvalidAuthorError::Patronymic)?,
            );
        }
        if let Some(photo) = self.photo {
            req.set_photo(PhotoPath::new(&photo)?);
        }
        if let Some(bio) = self.bio {
            req.set_bio(bio);
        }
        if let Some(birth_date) = self.birth_date {
            req.set_birth_date(birth_date);
        }
        if let Some(death_date) = self.death_date {
            req.set_death_date(death_date);
        }

        Ok(req)
    }
}

#[derive(Debug, Deserialize)]
pub struct ListAuthorsHttpParams {
    skip: Option<usize>,
    limit: Option<usize>,
}

impl From<ListAuthorsHttpParams> for ListAuthorsRequest {
    fn from(value: ListAuthorsHttpParams) -> Self {
        Self::new(value.skip.unwrap_or_default(), value.limit)
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorHttpResponse {
    id: i64,
    first_name: String,
    last_name: String,
    patronymic: Option<String>,
    photo: Option<String>,
    bio: Option<String>,
    birth_date: NaiveDate,
    death_date: Option<NaiveDate>,
    full_name: String,
}

impl From<&Author> for AuthorHttpResponse {
    fn from(value: &Author) -> Self {
        let profile = value.profile();
        Self {
            id: value.id(),
            first_name: profile.first_name().to_string(),
            last_name: profile.last_name().to_string(),
            patronymic: profile.patronymic().map(ToString::to_string),
            photo: profile.photo().map(ToString::to_string),
            bio: profile.bio().map(ToString::to_string),
            birth_date: profile.life_dates().birth_date(),
            death_date: profile.life_dates().death_date(),
            full_name: value.full_name(),
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn create_author<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
    body: Result<Json<CreateAuthorHttpRequest>, JsonRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let Json(body) = body?;
    let req = body.into_domain(today())?;
    state
        .author_service
        .create_author(&req)
        .await
        .map_err(ApiError::from)
        .map(|author| ApiSuccess::new(StatusCode::OK, (&author).into()))
}

pub async fn list_authors<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
    params: Result<Query<ListAuthorsHttpParams>, QueryRejection>,
) -> Result<ApiSuccess<Vec<AuthorHttpResponse>>, ApiError> {
    let Query(params) = params?;
    let req = ListAuthorsRequest::from(params);
    state
        .author_service
        .list_authors(&req)
        .await
        .map_err(ApiError::from)
        .map(|authors| {
            let body = authors.iter().map(AuthorHttpResponse::from).collect();
            ApiSuccess::new(StatusCode::OK, body)
        })
}

pub async fn find_author<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let Path(id) = id?;
    state
        .author_service
        .find_author(&FindAuthorRequest::new(id))
        .await
        .map_err(ApiError::from)
        .map(|author| ApiSuccess::new(StatusCode::OK, (&author).into()))
}

pub async fn update_author<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateAuthorHttpRequest>, JsonRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    let req = body.into_domain(id)?;
    state
        .author_service
        .update_author(&req, today())
        .await
        .map_err(ApiError::from)
        .map(|author| ApiSuccess::new(StatusCode::OK, (&author).into()))
}

pub async fn delete_author<AR: AuthorRepository>(
    State(state): State<AppState<AR>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiSuccess<ApiMessage>, ApiError> {
    let Path(id) = id?;
    state
        .author_service
        .delete_author(&DeleteAuthorRequest::new(id))
        .await
        .map_err(ApiError::from)
        .map(|()| ApiSuccess::new(StatusCode::OK, ApiMessage::new("Author deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LifeDatesError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn chekhov_body() -> CreateAuthorHttpRequest {
        CreateAuthorHttpRequest {
            first_name: " Anton ".into(),
            last_name: "Chekhov".into(),
            patronymic: None,
            photo: None,
            bio: None,
            birth_date: date(1860, 1, 29),
            death_date: Some(date(1904, 7, 15)),
        }
    }

    #[test]
    fn create_body_becomes_trimmed_profile() {
        let req = chekhov_body().into_domain(date(2024, 1, 1)).unwrap();
        assert_eq!(req.profile().first_name().as_str(), "Anton");
        assert_eq!(req.profile().full_name(), "Chekhov Anton");
    }

    #[test]
    fn create_body_errors_name_the_field() {
        let mut body = chekhov_body();
        body.patronymic = Some("P".into());
        let err = body.into_domain(date(2024, 1, 1)).unwrap_err();
        assert_eq!(err.field(), "patronymic");

        let mut body = chekhov_body();
        body.photo = Some("x".repeat(256));
        let err = body.into_domain(date(2024, 1, 1)).unwrap_err();
        assert_eq!(err.field(), "photo");

        let mut body = chekhov_body();
        body.death_date = Some(date(1850, 1, 1));
        let err = body.into_domain(date(2024, 1, 1)).unwrap_err();
        assert_eq!(err.field(), "death_date");
    }

    #[test]
    fn update_body_with_only_nulls_is_empty() {
        let body: UpdateAuthorHttpRequest =
            serde_json::from_str(r#"{"first_name": null, "bio": null}"#).unwrap();
        assert!(body.into_domain(1).unwrap().is_empty());
    }

    #[test]
    fn update_body_rejects_short_last_name() {
        let body: UpdateAuthorHttpRequest =
            serde_json::from_str(r#"{"last_name": "C"}"#).unwrap();
        let err = body.into_domain(1).unwrap_err();
        assert_eq!(err.field(), "last_name");
    }

    #[test]
    fn create_date_rejection_is_a_bad_request() {
        let err = CreateAuthorError::Invalid(LifeDatesError::DeathBeforeBirth {
            birth_date: date(1904, 7, 15),
            death_date: date(1860, 1, 29),
        });
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn response_serializes_dates_and_full_name() {
        let req = chekhov_body().into_domain(date(2024, 1, 1)).unwrap();
        let author = Author::new(3, req.profile().clone());
        let json = serde_json::to_value(AuthorHttpResponse::from(&author)).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["birth_date"], "1860-01-29");
        assert_eq!(json["death_date"], "1904-07-15");
        assert_eq!(json["patronymic"], serde_json::Value::Null);
        assert_eq!(json["full_name"], "Chekhov Anton");
    }
}
