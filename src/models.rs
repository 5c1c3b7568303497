use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const PHOTO_MAX_CHARS: usize = 255;

/// A first name, last name or patronymic.
///
/// Surrounding whitespace is dropped; the remaining text must be between
/// [`NAME_MIN_CHARS`] and [`NAME_MAX_CHARS`] characters long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonName(String);

impl PersonName {
    pub fn new(raw: &str) -> Result<Self, PersonNameError> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if len < NAME_MIN_CHARS {
            Err(PersonNameError::TooShort { len })
        } else if len > NAME_MAX_CHARS {
            Err(PersonNameError::TooLong { len })
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PersonName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersonNameError {
    #[error("must be at least 2 characters long, got {len}")]
    TooShort { len: usize },
    #[error("must be at most 100 characters long, got {len}")]
    TooLong { len: usize },
}

/// Location of an author's portrait, usually a URL or a relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoPath(String);

impl PhotoPath {
    pub fn new(raw: &str) -> Result<Self, PhotoPathTooLongError> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if len > PHOTO_MAX_CHARS {
            Err(PhotoPathTooLongError { len })
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhotoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("must be at most 255 characters long, got {len}")]
pub struct PhotoPathTooLongError {
    len: usize,
}

/// Birth and optional death date of an author.
///
/// The birth date never lies after the day of validation and the death date,
/// when known, never precedes the birth date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeDates {
    birth_date: NaiveDate,
    death_date: Option<NaiveDate>,
}

impl LifeDates {
    pub fn new(
        birth_date: NaiveDate,
        death_date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, LifeDatesError> {
        if birth_date > today {
            return Err(LifeDatesError::BirthInFuture { birth_date, today });
        }
        if let Some(death_date) = death_date {
            if death_date < birth_date {
                return Err(LifeDatesError::DeathBeforeBirth {
                    birth_date,
                    death_date,
                });
            }
        }

        Ok(Self {
            birth_date,
            death_date,
        })
    }

    pub const fn new_unchecked(birth_date: NaiveDate, death_date: Option<NaiveDate>) -> Self {
        Self {
            birth_date,
            death_date,
        }
    }

    pub const fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    pub const fn death_date(&self) -> Option<NaiveDate> {
        self.death_date
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifeDatesError {
    #[error("birth_date {birth_date} cannot be later than today ({today})")]
    BirthInFuture {
        birth_date: NaiveDate,
        today: NaiveDate,
    },
    #[error("death_date {death_date} cannot precede birth_date {birth_date}")]
    DeathBeforeBirth {
        birth_date: NaiveDate,
        death_date: NaiveDate,
    },
}

impl LifeDatesError {
    pub const fn field(&self) -> &'static str {
        match self {
            Self::BirthInFuture { .. } => "birth_date",
            Self::DeathBeforeBirth { .. } => "death_date",
        }
    }
}

/// A field of an author payload that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidAuthorError {
    #[error("first_name {0}")]
    FirstName(PersonNameError),
    #[error("last_name {0}")]
    LastName(PersonNameError),
    #[error("patronymic {0}")]
    Patronymic(PersonNameError),
    #[error("photo {0}")]
    Photo(#[from] PhotoPathTooLongError),
    #[error(transparent)]
    Dates(#[from] LifeDatesError),
}

impl InvalidAuthorError {
    pub const fn field(&self) -> &'static str {
        match self {
            Self::FirstName(_) => "first_name",
            Self::LastName(_) => "last_name",
            Self::Patronymic(_) => "patronymic",
            Self::Photo(_) => "photo",
            Self::Dates(err) => err.field(),
        }
    }
}

/// Everything stored about an author apart from the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorProfile {
    first_name: PersonName,
    last_name: PersonName,
    patronymic: Option<PersonName>,
    photo: Option<PhotoPath>,
    bio: Option<String>,
    life_dates: LifeDates,
}

impl AuthorProfile {
    pub const fn new(first_name: PersonName, last_name: PersonName, life_dates: LifeDates) -> Self {
        Self {
            first_name,
            last_name,
            patronymic: None,
            photo: None,
            bio: None,
            life_dates,
        }
    }

    #[must_use]
    pub fn with_patronymic(mut self, patronymic: Option<PersonName>) -> Self {
        self.patronymic = patronymic;
        self
    }

    #[must_use]
    pub fn with_photo(mut self, photo: Option<PhotoPath>) -> Self {
        self.photo = photo;
        self
    }

    #[must_use]
    pub fn with_bio(mut self, bio: Option<String>) -> Self {
        self.bio = bio;
        self
    }

    pub const fn first_name(&self) -> &PersonName {
        &self.first_name
    }

    pub const fn last_name(&self) -> &PersonName {
        &self.last_name
    }

    pub const fn patronymic(&self) -> Option<&PersonName> {
        self.patronymic.as_ref()
    }

    pub const fn photo(&self) -> Option<&PhotoPath> {
        self.photo.as_ref()
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub const fn life_dates(&self) -> &LifeDates {
        &self.life_dates
    }

    /// "last first patronymic", or "last first" when there is no patronymic.
    pub fn full_name(&self) -> String {
        match &self.patronymic {
            Some(patronymic) => format!("{} {} {}", self.last_name, self.first_name, patronymic),
            None => format!("{} {}", self.last_name, self.first_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    id: i64,
    profile: AuthorProfile,
}

impl Author {
    pub const fn new(id: i64, profile: AuthorProfile) -> Self {
        Self { id, profile }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn profile(&self) -> &AuthorProfile {
        &self.profile
    }

    pub fn full_name(&self) -> String {
        self.profile.full_name()
    }
}

#[derive(Debug)]
pub struct CreateAuthorRequest {
    profile: AuthorProfile,
}

impl CreateAuthorRequest {
    pub const fn new(profile: AuthorProfile) -> Self {
        Self { profile }
    }

    pub const fn profile(&self) -> &AuthorProfile {
        &self.profile
    }
}

#[derive(Error, Debug)]
pub enum CreateAuthorError {
    #[error("Author \"{name}\" already exists")]
    Duplicate { name: String },
    #[error(transparent)]
    Invalid(#[from] LifeDatesError),
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct FindAuthorRequest {
    id: i64,
}

impl FindAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum FindAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct FindAllAuthorsError(#[from] pub anyhow::Error);

/// A window over the author listing. The default window covers every author.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListAuthorsRequest {
    skip: usize,
    limit: Option<usize>,
}

impl ListAuthorsRequest {
    pub const fn new(skip: usize, limit: Option<usize>) -> Self {
        Self { skip, limit }
    }

    pub const fn skip(&self) -> usize {
        self.skip
    }

    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        let window = items.iter().skip(self.skip);
        match self.limit {
            Some(limit) => window.take(limit).cloned().collect(),
            None => window.cloned().collect(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ListAuthorsError {
    #[error("No authors found")]
    Empty,
    #[error(transparent)]
    Other(#[from] FindAllAuthorsError),
}

#[derive(Debug)]
pub struct UpdateAuthorRequest {
    id: i64,
    first_name: Option<PersonName>,
    last_name: Option<PersonName>,
    patronymic: Option<PersonName>,
    photo: Option<PhotoPath>,
    bio: Option<String>,
    birth_date: Option<NaiveDate>,
    death_date: Option<NaiveDate>,
}

impl UpdateAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            patronymic: None,
            photo: None,
            bio: None,
            birth_date: None,
            death_date: None,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn first_name(&self) -> Option<&PersonName> {
        self.first_name.as_ref()
    }

    pub fn set_first_name(&mut self, first_name: PersonName) {
        self.first_name = Some(first_name);
    }

    pub const fn last_name(&self) -> Option<&PersonName> {
        self.last_name.as_ref()
    }

    pub fn set_last_name(&mut self, last_name: PersonName) {
        self.last_name = Some(last_name);
    }

    pub const fn patronymic(&self) -> Option<&PersonName> {
        self.patronymic.as_ref()
    }

    pub fn set_patronymic(&mut self, patronymic: PersonName) {
        self.patronymic = Some(patronymic);
    }

    pub const fn photo(&self) -> Option<&PhotoPath> {
        self.photo.as_ref()
    }

    pub fn set_photo(&mut self, photo: PhotoPath) {
        self.photo = Some(photo);
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub fn set_bio(&mut self, bio: String) {
        self.bio = Some(bio);
    }

    pub const fn birth_date(&self) -> Option<NaiveDate> {
        self.birth_date
    }

    pub fn set_birth_date(&mut self, birth_date: NaiveDate) {
        self.birth_date = Some(birth_date);
    }

    pub const fn death_date(&self) -> Option<NaiveDate> {
        self.death_date
    }

    pub fn set_death_date(&mut self, death_date: NaiveDate) {
        self.death_date = Some(death_date);
    }

    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.patronymic.is_none()
            && self.photo.is_none()
            && self.bio.is_none()
            && self.birth_date.is_none()
            && self.death_date.is_none()
    }

    pub const fn touches_name(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || self.patronymic.is_some()
    }

    /// Overlays the supplied fields on `current`. Dates are not re-validated.
    pub fn merge_into(&self, current: &AuthorProfile) -> AuthorProfile {
        let dates = current.life_dates();
        let life_dates = LifeDates::new_unchecked(
            self.birth_date.unwrap_or(dates.birth_date()),
            self.death_date.or(dates.death_date()),
        );

        AuthorProfile {
            first_name: self.first_name.clone().unwrap_or_else(|| current.first_name.clone()),
            last_name: self.last_name.clone().unwrap_or_else(|| current.last_name.clone()),
            patronymic: self.patronymic.clone().or_else(|| current.patronymic.clone()),
            photo: self.photo.clone().or_else(|| current.photo.clone()),
            bio: self.bio.clone().or_else(|| current.bio.clone()),
            life_dates,
        }
    }
}

#[derive(Error, Debug)]
pub enum UpdateAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error("No fields to update")]
    Empty,
    #[error(transparent)]
    Invalid(#[from] LifeDatesError),
    #[error("Author \"{name}\" already exists")]
    Duplicate { name: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<FindAuthorError> for UpdateAuthorError {
    fn from(err: FindAuthorError) -> Self {
        match err {
            FindAuthorError::NotFound { id } => Self::NotFound { id },
            FindAuthorError::Other(err) => Self::Other(err),
        }
    }
}

#[derive(Debug)]
pub struct DeleteAuthorRequest {
    id: i64,
}

impl DeleteAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum DeleteAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn chekhov() -> AuthorProfile {
        let dates = LifeDates::new(date(1860, 1, 29), Some(date(1904, 7, 15)), date(2024, 1, 1))
            .unwrap();
        AuthorProfile::new(
            PersonName::new("Anton").unwrap(),
            PersonName::new("Chekhov").unwrap(),
            dates,
        )
    }

    #[test]
    fn person_name_is_trimmed() {
        let name = PersonName::new("  Anton ").unwrap();
        assert_eq!(name.as_str(), "Anton");
    }

    #[test]
    fn person_name_counts_characters_not_bytes() {
        assert!(PersonName::new("Юл").is_ok());
        assert_eq!(
            PersonName::new("Ю"),
            Err(PersonNameError::TooShort { len: 1 })
        );
    }

    #[test]
    fn person_name_rejects_blank_and_overlong() {
        assert_eq!(
            PersonName::new("   "),
            Err(PersonNameError::TooShort { len: 0 })
        );
        let long = "a".repeat(NAME_MAX_CHARS + 1);
        assert_eq!(
            PersonName::new(&long),
            Err(PersonNameError::TooLong { len: 101 })
        );
    }

    #[test]
    fn photo_path_limit() {
        assert!(PhotoPath::new(&"p".repeat(PHOTO_MAX_CHARS)).is_ok());
        assert!(PhotoPath::new(&"p".repeat(PHOTO_MAX_CHARS + 1)).is_err());
        assert!(PhotoPath::new("").is_ok());
    }

    #[test]
    fn birth_date_in_future_is_rejected() {
        let today = date(2024, 5, 1);
        let err = LifeDates::new(date(2024, 5, 2), None, today).unwrap_err();
        assert_eq!(err.field(), "birth_date");
        assert!(LifeDates::new(today, None, today).is_ok());
    }

    #[test]
    fn death_before_birth_is_rejected() {
        let err = LifeDates::new(date(1860, 1, 29), Some(date(1850, 1, 1)), date(2024, 1, 1))
            .unwrap_err();
        assert_eq!(err.field(), "death_date");
        assert_eq!(
            err.to_string(),
            "death_date 1850-01-01 cannot precede birth_date 1860-01-29"
        );
    }

    #[test]
    fn same_day_birth_and_death_is_accepted() {
        let day = date(1900, 1, 1);
        assert!(LifeDates::new(day, Some(day), date(2024, 1, 1)).is_ok());
    }

    #[test]
    fn ordering_holds_across_era_and_five_digit_years() {
        let today = date(2024, 1, 1);
        assert!(LifeDates::new(date(-100, 7, 12), Some(date(-44, 3, 15)), today).is_ok());
        assert!(LifeDates::new(date(1860, 1, 29), Some(date(10_000, 1, 1)), today).is_ok());

        let err = LifeDates::new(date(-43, 12, 7), Some(date(-106, 1, 3)), today).unwrap_err();
        assert_eq!(err.field(), "death_date");
    }

    #[test]
    fn full_name_without_patronymic() {
        assert_eq!(chekhov().full_name(), "Chekhov Anton");
    }

    #[test]
    fn full_name_with_patronymic() {
        let profile =
            chekhov().with_patronymic(Some(PersonName::new("Pavlovich").unwrap()));
        assert_eq!(profile.full_name(), "Chekhov Anton Pavlovich");
    }

    #[test]
    fn invalid_author_error_names_the_field() {
        let err = InvalidAuthorError::Patronymic(PersonNameError::TooShort { len: 1 });
        assert_eq!(err.field(), "patronymic");
        assert_eq!(
            err.to_string(),
            "patronymic must be at least 2 characters long, got 1"
        );
    }

    #[test]
    fn merge_keeps_unsupplied_fields() {
        let current = chekhov().with_bio(Some("Playwright".into()));
        let mut req = UpdateAuthorRequest::new(1);
        assert!(req.is_empty());
        req.set_death_date(date(1905, 1, 1));

        let merged = req.merge_into(&current);
        assert!(!req.touches_name());
        assert_eq!(merged.first_name().as_str(), "Anton");
        assert_eq!(merged.bio(), Some("Playwright"));
        assert_eq!(merged.life_dates().birth_date(), date(1860, 1, 29));
        assert_eq!(merged.life_dates().death_date(), Some(date(1905, 1, 1)));
    }

    #[test]
    fn list_window() {
        let items = [1, 2, 3, 4, 5];
        assert_eq!(ListAuthorsRequest::default().apply(&items), vec![1, 2, 3, 4, 5]);
        assert_eq!(ListAuthorsRequest::new(1, Some(2)).apply(&items), vec![2, 3]);
        assert!(ListAuthorsRequest::new(10, None).apply(&items).is_empty());
    }

    fn day_strategy() -> impl Strategy<Value = NaiveDate> {
        (0i64..80_000).prop_map(|offset| date(1800, 1, 1) + chrono::Days::new(offset as u64))
    }

    proptest! {
        #[test]
        fn prop_name_length_bounds(name in "[a-zA-Z]{0,120}") {
            let len = name.chars().count();
            let accepted = PersonName::new(&name).is_ok();
            prop_assert_eq!(accepted, (NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len));
        }

        #[test]
        fn prop_death_before_birth_always_rejected(
            birth in day_strategy(),
            death in day_strategy(),
        ) {
            let today = date(2100, 1, 1);
            let result = LifeDates::new(birth, Some(death), today);
            if death < birth {
                prop_assert!(
                    matches!(result, Err(LifeDatesError::DeathBeforeBirth { .. })),
                    "expected DeathBeforeBirth error"
                );
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn prop_future_birth_always_rejected(today in day_strategy(), ahead in 1u64..10_000) {
            let birth = today + chrono::Days::new(ahead);
            let is_future_error = matches!(
                LifeDates::new(birth, None, today),
                Err(LifeDatesError::BirthInFuture { .. })
            );
            prop_assert!(is_future_error);
        }
    }
}
