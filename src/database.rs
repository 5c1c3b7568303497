use crate::models::{
    Author, AuthorProfile, CreateAuthorError, CreateAuthorRequest, DeleteAuthorError,
    DeleteAuthorRequest, FindAllAuthorsError, FindAuthorError, FindAuthorRequest, LifeDates,
    LifeDatesError, PersonName, PhotoPath, UpdateAuthorError, UpdateAuthorRequest,
};
use crate::repositories::AuthorRepository;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Row, SqlitePool};
use std::str::FromStr;

static MIGRATOR: Migrator = sqlx::migrate!();

/// Opens the pool and applies pending migrations.
///
/// An in-memory database lives only as long as its connection, so
/// `sqlite::memory:` URLs get a single connection that is never recycled.
pub async fn establish_pool(path: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let in_memory = path.contains(":memory:");

    let mut opts = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("Invalid database path {path}"))?
        .foreign_keys(true)
        .create_if_missing(true);
    if !in_memory {
        opts = opts.journal_mode(SqliteJournalMode::Wal);
    }

    let mut pool_opts = SqlitePoolOptions::new().max_connections(max_connections);
    if in_memory {
        pool_opts = pool_opts
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_opts
        .connect_with(opts)
        .await
        .with_context(|| format!("Failed to open database at {path}"))?;

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct DefaultAuthorRepository {
    pool: SqlitePool,
}

impl DefaultAuthorRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Author {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let first_name: String = row.try_get("first_name")?;
        let last_name: String = row.try_get("last_name")?;
        let patronymic: Option<String> = row.try_get("patronymic")?;
        let photo: Option<String> = row.try_get("photo")?;
        let bio: Option<String> = row.try_get("bio")?;
        let birth_date = date_from_day_number("birth_date", row.try_get("birth_date")?)?;
        let death_date = row
            .try_get::<Option<i32>, _>("death_date")?
            .map(|day| date_from_day_number("death_date", day))
            .transpose()?;

        let profile = AuthorProfile::new(
            PersonName::new_unchecked(&first_name),
            PersonName::new_unchecked(&last_name),
            LifeDates::new_unchecked(birth_date, death_date),
        )
        .with_patronymic(patronymic.as_deref().map(PersonName::new_unchecked))
        .with_photo(photo.as_deref().map(PhotoPath::new_unchecked))
        .with_bio(bio);
        Ok(Self::new(id, profile))
    }
}

// Writes run as single autocommit statements. A deferred transaction that
// reads before it writes fails with SQLITE_BUSY_SNAPSHOT when another writer
// commits in between, so the namesake lookup is only a fast path and the
// unique index decides races.
#[async_trait]
impl AuthorRepository for DefaultAuthorRepository {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError> {
        let profile = req.profile();

        if has_namesake(&self.pool, profile, None)
            .await
            .map_err(|err| create_error(err, profile))?
        {
            return Err(CreateAuthorError::Duplicate {
                name: profile.full_name(),
            });
        }

        let dates = profile.life_dates();
        let author = sqlx::query_as(
            "INSERT INTO author \
             (first_name, last_name, patronymic, photo, bio, birth_date, death_date) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(profile.first_name().as_str())
        .bind(profile.last_name().as_str())
        .bind(profile.patronymic().map(PersonName::as_str))
        .bind(profile.photo().map(PhotoPath::as_str))
        .bind(profile.bio())
        .bind(day_number(dates.birth_date()))
        .bind(dates.death_date().map(day_number))
        .fetch_one(&self.pool)
        .await
        .map_err(|err| create_error(err, profile))?;

        Ok(author)
    }

    async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError> {
        let author = sqlx::query_as("SELECT * FROM author WHERE id = ?")
            .bind(req.id())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindAuthorError::NotFound { id: req.id() }
                } else {
                    let err = anyhow!(err).context(format!(
                        r#"Failed to retrieve author with id "{}""#,
                        req.id()
                    ));
                    FindAuthorError::Other(err)
                }
            })?;

        Ok(author)
    }

    async fn find_all_authors(&self) -> Result<Vec<Author>, FindAllAuthorsError> {
        let authors = sqlx::query_as("SELECT * FROM author ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context("Failed to retrieve all authors");
                FindAllAuthorsError(err)
            })?;

        Ok(authors)
    }

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<Author, UpdateAuthorError> {
        let other = |err: sqlx::Error| {
            let err = anyhow!(err).context(format!(
                r#"Failed to update author with id "{}""#,
                req.id()
            ));
            UpdateAuthorError::Other(err)
        };

        if req.is_empty() {
            return Err(UpdateAuthorError::Empty);
        }

        let current: Author = sqlx::query_as("SELECT * FROM author WHERE id = ?")
            .bind(req.id())
            .fetch_optional(&self.pool)
            .await
            .map_err(other)?
            .ok_or(UpdateAuthorError::NotFound { id: req.id() })?;

        let merged = req.merge_into(current.profile());
        if req.touches_name()
            && has_namesake(&self.pool, &merged, Some(req.id()))
                .await
                .map_err(other)?
        {
            return Err(UpdateAuthorError::Duplicate {
                name: merged.full_name(),
            });
        }

        let mut parts = Vec::new();
        let mut binds = Vec::new();
        let mut day_binds = Vec::new();

        if let Some(first_name) = req.first_name() {
            parts.push("first_name = ?");
            binds.push(first_name.to_string());
        }
        if let Some(last_name) = req.last_name() {
            parts.push("last_name = ?");
            binds.push(last_name.to_string());
        }
        if let Some(patronymic) = req.patronymic() {
            parts.push("patronymic = ?");
            binds.push(patronymic.to_string());
        }
        if let Some(photo) = req.photo() {
            parts.push("photo = ?");
            binds.push(photo.to_string());
        }
        if let Some(bio) = req.bio() {
            parts.push("bio = ?");
            binds.push(bio.to_string());
        }
        // Date placeholders come after every text placeholder.
        if let Some(birth_date) = req.birth_date() {
            parts.push("birth_date = ?");
            day_binds.push(day_number(birth_date));
        }
        if let Some(death_date) = req.death_date() {
            parts.push("death_date = ?");
            day_binds.push(day_number(death_date));
        }

        let query = format!(
            "UPDATE author SET {} WHERE id = ? RETURNING *",
            parts.join(", ")
        );
        let mut query = sqlx::query_as::<_, Author>(&query);

        for bind in binds {
            query = query.bind(bind);
        }
        for day in day_binds {
            query = query.bind(day);
        }

        let author = query
            .bind(req.id())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    UpdateAuthorError::Duplicate {
                        name: merged.full_name(),
                    }
                } else if let Some(invalid) = rejected_dates(&err, merged.life_dates()) {
                    UpdateAuthorError::Invalid(invalid)
                } else {
                    other(err)
                }
            })?
            // Deleted between the lookup and the write.
            .ok_or(UpdateAuthorError::NotFound { id: req.id() })?;

        Ok(author)
    }

    async fn delete_author(&self, req: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError> {
        let result = sqlx::query("DELETE FROM author WHERE id = ?")
            .bind(req.id())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err)
                    .context(format!(r#"Failed to delete author with id "{}""#, req.id()));
                DeleteAuthorError::Other(err)
            })?;

        if result.rows_affected() == 0 {
            return Err(DeleteAuthorError::NotFound { id: req.id() });
        }

        Ok(())
    }
}

/// Whether another author already carries the same name triple.
/// A missing patronymic matches only another missing patronymic.
async fn has_namesake(
    pool: &SqlitePool,
    profile: &AuthorProfile,
    exclude_id: Option<i64>,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM author \
         WHERE first_name = ? AND last_name = ? \
         AND COALESCE(patronymic, '') = COALESCE(?, '') \
         AND id IS NOT ? \
         LIMIT 1",
    )
    .bind(profile.first_name().as_str())
    .bind(profile.last_name().as_str())
    .bind(profile.patronymic().map(PersonName::as_str))
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.is_some())
}

fn create_error(err: sqlx::Error, profile: &AuthorProfile) -> CreateAuthorError {
    if is_unique_violation(&err) {
        return CreateAuthorError::Duplicate {
            name: profile.full_name(),
        };
    }
    if let Some(invalid) = rejected_dates(&err, profile.life_dates()) {
        return CreateAuthorError::Invalid(invalid);
    }

    let err = anyhow!(err).context(format!(
        r#"Failed to create author with name "{}""#,
        profile.full_name()
    ));
    CreateAuthorError::Other(err)
}

/// The date error behind a CHECK violation on the written dates, if any.
fn rejected_dates(err: &sqlx::Error, dates: &LifeDates) -> Option<LifeDatesError> {
    if !is_check_violation(err) {
        return None;
    }

    dates
        .death_date()
        .map(|death_date| LifeDatesError::DeathBeforeBirth {
            birth_date: dates.birth_date(),
            death_date,
        })
}

/// Days since 0001-01-01, which is day 1. Earlier dates are zero or negative.
fn day_number(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

fn date_from_day_number(column: &str, day: i32) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::from_num_days_from_ce_opt(day).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("day number {day} is outside the supported date range").into(),
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_unique_violation();
    }

    false
}

fn is_check_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_check_violation();
    }

    false
}
