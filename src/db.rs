use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::warn;

use crate::config::DbConfig;
use crate::error::StoreError;
use crate::models::{CategoryRatings, Role, StoredRatings, Submission};
use crate::questions::{Category, Frequency};

pub mod memory;

pub const SCHOOLS_TABLE: &str = "rectores";

const SCHOOL_NAME_COLUMN: &str = "nombre_de_la_institucion_educativa_en_la_actualmente_desempena_";

/// Persistence seam shared by the HTTP services and the reporting commands.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Distinct institution names containing `fragment` case-insensitively,
    /// sorted byte-wise, at most `limit` entries.
    async fn search_schools(&self, fragment: &str, limit: i64) -> Result<Vec<String>, StoreError>;

    /// Inserts one row into the role table and returns its generated id.
    async fn insert_submission(&self, submission: &Submission) -> Result<i64, StoreError>;

    async fn fetch_ratings(
        &self,
        role: Role,
        institution: Option<&str>,
    ) -> Result<Vec<StoredRatings>, StoreError>;
}

pub async fn connect(config: &DbConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(config.connect.clone())
        .await
        .context("failed to connect to Postgres")
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `LIKE` pattern matching `fragment` literally anywhere in the value.
pub fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for ch in fragment.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl SurveyStore for PgStore {
    async fn search_schools(&self, fragment: &str, limit: i64) -> Result<Vec<String>, StoreError> {
        let query = format!(
            r#"
            SELECT name FROM (
                SELECT DISTINCT {SCHOOL_NAME_COLUMN} AS name
                FROM {SCHOOLS_TABLE}
                WHERE LOWER({SCHOOL_NAME_COLUMN}) LIKE LOWER($1) ESCAPE '\'
            ) matches
            ORDER BY name COLLATE "C"
            LIMIT $2
            "#
        );

        let names = sqlx::query_scalar::<_, String>(&query)
            .bind(like_pattern(fragment))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(names)
    }

    async fn insert_submission(&self, submission: &Submission) -> Result<i64, StoreError> {
        let id = match submission {
            Submission::Teacher(body) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO docentes_form_submissions (
                        institucion_educativa,
                        anos_como_docente,
                        grados_asignados,
                        jornada,
                        retroalimentacion_de,
                        comunicacion,
                        practicas_pedagogicas,
                        convivencia
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING id::BIGINT
                    "#,
                )
                .bind(&body.school_name)
                .bind(&body.years_of_experience)
                .bind(body.assigned_grades())
                .bind(&body.schedule)
                .bind(&body.feedback_sources)
                .bind(Json(&body.ratings.comunicacion))
                .bind(Json(&body.ratings.practicas_pedagogicas))
                .bind(Json(&body.ratings.convivencia))
                .fetch_one(&self.pool)
                .await?
            }
            Submission::Student(body) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO estudiantes_form_submissions (
                        institucion_educativa,
                        anos_estudiando,
                        grado_actual,
                        jornada,
                        comunicacion,
                        practicas_pedagogicas,
                        convivencia
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id::BIGINT
                    "#,
                )
                .bind(&body.school_name)
                .bind(&body.years_in_school)
                .bind(&body.current_grade)
                .bind(&body.schedule)
                .bind(Json(&body.ratings.comunicacion))
                .bind(Json(&body.ratings.practicas_pedagogicas))
                .bind(Json(&body.ratings.convivencia))
                .fetch_one(&self.pool)
                .await?
            }
            Submission::Guardian(body) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO acudientes_form_submissions (
                        institucion_educativa,
                        grados_estudiantes,
                        comunicacion,
                        practicas_pedagogicas,
                        convivencia
                    ) VALUES ($1, $2, $3, $4, $5)
                    RETURNING id::BIGINT
                    "#,
                )
                .bind(&body.school_name)
                .bind(&body.student_grades)
                .bind(Json(&body.ratings.comunicacion))
                .bind(Json(&body.ratings.practicas_pedagogicas))
                .bind(Json(&body.ratings.convivencia))
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(id)
    }

    async fn fetch_ratings(
        &self,
        role: Role,
        institution: Option<&str>,
    ) -> Result<Vec<StoredRatings>, StoreError> {
        let query = format!(
            "SELECT id::BIGINT AS id, institucion_educativa, comunicacion, \
             practicas_pedagogicas, convivencia \
             FROM {} \
             WHERE $1::TEXT IS NULL OR institucion_educativa = $1 \
             ORDER BY id",
            role.table()
        );

        let rows = sqlx::query(&query)
            .bind(institution)
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let mut raw: [RawRatings; 3] = Default::default();
            for (slot, category) in raw.iter_mut().zip(Category::ALL) {
                let column: Option<Json<RawRatings>> = row.try_get(category.key())?;
                *slot = column.map(|json| json.0).unwrap_or_default();
            }

            match parse_ratings(raw) {
                Ok(ratings) => records.push(StoredRatings {
                    id,
                    institution: row.try_get("institucion_educativa")?,
                    ratings,
                }),
                Err(reason) => {
                    warn!(table = role.table(), id, %reason, "skipping row with unreadable ratings");
                }
            }
        }

        Ok(records)
    }
}

/// Rating columns as stored, before the labels are checked.
type RawRatings = BTreeMap<String, serde_json::Value>;

/// Converts stored answer maps, failing on the first answer outside the
/// frequency scale.
fn parse_ratings(raw: [RawRatings; 3]) -> Result<CategoryRatings, String> {
    let mut ratings = CategoryRatings::default();
    for (category, answers) in Category::ALL.into_iter().zip(raw) {
        for (question, value) in answers {
            let label = value
                .as_str()
                .ok_or_else(|| format!("non-text answer {value} in {category}"))?;
            let frequency: Frequency = label.parse()?;
            ratings.get_mut(category).insert(question, frequency);
        }
    }
    Ok(ratings)
}

/// Lists public tables and fails when the reference table or a role table
/// is absent.
pub async fn verify_schema(pool: &PgPool) -> Result<Vec<String>, StoreError> {
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::TEXT FROM information_schema.tables \
         WHERE table_schema = 'public' ORDER BY table_name",
    )
    .fetch_all(pool)
    .await?;

    let missing = missing_tables(&tables);
    if !missing.is_empty() {
        return Err(StoreError::MissingTables(missing));
    }

    Ok(tables)
}

fn missing_tables(present: &[String]) -> Vec<String> {
    std::iter::once(SCHOOLS_TABLE)
        .chain(Role::ALL.into_iter().map(Role::table))
        .filter(|required| !present.iter().any(|table| table == required))
        .map(str::to_string)
        .collect()
}

/// Round-trip probe used before serving traffic.
pub async fn ping(pool: &PgPool, timeout: Duration) -> Result<(), StoreError> {
    tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(pool))
        .await
        .map_err(|_| StoreError::Unavailable("database ping timed out".to_string()))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes_wildcards() {
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("Escu"), "%Escu%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    fn answers(pairs: &[(&str, serde_json::Value)]) -> RawRatings {
        pairs
            .iter()
            .map(|(question, value)| (question.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn stored_labels_parse_into_categories() {
        let ratings = parse_ratings([
            answers(&[("q1", serde_json::json!("Siempre"))]),
            RawRatings::new(),
            answers(&[("q2", serde_json::json!("Casi nunca"))]),
        ])
        .expect("parse");
        assert_eq!(ratings.comunicacion.get("q1"), Some(&Frequency::Always));
        assert!(ratings.practicas_pedagogicas.is_empty());
        assert_eq!(ratings.convivencia.get("q2"), Some(&Frequency::AlmostNever));
    }

    #[test]
    fn unknown_or_non_text_label_is_rejected() {
        let unknown = parse_ratings([
            answers(&[("q1", serde_json::json!("Muy a menudo"))]),
            RawRatings::new(),
            RawRatings::new(),
        ]);
        assert_eq!(
            unknown.err().as_deref(),
            Some("unknown frequency label: Muy a menudo")
        );

        let numeric = parse_ratings([
            RawRatings::new(),
            answers(&[("q1", serde_json::json!(4))]),
            RawRatings::new(),
        ]);
        assert!(numeric.is_err());
    }

    #[test]
    fn missing_tables_reports_absent_role_tables() {
        let present = vec![
            "rectores".to_string(),
            "docentes_form_submissions".to_string(),
        ];
        assert_eq!(
            missing_tables(&present),
            vec!["estudiantes_form_submissions", "acudientes_form_submissions"]
        );

        let complete: Vec<String> = std::iter::once("rectores")
            .chain(Role::ALL.into_iter().map(Role::table))
            .map(str::to_string)
            .collect();
        assert!(missing_tables(&complete).is_empty());
    }
}
