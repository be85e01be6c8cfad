//! Process-local store with the same lookup and insert contract as
//! [`PgStore`](super::PgStore). Backs the router and form tests.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::{Role, StoredRatings, Submission};

use super::SurveyStore;

#[derive(Default)]
struct MemoryState {
    schools: Vec<String>,
    rows: HashMap<Role, Vec<(i64, Submission)>>,
    next_id: i64,
    unavailable: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn with_schools<I, S>(schools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Mutex::new(MemoryState {
                schools: schools.into_iter().map(Into::into).collect(),
                ..MemoryState::default()
            }),
        }
    }

    /// Makes every subsequent call fail as if the database were unreachable.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    pub async fn submissions(&self, role: Role) -> Vec<Submission> {
        let state = self.state.lock().await;
        state
            .rows
            .get(&role)
            .map(|rows| rows.iter().map(|(_, submission)| submission.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn row_count(&self) -> usize {
        self.state.lock().await.rows.values().map(Vec::len).sum()
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("in-memory store marked unavailable".to_string())
}

#[async_trait]
impl SurveyStore for MemoryStore {
    async fn search_schools(&self, fragment: &str, limit: i64) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().await;
        if state.unavailable {
            return Err(unavailable());
        }

        let needle = fragment.to_lowercase();
        let matches: BTreeSet<&String> = state
            .schools
            .iter()
            .filter(|name| name.to_lowercase().contains(&needle))
            .collect();

        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(matches.into_iter().take(limit).cloned().collect())
    }

    async fn insert_submission(&self, submission: &Submission) -> Result<i64, StoreError> {
        let mut state = self.state.lock().await;
        if state.unavailable {
            return Err(unavailable());
        }

        state.next_id += 1;
        let id = state.next_id;
        state
            .rows
            .entry(submission.role())
            .or_default()
            .push((id, submission.clone()));
        Ok(id)
    }

    async fn fetch_ratings(
        &self,
        role: Role,
        institution: Option<&str>,
    ) -> Result<Vec<StoredRatings>, StoreError> {
        let state = self.state.lock().await;
        if state.unavailable {
            return Err(unavailable());
        }

        let records = state
            .rows
            .get(&role)
            .into_iter()
            .flatten()
            .filter(|(_, submission)| {
                institution.map_or(true, |name| submission.school_name() == name)
            })
            .map(|(id, submission)| StoredRatings {
                id: *id,
                institution: submission.school_name().to_string(),
                ratings: submission.ratings().clone(),
            })
            .collect();

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GuardianSubmission;
    use pretty_assertions::assert_eq;

    fn store() -> MemoryStore {
        MemoryStore::with_schools([
            "Institución Educativa San José",
            "ESCUELA NORMAL SUPERIOR",
            "Escuela Rural La Esperanza",
            "Escuela Rural La Esperanza",
            "Colegio Técnico Industrial",
        ])
    }

    #[tokio::test]
    async fn search_is_distinct_sorted_and_case_insensitive() {
        let names = store().search_schools("escu", 50).await.expect("search");
        assert_eq!(
            names,
            vec!["ESCUELA NORMAL SUPERIOR", "Escuela Rural La Esperanza"]
        );
    }

    #[tokio::test]
    async fn empty_fragment_matches_everything_up_to_limit() {
        let store = store();
        assert_eq!(store.search_schools("", 50).await.expect("search").len(), 4);
        assert_eq!(store.search_schools("", 2).await.expect("search").len(), 2);
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = store();
        let submission = Submission::Guardian(GuardianSubmission {
            school_name: "Colegio Técnico Industrial".to_string(),
            ..GuardianSubmission::default()
        });

        assert_eq!(store.insert_submission(&submission).await.expect("insert"), 1);
        assert_eq!(store.insert_submission(&submission).await.expect("insert"), 2);
        assert_eq!(store.submissions(Role::Guardian).await.len(), 2);
        assert!(store.submissions(Role::Teacher).await.is_empty());

        let rows = store
            .fetch_ratings(Role::Guardian, Some("Colegio Técnico Industrial"))
            .await
            .expect("fetch");
        assert_eq!(rows.iter().map(|row| row.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn unavailable_store_fails_instead_of_returning_nothing() {
        let store = store();
        store.set_unavailable(true).await;
        assert!(matches!(
            store.search_schools("escu", 50).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.row_count().await, 0);
    }
}
