use std::collections::BTreeMap;

use crate::models::{Ratings, StoredRatings};
use crate::questions::{Category, RoleConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub category: Category,
    pub average: f64,
    pub answers: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionScore {
    pub institution: String,
    pub responses: usize,
    pub categories: Vec<CategoryScore>,
}

impl InstitutionScore {
    /// Mean over every answer in every category.
    pub fn overall(&self) -> f64 {
        let (total, answers) = self
            .categories
            .iter()
            .fold((0.0, 0usize), |(total, answers), score| {
                (total + score.average * score.answers as f64, answers + score.answers)
            });
        if answers == 0 {
            0.0
        } else {
            total / answers as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSummary {
    pub question: &'static str,
    /// Answer counts in [`Frequency::ALL`](crate::questions::Frequency::ALL) order.
    pub counts: [usize; 5],
}

impl QuestionSummary {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

pub fn points_total(ratings: &Ratings) -> (u32, usize) {
    ratings.values().fold((0u32, 0usize), |(points, answers), frequency| {
        (points + u32::from(frequency.points()), answers + 1)
    })
}

/// Per-institution category averages, sorted by institution name.
pub fn score_institutions(rows: &[StoredRatings]) -> Vec<InstitutionScore> {
    let mut by_school: BTreeMap<&str, (usize, [(u32, usize); 3])> = BTreeMap::new();

    for row in rows {
        let entry = by_school
            .entry(row.institution.as_str())
            .or_insert((0, [(0, 0); 3]));
        entry.0 += 1;
        for (slot, category) in entry.1.iter_mut().zip(Category::ALL) {
            let (points, answers) = points_total(row.ratings.get(category));
            slot.0 += points;
            slot.1 += answers;
        }
    }

    by_school
        .into_iter()
        .map(|(institution, (responses, totals))| InstitutionScore {
            institution: institution.to_string(),
            responses,
            categories: Category::ALL
                .into_iter()
                .zip(totals)
                .map(|(category, (points, answers))| CategoryScore {
                    category,
                    average: if answers == 0 {
                        0.0
                    } else {
                        f64::from(points) / answers as f64
                    },
                    answers,
                })
                .collect(),
        })
        .collect()
}

/// Label distribution for each question of `category`, in questionnaire order.
pub fn question_distribution(
    rows: &[StoredRatings],
    config: &RoleConfig,
    category: Category,
) -> Vec<QuestionSummary> {
    config
        .questions(category)
        .iter()
        .map(|question| {
            let mut counts = [0usize; 5];
            for row in rows {
                if let Some(answer) = row.ratings.get(category).get(*question) {
                    counts[*answer as usize] += 1;
                }
            }
            QuestionSummary {
                question: *question,
                counts,
            }
        })
        .collect()
}
