//! Client-side questionnaire state machine.
//!
//! [`SurveyForm`] performs no IO. School-name edits hand back a
//! [`LookupTicket`] for the caller to run (see [`LookupTicket::run`]) and the
//! outcome is fed back through [`SurveyForm::apply_lookup`]. Submission
//! follows the same split with [`SurveyForm::begin_submit`] and
//! [`SurveyForm::finish_submit`]; [`SurveyForm::submit_with`] drives both
//! against a [`SurveyApi`].
//!
//! Lookups are tagged with a per-form sequence number. Only the most
//! recently issued sequence is ever applied, so a late response to a
//! superseded fragment cannot overwrite newer suggestions.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::client::{ClientError, SurveyApi};
use crate::models::{
    CategoryRatings, GuardianSubmission, QuestionRef, Role, StudentSubmission, Submission,
    SubmitResponse, TeacherSubmission,
};
use crate::questions::{config_for, Category, FieldKind, FieldSpec, Frequency, RoleConfig};

/// Minimum number of characters before a school lookup is issued.
pub const LOOKUP_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Editing,
    /// Editing after a rejected submit attempt, with missing answers flagged.
    EditingInvalid,
    Submitting,
    Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Editing,
    Submitting,
    Confirmed,
}

/// A required answer the respondent has not given yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flag {
    SchoolName,
    /// A field, or a field group name when several fields share a requirement.
    Field(&'static str),
    Question(QuestionRef),
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::SchoolName => f.write_str("schoolName"),
            Flag::Field(name) => f.write_str(name),
            Flag::Question(question) => write!(f, "{}: {}", question.category, question.question),
        }
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("the questionnaire was already submitted")]
    Closed,

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("no submission is in flight")]
    NotSubmitting,

    #[error("unknown field {0:?}")]
    UnknownField(String),

    #[error("field {0} does not take that kind of answer")]
    WrongKind(&'static str),

    #[error("{value:?} is not an option for {field}")]
    InvalidOption { field: &'static str, value: String },

    #[error("question is not part of {category}: {question:?}")]
    UnknownQuestion { category: Category, question: String },

    #[error("{} required answers missing", .0.len())]
    Validation(Vec<Flag>),

    #[error("submission failed: {0}")]
    Failed(#[from] ClientError),
}

/// Keys the suggestion list reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Down,
    Up,
    Enter,
    Escape,
}

/// A lookup the form wants performed for `fragment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub seq: u64,
    pub fragment: String,
}

impl LookupTicket {
    pub async fn run(self, api: &dyn SurveyApi) -> LookupOutcome {
        let result = api.search_schools(&self.fragment).await;
        LookupOutcome {
            seq: self.seq,
            result,
        }
    }
}

#[derive(Debug)]
pub struct LookupOutcome {
    pub seq: u64,
    pub result: Result<Vec<String>, ClientError>,
}

#[derive(Debug, Default)]
struct Autocomplete {
    issued: u64,
    suggestions: Vec<String>,
    active: Option<usize>,
}

impl Autocomplete {
    fn clear(&mut self) {
        self.suggestions.clear();
        self.active = None;
    }

    /// Clears the list and invalidates every outstanding request.
    fn invalidate(&mut self) {
        self.issued += 1;
        self.clear();
    }

    fn input(&mut self, value: &str) -> Option<LookupTicket> {
        self.invalidate();
        (value.chars().count() >= LOOKUP_THRESHOLD).then(|| LookupTicket {
            seq: self.issued,
            fragment: value.to_string(),
        })
    }

    fn apply(&mut self, outcome: LookupOutcome) -> bool {
        if outcome.seq != self.issued {
            debug!(
                seq = outcome.seq,
                latest = self.issued,
                "discarding stale school lookup"
            );
            return false;
        }

        match outcome.result {
            Ok(names) => {
                self.suggestions = names;
                self.active = None;
            }
            Err(err) => {
                warn!(error = %err, "error fetching school suggestions");
                self.clear();
            }
        }
        true
    }

    /// Returns the committed suggestion on Enter.
    fn key(&mut self, key: NavKey) -> Option<String> {
        let len = self.suggestions.len();
        if len == 0 {
            return None;
        }

        match key {
            NavKey::Down => {
                self.active = Some(match self.active {
                    Some(index) if index + 1 < len => index + 1,
                    _ => 0,
                });
                None
            }
            NavKey::Up => {
                self.active = Some(match self.active {
                    Some(index) if index > 0 => index - 1,
                    _ => len - 1,
                });
                None
            }
            NavKey::Enter => {
                let index = self.active?;
                let committed = self.suggestions.get(index).cloned();
                self.invalidate();
                committed
            }
            NavKey::Escape => {
                self.invalidate();
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    Single(Option<String>),
    Multi(Vec<String>),
}

impl FieldValue {
    fn is_set(&self) -> bool {
        match self {
            FieldValue::Single(value) => value.is_some(),
            FieldValue::Multi(values) => !values.is_empty(),
        }
    }
}

/// One respondent's questionnaire, parameterized by a [`RoleConfig`].
#[derive(Debug)]
pub struct SurveyForm {
    config: &'static RoleConfig,
    stage: Stage,
    school_name: String,
    autocomplete: Autocomplete,
    fields: BTreeMap<&'static str, FieldValue>,
    ratings: CategoryRatings,
    attempted_submit: bool,
    submission_id: Option<i64>,
}

impl SurveyForm {
    pub fn new(role: Role) -> Self {
        Self::for_config(config_for(role))
    }

    pub fn for_config(config: &'static RoleConfig) -> Self {
        let fields = config
            .fields
            .iter()
            .map(|field| {
                let empty = match field.kind {
                    FieldKind::Single(_) => FieldValue::Single(None),
                    FieldKind::Multi(_) => FieldValue::Multi(Vec::new()),
                };
                (field.name, empty)
            })
            .collect();

        Self {
            config,
            stage: Stage::Editing,
            school_name: String::new(),
            autocomplete: Autocomplete::default(),
            fields,
            ratings: CategoryRatings::default(),
            attempted_submit: false,
            submission_id: None,
        }
    }

    pub fn role(&self) -> Role {
        self.config.role
    }

    pub fn config(&self) -> &'static RoleConfig {
        self.config
    }

    pub fn state(&self) -> FormState {
        match self.stage {
            Stage::Submitting => FormState::Submitting,
            Stage::Confirmed => FormState::Confirmed,
            Stage::Editing if self.attempted_submit && !self.missing().is_empty() => {
                FormState::EditingInvalid
            }
            Stage::Editing => FormState::Editing,
        }
    }

    pub fn school_name(&self) -> &str {
        &self.school_name
    }

    pub fn suggestions(&self) -> &[String] {
        &self.autocomplete.suggestions
    }

    pub fn active_suggestion(&self) -> Option<usize> {
        self.autocomplete.active
    }

    pub fn rating(&self, category: Category, question: &str) -> Option<Frequency> {
        self.ratings.get(category).get(question).copied()
    }

    pub fn single(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Single(value)) => value.as_deref(),
            _ => None,
        }
    }

    pub fn multi(&self, field: &str) -> &[String] {
        match self.fields.get(field) {
            Some(FieldValue::Multi(values)) => values,
            _ => &[],
        }
    }

    pub fn submission_id(&self) -> Option<i64> {
        self.submission_id
    }

    /// Missing answers, rendered only once a submit has been attempted.
    pub fn flagged(&self) -> Vec<Flag> {
        if self.attempted_submit {
            self.missing()
        } else {
            Vec::new()
        }
    }

    /// Every required answer not yet given, in questionnaire order.
    pub fn missing(&self) -> Vec<Flag> {
        let mut missing = Vec::new();
        if self.school_name.trim().is_empty() {
            missing.push(Flag::SchoolName);
        }

        for field in self.config.fields.iter().filter(|field| field.required) {
            match field.group {
                Some(group) => {
                    let first_in_group = self
                        .config
                        .fields
                        .iter()
                        .find(|other| other.group == Some(group))
                        .map(|other| other.name);
                    if first_in_group != Some(field.name) {
                        continue;
                    }
                    let satisfied = self
                        .config
                        .fields
                        .iter()
                        .filter(|other| other.group == Some(group))
                        .any(|other| self.fields.get(other.name).is_some_and(FieldValue::is_set));
                    if !satisfied {
                        missing.push(Flag::Field(group));
                    }
                }
                None => {
                    if !self.fields.get(field.name).is_some_and(FieldValue::is_set) {
                        missing.push(Flag::Field(field.name));
                    }
                }
            }
        }

        missing.extend(
            self.ratings
                .unanswered(self.config)
                .into_iter()
                .map(Flag::Question),
        );
        missing
    }

    fn ensure_editable(&self) -> Result<(), FormError> {
        match self.stage {
            Stage::Editing => Ok(()),
            Stage::Submitting => Err(FormError::SubmissionInFlight),
            Stage::Confirmed => Err(FormError::Closed),
        }
    }

    /// Records the typed school name. Every edit clears the suggestions and
    /// invalidates outstanding lookups; a new lookup is returned only when
    /// the value has at least [`LOOKUP_THRESHOLD`] characters.
    pub fn set_school_name(
        &mut self,
        value: impl Into<String>,
    ) -> Result<Option<LookupTicket>, FormError> {
        self.ensure_editable()?;
        self.school_name = value.into();
        Ok(self.autocomplete.input(&self.school_name))
    }

    /// Applies a finished lookup. Returns whether it was current.
    pub fn apply_lookup(&mut self, outcome: LookupOutcome) -> bool {
        if self.stage == Stage::Confirmed {
            return false;
        }
        self.autocomplete.apply(outcome)
    }

    pub fn handle_key(&mut self, key: NavKey) -> Result<(), FormError> {
        self.ensure_editable()?;
        if let Some(committed) = self.autocomplete.key(key) {
            self.school_name = committed;
        }
        Ok(())
    }

    /// Commits the suggestion at `index`, as a click on the list would.
    pub fn choose_suggestion(&mut self, index: usize) -> Result<bool, FormError> {
        self.ensure_editable()?;
        let Some(chosen) = self.autocomplete.suggestions.get(index).cloned() else {
            return Ok(false);
        };
        self.school_name = chosen;
        self.autocomplete.invalidate();
        Ok(true)
    }

    fn field_spec(&self, field: &str) -> Result<&'static FieldSpec, FormError> {
        self.config
            .field(field)
            .ok_or_else(|| FormError::UnknownField(field.to_string()))
    }

    fn check_option(spec: &FieldSpec, value: &str) -> Result<(), FormError> {
        if spec.kind.options().iter().any(|option| *option == value) {
            Ok(())
        } else {
            Err(FormError::InvalidOption {
                field: spec.name,
                value: value.to_string(),
            })
        }
    }

    /// Chooses the answer of a single-choice field.
    pub fn select(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        self.ensure_editable()?;
        let spec = self.field_spec(field)?;
        if !matches!(spec.kind, FieldKind::Single(_)) {
            return Err(FormError::WrongKind(spec.name));
        }
        Self::check_option(spec, value)?;
        self.fields
            .insert(spec.name, FieldValue::Single(Some(value.to_string())));
        Ok(())
    }

    /// Checks or unchecks one option of a multi-choice field. Checked
    /// options keep the order in which they were selected.
    pub fn set_checked(&mut self, field: &str, value: &str, checked: bool) -> Result<(), FormError> {
        self.ensure_editable()?;
        let spec = self.field_spec(field)?;
        if !matches!(spec.kind, FieldKind::Multi(_)) {
            return Err(FormError::WrongKind(spec.name));
        }
        Self::check_option(spec, value)?;

        let Some(FieldValue::Multi(values)) = self.fields.get_mut(spec.name) else {
            return Err(FormError::WrongKind(spec.name));
        };
        let present = values.iter().any(|existing| existing == value);
        if checked && !present {
            values.push(value.to_string());
        } else if !checked {
            values.retain(|existing| existing != value);
        }
        Ok(())
    }

    pub fn toggle(&mut self, field: &str, value: &str) -> Result<(), FormError> {
        let checked = !self.multi(field).iter().any(|existing| existing == value);
        self.set_checked(field, value, checked)
    }

    /// Toggles `value` in whichever field of `group` offers it, e.g. a grade
    /// shown in one list but stored as an early or a late grade.
    pub fn toggle_in_group(&mut self, group: &str, value: &str) -> Result<(), FormError> {
        let field = self
            .config
            .fields
            .iter()
            .find(|field| {
                field.group == Some(group)
                    && field.kind.options().iter().any(|option| *option == value)
            })
            .ok_or_else(|| FormError::UnknownField(format!("{group}/{value}")))?;
        self.toggle(field.name, value)
    }

    /// Records one rating cell. Every other recorded rating is kept.
    pub fn rate(
        &mut self,
        category: Category,
        question: &str,
        answer: Frequency,
    ) -> Result<(), FormError> {
        self.ensure_editable()?;
        let known = self
            .config
            .questions(category)
            .iter()
            .any(|candidate| *candidate == question);
        if !known {
            return Err(FormError::UnknownQuestion {
                category,
                question: question.to_string(),
            });
        }
        self.ratings
            .get_mut(category)
            .insert(question.to_string(), answer);
        Ok(())
    }

    /// Validates and enters `Submitting`, returning the payload to send.
    /// Nothing leaves the form when an answer is missing.
    pub fn begin_submit(&mut self) -> Result<Submission, FormError> {
        self.ensure_editable()?;
        self.attempted_submit = true;

        let missing = self.missing();
        if !missing.is_empty() {
            debug!(role = %self.role(), missing = missing.len(), "submit blocked by validation");
            return Err(FormError::Validation(missing));
        }

        let submission = self.build_submission();
        self.stage = Stage::Submitting;
        Ok(submission)
    }

    /// Completes the in-flight submission. Failures return the form to
    /// editing with every answer intact.
    pub fn finish_submit(
        &mut self,
        result: Result<SubmitResponse, ClientError>,
    ) -> Result<i64, FormError> {
        if self.stage != Stage::Submitting {
            return Err(FormError::NotSubmitting);
        }

        match result {
            Ok(response) => {
                self.stage = Stage::Confirmed;
                self.submission_id = Some(response.id);
                self.autocomplete.invalidate();
                Ok(response.id)
            }
            Err(err) => {
                error!(role = %self.role(), error = %err, "error submitting form");
                self.stage = Stage::Editing;
                Err(FormError::Failed(err))
            }
        }
    }

    pub async fn submit_with(&mut self, api: &dyn SurveyApi) -> Result<i64, FormError> {
        let submission = self.begin_submit()?;
        let result = api.submit(&submission).await;
        self.finish_submit(result)
    }

    fn single_owned(&self, field: &str) -> String {
        self.single(field).unwrap_or_default().to_string()
    }

    fn multi_owned(&self, field: &str) -> Vec<String> {
        self.multi(field).to_vec()
    }

    fn build_submission(&self) -> Submission {
        let school_name = self.school_name.trim().to_string();
        let ratings = self.ratings.clone();
        match self.role() {
            Role::Teacher => Submission::Teacher(TeacherSubmission {
                school_name,
                years_of_experience: self.single_owned("yearsOfExperience"),
                teaching_grades_early: self.multi_owned("teachingGradesEarly"),
                teaching_grades_late: self.multi_owned("teachingGradesLate"),
                schedule: self.multi_owned("schedule"),
                feedback_sources: self.multi_owned("feedbackSources"),
                ratings,
            }),
            Role::Student => Submission::Student(StudentSubmission {
                school_name,
                years_in_school: self.single_owned("yearsInSchool"),
                current_grade: self.single_owned("currentGrade"),
                schedule: self.single_owned("schedule"),
                ratings,
            }),
            Role::Guardian => Submission::Guardian(GuardianSubmission {
                school_name,
                student_grades: self.multi_owned("studentGrades"),
                ratings,
            }),
        }
    }
}
