use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;
use crate::questions::{Category, Frequency, RoleConfig};

/// Respondent role. The serialized form is the `formType` discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "docentes")]
    Teacher,
    #[serde(rename = "estudiantes")]
    Student,
    #[serde(rename = "acudientes")]
    Guardian,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Teacher, Role::Student, Role::Guardian];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Teacher => "docentes",
            Role::Student => "estudiantes",
            Role::Guardian => "acudientes",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Role::Teacher => "docentes_form_submissions",
            Role::Student => "estudiantes_form_submissions",
            Role::Guardian => "acudientes_form_submissions",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| ServiceError::InvalidRole(value.to_string()))
    }
}

/// Answers for one category, keyed by the full question text.
pub type Ratings = BTreeMap<String, Frequency>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRatings {
    #[serde(default)]
    pub comunicacion: Ratings,
    #[serde(default)]
    pub practicas_pedagogicas: Ratings,
    #[serde(default)]
    pub convivencia: Ratings,
}

impl CategoryRatings {
    pub fn get(&self, category: Category) -> &Ratings {
        match category {
            Category::Comunicacion => &self.comunicacion,
            Category::PracticasPedagogicas => &self.practicas_pedagogicas,
            Category::Convivencia => &self.convivencia,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Ratings {
        match category {
            Category::Comunicacion => &mut self.comunicacion,
            Category::PracticasPedagogicas => &mut self.practicas_pedagogicas,
            Category::Convivencia => &mut self.convivencia,
        }
    }

    /// Questions of `config` with no recorded answer, in questionnaire order.
    pub fn unanswered(&self, config: &RoleConfig) -> Vec<QuestionRef> {
        Category::ALL
            .into_iter()
            .flat_map(|category| {
                config
                    .questions(category)
                    .iter()
                    .filter(move |question| !self.get(category).contains_key(**question))
                    .map(move |question| QuestionRef {
                        category,
                        question: *question,
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuestionRef {
    pub category: Category,
    pub question: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSubmission {
    pub school_name: String,
    #[serde(default)]
    pub years_of_experience: String,
    #[serde(default)]
    pub teaching_grades_early: Vec<String>,
    #[serde(default)]
    pub teaching_grades_late: Vec<String>,
    #[serde(default)]
    pub schedule: Vec<String>,
    #[serde(default)]
    pub feedback_sources: Vec<String>,
    #[serde(flatten)]
    pub ratings: CategoryRatings,
}

impl TeacherSubmission {
    /// Early grades followed by late grades, each in selection order.
    pub fn assigned_grades(&self) -> Vec<String> {
        self.teaching_grades_early
            .iter()
            .chain(&self.teaching_grades_late)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSubmission {
    pub school_name: String,
    #[serde(default)]
    pub years_in_school: String,
    #[serde(default)]
    pub current_grade: String,
    #[serde(default)]
    pub schedule: String,
    #[serde(flatten)]
    pub ratings: CategoryRatings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardianSubmission {
    pub school_name: String,
    #[serde(default)]
    pub student_grades: Vec<String>,
    #[serde(flatten)]
    pub ratings: CategoryRatings,
}

/// A role-tagged submission as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "formType")]
pub enum Submission {
    #[serde(rename = "docentes")]
    Teacher(TeacherSubmission),
    #[serde(rename = "estudiantes")]
    Student(StudentSubmission),
    #[serde(rename = "acudientes")]
    Guardian(GuardianSubmission),
}

impl Submission {
    /// Decodes a request body. The discriminator is checked before the
    /// role-shaped fields so an unknown `formType` is always `InvalidRole`.
    pub fn from_value(value: Value) -> Result<Self, ServiceError> {
        let role: Role = match value.get("formType") {
            Some(Value::String(tag)) => tag.parse()?,
            Some(other) => return Err(ServiceError::InvalidRole(other.to_string())),
            None => return Err(ServiceError::InvalidRole(String::new())),
        };

        let decoded = match role {
            Role::Teacher => serde_json::from_value(value).map(Submission::Teacher),
            Role::Student => serde_json::from_value(value).map(Submission::Student),
            Role::Guardian => serde_json::from_value(value).map(Submission::Guardian),
        };
        decoded.map_err(|err| ServiceError::InvalidPayload(err.to_string()))
    }

    pub fn role(&self) -> Role {
        match self {
            Submission::Teacher(_) => Role::Teacher,
            Submission::Student(_) => Role::Student,
            Submission::Guardian(_) => Role::Guardian,
        }
    }

    pub fn school_name(&self) -> &str {
        match self {
            Submission::Teacher(body) => &body.school_name,
            Submission::Student(body) => &body.school_name,
            Submission::Guardian(body) => &body.school_name,
        }
    }

    pub fn ratings(&self) -> &CategoryRatings {
        match self {
            Submission::Teacher(body) => &body.ratings,
            Submission::Student(body) => &body.ratings,
            Submission::Guardian(body) => &body.ratings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// One persisted row as read back for reporting.
#[derive(Debug, Clone)]
pub struct StoredRatings {
    pub id: i64,
    pub institution: String,
    pub ratings: CategoryRatings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn role_parses_exact_discriminators() {
        assert_eq!("docentes".parse::<Role>().ok(), Some(Role::Teacher));
        assert_eq!("acudientes".parse::<Role>().ok(), Some(Role::Guardian));
        assert!(matches!(
            "rectores".parse::<Role>(),
            Err(ServiceError::InvalidRole(tag)) if tag == "rectores"
        ));
        assert!("Docentes".parse::<Role>().is_err());
    }

    #[test]
    fn teacher_payload_decodes_and_combines_grades() {
        let body = json!({
            "formType": "docentes",
            "schoolName": "Escuela Normal Superior",
            "yearsOfExperience": "3",
            "teachingGradesEarly": ["3°", "1°"],
            "teachingGradesLate": ["7°"],
            "schedule": ["Mañana"],
            "feedbackSources": ["Rector/a"],
            "comunicacion": { "Pregunta": "Siempre" },
            "practicas_pedagogicas": {},
            "convivencia": {}
        });

        let submission = Submission::from_value(body).expect("decode");
        let Submission::Teacher(teacher) = &submission else {
            panic!("expected teacher submission");
        };
        assert_eq!(teacher.assigned_grades(), vec!["3°", "1°", "7°"]);
        assert_eq!(
            submission.ratings().comunicacion.get("Pregunta"),
            Some(&Frequency::Always)
        );
        assert_eq!(submission.school_name(), "Escuela Normal Superior");
    }

    #[test]
    fn unknown_or_missing_form_type_is_invalid_role() {
        let unknown = Submission::from_value(json!({ "formType": "rectores", "schoolName": "x" }));
        assert!(matches!(unknown, Err(ServiceError::InvalidRole(_))));

        let missing = Submission::from_value(json!({ "schoolName": "x" }));
        assert!(matches!(missing, Err(ServiceError::InvalidRole(_))));

        let numeric = Submission::from_value(json!({ "formType": 7 }));
        assert!(matches!(numeric, Err(ServiceError::InvalidRole(_))));
    }

    #[test]
    fn bad_rating_label_is_invalid_payload() {
        let body = json!({
            "formType": "acudientes",
            "schoolName": "Colegio",
            "studentGrades": ["5°"],
            "comunicacion": { "Pregunta": "Frecuentemente" }
        });
        assert!(matches!(
            Submission::from_value(body),
            Err(ServiceError::InvalidPayload(_))
        ));
    }

    #[test]
    fn serialized_submission_carries_form_type() {
        let submission = Submission::Student(StudentSubmission {
            school_name: "Colegio".to_string(),
            years_in_school: "2".to_string(),
            current_grade: "9°".to_string(),
            schedule: "Tarde".to_string(),
            ratings: CategoryRatings::default(),
        });
        let value = serde_json::to_value(&submission).expect("serialize");
        assert_eq!(value["formType"], "estudiantes");
        assert_eq!(value["yearsInSchool"], "2");
        assert_eq!(value["convivencia"], json!({}));

        let decoded = Submission::from_value(value).expect("decode");
        assert_eq!(decoded, submission);
    }
}
