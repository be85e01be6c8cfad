use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Five-point frequency scale shared by every rating question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "Siempre")]
    Always,
    #[serde(rename = "Casi siempre")]
    AlmostAlways,
    #[serde(rename = "A veces")]
    Sometimes,
    #[serde(rename = "Casi nunca")]
    AlmostNever,
    #[serde(rename = "Nunca")]
    Never,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Always,
        Frequency::AlmostAlways,
        Frequency::Sometimes,
        Frequency::AlmostNever,
        Frequency::Never,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Always => "Siempre",
            Frequency::AlmostAlways => "Casi siempre",
            Frequency::Sometimes => "A veces",
            Frequency::AlmostNever => "Casi nunca",
            Frequency::Never => "Nunca",
        }
    }

    /// Points used by the read side: `Siempre` scores 5, `Nunca` scores 1.
    pub fn points(self) -> u8 {
        match self {
            Frequency::Always => 5,
            Frequency::AlmostAlways => 4,
            Frequency::Sometimes => 3,
            Frequency::AlmostNever => 2,
            Frequency::Never => 1,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Frequency::ALL
            .into_iter()
            .find(|frequency| frequency.label() == value)
            .ok_or_else(|| format!("unknown frequency label: {value}"))
    }
}

/// The three rated question groups. Wire and column names are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Comunicacion,
    PracticasPedagogicas,
    Convivencia,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Comunicacion,
        Category::PracticasPedagogicas,
        Category::Convivencia,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Category::Comunicacion => "comunicacion",
            Category::PracticasPedagogicas => "practicas_pedagogicas",
            Category::Convivencia => "convivencia",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Category::Comunicacion => "COMUNICACIÓN",
            Category::PracticasPedagogicas => "PRÁCTICAS PEDAGÓGICAS",
            Category::Convivencia => "CONVIVENCIA",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Single(&'static [&'static str]),
    Multi(&'static [&'static str]),
}

impl FieldKind {
    pub fn options(self) -> &'static [&'static str] {
        match self {
            FieldKind::Single(options) | FieldKind::Multi(options) => options,
        }
    }
}

/// One role-specific answer field. Fields sharing a `group` are satisfied
/// when any of them holds a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub group: Option<&'static str>,
}

/// Everything that distinguishes one respondent questionnaire from another.
#[derive(Debug)]
pub struct RoleConfig {
    pub role: Role,
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
    pub comunicacion: &'static [&'static str],
    pub practicas_pedagogicas: &'static [&'static str],
    pub convivencia: &'static [&'static str],
}

impl RoleConfig {
    pub fn questions(&self, category: Category) -> &'static [&'static str] {
        match category {
            Category::Comunicacion => self.comunicacion,
            Category::PracticasPedagogicas => self.practicas_pedagogicas,
            Category::Convivencia => self.convivencia,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn question_count(&self) -> usize {
        Category::ALL
            .into_iter()
            .map(|category| self.questions(category).len())
            .sum()
    }
}

pub fn config_for(role: Role) -> &'static RoleConfig {
    match role {
        Role::Teacher => &TEACHER,
        Role::Student => &STUDENT,
        Role::Guardian => &GUARDIAN,
    }
}

pub const YEAR_OPTIONS: &[&str] = &["Menos de 1", "1", "2", "3", "4", "5", "Más de 5"];

pub const EARLY_GRADES: &[&str] = &["Primera infancia", "Preescolar", "1°", "2°", "3°", "4°", "5°"];

pub const LATE_GRADES: &[&str] = &["6°", "7°", "8°", "9°", "10°", "11°", "12°"];

pub const ALL_GRADES: &[&str] = &[
    "Primera infancia",
    "Preescolar",
    "1°",
    "2°",
    "3°",
    "4°",
    "5°",
    "6°",
    "7°",
    "8°",
    "9°",
    "10°",
    "11°",
    "12°",
];

pub const STUDENT_GRADES: &[&str] = &["5°", "8°", "9°", "10°", "11°"];

pub const SCHEDULE_OPTIONS: &[&str] = &["Mañana", "Tarde", "Noche", "Única"];

pub const FEEDBACK_SOURCES: &[&str] = &[
    "Rector/a",
    "Coordinator/a",
    "Otros/a docentes",
    "Acudientes",
    "Estudiantes",
    "Otros",
    "Ninguno",
];

pub static TEACHER: RoleConfig = RoleConfig {
    role: Role::Teacher,
    title: "CUESTIONARIO PARA DOCENTES",
    fields: &[
        FieldSpec {
            name: "yearsOfExperience",
            kind: FieldKind::Single(YEAR_OPTIONS),
            required: true,
            group: None,
        },
        FieldSpec {
            name: "teachingGradesEarly",
            kind: FieldKind::Multi(EARLY_GRADES),
            required: true,
            group: Some("teachingGrades"),
        },
        FieldSpec {
            name: "teachingGradesLate",
            kind: FieldKind::Multi(LATE_GRADES),
            required: true,
            group: Some("teachingGrades"),
        },
        FieldSpec {
            name: "schedule",
            kind: FieldKind::Multi(SCHEDULE_OPTIONS),
            required: true,
            group: None,
        },
        FieldSpec {
            name: "feedbackSources",
            kind: FieldKind::Multi(FEEDBACK_SOURCES),
            required: true,
            group: None,
        },
    ],
    comunicacion: &[
        "Tengo la disposición de dialogar con los acudientes sobre los aprendizajes de los estudiantes en momentos adicionales a la entrega de notas.",
        "Promuevo el apoyo de los acudientes al aprendizaje de los estudiantes, a través de actividades académicas y lúdicas para realizar en espacios fuera de la institución educativa.",
        "En el colegio se promueve mi participación en la toma de decisiones sobre las metas institucionales.",
        "En el colegio se hace reconocimiento público de nuestras prácticas pedagógicas exitosas e innovadoras.",
        "La comunicación que tengo con los directivos docentes del colegio es respetuosa y clara.",
        "La comunicación que tengo con otros docentes es asertiva.",
    ],
    practicas_pedagogicas: &[
        "Utilizo diferentes espacios dentro y fuera del colegio como la biblioteca, el laboratorio o el parque para el desarrollo de mis clases.",
        "Cuando preparo mis clases tengo en cuenta los intereses y necesidades de los estudiantes.",
        "Me articulo con profesores de otras áreas y niveles para llevar a cabo proyectos pedagógicos que mejoren los aprendizajes de los estudiantes.",
        "Logro cumplir los objetivos y el desarrollo que planeo para mis clases.",
        "Desarrollo mis clases con enfoque diferencial para garantizar el derecho a la educación de todas y todos mis estudiantes, independiente de su entorno social, afectivo y sus capacidades físicas y cognitivas.",
        "Cuando evalúo a mis estudiantes tengo en cuenta su dimensión afectiva y emocional, además de la cognitivas y comportamental.",
        "Los profesores organizamos con otros colegios o instituciones actividades deportivas, académicas y culturales.",
        "Demuestro a mis estudiantes que confío en ellos y que creo en sus capacidades y habilidades.",
    ],
    convivencia: &[
        "Los estudiantes me tratan con respeto a mí y a mis otros compañeros docentes, directivos y administrativos.",
        "Mis estudiantes son respetuosos y solidarios entre ellos, comprendiendo y aceptando las creencias religiosas, el género, la orientación sexual, el grupo étnico y las capacidades o talentos de los demás.",
        "Establezco con mis estudiantes acuerdos de convivencia al comenzar el año escolar.",
        "Mis opiniones, propuestas y sugerencias se tienen en cuenta cuando se construyen acuerdos de convivencia en el colegio.",
        "En el colegio mis estudiantes son tratados con respeto, independiente de sus creencias religiosas, género, orientación sexual, grupo étnico y capacidades o talentos de los demás.",
        "En el colegio recibo apoyo para resolver los conflictos que surgen y generar aprendizajes a partir de estos.",
        "En el colegio me siento escuchado/a y comprendido/a por otros docentes, los directivos, los estudiantes y los acudientes.",
    ],
};

pub static STUDENT: RoleConfig = RoleConfig {
    role: Role::Student,
    title: "CUESTIONARIO PARA ESTUDIANTES",
    fields: &[
        FieldSpec {
            name: "yearsInSchool",
            kind: FieldKind::Single(YEAR_OPTIONS),
            required: true,
            group: None,
        },
        FieldSpec {
            name: "currentGrade",
            kind: FieldKind::Single(STUDENT_GRADES),
            required: true,
            group: None,
        },
        FieldSpec {
            name: "schedule",
            kind: FieldKind::Single(SCHEDULE_OPTIONS),
            required: true,
            group: None,
        },
    ],
    comunicacion: &[
        "Mis profesores están dispuestos a hablar con mis acudientes sobre cómo me está yendo en el colegio, en momentos diferentes a la entrega de notas.",
        "En mi colegio reconocen públicamente las actividades y esfuerzos exitosos que hacen los profesores para que nosotros aprendamos.",
        "La comunicación que tengo con los directivos de mi colegio es respetuosa y clara.",
        "La comunicación entre mis profesores es respetuosa y clara.",
        "Mis profesores me dejan actividades para hacer en casa, las cuales necesitan el apoyo de mis acudientes.",
        "En mi colegio se promueve mi participación en la toma de decisiones sobre las metas institucionales.",
    ],
    practicas_pedagogicas: &[
        "Los profesores me llevan a otros sitios fuera del salón o del colegio para hacer las clases (por ejemplo, la biblioteca, el laboratorio, el parque, el museo, el río, etc.).",
        "Los profesores tienen en cuenta mis intereses y afinidades para escoger lo que vamos a hacer en clase.",
        "Los profesores trabajan juntos en proyectos para hacer actividades que nos ayudan a aprender más y mejor.",
        "Mis profesores hacen las clases de manera que nos permiten aprender a todas y todos sin importar nuestras diferencias (discapacidad, situaciones familiares o sociales).",
        "Cuando mis profesores me evalúan tienen en cuenta mis emociones, además de mis aprendizajes y comportamiento.",
        "Participamos en campeonatos deportivos, ferias y olimpiadas con otros colegios o instituciones.",
        "Mis profesores logran hacer sus clases de manera fluida.",
        "Mis profesores me demuestran que confían en mí y creen en mis habilidades y capacidades.",
    ],
    convivencia: &[
        "Mis compañeros y yo tratamos con respeto a los profesores, directivos y administrativos del colegio.",
        "Mis compañeros y yo somos solidarios entre nosotros, respetando y aceptando las creencias religiosas, el género, la orientación sexual, el grupo étnico y las capacidades o talentos de los demás.",
        "Mis profesores establecen conmigo y mis compañeros acuerdos de convivencia al comienzo del año.",
        "Mis opiniones, propuestas y sugerencias se tienen en cuenta cuando se construyen acuerdos de convivencia en el colegio.",
        "En el colegio mis compañeros y yo somos tratados con respeto sin importar nuestras creencias religiosas, género, orientación sexual, grupo étnico y capacidades o talentos.",
        "En el colegio me siento escuchado/a y comprendido/a por los profesores, los directivos, los estudiantes y otros acudientes.",
        "En el colegio recibo apoyo para resolver los conflictos que se dan y generar aprendizajes a partir de estos.",
    ],
};

pub static GUARDIAN: RoleConfig = RoleConfig {
    role: Role::Guardian,
    title: "CUESTIONARIO PARA ACUDIENTES",
    fields: &[FieldSpec {
        name: "studentGrades",
        kind: FieldKind::Multi(ALL_GRADES),
        required: true,
        group: None,
    }],
    comunicacion: &[
        "Los profesores tienen la disposición para hablar conmigo sobre los aprendizajes de los estudiantes en momentos adicionales a la entrega de notas.",
        "Los profesores promueven actividades para que apoye en su proceso de aprendizaje a los estudiantes que tengo a cargo.",
        "En el colegio se promueve mi participación en la toma de decisiones sobre las metas institucionales.",
        "En el colegio se hace reconocimiento público de las prácticas pedagógicas exitosas e innovadoras de los profesores.",
        "La comunicación que tengo con los directivos docentes del colegio es respetuosa y clara.",
        "En el colegio me siento escuchado/a y comprendida/o por los profesores, los directivos, los estudiantes y otros acudientes.",
    ],
    practicas_pedagogicas: &[
        "A los estudiantes los llevan a lugares diferentes al salón para hacer sus clases (por ejemplo, la biblioteca, el laboratorio, el parque, el museo, el río, etc.).",
        "Los profesores demuestran que confían en los estudiantes y que creen en sus capacidades y habilidades.",
        "Los profesores tienen en cuenta los intereses y necesidades de los estudiantes para escoger los temas que se van a tratar en clase.",
        "Los profesores del colegio hacen las clases garantizando el derecho a la educación de los estudiantes que viven condiciones o situaciones especiales (por ejemplo, alguna discapacidad, que sean desplazados o que entraron tarde al curso).",
        "Cuando los profesores evalúan a los estudiantes tienen en cuenta su dimensión afectiva y emocional, además de la cognitiva y la comportamental.",
        "El colegio organiza o participa en actividades como torneos, campeonatos, olimpiadas o ferias con otros colegios o instituciones.",
    ],
    convivencia: &[
        "Los estudiantes tratan con respeto a los profesores, directivos y administrativos del colegio.",
        "En el colegio recibo apoyo para resolver los conflictos que se dan y generar aprendizajes a partir de estos.",
        "En el colegio los estudiantes son respetuosos y solidarios entre ellos, comprendiendo y aceptando las creencias religiosas, el género, la orientación sexual, el grupo étnico y las capacidades o talentos de los demás.",
        "Los profesores establecen acuerdos de convivencia con los estudiantes al comenzar el año escolar.",
        "Mis opiniones, propuestas y sugerencias se tienen en cuenta cuando se construyen acuerdos de convivencia en el colegio.",
        "En el colegio los estudiantes son tratados con respeto sin importar sus creencias religiosas, género, orientación sexual, grupo étnico y capacidades o talentos.",
    ],
};
