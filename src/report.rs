use std::fmt::Write;
use std::io;

use chrono::{DateTime, Utc};

use crate::models::StoredRatings;
use crate::questions::{Category, Frequency, RoleConfig};
use crate::score;

pub fn build_report(
    config: &RoleConfig,
    institution: Option<&str>,
    generated_at: DateTime<Utc>,
    rows: &[StoredRatings],
) -> String {
    let scores = score::score_institutions(rows);

    let mut output = String::new();
    let scope = institution.unwrap_or("all institutions");

    let _ = writeln!(output, "# Encuesta de Ambiente Escolar: {}", config.title);
    let _ = writeln!(
        output,
        "Generated for {} ({} responses, {})",
        scope,
        rows.len(),
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Averages");

    if scores.is_empty() {
        let _ = writeln!(output, "No responses recorded.");
    } else {
        let _ = writeln!(
            output,
            "| Institution | Responses | {} | {} | {} | Overall |",
            Category::Comunicacion.title(),
            Category::PracticasPedagogicas.title(),
            Category::Convivencia.title()
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for school in &scores {
            let _ = write!(output, "| {} | {} |", school.institution, school.responses);
            for category in &school.categories {
                let _ = write!(output, " {:.2} |", category.average);
            }
            let _ = writeln!(output, " {:.2} |", school.overall());
        }
    }

    for category in Category::ALL {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", category.title());

        let summaries = score::question_distribution(rows, config, category);
        let answered = summaries.iter().any(|summary| summary.total() > 0);
        if !answered {
            let _ = writeln!(output, "No answers recorded for this section.");
            continue;
        }

        for (index, summary) in summaries.iter().enumerate() {
            let _ = writeln!(output, "{}. {}", index + 1, summary.question);
            let parts: Vec<String> = Frequency::ALL
                .iter()
                .zip(summary.counts)
                .map(|(frequency, count)| format!("{frequency}: {count}"))
                .collect();
            let _ = writeln!(output, "   - {}", parts.join(", "));
        }
    }

    output
}

/// One row per submission, one column per question across all categories.
pub fn write_csv<W: io::Write>(
    writer: W,
    config: &RoleConfig,
    rows: &[StoredRatings],
) -> anyhow::Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["id".to_string(), "institucion_educativa".to_string()];
    for category in Category::ALL {
        for question in config.questions(category) {
            header.push(format!("{}: {question}", category.key()));
        }
    }
    csv.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.id.to_string(), row.institution.clone()];
        for category in Category::ALL {
            for question in config.questions(category) {
                let answer = row
                    .ratings
                    .get(category)
                    .get(*question)
                    .map(|frequency| frequency.label())
                    .unwrap_or_default();
                record.push(answer.to_string());
            }
        }
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryRatings;
    use crate::questions::GUARDIAN;
    use chrono::TimeZone;

    fn rows() -> Vec<StoredRatings> {
        let mut ratings = CategoryRatings::default();
        ratings
            .convivencia
            .insert(GUARDIAN.convivencia[0].to_string(), Frequency::AlmostAlways);
        vec![StoredRatings {
            id: 7,
            institution: "Colegio Mayor, Sede B".to_string(),
            ratings,
        }]
    }

    #[test]
    fn report_lists_averages_and_distributions() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let report = build_report(&GUARDIAN, Some("Colegio Mayor, Sede B"), at, &rows());

        assert!(report.starts_with("# Encuesta de Ambiente Escolar: CUESTIONARIO PARA ACUDIENTES"));
        assert!(report.contains("Generated for Colegio Mayor, Sede B (1 responses, 2026-03-01 09:30 UTC)"));
        assert!(report.contains("| Colegio Mayor, Sede B | 1 | 0.00 | 0.00 | 4.00 | 4.00 |"));
        assert!(report.contains("## COMUNICACIÓN\nNo answers recorded for this section."));
        assert!(report.contains("Siempre: 0, Casi siempre: 1, A veces: 0"));
    }

    #[test]
    fn empty_report_says_so() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let report = build_report(&GUARDIAN, None, at, &[]);
        assert!(report.contains("all institutions (0 responses"));
        assert!(report.contains("No responses recorded."));
    }

    #[test]
    fn csv_has_one_column_per_question() {
        let mut buffer = Vec::new();
        let written = write_csv(&mut buffer, &GUARDIAN, &rows()).expect("csv");
        assert_eq!(written, 1);

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let headers = reader.headers().expect("headers").clone();
        assert_eq!(headers.len(), 2 + GUARDIAN.question_count());

        let record = reader.records().next().expect("row").expect("record");
        assert_eq!(&record[0], "7");
        assert_eq!(&record[1], "Colegio Mayor, Sede B");
        let first_convivencia = 2 + GUARDIAN.comunicacion.len() + GUARDIAN.practicas_pedagogicas.len();
        assert_eq!(&record[first_convivencia], "Casi siempre");
        assert_eq!(&record[2], "");
    }
}
