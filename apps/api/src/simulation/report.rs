//! Presentation helpers: leaderboard rows and the markdown report used for export/publish.

use serde::Serialize;

use crate::simulation::models::MergedRecord;
use crate::simulation::merge::MergeGap;

/// One leaderboard row per merged candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub id: String,
    pub name: String,
    pub profile: String,
    pub role_fit: Option<u8>,
    pub communication: Option<u8>,
    pub tech_skills: Option<u8>,
    pub culture_fit: Option<u8>,
    pub verdict: String,
}

pub fn leaderboard(records: &[MergedRecord]) -> Vec<LeaderboardRow> {
    records
        .iter()
        .map(|r| LeaderboardRow {
            id: r.id.clone(),
            name: r.name().to_string(),
            profile: r.text("vibe").unwrap_or_default().to_string(),
            role_fit: r.score("role_fit_score"),
            communication: r.score("comm_score"),
            tech_skills: r.score("tech_score"),
            culture_fit: r.score("culture_score"),
            verdict: r.text("verdict").unwrap_or_default().to_string(),
        })
        .collect()
}

/// Everything the report needs from a finished run.
pub struct ReportInput<'a> {
    pub title: &'a str,
    pub job_description: &'a str,
    pub records: &'a [MergedRecord],
    pub gaps: &'a [MergeGap],
}

/// Renders a finished run as markdown.
pub fn render_markdown(input: &ReportInput<'_>) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Hiring Simulation: {}\n\n", input.title));

    if !input.gaps.is_empty() {
        out.push_str("> **Warnings**\n");
        for gap in input.gaps {
            out.push_str(&format!("> - {}\n", gap.warning()));
        }
        out.push('\n');
    }

    out.push_str("## Candidate Leaderboard\n\n");
    out.push_str("| Name | Profile | Role Fit | Tech Skills | Verdict |\n");
    out.push_str("|---|---|---|---|---|\n");
    for row in leaderboard(input.records) {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            row.name,
            row.profile,
            score_cell(row.role_fit),
            score_cell(row.tech_skills),
            row.verdict
        ));
    }

    out.push_str(&format!("\n## Job Description\n\n{}\n\n", input.job_description.trim()));

    for record in input.records {
        out.push_str(&format!("## {}\n\n", record.name()));
        out.push_str(&format!("**Verdict:** {}\n\n", record.text("verdict").unwrap_or("-")));
        if let Some(reasoning) = record.text("reasoning") {
            out.push_str(&format!("**Analysis:** {}\n\n", reasoning));
        }

        out.push_str("### Scores\n\n");
        for (label, key) in [
            ("Role Fit", "role_fit_score"),
            ("Communication", "comm_score"),
            ("Tech Skills", "tech_score"),
            ("Culture Fit", "culture_score"),
        ] {
            out.push_str(&format!("- {label}: {}/10\n", score_cell(record.score(key))));
        }
        out.push('\n');

        if let Some(cv) = record.text("cv_text").or_else(|| record.text("cv_summary")) {
            out.push_str(&format!("### CV\n\n```\n{}\n```\n\n", cv.trim()));
        }
        if let Some(transcript) = record.text("transcript") {
            out.push_str(&format!("### Interview Transcript\n\n```\n{}\n```\n\n", transcript.trim()));
        }
    }

    out
}

/// Strips markdown markers for the plain-text export.
pub fn render_plain(input: &ReportInput<'_>) -> String {
    render_markdown(input)
        .lines()
        .filter(|line| !line.starts_with("```") && !line.starts_with("|---"))
        .map(|line| {
            line.trim_start_matches('#')
                .trim_start_matches("> ")
                .trim_start()
                .replace("**", "")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn score_cell(score: Option<u8>) -> String {
    score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn record(id: &str, fields: Value) -> MergedRecord {
        let fields: Map<String, Value> = fields.as_object().cloned().unwrap();
        MergedRecord {
            id: id.to_string(),
            fields,
        }
    }

    fn sample() -> Vec<MergedRecord> {
        vec![
            record(
                "A",
                json!({
                    "name": "Dana Reyes", "vibe": "Strong Match", "cv_text": "EXPERIENCE\nTech Corp",
                    "transcript": "Recruiter: Hi", "role_fit_score": 9, "comm_score": 8,
                    "tech_score": 9, "culture_score": 7, "verdict": "Strong Hire", "reasoning": "Clear depth."
                }),
            ),
            record("B", json!({"name": "Sam Okafor", "verdict": "No Hire"})),
        ]
    }

    #[test]
    fn test_leaderboard_rows_follow_record_order() {
        let rows = leaderboard(&sample());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Dana Reyes");
        assert_eq!(rows[0].role_fit, Some(9));
        assert_eq!(rows[0].profile, "Strong Match");
        assert_eq!(rows[1].tech_skills, None);
        assert_eq!(rows[1].verdict, "No Hire");
    }

    #[test]
    fn test_markdown_report_sections() {
        let records = sample();
        let gaps = vec![MergeGap {
            id: "C".to_string(),
            name: "Cy".to_string(),
        }];
        let report = render_markdown(&ReportInput {
            title: "Senior Infrastructure Engineer",
            job_description: "Own the AD migration.",
            records: &records,
            gaps: &gaps,
        });

        assert!(report.starts_with("# Hiring Simulation: Senior Infrastructure Engineer"));
        assert!(report.contains("| Dana Reyes | Strong Match | 9 | 9 | Strong Hire |"));
        assert!(report.contains("| Sam Okafor |  | - | - | No Hire |"));
        assert!(report.contains("Could not find analysis for candidate Cy (C)"));
        assert!(report.contains("- Culture Fit: 7/10"));
        assert!(report.contains("### Interview Transcript"));
    }

    #[test]
    fn test_plain_report_has_no_markdown_markers() {
        let records = sample();
        let plain = render_plain(&ReportInput {
            title: "Role",
            job_description: "JD",
            records: &records,
            gaps: &[],
        });
        assert!(plain.starts_with("Hiring Simulation: Role"));
        assert!(!plain.contains("```"));
        assert!(!plain.contains("**"));
        assert!(plain.contains("Verdict: Strong Hire"));
    }
}
