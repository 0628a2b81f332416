//! Plain-text assessment report and its export to disk.
//!
//! `render_report` is pure: the same entry always renders the same text,
//! with the date taken from the entry itself. Section order is fixed: title
//! block, triage and reasoning, symptoms, safety alerts, recommendations,
//! disclaimer.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::models::HistoryEntry;

pub const REPORT_TITLE: &str = "SYMPTOM INTELLIGENCE ASSESSMENT REPORT";

/// Line printed when a result carries no safety alerts.
pub const NO_ALERTS_LINE: &str = "None identified.";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Cannot create exports dir: {0}")]
    CreateDir(std::io::Error),
    #[error("Cannot write report: {0}")]
    Write(std::io::Error),
}

/// Render `entry` as a human-readable report.
pub fn render_report(entry: &HistoryEntry) -> String {
    let result = &entry.result;
    let date = entry
        .created_on()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| entry.date.clone());

    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{REPORT_TITLE}");
    let _ = writeln!(out, "{}", "=".repeat(REPORT_TITLE.len() + 1));
    let _ = writeln!(out, "Date: {date}");
    let _ = writeln!(out, "Triage Level: {}", result.triage_level);

    section(&mut out, "REASONING", [result.reasoning.clone()]);

    section(
        &mut out,
        "SYMPTOMS IDENTIFIED",
        result
            .symptoms
            .iter()
            .map(|s| format!("{} ({})", s.name, s.severity)),
    );

    if result.safety_alerts.is_empty() {
        section(&mut out, "SAFETY ALERTS", [NO_ALERTS_LINE.to_string()]);
    } else {
        section(
            &mut out,
            "SAFETY ALERTS",
            result
                .safety_alerts
                .iter()
                .map(|a| format!("{}: {}", a.subject(), a.risk())),
        );
    }

    section(&mut out, "RECOMMENDATIONS", result.recommendations.iter().cloned());
    section(&mut out, "DISCLAIMER", [result.disclaimer.clone()]);
    out
}

fn section(out: &mut String, heading: &str, lines: impl IntoIterator<Item = String>) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{heading}:");
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
}

/// Download name for a report produced on `date`.
pub fn report_file_name(date: NaiveDate) -> String {
    format!("Symptom_Report_{}.txt", date.format("%Y-%m-%d"))
}

/// Write the rendered report into `dir` and return the file path.
pub fn export_report(
    entry: &HistoryEntry,
    dir: &Path,
    today: NaiveDate,
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir).map_err(ReportError::CreateDir)?;

    let path = dir.join(report_file_name(today));
    std::fs::write(&path, render_report(entry)).map_err(ReportError::Write)?;

    tracing::info!(path = %path.display(), "Report exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, SafetyAlert, SymptomEntry, TriageLevel};

    fn entry_with_alerts(alerts: Vec<SafetyAlert>) -> HistoryEntry {
        HistoryEntry {
            result: AnalysisResult {
                triage_level: TriageLevel::Emergency,
                reasoning: "Chest pain with abnormal vitals".into(),
                symptoms: vec![
                    SymptomEntry::new("chest pain", "severe"),
                    SymptomEntry::new("sweating", "moderate").with_duration("1 hour"),
                ],
                safety_alerts: alerts,
                recommendations: vec![
                    "Call emergency services".into(),
                    "Do not drive yourself".into(),
                ],
                disclaimer: "Decision support only.".into(),
                confidence_score: Some(Some(0.9)),
                extra: Default::default(),
            },
            date: "2026-07-09T21:15:00.000Z".into(),
        }
    }

    fn lines(report: &str) -> Vec<&str> {
        report.lines().collect()
    }

    #[test]
    fn full_report_layout() {
        let report = render_report(&entry_with_alerts(vec![]));
        let expected = "\
SYMPTOM INTELLIGENCE ASSESSMENT REPORT
=======================================
Date: 2026-07-09
Triage Level: EMERGENCY

REASONING:
Chest pain with abnormal vitals

SYMPTOMS IDENTIFIED:
chest pain (severe)
sweating (moderate)

SAFETY ALERTS:
None identified.

RECOMMENDATIONS:
Call emergency services
Do not drive yourself

DISCLAIMER:
Decision support only.
";
        assert_eq!(report, expected);
    }

    #[test]
    fn empty_alerts_render_placeholder_line() {
        let report = render_report(&entry_with_alerts(vec![]));
        assert!(lines(&report).contains(&"None identified."));
    }

    #[test]
    fn interaction_alert_joins_medications() {
        let report = render_report(&entry_with_alerts(vec![SafetyAlert::interaction("A", "B", "R")]));
        assert!(lines(&report).contains(&"A + B: R"));
        assert!(!report.contains(NO_ALERTS_LINE));
    }

    #[test]
    fn single_alert_names_one_medication() {
        let report = render_report(&entry_with_alerts(vec![
            SafetyAlert::single("Ibuprofen", "May trigger asthma attacks"),
            SafetyAlert::interaction("Warfarin", "Aspirin", "High risk of excessive bleeding"),
        ]));
        let lines = lines(&report);
        let first = lines.iter().position(|l| *l == "Ibuprofen: May trigger asthma attacks");
        let second = lines
            .iter()
            .position(|l| *l == "Warfarin + Aspirin: High risk of excessive bleeding");
        assert!(first.unwrap() < second.unwrap());
    }

    #[test]
    fn unknown_triage_level_rendered_as_is() {
        let mut entry = entry_with_alerts(vec![]);
        entry.result.triage_level = TriageLevel::Unspecified("SELF_CARE".into());
        assert!(render_report(&entry).contains("Triage Level: SELF_CARE"));
    }

    #[test]
    fn unparseable_date_printed_verbatim() {
        let mut entry = entry_with_alerts(vec![]);
        entry.date = "sometime".into();
        assert!(render_report(&entry).contains("Date: sometime"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let entry = entry_with_alerts(vec![SafetyAlert::interaction("A", "B", "R")]);
        assert_eq!(render_report(&entry), render_report(&entry));
    }

    #[test]
    fn file_name_uses_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(report_file_name(date), "Symptom_Report_2026-10-18.txt");
    }

    #[test]
    fn export_writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let exports = dir.path().join("exports");
        let entry = entry_with_alerts(vec![]);
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        let path = export_report(&entry, &exports, today).unwrap();
        assert_eq!(path, exports.join("Symptom_Report_2026-10-18.txt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), render_report(&entry));
    }
}
