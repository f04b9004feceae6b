// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `casebot cases` command implementation.
//!
//! Read-only views of the case database for following up on stuck or
//! failed cases.

use std::str::FromStr;

use casebot_config::CasebotConfig;
use casebot_core::{Case, CaseError, CaseId, CaseRepository, CaseStatus};
use casebot_storage::SqliteStorage;

async fn open_storage(config: &CasebotConfig) -> Result<SqliteStorage, CaseError> {
    let storage = SqliteStorage::new(config.database.clone());
    storage.initialize().await?;
    Ok(storage)
}

fn parse_status(raw: &str) -> Result<CaseStatus, CaseError> {
    CaseStatus::from_str(&raw.trim().to_ascii_lowercase()).map_err(|_| {
        CaseError::InvalidInput(format!(
            "unknown status `{raw}` (expected received, stored, extracted, reported, or failed)"
        ))
    })
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, CaseError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CaseError::Internal(format!("cannot serialize cases: {e}")))
}

/// Run `casebot cases list`.
pub async fn run_list(
    config: &CasebotConfig,
    status: Option<&str>,
    json: bool,
) -> Result<(), CaseError> {
    let status = status.map(parse_status).transpose()?;
    let storage = open_storage(config).await?;
    let cases = storage.list(status).await?;

    if json {
        println!("{}", to_json(&cases)?);
    } else if cases.is_empty() {
        println!("no cases");
    } else {
        println!("{}", list_header());
        for case in &cases {
            println!("{}", format_row(case));
        }
    }
    Ok(())
}

/// Run `casebot cases show <id>`.
pub async fn run_show(config: &CasebotConfig, id: &str, json: bool) -> Result<(), CaseError> {
    let storage = open_storage(config).await?;
    let case = storage.get(&CaseId(id.trim().to_string())).await?;
    if json {
        println!("{}", to_json(&case)?);
    } else {
        print!("{}", format_detail(&case));
    }
    Ok(())
}

fn list_header() -> String {
    format!(
        "{:<8} {:<10} {:<14} {:>5}  {:<24} {}",
        "ID", "STATUS", "SENDER", "FILES", "UPDATED", "TITLE"
    )
}

fn format_row(case: &Case) -> String {
    format!(
        "{:<8} {:<10} {:<14} {:>5}  {:<24} {}",
        case.case_id.as_str(),
        case.status.to_string(),
        case.sender_id,
        case.file_refs.len(),
        case.updated_at,
        case.title.as_deref().unwrap_or("-")
    )
}

fn format_detail(case: &Case) -> String {
    let mut out = String::new();
    let mut line = |label: &str, value: &str| {
        out.push_str(&format!("{label:<12}{value}\n"));
    };
    line("Case:", case.case_id.as_str());
    line("Status:", &case.status.to_string());
    line("Sender:", &case.sender_id);
    line("Title:", case.title.as_deref().unwrap_or("-"));
    line("Created:", &case.created_at);
    line("Updated:", &case.updated_at);
    if let Some(report) = &case.report_ref {
        let format = case
            .report_format
            .map(|f| f.to_string())
            .unwrap_or_default();
        line("Report:", &format!("{report} ({format})"));
    }
    if let Some(kind) = case.failure_kind {
        let message = case.failure_message.as_deref().unwrap_or_default();
        line("Failure:", &format!("{kind}: {message}"));
    }

    out.push_str("Files:\n");
    if case.file_refs.is_empty() {
        out.push_str("  (none)\n");
    }
    for locator in &case.file_refs {
        out.push_str(&format!("  - {locator}\n"));
    }
    out.push_str("Fields:\n");
    if case.extracted_fields.is_empty() {
        out.push_str("  (none)\n");
    }
    for (name, value) in &case.extracted_fields {
        out.push_str(&format!("  {name}: {value}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebot_core::{ErrorKind, Locator, ReportFormat};
    use std::collections::BTreeMap;

    fn sample() -> Case {
        let mut fields = BTreeMap::new();
        fields.insert("plate".to_string(), "51A-12345".to_string());
        Case {
            case_id: CaseId::from_row_id(7),
            sender_id: "42".into(),
            title: Some("Rear collision".into()),
            status: CaseStatus::Reported,
            file_refs: vec![Locator::new("local:///media/C7/doc1.pdf")],
            extracted_fields: fields,
            report_ref: Some(Locator::new("local:///media/C7/C7_report.pdf")),
            report_format: Some(ReportFormat::Pdf),
            failure_kind: None,
            failure_message: None,
            created_at: "2026-03-01T10:00:00.000Z".into(),
            updated_at: "2026-03-01T10:00:02.000Z".into(),
        }
    }

    #[test]
    fn status_filter_is_case_insensitive() {
        assert_eq!(parse_status("Failed").unwrap(), CaseStatus::Failed);
        assert!(matches!(
            parse_status("done").unwrap_err(),
            CaseError::InvalidInput(_)
        ));
    }

    #[test]
    fn row_shows_id_status_and_title() {
        let row = format_row(&sample());
        assert!(row.starts_with("C7       reported"));
        assert!(row.ends_with("Rear collision"));
    }

    #[test]
    fn detail_lists_files_fields_and_report() {
        let detail = format_detail(&sample());
        assert!(detail.contains("Report:     local:///media/C7/C7_report.pdf (pdf)\n"));
        assert!(detail.contains("  - local:///media/C7/doc1.pdf\n"));
        assert!(detail.contains("  plate: 51A-12345\n"));
        assert!(!detail.contains("Failure:"));
    }

    #[test]
    fn detail_shows_failure() {
        let mut case = sample();
        case.status = CaseStatus::Failed;
        case.report_ref = None;
        case.failure_kind = Some(ErrorKind::MalformedDocument);
        case.failure_message = Some("malformed document: no header".into());
        let detail = format_detail(&case);
        assert!(detail.contains("Failure:    MalformedDocument: malformed document: no header\n"));
    }

    #[tokio::test]
    async fn list_reads_an_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("cases.db").to_string_lossy().to_string();
        let config = casebot_config::load_and_validate_str(&format!(
            "[database]\nurl = {url:?}\n"
        ))
        .unwrap();

        {
            let storage = open_storage(&config).await.unwrap();
            storage.create("42", Some("Hail damage")).await.unwrap();
        }
        run_list(&config, Some("received"), false).await.unwrap();
        run_show(&config, "C1", true).await.unwrap();
        let err = run_show(&config, "C99", false).await.unwrap_err();
        assert!(matches!(err, CaseError::NotFound { .. }));
        let err = run_show(&config, "C01", false).await.unwrap_err();
        assert!(matches!(err, CaseError::NotFound { .. }));
    }
}
