// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case CRUD operations.

use std::str::FromStr;

use casebot_core::{Case, CaseError, CaseId, CasePatch, CaseStatus, ErrorKind, ReportFormat};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use crate::database::{Database, map_tr_err, now_timestamp};

const CASE_COLUMNS: &str = "id, sender_id, title, status, file_refs, extracted_fields,
     report_ref, report_format, failure_kind, failure_message, created_at, updated_at";

/// Insert a new case in `received` state.
pub async fn create_case(
    db: &Database,
    sender_id: &str,
    title: Option<&str>,
) -> Result<CaseId, CaseError> {
    let sender_id = sender_id.to_string();
    let title = title.map(str::to_string);
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<CaseId, rusqlite::Error> {
            conn.execute(
                "INSERT INTO cases (sender_id, title, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![sender_id, title, CaseStatus::Received.to_string(), now],
            )?;
            Ok(CaseId::from_row_id(conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// Get a case by id. Unknown or malformed ids yield `NotFound`.
pub async fn get_case(db: &Database, case_id: &CaseId) -> Result<Case, CaseError> {
    let Some(row_id) = case_id.row_id() else {
        return Err(CaseError::not_found(format!("case {case_id}")));
    };
    let case = db
        .connection()
        .call(move |conn| select_case(conn, row_id))
        .await
        .map_err(map_tr_err)?;
    case.ok_or_else(|| CaseError::not_found(format!("case {case_id}")))
}

/// Merge `patch` into a case inside an immediate transaction.
///
/// The read, merge, and write happen on the connection thread under one
/// write lock, so concurrent patches to the same case are applied in turn.
pub async fn update_case(
    db: &Database,
    case_id: &CaseId,
    patch: CasePatch,
) -> Result<Case, CaseError> {
    let Some(row_id) = case_id.row_id() else {
        return Err(CaseError::not_found(format!("case {case_id}")));
    };
    let label = case_id.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<Result<Case, CaseError>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(mut case) = select_case(&tx, row_id)? else {
                return Ok(Err(CaseError::not_found(format!("case {label}"))));
            };
            if let Err(e) = case.apply(patch, &now) {
                return Ok(Err(e));
            }
            tx.execute(
                "UPDATE cases SET title = ?1, status = ?2, file_refs = ?3,
                     extracted_fields = ?4, report_ref = ?5, report_format = ?6,
                     failure_kind = ?7, failure_message = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    case.title,
                    case.status.to_string(),
                    to_json(&case.file_refs)?,
                    to_json(&case.extracted_fields)?,
                    case.report_ref.as_ref().map(|l| l.as_str().to_string()),
                    case.report_format.map(|f| f.to_string()),
                    case.failure_kind.map(|k| k.to_string()),
                    case.failure_message,
                    case.updated_at,
                    row_id,
                ],
            )?;
            tx.commit()?;
            Ok(Ok(case))
        })
        .await
        .map_err(map_tr_err)?
}

/// The newest case of a sender, optionally restricted to one status.
pub async fn latest_case_for_sender(
    db: &Database,
    sender_id: &str,
    status: Option<CaseStatus>,
) -> Result<Option<Case>, CaseError> {
    let sender_id = sender_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Case>, rusqlite::Error> {
            match status {
                Some(status) => conn
                    .query_row(
                        &format!(
                            "SELECT {CASE_COLUMNS} FROM cases
                             WHERE sender_id = ?1 AND status = ?2
                             ORDER BY id DESC LIMIT 1"
                        ),
                        params![sender_id, status.to_string()],
                        case_from_row,
                    )
                    .optional(),
                None => conn
                    .query_row(
                        &format!(
                            "SELECT {CASE_COLUMNS} FROM cases
                             WHERE sender_id = ?1 ORDER BY id DESC LIMIT 1"
                        ),
                        params![sender_id],
                        case_from_row,
                    )
                    .optional(),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List cases newest first, optionally filtered by status.
pub async fn list_cases(
    db: &Database,
    status: Option<CaseStatus>,
) -> Result<Vec<Case>, CaseError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Case>, rusqlite::Error> {
            let mut cases = Vec::new();
            match status {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CASE_COLUMNS} FROM cases WHERE status = ?1 ORDER BY id DESC"
                    ))?;
                    let rows = stmt.query_map(params![status.to_string()], case_from_row)?;
                    for row in rows {
                        cases.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CASE_COLUMNS} FROM cases ORDER BY id DESC"
                    ))?;
                    let rows = stmt.query_map([], case_from_row)?;
                    for row in rows {
                        cases.push(row?);
                    }
                }
            }
            Ok(cases)
        })
        .await
        .map_err(map_tr_err)
}

fn select_case(conn: &Connection, row_id: i64) -> Result<Option<Case>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = ?1"),
        params![row_id],
        case_from_row,
    )
    .optional()
}

fn case_from_row(row: &Row<'_>) -> Result<Case, rusqlite::Error> {
    let file_refs: String = row.get(4)?;
    let fields: String = row.get(5)?;
    let report_ref: Option<String> = row.get(6)?;
    Ok(Case {
        case_id: CaseId::from_row_id(row.get(0)?),
        sender_id: row.get(1)?,
        title: row.get(2)?,
        status: parse_column(3, &row.get::<_, String>(3)?)?,
        file_refs: from_json(4, &file_refs)?,
        extracted_fields: from_json(5, &fields)?,
        report_ref: report_ref.map(casebot_core::Locator::new),
        report_format: row
            .get::<_, Option<String>>(7)?
            .map(|v| parse_column::<ReportFormat>(7, &v))
            .transpose()?,
        failure_kind: row
            .get::<_, Option<String>>(8)?
            .map(|v| parse_column::<ErrorKind>(8, &v))
            .transpose()?,
        failure_message: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn parse_column<T>(idx: usize, value: &str) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn from_json<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> Result<T, rusqlite::Error> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, rusqlite::Error> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use casebot_core::Locator;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let (db, _dir) = setup_db().await;
        let first = create_case(&db, "42", None).await.unwrap();
        let second = create_case(&db, "42", Some("Rear bumper")).await.unwrap();
        assert_eq!(first.as_str(), "C1");
        assert_eq!(second.as_str(), "C2");

        let case = get_case(&db, &second).await.unwrap();
        assert_eq!(case.status, CaseStatus::Received);
        assert_eq!(case.title.as_deref(), Some("Rear bumper"));
        assert!(case.file_refs.is_empty());
        assert_eq!(case.created_at, case.updated_at);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_unknown_case_is_not_found() {
        let (db, _dir) = setup_db().await;
        for id in ["C99", "not-an-id"] {
            let err = get_case(&db, &CaseId(id.into())).await.unwrap_err();
            assert!(matches!(err, CaseError::NotFound { .. }), "id {id}");
        }
    }

    #[tokio::test]
    async fn update_merges_and_persists() {
        let (db, _dir) = setup_db().await;
        let id = create_case(&db, "42", None).await.unwrap();
        let locator = Locator::new("local:///media/C1/doc1.pdf");

        update_case(
            &db,
            &id,
            CasePatch::status(CaseStatus::Stored).with_file_ref(locator.clone()),
        )
        .await
        .unwrap();
        update_case(
            &db,
            &id,
            CasePatch::status(CaseStatus::Extracted)
                .with_fields(fields(&[("policy_number", "PN-12345")])),
        )
        .await
        .unwrap();
        let report = Locator::new("local:///media/C1/C1_report.pdf");
        let merged = update_case(
            &db,
            &id,
            CasePatch::status(CaseStatus::Reported).with_report(report.clone(), ReportFormat::Pdf),
        )
        .await
        .unwrap();

        let stored = get_case(&db, &id).await.unwrap();
        assert_eq!(stored, merged);
        assert_eq!(stored.status, CaseStatus::Reported);
        assert_eq!(stored.file_refs, vec![locator]);
        assert_eq!(stored.extracted_fields["policy_number"], "PN-12345");
        assert_eq!(stored.report_ref, Some(report));
        assert_eq!(stored.report_format, Some(ReportFormat::Pdf));
    }

    #[tokio::test]
    async fn rejected_transition_leaves_row_unchanged() {
        let (db, _dir) = setup_db().await;
        let id = create_case(&db, "42", None).await.unwrap();
        let err = update_case(&db, &id, CasePatch::status(CaseStatus::Reported))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::InvalidTransition { .. }));
        assert_eq!(get_case(&db, &id).await.unwrap().status, CaseStatus::Received);
    }

    #[tokio::test]
    async fn failure_is_recorded() {
        let (db, _dir) = setup_db().await;
        let id = create_case(&db, "42", None).await.unwrap();
        let cause = CaseError::MalformedDocument("no trailer".into());
        update_case(&db, &id, CasePatch::failed(&cause)).await.unwrap();

        let case = get_case(&db, &id).await.unwrap();
        assert_eq!(case.status, CaseStatus::Failed);
        assert_eq!(case.failure_kind, Some(ErrorKind::MalformedDocument));
        assert!(case.failure_message.unwrap().contains("no trailer"));
    }

    #[tokio::test]
    async fn concurrent_updates_keep_every_field() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);
        let id = create_case(&db, "42", None).await.unwrap();
        update_case(&db, &id, CasePatch::status(CaseStatus::Stored))
            .await
            .unwrap();

        let tasks = (0..16).map(|i| {
            let db = Arc::clone(&db);
            let id = id.clone();
            tokio::spawn(async move {
                let patch = CasePatch::default()
                    .with_fields(fields(&[(&format!("field_{i}"), &i.to_string())]))
                    .with_file_ref(Locator::new(format!("local:///media/C1/p{i}.jpg")));
                update_case(&db, &id, patch).await
            })
        });
        for result in futures::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let case = get_case(&db, &id).await.unwrap();
        assert_eq!(case.extracted_fields.len(), 16);
        assert_eq!(case.file_refs.len(), 16);
    }

    #[tokio::test]
    async fn latest_and_list_are_newest_first() {
        let (db, _dir) = setup_db().await;
        let a = create_case(&db, "42", None).await.unwrap();
        let b = create_case(&db, "42", None).await.unwrap();
        let other = create_case(&db, "7", None).await.unwrap();
        update_case(&db, &b, CasePatch::status(CaseStatus::Stored))
            .await
            .unwrap();

        let open = latest_case_for_sender(&db, "42", Some(CaseStatus::Received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(open.case_id, a);
        let latest = latest_case_for_sender(&db, "42", None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.case_id, b);
        assert!(
            latest_case_for_sender(&db, "nobody", None)
                .await
                .unwrap()
                .is_none()
        );

        let all: Vec<_> = list_cases(&db, None)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.case_id)
            .collect();
        assert_eq!(all, vec![other.clone(), b.clone(), a.clone()]);

        let received: Vec<_> = list_cases(&db, Some(CaseStatus::Received))
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.case_id)
            .collect();
        assert_eq!(received, vec![other, a]);
    }
}
