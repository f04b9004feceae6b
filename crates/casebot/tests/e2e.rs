// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete intake pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite, a temp media
//! directory, and mock chat/model adapters. Tests are independent and
//! order-insensitive.

use std::time::Duration;

use casebot_core::types::MessageContent;
use casebot_core::{BlobStore, CaseId, CaseRepository, CaseStatus, Locator};
use casebot_intake::IntakeLoop;
use casebot_storage::SqliteStorage;
use casebot_test_utils::{TestHarness, make_pdf};
use tokio_util::sync::CancellationToken;

// ---- Single attachment, fresh sender ----

#[tokio::test]
async fn first_attachment_creates_c1_and_reports_it() {
    let harness = TestHarness::builder()
        .with_field_rule("policy", r"Policy\s*No\.?:\s*(\S+)")
        .build()
        .await
        .unwrap();
    let pdf = make_pdf(&["Policy No: P-2026-0001", "Insured: Nguyen Van A"]);

    let replies = harness
        .send_document("U1", "doc1.pdf", pdf.clone())
        .await
        .unwrap();

    let c1 = CaseId::from_row_id(1);
    let expected = Locator::new(format!(
        "local://{}/C1/doc1.pdf",
        harness.media_dir.display()
    ));

    let case = harness.repository.get(&c1).await.unwrap();
    assert_eq!(case.sender_id, "U1");
    assert_eq!(case.file_refs, vec![expected.clone()]);
    assert_eq!(case.extracted_fields["policy"], "P-2026-0001");
    assert_eq!(
        harness.repository.statuses(&c1).await,
        vec![
            CaseStatus::Received,
            CaseStatus::Stored,
            CaseStatus::Extracted,
            CaseStatus::Reported,
        ]
    );

    // The stored blob is byte-identical and the report is retrievable.
    assert_eq!(harness.blobs.fetch(&expected).await.unwrap(), pdf);
    let report_ref = case.report_ref.unwrap();
    let report = harness.blobs.fetch(&report_ref).await.unwrap();
    assert!(!report.is_empty());
    assert_eq!(
        replies[0].document.as_ref().unwrap().data,
        report,
        "the sent report is the stored one"
    );
}

// ---- Text-only report falls back cleanly ----

#[tokio::test]
async fn text_reports_contain_case_id() {
    let harness = TestHarness::builder()
        .with_pdf_reports(false)
        .build()
        .await
        .unwrap();

    harness
        .send_document("U1", "doc1.pdf", make_pdf(&["anything"]))
        .await
        .unwrap();

    let case = harness
        .repository
        .get(&CaseId::from_row_id(1))
        .await
        .unwrap();
    let report = harness.blobs.fetch(&case.report_ref.unwrap()).await.unwrap();
    let text = String::from_utf8(report).unwrap();
    assert!(text.contains("C1"));
    assert!(text.contains("doc1.pdf"));
}

// ---- Chat report includes the latest case ----

#[tokio::test]
async fn chat_report_after_case_mentions_it() {
    let harness = TestHarness::builder()
        .with_pdf_reports(false)
        .with_mock_responses(vec!["Total loss unlikely.".into()])
        .build()
        .await
        .unwrap();

    harness
        .send_document("U1", "doc1.pdf", make_pdf(&["claim"]))
        .await
        .unwrap();
    let replies = harness
        .send_text("U1", "báo cáo giám định")
        .await
        .unwrap();

    let document = replies[0].document.as_ref().unwrap();
    assert!(document.file_name.ends_with(".txt"));
    let text = String::from_utf8(document.data.clone()).unwrap();
    assert!(text.contains("Total loss unlikely."));
    assert!(text.contains("C1"));
}

// ---- Receive loop, shutdown, and restart ----

#[tokio::test]
async fn loop_processes_events_and_state_survives_restart() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["noted".into()])
        .build()
        .await
        .unwrap();

    let doc = harness.inbound(
        "U7",
        MessageContent::Document {
            data: make_pdf(&["loop test"]),
            filename: "claim.pdf".into(),
            mime_type: "application/pdf".into(),
        },
    );
    let text = harness.inbound("U8", MessageContent::Text("hello".into()));
    harness.mock_channel.inject_message(doc).await;
    harness.mock_channel.inject_message(text).await;
    harness.mock_channel.close();

    let intake = IntakeLoop::new(harness.mock_channel.clone(), harness.handler.clone());
    tokio::time::timeout(Duration::from_secs(10), intake.run(CancellationToken::new()))
        .await
        .expect("intake loop did not stop")
        .unwrap();

    let sent = harness.mock_channel.sent_messages().await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|m| m.content == "noted"));
    assert!(sent.iter().any(|m| m.document.is_some()));

    // A fresh process sees the persisted case.
    let reopened = SqliteStorage::new(harness.config.database.clone());
    reopened.initialize().await.unwrap();
    let case = reopened.get(&CaseId::from_row_id(1)).await.unwrap();
    assert_eq!(case.status, CaseStatus::Reported);
    assert_eq!(case.sender_id, "U7");
}
