// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report content as a sequence of lines, shared by the PDF and text outputs.

use casebot_core::Case;

/// Maximum characters per PDF line before wrapping.
pub const WRAP_WIDTH: usize = 100;

/// A report document before it is laid out on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub heading: String,
    pub lines: Vec<String>,
}

impl ReportDocument {
    /// Plain-text form, one line per entry, keeping full Unicode.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(64 * (self.lines.len() + 2));
        out.push_str(&self.heading);
        out.push_str("\n\n");
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Builds the summary of a single case.
pub fn case_summary(bot_name: &str, case: &Case) -> ReportDocument {
    let mut lines = Vec::new();
    push_case_block(&mut lines, case);
    ReportDocument {
        heading: format!("{bot_name} - Case report"),
        lines,
    }
}

/// Builds a chat analysis report: the request, the model's answer, and the
/// sender's latest case when there is one.
pub fn analysis_report(
    bot_name: &str,
    sender_id: &str,
    generated_at: &str,
    case: Option<&Case>,
    request: &str,
    analysis: &str,
) -> ReportDocument {
    let mut lines = vec![
        format!("Sender: {sender_id}"),
        format!("Generated: {generated_at}"),
        String::new(),
        "Request:".to_string(),
    ];
    lines.extend(request.lines().map(|l| format!("  {l}")));
    lines.push(String::new());
    lines.push("Analysis:".to_string());
    lines.extend(analysis.lines().map(|l| format!("  {l}")));
    if let Some(case) = case {
        lines.push(String::new());
        lines.push("Latest case:".to_string());
        push_case_block(&mut lines, case);
    }
    ReportDocument {
        heading: format!("{bot_name} - Assessment report"),
        lines,
    }
}

fn push_case_block(lines: &mut Vec<String>, case: &Case) {
    lines.push(format!("Case: {}", case.case_id));
    if let Some(title) = &case.title {
        lines.push(format!("Title: {title}"));
    }
    lines.push(format!("Sender: {}", case.sender_id));
    lines.push(format!("Status: {}", case.status));
    lines.push(format!("Created: {}", case.created_at));
    lines.push(format!("Updated: {}", case.updated_at));

    lines.push("Attachments:".to_string());
    if case.file_refs.is_empty() {
        lines.push("  (none)".to_string());
    }
    for locator in &case.file_refs {
        lines.push(format!("  - {}", locator.file_name()));
    }

    lines.push("Extracted fields:".to_string());
    if case.extracted_fields.is_empty() {
        lines.push("  (none)".to_string());
    }
    for (name, value) in &case.extracted_fields {
        lines.push(format!("  {name}: {value}"));
    }
}

/// Wraps a line at word boundaries so no output line exceeds `width` chars.
///
/// Words longer than `width` are split hard. Leading indentation is kept on
/// the first output line only.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for word in line.split(' ') {
        let word_len = word.chars().count();
        let sep = usize::from(current_len > 0);
        if current_len + sep + word_len <= width {
            if sep == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_len += sep + word_len;
            continue;
        }
        if current_len > 0 {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        let mut chars: Vec<char> = word.chars().collect();
        while chars.len() > width {
            let rest = chars.split_off(width);
            out.push(chars.into_iter().collect());
            chars = rest;
        }
        current_len = chars.len();
        current = chars.into_iter().collect();
    }
    if current_len > 0 || out.is_empty() {
        out.push(current);
    }
    out
}
