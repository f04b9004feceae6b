// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PDF field extraction driven by configured regex rules.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use casebot_config::model::FieldRule;
use casebot_core::{CaseError, DocumentExtractor};
use lopdf::Document;
use regex::Regex;
use tracing::debug;

/// A compiled extraction rule.
#[derive(Debug, Clone)]
struct CompiledRule {
    name: String,
    pattern: Regex,
}

/// Extracts fields from PDF text using the `[[extractor.fields]]` rules.
#[derive(Debug, Clone)]
pub struct PdfFieldExtractor {
    rules: Arc<Vec<CompiledRule>>,
}

impl PdfFieldExtractor {
    /// Compiles the configured rules. Patterns are validated at config load,
    /// so an error here means the rules bypassed validation.
    pub fn new(rules: &[FieldRule]) -> Result<Self, CaseError> {
        let compiled = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|pattern| CompiledRule {
                        name: rule.name.clone(),
                        pattern,
                    })
                    .map_err(|e| {
                        CaseError::InvalidConfiguration(format!(
                            "extractor field `{}` has an invalid pattern: {e}",
                            rule.name
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            rules: Arc::new(compiled),
        })
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// Text of each page in page order. Pages that fail to decode yield no text.
fn page_texts(bytes: &[u8]) -> Result<Vec<String>, CaseError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| CaseError::MalformedDocument(format!("not a readable PDF: {e}")))?;
    let texts = doc
        .get_pages()
        .keys()
        .map(|&page| match doc.extract_text(&[page]) {
            Ok(text) => text,
            Err(e) => {
                debug!(page, error = %e, "page text could not be decoded, skipping");
                String::new()
            }
        })
        .collect();
    Ok(texts)
}

fn apply_rules(rules: &[CompiledRule], pages: &[String]) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for rule in rules {
        let value = pages.iter().find_map(|text| {
            rule.pattern.captures(text).and_then(|caps| {
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| m.as_str().trim().to_string())
            })
        });
        if let Some(value) = value {
            fields.insert(rule.name.clone(), value);
        }
    }
    fields
}

#[async_trait]
impl DocumentExtractor for PdfFieldExtractor {
    async fn extract(&self, pdf_bytes: &[u8]) -> Result<BTreeMap<String, String>, CaseError> {
        let bytes = pdf_bytes.to_vec();
        let rules = Arc::clone(&self.rules);
        let fields = tokio::task::spawn_blocking(move || {
            let pages = page_texts(&bytes)?;
            Ok::<_, CaseError>(apply_rules(&rules, &pages))
        })
        .await
        .map_err(|e| CaseError::Internal(format!("extraction task failed: {e}")))??;
        debug!(fields = fields.len(), "PDF fields extracted");
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Object, Stream, StringFormat};

    fn rule(name: &str, pattern: &str) -> FieldRule {
        FieldRule {
            name: name.into(),
            pattern: pattern.into(),
        }
    }

    /// Builds a PDF with one page per entry in `pages`.
    fn make_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]));
        let resources = Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
        )]);

        let mut kids = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                    Operation::new("Td", vec![Object::Integer(50), Object::Integer(800)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Resources", Object::Dictionary(resources.clone())),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(kids.len() as i64)),
            ("Kids", Object::Array(kids)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ]),
            ),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn extractor() -> PdfFieldExtractor {
        PdfFieldExtractor::new(&[
            rule("policy_number", r"Policy No[.:]?\s*([A-Z]{2}-\d+)"),
            rule("plate", r"Plate:\s*(\S+)"),
            rule("claim", r"CLAIM-\d+"),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_malformed() {
        let err = extractor()
            .extract(b"GIF89a definitely not a pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::MalformedDocument(_)));
    }

    #[tokio::test]
    async fn empty_pdf_yields_empty_map() {
        let fields = extractor().extract(&make_pdf(&[])).await.unwrap();
        assert!(fields.is_empty());
    }

    #[tokio::test]
    async fn pdf_without_matches_yields_empty_map() {
        let fields = extractor()
            .extract(&make_pdf(&["Nothing of interest here"]))
            .await
            .unwrap();
        assert!(fields.is_empty());
    }

    #[tokio::test]
    async fn fields_are_extracted_across_pages() {
        let pdf = make_pdf(&[
            "Policy No: PN-12345",
            "Plate: 51A-99999 and CLAIM-77",
            "Policy No: PN-00000",
        ]);
        let fields = extractor().extract(&pdf).await.unwrap();
        assert_eq!(fields["policy_number"], "PN-12345");
        assert_eq!(fields["plate"], "51A-99999");
        // No capture group: the whole match is the value.
        assert_eq!(fields["claim"], "CLAIM-77");
    }

    #[test]
    fn invalid_pattern_is_configuration_error() {
        let err = PdfFieldExtractor::new(&[rule("bad", "(unclosed")]).unwrap_err();
        assert!(matches!(err, CaseError::InvalidConfiguration(_)));
    }

    #[test]
    fn first_matching_page_wins() {
        let rules = extractor();
        let fields = apply_rules(
            &rules.rules,
            &["".to_string(), "Plate: A".to_string(), "Plate: B".to_string()],
        );
        assert_eq!(fields["plate"], "A");
    }
}
