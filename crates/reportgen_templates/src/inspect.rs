//! Template inspection: list the placeholders a template uses without
//! resolving anything.

use serde::{Deserialize, Serialize};

use crate::archive::TemplateDocument;
use crate::docx;
use crate::error::{ArchiveError, ArchiveResult};
use crate::tag::{PlaceholderTag, TagKind};
use crate::scanner::TagScanner;

/// One tag found in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagOccurrence {
    pub part: String,
    pub kind: TagKind,
    pub identifier: String,
    pub formatter: Option<String>,
    /// Tag text with markup removed
    pub raw: String,
    /// Why the span is not a usable tag, if it is not
    pub malformed: Option<String>,
}

impl TagOccurrence {
    pub fn is_malformed(&self) -> bool {
        self.malformed.is_some()
    }
}

/// Lists placeholder occurrences across the tag-bearing parts.
#[derive(Default)]
pub struct TemplateInspector {
    scanner: TagScanner,
}

impl TemplateInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tag and malformed span, grouped by part in container order.
    pub fn inspect(&self, document: &TemplateDocument) -> ArchiveResult<Vec<TagOccurrence>> {
        document.require(docx::REQUIRED_PARTS)?;

        let mut occurrences = Vec::new();
        for part in docx::template_parts(document) {
            let source = document
                .text(&part)
                .ok_or_else(|| ArchiveError::UnreadablePart {
                    part: part.clone(),
                    message: "not UTF-8 markup".to_string(),
                })?;
            let scan = self.scanner.scan(source);

            let mut found: Vec<(usize, TagOccurrence)> = scan
                .tags()
                .map(|span| {
                    (
                        span.range.start,
                        TagOccurrence {
                            part: part.clone(),
                            kind: span.tag.kind,
                            identifier: span.tag.identifier.clone(),
                            formatter: span.tag.formatter.clone(),
                            raw: span.text.to_string(),
                            malformed: None,
                        },
                    )
                })
                .collect();

            found.extend(scan.malformed.iter().map(|m| {
                let tag = PlaceholderTag::parse(&m.text);
                (
                    m.range.start,
                    TagOccurrence {
                        part: part.clone(),
                        kind: tag.kind,
                        identifier: tag.identifier,
                        formatter: tag.formatter,
                        raw: m.text.to_string(),
                        malformed: Some(m.reason.to_string()),
                    },
                )
            }));

            found.sort_by_key(|(start, _)| *start);
            occurrences.extend(found.into_iter().map(|(_, occurrence)| occurrence));
        }

        Ok(occurrences)
    }

    /// Distinct identifiers of well-formed tags, in first-seen order.
    pub fn identifiers(&self, document: &TemplateDocument) -> ArchiveResult<Vec<String>> {
        let mut identifiers: Vec<String> = Vec::new();
        for occurrence in self.inspect(document)? {
            if !occurrence.is_malformed() && !identifiers.contains(&occurrence.identifier) {
                identifiers.push(occurrence.identifier);
            }
        }
        Ok(identifiers)
    }
}
