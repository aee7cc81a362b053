//! Tag span scanning over serialized markup.
//!
//! The scanner splits a part into literal segments and tag spans in one
//! left-to-right pass. Word processors often split typed text across runs,
//! so a tag body may contain markup elements; those are stripped before
//! parsing and handed back to the renderer to re-emit unchanged.

use std::borrow::Cow;
use std::ops::Range;

use regex::Regex;

use crate::tag::PlaceholderTag;

/// Well-bounded tag spans: no braces inside the body.
const TAG_PATTERN: &str = r"\{\{([^{}]*)\}\}|\{%([^{}]*)\}";
const MARKUP_PATTERN: &str = r"<[^<>]*>";
const OPENER_PATTERN: &str = r"\{[{%]";

/// A recognised tag span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpan<'a> {
    /// Byte range of the span in the scanned source
    pub range: Range<usize>,
    /// Span text with markup elements removed
    pub text: Cow<'a, str>,
    pub tag: PlaceholderTag,
    /// Markup elements found inside the span, in source order
    pub markup: Vec<&'a str>,
}

/// One piece of a scanned part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Tag(TagSpan<'a>),
}

/// Text that looks like a tag but does not follow the grammar.
///
/// Malformed spans stay in the literal output untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedSpan<'a> {
    pub range: Range<usize>,
    pub text: Cow<'a, str>,
    pub reason: &'static str,
}

/// Result of scanning one part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan<'a> {
    pub segments: Vec<Segment<'a>>,
    pub malformed: Vec<MalformedSpan<'a>>,
}

impl<'a> Scan<'a> {
    /// Iterate over the recognised tags only.
    pub fn tags(&self) -> impl Iterator<Item = &TagSpan<'a>> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Tag(span) => Some(span),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_tags(&self) -> bool {
        self.tags().next().is_some()
    }
}

/// Finds placeholder spans in markup text.
pub struct TagScanner {
    tag_pattern: Regex,
    markup_pattern: Regex,
    opener_pattern: Regex,
}

impl Default for TagScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl TagScanner {
    pub fn new() -> Self {
        Self {
            tag_pattern: Regex::new(TAG_PATTERN).expect("tag pattern is valid"),
            markup_pattern: Regex::new(MARKUP_PATTERN).expect("markup pattern is valid"),
            opener_pattern: Regex::new(OPENER_PATTERN).expect("opener pattern is valid"),
        }
    }

    /// Scan `source` into literal and tag segments.
    ///
    /// Concatenating the source ranges of all segments yields `source` again.
    pub fn scan<'a>(&self, source: &'a str) -> Scan<'a> {
        let mut scan = Scan::default();
        let mut cursor = 0;

        for found in self.tag_pattern.find_iter(source) {
            let span = found.as_str();
            let markup: Vec<&'a str> = self
                .markup_pattern
                .find_iter(span)
                .map(|m| m.as_str())
                .collect();
            let text = if markup.is_empty() {
                Cow::Borrowed(span)
            } else {
                self.markup_pattern.replace_all(span, "")
            };

            let tag = PlaceholderTag::parse(&text);
            if !tag.is_well_formed() {
                scan.malformed.push(MalformedSpan {
                    range: found.range(),
                    text,
                    reason: "invalid identifier",
                });
                continue;
            }

            if found.start() > cursor {
                scan.segments.push(Segment::Literal(&source[cursor..found.start()]));
            }
            scan.segments.push(Segment::Tag(TagSpan {
                range: found.range(),
                text,
                tag,
                markup,
            }));
            cursor = found.end();
        }

        if cursor < source.len() {
            scan.segments.push(Segment::Literal(&source[cursor..]));
        }

        self.find_unterminated(source, &mut scan);
        scan
    }

    /// Report openers that belong to no tag span at all.
    fn find_unterminated<'a>(&self, source: &'a str, scan: &mut Scan<'a>) {
        let covered: Vec<Range<usize>> = scan
            .tags()
            .map(|span| span.range.clone())
            .chain(scan.malformed.iter().map(|m| m.range.clone()))
            .collect();

        let mut unterminated = Vec::new();
        for opener in self.opener_pattern.find_iter(source) {
            let start = opener.start();
            if covered.iter().any(|r| r.contains(&start)) {
                continue;
            }
            let end = source[start..]
                .char_indices()
                .nth(24)
                .map(|(i, _)| start + i)
                .unwrap_or(source.len());
            unterminated.push(MalformedSpan {
                range: start..end,
                text: Cow::Borrowed(&source[start..end]),
                reason: "unterminated tag",
            });
        }

        scan.malformed.extend(unterminated);
        scan.malformed.sort_by_key(|m| m.range.start);
    }
}
