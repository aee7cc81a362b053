//! Template rendering.
//!
//! A render runs in three phases:
//!
//! 1. every tag-bearing part is scanned and each text tag is resolved
//! 2. image locators from all parts are fetched concurrently, bounded by
//!    [`RenderOptions::fetch_concurrency`]
//! 3. each part is spliced back together, images are embedded and the
//!    container is reassembled
//!
//! Bytes outside recognised tag spans are copied through unchanged. Per-tag
//! problems become [`RenderWarning`]s; only container-level failures (and
//! strict mode) abort the render.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reportgen_assets::{fetch_all, AssetFetcher, DEFAULT_CONCURRENCY};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::archive::TemplateDocument;
use crate::docx::{self, ImageFormat, CONTENT_TYPES_PART, REQUIRED_PARTS};
use crate::error::{RenderWarning, TemplateError, TemplateResult, WarningReason};
use crate::scanner::{Segment, TagScanner};
use crate::scope::{Binding, RenderContext, ScopeResolver};
use crate::tag::TagKind;

/// Default embedded image edge, in pixels.
pub const DEFAULT_IMAGE_SIZE_PX: u32 = 250;

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Width of every embedded image, in pixels
    pub image_width_px: u32,
    /// Height of every embedded image, in pixels
    pub image_height_px: u32,
    /// Maximum asset fetches in flight per render
    pub fetch_concurrency: usize,
    /// Emit newlines in values as line breaks
    pub linebreaks: bool,
    /// Fail the render when any warning was collected
    pub strict: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            image_width_px: DEFAULT_IMAGE_SIZE_PX,
            image_height_px: DEFAULT_IMAGE_SIZE_PX,
            fetch_concurrency: DEFAULT_CONCURRENCY,
            linebreaks: true,
            strict: false,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_size(mut self, width_px: u32, height_px: u32) -> Self {
        self.image_width_px = width_px;
        self.image_height_px = height_px;
        self
    }

    pub fn fetch_concurrency(mut self, limit: usize) -> Self {
        self.fetch_concurrency = limit;
        self
    }

    pub fn linebreaks(mut self, enabled: bool) -> Self {
        self.linebreaks = enabled;
        self
    }

    pub fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }
}

/// Value bound to a tag once every lookup and fetch has completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedValue {
    Missing,
    Scalar(String),
    Binary {
        bytes: Vec<u8>,
        width: u32,
        height: u32,
    },
}

/// Counters for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Tag-bearing parts examined
    pub parts_scanned: usize,
    /// Parts that contained at least one tag
    pub parts_rendered: usize,
    pub tags_found: usize,
    pub text_substituted: usize,
    pub images_embedded: usize,
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Reassembled container
    pub bytes: Vec<u8>,
    pub warnings: Vec<RenderWarning>,
    pub stats: RenderStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RenderOutput {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Identifiers named by warnings, in the order they were found.
    pub fn warning_identifiers(&self) -> Vec<&str> {
        self.warnings.iter().map(|w| w.identifier.as_str()).collect()
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

enum Piece {
    Literal(Range<usize>),
    Text { value: String, markup: String },
    Image { slot: Option<usize>, markup: String },
}

struct PartPlan {
    name: String,
    source: String,
    pieces: Vec<Piece>,
    has_tags: bool,
}

struct ImageRequest {
    part: String,
    identifier: String,
    raw: String,
    locator: String,
}

/// Renders templates against a context.
///
/// Holds no per-render state; a single renderer may serve concurrent
/// renders as long as each passes its own document.
pub struct TemplateRenderer {
    options: RenderOptions,
    scanner: TagScanner,
    resolver: ScopeResolver,
    fetcher: Arc<dyn AssetFetcher>,
}

impl TemplateRenderer {
    /// Create a renderer that fetches images through `fetcher`.
    pub fn new(options: RenderOptions, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self {
            options,
            scanner: TagScanner::new(),
            resolver: ScopeResolver::new(),
            fetcher,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Open `template` and render it.
    pub async fn render_bytes(
        &self,
        template: impl Into<Vec<u8>>,
        context: &RenderContext,
    ) -> TemplateResult<RenderOutput> {
        let document = TemplateDocument::open(template)?;
        self.render(document, context).await
    }

    /// Render `document` against `context`.
    pub async fn render(
        &self,
        mut document: TemplateDocument,
        context: &RenderContext,
    ) -> TemplateResult<RenderOutput> {
        let started_at = Utc::now();
        document.require(REQUIRED_PARTS)?;

        let mut warnings = Vec::new();
        let mut stats = RenderStats::default();
        let mut requests = Vec::new();
        let mut plans = Vec::new();

        if document.text(CONTENT_TYPES_PART).is_none() {
            return Err(TemplateError::UnreadablePart {
                part: CONTENT_TYPES_PART.to_string(),
                warnings,
            });
        }

        let part_names = docx::template_parts(&document);
        info!("Rendering template with {} tag-bearing part(s)", part_names.len());

        for name in part_names {
            let Some(source) = document.text(&name).map(str::to_string) else {
                return Err(TemplateError::UnreadablePart {
                    part: name,
                    warnings,
                });
            };
            let plan = self.plan_part(name, source, context, &mut requests, &mut warnings, &mut stats);
            plans.push(plan);
        }

        let mut resolved = self.fetch_images(&requests, &mut warnings).await;

        if self.options.strict && !warnings.is_empty() {
            warn!("Strict render rejected {} problem tag(s)", warnings.len());
            return Err(TemplateError::Unresolved(warnings));
        }

        let first_drawing_id = plans
            .iter()
            .map(|plan| docx::max_drawing_id(&plan.source))
            .max()
            .unwrap_or(0)
            + 1;
        let mut embedder = ImageEmbedder::new(&document, first_drawing_id);

        for plan in plans.iter().filter(|plan| plan.has_tags) {
            let mut output = String::with_capacity(plan.source.len());
            for piece in &plan.pieces {
                match piece {
                    Piece::Literal(range) => output.push_str(&plan.source[range.clone()]),
                    Piece::Text { value, markup } => {
                        output.push_str(value);
                        output.push_str(markup);
                    }
                    Piece::Image { slot, markup } => {
                        let value = slot
                            .and_then(|slot| resolved.get_mut(slot))
                            .map(|value| std::mem::replace(value, ResolvedValue::Missing));
                        if let Some(ResolvedValue::Binary { bytes, width, height }) = value {
                            let drawing =
                                embedder.embed(&mut document, &plan.name, bytes, width, height);
                            output.push_str(&drawing);
                            stats.images_embedded += 1;
                        }
                        output.push_str(markup);
                    }
                }
            }
            debug!("Rendered part {}", plan.name);
            document.set_text(&plan.name, output);
        }

        embedder.finish(&mut document);

        let bytes = document.reassemble()?;
        let finished_at = Utc::now();

        info!(
            "Rendered template: {} text substitution(s), {} image(s), {} warning(s)",
            stats.text_substituted,
            stats.images_embedded,
            warnings.len()
        );

        Ok(RenderOutput {
            bytes,
            warnings,
            stats,
            started_at,
            finished_at,
        })
    }

    /// Scan one part and resolve its text tags.
    fn plan_part(
        &self,
        name: String,
        source: String,
        context: &RenderContext,
        requests: &mut Vec<ImageRequest>,
        warnings: &mut Vec<RenderWarning>,
        stats: &mut RenderStats,
    ) -> PartPlan {
        let scan = self.scanner.scan(&source);
        stats.parts_scanned += 1;

        for malformed in &scan.malformed {
            let identifier = crate::tag::PlaceholderTag::parse(&malformed.text).identifier;
            warn!("Malformed tag in {}: {}", name, malformed.text);
            warnings.push(RenderWarning::new(
                identifier,
                malformed.text.as_ref(),
                name.as_str(),
                WarningReason::Malformed(malformed.reason.to_string()),
            ));
        }

        let mut pieces = Vec::with_capacity(scan.segments.len());
        let mut cursor = 0;
        for segment in &scan.segments {
            let span = match segment {
                Segment::Literal(text) => {
                    pieces.push(Piece::Literal(cursor..cursor + text.len()));
                    cursor += text.len();
                    continue;
                }
                Segment::Tag(span) => span,
            };
            cursor = span.range.end;
            stats.tags_found += 1;

            let tag = &span.tag;
            let markup = span.markup.concat();
            let binding = self.resolver.resolve(&tag.identifier, context);

            match tag.kind {
                TagKind::Text => {
                    let value = match binding.text() {
                        Some(text) => {
                            stats.text_substituted += 1;
                            docx::text_value(text, self.options.linebreaks)
                        }
                        None => {
                            warn!("Unresolved tag {} in {}", span.text, name);
                            warnings.push(RenderWarning::new(
                                tag.identifier.as_str(),
                                span.text.as_ref(),
                                name.as_str(),
                                WarningReason::Unresolved,
                            ));
                            String::new()
                        }
                    };
                    pieces.push(Piece::Text { value, markup });
                }
                TagKind::Image => {
                    let slot = match binding.locator() {
                        Some(locator) => {
                            requests.push(ImageRequest {
                                part: name.clone(),
                                identifier: tag.identifier.clone(),
                                raw: span.text.to_string(),
                                locator: locator.to_string(),
                            });
                            Some(requests.len() - 1)
                        }
                        None => {
                            let reason = match binding {
                                Binding::Missing => WarningReason::Unresolved,
                                _ => WarningReason::NotAnAsset,
                            };
                            warn!("Image tag {} in {} has no asset: {}", span.text, name, reason);
                            warnings.push(RenderWarning::new(
                                tag.identifier.as_str(),
                                span.text.as_ref(),
                                name.as_str(),
                                reason,
                            ));
                            None
                        }
                    };
                    pieces.push(Piece::Image { slot, markup });
                }
            }
        }

        let has_tags = scan.has_tags();
        if has_tags {
            stats.parts_rendered += 1;
        }
        drop(scan);

        PartPlan {
            name,
            source,
            pieces,
            has_tags,
        }
    }

    /// Fetch every requested image; failures degrade to `Missing`.
    async fn fetch_images(
        &self,
        requests: &[ImageRequest],
        warnings: &mut Vec<RenderWarning>,
    ) -> Vec<ResolvedValue> {
        if requests.is_empty() {
            return Vec::new();
        }

        let locators: Vec<String> = requests.iter().map(|r| r.locator.clone()).collect();
        let results = fetch_all(
            self.fetcher.as_ref(),
            &locators,
            self.options.fetch_concurrency,
        )
        .await;

        requests
            .iter()
            .zip(results)
            .map(|(request, result)| match result {
                Ok(bytes) => ResolvedValue::Binary {
                    bytes,
                    width: self.options.image_width_px,
                    height: self.options.image_height_px,
                },
                Err(failure) => {
                    warn!(
                        "Image {} in {} not embedded: {}",
                        request.identifier, request.part, failure
                    );
                    warnings.push(RenderWarning::new(
                        request.identifier.as_str(),
                        request.raw.as_str(),
                        request.part.as_str(),
                        WarningReason::FetchFailed(failure.to_string()),
                    ));
                    ResolvedValue::Missing
                }
            })
            .collect()
    }
}

/// Tracks the media, relationships and content types added by one render.
struct ImageEmbedder {
    content_types: Option<String>,
    /// Relationship part name to its (possibly new) content
    relationships: BTreeMap<String, Option<String>>,
    next_media: usize,
    next_drawing_id: u32,
    embedded: usize,
}

impl ImageEmbedder {
    fn new(document: &TemplateDocument, first_drawing_id: u32) -> Self {
        Self {
            content_types: document.text(CONTENT_TYPES_PART).map(str::to_string),
            relationships: BTreeMap::new(),
            next_media: 1,
            next_drawing_id: first_drawing_id,
            embedded: 0,
        }
    }

    /// Store `bytes` as a media part related to `part`; return the drawing
    /// markup to splice in place of the tag.
    fn embed(
        &mut self,
        document: &mut TemplateDocument,
        part: &str,
        bytes: Vec<u8>,
        width: u32,
        height: u32,
    ) -> String {
        let format = ImageFormat::detect(&bytes);

        let media = loop {
            let candidate = format!(
                "word/media/reportgen_image{}.{}",
                self.next_media,
                format.extension()
            );
            self.next_media += 1;
            if !document.contains(&candidate) {
                break candidate;
            }
        };
        document.insert_binary(&media, bytes);

        let rels_name = docx::rels_part_for(part);
        let rels = self
            .relationships
            .entry(rels_name.clone())
            .or_insert_with(|| document.text(&rels_name).map(str::to_string));

        let mut counter = self.embedded + 1;
        let relationship_id = loop {
            let candidate = format!("rIdReportgen{}", counter);
            counter += 1;
            if !rels
                .as_deref()
                .is_some_and(|existing| docx::has_relationship_id(existing, &candidate))
            {
                break candidate;
            }
        };
        let target = docx::relative_target(part, &media);
        *rels = Some(docx::add_image_relationship(
            rels.as_deref(),
            &relationship_id,
            &target,
        ));

        if let Some(content_types) = &self.content_types {
            self.content_types = Some(docx::ensure_content_type(content_types, format));
        }

        let drawing_id = self.next_drawing_id;
        self.next_drawing_id += 1;
        self.embedded += 1;

        let file_name = media.rsplit('/').next().unwrap_or(&media);
        debug!("Embedded {} as {} ({})", file_name, relationship_id, part);
        docx::inline_image(&relationship_id, drawing_id, file_name, width, height)
    }

    /// Write updated relationships and content types back.
    fn finish(self, document: &mut TemplateDocument) {
        if self.embedded == 0 {
            return;
        }
        for (name, content) in self.relationships {
            if let Some(content) = content {
                document.set_text(&name, content);
            }
        }
        if let Some(content_types) = self.content_types {
            document.set_text(CONTENT_TYPES_PART, content_types);
        }
    }
}
