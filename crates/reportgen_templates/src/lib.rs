//! # reportgen_templates
//!
//! Placeholder parsing and document template rendering for reportgen.
//!
//! A template is a DOCX container whose markup carries placeholders:
//!
//! - `{{Name}}` is replaced with the text bound to `Name`
//! - `{{Name:upper()}}` binds exactly like `{{Name}}`; the formatter is kept
//!   for diagnostics only
//! - `{%Photo%}` (or `{%Photo}`) embeds the image behind `Photo`'s `url`
//!
//! Unresolved tags and failed image fetches never fail a render by
//! themselves; they are reported as warnings next to the rendered bytes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use reportgen_assets::{FetchOptions, HttpAssetFetcher};
//! use reportgen_templates::{RenderContext, RenderOptions, TemplateRenderer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Arc::new(HttpAssetFetcher::new(FetchOptions::default())?);
//!     let renderer = TemplateRenderer::new(RenderOptions::default(), fetcher);
//!
//!     let template = std::fs::read("template.docx")?;
//!     let context = RenderContext::from_json_str(r#"{"Name": "Acme"}"#)?;
//!
//!     let output = renderer.render_bytes(template, &context).await?;
//!     for warning in &output.warnings {
//!         eprintln!("{}", warning);
//!     }
//!     std::fs::write("report.docx", output.bytes)?;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod docx;
pub mod error;
pub mod inspect;
pub mod renderer;
pub mod scanner;
pub mod scope;
pub mod tag;

pub use archive::{PartContent, TemplateDocument, MAX_PART_BYTES};
pub use error::{
    ArchiveError, ArchiveResult, RenderWarning, TemplateError, TemplateResult, WarningReason,
};
pub use inspect::{TagOccurrence, TemplateInspector};
pub use renderer::{
    RenderOptions, RenderOutput, RenderStats, ResolvedValue, TemplateRenderer,
    DEFAULT_IMAGE_SIZE_PX,
};
pub use scanner::{Scan, Segment, TagScanner, TagSpan};
pub use scope::{Binding, RenderContext, ScopeResolver};
pub use tag::{PlaceholderTag, TagKind};
