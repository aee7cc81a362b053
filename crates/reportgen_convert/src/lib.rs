//! # reportgen_convert
//!
//! Conversion of rendered reports into their delivery format.
//!
//! Rendering always produces DOCX. This crate turns those bytes into PDF,
//! ODT or HTML by running LibreOffice headless, and reports its own
//! [`ConversionError`] so a conversion problem is never mistaken for a
//! template problem.
//!
//! # Example
//!
//! ```rust,no_run
//! use reportgen_convert::{ConvertOptions, DocumentConverter, OutputFormat, SofficeConverter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = SofficeConverter::new(ConvertOptions::default().timeout_secs(60));
//!
//!     let docx = std::fs::read("report.docx")?;
//!     let pdf = converter.convert(&docx, "pdf".parse::<OutputFormat>()?).await?;
//!     std::fs::write("report.pdf", pdf)?;
//!
//!     Ok(())
//! }
//! ```

pub mod converter;
pub mod error;
pub mod mock;
pub mod soffice;

pub use converter::{DocumentConverter, OutputFormat};
pub use error::{ConversionError, ConvertResult};
pub use mock::{CapturedConversion, MockConversion, MockConverter};
pub use soffice::{
    ConvertOptions, SofficeConverter, DEFAULT_CONVERT_TIMEOUT_SECS, DEFAULT_SOFFICE_BINARY,
};
