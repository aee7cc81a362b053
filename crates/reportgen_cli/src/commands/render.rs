//! Render command - Fill a template and write the report.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use uuid::Uuid;

use reportgen_assets::{AssetFetcher, HttpAssetFetcher};
use reportgen_convert::{DocumentConverter, OutputFormat, SofficeConverter};
use reportgen_templates::{RenderContext, RenderStats, RenderWarning, TemplateRenderer};

use crate::config::ReportgenConfig;

#[derive(Args)]
pub struct RenderArgs {
    /// Template document (.docx)
    template: PathBuf,

    /// JSON payload, `-` reads standard input
    #[arg(short, long, value_name = "FILE")]
    data: PathBuf,

    /// Write the report here instead of `<output_dir>/<uuid>.<ext>`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (pdf, docx, odt, html)
    #[arg(short, long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Directory for generated reports
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Prefix for the public report link
    #[arg(long)]
    public_base_url: Option<String>,

    /// Fail when any tag cannot be resolved
    #[arg(long)]
    strict: bool,

    /// Keep newlines in values as plain text
    #[arg(long)]
    no_linebreaks: bool,

    /// Width of embedded images in pixels
    #[arg(long, value_name = "PX")]
    image_width: Option<u32>,

    /// Height of embedded images in pixels
    #[arg(long, value_name = "PX")]
    image_height: Option<u32>,

    /// Maximum image downloads in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// LibreOffice executable
    #[arg(long)]
    soffice: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl RenderArgs {
    /// Apply command line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut ReportgenConfig) {
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(dir) = &self.output_dir {
            config.output.output_dir = dir.clone();
        }
        if let Some(url) = &self.public_base_url {
            config.output.public_base_url = Some(url.clone());
        }
        if self.strict {
            config.render.strict = true;
        }
        if self.no_linebreaks {
            config.render.linebreaks = false;
        }
        if let Some(width) = self.image_width {
            config.render.image_width_px = width;
        }
        if let Some(height) = self.image_height {
            config.render.image_height_px = height;
        }
        if let Some(limit) = self.concurrency {
            config.render.fetch_concurrency = limit;
        }
        if let Some(binary) = &self.soffice {
            config.convert.soffice_binary = binary.clone();
        }
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e: reportgen_convert::ConversionError| e.to_string())
}

/// Outcome of one render, as printed with `--json`.
#[derive(Debug, Serialize)]
pub struct RenderReport {
    pub link: Option<String>,
    pub path: PathBuf,
    pub format: OutputFormat,
    pub warnings: Vec<RenderWarning>,
    pub stats: RenderStats,
    pub duration_ms: u64,
}

pub async fn execute(args: RenderArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = ReportgenConfig::load(config_path.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let fetcher = Arc::new(
        HttpAssetFetcher::new(config.fetch.clone()).context("Failed to create asset fetcher")?,
    );
    let converter = SofficeConverter::new(config.convert.clone());

    let report = run(&args, &config, fetcher, &converter).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("✅ Report written to {}", report.path.display());
    if let Some(link) = &report.link {
        println!("   🔗 {}", link);
    }
    for warning in &report.warnings {
        println!("   ⚠️  {}", warning);
    }

    Ok(())
}

/// Render, convert and write one report.
pub async fn run(
    args: &RenderArgs,
    config: &ReportgenConfig,
    fetcher: Arc<dyn AssetFetcher>,
    converter: &dyn DocumentConverter,
) -> Result<RenderReport> {
    let template = tokio::fs::read(&args.template)
        .await
        .with_context(|| format!("Failed to read template {}", args.template.display()))?;
    let payload = read_payload(&args.data).await?;
    let context = RenderContext::from_json_str(&payload)?;

    info!(
        "Rendering {} with {} top-level value(s)",
        args.template.display(),
        context.len()
    );

    let renderer = TemplateRenderer::new(config.render.clone(), fetcher);
    let rendered = renderer.render_bytes(template, &context).await?;
    for warning in &rendered.warnings {
        warn!("{}", warning);
    }

    let format = config.output.format;
    let bytes = converter.convert(&rendered.bytes, format).await?;

    let path = match &args.output {
        Some(path) => path.clone(),
        None => config
            .output
            .output_dir
            .join(format!("{}.{}", Uuid::new_v4(), format.extension())),
    };
    write_report(&path, &bytes).await?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let link = config.output.link_for(&file_name);

    info!("Report written to {} ({} bytes)", path.display(), bytes.len());

    Ok(RenderReport {
        link,
        path,
        format,
        duration_ms: rendered.duration_ms(),
        warnings: rendered.warnings,
        stats: rendered.stats,
    })
}

async fn read_payload(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut payload = String::new();
        tokio::io::stdin()
            .read_to_string(&mut payload)
            .await
            .context("Failed to read payload from stdin")?;
        return Ok(payload);
    }

    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read payload {}", path.display()))
}

async fn write_report(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use reportgen_assets::MockFetcher;
    use reportgen_convert::MockConverter;
    use reportgen_templates::{TemplateDocument, TemplateError};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn write_docx(dir: &Path, body: &str) -> PathBuf {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer
            .write_all(br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"></Types>"#)
            .unwrap();
        writer.start_file("word/document.xml", options).unwrap();
        writer
            .write_all(format!("<w:document><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>", body).as_bytes())
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let path = dir.join("template.docx");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn write_payload(dir: &Path, payload: &str) -> PathBuf {
        let path = dir.join("payload.json");
        std::fs::write(&path, payload).unwrap();
        path
    }

    fn args(template: PathBuf, data: PathBuf) -> RenderArgs {
        RenderArgs {
            template,
            data,
            output: None,
            format: None,
            output_dir: None,
            public_base_url: None,
            strict: false,
            no_linebreaks: false,
            image_width: None,
            image_height: None,
            concurrency: None,
            soffice: None,
            json: false,
        }
    }

    #[tokio::test]
    async fn test_render_converts_and_links() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_docx(dir.path(), "{{Name}} {%Photo%}");
        let data = write_payload(
            dir.path(),
            r#"{"Name": "Acme", "Photo": {"url": "https://x/y.png"}}"#,
        );

        let mut config = ReportgenConfig::default();
        let mut render_args = args(template, data);
        render_args.output_dir = Some(dir.path().join("generated"));
        render_args.public_base_url = Some("http://localhost:3000".to_string());
        render_args.apply(&mut config);

        let converter = MockConverter::new().with_output(OutputFormat::Pdf, b"%PDF-1.7".to_vec());
        let fetcher = Arc::new(MockFetcher::new().with_asset("https://x/y.png", PNG));

        let report = run(&render_args, &config, fetcher, &converter).await.unwrap();

        assert!(report.warnings.is_empty());
        assert_eq!(report.stats.images_embedded, 1);
        assert_eq!(report.format, OutputFormat::Pdf);
        assert_eq!(report.path.extension().unwrap(), "pdf");
        assert!(report.path.starts_with(dir.path().join("generated")));
        assert_eq!(std::fs::read(&report.path).unwrap(), b"%PDF-1.7");

        let file_name = report.path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(
            report.link,
            Some(format!("http://localhost:3000/reports/{}", file_name))
        );
        assert_eq!(converter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_docx_output_to_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_docx(dir.path(), "Dear {{Name}}, {{Missing}}");
        let data = write_payload(dir.path(), r#"{"Name": "Acme"}"#);

        let mut config = ReportgenConfig::default();
        let mut render_args = args(template, data);
        render_args.format = Some(OutputFormat::Docx);
        render_args.output = Some(dir.path().join("out").join("report.docx"));
        render_args.apply(&mut config);

        let report = run(
            &render_args,
            &config,
            Arc::new(MockFetcher::new()),
            &MockConverter::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.path, dir.path().join("out").join("report.docx"));
        assert_eq!(report.link, None);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].identifier, "Missing");

        let document = TemplateDocument::from_path(&report.path).unwrap();
        assert!(document
            .text("word/document.xml")
            .unwrap()
            .contains("<w:t>Dear Acme, </w:t>"));
    }

    #[tokio::test]
    async fn test_strict_render_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_docx(dir.path(), "{{Missing}}");
        let data = write_payload(dir.path(), "{}");

        let mut config = ReportgenConfig::default();
        let mut render_args = args(template, data);
        render_args.strict = true;
        render_args.output_dir = Some(dir.path().join("generated"));
        render_args.apply(&mut config);

        let converter = MockConverter::new();
        let err = run(
            &render_args,
            &config,
            Arc::new(MockFetcher::new()),
            &converter,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TemplateError>(),
            Some(TemplateError::Unresolved(warnings)) if warnings.len() == 1
        ));
        assert_eq!(converter.call_count(), 0);
        assert!(!dir.path().join("generated").exists());
    }

    #[tokio::test]
    async fn test_non_object_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_docx(dir.path(), "{{Name}}");
        let data = write_payload(dir.path(), "[1, 2, 3]");

        let err = run(
            &args(template, data),
            &ReportgenConfig::default(),
            Arc::new(MockFetcher::new()),
            &MockConverter::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TemplateError>(),
            Some(TemplateError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = ReportgenConfig::default();
        let mut render_args = args(PathBuf::from("t.docx"), PathBuf::from("d.json"));
        render_args.no_linebreaks = true;
        render_args.image_width = Some(100);
        render_args.concurrency = Some(2);
        render_args.soffice = Some("/usr/bin/soffice".to_string());
        render_args.apply(&mut config);

        assert!(!config.render.linebreaks);
        assert_eq!(config.render.image_width_px, 100);
        assert_eq!(config.render.image_height_px, 250);
        assert_eq!(config.render.fetch_concurrency, 2);
        assert_eq!(config.convert.soffice_binary, "/usr/bin/soffice");
    }

    #[test]
    fn test_parse_format_flag() {
        assert_eq!(parse_format(".odt"), Ok(OutputFormat::Odt));
        assert!(parse_format("xls").is_err());
    }
}
