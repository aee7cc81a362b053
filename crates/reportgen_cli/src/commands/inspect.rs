//! Inspect command - List the tags a template uses.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use reportgen_templates::{TagKind, TagOccurrence, TemplateDocument, TemplateInspector};

#[derive(Args)]
pub struct InspectArgs {
    /// Template document (.docx)
    template: PathBuf,

    /// Print occurrences as JSON
    #[arg(long)]
    json: bool,

    /// Fail when a malformed tag is found
    #[arg(long)]
    deny_malformed: bool,
}

pub async fn execute(args: InspectArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.template)
        .await
        .with_context(|| format!("Failed to read template {}", args.template.display()))?;
    let document = TemplateDocument::open(bytes)?;
    let occurrences = TemplateInspector::new().inspect(&document)?;
    info!(
        "Found {} tag(s) in {}",
        occurrences.len(),
        args.template.display()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&occurrences)?);
    } else {
        print_occurrences(&occurrences);
    }

    let malformed = occurrences.iter().filter(|o| o.is_malformed()).count();
    if args.deny_malformed && malformed > 0 {
        anyhow::bail!("Template has {} malformed tag(s)", malformed);
    }

    Ok(())
}

fn print_occurrences(occurrences: &[TagOccurrence]) {
    if occurrences.is_empty() {
        println!("No tags found");
        return;
    }

    let mut current_part = "";
    for occurrence in occurrences {
        if occurrence.part != current_part {
            current_part = occurrence.part.as_str();
            println!("📄 {}", current_part);
        }
        println!("   {}", describe(occurrence));
    }
}

fn describe(occurrence: &TagOccurrence) -> String {
    if let Some(reason) = &occurrence.malformed {
        return format!("❌ {} ({})", occurrence.raw, reason);
    }

    let icon = match occurrence.kind {
        TagKind::Text => "🔤",
        TagKind::Image => "🖼️ ",
    };
    match &occurrence.formatter {
        Some(formatter) => format!(
            "{} {} [formatter '{}' ignored]",
            icon, occurrence.identifier, formatter
        ),
        None => format!("{} {}", icon, occurrence.identifier),
    }
}
