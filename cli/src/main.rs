//! marginalia CLI - margin annotation tool

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use marginalia::resolve::{in_document, DefinitionTable};
use marginalia::{
    AnnotateOptions, BibliographyStrategy, EntryStatus, FallbackResolver, JsonFormat, Marginalia,
    MarginTransform, MarkerSelection, Resolver, Session,
};

#[derive(Parser)]
#[command(name = "marginalia")]
#[command(version)]
#[command(about = "Annotate citations and abbreviations in PDF margins", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output PDF file
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scale page content and write marker text into the margins
    Annotate {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output PDF file (defaults to <name>.annotated.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Span tree dump to use instead of extracting one from the PDF
        #[arg(long, value_name = "JSON")]
        layout: Option<PathBuf>,

        #[command(flatten)]
        annotate: AnnotateArgs,

        /// JSON object of marker -> text, used when the document has no answer
        #[arg(long, value_name = "JSON")]
        definitions: Option<PathBuf>,

        /// Write the annotation report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// List located markers, excluding the reference list
    Markers {
        /// Input PDF or span tree dump
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Markers to look for
        #[arg(long, value_enum, default_value = "citations")]
        markers: Markers,

        /// How the reference list is recognised
        #[arg(long, value_enum, default_value = "sequence-run")]
        bibliography: Bibliography,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Dump the extracted span tree as JSON
    Layout {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Dump the span tree after scaling by this factor
        #[arg(long)]
        scale: Option<f32>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show version information
    Version,
}

#[derive(clap::Args)]
struct AnnotateArgs {
    /// Horizontal content scale in (0, 1]
    #[arg(long, env = "MARGINALIA_SCALE", default_value_t = 0.9)]
    scale: f32,

    /// Annotation font size
    #[arg(long, default_value_t = 5.0)]
    font_size: f32,

    /// Gap between content and annotations
    #[arg(long, default_value_t = 5.0)]
    padding: f32,

    /// Markers to annotate
    #[arg(long, value_enum, default_value = "citations")]
    markers: Markers,

    /// How the reference list is recognised
    #[arg(long, value_enum, default_value = "sequence-run")]
    bibliography: Bibliography,
}

impl Default for AnnotateArgs {
    fn default() -> Self {
        Self {
            scale: 0.9,
            font_size: 5.0,
            padding: 5.0,
            markers: Markers::Citations,
            bibliography: Bibliography::SequenceRun,
        }
    }
}

impl AnnotateArgs {
    fn options(&self) -> AnnotateOptions {
        AnnotateOptions::new()
            .with_scale(self.scale)
            .with_font_size(self.font_size)
            .with_padding(self.padding)
            .with_markers(self.markers.into())
            .with_bibliography(self.bibliography.into())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Markers {
    /// Bracketed citations such as [12]
    Citations,
    /// Uppercase abbreviations such as NASA
    Abbreviations,
    /// Both kinds
    Both,
}

impl From<Markers> for MarkerSelection {
    fn from(markers: Markers) -> Self {
        match markers {
            Markers::Citations => MarkerSelection::Citations,
            Markers::Abbreviations => MarkerSelection::Abbreviations,
            Markers::Both => MarkerSelection::Both,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Bibliography {
    /// Drop the trailing 1, 2, 3, ... run of citations
    SequenceRun,
    /// Drop everything from the last "References" page on
    SectionBoundary,
}

impl From<Bibliography> for BibliographyStrategy {
    fn from(bibliography: Bibliography) -> Self {
        match bibliography {
            Bibliography::SequenceRun => BibliographyStrategy::SequenceRun,
            Bibliography::SectionBoundary => BibliographyStrategy::SectionBoundary,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Annotate {
            input,
            output,
            layout,
            annotate,
            definitions,
            report,
        }) => cmd_annotate(
            &input,
            output.as_deref(),
            layout.as_deref(),
            &annotate,
            definitions.as_deref(),
            report.as_deref(),
        ),
        Some(Commands::Markers {
            input,
            markers,
            bibliography,
            json,
        }) => cmd_markers(&input, markers, bibliography, json),
        Some(Commands::Layout {
            input,
            output,
            scale,
            compact,
        }) => cmd_layout(&input, output.as_deref(), scale, compact),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: annotate if input is provided
            if let Some(input) = cli.input {
                cmd_annotate(
                    &input,
                    cli.output.as_deref(),
                    None,
                    &AnnotateArgs::default(),
                    None,
                    None,
                )
            } else {
                println!("{}", "Usage: marginalia <FILE> [OUTPUT]".yellow());
                println!("       marginalia --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}.annotated.pdf", stem))
}

fn open(builder: Marginalia, input: &Path, layout: Option<&Path>) -> marginalia::Result<Session> {
    match layout {
        Some(layout) => builder.open_with_layout(input, layout),
        None => builder.open(input),
    }
}

fn cmd_annotate(
    input: &Path,
    output: Option<&Path>,
    layout: Option<&Path>,
    args: &AnnotateArgs,
    definitions: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input));

    let pb = ProgressBar::new(3);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );

    // Lenient mode so one broken page does not stop the whole document
    pb.set_message("Reading document...");
    let builder = Marginalia::new().with_options(args.options()).lenient();
    let session = open(builder, input, layout)?;
    if !session.has_pdf() {
        pb.abandon();
        return Err("annotate needs a PDF input; pass a span tree with --layout".into());
    }
    pb.inc(1);

    pb.set_message("Placing annotations...");
    let resolver: Box<dyn Resolver> = match definitions {
        Some(path) => {
            let table = DefinitionTable::from_json(&fs::read_to_string(path)?)?;
            log::debug!("Loaded {} fallback definitions", table.len());
            Box::new(FallbackResolver::new(in_document(), table))
        }
        None => Box::new(in_document()),
    };
    let annotated = session.annotate(resolver.as_ref())?;
    pb.inc(1);

    pb.set_message("Writing PDF...");
    session.save(&annotated, &output)?;
    pb.inc(1);

    pb.finish_with_message("Done!");

    let report = &annotated.report;
    if let Some(path) = report_path {
        fs::write(path, marginalia::render::to_json(report, JsonFormat::Pretty)?)?;
    }

    println!("\n{}", "Summary".green().bold());
    println!(
        "  {} {} markers found, {} outside the reference list",
        "├─".dimmed(),
        report.occurrences_found,
        report.occurrences_kept
    );
    println!("  {} {} placed", "├─".dimmed(), report.placed);
    println!("  {} {} skipped", "├─".dimmed(), report.skipped);
    println!("  {} {} unresolved", "└─".dimmed(), report.unresolved);

    for entry in &report.entries {
        if let EntryStatus::Skipped(reason) = &entry.status {
            println!(
                "  {} {} on page {}: {}",
                "skipped".yellow(),
                entry.label,
                entry.occurrence.page + 1,
                reason
            );
        }
    }

    println!("{} {}", "Saved to".green(), output.display());
    if let Some(path) = report_path {
        println!("{} {}", "Report".green(), path.display());
    }

    Ok(())
}

fn cmd_markers(
    input: &Path,
    markers: Markers,
    bibliography: Bibliography,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Marginalia::new()
        .with_markers(markers.into())
        .with_bibliography(bibliography.into())
        .lenient()
        .open(input)?;
    let occurrences = session.markers();

    if json {
        println!(
            "{}",
            marginalia::render::to_json(&occurrences, JsonFormat::Pretty)?
        );
        return Ok(());
    }

    println!("{}", "Markers".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for occ in &occurrences {
        println!(
            "{:>4} {:>2}  {:<10} {}",
            occ.page + 1,
            occ.column.number(),
            occ.raw_text.bold(),
            format!("[{:.1}, {:.1}]", occ.bbox.x0, occ.bbox.y0).dimmed()
        );
    }
    println!("\n{}: {}", "Total".bold(), occurrences.len());

    Ok(())
}

fn cmd_layout(
    input: &Path,
    output: Option<&Path>,
    scale: Option<f32>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = Marginalia::new().lenient().open(input)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = match scale {
        Some(scale) => {
            let transformed = MarginTransform::new(scale)?.apply(session.document(), true);
            marginalia::render::to_json(&transformed.to_document(), format)?
        }
        None => marginalia::render::to_json(session.document(), format)?,
    };

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "marginalia".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Margin annotation tool for multi-column documents");
    println!();
    println!("License: MIT");
}
