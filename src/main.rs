//! wcagify - accessible HTML from extracted document text

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use wcagify::extract::{PlainTextExtractor, TextExtractor};
use wcagify::{AltTextCatalog, Config, Converter, WcagVersion, classify::classify};

#[derive(Parser)]
#[command(name = "wcagify")]
#[command(version, about = "Accessible HTML from extracted document text", long_about = None)]
#[command(after_help = "EXAMPLES:
    wcagify convert paper.pdf -o out          Convert a PDF via pdftotext
    wcagify convert notes.txt --wcag 2.1      Convert extracted text
    wcagify validate page.html --strict       Audit existing HTML")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log stage decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document into accessible HTML plus a JSON report
    Convert {
        /// Source document (.txt is read directly, anything else is extracted)
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Base name of the output files (default: input file stem)
        #[arg(short, long)]
        name: Option<String>,

        /// Alt text catalogue (JSON)
        #[arg(long, value_name = "FILE")]
        alt_text: Option<PathBuf>,

        /// Directory of images extracted alongside the text
        #[arg(long, value_name = "DIR")]
        images: Option<PathBuf>,

        #[arg(long, value_name = "VERSION")]
        wcag: Option<WcagVersion>,

        /// Report ambiguous contrast as High
        #[arg(long)]
        strict: bool,

        /// Leave out the dark color scheme
        #[arg(long)]
        no_dark_mode: bool,

        /// Extraction timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Print the structural blocks of a text file
    Classify {
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Apply the accessibility enhancements to an HTML file
    Enhance {
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_name = "FILE")]
        alt_text: Option<PathBuf>,

        #[arg(long, value_name = "VERSION")]
        wcag: Option<WcagVersion>,

        #[arg(long)]
        no_dark_mode: bool,
    },

    /// Validate an HTML file; exits with status 1 unless AA compliant
    Validate {
        input: PathBuf,

        #[arg(long, default_value = "text")]
        format: Format,

        #[arg(long)]
        strict: bool,

        #[arg(long, value_name = "VERSION")]
        wcag: Option<WcagVersion>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "wcagify=debug" } else { "wcagify=warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> wcagify::Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn set_version(config: &mut Config, version: Option<WcagVersion>) {
    if let Some(version) = version {
        config.enhancement.wcag_version = version;
        config.validation.wcag_version = version;
    }
}

fn load_alt_text(config: &mut Config, path: Option<&Path>) -> wcagify::Result<()> {
    if let Some(path) = path {
        config.enhancement.alt_text = AltTextCatalog::from_file(path)?;
    }
    Ok(())
}

fn run(command: Commands, mut config: Config) -> wcagify::Result<ExitCode> {
    match command {
        Commands::Convert {
            input,
            output,
            name,
            alt_text,
            images,
            wcag,
            strict,
            no_dark_mode,
            timeout,
        } => {
            set_version(&mut config, wcag);
            load_alt_text(&mut config, alt_text.as_deref())?;
            config.validation.strict |= strict;
            config.enhancement.dark_mode &= !no_dark_mode;
            if let Some(secs) = timeout {
                config.extraction.timeout_secs = secs;
            }
            if images.is_some() {
                config.extraction.image_dir = images;
            }
            config.check()?;

            let files = Converter::new(config).convert_to_dir(&input, &output, name.as_deref())?;
            let report = &files.result.report;
            println!("Wrote {}", files.html_path.display());
            println!("Wrote {}", files.report_path.display());
            println!(
                "{} issue(s): {} critical, {} high, {} medium, {} low; AA compliant: {}",
                report.total_issues,
                report.counts.critical,
                report.counts.high,
                report.counts.medium,
                report.counts.low,
                if report.wcag_aa_compliant { "yes" } else { "no" }
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Classify { input, json } => {
            let extraction = PlainTextExtractor::new().extract(&input)?;
            let blocks = classify(&extraction.lines, &config.classifier);
            if json {
                println!("{}", serde_json::to_string_pretty(&blocks)?);
            } else {
                for block in &blocks {
                    let kind = match block.level() {
                        Some(level) => format!("{:?}(h{level})", block.kind),
                        None => format!("{:?}", block.kind),
                    };
                    println!(
                        "{:>4}-{:<4} {:<16} {:.2}  {}",
                        block.source_line_range.start,
                        block.source_line_range.end,
                        kind,
                        block.confidence,
                        block.text
                    );
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Enhance {
            input,
            output,
            alt_text,
            wcag,
            no_dark_mode,
        } => {
            set_version(&mut config, wcag);
            load_alt_text(&mut config, alt_text.as_deref())?;
            config.enhancement.dark_mode &= !no_dark_mode;

            let html = std::fs::read_to_string(&input)?;
            let enhanced = wcagify::enhance_html(&html, &config.enhancement);
            match output {
                Some(path) => std::fs::write(path, enhanced)?,
                None => print!("{enhanced}"),
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Validate {
            input,
            format,
            strict,
            wcag,
        } => {
            set_version(&mut config, wcag);
            config.validation.strict |= strict;

            let html = std::fs::read_to_string(&input)?;
            let report = wcagify::validate(&html, &config.validation);
            match format {
                Format::Text => print!("{}", report.to_text()),
                Format::Json => println!("{}", report.to_json()?),
            }
            Ok(if report.wcag_aa_compliant {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
    }
}
