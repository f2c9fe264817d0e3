//! mobiml - EPUB to Mobipocket markup converter

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use mobiml::{Book, ConvertOptions, MobiMlizer, OutputProfile, read_epub};

#[derive(Parser)]
#[command(name = "mobiml")]
#[command(version, about = "Convert EPUB content documents to Mobipocket markup", long_about = None)]
#[command(after_help = "EXAMPLES:
    mobiml book.epub out/                  Write one .html file per chapter
    mobiml --ignore-tables book.epub out/  Flatten tables into paragraphs
    mobiml -i book.epub                    Show metadata, spine and guide")]
struct Cli {
    /// Input EPUB file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory the converted documents are written to
    #[arg(value_name = "OUTDIR", required_unless_present = "info")]
    outdir: Option<PathBuf>,

    /// Degrade tables to plain blocks
    #[arg(long)]
    ignore_tables: bool,

    /// Do not emulate left margins with blockquotes
    #[arg(long)]
    ignore_margins: bool,

    /// Output profile (JSON)
    #[arg(long, value_name = "FILE")]
    profile: Option<PathBuf>,

    /// Show book metadata without converting
    #[arg(short, long)]
    info: bool,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let result = if cli.info {
        show_info(&cli.input)
    } else {
        convert(&cli)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn show_info(path: &Path) -> Result<(), String> {
    let book = read_epub(path).map_err(|e| e.to_string())?;
    print_info(path, &book);
    Ok(())
}

fn print_info(path: &Path, book: &Book) {
    let meta = &book.metadata;
    println!("File: {}", path.display());
    println!("Title: {}", meta.title);
    if !meta.authors.is_empty() {
        println!("Authors: {}", meta.authors.join(", "));
    }
    if !meta.language.is_empty() {
        println!("Language: {}", meta.language);
    }
    if let Some(ref cover) = meta.cover_image {
        println!("Cover: {cover}");
    }
    println!("Spine:");
    for item in &book.spine {
        let linear = if item.linear { "" } else { " (non-linear)" };
        println!("  {} [{}]{linear}", item.href, item.media_type);
    }
    if !book.guide.is_empty() {
        println!("Guide:");
        for reference in &book.guide {
            println!("  {}: {} ({})", reference.kind, reference.href, reference.title);
        }
    }
    println!("Resources: {}", book.resources.len());
}

fn convert(cli: &Cli) -> Result<(), String> {
    let Some(outdir) = cli.outdir.as_deref() else {
        return Err("an output directory is required".to_string());
    };

    let profile = match &cli.profile {
        Some(path) => OutputProfile::load(path).map_err(|e| e.to_string())?,
        None => OutputProfile::default(),
    };
    let options = ConvertOptions {
        ignore_tables: cli.ignore_tables,
        ignore_margins: cli.ignore_margins,
    };

    let mut book = read_epub(&cli.input).map_err(|e| e.to_string())?;
    let mut converter = MobiMlizer::new(profile, options);
    let documents = converter.convert_book(&mut book).map_err(|e| e.to_string())?;

    for document in &documents {
        let target = output_path(outdir, &document.href);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("{}: {e}", parent.display()))?;
        }
        fs::write(&target, document.to_xml()).map_err(|e| format!("{}: {e}", target.display()))?;
        if !cli.quiet {
            println!("{} -> {}", document.href, target.display());
        }
    }

    if !cli.quiet {
        println!("Converted {} documents", documents.len());
    }
    Ok(())
}

/// Place a unit under `outdir` by its href, with an `.html` extension.
/// Components that would leave `outdir` are dropped.
fn output_path(outdir: &Path, href: &str) -> PathBuf {
    let mut path = outdir.to_path_buf();
    for component in Path::new(href).components() {
        if let Component::Normal(part) = component {
            path.push(part);
        }
    }
    path.set_extension("html");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let out = Path::new("out");
        assert_eq!(output_path(out, "text/ch1.xhtml"), Path::new("out/text/ch1.html"));
        assert_eq!(output_path(out, "../../etc/ch1.xhtml"), Path::new("out/etc/ch1.html"));
        assert_eq!(output_path(out, "index"), Path::new("out/index.html"));
    }

    #[test]
    fn test_cli_requires_outdir_unless_info() {
        assert!(Cli::try_parse_from(["mobiml", "book.epub"]).is_err());
        assert!(Cli::try_parse_from(["mobiml", "-i", "book.epub"]).is_ok());

        let cli = Cli::try_parse_from(["mobiml", "--ignore-tables", "book.epub", "out"]).unwrap();
        assert!(cli.ignore_tables && !cli.ignore_margins);
        assert_eq!(cli.outdir.as_deref(), Some(Path::new("out")));
    }
}
