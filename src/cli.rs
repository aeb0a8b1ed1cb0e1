// Command-line front end for DeltaX.
//
// Subcommands map one-to-one onto the library entry points in `io`:
// `compress` scans a tree and writes an archive, `decompress` restores one,
// `info` prints what an archive holds without extracting it.

use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::dedup::chunker::ChunkMode;
use crate::engine::EncodeOptions;
use crate::error::DeltaXError;
use crate::format::archive::Archive;
use crate::format::section::DEFAULT_LEVEL;
use crate::io::{self as dxio, DecodeStats, EncodeStats};

const DEFAULT_OUTPUT: &str = "output.dx";

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// DeltaX deduplicating archiver.
#[derive(Parser, Debug)]
#[command(
    name = "deltax",
    version,
    about = "DeltaX deduplicating archiver",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Archive a directory tree.
    Compress(CompressArgs),
    /// Restore a directory tree from an archive.
    Decompress(DecompressArgs),
    /// Print archive header and table summary.
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// Directory to archive.
    #[arg(value_hint = ValueHint::DirPath)]
    target: PathBuf,

    /// Chunk size in bytes, or a separator string.
    chunking: String,

    /// Archive to write.
    #[arg(short = 'o', long, value_hint = ValueHint::FilePath, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Gzip level for the table blocks (0-9).
    #[arg(short = 'l', long, default_value_t = DEFAULT_LEVEL,
          value_parser = clap::value_parser!(u32).range(0..=9))]
    level: u32,

    /// Worker threads (default: one per core).
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct DecompressArgs {
    /// Archive to read.
    #[arg(value_hint = ValueHint::FilePath)]
    archive: PathBuf,

    /// Destination directory (created if absent).
    #[arg(value_hint = ValueHint::DirPath)]
    destination: PathBuf,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Archive to inspect.
    #[arg(value_hint = ValueHint::FilePath)]
    archive: PathBuf,

    /// List every file record.
    #[arg(long)]
    files: bool,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Compress {
        target: PathBuf,
        chunking: String,
        output: PathBuf,
        level: u32,
        threads: Option<usize>,
    },
    Decompress {
        archive: PathBuf,
        destination: PathBuf,
    },
    Info {
        archive: PathBuf,
        list_files: bool,
    },
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let command = match cli.command {
        Cmd::Compress(args) => Command::Compress {
            target: args.target,
            chunking: args.chunking,
            output: args.output,
            level: args.level,
            threads: args.threads,
        },
        Cmd::Decompress(args) => Command::Decompress {
            archive: args.archive,
            destination: args.destination,
        },
        Cmd::Info(args) => Command::Info {
            archive: args.archive,
            list_files: args.files,
        },
    };
    Options {
        command,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
    }
}

fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("deltax".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let opts = resolve_options(cli);
        if let Command::Compress { chunking, .. } = &opts.command {
            let _ = ChunkMode::from_str(chunking);
        }
    }
}

fn emit_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => eprintln!("{text}"),
        Err(e) => eprintln!("deltax: json: {e}"),
    }
}

fn report_error(context: &str, err: &DeltaXError) {
    eprintln!("deltax: {context}: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("deltax:   caused by: {cause}");
        source = cause.source();
    }
}

// ---------------------------------------------------------------------------
// Compress command
// ---------------------------------------------------------------------------

fn cmd_compress(
    opts: &Options,
    target: &Path,
    chunking: &str,
    output: &Path,
    level: u32,
    threads: Option<usize>,
) -> i32 {
    let mode = match ChunkMode::from_str(chunking) {
        Ok(mode) => mode,
        Err(e) => {
            report_error("compress", &e);
            return 1;
        }
    };

    if output.exists() && !opts.force {
        eprintln!(
            "deltax: output file exists, use -f to overwrite: {}",
            output.display()
        );
        return 1;
    }

    let encode_opts = EncodeOptions {
        mode,
        level,
        threads,
    };
    let stats: EncodeStats = match dxio::compress_tree(target, output, &encode_opts) {
        Ok(stats) => stats,
        Err(e) => {
            report_error("compress", &e);
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "deltax: compress: {} files, {} empty dirs, input {} bytes, \
             {} patterns ({} bytes), {} references, archive {} bytes",
            stats.files,
            stats.empty_dirs,
            stats.input_bytes,
            stats.patterns,
            stats.pattern_bytes,
            stats.references,
            stats.archive_bytes
        );
    }

    if opts.json_output {
        emit_json(&serde_json::json!({
            "command": "compress",
            "mode": encode_opts.mode.to_string(),
            "level": level,
            "files": stats.files,
            "empty_dirs": stats.empty_dirs,
            "input_bytes": stats.input_bytes,
            "patterns": stats.patterns,
            "pattern_bytes": stats.pattern_bytes,
            "references": stats.references,
            "literal_bytes": stats.literal_bytes,
            "archive_bytes": stats.archive_bytes,
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Decompress command
// ---------------------------------------------------------------------------

fn cmd_decompress(opts: &Options, archive: &Path, destination: &Path) -> i32 {
    let stats: DecodeStats = match dxio::extract_archive(archive, destination) {
        Ok(stats) => stats,
        Err(e) => {
            report_error("decompress", &e);
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "deltax: decompress: {} files, {} empty dirs, {} bytes",
            stats.files, stats.empty_dirs, stats.output_bytes
        );
    }

    if opts.json_output {
        emit_json(&serde_json::json!({
            "command": "decompress",
            "files": stats.files,
            "empty_dirs": stats.empty_dirs,
            "output_bytes": stats.output_bytes,
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Info command
// ---------------------------------------------------------------------------

fn cmd_info(opts: &Options, path: &Path, list_files: bool) -> i32 {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("deltax: info: {}: {e}", path.display());
            return 1;
        }
    };
    let archive = match Archive::unpack(&bytes) {
        Ok(a) => a,
        Err(e) => {
            report_error("info", &e);
            return 1;
        }
    };

    let records = &archive.files.files;
    let original: u64 = records.iter().map(|r| r.original_size).sum();

    if opts.json_output {
        let files: Vec<serde_json::Value> = records
            .iter()
            .filter(|_| list_files)
            .map(|r| {
                serde_json::json!({
                    "path": r.path,
                    "size": r.original_size,
                    "segments": r.segments.len(),
                    "references": r.reference_count(),
                })
            })
            .collect();
        emit_json(&serde_json::json!({
            "command": "info",
            "version": archive.header.version,
            "flags": archive.header.flags.bits(),
            "archive_bytes": bytes.len(),
            "patterns": archive.patterns.len(),
            "pattern_bytes": archive.patterns.total_bytes(),
            "files": records.len(),
            "original_bytes": original,
            "empty_dirs": archive.files.empty_dirs,
            "file_records": files,
        }));
    }

    if opts.quiet {
        return 0;
    }

    println!("DeltaX version:    {}", archive.header.version);
    println!("Flags:             {:#010x}", archive.header.flags.bits());
    println!("Archive size:      {}", bytes.len());
    println!(
        "Patterns:          {} ({} bytes)",
        archive.patterns.len(),
        archive.patterns.total_bytes()
    );
    println!("Files:             {} ({} bytes)", records.len(), original);
    println!("Empty directories: {}", archive.files.empty_dirs.len());
    for dir in &archive.files.empty_dirs {
        println!("  {dir}/");
    }

    if list_files {
        for r in records {
            println!(
                "  {:>12}  {:>6} segs  {:>6} refs  {}",
                r.original_size,
                r.segments.len(),
                r.reference_count(),
                r.path
            );
        }
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn dispatch(opts: &Options) -> i32 {
    match &opts.command {
        Command::Compress {
            target,
            chunking,
            output,
            level,
            threads,
        } => cmd_compress(opts, target, chunking, output, *level, *threads),
        Command::Decompress {
            archive,
            destination,
        } => cmd_decompress(opts, archive, destination),
        Command::Info {
            archive,
            list_files,
        } => cmd_info(opts, archive, *list_files),
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    process::exit(dispatch(&opts));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
