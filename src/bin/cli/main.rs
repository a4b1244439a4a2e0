//! CLI tool for `.lzma` stream operations.

mod commands;
mod exit_codes;
mod output;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use exit_codes::ExitCode;

/// Pure Rust LZMA compression tool
#[derive(Parser)]
#[command(name = "lzma-codec")]
#[command(author, version, about = "Pure Rust LZMA compression tool", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Suppress per-file reports
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Number of threads (0 = auto)
    #[arg(long, short = 'T', default_value = "0", global = true)]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress files to .lzma (alias: c)
    #[command(alias = "c")]
    Compress {
        /// Files to compress
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file (single input only)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Compression level (0-9)
        #[arg(short = 'l', long, default_value = "6")]
        level: u32,

        /// Dictionary size in bytes
        #[arg(long)]
        dict_size: Option<u32>,

        /// Literal context bits (0-8)
        #[arg(long, default_value = "3")]
        lc: u32,

        /// Literal position bits (0-4)
        #[arg(long, default_value = "0")]
        lp: u32,

        /// Position bits (0-4)
        #[arg(long, default_value = "2")]
        pb: u32,

        /// Write an end marker after the payload
        #[arg(long)]
        end_marker: bool,

        /// Keep input files
        #[arg(short = 'k', long)]
        keep: bool,

        /// Overwrite existing output files
        #[arg(long)]
        force: bool,
    },

    /// Decompress .lzma files (alias: d)
    #[command(alias = "d")]
    Decompress {
        /// Files to decompress
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file (single input only)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Memory limit for the decoder in bytes
        #[arg(long)]
        memory_limit: Option<u64>,

        /// Keep input files
        #[arg(short = 'k', long)]
        keep: bool,

        /// Overwrite existing output files
        #[arg(long)]
        force: bool,
    },

    /// Test stream integrity (alias: t)
    #[command(alias = "t")]
    Test {
        /// Files to test
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Memory limit for the decoder in bytes
        #[arg(long)]
        memory_limit: Option<u64>,
    },

    /// Show stream header information (alias: i)
    #[command(alias = "i")]
    Info {
        /// Files to inspect
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the CRC-32 of raw files
    Crc {
        /// Files to checksum
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted");
        std::process::exit(exit_codes::USER_INTERRUPT);
    })
    .ok();

    let cli = Cli::parse();

    #[cfg(feature = "parallel")]
    if cli.threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
        {
            eprintln!("Warning: could not configure thread pool: {}", e);
        }
    }
    #[cfg(not(feature = "parallel"))]
    if cli.threads > 1 {
        log::debug!("built without `parallel`, ignoring --threads {}", cli.threads);
    }

    let exit_code = match cli.command {
        Commands::Compress {
            files,
            output,
            level,
            dict_size,
            lc,
            lp,
            pb,
            end_marker,
            keep,
            force,
        } => {
            let mut options = lzma_codec::LzmaEncoderOptions::with_preset(level)
                .with_lc_lp_pb(lc, lp, pb)
                .with_end_marker(end_marker);
            if let Some(size) = dict_size {
                options = options.with_dict_size(size);
            }
            commands::compress(&commands::CompressConfig {
                files: &files,
                output: output.as_deref(),
                options,
                keep,
                force,
                format: cli.format,
                quiet: cli.quiet,
            })
        }

        Commands::Decompress {
            files,
            output,
            memory_limit,
            keep,
            force,
        } => commands::decompress(&commands::DecompressConfig {
            files: &files,
            output: output.as_deref(),
            options: lzma_codec::LzmaDecoderOptions { memory_limit },
            keep,
            force,
            format: cli.format,
            quiet: cli.quiet,
        }),

        Commands::Test {
            files,
            memory_limit,
        } => commands::test(
            &files,
            &lzma_codec::LzmaDecoderOptions { memory_limit },
            cli.format,
            cli.quiet,
        ),

        Commands::Info { files } => commands::info(&files, cli.format),

        Commands::Crc { files } => commands::crc(&files, cli.format),

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            ExitCode::Success
        }
    };

    std::process::exit(exit_code.code());
}
