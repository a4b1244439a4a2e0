//! Command implementations for the CLI tool.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use lzma_codec::checksum::{Checksum, Crc32, Crc32Writer};
use lzma_codec::codec::properties::HEADER_SIZE;
use lzma_codec::{
    CompressionStats, LzmaDecoderOptions, LzmaEncoderOptions, LzmaHeader, decompress_with_options,
};

use crate::OutputFormat;
use crate::exit_codes::{ExitCode, error_to_exit_code};
use crate::output::create_formatter;

/// Suffix of compressed files.
const LZMA_SUFFIX: &str = "lzma";

/// Configuration for the compress command.
pub struct CompressConfig<'a> {
    pub files: &'a [PathBuf],
    pub output: Option<&'a Path>,
    pub options: LzmaEncoderOptions,
    pub keep: bool,
    pub force: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Configuration for the decompress command.
pub struct DecompressConfig<'a> {
    pub files: &'a [PathBuf],
    pub output: Option<&'a Path>,
    pub options: LzmaDecoderOptions,
    pub keep: bool,
    pub force: bool,
    pub format: OutputFormat,
    pub quiet: bool,
}

/// Result of compressing one file.
pub struct CompressReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub stats: CompressionStats,
}

/// Result of decompressing one file.
pub struct DecompressReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub size: u64,
}

/// Result of testing one stream.
pub struct TestReport {
    pub input: PathBuf,
    pub size: u64,
    pub crc32: u32,
}

/// Header of one stream.
pub struct InfoReport {
    pub input: PathBuf,
    pub header: LzmaHeader,
    pub compressed_size: u64,
}

/// Checksum of one raw file.
pub struct CrcReport {
    pub input: PathBuf,
    pub size: u64,
    pub crc32: u32,
}

/// A per-file failure.
struct FileError {
    code: ExitCode,
    message: String,
}

impl FileError {
    fn new(code: ExitCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<lzma_codec::Error> for FileError {
    fn from(err: lzma_codec::Error) -> Self {
        Self::new(error_to_exit_code(&err), err.to_string())
    }
}

impl From<io::Error> for FileError {
    fn from(err: io::Error) -> Self {
        Self::new(ExitCode::IoError, err.to_string())
    }
}

/// Runs `job` for every file, concurrently when the `parallel` feature is on.
///
/// Failures are reported on stderr; the exit code of the first failure wins.
fn run_all<T, F>(files: &[PathBuf], job: F) -> (Vec<T>, ExitCode)
where
    T: Send,
    F: Fn(&Path) -> Result<T, FileError> + Sync,
{
    #[cfg(feature = "parallel")]
    let results: Vec<_> = {
        use rayon::prelude::*;
        files.par_iter().map(|path| job(path.as_path())).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<_> = files.iter().map(|path| job(path.as_path())).collect();

    let mut reports = Vec::with_capacity(results.len());
    let mut code = ExitCode::Success;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                eprintln!("Error: {}: {}", path.display(), e.message);
                if code == ExitCode::Success {
                    code = e.code;
                }
            }
        }
    }
    (reports, code)
}

/// Checks that `-o` is only combined with a single input.
fn check_single_output(files: &[PathBuf], output: Option<&Path>) -> Result<(), ExitCode> {
    if output.is_some() && files.len() > 1 {
        eprintln!("Error: --output requires exactly one input file");
        return Err(ExitCode::BadArgs);
    }
    Ok(())
}

/// Opens `path` for writing, refusing to replace an existing file unless
/// `force` is set.
///
/// The second value is `true` when the file was newly created.
fn create_output(path: &Path, force: bool) -> Result<(BufWriter<File>, bool), FileError> {
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok((BufWriter::new(file), true)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if !force {
                return Err(FileError::new(
                    ExitCode::FatalError,
                    format!("{} already exists (use --force)", path.display()),
                ));
            }
            let file = fs::OpenOptions::new().write(true).truncate(true).open(path)?;
            Ok((BufWriter::new(file), false))
        }
        Err(e) => Err(e.into()),
    }
}

/// Runs `write` into the output file. On failure a file created here is
/// removed again; a file that existed before is left in place.
fn write_output<T>(
    path: &Path,
    force: bool,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<T, FileError>,
) -> Result<T, FileError> {
    let (mut out, created) = create_output(path, force)?;
    let result = write(&mut out).and_then(|value| {
        out.flush()?;
        Ok(value)
    });
    if result.is_err() && created {
        drop(out);
        let _ = fs::remove_file(path);
    }
    result
}

/// Output name for a compressed file: `name` -> `name.lzma`.
fn compressed_name(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(LZMA_SUFFIX);
    PathBuf::from(name)
}

/// Output name for a decompressed file: `name.lzma` -> `name`.
fn decompressed_name(input: &Path) -> Option<PathBuf> {
    match input.extension() {
        Some(ext) if ext == LZMA_SUFFIX => Some(input.with_extension("")),
        _ => None,
    }
}

fn print_reports(text: String, quiet: bool, format: OutputFormat) {
    if !quiet || format == OutputFormat::Json {
        print!("{}", text);
    }
}

/// Compress command implementation
pub fn compress(config: &CompressConfig<'_>) -> ExitCode {
    if let Err(code) = check_single_output(config.files, config.output) {
        return code;
    }
    if let Err(e) = config.options.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::BadArgs;
    }

    let (reports, code) = run_all(config.files, |input| {
        let output = config
            .output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| compressed_name(input));
        let reader = BufReader::new(File::open(input)?);
        let stats = write_output(&output, config.force, |out| {
            Ok(lzma_codec::compress(reader, out, &config.options)?)
        })?;
        if !config.keep {
            fs::remove_file(input)?;
        }
        Ok(CompressReport {
            input: input.to_path_buf(),
            output,
            stats,
        })
    });

    let formatter = create_formatter(config.format);
    print_reports(formatter.format_compress(&reports), config.quiet, config.format);
    code
}

/// Decompress command implementation
pub fn decompress(config: &DecompressConfig<'_>) -> ExitCode {
    if let Err(code) = check_single_output(config.files, config.output) {
        return code;
    }

    let (reports, code) = run_all(config.files, |input| {
        let output = match config.output {
            Some(path) => path.to_path_buf(),
            None => decompressed_name(input).ok_or_else(|| {
                FileError::new(
                    ExitCode::BadArgs,
                    format!("unknown suffix, expected .{}", LZMA_SUFFIX),
                )
            })?,
        };
        let reader = File::open(input)?;
        let size = write_output(&output, config.force, |out| {
            Ok(decompress_with_options(reader, out, &config.options)?)
        })?;
        if !config.keep {
            fs::remove_file(input)?;
        }
        Ok(DecompressReport {
            input: input.to_path_buf(),
            output,
            size,
        })
    });

    let formatter = create_formatter(config.format);
    print_reports(formatter.format_decompress(&reports), config.quiet, config.format);
    code
}

/// Test command implementation
pub fn test(
    files: &[PathBuf],
    options: &LzmaDecoderOptions,
    format: OutputFormat,
    quiet: bool,
) -> ExitCode {
    let (reports, code) = run_all(files, |input| {
        let reader = File::open(input)?;
        let mut sink = Crc32Writer::new(io::sink());
        let size = decompress_with_options(reader, &mut sink, options)?;
        Ok(TestReport {
            input: input.to_path_buf(),
            size,
            crc32: sink.crc(),
        })
    });

    if code == ExitCode::Success {
        let formatter = create_formatter(format);
        print_reports(formatter.format_test(&reports), quiet, format);
    }
    code
}

/// Info command implementation
pub fn info(files: &[PathBuf], format: OutputFormat) -> ExitCode {
    let (reports, code) = run_all(files, |input| {
        let mut reader = BufReader::new(File::open(input)?);
        let file_size = fs::metadata(input)?.len();
        let header = LzmaHeader::read_from(&mut reader)?;
        Ok(InfoReport {
            input: input.to_path_buf(),
            header,
            compressed_size: file_size.saturating_sub(HEADER_SIZE as u64),
        })
    });

    let formatter = create_formatter(format);
    print!("{}", formatter.format_info(&reports));
    code
}

/// CRC command implementation
pub fn crc(files: &[PathBuf], format: OutputFormat) -> ExitCode {
    let (reports, code) = run_all(files, |input| {
        let mut reader = BufReader::new(File::open(input)?);
        let crc32 = Crc32::compute_reader(&mut reader)?;
        Ok(CrcReport {
            input: input.to_path_buf(),
            size: fs::metadata(input)?.len(),
            crc32,
        })
    });

    let formatter = create_formatter(format);
    print!("{}", formatter.format_crc(&reports));
    code
}
