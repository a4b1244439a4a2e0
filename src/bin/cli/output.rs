//! Output formatting for CLI operations.

use serde_json::json;

use crate::commands::{CompressReport, CrcReport, DecompressReport, InfoReport, TestReport};

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats compression results
    fn format_compress(&self, reports: &[CompressReport]) -> String;

    /// Formats decompression results
    fn format_decompress(&self, reports: &[DecompressReport]) -> String;

    /// Formats integrity test results
    fn format_test(&self, reports: &[TestReport]) -> String;

    /// Formats stream header information
    fn format_info(&self, reports: &[InfoReport]) -> String;

    /// Formats checksums of raw files
    fn format_crc(&self, reports: &[CrcReport]) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_compress(&self, reports: &[CompressReport]) -> String {
        let mut output = String::new();
        for r in reports {
            output.push_str(&format!(
                "{} -> {}: {} -> {} ({:.1}% savings)\n",
                r.input.display(),
                r.output.display(),
                humanize_bytes(r.stats.uncompressed_size),
                humanize_bytes(r.stats.compressed_size),
                r.stats.space_savings() * 100.0
            ));
        }
        output
    }

    fn format_decompress(&self, reports: &[DecompressReport]) -> String {
        let mut output = String::new();
        for r in reports {
            output.push_str(&format!(
                "{} -> {}: {}\n",
                r.input.display(),
                r.output.display(),
                humanize_bytes(r.size)
            ));
        }
        output
    }

    fn format_test(&self, reports: &[TestReport]) -> String {
        let mut output = String::new();
        for r in reports {
            output.push_str(&format!(
                "OK   {:>12} {:08X} {}\n",
                humanize_bytes(r.size),
                r.crc32,
                r.input.display()
            ));
        }
        output.push_str(&format!("{} streams tested, all passed\n", reports.len()));
        output
    }

    fn format_info(&self, reports: &[InfoReport]) -> String {
        let mut output = String::new();

        for r in reports {
            let props = &r.header.properties;
            output.push_str(&format!("{}:\n", r.input.display()));
            output.push_str(&"-".repeat(40));
            output.push('\n');
            output.push_str(&format!(
                "  Properties:     lc={} lp={} pb={} (0x{:02X})\n",
                props.lc,
                props.lp,
                props.pb,
                props.props_byte()
            ));
            output.push_str(&format!(
                "  Dictionary:     {}\n",
                humanize_bytes(props.dict_size as u64)
            ));
            match r.header.uncompressed_size {
                Some(size) => {
                    output.push_str(&format!("  Size:           {}\n", humanize_bytes(size)));
                    if size > 0 {
                        output.push_str(&format!(
                            "  Ratio:          {:.1}%\n",
                            r.compressed_size as f64 / size as f64 * 100.0
                        ));
                    }
                }
                None => output.push_str("  Size:           unknown (end marker)\n"),
            }
            output.push_str(&format!(
                "  Packed size:    {}\n",
                humanize_bytes(r.compressed_size)
            ));
        }

        output
    }

    fn format_crc(&self, reports: &[CrcReport]) -> String {
        let mut output = String::new();
        for r in reports {
            output.push_str(&format!("{:08X}  {}\n", r.crc32, r.input.display()));
        }
        output
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_compress(&self, reports: &[CompressReport]) -> String {
        let items: Vec<_> = reports
            .iter()
            .map(|r| {
                json!({
                    "input": r.input.display().to_string(),
                    "output": r.output.display().to_string(),
                    "uncompressed_size": r.stats.uncompressed_size,
                    "compressed_size": r.stats.compressed_size,
                    "ratio": r.stats.ratio(),
                    "literals": r.stats.literals,
                    "matches": r.stats.matches,
                    "rep_matches": r.stats.rep_matches,
                    "short_reps": r.stats.short_reps,
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_decompress(&self, reports: &[DecompressReport]) -> String {
        let items: Vec<_> = reports
            .iter()
            .map(|r| {
                json!({
                    "input": r.input.display().to_string(),
                    "output": r.output.display().to_string(),
                    "size": r.size,
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_test(&self, reports: &[TestReport]) -> String {
        let items: Vec<_> = reports
            .iter()
            .map(|r| {
                json!({
                    "input": r.input.display().to_string(),
                    "size": r.size,
                    "crc32": format!("{:08x}", r.crc32),
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_info(&self, reports: &[InfoReport]) -> String {
        let items: Vec<_> = reports
            .iter()
            .map(|r| {
                let props = &r.header.properties;
                json!({
                    "input": r.input.display().to_string(),
                    "lc": props.lc,
                    "lp": props.lp,
                    "pb": props.pb,
                    "dict_size": props.dict_size,
                    "uncompressed_size": r.header.uncompressed_size,
                    "compressed_size": r.compressed_size,
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_crc(&self, reports: &[CrcReport]) -> String {
        let items: Vec<_> = reports
            .iter()
            .map(|r| {
                json!({
                    "input": r.input.display().to_string(),
                    "size": r.size,
                    "crc32": format!("{:08x}", r.crc32),
                })
            })
            .collect();

        serde_json::to_string_pretty(&items).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Creates the appropriate formatter based on output format
pub fn create_formatter(format: super::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        super::OutputFormat::Human => Box::new(HumanFormatter),
        super::OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Converts bytes to a human-readable string
pub fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
