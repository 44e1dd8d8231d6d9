use owo_colors::OwoColorize;
use siphon_core::ExtractionResult;

use crate::VERSION;

/// Banner shown in verbose mode
pub fn print_banner() {
    eprintln!("\n{} {}", "Siphon".bold().bright_blue(), format!("v{VERSION}").dimmed());
    eprintln!("{}", "Readable articles out of rendered web pages\n".dimmed());
}

pub fn print_step(step: usize, total: usize, message: &str) {
    let counter = format!("[{step}/{total}]");
    eprintln!("{} {}", counter.dimmed(), message.bright_cyan());
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message.green());
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "•".blue(), message.blue());
}

/// Print a labelled value under the current step
pub fn print_field(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{label}:").dimmed(), value.bright_white());
}

/// Print what was extracted
pub fn print_extraction_summary(result: &ExtractionResult) {
    let rule = "─".repeat(48);
    eprintln!("\n{}\n{}\n{}", rule.dimmed(), "Extraction Summary".bold().cyan(), rule.dimmed());
    print_field("Title", &result.title);
    print_field("Status", &result.status_code.to_string());
    print_field("Characters", &result.length.to_string());
    print_field("Images", &result.images.len().to_string());
    if let Some(cover) = &result.cover {
        print_field("Cover", cover);
    }
    eprintln!();
}

/// Human-readable byte count, one decimal above 1 KB
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 2] = ["KB", "MB"];

    let mut value = bytes as f64;
    let mut unit = None;
    for name in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = Some(name);
    }

    match unit {
        Some(name) => format!("{value:.1} {name}"),
        None => format!("{bytes} B"),
    }
}
