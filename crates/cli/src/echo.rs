use std::time::Duration;

use juscrape_core::Case;
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "juscrape".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Extract case records from court-system pages\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print a labelled detail line under a step
pub fn print_detail(label: &str, value: &str) {
    eprintln!("  {} {}", format!("{}:", label).dimmed(), value.bright_white());
}

/// Print extraction summary with color-coded timing
pub fn print_case_summary(case: &Case, elapsed: Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;

    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    print_detail("Case", &case.number);
    print_detail("System", case.system.id());
    print_detail("Parties", &case.parties().count().to_string());
    print_detail("Docket entries", &case.docket.len().to_string());
    if ms < 1000.0 {
        eprintln!("  {} {:>8.2}ms", "Elapsed:".dimmed(), ms.green());
    } else {
        eprintln!("  {} {:>8.2}ms", "Elapsed:".dimmed(), ms.bright_yellow());
    }
    eprintln!();

    for error in &case.errors {
        print_warning(&error.to_string());
    }
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
