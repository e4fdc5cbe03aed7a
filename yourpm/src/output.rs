//! Output helpers for consistent CLI output.
//!
//! ```rust,ignore
//! use yourpm::output::Output;
//!
//! Output::step("jq 1.7.1");
//! Output::success("Switched to laptop");
//! Output::warning("No config found");
//! ```

use owo_colors::OwoColorize;

pub struct Output;

impl Output {
    /// `✓ Switched to laptop`
    pub fn success(msg: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), msg.as_ref());
    }

    /// Printed to stderr: `✗ download failed`
    pub fn error(msg: impl AsRef<str>) {
        eprintln!("{} {}", "✗".red().bold(), msg.as_ref().red());
    }

    /// `⚠ Failed to remove yourpm-node`
    pub fn warning(msg: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow(), msg.as_ref());
    }

    /// `→ Pruning containers...`
    pub fn info(msg: impl AsRef<str>) {
        println!("{} {}", "→".cyan(), msg.as_ref().dimmed());
    }

    /// `  • jq 1.7.1`
    pub fn step(msg: impl AsRef<str>) {
        println!("  {} {}", "•".cyan(), msg.as_ref());
    }

    /// `  Store:         /home/u/.yourpm/store/jq-1.7.1`
    pub fn kv(key: impl AsRef<str>, value: impl AsRef<str>) {
        println!("  {:<14} {}", format!("{}:", key.as_ref()).cyan(), value.as_ref());
    }
}
