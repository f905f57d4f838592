use clap::{Parser, Subcommand, ValueEnum};

use crate::models::{DateRange, PageStatus, Provider};

/// Stored tables that only have a listing command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordKind {
    Charges,
    SalesPages,
    Scripts,
}

/// Bonus page builder and click tracking for affiliate marketers.
///
/// Without a command, commands are read line by line from stdin.
#[derive(Debug, Parser)]
#[command(name = "bonus-boost", version)]
pub struct Invocation {
    /// Keep records in memory for this run only
    #[arg(long, global = true)]
    pub memory: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Commands available in the shell.
#[derive(Debug, Parser)]
#[command(name = "bonus-boost", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Headline stats and recent activity
    Dashboard,
    /// Analyze a product page and save it
    Analyze { url: String },
    /// List analyzed products
    Products,
    /// Show one product
    Product { id: i64 },
    /// Rename a product
    RenameProduct {
        id: i64,
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Delete a product
    DeleteProduct { id: i64 },
    /// Generate and save bonuses for a product
    Generate { product_id: String },
    /// List saved bonuses
    Bonuses,
    /// Change the stated value of a bonus
    SetBonusValue { id: i64, value: String },
    /// Delete a bonus
    DeleteBonus { id: i64 },
    /// Publish a bonus page
    CreatePage {
        bonus_id: String,
        affiliate_link: String,
        /// Page title, defaults to the bonus title
        #[arg(num_args = 0..)]
        title: Vec<String>,
    },
    /// List bonus pages
    Pages,
    /// Show one bonus page
    Page { id: i64 },
    /// Change the status of a bonus page (active, draft, archived)
    #[command(name = "page-status")]
    SetPageStatus { id: i64, status: PageStatus },
    /// Delete a bonus page
    DeletePage { id: i64 },
    /// Open the public page (counts a view)
    View { id: i64 },
    /// Claim the bonus (counts a click)
    Claim { id: i64 },
    /// Traffic and conversion report (7days, 30days, 90days)
    Analytics {
        #[arg(default_value = "7days")]
        range: DateRange,
    },
    /// List stored API keys
    Keys,
    /// Store the key for a provider
    SetKey { provider: Provider, secret: String },
    /// Remove the key for a provider
    DeleteKey { provider: Provider },
    /// Mark the key for a provider active
    EnableKey { provider: Provider },
    /// Mark the key for a provider inactive
    DisableKey { provider: Provider },
    /// Test the provider connection
    TestKey { provider: Provider },
    /// List other stored records
    Records {
        #[arg(value_enum)]
        kind: RecordKind,
    },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Parse one shell line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    ShellLine::try_parse_from(words).map(|parsed| Some(parsed.command))
}

/// Free text given as several words, joined with single spaces.
pub fn join_words(words: &[String]) -> Option<String> {
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
