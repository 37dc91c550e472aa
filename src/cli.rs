//! Command-line interface.
//!
//! Every option can come from a flag or an environment variable; values are
//! read once at startup and never change during a run.

use clap::Parser;

use crate::config;

/// Command-line arguments for the recipe harvest pipeline.
///
/// # Examples
///
/// ```sh
/// # Default run: crawl (if needed), then extract into ./out
/// recipe_harvest
///
/// # Custom locations
/// recipe_harvest -l ./links -o ./out --tokenizer-bin ./en_tokenizer.bin
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding the category link files and the master link file
    #[arg(short, long, env = "LINKS_FOLDER", default_value = "./links")]
    pub links_dir: String,

    /// Directory for the JSONL persistence sink
    #[arg(short, long, default_value = "./out")]
    pub output_dir: String,

    /// Outbound User-Agent header
    #[arg(long, env = "USER_AGENT", default_value = config::DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Upper bound in seconds for the politeness delay after each request
    #[arg(long, default_value_t = config::DEFAULT_MAX_DELAY_SECS)]
    pub max_delay_secs: u64,

    /// Path to the nlprule English tokenizer binary
    #[arg(long, env = "TOKENIZER_BIN", default_value = "./en_tokenizer.bin")]
    pub tokenizer_bin: String,
}
