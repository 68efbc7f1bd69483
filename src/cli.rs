use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Clip description JSON
    #[arg(value_name = "CLIP_PATH")]
    pub clip_path: String,

    /// Path to config TOML
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    /// Generations to run (overrides config; 0 = until Ctrl-C)
    #[arg(long)]
    pub ticks: Option<u64>,

    /// RNG seed (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the fitted phase annotation JSON here instead of stdout
    #[arg(long)]
    pub out: Option<String>,

    /// Comma-separated bone names to fit (default: all bones)
    #[arg(long)]
    pub bones: Option<String>,

    /// Suppress progress logging
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}
