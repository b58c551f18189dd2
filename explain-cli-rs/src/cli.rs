//! Command-line argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Explain a part of a 3D model with Gemini
#[derive(Parser)]
#[command(name = "part-explain")]
#[command(about = "Ask Gemini what a part of a 3D model is", long_about = None)]
#[command(version)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(flatten)]
    pub explain: ExplainArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Name of the clicked part (mesh or object name)
    #[arg(long, required = true)]
    pub target: Option<String>,

    /// Name of the whole model, e.g. "Human heart"
    #[arg(long, default_value = "3D model")]
    pub context: String,

    /// Screenshot of the current view (JPEG or PNG)
    #[arg(long, conflicts_with = "image_uri")]
    pub image: Option<PathBuf>,

    /// Screenshot as a `data:image/...;base64,` URI
    #[arg(long)]
    pub image_uri: Option<String>,

    /// Answer language; defaults to EXPLAINER_LANGUAGE or English
    #[arg(long)]
    pub language: Option<String>,

    /// Per-model timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Override the Gemini endpoint (proxies, local mocks)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the models tried, in order
    Plan,
}
