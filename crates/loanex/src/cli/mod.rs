pub mod inspect;
pub mod process;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use loanex_core::PipelineConfig;

#[derive(Parser)]
#[command(
    name = "loanex",
    about = "Extract financial fields from loan document PDFs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split, classify and extract a PDF, then store the merged record
    Process {
        /// PDF file to process
        file: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
        /// Table the merged record is written to
        #[arg(long)]
        table: Option<String>,
    },
    /// Show how a PDF would be split, without contacting any service
    Inspect {
        /// PDF file to inspect
        file: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for values otherwise taken from the environment.
#[derive(Args, Debug, Default)]
pub struct Tuning {
    /// Maximum pages per chunk
    #[arg(long)]
    pub chunk_pages: Option<usize>,
    /// Split documents larger than this many bytes
    #[arg(long)]
    pub split_threshold: Option<u64>,
    /// Chunks processed at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,
}

impl Tuning {
    pub fn apply(&self, pipeline: &mut PipelineConfig) {
        if let Some(pages) = self.chunk_pages {
            pipeline.chunk_pages = pages;
        }
        if let Some(bytes) = self.split_threshold {
            pipeline.split_threshold_bytes = bytes;
        }
        if let Some(width) = self.concurrency {
            pipeline.max_concurrent_chunks = width;
        }
    }
}
