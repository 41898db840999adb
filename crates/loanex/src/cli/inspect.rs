use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use loanex_core::{PageSplitter, PipelineConfig, SourceDocument};
use serde_json::json;

use super::Tuning;

pub async fn run(file: &Path, tuning: &Tuning, as_json: bool) -> Result<()> {
    let mut pipeline = PipelineConfig::default();
    tuning.apply(&mut pipeline);
    pipeline.validate()?;

    let source = SourceDocument::open(file).await?;
    let ranges = PageSplitter::new(pipeline.chunk_pages)
        .plan_for(source.bytes())
        .with_context(|| format!("Could not read {}", file.display()))?;
    let pages = ranges.last().map_or(0, |range| range.end);
    let split = source.byte_size() > pipeline.split_threshold_bytes;

    if as_json {
        let chunks = if split { ranges } else { Vec::new() };
        let plan = json!({
            "file": file.display().to_string(),
            "bytes": source.byte_size(),
            "pages": pages,
            "split": split,
            "chunk_pages": pipeline.chunk_pages,
            "max_concurrent_chunks": pipeline.max_concurrent_chunks,
            "chunks": chunks,
        });
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{} {}", style("●").green(), style(file.display()).bold());
    println!("  Size: {} bytes", source.byte_size());
    println!("  Pages: {pages}");

    if split {
        println!(
            "  Split: {} chunks of up to {} pages",
            ranges.len(),
            pipeline.chunk_pages
        );
        println!("  Workers: {}", pipeline.max_concurrent_chunks);
        for (index, range) in ranges.iter().enumerate() {
            println!("    {} {}", style(format!("#{index}")).dim(), range);
        }
    } else {
        println!(
            "  Split: no (at most {} bytes are sent whole)",
            pipeline.split_threshold_bytes
        );
    }

    Ok(())
}
