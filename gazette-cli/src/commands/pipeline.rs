//! Pipeline command handlers
//!
//! Launching pipelines and running cleanup.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use colored::*;
use gazette_core::domain::task::{PipelineKind, PipelineOptions};
use gazette_core::dto::task::RunPipeline;

use crate::api::ApiClient;
use crate::commands::task::watch_task;
use crate::config::Config;

/// Arguments of `gazette run`
#[derive(Args)]
pub struct RunArgs {
    /// Pipeline: full, fetch, fetch-selective, analyze, incremental or cleanup
    pub kind: PipelineKind,

    /// Number of articles to generate
    #[arg(short, long)]
    pub count: Option<usize>,

    /// Item ID to write about first (repeatable)
    #[arg(short, long = "item")]
    pub items: Vec<String>,

    /// Feed name to fetch (repeatable; fetch-selective only)
    #[arg(short, long = "source")]
    pub sources: Vec<String>,

    /// Target word count per article
    #[arg(short, long)]
    pub words: Option<usize>,

    /// Skip image generation
    #[arg(long)]
    pub no_image: bool,

    /// Follow the task until it finishes
    #[arg(long)]
    pub watch: bool,

    /// Poll interval in milliseconds when watching
    #[arg(long, default_value = "1000")]
    pub interval: u64,
}

impl RunArgs {
    /// Options sent with the launch request; unset flags stay unset
    fn options(&self) -> PipelineOptions {
        PipelineOptions {
            count: self.count,
            item_ids: self.items.clone(),
            sources: self.sources.clone(),
            word_count: self.words,
            with_image: self.no_image.then_some(false),
        }
    }
}

/// Handle `gazette run`
pub async fn handle_run(args: RunArgs, config: &Config) -> Result<()> {
    if args.kind == PipelineKind::Cleanup {
        return handle_cleanup(config).await;
    }
    if args.kind == PipelineKind::FetchSelective && args.sources.is_empty() {
        anyhow::bail!("fetch-selective needs at least one --source");
    }

    let client = ApiClient::new(&config.orchestrator_url);
    let req = RunPipeline {
        kind: args.kind,
        options: args.options(),
    };

    let response = client.run_pipeline(&req).await?;

    println!(
        "{} {} pipeline launched as task {}",
        "✓".green(),
        args.kind.to_string().bold(),
        response.task_id.to_string().cyan()
    );

    if args.watch {
        watch_task(&client, response.task_id, Duration::from_millis(args.interval)).await
    } else {
        println!(
            "{}",
            format!("  Follow it with: gazette task watch {}", response.task_id).dimmed()
        );
        Ok(())
    }
}

/// Handle `gazette cleanup`
pub async fn handle_cleanup(config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.orchestrator_url);
    let summary = client.cleanup().await?;

    if summary.removed_files.is_empty() {
        println!("{}", "No invalid files found.".green());
    } else {
        println!(
            "{}",
            format!("Removed {} invalid file(s):", summary.removed_files.len()).bold()
        );
        for file in &summary.removed_files {
            println!("  {} {}", "▸".red(), file.dimmed());
        }
    }

    let stats = summary.stats;
    println!();
    println!("{}", "Content:".bold());
    println!("  Items:       {}", stats.total_items);
    println!("  Processed:   {}", stats.processed_items);
    println!("  Unprocessed: {}", stats.unprocessed_items);
    println!("  Reports:     {}", stats.reports);

    Ok(())
}
