//! Task command handlers
//!
//! Listing, inspecting, cancelling and following pipeline tasks.

use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use gazette_core::domain::report::Report;
use gazette_core::domain::task::{Task, TaskId, TaskStatus};

use crate::api::ApiClient;
use crate::config::Config;

/// Task subcommands
#[derive(Subcommand)]
pub enum TaskCommands {
    /// List all tracked tasks
    List,
    /// Get task details
    Get {
        /// Task ID
        id: TaskId,
    },
    /// Request cancellation of a running task
    Cancel {
        /// Task ID
        id: TaskId,
    },
    /// Task counts per status
    Stats,
    /// Follow a task until it finishes
    Watch {
        /// Task ID
        id: TaskId,

        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        interval: u64,
    },
}

/// Handle task commands
pub async fn handle_task_command(command: TaskCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.orchestrator_url);

    match command {
        TaskCommands::List => list_tasks(&client).await,
        TaskCommands::Get { id } => get_task(&client, id).await,
        TaskCommands::Cancel { id } => cancel_task(&client, id).await,
        TaskCommands::Stats => task_stats(&client).await,
        TaskCommands::Watch { id, interval } => {
            watch_task(&client, id, Duration::from_millis(interval)).await
        }
    }
}

async fn list_tasks(client: &ApiClient) -> Result<()> {
    let tasks = client.list_tasks().await?;

    if tasks.is_empty() {
        println!("{}", "No tasks found.".yellow());
    } else {
        println!("{}", format!("Found {} task(s):", tasks.len()).bold());
        println!();
        for task in tasks {
            print_task_summary(&task);
        }
    }

    Ok(())
}

async fn get_task(client: &ApiClient, id: TaskId) -> Result<()> {
    let task = client.get_task(id).await?;
    print_task_details(&task);
    Ok(())
}

async fn cancel_task(client: &ApiClient, id: TaskId) -> Result<()> {
    let response = client.cancel_task(id).await?;

    if response.cancelled {
        println!("{} Task {} cancelled", "✓".green(), id.to_string().cyan());
    } else {
        println!(
            "{}",
            format!("Task {} is not running; nothing to cancel.", id).yellow()
        );
    }

    Ok(())
}

async fn task_stats(client: &ApiClient) -> Result<()> {
    let stats = client.task_stats().await?;

    println!("{}", "Tasks:".bold());
    println!("  Total:       {}", stats.total);
    println!("  Pending:     {}", stats.pending.to_string().yellow());
    println!("  In progress: {}", stats.in_progress.to_string().cyan());
    println!("  Completed:   {}", stats.completed.to_string().green());
    println!("  Failed:      {}", stats.failed.to_string().red());
    println!("  Cancelled:   {}", stats.cancelled.to_string().dimmed());

    Ok(())
}

/// Polls a task, printing each new step, until it reaches a terminal state
pub async fn watch_task(client: &ApiClient, id: TaskId, interval: Duration) -> Result<()> {
    let mut last_seen: Option<(u8, String)> = None;

    loop {
        let task = client.get_task(id).await?;

        if let Some(step) = task.current_step() {
            let seen = (task.progress, step.message.clone());
            if last_seen.as_ref() != Some(&seen) {
                println!(
                    "  {} {} {}",
                    format!("[{:>3}%]", task.progress).cyan(),
                    step.name.bold(),
                    step.message.dimmed()
                );
                last_seen = Some(seen);
            }
        }

        if task.status.is_terminal() {
            println!();
            print_task_details(&task);
            if task.status != TaskStatus::Completed {
                anyhow::bail!("Task {} ended {}", id, task.status);
            }
            return Ok(());
        }

        tokio::time::sleep(interval).await;
    }
}

fn print_task_summary(task: &Task) {
    println!(
        "  {} Task {} ({})",
        "▸".cyan(),
        task.id.to_string().bold(),
        task.kind
    );
    println!("    Status:   {}", colorize_status(&task.status));
    println!("    Progress: {}%", task.progress);
    println!(
        "    Created:  {}",
        task.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

fn print_task_details(task: &Task) {
    println!("{}", "Task Details:".bold());
    println!("  ID:        {}", task.id.to_string().cyan());
    println!("  Pipeline:  {}", task.kind);
    println!("  Status:    {}", colorize_status(&task.status));
    println!("  Progress:  {}%", task.progress);
    println!("  Created:   {}", task.created_at.format("%Y-%m-%d %H:%M:%S"));

    if let Some(started) = task.started_at {
        println!("  Started:   {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(completed) = task.completed_at {
        println!("  Completed: {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(duration) = task.duration_ms {
        println!("  Duration:  {}ms", duration);
    }

    if !task.steps.is_empty() {
        println!("\n{}", "Steps:".bold());
        for step in &task.steps {
            println!(
                "  {} {} {}",
                step.timestamp.format("%H:%M:%S").to_string().dimmed(),
                step.name.cyan(),
                step.message
            );
        }
    }

    if let Some(error) = &task.error {
        println!("\n{}", "Error:".bold());
        println!("{}", error.red());
    }

    if let Some(result) = &task.result {
        match serde_json::from_value::<Report>(result.clone()) {
            Ok(report) => print_report(&report),
            Err(_) => {
                println!("\n{}", "Result:".bold());
                println!("{}", result);
            }
        }
    }
}

fn print_report(report: &Report) {
    println!("\n{}", format!("Report {}:", report.id).bold());
    println!(
        "  Success:   {}",
        if report.success {
            "✓".green()
        } else {
            "✗".red()
        }
    );
    if let Some(message) = &report.message {
        println!("  Message:   {}", message);
    }
    println!("  Articles:  {}", report.generated_count);
    println!(
        "  Items:     {} fetched, {} new, {} in backlog",
        report.stats.fetched, report.stats.new_items, report.stats.backlog
    );
    if report.stats.store_failures > 0 {
        println!(
            "  Skipped:   {} item(s) could not be stored",
            report.stats.store_failures
        );
    }

    for article in &report.articles {
        println!("  {} {}", "▸".green(), article.title);
        println!("    {}", article.path.dimmed());
    }
    for failure in &report.failures {
        println!("  {} {}", "✗".red(), failure.to_string().red());
    }
}

/// Colorize task status for display
fn colorize_status(status: &TaskStatus) -> colored::ColoredString {
    let status_str = status.to_string();
    match status {
        TaskStatus::Pending => status_str.yellow(),
        TaskStatus::InProgress => status_str.cyan(),
        TaskStatus::Completed => status_str.green(),
        TaskStatus::Failed => status_str.red(),
        TaskStatus::Cancelled => status_str.dimmed(),
    }
}
