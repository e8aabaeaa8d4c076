//! CLI subcommands that talk to a running daemon over the RPC client.

use anyhow::{Context as _, Result};
use clap::Subcommand;
use serde_json::json;

use crate::client::TaskClient;
use crate::config::TaskdConfig;
use crate::tasks::Task;

#[derive(Subcommand)]
pub enum TaskAction {
    /// List tasks (first page by default).
    ///
    /// Examples:
    ///   taskd task list
    ///   taskd task list --limit 20
    ///   taskd task list --all
    List {
        /// Page size (1-20).
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Follow cursors until every page has been fetched.
        #[arg(long)]
        all: bool,
        /// Print raw JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Create a new task.
    Add {
        /// Task title (must be non-empty).
        title: String,
        /// Optional longer description.
        #[arg(long, short = 'd')]
        description: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show one task by id.
    Get {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Update a task's title and/or description.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short = 'd')]
        description: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Delete a task permanently.
    Rm {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

fn connect(config: &TaskdConfig) -> Result<TaskClient> {
    let token = crate::auth::read_token(&config.data_dir)?;
    Ok(TaskClient::new(config.port, token))
}

/// `taskd status` — healthcheck + daemon.status. Returns the process exit code.
pub async fn run_status(config: &TaskdConfig, json_out: bool) -> i32 {
    let client = match connect(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e:#}");
            return 1;
        }
    };

    let spinner = if json_out {
        None
    } else {
        let s = indicatif::ProgressBar::new_spinner();
        s.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        s.set_message("Checking daemon…");
        s.enable_steady_tick(std::time::Duration::from_millis(80));
        Some(s)
    };

    let result = client.call_once("daemon.status", json!({})).await;
    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    match result {
        Ok(status) => {
            if json_out {
                println!("{}", serde_json::to_string_pretty(&status).unwrap_or_default());
            } else {
                println!("daemon:  running (port {})", status["port"]);
                println!("version: {}", status["version"].as_str().unwrap_or("?"));
                println!("uptime:  {}s", status["uptime"]);
                println!("tasks:   {}", status["tasks"]);
            }
            0
        }
        Err(_) => {
            if json_out {
                println!("{}", json!({ "status": "down" }));
            } else {
                eprintln!("daemon: not running on port {}", client.port());
                eprintln!("Start it with: taskd serve");
            }
            1
        }
    }
}

/// `taskd task <action>` — task management over RPC.
pub async fn run_task(action: TaskAction, config: &TaskdConfig) -> Result<()> {
    let client = connect(config)?;

    match action {
        TaskAction::List { limit, all, json } => {
            let mut tasks: Vec<Task> = Vec::new();
            let mut cursor: Option<String> = None;

            loop {
                let result = client
                    .call_once(
                        "task.getPaginated",
                        json!({ "limit": limit, "cursor": cursor }),
                    )
                    .await
                    .context("task.getPaginated RPC failed")?;

                let page: Vec<Task> = serde_json::from_value(result["items"].clone())?;
                tasks.extend(page);

                cursor = result["nextCursor"].as_str().map(str::to_owned);
                if !all || cursor.is_none() {
                    break;
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("no tasks");
            } else {
                for task in &tasks {
                    print_task_row(task);
                }
            }
        }
        TaskAction::Add {
            title,
            description,
            json,
        } => {
            let result = client
                .call_once(
                    "task.create",
                    json!({ "title": title, "description": description }),
                )
                .await
                .context("task.create RPC failed")?;
            let task: Task = serde_json::from_value(result)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                println!("created {}", task.id);
            }
        }
        TaskAction::Get { id, json } => {
            let result = client
                .call_once("task.getById", json!({ "id": id }))
                .await
                .context("task.getById RPC failed")?;
            let task: Task = serde_json::from_value(result)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                print_task_row(&task);
                if let Some(d) = &task.description {
                    println!("    {d}");
                }
            }
        }
        TaskAction::Update {
            id,
            title,
            description,
            json,
        } => {
            let mut params = serde_json::Map::new();
            params.insert("id".into(), json!(id));
            if let Some(t) = title {
                params.insert("title".into(), json!(t));
            }
            if let Some(d) = description {
                params.insert("description".into(), json!(d));
            }

            let result = client
                .call_once("task.update", serde_json::Value::Object(params))
                .await
                .context("task.update RPC failed")?;
            let task: Task = serde_json::from_value(result)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                println!("updated {}", task.id);
            }
        }
        TaskAction::Rm { id, yes } => {
            if !yes && !confirm(&format!("Delete task {id}? [y/N] "))? {
                println!("aborted");
                return Ok(());
            }
            client
                .call_once("task.delete", json!({ "id": id }))
                .await
                .context("task.delete RPC failed")?;
            println!("deleted {id}");
        }
    }

    Ok(())
}

fn print_task_row(task: &Task) {
    let updated = task
        .updated_at
        .map(|t| format!("  (updated {})", t.format("%Y-%m-%d %H:%M")))
        .unwrap_or_default();
    println!(
        "{}  {}  {}{}",
        task.id,
        task.created_at.format("%Y-%m-%d %H:%M"),
        task.title,
        updated
    );
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write as _;
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
