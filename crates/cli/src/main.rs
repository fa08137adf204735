//! JSONify CLI - Command-line interface for the JSONify export daemon

mod rpc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rpc::{RpcClient, RpcError};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9537";

#[derive(Parser)]
#[command(name = "jsonify")]
#[command(about = "JSONify export engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "JSONIFY_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(clap::Args)]
struct ProjectionArgs {
    /// Model the records belong to (e.g. res.partner)
    #[arg(short, long)]
    model: String,

    /// Comma-separated record ids
    #[arg(short, long, value_delimiter = ',', required = true)]
    ids: Vec<i64>,

    /// Stored export template id
    #[arg(short, long, conflicts_with = "parser")]
    template: Option<i64>,

    /// Inline parser as JSON, e.g. '["id","name"]'
    #[arg(short, long)]
    parser: Option<String>,

    /// Records per batch
    #[arg(short, long)]
    batch_size: Option<i64>,

    /// Emit objects keyed by field name instead of positional arrays
    #[arg(long)]
    with_field_names: bool,
}

impl ProjectionArgs {
    fn parser_json(&self) -> Result<Option<serde_json::Value>> {
        self.parser
            .as_deref()
            .map(|raw| serde_json::from_str(raw).context("Invalid JSON parser"))
            .transpose()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a background export job
    Create {
        #[command(flatten)]
        projection: ProjectionArgs,

        /// Job name (default: "JSON Export <date>")
        #[arg(short, long)]
        name: Option<String>,

        /// Completion hook as collection.method
        #[arg(long)]
        callback: Option<String>,

        /// Record passed to the completion hook
        #[arg(long, requires = "callback")]
        callback_record_id: Option<i64>,

        /// Start the job right away
        #[arg(long)]
        start: bool,
    },

    /// Start a pending job
    Start { job_id: String },

    /// Retry a failed job
    Retry { job_id: String },

    /// Cancel a job
    Cancel { job_id: String },

    /// Show one job
    Show { job_id: String },

    /// List recent jobs
    List {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Show where a finished job's result lives
    Result { job_id: String },

    /// Fetch an artifact's content
    Download {
        artifact_id: i64,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export synchronously and print the rows
    Export {
        #[command(flatten)]
        projection: ProjectionArgs,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Store a reusable export template
    TemplateCreate {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        model: String,

        /// Parser as JSON
        #[arg(short, long)]
        parser: String,
    },

    /// Load records from a JSON file (array of objects with an integer "id")
    Import {
        #[arg(short, long)]
        model: String,

        file: PathBuf,
    },

    /// Show system status
    Status,
}

#[derive(Deserialize)]
struct JobView {
    job_id: String,
    name: String,
    state: String,
    model_name: String,
    record_count: usize,
    export_template_id: Option<i64>,
    batch_size: i64,
    with_field_names: bool,
    result_artifact_id: Option<i64>,
    result_count: Option<u64>,
    error_message: Option<String>,
    created_at: i64,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    execution_handle: Option<String>,
    callback: Option<String>,
}

#[derive(Tabled)]
struct JobRow {
    job_id: String,
    name: String,
    state: String,
    model: String,
    records: usize,
    exported: String,
}

impl From<&JobView> for JobRow {
    fn from(job: &JobView) -> Self {
        Self {
            job_id: job.job_id.clone(),
            name: job.name.clone(),
            state: colored_state(&job.state),
            model: job.model_name.clone(),
            records: job.record_count,
            exported: or_dash(job.result_count),
        }
    }
}

#[derive(Deserialize, Tabled)]
struct StartReceipt {
    job_id: String,
    state: String,
    #[tabled(display_with = "display_handle")]
    execution_handle: Option<String>,
}

#[derive(Deserialize)]
struct CreateResponse {
    job: JobView,
    receipt: Option<StartReceipt>,
}

#[derive(Deserialize)]
struct ListResponse {
    jobs: Vec<JobView>,
}

#[derive(Deserialize, Tabled)]
struct ResultLocator {
    artifact_id: i64,
    file_name: String,
    url: String,
}

#[derive(Deserialize)]
struct DownloadResponse {
    name: String,
    content: String,
}

#[derive(Deserialize)]
struct SyncResponse {
    count: usize,
    records: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct StatsResponse {
    total_jobs: i64,
    pending_jobs: i64,
    processing_jobs: i64,
    done_jobs: i64,
    failed_jobs: i64,
    async_enabled: bool,
    uptime_seconds: i64,
}

fn display_handle(handle: &Option<String>) -> String {
    or_dash(handle.as_ref())
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn colored_state(state: &str) -> String {
    match state {
        "DONE" => state.green().to_string(),
        "FAILED" => state.red().to_string(),
        "PROCESSING" => state.yellow().to_string(),
        _ => state.to_string(),
    }
}

fn print_job(job: &JobView) {
    println!("  {} {}", "Job ID:".bold(), job.job_id);
    println!("  {} {}", "Name:".bold(), job.name);
    println!("  {} {}", "State:".bold(), colored_state(&job.state));
    println!("  {} {}", "Model:".bold(), job.model_name);
    println!("  {} {}", "Records:".bold(), job.record_count);
    println!("  {} {}", "Template:".bold(), or_dash(job.export_template_id));
    println!("  {} {}", "Batch Size:".bold(), job.batch_size);
    println!("  {} {}", "Field Names:".bold(), job.with_field_names);
    println!("  {} {}", "Exported:".bold(), or_dash(job.result_count));
    println!("  {} {}", "Artifact:".bold(), or_dash(job.result_artifact_id));
    println!("  {} {}", "Callback:".bold(), or_dash(job.callback.as_ref()));
    println!("  {} {}", "Handle:".bold(), or_dash(job.execution_handle.as_ref()));
    println!("  {} {}", "Created:".bold(), job.created_at);
    println!("  {} {}", "Started:".bold(), or_dash(job.started_at));
    println!("  {} {}", "Completed:".bold(), or_dash(job.completed_at));
    if let Some(message) = &job.error_message {
        println!("  {} {}", "Error:".bold(), message.red());
    }
}

fn emit(content: &str, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{}", format!("✓ Written to {}", path.display()).green().bold());
        }
        None => println!("{}", content),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = RpcClient::new(cli.rpc_url);

    match cli.command {
        Commands::Create {
            projection,
            name,
            callback,
            callback_record_id,
            start,
        } => {
            let params = json!({
                "name": name,
                "model_name": projection.model,
                "record_ids": projection.ids,
                "export_template_id": projection.template,
                "parser": projection.parser_json()?,
                "batch_size": projection.batch_size,
                "with_field_names": projection.with_field_names,
                "callback": callback,
                "callback_record_id": callback_record_id,
                "start": start,
            });

            let created = match client
                .call::<CreateResponse>("export.create.v1", params)
                .await
            {
                Ok(created) => created,
                Err(e) => {
                    // The job may exist even though starting it failed
                    if let Some(job_id) = e
                        .downcast_ref::<RpcError>()
                        .and_then(|rpc| rpc.data.as_ref())
                        .and_then(|data| data["job_id"].as_str())
                    {
                        println!("{}", format!("! Job {} created but not started", job_id).yellow());
                    }
                    return Err(e);
                }
            };

            println!("{}", "✓ Export job created".green().bold());
            println!();
            println!("{}", Table::new(vec![JobRow::from(&created.job)]));
            if let Some(receipt) = created.receipt {
                println!();
                println!("{}", "✓ Job started".green().bold());
                println!("{}", Table::new(vec![receipt]));
            }
        }

        Commands::Start { job_id } => {
            let receipt: StartReceipt = client
                .call("export.start.v1", json!({ "job_id": job_id }))
                .await?;
            println!("{}", "✓ Job started".green().bold());
            println!("{}", Table::new(vec![receipt]));
        }

        Commands::Retry { job_id } => {
            let receipt: StartReceipt = client
                .call("export.retry.v1", json!({ "job_id": job_id }))
                .await?;
            println!("{}", "✓ Job restarted".green().bold());
            println!("{}", Table::new(vec![receipt]));
        }

        Commands::Cancel { job_id } => {
            let job: JobView = client
                .call("export.cancel.v1", json!({ "job_id": job_id }))
                .await?;
            println!("{}", format!("✓ Job {} cancelled", job.job_id).green().bold());
        }

        Commands::Show { job_id } => {
            let job: JobView = client
                .call("export.get.v1", json!({ "job_id": job_id }))
                .await?;
            print_job(&job);
        }

        Commands::List { limit } => {
            let list: ListResponse = client
                .call("export.list.v1", json!({ "limit": limit }))
                .await?;
            if list.jobs.is_empty() {
                println!("{}", "No export jobs".yellow());
            } else {
                let rows: Vec<JobRow> = list.jobs.iter().map(JobRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Result { job_id } => {
            let locator: ResultLocator = client
                .call("export.result.v1", json!({ "job_id": job_id }))
                .await?;
            println!("{}", Table::new(vec![locator]));
        }

        Commands::Download {
            artifact_id,
            output,
        } => {
            let download: DownloadResponse = client
                .call("export.download.v1", json!({ "artifact_id": artifact_id }))
                .await?;
            let output = output.or_else(|| Some(PathBuf::from(&download.name)));
            emit(&download.content, output)?;
        }

        Commands::Export { projection, output } => {
            let mut params = json!({
                "model_name": projection.model,
                "record_ids": projection.ids,
                "export_template_id": projection.template,
                "parser": projection.parser_json()?,
                "with_field_names": projection.with_field_names,
            });
            if let Some(batch_size) = projection.batch_size {
                params["batch_size"] = json!(batch_size);
            }

            let result: SyncResponse = client.call("export.sync.v1", params).await?;
            let content = serde_json::to_string_pretty(&result.records)?;
            emit(&content, output)?;
            eprintln!("{}", format!("{} records exported", result.count).dimmed());
        }

        Commands::TemplateCreate {
            name,
            model,
            parser,
        } => {
            let parser: serde_json::Value =
                serde_json::from_str(&parser).context("Invalid JSON parser")?;
            let result: serde_json::Value = client
                .call(
                    "template.create.v1",
                    json!({ "name": name, "model_name": model, "parser": parser }),
                )
                .await?;
            println!(
                "{}",
                format!("✓ Template {} created", result["template_id"]).green().bold()
            );
        }

        Commands::Import { model, file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let records: Vec<serde_json::Value> =
                serde_json::from_str(&raw).context("Expected a JSON array of records")?;
            let result: serde_json::Value = client
                .call(
                    "records.import.v1",
                    json!({ "model_name": model, "records": records }),
                )
                .await?;
            println!(
                "{}",
                format!("✓ {} records imported into {}", result["imported"], model)
                    .green()
                    .bold()
            );
        }

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match client.call::<StatsResponse>("admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), client.url());
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    let mode = if stats.async_enabled {
                        "enabled".green()
                    } else {
                        "disabled".yellow()
                    };
                    println!("  {} {}", "Async:".bold(), mode);
                    println!();
                    println!("  {} {}", "Total Jobs:".bold(), stats.total_jobs);
                    println!("  {} {}", "Pending:".bold(), stats.pending_jobs);
                    println!("  {} {}", "Processing:".bold(), stats.processing_jobs);
                    println!("  {} {}", "Done:".bold(), stats.done_jobs);
                    println!("  {} {}", "Failed:".bold(), stats.failed_jobs);
                    println!();
                    println!("  {} {} seconds", "Uptime:".bold(), stats.uptime_seconds);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_parses_comma_separated_ids() {
        let cli = Cli::try_parse_from([
            "jsonify", "create", "--model", "res.partner", "--ids", "3,1,2", "--parser",
            r#"["id","name"]"#, "--start",
        ])
        .unwrap();

        match cli.command {
            Commands::Create {
                projection, start, ..
            } => {
                assert_eq!(projection.ids, vec![3, 1, 2]);
                assert!(start);
                assert_eq!(projection.parser_json().unwrap(), Some(json!(["id", "name"])));
            }
            _ => panic!("expected create"),
        }
    }

    #[test]
    fn test_template_and_parser_conflict() {
        let result = Cli::try_parse_from([
            "jsonify", "export", "--model", "m", "--ids", "1", "--template", "4", "--parser", "[]",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_callback_record_requires_callback() {
        let result = Cli::try_parse_from([
            "jsonify", "create", "--model", "m", "--ids", "1", "--callback-record-id", "5",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_parser_json() {
        let args = ProjectionArgs {
            model: "m".to_string(),
            ids: vec![1],
            template: None,
            parser: Some("{not json".to_string()),
            batch_size: None,
            with_field_names: false,
        };
        assert!(args.parser_json().is_err());
    }

    #[test]
    fn test_job_row_from_view() {
        let view: JobView = serde_json::from_value(json!({
            "job_id": "j1", "name": "Export", "state": "PENDING", "model_name": "res.partner",
            "record_count": 3, "export_template_id": null, "batch_size": 100,
            "with_field_names": false, "result_artifact_id": null, "result_count": null,
            "error_message": null, "created_at": 1, "started_at": null, "completed_at": null,
            "execution_handle": null, "callback": null
        }))
        .unwrap();
        let row = JobRow::from(&view);
        assert_eq!(row.records, 3);
        assert_eq!(row.exported, "-");
    }
}
