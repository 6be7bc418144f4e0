use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use healthlog_service::http::validation::{CreateLogDto, CreateLogsRequest};

#[derive(Parser)]
#[command(name = "healthlog-cli")]
#[command(about = "Client for the health log service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "HEALTHLOG_URL", default_value = "http://localhost:3000")]
    url: String,

    #[arg(short, long, env = "HEALTHLOG_API_TOKEN")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload log entries from a JSON file (`{"logs": [...]}` or a bare array)
    Upload { file: PathBuf },
    /// List stored log entries
    Logs {
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        after: Option<String>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Entry counts grouped by a dimension
    Stats {
        #[arg(value_enum)]
        dimension: Dimension,
    },
    /// Upload the sample dataset
    Seed,
}

#[derive(Clone, Copy, ValueEnum)]
enum Dimension {
    Severity,
    Source,
}

impl Dimension {
    fn as_str(self) -> &'static str {
        match self {
            Dimension::Severity => "severity",
            Dimension::Source => "source",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.token))?,
    );

    let res = match cli.command {
        Commands::Upload { file } => {
            let raw: Value = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let body = match raw {
                Value::Array(logs) => serde_json::json!({ "logs": logs }),
                other => other,
            };
            client
                .post(format!("{base}/logs"))
                .headers(headers)
                .json(&body)
                .send()
                .await?
        }
        Commands::Logs {
            severity,
            after,
            limit,
            offset,
        } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(severity) = severity {
                query.push(("severity", severity));
            }
            if let Some(after) = after {
                query.push(("after", after));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }
            if let Some(offset) = offset {
                query.push(("offset", offset.to_string()));
            }
            client
                .get(format!("{base}/logs"))
                .headers(headers)
                .query(&query)
                .send()
                .await?
        }
        Commands::Stats { dimension } => {
            client
                .get(format!("{base}/stats/{}", dimension.as_str()))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Seed => {
            client
                .post(format!("{base}/logs"))
                .headers(headers)
                .json(&sample_dataset())
                .send()
                .await?
        }
    };

    print_response(res).await
}

fn sample_dataset() -> CreateLogsRequest {
    let entry = |timestamp: &str, source: &str, severity: &str, message: &str, patient: &str| {
        CreateLogDto {
            timestamp: Some(timestamp.into()),
            source: Some(source.into()),
            severity: Some(severity.into()),
            message: Some(message.into()),
            patient_id: Some(patient.into()),
        }
    };

    CreateLogsRequest {
        logs: vec![
            entry(
                "2025-03-01T14:25:43Z",
                "medication-service",
                "error",
                "User XYZ failed medication eligibility check",
                "aam434",
            ),
            entry(
                "2025-04-12T09:00:00Z",
                "test-station",
                "info",
                "Proband tested negative for XX",
                "bqa941",
            ),
            entry(
                "2025-04-14T09:00:00Z",
                "test-station",
                "info",
                "Proband tested negative for ZZZZ",
                "fxx345",
            ),
            entry(
                "2025-05-20T18:12:00Z",
                "vitals-monitor",
                "info",
                "Heartbeat within normal range",
                "abc123",
            ),
            entry(
                "2025-05-20T18:12:00Z",
                "vitals-monitor",
                "warning",
                "Blood pressure outside of normal range",
                "abc123",
            ),
            entry(
                "2025-05-22T18:12:00Z",
                "vitals-monitor",
                "info",
                "Heartbeat within normal range",
                "abx444",
            ),
        ],
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {status}");
        if let Ok(text) = res.text().await {
            eprintln!("Response: {text}");
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
