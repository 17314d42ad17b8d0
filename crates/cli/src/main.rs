// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `molequeue-cli` — a thin JSON-RPC test client for exercising a
//! running daemon by hand (§6). Not a replacement for the GUI client
//! the daemon was originally built to serve; just enough surface to
//! submit, list, inspect, cancel, and shut one down from a shell.

mod client;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use client::DaemonClient;
use serde_json::json;

const DEFAULT_SOCKET_NAME: &str = "MoleQueue";

#[derive(Parser)]
#[command(name = "molequeue-cli", version)]
struct Cli {
    /// Daemon state directory (default: ~/.molequeue).
    #[arg(long, global = true)]
    working_directory_base: Option<PathBuf>,

    /// IPC endpoint name (default: MoleQueue).
    #[arg(long, global = true, default_value = DEFAULT_SOCKET_NAME)]
    socket_name: String,

    /// Connect directly to this socket path, bypassing the
    /// working-directory/socket-name default computation.
    #[arg(long, global = true)]
    socket_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the queues and programs the daemon knows about.
    ListQueues,
    /// Submit a job to a queue.
    Submit {
        queue: String,
        program: String,
        /// Path to an input file already present on disk; its contents
        /// are read and sent inline.
        #[arg(long)]
        input_file: Option<PathBuf>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value_t = 1)]
        cores: u32,
    },
    /// Look up a job's current record by its MoleQueue id.
    Lookup { mole_queue_id: i64 },
    /// Cancel a running or queued job.
    Cancel { mole_queue_id: i64 },
    /// Archive a job's record and forget it.
    Remove { mole_queue_id: i64 },
    /// Export a queue (or one of its programs) as queue-file JSON.
    ExportQueue {
        queue: String,
        #[arg(long)]
        program: Option<String>,
    },
    /// Ask the daemon to shut down cleanly.
    Kill,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let socket_path = resolve_socket_path(&cli);
    let client = DaemonClient::new(socket_path);

    let (method, params) = match cli.command {
        Command::ListQueues => ("listQueues", None),
        Command::Submit { queue, program, input_file, description, cores } => {
            let mut obj = serde_json::Map::new();
            obj.insert("queue".to_string(), json!(queue));
            obj.insert("program".to_string(), json!(program));
            obj.insert("numberOfCores".to_string(), json!(cores));
            if let Some(description) = description {
                obj.insert("description".to_string(), json!(description));
            }
            if let Some(path) = input_file {
                let contents = std::fs::read_to_string(&path)?;
                let filename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                obj.insert("inputFile".to_string(), json!({ "filename": filename, "contents": contents }));
            }
            ("submitJob", Some(serde_json::Value::Object(obj)))
        }
        Command::Lookup { mole_queue_id } => ("lookupJob", Some(json!({ "moleQueueId": mole_queue_id }))),
        Command::Cancel { mole_queue_id } => ("cancelJob", Some(json!({ "moleQueueId": mole_queue_id }))),
        Command::Remove { mole_queue_id } => ("removeJob", Some(json!({ "moleQueueId": mole_queue_id }))),
        Command::ExportQueue { queue, program } => {
            let mut obj = serde_json::Map::new();
            obj.insert("queue".to_string(), json!(queue));
            if let Some(program) = program {
                obj.insert("program".to_string(), json!(program));
            }
            ("exportQueue", Some(serde_json::Value::Object(obj)))
        }
        Command::Kill => ("rpcKill", None),
    };

    let result = client.call(method, params).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn resolve_socket_path(cli: &Cli) -> PathBuf {
    if let Some(path) = &cli.socket_path {
        return path.clone();
    }
    let base = cli.working_directory_base.clone().unwrap_or_else(default_working_directory_base);
    base.join("ipc").join(format!("{}.socket", cli.socket_name))
}

fn default_working_directory_base() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".molequeue")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("molequeue-cli").chain(args.iter().copied()))
    }

    #[test]
    fn explicit_socket_path_wins_over_working_directory() {
        let cli = parse(&["--socket-path", "/tmp/custom.socket", "list-queues"]);
        assert_eq!(resolve_socket_path(&cli), PathBuf::from("/tmp/custom.socket"));
    }

    #[test]
    fn working_directory_and_socket_name_compose_the_default_path() {
        let cli = parse(&["--working-directory-base", "/srv/molequeue", "--socket-name", "Custom", "list-queues"]);
        assert_eq!(resolve_socket_path(&cli), PathBuf::from("/srv/molequeue/ipc/Custom.socket"));
    }

    #[test]
    fn default_socket_name_is_molequeue() {
        let cli = parse(&["--working-directory-base", "/srv/molequeue", "list-queues"]);
        assert_eq!(resolve_socket_path(&cli), PathBuf::from("/srv/molequeue/ipc/MoleQueue.socket"));
    }
}
