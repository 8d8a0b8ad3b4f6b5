// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for toolflow

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use crate::engine::Priority;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "toolflow")]
#[command(about = "Run declarative tool workflows and a retrying priority task queue")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a workflow document, then drain its task queue
    Run {
        #[arg(help = "Path to workflow YAML or JSON file")]
        workflow: PathBuf,

        #[arg(
            short = 'V',
            long = "var",
            help = "Override context variables (key=value)"
        )]
        vars: Vec<String>,

        #[arg(long, help = "Run workflow tasks concurrently")]
        parallel: bool,

        #[arg(long, help = "Skip steps whose condition is malformed")]
        strict_conditions: bool,

        #[arg(short, long, default_value = "text", help = "Output format (text, json, yaml)")]
        format: OutputFormat,

        #[arg(short, long, help = "Write output to this file instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Enqueue a document's tasks and drain the queue
    Queue {
        #[arg(help = "Path to workflow YAML or JSON file")]
        workflow: PathBuf,

        #[arg(
            short = 'V',
            long = "var",
            help = "Override context variables (key=value)"
        )]
        vars: Vec<String>,

        #[arg(short, long, help = "Priority for every task (high, normal, low)")]
        priority: Option<Priority>,

        #[arg(long, help = "Failed attempts allowed before a task is marked failed")]
        max_retries: Option<u32>,

        #[arg(short, long, default_value = "text", help = "Output format (text, json, yaml)")]
        format: OutputFormat,
    },

    /// Validate a workflow file without executing
    Validate {
        #[arg(help = "Path to workflow YAML or JSON file")]
        workflow: PathBuf,
    },

    /// List the built-in tools
    Tools,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse variables from key=value format. Values that parse as JSON
    /// (numbers, booleans, arrays, objects) keep their type; anything else is a string.
    pub fn parse_variables(vars: &[String]) -> anyhow::Result<Vec<(String, Value)>> {
        let mut variables = Vec::with_capacity(vars.len());

        for var in vars {
            if let Some((key, value)) = var.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    return Err(anyhow::anyhow!("Variable name cannot be empty in '{}'", var));
                }
                let value = serde_json::from_str(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));
                variables.push((key.to_string(), value));
            } else {
                return Err(anyhow::anyhow!(
                    "Invalid variable format '{}'. Expected 'key=value'",
                    var
                ));
            }
        }

        Ok(variables)
    }
}
