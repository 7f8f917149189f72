use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "cursor-subagent",
    version,
    about = "MCP server that runs cursor-agent subagents"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// agents.yaml to use instead of searching from the current directory.
    #[arg(long, global = true)]
    pub agents: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve MCP over stdio (default).
    Serve,
    /// Run one agent and print the result as JSON.
    Invoke(InvokeArgs),
    /// Print cursor-agent and configuration status.
    Status,
    /// Install and configure cursor-agent.
    Setup,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct InvokeArgs {
    #[arg(long)]
    pub role: String,

    #[arg(long)]
    pub task: String,

    /// Project root the agent works in.
    #[arg(long, default_value = ".")]
    pub cwd: PathBuf,

    #[arg(long, default_value = "")]
    pub context: String,

    #[arg(long)]
    pub model: Option<String>,

    /// Seconds.
    #[arg(long)]
    pub timeout: Option<f64>,
}
