//! `turbo-agent` — CLI entry point for running Turbo agents.
//!
//! ```text
//! turbo-agent "Triage all open issues in the project"
//! turbo-agent --project abc-123 "Generate a status report"
//! turbo-agent --interactive
//! turbo-agent --stream --verbose "Break down the auth feature into issues"
//! turbo-agent --output report.md "Generate a status report"
//! ```
//!
//! This binary is deliberately thin: it parses arguments, configures
//! logging, and drives [`turbo_agent_core::driver::AgentDriver`]. It has no
//! concrete LLM wire client of its own — until one is wired in via
//! [`turbo_agent_core::driver::AgentRuntime`], it runs against
//! [`turbo_agent_core::driver::NullAgentRuntime`] so the rest of the
//! pipeline (tools, hooks, budget tracking) is still exercised end to end.

use std::io::{self, Write as _};
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;

use turbo_agent_core::driver::{AgentDriver, DriverConfig, NullAgentRuntime, RuntimeEvent};
use turbo_agent_core::http::HttpClient;

#[derive(Parser, Debug)]
#[command(
    name = "turbo-agent",
    about = "Turbo Agent — autonomous project management"
)]
struct Cli {
    /// Task for the agent to perform.
    prompt: Option<String>,

    /// Scope the agent to a specific project ID.
    #[arg(short, long)]
    project: Option<String>,

    /// Model tier to use.
    #[arg(short, long, default_value = "sonnet")]
    model: String,

    /// Maximum agent turns.
    #[arg(long = "max-turns", default_value_t = 25)]
    max_turns: u32,

    /// Maximum budget in USD.
    #[arg(long = "max-budget", default_value_t = 2.0)]
    max_budget: f64,

    /// Run in interactive multi-turn mode.
    #[arg(short, long)]
    interactive: bool,

    /// Stream agent output in real time.
    #[arg(short, long)]
    stream: bool,

    /// Show tool calls and debug info.
    #[arg(short, long)]
    verbose: bool,

    /// Save agent output to a file.
    #[arg(short, long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if cli.max_budget <= 0.0 {
        anyhow::bail!("--max-budget must be greater than 0");
    }
    if cli.max_turns < 1 {
        anyhow::bail!("--max-turns must be at least 1");
    }

    let mut config = DriverConfig::with_bounds(cli.model.clone(), cli.max_turns, cli.max_budget)?;
    if let Some(project) = &cli.project {
        config = config.scoped_to(project.clone());
    }

    let http = Arc::new(HttpClient::new(
        turbo_agent_core::config::api_url(),
        turbo_agent_core::config::api_key(),
    ));
    let runtime = Box::new(NullAgentRuntime::new(
        "No AgentRuntime adapter configured; wire one in via AgentDriver::new.",
    ));
    let driver = AgentDriver::new(config, runtime, http);

    if cli.interactive {
        run_interactive(&driver).await?;
    } else if let Some(prompt) = cli.prompt.clone() {
        run_oneshot(&driver, &prompt, cli.stream, cli.verbose, cli.output.as_deref()).await?;
    } else {
        anyhow::bail!("no prompt given; pass a task or --interactive");
    }

    Ok(())
}

async fn run_oneshot(
    driver: &AgentDriver,
    prompt: &str,
    stream: bool,
    verbose: bool,
    output_path: Option<&str>,
) -> anyhow::Result<()> {
    let mut result_text = String::new();

    if stream {
        let mut events = driver.stream(prompt).await?;
        while let Some(event) = events.next().await {
            match event? {
                RuntimeEvent::Text(text) => {
                    println!("{text}");
                    result_text = text;
                }
                RuntimeEvent::ToolCall { name, .. } if verbose => {
                    eprintln!("  [tool] {name}");
                }
                RuntimeEvent::ToolCall { .. } => {}
                RuntimeEvent::Result(outcome) => {
                    eprintln!(
                        "\n--- Done (cost: ${:.4}, turns: {}) ---",
                        outcome.total_cost_usd, outcome.num_turns
                    );
                }
            }
        }
    } else {
        let outcome = driver.run(prompt).await?;
        result_text = outcome.text;
        println!("{result_text}");
    }

    if let Some(path) = output_path {
        if !result_text.is_empty() {
            std::fs::write(path, &result_text)?;
            eprintln!("\nOutput saved to {path}");
        }
    }

    Ok(())
}

async fn run_interactive(driver: &AgentDriver) -> anyhow::Result<()> {
    println!("Turbo Agent (interactive mode)");
    println!("Type 'quit' or 'exit' to end the session.\n");

    let mut session = driver.session().await?;
    let stdin = io::stdin();

    loop {
        print!("you> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\nExiting.");
            break;
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") || line == "q" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let response = session.send(line).await?;
        println!("\nagent> {response}\n");
    }

    session.close().await?;
    Ok(())
}
