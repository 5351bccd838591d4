//! Interactive Chief-of-Staff assistant
//!
//! Run with: cargo run -p chief-of-staff --bin chief -- --file deck.pdf

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chief_of_staff::config::{missing_credential_help, AppConfig, CredentialResolver};
use chief_of_staff::export;
use chief_of_staff::ingestion::file_summary;
use chief_of_staff::providers::AnthropicClient;
use chief_of_staff::{AnalysisMode, ChatSession, Error, UploadOutcome};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chief", version, about = "Your AI Chief of Staff & BizOps lead")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model identifier override
    #[arg(short, long)]
    model: Option<String>,

    /// Maximum output tokens per reply
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Starting analysis mode (quick, deep, scenario)
    #[arg(long)]
    mode: Option<AnalysisMode>,

    /// Files or directories to upload before the first question
    #[arg(short, long = "file")]
    files: Vec<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "chief_of_staff=warn")]
    log_level: String,
}

/// A line typed at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Message(String),
    Upload(Vec<PathBuf>),
    Files,
    Mode(Option<String>),
    Clear,
    Export(Option<PathBuf>),
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Message(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let arg = (!arg.is_empty()).then(|| arg.to_string());

        match name {
            "upload" | "u" => Command::Upload(arg.as_deref().map(upload_paths).unwrap_or_default()),
            "files" | "docs" => Command::Files,
            "mode" => Command::Mode(arg),
            "clear" => Command::Clear,
            "export" => Command::Export(arg.map(PathBuf::from)),
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Paths named by an `/upload` argument.
///
/// Input that does not open with a quote is one path, spaces included.
/// Quoting (`"a b.pdf" 'c.xlsx'`) names several paths at once.
fn upload_paths(arg: &str) -> Vec<PathBuf> {
    if !arg.starts_with(['"', '\'']) {
        return vec![PathBuf::from(arg)];
    }

    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in arg.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                paths.push(PathBuf::from(std::mem::take(&mut current)));
                quote = None;
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
                quote = Some(c);
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                }
            }
            (None, c) => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(PathBuf::from(current));
    }

    paths.retain(|p| !p.as_os_str().is_empty());
    paths
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing on stderr so streamed replies own stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.llm.max_tokens = max_tokens;
    }
    config.validate()?;

    let api_key = match CredentialResolver::default_locations().resolve() {
        Ok(key) => key,
        Err(Error::MissingCredential(_)) => {
            eprintln!("{}", style("⚠️  Missing API credential").red().bold());
            eprintln!("{}", missing_credential_help());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!("API key loaded from {}", api_key.source());

    let client = AnthropicClient::new(&config.llm, api_key)?;
    let mode = cli.mode.unwrap_or(config.session.default_mode);
    let mut session = ChatSession::new(Arc::new(client), mode);

    println!(
        "{}  {}",
        style("🎯 AI Chief of Staff").bold(),
        style(format!("model {} · mode {}", session.model_name(), session.mode())).dim()
    );
    println!("{}", style("Direct strategic analysis, no BS. Type /help for commands.").dim());

    for path in &cli.files {
        upload(&mut session, path);
    }

    if session.turns().is_empty() {
        print_welcome();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("›").cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Command::Empty => {}
            Command::Message(text) => ask(&mut session, &text).await?,
            Command::Upload(paths) if paths.is_empty() => {
                println!("Usage: /upload <file-or-directory>  (quote each path to upload several)");
            }
            Command::Upload(paths) => {
                for path in &paths {
                    upload(&mut session, path);
                }
            }
            Command::Files => list_files(&session),
            Command::Mode(None) => {
                for m in AnalysisMode::ALL {
                    let marker = if m == session.mode() { "●" } else { "○" };
                    println!("  {} {}", marker, m);
                }
            }
            Command::Mode(Some(name)) => match name.parse::<AnalysisMode>() {
                Ok(m) => {
                    session.set_mode(m);
                    println!("Analysis mode: {}", style(m).bold());
                }
                Err(e) => println!("{}", style(e).red()),
            },
            Command::Clear => {
                session.clear();
                println!("{}", style("🗑️  Conversation and documents cleared").yellow());
                print_welcome();
            }
            Command::Export(target) => {
                match export::write_markdown(
                    session.turns(),
                    target.as_deref(),
                    &config.session.export_dir,
                ) {
                    Ok(path) => println!("📥 Exported analysis to {}", path.display()),
                    Err(e) => println!("{}", style(e).red()),
                }
            }
            Command::Help => print_help(),
            Command::Quit => break,
            Command::Unknown(name) => {
                println!("Unknown command /{} (try /help)", name);
            }
        }
    }

    Ok(())
}

fn upload(session: &mut ChatSession, path: &std::path::Path) {
    let spinner = spinner(format!("Processing {}...", path.display()));
    let result = session.upload_path(path);
    spinner.finish_and_clear();

    match result {
        Ok(outcomes) if outcomes.is_empty() => {
            println!("No supported files found in {}", path.display());
        }
        Ok(outcomes) => {
            for outcome in outcomes {
                match outcome {
                    UploadOutcome::Added { name, summary } => {
                        println!("{} {} processed  {}", style("✓").green(), name, style(summary).dim());
                    }
                    UploadOutcome::Skipped { name } => {
                        println!("{} {} already uploaded", style("•").dim(), name);
                    }
                }
            }
        }
        Err(e) => println!("{} {}: {}", style("✗").red(), path.display(), e),
    }
}

async fn ask(session: &mut ChatSession, text: &str) -> anyhow::Result<()> {
    let spinner = spinner("Thinking...".to_string());
    let mut started = false;
    let mut stdout = std::io::stdout();

    println!();
    let reply = session
        .submit(text, |fragment| {
            if !started {
                spinner.finish_and_clear();
                started = true;
            }
            print!("{}", fragment);
            let _ = stdout.flush();
        })
        .await;
    spinner.finish_and_clear();

    if let Some(error) = &reply.error {
        if started {
            println!();
        }
        println!("{}", style(format!("Error: {}", error)).red());
        if !started {
            println!("{}", reply.text);
        }
    }
    println!("\n");
    Ok(())
}

fn list_files(session: &ChatSession) {
    if session.documents().is_empty() {
        println!("No documents uploaded yet. Use /upload <path>.");
        return;
    }
    for doc in session.documents() {
        println!("  {}", file_summary(doc));
    }
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_welcome() {
    println!(
        r#"
What I can help you with:

Strategic Decisions:
  - "Should we enter the enterprise market or focus on SMB?"
  - "Evaluate this partnership opportunity with [Company X]"
  - "Help me think through our pricing strategy"

Deal Analysis:
  - "Here's a pitch deck - should we invest/acquire?"
  - "Analyze this competitor and our positioning"
  - "Review our financial model and projections"

Board/Investor Prep:
  - "Help me frame our pivot for the board"
  - "Create talking points for our Series B pitch"
  - "Stress-test our growth assumptions"

Just upload files and ask me anything.
"#
    );
}

fn print_help() {
    println!(
        r#"Commands:
  /upload <path>      Upload a file or directory (pdf, pptx, xlsx, xls, csv, txt, md)
  /upload "a" "b"     Upload several quoted paths
  /files              List uploaded documents
  /mode [name]        Show or set analysis mode: quick, deep, scenario
  /export [path]      Save the conversation as Markdown
  /clear              Clear conversation and documents
  /quit               Exit
Anything else is sent as a message."#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("   "), Command::Empty);
        assert_eq!(
            Command::parse("Should we raise now?"),
            Command::Message("Should we raise now?".to_string())
        );
        assert_eq!(
            Command::parse("/upload Q3 Board Deck.pdf"),
            Command::Upload(vec![PathBuf::from("Q3 Board Deck.pdf")])
        );
        assert_eq!(
            Command::parse(r#"/upload "Q3 Board Deck.pdf" 'model v2.xlsx' notes.md"#),
            Command::Upload(vec![
                PathBuf::from("Q3 Board Deck.pdf"),
                PathBuf::from("model v2.xlsx"),
                PathBuf::from("notes.md"),
            ])
        );
        assert_eq!(
            Command::parse("/upload CEO's memo.txt"),
            Command::Upload(vec![PathBuf::from("CEO's memo.txt")])
        );
        assert_eq!(Command::parse("/upload"), Command::Upload(vec![]));
        assert_eq!(Command::parse("/mode deep"), Command::Mode(Some("deep".to_string())));
        assert_eq!(Command::parse("/mode"), Command::Mode(None));
        assert_eq!(Command::parse("/export"), Command::Export(None));
        assert_eq!(Command::parse("/q"), Command::Quit);
        assert_eq!(Command::parse("/nope"), Command::Unknown("nope".to_string()));
    }

    #[test]
    fn test_cli_parses_mode() {
        let cli = Cli::parse_from(["chief", "--mode", "scenario", "-f", "a.pdf", "-f", "b.md"]);
        assert_eq!(cli.mode, Some(AnalysisMode::ScenarioAnalysis));
        assert_eq!(cli.files.len(), 2);
    }
}
