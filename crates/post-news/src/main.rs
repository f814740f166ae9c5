use anyhow::{Context, Result};
use clap::Parser;
use shared::{
    cookies, io, ChatSummarizer, Config, ConfigFileSink, Console, ContentExtractor,
    LinkedInClient, NewsClient, Outcome, RunOptions, Settings, Workflow,
};
use std::io::{self as stdio, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "post-news")]
#[command(about = "Summarize today's news on a topic and post it to LinkedIn")]
struct Args {
    /// Path to config.json (defaults to ./config.json, then ~/.config/news-poster/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Topic to search for instead of prompting
    #[arg(short, long)]
    topic: Option<String>,

    /// Post without asking for confirmation
    #[arg(short = 'y', long)]
    yes: bool,

    /// Only refresh the LinkedIn session cookies and exit
    #[arg(long)]
    check_session: bool,

    /// Copy the LinkedIn session cookies from a local browser into the config file and exit
    #[arg(long)]
    import_browser_cookies: bool,
}

struct Terminal;

impl Console for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{}", prompt);
        stdio::stdout().flush()?;

        let mut input = String::new();
        stdio::stdin()
            .read_line(&mut input)
            .context("Failed to read from stdin")?;
        Ok(input.trim_end_matches(['\r', '\n']).to_string())
    }

    fn print(&mut self, text: &str) {
        println!("{}", text);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(stdio::stderr)
        .init();

    let args = Args::parse();

    if args.import_browser_cookies {
        let path = io::resolve_config_path(args.config.as_deref())?;
        let session = cookies::import_browser_cookies()?;
        io::save_cookies(&path, &session)?;
        println!("✓ Saved LinkedIn cookies to {}", path.display());
        return Ok(());
    }

    let config = Config::load(args.config.as_deref())?;
    let mut linkedin = LinkedInClient::new(
        config.session_cookies(),
        Box::new(ConfigFileSink::new(config.path.clone())),
    )?;

    if args.check_session {
        let refreshed = linkedin
            .check_session()
            .await
            .context("LinkedIn session check failed")?;
        if refreshed {
            println!("✓ Session cookies refreshed");
        } else {
            println!("✓ Session is valid, cookies unchanged");
        }
        return Ok(());
    }

    let news = NewsClient::new(config.news_api_key()?.to_string())?;
    let summarizer = ChatSummarizer::new(
        config.open_ai_api_key()?.to_string(),
        config.gpt_model.clone(),
    )?;
    let extractor = ContentExtractor::new()?;

    let mut workflow = Workflow::new(Settings::from(&config), news, extractor, summarizer, linkedin);
    let options = RunOptions {
        topic: args.topic,
        assume_yes: args.yes,
    };

    let outcome = workflow.run(&mut Terminal, options).await?;
    if outcome == Outcome::NoSummary {
        anyhow::bail!("Error: gpt response empty");
    }

    println!("\nDone.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::parse_from(["post-news", "-c", "cfg.json", "--topic", "rust", "-y"]);
        assert_eq!(args.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(args.topic.as_deref(), Some("rust"));
        assert!(args.yes);
        assert!(!args.check_session);
    }

    #[test]
    fn defaults_to_interactive_run() {
        let args = Args::parse_from(["post-news"]);
        assert!(args.topic.is_none());
        assert!(!args.yes);
        assert!(!args.import_browser_cookies);
    }
}
