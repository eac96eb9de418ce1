mod api;
mod server;
mod twitter;

use clap::{Args, Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use replyguy::config::AppConfig;
use replyguy::llm::LlmClient;
use replyguy::providers::ToolhouseClient;
use replyguy::{
    format_number, FilterCriteria, ProviderChain, ReplyGenerator, ReplyRequest, SearchMethod,
};

#[derive(Parser)]
#[command(name = "replyguy", about = "Viral tweet radar and reply drafting")]
struct Cli {
    /// TOML config file (defaults to $REPLYGUY_CONFIG_PATH or config/replyguy.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and serve the web client
    Serve(ServeArgs),
    /// Fetch, filter and rank trending posts
    Trends(TrendsArgs),
    /// Draft three replies for a post
    Replies(RepliesArgs),
}

#[derive(Args, Debug, Clone, Default)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    web_root: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct TrendsArgs {
    /// `structured` or `function`
    #[arg(long, default_value = "structured")]
    method: String,
    #[arg(long, default_value_t = 0)]
    min_engagement: u64,
    #[arg(long = "topic")]
    topics: Vec<String>,
    #[arg(long)]
    exclude_replies: bool,
    #[arg(long)]
    only_verified: bool,
    #[arg(long, default_value_t = 0)]
    min_viral: u32,
    /// Skip the search providers and rank the static dataset
    #[arg(long)]
    mock: bool,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct RepliesArgs {
    #[arg(long)]
    text: Option<String>,
    #[arg(long)]
    author: String,
    #[arg(long)]
    context: Option<String>,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let (mut config, config_path) = AppConfig::load(cli.config)?;
    if let Some(path) = config_path.filter(|path| path.exists()) {
        tracing::debug!(path = %path.display(), "config loaded");
    }

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => {
            if let Some(host) = args.host {
                config.server.host = host;
            }
            if let Some(port) = args.port {
                config.server.port = port;
            }
            if let Some(web_root) = args.web_root {
                config.server.web_root = web_root;
            }
            server::serve(config).await
        }
        Command::Trends(args) => run_trends(&config, args).await,
        Command::Replies(args) => run_replies(&config, args).await,
    }
}

async fn run_trends(config: &AppConfig, args: TrendsArgs) -> Result<(), String> {
    let criteria = FilterCriteria {
        min_engagement: args.min_engagement,
        topics: args.topics,
        exclude_replies: args.exclude_replies,
        only_verified: args.only_verified,
        min_viral_potential: args.min_viral.min(100),
    };
    let method = SearchMethod::from_param(Some(args.method.as_str()));
    let chain = if args.mock {
        ProviderChain::mock_only()
    } else {
        ProviderChain::for_method(
            method,
            LlmClient::from_env(&config.llm),
            ToolhouseClient::from_env(&config.toolhouse),
            &config.llm.search_model,
        )
    };

    let batch = chain.resolve(&criteria).await;
    let ranked = batch.ranked(&criteria);

    if args.json {
        let payload = serde_json::to_string_pretty(&ranked)
            .map_err(|err| format!("failed to serialize tweets: {}", err))?;
        println!("{}", payload);
        return Ok(());
    }

    println!(
        "{} tweets from {} (ranked by {})",
        ranked.len(),
        batch.source.label(),
        batch.source.ranking().label()
    );
    for (source, error) in &batch.failures {
        println!("  skipped {}: {}", source.label(), error);
    }
    for (rank, post) in ranked.iter().enumerate() {
        let check = if post.is_verified { " ✓" } else { "" };
        println!(
            "\n{:>2}. [{}] {} (@{}){} · {}",
            rank + 1,
            post.viral_potential,
            post.author.name,
            post.author.handle,
            check,
            post.posted_at
        );
        println!("    {}", post.content);
        println!(
            "    likes {} | replies {} | retweets {} | views {}",
            format_number(post.metrics.likes),
            format_number(post.metrics.replies),
            format_number(post.metrics.retweets),
            format_number(post.metrics.views)
        );
    }
    Ok(())
}

async fn run_replies(config: &AppConfig, args: RepliesArgs) -> Result<(), String> {
    let llm = LlmClient::from_env(&config.llm)
        .ok_or_else(|| "AIML_API_KEY is not set".to_string())?;
    let generator = ReplyGenerator::from_config(Some(llm), &config.llm);

    let mut request = ReplyRequest::new(read_text(args.text)?, args.author);
    request.tweet_context = args.context;

    let replies = generator.generate(&request).await?;
    if replies.is_empty() {
        println!("No usable drafts in the model answer.");
    }
    for reply in replies {
        println!("[{}]\n{}\n", reply.kind.label(), reply.content);
    }
    Ok(())
}

fn read_text(arg: Option<String>) -> Result<String, String> {
    if let Some(text) = arg {
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("failed reading stdin: {}", err))?;
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Err("missing tweet text: pass --text or pipe stdin".to_string());
    }
    Ok(trimmed.to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(io::stderr))
        .try_init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
