//! CLI command definitions for adforge.
//!
//! `process` runs one invocation of the pipeline; the remaining commands
//! inspect and maintain the queues and the document store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::config::Settings;
use crate::generation::HttpGenerationClient;
use crate::notify::{DiscordNotifier, Notifier, SesNotifier};
use crate::scheduler::{BatchAck, EventFileSource, JobProcessor, PipelineVariant, RedisJobQueue};
use crate::store::SqliteDocumentStore;
use crate::workflow::RedisWorkflowTrigger;

/// Default Redis URL for the maintenance commands.
const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Timeout for a single chat webhook post.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Queue-driven ad research pipeline.
#[derive(Parser)]
#[command(name = "adforge")]
#[command(about = "Process queued businesses through ad research generation")]
#[command(version)]
#[command(
    long_about = "adforge takes business records off a queue, asks the generation service for keywords and ad copy, stores the result, notifies the stakeholder and starts the follow-up workflow.\n\nFailed records are moved to the dead-letter queue unchanged.\n\nExample usage:\n  adforge process --batch-size 10 --variant research"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Process one batch of queued businesses.
    Process(ProcessArgs),

    /// Show bodies waiting in the dead-letter queue.
    #[command(name = "dead-letters", alias = "dlq")]
    DeadLetters(DeadLettersArgs),

    /// Move dead-lettered bodies back onto the inbound queue.
    Redrive(RedriveArgs),

    /// Create the document store tables.
    #[command(name = "init-store")]
    InitStore(StoreArgs),

    /// Map a business to the chat webhook used for its notifications.
    #[command(name = "map-webhook")]
    MapWebhook(MapWebhookArgs),
}

/// Arguments for `adforge process`.
#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Read the batch from a queue event file instead of Redis.
    #[arg(short = 'f', long)]
    pub from_file: Option<PathBuf>,

    /// Maximum number of messages per batch (overrides BATCH_SIZE).
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,

    /// Pipeline variant (overrides PIPELINE_VARIANT).
    #[arg(long, value_enum)]
    pub variant: Option<PipelineVariant>,
}

/// Redis location of the queues.
#[derive(Parser, Debug)]
pub struct QueueArgs {
    /// Redis connection URL.
    #[arg(long, env = "REDIS_URL", default_value = DEFAULT_REDIS_URL)]
    pub redis_url: String,

    /// Inbound queue name.
    #[arg(long, env = "QUEUE_NAME", default_value = "companies")]
    pub queue_name: String,

    /// Dead-letter queue name.
    #[arg(long, env = "DLQ_NAME")]
    pub dlq_name: String,
}

/// Arguments for `adforge dead-letters`.
#[derive(Parser, Debug)]
pub struct DeadLettersArgs {
    #[command(flatten)]
    pub queue: QueueArgs,

    /// Maximum number of bodies to show.
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

/// Arguments for `adforge redrive`.
#[derive(Parser, Debug)]
pub struct RedriveArgs {
    #[command(flatten)]
    pub queue: QueueArgs,

    /// Maximum number of bodies to move.
    #[arg(short = 'n', long, default_value = "100")]
    pub limit: usize,
}

/// Location of the document store.
#[derive(Parser, Debug)]
pub struct StoreArgs {
    /// Document store connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
}

/// Arguments for `adforge map-webhook`.
#[derive(Parser, Debug)]
pub struct MapWebhookArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Business name, as it appears in queue messages.
    pub business_name: String,

    /// Webhook URL receiving the business's notifications.
    pub webhook_url: String,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Process(args) => {
            let ack = run_process_command(args).await?;
            println!("{}", serde_json::to_string(&ack)?);
        }
        Commands::DeadLetters(args) => run_dead_letters_command(args).await?,
        Commands::Redrive(args) => run_redrive_command(args).await?,
        Commands::InitStore(args) => run_init_store_command(args).await?,
        Commands::MapWebhook(args) => run_map_webhook_command(args).await?,
    }
    Ok(())
}

async fn run_process_command(args: ProcessArgs) -> anyhow::Result<BatchAck> {
    // Configuration is validated before anything touches a queue.
    let mut settings = Settings::from_env()?;
    if let Some(variant) = args.variant {
        settings = settings.with_variant(variant);
    }
    if let Some(batch_size) = args.batch_size {
        settings = settings.with_batch_size(batch_size);
    }

    info!(
        variant = %settings.variant,
        batch_size = settings.batch_size,
        queue = %settings.queue_name,
        "Starting pipeline invocation"
    );

    let store = Arc::new(SqliteDocumentStore::new(&settings.database_url)?);
    store.init_schema().await?;

    let generation = Arc::new(HttpGenerationClient::new(
        settings.ai_service_url.as_str(),
        settings.ai_request_timeout,
    )?);
    let queue = Arc::new(
        RedisJobQueue::connect(
            &settings.redis_url,
            &settings.queue_name,
            &settings.dead_letter_queue,
        )
        .await?,
    );
    let workflow =
        Arc::new(RedisWorkflowTrigger::connect(&settings.redis_url, &settings.workflow_id).await?);

    let notifier: Arc<dyn Notifier> = match settings.variant {
        PipelineVariant::Research => {
            Arc::new(SesNotifier::from_env(settings.source_email.as_str()).await)
        }
        PipelineVariant::Refresh => Arc::new(DiscordNotifier::new(WEBHOOK_TIMEOUT)?),
    };

    let mut processor = JobProcessor::new(generation, store.clone(), notifier, workflow, queue.clone())
        .with_variant(settings.variant);
    if settings.variant == PipelineVariant::Refresh {
        processor = processor.with_webhooks(store);
    }

    match args.from_file {
        Some(path) => {
            let source = EventFileSource::open(&path).await?;
            info!(path = %path.display(), messages = source.remaining(), "Loaded event file");
            while source.remaining() > 0 {
                processor.run(&source, settings.batch_size).await?;
            }
            Ok(BatchAck::success())
        }
        None => Ok(processor.run(queue.as_ref(), settings.batch_size).await?),
    }
}

async fn run_dead_letters_command(args: DeadLettersArgs) -> anyhow::Result<()> {
    let queue = connect_queue(&args.queue).await?;
    let backlog = queue.len().await?;
    let total = queue.dead_letter_len().await?;
    let bodies = queue.peek_dead_letter(args.limit).await?;

    println!("{} message(s) waiting in '{}'", backlog, queue.queue_name());
    println!(
        "{} message(s) in '{}', showing {} oldest:",
        total,
        args.queue.dlq_name,
        bodies.len()
    );
    for body in bodies {
        println!("{}", body);
    }
    Ok(())
}

async fn run_redrive_command(args: RedriveArgs) -> anyhow::Result<()> {
    let queue = connect_queue(&args.queue).await?;
    let moved = queue.redrive(args.limit).await?;

    info!(moved = moved, queue = %queue.queue_name(), "Redrove dead-lettered messages");
    println!("Moved {} message(s) back to '{}'", moved, queue.queue_name());
    Ok(())
}

async fn run_init_store_command(args: StoreArgs) -> anyhow::Result<()> {
    SqliteDocumentStore::new(&args.database_url)?
        .init_schema()
        .await?;
    println!("Document store ready");
    Ok(())
}

async fn run_map_webhook_command(args: MapWebhookArgs) -> anyhow::Result<()> {
    let store = SqliteDocumentStore::new(&args.store.database_url)?;
    store.init_schema().await?;
    store
        .map_webhook(&args.business_name, &args.webhook_url)
        .await?;
    println!("Mapped '{}' to its webhook", args.business_name);
    Ok(())
}

async fn connect_queue(args: &QueueArgs) -> anyhow::Result<RedisJobQueue> {
    Ok(RedisJobQueue::connect(&args.redis_url, &args.queue_name, &args.dlq_name).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        // Verify CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_process_command_defaults() {
        let cli = Cli::try_parse_from(["adforge", "process"]).expect("should parse");

        match cli.command {
            Commands::Process(args) => {
                assert!(args.from_file.is_none());
                assert!(args.batch_size.is_none());
                assert!(args.variant.is_none());
            }
            _ => panic!("Expected Process command"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_process_command_with_all_options() {
        let cli = Cli::try_parse_from([
            "adforge",
            "process",
            "--from-file",
            "event.json",
            "-b",
            "3",
            "--variant",
            "refresh",
            "--log-level",
            "debug",
        ])
        .expect("should parse");

        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.from_file, Some(PathBuf::from("event.json")));
                assert_eq!(args.batch_size, Some(3));
                assert_eq!(args.variant, Some(PipelineVariant::Refresh));
            }
            _ => panic!("Expected Process command"),
        }
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_process_rejects_unknown_variant() {
        assert!(Cli::try_parse_from(["adforge", "process", "--variant", "weekly"]).is_err());
    }

    #[test]
    fn test_map_webhook_arguments() {
        let cli = Cli::try_parse_from([
            "adforge",
            "map-webhook",
            "--database-url",
            "sqlite://adforge.db",
            "Acme Bikes",
            "https://discord.test/api/webhooks/1",
        ])
        .expect("should parse");

        match cli.command {
            Commands::MapWebhook(args) => {
                assert_eq!(args.store.database_url, "sqlite://adforge.db");
                assert_eq!(args.business_name, "Acme Bikes");
                assert_eq!(args.webhook_url, "https://discord.test/api/webhooks/1");
            }
            _ => panic!("Expected MapWebhook command"),
        }
    }

    #[test]
    fn test_dead_letters_arguments() {
        let cli = Cli::try_parse_from([
            "adforge",
            "dlq",
            "--dlq-name",
            "companies-dlq",
            "-n",
            "5",
        ])
        .expect("should parse");

        match cli.command {
            Commands::DeadLetters(args) => {
                assert_eq!(args.queue.dlq_name, "companies-dlq");
                assert_eq!(args.limit, 5);
            }
            _ => panic!("Expected DeadLetters command"),
        }
    }
}
