mod cli;

use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use cli::{Cli, Commands};
use lessonpdf::api;
use lessonpdf::config::Config;
use lessonpdf::conversion::HttpConversionClient;
use lessonpdf::models::Lesson;
use lessonpdf::processor::PdfProcessor;
use lessonpdf::repository::FjallRepository;
use lessonpdf::storage::StorageClient;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => Config::load_with_file(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Serve(args) => {
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            api::run(config).await?;
        }
        Commands::AddLesson(args) => {
            let store = FjallRepository::open(&config.server.data_path)?;
            let lesson = Lesson::new(
                args.id.unwrap_or_else(Uuid::now_v7),
                args.title,
                args.media_url,
            );
            store.put_lesson(&lesson)?;
            store.persist()?;
            info!(lesson_id = %lesson.id, "Lesson registered");
            print_json(&lesson)?;
        }
        command => run_pipeline_command(config, command).await?,
    }

    Ok(())
}

async fn run_pipeline_command(config: Config, command: Commands) -> Result<(), AnyError> {
    let store = Arc::new(FjallRepository::open(&config.server.data_path)?);
    let storage = StorageClient::from_config(&config.storage)?;
    let converter = HttpConversionClient::new(&config.conversion)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        api::shutdown_signal().await;
        signal_cancel.cancel();
    });

    let processor = Arc::new(PdfProcessor::new(
        store.clone(),
        Arc::new(storage),
        Arc::new(converter),
        config.pipeline.clone(),
        cancel,
    ));

    let outcome: Result<(), AnyError> = async {
        match command {
            Commands::Process(args) => print_json(&processor.process_lesson(args.lesson_id).await?),
            Commands::ProcessPending(args) => {
                let limit = args.limit.unwrap_or(config.pipeline.pending_limit);
                print_json(&processor.process_all_pending_lessons(limit).await?)
            }
            Commands::RetryFailed => print_json(&processor.retry_failed_assets().await?),
            Commands::Cleanup => print_json(&processor.cleanup_orphaned_pages().await?),
            Commands::Regenerate(args) => {
                processor.regenerate_pdf(args.lesson_id).await?;
                info!(lesson_id = %args.lesson_id, "Lesson PDF queued for regeneration");
                Ok(())
            }
            Commands::Pages(args) => print_json(&processor.get_lesson_pages(args.lesson_id).await?),
            Commands::Serve(_) | Commands::AddLesson(_) => Ok(()),
        }
    }
    .await;

    store.persist()?;
    outcome
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AnyError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
