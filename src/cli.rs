use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "lessonpdf")]
#[command(about = "Lesson PDF to page-image conversion pipeline", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to LESSONPDF_CONFIG or config/lessonpdf.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the operator HTTP server
    Serve(ServeArgs),
    /// Convert one lesson's PDF now
    Process(LessonArgs),
    /// Convert lessons waiting for a first conversion
    ProcessPending(PendingArgs),
    /// Re-run every failed asset
    RetryFailed,
    /// Delete pages left behind by failed assets
    Cleanup,
    /// Drop a lesson's pages and mark its asset pending
    Regenerate(LessonArgs),
    /// List the pages of a lesson's asset
    Pages(LessonArgs),
    /// Register a lesson record in the local store
    AddLesson(AddLessonArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Overrides server.bind_addr
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct LessonArgs {
    pub lesson_id: Uuid,
}

#[derive(clap::Args, Debug)]
pub struct PendingArgs {
    /// Overrides pipeline.pending_limit
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct AddLessonArgs {
    /// Lesson id; a new one is generated when omitted
    #[arg(long)]
    pub id: Option<Uuid>,

    #[arg(long, default_value = "")]
    pub title: String,

    #[arg(long)]
    pub media_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_pending() {
        let cli = Cli::try_parse_from(["lessonpdf", "process-pending", "--limit", "3"]).unwrap();
        match cli.command {
            Commands::ProcessPending(args) => assert_eq!(args.limit, Some(3)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_add_lesson_with_global_config() {
        let id = Uuid::now_v7();
        let cli = Cli::try_parse_from([
            "lessonpdf",
            "add-lesson",
            "--id",
            &id.to_string(),
            "--media-url",
            "https://cdn.example.com/l.pdf",
            "--config",
            "custom.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Commands::AddLesson(args) => {
                assert_eq!(args.id, Some(id));
                assert_eq!(args.media_url.as_deref(), Some("https://cdn.example.com/l.pdf"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_lesson_id() {
        assert!(Cli::try_parse_from(["lessonpdf", "process", "not-a-uuid"]).is_err());
    }
}
