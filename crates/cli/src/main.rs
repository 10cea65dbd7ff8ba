use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use storyhub_core::logging::{self, LoggingConfig};
use storyhub_core::{Config, Story};
use storyhub_store::{SearchResults, StoryService};
use uuid::Uuid;

/// Storyhub - short stories with full-text search and ranked listings
#[derive(Parser, Debug)]
#[command(name = "storyhub")]
#[command(about = "Store, search and rank short stories", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to storyhub.toml (default: ./storyhub.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write an example config file
    InitConfig,
    /// Create a story
    Add {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        body: String,
    },
    /// Show one story
    Get { id: String },
    /// Replace a story's title and body
    Update {
        id: String,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        body: String,
    },
    /// Delete a story
    Delete { id: String },
    /// Search titles and bodies; any word may match
    Search {
        #[arg(required = true, value_name = "WORDS")]
        query: Vec<String>,
    },
    /// List stories by view count
    MostViewed {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// List stories by upvotes
    TopRated {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Record a view
    View { id: String },
    /// Record an upvote
    Upvote { id: String },
    /// Record a downvote
    Downvote { id: String },
    /// Show store and search cache counts
    Stats,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from("storyhub.toml"));

    if matches!(cli.command, Commands::InitConfig) {
        return cmd_init_config(&config_path);
    }

    let config = load_or_create_config(&config_path)?;

    let mut log_config = LoggingConfig::from(config.logging.clone());
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _guard = logging::init_logging(Some(log_config)).context("Failed to initialize logging")?;

    if cli.verbose {
        eprintln!("{} Using config: {}", "Info:".blue().bold(), config_path.display());
        eprintln!("{} Database: {}", "Info:".blue().bold(), config.database.path.display());
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let service = StoryService::open(&config).await.context("Failed to open story store")?;
        dispatch(&service, cli.command, cli.json).await
    })
}

async fn dispatch(service: &StoryService, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::InitConfig => anyhow::bail!("init-config does not open the story store"),
        Commands::Add { title, body } => {
            let id = cmd_add(service, &title, &body).await?;
            println!("{} Created story {}", "Success:".green().bold(), id.to_string().cyan());
        }
        Commands::Get { id } => {
            let story = service.get_story(&id).await?;
            print_stories(std::slice::from_ref(&story), json)?;
        }
        Commands::Update { id, title, body } => {
            let affected = service.update_story(&id, &title, &body).await?;
            report_affected("Updated", &id, affected);
        }
        Commands::Delete { id } => {
            let affected = service.delete_story(&id).await?;
            report_affected("Deleted", &id, affected);
        }
        Commands::Search { query } => {
            let results = cmd_search(service, &query).await?;
            print_search(&results, json)?;
        }
        Commands::MostViewed { offset, limit } => {
            let stories = service.get_most_viewed_stories(offset, limit).await?;
            print_stories(&stories, json)?;
        }
        Commands::TopRated { offset, limit } => {
            let stories = service.get_top_rated_stories(offset, limit).await?;
            print_stories(&stories, json)?;
        }
        Commands::View { id } => report_affected("Viewed", &id, service.view_story(&id).await?),
        Commands::Upvote { id } => report_affected("Upvoted", &id, service.upvote_story(&id).await?),
        Commands::Downvote { id } => report_affected("Downvoted", &id, service.downvote_story(&id).await?),
        Commands::Stats => cmd_stats(service).await?,
    }

    Ok(())
}

/// Load config from file or create from example
fn load_or_create_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    } else {
        eprintln!("{} Config not found at {}", "Warning:".yellow().bold(), path.display());
        cmd_init_config(path)?;
        anyhow::bail!("Review {} and run again", path.display())
    }
}

/// Write the example config, refusing to overwrite an existing file
fn cmd_init_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("Config already exists at {}", path.display());
    }

    std::fs::write(path, Config::example()).context("Failed to create config")?;
    println!("{} Created config at {}", "Success:".green().bold(), path.display());
    Ok(())
}

async fn cmd_add(service: &StoryService, title: &str, body: &str) -> Result<Uuid> {
    service.add_story(title, body).await.context("Failed to add story")
}

async fn cmd_search(service: &StoryService, words: &[String]) -> Result<SearchResults> {
    let query = words.join(" ");
    Ok(service.search_stories(&query).await?)
}

async fn cmd_stats(service: &StoryService) -> Result<()> {
    let stories = service.story_count().await?;
    let cache = service.cache_stats().await;

    println!("{}", "Storyhub Status".green().bold().underline());
    println!();
    println!("  Stored stories:  {}", stories.to_string().cyan());
    println!("  Indexed stories: {}", cache.stories.to_string().cyan());
    println!("  Indexed words:   {}", cache.words.to_string().cyan());
    Ok(())
}

fn report_affected(action: &str, id: &str, affected: u64) {
    if affected == 0 {
        println!("{} No story with id {}", "Info:".yellow().bold(), id);
    } else {
        println!("{} {} story {}", "Success:".green().bold(), action, id.cyan());
    }
}

fn print_stories(stories: &[Story], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stories)?);
        return Ok(());
    }

    if stories.is_empty() {
        println!("{} No stories", "Info:".yellow().bold());
    }
    for story in stories {
        println!("{} {}", story.id.to_string().cyan(), story.title.bold());
        println!(
            "  views {}  up {}  down {}  updated {}",
            story.view_count,
            story.upvotes,
            story.downvotes,
            story.updated_at.format("%Y-%m-%d %H:%M")
        );
        println!("  {}", story.body);
    }
    Ok(())
}

fn print_search(results: &SearchResults, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    print_stories(&results.stories, false)?;
    for error in &results.errors {
        eprintln!("{} {}", "Warning:".yellow().bold(), error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use storyhub_core::{ListingConfig, StoryLimits};
    use tempfile::TempDir;

    async fn service() -> StoryService {
        StoryService::open_in_memory(StoryLimits::default(), ListingConfig::default())
            .await
            .unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["storyhub", "stats"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.verbose);
        assert!(!cli.json);
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::try_parse_from(["storyhub", "--config", "/srv/storyhub.toml", "stats"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/srv/storyhub.toml")));
    }

    #[test]
    fn test_cli_add_command() {
        let cli = Cli::try_parse_from(["storyhub", "add", "--title", "Dusk", "--body", "Birds went home."]).unwrap();
        if let Commands::Add { title, body } = cli.command {
            assert_eq!(title, "Dusk");
            assert_eq!(body, "Birds went home.");
        } else {
            panic!("Expected Add command");
        }
    }

    #[test]
    fn test_cli_search_collects_words() {
        let cli = Cli::try_parse_from(["storyhub", "search", "things", "with"]).unwrap();
        if let Commands::Search { query } = cli.command {
            assert_eq!(query, vec!["things", "with"]);
        } else {
            panic!("Expected Search command");
        }

        assert!(Cli::try_parse_from(["storyhub", "search"]).is_err());
    }

    #[test]
    fn test_cli_listing_defaults() {
        let cli = Cli::try_parse_from(["storyhub", "most-viewed"]).unwrap();
        assert!(matches!(cli.command, Commands::MostViewed { offset: 0, limit: 10 }));

        let cli = Cli::try_parse_from(["storyhub", "top-rated", "--offset", "20", "--limit", "5"]).unwrap();
        assert!(matches!(cli.command, Commands::TopRated { offset: 20, limit: 5 }));
    }

    #[test]
    fn test_load_or_create_config_existing() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("storyhub.toml");
        std::fs::write(&config_path, Config::example()).unwrap();

        let config = load_or_create_config(&config_path).unwrap();
        assert_eq!(config.listing.max_page_size, 100);
    }

    #[test]
    fn test_load_or_create_config_not_existing() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("storyhub.toml");

        let result = load_or_create_config(&config_path);
        assert!(result.is_err());
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[database]"));
        assert!(content.contains("max_page_size"));
    }

    #[test]
    fn test_load_or_create_config_invalid() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("storyhub.toml");
        std::fs::write(&config_path, "invalid toml").unwrap();

        assert!(load_or_create_config(&config_path).is_err());
    }

    #[test]
    fn test_init_config_refuses_overwrite() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("storyhub.toml");

        assert!(cmd_init_config(&config_path).is_ok());
        assert!(cmd_init_config(&config_path).is_err());
    }

    #[tokio::test]
    async fn test_cmd_add_and_search() {
        let service = service().await;
        let id = cmd_add(&service, "Moth", "Drawn to the porch light").await.unwrap();

        let results = cmd_search(&service, &["porch".to_string(), "m0th".to_string()]).await.unwrap();
        assert_eq!(results.stories.len(), 1);
        assert_eq!(results.stories[0].id, id);
        assert_eq!(results.errors.len(), 1);

        assert!(print_search(&results, false).is_ok());
        assert!(print_search(&results, true).is_ok());
    }

    #[tokio::test]
    async fn test_cmd_add_rejects_empty_body() {
        let service = service().await;
        let err = cmd_add(&service, "Title", "   ").await.unwrap_err();
        assert!(format!("{err:#}").contains("body"));
    }

    #[tokio::test]
    async fn test_dispatch_commands() {
        let service = service().await;
        let id = cmd_add(&service, "Tide", "Out and back").await.unwrap().to_string();

        dispatch(&service, Commands::View { id: id.clone() }, false).await.unwrap();
        dispatch(&service, Commands::Upvote { id: id.clone() }, false).await.unwrap();
        dispatch(&service, Commands::Get { id: id.clone() }, true).await.unwrap();
        dispatch(&service, Commands::TopRated { offset: 0, limit: 10 }, false).await.unwrap();
        dispatch(&service, Commands::Stats, false).await.unwrap();
        dispatch(&service, Commands::Delete { id: id.clone() }, false).await.unwrap();

        assert!(dispatch(&service, Commands::Get { id }, false).await.is_err());
    }
}
