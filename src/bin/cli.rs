//! Semantic Memory CLI
//!
//! Operator commands for migrations, health checks and direct access to
//! stored memories.

use clap::{Parser, Subcommand};
use console::style;
use futures::StreamExt;
use semantic_memory::config::{config_path, save_config, validate_config, Config};
use semantic_memory::core::{GenerationOptions, Message};
use semantic_memory::database::{has_pgvector, init_pool_for_migrations, migrations};
use semantic_memory::{Error, Metadata, Result, Services, VERSION};
use std::io::Write;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "semantic-memory",
    version = VERSION,
    about = "Semantic Memory - embedding-backed text memory",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,

    /// Check configuration, vector store and providers
    Status,

    /// Write a sample configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// List collections
    Collections,

    /// Embed and store a text
    Save {
        /// Collection name
        collection: String,
        /// Text to remember
        text: String,
        /// Record ID; a random UUID when omitted
        #[arg(long)]
        id: Option<String>,
        /// Metadata entries as key=value
        #[arg(short, long = "meta", value_parser = parse_key_val)]
        metadata: Vec<(String, String)>,
    },

    /// Search a collection by meaning
    Search {
        /// Collection name
        collection: String,
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,
        /// Minimum relevance score
        #[arg(short, long, default_value_t = 0.7)]
        min_score: f64,
    },

    /// Show a stored record
    Get {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
    },

    /// Delete a stored record
    Delete {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
    },

    /// Ask the chat model, optionally grounded on a collection
    Ask {
        /// Question
        question: String,
        /// Collection to pull context from
        #[arg(short, long)]
        collection: Option<String>,
        /// Model or deployment override
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("semantic_memory=info".parse().map_err(|e| Error::Internal(format!("{}", e)))?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => run_migrations().await,
        Commands::Status => check_status().await,
        Commands::InitConfig { force } => init_config(force),
        Commands::Collections => list_collections().await,
        Commands::Save {
            collection,
            text,
            id,
            metadata,
        } => {
            let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
            save(&collection, &id, &text, metadata.into_iter().collect()).await
        }
        Commands::Search {
            collection,
            query,
            top_k,
            min_score,
        } => search(&collection, &query, top_k, min_score).await,
        Commands::Get { collection, id } => get(&collection, &id).await,
        Commands::Delete { collection, id } => delete(&collection, &id).await,
        Commands::Ask {
            question,
            collection,
            model,
        } => ask(&question, collection.as_deref(), model).await,
    }
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

/// Run database migrations
async fn run_migrations() -> Result<()> {
    println!("Running database migrations...\n");

    let config = Config::from_env()?;
    let postgres = config
        .storage
        .postgres
        .as_ref()
        .ok_or_else(|| Error::Config("PostgreSQL not configured for migrations".into()))?;
    // Skip the pgvector check; the migration creates the extension
    let pool = init_pool_for_migrations(postgres).await?;

    migrations::run(&pool, postgres.enable_pgvector).await?;
    pool.close().await;

    println!("\n{} Migrations complete!", style("✓").green());
    Ok(())
}

/// Check status of all services
async fn check_status() -> Result<()> {
    println!("{}\n", style("Semantic Memory Status").bold());

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            println!("{} Configuration: {}", style("✗").red(), e);
            return Ok(());
        }
    };

    let validation = validate_config(&config);
    if validation.valid {
        println!("{} Configuration: loaded", style("✓").green());
    } else {
        println!("{} Configuration: invalid", style("✗").red());
    }
    for issue in &validation.errors {
        println!("    {} {}", style("error").red(), issue);
    }
    for issue in &validation.warnings {
        println!("    {} {}", style("warning").yellow(), issue);
    }

    println!("  Chat model: {}", config.provider.chat_model);
    println!(
        "  Embedding: {} ({} dims)",
        config.embedding.model, config.embedding.dimensions
    );
    println!("  Distance: {}", config.storage.vector.distance);

    let services = match Services::init(&config).await {
        Ok(s) => s,
        Err(e) => {
            println!("{} Services: {}", style("✗").red(), e);
            return Ok(());
        }
    };

    match services.store.health_check().await {
        Ok(true) => println!("{} Vector store ({}): healthy", style("✓").green(), services.store.id()),
        Ok(false) => println!("{} Vector store ({}): unhealthy", style("✗").red(), services.store.id()),
        Err(e) => println!("{} Vector store ({}): {}", style("✗").red(), services.store.id(), e),
    }

    if let Some(pool) = services.pool() {
        match has_pgvector(pool).await {
            Ok(true) => println!("{} pgvector: installed", style("✓").green()),
            Ok(false) => println!("{} pgvector: not installed (REAL[] fallback)", style("!").yellow()),
            Err(e) => println!("{} pgvector: {}", style("✗").red(), e),
        }
    }

    match services.embedder.embed("health check").await {
        Ok(v) => println!("{} Embeddings: {} dims", style("✓").green(), v.len()),
        Err(e) => println!("{} Embeddings: {}", style("✗").red(), e),
    }

    services.shutdown().await;
    Ok(())
}

/// Write a sample configuration
fn init_config(force: bool) -> Result<()> {
    let path = config_path();
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    save_config(&Config::default(), &path)?;

    println!("{} Wrote {}", style("✓").green(), path.display());
    println!("  API keys and DATABASE_URL are read from the environment or .env");
    Ok(())
}

async fn with_services<F, Fut, T>(f: F) -> Result<T>
where
    F: FnOnce(Services) -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let config = Config::from_env()?;
    let services = Services::init(&config).await?;
    let result = f(services.clone()).await;
    services.shutdown().await;
    result
}

async fn list_collections() -> Result<()> {
    with_services(|services| async move {
        let collections = services.memory.collections().await?;
        if collections.is_empty() {
            println!("No collections");
        }
        for name in collections {
            println!("{}", name);
        }
        Ok(())
    })
    .await
}

async fn save(collection: &str, id: &str, text: &str, metadata: Metadata) -> Result<()> {
    with_services(|services| async move {
        let id = services.memory.save(collection, id, text, metadata).await?;
        println!("{} Saved {}/{}", style("✓").green(), collection, id);
        Ok(())
    })
    .await
}

async fn search(collection: &str, query: &str, top_k: usize, min_score: f64) -> Result<()> {
    with_services(|services| async move {
        let matches = services.memory.search(collection, query, top_k, min_score).await?;
        if matches.is_empty() {
            println!("No matches above {:.2}", min_score);
        }
        for m in matches {
            println!(
                "{} {} {}",
                style(format!("{:.4}", m.score.unwrap_or_default())).cyan(),
                style(&m.id).bold(),
                m.text
            );
        }
        Ok(())
    })
    .await
}

async fn get(collection: &str, id: &str) -> Result<()> {
    with_services(|services| async move {
        let found = services.memory.get(collection, id).await?;
        println!("{}", serde_json::to_string_pretty(&found)?);
        Ok(())
    })
    .await
}

async fn delete(collection: &str, id: &str) -> Result<()> {
    with_services(|services| async move {
        services.memory.remove(collection, id).await?;
        println!("{} Deleted {}/{}", style("✓").green(), collection, id);
        Ok(())
    })
    .await
}

/// Stream an answer from the chat model
async fn ask(question: &str, collection: Option<&str>, model: Option<String>) -> Result<()> {
    with_services(|services| async move {
        let mut system = String::from("You are a helpful assistant. Keep responses brief.");
        if let Some(collection) = collection {
            system.push_str(&services.memory.recall(collection, question, 5, 0.7).await?);
        }

        let history = vec![Message::system(system), Message::user(question)];
        let options = GenerationOptions {
            model,
            ..GenerationOptions::precise()
        };

        let mut stream = services.chat.complete(&history, &options).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next().await {
            write!(stdout, "{}", chunk?)?;
            stdout.flush()?;
        }
        println!();
        Ok(())
    })
    .await
}
