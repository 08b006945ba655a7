use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use modelshare::client::ApiClient;
use modelshare::controller::{ExecutionController, ExecutionError};
use modelshare::models::SolverModelId;
use modelshare::solver::HttpSolver;
use modelshare::terminal::{format_feedback, format_status, FileSurface, JsonRenderer};
use modelshare::{api, commands, db};

#[derive(Parser)]
#[command(name = "mshare")]
#[command(about = "Run, explore and share formal models")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the sharing server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Database file (defaults to the platform data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Store a model file as a new seed model
    Seed { file: PathBuf },
    /// Share a model file as a derivation of an existing model
    Share {
        file: PathBuf,

        /// Model the file was derived from
        #[arg(long)]
        parent: Option<Uuid>,
    },
    /// Print the source reachable through a link
    Resolve { link: Uuid },
    /// Execute a command and browse its instances interactively
    Explore {
        file: PathBuf,

        /// Index of the command to execute
        #[arg(short, long, default_value = "0")]
        command: i32,

        /// Solver model id to chain the execution from
        #[arg(long)]
        last_id: Option<String>,

        /// The model was opened through a private link
        #[arg(long)]
        private: bool,
    },
}

/// Initialize tracing with output to stderr (for explore mode) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "modelshare=debug,tower_http=debug".into()),
    );

    if use_stderr {
        // Explore mode: stdout carries instances and feedback
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn serve(port: u16, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Starting modelshare server on port {}", port);

    let db = match db_path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;

    let app = api::create_router(db);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("modelshare server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn read_model(file: &PathBuf) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

async fn explore(
    file: PathBuf,
    command: i32,
    last_id: Option<String>,
    private: bool,
) -> anyhow::Result<()> {
    let code = read_model(&file)?;
    for c in commands::list_commands(&code) {
        println!("  {}: {} {}", c.index, c.kind.as_str(), c.label());
    }

    let solver = HttpSolver::from_env()?;
    let mut controller = ExecutionController::new(
        solver,
        JsonRenderer::new(std::io::stdout()),
        FileSurface::new(code),
    )
    .from_private(private);
    if let Some(id) = last_id {
        controller = controller.with_last_model(SolverModelId::new(id));
    }
    controller.highlight_secrets();

    report(controller.run(command).await);
    println!("Commands: n = next, p = previous, r = reload and rerun, q = quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "n" => report(controller.next().await),
            "p" => report(controller.prev().await),
            "r" => {
                controller.surface_mut().set_text(read_model(&file)?);
                controller.document_edited();
                report(controller.run(command).await);
            }
            "q" => break,
            "" => {}
            other => println!("Unknown input: {}", other),
        }
        println!("{}", format_status(controller.session().cache()));
    }
    Ok(())
}

fn report(result: Result<Vec<modelshare::controller::Feedback>, ExecutionError>) {
    match result {
        Ok(feedback) => {
            for f in &feedback {
                println!("{}", format_feedback(f));
            }
        }
        Err(e) => println!("[error] {}", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = matches!(cli.command, Some(Commands::Explore { .. }));
    init_tracing(use_stderr);

    match cli.command {
        Some(Commands::Serve { port, db }) => serve(port, db).await?,
        Some(Commands::Seed { file }) => {
            let model = ApiClient::from_env().create_model(&read_model(&file)?).await?;
            println!("{}", model.id);
        }
        Some(Commands::Share { file, parent }) => {
            let result = ApiClient::from_env()
                .share(&read_model(&file)?, parent)
                .await?;
            println!("public:  {}", result.public);
            if let Some(private) = result.private {
                println!("private: {}", private);
            }
            println!("model:   {}", result.last_id);
        }
        Some(Commands::Resolve { link }) => {
            let resolved = ApiClient::from_env().resolve_link(link).await?;
            print!("{}", resolved.code);
        }
        Some(Commands::Explore {
            file,
            command,
            last_id,
            private,
        }) => explore(file, command, last_id, private).await?,
        None => serve(3000, None).await?,
    }

    Ok(())
}
