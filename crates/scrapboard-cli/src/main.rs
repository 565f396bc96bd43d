//! Scrapboard command-line tools.
//!
//! Works on the board files of a `FileStorage` directory.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use scrapboard_core::services::FileSource;
use scrapboard_core::storage::FileStorage;
use scrapboard_core::{Board, BoardConfig, BoardSession, ConfigError, ImageSource, Storage, StorageError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timed out waiting for {0} background imports")]
    ImportTimeout(usize),
    #[error("{0}")]
    Import(String),
}

#[derive(Parser, Debug)]
#[command(name = "scrapboard", about = "Inspect and manage Scrapboard boards")]
struct Cli {
    /// Board directory. Defaults to the platform data directory.
    #[arg(long, env = "SCRAPBOARD_DIR")]
    dir: Option<PathBuf>,

    /// JSON file overriding board configuration.
    #[arg(long, env = "SCRAPBOARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List boards, most recently modified first.
    List,
    /// Print a board's objects back to front.
    Show { board_id: String },
    /// Create an empty board.
    New {
        #[arg(long, default_value = scrapboard_core::config::DEFAULT_BOARD_NAME)]
        name: String,
    },
    /// Copy a board under a new id.
    Duplicate { board_id: String },
    Delete { board_id: String },
    /// Place image files on a board, in order.
    Import {
        board_id: String,
        files: Vec<PathBuf>,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let storage = match &cli.dir {
        Some(dir) => FileStorage::new(dir.clone())?,
        None => FileStorage::default_location()?,
    };
    log::debug!("Using board directory {}", storage.base_path().display());

    let config = match &cli.config {
        Some(path) => BoardConfig::load(path)?,
        None => BoardConfig::default(),
    };

    match cli.command {
        Command::List => {
            let boards = pollster::block_on(storage.list())?;
            for board in boards {
                let favorite = if board.is_favorite { "*" } else { " " };
                println!(
                    "{favorite} {}  {:<24} {:>4} objects  modified {}",
                    board.id, board.name, board.object_count, board.last_modified
                );
            }
        }
        Command::Show { board_id } => {
            let board = pollster::block_on(storage.load(&board_id))?;
            let output = serde_json::json!({
                "id": board.id,
                "name": board.name,
                "last_modified": board.last_modified,
                "is_favorite": board.is_favorite,
                "grid_visible": board.grid_visible,
                "viewport": board.viewport,
                "objects": board.resolved_objects(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::New { name } => {
            let board = Board::new(name);
            pollster::block_on(storage.save(&board.id, &board))?;
            println!("{}", board.id);
        }
        Command::Duplicate { board_id } => {
            let board = pollster::block_on(storage.load(&board_id))?;
            let copy = board.duplicate();
            pollster::block_on(storage.save(&copy.id, &copy))?;
            println!("{}", copy.id);
        }
        Command::Delete { board_id } => {
            pollster::block_on(storage.delete(&board_id))?;
            log::info!("Deleted board {board_id}");
        }
        Command::Import {
            board_id,
            files,
            timeout_secs,
        } => {
            let board = pollster::block_on(storage.load(&board_id))?;
            let board = import(board, config, files, Duration::from_secs(timeout_secs))?;
            pollster::block_on(storage.save(&board_id, &board))?;
        }
    }
    Ok(())
}

fn import(board: Board, config: BoardConfig, files: Vec<PathBuf>, timeout: Duration) -> Result<Board, CliError> {
    let mut session = BoardSession::new(board, config);
    let before = session.board().len();
    let sources: Vec<Box<dyn ImageSource>> = files
        .into_iter()
        .map(|path| Box::new(FileSource::new(path)) as Box<dyn ImageSource>)
        .collect();
    session.import_images(sources);

    let deadline = Instant::now() + timeout;
    while session.pending_background() > 0 {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CliError::ImportTimeout(session.pending_background()));
        }
        session.wait_background(remaining);
    }

    let error = session.last_error().map(str::to_string);
    let board = session.close();
    println!("Placed {} images", board.len().saturating_sub(before));
    match error {
        // Images placed before the failure are kept
        Some(message) if board.len() == before => Err(CliError::Import(message)),
        Some(message) => {
            eprintln!("warning: {message}");
            Ok(board)
        }
        None => Ok(board),
    }
}
