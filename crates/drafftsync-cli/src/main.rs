//! DrafftSync command-line shell.
//!
//! Edits documents kept in a local storage directory and exchanges them as
//! opaque binary files that can be merged back in from any other copy.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use drafftsync_core::persistence::CONTENT_TYPE;
use drafftsync_core::storage::{AutoSaveManager, FileStorage, StorageError, create_default_storage};
use drafftsync_core::{
    ChangeSource, CrdtDocument, Record, RecordId, RecordStore, RecordType, SyncConfig, SyncEngine,
    SyncError,
};
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Usage(String),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Parser)]
#[command(name = "drafftsync", version, about = "Edit, export and merge DrafftSync documents")]
struct Cli {
    /// Directory holding saved documents.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new document with a default page.
    New { id: String },
    /// Add a shape to the default page.
    AddShape {
        id: String,
        #[arg(long, default_value = "geo")]
        kind: String,
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
    },
    /// Merge a JSON object into a record's fields.
    Set {
        id: String,
        record: String,
        patch: String,
    },
    /// Remove a record.
    Rm { id: String, record: String },
    /// Merge an exported document file into a document.
    Import { id: String, file: PathBuf },
    /// Write a document to a binary file.
    Export { id: String, file: PathBuf },
    /// Print a document's records as JSON. Without an id, shows the last saved document.
    Show { id: Option<String> },
    /// List saved documents.
    List,
}

/// An open document: the engine, the store it mirrors into and the storage it came from.
struct Session {
    manager: AutoSaveManager<FileStorage>,
    engine: SyncEngine,
    store: RecordStore,
}

impl Session {
    fn start(manager: AutoSaveManager<FileStorage>, document: CrdtDocument, config: SyncConfig) -> CliResult<Self> {
        let mut engine = SyncEngine::with_document(document, config);
        let mut store = RecordStore::new();
        engine.attach(&mut store);
        engine.cold_start(&mut store)?;
        Ok(Self { manager, engine, store })
    }

    fn open(mut manager: AutoSaveManager<FileStorage>, id: &str, config: SyncConfig) -> CliResult<Self> {
        let document = pollster::block_on(manager.load(id))?;
        Self::start(manager, document, config)
    }

    fn commit(mut self) -> CliResult<()> {
        self.engine.flush()?;
        self.manager.mark_dirty();
        pollster::block_on(self.manager.save(self.engine.document()))?;
        log::info!("Saved {} ({} records)", self.manager.document_id().unwrap_or("?"), self.store.len());
        Ok(())
    }
}

fn load_config(path: Option<&PathBuf>) -> CliResult<SyncConfig> {
    match path {
        Some(path) => Ok(SyncConfig::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(SyncConfig::default()),
    }
}

fn open_storage(dir: Option<PathBuf>) -> CliResult<Arc<FileStorage>> {
    Ok(match dir {
        Some(dir) => Arc::new(FileStorage::new(dir)?),
        None => create_default_storage()?,
    })
}

fn new_shape(kind: &str, x: f64, y: f64, config: &SyncConfig) -> CliResult<Record> {
    let fields: Map<String, Value> = serde_json::from_value(json!({
        "type": kind,
        "parentId": config.page_id,
        "index": "a1",
        "x": x,
        "y": y,
        "rotation": 0,
        "isLocked": false,
        "opacity": 1,
        "props": {},
        "meta": {}
    }))?;
    Ok(Record::new(RecordId::generate(&RecordType::Shape), fields))
}

fn print_records(document: &CrdtDocument) -> CliResult<()> {
    let records: Vec<Value> = document.records().into_values().map(Value::from).collect();
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(cli.config.as_ref())?;
    let mut manager = AutoSaveManager::new(open_storage(cli.dir)?);
    manager.set_interval(config.autosave_interval());

    match cli.command {
        Command::New { id } => {
            if pollster::block_on(manager.exists(&id))? {
                return Err(CliError::Usage(format!("Document {} already exists", id)));
            }
            manager.set_document_id(Some(id));
            Session::start(manager, CrdtDocument::new(), config)?.commit()
        }
        Command::AddShape { id, kind, x, y } => {
            let mut session = Session::open(manager, &id, config)?;
            let shape = new_shape(&kind, x, y, session.engine.config())?;
            println!("{}", shape.id());
            session.store.put([shape], ChangeSource::User);
            session.commit()
        }
        Command::Set { id, record, patch } => {
            let Value::Object(patch) = serde_json::from_str::<Value>(&patch)? else {
                return Err(CliError::Usage("Patch must be a JSON object".to_string()));
            };
            let mut session = Session::open(manager, &id, config)?;
            let record_id = RecordId::new(record);
            if !session
                .store
                .update(&record_id, ChangeSource::User, |r| r.patch(patch))
            {
                return Err(CliError::Usage(format!("No record {}", record_id)));
            }
            session.commit()
        }
        Command::Rm { id, record } => {
            let mut session = Session::open(manager, &id, config)?;
            let record_id = RecordId::new(record);
            if !session.store.contains(&record_id) {
                return Err(CliError::Usage(format!("No record {}", record_id)));
            }
            session.store.remove([&record_id], ChangeSource::User);
            session.commit()
        }
        Command::Import { id, file } => {
            let bytes = std::fs::read(&file)?;
            let mut session = Session::open(manager, &id, config)?;
            session.engine.import(&bytes, &mut session.store)?;
            log::info!("Imported {}", file.display());
            session.commit()
        }
        Command::Export { id, file } => {
            let mut session = Session::open(manager, &id, config)?;
            std::fs::write(&file, session.engine.save()?)?;
            log::info!("Exported {} to {} ({})", id, file.display(), CONTENT_TYPE);
            Ok(())
        }
        Command::Show { id: Some(id) } => {
            let document = pollster::block_on(manager.load(&id))?;
            print_records(&document)
        }
        Command::Show { id: None } => {
            let document = pollster::block_on(manager.load_last())
                .ok_or_else(|| CliError::Usage("No document has been saved yet".to_string()))?;
            print_records(&document)
        }
        Command::List => {
            for id in pollster::block_on(manager.list_documents())? {
                println!("{}", id);
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
