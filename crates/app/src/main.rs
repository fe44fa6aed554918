use chrono::Utc;
use clap::{Parser, Subcommand};
use docuchat_core::config::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_INDEX_NAME, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_PINECONE_CONTROL_URL,
};
use docuchat_core::{
    fingerprint, Credentials, HostedDocuChat, IngestReport, Settings, ValidationLimits,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docuchat", version, about = "Ask questions about a small PDF")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pinecone_api_key: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Pinecone index name
    #[arg(long, env = "DOCUCHAT_INDEX", default_value = DEFAULT_INDEX_NAME)]
    index: String,

    /// Pinecone control plane URL
    #[arg(long, env = "PINECONE_CONTROL_URL", default_value = DEFAULT_PINECONE_CONTROL_URL)]
    pinecone_url: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    openai_url: String,

    /// Embedding model
    #[arg(long, env = "DOCUCHAT_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Chat model used to write answers
    #[arg(long, env = "DOCUCHAT_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Embedding width; must match the index
    #[arg(long, env = "DOCUCHAT_DIMENSION", default_value_t = 1536)]
    dimension: usize,

    /// Serverless cloud used when the index is created
    #[arg(long, env = "DOCUCHAT_CLOUD", default_value = "aws")]
    cloud: String,

    /// Serverless region used when the index is created
    #[arg(long, env = "DOCUCHAT_REGION", default_value = "us-east-1")]
    region: String,

    /// Sampling temperature for the chat model
    #[arg(long, env = "DOCUCHAT_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Target chunk size in characters
    #[arg(long, env = "DOCUCHAT_CHUNK_SIZE", default_value_t = 1000)]
    chunk_size: usize,

    /// Characters shared by neighbouring chunks
    #[arg(long, env = "DOCUCHAT_CHUNK_OVERLAP", default_value_t = 200)]
    chunk_overlap: usize,

    /// Maximum pages per upload
    #[arg(long, env = "DOCUCHAT_MAX_PAGES", default_value_t = 5)]
    max_pages: usize,

    /// Maximum words per upload
    #[arg(long, env = "DOCUCHAT_MAX_WORDS", default_value_t = 10_000)]
    max_words: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Check a PDF against the upload limits without indexing it.
    Validate {
        #[arg(long)]
        file: PathBuf,
    },
    /// Validate a PDF and store its chunks unless already indexed.
    Ingest {
        #[arg(long)]
        file: PathBuf,
    },
    /// Answer a question from the indexed chunks.
    Ask {
        #[arg(long)]
        question: String,
        /// Number of chunks retrieved as context.
        #[arg(long, env = "DOCUCHAT_TOP_K", default_value_t = 5)]
        top_k: usize,
    },
    /// Ingest a PDF, then answer questions read from stdin until EOF or `exit`.
    Chat {
        #[arg(long)]
        file: PathBuf,
    },
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let credentials =
            Credentials::new(self.pinecone_api_key.clone(), self.openai_api_key.clone())?;

        let mut settings = Settings::new(credentials)
            .with_pinecone_control_url(&self.pinecone_url)?
            .with_openai_base_url(&self.openai_url)?;
        settings.index_name = self.index.clone();
        settings.dimension = self.dimension;
        settings.cloud = self.cloud.clone();
        settings.region = self.region.clone();
        settings.embedding_model = self.embedding_model.clone();
        settings.chat_model = self.chat_model.clone();
        settings.temperature = self.temperature;
        settings.chunk_size = self.chunk_size;
        settings.chunk_overlap = self.chunk_overlap;
        settings.limits = ValidationLimits {
            max_pages: self.max_pages,
            max_words: self.max_words,
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut settings = cli.settings()?;
    if let Command::Ask { top_k, .. } = &cli.command {
        settings.top_k = *top_k;
    }

    let docuchat = HostedDocuChat::from_settings(&settings)?;
    info!(
        version = app_version,
        index = %settings.index_name,
        started_at = %Utc::now().to_rfc3339(),
        "docuchat boot"
    );

    match cli.command {
        Command::Validate { file } => {
            let bytes = read_upload(&file).await?;
            match docuchat.validate(&bytes) {
                Ok(document) => {
                    println!("PDF is valid.");
                    println!(
                        "pages={} words={} fingerprint={}",
                        document.page_count,
                        document.word_count,
                        fingerprint(&document.bytes)
                    );
                }
                Err(rejection) => println!("{rejection}"),
            }
        }
        Command::Ingest { file } => {
            docuchat.prepare().await?;
            let bytes = read_upload(&file).await?;
            let report = docuchat.ingest_pdf(&bytes).await?;
            print_report(&report);
        }
        Command::Ask { question, .. } => {
            println!("{}", docuchat.ask(&question).await);
        }
        Command::Chat { file } => {
            docuchat.prepare().await?;
            let bytes = read_upload(&file).await?;
            let report = docuchat.ingest_pdf(&bytes).await?;
            print_report(&report);
            if matches!(report, IngestReport::Rejected { .. }) {
                return Ok(());
            }
            chat_loop(&docuchat).await?;
        }
    }

    Ok(())
}

async fn read_upload(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|error| anyhow::anyhow!("failed to read {}: {error}", path.display()))
}

fn print_report(report: &IngestReport) {
    match report {
        IngestReport::Rejected { reason } => println!("{reason}"),
        IngestReport::AlreadyIndexed { fingerprint } => {
            println!("Document already indexed (fingerprint={fingerprint}).")
        }
        IngestReport::Indexed {
            fingerprint,
            chunks,
        } => println!(
            "{chunks} chunks ingested (fingerprint={fingerprint}) at {}",
            Utc::now().to_rfc3339()
        ),
    }
}

async fn chat_loop(docuchat: &HostedDocuChat) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let answer = docuchat.ask(question).await;
        stdout.write_all(format!("{answer}\n\n").as_bytes()).await?;
    }

    Ok(())
}
