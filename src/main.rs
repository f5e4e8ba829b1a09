use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use prodsearch::connector::api::{serve, AppState};
use prodsearch::{
    AnswerQuestionUseCase, BuildIndexUseCase, ChatClient, ClipEmbedding, GeminiClient,
    ImageEmbedder, IndexStore, JointSpaceBuilder, JsonCatalogLoader, MockImageEmbedder,
    MockTextEmbedder, RetrieveUseCase, TextEmbedder,
};

const INDEX_BASENAME: &str = "catalog";

#[derive(Parser)]
#[command(name = "prodsearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, default_value = "~/.prodsearch")]
    data_dir: String,

    #[arg(long, global = true)]
    mock_embeddings: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or rebuild) the joint text+image index from a catalog folder
    Index {
        /// Directory of product JSON files
        catalog: String,
    },

    /// Query the index by text, image, or both
    Query {
        #[arg(short, long)]
        text: Option<String>,

        #[arg(short, long)]
        image: Option<String>,

        #[arg(long, default_value = "4")]
        num: usize,

        /// Also generate an LLM answer from the retrieved context
        #[arg(long)]
        answer: bool,
    },

    /// Start the HTTP API (builds the index first if absent)
    Serve {
        /// Directory of product JSON files
        catalog: String,

        #[arg(long, default_value = "8080")]
        port: u16,

        /// Bind to 0.0.0.0 instead of 127.0.0.1
        #[arg(long)]
        public: bool,
    },

    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let data_dir = expand_tilde(&cli.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let index_base = PathBuf::from(&data_dir).join(INDEX_BASENAME);

    let joint_space = build_joint_space(cli.mock_embeddings)?;

    match cli.command {
        Commands::Index { catalog } => {
            let use_case = BuildIndexUseCase::new(
                Arc::new(JsonCatalogLoader::new()),
                joint_space.clone(),
            );
            let store = use_case.execute(Path::new(&catalog), &index_base).await?;
            println!(
                "Successfully indexed {} chunks (dimension {})",
                store.len(),
                store.dimensions()
            );
        }

        Commands::Query {
            text,
            image,
            num,
            answer,
        } => {
            let store = Arc::new(IndexStore::load(&index_base)?);
            let retriever = Arc::new(RetrieveUseCase::new(store, joint_space));

            let results = match (text.as_deref(), image.as_deref()) {
                (Some(text), None) => retriever.by_text(text, num).await?,
                (None, Some(image)) => retriever.by_image(Path::new(image), num).await?,
                (Some(text), Some(image)) => {
                    retriever
                        .by_text_and_image(text, Path::new(image), num)
                        .await?
                }
                (None, None) => {
                    anyhow::bail!("provide --text, --image, or both");
                }
            };

            if results.is_empty() {
                println!("No results found.");
            } else {
                println!("Found {} results:\n", results.len());
                for (i, result) in results.iter().enumerate() {
                    println!("{}. {}", i + 1, result.display_line());
                    if let Some(path) = result.chunk().metadata().image_path() {
                        println!("   Image: {}", path);
                    }
                    println!("   | {}", result.chunk().snippet(140));
                    println!();
                }
            }

            if answer {
                let chat = chat_client()?;
                let answerer = AnswerQuestionUseCase::new(retriever.clone(), chat);

                let response = match (text.as_deref(), image.as_deref()) {
                    (Some(text), None) => answerer.answer_text(text, num).await?,
                    (None, Some(image)) => answerer.answer_image(Path::new(image), num).await?,
                    (Some(text), Some(image)) => {
                        answerer
                            .answer_text_and_image(text, Path::new(image), num)
                            .await?
                    }
                    (None, None) => unreachable!(),
                };
                println!("Answer:\n{}", response);
            }
        }

        Commands::Serve {
            catalog,
            port,
            public,
        } => {
            let build = BuildIndexUseCase::new(
                Arc::new(JsonCatalogLoader::new()),
                joint_space.clone(),
            );
            let store = Arc::new(build.ensure(Path::new(&catalog), &index_base).await?);
            let retriever = Arc::new(RetrieveUseCase::new(store, joint_space));

            let answerer = match chat_client() {
                Ok(chat) => Some(Arc::new(AnswerQuestionUseCase::new(
                    retriever.clone(),
                    chat,
                ))),
                Err(e) => {
                    tracing::warn!("Answer generation disabled: {}", e);
                    None
                }
            };

            let host = if public {
                [0, 0, 0, 0]
            } else {
                [127, 0, 0, 1]
            };
            let addr = SocketAddr::from((host, port));
            let state = Arc::new(AppState::new(retriever, answerer));
            serve(state, addr).await?;
        }

        Commands::Stats => {
            if !IndexStore::exists(&index_base) {
                println!("No index found at {:?}. Run `prodsearch index <catalog>`.", index_base);
            } else {
                let store = IndexStore::load(&index_base)?;
                println!("ProdSearch Statistics");
                println!("=====================");
                println!("Chunks:     {}", store.len());
                println!("Dimensions: {}", store.dimensions());
                println!("Data Dir:   {}", data_dir);
            }
        }
    }

    Ok(())
}

fn build_joint_space(mock: bool) -> Result<Arc<JointSpaceBuilder>> {
    let (text_embedder, image_embedder): (Arc<dyn TextEmbedder>, Arc<dyn ImageEmbedder>) = if mock
    {
        info!("Using mock embedding services");
        (
            Arc::new(MockTextEmbedder::new()),
            Arc::new(MockImageEmbedder::new()),
        )
    } else {
        info!("Initializing CLIP embedding services...");
        let clip = Arc::new(ClipEmbedding::new()?);
        (clip.clone(), clip)
    };

    Ok(Arc::new(JointSpaceBuilder::new(
        text_embedder,
        image_embedder,
    )?))
}

fn chat_client() -> Result<Arc<dyn ChatClient>, prodsearch::DomainError> {
    Ok(Arc::new(GeminiClient::from_env()?))
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn query_accepts_text_and_image_together() {
        let res = Cli::try_parse_from([
            "prodsearch",
            "query",
            "--text",
            "warranty",
            "--image",
            "watch.jpg",
        ]);
        assert!(res.is_ok());
    }

    #[test]
    fn index_requires_catalog_path() {
        let res = Cli::try_parse_from(["prodsearch", "index"]);
        assert!(res.is_err(), "index should require a catalog directory");
    }
}
