use anyhow::{Context, Result};
use console::style;
use dialoguer::Confirm;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chat::{ChatEngine, CompletionClient, EngineFactory, SessionStore, VectorRetriever};
use crate::config::{Config, Secrets};
use crate::embeddings::{Embedder, OpenAiClient};
use crate::indexer::{CorpusSummary, IndexBuilder};
use crate::openapi::{OpenApiDocument, format_documents};
use crate::store::{IndexManifest, VectorStore};
use crate::web::{self, AppState};

/// Print the formatted corpus without embedding or touching the store
#[inline]
pub fn dry_run(source: &Path) -> Result<()> {
    let document = OpenApiDocument::load(source)
        .with_context(|| format!("Failed to load OpenAPI document {}", source.display()))?;
    let documents = format_documents(&document);

    for (index, doc) in documents.iter().enumerate() {
        println!(
            "{} {} [{}]",
            style(format!("#{}", index + 1)).dim(),
            style(doc.metadata.label()).bold(),
            doc.metadata.kind()
        );
        println!("{}", doc.text);
    }

    print_summary(&CorpusSummary::of(&documents));
    println!("Dry run: nothing was embedded or written.");
    Ok(())
}

/// Format, embed and store the OpenAPI document, replacing any previous index
#[inline]
pub async fn build_index(config: &Config, source: &Path, assume_yes: bool) -> Result<()> {
    let document = OpenApiDocument::load(source)
        .with_context(|| format!("Failed to load OpenAPI document {}", source.display()))?;
    let documents = format_documents(&document);
    let summary = CorpusSummary::of(&documents);
    print_summary(&summary);

    let secrets = Secrets::load(config).context("Failed to load secrets")?;
    let api_key = secrets.api_key()?;

    let embedder: Arc<dyn Embedder> = Arc::new(
        OpenAiClient::new(&config.provider, api_key)
            .context("Failed to initialize embedding client")?,
    );

    let builder = IndexBuilder::new(
        embedder,
        config.store.clone(),
        config.provider.batch_size as usize,
    )
    .with_progress(console::user_attended_stderr());

    if builder.store_exists() && !confirm_overwrite(config.vector_database_path(), assume_yes)? {
        println!("Aborted. The existing index was left untouched.");
        return Ok(());
    }

    let stats = builder
        .build(documents, &source.display().to_string())
        .await
        .context("Index build failed")?;

    println!(
        "{}",
        style(format!(
            "✓ Indexed {} documents into collection '{}'",
            stats.stored, stats.collection
        ))
        .green()
    );
    println!("  Vector dimension: {}", stats.dimension);
    println!("  Estimated tokens: {}", stats.estimated_tokens);
    println!("  Duration: {:?}", stats.duration);
    println!("  Location: {}", config.vector_database_path().display());

    Ok(())
}

fn confirm_overwrite(path: &Path, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        warn!("Overwriting existing index at {}", path.display());
        return Ok(true);
    }

    if !console::user_attended() {
        anyhow::bail!(
            "An index already exists at {}. Re-run with --yes to replace it.",
            path.display()
        );
    }

    Confirm::new()
        .with_prompt(format!(
            "An index already exists at {}. Delete it and rebuild?",
            path.display()
        ))
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

fn print_summary(summary: &CorpusSummary) {
    println!(
        "Prepared {} documents: {} general info, {} operations, {} schemas (~{} tokens)",
        summary.total(),
        summary.general_info,
        summary.operations,
        summary.schemas,
        summary.estimated_tokens
    );
}

/// Open the index and serve the chat UI
#[inline]
pub async fn serve(config: &Config, bind: Option<SocketAddr>) -> Result<()> {
    let secrets = Secrets::load(config).context("Failed to load secrets")?;
    let api_key = secrets.api_key()?.to_string();
    secrets.require_password()?;

    let store = VectorStore::open_read_only(config.vector_database_path(), &config.store.collection)
        .await
        .context("Failed to open the vector index")?;
    let document_count = store.count().await?;

    if let Some(manifest) = IndexManifest::read_optional(&config.manifest_path()) {
        info!(
            "Index built {} from {} with {}",
            manifest.built_at, manifest.source, manifest.embedding_model
        );
        if manifest.embedding_model != config.provider.embedding_model {
            warn!(
                "Index was built with '{}' but the configured embedding model is '{}'",
                manifest.embedding_model, config.provider.embedding_model
            );
        }
    }

    let embedder: Arc<dyn Embedder> = Arc::new(
        OpenAiClient::new(&config.provider, &api_key)
            .context("Failed to initialize embedding client")?,
    );
    let model = Arc::new(
        CompletionClient::new(&config.provider, &api_key)
            .context("Failed to initialize completion client")?,
    );
    let retriever = Arc::new(VectorRetriever::new(embedder, Arc::new(store)));

    let chat_config = config.chat.clone();
    let factory: EngineFactory = Arc::new(move || {
        ChatEngine::new(model.clone(), retriever.clone(), &chat_config)
    });

    let state = AppState {
        sessions: Arc::new(SessionStore::new(
            factory,
            config.chat.greeting.clone(),
            config.server.session_idle_timeout(),
        )),
        secrets: Arc::new(secrets),
        collection: config.store.collection.clone(),
        document_count,
    };

    let addr = match bind {
        Some(addr) => addr,
        None => config.server.socket_addr()?,
    };

    println!(
        "{}",
        style(format!("Serving {document_count} documents on http://{addr}")).green()
    );
    web::serve(addr, state).await?;
    Ok(())
}

/// Report configuration, secrets and index state
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    let secrets = Secrets::load(config).context("Failed to load secrets")?;
    let db_path = config.vector_database_path();

    println!("{}", style("📊 API Assistant Status").bold().cyan());
    println!();
    println!("Config file: {}", config.config_file_path().display());
    println!(
        "API key: {}",
        if secrets.has_api_key() { "set" } else { "missing" }
    );
    println!(
        "App password: {}",
        if secrets.has_password() { "set" } else { "missing" }
    );
    println!();
    println!("Vector store: {}", db_path.display());
    println!("Collection: {}", config.store.collection);

    match VectorStore::open_read_only(db_path, &config.store.collection).await {
        Ok(store) => {
            println!(
                "Documents: {}",
                style(store.count().await?).green()
            );
            println!("Vector dimension: {}", store.vector_dimension().await?);
        }
        Err(e) => {
            println!("Index: {}", style(e).red());
        }
    }

    match IndexManifest::read_optional(&config.manifest_path()) {
        Some(manifest) => {
            println!();
            println!("Last build: {}", manifest.built_at.to_rfc3339());
            println!("  Source: {}", manifest.source);
            println!("  Embedding model: {}", manifest.embedding_model);
            println!("  Documents: {}", manifest.document_count);
            println!("  Estimated tokens: {}", manifest.estimated_tokens);
        }
        None => println!("No build manifest found."),
    }

    Ok(())
}
