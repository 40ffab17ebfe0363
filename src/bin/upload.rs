use std::time::Instant;

use anyhow::{bail, Context};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use chunkstream_upload::chunk::FileHasher;
use chunkstream_upload::metrics::init_metrics;
use chunkstream_upload::{
    FileSource, MemoryBackend, RunOutcome, UploadConfig, UploadEvent, UploadSession,
    UploadSource,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    init_metrics();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: chunkstream-upload <file> [chunk_size_kib] [concurrency]");
    };

    let mut config = UploadConfig::default();
    if let Some(kib) = args.next() {
        let kib: u64 = kib.parse().context("chunk_size_kib must be a number")?;
        config = config.with_chunk_size(kib * 1024);
    }
    if let Some(concurrency) = args.next() {
        let concurrency: usize = concurrency.parse().context("concurrency must be a number")?;
        config = config.with_concurrency(concurrency);
    }

    let source = FileSource::open(&path)
        .await
        .with_context(|| format!("cannot open {path}"))?;
    let size = source.size();

    println!("\nChunkStream upload");
    println!("==================");
    println!("File:        {} ({} bytes)", source.name(), size);
    println!("Chunk size:  {} KiB", config.chunk_size / 1024);
    println!("Concurrency: {}", config.concurrency);
    println!("Threshold:   {} KiB\n", config.chunk_threshold / 1024);

    let backend = MemoryBackend::new();
    let (session, mut events) = UploadSession::new(source, backend.clone(), config)?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                UploadEvent::Progress(p) => match p.current_chunk {
                    Some(chunk) => println!(
                        "  [{:>3}%] chunk {}/{} ({} / {} bytes)",
                        p.percentage,
                        chunk + 1,
                        p.total_chunks.unwrap_or_default(),
                        p.loaded,
                        p.total
                    ),
                    None => println!("  [{:>3}%] {:?}", p.percentage, p.stage),
                },
                UploadEvent::Warning(message) => println!("  warning: {message}"),
                UploadEvent::ChunkFailed { error, chunk } => {
                    println!("  chunk {} failed: {}", chunk.index, error)
                }
                other => println!("  {other:?}"),
            }
        }
    });

    let started = Instant::now();
    let outcome = session.start().await?;
    let elapsed = started.elapsed();
    let file_id = session.file_id();
    drop(session);
    printer.await?;

    let stored = match outcome {
        RunOutcome::Completed(stored) => stored,
        other => bail!("upload stopped without completing: {other:?}"),
    };

    let merged = backend
        .file(&stored.reference)
        .context("backend has no merged file")?;
    println!("\nStored as {} in {:.2?}", stored.reference, elapsed);

    if let Some(file_id) = file_id {
        let merged_id = FileHasher::hash_bytes(&merged);
        if merged_id != file_id {
            bail!("merged file hashes to {merged_id}, expected {file_id}");
        }
        println!("Merged content verified: {file_id}");
    } else {
        println!("Uploaded directly ({} bytes)", merged.len());
    }

    Ok(())
}
