//! Bounded two-stage copy for large files
//!
//! A producer task reads fixed-size chunks from the source and pushes them
//! into a queue of depth [`QUEUE_DEPTH`]; the calling task drains the queue
//! into the destination. A full queue parks the producer, so memory stays at
//! roughly `QUEUE_DEPTH` chunks whatever the file size.
//!
//! A read failure travels on a separate oneshot channel and is only looked
//! at after both stages are done. The destination then holds a byte-exact
//! prefix of the source made of whole chunks.

use crate::logging::Logger;
use crate::types::SyncError;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

/// Chunks buffered between the reader and the writer
pub const QUEUE_DEPTH: usize = 5;

/// A progress line is logged every this many chunks
pub const PROGRESS_INTERVAL: u64 = 10;

/// Copy `src` to `dst` through the chunk queue, returning bytes written
///
/// `dst` is created (or truncated) with `permissions` as its mode on unix.
/// Its parent directory must already exist.
pub async fn copy_chunked(
    src: &Path,
    dst: &Path,
    chunk_size: usize,
    permissions: u32,
    logger: Arc<dyn Logger>,
) -> Result<u64, SyncError> {
    let chunk_size = chunk_size.max(1);
    let source = src.to_path_buf();

    run_pipeline(src, dst, permissions, logger, move |chunk_tx, error_tx| {
        read_chunks(source, chunk_size, chunk_tx, error_tx)
    })
    .await
}

/// Spawn `producer` on the queue and drain it into `dst`
async fn run_pipeline<P, F>(
    src: &Path,
    dst: &Path,
    permissions: u32,
    logger: Arc<dyn Logger>,
    producer: P,
) -> Result<u64, SyncError>
where
    P: FnOnce(mpsc::Sender<Vec<u8>>, oneshot::Sender<SyncError>) -> F,
    F: Future<Output = ()> + Send + 'static,
{
    let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<u8>>(QUEUE_DEPTH);
    let (error_tx, mut error_rx) = oneshot::channel::<SyncError>();

    let producer = tokio::spawn(producer(chunk_tx, error_tx));

    let written = write_chunks(dst, permissions, chunk_rx, logger.as_ref()).await;

    producer
        .await
        .map_err(|e| SyncError::Pipeline(format!("reader task for {}: {}", src.display(), e)))?;

    if let Ok(read_error) = error_rx.try_recv() {
        logger.error(&format!("Chunked copy of {} failed: {}", src.display(), read_error));
        return Err(read_error);
    }

    written
}

/// Producer stage for a file on disk
async fn read_chunks(
    src: PathBuf,
    chunk_size: usize,
    chunk_tx: mpsc::Sender<Vec<u8>>,
    error_tx: oneshot::Sender<SyncError>,
) {
    match File::open(&src).await {
        Ok(file) => pump_chunks(file, src, chunk_size, chunk_tx, error_tx).await,
        Err(source) => {
            let _ = error_tx.send(SyncError::Copy { path: src, source });
        }
    }
}

/// Read `reader` in whole chunks onto the queue
///
/// Dropping `chunk_tx` on return closes the queue. A chunk cut short by a
/// read error is discarded.
async fn pump_chunks<R: AsyncRead + Unpin>(
    mut reader: R,
    src: PathBuf,
    chunk_size: usize,
    chunk_tx: mpsc::Sender<Vec<u8>>,
    error_tx: oneshot::Sender<SyncError>,
) {
    let mut offset: u64 = 0;

    loop {
        let mut chunk = vec![0u8; chunk_size];
        let mut filled = 0;

        while filled < chunk_size {
            match reader.read(&mut chunk[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    let _ = error_tx.send(SyncError::ChunkRead {
                        path: src,
                        offset: offset + filled as u64,
                        source,
                    });
                    return;
                }
            }
        }

        if filled == 0 {
            return;
        }

        let at_eof = filled < chunk_size;
        chunk.truncate(filled);
        offset += filled as u64;

        // The writer hung up; it reports its own error.
        if chunk_tx.send(chunk).await.is_err() {
            return;
        }

        if at_eof {
            return;
        }
    }
}

/// Consumer stage
async fn write_chunks(
    dst: &Path,
    permissions: u32,
    mut chunk_rx: mpsc::Receiver<Vec<u8>>,
    logger: &dyn Logger,
) -> Result<u64, SyncError> {
    let copy_err = |source| SyncError::Copy {
        path: dst.to_path_buf(),
        source,
    };

    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    options.mode(permissions);
    #[cfg(not(unix))]
    let _ = permissions;

    let mut file = options.open(dst).await.map_err(copy_err)?;

    let mut written: u64 = 0;
    let mut chunks: u64 = 0;

    while let Some(chunk) = chunk_rx.recv().await {
        file.write_all(&chunk).await.map_err(copy_err)?;
        written += chunk.len() as u64;
        chunks += 1;

        if chunks % PROGRESS_INTERVAL == 0 {
            logger.debug(&format!(
                "{}: {} chunks, {} bytes written",
                dst.display(),
                chunks,
                written
            ));
        }
    }

    file.flush().await.map_err(copy_err)?;
    file.sync_all().await.map_err(copy_err)?;

    Ok(written)
}
