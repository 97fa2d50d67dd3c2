//! Streaming batch extraction: emit documents as they complete.
//!
//! A hiring workflow often uploads a folder of résumés at once. Rather than
//! waiting for the slowest scanned PDF, [`extract_stream`] yields each
//! upload's result as soon as it is ready, with at most `concurrency`
//! extractions in flight. Results arrive in completion order; use
//! [`BatchItem::index`] to restore upload order.

use crate::error::PipelineError;
use crate::extract::ExtractionOrchestrator;
use crate::output::ProcessedDocument;
use crate::progress::ProgressCallback;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{info, warn};

/// One uploaded file awaiting extraction.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl Upload {
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Result for one upload of a batch.
#[derive(Debug)]
pub struct BatchItem {
    /// 0-based position of the upload in the batch.
    pub index: usize,
    pub file_name: String,
    pub result: Result<ProcessedDocument, PipelineError>,
}

/// A boxed stream of batch results.
pub type DocumentStream = Pin<Box<dyn Stream<Item = BatchItem> + Send>>;

/// Extract a batch of uploads, streaming results as they are ready.
///
/// A failing upload does not stop the batch; its error is yielded in place.
///
/// # Example
/// ```rust,no_run
/// use resume_lens::{extract_stream, ExtractionOrchestrator, PipelineConfig, Upload};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let orchestrator = ExtractionOrchestrator::new(PipelineConfig::default());
/// let uploads = vec![Upload::new(std::fs::read("cv.pdf")?, "cv.pdf", "application/pdf")];
/// let mut stream = extract_stream(&orchestrator, uploads, None);
/// while let Some(item) = stream.next().await {
///     match item.result {
///         Ok(doc) => println!("{}: {} chars", item.file_name, doc.text().len()),
///         Err(e) => eprintln!("{}: {e}", item.file_name),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn extract_stream(
    orchestrator: &ExtractionOrchestrator,
    uploads: Vec<Upload>,
    progress: Option<ProgressCallback>,
) -> DocumentStream {
    let total = uploads.len();
    let concurrency = orchestrator.config().concurrency.max(1);
    info!("Starting batch extraction: {} uploads, concurrency {}", total, concurrency);

    if let Some(ref cb) = progress {
        cb.on_batch_start(total);
    }

    let successes = Arc::new(AtomicUsize::new(0));
    let orch = orchestrator.clone();
    let cb_items = progress.clone();
    let success_counter = Arc::clone(&successes);

    let items = stream::iter(uploads.into_iter().enumerate().map(move |(index, upload)| {
        let orch = orch.clone();
        let cb = cb_items.clone();
        let successes = Arc::clone(&success_counter);
        async move {
            let result = orch
                .extract(&upload.bytes, &upload.file_name, &upload.mime_type)
                .await;
            match &result {
                Ok(doc) => {
                    successes.fetch_add(1, Ordering::SeqCst);
                    if let Some(ref cb) = cb {
                        cb.on_document_complete(index, total, &upload.file_name, doc.text().len());
                    }
                }
                Err(e) => {
                    warn!("Batch item {} ('{}') failed: {}", index, upload.file_name, e);
                    if let Some(ref cb) = cb {
                        cb.on_document_error(index, total, &upload.file_name, &e.to_string());
                    }
                }
            }
            BatchItem {
                index,
                file_name: upload.file_name,
                result,
            }
        }
    }))
    .buffer_unordered(concurrency);

    // Fires once the last item has been yielded.
    let done = stream::once(async move {
        let ok = successes.load(Ordering::SeqCst);
        info!("Batch extraction complete: {}/{} succeeded", ok, total);
        if let Some(cb) = progress {
            cb.on_batch_complete(total, ok);
        }
    })
    .filter_map(|_| async { None::<BatchItem> });

    Box::pin(items.chain(done))
}
