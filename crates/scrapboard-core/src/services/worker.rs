//! Background threads for image imports and link metadata fetches.

use super::{ImageSource, LinkPreview, LinkPreviewProvider, parse_link};
use crate::error::{ImportError, LinkPreviewError};
use crate::objects::{ImageContent, ObjectId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread;
use std::time::Duration;

/// Results sent back from worker threads.
#[derive(Debug)]
pub enum WorkerMessage {
    /// An image of a batch loaded and probed. `index` is its position in the batch.
    Image {
        batch: u64,
        index: usize,
        content: ImageContent,
    },
    /// An image of a batch failed; the rest of the batch was skipped.
    ImageFailed {
        batch: u64,
        index: usize,
        error: ImportError,
    },
    /// A batch finished (successfully or not).
    ImageBatchDone { batch: u64 },
    /// A link metadata fetch finished.
    Link {
        object_id: ObjectId,
        fetch: u64,
        /// The link exactly as it was given to `fetch_link`.
        url: String,
        result: Result<LinkPreview, LinkPreviewError>,
    },
}

struct LinkFetch {
    fetch: u64,
    cancelled: Arc<AtomicBool>,
}

/// Runs collaborators on worker threads and collects their results.
///
/// Results are only ever applied by the owner, through [`poll`](Self::poll).
pub struct BackgroundWorker {
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    provider: Option<Arc<dyn LinkPreviewProvider>>,
    timeout: Duration,
    next_id: u64,
    links: HashMap<ObjectId, LinkFetch>,
    in_flight: usize,
}

impl BackgroundWorker {
    pub fn new(timeout: Duration) -> Self {
        let (tx, rx) = channel();
        Self {
            tx,
            rx,
            provider: None,
            timeout,
            next_id: 0,
            links: HashMap::new(),
            in_flight: 0,
        }
    }

    pub fn set_link_provider(&mut self, provider: Arc<dyn LinkPreviewProvider>) {
        self.provider = Some(provider);
    }

    pub fn has_link_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Number of batches and fetches whose results have not been polled yet.
    pub fn pending(&self) -> usize {
        self.in_flight
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Load and probe `sources` one after another on a worker thread.
    ///
    /// The first failure stops the batch. Returns the batch id.
    pub fn import_images(&mut self, sources: Vec<Box<dyn ImageSource>>) -> u64 {
        let batch = self.next_id();
        let tx = self.tx.clone();
        self.in_flight += 1;

        thread::spawn(move || {
            log::info!("Importing {} images (batch {})", sources.len(), batch);
            for (index, source) in sources.iter().enumerate() {
                let loaded = pollster::block_on(source.load())
                    .and_then(|bytes| ImageContent::from_bytes(&bytes));
                match loaded {
                    Ok(content) => {
                        if tx.send(WorkerMessage::Image { batch, index, content }).is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        log::warn!("Image {} failed to import: {}", source.name(), error);
                        let _ = tx.send(WorkerMessage::ImageFailed { batch, index, error });
                        break;
                    }
                }
            }
            let _ = tx.send(WorkerMessage::ImageBatchDone { batch });
        });

        batch
    }

    /// Start fetching metadata for the link card `object_id`.
    ///
    /// A fetch already running for the same object is cancelled. The fetch
    /// gives up after the configured timeout.
    pub fn fetch_link(&mut self, object_id: ObjectId, link: &str) -> Result<u64, LinkPreviewError> {
        let url = parse_link(link)?;
        let link = link.to_string();
        let Some(provider) = self.provider.clone() else {
            return Err(LinkPreviewError::Failed("no link preview provider".to_string()));
        };
        self.cancel_link(object_id);

        let fetch = self.next_id();
        let cancelled = Arc::new(AtomicBool::new(false));
        self.links.insert(
            object_id,
            LinkFetch {
                fetch,
                cancelled: cancelled.clone(),
            },
        );
        self.in_flight += 1;

        let tx = self.tx.clone();
        let timeout = self.timeout;
        thread::spawn(move || {
            let (result_tx, result_rx) = channel();
            thread::spawn(move || {
                let result = pollster::block_on(provider.fetch(url));
                let _ = result_tx.send(result);
            });

            let result = match result_rx.recv_timeout(timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => Err(LinkPreviewError::TimedOut),
                Err(RecvTimeoutError::Disconnected) => {
                    Err(LinkPreviewError::Failed("provider stopped".to_string()))
                }
            };
            let result = if cancelled.load(Ordering::SeqCst) {
                Err(LinkPreviewError::Cancelled)
            } else {
                result
            };
            let _ = tx.send(WorkerMessage::Link {
                object_id,
                fetch,
                url: link,
                result,
            });
        });

        Ok(fetch)
    }

    /// Cancel the running fetch for `object_id`, if any.
    pub fn cancel_link(&mut self, object_id: ObjectId) {
        if let Some(previous) = self.links.remove(&object_id) {
            log::debug!("Cancelling link fetch {} for {}", previous.fetch, object_id);
            previous.cancelled.store(true, Ordering::SeqCst);
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, fetch) in self.links.drain() {
            fetch.cancelled.store(true, Ordering::SeqCst);
        }
    }

    /// Drain finished results without blocking.
    ///
    /// Results of cancelled or superseded link fetches are dropped here.
    pub fn poll(&mut self) -> Vec<WorkerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            if let Some(message) = self.accept(message) {
                messages.push(message);
            }
        }
        messages
    }

    /// Block until one result arrives or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Option<WorkerMessage> {
        let message = self.rx.recv_timeout(timeout).ok()?;
        self.accept(message)
    }

    fn accept(&mut self, message: WorkerMessage) -> Option<WorkerMessage> {
        match &message {
            WorkerMessage::ImageBatchDone { .. } => {
                self.in_flight = self.in_flight.saturating_sub(1);
            }
            WorkerMessage::Link { object_id, fetch, .. } => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let current = self.links.get(object_id).map(|f| f.fetch);
                if current != Some(*fetch) {
                    log::warn!("Dropping stale link result for {}", object_id);
                    return None;
                }
                self.links.remove(object_id);
            }
            _ => {}
        }
        Some(message)
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
