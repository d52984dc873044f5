//! Generation jobs running on their own thread
//!
//! A job owns its driver outright and talks to the caller only through a
//! channel of [`WorkerMessage`]s. Cancellation is terminate-and-discard: the
//! job stops at the next batch boundary and nothing it sends afterwards is
//! read.

use crate::algorithm::executor::{GenerationConfig, GenerationDriver, RunSummary};
use crate::catalog::favorites::FavoriteBag;
use crate::catalog::model::Catalog;
use crate::catalog::request::RunRequest;
use crate::io::collection::Collection;
use crate::io::error::{GenerationError, Result};
use crate::io::message::{WireImage, WorkerMessage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Handle to one running generation job
#[derive(Debug)]
pub struct GenerationJob {
    id: u64,
    catalog: Arc<Catalog>,
    size: usize,
    receiver: Receiver<WorkerMessage>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<RunSummary>>,
}

impl GenerationJob {
    /// Start a job on a dedicated thread
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned
    pub fn spawn(
        id: u64,
        catalog: Arc<Catalog>,
        favorites: &FavoriteBag,
        size: usize,
        config: GenerationConfig,
    ) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let driver = GenerationDriver::new(Arc::clone(&catalog), favorites, size, config);
        let job_cancel = Arc::clone(&cancel);

        let handle = thread::Builder::new()
            .name(format!("generation-{id}"))
            .spawn(move || run_job(id, driver, &sender, &job_cancel))
            .map_err(|err| GenerationError::JobFailed {
                job: id,
                reason: err.to_string(),
            })?;

        tracing::debug!(job = id, size, "generation job started");

        Ok(Self {
            id,
            catalog,
            size,
            receiver,
            cancel,
            handle: Some(handle),
        })
    }

    /// Sequence number of this job
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Catalog snapshot the job generates from
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Requested size
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Wait for the next message; `None` once the job is gone
    pub fn recv(&self) -> Option<WorkerMessage> {
        self.receiver.recv().ok()
    }

    /// Take a message if one is ready
    pub fn try_recv(&self) -> Option<WorkerMessage> {
        self.receiver.try_recv().ok()
    }

    /// Ask the job to stop at its next batch boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Test whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Create an empty collection bound to this job
    pub fn collection(&self) -> Collection {
        Collection::new(Arc::clone(&self.catalog), self.id, self.size)
    }

    /// Merge every update into `collection` until the job finishes
    ///
    /// `on_update` runs after each merged batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the job stops without a finish message or panics
    pub fn drain(
        &mut self,
        collection: &mut Collection,
        mut on_update: impl FnMut(&Collection),
    ) -> Result<RunSummary> {
        let mut finished = false;
        while let Some(message) = self.recv() {
            match message {
                WorkerMessage::Update { images } => {
                    collection.merge(self.id, images);
                    on_update(collection);
                }
                WorkerMessage::Finish => {
                    finished = true;
                    break;
                }
            }
        }

        if !finished {
            return Err(GenerationError::JobDisconnected {
                job: self.id,
                received: collection.received(),
            });
        }
        self.join()
    }

    /// Wait for the job thread and return its counters
    ///
    /// # Errors
    ///
    /// Returns an error if the job panicked or was already joined
    pub fn join(&mut self) -> Result<RunSummary> {
        let handle = self.handle.take().ok_or_else(|| GenerationError::JobFailed {
            job: self.id,
            reason: "job was already joined".to_string(),
        })?;
        handle.join().map_err(|_panic| GenerationError::JobFailed {
            job: self.id,
            reason: "generation thread panicked".to_string(),
        })
    }
}

impl Drop for GenerationJob {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn run_job(
    id: u64,
    mut driver: GenerationDriver,
    sender: &Sender<WorkerMessage>,
    cancel: &AtomicBool,
) -> RunSummary {
    let catalog = Arc::clone(driver.catalog());
    while let Some(batch) = driver.next_batch() {
        if cancel.load(Ordering::Relaxed) {
            tracing::debug!(job = id, "generation job cancelled");
            return *driver.summary();
        }

        let images = batch
            .iter()
            .map(|image| WireImage::from_image(image, &catalog))
            .collect();
        if sender.send(WorkerMessage::Update { images }).is_err() {
            tracing::debug!(job = id, "caller went away");
            return *driver.summary();
        }

        // Cooperative: let the caller's threads run between batches
        thread::yield_now();
    }

    if sender.send(WorkerMessage::Finish).is_err() {
        tracing::debug!(job = id, "caller went away before finish");
    }
    *driver.summary()
}

/// Keeps exactly one authoritative job
///
/// Starting a new request cancels whatever job was running, so stale batches
/// can never reach a newer collection.
#[derive(Debug)]
pub struct Generator {
    config: GenerationConfig,
    next_job: u64,
    current: Option<GenerationJob>,
    fingerprint: Option<(String, FavoriteBag)>,
}

impl Generator {
    /// Create a generator with no job running
    pub const fn new(config: GenerationConfig) -> Self {
        Self {
            config,
            next_job: 1,
            current: None,
            fingerprint: None,
        }
    }

    /// Run parameters applied to every job
    pub const fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Cancel any running job and start one for `request`
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is invalid or the thread cannot start
    pub fn start(&mut self, request: &RunRequest) -> Result<&mut GenerationJob> {
        self.cancel();

        let catalog = Arc::new(Catalog::from_request(request)?);
        let id = self.next_job;
        self.next_job += 1;

        let job = GenerationJob::spawn(
            id,
            catalog,
            &request.favorites,
            request.size,
            self.config,
        )?;
        self.fingerprint = Some((request.fingerprint(), request.favorites.clone()));
        Ok(self.current.insert(job))
    }

    /// Cancel and discard the running job, if any
    pub fn cancel(&mut self) {
        if let Some(job) = self.current.take() {
            tracing::debug!(job = job.id(), "cancelling generation job");
            job.cancel();
        }
        self.fingerprint = None;
    }

    /// The authoritative job
    pub const fn current(&self) -> Option<&GenerationJob> {
        self.current.as_ref()
    }

    /// Mutable access to the authoritative job
    pub const fn current_mut(&mut self) -> Option<&mut GenerationJob> {
        self.current.as_mut()
    }

    /// Test whether `request` has the same catalog shape and favorites as the
    /// running job, in which case restarting would not change anything
    pub fn is_current(&self, request: &RunRequest) -> bool {
        self.current.is_some()
            && self
                .fingerprint
                .as_ref()
                .is_some_and(|(fingerprint, favorites)| {
                    *fingerprint == request.fingerprint() && *favorites == request.favorites
                })
    }
}
