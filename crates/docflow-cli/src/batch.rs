//! The record store, its observers, and the controller that drives a batch
//!
//! All mutations of every record go through a single [`Batch`] handle. The
//! store lives behind one mutex; each mutation, the progress callback it
//! triggers, and the completion-latch check run in the same critical section,
//! so observers see events in exactly the order the mutations happened.
//!
//! # Completion latch
//!
//! After every mutation the store checks whether every registered record is
//! terminal:
//!
//! - if not, the latch is cleared;
//! - if so, the set is non-empty, and the latch is clear, the latch is set and
//!   `on_complete` fires.
//!
//! `on_complete` therefore fires once per generation and never for an empty
//! set. Removing the last non-terminal record from an otherwise terminal
//! batch completes that generation.

use crate::api::DocumentApi;
use crate::error::{TransitionError, ValidationError};
use crate::poller::{PollConfig, StatusPoller};
use crate::record::{FileRecord, FileSource, RecordId, RecordUpdate};
use crate::uploader::Uploader;
use crate::validation::{self, ValidationOptions};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// ============================================================================
// Observers
// ============================================================================

/// Receives batch notifications
///
/// Callbacks run while the record store is locked. Implementations must not
/// call back into the [`Batch`].
pub trait BatchObserver: Send + Sync {
    /// Once per `accept` call, after the valid files are registered
    fn on_start(&self, _records: &[FileRecord]) {}

    /// After every mutation, with the full current record set
    fn on_progress(&self, _records: &[FileRecord]) {}

    /// Once per generation, when every registered record is terminal
    fn on_complete(&self, _records: &[FileRecord]) {}
}

#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started(Vec<FileRecord>),
    Progress(Vec<FileRecord>),
    Completed(Vec<FileRecord>),
}

impl BatchEvent {
    pub fn records(&self) -> &[FileRecord] {
        match self {
            BatchEvent::Started(records)
            | BatchEvent::Progress(records)
            | BatchEvent::Completed(records) => records,
        }
    }
}

/// Forwards every notification into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: BatchEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

impl BatchObserver for ChannelObserver {
    fn on_start(&self, records: &[FileRecord]) {
        self.forward(BatchEvent::Started(records.to_vec()));
    }

    fn on_progress(&self, records: &[FileRecord]) {
        self.forward(BatchEvent::Progress(records.to_vec()));
    }

    fn on_complete(&self, records: &[FileRecord]) {
        self.forward(BatchEvent::Completed(records.to_vec()));
    }
}

// ============================================================================
// Record Store
// ============================================================================

#[derive(Default)]
struct RecordStore {
    records: Vec<FileRecord>,
    completion_fired: bool,
}

impl RecordStore {
    fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    /// Returns true when this check completed a generation
    fn update_latch(&mut self) -> bool {
        let all_terminal = self.records.iter().all(FileRecord::is_terminal);
        if !all_terminal {
            self.completion_fired = false;
            false
        } else if !self.records.is_empty() && !self.completion_fired {
            self.completion_fired = true;
            true
        } else {
            false
        }
    }
}

struct BatchInner {
    store: Mutex<RecordStore>,
    observer: Arc<dyn BatchObserver>,
    completions: watch::Sender<u64>,
}

/// Shared handle to the record store of one session
#[derive(Clone)]
pub struct Batch {
    inner: Arc<BatchInner>,
}

impl Batch {
    pub fn new(observer: Arc<dyn BatchObserver>) -> Self {
        let (completions, _) = watch::channel(0);
        Self {
            inner: Arc::new(BatchInner {
                store: Mutex::new(RecordStore::default()),
                observer,
                completions,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecordStore> {
        self.inner.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Emit the progress callback and run the latch check for a mutation that
    /// just happened on `store`
    fn mutated(&self, store: &mut RecordStore) {
        self.inner.observer.on_progress(&store.records);
        if store.update_latch() {
            info!(records = store.records.len(), "Batch complete");
            self.inner.observer.on_complete(&store.records);
            self.inner.completions.send_modify(|n| *n += 1);
        }
    }

    /// Register sources as new `Pending` records and signal the start
    pub fn register(&self, sources: Vec<FileSource>) -> Vec<(RecordId, FileSource)> {
        let mut store = self.lock();
        self.register_locked(&mut store, sources)
    }

    /// Check the batch limit, validate each file and register the valid ones
    ///
    /// The limit check and the registration happen under one lock, so
    /// concurrent submissions can never push the batch past `max_files`.
    pub fn try_register(
        &self,
        files: Vec<FileSource>,
        options: &ValidationOptions,
    ) -> Result<Registration, ValidationError> {
        let mut store = self.lock();
        validation::check_batch_limit(store.records.len(), &files, options)?;

        let mut valid = Vec::with_capacity(files.len());
        let mut rejected = Vec::new();
        for file in files {
            match validation::validate(&file, options) {
                Ok(()) => valid.push(file),
                Err(e) => {
                    info!(file = %file.name(), reason = %e, "File rejected");
                    rejected.push((file.name().to_string(), e));
                },
            }
        }

        let registered = self.register_locked(&mut store, valid);
        Ok(Registration {
            registered,
            rejected,
        })
    }

    fn register_locked(
        &self,
        store: &mut RecordStore,
        sources: Vec<FileSource>,
    ) -> Vec<(RecordId, FileSource)> {
        let mut registered = Vec::with_capacity(sources.len());

        for source in sources {
            let mut record = FileRecord::new(source.clone());
            if let Err(e) = record.register() {
                warn!(error = %e, file = %source.name(), "Could not register record");
                continue;
            }
            debug!(record_id = %record.id(), file = %source.name(), "Record registered");
            registered.push((record.id(), source));
            store.records.push(record);
        }

        if !registered.is_empty() {
            self.mutated(store);
        }
        self.inner.observer.on_start(&store.records);

        registered
    }

    /// Apply an update to one record
    ///
    /// Returns `Ok(false)` when nothing changed or the record is gone.
    pub fn apply(&self, id: RecordId, update: RecordUpdate) -> Result<bool, TransitionError> {
        let mut store = self.lock();
        let Some(index) = store.position(id) else {
            debug!(record_id = %id, "Update for a record that is no longer registered");
            return Ok(false);
        };

        match store.records[index].apply(update) {
            Ok(true) => {
                self.mutated(&mut store);
                Ok(true)
            },
            Ok(false) => Ok(false),
            Err(e) => {
                warn!(record_id = %id, error = %e, "Rejected record update");
                Err(e)
            },
        }
    }

    /// Delete one record. Other records are untouched.
    pub fn remove(&self, id: RecordId) -> bool {
        let mut store = self.lock();
        let Some(index) = store.position(id) else {
            return false;
        };
        let record = store.records.remove(index);
        debug!(record_id = %id, status = %record.status(), "Record removed");
        self.mutated(&mut store);
        true
    }

    /// Remove every `Completed` or `Error` record. Returns how many were removed.
    pub fn clear_completed(&self) -> usize {
        let mut store = self.lock();
        let before = store.records.len();
        store.records.retain(|r| !r.is_terminal());
        let removed = before - store.records.len();
        if removed > 0 {
            self.mutated(&mut store);
        }
        removed
    }

    pub fn snapshot(&self) -> Vec<FileRecord> {
        self.lock().records.clone()
    }

    pub fn get(&self, id: RecordId) -> Option<FileRecord> {
        let store = self.lock();
        store.position(id).map(|i| store.records[i].clone())
    }

    /// Registered and not yet terminal
    pub fn is_live(&self, id: RecordId) -> bool {
        self.get(id).map(|r| !r.is_terminal()).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve when the current generation completes
    ///
    /// Returns immediately if the batch is already complete.
    pub async fn wait_until_complete(&self) {
        let mut rx = {
            let store = self.lock();
            if store.completion_fired && !store.records.is_empty() {
                return;
            }
            self.inner.completions.subscribe()
        };
        let _ = rx.changed().await;
    }
}

/// Outcome of [`Batch::try_register`]
#[derive(Debug)]
pub struct Registration {
    pub registered: Vec<(RecordId, FileSource)>,
    pub rejected: Vec<(String, ValidationError)>,
}

// ============================================================================
// Controller
// ============================================================================

/// Result of one `accept` call
#[derive(Debug)]
pub struct AcceptOutcome {
    /// Records created for the files that passed validation
    pub registered: Vec<RecordId>,
    /// Files that were refused, with the reason
    pub rejected: Vec<(String, ValidationError)>,
    /// Upload and polling work for the new sub-batch, if anything was registered
    pub task: Option<JoinHandle<()>>,
}

/// Validates submissions, registers records, and launches uploads and polling
#[derive(Clone)]
pub struct BatchController {
    batch: Batch,
    api: Arc<dyn DocumentApi>,
    options: ValidationOptions,
    poll: PollConfig,
}

impl BatchController {
    pub fn new(
        api: Arc<dyn DocumentApi>,
        options: ValidationOptions,
        poll: PollConfig,
        observer: Arc<dyn BatchObserver>,
    ) -> Self {
        Self {
            batch: Batch::new(observer),
            api,
            options,
            poll,
        }
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    /// Validate and register `files`, then start uploading them as one
    /// transaction
    ///
    /// Must be called from within a Tokio runtime. Fails only when the
    /// submission would exceed the batch file limit, in which case nothing
    /// is registered.
    pub fn accept(&self, files: Vec<FileSource>) -> Result<AcceptOutcome, ValidationError> {
        let Registration {
            registered: sub_batch,
            rejected,
        } = self
            .batch
            .try_register(files, &self.options)
            .inspect_err(|e| warn!(error = %e, "Submission rejected"))?;
        let registered: Vec<RecordId> = sub_batch.iter().map(|(id, _)| *id).collect();

        let task = (!sub_batch.is_empty()).then(|| {
            let uploader = Uploader::new(self.batch.clone(), self.api.clone());
            let poller = StatusPoller::new(self.batch.clone(), self.api.clone(), self.poll);
            tokio::spawn(async move {
                let accepted = uploader.submit(sub_batch).await;
                let loops: Vec<_> = accepted
                    .into_iter()
                    .map(|(id, correlation_id)| poller.clone().spawn(id, correlation_id))
                    .collect();
                for handle in futures::future::join_all(loops).await {
                    if let Err(e) = handle {
                        warn!(error = %e, "Polling task ended abnormally");
                    }
                }
            })
        });

        Ok(AcceptOutcome {
            registered,
            rejected,
            task,
        })
    }

    /// Delete one record; its polling loop retires on its next tick
    pub fn remove(&self, id: RecordId) -> bool {
        self.batch.remove(id)
    }

    pub fn clear_completed(&self) -> usize {
        self.batch.clear_completed()
    }

    pub fn snapshot(&self) -> Vec<FileRecord> {
        self.batch.snapshot()
    }

    pub async fn wait_until_complete(&self) {
        self.batch.wait_until_complete().await
    }
}
