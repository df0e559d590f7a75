//! Background workers and job-id based cancellation.
//!
//! The event loop never blocks: candidate production and user-database
//! writes run on two long-lived threads fed by channels. Each candidate
//! job carries a monotonically increasing id; the worker skips jobs that
//! are already stale when their debounce deadline arrives, and the event
//! loop drops responses whose id is not the latest. Ordering of database
//! writes follows queue order, which is commit order.

use crate::candidates::{CandidateEngine, ProduceRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;
use typebooster_core::candidate::Candidate;
use typebooster_core::userdb::UserDb;

/// Soft deadline: production longer than this surfaces a busy indicator
/// but is not killed.
pub const SOFT_DEADLINE: Duration = Duration::from_millis(500);

/// Identifier of one candidate production request.
pub type JobId = u64;

#[derive(Debug, Clone)]
pub struct CandidateJob {
    pub id: JobId,
    pub request: ProduceRequest,
    /// Debounce deadline; the worker does not start before it.
    pub not_before: Instant,
}

#[derive(Debug, Clone)]
pub struct CandidateResponse {
    pub id: JobId,
    pub candidates: Vec<Candidate>,
}

/// The candidate-producer worker.
pub struct CandidateWorker {
    jobs: Sender<CandidateJob>,
    responses: Receiver<CandidateResponse>,
    latest: Arc<AtomicU64>,
    next_id: u64,
    handle: Option<JoinHandle<()>>,
}

impl CandidateWorker {
    pub fn spawn(engine: CandidateEngine) -> CandidateWorker {
        let (job_sender, job_receiver) = mpsc::channel::<CandidateJob>();
        let (response_sender, response_receiver) = mpsc::channel::<CandidateResponse>();
        let latest = Arc::new(AtomicU64::new(0));
        let latest_for_worker = latest.clone();
        let handle = std::thread::Builder::new()
            .name("candidate-producer".to_string())
            .spawn(move || {
                while let Ok(job) = job_receiver.recv() {
                    // Wait out the debounce window, bailing as soon as the
                    // job went stale.
                    loop {
                        if latest_for_worker.load(Ordering::Acquire) != job.id {
                            break;
                        }
                        let now = Instant::now();
                        if now >= job.not_before {
                            break;
                        }
                        std::thread::sleep((job.not_before - now).min(Duration::from_millis(20)));
                    }
                    if latest_for_worker.load(Ordering::Acquire) != job.id {
                        debug!(id = job.id, "candidate job cancelled before start");
                        continue;
                    }
                    let candidates = engine.produce(&job.request);
                    // The receiver disappearing just means shutdown.
                    if response_sender
                        .send(CandidateResponse {
                            id: job.id,
                            candidates,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            })
            .expect("spawn candidate producer");
        CandidateWorker {
            jobs: job_sender,
            responses: response_receiver,
            latest,
            next_id: 0,
            handle: Some(handle),
        }
    }

    /// Submit a new request; any outstanding job becomes stale.
    pub fn submit(&mut self, request: ProduceRequest, delay: Duration) -> JobId {
        self.next_id += 1;
        let id = self.next_id;
        self.latest.store(id, Ordering::Release);
        let job = CandidateJob {
            id,
            request,
            not_before: Instant::now() + delay,
        };
        // A send failure means the worker died; the engine degrades to no
        // candidates rather than failing the key event.
        let _ = self.jobs.send(job);
        id
    }

    /// Invalidate whatever job is outstanding (preedit emptied).
    pub fn cancel_outstanding(&mut self) -> JobId {
        self.next_id += 1;
        self.latest.store(self.next_id, Ordering::Release);
        self.next_id
    }

    pub fn latest_id(&self) -> JobId {
        self.latest.load(Ordering::Acquire)
    }

    /// Non-blocking drain: the newest response for the latest job, if any
    /// arrived.
    pub fn try_collect(&self) -> Option<CandidateResponse> {
        let mut newest = None;
        while let Ok(response) = self.responses.try_recv() {
            if response.id == self.latest_id() {
                newest = Some(response);
            }
        }
        newest
    }

    /// Block until the latest job's response arrives or `timeout` passes.
    /// Stale responses are discarded on the way.
    pub fn wait(&self, timeout: Duration) -> Option<CandidateResponse> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.responses.recv_timeout(remaining) {
                Ok(response) if response.id == self.latest_id() => return Some(response),
                Ok(stale) => debug!(id = stale.id, "stale candidate response dropped"),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for CandidateWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        let (dead_sender, _) = mpsc::channel();
        self.jobs = dead_sender;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Operations accepted by the database writer.
#[derive(Debug, Clone)]
pub enum DbOp {
    Record {
        phrase: String,
        context1: String,
        context2: String,
    },
    Forget {
        phrase: String,
        context1: String,
        context2: String,
    },
    DecayPass,
    ImportTraining(String),
}

/// The single serialized writer for the user database. Commits enqueue and
/// return immediately; queue order is commit order.
pub struct DbWriter {
    ops: Sender<DbOp>,
    handle: Option<JoinHandle<()>>,
}

impl DbWriter {
    pub fn spawn(db: UserDb) -> DbWriter {
        let (sender, receiver) = mpsc::channel::<DbOp>();
        let handle = std::thread::Builder::new()
            .name("userdb-writer".to_string())
            .spawn(move || {
                while let Ok(op) = receiver.recv() {
                    match op {
                        DbOp::Record {
                            phrase,
                            context1,
                            context2,
                        } => db.record_commit(&phrase, &context1, &context2),
                        DbOp::Forget {
                            phrase,
                            context1,
                            context2,
                        } => db.forget(&phrase, &context1, &context2),
                        DbOp::DecayPass => db.decay_pass(),
                        DbOp::ImportTraining(text) => db.import_training_text(&text),
                    }
                }
            })
            .expect("spawn userdb writer");
        DbWriter {
            ops: sender,
            handle: Some(handle),
        }
    }

    pub fn send(&self, op: DbOp) {
        let _ = self.ops.send(op);
    }
}

impl Drop for DbWriter {
    fn drop(&mut self) {
        let (dead_sender, _) = mpsc::channel();
        self.ops = dead_sender;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use typebooster_core::config::Settings;
    use typebooster_core::dictionary::Dictionaries;

    fn request(view: &str) -> ProduceRequest {
        ProduceRequest {
            views: vec![view.to_string()],
            context1: String::new(),
            context2: String::new(),
            emoji_mode: false,
            lookup_requested: false,
            settings: Arc::new(Settings::default()),
        }
    }

    fn worker() -> CandidateWorker {
        CandidateWorker::spawn(CandidateEngine::new(
            UserDb::new_temp(),
            Dictionaries::new(&["en".to_string()], Vec::new()),
        ))
    }

    #[test]
    fn responses_carry_their_job_id() {
        let mut worker = worker();
        let id = worker.submit(request("tre"), Duration::ZERO);
        let response = worker.wait(Duration::from_secs(5)).expect("response");
        assert_eq!(response.id, id);
        assert!(response.candidates.iter().any(|c| c.text == "tree"));
    }

    #[test]
    fn newer_job_invalidates_older_one() {
        let mut worker = worker();
        // First job debounced long enough that the second arrives first.
        let _stale = worker.submit(request("tre"), Duration::from_millis(150));
        let fresh = worker.submit(request("hel"), Duration::ZERO);
        let response = worker.wait(Duration::from_secs(5)).expect("response");
        assert_eq!(response.id, fresh);
        assert!(response.candidates.iter().any(|c| c.text == "hello"));
        // The stale job never reports.
        assert!(worker.wait(Duration::from_millis(300)).is_none());
    }

    #[test]
    fn cancel_outstanding_discards_in_flight_work() {
        let mut worker = worker();
        let _job = worker.submit(request("tre"), Duration::from_millis(50));
        worker.cancel_outstanding();
        assert!(worker.wait(Duration::from_millis(300)).is_none());
    }

    #[test]
    fn db_writer_applies_in_commit_order() {
        let db = UserDb::new_temp();
        {
            let writer = DbWriter::spawn(db.clone());
            writer.send(DbOp::Record {
                phrase: "hello".to_string(),
                context1: String::new(),
                context2: String::new(),
            });
            writer.send(DbOp::Record {
                phrase: "world".to_string(),
                context1: "hello".to_string(),
                context2: String::new(),
            });
            writer.send(DbOp::Forget {
                phrase: "hello".to_string(),
                context1: String::new(),
                context2: String::new(),
            });
            // Dropping joins the worker, so all ops have been applied.
        }
        assert!(!db.knows_phrase("hello"));
        assert!(db.knows_phrase("world"));
    }
}
