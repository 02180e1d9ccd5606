//! Background encode/decode jobs.
//!
//! A [`Job`] is one file conversion. It can run inline with [`Job::run`], on
//! its own thread with [`spawn`], or through a [`JobQueue`] that collects the
//! outcomes of many jobs on a single channel. Outcomes always carry the full
//! `Result`; nothing is reported through shared flags.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError};
use log::{debug, error, warn};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;

use crate::codec::{decode, encode};
use crate::file::{load_from_file, save_to_file};
use crate::image::bmp::{load_gray_bmp, write_gray_bmp};
use crate::image::raw_image::RawImage;
use crate::utils::error::{BarchError, Result};

/// Suffix appended to a BMP path to name its encoded output.
pub const ENCODE_SUFFIX: &str = ".packed.barch";
/// Suffix appended to a BARCH path to name its decoded output.
pub const DECODE_SUFFIX: &str = ".unpacked.bmp";

pub type JobId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// BMP → BARCH
    Encode,
    /// BARCH → BMP
    Decode,
}

impl JobKind {
    /// Picks the conversion for a lowercase file extension.
    pub fn for_extension(ext: &str) -> Option<JobKind> {
        match ext {
            "bmp" => Some(JobKind::Encode),
            crate::file::BARCH_EXTENSION => Some(JobKind::Decode),
            _ => None,
        }
    }

    pub fn default_suffix(self) -> &'static str {
        match self {
            JobKind::Encode => ENCODE_SUFFIX,
            JobKind::Decode => DECODE_SUFFIX,
        }
    }

    /// Status shown while a job of this kind is running.
    pub fn busy_text(self) -> &'static str {
        match self {
            JobKind::Encode => "Coding",
            JobKind::Decode => "Decoding",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub kind: JobKind,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl Job {
    pub fn new(kind: JobKind, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Job {
            kind,
            input: input.into(),
            output: output.into(),
        }
    }

    /// A job writing next to its input, at `input + suffix`.
    pub fn with_suffix(kind: JobKind, input: impl Into<PathBuf>, suffix: &str) -> Self {
        let input = input.into();
        let output = append_suffix(&input, suffix);
        Job {
            kind,
            input,
            output,
        }
    }

    pub fn with_default_output(kind: JobKind, input: impl Into<PathBuf>) -> Self {
        Self::with_suffix(kind, input, kind.default_suffix())
    }

    /// Runs the conversion on the calling thread and returns the output path.
    pub fn run(&self) -> Result<PathBuf> {
        debug!(
            "{:?} job: {} -> {}",
            self.kind,
            self.input.display(),
            self.output.display()
        );
        match self.kind {
            JobKind::Encode => {
                let img = load_gray_bmp(&self.input)?;
                save_to_file(&self.output, &img)?;
            }
            JobKind::Decode => {
                let img = load_from_file(&self.input)?;
                write_gray_bmp(&self.output, &img)?;
            }
        }
        Ok(self.output.clone())
    }
}

/// `path` with `suffix` appended to its final component.
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// The finished state of one job.
#[derive(Debug)]
pub struct JobOutcome {
    pub id: JobId,
    pub job: Job,
    pub result: Result<PathBuf>,
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Runs `work` on a new thread. Exactly one outcome is sent, even if `work`
/// panics.
fn spawn_worker<F>(
    id: JobId,
    job: Job,
    tx: Sender<JobOutcome>,
    work: F,
) -> Result<thread::JoinHandle<()>>
where
    F: FnOnce(&Job) -> Result<PathBuf> + Send + 'static,
{
    thread::Builder::new()
        .name(format!("barch-job-{}", id))
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| work(&job)))
                .unwrap_or_else(|payload| {
                    let msg = format!("job {} panicked: {}", id, panic_message(payload.as_ref()));
                    error!("{}", msg);
                    Err(BarchError::io_at(io::Error::other(msg), &job.input))
                });
            if tx.send(JobOutcome { id, job, result }).is_err() {
                warn!("job {} finished but nobody is listening", id);
            }
        })
        .map_err(BarchError::from)
}

/// A single job running on its own thread.
pub struct JobHandle {
    id: JobId,
    rx: Receiver<JobOutcome>,
    thread: thread::JoinHandle<()>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Blocks until the job reports. A panic inside the job is reported as
    /// an error outcome; `None` only if the channel was torn down.
    pub fn wait(self) -> Option<JobOutcome> {
        let outcome = self.rx.recv().ok();
        let _ = self.thread.join();
        outcome
    }
}

/// Starts `job` on a new thread.
pub fn spawn(id: JobId, job: Job) -> Result<JobHandle> {
    let (tx, rx) = bounded(1);
    let thread = spawn_worker(id, job, tx, Job::run)?;
    Ok(JobHandle { id, rx, thread })
}

/// Many jobs, one completion channel.
pub struct JobQueue {
    tx: Sender<JobOutcome>,
    rx: Receiver<JobOutcome>,
    in_flight: usize,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        JobQueue {
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn submit(&mut self, id: JobId, job: Job) -> Result<()> {
        self.submit_with(id, job, Job::run)
    }

    fn submit_with<F>(&mut self, id: JobId, job: Job, work: F) -> Result<()>
    where
        F: FnOnce(&Job) -> Result<PathBuf> + Send + 'static,
    {
        // detached: completion is observed through the channel
        let _worker = spawn_worker(id, job, self.tx.clone(), work)?;
        self.in_flight += 1;
        Ok(())
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Returns a finished outcome if one is ready.
    pub fn try_recv(&mut self) -> Option<JobOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => {
                self.in_flight -= 1;
                Some(outcome)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks for the next outcome; `None` once nothing is in flight.
    pub fn recv(&mut self) -> Option<JobOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.rx.recv().ok()?;
        self.in_flight -= 1;
        Some(outcome)
    }
}

/// Encodes independent images, in parallel when the `rayon` feature is on.
pub fn encode_batch(images: &[RawImage]) -> Vec<Result<Vec<u8>>> {
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        images.par_iter().map(encode).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        images.iter().map(encode).collect()
    }
}

/// Decodes independent byte streams, in parallel when the `rayon` feature is on.
pub fn decode_batch(files: &[&[u8]]) -> Vec<Result<RawImage>> {
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        files.par_iter().map(|bytes| decode(bytes)).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        files.iter().map(|bytes| decode(bytes)).collect()
    }
}
