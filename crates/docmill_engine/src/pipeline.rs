//! The AST persistence pipeline.
//!
//! A single-admission, backpressured write stage: one writer thread behind a
//! rendezvous channel. `submit` of the next job can only complete once the
//! previous job's file has been fully written, flushed and closed, so at
//! most one job is ever in flight and the producer is throttled by the
//! writer. Any failure at any stage is fatal; partial AST dumps indicate an
//! unrecoverable environment fault, not something to retry.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, SyncSender};
use std::thread::JoinHandle;

use relative_path::RelativePathBuf;
use tracing::{debug, error};

use docmill_base::{DocmillError, DocmillResult, ErrorKind};

use crate::driver::Ast;

/// One unit of persistence work: exactly one source file's AST.
#[derive(Debug)]
pub struct AstJob {
    /// Path relative to the resolved source root; determines the archive
    /// location under `<destination>/ast/source/`.
    pub relative_path: RelativePathBuf,
    pub ast: Ast,
}

/// Handle to the running pipeline. The driver must call [`AstPipeline::close`]
/// after submitting all jobs; its return is the drain signal.
#[derive(Debug)]
pub struct AstPipeline {
    sender: Option<SyncSender<AstJob>>,
    worker: Option<JoinHandle<DocmillResult<()>>>,
}

impl AstPipeline {
    /// Spawn the writer thread. Jobs are archived under
    /// `<destination>/ast/source/<relative-path>.json`.
    pub fn start(destination: &Path) -> DocmillResult<Self> {
        let archive_root = destination.join("ast").join("source");
        // Capacity 0 makes the channel a rendezvous point: a send completes
        // only when the worker is ready for the next job.
        let (sender, receiver) = mpsc::sync_channel::<AstJob>(0);
        let worker = std::thread::Builder::new()
            .name("ast-writer".to_string())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    write_job(&archive_root, &job)?;
                }
                Ok(())
            })
            .map_err(|source| {
                Box::new(DocmillError::message(format!(
                    "failed to spawn AST writer thread: {}",
                    source
                )))
            })?;
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Submit a job, blocking while another job is still in flight.
    ///
    /// If the writer has already failed, the failure that stopped it is
    /// returned here.
    pub fn submit(&mut self, job: AstJob) -> DocmillResult<()> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(Box::new(DocmillError::message(
                "AST pipeline already closed",
            )));
        };
        debug!(path = %job.relative_path, "submitting AST persistence job");
        if sender.send(job).is_err() {
            return Err(self.harvest());
        }
        Ok(())
    }

    /// Close the pipeline and wait for it to drain. Returns the writer's
    /// failure if any job could not be persisted.
    pub fn close(mut self) -> DocmillResult<()> {
        // Dropping the sender lets the worker run out of jobs and exit.
        self.sender = None;
        match self.worker.take() {
            Some(worker) => join_worker(worker),
            None => Ok(()),
        }
    }

    /// Collect the terminal state of a worker that stopped early.
    fn harvest(&mut self) -> Box<DocmillError> {
        self.sender = None;
        match self.worker.take() {
            Some(worker) => match join_worker(worker) {
                Ok(()) => Box::new(DocmillError::message("AST pipeline stopped unexpectedly")),
                Err(error) => error,
            },
            None => Box::new(DocmillError::message("AST pipeline already closed")),
        }
    }
}

fn join_worker(worker: JoinHandle<DocmillResult<()>>) -> DocmillResult<()> {
    match worker.join() {
        Ok(result) => result,
        Err(_) => Err(Box::new(DocmillError::message("AST writer thread panicked"))),
    }
}

/// Persist one AST. The serialized form is streamed into the file rather
/// than materialized in memory first, bounding peak memory for large ASTs.
fn write_job(archive_root: &Path, job: &AstJob) -> DocmillResult<()> {
    let target = RelativePathBuf::from(format!("{}.json", job.relative_path))
        .to_path(archive_root);

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|source| fatal(parent.to_path_buf(), source))?;
    }
    let file = fs::File::create(&target).map_err(|source| fatal(target.clone(), source))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &job.ast).map_err(|serialize_error| {
        error!(target = %target.display(), "failed to serialize AST: {}", serialize_error);
        Box::new(DocmillError::message(format!(
            "failed to serialize AST to {}: {}",
            target.display(),
            serialize_error
        )))
    })?;
    writer
        .flush()
        .map_err(|source| fatal(target.clone(), source))?;
    debug!(target = %target.display(), "AST persisted");
    Ok(())
}

fn fatal(path: PathBuf, source: std::io::Error) -> Box<DocmillError> {
    error!(path = %path.display(), "AST persistence failed: {}", source);
    Box::new(DocmillError::new(ErrorKind::File { path, source }))
}
