use crate::config::MAX_THREADS;
use crate::error::{FilexError, Result};
use crate::pipeline::aggregator::{Aggregator, Fingerprint, FilterResult};
use crate::pipeline::line_filter::LineFilter;
use crate::scanner::FileTask;
use crate::ui::GracefulShutdown;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub type FileCallback = Arc<dyn Fn(&FileTask) + Send + Sync>;

/// Bounded pool of blocking workers. The dispatcher acquires one of N
/// semaphore permits per task before handing it to `spawn_blocking`, so at
/// most N files are in flight at any time.
pub struct WorkerPool {
    threads: usize,
    max_lines: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.clamp(1, MAX_THREADS),
            max_lines: 0,
        }
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Dispatches every task to a worker and waits for all of them. The
    /// shutdown flag is consulted between files: queued tasks are abandoned
    /// on cancellation while in-flight reads run to completion.
    pub async fn run(
        &self,
        tasks: Vec<FileTask>,
        filter: Arc<LineFilter>,
        aggregator: Arc<Aggregator>,
        shutdown: &GracefulShutdown,
        on_file_done: Option<FileCallback>,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.threads));
        let mut handles = Vec::with_capacity(tasks.len());
        let max_lines = self.max_lines;
        let mut cancelled = false;

        for task in tasks {
            if !shutdown.is_running() {
                cancelled = true;
                break;
            }

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    cancelled = true;
                    break;
                }
            };

            let filter = filter.clone();
            let aggregator = aggregator.clone();
            let shutdown = shutdown.clone();
            let callback = on_file_done.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;

                // A worker holding a queued task exits without starting it
                // once cancellation is requested.
                if !shutdown.is_running() {
                    return;
                }

                match process_task(&task, &filter, max_lines) {
                    Ok(result) => aggregator.record(result),
                    Err(err) => {
                        aggregator.record_failure(task.display_path.clone(), err.to_string())
                    }
                }

                if let Some(callback) = callback {
                    callback(&task);
                }
            }));
        }

        for handle in handles {
            handle.await.map_err(|e| FilexError::Config {
                message: format!("Worker task panicked: {}", e),
            })?;
        }

        if cancelled || !shutdown.is_running() {
            return Err(FilexError::Cancelled);
        }

        Ok(())
    }
}

/// Processes a single file: full-content fingerprint first, then the line
/// filter over the decoded text, preserving input order.
pub fn process_task(task: &FileTask, filter: &LineFilter, max_lines: usize) -> Result<FilterResult> {
    let bytes = std::fs::read(&task.source_path).map_err(|e| FilexError::Read {
        path: task.display_path.clone(),
        message: e.to_string(),
    })?;

    let fingerprint = Fingerprint::of_bytes(&bytes);
    let text = decode_text(&bytes);

    let mut lines = Vec::new();
    let mut total_lines = 0usize;

    for line in text.lines() {
        total_lines += 1;
        if !filter.matches(line) {
            continue;
        }
        if max_lines > 0 && lines.len() >= max_lines {
            continue;
        }
        lines.push(line.to_string());
    }

    Ok(FilterResult {
        display_path: task.display_path.clone(),
        index: task.index,
        lines,
        total_lines,
        bytes: bytes.len() as u64,
        fingerprint,
    })
}

/// UTF-8 first, then Latin-1. Latin-1 maps every byte, so decoding itself
/// never fails; unreadable files surface as IO errors instead.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
