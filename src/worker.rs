//! Background dispatch of colorization jobs
//!
//! The pipeline is CPU-bound and blocking, so jobs run on Tokio's blocking
//! pool. A semaphore bounds how many pipelines run at once (one by default).
//! Callers get a `JoinHandle` back immediately, can update whatever they
//! display, and await the result afterwards. Dropping the handle abandons the
//! result but does not interrupt a forward pass already in progress.

use crate::{
    error::{ColorizeError, Result},
    processor::{self, ModelState},
    types::ColorizationResult,
};
use image::DynamicImage;
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

/// Runs colorization jobs against a shared [`ModelState`]
#[derive(Debug, Clone)]
pub struct ColorizeWorker {
    state: Arc<ModelState>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl ColorizeWorker {
    /// Create a worker allowing at most `max_concurrent` pipelines in flight
    ///
    /// # Errors
    ///
    /// Returns `ColorizeError::InvalidConfig` when `max_concurrent` is zero.
    pub fn new(state: Arc<ModelState>, max_concurrent: usize) -> Result<Self> {
        if max_concurrent == 0 {
            return Err(ColorizeError::config_value_error(
                "max concurrent jobs",
                max_concurrent,
                ">= 1",
                Some(1),
            ));
        }

        Ok(Self {
            state,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    /// Queue an in-memory image; must be called from within a Tokio runtime
    pub fn submit(&self, image: DynamicImage) -> JoinHandle<Result<ColorizationResult>> {
        self.spawn_job(move |state| processor::colorize(state, &image))
    }

    /// Queue an image file; must be called from within a Tokio runtime
    pub fn submit_file<P: Into<PathBuf>>(&self, path: P) -> JoinHandle<Result<ColorizationResult>> {
        let path = path.into();
        self.spawn_job(move |state| processor::colorize_file(state, &path))
    }

    /// Colorize an image in the background and wait for the result
    pub async fn colorize(&self, image: DynamicImage) -> Result<ColorizationResult> {
        self.submit(image).await.map_err(join_error)?
    }

    /// Colorize an image file in the background and wait for the result
    pub async fn colorize_file<P: AsRef<Path>>(&self, path: P) -> Result<ColorizationResult> {
        self.submit_file(path.as_ref())
            .await
            .map_err(join_error)?
    }

    #[must_use]
    pub fn state(&self) -> &Arc<ModelState> {
        &self.state
    }

    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    fn spawn_job<F>(&self, job: F) -> JoinHandle<Result<ColorizationResult>>
    where
        F: FnOnce(&ModelState) -> Result<ColorizationResult> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| ColorizeError::internal(format!("Worker semaphore closed: {e}")))?;
            debug!("Colorization job started");

            tokio::task::spawn_blocking(move || job(&state))
                .await
                .map_err(join_error)?
        })
    }
}

fn join_error(e: JoinError) -> ColorizeError {
    if e.is_panic() {
        ColorizeError::internal("Colorization job panicked")
    } else {
        ColorizeError::internal(format!("Colorization job did not complete: {e}"))
    }
}
