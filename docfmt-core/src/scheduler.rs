//! UI-affine and background executors.
//!
//! UI state (document resolution, transactions, the advisory gate) is only touched
//! from jobs running on the [`UiExecutor`] thread. Those jobs receive a
//! [`UiContext`], which cannot leave the thread, and UI-affine APIs take it as a
//! parameter. Expensive work is handed to the [`BackgroundExecutor`]; the UI job
//! blocks until it finishes, so a command never re-enters itself.

use std::future::Future;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::error::PipelineError;

type Job = Box<dyn FnOnce(&UiContext) + Send>;

/// Proof that the caller runs on the UI executor thread.
pub struct UiContext {
    _not_send: PhantomData<*const ()>,
}

impl UiContext {
    fn new() -> Self {
        Self {
            _not_send: PhantomData,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("the UI executor has shut down")]
    UiClosed,
    #[error("blocking call into the UI executor from its own thread")]
    Reentrant,
    #[error("failed to start the UI thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Single-threaded task queue standing in for the editor's UI thread.
pub struct UiExecutor {
    sender: Option<mpsc::UnboundedSender<Job>>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl UiExecutor {
    pub fn spawn() -> Result<Self, SchedulerError> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let thread = thread::Builder::new()
            .name("docfmt-ui".to_string())
            .spawn(move || {
                let ui = UiContext::new();
                while let Some(job) = receiver.blocking_recv() {
                    if panic::catch_unwind(AssertUnwindSafe(|| job(&ui))).is_err() {
                        error!("[UI] Job panicked; UI executor keeps running");
                    }
                }
                debug!("[UI] Job queue closed, UI thread exiting");
            })?;
        let thread_id = thread.thread().id();
        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
            thread_id,
        })
    }

    fn submit<F, R>(&self, f: F) -> Result<oneshot::Receiver<R>, SchedulerError>
    where
        F: FnOnce(&UiContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |ui| {
            let _ = tx.send(f(ui));
        });
        self.sender
            .as_ref()
            .ok_or(SchedulerError::UiClosed)?
            .send(job)
            .map_err(|_| SchedulerError::UiClosed)?;
        Ok(rx)
    }

    /// Runs `f` on the UI thread and blocks the calling thread for its result.
    ///
    /// Must not be called from inside an async task; use [`UiExecutor::run`] there.
    pub fn invoke<F, R>(&self, f: F) -> Result<R, SchedulerError>
    where
        F: FnOnce(&UiContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        if thread::current().id() == self.thread_id {
            return Err(SchedulerError::Reentrant);
        }
        self.submit(f)?
            .blocking_recv()
            .map_err(|_| SchedulerError::UiClosed)
    }

    /// Runs `f` on the UI thread and awaits its result.
    pub async fn run<F, R>(&self, f: F) -> Result<R, SchedulerError>
    where
        F: FnOnce(&UiContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.submit(f)?.await.map_err(|_| SchedulerError::UiClosed)
    }
}

impl Drop for UiExecutor {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("[UI] UI thread terminated abnormally");
            }
        }
    }
}

/// Runs suspension points on a tokio runtime while the UI thread waits.
#[derive(Debug, Clone)]
pub struct BackgroundExecutor {
    handle: Handle,
}

impl BackgroundExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running in.
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> {
        Handle::try_current().map(Self::new)
    }

    /// Spawns `future` on the runtime and blocks the UI thread until it resolves.
    ///
    /// A task dropped by runtime shutdown counts as cancelled; a panicking task
    /// resumes its panic on the UI thread.
    pub fn wait<T, F>(&self, _ui: &UiContext, future: F) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, PipelineError>> + Send + 'static,
        T: Send + 'static,
    {
        let task = self.handle.spawn(future);
        match self.handle.block_on(task) {
            Ok(result) => result,
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(_) => Err(PipelineError::Cancelled),
        }
    }
}
