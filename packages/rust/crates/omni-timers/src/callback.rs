//! Callback abstraction run by a job manager's worker loop.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::job::JobId;
use crate::manager::JobManager;
use crate::window::{Window, WindowId};

type CallbackFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Action invoked when a job comes due. Opaque to the scheduler.
///
/// An `Err` (or a panic) is reported to the client's error sink; the job is
/// still removed or rescheduled as usual.
#[async_trait]
pub trait JobCallback: Send + Sync {
    /// Run one invocation.
    async fn run(&self, ctx: JobContext) -> anyhow::Result<()>;
}

struct FnCallback {
    f: Box<dyn Fn(JobContext) -> CallbackFuture + Send + Sync>,
}

#[async_trait]
impl JobCallback for FnCallback {
    async fn run(&self, ctx: JobContext) -> anyhow::Result<()> {
        (self.f)(ctx).await
    }
}

/// Wrap an async closure as a [`JobCallback`].
///
/// The closure is called once per run, so interval callbacks clone whatever
/// they capture before moving it into the returned future.
pub fn callback_fn<F, Fut>(f: F) -> Arc<dyn JobCallback>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(FnCallback {
        f: Box::new(move |ctx| Box::pin(f(ctx))),
    })
}

/// Handed to each callback invocation.
#[derive(Clone)]
pub struct JobContext {
    job_id: JobId,
    manager: Arc<JobManager>,
}

impl JobContext {
    pub(crate) fn new(job_id: JobId, manager: Arc<JobManager>) -> Self {
        Self { job_id, manager }
    }

    /// Job being run.
    #[must_use]
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Window that owns the job.
    #[must_use]
    pub fn window_id(&self) -> WindowId {
        self.manager.window_id()
    }

    /// Owning window, if it has not been dropped.
    #[must_use]
    pub fn window(&self) -> Option<Arc<Window>> {
        self.manager.window()
    }

    /// Manager running this job; valid even after the window closed.
    #[must_use]
    pub fn job_manager(&self) -> &Arc<JobManager> {
        &self.manager
    }

    /// Cancel the running job (e.g. `clearInterval` from inside the tick).
    /// The current invocation completes; the job is not rescheduled.
    pub fn cancel_self(&self) -> bool {
        self.manager.cancel(self.job_id)
    }
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("job_id", &self.job_id)
            .field("window", &self.manager.window_id())
            .finish()
    }
}
