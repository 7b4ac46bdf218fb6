use std::future::Future;
use std::pin::Pin;

use quill_registry::{CommitCost, CommitReceipt};

use crate::error::ChainResult;

/// Boxed future used by task phases.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Side-channel results accumulated while a task executes.
///
/// Visible to the caller after `execute()` returns; composed tasks share one
/// context, so a stage layered on top of a registry commit still sees the
/// commit's receipt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskContext {
    /// Receipt of the registry commit performed by this task, if any.
    pub commit: Option<CommitReceipt>,
}

impl TaskContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold another context's results into this one.
    pub fn absorb(&mut self, other: TaskContext) {
        if other.commit.is_some() {
            self.commit = other.commit;
        }
    }
}

/// The outcome of an executed task: its value plus the final context.
#[derive(Clone, Debug)]
pub struct TaskReport<T> {
    /// The operation's result.
    pub value: T,
    /// Side-channel results accumulated during execution.
    pub context: TaskContext,
}

type EstimateFn = Box<dyn Fn() -> BoxFuture<'static, ChainResult<CommitCost>> + Send>;
type ExecuteFn<T> =
    Box<dyn FnOnce(TaskContext) -> BoxFuture<'static, ChainResult<(T, TaskContext)>> + Send>;

/// A two-phase operation envelope.
///
/// `estimate()` previews the commit cost without side effects and may be
/// called any number of times; `execute()` consumes the task, runs the
/// operation, and reports the result together with the final context.
pub struct Task<T> {
    context: TaskContext,
    estimate: EstimateFn,
    execute: ExecuteFn<T>,
}

impl<T: Send + 'static> Task<T> {
    /// Build a task from its two phases.
    pub fn new<E, EFut, X, XFut>(estimate: E, execute: X) -> Self
    where
        E: Fn() -> EFut + Send + 'static,
        EFut: Future<Output = ChainResult<CommitCost>> + Send + 'static,
        X: FnOnce(TaskContext) -> XFut + Send + 'static,
        XFut: Future<Output = ChainResult<(T, TaskContext)>> + Send + 'static,
    {
        Self {
            context: TaskContext::new(),
            estimate: Box::new(move || Box::pin(estimate())),
            execute: Box::new(move |ctx| Box::pin(execute(ctx))),
        }
    }

    /// The context the execute phase will start from.
    pub fn context(&self) -> &TaskContext {
        &self.context
    }

    /// Estimate the commit cost. No side effects.
    pub async fn estimate(&self) -> ChainResult<CommitCost> {
        (self.estimate)().await
    }

    /// Run the operation.
    pub async fn execute(self) -> ChainResult<TaskReport<T>> {
        let (value, context) = (self.execute)(self.context).await?;
        Ok(TaskReport { value, context })
    }

    /// Decorate this task with a result transformation.
    ///
    /// Estimation and context are delegated to the base task unchanged; only
    /// the executed value is mapped.
    pub fn map<U, F>(self, transform: F) -> Task<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let Task {
            context,
            estimate,
            execute,
        } = self;
        Task {
            context,
            estimate,
            execute: Box::new(move |ctx| {
                Box::pin(async move {
                    let (value, ctx) = execute(ctx).await?;
                    Ok((transform(value), ctx))
                })
            }),
        }
    }

    /// Decorate this task with a second async stage.
    ///
    /// The stage runs after the base execute phase and sees — and may
    /// update — the same context; estimation is delegated to the base task.
    pub fn and_then<U, F, Fut>(self, stage: F) -> Task<U>
    where
        U: Send + 'static,
        F: FnOnce(T, TaskContext) -> Fut + Send + 'static,
        Fut: Future<Output = ChainResult<(U, TaskContext)>> + Send + 'static,
    {
        let Task {
            context,
            estimate,
            execute,
        } = self;
        Task {
            context,
            estimate,
            execute: Box::new(move |ctx| {
                Box::pin(async move {
                    let (value, ctx) = execute(ctx).await?;
                    stage(value, ctx).await
                })
            }),
        }
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("context", &self.context).finish()
    }
}
