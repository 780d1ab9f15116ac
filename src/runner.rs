//! Running registered runnable components.

use crate::error::{BoxError, RunError};
use crate::resolver::Resolver;
use std::sync::Arc;
use tracing::debug;

/// A component that can be run, e.g. a server loop or a worker.
pub trait Runnable: Send + Sync {
    fn run(&self) -> Result<(), BoxError>;
}

/// Component type to declare for runnables: factories return a
/// [RunnablePtr] and [run] resolves them all.
pub type RunnablePtr = Arc<dyn Runnable>;

/// Adapter turning a closure into a [Runnable].
pub struct RunnableFn<F>(F);

impl<F: Fn() -> Result<(), BoxError> + Send + Sync> RunnableFn<F> {
    pub fn new(run: F) -> Self {
        Self(run)
    }
}

impl<F: Fn() -> Result<(), BoxError> + Send + Sync> Runnable for RunnableFn<F> {
    fn run(&self) -> Result<(), BoxError> {
        (self.0)()
    }
}

/// Resolves every registered [RunnablePtr] component and runs them
/// concurrently, blocking until all finish. Failures are joined; having no
/// runnables registered is not an error.
pub fn run(resolver: &Resolver) -> Result<(), BoxError> {
    let runnables = resolver.resolve_all::<RunnablePtr>()?;
    if runnables.is_empty() {
        return Ok(());
    }

    debug!(count = runnables.len(), "running runnables");
    run_all(&runnables).map_err(Into::into)
}

/// Runs the given runnables concurrently and waits for all of them.
pub fn run_all(runnables: &[Arc<RunnablePtr>]) -> Result<(), RunError> {
    let failures: Vec<BoxError> = std::thread::scope(|scope| {
        let handles: Vec<_> = runnables
            .iter()
            .map(|runnable| scope.spawn(move || runnable.run()))
            .collect();

        handles
            .into_iter()
            .filter_map(|handle| match handle.join() {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some(error),
                Err(_) => Some("runnable panicked".into()),
            })
            .collect()
    });

    if failures.is_empty() {
        Ok(())
    } else {
        Err(RunError::new(failures))
    }
}
