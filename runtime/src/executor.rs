//! Effect execution.
//!
//! [`EffectExecutor`] interprets the effect descriptions returned by reducers:
//! futures and delays are spawned onto the Tokio runtime, actions they produce
//! are fed back through a dispatch function, and [`Effect::Cancellable`]
//! effects are tracked in a registry so a later [`Effect::Cancel`] can abort
//! them.
//!
//! Fed-back actions are always dispatched on a fresh task. Cancelling a
//! delayed effect therefore only ever cancels the *wait*; an action that has
//! already been handed to the dispatcher runs to completion.

use booking_engine_core::effect::{Effect, EffectId};
use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::AbortHandle;

/// Boxed, sendable unit future.
pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Function that feeds an action produced by an effect back into the system.
pub type Dispatch<A> = Arc<dyn Fn(A) -> BoxedTask + Send + Sync>;

/// Registry of running cancellable effects, keyed by [`EffectId`].
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<EffectId, (u64, AbortHandle)>>,
    generation: AtomicU64,
}

impl TaskRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` under `id`, aborting any task previously registered there.
    pub fn spawn(self: &Arc<Self>, id: EffectId, task: BoxedTask) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(self);
        let finished_id = id.clone();

        // Hold the map while spawning so the task cannot deregister itself
        // before it has been registered.
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = tokio::spawn(async move {
            task.await;
            registry.finish(&finished_id, generation);
        })
        .abort_handle();

        if let Some((_, previous)) = tasks.insert(id.clone(), (generation, handle)) {
            tracing::debug!(effect_id = %id, "Replacing pending cancellable effect");
            previous.abort();
        }
    }

    /// Abort the task registered under `id`. Returns whether one was pending.
    pub fn cancel(&self, id: &EffectId) -> bool {
        let removed = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        match removed {
            Some((_, handle)) => {
                handle.abort();
                tracing::debug!(effect_id = %id, "Cancelled pending effect");
                true
            },
            None => false,
        }
    }

    /// Abort every pending task. Returns how many were aborted.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (_, (_, handle)) in &drained {
            handle.abort();
        }
        drained.len()
    }

    /// Whether a task is pending under `id`.
    #[must_use]
    pub fn is_pending(&self, id: &EffectId) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no task is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn finish(&self, id: &EffectId, generation: u64) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.get(id).is_some_and(|(current, _)| *current == generation) {
            tasks.remove(id);
        }
    }
}

/// Interprets [`Effect`] descriptions.
pub struct EffectExecutor<A> {
    dispatch: Dispatch<A>,
    registry: Arc<TaskRegistry>,
}

impl<A> Clone for EffectExecutor<A> {
    fn clone(&self) -> Self {
        Self {
            dispatch: Arc::clone(&self.dispatch),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<A> std::fmt::Debug for EffectExecutor<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectExecutor")
            .field("pending", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl<A> EffectExecutor<A>
where
    A: Send + 'static,
{
    /// Create an executor that feeds produced actions into `dispatch`.
    #[must_use]
    pub fn new(dispatch: Dispatch<A>) -> Self {
        Self {
            dispatch,
            registry: Arc::new(TaskRegistry::new()),
        }
    }

    /// The registry of cancellable effects.
    #[must_use]
    pub const fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Execute `effect` in the background.
    ///
    /// `Cancel` is applied immediately, before this call returns, so a
    /// cancellation issued by a reducer is in force as soon as the command
    /// that produced it finishes.
    pub fn execute(&self, effect: Effect<A>) {
        match effect {
            Effect::None => {
                metrics::counter!("booking_runtime_effects_total", "type" => "none").increment(1);
            },
            Effect::Cancel(id) => {
                metrics::counter!("booking_runtime_effects_total", "type" => "cancel").increment(1);
                self.registry.cancel(&id);
            },
            Effect::Cancellable { id, effect } => {
                metrics::counter!("booking_runtime_effects_total", "type" => "cancellable")
                    .increment(1);
                self.registry.spawn(id, self.run(*effect));
            },
            other => {
                tokio::spawn(self.run(other));
            },
        }
    }

    /// Execute every effect in `effects`.
    pub fn execute_all(&self, effects: impl IntoIterator<Item = Effect<A>>) {
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Cancel all pending cancellable effects.
    pub fn cancel_all(&self) -> usize {
        self.registry.cancel_all()
    }

    fn feed_back(&self, action: A) {
        tokio::spawn((self.dispatch)(action));
    }

    fn run(&self, effect: Effect<A>) -> BoxedTask {
        let executor = self.clone();
        Box::pin(async move {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => {
                    metrics::counter!("booking_runtime_effects_total", "type" => "future")
                        .increment(1);
                    if let Some(action) = fut.await {
                        tracing::trace!("Effect::Future produced an action");
                        executor.feed_back(action);
                    }
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("booking_runtime_effects_total", "type" => "delay")
                        .increment(1);
                    tokio::time::sleep(duration).await;
                    tracing::trace!(delay_ms = duration.as_millis(), "Effect::Delay elapsed");
                    executor.feed_back(*action);
                },
                Effect::Parallel(effects) => {
                    join_all(effects.into_iter().map(|e| executor.run(e))).await;
                },
                Effect::Sequential(effects) => {
                    for effect in effects {
                        executor.run(effect).await;
                    }
                },
                Effect::Cancellable { id, effect } => {
                    executor.registry.spawn(id, executor.run(*effect));
                },
                Effect::Cancel(id) => {
                    executor.registry.cancel(&id);
                },
            }
        })
    }
}
