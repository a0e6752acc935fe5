//! # Booking Engine Runtime
//!
//! The imperative shell around the booking reducers.
//!
//! ## Core Components
//!
//! - **Effect Executor**: Executes effect descriptions, feeds produced actions
//!   back through a dispatcher and tracks cancellable effects by id
//! - **Keyed Locks**: One async lock per key, so commands against the same
//!   booking are serialized while different bookings proceed independently
//! - **Retry**: Exponential backoff with a per-attempt timeout for every
//!   collaborator call
//!
//! ## Example
//!
//! ```ignore
//! use booking_engine_runtime::{EffectExecutor, KeyedLocks};
//!
//! let guard = locks.lock(&booking_id).await;
//! let effects = machine.reduce(&mut slot, action, &env);
//! executor.execute_all(effects);
//! drop(guard);
//! ```

/// Effect interpretation and cancellation registry
pub mod executor;

/// Per-key async mutual exclusion
pub mod locks;

/// Retry logic with exponential backoff
pub mod retry;

pub use executor::{BoxedTask, Dispatch, EffectExecutor, TaskRegistry};
pub use locks::{KeyedGuard, KeyedLocks};
pub use retry::{RetryError, RetryPolicy, RetryPolicyBuilder, retry_with_backoff, retry_with_predicate};
