//! # Function-backed runner (`RunnerFn`)
//!
//! [`RunnerFn`] wraps a closure `F: Fn(RunScope) -> Fut`, producing a fresh
//! future per run. Handy for tests and for small phases that need no state of
//! their own; if state must be shared, capture an `Arc<...>` explicitly.
//!
//! ## Example
//! ```rust
//! use discovisor::{Event, RunScope, RunnerFn, RunnerRef};
//!
//! let r: RunnerRef = RunnerFn::arc("lookup", |scope: RunScope| async move {
//!     if !scope.is_stopped() {
//!         scope.report(Event::ClusterUndefined);
//!     }
//! });
//!
//! assert_eq!(r.name(), "lookup");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::runner::{RunScope, Runner};

/// Function-backed runner implementation.
pub struct RunnerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> RunnerFn<F> {
    /// Creates a new function-backed runner.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the runner and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Runner for RunnerFn<F>
where
    F: Fn(RunScope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, scope: RunScope) {
        (self.f)(scope).await
    }
}
