//! Keyed query/mutation slots with invalidation
//!
//! The caching layer the view drives: a `Query` caches the result of a read
//! under a fixed operation key until invalidated, a `Mutation` tracks
//! in-flight writes and reports each completion exactly once. Callers spawn
//! the network call as a tokio task and hand the handle over; the event loop
//! resolves finished handles on ticks.

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::ApiError;

type TaskResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum QueryState<T> {
    Idle,
    Ready(T),
    Failed(ApiError),
}

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub refetch_on_focus: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            refetch_on_focus: true,
        }
    }
}

/// A cache slot for one read operation.
///
/// Cached data stays visible while a refetch is in flight; `is_loading` is
/// only true when there is nothing cached to show yet.
#[derive(Debug)]
pub struct Query<T> {
    key: &'static str,
    options: QueryOptions,
    state: QueryState<T>,
    stale: bool,
    task: Option<JoinHandle<TaskResult<T>>>,
}

impl<T> Query<T> {
    pub fn new(key: &'static str, options: QueryOptions) -> Self {
        Self {
            key,
            options,
            state: QueryState::Idle,
            stale: true,
            task: None,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Marks the cached result stale. The event loop schedules one refetch
    /// on the next tick.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Terminal focus regained. Honors the per-query option.
    pub fn on_focus(&mut self) {
        if self.options.refetch_on_focus {
            self.stale = true;
        }
    }

    pub fn needs_fetch(&self) -> bool {
        self.stale && self.task.is_none()
    }

    /// Installs a newly spawned fetch task and clears staleness. A replaced
    /// task is aborted so an older response cannot land after a newer one.
    pub fn begin(&mut self, task: JoinHandle<TaskResult<T>>) {
        if let Some(old) = self.task.replace(task) {
            old.abort();
        }
        self.stale = false;
    }

    /// Resolves a finished fetch into the slot. Returns true when the slot
    /// changed and the view should redraw.
    pub async fn poll(&mut self) -> bool {
        if !self.task.as_ref().is_some_and(|task| task.is_finished()) {
            return false;
        }
        let Some(task) = self.task.take() else {
            return false;
        };

        match task.await {
            Ok(Ok(data)) => {
                self.state = QueryState::Ready(data);
                true
            }
            Ok(Err(err)) => {
                tracing::warn!(key = self.key, error = %err, "query failed");
                self.state = QueryState::Failed(err);
                true
            }
            Err(err) => {
                tracing::error!(key = self.key, error = %err, "query task died");
                self.stale = true;
                false
            }
        }
    }

    pub fn data(&self) -> Option<&T> {
        match &self.state {
            QueryState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match &self.state {
            QueryState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.task.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.task.is_some() && self.data().is_none()
    }
}

/// In-flight writes for one operation key.
///
/// Each task may carry a tag (the client-generated id of an optimistic echo)
/// so the caller can reconcile local state when the write settles.
#[derive(Debug)]
pub struct Mutation<T> {
    key: &'static str,
    tasks: Vec<(Option<Uuid>, JoinHandle<TaskResult<T>>)>,
}

impl<T> Mutation<T> {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            tasks: Vec::new(),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn begin(&mut self, tag: Option<Uuid>, task: JoinHandle<TaskResult<T>>) {
        self.tasks.push((tag, task));
    }

    pub fn is_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Drains finished tasks, yielding each completion exactly once.
    pub async fn poll(&mut self) -> Vec<(Option<Uuid>, TaskResult<T>)> {
        let mut done = Vec::new();
        let mut in_flight = Vec::new();

        for (tag, task) in self.tasks.drain(..) {
            if !task.is_finished() {
                in_flight.push((tag, task));
                continue;
            }
            match task.await {
                Ok(result) => done.push((tag, result)),
                Err(err) => {
                    tracing::error!(key = self.key, error = %err, "mutation task died");
                }
            }
        }

        self.tasks = in_flight;
        done
    }
}
