//! Tool-call middleware chain: observers invoked around every tool call,
//! used to forward sub-agent activity onto the Event Bus without coupling
//! the scheduler to it directly. Grounded on
//! `original_source/agent/middleware/subagent_monitor.py`'s
//! `SubAgentToolMonitor` (step counter, truncated-result callback,
//! exceptions swallowed so a broken observer never fails the call).

use dagctl_core::tool_call::RESULT_PREVIEW_CHARS;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// An observer notified before and after every tool call. Implementations
/// must not panic; any error should be logged and swallowed.
pub trait ToolMiddleware: Send + Sync {
    fn before_call(&self, _step: usize, _tool: &str, _params: &Value) {}
    fn after_call(&self, _step: usize, _tool: &str, _result_preview: &str) {}
}

/// Runs a list of middlewares in order, assigning each call a
/// monotonically increasing step number.
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn ToolMiddleware>>,
    step: AtomicUsize,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self { middlewares: Vec::new(), step: AtomicUsize::new(0) }
    }

    pub fn add(&mut self, middleware: Box<dyn ToolMiddleware>) {
        self.middlewares.push(middleware);
    }

    /// Notify all middlewares that a call is about to run, returning the
    /// step index assigned to it.
    pub fn notify_before(&self, tool: &str, params: &Value) -> usize {
        let step = self.step.fetch_add(1, Ordering::SeqCst);
        for mw in &self.middlewares {
            mw.before_call(step, tool, params);
        }
        step
    }

    pub fn notify_after(&self, step: usize, tool: &str, result: &Value) {
        let preview = truncate_preview(&result.to_string());
        for mw in &self.middlewares {
            mw.after_call(step, tool, &preview);
        }
    }
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() > RESULT_PREVIEW_CHARS {
        text.chars().take(RESULT_PREVIEW_CHARS).collect()
    } else {
        text.to_string()
    }
}

/// A mutable, atomically-swappable callback holder so one long-lived
/// middleware instance can forward to whichever turn is currently
/// streaming. Mirrors `SubAgentCallbackHolder`.
pub struct CallbackHolder<F: ?Sized> {
    callback: parking_lot::Mutex<Option<Box<F>>>,
}

impl<F: ?Sized> Default for CallbackHolder<F> {
    fn default() -> Self {
        Self { callback: parking_lot::Mutex::new(None) }
    }
}

impl<F: ?Sized> CallbackHolder<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, callback: Box<F>) {
        *self.callback.lock() = Some(callback);
    }

    pub fn clear(&self) {
        *self.callback.lock() = None;
    }

    pub fn is_set(&self) -> bool {
        self.callback.lock().is_some()
    }
}

impl CallbackHolder<dyn Fn(usize, &str, &str) + Send + Sync> {
    /// Invoke the current callback if set. Errors from the callback are
    /// logged and swallowed, matching the original's broad `except`.
    pub fn invoke(&self, step: usize, tool: &str, preview: &str) {
        if let Some(cb) = self.callback.lock().as_ref() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(step, tool, preview)));
            if result.is_err() {
                warn!(tool, step, "sub-agent callback panicked, swallowing");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;
    use std::sync::Arc;

    struct CountingMiddleware {
        before_count: Arc<StdAtomicUsize>,
        after_count: Arc<StdAtomicUsize>,
    }

    impl ToolMiddleware for CountingMiddleware {
        fn before_call(&self, _step: usize, _tool: &str, _params: &Value) {
            self.before_count.fetch_add(1, Ordering::SeqCst);
        }

        fn after_call(&self, _step: usize, _tool: &str, _result_preview: &str) {
            self.after_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn step_counter_increments_per_call() {
        let chain = MiddlewareChain::new();
        let s0 = chain.notify_before("query_database", &Value::Null);
        let s1 = chain.notify_before("query_database", &Value::Null);
        assert_eq!(s0, 0);
        assert_eq!(s1, 1);
    }

    #[test]
    fn middlewares_are_all_notified() {
        let mut chain = MiddlewareChain::new();
        let before = Arc::new(StdAtomicUsize::new(0));
        let after = Arc::new(StdAtomicUsize::new(0));
        chain.add(Box::new(CountingMiddleware { before_count: before.clone(), after_count: after.clone() }));

        let step = chain.notify_before("t", &Value::Null);
        chain.notify_after(step, "t", &Value::String("ok".into()));

        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_holder_swap_and_clear() {
        let holder: CallbackHolder<dyn Fn(usize, &str, &str) + Send + Sync> = CallbackHolder::new();
        assert!(!holder.is_set());
        holder.set(Box::new(|_step, _tool, _preview| {}));
        assert!(holder.is_set());
        holder.invoke(0, "t", "preview");
        holder.clear();
        assert!(!holder.is_set());
    }
}
