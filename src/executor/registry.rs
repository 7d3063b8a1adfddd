//! Function action registry
//!
//! Function actions resolve through this explicit registry, populated at
//! startup. Configuration names a `(module, function)` pair; the registry
//! maps it to a handler. There is no dynamic code evaluation anywhere in the
//! resolution path.

use std::collections::HashMap;
use std::sync::Arc;

/// A registered function handler
///
/// Receives the parameters extracted from the transcript, bound by name.
/// `Ok(None)` means success with no output; `Err` carries a failure message.
pub type ActionFn =
    Arc<dyn Fn(&HashMap<String, String>) -> std::result::Result<Option<String>, String> + Send + Sync>;

/// Maps `(module, function)` pairs to handlers
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    handlers: HashMap<String, ActionFn>,
}

impl FunctionRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `module.function`
    ///
    /// Re-registering the same pair replaces the previous handler.
    pub fn register<F>(&mut self, module: &str, function: &str, handler: F)
    where
        F: Fn(&HashMap<String, String>) -> std::result::Result<Option<String>, String>
            + Send
            + Sync
            + 'static,
    {
        tracing::debug!(module, function, "registered function action");
        self.handlers
            .insert(Self::key(module, function), Arc::new(handler));
    }

    /// Look up a handler; `None` is a resolution failure at the call site
    #[must_use]
    pub fn resolve(&self, module: &str, function: &str) -> Option<ActionFn> {
        self.handlers.get(&Self::key(module, function)).cloned()
    }

    /// Number of registered handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry has no handlers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn key(module: &str, function: &str) -> String {
        format!("{module}.{function}")
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FunctionRegistry")
            .field("handlers", &names)
            .finish()
    }
}
