//! Default function actions
//!
//! Registered at startup under the `actions` module name, which is also the
//! default when a function action's configuration omits `module`.

use chrono::Local;

use super::registry::FunctionRegistry;

/// Module name used when a function action omits `module`
pub const DEFAULT_MODULE: &str = "actions";

/// Registry preloaded with the default `actions` module
#[must_use]
pub fn default_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();

    registry.register(DEFAULT_MODULE, "echo", |params| {
        let text = params.get("text").cloned().unwrap_or_else(|| {
            let mut values: Vec<&str> = params.values().map(String::as_str).collect();
            values.sort_unstable();
            values.join(" ")
        });
        Ok(Some(text))
    });

    registry.register(DEFAULT_MODULE, "current_time", |_params| {
        Ok(Some(Local::now().format("%H:%M").to_string()))
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_echo_uses_text_param() {
        let registry = default_registry();
        let echo = registry.resolve(DEFAULT_MODULE, "echo").unwrap();

        let mut params = HashMap::new();
        params.insert("text".to_string(), "hello there".to_string());
        assert_eq!(echo(&params), Ok(Some("hello there".to_string())));
    }

    #[test]
    fn test_echo_without_text_joins_values() {
        let registry = default_registry();
        let echo = registry.resolve(DEFAULT_MODULE, "echo").unwrap();
        assert_eq!(echo(&HashMap::new()), Ok(Some(String::new())));
    }

    #[test]
    fn test_current_time_is_clock_shaped() {
        let registry = default_registry();
        let now = registry.resolve(DEFAULT_MODULE, "current_time").unwrap();

        let out = now(&HashMap::new()).unwrap().unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out.as_bytes()[2], b':');
    }
}
