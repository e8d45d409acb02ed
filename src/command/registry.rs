//! Verb to invocation-template registry

use std::collections::HashMap;

/// Handler templates every unit ships with
fn builtin_handlers() -> HashMap<String, String> {
    HashMap::from([("pin".to_string(), "pi-pin".to_string())])
}

/// Mapping from command verb to the external invocation template used to run
/// it. Built once from the built-in defaults merged with configuration
/// overrides; immutable after construction.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, String>,
}

impl HandlerRegistry {
    /// Merge caller-supplied handlers over the built-in defaults. An
    /// override wins on key collision.
    pub fn new(overrides: &HashMap<String, String>) -> Self {
        let mut handlers = builtin_handlers();
        for (verb, template) in overrides {
            handlers.insert(verb.clone(), template.clone());
        }
        Self { handlers }
    }

    /// Invocation template for a verb, if one is registered
    pub fn template(&self, verb: &str) -> Option<&str> {
        self.handlers.get(verb).map(String::as_str)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_pin_handler() {
        let registry = HandlerRegistry::default();
        assert_eq!(registry.template("pin"), Some("pi-pin"));
        assert_eq!(registry.template("servo"), None);
    }

    #[test]
    fn test_override_wins_on_collision() {
        let overrides = HashMap::from([("pin".to_string(), "gpio-write".to_string())]);
        let registry = HandlerRegistry::new(&overrides);
        assert_eq!(registry.template("pin"), Some("gpio-write"));
    }

    #[test]
    fn test_extra_verbs_are_registered() {
        let overrides = HashMap::from([("servo".to_string(), "pi-servo".to_string())]);
        let registry = HandlerRegistry::new(&overrides);
        assert_eq!(registry.template("servo"), Some("pi-servo"));
        assert_eq!(registry.template("pin"), Some("pi-pin"));
    }
}
