//! Variable resolution during evaluation.
//!
//! The host supplies a [`RuntimeContext`] per evaluation. It maps variable
//! references such as `%{HTTP_HOST}` or `%{HTTP:Accept}` to values. The
//! engine borrows the context for one evaluation call and never keeps it.

use std::collections::HashMap;

use crate::value::Value;

/// Outcome of resolving one variable reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The variable has a value.
    Resolved(Value),
    /// The variable is not known; evaluation continues with an empty string.
    Unresolved,
    /// The host refuses the lookup; evaluation fails with this reason.
    HardError(String),
}

/// Host capability for resolving variables.
///
/// Closures of the shape `Fn(&str, &[String]) -> Lookup` implement this trait,
/// which is handy for one-off contexts and tests.
pub trait RuntimeContext {
    /// Resolve `name`, with the optional argument written after `:` in
    /// `%{NAME:arg}`.
    fn lookup(&self, name: &str, args: &[String]) -> Lookup;
}

impl<F> RuntimeContext for F
where
    F: Fn(&str, &[String]) -> Lookup,
{
    fn lookup(&self, name: &str, args: &[String]) -> Lookup {
        self(name, args)
    }
}

/// A context backed by a HashMap.
///
/// `%{NAME}` looks up the key `NAME`; `%{NAME:arg}` looks up `NAME:arg`.
/// In strict mode a missing key is a hard error instead of a soft miss.
#[derive(Debug, Clone, Default)]
pub struct MapContext {
    bindings: HashMap<String, Value>,
    strict: bool,
}

impl MapContext {
    /// Create a new empty, lenient context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty context that rejects unknown variables.
    pub fn strict() -> Self {
        MapContext {
            bindings: HashMap::new(),
            strict: true,
        }
    }

    /// Insert a binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    /// Remove a binding.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MapContext
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        MapContext {
            bindings: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            strict: false,
        }
    }
}

impl RuntimeContext for MapContext {
    fn lookup(&self, name: &str, args: &[String]) -> Lookup {
        let key = if args.is_empty() {
            name.to_string()
        } else {
            format!("{name}:{}", args.join(":"))
        };

        match self.bindings.get(&key) {
            Some(value) => Lookup::Resolved(value.clone()),
            None if self.strict => Lookup::HardError(format!("variable '{key}' is not defined")),
            None => Lookup::Unresolved,
        }
    }
}
