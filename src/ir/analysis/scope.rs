use rustc_hash::FxHashMap;

/// Lexically nested name → value bindings.
///
/// Each name maps to a stack; `push` shadows and `pop` unshadows in
/// strict LIFO order that mirrors tree traversal.
#[derive(Clone, Debug)]
pub struct Scope<T> {
    table: FxHashMap<String, Vec<T>>,
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Self {
            table: FxHashMap::default(),
        }
    }
}

impl<T> Scope<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: T) {
        self.table.entry(name.to_string()).or_default().push(value);
    }

    /// Remove the innermost binding of `name`.
    pub fn pop(&mut self, name: &str) -> Option<T> {
        let stack = self.table.get_mut(name);
        debug_assert!(
            stack.as_ref().is_some_and(|s| !s.is_empty()),
            "pop of unbound name '{}'",
            name
        );
        let stack = stack?;
        let value = stack.pop();
        if stack.is_empty() {
            self.table.remove(name);
        }
        value
    }

    /// Innermost binding of `name`.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.table.get(name).and_then(|s| s.last())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
