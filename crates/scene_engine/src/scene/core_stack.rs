//! Last-in-first-out stack of ambient render state
//!
//! The top of the stack is the state in effect while a subtree compiles.
//! Popping the last entry falls back to the stack's default.

/// Stack of states with a default for the empty case
#[derive(Debug, Clone)]
pub struct CoreStack<T> {
    items: Vec<T>,
    default: T,
}

impl<T> CoreStack<T> {
    /// Create an empty stack falling back to `default`
    pub const fn new(default: T) -> Self {
        Self {
            items: Vec::new(),
            default,
        }
    }

    /// Make `state` the active state
    pub fn push(&mut self, state: T) {
        self.items.push(state);
    }

    /// Remove the active state, returning it
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Active state: the top entry, or the default when empty
    pub fn top(&self) -> &T {
        self.items.last().unwrap_or(&self.default)
    }

    /// Number of pushed states
    pub fn depth(&self) -> usize {
        self.items.len()
    }

    /// Whether no state is pushed
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_restores_parent_then_default() {
        let mut stack = CoreStack::new(0);
        stack.push(1);
        stack.push(2);
        assert_eq!(*stack.top(), 2);
        assert_eq!(stack.depth(), 2);

        assert_eq!(stack.pop(), Some(2));
        assert_eq!(*stack.top(), 1);
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(*stack.top(), 0);
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
    }
}
