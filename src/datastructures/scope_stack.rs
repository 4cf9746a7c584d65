use std::{borrow::Borrow, collections::HashMap, hash::Hash};

use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ScopeError {
    #[error("The stack is empty")]
    EmptyStack,

    #[error("The stack is not deep enough")]
    StackNotDeepEnough,
}

/// Stack of maps where lookups see the innermost binding of a key.
#[derive(Clone, Debug)]
pub struct ScopeStack<K, V> {
    scopes: Vec<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> ScopeStack<K, V> {
    pub fn new(num_scopes: usize) -> Self {
        ScopeStack {
            scopes: (0..num_scopes).map(|_| HashMap::new()).collect(),
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) -> Option<HashMap<K, V>> {
        self.scopes.pop()
    }

    pub fn lookup<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.scopes.iter().rev().find_map(|scope| scope.get(key))
    }

    /// Binds `k` in the scope at `depth`, counted from the outermost one.
    pub fn insert_at(&mut self, depth: usize, k: K, v: V) -> Result<Option<V>, ScopeError> {
        if self.scopes.is_empty() {
            return Err(ScopeError::EmptyStack);
        }

        let scope = self
            .scopes
            .get_mut(depth)
            .ok_or(ScopeError::StackNotDeepEnough)?;

        Ok(scope.insert(k, v))
    }

    pub fn insert_in_current(&mut self, k: K, v: V) -> Result<Option<V>, ScopeError> {
        let current = self.depth().checked_sub(1).ok_or(ScopeError::EmptyStack)?;
        self.insert_at(current, k, v)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_binding_wins() {
        let mut stack: ScopeStack<String, u32> = ScopeStack::new(1);
        stack.insert_in_current("x".to_string(), 1).unwrap();

        stack.push();
        stack.insert_in_current("x".to_string(), 2).unwrap();
        assert_eq!(stack.lookup("x"), Some(&2));

        stack.pop();
        assert_eq!(stack.lookup("x"), Some(&1));
    }

    #[test]
    fn insert_at_targets_outer_scope() {
        let mut stack: ScopeStack<&str, u32> = ScopeStack::new(1);
        stack.push();
        stack.insert_at(0, "y", 7).unwrap();

        assert_eq!(stack.lookup("y"), Some(&7));
        assert!(stack.pop().is_some_and(|inner| inner.is_empty()));
        assert_eq!(stack.lookup("y"), Some(&7));
    }

    #[test]
    fn empty_stack_rejects_inserts() {
        let mut stack: ScopeStack<&str, u32> = ScopeStack::new(0);

        assert_eq!(stack.insert_in_current("z", 1), Err(ScopeError::EmptyStack));
        assert_eq!(stack.insert_at(0, "z", 1), Err(ScopeError::EmptyStack));
        assert_eq!(stack.lookup("z"), None);
    }

    #[test]
    fn insert_beyond_depth_fails() {
        let mut stack: ScopeStack<&str, u32> = ScopeStack::new(2);

        assert_eq!(stack.insert_at(2, "z", 1), Err(ScopeError::StackNotDeepEnough));
        assert_eq!(stack.insert_at(1, "z", 1), Ok(None));
        assert_eq!(stack.insert_at(1, "z", 2), Ok(Some(1)));
    }
}
