use std::collections::BTreeSet;

use crate::runtime::Address;

/// Breakpoint addresses, kept sorted. Owned by the debugger alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Breakpoints(BTreeSet<Address>);

impl Breakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: Address) -> bool {
        self.0.contains(&address)
    }

    /// Returns whether the breakpoint is new
    pub fn insert(&mut self, address: Address) -> bool {
        self.0.insert(address)
    }

    /// Returns whether a breakpoint was found at given address
    pub fn remove(&mut self, address: Address) -> bool {
        self.0.remove(&address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// By ascending address
    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut breakpoints = Breakpoints::new();
        assert!(breakpoints.insert(6));
        assert!(breakpoints.insert(2));
        assert!(!breakpoints.insert(6));
        assert_eq!(breakpoints.iter().collect::<Vec<_>>(), vec![2, 6]);

        assert!(breakpoints.remove(6));
        assert!(!breakpoints.remove(6));
        assert!(!breakpoints.contains(6));
        assert_eq!(breakpoints.len(), 1);
    }
}
