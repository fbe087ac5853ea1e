//! Storage for state values, greedy policies and value traces.
//!
//! Tables are keyed by the shared state type and backed by `FxHashMap`.
//! Lookups of unseen states default to a value of 0.

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Value function: state -> estimated value.
///
/// Entries are only ever added or overwritten, never removed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable<S: Eq + Hash> {
    values: FxHashMap<S, f64>,
}

impl<S: Eq + Hash> Default for ValueTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Eq + Hash> ValueTable<S> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            values: FxHashMap::default(),
        }
    }

    /// Create a table with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Value of `state`, or 0 if it has never been written.
    pub fn get(&self, state: &S) -> f64 {
        self.values.get(state).copied().unwrap_or(0.0)
    }

    /// Value of `state` if an entry exists.
    pub fn lookup(&self, state: &S) -> Option<f64> {
        self.values.get(state).copied()
    }

    /// Overwrite the value of `state`.
    pub fn set(&mut self, state: S, value: f64) {
        self.values.insert(state, value);
    }

    /// Mutable access to the value of `state`, inserting 0 if absent.
    pub fn entry(&mut self, state: S) -> &mut f64 {
        self.values.entry(state).or_insert(0.0)
    }

    /// Whether `state` has an entry.
    pub fn contains(&self, state: &S) -> bool {
        self.values.contains_key(state)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over all (state, value) entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&S, f64)> {
        self.values.iter().map(|(s, &v)| (s, v))
    }

    /// Largest absolute difference to `other` over the union of both key sets.
    ///
    /// Missing entries count as 0 on either side.
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        let forward = self
            .values
            .iter()
            .map(|(s, &v)| (v - other.get(s)).abs())
            .fold(0.0, f64::max);
        let backward = other
            .values
            .iter()
            .filter(|(s, _)| !self.values.contains_key(*s))
            .map(|(_, &v)| v.abs())
            .fold(0.0, f64::max);
        forward.max(backward)
    }
}

impl<S: Eq + Hash> FromIterator<(S, f64)> for ValueTable<S> {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Greedy policy: state -> action index.
///
/// Only non-terminal states ever receive an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy<S: Eq + Hash> {
    actions: FxHashMap<S, usize>,
}

impl<S: Eq + Hash> Default for Policy<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Eq + Hash> Policy<S> {
    /// Create an empty policy.
    pub fn new() -> Self {
        Self {
            actions: FxHashMap::default(),
        }
    }

    /// Action chosen in `state`, if any.
    pub fn action(&self, state: &S) -> Option<usize> {
        self.actions.get(state).copied()
    }

    /// Record the action for `state`.
    pub fn set(&mut self, state: S, action: usize) {
        self.actions.insert(state, action);
    }

    /// Whether `state` has an action.
    pub fn contains(&self, state: &S) -> bool {
        self.actions.contains_key(state)
    }

    /// Number of states with an action.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the policy is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate over all (state, action) entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&S, usize)> {
        self.actions.iter().map(|(s, &a)| (s, a))
    }
}

impl<S: Eq + Hash> FromIterator<(S, usize)> for Policy<S> {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

/// Value history of a fixed set of states, one sample per sweep or episode.
///
/// Feeds convergence plots; the states are chosen once and never change.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTrace<S> {
    states: Vec<S>,
    samples: Vec<Vec<f64>>,
}

impl<S> Default for ValueTrace<S> {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            samples: Vec::new(),
        }
    }
}

impl<S: Eq + Hash> ValueTrace<S> {
    /// Start tracing `states`.
    pub fn new(states: Vec<S>) -> Self {
        let samples = vec![Vec::new(); states.len()];
        Self { states, samples }
    }

    /// Append the current value of every traced state.
    pub fn record(&mut self, values: &ValueTable<S>) {
        for (state, history) in self.states.iter().zip(self.samples.iter_mut()) {
            history.push(values.get(state));
        }
    }

    /// The traced states.
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Recorded history of `state`, if it is traced.
    pub fn history(&self, state: &S) -> Option<&[f64]> {
        self.states
            .iter()
            .position(|s| s == state)
            .map(|i| self.samples[i].as_slice())
    }

    /// Iterate over (state, history) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&S, &[f64])> {
        self.states
            .iter()
            .zip(self.samples.iter().map(Vec::as_slice))
    }

    /// Whether no state is traced.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_table_defaults_to_zero() {
        let mut table: ValueTable<&str> = ValueTable::new();
        assert_eq!(table.get(&"a"), 0.0);
        assert_eq!(table.lookup(&"a"), None);

        table.set("a", 1.5);
        *table.entry("b") += 0.25;
        assert_eq!(table.get(&"a"), 1.5);
        assert_eq!(table.get(&"b"), 0.25);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_max_abs_diff_covers_both_key_sets() {
        let a: ValueTable<u32> = [(1, 1.0), (2, -1.0)].into_iter().collect();
        let b: ValueTable<u32> = [(1, 0.5), (3, 2.0)].into_iter().collect();
        assert_eq!(a.max_abs_diff(&b), 2.0);
        assert_eq!(b.max_abs_diff(&a), 2.0);
        assert_eq!(a.max_abs_diff(&a.clone()), 0.0);
    }

    #[test]
    fn test_policy_entries() {
        let mut policy: Policy<u32> = Policy::new();
        assert!(policy.is_empty());
        policy.set(7, 2);
        assert_eq!(policy.action(&7), Some(2));
        assert_eq!(policy.action(&8), None);
        assert!(policy.contains(&7));
    }

    #[test]
    fn test_trace_records_in_order() {
        let mut table: ValueTable<u32> = ValueTable::new();
        let mut trace = ValueTrace::new(vec![1, 2]);

        trace.record(&table);
        table.set(1, 0.5);
        trace.record(&table);

        assert_eq!(trace.history(&1), Some(&[0.0, 0.5][..]));
        assert_eq!(trace.history(&2), Some(&[0.0, 0.0][..]));
        assert_eq!(trace.history(&3), None);
    }
}
