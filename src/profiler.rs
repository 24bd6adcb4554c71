use std::collections::BTreeMap;

use crate::runtime::{Address, Observer, Word};

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
struct CellUsage {
    reads: u64,
    writes: u64,
}

/// Counts cycles, and reads/writes/executions per address.
#[derive(Debug, Default)]
pub struct Profiler {
    cycle_count: u64,
    cells: BTreeMap<Address, CellUsage>,
    executions: BTreeMap<Address, u64>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Amount of distinct cells which were read or written.
    pub fn used_memory(&self) -> usize {
        self.cells.len()
    }

    /// `(address, executions)` for each executed instruction, by address.
    pub fn instruction_coverage(&self) -> Vec<(Address, u64)> {
        self.executions
            .iter()
            .map(|(address, count)| (*address, *count))
            .collect()
    }

    /// `(address, reads, writes)` for each used cell, by address.
    pub fn memory_coverage(&self) -> Vec<(Address, u64, u64)> {
        self.cells
            .iter()
            .map(|(address, usage)| (*address, usage.reads, usage.writes))
            .collect()
    }
}

impl Observer for Profiler {
    fn on_read(&mut self, address: Address, _value: Word) {
        self.cells.entry(address).or_default().reads += 1;
    }

    fn on_write(&mut self, address: Address, _value: Word) {
        self.cells.entry(address).or_default().writes += 1;
    }

    fn on_tick(&mut self, address: Address, cost: u64) {
        self.cycle_count += cost;
        *self.executions.entry(address).or_default() += 1;
    }
}
