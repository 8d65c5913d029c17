use enum_dispatch::enum_dispatch;
use log::info;

use crate::nlp::ipm::Iteration;

/// Observer of the records produced while solving.
#[enum_dispatch]
pub trait Callback {
    /// Called once before the first iteration.
    fn init(&mut self) {}

    fn call(&mut self, record: &Iteration);
}

pub struct NoOpCallback {}

impl NoOpCallback {
    pub fn new() -> Self {
        Self {}
    }
}

impl Callback for NoOpCallback {
    fn call(&mut self, _record: &Iteration) {
        // Do nothing
    }
}

/// Logs the infeasibilities of every record at `info` level.
pub struct ConvergenceOutput {}

impl ConvergenceOutput {
    pub fn new() -> Self {
        Self {}
    }
}

impl Callback for ConvergenceOutput {
    fn call(&mut self, record: &Iteration) {
        info!(
            "[{:>4}] {:<8} Primal Infeasibility: {:e}, Dual Infeasibility: {:e}",
            record.iteration, record.status, record.primal_infeasibility, record.dual_infeasibility
        );
    }
}

/// Keeps a copy of every record.
#[derive(Default)]
pub struct IterationHistory {
    records: Vec<Iteration>,
}

impl IterationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Iteration] {
        &self.records
    }
}

impl Callback for IterationHistory {
    fn init(&mut self) {
        self.records.clear();
    }

    fn call(&mut self, record: &Iteration) {
        self.records.push(record.clone());
    }
}

/// Callbacks selectable at runtime.
#[enum_dispatch(Callback)]
pub enum Callbacks {
    NoOpCallback,
    ConvergenceOutput,
    IterationHistory,
}

impl Default for Callbacks {
    fn default() -> Self {
        NoOpCallback::new().into()
    }
}
