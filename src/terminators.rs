//! Terminators for stopping a solve from the outside.
//!
//! This module provides several implementations of the [`Terminator`] trait, including:
//! - [`InterruptTerminator`]: Responds to Ctrl-C (SIGINT) or programmatic interrupts.
//! - [`TimeOutTerminator`]: Terminates after a specified time limit.
//! - [`MultiTerminator`]: Combines multiple terminators.
//!
//! # Note
//! [`InterruptTerminator`] installs a global signal handler and **can only be constructed once**
//! per process. Constructing a second instance returns an error.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use enum_dispatch::enum_dispatch;
use problemo::Problem;

use crate::{Status, nlp::ipm::Iteration};

#[enum_dispatch]
pub trait Terminator {
    fn initialize(&mut self) {}

    /// Inspects a pending record and returns a status if the solve should stop.
    fn terminate(&mut self, record: &Iteration) -> Option<Status>;
}

pub struct NoTerminator {}

impl NoTerminator {
    pub fn new() -> Self {
        Self {}
    }
}

impl Terminator for NoTerminator {
    fn terminate(&mut self, _record: &Iteration) -> Option<Status> {
        None
    }
}

/// Terminator that responds to Ctrl-C (SIGINT) or programmatic interrupts.
pub struct InterruptTerminator {
    interrupted: Arc<AtomicBool>,
}

impl InterruptTerminator {
    pub fn new() -> Result<Self, Problem> {
        let interrupted = Arc::new(AtomicBool::new(false));
        ctrlc::set_handler({
            let interrupted_clone = interrupted.clone();
            move || {
                interrupted_clone.store(true, Ordering::SeqCst);
            }
        })?;
        Ok(Self { interrupted })
    }

    pub fn interrupt(&mut self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }
}

impl Terminator for InterruptTerminator {
    fn terminate(&mut self, _record: &Iteration) -> Option<Status> {
        if self.interrupted.load(Ordering::SeqCst) {
            Some(Status::Interrupted)
        } else {
            None
        }
    }
}

/// Terminator that triggers after a specified number of seconds.
pub struct TimeOutTerminator {
    max_time_secs: u64,
    start_time: Instant,
}

impl TimeOutTerminator {
    pub fn new(max_time_secs: u64) -> Self {
        Self {
            max_time_secs,
            start_time: Instant::now(),
        }
    }
}

impl Terminator for TimeOutTerminator {
    fn initialize(&mut self) {
        self.start_time = Instant::now();
    }

    fn terminate(&mut self, _record: &Iteration) -> Option<Status> {
        if self.start_time.elapsed().as_secs() >= self.max_time_secs {
            Some(Status::TimeLimit)
        } else {
            None
        }
    }
}

/// Stops as soon as any of its terminators does.
pub struct MultiTerminator {
    terminators: Vec<Terminators>,
}

impl MultiTerminator {
    pub fn new(terminators: Vec<Terminators>) -> Self {
        Self { terminators }
    }
}

impl Terminator for MultiTerminator {
    fn initialize(&mut self) {
        self.terminators.iter_mut().for_each(|t| t.initialize());
    }

    fn terminate(&mut self, record: &Iteration) -> Option<Status> {
        self.terminators
            .iter_mut()
            .find_map(|t| t.terminate(record))
    }
}

/// Terminators selectable at runtime.
#[enum_dispatch(Terminator)]
pub enum Terminators {
    NoTerminator,
    InterruptTerminator,
    TimeOutTerminator,
    MultiTerminator,
}

impl Default for Terminators {
    fn default() -> Self {
        NoTerminator::new().into()
    }
}
