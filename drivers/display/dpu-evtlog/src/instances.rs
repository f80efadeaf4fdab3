//! # Pipeline Instances
//!
//! One [`EventLog`] per display pipeline instance. Producers that carry a
//! raw instance index go through [`DisplayTrace`], which rejects indices
//! that do not name an instance before any log is touched.

use alloc::vec::Vec;

use crate::config::EventLogConfig;
use crate::error::{Error, Result};
use crate::event::EventType;
use crate::evtlog::{EventLog, Outcome};
use crate::source::{Clock, CommitSource, EventSource};

/// Event logs of every display pipeline instance
#[derive(Debug)]
pub struct DisplayTrace<C: Clock> {
    logs: Vec<EventLog<C>>,
}

impl<C: Clock> DisplayTrace<C> {
    /// Create an empty set
    pub const fn new() -> Self {
        Self { logs: Vec::new() }
    }

    /// Add the next instance, returning its index
    pub fn attach(&mut self, log: EventLog<C>) -> usize {
        self.logs.push(log);
        self.logs.len() - 1
    }

    /// Initialize `count` heap backed instances sharing one configuration
    pub fn with_instances(
        count: usize,
        config: EventLogConfig,
        mut clock: impl FnMut(usize) -> C,
    ) -> Result<Self> {
        let mut trace = Self::new();
        for id in 0..count {
            trace.attach(EventLog::new(id, config, clock(id))?);
        }
        Ok(trace)
    }

    /// Number of instances
    #[inline]
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    /// Check if no instance is attached
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    /// Look up an instance
    pub fn get(&self, index: i32) -> Result<&EventLog<C>> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.logs.get(i))
            .ok_or(Error::InvalidInstance(index))
    }

    /// Look up an instance mutably
    pub fn get_mut(&mut self, index: i32) -> Result<&mut EventLog<C>> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.logs.get_mut(i))
            .ok_or(Error::InvalidInstance(index))
    }

    /// Iterate over instances
    pub fn iter(&self) -> impl Iterator<Item = &EventLog<C>> {
        self.logs.iter()
    }

    /// Record on instance `index`
    pub fn record(&self, index: i32, ty: EventType, source: &dyn EventSource) -> Result<Outcome> {
        let log = self.get(index).map_err(|err| {
            log::error!("{}", err);
            err
        })?;
        Ok(log.record(ty, source))
    }

    /// Record an atomic commit on instance `index`
    pub fn capture_commit_snapshot(&self, index: i32, table: &dyn CommitSource) -> Result<Outcome> {
        let log = self.get(index).map_err(|err| {
            log::error!("{}", err);
            err
        })?;
        Ok(log.capture_commit_snapshot(table))
    }

    /// Release the storage of every instance
    pub fn teardown(&mut self) {
        self.logs.iter_mut().for_each(EventLog::teardown);
    }
}

impl<C: Clock> Default for DisplayTrace<C> {
    fn default() -> Self {
        Self::new()
    }
}
