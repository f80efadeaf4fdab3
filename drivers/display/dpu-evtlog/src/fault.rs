//! # Bus Fault Notification
//!
//! Hook for the interconnect monitor. When a bus error or timeout names
//! the display block as master or target, the event history of the
//! affected instance is dumped to the log, once per instance.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::evtlog::EventLog;
use crate::source::Clock;

/// Name prefix of display bus ports
pub const DISPLAY_PORT_PREFIX: &str = "DISP";

/// Bus fault reported by the interconnect monitor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusFault<'a> {
    /// Master port
    pub port: Option<&'a str>,
    /// Target
    pub dest: Option<&'a str>,
}

impl BusFault<'_> {
    /// Check if the display block is master or target
    pub fn involves_display(&self) -> bool {
        [self.port, self.dest]
            .into_iter()
            .flatten()
            .any(|name| name.starts_with(DISPLAY_PORT_PREFIX))
    }
}

/// Notifier return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    /// Not ours, or already handled
    Done,
    /// History dumped
    Handled,
}

/// Per-instance fault notifier
#[derive(Debug, Default)]
pub struct FaultMonitor {
    notified: AtomicBool,
}

impl FaultMonitor {
    /// Create a monitor that has not fired yet
    pub const fn new() -> Self {
        Self {
            notified: AtomicBool::new(false),
        }
    }

    /// Check if a dump has been taken
    pub fn has_fired(&self) -> bool {
        self.notified.load(Ordering::Acquire)
    }

    /// Handle a bus fault notification
    pub fn notify<C: Clock>(
        &self,
        log: &EventLog<C>,
        fault: &BusFault<'_>,
        power_active: bool,
    ) -> NotifyAction {
        if self.has_fired() || !fault.involves_display() {
            return NotifyAction::Done;
        }

        if self
            .notified
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return NotifyAction::Done;
        }

        log::info!(
            "decon{}: bus fault port: {}, dest: {}",
            log.id(),
            fault.port.unwrap_or("-"),
            fault.dest.unwrap_or("-")
        );
        log.dump(power_active);

        NotifyAction::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventLogConfig;
    use crate::event::EventType;
    use crate::evtlog::tests::ManualClock;

    fn log() -> EventLog<ManualClock> {
        let log =
            EventLog::new(0, EventLogConfig::default().with_capacity(8), ManualClock::new(1))
                .unwrap();
        log.record(EventType::DeconEnabled, &());
        log
    }

    #[test]
    fn test_involves_display() {
        let fault = |port, dest| BusFault { port, dest };
        assert!(fault(Some("DISP_SS"), None).involves_display());
        assert!(fault(Some("G3D"), Some("DISP1")).involves_display());
        assert!(!fault(Some("G3D"), Some("MIF")).involves_display());
        assert!(!fault(None, None).involves_display());
        assert!(!fault(Some("XDISP"), None).involves_display());
    }

    #[test]
    fn test_dump_once() {
        let log = log();
        let monitor = FaultMonitor::new();
        let fault = BusFault {
            port: Some("DISP0"),
            dest: None,
        };

        assert_eq!(monitor.notify(&log, &fault, true), NotifyAction::Handled);
        assert!(monitor.has_fired());
        assert_eq!(monitor.notify(&log, &fault, true), NotifyAction::Done);
    }

    #[test]
    fn test_foreign_fault_ignored() {
        let log = log();
        let monitor = FaultMonitor::new();
        let fault = BusFault {
            port: Some("CPUCL0"),
            dest: Some("PERIC"),
        };

        assert_eq!(monitor.notify(&log, &fault, false), NotifyAction::Done);
        assert!(!monitor.has_fired());
    }
}
