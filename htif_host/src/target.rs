//! The transport seam between the front-end server and a target.

use std::collections::BTreeMap;

use crate::error::TargetError;

/// Symbol name to address, as extracted from the loaded ELF.
pub type SymbolTable = BTreeMap<String, u64>;

/// Completion state reported by the target.
///
/// The raw status word carries a valid/stopped flag in bit 0 and the signed
/// exit value in the remaining bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetStatus {
    raw: u64,
    stopped: bool,
}

impl TargetStatus {
    /// Record a raw status word. A set bit 0 means the target has finished.
    pub fn report(&mut self, raw: u64) {
        if self.stopped {
            return;
        }
        self.raw = raw;
        if raw & 1 != 0 {
            self.stopped = true;
        }
    }

    /// Record completion with an exit value.
    pub fn finish(&mut self, code: i32) {
        self.report(((i64::from(code) << 1) | 1) as u64);
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    pub fn raw(&self) -> u64 {
        self.raw
    }

    /// The exit value: the raw status shifted right by one, sign preserved.
    /// Only meaningful once [`stopped`](Self::stopped) is true.
    pub fn exit_code(&self) -> i32 {
        ((self.raw as i64) >> 1) as i32
    }
}

/// A target the front-end server can initialize and poll.
///
/// Implementations own the actual transport (simulated bus, socket, debug
/// module...). Memory transfers never exceed [`chunk_max_size`](Self::chunk_max_size).
pub trait Target {
    /// Largest number of bytes a single transfer may carry.
    fn chunk_max_size(&self) -> usize;

    /// Write `data` to target memory at `addr`.
    fn write_chunk(&mut self, addr: u64, data: &[u8]) -> Result<(), TargetError>;

    /// Read `buf.len()` bytes of target memory at `addr`.
    fn read_chunk(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), TargetError>;

    /// Put the target into its initial state before the first run.
    fn reset(&mut self) -> Result<(), TargetError>;

    /// One polling quantum. May block while the target makes progress, and
    /// must eventually stop `status` or be interrupted.
    fn idle(&mut self, status: &mut TargetStatus) -> Result<(), TargetError>;

    /// Called once after the program is loaded.
    fn bind_symbols(&mut self, _symbols: &SymbolTable) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_drops_the_valid_bit() {
        let mut status = TargetStatus::default();
        status.report(0b101);
        assert!(status.stopped());
        assert_eq!(status.exit_code(), 2);

        let mut status = TargetStatus::default();
        status.report(1);
        assert_eq!(status.exit_code(), 0);
    }

    #[test]
    fn even_status_keeps_running() {
        let mut status = TargetStatus::default();
        status.report(4);
        assert!(!status.stopped());
        assert_eq!(status.raw(), 4);
        status.report(7);
        assert!(status.stopped());
        assert_eq!(status.exit_code(), 3);
    }

    #[test]
    fn stopped_status_is_final() {
        let mut status = TargetStatus::default();
        status.finish(-3);
        assert_eq!(status.exit_code(), -3);
        status.report(0b1001);
        assert_eq!(status.exit_code(), -3);
        status.stop();
        assert!(status.stopped());
    }
}
