//! In-process target backed by a sparse memory image.
//!
//! `MemImage` has no processor behind it: it holds whatever the loader wrote
//! and watches the program's `tohost` word. Anything that updates that
//! memory (a co-simulated core, a debugger, or an image whose `tohost` is
//! pre-initialized) drives the session to completion.

use std::{collections::BTreeMap, thread, time::Duration};

use log::{debug, info, warn};

use crate::error::TargetError;
use crate::signal;
use crate::target::{SymbolTable, Target, TargetStatus};

pub const PAGE_SIZE: usize = 4096;

/// Exit value reported when the run is interrupted by a signal.
pub const INTERRUPTED_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageConfig {
    /// Largest transfer accepted by `write_chunk`/`read_chunk`.
    pub chunk_max_size: usize,
    /// Sleep between polls of `tohost` while the program runs.
    pub poll_interval: Duration,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            chunk_max_size: 8,
            poll_interval: Duration::from_millis(1),
        }
    }
}

pub struct MemImage {
    config: ImageConfig,
    pages: BTreeMap<u64, Box<[u8; PAGE_SIZE]>>,
    tohost: Option<u64>,
    fromhost: Option<u64>,
    interrupted: fn() -> bool,
}

impl Default for MemImage {
    fn default() -> Self {
        Self::new(ImageConfig::default())
    }
}

impl MemImage {
    pub fn new(config: ImageConfig) -> Self {
        Self {
            config,
            pages: BTreeMap::new(),
            tohost: None,
            fromhost: None,
            interrupted: signal::exit_requested,
        }
    }

    /// Replace the interrupt check, which defaults to [`signal::exit_requested`].
    pub fn with_interrupt_check(mut self, check: fn() -> bool) -> Self {
        self.interrupted = check;
        self
    }

    pub fn tohost(&self) -> Option<u64> {
        self.tohost
    }

    /// Bytes of memory touched so far, rounded up to whole pages.
    pub fn mapped_bytes(&self) -> usize {
        self.pages.len() * PAGE_SIZE
    }

    pub fn read_u64(&self, addr: u64) -> Result<u64, TargetError> {
        let mut word = [0u8; 8];
        self.copy_out(addr, &mut word)?;
        Ok(u64::from_le_bytes(word))
    }

    pub fn write_u64(&mut self, addr: u64, value: u64) -> Result<(), TargetError> {
        self.copy_in(addr, &value.to_le_bytes())
    }

    fn check(&self, addr: u64, len: usize) -> Result<(), TargetError> {
        if len > self.config.chunk_max_size {
            return Err(TargetError::ChunkTooLarge {
                len,
                max: self.config.chunk_max_size,
            });
        }
        if addr.checked_add(len as u64).is_none() {
            return Err(TargetError::OutOfRange { addr, len });
        }
        Ok(())
    }

    fn copy_in(&mut self, addr: u64, data: &[u8]) -> Result<(), TargetError> {
        if addr.checked_add(data.len() as u64).is_none() {
            return Err(TargetError::OutOfRange {
                addr,
                len: data.len(),
            });
        }
        let mut done = 0;
        while done < data.len() {
            let at = addr + done as u64;
            let page_off = (at % PAGE_SIZE as u64) as usize;
            let n = (PAGE_SIZE - page_off).min(data.len() - done);
            let page = self
                .pages
                .entry(at - page_off as u64)
                .or_insert_with(|| Box::new([0; PAGE_SIZE]));
            page[page_off..page_off + n].copy_from_slice(&data[done..done + n]);
            done += n;
        }
        Ok(())
    }

    fn copy_out(&self, addr: u64, buf: &mut [u8]) -> Result<(), TargetError> {
        if addr.checked_add(buf.len() as u64).is_none() {
            return Err(TargetError::OutOfRange {
                addr,
                len: buf.len(),
            });
        }
        let mut done = 0;
        while done < buf.len() {
            let at = addr + done as u64;
            let page_off = (at % PAGE_SIZE as u64) as usize;
            let n = (PAGE_SIZE - page_off).min(buf.len() - done);
            match self.pages.get(&(at - page_off as u64)) {
                Some(page) => buf[done..done + n].copy_from_slice(&page[page_off..page_off + n]),
                None => buf[done..done + n].fill(0),
            }
            done += n;
        }
        Ok(())
    }
}

impl Target for MemImage {
    fn chunk_max_size(&self) -> usize {
        self.config.chunk_max_size
    }

    fn write_chunk(&mut self, addr: u64, data: &[u8]) -> Result<(), TargetError> {
        self.check(addr, data.len())?;
        self.copy_in(addr, data)
    }

    fn read_chunk(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), TargetError> {
        self.check(addr, buf.len())?;
        self.copy_out(addr, buf)
    }

    fn reset(&mut self) -> Result<(), TargetError> {
        if let Some(fromhost) = self.fromhost {
            self.write_u64(fromhost, 0)?;
        }
        debug!("Memory image reset, {} page(s) mapped", self.pages.len());
        Ok(())
    }

    fn idle(&mut self, status: &mut TargetStatus) -> Result<(), TargetError> {
        if (self.interrupted)() {
            warn!("Interrupted, stopping target");
            status.finish(INTERRUPTED_EXIT_CODE);
            return Ok(());
        }

        let tohost = self.tohost.ok_or_else(|| {
            TargetError::Transport("program has no 'tohost' symbol to poll".to_string())
        })?;
        let value = self.read_u64(tohost)?;
        if value != 0 {
            self.write_u64(tohost, 0)?;
            status.report(value);
            if status.stopped() {
                info!("Target finished with status {value:#x}");
                return Ok(());
            }
            debug!("Ignoring device command {value:#x} written to tohost");
        }
        thread::sleep(self.config.poll_interval);
        Ok(())
    }

    fn bind_symbols(&mut self, symbols: &SymbolTable) {
        self.tohost = symbols.get("tohost").copied();
        self.fromhost = symbols.get("fromhost").copied();
        debug!(
            "Bound tohost={:?} fromhost={:?}",
            self.tohost, self.fromhost
        );
    }
}
