//! Chunked access to target memory.
//!
//! Targets accept transfers of at most [`Target::chunk_max_size`] bytes.
//! [`Memif`] splits arbitrary reads, writes and zero fills into transfers of
//! that size.

use log::trace;

use crate::error::TargetError;
use crate::target::Target;

/// Sink the ELF loader writes a program image through.
pub trait TargetMemory {
    fn write(&mut self, addr: u64, data: &[u8]) -> Result<(), TargetError>;

    /// Zero `len` bytes starting at `addr`.
    fn clear(&mut self, addr: u64, len: usize) -> Result<(), TargetError>;
}

/// Memory interface over a borrowed target.
pub struct Memif<'t> {
    target: &'t mut dyn Target,
}

impl<'t> Memif<'t> {
    pub fn new(target: &'t mut dyn Target) -> Self {
        Self { target }
    }

    fn chunk(&self) -> Result<usize, TargetError> {
        match self.target.chunk_max_size() {
            0 => Err(TargetError::Transport(
                "target reports a maximum chunk size of zero".to_string(),
            )),
            max => Ok(max),
        }
    }

    pub fn read(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), TargetError> {
        let max = self.chunk()?;
        for (i, part) in buf.chunks_mut(max).enumerate() {
            let at = offset(addr, i * max)?;
            trace!("read_chunk({at:#x}, {})", part.len());
            self.target.read_chunk(at, part)?;
        }
        Ok(())
    }
}

impl TargetMemory for Memif<'_> {
    fn write(&mut self, addr: u64, data: &[u8]) -> Result<(), TargetError> {
        let max = self.chunk()?;
        for (i, part) in data.chunks(max).enumerate() {
            let at = offset(addr, i * max)?;
            trace!("write_chunk({at:#x}, {})", part.len());
            self.target.write_chunk(at, part)?;
        }
        Ok(())
    }

    fn clear(&mut self, addr: u64, len: usize) -> Result<(), TargetError> {
        clear_chunk(&mut *self.target, addr, len)
    }
}

/// Zero `[addr, addr + len)` using a scratch buffer of one maximum-sized
/// chunk. Issues `ceil(len / chunk_max_size)` transfers, none for `len == 0`.
pub fn clear_chunk<T: Target + ?Sized>(
    target: &mut T,
    addr: u64,
    len: usize,
) -> Result<(), TargetError> {
    if len == 0 {
        return Ok(());
    }
    let max = target.chunk_max_size();
    if max == 0 {
        return Err(TargetError::Transport(
            "target reports a maximum chunk size of zero".to_string(),
        ));
    }
    let zeros = vec![0u8; max];

    let mut pos = 0;
    while pos < len {
        let size = (len - pos).min(max);
        let at = offset(addr, pos)?;
        trace!("clear write_chunk({at:#x}, {size})");
        target.write_chunk(at, &zeros[..size])?;
        pos += size;
    }
    Ok(())
}

fn offset(addr: u64, by: usize) -> Result<u64, TargetError> {
    addr.checked_add(by as u64)
        .ok_or(TargetError::OutOfRange { addr, len: by })
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::{Rng, rng};

    use super::*;
    use crate::target::TargetStatus;

    /// Records every transfer; backs memory with a flat vector at `base`.
    pub(crate) struct Recorder {
        pub max: usize,
        pub base: u64,
        pub mem: Vec<u8>,
        pub writes: Vec<(u64, usize)>,
        pub reads: Vec<(u64, usize)>,
    }

    impl Recorder {
        pub fn new(max: usize, base: u64, size: usize) -> Self {
            Self {
                max,
                base,
                mem: vec![0xa5; size],
                writes: Vec::new(),
                reads: Vec::new(),
            }
        }

        fn span(&self, addr: u64, len: usize) -> Result<std::ops::Range<usize>, TargetError> {
            let start = addr
                .checked_sub(self.base)
                .ok_or(TargetError::OutOfRange { addr, len })? as usize;
            if start + len > self.mem.len() {
                return Err(TargetError::OutOfRange { addr, len });
            }
            Ok(start..start + len)
        }
    }

    impl Target for Recorder {
        fn chunk_max_size(&self) -> usize {
            self.max
        }

        fn write_chunk(&mut self, addr: u64, data: &[u8]) -> Result<(), TargetError> {
            if data.len() > self.max {
                return Err(TargetError::ChunkTooLarge {
                    len: data.len(),
                    max: self.max,
                });
            }
            let span = self.span(addr, data.len())?;
            self.mem[span].copy_from_slice(data);
            self.writes.push((addr, data.len()));
            Ok(())
        }

        fn read_chunk(&mut self, addr: u64, buf: &mut [u8]) -> Result<(), TargetError> {
            let span = self.span(addr, buf.len())?;
            buf.copy_from_slice(&self.mem[span]);
            self.reads.push((addr, buf.len()));
            Ok(())
        }

        fn reset(&mut self) -> Result<(), TargetError> {
            Ok(())
        }

        fn idle(&mut self, status: &mut TargetStatus) -> Result<(), TargetError> {
            status.stop();
            Ok(())
        }
    }

    #[test]
    fn clear_of_zero_bytes_issues_nothing() {
        let mut target = Recorder::new(8, 0x1000, 64);
        clear_chunk(&mut target, 0x1000, 0).unwrap();
        assert!(target.writes.is_empty());
    }

    #[test]
    fn clear_with_short_tail() {
        let mut target = Recorder::new(8, 0x1000, 64);
        clear_chunk(&mut target, 0x1004, 21).unwrap();
        assert_eq!(target.writes, [(0x1004, 8), (0x100c, 8), (0x1014, 5)]);
        assert!(target.mem[4..25].iter().all(|&b| b == 0));
        assert_eq!(target.mem[3], 0xa5);
        assert_eq!(target.mem[25], 0xa5);
    }

    #[test]
    fn clear_covers_range_without_gaps_or_overlaps() {
        let mut rng = rng();
        for _ in 0..32 {
            let max = rng.random_range(1..=64);
            let len = rng.random_range(0..=1024);
            let mut target = Recorder::new(max, 0x8000_0000, 1024);
            clear_chunk(&mut target, 0x8000_0000, len).unwrap();

            assert_eq!(target.writes.len(), len.div_ceil(max));
            let mut next = 0x8000_0000;
            for &(addr, size) in &target.writes {
                assert_eq!(addr, next);
                assert!(size <= max && size > 0);
                next += size as u64;
            }
            assert_eq!(next, 0x8000_0000 + len as u64);
            assert!(target.mem[..len].iter().all(|&b| b == 0));
            assert!(target.mem[len..].iter().all(|&b| b == 0xa5));
        }
    }

    #[test]
    fn memif_splits_writes_and_reads() {
        let mut target = Recorder::new(4, 0, 32);
        let data: Vec<u8> = (0..10).collect();
        {
            let mut memif = Memif::new(&mut target);
            memif.write(2, &data).unwrap();
            let mut back = [0u8; 10];
            memif.read(2, &mut back).unwrap();
            assert_eq!(back.as_slice(), data.as_slice());
        }
        assert_eq!(target.writes, [(2, 4), (6, 4), (10, 2)]);
        assert_eq!(target.reads, [(2, 4), (6, 4), (10, 2)]);
    }

    #[test]
    fn zero_chunk_size_is_a_transport_error() {
        let mut target = Recorder::new(0, 0, 8);
        assert!(matches!(
            clear_chunk(&mut target, 0, 4),
            Err(TargetError::Transport(_))
        ));
        assert!(Memif::new(&mut target).write(0, &[1]).is_err());
    }

    #[test]
    fn transfer_errors_propagate() {
        let mut target = Recorder::new(8, 0x100, 16);
        assert_eq!(
            clear_chunk(&mut target, 0x108, 16),
            Err(TargetError::OutOfRange {
                addr: 0x110,
                len: 8
            })
        );
    }
}
