//! The front-end session: load a program, reset the target, poll until done.

use std::path::Path;

use log::{info, warn};

use crate::args::{Classification, Classifier, HostOptions, PlusArg};
use crate::error::{HtifError, Result};
use crate::loader::{ElfLoader, GoblinLoader, ProgramResolver};
use crate::memif::{Memif, clear_chunk};
use crate::signature::write_signature;
use crate::target::{SymbolTable, Target, TargetStatus};

/// Default entry point, used until a program is loaded.
pub const DRAM_BASE: u64 = 0x8000_0000;

/// Target argument that skips program loading.
pub const NO_PROGRAM: &str = "none";

/// Largest `begin_signature`..`end_signature` region that is dumped.
pub const MAX_SIGNATURE_BYTES: usize = 64 << 20;

/// Program name supplied by [`Session::from_args`].
const DEFAULT_PROGRAM: &str = "htif";

/// One run of the front-end server against one target.
///
/// The session borrows its target and ELF loader; it owns the classified
/// command line and the completion status.
pub struct Session<'a> {
    target: &'a mut dyn Target,
    loader: &'a dyn ElfLoader,
    resolver: ProgramResolver,
    args: Classification,
    entry: u64,
    status: TargetStatus,
    symbols: SymbolTable,
    started: bool,
}

impl<'a> Session<'a> {
    /// Classify `argv` with the default option table and load through
    /// [`GoblinLoader`].
    pub fn new<S: AsRef<str>>(target: &'a mut dyn Target, argv: &[S]) -> Result<Self> {
        Self::with_collaborators(target, &GoblinLoader, &Classifier::default(), argv)
    }

    /// Like [`new`](Self::new) for an argument list without a program name.
    pub fn from_args<S: AsRef<str>>(target: &'a mut dyn Target, args: &[S]) -> Result<Self> {
        let argv: Vec<&str> = std::iter::once(DEFAULT_PROGRAM)
            .chain(args.iter().map(AsRef::as_ref))
            .collect();
        Self::new(target, &argv)
    }

    pub fn with_collaborators<S: AsRef<str>>(
        target: &'a mut dyn Target,
        loader: &'a dyn ElfLoader,
        classifier: &Classifier,
        argv: &[S],
    ) -> Result<Self> {
        let args = classifier.classify(argv)?;
        Ok(Self {
            target,
            loader,
            resolver: ProgramResolver::default(),
            args,
            entry: DRAM_BASE,
            status: TargetStatus::default(),
            symbols: SymbolTable::new(),
            started: false,
        })
    }

    pub fn with_resolver(mut self, resolver: ProgramResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn entry(&self) -> u64 {
        self.entry
    }

    pub fn target_args(&self) -> &[String] {
        &self.args.target_args
    }

    pub fn options(&self) -> &HostOptions {
        &self.args.options
    }

    pub fn plusargs(&self) -> &[PlusArg] {
        &self.args.plusargs
    }

    /// Tokens skipped while parsing permissively.
    pub fn passthrough(&self) -> &[String] {
        &self.args.passthrough
    }

    pub fn signature_file(&self) -> Option<&Path> {
        self.args.options.signature_file.as_deref()
    }

    /// Symbols of the loaded program; empty before loading.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn status(&self) -> &TargetStatus {
        &self.status
    }

    /// Load the program unless the target is `"none"`, then reset the target.
    /// May only be called once.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(HtifError::invalid("session already started"));
        }
        self.started = true;

        if self.args.target_args.first().is_some_and(|t| t != NO_PROGRAM) {
            self.load_program()?;
        }
        self.target.reset()?;
        info!("Target reset, entry point {:#x}", self.entry);
        Ok(())
    }

    /// Resolve the target binary and load it into target memory.
    pub fn load_program(&mut self) -> Result<()> {
        let name = self
            .args
            .target_args
            .first()
            .ok_or(HtifError::NoBinary)?;
        let path = self.resolver.resolve(name)?;

        let image = {
            let mut memif = Memif::new(&mut *self.target);
            self.loader.load_elf(&path, &mut memif)?
        };
        info!(
            "Loaded program '{}' with entry point {:#x}",
            path.display(),
            image.entry
        );
        self.entry = image.entry;
        self.target.bind_symbols(&image.symbols);
        self.symbols = image.symbols;
        Ok(())
    }

    /// One polling quantum. Does nothing once the target has stopped.
    pub fn idle(&mut self) -> Result<()> {
        if self.status.stopped() {
            return Ok(());
        }
        self.target.idle(&mut self.status)?;
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.status.stopped() {
            info!("Stopping session");
        }
        self.status.stop();
    }

    pub fn done(&self) -> bool {
        self.status.stopped()
    }

    /// The target's exit value. Only meaningful once [`done`](Self::done).
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    /// Start, poll until the target stops, write the signature file if one
    /// was requested, and return the exit value.
    pub fn run(&mut self) -> Result<i32> {
        self.start()?;
        while !self.done() {
            self.idle()?;
        }
        self.stop();
        self.dump_signature()?;
        info!("Target exited with code {}", self.exit_code());
        Ok(self.exit_code())
    }

    /// Zero `len` bytes of target memory at `addr` in maximum-sized chunks.
    pub fn clear_chunk(&mut self, addr: u64, len: usize) -> Result<()> {
        clear_chunk(&mut *self.target, addr, len)?;
        Ok(())
    }

    /// Chunked memory access to the target.
    pub fn memif(&mut self) -> Memif<'_> {
        Memif::new(&mut *self.target)
    }

    fn dump_signature(&mut self) -> Result<()> {
        let Some(path) = self.args.options.signature_file.clone() else {
            return Ok(());
        };
        let (Some(&begin), Some(&end)) = (
            self.symbols.get("begin_signature"),
            self.symbols.get("end_signature"),
        ) else {
            warn!(
                "No begin_signature/end_signature symbols, not writing '{}'",
                path.display()
            );
            return Ok(());
        };
        if end < begin {
            warn!("end_signature {end:#x} precedes begin_signature {begin:#x}");
            return Ok(());
        }

        let len = usize::try_from(end - begin)
            .ok()
            .filter(|len| *len <= MAX_SIGNATURE_BYTES)
            .ok_or_else(|| HtifError::SignatureTooLarge {
                path: path.clone(),
                begin,
                end,
                max: MAX_SIGNATURE_BYTES,
            })?;

        let mut region = vec![0u8; len];
        self.memif().read(begin, &mut region)?;
        write_signature(&path, &region)?;
        info!(
            "Wrote {} signature byte(s) to '{}'",
            region.len(),
            path.display()
        );
        Ok(())
    }
}
