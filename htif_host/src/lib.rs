//! Host-side front-end server for simulated and emulated targets.
//!
//! # Run Sequence
//!
//! ```text
//! classify argv -> load BINARY (unless "none") -> reset -> idle until stopped -> exit code
//! ```
//!
//! - **Classification** ([`Classifier`]) splits the command line into host
//!   options, plusargs and target arguments.
//! - **Loading** ([`ElfLoader`]) writes the program image through a chunked
//!   memory interface ([`Memif`]) into the [`Target`].
//! - **Polling** ([`Session::run`]) calls [`Target::idle`] until the target
//!   reports a status word with bit 0 set; the exit code is the rest of the
//!   word.
//!
//! # Interrupts
//!
//! [`signal::install`] arms SIGINT/SIGTERM/SIGABRT handlers. One interrupt
//! sets a flag targets are expected to honor ([`signal::exit_requested`]); a
//! second one terminates the process immediately.

mod args;
mod error;
mod image;
mod loader;
mod memif;
mod options;
mod session;
pub mod signal;
mod signature;
mod target;
mod usage;

pub use args::{Classification, Classifier, HostOptions, PlusArg, SelectedOption};
pub use error::{HtifError, Result, TargetError};
pub use image::{INTERRUPTED_EXIT_CODE, ImageConfig, MemImage, PAGE_SIZE};
pub use loader::{
    ElfLoader, GoblinLoader, LoadedImage, PREFIX, ProgramResolver, TARGET_ARCH, load_elf_bytes,
};
pub use memif::{Memif, TargetMemory, clear_chunk};
pub use options::{HasArg, LongOption, Lookup, OptionTable, OptionTag};
pub use session::{DRAM_BASE, MAX_SIGNATURE_BYTES, NO_PROGRAM, Session};
pub use signature::{LINE_SIZE, format_signature};
pub use target::{SymbolTable, Target, TargetStatus};
pub use usage::{render_usage, usage_command};
