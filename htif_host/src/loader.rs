//! ELF loading and program path resolution.

use std::{
    fs::read,
    path::{Path, PathBuf},
};

use goblin::elf::{Elf, program_header::PT_LOAD};
use log::{debug, info};

use crate::error::{HtifError, Result};
use crate::memif::TargetMemory;
use crate::target::SymbolTable;

/// Installation prefix baked in at build time.
pub const PREFIX: &str = match option_env!("HTIF_PREFIX") {
    Some(prefix) => prefix,
    None => "/usr/local",
};

/// Target architecture triple baked in at build time.
pub const TARGET_ARCH: &str = match option_env!("HTIF_TARGET_ARCH") {
    Some(arch) => arch,
    None => "riscv64-unknown-elf",
};

/// What a loaded program leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub entry: u64,
    pub symbols: SymbolTable,
}

/// Loads an ELF image into target memory.
pub trait ElfLoader {
    fn load_elf(&self, path: &Path, memory: &mut dyn TargetMemory) -> Result<LoadedImage>;
}

/// [`ElfLoader`] parsing with `goblin`.
///
/// Copies each `PT_LOAD` segment's file bytes to its physical address (the
/// virtual address when the physical one is zero) and zero-fills the
/// remainder up to `p_memsz`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoblinLoader;

impl ElfLoader for GoblinLoader {
    fn load_elf(&self, path: &Path, memory: &mut dyn TargetMemory) -> Result<LoadedImage> {
        let bytes = read(path).map_err(|source| HtifError::ReadElf {
            path: path.to_path_buf(),
            source,
        })?;
        load_elf_bytes(path, &bytes, memory)
    }
}

/// Load an already-read ELF image. `path` is only used in diagnostics.
pub fn load_elf_bytes(
    path: &Path,
    bytes: &[u8],
    memory: &mut dyn TargetMemory,
) -> Result<LoadedImage> {
    let elf = Elf::parse(bytes).map_err(|source| HtifError::ParseElf {
        path: path.to_path_buf(),
        source,
    })?;

    for ph in elf
        .program_headers
        .iter()
        .filter(|ph| ph.p_type == PT_LOAD && ph.p_memsz > 0)
    {
        let end = ph.p_offset.checked_add(ph.p_filesz);
        if end.is_none_or(|end| end > bytes.len() as u64) || ph.p_filesz > ph.p_memsz {
            return Err(HtifError::BadSegment {
                path: path.to_path_buf(),
                offset: ph.p_offset,
                len: ph.p_filesz,
            });
        }
        let addr = if ph.p_paddr != 0 {
            ph.p_paddr
        } else {
            ph.p_vaddr
        };
        let file = &bytes[ph.p_offset as usize..(ph.p_offset + ph.p_filesz) as usize];
        debug!(
            "Loading segment at {addr:#x}: {} file bytes, {} memory bytes",
            ph.p_filesz, ph.p_memsz
        );
        memory.write(addr, file)?;
        memory.clear(addr + ph.p_filesz, (ph.p_memsz - ph.p_filesz) as usize)?;
    }

    let symbols: SymbolTable = elf
        .syms
        .iter()
        .filter(|sym| sym.st_name != 0)
        .filter_map(|sym| {
            elf.strtab
                .get_at(sym.st_name)
                .map(|name| (name.to_string(), sym.st_value))
        })
        .collect();

    info!(
        "Loaded ELF file '{}': entry {:#x}, {} symbol(s)",
        path.display(),
        elf.entry,
        symbols.len()
    );
    Ok(LoadedImage {
        entry: elf.entry,
        symbols,
    })
}

/// Finds the file a target binary name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramResolver {
    install_dir: PathBuf,
}

impl Default for ProgramResolver {
    fn default() -> Self {
        Self::with_prefix(PREFIX, TARGET_ARCH)
    }
}

impl ProgramResolver {
    /// Bare names fall back to `<prefix>/<target_arch>/bin/`.
    pub fn with_prefix(prefix: impl AsRef<Path>, target_arch: &str) -> Self {
        Self {
            install_dir: prefix.as_ref().join(target_arch).join("bin"),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// The name as given when it exists, otherwise the installed copy of a
    /// bare name.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let direct = Path::new(name);
        if direct.exists() {
            return Ok(direct.to_path_buf());
        }
        debug!("'{name}' not found relative to the current directory");

        if !name.contains('/') {
            let installed = self.install_dir.join(name);
            if installed.exists() {
                return Ok(installed);
            }
            debug!("'{name}' not found in '{}'", self.install_dir.display());
        }

        Err(HtifError::FileNotFound {
            path: name.to_string(),
        })
    }
}
