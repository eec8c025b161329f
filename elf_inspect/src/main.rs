use std::{fs::read, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use htif_host::{ImageConfig, MemImage, Memif, load_elf_bytes};
use log::info;

/// Check that an ELF file loads into a target memory image.
#[derive(Parser, Debug)]
struct Args {
    #[arg(short, long)]
    elf_path: PathBuf,

    /// Also print the symbol table.
    #[arg(short, long)]
    symbols: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let elf_bytes = read(&args.elf_path)
        .with_context(|| format!("failed to read ELF file '{}'", args.elf_path.display()))?;

    let mut image = MemImage::new(ImageConfig {
        chunk_max_size: 4096,
        ..ImageConfig::default()
    });
    let loaded = load_elf_bytes(&args.elf_path, &elf_bytes, &mut Memif::new(&mut image))?;
    info!(
        "Loaded '{}' into {} bytes of target memory",
        args.elf_path.display(),
        image.mapped_bytes()
    );

    println!("entry: {:#x}", loaded.entry);
    println!("mapped: {} bytes", image.mapped_bytes());
    match (loaded.symbols.get("tohost"), loaded.symbols.get("fromhost")) {
        (Some(tohost), Some(fromhost)) => {
            println!("tohost: {tohost:#x}");
            println!("fromhost: {fromhost:#x}");
        }
        (Some(tohost), None) => println!("tohost: {tohost:#x}"),
        _ => println!("tohost: missing"),
    }
    if args.symbols {
        for (name, addr) in &loaded.symbols {
            println!("{addr:#018x} {name}");
        }
    }

    Ok(())
}
