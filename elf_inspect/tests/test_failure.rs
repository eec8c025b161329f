use std::{fs::write, process::Command};

use tempfile::TempDir;

#[test]
fn test_elf_file_not_present() {
    let dir = TempDir::new().unwrap();
    let not_present_elf = dir.path().join("no.such.program");

    let output = Command::new(env!("CARGO_BIN_EXE_elf_inspect"))
        .arg("--elf-path")
        .arg(&not_present_elf)
        .output()
        .unwrap();

    assert!(!output.status.success());

    let err_msg = String::from_utf8_lossy(&output.stderr);
    assert!(
        err_msg.contains("failed to read ELF file")
            && err_msg.contains(not_present_elf.to_str().unwrap())
    );
}

#[test]
fn test_elf_file_not_valid() {
    let dir = TempDir::new().unwrap();
    let not_valid_elf = dir.path().join("illegal.program");
    write(&not_valid_elf, "NOT_AN_ELF_FILE").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_elf_inspect"))
        .arg("--elf-path")
        .arg(&not_valid_elf)
        .output()
        .unwrap();

    assert!(!output.status.success());

    let err_msg = String::from_utf8_lossy(&output.stderr);
    assert!(
        err_msg.contains("failed to parse ELF file")
            && err_msg.contains(not_valid_elf.to_str().unwrap())
    );
}
