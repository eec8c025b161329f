//! Memory-signature dumps for compliance test harnesses.

use std::{fmt::Write as _, fs::write, path::Path};

use crate::error::{HtifError, Result};

/// Bytes per signature line.
pub const LINE_SIZE: usize = 16;

/// Format a signature region: one line per [`LINE_SIZE`] bytes, highest
/// address first, short last line padded with zero bytes.
pub fn format_signature(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(LINE_SIZE) * (LINE_SIZE * 2 + 1));
    for line in bytes.chunks(LINE_SIZE) {
        for j in (0..LINE_SIZE).rev() {
            let byte = line.get(j).copied().unwrap_or(0);
            let _ = write!(out, "{byte:02x}");
        }
        out.push('\n');
    }
    out
}

pub(crate) fn write_signature(path: &Path, bytes: &[u8]) -> Result<()> {
    write(path, format_signature(bytes)).map_err(|source| HtifError::Signature {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_little_endian_words() {
        let bytes: Vec<u8> = (0..32).collect();
        assert_eq!(
            format_signature(&bytes),
            "0f0e0d0c0b0a09080706050403020100\n1f1e1d1c1b1a19181716151413121110\n"
        );
    }

    #[test]
    fn short_tail_is_zero_padded() {
        assert_eq!(
            format_signature(&[0xde, 0xad, 0xbe, 0xef]),
            "000000000000000000000000efbeadde\n"
        );
        assert_eq!(format_signature(&[]), "");
    }

    #[test]
    fn unwritable_path_reports_the_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing-dir/out.sig");
        let err = write_signature(&path, &[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("out.sig"));
    }
}
