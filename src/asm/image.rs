//! Memory image files.
//!
//! The text format is a hex dump:
//! - `AA: BB BB ...` writes consecutive cells starting at address `AA`
//! - Lines starting with `;` are comments
//! - Blank lines are ignored
//!
//! Files ending in `.json` hold an object mapping addresses to values, and
//! files ending in `.asm` are assembled.

use super::assembler::{assemble, AssemblerError};
use crate::cpu::Memory;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Cells per line when writing the text format.
const CELLS_PER_LINE: usize = 8;

/// Load a memory image from disk, choosing the format by extension.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Memory, ImageError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| ImageError::IoError(e.to_string()))?;

    let mem = match path.extension().and_then(|e| e.to_str()) {
        Some("asm") => assemble(&text)?,
        Some("json") => serde_json::from_str(&text).map_err(|e| ImageError::JsonError(e.to_string()))?,
        _ => parse_image(&text)?,
    };

    log::debug!("loaded {} cells from {}", mem.len(), path.display());
    Ok(mem)
}

/// Parse the text hex-dump format.
pub fn parse_image(text: &str) -> Result<Memory, ImageError> {
    let mut mem = Memory::new();

    for (line_num, line) in text.lines().enumerate() {
        let line_num = line_num + 1;
        let trimmed = match line.find(';') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if trimmed.is_empty() {
            continue;
        }

        let (addr, bytes) = trimmed.split_once(':').ok_or_else(|| ImageError::ParseError {
            line: line_num,
            message: "expected 'ADDR: BYTES'".into(),
        })?;
        let start = parse_hex(addr, line_num)?;
        let values = bytes
            .split_whitespace()
            .map(|b| parse_hex(b, line_num))
            .collect::<Result<Vec<u8>, _>>()?;

        mem.load(start, &values).map_err(|e| ImageError::ParseError {
            line: line_num,
            message: e.to_string(),
        })?;
    }

    Ok(mem)
}

fn parse_hex(text: &str, line_num: usize) -> Result<u8, ImageError> {
    let text = text.trim();
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u8::from_str_radix(digits, 16).map_err(|_| ImageError::ParseError {
        line: line_num,
        message: format!("invalid hex byte '{}'", text),
    })
}

/// Render a memory image in the text format.
pub fn format_image(mem: &Memory) -> String {
    let mut out = String::new();
    out.push_str("; acc8 memory image\n");
    out.push_str(&format!("; {} cells\n", mem.len()));

    let mut run: Vec<(u8, u8)> = Vec::new();
    for (addr, value) in mem.cells() {
        let contiguous = run
            .last()
            .is_some_and(|(prev, _)| prev.checked_add(1) == Some(addr));
        if !contiguous || run.len() == CELLS_PER_LINE {
            flush(&mut run, &mut out);
        }
        run.push((addr, value));
    }
    flush(&mut run, &mut out);

    out
}

fn flush(run: &mut Vec<(u8, u8)>, out: &mut String) {
    if let Some((start, _)) = run.first() {
        let bytes: Vec<String> = run.iter().map(|(_, v)| format!("{:02x}", v)).collect();
        out.push_str(&format!("{:02x}: {}\n", start, bytes.join(" ")));
    }
    run.clear();
}

/// Save a memory image to disk; `.json` paths get JSON, others the text format.
pub fn save_image<P: AsRef<Path>>(path: P, mem: &Memory) -> Result<(), ImageError> {
    let path = path.as_ref();
    let contents = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_string_pretty(mem).map_err(|e| ImageError::JsonError(e.to_string()))?,
        _ => format_image(mem),
    };

    let mut file = std::fs::File::create(path).map_err(|e| ImageError::IoError(e.to_string()))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| ImageError::IoError(e.to_string()))?;

    log::debug!("saved {} cells to {}", mem.len(), path.display());
    Ok(())
}

/// Errors that can occur during image operations.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("assembly error: {0}")]
    AssemblyError(#[from] AssemblerError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::programs;

    #[test]
    fn test_format_groups_contiguous_cells() {
        let text = format_image(&programs::demo());
        assert!(text.contains("00: 00 0f 01 01 03 04 09\n"));
        assert!(text.contains("09: 00 00 05 0f 00 01 0f\n"));
    }

    #[test]
    fn test_text_image_roundtrip() {
        let mem = Memory::from_cells((0..20).map(|a| (a * 3, a)));
        assert_eq!(parse_image(&format_image(&mem)).unwrap(), mem);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_image("00 01"), Err(ImageError::ParseError { line: 1, .. })));
        assert!(matches!(
            parse_image("; ok\n00: 0g"),
            Err(ImageError::ParseError { line: 2, .. })
        ));
        assert!(matches!(parse_image("ff: 01 02"), Err(ImageError::ParseError { line: 1, .. })));
    }

    #[test]
    fn test_json_image() {
        let json = serde_json::to_string(&programs::demo()).unwrap();
        assert!(json.starts_with("{\"0\":0,\"1\":15"));
        let back: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, programs::demo());
    }

    #[test]
    fn test_files_on_disk() {
        let dir = std::env::temp_dir().join(format!("acc8-image-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        for name in ["demo.img", "demo.json"] {
            let path = dir.join(name);
            save_image(&path, &programs::demo()).unwrap();
            assert_eq!(load_image(&path).unwrap(), programs::demo());
        }

        let asm = dir.join("demo.asm");
        std::fs::write(&asm, programs::DEMO_SOURCE).unwrap();
        assert_eq!(load_image(&asm).unwrap(), programs::demo());

        assert!(matches!(load_image(dir.join("missing.img")), Err(ImageError::IoError(_))));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
