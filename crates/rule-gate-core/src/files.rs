// crates/rule-gate-core/src/files.rs
// ============================================================================
// Module: Rule File I/O
// Description: Bounded reads and in-place writes for rule and test files.
// Purpose: Keep every filesystem touch of a run behind two audited helpers.
// Dependencies: Standard library filesystem APIs.
// ============================================================================

//! ## Overview
//! Reads are capped so an oversized input fails before it is buffered.
//! Writes truncate in place; files that have to be created get owner-only
//! permissions on unix.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Read;
use std::io::Write;
use std::path::Path;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Permission bits for rewritten rule files.
#[cfg(unix)]
const RULE_FILE_MODE: u32 = 0o600;

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Reads a file from disk while enforcing a hard size limit.
///
/// # Errors
///
/// Returns an I/O error when the file cannot be read or exceeds `max_bytes`
/// (reported as [`io::ErrorKind::InvalidData`]).
pub fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    let size = file.metadata()?.len();
    if size > limit {
        return Err(too_large(size, max_bytes));
    }
    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(too_large(actual, max_bytes));
    }
    Ok(bytes)
}

/// Replaces the content of `path` with `bytes`.
///
/// # Errors
///
/// Returns an I/O error when the file cannot be opened or written.
pub fn write_rule_file(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(RULE_FILE_MODE);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the error returned for oversized inputs.
fn too_large(size: u64, limit: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("file is {size} bytes, exceeding the {limit} byte limit"),
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
