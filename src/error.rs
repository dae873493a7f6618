//! Errors returned by the checked trie API.

use thiserror::Error;

/// Error type for checked trie operations.
///
/// Absent values are never errors; queries report them as `None`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("value {value:#x} does not fit in {bits} bits")]
    ValueOutOfRange { value: u64, bits: u32 },
    #[error("multiplicity overflow: {total} + {added} exceeds the counter range")]
    CountOverflow { total: u64, added: u64 },
}
