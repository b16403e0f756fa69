//! Machine-level error type.
//!
//! Errors are raised only while loading a cartridge or restoring a save
//! state. Running the machine never fails: illegal opcodes execute their
//! best-known behavior or jam the CPU, which is observable but not an
//! error.

use thiserror::Error;

/// Errors surfaced to the host at load/restore time.
#[derive(Debug, Error)]
pub enum NesError {
    /// The iNES image is structurally invalid.
    #[error("malformed ROM: {0}")]
    RomMalformed(String),

    /// The mapper id is recognized but not implemented.
    #[error("unsupported mapper: {0}")]
    MapperUnsupported(u8),

    /// A save state failed its version or checksum validation.
    #[error("corrupt save state: {0}")]
    StateCorrupt(&'static str),
}
