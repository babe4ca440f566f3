//! Matrix-code decoder boundary
//!
//! The finder-pattern search and error-correction decoding are provided by an
//! external decoder. The pipeline only needs to load a grayscale image, enumerate the
//! located codes, and decode each one independently.

use thiserror::Error;

/// Corner geometry of a located code, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodeCorners(pub [(i32, i32); 4]);

/// A code region found in the currently loaded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedCode {
    /// Position in the decoder's enumeration for this image
    pub index: usize,

    /// Corners of the code region
    pub corners: CodeCorners,

    /// Modules per side of the sampled grid
    pub grid_size: u32,

    /// Decoder-private sampled cell data
    pub cells: Vec<u8>,
}

/// Why a single located code could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DecodeErrorKind {
    #[error("invalid grid size")]
    InvalidGridSize,

    #[error("invalid version")]
    InvalidVersion,

    #[error("format data ECC failure")]
    FormatEcc,

    #[error("data ECC failure")]
    DataEcc,

    #[error("unknown data type")]
    UnknownDataType,

    #[error("data overflow")]
    DataOverflow,

    #[error("data underflow")]
    DataUnderflow,
}

/// Failure to accept a whole image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    #[error("image is {found} bytes, decoder expects {expected}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("decoder failure: {0}")]
    Internal(String),
}

/// External matrix-code decoder.
///
/// Used from the decode context only, so it takes `&mut self` for loading.
pub trait Decoder: Send + 'static {
    /// Width and height of the grayscale images the decoder accepts
    fn dimensions(&self) -> (u32, u32);

    /// Copy `gray` into the decoder's staging buffer and locate codes.
    ///
    /// After this returns the caller's buffer is no longer referenced. Returns the
    /// number of located codes.
    fn load(&mut self, gray: &[u8]) -> Result<usize, DecoderError>;

    /// Geometry of the `index`-th located code of the loaded image
    fn extract(&self, index: usize) -> Option<LocatedCode>;

    /// Decode one located code into its payload bytes
    fn decode(&self, code: &LocatedCode) -> Result<Vec<u8>, DecodeErrorKind>;
}
