// Copyright 2025 the Stencio Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for the decoder.

use thiserror::Error;

/// Errors produced while decoding a Visio document.
///
/// `EndOfStream` doubles as internal control flow: greedy readers inside a
/// chunk run until the chunk's slice is exhausted, and the chunk loop treats
/// it as a clean end-of-chunk. `CorruptedStream` aborts the innermost
/// sub-stream only; the stream dispatcher continues with the next one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The container declares a format generation this decoder does not know.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    /// A chunk header or compressed stream failed to decode.
    #[error("corrupted stream at offset {offset:#x}")]
    CorruptedStream { offset: usize },
    /// A read ran past the end of the current stream.
    #[error("unexpected end of stream")]
    EndOfStream,
    /// The XML token stream was not well-formed for the expected grammar.
    #[error("malformed xml input: {0}")]
    Xml(&'static str),
    /// A required package part is absent from the container.
    #[error("missing package part: {0}")]
    MissingPart(String),
}

pub type Result<T> = core::result::Result<T, ParseError>;
