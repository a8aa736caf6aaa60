// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurs while parsing a [`Report`](crate::Report) from XML.
///
/// Returned by [`Report::parse`](crate::Report::parse).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The document is not well-formed XML.
    #[error("malformed XML at byte offset {position}")]
    Xml {
        /// The byte offset at which the error was detected.
        position: usize,

        /// The underlying error.
        #[source]
        error: quick_xml::Error,
    },

    /// The root element is neither `<testsuites>` nor `<testsuite>`.
    #[error(
        "expected <testsuites> or <testsuite> as the root element, found {}",
        display_root(.found.as_deref())
    )]
    InvalidRoot {
        /// The name of the root element, if any.
        found: Option<String>,
    },

    /// The document ended before an element was closed.
    #[error("unexpected end of document inside <{element}>")]
    UnexpectedEof {
        /// The element that was still open.
        element: String,
    },
}

fn display_root(found: Option<&str>) -> String {
    match found {
        Some(found) => format!("<{found}>"),
        None => "an empty document".to_owned(),
    }
}

/// An error that occurs while reading a [`Report`](crate::Report) from disk.
///
/// Returned by [`Report::from_path`](crate::Report::from_path).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReadError {
    /// The file could not be read.
    #[error("failed to read JUnit report at `{path}`")]
    Read {
        /// The path that was read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The file was read but could not be parsed.
    #[error("failed to parse JUnit report at `{path}`")]
    Parse {
        /// The path that was read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: ParseError,
    },
}
