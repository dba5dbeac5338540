// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagram markup handling.
//!
//! Parses mxGraph documents, splits their cells into structural/content sets and rebuilds
//! partial documents from a subset of cells.

pub mod document;
pub mod tree;

pub use document::{classify, parse_diagram, split_by_edge, DiagramDocument, StreamPlan};
pub use tree::{parse_tree, Element, XmlNode, XmlTree};

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("xml syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("element <{name}> is never closed")]
    Unclosed { name: String },
    #[error("document has no element")]
    NoDocumentElement,
    #[error("content outside the document element")]
    ContentOutsideRoot,
    #[error("no diagram root container found")]
    MissingRoot,
    #[error("diagram root container holds no cells")]
    NoCells,
    #[error("cannot write xml: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot write xml: {0}")]
    Writer(#[from] quick_xml::Error),
    #[error("serialized xml is not valid UTF-8")]
    Utf8,
}
