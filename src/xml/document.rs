// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::tree::{parse_tree, Element, XmlNode, XmlTree};
use super::XmlError;

const GRAPH_MODEL: &str = "mxGraphModel";
const ROOT_CONTAINER: &str = "root";
const CELL: &str = "mxCell";

/// Cell ids every mxGraph document reserves for its layer/parent scaffolding.
pub const BASE_CELL_IDS: [&str; 2] = ["0", "1"];

/// A parsed diagram document.
///
/// The tree is never mutated after parsing; partial documents are produced by [`rebuild`]
/// into a fresh clone so the source stays reusable for every frame.
///
/// [`rebuild`]: DiagramDocument::rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramDocument {
    tree: XmlTree,
    root_path: Vec<usize>,
}

/// Cells of one document in streaming order: structural cells first, then nodes, then edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPlan<'a> {
    pub base: Vec<&'a Element>,
    pub ordered: Vec<&'a Element>,
}

impl StreamPlan<'_> {
    pub fn content_len(&self) -> usize {
        self.ordered.len()
    }

    /// Base cells plus the first `len` content cells.
    pub fn frame_cells(&self, len: usize) -> Vec<&Element> {
        let len = len.min(self.ordered.len());
        self.base.iter().chain(self.ordered[..len].iter()).copied().collect()
    }
}

pub fn parse_diagram(text: &str) -> Result<DiagramDocument, XmlError> {
    let tree = parse_tree(text)?;
    let root_path = find_root_container(&tree).ok_or(XmlError::MissingRoot)?;

    let has_cells = tree
        .element_at(&root_path)
        .is_some_and(|root| root.child_elements().next().is_some());
    if !has_cells {
        return Err(XmlError::NoCells);
    }

    Ok(DiagramDocument { tree, root_path })
}

/// Locates the root container: `mxGraphModel > root` first, any `root` element otherwise.
fn find_root_container(tree: &XmlTree) -> Option<Vec<usize>> {
    tree.find_path(|element, parent| {
        element.name() == ROOT_CONTAINER && parent.is_some_and(|p| p.name() == GRAPH_MODEL)
    })
    .or_else(|| tree.find_path(|element, _| element.name() == ROOT_CONTAINER))
}

pub fn cell_id(cell: &Element) -> Option<&str> {
    cell.attribute("id")
}

pub fn is_base_cell(cell: &Element) -> bool {
    cell_id(cell).is_some_and(|id| BASE_CELL_IDS.contains(&id))
}

/// Edge flag of a cell. `UserObject`/`object` wrappers carry it on their inner `mxCell`.
pub fn is_edge(cell: &Element) -> bool {
    if cell.attribute("edge") == Some("1") {
        return true;
    }
    cell.name() != CELL
        && cell
            .first_child_named(CELL)
            .is_some_and(|inner| inner.attribute("edge") == Some("1"))
}

/// Splits root children into `(base_cells, content_cells)`, preserving document order.
pub fn classify<'a>(
    cells: impl IntoIterator<Item = &'a Element>,
) -> (Vec<&'a Element>, Vec<&'a Element>) {
    cells.into_iter().partition(|cell| is_base_cell(cell))
}

/// Splits content cells into `(nodes, edges)`, preserving document order.
pub fn split_by_edge<'a>(
    cells: impl IntoIterator<Item = &'a Element>,
) -> (Vec<&'a Element>, Vec<&'a Element>) {
    let (edges, nodes): (Vec<&Element>, Vec<&Element>) =
        cells.into_iter().partition(|cell| is_edge(cell));
    (nodes, edges)
}

impl DiagramDocument {
    pub fn tree(&self) -> &XmlTree {
        &self.tree
    }

    pub fn root_container(&self) -> Option<&Element> {
        self.tree.element_at(&self.root_path)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Element> {
        self.root_container().into_iter().flat_map(|root| root.child_elements())
    }

    pub fn stream_plan(&self) -> StreamPlan<'_> {
        let (base, content) = classify(self.cells());
        let (mut ordered, edges) = split_by_edge(content);
        ordered.extend(edges);
        StreamPlan { base, ordered }
    }

    /// Serializes a copy of this document whose root container holds exactly `cells`.
    pub fn rebuild(&self, cells: &[&Element]) -> Result<String, XmlError> {
        let mut copy = self.tree.clone();
        let root = copy.element_at_mut(&self.root_path).ok_or(XmlError::MissingRoot)?;

        let children = root.children_mut();
        children.clear();
        children.extend(cells.iter().map(|cell| XmlNode::Element((*cell).clone())));

        copy.to_xml_string()
    }
}
