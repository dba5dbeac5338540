// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Drawbridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Drawbridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Owned XML tree with a quick-xml reader/writer on either side.
//!
//! The tree keeps everything needed to write a document back out (declaration, comments,
//! processing instructions, text) so a rebuilt diagram differs from its source only in the
//! subtrees that were replaced.

use std::borrow::Cow;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use super::XmlError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<XmlNode> {
        &mut self.children
    }

    pub fn push_child(&mut self, child: XmlNode) {
        self.children.push(child);
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn first_child_named(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|child| child.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    version: String,
    encoding: Option<String>,
    standalone: Option<String>,
}

/// A parsed document: optional declaration, misc nodes around a single document element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTree {
    declaration: Option<Declaration>,
    prolog: Vec<XmlNode>,
    root: Element,
    epilog: Vec<XmlNode>,
}

impl XmlTree {
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Follows child-element indices (not raw node indices) from the document element.
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = &self.root;
        for &index in path {
            current = current.child_elements().nth(index)?;
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = &mut self.root;
        for &index in path {
            current = current
                .children
                .iter_mut()
                .filter_map(|node| match node {
                    XmlNode::Element(element) => Some(element),
                    _ => None,
                })
                .nth(index)?;
        }
        Some(current)
    }

    /// Pre-order search for the first element accepted by `matches`; the predicate also sees the
    /// parent element (`None` for the document element).
    pub fn find_path(
        &self,
        matches: impl Fn(&Element, Option<&Element>) -> bool,
    ) -> Option<Vec<usize>> {
        fn walk(
            element: &Element,
            parent: Option<&Element>,
            path: &mut Vec<usize>,
            matches: &dyn Fn(&Element, Option<&Element>) -> bool,
        ) -> bool {
            if matches(element, parent) {
                return true;
            }
            for (index, child) in element.child_elements().enumerate() {
                path.push(index);
                if walk(child, Some(element), path, matches) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        walk(&self.root, None, &mut path, &matches).then_some(path)
    }

    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());

        if let Some(decl) = &self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
        }
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        for node in &self.epilog {
            write_node(&mut writer, node)?;
        }

        String::from_utf8(writer.into_inner()).map_err(|_| XmlError::Utf8)
    }
}

pub fn parse_tree(text: &str) -> Result<XmlTree, XmlError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut declaration = None;
    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root: Option<Element> = None;
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|err| XmlError::Syntax {
            position: reader.error_position() as u64,
            message: err.to_string(),
        })?;

        let node = match event {
            Event::Eof => break,
            Event::Decl(decl) => {
                if root.is_some() || !stack.is_empty() || declaration.is_some() {
                    return Err(syntax(&reader, "misplaced xml declaration"));
                }
                declaration = Some(read_declaration(&reader, &decl)?);
                continue;
            }
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::ContentOutsideRoot);
                }
                stack.push(read_start(&reader, &start)?);
                continue;
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(syntax(&reader, "unexpected end tag"));
                };
                XmlNode::Element(element)
            }
            Event::Empty(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::ContentOutsideRoot);
                }
                XmlNode::Element(read_start(&reader, &start)?)
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(|err| syntax(&reader, err))?;
                XmlNode::Text(value.into_owned())
            }
            Event::CData(data) => XmlNode::CData(String::from_utf8_lossy(&data).into_owned()),
            Event::Comment(comment) => {
                XmlNode::Comment(String::from_utf8_lossy(&comment).into_owned())
            }
            Event::PI(pi) => {
                XmlNode::ProcessingInstruction(String::from_utf8_lossy(&pi).into_owned())
            }
            Event::DocType(doctype) => {
                XmlNode::DocType(String::from_utf8_lossy(&doctype).into_owned())
            }
        };

        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
            continue;
        }

        match node {
            XmlNode::Element(element) => root = Some(element),
            XmlNode::Text(text) | XmlNode::CData(text) => {
                if !text.trim().is_empty() {
                    return Err(XmlError::ContentOutsideRoot);
                }
            }
            misc if root.is_none() => prolog.push(misc),
            misc => epilog.push(misc),
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Unclosed { name: open.name.clone() });
    }

    let root = root.ok_or(XmlError::NoDocumentElement)?;
    Ok(XmlTree { declaration, prolog, root, epilog })
}

fn syntax(reader: &Reader<&[u8]>, message: impl std::fmt::Display) -> XmlError {
    XmlError::Syntax { position: reader.buffer_position() as u64, message: message.to_string() }
}

fn read_declaration(reader: &Reader<&[u8]>, decl: &BytesDecl<'_>) -> Result<Declaration, XmlError> {
    let version = decl.version().map_err(|err| syntax(reader, err))?;
    let encoding = decl.encoding().transpose().map_err(|err| syntax(reader, err))?;
    let standalone = decl.standalone().transpose().map_err(|err| syntax(reader, err))?;

    Ok(Declaration {
        version: String::from_utf8_lossy(&version).into_owned(),
        encoding: encoding.map(|raw| String::from_utf8_lossy(&raw).into_owned()),
        standalone: standalone.map(|raw| String::from_utf8_lossy(&raw).into_owned()),
    })
}

fn read_start(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| syntax(reader, err))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(|err| syntax(reader, err))?;
        element.attributes.push((key, value.into_owned()));
    }

    Ok(element)
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), XmlError> {
    match node {
        XmlNode::Element(element) => write_element(writer, element)?,
        XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
        XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
        XmlNode::Comment(raw) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))?
        }
        XmlNode::ProcessingInstruction(raw) => {
            writer.write_event(Event::PI(BytesPI::new(raw.as_str())))?
        }
        XmlNode::DocType(raw) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(raw.as_str())))?
        }
    }
    Ok(())
}

/// Escapes an attribute value so that it survives attribute-value normalization: line breaks
/// and tabs are written as character references, not raw.
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#xa;"),
            '\r' => escaped.push_str("&#xd;"),
            '\t' => escaped.push_str("&#x9;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), XmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute(Attribute {
            key: QName(key.as_bytes()),
            value: Cow::Owned(escape_attribute(value).into_bytes()),
        });
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
