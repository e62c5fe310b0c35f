// JSON Canvas document model.
//
// Nodes are a tagged union over a shared `NodeBase`; edges point at nodes by
// id only. Attributes the model does not know about are carried through a
// read/modify/write cycle untouched.

use crate::error::CanvasError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
pub use linkcard_scanner::extractor::is_web_url;

/// Identity and geometry shared by every node variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBase {
    pub id: String,
    pub x: Number,
    pub y: Number,
    pub width: Number,
    pub height: Number,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeBase {
    pub fn new(id: impl Into<String>, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            id: id.into(),
            x: x.into(),
            y: y.into(),
            width: width.into(),
            height: height.into(),
            color: None,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    #[serde(flatten)]
    pub base: NodeBase,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    #[serde(flatten)]
    pub base: NodeBase,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subpath: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkNode {
    #[serde(flatten)]
    pub base: NodeBase,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CanvasNode {
    Text(TextNode),
    File(FileNode),
    Link(LinkNode),
    Group(GroupNode),
}

impl CanvasNode {
    pub fn base(&self) -> &NodeBase {
        match self {
            CanvasNode::Text(node) => &node.base,
            CanvasNode::File(node) => &node.base,
            CanvasNode::Link(node) => &node.base,
            CanvasNode::Group(node) => &node.base,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CanvasNode::Text(_) => "text",
            CanvasNode::File(_) => "file",
            CanvasNode::Link(_) => "link",
            CanvasNode::Group(_) => "group",
        }
    }

    /// The URL this node points at, if it is a link card.
    ///
    /// Link nodes always qualify; a text node qualifies when its whole text is
    /// a single web URL.
    pub fn link_target(&self) -> Option<&str> {
        match self {
            CanvasNode::Link(node) => Some(node.url.trim()),
            CanvasNode::Text(node) => {
                let text = node.text.trim();
                (!text.contains(char::is_whitespace) && is_web_url(text)).then_some(text)
            }
            _ => None,
        }
    }

    pub fn as_link_card(&self) -> Option<LinkCard> {
        let target = self.link_target()?;
        Some(LinkCard {
            id: self.id().to_string(),
            target: target.to_string(),
        })
    }
}

/// A node that carries a URL worth enriching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCard {
    pub id: String,
    pub target: String,
}

impl LinkCard {
    pub fn has_web_target(&self) -> bool {
        is_web_url(&self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasEdge {
    pub id: String,
    #[serde(rename = "fromNode")]
    pub from_node: String,
    #[serde(rename = "toNode")]
    pub to_node: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    #[serde(default)]
    pub nodes: Vec<CanvasNode>,
    #[serde(default)]
    pub edges: Vec<CanvasEdge>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Canvas {
    /// Parse canvas JSON. A blank file is an empty canvas.
    pub fn parse(content: &str) -> Result<Self, CanvasError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(content).map_err(CanvasError::Parse)
    }

    /// Serialize with tab indentation, matching what canvas editors write.
    pub fn to_json_string(&self) -> Result<String, CanvasError> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)
            .map_err(CanvasError::Serialize)?;
        String::from_utf8(out).map_err(|e| CanvasError::Encoding(e.to_string()))
    }

    pub fn node(&self, id: &str) -> Option<&CanvasNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    /// Link cards in document order.
    pub fn link_cards(&self) -> Vec<LinkCard> {
        self.nodes.iter().filter_map(CanvasNode::as_link_card).collect()
    }

    /// Swap the node with `id` for `replacement`, returning the old node.
    ///
    /// The replacement must carry the same id so edges stay attached.
    pub fn replace_node(
        &mut self,
        id: &str,
        replacement: CanvasNode,
    ) -> Result<CanvasNode, CanvasError> {
        if replacement.id() != id {
            return Err(CanvasError::IdMismatch {
                expected: id.to_string(),
                found: replacement.id().to_string(),
            });
        }
        let slot = self
            .nodes
            .iter_mut()
            .find(|node| node.id() == id)
            .ok_or_else(|| CanvasError::NodeNotFound(id.to_string()))?;
        Ok(std::mem::replace(slot, replacement))
    }

    /// Edges with an endpoint that no longer resolves to a node.
    pub fn dangling_edges(&self) -> Vec<&CanvasEdge> {
        self.edges
            .iter()
            .filter(|edge| self.node(&edge.from_node).is_none() || self.node(&edge.to_node).is_none())
            .collect()
    }
}
