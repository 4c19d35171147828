/*!
The abstract hierarchical attribute container used to (de)serialize every
part of an automaton (§4.2). Any isomorphic concrete encoding (XML, the
`config` module's YAML, a binary blob) is just a front-end that builds or
walks a [`DescriptionNode`] tree; nothing downstream of this module knows or
cares which front-end produced it.
*/

use indexmap::IndexMap;

use crate::errors::AutomatonError;
use crate::matrix::{format_matrix, parse_matrix, Matrix};

/// One node of a description tree: a type tag, a flat string attribute map,
/// and an ordered list of children.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionNode {
    node_type: String,
    attributes: IndexMap<String, String>,
    children: Vec<DescriptionNode>,
}

impl DescriptionNode {
    /// Creates a new, empty node of the given type.
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn get_type(&self) -> &str {
        &self.node_type
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.set_attribute(key, value.to_string())
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>, AutomatonError> {
        self.get_attribute(key)
            .map(|v| {
                v.trim().parse::<i64>().map_err(|_| AutomatonError::ParseError {
                    path: self.node_type.clone(),
                    reason: format!("attribute {key:?}={v:?} is not an integer"),
                })
            })
            .transpose()
    }

    pub fn set_double(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.set_attribute(key, value.to_string())
    }

    pub fn get_double(&self, key: &str) -> Result<Option<f64>, AutomatonError> {
        self.get_attribute(key)
            .map(|v| {
                v.trim().parse::<f64>().map_err(|_| AutomatonError::ParseError {
                    path: self.node_type.clone(),
                    reason: format!("attribute {key:?}={v:?} is not a double"),
                })
            })
            .transpose()
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.set_attribute(key, if value { "true" } else { "false" })
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, AutomatonError> {
        self.get_attribute(key)
            .map(|v| match v {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(AutomatonError::ParseError {
                    path: self.node_type.clone(),
                    reason: format!("attribute {key:?}={other:?} is not `true`/`false`"),
                }),
            })
            .transpose()
    }

    pub fn set_matrix(&mut self, key: impl Into<String>, value: &Matrix) -> &mut Self {
        self.set_attribute(key, format_matrix(value))
    }

    pub fn get_matrix(&self, key: &str) -> Result<Option<Matrix>, AutomatonError> {
        self.get_attribute(key).map(parse_matrix).transpose()
    }

    /// Typed getter returning a [`AutomatonError::MissingAttribute`] instead
    /// of `None` when the attribute is required.
    pub fn require_attribute(&self, key: &str) -> Result<&str, AutomatonError> {
        self.get_attribute(key)
            .ok_or_else(|| AutomatonError::MissingAttribute {
                path: self.node_type.clone(),
                attribute: key.to_string(),
            })
    }

    pub fn require_matrix(&self, key: &str) -> Result<Matrix, AutomatonError> {
        self.get_matrix(key)?
            .ok_or_else(|| AutomatonError::MissingAttribute {
                path: self.node_type.clone(),
                attribute: key.to_string(),
            })
    }

    pub fn add_child(&mut self, child: DescriptionNode) -> &mut Self {
        self.children.push(child);
        self
    }

    pub fn children(&self) -> &[DescriptionNode] {
        &self.children
    }

    /// Children whose type tag matches `node_type`, in document order.
    pub fn children_of_type<'a>(&'a self, node_type: &str) -> Vec<&'a DescriptionNode> {
        self.children
            .iter()
            .filter(|c| c.node_type == node_type)
            .collect()
    }

    /// Convenience for the common case of exactly one expected child of a
    /// given type.
    pub fn child_of_type(&self, node_type: &str) -> Result<&DescriptionNode, AutomatonError> {
        self.children_of_type(node_type)
            .into_iter()
            .next()
            .ok_or_else(|| AutomatonError::MissingAttribute {
                path: self.node_type.clone(),
                attribute: format!("<{node_type}> child"),
            })
    }
}
