/*!
Authoring convenience on top of §6's abstract tree (§6.1 expansion): loads a
[`DescriptionNode`] from a YAML document shaped isomorphically to the tree
(`type`, `attributes`, `children` keys at every level), via `serde_yaml`.
Nothing downstream of [`load_description`] is aware YAML was involved.
*/

use serde::Deserialize;
use std::collections::HashMap;

use crate::description_tree::DescriptionNode;
use crate::errors::AutomatonError;

/// The YAML-native shape one `DescriptionNode` deserializes from.
#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    children: Vec<RawNode>,
}

impl From<RawNode> for DescriptionNode {
    fn from(raw: RawNode) -> Self {
        let mut node = DescriptionNode::new(raw.node_type);
        for (key, value) in raw.attributes {
            node.set_attribute(key, value);
        }
        for child in raw.children {
            node.add_child(child.into());
        }
        node
    }
}

/// Parses a YAML document into a [`DescriptionNode`] tree.
///
/// This is purely a textual front-end over the abstract tree (§6.1); it does
/// not itself know anything about automata, modes, or controllers.
pub fn load_description(yaml: &str) -> Result<DescriptionNode, AutomatonError> {
    let raw: RawNode = serde_yaml::from_str(yaml).map_err(|err| AutomatonError::ParseError {
        path: "<yaml>".to_string(),
        reason: err.to_string(),
    })?;
    Ok(raw.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_nested_nodes_and_attributes() {
        let yaml = r#"
type: HybridAutomaton
attributes:
  name: demo
  current_control_mode: CM1
children:
  - type: ControlMode
    attributes:
      name: CM1
    children: []
"#;
        let node = load_description(yaml).unwrap();
        assert_eq!(node.get_type(), "HybridAutomaton");
        assert_eq!(node.get_attribute("name"), Some("demo"));
        assert_eq!(node.children_of_type("ControlMode").len(), 1);
        assert_eq!(
            node.children_of_type("ControlMode")[0].get_attribute("name"),
            Some("CM1")
        );
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = load_description("not: [valid, yaml").unwrap_err();
        assert!(matches!(err, AutomatonError::ParseError { .. }));
    }
}
