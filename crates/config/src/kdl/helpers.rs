//! Small accessors over KDL nodes.

use kdl::{KdlDocument, KdlNode};

/// First child node named `name`.
pub fn find_node<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlNode> {
    doc.nodes().iter().find(|node| node.name().value() == name)
}

/// First positional argument of a node, as a string.
pub fn get_first_arg_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|entry| entry.name().is_none())
        .and_then(|entry| entry.value().as_string())
        .map(ToString::to_string)
}

/// First positional argument of a node, as an integer.
pub fn get_first_arg_int(node: &KdlNode) -> Option<i128> {
    node.entries()
        .iter()
        .find(|entry| entry.name().is_none())
        .and_then(|entry| entry.value().as_integer())
}

/// Every positional string argument of a node.
pub fn get_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|entry| entry.name().is_none())
        .filter_map(|entry| entry.value().as_string())
        .map(ToString::to_string)
        .collect()
}

/// Integer property `name=value` of a node.
pub fn get_int_property(node: &KdlNode, name: &str) -> Option<i128> {
    node.entries()
        .iter()
        .find(|entry| entry.name().map(|n| n.value()) == Some(name))
        .and_then(|entry| entry.value().as_integer())
}

/// String value of the child node `name`.
pub fn get_string_entry(doc: &KdlDocument, name: &str) -> Option<String> {
    find_node(doc, name).and_then(get_first_arg_string)
}

/// Integer value of the child node `name`.
pub fn get_int_entry(doc: &KdlDocument, name: &str) -> Option<i128> {
    find_node(doc, name).and_then(get_first_arg_int)
}
