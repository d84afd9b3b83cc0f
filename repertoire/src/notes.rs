//! Re-export of a repertoire as a notes file.
//!
//! The output parses back into the same tree, with every evaluation written
//! as an annotation.

use crate::tree::{Node, RepertoireTree, TreeError};

/// Notes text for one node, indented by its depth: nothing for the first
/// move of either side, then `indent_width` spaces per ply.
pub fn format_node(node: &Node, indent_width: usize) -> Result<Option<String>, TreeError> {
    if node.label.is_empty() {
        return Ok(None);
    }
    let depth = node.depth()? as usize;
    let mut line = " ".repeat(depth.saturating_sub(3) * indent_width);
    line.push_str(&node.label);
    if let Some(evaluation) = &node.evaluation {
        line.push_str(&format!(" ({})", evaluation));
    }
    if !node.comment.is_empty() {
        line.push_str(&format!(" : {}", node.comment));
    }
    Ok(Some(line))
}

/// All nodes in uid order, one per line, root omitted.
pub fn export_notes(tree: &RepertoireTree, indent_width: usize) -> Result<String, TreeError> {
    let mut out = String::new();
    for node in tree.nodes() {
        if let Some(line) = format_node(node, indent_width)? {
            out.push_str(&line);
            out.push('\n');
        }
    }
    Ok(out)
}
