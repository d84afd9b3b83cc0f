//! Notes to node records: parse, prune, check for duplicates, evaluate.
//!
//! Any failure aborts before a single record is produced.

use crate::builder::{build_tree, BuildError};
use crate::evaluator::{evaluate_nodes, EvalError, EvalOptions, PositionEvaluator};
use crate::notation::{parse_notes, DraftNode, ParseError};
use crate::tree::{NodeRecord, TreeError};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Parse and prune, without evaluating.
pub fn build_repertoire(text: &str) -> Result<Vec<DraftNode>, CompileError> {
    let drafts = parse_notes(text)?;
    Ok(build_tree(drafts)?)
}

/// Full pipeline. Records come out in breadth-first order, root first.
#[tracing::instrument(level = "info", skip_all, fields(depth = options.depth))]
pub async fn compile_notes<E: PositionEvaluator>(
    text: &str,
    evaluator: &mut E,
    options: EvalOptions,
) -> Result<Vec<NodeRecord>, CompileError> {
    let mut nodes = build_repertoire(text)?;
    tracing::info!("Evaluating {} nodes at depth {}", nodes.len(), options.depth);
    evaluate_nodes(&mut nodes, evaluator, options).await?;
    Ok(nodes.iter().map(NodeRecord::from).collect())
}
