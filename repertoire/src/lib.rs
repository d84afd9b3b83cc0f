//! Opening repertoire notes and the tree built from them.
//!
//! Notes are parsed into draft nodes ([`notation`]), pruned and checked for
//! duplicate lines ([`builder`]), scored through a [`PositionEvaluator`] and
//! serialized as [`NodeRecord`]s. A persisted set of records is loaded back
//! as a validated [`RepertoireTree`].

pub mod builder;
pub mod compile;
pub mod evaluation;
pub mod evaluator;
pub mod notation;
pub mod notes;
pub mod tree;

pub use builder::{build_tree, BuildError, DuplicateLine};
pub use compile::{build_repertoire, compile_notes, CompileError};
pub use evaluation::{evaluation_to_float, Evaluation, InvalidEvaluation};
pub use evaluator::{
    evaluate_nodes, EvalError, EvalOptions, EvalRequest, PositionEvaluator, ScoreDescriptor,
    UciEvaluator, UciEvaluatorConfig,
};
pub use notation::{parse_notes, DraftNode, ParseError};
pub use notes::export_notes;
pub use tree::{Node, NodeRecord, RepertoireTree, TreeError, Window};
