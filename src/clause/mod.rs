//! Clause numbering and the clause hierarchy of a document.
pub mod id;
pub mod tree;

pub use id::{compare_clause_labels, sort_clause_labels, ClauseId, MalformedClauseId};
pub use tree::{build_tree, find_node, flatten, sort_siblings, ClauseNode, ClauseRecord, TreeError};
