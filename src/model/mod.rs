//! Shared data structures: the provisional [`Node`] tree built by the
//! document walker and the output [`Symbol`] graph finalized by the
//! reconciliation engine.

mod node;
mod symbol;

pub use node::{Node, NodeId, NodeTree, ParameterInfo};
pub use symbol::{
    Access, Direction, MethodKind, Parameter, Signature, Symbol, SymbolGraph, SymbolId,
    SymbolKind, Transfer, camel_to_snake,
};

#[cfg(test)]
mod tests;
