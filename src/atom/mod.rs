//! Atom headers, the atom tree, and leaf atom data.

mod atom;
mod atom_header;

pub use atom::{Atom, AtomData, AtomIter, AtomTree, StructuralIssue};
pub use atom_header::AtomHeader;
