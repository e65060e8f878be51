use crate::model::{Id, IndexSpace};
use thiserror::Error;

/// An error raised while assembling a module from parsed fields.
///
/// The parser wraps these into its own fatal error type,
/// attaching the source context of the offending field.
#[derive(Error, Debug, Eq, PartialEq)]
pub enum ModelError {
    /// Two entities in the same index space share a symbolic identifier.
    #[error("duplicate {space} identifier {id}")]
    DuplicateIdentifier { space: IndexSpace, id: Id },
    /// A symbolic reference does not name any entity in its index space.
    #[error("unknown {space} identifier {id}")]
    UnknownIdentifier { space: IndexSpace, id: Id },
    /// A second memory, table, or start field was declared.
    #[error("duplicate {0} declaration")]
    DuplicateDeclaration(&'static str),
    /// An import field occurred after a regular definition in the same index space.
    #[error("import after {space} definition")]
    ImportAfterDefinition { space: IndexSpace },
}
