//! Identifiers and indices of the text format.
//!
//! Definitions are referenced with zero-based indices, one index space per
//! class of definition. The index space for functions, tables, memories and
//! globals includes respective imports declared in the same module; the
//! indices of these imports precede the indices of other definitions in the
//! same index space.
//!
//! The text format additionally allows definitions and references to carry a
//! symbolic identifier (`$`-prefixed). Symbolic references are resolved to
//! numeric indices during module assembly; local and label references resolve
//! during body parsing, since their spaces are function-scoped.
//!
//! See <https://webassembly.github.io/spec/core/text/values.html#text-id>

use std::fmt;

/// A symbolic identifier, stored without its `$` sigil.
///
/// # Examples
/// ```rust
/// use wat_vm::Id;
///
/// let id = Id::new("add");
///
/// assert_eq!(id.as_str(), "add");
/// assert_eq!(id.to_string(), "$add");
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Id {
    name: String,
}

impl Id {
    /// Creates a new identifier from the given name (without the `$` sigil).
    pub fn new(name: impl Into<String>) -> Self {
        Id { name: name.into() }
    }

    /// The name of this identifier, without the `$` sigil.
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Id::new(name)
    }
}

impl From<String> for Id {
    fn from(name: String) -> Self {
        Id { name }
    }
}

/// The index spaces of a module.
/// `Local` and `Label` are function-scoped; the rest are module-scoped.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum IndexSpace {
    Type,
    Function,
    Table,
    Memory,
    Global,
    Local,
    Label,
}

impl fmt::Display for IndexSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IndexSpace::Type => "type",
            IndexSpace::Function => "function",
            IndexSpace::Table => "table",
            IndexSpace::Memory => "memory",
            IndexSpace::Global => "global",
            IndexSpace::Local => "local",
            IndexSpace::Label => "label",
        };

        write!(f, "{}", text)
    }
}

/// A reference into an index space: either a resolved nonnegative integer or a
/// symbolic identifier still awaiting resolution.
///
/// # Examples
/// ```rust
/// use wat_vm::{Id, Index};
///
/// assert_eq!(Index::from(3).as_numeric(), Some(3));
/// assert_eq!(Index::Symbolic(Id::new("f")).as_numeric(), None);
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Index {
    Numeric(u32),
    Symbolic(Id),
}

impl Index {
    /// The resolved integer form, if this index has one.
    pub fn as_numeric(&self) -> Option<u32> {
        match self {
            Index::Numeric(value) => Some(*value),
            Index::Symbolic(_) => None,
        }
    }

    /// The symbolic form, if this index has one.
    pub fn as_symbolic(&self) -> Option<&Id> {
        match self {
            Index::Numeric(_) => None,
            Index::Symbolic(id) => Some(id),
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::Numeric(value) => write!(f, "{}", value),
            Index::Symbolic(id) => write!(f, "{}", id),
        }
    }
}

impl From<u32> for Index {
    fn from(value: u32) -> Self {
        Index::Numeric(value)
    }
}

impl From<Id> for Index {
    fn from(id: Id) -> Self {
        Index::Symbolic(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_display_restores_sigil() {
        assert_eq!(Id::new("main").to_string(), "$main");
    }

    #[test]
    fn index_forms() {
        let numeric = Index::from(7);
        let symbolic = Index::from(Id::new("seven"));

        assert_eq!(numeric.as_numeric(), Some(7));
        assert_eq!(numeric.as_symbolic(), None);
        assert_eq!(symbolic.as_numeric(), None);
        assert_eq!(symbolic.as_symbolic(), Some(&Id::new("seven")));
    }
}
