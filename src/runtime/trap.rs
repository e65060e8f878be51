//! Runtime traps and embedder-facing errors.

use thiserror::Error;

/// An uncatchable runtime error that halts execution with a named cause.
///
/// Traps abort the current activation cascade: every frame unwinds and the
/// outermost invocation reports the trap to the embedder. The interpreter
/// never continues past a trap. Display strings are the wire-stable trap
/// codes of the execution semantics.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum Trap {
    /// The `unreachable` instruction was executed.
    #[error("unreachable")]
    Unreachable,
    /// An integer division or remainder with a zero divisor.
    #[error("integer divide by zero")]
    IntegerDivideByZero,
    /// `iN.div_s` overflow (`MIN / -1`), or a float-to-integer truncation
    /// of an infinite or out-of-range value.
    #[error("integer overflow")]
    IntegerOverflow,
    /// A float-to-integer truncation of NaN.
    #[error("invalid conversion to integer")]
    InvalidConversionToInteger,
    /// An indirect call through a table index outside the table's bounds.
    #[error("undefined element")]
    UndefinedElement,
    /// An indirect call through a table slot that holds no function.
    #[error("uninitialized element")]
    UninitializedElement,
    /// An indirect call whose callee's type differs from the declared typeuse.
    #[error("indirect call type mismatch")]
    IndirectCallTypeMismatch,
    /// A load or store past the current end of linear memory.
    #[error("out of bounds memory access")]
    MemoryAccessOutOfBounds,
    /// The operand, label, or activation stack exceeded its capacity.
    #[error("stack overflow")]
    StackOverflow,
    /// A host function reported an error; host errors are traps.
    #[error("host error: {0}")]
    Host(String),
}

/// An error surfaced to the embedder by instantiation or invocation.
#[derive(Error, Debug, PartialEq)]
pub enum RuntimeError {
    /// Execution trapped.
    #[error("{0}")]
    Trap(#[from] Trap),
    /// Instantiation received the wrong number of imported values.
    #[error("expected {expected} imports, got {actual}")]
    ImportCountMismatch { expected: usize, actual: usize },
    /// An imported value does not satisfy the module's import declaration.
    #[error("incompatible import '{module}' '{name}': {reason}")]
    IncompatibleImport {
        module: String,
        name: String,
        reason: String,
    },
    /// An active segment does not fit its table or memory.
    #[error("{segment} segment does not fit")]
    SegmentOutOfBounds { segment: &'static str },
    /// A symbolic index survived to run time unresolved.
    #[error("unresolved index {0}")]
    UnresolvedIndex(String),
    /// An instance exports nothing under the requested name.
    #[error("unknown export '{0}'")]
    UnknownExport(String),
    /// The requested export exists but is not a function.
    #[error("export '{0}' is not a function")]
    NotAFunction(String),
    /// An invocation passed the wrong argument count or types.
    #[error("invocation arguments do not match the signature: {0}")]
    ArgumentMismatch(String),
    /// A referenced entity is absent from the instance
    /// (no table or memory where one is required).
    #[error("missing {0}")]
    MissingEntity(&'static str),
    /// A constant expression contained an instruction other than a constant
    /// or `global.get`, or did not evaluate to exactly one value.
    #[error("invalid constant expression")]
    InvalidConstantExpression,
}
