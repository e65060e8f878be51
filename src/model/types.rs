//! Model for types in the WebAssembly syntax.

use crate::model::Id;
use std::fmt;

/// Value types classify the individual values that WebAssembly code can compute with
/// and the values that a variable accepts.
/// Integers are not inherently signed or unsigned;
/// their interpretation is determined by individual operations.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#value-types>
///
/// # Examples
/// ```rust
/// use wat_vm::{IntegerType, FloatType, ValueType};
///
/// assert_eq!(ValueType::I32, IntegerType::I32.into());
/// assert_eq!(ValueType::I64, IntegerType::I64.into());
/// assert_eq!(ValueType::F32, FloatType::F32.into());
/// assert_eq!(ValueType::F64, FloatType::F64.into());
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    /// The width of this value type in bits.
    pub fn bit_width(&self) -> u32 {
        match self {
            ValueType::I32 | ValueType::F32 => 32,
            ValueType::I64 | ValueType::F64 => 64,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
        };

        write!(f, "{}", text)
    }
}

/// The types `i32` and `i64` classify 32 and 64 bit integers, respectively.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IntegerType {
    I32,
    I64,
}

impl From<IntegerType> for ValueType {
    fn from(kind: IntegerType) -> Self {
        match kind {
            IntegerType::I32 => ValueType::I32,
            IntegerType::I64 => ValueType::I64,
        }
    }
}

/// The types `f32` and `f64` classify 32 and 64 bit floating-point data, respectively,
/// as defined by the IEEE 754-2019 standard (Section 3.3).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FloatType {
    F32,
    F64,
}

impl From<FloatType> for ValueType {
    fn from(kind: FloatType) -> Self {
        match kind {
            FloatType::F32 => ValueType::F32,
            FloatType::F64 => ValueType::F64,
        }
    }
}

/// Either of the numeric value type groups.
/// Operations that exist uniformly across integers and floats (add, sub, mul, eq, ne)
/// are parameterized by this type.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NumberType {
    I32,
    I64,
    F32,
    F64,
}

impl From<NumberType> for ValueType {
    fn from(kind: NumberType) -> Self {
        match kind {
            NumberType::I32 => ValueType::I32,
            NumberType::I64 => ValueType::I64,
            NumberType::F32 => ValueType::F32,
            NumberType::F64 => ValueType::F64,
        }
    }
}

impl From<IntegerType> for NumberType {
    fn from(kind: IntegerType) -> Self {
        match kind {
            IntegerType::I32 => NumberType::I32,
            IntegerType::I64 => NumberType::I64,
        }
    }
}

impl From<FloatType> for NumberType {
    fn from(kind: FloatType) -> Self {
        match kind {
            FloatType::F32 => NumberType::F32,
            FloatType::F64 => NumberType::F64,
        }
    }
}

/// A single named (or anonymous) function parameter.
///
/// The text format allows parameters to carry a symbolic identifier
/// (e.g. `(param $lhs i32)`) which binds into the function's local index space.
///
/// # Examples
/// ```rust
/// use wat_vm::{Id, Param, ValueType};
///
/// let anonymous = Param::new(None, ValueType::I32);
/// let named = Param::new(Some(Id::new("lhs")), ValueType::I32);
///
/// assert_eq!(anonymous.kind(), ValueType::I32);
/// assert_eq!(named.id(), Some(&Id::new("lhs")));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
    id: Option<Id>,
    kind: ValueType,
}

impl Param {
    /// Creates a new parameter with an optional symbolic identifier.
    pub fn new(id: Option<Id>, kind: ValueType) -> Self {
        Param { id, kind }
    }

    /// The symbolic identifier of this parameter, if any.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// The value type of this parameter.
    pub fn kind(&self) -> ValueType {
        self.kind
    }
}

impl From<ValueType> for Param {
    fn from(kind: ValueType) -> Self {
        Param { id: None, kind }
    }
}

/// Result types classify the result of executing instructions or functions.
/// The MVP surface limits functions to at most one result;
/// the parser nonetheless models the ordered sequence the grammar defines.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#result-types>
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResultType {
    kinds: Vec<ValueType>,
}

impl ResultType {
    /// Creates a new `ResultType` with the given value types.
    pub fn new(kinds: Vec<ValueType>) -> Self {
        ResultType { kinds }
    }

    /// Creates a new empty `ResultType`.
    pub fn empty() -> Self {
        ResultType { kinds: vec![] }
    }

    /// A slice of the value types.
    pub fn kinds(&self) -> &[ValueType] {
        &self.kinds
    }

    /// The number of value types.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Returns true if this `ResultType` has a length of zero, false otherwise.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl From<Vec<ValueType>> for ResultType {
    fn from(kinds: Vec<ValueType>) -> Self {
        ResultType { kinds }
    }
}

/// Function types classify the signature of functions,
/// mapping a vector of parameters to a vector of results.
///
/// Two function types are interchangeable when their parameter value types and result
/// types match; parameter identifiers do not participate in signature equality.
/// [`FunctionType::matches`] implements that comparison and is the basis of
/// typeuse de-duplication and of the `call_indirect` signature check.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#function-types>
///
/// # Examples
/// ```rust
/// use wat_vm::{FunctionType, Id, Param, ResultType, ValueType};
///
/// let anonymous = FunctionType::new(
///     vec![Param::new(None, ValueType::I32)],
///     ResultType::new(vec![ValueType::I64]),
/// );
/// let named = FunctionType::new(
///     vec![Param::new(Some(Id::new("x")), ValueType::I32)],
///     ResultType::new(vec![ValueType::I64]),
/// );
///
/// assert_ne!(anonymous, named);
/// assert!(anonymous.matches(&named));
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FunctionType {
    parameters: Vec<Param>,
    results: ResultType,
}

impl FunctionType {
    /// Creates a new function signature with the given parameters and result types.
    pub fn new(parameters: Vec<Param>, results: ResultType) -> Self {
        FunctionType {
            parameters,
            results,
        }
    }

    /// Creates a new function signature with no parameters or results.
    pub fn runnable() -> Self {
        FunctionType {
            parameters: vec![],
            results: ResultType::empty(),
        }
    }

    /// The parameters of this `FunctionType`.
    pub fn parameters(&self) -> &[Param] {
        &self.parameters
    }

    /// The result types of this `FunctionType`.
    pub fn results(&self) -> &ResultType {
        &self.results
    }

    /// The value types of the parameters, ignoring identifiers.
    pub fn parameter_kinds(&self) -> impl Iterator<Item = ValueType> + '_ {
        self.parameters.iter().map(Param::kind)
    }

    /// Tests signature equality: same parameter value types and same result types.
    /// Parameter identifiers are ignored.
    pub fn matches(&self, other: &FunctionType) -> bool {
        self.parameters.len() == other.parameters.len()
            && self.parameter_kinds().eq(other.parameter_kinds())
            && self.results == other.results
    }
}

/// Limits classify the size range of resizeable storage associated with
/// memory types and table types.
/// An absent maximum defaults at runtime to the implementation ceiling.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#limits>
///
/// # Examples
/// ```rust
/// use wat_vm::Limit;
///
/// assert_eq!(Limit::unbounded(2), Limit::new(2, None));
/// assert_eq!(Limit::bounded(2, 5), Limit::new(2, Some(5)));
/// assert!(Limit::bounded(2, 5).is_valid());
/// assert!(!Limit::bounded(5, 2).is_valid());
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Limit {
    min: u32,
    max: Option<u32>,
}

impl Limit {
    /// Creates a new limit with a required minimum and optional maximum.
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Limit { min, max }
    }

    /// Creates a new limit with a required minimum and no maximum.
    pub fn unbounded(min: u32) -> Self {
        Limit { min, max: None }
    }

    /// Creates a new limit with a required minimum and maximum.
    pub fn bounded(min: u32, max: u32) -> Self {
        Limit {
            min,
            max: Some(max),
        }
    }

    /// The minimum value of the limit.
    pub fn min(&self) -> u32 {
        self.min
    }

    /// The optional maximum value of the limit.
    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// Whether the invariant `min <= max` holds.
    pub fn is_valid(&self) -> bool {
        match self.max {
            Some(max) => self.min <= max,
            None => true,
        }
    }
}

/// Memory types classify linear memories and their size range,
/// given in units of 64 KiB pages.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#memory-types>
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryType {
    limits: Limit,
}

impl MemoryType {
    /// Creates a new memory type from the given limits.
    pub fn new(limits: Limit) -> Self {
        MemoryType { limits }
    }

    /// The limits of the number of pages for this `MemoryType`.
    pub fn limits(&self) -> &Limit {
        &self.limits
    }
}

impl From<Limit> for MemoryType {
    fn from(limits: Limit) -> Self {
        MemoryType { limits }
    }
}

/// The sole element type of a table in the MVP surface.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElementType {
    FunctionReference,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "funcref")
    }
}

/// Table types classify tables over elements of `funcref` type within a size range,
/// given in numbers of entries.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#table-types>
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TableType {
    limits: Limit,
    kind: ElementType,
}

impl TableType {
    /// Creates a new `TableType` for the given limits and element type.
    pub fn new(kind: ElementType, limits: Limit) -> Self {
        TableType { limits, kind }
    }

    /// The limits of the number of elements for this `TableType`.
    pub fn limits(&self) -> &Limit {
        &self.limits
    }

    /// The element type of this `TableType`.
    pub fn kind(&self) -> ElementType {
        self.kind
    }
}

/// The mutability of a global variable.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mutability {
    Mutable,
    Immutable,
}

/// Global types classify global variables,
/// which hold a value and can either be mutable or immutable.
///
/// See <https://webassembly.github.io/spec/core/syntax/types.html#global-types>
///
/// # Examples
/// ```rust
/// use wat_vm::{GlobalType, Mutability, ValueType};
///
/// let mutable = GlobalType::mutable(ValueType::I64);
/// let immutable = GlobalType::immutable(ValueType::F64);
///
/// assert_eq!(mutable.mutability(), Mutability::Mutable);
/// assert_eq!(mutable.kind(), ValueType::I64);
/// assert_eq!(immutable.mutability(), Mutability::Immutable);
/// assert_eq!(immutable.kind(), ValueType::F64);
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GlobalType {
    mutability: Mutability,
    kind: ValueType,
}

impl GlobalType {
    /// Creates a new `GlobalType` with the given mutability and value type.
    pub fn new(kind: ValueType, mutability: Mutability) -> Self {
        GlobalType { mutability, kind }
    }

    /// Creates a new `GlobalType` for a mutable global variable.
    pub fn mutable(kind: ValueType) -> Self {
        GlobalType {
            mutability: Mutability::Mutable,
            kind,
        }
    }

    /// Creates a new `GlobalType` for an immutable (i.e. constant) global variable.
    pub fn immutable(kind: ValueType) -> Self {
        GlobalType {
            mutability: Mutability::Immutable,
            kind,
        }
    }

    /// The value type of the global variable defined by this `GlobalType`.
    pub fn kind(&self) -> ValueType {
        self.kind
    }

    /// The mutability of the global variable type.
    pub fn mutability(&self) -> Mutability {
        self.mutability
    }
}

/// The type annotation of a structured control instruction.
/// The MVP surface limits it to an optional single result value type,
/// shorthand for the function type `[] -> [valtype?]`.
///
/// See <https://webassembly.github.io/spec/core/syntax/instructions.html#control-instructions>
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BlockType {
    result: Option<ValueType>,
}

impl BlockType {
    /// Creates a block type with the given single result.
    pub fn returning(result: ValueType) -> Self {
        BlockType {
            result: Some(result),
        }
    }

    /// Creates a block type with no result.
    pub fn empty() -> Self {
        BlockType { result: None }
    }

    /// The result value type, if any.
    pub fn result(&self) -> Option<ValueType> {
        self.result
    }

    /// The number of values a branch to this block carries (0 or 1).
    pub fn arity(&self) -> usize {
        usize::from(self.result.is_some())
    }
}

impl From<Option<ValueType>> for BlockType {
    fn from(result: Option<ValueType>) -> Self {
        BlockType { result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_type_matches_ignores_parameter_names() {
        let named = FunctionType::new(
            vec![
                Param::new(Some(Id::new("lhs")), ValueType::I32),
                Param::new(Some(Id::new("rhs")), ValueType::I32),
            ],
            ResultType::new(vec![ValueType::I32]),
        );
        let anonymous = FunctionType::new(
            vec![ValueType::I32.into(), ValueType::I32.into()],
            ResultType::new(vec![ValueType::I32]),
        );

        assert!(named.matches(&anonymous));
        assert!(anonymous.matches(&named));
        assert_ne!(named, anonymous);
    }

    #[test]
    fn function_type_matches_rejects_different_signatures() {
        let unary = FunctionType::new(
            vec![ValueType::I32.into()],
            ResultType::new(vec![ValueType::I32]),
        );
        let binary = FunctionType::new(
            vec![ValueType::I32.into(), ValueType::I32.into()],
            ResultType::new(vec![ValueType::I32]),
        );
        let wider = FunctionType::new(
            vec![ValueType::I64.into()],
            ResultType::new(vec![ValueType::I32]),
        );

        assert!(!unary.matches(&binary));
        assert!(!unary.matches(&wider));
    }

    #[test]
    fn limit_validity() {
        assert!(Limit::unbounded(u32::MAX).is_valid());
        assert!(Limit::bounded(0, 0).is_valid());
        assert!(Limit::bounded(1, 2).is_valid());
        assert!(!Limit::bounded(2, 1).is_valid());
    }

    #[test]
    fn block_type_arity() {
        assert_eq!(BlockType::empty().arity(), 0);
        assert_eq!(BlockType::returning(ValueType::F32).arity(), 1);
    }
}
