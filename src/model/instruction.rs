//! WebAssembly instruction set.

use crate::model::{BlockType, FloatType, FunctionType, Id, Index, IntegerType, NumberType};

/// WebAssembly code consists of sequences of instructions.
/// Its computational model is based on a stack machine in that instructions manipulate
/// values on an implicit operand stack,
/// consuming (popping) argument values and producing or returning (pushing) result values.
/// In addition to dynamic operands from the stack, some instructions also have static
/// immediate arguments, typically indices or type annotations,
/// which are part of the instruction itself.
/// Some instructions are structured in that they bracket nested sequences of instructions.
///
/// See <https://webassembly.github.io/spec/core/syntax/instructions.html#instructions>
///
/// # Examples
/// ```rust
/// use wat_vm::{Instruction, NumericInstruction, ParametricInstruction};
///
/// assert_eq!(
///     Instruction::Numeric(NumericInstruction::I32Constant(42)),
///     42i32.into()
/// );
/// assert_eq!(
///     Instruction::Parametric(ParametricInstruction::Drop),
///     ParametricInstruction::Drop.into()
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    Numeric(NumericInstruction),
    Parametric(ParametricInstruction),
    Variable(VariableInstruction),
    Memory(MemoryInstruction),
    Control(ControlInstruction),
}

/// Numeric instructions provide basic operations over numeric values of specific type.
/// These operations closely match respective operations available in hardware.
///
/// Some integer instructions come in two flavors,
/// where a signedness annotation sx distinguishes whether the operands are to be
/// interpreted as unsigned or signed integers.
/// For the other integer instructions, the use of two's complement for the signed
/// interpretation means that they behave the same regardless of signedness.
///
/// Beyond the MVP operations this includes the saturating truncation
/// (`inn.trunc_sat_fmm_sx`) and sign extension (`inn.extendN_s`) instruction families.
///
/// See <https://webassembly.github.io/spec/core/syntax/instructions.html#numeric-instructions>
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NumericInstruction {
    /// i32.const
    I32Constant(i32),
    /// i64.const
    I64Constant(i64),
    /// f32.const
    F32Constant(f32),
    /// f64.const
    F64Constant(f64),
    /// inn.clz
    CountLeadingZeros(IntegerType),
    /// inn.ctz
    CountTrailingZeros(IntegerType),
    /// inn.popcnt
    CountOnes(IntegerType),
    /// fnn.abs
    AbsoluteValue(FloatType),
    /// fnn.neg
    Negate(FloatType),
    /// fnn.sqrt
    SquareRoot(FloatType),
    /// fnn.ceil
    Ceiling(FloatType),
    /// fnn.floor
    Floor(FloatType),
    /// fnn.trunc
    Truncate(FloatType),
    /// fnn.nearest
    Nearest(FloatType),
    /// xnn.add
    Add(NumberType),
    /// xnn.sub
    Subtract(NumberType),
    /// xnn.mul
    Multiply(NumberType),
    /// inn.div_sx
    DivideInteger(IntegerType, SignExtension),
    /// fnn.div
    DivideFloat(FloatType),
    /// inn.rem_sx
    Remainder(IntegerType, SignExtension),
    /// inn.and
    And(IntegerType),
    /// inn.or
    Or(IntegerType),
    /// inn.xor
    Xor(IntegerType),
    /// inn.shl
    ShiftLeft(IntegerType),
    /// inn.shr_sx
    ShiftRight(IntegerType, SignExtension),
    /// inn.rotl
    RotateLeft(IntegerType),
    /// inn.rotr
    RotateRight(IntegerType),
    /// fnn.min
    Minimum(FloatType),
    /// fnn.max
    Maximum(FloatType),
    /// fnn.copysign
    CopySign(FloatType),
    /// inn.eqz
    EqualToZero(IntegerType),
    /// xnn.eq
    Equal(NumberType),
    /// xnn.ne
    NotEqual(NumberType),
    /// inn.lt_sx
    LessThanInteger(IntegerType, SignExtension),
    /// fnn.lt
    LessThanFloat(FloatType),
    /// inn.gt_sx
    GreaterThanInteger(IntegerType, SignExtension),
    /// fnn.gt
    GreaterThanFloat(FloatType),
    /// inn.le_sx
    LessThanOrEqualToInteger(IntegerType, SignExtension),
    /// fnn.le
    LessThanOrEqualToFloat(FloatType),
    /// inn.ge_sx
    GreaterThanOrEqualToInteger(IntegerType, SignExtension),
    /// fnn.ge
    GreaterThanOrEqualToFloat(FloatType),
    /// inn.extend8_s
    ExtendSigned8(IntegerType),
    /// inn.extend16_s
    ExtendSigned16(IntegerType),
    /// i64.extend32_s
    ExtendSigned32,
    /// i32.wrap_i64
    Wrap,
    /// i64.extend_i32_sx
    ExtendWithSignExtension(SignExtension),
    /// inn.trunc_fmm_sx
    ConvertAndTruncate(IntegerType, FloatType, SignExtension),
    /// inn.trunc_sat_fmm_sx
    ConvertAndTruncateWithSaturation(IntegerType, FloatType, SignExtension),
    /// f32.demote_f64
    Demote,
    /// f64.promote_f32
    Promote,
    /// fnn.convert_imm_sx
    Convert(FloatType, IntegerType, SignExtension),
    /// inn.reinterpret_fmm
    ReinterpretFloat(IntegerType),
    /// fnn.reinterpret_imm
    ReinterpretInteger(FloatType),
}

impl From<NumericInstruction> for Instruction {
    fn from(instruction: NumericInstruction) -> Self {
        Instruction::Numeric(instruction)
    }
}

impl From<i32> for Instruction {
    fn from(value: i32) -> Self {
        Self::Numeric(NumericInstruction::I32Constant(value))
    }
}

impl From<i64> for Instruction {
    fn from(value: i64) -> Self {
        Self::Numeric(NumericInstruction::I64Constant(value))
    }
}

impl From<f32> for Instruction {
    fn from(value: f32) -> Self {
        Self::Numeric(NumericInstruction::F32Constant(value))
    }
}

impl From<f64> for Instruction {
    fn from(value: f64) -> Self {
        Self::Numeric(NumericInstruction::F64Constant(value))
    }
}

/// Instructions in this group can operate on operands of any value type.
///
/// See <https://webassembly.github.io/spec/core/syntax/instructions.html#parametric-instructions>
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParametricInstruction {
    /// The `drop` instruction simply throws away a single operand.
    Drop,
    /// The `select` instruction selects one of its first two operands based on whether
    /// its third operand is zero or not.
    Select,
}

impl From<ParametricInstruction> for Instruction {
    fn from(instruction: ParametricInstruction) -> Self {
        Instruction::Parametric(instruction)
    }
}

/// Variable instructions are concerned with access to local or global variables.
/// These instructions get or set the values of variables, respectively.
/// The `local.tee` instruction is like `local.set` but also returns its argument.
///
/// See <https://webassembly.github.io/spec/core/syntax/instructions.html#variable-instructions>
///
/// # Examples
/// ```rust
/// use wat_vm::{Index, Instruction, VariableInstruction};
///
/// assert_eq!(
///     Instruction::Variable(VariableInstruction::LocalGet(Index::Numeric(0))),
///     VariableInstruction::LocalGet(0.into()).into()
/// );
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VariableInstruction {
    /// local.get localidx
    LocalGet(Index),
    /// local.set localidx
    LocalSet(Index),
    /// local.tee localidx
    LocalTee(Index),
    /// global.get globalidx
    GlobalGet(Index),
    /// global.set globalidx
    GlobalSet(Index),
}

impl From<VariableInstruction> for Instruction {
    fn from(instruction: VariableInstruction) -> Self {
        Instruction::Variable(instruction)
    }
}

/// Instructions in this group are concerned with linear memory.
/// Memory is accessed with `load` and `store` instructions for the different value types.
/// They all take a memory immediate memarg that contains an address offset and
/// the expected alignment (expressed as the exponent of a power of 2).
/// Integer loads and stores can optionally specify a storage size that is smaller than
/// the bit width of the respective value type.
/// In the case of loads, a sign extension mode sx is then required to select
/// appropriate behavior.
///
/// The static address offset is added to the dynamic address operand,
/// yielding a 33 bit effective address that is the zero-based index at which the
/// memory is accessed. All values are read and written in little endian byte order.
/// A trap results if any of the accessed memory bytes lies outside the address range
/// implied by the memory's current size.
///
/// See <https://webassembly.github.io/spec/core/syntax/instructions.html#memory-instructions>
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryInstruction {
    /// xnn.load memarg
    Load(NumberType, MemoryArgument),
    /// xnn.store memarg
    Store(NumberType, MemoryArgument),
    /// inn.load8_sx memarg
    Load8(IntegerType, SignExtension, MemoryArgument),
    /// inn.load16_sx memarg
    Load16(IntegerType, SignExtension, MemoryArgument),
    /// i64.load32_sx memarg
    Load32(SignExtension, MemoryArgument),
    /// inn.store8 memarg
    Store8(IntegerType, MemoryArgument),
    /// inn.store16 memarg
    Store16(IntegerType, MemoryArgument),
    /// i64.store32 memarg
    Store32(MemoryArgument),
    /// The `memory.size` instruction returns the current size of a memory,
    /// in units of page size.
    Size,
    /// The `memory.grow` instruction grows memory by a given delta and returns the
    /// previous size, or -1 if enough memory cannot be allocated.
    Grow,
}

impl From<MemoryInstruction> for Instruction {
    fn from(instruction: MemoryInstruction) -> Self {
        Instruction::Memory(instruction)
    }
}

/// Instructions in this group affect the flow of control.
/// The `block`, `loop` and `if` instructions are structured instructions.
/// They bracket nested sequences of instructions and introduce an implicit label.
/// Labels are targets for branch instructions that reference them with label indices.
/// Unlike with other index spaces, indexing of labels is relative by nesting depth.
///
/// Taking a branch unwinds the operand stack up to the height where the targeted
/// structured control instruction was entered, preserving the operands the branch
/// itself carries. In case of `block` or `if` it is a forward jump,
/// resuming execution after the matching end.
/// In case of `loop` it is a backward jump to the beginning of the loop.
///
/// See <https://webassembly.github.io/spec/core/syntax/instructions.html#control-instructions>
///
/// # Examples
/// ```rust
/// use wat_vm::{BlockType, ControlInstruction, Expression, Instruction, ValueType};
///
/// let body = Expression::new(vec![1i32.into()]);
///
/// assert_eq!(
///     Instruction::Control(ControlInstruction::Block(
///         None,
///         BlockType::returning(ValueType::I32),
///         body.clone(),
///     )),
///     ControlInstruction::Block(None, BlockType::returning(ValueType::I32), body).into()
/// );
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum ControlInstruction {
    /// The `nop` instruction does nothing.
    Nop,
    /// The `unreachable` instruction causes an unconditional trap.
    Unreachable,
    /// A logical grouping used to introduce a label around an expression.
    Block(Option<Id>, BlockType, Expression),
    /// Executes the expression with a label at its beginning;
    /// a branch to that label repeats the body.
    Loop(Option<Id>, BlockType, Expression),
    /// Conditionally executes a positive or (optional) negative branch
    /// based on a test value.
    If(Option<Id>, BlockType, Expression, Option<Expression>),
    /// The `br` instruction performs an unconditional branch.
    Branch(Index),
    /// The `br_if` instruction performs a conditional branch.
    BranchIf(Index),
    /// The `br_table` instruction performs an indirect branch through an operand
    /// indexing into the label vector that is an immediate to the instruction,
    /// or to a default target if the operand is out of bounds.
    BranchTable(Vec<Index>, Index),
    /// The `return` instruction is a shortcut for an unconditional branch to the
    /// outermost block, which implicitly is the body of the current function.
    Return,
    /// The `call` instruction invokes another function,
    /// consuming the necessary arguments from the stack and
    /// returning the result values of the call.
    Call(Index),
    /// The `call_indirect` instruction calls a function indirectly through an operand
    /// indexing into the module's table. Since the table may contain functions of
    /// heterogeneous type, the callee is dynamically checked against the function type
    /// of the instruction's typeuse, and the call is aborted with a trap if it does
    /// not match.
    CallIndirect(TypeUse),
}

impl From<ControlInstruction> for Instruction {
    fn from(instruction: ControlInstruction) -> Self {
        Instruction::Control(instruction)
    }
}

/// A reference to a function signature, optionally inlined.
///
/// The text format allows a `(type x)` reference, an inline
/// `(param ...)* (result ...)*` signature, or both combined.
/// During parsing the reference is resolved to a numeric type index
/// (appending a fresh type when no structurally-equal one exists) and the
/// resolved signature is retained alongside it.
///
/// See <https://webassembly.github.io/spec/core/text/modules.html#type-uses>
#[derive(Clone, Debug, PartialEq)]
pub struct TypeUse {
    index: Index,
    signature: FunctionType,
}

impl TypeUse {
    /// Creates a new typeuse binding the given type index and resolved signature.
    pub fn new(index: Index, signature: FunctionType) -> Self {
        TypeUse { index, signature }
    }

    /// The index of the referenced type.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// The resolved signature of the referenced type.
    pub fn signature(&self) -> &FunctionType {
        &self.signature
    }
}

/// Argument to load and store instructions that contains an address offset and
/// the expected alignment (expressed as the exponent of a power of 2).
///
/// # Examples
/// ```rust
/// use wat_vm::MemoryArgument;
///
/// let argument = MemoryArgument::new(2, 42);
///
/// assert_eq!(argument.align(), 2);
/// assert_eq!(argument.offset(), 42);
/// assert_eq!(MemoryArgument::default_offset(2), MemoryArgument::new(2, 0));
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryArgument {
    align: u32,
    offset: u32,
}

impl MemoryArgument {
    /// Creates a new memory argument with the given alignment and offset.
    pub fn new(align: u32, offset: u32) -> Self {
        MemoryArgument { align, offset }
    }

    /// Creates a new memory argument with a zero offset and the given alignment.
    pub fn default_offset(align: u32) -> Self {
        MemoryArgument { align, offset: 0 }
    }

    /// The static address offset of the memory instruction.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// The memory alignment of the instruction expressed as the exponent of a power of 2.
    pub fn align(&self) -> u32 {
        self.align
    }
}

/// Some integer instructions come in two flavors, where a signedness annotation sx
/// distinguishes whether the operands are to be interpreted as unsigned or signed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignExtension {
    Signed,
    Unsigned,
}

/// Function bodies and initialization values for globals are given as expressions,
/// which are sequences of instructions.
/// In some places, validation restricts expressions to be constant,
/// which limits the set of allowable instructions.
///
/// See <https://webassembly.github.io/spec/core/syntax/instructions.html#expressions>
///
/// # Examples
/// ```rust
/// use wat_vm::{ControlInstruction, Expression, Instruction};
///
/// let expression = Expression::new(vec![0i32.into(), ControlInstruction::Nop.into()]);
///
/// assert_eq!(expression.len(), 2);
/// assert!(!expression.is_empty());
/// assert_eq!(Expression::empty(), vec![].into());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expression {
    instructions: Vec<Instruction>,
}

impl Expression {
    /// Creates a new expression from the given instructions.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Expression { instructions }
    }

    /// Creates a new empty expression.
    pub fn empty() -> Self {
        Expression {
            instructions: vec![],
        }
    }

    /// The instructions of this expression.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns true if this `Expression` has a length of zero, false otherwise.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the length of this `Expression`, in number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }
}

impl From<Vec<Instruction>> for Expression {
    fn from(instructions: Vec<Instruction>) -> Self {
        Expression { instructions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;

    #[test]
    fn constant_conversions() {
        assert_eq!(
            Instruction::from(7i32),
            Instruction::Numeric(NumericInstruction::I32Constant(7))
        );
        assert_eq!(
            Instruction::from(7i64),
            Instruction::Numeric(NumericInstruction::I64Constant(7))
        );
        assert_eq!(
            Instruction::from(0.5f32),
            Instruction::Numeric(NumericInstruction::F32Constant(0.5))
        );
        assert_eq!(
            Instruction::from(0.5f64),
            Instruction::Numeric(NumericInstruction::F64Constant(0.5))
        );
    }

    #[test]
    fn typeuse_retains_resolution() {
        let signature = FunctionType::new(
            vec![ValueType::I32.into()],
            vec![ValueType::I32].into(),
        );
        let typeuse = TypeUse::new(Index::Numeric(2), signature.clone());

        assert_eq!(typeuse.index(), &Index::Numeric(2));
        assert_eq!(typeuse.signature(), &signature);
    }
}
