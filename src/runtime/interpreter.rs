//! The stack interpreter over the flattened instruction list.
//!
//! Execution proceeds one instruction at a time: each step performs the
//! instruction's side effects and then either advances the instruction
//! pointer by one or sets it to an explicitly computed position (branches,
//! calls, returns, end markers). Traps abort the whole activation cascade;
//! nothing catches them below the outermost invocation.
//!
//! Operand-stack type mismatches at points the (out of scope) validator
//! covers are corruption bugs here, and panic rather than trap.

use crate::model::{
    ControlInstruction, Index, Instruction, MemoryArgument, MemoryInstruction, NumberType,
    NumericInstruction, ParametricInstruction, TypeUse, VariableInstruction,
};
use crate::runtime::flatten::Flat;
use crate::runtime::stack::{BoundedStack, StackLimits};
use crate::runtime::store::{
    ExternalValue, FunctionAddress, FunctionInstance, InstanceId, ModuleInstance, Store,
};
use crate::runtime::values::{
    ArithmeticOps, ExtendInto, Float, FromValue, Integer, LittleEndian,
    SaturatingTruncateInto, TransmuteInto, TryTruncateInto, Value, WrapInto,
};
use crate::runtime::{RuntimeError, Trap};
use std::mem::size_of;
use std::rc::Rc;

/// A structured-control branch target active while its block, loop, or if is
/// on the instruction pointer's path.
///
/// `height` snapshots the operand stack at block entry: a branch resets the
/// stack to that height and re-pushes the `branch_arity` values preserved
/// from the top. The continuation points past the region's end for blocks and
/// ifs, and back at the loop marker for loops.
#[derive(Copy, Clone, Debug)]
struct Label {
    branch_arity: usize,
    result_arity: usize,
    height: usize,
    continuation: usize,
}

/// One activation: the callee's locals (parameters then declared locals),
/// its owning module instance, its flattened code and instruction pointer,
/// and the stack floors that delimit what belongs to this activation.
struct Frame {
    instance: InstanceId,
    locals: Vec<Value>,
    results: usize,
    code: Rc<Vec<Flat>>,
    ip: usize,
    operand_floor: usize,
    label_floor: usize,
}

/// The mutable state of one execution: three independently bounded stacks.
/// The parsed module and its flattened code are immutable and shared.
pub struct ExecutionContext {
    operands: BoundedStack<Value>,
    labels: BoundedStack<Label>,
    frames: BoundedStack<Frame>,
}

impl ExecutionContext {
    fn new(limits: StackLimits) -> Self {
        ExecutionContext {
            operands: BoundedStack::new(limits.operands),
            labels: BoundedStack::new(limits.labels),
            frames: BoundedStack::new(limits.activations),
        }
    }
}

/// What a single instruction decided about control flow.
enum Outcome {
    /// Advance to the next instruction.
    Next,
    /// Continue at the given position.
    Jump(usize),
    /// Invoke the function at the given address, then resume past the call.
    Call(FunctionAddress),
    /// Pop the current activation.
    Return,
}

/// Invokes an exported function of the given instance.
///
/// # Examples
/// ```rust
/// use wat_vm::parser::parse_text;
/// use wat_vm::runtime::{invoke_export, Store, Value};
///
/// let module = parse_text(
///     r#"(module (func (export "add") (param i32 i32) (result i32)
///          local.get 0
///          local.get 1
///          i32.add))"#,
///     "add.wat",
/// )
/// .unwrap();
///
/// let mut store = Store::new();
/// let instance = store.instantiate(&module, &[]).unwrap();
/// let result = invoke_export(&mut store, instance, "add", &[Value::I32(7), Value::I32(35)]);
///
/// assert_eq!(result.unwrap(), Some(Value::I32(42)));
/// ```
pub fn invoke_export(
    store: &mut Store,
    instance: InstanceId,
    name: &str,
    arguments: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    let export = store
        .instance(instance)
        .export(name)
        .ok_or_else(|| RuntimeError::UnknownExport(name.to_string()))?;

    match export {
        ExternalValue::Function(address) => invoke(store, address, arguments),
        _ => Err(RuntimeError::NotAFunction(name.to_string())),
    }
}

/// Invokes the function at the given store address.
/// Arguments are checked against the signature; results follow it
/// (`None` for a void function, one value otherwise).
pub fn invoke(
    store: &mut Store,
    function: FunctionAddress,
    arguments: &[Value],
) -> Result<Option<Value>, RuntimeError> {
    let signature = store
        .functions
        .get(function)
        .ok_or(RuntimeError::MissingEntity("function"))?
        .signature()
        .clone();

    if arguments.len() != signature.parameters().len() {
        return Err(RuntimeError::ArgumentMismatch(format!(
            "expected {} arguments, got {}",
            signature.parameters().len(),
            arguments.len()
        )));
    }

    for (argument, expected) in arguments.iter().zip(signature.parameter_kinds()) {
        if argument.kind() != expected {
            return Err(RuntimeError::ArgumentMismatch(format!(
                "expected {}, got {}",
                expected,
                argument.kind()
            )));
        }
    }

    let limits = store.limits();
    let mut interpreter = Interpreter {
        store,
        context: ExecutionContext::new(limits),
    };

    for argument in arguments {
        interpreter.context.operands.push(*argument)?;
    }

    interpreter.call_function(function)?;

    while !interpreter.context.frames.is_empty() {
        interpreter.step()?;
    }

    if signature.results().is_empty() {
        Ok(None)
    } else {
        let result = interpreter
            .context
            .operands
            .pop()
            .expect("a returning function leaves its result on the operand stack");

        Ok(Some(result))
    }
}

struct Interpreter<'s> {
    store: &'s mut Store,
    context: ExecutionContext,
}

impl Interpreter<'_> {
    fn frame(&self) -> &Frame {
        self.context
            .frames
            .last()
            .expect("stepping requires an active frame")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.context
            .frames
            .last_mut()
            .expect("stepping requires an active frame")
    }

    fn instance(&self) -> &ModuleInstance {
        self.store.instance(self.frame().instance)
    }

    fn push(&mut self, value: Value) -> Result<(), Trap> {
        self.context.operands.push(value)
    }

    fn pop_value(&mut self) -> Value {
        self.context
            .operands
            .pop()
            .expect("the operand stack held a validated operand")
    }

    fn pop_as<T: FromValue>(&mut self) -> T {
        self.pop_value()
            .try_into()
            .expect("the operand held the validated type")
    }

    /// Pops the callee's arguments, then either runs a host handler to
    /// completion or pushes an activation for a module function.
    fn call_function(&mut self, address: FunctionAddress) -> Result<(), Trap> {
        match &self.store.functions[address] {
            FunctionInstance::Host { signature, handler } => {
                let parameters = signature.parameters().len();
                let results = signature.results().len();
                let handler = handler.clone();

                let arguments = self.context.operands.pop_many(parameters);
                let result = handler(&arguments)?;

                debug_assert_eq!(
                    result.is_some() as usize,
                    results,
                    "host result does not match its signature"
                );

                if let Some(value) = result {
                    self.push(value)?;
                }

                Ok(())
            }
            FunctionInstance::Module(function) => {
                let parameters = function.signature.parameters().len();
                let results = function.signature.results().len();
                let instance = function.instance;
                let code = function.code.clone();
                let declared = function.locals.clone();

                let mut locals = self.context.operands.pop_many(parameters);
                locals.extend(declared.iter().map(|kind| Value::default_for(*kind)));

                self.context.frames.push(Frame {
                    instance,
                    locals,
                    results,
                    code,
                    ip: 0,
                    operand_floor: self.context.operands.len(),
                    label_floor: self.context.labels.len(),
                })
            }
        }
    }

    /// Pops the current activation, preserving its results.
    fn finish_frame(&mut self) -> Result<(), Trap> {
        let frame = self
            .context
            .frames
            .pop()
            .expect("a return requires an active frame");
        let results = self.context.operands.pop_many(frame.results);

        self.context.operands.truncate(frame.operand_floor);
        self.context.labels.truncate(frame.label_floor);

        for value in results {
            self.push(value)?;
        }

        Ok(())
    }

    /// Branches to the label at the given relative depth.
    /// A depth equal to the frame's label count targets the implicit
    /// function-body label and behaves as a return.
    fn branch(&mut self, depth: usize) -> Result<Outcome, Trap> {
        let in_frame = self.context.labels.len() - self.frame().label_floor;

        if depth >= in_frame {
            debug_assert_eq!(depth, in_frame, "branch depth was checked during parsing");

            return Ok(Outcome::Return);
        }

        let position = self.context.labels.len() - 1 - depth;
        let label = *self
            .context
            .labels
            .get(position)
            .expect("the branch depth is in scope");

        let kept = self.context.operands.pop_many(label.branch_arity);

        self.context.operands.truncate(label.height);
        self.context.labels.truncate(position);

        for value in kept {
            self.push(value)?;
        }

        Ok(Outcome::Jump(label.continuation))
    }

    /// Executes the instruction under the instruction pointer and moves it.
    fn step(&mut self) -> Result<(), Trap> {
        let frame = self.frame();
        let ip = frame.ip;
        let code = frame.code.clone();

        if ip == code.len() {
            // Fell off the end of the function body: implicit return.
            return self.finish_frame();
        }

        let outcome = match &code[ip] {
            Flat::StartBlock { kind, end } => {
                self.context.labels.push(Label {
                    branch_arity: kind.arity(),
                    result_arity: kind.arity(),
                    height: self.context.operands.len(),
                    continuation: end + 1,
                })?;

                Outcome::Next
            }
            Flat::StartLoop { kind, .. } => {
                // A branch to a loop label repeats the loop:
                // the continuation re-executes this marker.
                self.context.labels.push(Label {
                    branch_arity: 0,
                    result_arity: kind.arity(),
                    height: self.context.operands.len(),
                    continuation: ip,
                })?;

                Outcome::Next
            }
            Flat::StartIf { kind, else_, end } => {
                let condition: i32 = self.pop_as();

                self.context.labels.push(Label {
                    branch_arity: kind.arity(),
                    result_arity: kind.arity(),
                    height: self.context.operands.len(),
                    continuation: end + 1,
                })?;

                if condition != 0 {
                    Outcome::Next
                } else {
                    match else_ {
                        Some(split) => Outcome::Jump(split + 1),
                        None => Outcome::Jump(*end),
                    }
                }
            }
            Flat::Else { end } => {
                // Fell out of the positive branch: skip the negative one.
                Outcome::Jump(*end)
            }
            Flat::End => {
                let label = self
                    .context
                    .labels
                    .pop()
                    .expect("an end marker closes an open label");

                debug_assert_eq!(
                    self.context.operands.len(),
                    label.height + label.result_arity,
                    "the block left exactly its results on the operand stack"
                );

                Outcome::Next
            }
            Flat::Plain(instruction) => self.run_instruction(instruction)?,
        };

        match outcome {
            Outcome::Next => {
                self.frame_mut().ip = ip + 1;
                Ok(())
            }
            Outcome::Jump(position) => {
                self.frame_mut().ip = position;
                Ok(())
            }
            Outcome::Call(address) => {
                // The caller resumes past the call instruction.
                self.frame_mut().ip = ip + 1;
                self.call_function(address)
            }
            Outcome::Return => self.finish_frame(),
        }
    }

    fn run_instruction(&mut self, instruction: &Instruction) -> Result<Outcome, Trap> {
        match instruction {
            Instruction::Control(control) => self.run_control(control),
            Instruction::Parametric(parametric) => {
                self.run_parametric(parametric)?;
                Ok(Outcome::Next)
            }
            Instruction::Variable(variable) => {
                self.run_variable(variable)?;
                Ok(Outcome::Next)
            }
            Instruction::Memory(memory) => {
                self.run_memory(memory)?;
                Ok(Outcome::Next)
            }
            Instruction::Numeric(numeric) => {
                self.run_numeric(numeric)?;
                Ok(Outcome::Next)
            }
        }
    }

    fn run_control(&mut self, instruction: &ControlInstruction) -> Result<Outcome, Trap> {
        match instruction {
            ControlInstruction::Nop => Ok(Outcome::Next),
            ControlInstruction::Unreachable => Err(Trap::Unreachable),
            ControlInstruction::Branch(target) => self.branch(resolved(target)),
            ControlInstruction::BranchIf(target) => {
                let condition: i32 = self.pop_as();

                if condition != 0 {
                    self.branch(resolved(target))
                } else {
                    Ok(Outcome::Next)
                }
            }
            ControlInstruction::BranchTable(targets, default) => {
                let index: u32 = self.pop_as();
                let target = targets.get(index as usize).unwrap_or(default);

                self.branch(resolved(target))
            }
            ControlInstruction::Return => Ok(Outcome::Return),
            ControlInstruction::Call(function) => {
                let address = self.instance().functions[resolved(function)];

                Ok(Outcome::Call(address))
            }
            ControlInstruction::CallIndirect(type_use) => self.call_indirect(type_use),
            ControlInstruction::Block(_, _, _)
            | ControlInstruction::Loop(_, _, _)
            | ControlInstruction::If(_, _, _, _) => {
                unreachable!("structured instructions are lowered before execution")
            }
        }
    }

    /// Resolves and type-checks an indirect call through the instance's table.
    fn call_indirect(&mut self, type_use: &TypeUse) -> Result<Outcome, Trap> {
        let index: u32 = self.pop_as();
        let table = self.instance().table.ok_or(Trap::UndefinedElement)?;
        let slot = self.store.tables[table].get(index)?;
        let address = slot.ok_or(Trap::UninitializedElement)?;

        if !self.store.functions[address]
            .signature()
            .matches(type_use.signature())
        {
            return Err(Trap::IndirectCallTypeMismatch);
        }

        Ok(Outcome::Call(address))
    }

    fn run_parametric(&mut self, instruction: &ParametricInstruction) -> Result<(), Trap> {
        match instruction {
            ParametricInstruction::Drop => {
                self.pop_value();

                Ok(())
            }
            ParametricInstruction::Select => {
                let condition: i32 = self.pop_as();
                let negative = self.pop_value();
                let positive = self.pop_value();

                self.push(if condition != 0 { positive } else { negative })
            }
        }
    }

    fn run_variable(&mut self, instruction: &VariableInstruction) -> Result<(), Trap> {
        match instruction {
            VariableInstruction::LocalGet(index) => {
                let value = self.frame().locals[resolved(index)];

                self.push(value)
            }
            VariableInstruction::LocalSet(index) => {
                let value = self.pop_value();
                let index = resolved(index);

                self.frame_mut().locals[index] = value;

                Ok(())
            }
            VariableInstruction::LocalTee(index) => {
                let value = self.pop_value();
                let index = resolved(index);

                self.frame_mut().locals[index] = value;
                self.push(value)
            }
            VariableInstruction::GlobalGet(index) => {
                let address = self.instance().globals[resolved(index)];
                let value = self.store.globals[address].value();

                self.push(value)
            }
            VariableInstruction::GlobalSet(index) => {
                let value = self.pop_value();
                let address = self.instance().globals[resolved(index)];

                self.store.globals[address].set(value);

                Ok(())
            }
        }
    }

    fn run_memory(&mut self, instruction: &MemoryInstruction) -> Result<(), Trap> {
        use crate::model::IntegerType::{I32, I64};
        use crate::model::SignExtension::{Signed, Unsigned};

        match instruction {
            MemoryInstruction::Load(NumberType::I32, memarg) => self.run_load::<i32>(memarg),
            MemoryInstruction::Load(NumberType::I64, memarg) => self.run_load::<i64>(memarg),
            MemoryInstruction::Load(NumberType::F32, memarg) => self.run_load::<f32>(memarg),
            MemoryInstruction::Load(NumberType::F64, memarg) => self.run_load::<f64>(memarg),
            MemoryInstruction::Load8(I32, Signed, memarg) => self.run_load_extend::<i8, i32>(memarg),
            MemoryInstruction::Load8(I32, Unsigned, memarg) => self.run_load_extend::<u8, i32>(memarg),
            MemoryInstruction::Load8(I64, Signed, memarg) => self.run_load_extend::<i8, i64>(memarg),
            MemoryInstruction::Load8(I64, Unsigned, memarg) => self.run_load_extend::<u8, i64>(memarg),
            MemoryInstruction::Load16(I32, Signed, memarg) => {
                self.run_load_extend::<i16, i32>(memarg)
            }
            MemoryInstruction::Load16(I32, Unsigned, memarg) => {
                self.run_load_extend::<u16, i32>(memarg)
            }
            MemoryInstruction::Load16(I64, Signed, memarg) => {
                self.run_load_extend::<i16, i64>(memarg)
            }
            MemoryInstruction::Load16(I64, Unsigned, memarg) => {
                self.run_load_extend::<u16, i64>(memarg)
            }
            MemoryInstruction::Load32(Signed, memarg) => self.run_load_extend::<i32, i64>(memarg),
            MemoryInstruction::Load32(Unsigned, memarg) => self.run_load_extend::<u32, i64>(memarg),
            MemoryInstruction::Store(NumberType::I32, memarg) => self.run_store::<i32>(memarg),
            MemoryInstruction::Store(NumberType::I64, memarg) => self.run_store::<i64>(memarg),
            MemoryInstruction::Store(NumberType::F32, memarg) => self.run_store::<f32>(memarg),
            MemoryInstruction::Store(NumberType::F64, memarg) => self.run_store::<f64>(memarg),
            MemoryInstruction::Store8(I32, memarg) => self.run_store_wrap::<i32, i8>(memarg),
            MemoryInstruction::Store8(I64, memarg) => self.run_store_wrap::<i64, i8>(memarg),
            MemoryInstruction::Store16(I32, memarg) => self.run_store_wrap::<i32, i16>(memarg),
            MemoryInstruction::Store16(I64, memarg) => self.run_store_wrap::<i64, i16>(memarg),
            MemoryInstruction::Store32(memarg) => self.run_store_wrap::<i64, i32>(memarg),
            MemoryInstruction::Size => {
                let memory = self.instance().memory.ok_or(Trap::MemoryAccessOutOfBounds)?;
                let pages = self.store.memories[memory].size_pages() as i32;

                self.push(Value::I32(pages))
            }
            MemoryInstruction::Grow => {
                let delta: u32 = self.pop_as();
                let memory = self.instance().memory.ok_or(Trap::MemoryAccessOutOfBounds)?;
                let previous = self.store.memories[memory].grow(delta);

                self.push(Value::I32(previous))
            }
        }
    }

    /// The effective address of a memory access:
    /// the popped base extended to 64 bits plus the static offset,
    /// so the 33-bit result cannot wrap.
    fn effective_address(&mut self, memarg: &MemoryArgument) -> u64 {
        let base: u32 = self.pop_as();

        u64::from(base) + u64::from(memarg.offset())
    }

    fn run_load<T>(&mut self, memarg: &MemoryArgument) -> Result<(), Trap>
    where
        T: LittleEndian,
        Value: From<T>,
    {
        let address = self.effective_address(memarg);
        let memory = self.instance().memory.ok_or(Trap::MemoryAccessOutOfBounds)?;
        let bytes = self.store.memories[memory].slice(address, size_of::<T>())?;
        let value = T::read_from(bytes);

        self.push(value.into())
    }

    fn run_load_extend<T, U>(&mut self, memarg: &MemoryArgument) -> Result<(), Trap>
    where
        T: LittleEndian + ExtendInto<U>,
        Value: From<U>,
    {
        let address = self.effective_address(memarg);
        let memory = self.instance().memory.ok_or(Trap::MemoryAccessOutOfBounds)?;
        let bytes = self.store.memories[memory].slice(address, size_of::<T>())?;
        let value: U = T::read_from(bytes).extend_into();

        self.push(value.into())
    }

    fn run_store<T>(&mut self, memarg: &MemoryArgument) -> Result<(), Trap>
    where
        T: LittleEndian + FromValue,
    {
        let value: T = self.pop_as();
        let address = self.effective_address(memarg);
        let memory = self.instance().memory.ok_or(Trap::MemoryAccessOutOfBounds)?;
        let bytes = self.store.memories[memory].slice_mut(address, size_of::<T>())?;

        value.write_to(bytes);

        Ok(())
    }

    fn run_store_wrap<T, U>(&mut self, memarg: &MemoryArgument) -> Result<(), Trap>
    where
        T: FromValue + WrapInto<U>,
        U: LittleEndian,
    {
        let value: U = self.pop_as::<T>().wrap_into();
        let address = self.effective_address(memarg);
        let memory = self.instance().memory.ok_or(Trap::MemoryAccessOutOfBounds)?;
        let bytes = self.store.memories[memory].slice_mut(address, size_of::<U>())?;

        value.write_to(bytes);

        Ok(())
    }

    fn unary<T, R>(&mut self, operation: impl FnOnce(T) -> R) -> Result<(), Trap>
    where
        T: FromValue,
        Value: From<R>,
    {
        let operand: T = self.pop_as();

        self.push(operation(operand).into())
    }

    fn try_unary<T, R>(&mut self, operation: impl FnOnce(T) -> Result<R, Trap>) -> Result<(), Trap>
    where
        T: FromValue,
        Value: From<R>,
    {
        let operand: T = self.pop_as();

        self.push(operation(operand)?.into())
    }

    fn binary<T, R>(&mut self, operation: impl FnOnce(T, T) -> R) -> Result<(), Trap>
    where
        T: FromValue,
        Value: From<R>,
    {
        let rhs: T = self.pop_as();
        let lhs: T = self.pop_as();

        self.push(operation(lhs, rhs).into())
    }

    fn try_binary<T, R>(
        &mut self,
        operation: impl FnOnce(T, T) -> Result<R, Trap>,
    ) -> Result<(), Trap>
    where
        T: FromValue,
        Value: From<R>,
    {
        let rhs: T = self.pop_as();
        let lhs: T = self.pop_as();

        self.push(operation(lhs, rhs)?.into())
    }

    fn run_numeric(&mut self, instruction: &NumericInstruction) -> Result<(), Trap> {
        use crate::model::FloatType::{F32, F64};
        use crate::model::IntegerType::{I32, I64};
        use crate::model::NumericInstruction::*;
        use crate::model::SignExtension::{Signed, Unsigned};

        match instruction {
            I32Constant(value) => self.push(Value::I32(*value)),
            I64Constant(value) => self.push(Value::I64(*value)),
            F32Constant(value) => self.push(Value::F32(*value)),
            F64Constant(value) => self.push(Value::F64(*value)),

            CountLeadingZeros(I32) => self.unary(<i32 as Integer<i32>>::leading_zeros),
            CountLeadingZeros(I64) => self.unary(<i64 as Integer<i64>>::leading_zeros),
            CountTrailingZeros(I32) => self.unary(<i32 as Integer<i32>>::trailing_zeros),
            CountTrailingZeros(I64) => self.unary(<i64 as Integer<i64>>::trailing_zeros),
            CountOnes(I32) => self.unary(<i32 as Integer<i32>>::count_ones),
            CountOnes(I64) => self.unary(<i64 as Integer<i64>>::count_ones),

            Add(NumberType::I32) => self.binary(<i32 as ArithmeticOps<i32>>::add),
            Add(NumberType::I64) => self.binary(<i64 as ArithmeticOps<i64>>::add),
            Add(NumberType::F32) => self.binary(<f32 as ArithmeticOps<f32>>::add),
            Add(NumberType::F64) => self.binary(<f64 as ArithmeticOps<f64>>::add),
            Subtract(NumberType::I32) => self.binary(<i32 as ArithmeticOps<i32>>::sub),
            Subtract(NumberType::I64) => self.binary(<i64 as ArithmeticOps<i64>>::sub),
            Subtract(NumberType::F32) => self.binary(<f32 as ArithmeticOps<f32>>::sub),
            Subtract(NumberType::F64) => self.binary(<f64 as ArithmeticOps<f64>>::sub),
            Multiply(NumberType::I32) => self.binary(<i32 as ArithmeticOps<i32>>::mul),
            Multiply(NumberType::I64) => self.binary(<i64 as ArithmeticOps<i64>>::mul),
            Multiply(NumberType::F32) => self.binary(<f32 as ArithmeticOps<f32>>::mul),
            Multiply(NumberType::F64) => self.binary(<f64 as ArithmeticOps<f64>>::mul),

            DivideInteger(I32, Signed) => self.try_binary(<i32 as ArithmeticOps<i32>>::div),
            DivideInteger(I32, Unsigned) => self.try_binary(<u32 as ArithmeticOps<u32>>::div),
            DivideInteger(I64, Signed) => self.try_binary(<i64 as ArithmeticOps<i64>>::div),
            DivideInteger(I64, Unsigned) => self.try_binary(<u64 as ArithmeticOps<u64>>::div),
            DivideFloat(F32) => self.try_binary(<f32 as ArithmeticOps<f32>>::div),
            DivideFloat(F64) => self.try_binary(<f64 as ArithmeticOps<f64>>::div),
            Remainder(I32, Signed) => self.try_binary(<i32 as Integer<i32>>::rem),
            Remainder(I32, Unsigned) => self.try_binary(<u32 as Integer<u32>>::rem),
            Remainder(I64, Signed) => self.try_binary(<i64 as Integer<i64>>::rem),
            Remainder(I64, Unsigned) => self.try_binary(<u64 as Integer<u64>>::rem),

            And(I32) => self.binary(|lhs: i32, rhs| lhs & rhs),
            And(I64) => self.binary(|lhs: i64, rhs| lhs & rhs),
            Or(I32) => self.binary(|lhs: i32, rhs| lhs | rhs),
            Or(I64) => self.binary(|lhs: i64, rhs| lhs | rhs),
            Xor(I32) => self.binary(|lhs: i32, rhs| lhs ^ rhs),
            Xor(I64) => self.binary(|lhs: i64, rhs| lhs ^ rhs),

            // Shift and rotate distances are taken modulo the bit width.
            ShiftLeft(I32) => self.binary(|lhs: i32, rhs| lhs.wrapping_shl(rhs as u32)),
            ShiftLeft(I64) => self.binary(|lhs: i64, rhs| lhs.wrapping_shl(rhs as u32)),
            ShiftRight(I32, Signed) => self.binary(|lhs: i32, rhs| lhs.wrapping_shr(rhs as u32)),
            ShiftRight(I32, Unsigned) => self.binary(|lhs: u32, rhs| lhs.wrapping_shr(rhs)),
            ShiftRight(I64, Signed) => self.binary(|lhs: i64, rhs| lhs.wrapping_shr(rhs as u32)),
            ShiftRight(I64, Unsigned) => {
                self.binary(|lhs: u64, rhs| lhs.wrapping_shr(rhs as u32))
            }
            RotateLeft(I32) => self.binary(<u32 as Integer<u32>>::rotl),
            RotateLeft(I64) => self.binary(<u64 as Integer<u64>>::rotl),
            RotateRight(I32) => self.binary(<u32 as Integer<u32>>::rotr),
            RotateRight(I64) => self.binary(<u64 as Integer<u64>>::rotr),

            EqualToZero(I32) => self.unary(|v: i32| v == 0),
            EqualToZero(I64) => self.unary(|v: i64| v == 0),
            Equal(NumberType::I32) => self.binary(|lhs: i32, rhs| lhs == rhs),
            Equal(NumberType::I64) => self.binary(|lhs: i64, rhs| lhs == rhs),
            Equal(NumberType::F32) => self.binary(|lhs: f32, rhs| lhs == rhs),
            Equal(NumberType::F64) => self.binary(|lhs: f64, rhs| lhs == rhs),
            NotEqual(NumberType::I32) => self.binary(|lhs: i32, rhs| lhs != rhs),
            NotEqual(NumberType::I64) => self.binary(|lhs: i64, rhs| lhs != rhs),
            NotEqual(NumberType::F32) => self.binary(|lhs: f32, rhs| lhs != rhs),
            NotEqual(NumberType::F64) => self.binary(|lhs: f64, rhs| lhs != rhs),

            LessThanInteger(I32, Signed) => self.binary(|lhs: i32, rhs| lhs < rhs),
            LessThanInteger(I32, Unsigned) => self.binary(|lhs: u32, rhs| lhs < rhs),
            LessThanInteger(I64, Signed) => self.binary(|lhs: i64, rhs| lhs < rhs),
            LessThanInteger(I64, Unsigned) => self.binary(|lhs: u64, rhs| lhs < rhs),
            GreaterThanInteger(I32, Signed) => self.binary(|lhs: i32, rhs| lhs > rhs),
            GreaterThanInteger(I32, Unsigned) => self.binary(|lhs: u32, rhs| lhs > rhs),
            GreaterThanInteger(I64, Signed) => self.binary(|lhs: i64, rhs| lhs > rhs),
            GreaterThanInteger(I64, Unsigned) => self.binary(|lhs: u64, rhs| lhs > rhs),
            LessThanOrEqualToInteger(I32, Signed) => self.binary(|lhs: i32, rhs| lhs <= rhs),
            LessThanOrEqualToInteger(I32, Unsigned) => self.binary(|lhs: u32, rhs| lhs <= rhs),
            LessThanOrEqualToInteger(I64, Signed) => self.binary(|lhs: i64, rhs| lhs <= rhs),
            LessThanOrEqualToInteger(I64, Unsigned) => self.binary(|lhs: u64, rhs| lhs <= rhs),
            GreaterThanOrEqualToInteger(I32, Signed) => self.binary(|lhs: i32, rhs| lhs >= rhs),
            GreaterThanOrEqualToInteger(I32, Unsigned) => self.binary(|lhs: u32, rhs| lhs >= rhs),
            GreaterThanOrEqualToInteger(I64, Signed) => self.binary(|lhs: i64, rhs| lhs >= rhs),
            GreaterThanOrEqualToInteger(I64, Unsigned) => self.binary(|lhs: u64, rhs| lhs >= rhs),

            LessThanFloat(F32) => self.binary(|lhs: f32, rhs| lhs < rhs),
            LessThanFloat(F64) => self.binary(|lhs: f64, rhs| lhs < rhs),
            GreaterThanFloat(F32) => self.binary(|lhs: f32, rhs| lhs > rhs),
            GreaterThanFloat(F64) => self.binary(|lhs: f64, rhs| lhs > rhs),
            LessThanOrEqualToFloat(F32) => self.binary(|lhs: f32, rhs| lhs <= rhs),
            LessThanOrEqualToFloat(F64) => self.binary(|lhs: f64, rhs| lhs <= rhs),
            GreaterThanOrEqualToFloat(F32) => self.binary(|lhs: f32, rhs| lhs >= rhs),
            GreaterThanOrEqualToFloat(F64) => self.binary(|lhs: f64, rhs| lhs >= rhs),

            AbsoluteValue(F32) => self.unary(<f32 as Float<f32>>::abs),
            AbsoluteValue(F64) => self.unary(<f64 as Float<f64>>::abs),
            Negate(F32) => self.unary(<f32 as Float<f32>>::neg),
            Negate(F64) => self.unary(<f64 as Float<f64>>::neg),
            Ceiling(F32) => self.unary(<f32 as Float<f32>>::ceil),
            Ceiling(F64) => self.unary(<f64 as Float<f64>>::ceil),
            Floor(F32) => self.unary(<f32 as Float<f32>>::floor),
            Floor(F64) => self.unary(<f64 as Float<f64>>::floor),
            Truncate(F32) => self.unary(<f32 as Float<f32>>::trunc),
            Truncate(F64) => self.unary(<f64 as Float<f64>>::trunc),
            Nearest(F32) => self.unary(<f32 as Float<f32>>::nearest),
            Nearest(F64) => self.unary(<f64 as Float<f64>>::nearest),
            SquareRoot(F32) => self.unary(<f32 as Float<f32>>::sqrt),
            SquareRoot(F64) => self.unary(<f64 as Float<f64>>::sqrt),
            Minimum(F32) => self.binary(<f32 as Float<f32>>::min),
            Minimum(F64) => self.binary(<f64 as Float<f64>>::min),
            Maximum(F32) => self.binary(<f32 as Float<f32>>::max),
            Maximum(F64) => self.binary(<f64 as Float<f64>>::max),
            CopySign(F32) => self.binary(<f32 as Float<f32>>::copysign),
            CopySign(F64) => self.binary(<f64 as Float<f64>>::copysign),

            ExtendSigned8(I32) => self.unary(|v: i32| v as i8 as i32),
            ExtendSigned8(I64) => self.unary(|v: i64| v as i8 as i64),
            ExtendSigned16(I32) => self.unary(|v: i32| v as i16 as i32),
            ExtendSigned16(I64) => self.unary(|v: i64| v as i16 as i64),
            ExtendSigned32 => self.unary(|v: i64| v as i32 as i64),

            Wrap => self.unary(<i64 as WrapInto<i32>>::wrap_into),
            ExtendWithSignExtension(Signed) => self.unary(<i32 as ExtendInto<i64>>::extend_into),
            ExtendWithSignExtension(Unsigned) => {
                self.unary(<u32 as ExtendInto<i64>>::extend_into)
            }

            ConvertAndTruncate(I32, F32, Signed) => {
                self.try_unary(<f32 as TryTruncateInto<i32>>::try_truncate_into)
            }
            ConvertAndTruncate(I32, F32, Unsigned) => {
                self.try_unary(<f32 as TryTruncateInto<u32>>::try_truncate_into)
            }
            ConvertAndTruncate(I32, F64, Signed) => {
                self.try_unary(<f64 as TryTruncateInto<i32>>::try_truncate_into)
            }
            ConvertAndTruncate(I32, F64, Unsigned) => {
                self.try_unary(<f64 as TryTruncateInto<u32>>::try_truncate_into)
            }
            ConvertAndTruncate(I64, F32, Signed) => {
                self.try_unary(<f32 as TryTruncateInto<i64>>::try_truncate_into)
            }
            ConvertAndTruncate(I64, F32, Unsigned) => {
                self.try_unary(<f32 as TryTruncateInto<u64>>::try_truncate_into)
            }
            ConvertAndTruncate(I64, F64, Signed) => {
                self.try_unary(<f64 as TryTruncateInto<i64>>::try_truncate_into)
            }
            ConvertAndTruncate(I64, F64, Unsigned) => {
                self.try_unary(<f64 as TryTruncateInto<u64>>::try_truncate_into)
            }

            ConvertAndTruncateWithSaturation(I32, F32, Signed) => {
                self.unary(<f32 as SaturatingTruncateInto<i32>>::saturating_truncate_into)
            }
            ConvertAndTruncateWithSaturation(I32, F32, Unsigned) => {
                self.unary(<f32 as SaturatingTruncateInto<u32>>::saturating_truncate_into)
            }
            ConvertAndTruncateWithSaturation(I32, F64, Signed) => {
                self.unary(<f64 as SaturatingTruncateInto<i32>>::saturating_truncate_into)
            }
            ConvertAndTruncateWithSaturation(I32, F64, Unsigned) => {
                self.unary(<f64 as SaturatingTruncateInto<u32>>::saturating_truncate_into)
            }
            ConvertAndTruncateWithSaturation(I64, F32, Signed) => {
                self.unary(<f32 as SaturatingTruncateInto<i64>>::saturating_truncate_into)
            }
            ConvertAndTruncateWithSaturation(I64, F32, Unsigned) => {
                self.unary(<f32 as SaturatingTruncateInto<u64>>::saturating_truncate_into)
            }
            ConvertAndTruncateWithSaturation(I64, F64, Signed) => {
                self.unary(<f64 as SaturatingTruncateInto<i64>>::saturating_truncate_into)
            }
            ConvertAndTruncateWithSaturation(I64, F64, Unsigned) => {
                self.unary(<f64 as SaturatingTruncateInto<u64>>::saturating_truncate_into)
            }

            Convert(F32, I32, Signed) => self.unary(<i32 as ExtendInto<f32>>::extend_into),
            Convert(F32, I32, Unsigned) => self.unary(<u32 as ExtendInto<f32>>::extend_into),
            Convert(F32, I64, Signed) => self.unary(<i64 as ExtendInto<f32>>::extend_into),
            Convert(F32, I64, Unsigned) => self.unary(<u64 as ExtendInto<f32>>::extend_into),
            Convert(F64, I32, Signed) => self.unary(<i32 as ExtendInto<f64>>::extend_into),
            Convert(F64, I32, Unsigned) => self.unary(<u32 as ExtendInto<f64>>::extend_into),
            Convert(F64, I64, Signed) => self.unary(<i64 as ExtendInto<f64>>::extend_into),
            Convert(F64, I64, Unsigned) => self.unary(<u64 as ExtendInto<f64>>::extend_into),

            Demote => self.unary(<f64 as WrapInto<f32>>::wrap_into),
            Promote => self.unary(<f32 as ExtendInto<f64>>::extend_into),

            ReinterpretFloat(I32) => self.unary(<f32 as TransmuteInto<i32>>::transmute_into),
            ReinterpretFloat(I64) => self.unary(<f64 as TransmuteInto<i64>>::transmute_into),
            ReinterpretInteger(F32) => self.unary(<i32 as TransmuteInto<f32>>::transmute_into),
            ReinterpretInteger(F64) => self.unary(<i64 as TransmuteInto<f64>>::transmute_into),
        }
    }
}

/// The numeric form of an index the parser resolved.
fn resolved(index: &Index) -> usize {
    index
        .as_numeric()
        .expect("module assembly resolved every index") as usize
}
