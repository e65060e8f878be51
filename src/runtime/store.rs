//! The store: all runtime objects allocated on behalf of the embedder.
//!
//! The store owns function, table, memory, and global instances, plus the
//! interned module instances that tie them together. Function instances refer
//! to their owning module instance by [`InstanceId`], not by back-pointer, so
//! the object graph stays acyclic.

use crate::model::{
    ExportDescription, Expression, FunctionType, GlobalType, ImportDescription, Index,
    Instruction, MemoryType, Module, Mutability, NumericInstruction, TableType, ValueType,
    VariableInstruction,
};
use crate::runtime::flatten::{flatten, Flat};
use crate::runtime::interpreter;
use crate::runtime::stack::StackLimits;
use crate::runtime::values::Value;
use crate::runtime::{RuntimeError, Trap};
use std::rc::Rc;

/// Bytes per linear-memory page (64 KiB).
pub const PAGE_SIZE: usize = 65536;

/// The implementation ceiling on linear-memory size, in pages.
pub const MAX_PAGES: u32 = 65536;

/// The address of a function instance within the store.
pub type FunctionAddress = usize;
/// The address of a table instance within the store.
pub type TableAddress = usize;
/// The address of a memory instance within the store.
pub type MemoryAddress = usize;
/// The address of a global instance within the store.
pub type GlobalAddress = usize;

/// The interned identity of a module instance within the store.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InstanceId(pub(crate) usize);

/// A value provided by the embedder to satisfy a module import,
/// or obtained from a module's exports.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExternalValue {
    Function(FunctionAddress),
    Table(TableAddress),
    Memory(MemoryAddress),
    Global(GlobalAddress),
}

/// The signature of a host function handler.
/// Host functions receive their arguments by value and report failures as
/// traps, which abort the calling execution like any other trap.
pub type HostHandler = dyn Fn(&[Value]) -> Result<Option<Value>, Trap>;

/// A function defined by a module: its signature, owning instance,
/// declared locals, and flattened body.
pub struct ModuleFunction {
    pub(crate) signature: FunctionType,
    pub(crate) instance: InstanceId,
    pub(crate) locals: Vec<ValueType>,
    pub(crate) code: Rc<Vec<Flat>>,
}

/// An allocated function: module-defined or host-provided.
pub enum FunctionInstance {
    Module(ModuleFunction),
    Host {
        signature: FunctionType,
        handler: Rc<HostHandler>,
    },
}

impl FunctionInstance {
    /// The signature of this function.
    pub fn signature(&self) -> &FunctionType {
        match self {
            FunctionInstance::Module(function) => &function.signature,
            FunctionInstance::Host { signature, .. } => signature,
        }
    }
}

/// An allocated table: a vector of optional function addresses.
pub struct TableInstance {
    elements: Vec<Option<FunctionAddress>>,
    maximum: u32,
}

impl TableInstance {
    fn new(kind: &TableType) -> Self {
        TableInstance {
            elements: vec![None; kind.limits().min() as usize],
            maximum: kind.limits().max().unwrap_or(u32::MAX),
        }
    }

    /// The current number of elements.
    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    /// The declared maximum number of elements.
    pub fn maximum(&self) -> u32 {
        self.maximum
    }

    /// Reads a slot, trapping on an out-of-range index.
    pub fn get(&self, index: u32) -> Result<Option<FunctionAddress>, Trap> {
        self.elements
            .get(index as usize)
            .copied()
            .ok_or(Trap::UndefinedElement)
    }

    /// Copies function addresses into the table starting at `offset`.
    /// Returns whether the segment fits.
    fn initialize(&mut self, offset: usize, functions: &[FunctionAddress]) -> bool {
        let Some(end) = offset.checked_add(functions.len()) else {
            return false;
        };

        if end > self.elements.len() {
            return false;
        }

        for (slot, function) in self.elements[offset..end].iter_mut().zip(functions) {
            *slot = Some(*function);
        }

        true
    }
}

/// An allocated linear memory: a page-granular byte buffer.
pub struct MemoryInstance {
    bytes: Vec<u8>,
    maximum_pages: u32,
}

impl MemoryInstance {
    fn new(kind: &MemoryType) -> Self {
        MemoryInstance {
            bytes: vec![0; kind.limits().min() as usize * PAGE_SIZE],
            maximum_pages: kind.limits().max().unwrap_or(MAX_PAGES).min(MAX_PAGES),
        }
    }

    /// The current size in pages.
    pub fn size_pages(&self) -> u32 {
        (self.bytes.len() / PAGE_SIZE) as u32
    }

    /// Grows the memory by `delta` pages, zero-filling the new range.
    /// Returns the previous size, or -1 when the ceiling would be exceeded.
    pub fn grow(&mut self, delta: u32) -> i32 {
        let previous = self.size_pages();

        let Some(next) = previous.checked_add(delta) else {
            return -1;
        };

        if next > self.maximum_pages {
            return -1;
        }

        self.bytes.resize(next as usize * PAGE_SIZE, 0);

        previous as i32
    }

    /// A view of `length` bytes at the effective address,
    /// trapping when any accessed byte lies outside the current size.
    pub fn slice(&self, address: u64, length: usize) -> Result<&[u8], Trap> {
        let start = usize::try_from(address).map_err(|_| Trap::MemoryAccessOutOfBounds)?;
        let end = start
            .checked_add(length)
            .ok_or(Trap::MemoryAccessOutOfBounds)?;

        self.bytes
            .get(start..end)
            .ok_or(Trap::MemoryAccessOutOfBounds)
    }

    /// A mutable view of `length` bytes at the effective address.
    pub fn slice_mut(&mut self, address: u64, length: usize) -> Result<&mut [u8], Trap> {
        let start = usize::try_from(address).map_err(|_| Trap::MemoryAccessOutOfBounds)?;
        let end = start
            .checked_add(length)
            .ok_or(Trap::MemoryAccessOutOfBounds)?;

        self.bytes
            .get_mut(start..end)
            .ok_or(Trap::MemoryAccessOutOfBounds)
    }

    /// Copies bytes into memory starting at `offset`.
    /// Returns whether the segment fits.
    fn initialize(&mut self, offset: usize, bytes: &[u8]) -> bool {
        let Some(end) = offset.checked_add(bytes.len()) else {
            return false;
        };

        if end > self.bytes.len() {
            return false;
        }

        self.bytes[offset..end].copy_from_slice(bytes);

        true
    }
}

/// An allocated global cell.
pub struct GlobalInstance {
    value: Value,
    mutability: Mutability,
}

impl GlobalInstance {
    fn new(value: Value, mutability: Mutability) -> Self {
        GlobalInstance { value, mutability }
    }

    /// The current value.
    pub fn value(&self) -> Value {
        self.value
    }

    /// The mutability of the cell.
    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    /// Replaces the value. Writing an immutable cell or changing the value
    /// type is validation territory and asserted, not trapped.
    pub fn set(&mut self, value: Value) {
        debug_assert_eq!(self.mutability, Mutability::Mutable);
        debug_assert_eq!(self.value.kind(), value.kind());

        self.value = value;
    }
}

/// A module instance: the run-time representation of an instantiated module,
/// mapping its index spaces to store addresses.
pub struct ModuleInstance {
    pub(crate) types: Vec<FunctionType>,
    pub(crate) functions: Vec<FunctionAddress>,
    pub(crate) table: Option<TableAddress>,
    pub(crate) memory: Option<MemoryAddress>,
    pub(crate) globals: Vec<GlobalAddress>,
    exports: Vec<(String, ExternalValue)>,
}

impl ModuleInstance {
    /// Looks up an export by name.
    pub fn export(&self, name: &str) -> Option<ExternalValue> {
        self.exports
            .iter()
            .find(|(export, _)| export == name)
            .map(|(_, value)| *value)
    }
}

/// The collection of allocated runtime objects.
///
/// The store is single-threaded; concurrent calls into the same store are the
/// embedder's responsibility to serialize.
pub struct Store {
    pub(crate) functions: Vec<FunctionInstance>,
    pub(crate) tables: Vec<TableInstance>,
    pub(crate) memories: Vec<MemoryInstance>,
    pub(crate) globals: Vec<GlobalInstance>,
    pub(crate) instances: Vec<ModuleInstance>,
    limits: StackLimits,
}

impl Store {
    /// Creates an empty store with the default stack limits.
    pub fn new() -> Self {
        Store::with_limits(StackLimits::default())
    }

    /// Creates an empty store with the given stack limits.
    pub fn with_limits(limits: StackLimits) -> Self {
        Store {
            functions: Vec::new(),
            tables: Vec::new(),
            memories: Vec::new(),
            globals: Vec::new(),
            instances: Vec::new(),
            limits,
        }
    }

    /// The stack limits executions against this store run under.
    pub fn limits(&self) -> StackLimits {
        self.limits
    }

    /// Allocates a host function, returning its address for import wiring.
    pub fn allocate_host_function(
        &mut self,
        signature: FunctionType,
        handler: impl Fn(&[Value]) -> Result<Option<Value>, Trap> + 'static,
    ) -> FunctionAddress {
        let address = self.functions.len();

        self.functions.push(FunctionInstance::Host {
            signature,
            handler: Rc::new(handler),
        });

        address
    }

    /// Allocates a table for import wiring.
    pub fn allocate_table(&mut self, kind: &TableType) -> TableAddress {
        let address = self.tables.len();

        self.tables.push(TableInstance::new(kind));

        address
    }

    /// Allocates a memory for import wiring.
    pub fn allocate_memory(&mut self, kind: &MemoryType) -> MemoryAddress {
        let address = self.memories.len();

        self.memories.push(MemoryInstance::new(kind));

        address
    }

    /// Allocates a global cell for import wiring.
    pub fn allocate_global(&mut self, kind: &GlobalType, value: Value) -> GlobalAddress {
        let address = self.globals.len();

        self.globals
            .push(GlobalInstance::new(value, kind.mutability()));

        address
    }

    /// The function instance at the given address.
    pub fn function(&self, address: FunctionAddress) -> &FunctionInstance {
        &self.functions[address]
    }

    /// The memory instance at the given address.
    pub fn memory(&self, address: MemoryAddress) -> &MemoryInstance {
        &self.memories[address]
    }

    /// The module instance with the given identity.
    pub fn instance(&self, id: InstanceId) -> &ModuleInstance {
        &self.instances[id.0]
    }

    /// Instantiates a parsed module against this store.
    ///
    /// Allocation order follows the module: imported entities first (checked
    /// against the provided `imports`), then definitions. Element and data
    /// segments are copied at their evaluated offsets, and the start function,
    /// when present, runs before the instance id is returned.
    pub fn instantiate(
        &mut self,
        module: &Module,
        imports: &[ExternalValue],
    ) -> Result<InstanceId, RuntimeError> {
        if imports.len() != module.imports().len() {
            return Err(RuntimeError::ImportCountMismatch {
                expected: module.imports().len(),
                actual: imports.len(),
            });
        }

        let id = InstanceId(self.instances.len());
        let types: Vec<FunctionType> = module
            .types()
            .iter()
            .map(|definition| definition.signature().clone())
            .collect();

        let mut functions = Vec::new();
        let mut table = None;
        let mut memory = None;
        let mut globals = Vec::new();

        for (import, value) in module.imports().iter().zip(imports) {
            let incompatible = |reason: &str| RuntimeError::IncompatibleImport {
                module: import.module().to_string(),
                name: import.name().to_string(),
                reason: reason.to_string(),
            };

            match (import.description(), value) {
                (
                    ImportDescription::Function(_, type_use),
                    ExternalValue::Function(address),
                ) => {
                    let instance = self
                        .functions
                        .get(*address)
                        .ok_or_else(|| incompatible("no such function"))?;

                    if !instance.signature().matches(type_use.signature()) {
                        return Err(incompatible("signature mismatch"));
                    }

                    functions.push(*address);
                }
                (
                    ImportDescription::Table(_, kind),
                    ExternalValue::Table(address),
                ) => {
                    let instance = self
                        .tables
                        .get(*address)
                        .ok_or_else(|| incompatible("no such table"))?;

                    if instance.size() < kind.limits().min() {
                        return Err(incompatible("table is below the declared minimum"));
                    }

                    table = Some(*address);
                }
                (
                    ImportDescription::Memory(_, kind),
                    ExternalValue::Memory(address),
                ) => {
                    let instance = self
                        .memories
                        .get(*address)
                        .ok_or_else(|| incompatible("no such memory"))?;

                    if instance.size_pages() < kind.limits().min() {
                        return Err(incompatible("memory is below the declared minimum"));
                    }

                    memory = Some(*address);
                }
                (
                    ImportDescription::Global(_, kind),
                    ExternalValue::Global(address),
                ) => {
                    let instance = self
                        .globals
                        .get(*address)
                        .ok_or_else(|| incompatible("no such global"))?;

                    if instance.value().kind() != kind.kind()
                        || instance.mutability() != kind.mutability()
                    {
                        return Err(incompatible("global type mismatch"));
                    }

                    globals.push(*address);
                }
                _ => return Err(incompatible("kind mismatch")),
            }
        }

        for function in module.functions() {
            let address = self.functions.len();

            self.functions
                .push(FunctionInstance::Module(ModuleFunction {
                    signature: function.type_use().signature().clone(),
                    instance: id,
                    locals: function.locals().iter().map(|local| local.kind()).collect(),
                    code: Rc::new(flatten(function.body())),
                }));

            functions.push(address);
        }

        if let Some(declared) = module.table() {
            table = Some(self.allocate_table(declared.kind()));
        }

        if let Some(declared) = module.memory() {
            memory = Some(self.allocate_memory(declared.kind()));
        }

        for global in module.globals() {
            let value = self.evaluate_constant(global.init(), &globals)?;
            let address = self.allocate_global(global.kind(), value);

            globals.push(address);
        }

        let mut exports = Vec::new();

        for export in module.exports() {
            let value = match export.description() {
                ExportDescription::Function(index) => {
                    ExternalValue::Function(*lookup(&functions, index)?)
                }
                ExportDescription::Table(index) => {
                    resolve_numeric(index)?;
                    ExternalValue::Table(table.ok_or(RuntimeError::MissingEntity("table"))?)
                }
                ExportDescription::Memory(index) => {
                    resolve_numeric(index)?;
                    ExternalValue::Memory(memory.ok_or(RuntimeError::MissingEntity("memory"))?)
                }
                ExportDescription::Global(index) => {
                    ExternalValue::Global(*lookup(&globals, index)?)
                }
            };

            exports.push((export.name().to_string(), value));
        }

        for element in module.elements() {
            let address = table.ok_or(RuntimeError::MissingEntity("table"))?;
            let offset = self.evaluate_offset(element.offset(), &globals)?;
            let targets = element
                .functions()
                .iter()
                .map(|function| lookup(&functions, function).copied())
                .collect::<Result<Vec<_>, _>>()?;

            if !self.tables[address].initialize(offset, &targets) {
                return Err(RuntimeError::SegmentOutOfBounds { segment: "element" });
            }
        }

        for data in module.data() {
            let address = memory.ok_or(RuntimeError::MissingEntity("memory"))?;
            let offset = self.evaluate_offset(data.offset(), &globals)?;

            if !self.memories[address].initialize(offset, data.bytes()) {
                return Err(RuntimeError::SegmentOutOfBounds { segment: "data" });
            }
        }

        let start = module
            .start()
            .map(|start| lookup(&functions, start.function()).copied())
            .transpose()?;

        self.instances.push(ModuleInstance {
            types,
            functions,
            table,
            memory,
            globals,
            exports,
        });

        if let Some(function) = start {
            interpreter::invoke(self, function, &[])?;
        }

        Ok(id)
    }

    /// Evaluates a constant initializer: constants and reads of previously
    /// allocated (imported) globals.
    fn evaluate_constant(
        &self,
        expression: &Expression,
        globals: &[GlobalAddress],
    ) -> Result<Value, RuntimeError> {
        let mut stack: Vec<Value> = Vec::new();

        for instruction in expression.instructions() {
            let value = match instruction {
                Instruction::Numeric(NumericInstruction::I32Constant(value)) => {
                    Value::I32(*value)
                }
                Instruction::Numeric(NumericInstruction::I64Constant(value)) => {
                    Value::I64(*value)
                }
                Instruction::Numeric(NumericInstruction::F32Constant(value)) => {
                    Value::F32(*value)
                }
                Instruction::Numeric(NumericInstruction::F64Constant(value)) => {
                    Value::F64(*value)
                }
                Instruction::Variable(VariableInstruction::GlobalGet(index)) => {
                    let address = *lookup(globals, index)?;

                    self.globals[address].value()
                }
                _ => return Err(RuntimeError::InvalidConstantExpression),
            };

            stack.push(value);
        }

        match stack.as_slice() {
            [value] => Ok(*value),
            _ => Err(RuntimeError::InvalidConstantExpression),
        }
    }

    fn evaluate_offset(
        &self,
        expression: &Expression,
        globals: &[GlobalAddress],
    ) -> Result<usize, RuntimeError> {
        match self.evaluate_constant(expression, globals)? {
            Value::I32(value) => Ok(value as u32 as usize),
            _ => Err(RuntimeError::InvalidConstantExpression),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

/// Resolves a (numeric) index into an address vector.
fn lookup<'a>(addresses: &'a [usize], index: &Index) -> Result<&'a usize, RuntimeError> {
    let position = resolve_numeric(index)?;

    addresses
        .get(position as usize)
        .ok_or_else(|| RuntimeError::UnresolvedIndex(index.to_string()))
}

fn resolve_numeric(index: &Index) -> Result<u32, RuntimeError> {
    index
        .as_numeric()
        .ok_or_else(|| RuntimeError::UnresolvedIndex(index.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Limit;

    #[test]
    fn memory_grows_to_its_maximum() {
        let mut memory = MemoryInstance::new(&MemoryType::new(Limit::bounded(1, 3)));

        assert_eq!(memory.size_pages(), 1);
        assert_eq!(memory.grow(2), 1);
        assert_eq!(memory.size_pages(), 3);
        assert_eq!(memory.grow(1), -1);
        assert_eq!(memory.size_pages(), 3);
    }

    #[test]
    fn unbounded_memory_stops_at_the_page_ceiling() {
        let mut memory = MemoryInstance::new(&MemoryType::new(Limit::unbounded(0)));

        assert_eq!(memory.grow(MAX_PAGES + 1), -1);
        assert_eq!(memory.grow(0), 0);
    }

    #[test]
    fn memory_access_is_bounds_checked() {
        let memory = MemoryInstance::new(&MemoryType::new(Limit::bounded(1, 1)));

        assert!(memory.slice(0, 4).is_ok());
        assert!(memory.slice(PAGE_SIZE as u64 - 4, 4).is_ok());
        assert_eq!(
            memory.slice(PAGE_SIZE as u64 - 3, 4),
            Err(Trap::MemoryAccessOutOfBounds)
        );
        assert_eq!(
            memory.slice(u64::MAX, 1),
            Err(Trap::MemoryAccessOutOfBounds)
        );
    }

    #[test]
    fn table_reads_trap_out_of_range() {
        let table = TableInstance::new(&TableType::new(
            crate::model::ElementType::FunctionReference,
            Limit::bounded(2, 2),
        ));

        assert_eq!(table.get(0), Ok(None));
        assert_eq!(table.get(2), Err(Trap::UndefinedElement));
    }

    #[test]
    fn segment_initialization_is_bounds_checked() {
        let mut table = TableInstance::new(&TableType::new(
            crate::model::ElementType::FunctionReference,
            Limit::bounded(2, 2),
        ));

        assert!(table.initialize(0, &[7, 8]));
        assert_eq!(table.get(1), Ok(Some(8)));
        assert!(!table.initialize(1, &[7, 8]));
    }
}
