//! WebAssembly model of modules and their fields.

use crate::model::{
    ControlInstruction, Expression, FunctionType, GlobalType, Id, Index, IndexSpace, Instruction,
    MemoryType, ModelError, TableType, TypeUse, ValueType, VariableInstruction,
};
use std::collections::HashMap;

/// A type field: an optional symbolic identifier and a function signature.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeDefinition {
    id: Option<Id>,
    signature: FunctionType,
}

impl TypeDefinition {
    /// Creates a new type definition.
    pub fn new(id: Option<Id>, signature: FunctionType) -> Self {
        TypeDefinition { id, signature }
    }

    /// The symbolic identifier of this type, if any.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// The function signature this type defines.
    pub fn signature(&self) -> &FunctionType {
        &self.signature
    }
}

/// A declared (non-parameter) local variable of a function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Local {
    id: Option<Id>,
    kind: ValueType,
}

impl Local {
    /// Creates a new local with an optional symbolic identifier.
    pub fn new(id: Option<Id>, kind: ValueType) -> Self {
        Local { id, kind }
    }

    /// The symbolic identifier of this local, if any.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// The value type of this local.
    pub fn kind(&self) -> ValueType {
        self.kind
    }
}

impl From<ValueType> for Local {
    fn from(kind: ValueType) -> Self {
        Local { id: None, kind }
    }
}

/// The functions component of a module defines a vector of functions.
/// Locals are referenced through 0-based local indices in the function's body;
/// they are mutable and the index of the first local is the number of parameters.
///
/// See <https://webassembly.github.io/spec/core/syntax/modules.html#functions>
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    id: Option<Id>,
    type_use: TypeUse,
    locals: Vec<Local>,
    body: Expression,
}

impl Function {
    /// Creates a new function.
    pub fn new(id: Option<Id>, type_use: TypeUse, locals: Vec<Local>, body: Expression) -> Self {
        Function {
            id,
            type_use,
            locals,
            body,
        }
    }

    /// The symbolic identifier of this function, if any.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// The typeuse naming this function's signature.
    pub fn type_use(&self) -> &TypeUse {
        &self.type_use
    }

    /// The declared locals of this function, excluding parameters.
    pub fn locals(&self) -> &[Local] {
        &self.locals
    }

    /// The body of this function.
    pub fn body(&self) -> &Expression {
        &self.body
    }
}

/// A table field. The MVP surface limits a module to a single `funcref` table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Table {
    id: Option<Id>,
    kind: TableType,
}

impl Table {
    /// Creates a new table.
    pub fn new(id: Option<Id>, kind: TableType) -> Self {
        Table { id, kind }
    }

    /// The symbolic identifier of this table, if any.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// The type of this table.
    pub fn kind(&self) -> &TableType {
        &self.kind
    }
}

/// A memory field. The MVP surface limits a module to a single linear memory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memory {
    id: Option<Id>,
    kind: MemoryType,
}

impl Memory {
    /// Creates a new memory.
    pub fn new(id: Option<Id>, kind: MemoryType) -> Self {
        Memory { id, kind }
    }

    /// The symbolic identifier of this memory, if any.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// The type of this memory.
    pub fn kind(&self) -> &MemoryType {
        &self.kind
    }
}

/// A global field: a global type together with its constant initializer expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Global {
    id: Option<Id>,
    kind: GlobalType,
    init: Expression,
}

impl Global {
    /// Creates a new global.
    pub fn new(id: Option<Id>, kind: GlobalType, init: Expression) -> Self {
        Global { id, kind, init }
    }

    /// The symbolic identifier of this global, if any.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// The type of this global.
    pub fn kind(&self) -> &GlobalType {
        &self.kind
    }

    /// The constant initializer expression of this global.
    pub fn init(&self) -> &Expression {
        &self.init
    }
}

/// The description of an imported entity.
/// Each importable kind may bind a symbolic identifier into its index space.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportDescription {
    Function(Option<Id>, TypeUse),
    Table(Option<Id>, TableType),
    Memory(Option<Id>, MemoryType),
    Global(Option<Id>, GlobalType),
}

impl ImportDescription {
    /// The index space the imported entity occupies.
    pub fn space(&self) -> IndexSpace {
        match self {
            ImportDescription::Function(_, _) => IndexSpace::Function,
            ImportDescription::Table(_, _) => IndexSpace::Table,
            ImportDescription::Memory(_, _) => IndexSpace::Memory,
            ImportDescription::Global(_, _) => IndexSpace::Global,
        }
    }

    /// The symbolic identifier the import binds, if any.
    pub fn id(&self) -> Option<&Id> {
        match self {
            ImportDescription::Function(id, _)
            | ImportDescription::Table(id, _)
            | ImportDescription::Memory(id, _)
            | ImportDescription::Global(id, _) => id.as_ref(),
        }
    }
}

/// An import field: two names identifying the entity within the embedder,
/// and a description of its kind and type.
///
/// See <https://webassembly.github.io/spec/core/syntax/modules.html#imports>
#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    module: String,
    name: String,
    description: ImportDescription,
}

impl Import {
    /// Creates a new import.
    pub fn new(module: String, name: String, description: ImportDescription) -> Self {
        Import {
            module,
            name,
            description,
        }
    }

    /// The name of the module this import is from.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The name of the imported entity within its module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The description of the imported entity.
    pub fn description(&self) -> &ImportDescription {
        &self.description
    }
}

/// The description of an exported entity: its kind and its index.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExportDescription {
    Function(Index),
    Table(Index),
    Memory(Index),
    Global(Index),
}

/// An export field: a name visible to the embedder and the exported entity.
///
/// See <https://webassembly.github.io/spec/core/syntax/modules.html#exports>
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Export {
    name: String,
    description: ExportDescription,
}

impl Export {
    /// Creates a new export.
    pub fn new(name: String, description: ExportDescription) -> Self {
        Export { name, description }
    }

    /// The name of this export.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The description of the exported entity.
    pub fn description(&self) -> &ExportDescription {
        &self.description
    }
}

/// The start field declares the function to be executed when the module is instantiated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Start {
    function: Index,
}

impl Start {
    /// Creates a new start field for the given function.
    pub fn new(function: Index) -> Self {
        Start { function }
    }

    /// The index of the start function.
    pub fn function(&self) -> &Index {
        &self.function
    }
}

/// An active element segment: initializes a range of the module's table with
/// references to the listed functions, starting at the evaluated offset.
///
/// See <https://webassembly.github.io/spec/core/syntax/modules.html#element-segments>
#[derive(Clone, Debug, PartialEq)]
pub struct ElementSegment {
    table: Index,
    offset: Expression,
    functions: Vec<Index>,
}

impl ElementSegment {
    /// Creates a new element segment.
    pub fn new(table: Index, offset: Expression, functions: Vec<Index>) -> Self {
        ElementSegment {
            table,
            offset,
            functions,
        }
    }

    /// The index of the table this segment initializes.
    pub fn table(&self) -> &Index {
        &self.table
    }

    /// The constant expression computing this segment's starting offset.
    pub fn offset(&self) -> &Expression {
        &self.offset
    }

    /// The functions this segment places into the table.
    pub fn functions(&self) -> &[Index] {
        &self.functions
    }
}

/// An active data segment: copies its bytes into the module's memory at the
/// evaluated offset during instantiation.
///
/// See <https://webassembly.github.io/spec/core/syntax/modules.html#data-segments>
#[derive(Clone, Debug, PartialEq)]
pub struct DataSegment {
    memory: Index,
    offset: Expression,
    bytes: Vec<u8>,
}

impl DataSegment {
    /// Creates a new data segment.
    pub fn new(memory: Index, offset: Expression, bytes: Vec<u8>) -> Self {
        DataSegment {
            memory,
            offset,
            bytes,
        }
    }

    /// The index of the memory this segment initializes.
    pub fn memory(&self) -> &Index {
        &self.memory
    }

    /// The constant expression computing this segment's starting offset.
    pub fn offset(&self) -> &Expression {
        &self.offset
    }

    /// The bytes this segment copies into memory.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A module aggregates the fields the text format declares.
/// After assembly the module upholds:
///
/// - identifiers within one index space are unique
///   (imports occupy the low indices);
/// - at most one memory, at most one table, at most one start;
/// - every index resolved to an integer inside its space;
/// - every typeuse bound to an existing type
///   (appended and de-duplicated by signature equality during parsing).
///
/// Nodes are immutable after assembly.
///
/// See <https://webassembly.github.io/spec/core/syntax/modules.html>
///
/// # Examples
/// ```rust
/// use wat_vm::Module;
///
/// let module = Module::builder().build().unwrap();
///
/// assert!(module.types().is_empty());
/// assert!(module.functions().is_empty());
/// assert!(module.memory().is_none());
/// assert!(module.start().is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Module {
    name: Option<Id>,
    types: Vec<TypeDefinition>,
    imports: Vec<Import>,
    functions: Vec<Function>,
    tables: Vec<Table>,
    memories: Vec<Memory>,
    globals: Vec<Global>,
    exports: Vec<Export>,
    start: Option<Start>,
    elements: Vec<ElementSegment>,
    data: Vec<DataSegment>,
}

impl Module {
    /// Creates a builder for assembling a module from parsed fields.
    pub fn builder() -> ModuleBuilder {
        ModuleBuilder::new()
    }

    /// An empty module.
    pub fn empty() -> Self {
        Module::default()
    }

    /// The optional name of this module.
    pub fn name(&self) -> Option<&Id> {
        self.name.as_ref()
    }

    /// The type fields of this module.
    pub fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    /// The import fields of this module.
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// The function fields of this module, excluding imports.
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// The table field of this module, if any.
    pub fn table(&self) -> Option<&Table> {
        self.tables.first()
    }

    /// The memory field of this module, if any.
    pub fn memory(&self) -> Option<&Memory> {
        self.memories.first()
    }

    /// The global fields of this module, excluding imports.
    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    /// The export fields of this module.
    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// The start field of this module, if any.
    pub fn start(&self) -> Option<&Start> {
        self.start.as_ref()
    }

    /// The element segments of this module.
    pub fn elements(&self) -> &[ElementSegment] {
        &self.elements
    }

    /// The data segments of this module.
    pub fn data(&self) -> &[DataSegment] {
        &self.data
    }

    /// The signature bound to the given (resolved) type index, if present.
    pub fn signature(&self, index: u32) -> Option<&FunctionType> {
        self.types.get(index as usize).map(TypeDefinition::signature)
    }

    /// The number of imports with descriptions in the given index space.
    pub fn import_count(&self, space: IndexSpace) -> usize {
        self.imports
            .iter()
            .filter(|import| import.description().space() == space)
            .count()
    }
}

/// Index-space bookkeeping while fields are added:
/// a running count (imports first) and the symbolic bindings seen so far.
#[derive(Debug, Default)]
struct SpaceEntries {
    count: u32,
    ids: HashMap<Id, u32>,
}

impl SpaceEntries {
    /// Claims the next index, binding the identifier when present.
    fn claim(&mut self, space: IndexSpace, id: Option<&Id>) -> Result<u32, ModelError> {
        let index = self.count;

        if let Some(id) = id {
            if self.ids.insert(id.clone(), index).is_some() {
                return Err(ModelError::DuplicateIdentifier {
                    space,
                    id: id.clone(),
                });
            }
        }

        self.count += 1;

        Ok(index)
    }

    fn resolve(&self, space: IndexSpace, index: &Index) -> Result<u32, ModelError> {
        match index {
            Index::Numeric(value) => Ok(*value),
            Index::Symbolic(id) => {
                self.ids
                    .get(id)
                    .copied()
                    .ok_or_else(|| ModelError::UnknownIdentifier {
                        space,
                        id: id.clone(),
                    })
            }
        }
    }
}

/// A builder pattern for [`Module`]s.
///
/// The builder maintains the per-space counters the text format needs while
/// walking the module body: anonymous declarations receive the next numeric
/// index in their space, imports occupy the low indices, and symbolic
/// identifiers are bound as fields arrive. [`ModuleBuilder::build`] runs the
/// post-pass: module-scoped symbolic references are rewritten to numeric
/// indices so forward references parse naturally.
pub struct ModuleBuilder {
    module: Module,
    types: SpaceEntries,
    functions: SpaceEntries,
    tables: SpaceEntries,
    memories: SpaceEntries,
    globals: SpaceEntries,
    defined: HashMap<IndexSpace, bool>,
}

impl ModuleBuilder {
    /// Creates a new empty builder of modules.
    pub fn new() -> Self {
        ModuleBuilder {
            module: Module::empty(),
            types: SpaceEntries::default(),
            functions: SpaceEntries::default(),
            tables: SpaceEntries::default(),
            memories: SpaceEntries::default(),
            globals: SpaceEntries::default(),
            defined: HashMap::new(),
        }
    }

    /// Sets the optional module name.
    pub fn set_name(&mut self, name: Option<Id>) {
        self.module.name = name;
    }

    /// The number of types added so far.
    pub fn type_count(&self) -> u32 {
        self.types.count
    }

    /// The signatures of the types added so far, in index order.
    pub fn signatures(&self) -> impl Iterator<Item = &FunctionType> {
        self.module.types.iter().map(TypeDefinition::signature)
    }

    /// Adds a type definition, returning its index in the type space.
    pub fn add_type(&mut self, definition: TypeDefinition) -> Result<u32, ModelError> {
        let index = self.types.claim(IndexSpace::Type, definition.id())?;

        self.module.types.push(definition);

        Ok(index)
    }

    /// Adds a function, returning its index in the function space.
    pub fn add_function(&mut self, function: Function) -> Result<u32, ModelError> {
        self.defined.insert(IndexSpace::Function, true);
        let index = self.functions.claim(IndexSpace::Function, function.id())?;

        self.module.functions.push(function);

        Ok(index)
    }

    /// Adds the table, returning its index.
    /// A second table in the module is a fatal well-formedness error.
    pub fn add_table(&mut self, table: Table) -> Result<u32, ModelError> {
        if self.tables.count > 0 {
            return Err(ModelError::DuplicateDeclaration("table"));
        }

        self.defined.insert(IndexSpace::Table, true);
        let index = self.tables.claim(IndexSpace::Table, table.id())?;

        self.module.tables.push(table);

        Ok(index)
    }

    /// Adds the memory, returning its index.
    /// A second memory in the module is a fatal well-formedness error.
    pub fn add_memory(&mut self, memory: Memory) -> Result<u32, ModelError> {
        if self.memories.count > 0 {
            return Err(ModelError::DuplicateDeclaration("memory"));
        }

        self.defined.insert(IndexSpace::Memory, true);
        let index = self.memories.claim(IndexSpace::Memory, memory.id())?;

        self.module.memories.push(memory);

        Ok(index)
    }

    /// Adds a global, returning its index in the global space.
    pub fn add_global(&mut self, global: Global) -> Result<u32, ModelError> {
        self.defined.insert(IndexSpace::Global, true);
        let index = self.globals.claim(IndexSpace::Global, global.id())?;

        self.module.globals.push(global);

        Ok(index)
    }

    /// Adds an import, claiming the next index in the imported entity's space.
    /// Imports must precede regular definitions in the same space so that they
    /// occupy the low indices.
    pub fn add_import(&mut self, import: Import) -> Result<u32, ModelError> {
        let space = import.description().space();

        if self.defined.get(&space).copied().unwrap_or(false) {
            return Err(ModelError::ImportAfterDefinition { space });
        }

        let entries = match space {
            IndexSpace::Function => &mut self.functions,
            IndexSpace::Table => &mut self.tables,
            IndexSpace::Memory => &mut self.memories,
            IndexSpace::Global => &mut self.globals,
            _ => unreachable!("imports only inhabit the module-scoped spaces"),
        };

        match space {
            IndexSpace::Table if entries.count > 0 => {
                return Err(ModelError::DuplicateDeclaration("table"));
            }
            IndexSpace::Memory if entries.count > 0 => {
                return Err(ModelError::DuplicateDeclaration("memory"));
            }
            _ => {}
        }

        let index = entries.claim(space, import.description().id())?;

        self.module.imports.push(import);

        Ok(index)
    }

    /// Adds an export.
    pub fn add_export(&mut self, export: Export) {
        self.module.exports.push(export);
    }

    /// Sets the start field. A second start field is a fatal error.
    pub fn set_start(&mut self, start: Start) -> Result<(), ModelError> {
        if self.module.start.is_some() {
            return Err(ModelError::DuplicateDeclaration("start"));
        }

        self.module.start = Some(start);

        Ok(())
    }

    /// Adds an element segment.
    pub fn add_element(&mut self, element: ElementSegment) {
        self.module.elements.push(element);
    }

    /// Adds a data segment.
    pub fn add_data(&mut self, data: DataSegment) {
        self.module.data.push(data);
    }

    /// Resolves a type-space index against the bindings seen so far.
    pub fn resolve_type(&self, index: &Index) -> Result<u32, ModelError> {
        self.types.resolve(IndexSpace::Type, index)
    }

    /// Finishes assembly: rewrites every module-scoped symbolic reference to
    /// its numeric index and returns the immutable module.
    pub fn build(self) -> Result<Module, ModelError> {
        let ModuleBuilder {
            mut module,
            types,
            functions,
            tables,
            memories,
            globals,
            ..
        } = self;

        let resolver = Resolver {
            types,
            functions,
            tables,
            memories,
            globals,
        };

        for function in &mut module.functions {
            function.type_use = resolver.resolve_type_use(&function.type_use)?;
            function.body = resolver.resolve_expression(&function.body)?;
        }

        for import in &mut module.imports {
            if let ImportDescription::Function(id, type_use) = &import.description {
                let resolved = resolver.resolve_type_use(type_use)?;
                import.description = ImportDescription::Function(id.clone(), resolved);
            }
        }

        for global in &mut module.globals {
            global.init = resolver.resolve_expression(&global.init)?;
        }

        for export in &mut module.exports {
            export.description = match &export.description {
                ExportDescription::Function(index) => ExportDescription::Function(
                    resolver.functions.resolve(IndexSpace::Function, index)?.into(),
                ),
                ExportDescription::Table(index) => ExportDescription::Table(
                    resolver.tables.resolve(IndexSpace::Table, index)?.into(),
                ),
                ExportDescription::Memory(index) => ExportDescription::Memory(
                    resolver.memories.resolve(IndexSpace::Memory, index)?.into(),
                ),
                ExportDescription::Global(index) => ExportDescription::Global(
                    resolver.globals.resolve(IndexSpace::Global, index)?.into(),
                ),
            };
        }

        if let Some(start) = &mut module.start {
            start.function = resolver
                .functions
                .resolve(IndexSpace::Function, &start.function)?
                .into();
        }

        for element in &mut module.elements {
            element.table = resolver.tables.resolve(IndexSpace::Table, &element.table)?.into();
            element.offset = resolver.resolve_expression(&element.offset)?;

            for function in &mut element.functions {
                *function = resolver
                    .functions
                    .resolve(IndexSpace::Function, function)?
                    .into();
            }
        }

        for data in &mut module.data {
            data.memory = resolver.memories.resolve(IndexSpace::Memory, &data.memory)?.into();
            data.offset = resolver.resolve_expression(&data.offset)?;
        }

        Ok(module)
    }
}

impl Default for ModuleBuilder {
    fn default() -> Self {
        ModuleBuilder::new()
    }
}

/// The frozen per-space bindings used by the build post-pass.
struct Resolver {
    types: SpaceEntries,
    functions: SpaceEntries,
    tables: SpaceEntries,
    memories: SpaceEntries,
    globals: SpaceEntries,
}

impl Resolver {
    fn resolve_type_use(&self, type_use: &TypeUse) -> Result<TypeUse, ModelError> {
        let index = self.types.resolve(IndexSpace::Type, type_use.index())?;

        Ok(TypeUse::new(index.into(), type_use.signature().clone()))
    }

    /// Rewrites module-scoped references inside an expression.
    /// Locals and labels are already numeric at this point;
    /// only calls, global accesses, and indirect-call typeuses remain.
    fn resolve_expression(&self, expression: &Expression) -> Result<Expression, ModelError> {
        let mut resolved = Vec::with_capacity(expression.len());

        for instruction in expression.instructions() {
            resolved.push(self.resolve_instruction(instruction)?);
        }

        Ok(Expression::new(resolved))
    }

    fn resolve_instruction(&self, instruction: &Instruction) -> Result<Instruction, ModelError> {
        let resolved = match instruction {
            Instruction::Control(control) => Instruction::Control(match control {
                ControlInstruction::Block(id, kind, body) => ControlInstruction::Block(
                    id.clone(),
                    *kind,
                    self.resolve_expression(body)?,
                ),
                ControlInstruction::Loop(id, kind, body) => ControlInstruction::Loop(
                    id.clone(),
                    *kind,
                    self.resolve_expression(body)?,
                ),
                ControlInstruction::If(id, kind, positive, negative) => ControlInstruction::If(
                    id.clone(),
                    *kind,
                    self.resolve_expression(positive)?,
                    negative
                        .as_ref()
                        .map(|branch| self.resolve_expression(branch))
                        .transpose()?,
                ),
                ControlInstruction::Call(index) => ControlInstruction::Call(
                    self.functions.resolve(IndexSpace::Function, index)?.into(),
                ),
                ControlInstruction::CallIndirect(type_use) => {
                    ControlInstruction::CallIndirect(self.resolve_type_use(type_use)?)
                }
                other => other.clone(),
            }),
            Instruction::Variable(variable) => Instruction::Variable(match variable {
                VariableInstruction::GlobalGet(index) => VariableInstruction::GlobalGet(
                    self.globals.resolve(IndexSpace::Global, index)?.into(),
                ),
                VariableInstruction::GlobalSet(index) => VariableInstruction::GlobalSet(
                    self.globals.resolve(IndexSpace::Global, index)?.into(),
                ),
                other => other.clone(),
            }),
            other => other.clone(),
        };

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Limit, ResultType};

    fn runnable_type_use() -> TypeUse {
        TypeUse::new(Index::Numeric(0), FunctionType::runnable())
    }

    #[test]
    fn empty_module() {
        let module = Module::builder().build().unwrap();

        assert_eq!(module, Module::empty());
        assert!(module.types().is_empty());
        assert!(module.memory().is_none());
        assert!(module.table().is_none());
        assert!(module.start().is_none());
    }

    #[test]
    fn duplicate_memory_is_fatal() {
        let mut builder = Module::builder();
        let memory = Memory::new(
            Some(Id::new("m")),
            MemoryType::new(Limit::bounded(1, 2)),
        );

        builder.add_memory(memory.clone()).unwrap();

        assert_eq!(
            builder.add_memory(Memory::new(None, MemoryType::new(Limit::bounded(1, 2)))),
            Err(ModelError::DuplicateDeclaration("memory"))
        );
    }

    #[test]
    fn duplicate_identifier_in_space_is_fatal() {
        let mut builder = Module::builder();
        let first = Function::new(
            Some(Id::new("f")),
            runnable_type_use(),
            vec![],
            Expression::empty(),
        );
        let second = first.clone();

        builder.add_type(TypeDefinition::new(None, FunctionType::runnable())).unwrap();
        builder.add_function(first).unwrap();

        assert_eq!(
            builder.add_function(second),
            Err(ModelError::DuplicateIdentifier {
                space: IndexSpace::Function,
                id: Id::new("f"),
            })
        );
    }

    #[test]
    fn import_after_definition_is_fatal() {
        let mut builder = Module::builder();

        builder.add_type(TypeDefinition::new(None, FunctionType::runnable())).unwrap();
        builder
            .add_function(Function::new(
                None,
                runnable_type_use(),
                vec![],
                Expression::empty(),
            ))
            .unwrap();

        assert_eq!(
            builder.add_import(Import::new(
                "env".to_string(),
                "f".to_string(),
                ImportDescription::Function(None, runnable_type_use()),
            )),
            Err(ModelError::ImportAfterDefinition {
                space: IndexSpace::Function,
            })
        );
    }

    #[test]
    fn imports_occupy_low_indices() {
        let mut builder = Module::builder();

        builder.add_type(TypeDefinition::new(None, FunctionType::runnable())).unwrap();

        let imported = builder
            .add_import(Import::new(
                "env".to_string(),
                "f".to_string(),
                ImportDescription::Function(Some(Id::new("imported")), runnable_type_use()),
            ))
            .unwrap();
        let defined = builder
            .add_function(Function::new(
                Some(Id::new("defined")),
                runnable_type_use(),
                vec![],
                Expression::empty(),
            ))
            .unwrap();

        assert_eq!(imported, 0);
        assert_eq!(defined, 1);
    }

    #[test]
    fn forward_symbolic_call_resolves_at_build() {
        let mut builder = Module::builder();

        builder.add_type(TypeDefinition::new(None, FunctionType::runnable())).unwrap();
        builder
            .add_function(Function::new(
                Some(Id::new("caller")),
                runnable_type_use(),
                vec![],
                Expression::new(vec![ControlInstruction::Call(Index::Symbolic(Id::new(
                    "callee",
                )))
                .into()]),
            ))
            .unwrap();
        builder
            .add_function(Function::new(
                Some(Id::new("callee")),
                runnable_type_use(),
                vec![],
                Expression::empty(),
            ))
            .unwrap();

        let module = builder.build().unwrap();
        let body = module.functions()[0].body();

        assert_eq!(
            body.instructions()[0],
            ControlInstruction::Call(Index::Numeric(1)).into()
        );
    }

    #[test]
    fn unknown_symbolic_reference_fails_build() {
        let mut builder = Module::builder();

        builder.add_type(TypeDefinition::new(None, FunctionType::runnable())).unwrap();
        builder
            .add_function(Function::new(
                None,
                runnable_type_use(),
                vec![],
                Expression::new(vec![ControlInstruction::Call(Index::Symbolic(Id::new(
                    "missing",
                )))
                .into()]),
            ))
            .unwrap();

        assert_eq!(
            builder.build(),
            Err(ModelError::UnknownIdentifier {
                space: IndexSpace::Function,
                id: Id::new("missing"),
            })
        );
    }

    #[test]
    fn start_set_once() {
        let mut builder = Module::builder();

        builder.add_type(TypeDefinition::new(None, FunctionType::runnable())).unwrap();
        builder
            .add_function(Function::new(
                Some(Id::new("main")),
                runnable_type_use(),
                vec![],
                Expression::empty(),
            ))
            .unwrap();
        builder
            .set_start(Start::new(Index::Symbolic(Id::new("main"))))
            .unwrap();

        assert_eq!(
            builder.set_start(Start::new(Index::Numeric(0))),
            Err(ModelError::DuplicateDeclaration("start"))
        );

        let module = builder.build().unwrap();

        assert_eq!(module.start().unwrap().function(), &Index::Numeric(0));
    }

    #[test]
    fn signature_lookup() {
        let mut builder = Module::builder();
        let signature = FunctionType::new(
            vec![ValueType::I32.into()],
            ResultType::new(vec![ValueType::I32]),
        );

        builder
            .add_type(TypeDefinition::new(Some(Id::new("unary")), signature.clone()))
            .unwrap();

        let module = builder.build().unwrap();

        assert_eq!(module.signature(0), Some(&signature));
        assert_eq!(module.signature(1), None);
    }
}
