//! The execution core: flattening, runtime values, the store, and the
//! stack interpreter.
//!
//! Execution is strictly single-threaded and synchronous; there are no
//! suspension points within the interpreter, and each step runs to
//! completion. The only mutable runtime state is the execution context's
//! stacks and instruction pointer plus the store the embedder owns; the
//! parsed module and its flattened code are immutable and freely shareable.

mod flatten;
mod interpreter;
mod stack;
mod store;
mod trap;
mod values;

pub use flatten::{flatten, Flat};
pub use interpreter::{invoke, invoke_export};
pub use stack::{StackLimits, DEFAULT_STACK_CAPACITY};
pub use store::{
    ExternalValue, FunctionAddress, FunctionInstance, GlobalAddress, GlobalInstance, HostHandler,
    InstanceId, MemoryAddress, MemoryInstance, ModuleFunction, ModuleInstance, Store,
    TableAddress, TableInstance, MAX_PAGES, PAGE_SIZE,
};
pub use trap::{RuntimeError, Trap};
pub use values::{
    ArithmeticOps, ExtendInto, Float, FromValue, Integer, LittleEndian, SaturatingTruncateInto,
    TransmuteInto, TryTruncateInto, Value, WrapInto,
};
