//! A WebAssembly text-format frontend and stack-machine interpreter.
//!
//! The pipeline runs leaves-first: the [`parser`] tokenizes `.wat` source
//! under the longest-match rule and assembles an immutable [`Module`] from
//! the token stream, expanding every abbreviation the text format allows.
//! The [`runtime`] flattens structured control flow into a linear
//! instruction vector, allocates instances into a [`runtime::Store`], and
//! interprets the result one step at a time with specification-exact trap
//! semantics.
//!
//! The surface covered is the WebAssembly MVP plus the saturating-truncation
//! and sign-extension instruction families. Validation, the binary format,
//! and host-side I/O are out of scope; an embedder supplies the store and
//! receives modules, values, and traps.
//!
//! # Examples
//! ```rust
//! use wat_vm::parser::parse_text;
//! use wat_vm::runtime::{invoke_export, Store, Value};
//!
//! let module = parse_text(
//!     r#"(module
//!          (func (export "fma") (param i32 i32 i32) (result i32)
//!            local.get 0
//!            local.get 1
//!            i32.mul
//!            local.get 2
//!            i32.add))"#,
//!     "fma.wat",
//! )
//! .unwrap();
//!
//! let mut store = Store::new();
//! let instance = store.instantiate(&module, &[]).unwrap();
//! let result = invoke_export(
//!     &mut store,
//!     instance,
//!     "fma",
//!     &[Value::I32(6), Value::I32(7), Value::I32(-2)],
//! )
//! .unwrap();
//!
//! assert_eq!(result, Some(Value::I32(40)));
//! ```

pub mod model;
pub mod parser;
pub mod runtime;

pub use model::*;
