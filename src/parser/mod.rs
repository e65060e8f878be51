//! Parser of the WebAssembly text format.
//!
//! The pipeline runs in two stages: [`tokenize`] converts source text into a
//! token stream under the longest-match rule, and [`parse_text`] drives a
//! hand-written recursive descent over that stream, assembling the module and
//! expanding every abbreviation the text format allows.
//!
//! See <https://webassembly.github.io/spec/core/text/index.html>

mod cursor;
mod errors;
mod instructions;
mod lexer;
mod module;
mod numbers;
mod tokens;
mod types;

use crate::model::Module;
pub use cursor::TokenCursor;
pub use errors::ParseError;
pub use lexer::{is_idchar, tokenize};
pub use numbers::{number, FloatToken, IntegerToken, LiteralError, NumberToken, Sign};
pub use tokens::{ParseContext, Token, TokenKind};

/// Parses WebAssembly text-format source into an assembled [`Module`].
///
/// The filename only labels diagnostics; no I/O happens here.
///
/// # Examples
/// ```rust
/// use wat_vm::parser::parse_text;
///
/// let module = parse_text("(module $lib (memory 1))", "lib.wat").unwrap();
///
/// assert_eq!(module.name().unwrap().as_str(), "lib");
/// assert_eq!(module.memory().unwrap().kind().limits().min(), 1);
/// ```
pub fn parse_text(source: &str, filename: &str) -> Result<Module, ParseError> {
    let tokens = tokenize(source, filename)?;
    let end = tokens
        .last()
        .map(|token| token.context().clone())
        .unwrap_or_else(|| ParseContext::new(filename, 1, 1));
    let mut cursor = TokenCursor::new(&tokens, end);
    let parsed = module::parse_module(&mut cursor)?;

    if let Some(trailing) = cursor.peek() {
        return Err(ParseError::unexpected(trailing, "end of input"));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ControlInstruction, ExportDescription, Id, ImportDescription, Index, IndexSpace, Limit,
        ModelError, NumericInstruction, ValueType, VariableInstruction,
    };

    #[test]
    fn empty_module_has_no_fields() {
        let module = parse_text("(module)", "test.wat").unwrap();

        assert!(module.types().is_empty());
        assert!(module.imports().is_empty());
        assert!(module.functions().is_empty());
        assert!(module.memory().is_none());
        assert!(module.table().is_none());
        assert!(module.start().is_none());
        assert!(module.elements().is_empty());
        assert!(module.data().is_empty());
    }

    #[test]
    fn duplicate_memory_is_a_parse_error() {
        let error =
            parse_text("(module (memory $m 1 2) (memory $m 1 2))", "test.wat").unwrap_err();

        assert!(error.to_string().contains("duplicate memory"));
    }

    #[test]
    fn inline_typeuse_inserts_one_type() {
        let explicit = parse_text(
            "(module (type (func (param i32) (result i64))))",
            "test.wat",
        )
        .unwrap();
        let inline = parse_text("(module (func (param i32) (result i64)))", "test.wat").unwrap();

        assert_eq!(explicit.types().len(), 1);
        assert_eq!(inline.types().len(), 1);
        assert!(explicit.types()[0]
            .signature()
            .matches(inline.types()[0].signature()));
    }

    #[test]
    fn typeuse_binds_the_smallest_matching_type() {
        let module = parse_text(
            "(module
               (type (func))
               (type (func (param i32)))
               (type (func (param i32)))
               (func (param i32)))",
            "test.wat",
        )
        .unwrap();

        assert_eq!(module.types().len(), 3);
        assert_eq!(
            module.functions()[0].type_use().index(),
            &Index::Numeric(1)
        );
    }

    #[test]
    fn inline_export_expansion() {
        let module = parse_text(
            r#"(module (func $add (export "add") (export "plus") (param i32 i32) (result i32)
                 local.get 0
                 local.get 1
                 i32.add))"#,
            "test.wat",
        )
        .unwrap();

        assert_eq!(module.exports().len(), 2);
        assert_eq!(module.exports()[0].name(), "add");
        assert_eq!(module.exports()[1].name(), "plus");

        for export in module.exports() {
            assert_eq!(
                export.description(),
                &ExportDescription::Function(Index::Numeric(0))
            );
        }
    }

    #[test]
    fn inline_import_expansion() {
        let module = parse_text(
            r#"(module
                 (func $log (import "console" "log") (param i32))
                 (memory $m (import "env" "memory") 1)
                 (global $base (import "env" "base") i32))"#,
            "test.wat",
        )
        .unwrap();

        assert_eq!(module.imports().len(), 3);
        assert!(matches!(
            module.imports()[0].description(),
            ImportDescription::Function(Some(id), _) if id.as_str() == "log"
        ));
        assert!(matches!(
            module.imports()[1].description(),
            ImportDescription::Memory(_, kind) if kind.limits() == &Limit::unbounded(1)
        ));
        assert!(matches!(
            module.imports()[2].description(),
            ImportDescription::Global(_, kind) if kind.kind() == ValueType::I32
        ));
    }

    #[test]
    fn inline_table_element_segment() {
        let module = parse_text(
            "(module
               (func $f)
               (func $g)
               (table funcref (elem $f $g $f)))",
            "test.wat",
        )
        .unwrap();

        let table = module.table().unwrap();

        assert_eq!(table.kind().limits(), &Limit::bounded(3, 3));
        assert_eq!(module.elements().len(), 1);
        assert_eq!(
            module.elements()[0].functions(),
            &[Index::Numeric(0), Index::Numeric(1), Index::Numeric(0)]
        );
    }

    #[test]
    fn inline_memory_data_segment() {
        let module = parse_text(
            r#"(module (memory $m (data "hello " "world")))"#,
            "test.wat",
        )
        .unwrap();

        let memory = module.memory().unwrap();

        assert_eq!(memory.kind().limits(), &Limit::bounded(1, 1));
        assert_eq!(module.data().len(), 1);
        assert_eq!(module.data()[0].bytes(), b"hello world");
    }

    #[test]
    fn segments_accept_both_offset_forms() {
        let module = parse_text(
            r#"(module
                 (memory 1)
                 (func $f)
                 (table 2 funcref)
                 (elem (i32.const 1) $f)
                 (data (offset i32.const 8) "x"))"#,
            "test.wat",
        )
        .unwrap();

        assert_eq!(
            module.elements()[0].offset().instructions(),
            &[NumericInstruction::I32Constant(1).into()]
        );
        assert_eq!(
            module.data()[0].offset().instructions(),
            &[NumericInstruction::I32Constant(8).into()]
        );
    }

    #[test]
    fn start_field_resolves_symbolically() {
        let module = parse_text("(module (func $main) (start $main))", "test.wat").unwrap();

        assert_eq!(module.start().unwrap().function(), &Index::Numeric(0));
    }

    #[test]
    fn duplicate_function_identifier_is_fatal() {
        let error = parse_text("(module (func $f) (func $f))", "test.wat").unwrap_err();

        assert!(matches!(
            error,
            ParseError::Malformed {
                source: ModelError::DuplicateIdentifier {
                    space: IndexSpace::Function,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn symbolic_references_resolve_across_fields() {
        let module = parse_text(
            r#"(module
                 (global $answer i32 (i32.const 42))
                 (func $get (result i32) global.get $answer)
                 (export "get" (func $get)))"#,
            "test.wat",
        )
        .unwrap();

        assert_eq!(
            module.functions()[0].body().instructions(),
            &[VariableInstruction::GlobalGet(Index::Numeric(0)).into()]
        );
        assert_eq!(
            module.exports()[0].description(),
            &ExportDescription::Function(Index::Numeric(0))
        );
    }

    #[test]
    fn call_is_resolved_after_the_whole_module() {
        let module = parse_text(
            "(module
               (func $caller call $callee)
               (func $callee))",
            "test.wat",
        )
        .unwrap();

        assert_eq!(
            module.functions()[0].body().instructions(),
            &[ControlInstruction::Call(Index::Numeric(1)).into()]
        );
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(matches!(
            parse_text("(module) (module)", "test.wat"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn module_identifier_is_kept() {
        let module = parse_text("(module $lib)", "test.wat").unwrap();

        assert_eq!(module.name(), Some(&Id::new("lib")));
    }
}
