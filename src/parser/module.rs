//! Parse module fields written in the text format, expanding its
//! abbreviations: inline imports and exports, inline element and data
//! segments, and typeuse insertion.
//!
//! See <https://webassembly.github.io/spec/core/text/modules.html>

use crate::model::{
    DataSegment, ElementSegment, Export, ExportDescription, Expression, Function, FunctionType,
    Global, Id, Import, ImportDescription, Index, IndexSpace, Limit, Local, Memory, MemoryType,
    ModelError, Module, ModuleBuilder, NumericInstruction, Start, Table, TableType,
    TypeDefinition,
};
use crate::model::ElementType;
use crate::parser::cursor::TokenCursor;
use crate::parser::instructions::{parse_expression, parse_folded, BodyContext};
use crate::parser::tokens::{ParseContext, TokenKind};
use crate::parser::types::{
    parse_global_type, parse_memory_type, parse_params, parse_results, parse_table_type,
    parse_locals, parse_type_use,
};
use crate::parser::ParseError;
use std::collections::HashSet;

/// Bytes per linear-memory page (64 KiB).
const PAGE_SIZE: usize = 65536;

/// Parses a `(module id? field*)` form into an assembled [`Module`].
///
/// Field recognizers are tried in a fixed order on every iteration;
/// the first success consumes tokens and loops, a total failure exits the
/// loop and expects the module's closing parenthesis.
pub fn parse_module(cursor: &mut TokenCursor<'_>) -> Result<Module, ParseError> {
    let context = cursor.context();

    if !cursor.try_enter("module") {
        return Err(ParseError::MissingPunctuation {
            context,
            expected: "'(module'",
        });
    }

    let mut builder = Module::builder();
    builder.set_name(cursor.take_id());

    while parse_field(cursor, &mut builder)? {}

    cursor.expect_right_paren()?;

    builder
        .build()
        .map_err(|source| ParseError::malformed(context, source))
}

/// Tries every field recognizer at the current position.
/// Returns whether one of them consumed a field.
fn parse_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    let recognizers = [
        parse_type_field,
        parse_import_field,
        parse_function_field,
        parse_table_field,
        parse_memory_field,
        parse_global_field,
        parse_export_field,
        parse_start_field,
        parse_element_field,
        parse_data_field,
    ];

    for recognize in recognizers {
        if recognize(cursor, builder)? {
            return Ok(true);
        }
    }

    Ok(false)
}

/// `(type id? (func param* result*))`
fn parse_type_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    let context = cursor.context();

    if !cursor.try_enter("type") {
        return Ok(false);
    }

    let id = cursor.take_id();

    cursor.expect_left_paren()?;
    cursor.expect_keyword("func")?;

    let params = parse_params(cursor)?;
    let results = parse_results(cursor)?;

    cursor.expect_right_paren()?;
    cursor.expect_right_paren()?;

    builder
        .add_type(TypeDefinition::new(id, FunctionType::new(params, results)))
        .map_err(|source| ParseError::malformed(context, source))?;

    Ok(true)
}

/// `(import "module" "name" desc)`
fn parse_import_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    let context = cursor.context();

    if !cursor.try_enter("import") {
        return Ok(false);
    }

    let module = cursor.expect_name()?;
    let name = cursor.expect_name()?;

    cursor.expect_left_paren()?;

    let description = match cursor.peek_keyword() {
        Some("func") => {
            cursor.advance();
            let id = cursor.take_id();
            let type_use = parse_type_use(cursor, builder)?;

            ImportDescription::Function(id, type_use)
        }
        Some("table") => {
            cursor.advance();
            let id = cursor.take_id();

            ImportDescription::Table(id, parse_table_type(cursor)?)
        }
        Some("memory") => {
            cursor.advance();
            let id = cursor.take_id();

            ImportDescription::Memory(id, parse_memory_type(cursor)?)
        }
        Some("global") => {
            cursor.advance();
            let id = cursor.take_id();

            ImportDescription::Global(id, parse_global_type(cursor)?)
        }
        _ => {
            let token = cursor.expect_any()?;
            return Err(ParseError::unexpected(token, "an import description"));
        }
    };

    cursor.expect_right_paren()?;
    cursor.expect_right_paren()?;

    builder
        .add_import(Import::new(module, name, description))
        .map_err(|source| ParseError::malformed(context, source))?;

    Ok(true)
}

/// Zero or more inline `(export "name")` clauses.
fn parse_inline_exports(cursor: &mut TokenCursor<'_>) -> Result<Vec<String>, ParseError> {
    let mut names = Vec::new();

    while cursor.at_left_paren()
        && cursor
            .peek_at(1)
            .and_then(|token| token.as_keyword())
            .map_or(false, |keyword| keyword == "export")
        && matches!(
            cursor.peek_at(2).map(|token| token.kind()),
            Some(TokenKind::Str(_))
        )
    {
        cursor.try_enter("export");
        names.push(cursor.expect_name()?);
        cursor.expect_right_paren()?;
    }

    Ok(names)
}

/// An inline `(import "module" "name")` clause.
fn parse_inline_import(
    cursor: &mut TokenCursor<'_>,
) -> Result<Option<(String, String)>, ParseError> {
    if !cursor.try_enter("import") {
        return Ok(None);
    }

    let module = cursor.expect_name()?;
    let name = cursor.expect_name()?;

    cursor.expect_right_paren()?;

    Ok(Some((module, name)))
}

/// `(func id? (export "e")* (import "m" "n")? typeuse local* instr*)`
fn parse_function_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    let context = cursor.context();

    if !cursor.try_enter("func") {
        return Ok(false);
    }

    let id = cursor.take_id();
    let exports = parse_inline_exports(cursor)?;
    let inline_import = parse_inline_import(cursor)?;
    let type_use = parse_type_use(cursor, builder)?;

    let index = match inline_import {
        Some((module, name)) => {
            cursor.expect_right_paren()?;

            builder
                .add_import(Import::new(
                    module,
                    name,
                    ImportDescription::Function(id, type_use),
                ))
                .map_err(|source| ParseError::malformed(context, source))?
        }
        None => {
            let locals = parse_locals(cursor)?;
            let bindings = local_bindings(&type_use, &locals, &context)?;
            let mut body_context = BodyContext::function(builder, bindings);
            let body = parse_expression(cursor, &mut body_context)?;

            cursor.expect_right_paren()?;

            builder
                .add_function(Function::new(id, type_use, locals, body))
                .map_err(|source| ParseError::malformed(context, source))?
        }
    };

    for name in exports {
        builder.add_export(Export::new(
            name,
            ExportDescription::Function(Index::Numeric(index)),
        ));
    }

    Ok(true)
}

/// The ordered local index space of a function body:
/// parameter identifiers first, then declared locals.
/// Duplicates within the space are fatal.
fn local_bindings(
    type_use: &crate::model::TypeUse,
    locals: &[Local],
    context: &ParseContext,
) -> Result<Vec<Option<Id>>, ParseError> {
    let bindings: Vec<Option<Id>> = type_use
        .signature()
        .parameters()
        .iter()
        .map(|param| param.id().cloned())
        .chain(locals.iter().map(|local| local.id().cloned()))
        .collect();

    let mut seen = HashSet::new();

    for id in bindings.iter().flatten() {
        if !seen.insert(id.clone()) {
            return Err(ParseError::malformed(
                context.clone(),
                ModelError::DuplicateIdentifier {
                    space: IndexSpace::Local,
                    id: id.clone(),
                },
            ));
        }
    }

    Ok(bindings)
}

/// `(table id? (export "e")* (import "m" "n")? tabletype)` or the inline
/// element form `(table id? funcref (elem funcidx*))`,
/// which fixes the limits to the listed function count.
fn parse_table_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    let context = cursor.context();

    if !cursor.try_enter("table") {
        return Ok(false);
    }

    let id = cursor.take_id();
    let exports = parse_inline_exports(cursor)?;
    let inline_import = parse_inline_import(cursor)?;

    let index = match inline_import {
        Some((module, name)) => {
            let kind = parse_table_type(cursor)?;
            cursor.expect_right_paren()?;

            builder
                .add_import(Import::new(module, name, ImportDescription::Table(id, kind)))
                .map_err(|source| ParseError::malformed(context, source))?
        }
        None if cursor.eat_keyword("funcref") => {
            // Inline element segment: the table is sized to its contents.
            if !cursor.try_enter("elem") {
                return Err(ParseError::MissingPunctuation {
                    context: cursor.context(),
                    expected: "'(elem'",
                });
            }

            let mut functions = Vec::new();

            while let Some(function) = cursor.take_index()? {
                functions.push(function);
            }

            cursor.expect_right_paren()?;
            cursor.expect_right_paren()?;

            let size = functions.len() as u32;
            let kind = TableType::new(ElementType::FunctionReference, Limit::bounded(size, size));
            let index = builder
                .add_table(Table::new(id, kind))
                .map_err(|source| ParseError::malformed(context, source))?;

            builder.add_element(ElementSegment::new(
                Index::Numeric(index),
                Expression::new(vec![NumericInstruction::I32Constant(0).into()]),
                functions,
            ));

            index
        }
        None => {
            let kind = parse_table_type(cursor)?;
            cursor.expect_right_paren()?;

            builder
                .add_table(Table::new(id, kind))
                .map_err(|source| ParseError::malformed(context, source))?
        }
    };

    for name in exports {
        builder.add_export(Export::new(
            name,
            ExportDescription::Table(Index::Numeric(index)),
        ));
    }

    Ok(true)
}

/// `(memory id? (export "e")* (import "m" "n")? memtype)` or the inline data
/// form `(memory id? (data "bytes"*))`,
/// which fixes the limits to the pages the data occupies.
fn parse_memory_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    let context = cursor.context();

    if !cursor.try_enter("memory") {
        return Ok(false);
    }

    let id = cursor.take_id();
    let exports = parse_inline_exports(cursor)?;
    let inline_import = parse_inline_import(cursor)?;

    let index = match inline_import {
        Some((module, name)) => {
            let kind = parse_memory_type(cursor)?;
            cursor.expect_right_paren()?;

            builder
                .add_import(Import::new(module, name, ImportDescription::Memory(id, kind)))
                .map_err(|source| ParseError::malformed(context, source))?
        }
        None if cursor.try_enter("data") => {
            // Inline data segment: the memory is sized to its contents.
            let mut bytes = Vec::new();

            while matches!(cursor.peek().map(|token| token.kind()), Some(TokenKind::Str(_))) {
                bytes.extend_from_slice(&cursor.expect_string()?);
            }

            cursor.expect_right_paren()?;
            cursor.expect_right_paren()?;

            let pages = bytes.len().div_ceil(PAGE_SIZE) as u32;
            let kind = MemoryType::new(Limit::bounded(pages, pages));
            let index = builder
                .add_memory(Memory::new(id, kind))
                .map_err(|source| ParseError::malformed(context, source))?;

            builder.add_data(DataSegment::new(
                Index::Numeric(index),
                Expression::new(vec![NumericInstruction::I32Constant(0).into()]),
                bytes,
            ));

            index
        }
        None => {
            let kind = parse_memory_type(cursor)?;
            cursor.expect_right_paren()?;

            builder
                .add_memory(Memory::new(id, kind))
                .map_err(|source| ParseError::malformed(context, source))?
        }
    };

    for name in exports {
        builder.add_export(Export::new(
            name,
            ExportDescription::Memory(Index::Numeric(index)),
        ));
    }

    Ok(true)
}

/// `(global id? (export "e")* (import "m" "n")? globaltype init?)`
fn parse_global_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    let context = cursor.context();

    if !cursor.try_enter("global") {
        return Ok(false);
    }

    let id = cursor.take_id();
    let exports = parse_inline_exports(cursor)?;
    let inline_import = parse_inline_import(cursor)?;

    let index = match inline_import {
        Some((module, name)) => {
            let kind = parse_global_type(cursor)?;
            cursor.expect_right_paren()?;

            builder
                .add_import(Import::new(module, name, ImportDescription::Global(id, kind)))
                .map_err(|source| ParseError::malformed(context, source))?
        }
        None => {
            let kind = parse_global_type(cursor)?;
            let mut body_context = BodyContext::constant(builder);
            let init = parse_expression(cursor, &mut body_context)?;

            cursor.expect_right_paren()?;

            builder
                .add_global(Global::new(id, kind, init))
                .map_err(|source| ParseError::malformed(context, source))?
        }
    };

    for name in exports {
        builder.add_export(Export::new(
            name,
            ExportDescription::Global(Index::Numeric(index)),
        ));
    }

    Ok(true)
}

/// `(export "name" (func|table|memory|global idx))`
fn parse_export_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    if !cursor.try_enter("export") {
        return Ok(false);
    }

    let name = cursor.expect_name()?;

    cursor.expect_left_paren()?;

    let description = match cursor.peek_keyword() {
        Some("func") => {
            cursor.advance();
            ExportDescription::Function(cursor.expect_index()?)
        }
        Some("table") => {
            cursor.advance();
            ExportDescription::Table(cursor.expect_index()?)
        }
        Some("memory") => {
            cursor.advance();
            ExportDescription::Memory(cursor.expect_index()?)
        }
        Some("global") => {
            cursor.advance();
            ExportDescription::Global(cursor.expect_index()?)
        }
        _ => {
            let token = cursor.expect_any()?;
            return Err(ParseError::unexpected(token, "an export description"));
        }
    };

    cursor.expect_right_paren()?;
    cursor.expect_right_paren()?;

    builder.add_export(Export::new(name, description));

    Ok(true)
}

/// `(start funcidx)`
fn parse_start_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    let context = cursor.context();

    if !cursor.try_enter("start") {
        return Ok(false);
    }

    let function = cursor.expect_index()?;

    cursor.expect_right_paren()?;

    builder
        .set_start(Start::new(function))
        .map_err(|source| ParseError::malformed(context, source))?;

    Ok(true)
}

/// The offset of an element or data segment:
/// `(offset instr*)` or a single folded constant instruction.
fn parse_offset(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<Expression, ParseError> {
    let mut body_context = BodyContext::constant(builder);

    if cursor.try_enter("offset") {
        let offset = parse_expression(cursor, &mut body_context)?;
        cursor.expect_right_paren()?;

        return Ok(offset);
    }

    let mut instructions = Vec::new();

    parse_folded(cursor, &mut body_context, &mut instructions)?;

    Ok(Expression::new(instructions))
}

/// `(elem tableidx? offset funcidx*)`
fn parse_element_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    if !cursor.try_enter("elem") {
        return Ok(false);
    }

    let table = cursor.take_index()?.unwrap_or(Index::Numeric(0));
    let offset = parse_offset(cursor, builder)?;
    let mut functions = Vec::new();

    while let Some(function) = cursor.take_index()? {
        functions.push(function);
    }

    cursor.expect_right_paren()?;
    builder.add_element(ElementSegment::new(table, offset, functions));

    Ok(true)
}

/// `(data memidx? offset "bytes"*)`
fn parse_data_field(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<bool, ParseError> {
    if !cursor.try_enter("data") {
        return Ok(false);
    }

    let memory = cursor.take_index()?.unwrap_or(Index::Numeric(0));
    let offset = parse_offset(cursor, builder)?;
    let mut bytes = Vec::new();

    while matches!(cursor.peek().map(|token| token.kind()), Some(TokenKind::Str(_))) {
        bytes.extend_from_slice(&cursor.expect_string()?);
    }

    cursor.expect_right_paren()?;
    builder.add_data(DataSegment::new(memory, offset, bytes));

    Ok(true)
}
