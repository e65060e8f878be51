//! Parse WebAssembly types written in the text format.
//!
//! See <https://webassembly.github.io/spec/core/text/types.html>

use crate::model::{
    BlockType, ElementType, FunctionType, GlobalType, Id, Index, IndexSpace, Limit, Local,
    MemoryType, ModelError, ModuleBuilder, Param, ResultType, TableType, TypeDefinition, TypeUse,
    ValueType,
};
use crate::parser::cursor::TokenCursor;
use crate::parser::tokens::{ParseContext, TokenKind};
use crate::parser::ParseError;

/// Parses a value type keyword when one is next.
pub fn parse_value_type(cursor: &mut TokenCursor<'_>) -> Option<ValueType> {
    let kind = match cursor.peek_keyword()? {
        "i32" => ValueType::I32,
        "i64" => ValueType::I64,
        "f32" => ValueType::F32,
        "f64" => ValueType::F64,
        _ => return None,
    };

    cursor.advance();

    Some(kind)
}

/// Requires a value type keyword.
pub fn expect_value_type(cursor: &mut TokenCursor<'_>) -> Result<ValueType, ParseError> {
    parse_value_type(cursor).ok_or_else(|| match cursor.peek() {
        Some(token) => ParseError::unexpected(token, "a value type"),
        None => ParseError::UnexpectedEnd {
            context: cursor.context(),
        },
    })
}

/// Parses zero or more `(param ...)` clauses.
/// A clause either binds one identifier to one value type or
/// lists several anonymous value types.
pub fn parse_params(cursor: &mut TokenCursor<'_>) -> Result<Vec<Param>, ParseError> {
    let mut params = Vec::new();

    while cursor.try_enter("param") {
        match cursor.take_id() {
            Some(id) => {
                let kind = expect_value_type(cursor)?;
                params.push(Param::new(Some(id), kind));
            }
            None => {
                while let Some(kind) = parse_value_type(cursor) {
                    params.push(kind.into());
                }
            }
        }

        cursor.expect_right_paren()?;
    }

    Ok(params)
}

/// Parses zero or more `(result ...)` clauses into one result type.
pub fn parse_results(cursor: &mut TokenCursor<'_>) -> Result<ResultType, ParseError> {
    let mut kinds = Vec::new();

    while cursor.try_enter("result") {
        while let Some(kind) = parse_value_type(cursor) {
            kinds.push(kind);
        }

        cursor.expect_right_paren()?;
    }

    Ok(ResultType::new(kinds))
}

/// Parses zero or more `(local ...)` clauses of a function body.
pub fn parse_locals(cursor: &mut TokenCursor<'_>) -> Result<Vec<Local>, ParseError> {
    let mut locals = Vec::new();

    while cursor.try_enter("local") {
        match cursor.take_id() {
            Some(id) => {
                let kind = expect_value_type(cursor)?;
                locals.push(Local::new(Some(id), kind));
            }
            None => {
                while let Some(kind) = parse_value_type(cursor) {
                    locals.push(kind.into());
                }
            }
        }

        cursor.expect_right_paren()?;
    }

    Ok(locals)
}

/// Parses limits: a minimum and an optional maximum, enforcing `min <= max`.
pub fn parse_limits(cursor: &mut TokenCursor<'_>) -> Result<Limit, ParseError> {
    let context = cursor.context();
    let min = cursor.expect_u32()?;
    let max = match cursor.peek().map(|token| token.kind()) {
        Some(TokenKind::Integer(_)) => Some(cursor.expect_u32()?),
        _ => None,
    };
    let limit = Limit::new(min, max);

    if !limit.is_valid() {
        return Err(ParseError::ValueOutOfRange {
            context,
            message: format!("limits maximum {} below minimum {}", max.unwrap_or(0), min),
        });
    }

    Ok(limit)
}

/// Parses a memory type: limits in units of pages.
pub fn parse_memory_type(cursor: &mut TokenCursor<'_>) -> Result<MemoryType, ParseError> {
    Ok(MemoryType::new(parse_limits(cursor)?))
}

/// Parses a table type: limits followed by the `funcref` element type.
pub fn parse_table_type(cursor: &mut TokenCursor<'_>) -> Result<TableType, ParseError> {
    let limits = parse_limits(cursor)?;

    cursor.expect_keyword("funcref")?;

    Ok(TableType::new(ElementType::FunctionReference, limits))
}

/// Parses a global type: a bare value type (immutable) or `(mut valtype)`.
pub fn parse_global_type(cursor: &mut TokenCursor<'_>) -> Result<GlobalType, ParseError> {
    if cursor.try_enter("mut") {
        let kind = expect_value_type(cursor)?;
        cursor.expect_right_paren()?;

        return Ok(GlobalType::mutable(kind));
    }

    Ok(GlobalType::immutable(expect_value_type(cursor)?))
}

/// Parses the block type annotation of a structured instruction:
/// at most one `(result valtype)` in the MVP surface.
pub fn parse_block_type(cursor: &mut TokenCursor<'_>) -> Result<BlockType, ParseError> {
    let results = parse_results(cursor)?;

    match results.kinds() {
        [] => Ok(BlockType::empty()),
        [kind] => Ok(BlockType::returning(*kind)),
        _ => Err(ParseError::ValueOutOfRange {
            context: cursor.context(),
            message: "a block may carry at most one result".to_string(),
        }),
    }
}

/// Parses a typeuse: an optional `(type x)` reference and optional inline
/// `(param ...)* (result ...)*` clauses.
///
/// A bare reference binds the referenced type directly. An inline signature
/// without a reference binds the smallest existing type with an equal
/// signature, appending a fresh type when none exists. The combined form must
/// match the referenced type.
pub fn parse_type_use(
    cursor: &mut TokenCursor<'_>,
    builder: &mut ModuleBuilder,
) -> Result<TypeUse, ParseError> {
    let context = cursor.context();
    let reference = if cursor.try_enter("type") {
        let index = cursor.expect_index()?;
        cursor.expect_right_paren()?;

        Some(index)
    } else {
        None
    };

    let params = parse_params(cursor)?;
    let results = parse_results(cursor)?;
    let inline = FunctionType::new(params, results);

    match reference {
        Some(index) => {
            let resolved = resolve_type_reference(builder, &index, &context)?;
            let signature = builder
                .signatures()
                .nth(resolved as usize)
                .expect("resolve_type_reference bounds the index")
                .clone();

            if inline.parameters().is_empty() && inline.results().is_empty() {
                // The reference alone: inherit the signature, but not the
                // type definition's parameter identifiers.
                Ok(TypeUse::new(Index::Numeric(resolved), anonymize(&signature)))
            } else if inline.matches(&signature) {
                Ok(TypeUse::new(Index::Numeric(resolved), inline))
            } else {
                Err(ParseError::ValueOutOfRange {
                    context,
                    message: format!(
                        "inline signature does not match referenced type {}",
                        resolved
                    ),
                })
            }
        }
        None => {
            let existing = builder
                .signatures()
                .position(|signature| signature.matches(&inline));

            let index = match existing {
                Some(index) => index as u32,
                None => builder
                    .add_type(TypeDefinition::new(None, anonymize(&inline)))
                    .map_err(|source| ParseError::malformed(context, source))?,
            };

            Ok(TypeUse::new(Index::Numeric(index), inline))
        }
    }
}

/// Resolves a type-space reference against the types collected so far.
fn resolve_type_reference(
    builder: &ModuleBuilder,
    index: &Index,
    context: &ParseContext,
) -> Result<u32, ParseError> {
    let resolved = builder
        .resolve_type(index)
        .map_err(|source| ParseError::malformed(context.clone(), source))?;

    if resolved >= builder.type_count() {
        return Err(ParseError::malformed(
            context.clone(),
            ModelError::UnknownIdentifier {
                space: IndexSpace::Type,
                id: Id::new(resolved.to_string()),
            },
        ));
    }

    Ok(resolved)
}

/// Strips parameter identifiers, leaving only the signature shape.
fn anonymize(signature: &FunctionType) -> FunctionType {
    FunctionType::new(
        signature.parameter_kinds().map(Param::from).collect(),
        signature.results().clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::tokenize;
    use quickcheck_macros::quickcheck;

    fn with_cursor<T>(source: &str, parse: impl FnOnce(&mut TokenCursor<'_>) -> T) -> T {
        let tokens = tokenize(source, "test.wat").unwrap();
        let mut cursor = TokenCursor::new(&tokens, ParseContext::new("test.wat", 1, 1));

        parse(&mut cursor)
    }

    #[test]
    fn value_types() {
        assert_eq!(
            with_cursor("i32 i64 f32 f64", |cursor| {
                (
                    parse_value_type(cursor),
                    parse_value_type(cursor),
                    parse_value_type(cursor),
                    parse_value_type(cursor),
                )
            }),
            (
                Some(ValueType::I32),
                Some(ValueType::I64),
                Some(ValueType::F32),
                Some(ValueType::F64),
            )
        );
    }

    #[test]
    fn params_single_named_or_many_anonymous() {
        let params = with_cursor("(param $x i32) (param i64 f64)", parse_params).unwrap();

        assert_eq!(
            params,
            vec![
                Param::new(Some(Id::new("x")), ValueType::I32),
                ValueType::I64.into(),
                ValueType::F64.into(),
            ]
        );
    }

    #[test]
    fn limits_require_min_below_max() {
        assert_eq!(with_cursor("1 2", parse_limits), Ok(Limit::bounded(1, 2)));
        assert_eq!(with_cursor("3", parse_limits), Ok(Limit::unbounded(3)));
        assert!(matches!(
            with_cursor("2 1", parse_limits),
            Err(ParseError::ValueOutOfRange { .. })
        ));
    }

    #[quickcheck]
    fn accepted_limits_are_monotone(min: u32, max: u32) -> bool {
        let source = format!("{} {}", min, max);
        let parsed = with_cursor(&source, parse_limits);

        match parsed {
            Ok(limit) => limit.is_valid() && min <= max,
            Err(_) => min > max,
        }
    }

    #[test]
    fn table_type_requires_funcref() {
        assert_eq!(
            with_cursor("1 10 funcref", parse_table_type),
            Ok(TableType::new(
                ElementType::FunctionReference,
                Limit::bounded(1, 10)
            ))
        );
        assert!(with_cursor("1 10 externref", parse_table_type).is_err());
    }

    #[test]
    fn global_types() {
        assert_eq!(
            with_cursor("i32", parse_global_type),
            Ok(GlobalType::immutable(ValueType::I32))
        );
        assert_eq!(
            with_cursor("(mut f64)", parse_global_type),
            Ok(GlobalType::mutable(ValueType::F64))
        );
    }

    #[test]
    fn typeuse_binds_existing_type_by_signature() {
        let mut builder = ModuleBuilder::new();
        let signature = FunctionType::new(
            vec![ValueType::I32.into()],
            ResultType::new(vec![ValueType::I64]),
        );

        builder
            .add_type(TypeDefinition::new(None, signature))
            .unwrap();

        let type_use = with_cursor("(param i32) (result i64)", |cursor| {
            parse_type_use(cursor, &mut builder)
        })
        .unwrap();

        assert_eq!(type_use.index(), &Index::Numeric(0));
        assert_eq!(builder.type_count(), 1);
    }

    #[test]
    fn typeuse_appends_unseen_signature() {
        let mut builder = ModuleBuilder::new();

        let type_use = with_cursor("(param i32 i32) (result i32)", |cursor| {
            parse_type_use(cursor, &mut builder)
        })
        .unwrap();

        assert_eq!(type_use.index(), &Index::Numeric(0));
        assert_eq!(builder.type_count(), 1);

        // The same inline signature binds the type appended a moment ago.
        let again = with_cursor("(param i32 i32) (result i32)", |cursor| {
            parse_type_use(cursor, &mut builder)
        })
        .unwrap();

        assert_eq!(again.index(), &Index::Numeric(0));
        assert_eq!(builder.type_count(), 1);
    }

    #[test]
    fn combined_typeuse_must_match() {
        let mut builder = ModuleBuilder::new();

        builder
            .add_type(TypeDefinition::new(
                Some(Id::new("t")),
                FunctionType::new(vec![ValueType::I32.into()], ResultType::empty()),
            ))
            .unwrap();

        let matching = with_cursor("(type $t) (param i32)", |cursor| {
            parse_type_use(cursor, &mut builder)
        });
        assert!(matching.is_ok());

        let mismatched = with_cursor("(type $t) (param f64)", |cursor| {
            parse_type_use(cursor, &mut builder)
        });
        assert!(mismatched.is_err());
    }

    #[test]
    fn typeuse_reference_does_not_leak_parameter_names(){
        let mut builder = ModuleBuilder::new();

        builder
            .add_type(TypeDefinition::new(
                Some(Id::new("t")),
                FunctionType::new(
                    vec![Param::new(Some(Id::new("hidden")), ValueType::I32)],
                    ResultType::empty(),
                ),
            ))
            .unwrap();

        let type_use = with_cursor("(type $t)", |cursor| parse_type_use(cursor, &mut builder))
            .unwrap();

        assert!(type_use.signature().parameters()[0].id().is_none());
    }
}
