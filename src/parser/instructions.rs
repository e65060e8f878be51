//! Parse WebAssembly instructions written in the text format,
//! in both their plain (`block ... end`) and folded (`(block ...)`) forms.
//!
//! See <https://webassembly.github.io/spec/core/text/instructions.html>

use crate::model::{
    ControlInstruction, Expression, Id, Index, IndexSpace, Instruction, MemoryArgument,
    MemoryInstruction, ModelError, ModuleBuilder, NumberType, NumericInstruction,
    ParametricInstruction, VariableInstruction,
};
use crate::parser::cursor::TokenCursor;
use crate::parser::numbers::{number, NumberToken};
use crate::parser::tokens::{Token, TokenKind};
use crate::parser::types::{parse_block_type, parse_type_use};
use crate::parser::ParseError;

/// The function-scoped state instruction parsing needs:
/// the module builder (for typeuse resolution inside `call_indirect`),
/// the ordered local identifiers, and the active label stack.
pub struct BodyContext<'m> {
    builder: &'m mut ModuleBuilder,
    locals: Vec<Option<Id>>,
    labels: Vec<Option<Id>>,
}

impl<'m> BodyContext<'m> {
    /// A context for a function body: parameters then declared locals,
    /// with the implicit function-body label already in scope.
    pub fn function(builder: &'m mut ModuleBuilder, locals: Vec<Option<Id>>) -> Self {
        BodyContext {
            builder,
            locals,
            labels: vec![None],
        }
    }

    /// A context for a constant expression: no locals, no labels.
    pub fn constant(builder: &'m mut ModuleBuilder) -> Self {
        BodyContext {
            builder,
            locals: vec![],
            labels: vec![],
        }
    }

    fn push_label(&mut self, id: Option<Id>) {
        self.labels.push(id);
    }

    fn pop_label(&mut self) {
        self.labels.pop();
    }

    /// Resolves a local reference to its numeric index.
    fn resolve_local(&self, index: Index, token: &Token) -> Result<Index, ParseError> {
        match index {
            Index::Numeric(value) => {
                if (value as usize) < self.locals.len() {
                    Ok(Index::Numeric(value))
                } else {
                    Err(ParseError::ValueOutOfRange {
                        context: token.context().clone(),
                        message: format!("local index {} out of range", value),
                    })
                }
            }
            Index::Symbolic(id) => self
                .locals
                .iter()
                .position(|local| local.as_ref() == Some(&id))
                .map(|position| Index::Numeric(position as u32))
                .ok_or_else(|| {
                    ParseError::malformed(
                        token.context().clone(),
                        ModelError::UnknownIdentifier {
                            space: IndexSpace::Local,
                            id,
                        },
                    )
                }),
        }
    }

    /// Resolves a label reference to its relative depth.
    /// Symbolic labels bind innermost-first, so shadowed names resolve to the
    /// nearest enclosing block.
    fn resolve_label(&self, index: Index, token: &Token) -> Result<Index, ParseError> {
        match index {
            Index::Numeric(depth) => {
                if (depth as usize) < self.labels.len() {
                    Ok(Index::Numeric(depth))
                } else {
                    Err(ParseError::ValueOutOfRange {
                        context: token.context().clone(),
                        message: format!("branch depth {} exceeds the labels in scope", depth),
                    })
                }
            }
            Index::Symbolic(id) => self
                .labels
                .iter()
                .rev()
                .position(|label| label.as_ref() == Some(&id))
                .map(|depth| Index::Numeric(depth as u32))
                .ok_or_else(|| {
                    ParseError::malformed(
                        token.context().clone(),
                        ModelError::UnknownIdentifier {
                            space: IndexSpace::Label,
                            id,
                        },
                    )
                }),
        }
    }
}

/// Parses a sequence of instructions until a terminator:
/// `end`, `else`, a closing parenthesis, or the end of input.
/// The terminator is left unconsumed.
pub fn parse_expression(
    cursor: &mut TokenCursor<'_>,
    context: &mut BodyContext<'_>,
) -> Result<Expression, ParseError> {
    let mut instructions = Vec::new();

    parse_sequence(cursor, context, &mut instructions)?;

    Ok(Expression::new(instructions))
}

fn at_terminator(cursor: &TokenCursor<'_>) -> bool {
    cursor.is_at_end()
        || cursor.at_right_paren()
        || matches!(cursor.peek_keyword(), Some("end") | Some("else"))
}

fn parse_sequence(
    cursor: &mut TokenCursor<'_>,
    context: &mut BodyContext<'_>,
    out: &mut Vec<Instruction>,
) -> Result<(), ParseError> {
    while !at_terminator(cursor) {
        if cursor.at_left_paren() {
            parse_folded(cursor, context, out)?;
        } else {
            parse_plain(cursor, context, out)?;
        }
    }

    Ok(())
}

/// Parses one plain instruction, including the flat `block ... end`,
/// `loop ... end`, and `if ... else ... end` forms.
fn parse_plain(
    cursor: &mut TokenCursor<'_>,
    context: &mut BodyContext<'_>,
    out: &mut Vec<Instruction>,
) -> Result<(), ParseError> {
    let token = cursor.expect_any()?;
    let keyword = match token.kind() {
        TokenKind::Keyword(keyword) => keyword.as_str(),
        _ => return Err(ParseError::unexpected(token, "an instruction")),
    };

    match keyword {
        "block" | "loop" => {
            let id = cursor.take_id();
            let kind = parse_block_type(cursor)?;

            context.push_label(id.clone());
            let body = parse_expression(cursor, context)?;
            context.pop_label();

            cursor.expect_keyword("end")?;
            expect_matching_label(cursor, id.as_ref())?;

            let instruction = if keyword == "block" {
                ControlInstruction::Block(id, kind, body)
            } else {
                ControlInstruction::Loop(id, kind, body)
            };

            out.push(instruction.into());
        }
        "if" => {
            let id = cursor.take_id();
            let kind = parse_block_type(cursor)?;

            context.push_label(id.clone());
            let positive = parse_expression(cursor, context)?;
            let negative = if cursor.eat_keyword("else") {
                expect_matching_label(cursor, id.as_ref())?;
                Some(parse_expression(cursor, context)?)
            } else {
                None
            };
            context.pop_label();

            cursor.expect_keyword("end")?;
            expect_matching_label(cursor, id.as_ref())?;

            out.push(ControlInstruction::If(id, kind, positive, negative).into());
        }
        _ => {
            let instruction = parse_operation(keyword, token, cursor, context)?;
            out.push(instruction);
        }
    }

    Ok(())
}

/// A trailing label on `end` or `else` must repeat the block's label.
fn expect_matching_label(
    cursor: &mut TokenCursor<'_>,
    id: Option<&Id>,
) -> Result<(), ParseError> {
    let context = cursor.context();

    match cursor.take_id() {
        None => Ok(()),
        Some(trailing) if Some(&trailing) == id => Ok(()),
        Some(trailing) => Err(ParseError::UnexpectedToken {
            context,
            found: format!("identifier '{}'", trailing),
            expected: "the enclosing block's label".to_string(),
        }),
    }
}

/// Parses one folded instruction group starting at an opening parenthesis.
///
/// Folded `block`/`loop`/`if` need no `end`; a folded plain instruction emits
/// its folded operands first, then itself.
pub(crate) fn parse_folded(
    cursor: &mut TokenCursor<'_>,
    context: &mut BodyContext<'_>,
    out: &mut Vec<Instruction>,
) -> Result<(), ParseError> {
    cursor.expect_left_paren()?;

    let token = cursor.expect_any()?;
    let keyword = match token.kind() {
        TokenKind::Keyword(keyword) => keyword.as_str(),
        _ => return Err(ParseError::unexpected(token, "an instruction")),
    };

    match keyword {
        "block" | "loop" => {
            let id = cursor.take_id();
            let kind = parse_block_type(cursor)?;

            context.push_label(id.clone());
            let body = parse_expression(cursor, context)?;
            context.pop_label();

            cursor.expect_right_paren()?;

            let instruction = if keyword == "block" {
                ControlInstruction::Block(id, kind, body)
            } else {
                ControlInstruction::Loop(id, kind, body)
            };

            out.push(instruction.into());
        }
        "if" => {
            let id = cursor.take_id();
            let kind = parse_block_type(cursor)?;

            // The condition operands sit outside the label's scope.
            while cursor.at_left_paren() && !at_then_clause(cursor) {
                parse_folded(cursor, context, out)?;
            }

            if !cursor.try_enter("then") {
                return Err(ParseError::MissingPunctuation {
                    context: cursor.context(),
                    expected: "'(then'",
                });
            }

            context.push_label(id.clone());
            let positive = parse_expression(cursor, context)?;
            cursor.expect_right_paren()?;

            let negative = if cursor.try_enter("else") {
                let negative = parse_expression(cursor, context)?;
                cursor.expect_right_paren()?;

                Some(negative)
            } else {
                None
            };
            context.pop_label();

            cursor.expect_right_paren()?;

            out.push(ControlInstruction::If(id, kind, positive, negative).into());
        }
        _ => {
            let instruction = parse_operation(keyword, token, cursor, context)?;

            while cursor.at_left_paren() {
                parse_folded(cursor, context, out)?;
            }

            cursor.expect_right_paren()?;
            out.push(instruction);
        }
    }

    Ok(())
}

fn at_then_clause(cursor: &TokenCursor<'_>) -> bool {
    cursor
        .peek_at(1)
        .and_then(Token::as_keyword)
        .map_or(false, |keyword| keyword == "then")
}

/// Parses a plain operation: the mnemonic together with its immediates.
fn parse_operation(
    keyword: &str,
    token: &Token,
    cursor: &mut TokenCursor<'_>,
    context: &mut BodyContext<'_>,
) -> Result<Instruction, ParseError> {
    let instruction = match keyword {
        "unreachable" => ControlInstruction::Unreachable.into(),
        "nop" => ControlInstruction::Nop.into(),
        "return" => ControlInstruction::Return.into(),
        "br" => {
            let target = cursor.expect_index()?;
            ControlInstruction::Branch(context.resolve_label(target, token)?).into()
        }
        "br_if" => {
            let target = cursor.expect_index()?;
            ControlInstruction::BranchIf(context.resolve_label(target, token)?).into()
        }
        "br_table" => {
            let mut targets = vec![context.resolve_label(cursor.expect_index()?, token)?];

            while let Some(target) = cursor.take_index()? {
                targets.push(context.resolve_label(target, token)?);
            }

            let default = targets.pop().expect("at least one target was required");
            ControlInstruction::BranchTable(targets, default).into()
        }
        "call" => ControlInstruction::Call(cursor.expect_index()?).into(),
        "call_indirect" => {
            ControlInstruction::CallIndirect(parse_type_use(cursor, context.builder)?).into()
        }
        "drop" => ParametricInstruction::Drop.into(),
        "select" => ParametricInstruction::Select.into(),
        "local.get" => {
            let index = cursor.expect_index()?;
            VariableInstruction::LocalGet(context.resolve_local(index, token)?).into()
        }
        "local.set" => {
            let index = cursor.expect_index()?;
            VariableInstruction::LocalSet(context.resolve_local(index, token)?).into()
        }
        "local.tee" => {
            let index = cursor.expect_index()?;
            VariableInstruction::LocalTee(context.resolve_local(index, token)?).into()
        }
        "global.get" => VariableInstruction::GlobalGet(cursor.expect_index()?).into(),
        "global.set" => VariableInstruction::GlobalSet(cursor.expect_index()?).into(),
        "memory.size" => MemoryInstruction::Size.into(),
        "memory.grow" => MemoryInstruction::Grow.into(),
        "i32.const" => {
            let (token, integer) = expect_integer(cursor)?;
            NumericInstruction::I32Constant(
                integer
                    .to_i32()
                    .map_err(|source| ParseError::out_of_range(token, source))?,
            )
            .into()
        }
        "i64.const" => {
            let (token, integer) = expect_integer(cursor)?;
            NumericInstruction::I64Constant(
                integer
                    .to_i64()
                    .map_err(|source| ParseError::out_of_range(token, source))?,
            )
            .into()
        }
        "f32.const" => {
            let (token, float) = expect_float(cursor)?;
            NumericInstruction::F32Constant(
                float
                    .to_f32()
                    .map_err(|source| ParseError::out_of_range(token, source))?,
            )
            .into()
        }
        "f64.const" => {
            let (token, float) = expect_float(cursor)?;
            NumericInstruction::F64Constant(
                float
                    .to_f64()
                    .map_err(|source| ParseError::out_of_range(token, source))?,
            )
            .into()
        }
        _ => {
            if let Some(memory) = parse_memory_operation(keyword, cursor)? {
                memory.into()
            } else if let Some(numeric) = numeric_operation(keyword) {
                numeric.into()
            } else {
                return Err(ParseError::UnknownKeyword {
                    context: token.context().clone(),
                    keyword: keyword.to_string(),
                });
            }
        }
    };

    Ok(instruction)
}

fn expect_integer<'a>(
    cursor: &mut TokenCursor<'a>,
) -> Result<(&'a Token, &'a crate::parser::numbers::IntegerToken), ParseError> {
    let token = cursor.expect_any()?;

    match token.kind() {
        TokenKind::Integer(integer) => Ok((token, integer)),
        _ => Err(ParseError::unexpected(token, "an integer literal")),
    }
}

fn expect_float<'a>(
    cursor: &mut TokenCursor<'a>,
) -> Result<(&'a Token, crate::parser::numbers::FloatToken), ParseError> {
    let token = cursor.expect_any()?;

    match token.kind() {
        TokenKind::Float(float) => Ok((token, float.clone())),
        TokenKind::Integer(integer) => Ok((token, integer.to_float())),
        _ => Err(ParseError::unexpected(token, "a float literal")),
    }
}

/// Parses a load or store mnemonic and its `offset=`/`align=` immediates.
/// Returns `None` for keywords outside the memory family.
fn parse_memory_operation(
    keyword: &str,
    cursor: &mut TokenCursor<'_>,
) -> Result<Option<MemoryInstruction>, ParseError> {
    use crate::model::IntegerType::{I32, I64};
    use crate::model::SignExtension::{Signed, Unsigned};

    // Natural alignment is the operation's width in bytes.
    let instruction = match keyword {
        "i32.load" => MemoryInstruction::Load(NumberType::I32, parse_memarg(cursor, 4)?),
        "i64.load" => MemoryInstruction::Load(NumberType::I64, parse_memarg(cursor, 8)?),
        "f32.load" => MemoryInstruction::Load(NumberType::F32, parse_memarg(cursor, 4)?),
        "f64.load" => MemoryInstruction::Load(NumberType::F64, parse_memarg(cursor, 8)?),
        "i32.load8_s" => MemoryInstruction::Load8(I32, Signed, parse_memarg(cursor, 1)?),
        "i32.load8_u" => MemoryInstruction::Load8(I32, Unsigned, parse_memarg(cursor, 1)?),
        "i32.load16_s" => MemoryInstruction::Load16(I32, Signed, parse_memarg(cursor, 2)?),
        "i32.load16_u" => MemoryInstruction::Load16(I32, Unsigned, parse_memarg(cursor, 2)?),
        "i64.load8_s" => MemoryInstruction::Load8(I64, Signed, parse_memarg(cursor, 1)?),
        "i64.load8_u" => MemoryInstruction::Load8(I64, Unsigned, parse_memarg(cursor, 1)?),
        "i64.load16_s" => MemoryInstruction::Load16(I64, Signed, parse_memarg(cursor, 2)?),
        "i64.load16_u" => MemoryInstruction::Load16(I64, Unsigned, parse_memarg(cursor, 2)?),
        "i64.load32_s" => MemoryInstruction::Load32(Signed, parse_memarg(cursor, 4)?),
        "i64.load32_u" => MemoryInstruction::Load32(Unsigned, parse_memarg(cursor, 4)?),
        "i32.store" => MemoryInstruction::Store(NumberType::I32, parse_memarg(cursor, 4)?),
        "i64.store" => MemoryInstruction::Store(NumberType::I64, parse_memarg(cursor, 8)?),
        "f32.store" => MemoryInstruction::Store(NumberType::F32, parse_memarg(cursor, 4)?),
        "f64.store" => MemoryInstruction::Store(NumberType::F64, parse_memarg(cursor, 8)?),
        "i32.store8" => MemoryInstruction::Store8(I32, parse_memarg(cursor, 1)?),
        "i32.store16" => MemoryInstruction::Store16(I32, parse_memarg(cursor, 2)?),
        "i64.store8" => MemoryInstruction::Store8(I64, parse_memarg(cursor, 1)?),
        "i64.store16" => MemoryInstruction::Store16(I64, parse_memarg(cursor, 2)?),
        "i64.store32" => MemoryInstruction::Store32(parse_memarg(cursor, 4)?),
        _ => return Ok(None),
    };

    Ok(Some(instruction))
}

/// Parses the optional `offset=N` and `align=N` immediates.
/// The alignment is written in bytes and stored as a power-of-two exponent.
fn parse_memarg(
    cursor: &mut TokenCursor<'_>,
    natural_bytes: u32,
) -> Result<MemoryArgument, ParseError> {
    let mut offset = 0;
    let mut align = natural_bytes.trailing_zeros();

    if let Some(text) = cursor
        .peek_keyword()
        .and_then(|keyword| keyword.strip_prefix("offset="))
    {
        let token = cursor.peek().expect("a keyword was peeked");
        offset = parse_embedded_u32(text, token)?;
        cursor.advance();
    }

    if let Some(text) = cursor
        .peek_keyword()
        .and_then(|keyword| keyword.strip_prefix("align="))
    {
        let token = cursor.peek().expect("a keyword was peeked");
        let value = parse_embedded_u32(text, token)?;

        if !value.is_power_of_two() {
            return Err(ParseError::ValueOutOfRange {
                context: token.context().clone(),
                message: format!("alignment {} is not a power of two", value),
            });
        }

        align = value.trailing_zeros();
        cursor.advance();
    }

    Ok(MemoryArgument::new(align, offset))
}

/// Interprets the numeric text embedded in an `offset=`/`align=` keyword.
fn parse_embedded_u32(text: &str, token: &Token) -> Result<u32, ParseError> {
    match number(text) {
        Ok(("", NumberToken::Integer(integer))) => integer
            .to_u32()
            .map_err(|source| ParseError::out_of_range(token, source)),
        _ => Err(ParseError::unexpected(token, "an unsigned integer")),
    }
}

/// The operand-free numeric operations, keyed by mnemonic.
fn numeric_operation(keyword: &str) -> Option<NumericInstruction> {
    use crate::model::FloatType::{F32, F64};
    use crate::model::IntegerType::{I32, I64};
    use crate::model::NumericInstruction::*;
    use crate::model::SignExtension::{Signed, Unsigned};

    let instruction = match keyword {
        "i32.clz" => CountLeadingZeros(I32),
        "i32.ctz" => CountTrailingZeros(I32),
        "i32.popcnt" => CountOnes(I32),
        "i32.add" => Add(NumberType::I32),
        "i32.sub" => Subtract(NumberType::I32),
        "i32.mul" => Multiply(NumberType::I32),
        "i32.div_s" => DivideInteger(I32, Signed),
        "i32.div_u" => DivideInteger(I32, Unsigned),
        "i32.rem_s" => Remainder(I32, Signed),
        "i32.rem_u" => Remainder(I32, Unsigned),
        "i32.and" => And(I32),
        "i32.or" => Or(I32),
        "i32.xor" => Xor(I32),
        "i32.shl" => ShiftLeft(I32),
        "i32.shr_s" => ShiftRight(I32, Signed),
        "i32.shr_u" => ShiftRight(I32, Unsigned),
        "i32.rotl" => RotateLeft(I32),
        "i32.rotr" => RotateRight(I32),
        "i32.eqz" => EqualToZero(I32),
        "i32.eq" => Equal(NumberType::I32),
        "i32.ne" => NotEqual(NumberType::I32),
        "i32.lt_s" => LessThanInteger(I32, Signed),
        "i32.lt_u" => LessThanInteger(I32, Unsigned),
        "i32.gt_s" => GreaterThanInteger(I32, Signed),
        "i32.gt_u" => GreaterThanInteger(I32, Unsigned),
        "i32.le_s" => LessThanOrEqualToInteger(I32, Signed),
        "i32.le_u" => LessThanOrEqualToInteger(I32, Unsigned),
        "i32.ge_s" => GreaterThanOrEqualToInteger(I32, Signed),
        "i32.ge_u" => GreaterThanOrEqualToInteger(I32, Unsigned),
        "i32.extend8_s" => ExtendSigned8(I32),
        "i32.extend16_s" => ExtendSigned16(I32),
        "i64.clz" => CountLeadingZeros(I64),
        "i64.ctz" => CountTrailingZeros(I64),
        "i64.popcnt" => CountOnes(I64),
        "i64.add" => Add(NumberType::I64),
        "i64.sub" => Subtract(NumberType::I64),
        "i64.mul" => Multiply(NumberType::I64),
        "i64.div_s" => DivideInteger(I64, Signed),
        "i64.div_u" => DivideInteger(I64, Unsigned),
        "i64.rem_s" => Remainder(I64, Signed),
        "i64.rem_u" => Remainder(I64, Unsigned),
        "i64.and" => And(I64),
        "i64.or" => Or(I64),
        "i64.xor" => Xor(I64),
        "i64.shl" => ShiftLeft(I64),
        "i64.shr_s" => ShiftRight(I64, Signed),
        "i64.shr_u" => ShiftRight(I64, Unsigned),
        "i64.rotl" => RotateLeft(I64),
        "i64.rotr" => RotateRight(I64),
        "i64.eqz" => EqualToZero(I64),
        "i64.eq" => Equal(NumberType::I64),
        "i64.ne" => NotEqual(NumberType::I64),
        "i64.lt_s" => LessThanInteger(I64, Signed),
        "i64.lt_u" => LessThanInteger(I64, Unsigned),
        "i64.gt_s" => GreaterThanInteger(I64, Signed),
        "i64.gt_u" => GreaterThanInteger(I64, Unsigned),
        "i64.le_s" => LessThanOrEqualToInteger(I64, Signed),
        "i64.le_u" => LessThanOrEqualToInteger(I64, Unsigned),
        "i64.ge_s" => GreaterThanOrEqualToInteger(I64, Signed),
        "i64.ge_u" => GreaterThanOrEqualToInteger(I64, Unsigned),
        "i64.extend8_s" => ExtendSigned8(I64),
        "i64.extend16_s" => ExtendSigned16(I64),
        "i64.extend32_s" => ExtendSigned32,
        "f32.abs" => AbsoluteValue(F32),
        "f32.neg" => Negate(F32),
        "f32.ceil" => Ceiling(F32),
        "f32.floor" => Floor(F32),
        "f32.trunc" => Truncate(F32),
        "f32.nearest" => Nearest(F32),
        "f32.sqrt" => SquareRoot(F32),
        "f32.add" => Add(NumberType::F32),
        "f32.sub" => Subtract(NumberType::F32),
        "f32.mul" => Multiply(NumberType::F32),
        "f32.div" => DivideFloat(F32),
        "f32.min" => Minimum(F32),
        "f32.max" => Maximum(F32),
        "f32.copysign" => CopySign(F32),
        "f32.eq" => Equal(NumberType::F32),
        "f32.ne" => NotEqual(NumberType::F32),
        "f32.lt" => LessThanFloat(F32),
        "f32.gt" => GreaterThanFloat(F32),
        "f32.le" => LessThanOrEqualToFloat(F32),
        "f32.ge" => GreaterThanOrEqualToFloat(F32),
        "f64.abs" => AbsoluteValue(F64),
        "f64.neg" => Negate(F64),
        "f64.ceil" => Ceiling(F64),
        "f64.floor" => Floor(F64),
        "f64.trunc" => Truncate(F64),
        "f64.nearest" => Nearest(F64),
        "f64.sqrt" => SquareRoot(F64),
        "f64.add" => Add(NumberType::F64),
        "f64.sub" => Subtract(NumberType::F64),
        "f64.mul" => Multiply(NumberType::F64),
        "f64.div" => DivideFloat(F64),
        "f64.min" => Minimum(F64),
        "f64.max" => Maximum(F64),
        "f64.copysign" => CopySign(F64),
        "f64.eq" => Equal(NumberType::F64),
        "f64.ne" => NotEqual(NumberType::F64),
        "f64.lt" => LessThanFloat(F64),
        "f64.gt" => GreaterThanFloat(F64),
        "f64.le" => LessThanOrEqualToFloat(F64),
        "f64.ge" => GreaterThanOrEqualToFloat(F64),
        "i32.wrap_i64" => Wrap,
        "i32.trunc_f32_s" => ConvertAndTruncate(I32, F32, Signed),
        "i32.trunc_f32_u" => ConvertAndTruncate(I32, F32, Unsigned),
        "i32.trunc_f64_s" => ConvertAndTruncate(I32, F64, Signed),
        "i32.trunc_f64_u" => ConvertAndTruncate(I32, F64, Unsigned),
        "i32.trunc_sat_f32_s" => ConvertAndTruncateWithSaturation(I32, F32, Signed),
        "i32.trunc_sat_f32_u" => ConvertAndTruncateWithSaturation(I32, F32, Unsigned),
        "i32.trunc_sat_f64_s" => ConvertAndTruncateWithSaturation(I32, F64, Signed),
        "i32.trunc_sat_f64_u" => ConvertAndTruncateWithSaturation(I32, F64, Unsigned),
        "i64.extend_i32_s" => ExtendWithSignExtension(Signed),
        "i64.extend_i32_u" => ExtendWithSignExtension(Unsigned),
        "i64.trunc_f32_s" => ConvertAndTruncate(I64, F32, Signed),
        "i64.trunc_f32_u" => ConvertAndTruncate(I64, F32, Unsigned),
        "i64.trunc_f64_s" => ConvertAndTruncate(I64, F64, Signed),
        "i64.trunc_f64_u" => ConvertAndTruncate(I64, F64, Unsigned),
        "i64.trunc_sat_f32_s" => ConvertAndTruncateWithSaturation(I64, F32, Signed),
        "i64.trunc_sat_f32_u" => ConvertAndTruncateWithSaturation(I64, F32, Unsigned),
        "i64.trunc_sat_f64_s" => ConvertAndTruncateWithSaturation(I64, F64, Signed),
        "i64.trunc_sat_f64_u" => ConvertAndTruncateWithSaturation(I64, F64, Unsigned),
        "f32.convert_i32_s" => Convert(F32, I32, Signed),
        "f32.convert_i32_u" => Convert(F32, I32, Unsigned),
        "f32.convert_i64_s" => Convert(F32, I64, Signed),
        "f32.convert_i64_u" => Convert(F32, I64, Unsigned),
        "f32.demote_f64" => Demote,
        "f64.convert_i32_s" => Convert(F64, I32, Signed),
        "f64.convert_i32_u" => Convert(F64, I32, Unsigned),
        "f64.convert_i64_s" => Convert(F64, I64, Signed),
        "f64.convert_i64_u" => Convert(F64, I64, Unsigned),
        "f64.promote_f32" => Promote,
        "i32.reinterpret_f32" => ReinterpretFloat(I32),
        "i64.reinterpret_f64" => ReinterpretFloat(I64),
        "f32.reinterpret_i32" => ReinterpretInteger(F32),
        "f64.reinterpret_i64" => ReinterpretInteger(F64),
        _ => return None,
    };

    Some(instruction)
}
