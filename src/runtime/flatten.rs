//! Lowering of the structured instruction tree to a flat vector.
//!
//! Structured stack machine code is convenient to validate but inconvenient
//! to interpret: a branch would have to scan for its matching `end`. Before
//! execution, every `block`, `loop`, and `if` is therefore lowered to a
//! synthetic start marker, its flattened body, and an end marker. Each marker
//! records the index of its matching closer, patched in once the body length
//! is known, so branches jump in constant time:
//!
//! - a branch to a `block` or `if` label continues past its [`Flat::End`];
//! - a branch to a `loop` label continues at its [`Flat::StartLoop`],
//!   which re-enters the loop.

use crate::model::{BlockType, ControlInstruction, Expression, Instruction};

/// One element of the flattened instruction vector.
#[derive(Clone, Debug, PartialEq)]
pub enum Flat {
    /// Any instruction without nested structure.
    Plain(Instruction),
    /// Opens a `block`; `end` is the index of the matching [`Flat::End`].
    StartBlock { kind: BlockType, end: usize },
    /// Opens a `loop`; a branch to its label re-executes this marker.
    StartLoop { kind: BlockType, end: usize },
    /// Opens an `if`: pops the condition and falls through into the positive
    /// branch, or jumps past `else_` (or to `end` when there is no negative
    /// branch).
    StartIf {
        kind: BlockType,
        else_: Option<usize>,
        end: usize,
    },
    /// Separates the two branches of an `if`; control arriving here fell out
    /// of the positive branch and jumps to `end`.
    Else { end: usize },
    /// Closes a structured region.
    End,
}

/// Flattens an expression into a linear instruction vector.
///
/// # Examples
/// ```rust
/// use wat_vm::parser::parse_text;
/// use wat_vm::runtime::{flatten, Flat};
///
/// let module = parse_text(
///     "(module (func (block (result i32) i32.const 1 br 0 i32.const 99) drop))",
///     "block.wat",
/// )
/// .unwrap();
/// let code = flatten(module.functions()[0].body());
///
/// assert!(matches!(code[0], Flat::StartBlock { end: 4, .. }));
/// assert!(matches!(code[4], Flat::End));
/// assert_eq!(code.len(), 6);
/// ```
pub fn flatten(expression: &Expression) -> Vec<Flat> {
    let mut code = Vec::with_capacity(expression.len());

    emit_expression(expression, &mut code);

    code
}

fn emit_expression(expression: &Expression, code: &mut Vec<Flat>) {
    for instruction in expression.instructions() {
        emit_instruction(instruction, code);
    }
}

fn emit_instruction(instruction: &Instruction, code: &mut Vec<Flat>) {
    match instruction {
        Instruction::Control(ControlInstruction::Block(_, kind, body)) => {
            let start = code.len();
            code.push(Flat::StartBlock {
                kind: *kind,
                end: 0,
            });

            emit_expression(body, code);
            code.push(Flat::End);

            let end = code.len() - 1;
            patch_end(&mut code[start], end);
        }
        Instruction::Control(ControlInstruction::Loop(_, kind, body)) => {
            let start = code.len();
            code.push(Flat::StartLoop {
                kind: *kind,
                end: 0,
            });

            emit_expression(body, code);
            code.push(Flat::End);

            let end = code.len() - 1;
            patch_end(&mut code[start], end);
        }
        Instruction::Control(ControlInstruction::If(_, kind, positive, negative)) => {
            let start = code.len();
            code.push(Flat::StartIf {
                kind: *kind,
                else_: None,
                end: 0,
            });

            emit_expression(positive, code);

            let else_ = match negative {
                Some(negative) => {
                    let split = code.len();
                    code.push(Flat::Else { end: 0 });

                    emit_expression(negative, code);

                    Some(split)
                }
                None => None,
            };

            code.push(Flat::End);
            let end = code.len() - 1;

            if let Some(split) = else_ {
                code[split] = Flat::Else { end };
            }

            if let Flat::StartIf {
                else_: marker_else,
                end: marker_end,
                ..
            } = &mut code[start]
            {
                *marker_else = else_;
                *marker_end = end;
            }
        }
        other => code.push(Flat::Plain(other.clone())),
    }
}

fn patch_end(marker: &mut Flat, position: usize) {
    match marker {
        Flat::StartBlock { end, .. } | Flat::StartLoop { end, .. } => *end = position,
        _ => unreachable!("only start markers are patched"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Index, NumericInstruction, ValueType};
    use crate::parser::parse_text;

    fn flatten_body(source: &str) -> Vec<Flat> {
        let module = parse_text(source, "test.wat").unwrap();

        flatten(module.functions()[0].body())
    }

    #[test]
    fn plain_instructions_pass_through() {
        let code = flatten_body(
            "(module (func (result i32) i32.const 1 i32.const 2 i32.add))",
        );

        assert_eq!(code.len(), 3);
        assert!(matches!(code[0], Flat::Plain(_)));
    }

    #[test]
    fn block_records_its_end() {
        let code = flatten_body("(module (func block nop nop end))");

        assert_eq!(
            code[0],
            Flat::StartBlock {
                kind: BlockType::empty(),
                end: 3,
            }
        );
        assert_eq!(code[3], Flat::End);
    }

    #[test]
    fn loop_marker_reenters_itself() {
        let code = flatten_body("(module (func loop (result i32) i32.const 1 end drop))");

        assert_eq!(
            code[0],
            Flat::StartLoop {
                kind: BlockType::returning(ValueType::I32),
                end: 2,
            }
        );
        assert_eq!(code[2], Flat::End);
    }

    #[test]
    fn if_records_else_split_and_end() {
        let code = flatten_body(
            "(module (func i32.const 1 if nop nop else nop end))",
        );

        // const, StartIf, nop, nop, Else, nop, End
        assert_eq!(
            code[1],
            Flat::StartIf {
                kind: BlockType::empty(),
                else_: Some(4),
                end: 6,
            }
        );
        assert_eq!(code[4], Flat::Else { end: 6 });
        assert_eq!(code[6], Flat::End);
    }

    #[test]
    fn if_without_else() {
        let code = flatten_body("(module (func i32.const 0 if nop end))");

        assert_eq!(
            code[1],
            Flat::StartIf {
                kind: BlockType::empty(),
                else_: None,
                end: 3,
            }
        );
    }

    #[test]
    fn nested_blocks_patch_independently() {
        let code = flatten_body("(module (func block block nop end br 0 end))");

        assert_eq!(
            code[0],
            Flat::StartBlock {
                kind: BlockType::empty(),
                end: 5,
            }
        );
        assert_eq!(
            code[1],
            Flat::StartBlock {
                kind: BlockType::empty(),
                end: 3,
            }
        );
        assert_eq!(
            code[4],
            Flat::Plain(
                crate::model::ControlInstruction::Branch(Index::Numeric(0)).into()
            )
        );
    }

    #[test]
    fn branch_example_shape() {
        let code = flatten_body(
            "(module (func (block (result i32) i32.const 1 br 0 i32.const 99) drop))",
        );

        assert_eq!(
            code[0],
            Flat::StartBlock {
                kind: BlockType::returning(ValueType::I32),
                end: 4,
            }
        );
        assert_eq!(
            code[1],
            Flat::Plain(NumericInstruction::I32Constant(1).into())
        );
        assert_eq!(code[4], Flat::End);
        assert!(matches!(code[5], Flat::Plain(_))); // drop
    }
}
