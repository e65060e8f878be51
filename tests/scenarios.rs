//! End-to-end scenarios: source text through parsing, instantiation,
//! and interpretation.

use wat_vm::parser::{parse_text, ParseError};
use wat_vm::runtime::{invoke_export, ExternalValue, RuntimeError, StackLimits, Store, Trap, Value};
use wat_vm::FunctionType;

fn run(source: &str, name: &str, arguments: &[Value]) -> Result<Option<Value>, RuntimeError> {
    let module = parse_text(source, "scenario.wat").expect("the module parses");
    let mut store = Store::new();
    let instance = store.instantiate(&module, &[]).expect("the module instantiates");

    invoke_export(&mut store, instance, name, arguments)
}

#[test]
fn empty_module_has_no_fields() {
    let module = parse_text("(module)", "empty.wat").unwrap();

    assert!(module.types().is_empty());
    assert!(module.memory().is_none());
    assert!(module.start().is_none());
}

#[test]
fn duplicate_memory_is_a_parse_error() {
    let error = parse_text("(module (memory $m 1 2) (memory $m 1 2))", "dup.wat").unwrap_err();

    assert!(matches!(error, ParseError::Malformed { .. }));
    assert!(error.to_string().contains("duplicate memory"));
}

#[test]
fn inline_typeuse_auto_inserts_one_type() {
    let explicit = parse_text(
        "(module (type (func (param i32) (result i64))))",
        "explicit.wat",
    )
    .unwrap();
    let inline = parse_text("(module (func (param i32) (result i64)))", "inline.wat").unwrap();

    assert_eq!(explicit.types().len(), 1);
    assert_eq!(inline.types().len(), 1);
    assert!(explicit.types()[0]
        .signature()
        .matches(inline.types()[0].signature()));
}

#[test]
fn exported_add_returns_forty_two() {
    let result = run(
        r#"(module (func (export "add") (param i32 i32) (result i32)
             local.get 0
             local.get 1
             i32.add))"#,
        "add",
        &[Value::I32(7), Value::I32(35)],
    );

    assert_eq!(result.unwrap(), Some(Value::I32(42)));
}

#[test]
fn signed_division_overflow_traps_with_integer_overflow() {
    let result = run(
        r#"(module (func (export "overflow") (result i32)
             i32.const -2147483648
             i32.const -1
             i32.div_s))"#,
        "overflow",
        &[],
    );

    assert_eq!(result, Err(RuntimeError::Trap(Trap::IntegerOverflow)));
    assert_eq!(Trap::IntegerOverflow.to_string(), "integer overflow");
}

#[test]
fn branch_skips_the_rest_of_the_block() {
    // The block result is 1; the trailing constant is never evaluated,
    // and the drop leaves the operand stack empty.
    let result = run(
        r#"(module (func (export "escape") (result i32)
             (block (result i32)
               i32.const 1
               br 0
               i32.const 99)
             i32.const 7
             i32.add))"#,
        "escape",
        &[],
    );

    assert_eq!(result.unwrap(), Some(Value::I32(8)));
}

#[test]
fn branch_to_a_loop_repeats_it() {
    // Sums 1..=5 by branching back to the loop header.
    let result = run(
        r#"(module (func (export "sum") (result i32) (local $n i32) (local $total i32)
             i32.const 5
             local.set $n
             block $done
               loop $again
                 local.get $n
                 i32.eqz
                 br_if $done
                 local.get $total
                 local.get $n
                 i32.add
                 local.set $total
                 local.get $n
                 i32.const 1
                 i32.sub
                 local.set $n
                 br $again
               end
             end
             local.get $total))"#,
        "sum",
        &[],
    );

    assert_eq!(result.unwrap(), Some(Value::I32(15)));
}

#[test]
fn if_else_selects_a_branch() {
    let source = r#"(module (func (export "sign") (param i32) (result i32)
        (if (result i32) (local.get 0)
          (then (i32.const 1))
          (else (i32.const -1)))))"#;

    assert_eq!(
        run(source, "sign", &[Value::I32(42)]).unwrap(),
        Some(Value::I32(1))
    );
    assert_eq!(
        run(source, "sign", &[Value::I32(0)]).unwrap(),
        Some(Value::I32(-1))
    );
}

#[test]
fn branch_table_selects_by_index() {
    let source = r#"(module (func (export "classify") (param i32) (result i32)
        block $default
          block $one
            block $zero
              local.get 0
              br_table $zero $one $default
            end
            i32.const 100
            return
          end
          i32.const 200
          return
        end
        i32.const 300))"#;

    assert_eq!(
        run(source, "classify", &[Value::I32(0)]).unwrap(),
        Some(Value::I32(100))
    );
    assert_eq!(
        run(source, "classify", &[Value::I32(1)]).unwrap(),
        Some(Value::I32(200))
    );
    assert_eq!(
        run(source, "classify", &[Value::I32(9)]).unwrap(),
        Some(Value::I32(300))
    );
}

#[test]
fn recursive_calls_compute_factorial() {
    let result = run(
        r#"(module (func $factorial (export "factorial") (param i64) (result i64)
             local.get 0
             i64.const 2
             i64.lt_s
             if (result i64)
               i64.const 1
             else
               local.get 0
               local.get 0
               i64.const 1
               i64.sub
               call $factorial
               i64.mul
             end))"#,
        "factorial",
        &[Value::I64(10)],
    );

    assert_eq!(result.unwrap(), Some(Value::I64(3_628_800)));
}

#[test]
fn call_indirect_dispatches_through_the_table() {
    let source = r#"(module
        (type $binop (func (param i32 i32) (result i32)))
        (func $sum (type $binop) local.get 0 local.get 1 i32.add)
        (func $difference (type $binop) local.get 0 local.get 1 i32.sub)
        (table funcref (elem $sum $difference))
        (func (export "apply") (param i32 i32 i32) (result i32)
          local.get 1
          local.get 2
          local.get 0
          call_indirect (type $binop)))"#;

    assert_eq!(
        run(source, "apply", &[Value::I32(0), Value::I32(40), Value::I32(2)]).unwrap(),
        Some(Value::I32(42))
    );
    assert_eq!(
        run(source, "apply", &[Value::I32(1), Value::I32(40), Value::I32(2)]).unwrap(),
        Some(Value::I32(38))
    );
}

#[test]
fn call_indirect_traps_exactly() {
    let source = r#"(module
        (type $binop (func (param i32 i32) (result i32)))
        (func $noop)
        (table funcref (elem $noop))
        (func (export "out_of_range") (result i32)
          i32.const 1 i32.const 2 i32.const 9 call_indirect (type $binop))
        (func (export "mismatch") (result i32)
          i32.const 1 i32.const 2 i32.const 0 call_indirect (type $binop)))"#;

    assert_eq!(
        run(source, "out_of_range", &[]),
        Err(RuntimeError::Trap(Trap::UndefinedElement))
    );
    assert_eq!(
        run(source, "mismatch", &[]),
        Err(RuntimeError::Trap(Trap::IndirectCallTypeMismatch))
    );
}

#[test]
fn uninitialized_table_slot_traps() {
    let result = run(
        r#"(module
             (table 4 funcref)
             (func (export "empty_slot")
               i32.const 2 call_indirect))"#,
        "empty_slot",
        &[],
    );

    assert_eq!(result, Err(RuntimeError::Trap(Trap::UninitializedElement)));
}

#[test]
fn memory_loads_and_stores_round_trip() {
    let result = run(
        r#"(module
             (memory 1)
             (func (export "stash") (param i32 i64) (result i64)
               local.get 0
               local.get 1
               i64.store offset=8
               local.get 0
               i64.load offset=8))"#,
        "stash",
        &[Value::I32(16), Value::I64(-123_456_789)],
    );

    assert_eq!(result.unwrap(), Some(Value::I64(-123_456_789)));
}

#[test]
fn narrow_loads_extend_by_their_signedness() {
    let source = r#"(module
        (memory (data "\80\ff"))
        (func (export "signed") (result i32) i32.const 0 i32.load8_s)
        (func (export "unsigned") (result i32) i32.const 0 i32.load8_u))"#;

    assert_eq!(run(source, "signed", &[]).unwrap(), Some(Value::I32(-128)));
    assert_eq!(run(source, "unsigned", &[]).unwrap(), Some(Value::I32(128)));
}

#[test]
fn out_of_bounds_access_traps() {
    let result = run(
        r#"(module
             (memory 1 1)
             (func (export "poke")
               i32.const 65533
               i64.const 0
               i64.store))"#,
        "poke",
        &[],
    );

    assert_eq!(result, Err(RuntimeError::Trap(Trap::MemoryAccessOutOfBounds)));
}

#[test]
fn memory_grow_reports_and_respects_the_maximum() {
    let result = run(
        r#"(module
             (memory 1 2)
             (func (export "grow_twice") (result i32)
               i32.const 1
               memory.grow
               drop
               i32.const 1
               memory.grow))"#,
        "grow_twice",
        &[],
    );

    assert_eq!(result.unwrap(), Some(Value::I32(-1)));
}

#[test]
fn globals_update_across_calls() {
    let source = r#"(module
        (global $count (mut i32) (i32.const 0))
        (func (export "bump") (result i32)
          global.get $count
          i32.const 1
          i32.add
          global.set $count
          global.get $count))"#;

    let module = parse_text(source, "count.wat").unwrap();
    let mut store = Store::new();
    let instance = store.instantiate(&module, &[]).unwrap();

    for expected in 1..=3 {
        assert_eq!(
            invoke_export(&mut store, instance, "bump", &[]).unwrap(),
            Some(Value::I32(expected))
        );
    }
}

#[test]
fn start_function_runs_at_instantiation() {
    let source = r#"(module
        (global $ready (mut i32) (i32.const 0))
        (func $init i32.const 1 global.set $ready)
        (start $init)
        (func (export "ready") (result i32) global.get $ready))"#;

    let module = parse_text(source, "start.wat").unwrap();
    let mut store = Store::new();
    let instance = store.instantiate(&module, &[]).unwrap();

    assert_eq!(
        invoke_export(&mut store, instance, "ready", &[]).unwrap(),
        Some(Value::I32(1))
    );
}

#[test]
fn host_functions_are_called_through_imports() {
    let source = r#"(module
        (func $answer (import "env" "answer") (result i32))
        (func (export "doubled") (result i32)
          call $answer
          call $answer
          i32.add))"#;

    let module = parse_text(source, "host.wat").unwrap();
    let mut store = Store::new();
    let signature = FunctionType::new(vec![], vec![wat_vm::ValueType::I32].into());
    let address =
        store.allocate_host_function(signature, |_| Ok(Some(Value::I32(21))));
    let instance = store
        .instantiate(&module, &[ExternalValue::Function(address)])
        .unwrap();

    assert_eq!(
        invoke_export(&mut store, instance, "doubled", &[]).unwrap(),
        Some(Value::I32(42))
    );
}

#[test]
fn host_errors_surface_as_traps() {
    let source = r#"(module
        (func $fail (import "env" "fail"))
        (func (export "run") call $fail))"#;

    let module = parse_text(source, "host.wat").unwrap();
    let mut store = Store::new();
    let address = store.allocate_host_function(FunctionType::runnable(), |_| {
        Err(Trap::Host("deliberate".to_string()))
    });
    let instance = store
        .instantiate(&module, &[ExternalValue::Function(address)])
        .unwrap();

    assert_eq!(
        invoke_export(&mut store, instance, "run", &[]),
        Err(RuntimeError::Trap(Trap::Host("deliberate".to_string())))
    );
}

#[test]
fn unbounded_recursion_overflows_the_activation_stack() {
    let source = r#"(module (func $spin (export "spin") call $spin))"#;
    let module = parse_text(source, "spin.wat").unwrap();
    let mut store = Store::with_limits(StackLimits {
        activations: 64,
        ..StackLimits::default()
    });
    let instance = store.instantiate(&module, &[]).unwrap();

    assert_eq!(
        invoke_export(&mut store, instance, "spin", &[]),
        Err(RuntimeError::Trap(Trap::StackOverflow))
    );
}

#[test]
fn unreachable_traps() {
    assert_eq!(
        run(r#"(module (func (export "boom") unreachable))"#, "boom", &[]),
        Err(RuntimeError::Trap(Trap::Unreachable))
    );
}

#[test]
fn truncation_traps_and_saturation_clamps() {
    let source = r#"(module
        (func (export "trapping") (result i32) f32.const 3e9 i32.trunc_f32_s)
        (func (export "saturating") (result i32) f32.const 3e9 i32.trunc_sat_f32_s)
        (func (export "of_nan") (result i32) f32.const nan i32.trunc_f32_u))"#;

    assert_eq!(
        run(source, "trapping", &[]),
        Err(RuntimeError::Trap(Trap::IntegerOverflow))
    );
    assert_eq!(
        run(source, "saturating", &[]).unwrap(),
        Some(Value::I32(i32::MAX))
    );
    assert_eq!(
        run(source, "of_nan", &[]),
        Err(RuntimeError::Trap(Trap::InvalidConversionToInteger))
    );
}

#[test]
fn float_comparisons_treat_nan_as_unordered() {
    let source = r#"(module
        (func (export "eq") (result i32) f64.const nan f64.const nan f64.eq)
        (func (export "ne") (result i32) f64.const nan f64.const nan f64.ne)
        (func (export "lt") (result i32) f64.const nan f64.const 1 f64.lt))"#;

    assert_eq!(run(source, "eq", &[]).unwrap(), Some(Value::I32(0)));
    assert_eq!(run(source, "ne", &[]).unwrap(), Some(Value::I32(1)));
    assert_eq!(run(source, "lt", &[]).unwrap(), Some(Value::I32(0)));
}

#[test]
fn imported_global_offsets_place_data() {
    let source = r#"(module
        (global $base (import "env" "base") i32)
        (memory 1)
        (data (global.get $base) "*")
        (func (export "peek") (result i32) global.get $base i32.load8_u))"#;

    let module = parse_text(source, "offset.wat").unwrap();
    let mut store = Store::new();
    let base = store.allocate_global(
        &wat_vm::GlobalType::immutable(wat_vm::ValueType::I32),
        Value::I32(100),
    );
    let instance = store
        .instantiate(&module, &[ExternalValue::Global(base)])
        .unwrap();

    assert_eq!(
        invoke_export(&mut store, instance, "peek", &[]).unwrap(),
        Some(Value::I32(b'*' as i32))
    );
}

#[test]
fn oversized_data_segment_fails_instantiation() {
    let module = parse_text(
        r#"(module (memory 1 1) (data (i32.const 65535) "toolong"))"#,
        "oversized.wat",
    )
    .unwrap();
    let mut store = Store::new();

    assert_eq!(
        store.instantiate(&module, &[]),
        Err(RuntimeError::SegmentOutOfBounds { segment: "data" })
    );
}

#[test]
fn execution_is_deterministic() {
    let source = r#"(module (func (export "mix") (param i32) (result i32)
        local.get 0
        i32.const 2654435761
        i32.mul
        i32.const 13
        i32.rotl))"#;

    let first = run(source, "mix", &[Value::I32(123_456)]).unwrap();
    let second = run(source, "mix", &[Value::I32(123_456)]).unwrap();

    assert_eq!(first, second);
}
