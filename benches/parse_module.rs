use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wat_vm::parser::{parse_text, tokenize};
use wat_vm::runtime::{invoke_export, Store, Value};

/// A module exercising one of each field plus a mixed function body.
const SINGULAR: &str = r#"(module $bench
  (type $binop (func (param i32 i32) (result i32)))
  (func $log (import "env" "log") (param i32))
  (memory (export "memory") 1 4)
  (table 2 funcref)
  (global $seed (mut i32) (i32.const 2166136261))
  (elem (i32.const 0) $mix $mix)
  (data (i32.const 0) "benchmark")
  (func $mix (type $binop)
    local.get 0
    local.get 1
    i32.xor
    i32.const 16777619
    i32.mul)
  (func (export "run") (param i32) (result i32) (local $index i32)
    block $done
      loop $again
        local.get $index
        local.get 0
        i32.ge_u
        br_if $done
        global.get $seed
        local.get $index
        i32.const 0
        call_indirect (type $binop)
        global.set $seed
        local.get $index
        i32.const 1
        i32.add
        local.set $index
        br $again
      end
    end
    global.get $seed))
"#;

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("tokenize", |b| {
        b.iter(|| tokenize(black_box(SINGULAR), "bench.wat").unwrap())
    });

    c.bench_function("parse", |b| {
        b.iter(|| parse_text(black_box(SINGULAR), "bench.wat").unwrap())
    });

    c.bench_function("execute", |b| {
        let module = parse_text(SINGULAR, "bench.wat").unwrap();
        let mut store = Store::new();
        let log = store.allocate_host_function(
            wat_vm::FunctionType::new(
                vec![wat_vm::ValueType::I32.into()],
                wat_vm::ResultType::empty(),
            ),
            |_| Ok(None),
        );
        let instance = store
            .instantiate(&module, &[wat_vm::runtime::ExternalValue::Function(log)])
            .unwrap();

        b.iter(|| {
            invoke_export(&mut store, instance, "run", &[Value::I32(black_box(64))]).unwrap()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
