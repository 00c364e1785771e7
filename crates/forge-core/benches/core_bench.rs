//! Criterion benchmarks for forge-core.
//!
//! Every benchmark drives the pure-Rust API; no Python runtime is needed.
//!
//! ## Benchmark groups
//!
//! 1. **schema**: archive DDL init and migration overhead.
//! 2. **analysis**: tree-sitter extraction and the heuristic fallback.
//! 3. **synthesis**: suite generation on small and wide modules.
//! 4. **refinement**: directive application and feedback parsing.
//! 5. **catalog**: template resolution.
//!
//! ## Running
//!
//! ```sh
//! cargo bench --manifest-path crates/forge-core/Cargo.toml
//! # Run only the synthesis group:
//! cargo bench --manifest-path crates/forge-core/Cargo.toml -- synthesis
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rusqlite::Connection;

use _forge_core::analyzer::analyze;
use _forge_core::models::{
    Directive, Language, RefineOp, SourceUnit, SynthesisOptions, TestCategory,
};
use _forge_core::refine::refine_suite;
use _forge_core::risk;
use _forge_core::store::schema::{migrate_schema, SCHEMA_STATEMENTS};
use _forge_core::synthesis::catalog;
use _forge_core::synthesis::generate_suite;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DIVIDE: &str = "\
def divide(a: float, b: float) -> float:
    if b == 0:
        raise ZeroDivisionError(\"b must not be zero\")
    return a / b
";

const STACK_TS: &str = "\
export class Stack {
  private items: number[] = [];

  push(item: number): void {
    this.items.push(item);
  }

  pop(): number | undefined {
    return this.items.pop();
  }

  peek(): number | undefined {
    return this.items[this.items.length - 1];
  }
}
";

/// A Python module with `n` guarded functions.
fn wide_module(n: usize) -> String {
    let mut src = String::new();
    for i in 0..n {
        src.push_str(&format!(
            "def handler_{i}(value: int, limit: int = 10) -> int:\n    \
             if value < 0:\n        raise ValueError(\"negative\")\n    \
             if value > limit:\n        return limit\n    \
             return value + {i}\n\n"
        ));
    }
    src
}

// ---------------------------------------------------------------------------
// Benchmark: Schema initialization & migration
// ---------------------------------------------------------------------------

fn bench_schema(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema");

    group.bench_function("init_and_migrate", |b| {
        b.iter(|| {
            let conn = Connection::open_in_memory().unwrap();
            for stmt in SCHEMA_STATEMENTS {
                conn.execute_batch(stmt).unwrap();
            }
            migrate_schema(&conn).unwrap();
            black_box(&conn);
        });
    });

    let migrated = Connection::open_in_memory().unwrap();
    for stmt in SCHEMA_STATEMENTS {
        migrated.execute_batch(stmt).unwrap();
    }
    migrate_schema(&migrated).unwrap();
    group.bench_function("migrate_up_to_date", |b| {
        b.iter(|| migrate_schema(black_box(&migrated)).unwrap());
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Analysis
// ---------------------------------------------------------------------------

fn bench_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("analysis");

    let divide = SourceUnit::new(DIVIDE, "python");
    group.bench_function("python_divide", |b| {
        b.iter(|| analyze(black_box(&divide)).unwrap());
    });

    let stack = SourceUnit::new(STACK_TS, "typescript");
    group.bench_function("typescript_stack", |b| {
        b.iter(|| analyze(black_box(&stack)).unwrap());
    });

    let csharp = SourceUnit::new(
        "public class Calc {\n    public int Add(int a, int b) {\n        return a + b;\n    }\n}\n",
        "csharp",
    );
    group.bench_function("heuristic_csharp", |b| {
        b.iter(|| analyze(black_box(&csharp)).unwrap());
    });

    for n in [10usize, 100] {
        let unit = SourceUnit::new(wide_module(n), "python");
        group.bench_with_input(BenchmarkId::new("python_wide", n), &unit, |b, unit| {
            b.iter(|| analyze(black_box(unit)).unwrap());
        });
    }

    let ir = analyze(&SourceUnit::new(wide_module(100), "python")).unwrap();
    group.bench_function("risk_score_wide_100", |b| {
        b.iter(|| risk::score(black_box(&ir)));
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Synthesis
// ---------------------------------------------------------------------------

fn bench_synthesis(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthesis");
    let options = SynthesisOptions::default();

    let divide = analyze(&SourceUnit::new(DIVIDE, "python")).unwrap();
    group.bench_function("divide", |b| {
        b.iter(|| generate_suite(black_box(&divide), black_box(&options)));
    });

    let stack = analyze(&SourceUnit::new(STACK_TS, "typescript")).unwrap();
    group.bench_function("stack_typescript", |b| {
        b.iter(|| generate_suite(black_box(&stack), black_box(&options)));
    });

    for n in [10usize, 100] {
        let ir = analyze(&SourceUnit::new(wide_module(n), "python")).unwrap();
        group.bench_with_input(BenchmarkId::new("python_wide", n), &ir, |b, ir| {
            b.iter(|| generate_suite(black_box(ir), black_box(&options)));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Refinement
// ---------------------------------------------------------------------------

fn bench_refinement(c: &mut Criterion) {
    let mut group = c.benchmark_group("refinement");

    let ir = analyze(&SourceUnit::new(wide_module(20), "python")).unwrap();
    let suite = generate_suite(&ir, &SynthesisOptions::default());

    for op in [RefineOp::Add, RefineOp::Simplify, RefineOp::Document, RefineOp::Broaden] {
        let directive = Directive::new("*", op);
        group.bench_function(op.as_str(), |b| {
            b.iter(|| refine_suite(black_box(&suite), black_box(&directive)).unwrap());
        });
    }

    group.bench_function("feedback_directive", |b| {
        b.iter(|| {
            Directive::from_feedback(black_box(
                "please add more edge cases for `handler_3` with cap=5",
            ))
            .unwrap()
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Benchmark: Catalog
// ---------------------------------------------------------------------------

fn bench_catalog(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog");

    group.bench_function("resolve_default_framework", |b| {
        b.iter(|| {
            catalog::resolve(
                black_box(Language::Python),
                black_box(None),
                black_box(TestCategory::EdgeCase),
            )
            .unwrap()
        });
    });

    group.bench_function("resolve_alias", |b| {
        b.iter(|| {
            catalog::resolve(
                black_box(Language::TypeScript),
                black_box(Some("vitest")),
                black_box(TestCategory::Mock),
            )
            .unwrap()
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Register all benchmark groups
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_schema,
    bench_analysis,
    bench_synthesis,
    bench_refinement,
    bench_catalog,
);
criterion_main!(benches);
