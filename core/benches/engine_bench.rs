use criterion::{criterion_group, criterion_main, Criterion};
use placement_core::{EngineConfig, PlacementEngine, Table, Value};

fn sample_table(rows: usize) -> Table {
    let companies = ["Google", "Infosys", "TCS", "Amazon", "Deloitte", "Not specified"];
    let roles = ["Software Engineer", "Data Analyst", "Consultant", "SDE Intern"];
    let mut t = Table::new(vec!["Company".into(), "Role".into(), "Compensation: CTC".into(), "Class".into()]);
    for i in 0..rows {
        t.push_row(vec![
            Value::from(companies[i % companies.len()]),
            Value::from(roles[i % roles.len()]),
            Value::Text(format!("{}-{} LPA", 4 + i % 10, 6 + i % 10)),
            Value::from(if i % 2 == 0 { "MCA" } else { "MSc Data Science" }),
        ]);
    }
    t
}

fn bench_engine(c: &mut Criterion) {
    let table = sample_table(2_000);
    c.bench_function("fit_2000_rows", |b| {
        b.iter(|| PlacementEngine::from_table(table.clone(), EngineConfig::default()))
    });
    let engine = PlacementEngine::from_table(table, EngineConfig::default());
    c.bench_function("query", |b| b.iter(|| engine.query("data analyst at infosys")));
    c.bench_function("snapshot", |b| b.iter(|| engine.snapshot()));
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
