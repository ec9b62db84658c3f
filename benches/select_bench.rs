//! Select throughput: indexed lookups against full scans

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use momo::{Column, DataTable};

const ID_COL: Column<i64> = Column::new("id");
const GROUP_COL: Column<i64> = Column::new("group");
const NAME_COL: Column<String> = Column::new("name");

fn build_table(rows: i64) -> DataTable {
    let mut table = DataTable::with_columns([ID_COL.info(), GROUP_COL.info(), NAME_COL.info()])
        .unwrap();
    table.reserve(rows as usize);
    for i in 0..rows {
        table
            .add_row([
                ID_COL.assign(i),
                GROUP_COL.assign(i % 100),
                NAME_COL.assign(format!("name{}", i)),
            ])
            .unwrap();
    }
    table
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("select");

    for rows in [1_000i64, 10_000, 100_000] {
        group.throughput(Throughput::Elements(1));

        let scan = build_table(rows);
        let mut indexed = build_table(rows);
        indexed.add_unique_hash_index(ID_COL).unwrap();
        indexed.add_multi_hash_index(GROUP_COL).unwrap();

        group.bench_with_input(BenchmarkId::new("unique_index", rows), &rows, |b, &rows| {
            let mut key = 0;
            b.iter(|| {
                key = (key + 7919) % rows;
                black_box(indexed.select_count(ID_COL.equals(key)).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("multi_index", rows), &rows, |b, _| {
            let mut key = 0;
            b.iter(|| {
                key = (key + 13) % 100;
                black_box(indexed.select(GROUP_COL.equals(key)).unwrap().len())
            })
        });

        group.bench_with_input(BenchmarkId::new("scan", rows), &rows, |b, &rows| {
            let mut key = 0;
            b.iter(|| {
                key = (key + 7919) % rows;
                black_box(scan.select_count(ID_COL.equals(key)).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_add_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_rows");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("no_index", |b| b.iter(|| black_box(build_table(10_000).len())));

    group.bench_function("unique_and_multi_index", |b| {
        b.iter(|| {
            let mut table =
                DataTable::with_columns([ID_COL.info(), GROUP_COL.info(), NAME_COL.info()])
                    .unwrap();
            table.add_unique_hash_index(ID_COL).unwrap();
            table.add_multi_hash_index(GROUP_COL).unwrap();
            for i in 0..10_000i64 {
                table
                    .add_row([ID_COL.assign(i), GROUP_COL.assign(i % 100)])
                    .unwrap();
            }
            black_box(table.len())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_select, bench_add_rows);
criterion_main!(benches);
