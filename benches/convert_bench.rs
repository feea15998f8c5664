use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dumplift::conv::Conv;
use dumplift::migrator::{data_pass, schema_pass};
use dumplift::parser::SqlDialect;
use dumplift::sink::NullSink;
use std::hint::black_box;

fn generate_copy_dump(rows: usize) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(
        b"SET timezone = 'UTC';\nCREATE TABLE public.events (\n    id integer NOT NULL,\n    flag boolean,\n    amount numeric(12,4),\n    at timestamp with time zone,\n    tags text[]\n);\nALTER TABLE ONLY public.events ADD CONSTRAINT events_pkey PRIMARY KEY (id);\n",
    );
    data.extend_from_slice(b"COPY public.events (id, flag, amount, at, tags) FROM stdin;\n");
    for i in 0..rows {
        data.extend_from_slice(
            format!(
                "{i}\tt\t{}.5000\t2021-06-0{} 10:30:00+00\t{{a,b,c}}\n",
                i % 10_000,
                (i % 9) + 1
            )
            .as_bytes(),
        );
    }
    data.extend_from_slice(b"\\.\n");
    data
}

fn bench_data_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("data_conversion");
    group.sample_size(20);

    for rows in [1_000, 10_000, 50_000] {
        let data = generate_copy_dump(rows);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("copy_rows", format!("{rows}_rows")),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut conv = Conv::new();
                    schema_pass(&mut conv, &data[..], SqlDialect::Postgres).unwrap();
                    let mut sink = NullSink::default();
                    data_pass(&mut conv, &data[..], SqlDialect::Postgres, &mut sink).unwrap();
                    black_box(sink.rows_written)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_data_conversion);
criterion_main!(benches);
