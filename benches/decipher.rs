//! Benchmarks for transform extraction and deciphering
//!
//! Extraction runs once per code blob; deciphering runs once per signed
//! format, so the latter dominates large format lists.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vidresolve::cipher::{decipher, extract_transform_program, Op, TransformProgram};

/// Helper object and decipher function in the shape the player ships.
const PLAYER_JS: &str = r#"var Xy={Ab:function(a){a.reverse()},cd:function(a,b){a.splice(0,b)},
ef:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}};
Gz=function(a){a=a.split("");Xy.ef(a,48);Xy.cd(a,2);Xy.Ab(a,35);Xy.ef(a,61);Xy.cd(a,3);Xy.ef(a,7);return a.join("")};"#;

/// Pad the code blob with unrelated script, as real player files are large.
fn padded_player(filler_lines: usize) -> String {
    let mut code = String::new();
    for i in 0..filler_lines {
        code.push_str(&format!("var v{i}=function(b){{return b+{i}}};\n"));
    }
    code.push_str(PLAYER_JS);
    code
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for filler in [0usize, 1_000, 10_000] {
        let code = padded_player(filler);
        group.throughput(Throughput::Bytes(code.len() as u64));
        group.bench_with_input(BenchmarkId::new("player", filler), &code, |b, code| {
            b.iter(|| extract_transform_program(black_box(code)).unwrap());
        });
    }

    group.finish();
}

fn bench_decipher(c: &mut Criterion) {
    let mut group = c.benchmark_group("decipher");

    let program = TransformProgram::new(vec![
        Op::SwapHead(48),
        Op::DropPrefix(2),
        Op::Reverse,
        Op::SwapHead(61),
        Op::DropPrefix(3),
        Op::SwapHead(7),
    ]);
    let token: String = "0123456789ABCDEFabcdef".chars().cycle().take(104).collect();

    group.bench_function("token/104", |b| {
        b.iter(|| decipher(black_box(&program), black_box(&token)));
    });

    // A resolution with many signed adaptive formats.
    let tokens: Vec<String> = (0..64).map(|i| format!("{token}{i:02}")).collect();
    group.bench_function("formats/64", |b| {
        b.iter(|| {
            for token in &tokens {
                black_box(decipher(&program, token));
            }
        });
    });

    group.bench_function("parse_notation", |b| {
        b.iter(|| black_box("w48,s2,r,w61,s3,w7").parse::<TransformProgram>().unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_extract, bench_decipher);
criterion_main!(benches);
