use criterion::{black_box, criterion_group, criterion_main, Criterion};
use epsilon_regex::Pattern;

const EMAIL: &str = r"[a-zA-Z0-9\.\-]+@([a-zA-Z0-9\-]+\.)+[a-zA-Z]{2,4}";

fn generate_text(lines: usize) -> String {
    let names = ["alice", "bob.smith", "carol-jones", "dave", "eve99"];
    let hosts = ["example.com", "mail.example.org", "corp.internal.net"];
    (0..lines)
        .map(|i| {
            format!(
                "line {} contact {}@{} or see the notes, ticket #{}\n",
                i,
                names[i % names.len()],
                hosts[i % hosts.len()],
                i * 7
            )
        })
        .collect()
}

fn do_the_work(pattern: &Pattern, text: &str, expected: &[&str]) {
    let actual: Vec<String> = pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();
    assert_eq!(expected, actual)
}

fn criterion_benchmark_find_iter(c: &mut Criterion) {
    let contents = generate_text(40);
    let expected: Vec<&str> = regex::Regex::new(EMAIL)
        .unwrap()
        .find_iter(&contents)
        .map(|m| m.as_str())
        .collect();
    let pattern = Pattern::compile(EMAIL).unwrap();
    c.bench_function("find emails in generated text", |b| {
        b.iter(|| do_the_work(&pattern, black_box(&contents), black_box(&expected)))
    });
}

fn criterion_benchmark_matches(c: &mut Criterion) {
    let pattern = Pattern::compile("(a|(bc)*d)*").unwrap();
    let text = "abcbcbcdaaaabcbcdaaaddd".repeat(20);
    c.bench_function("whole match nested stars", |b| {
        b.iter(|| assert!(pattern.matches(black_box(&text))))
    });
}

criterion_group!(
    benches,
    criterion_benchmark_find_iter,
    criterion_benchmark_matches
);
criterion_main!(benches);
