use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ideogloss_rs::navigate::{self, UnitFilter};
use ideogloss_rs::{
    DictionaryEntry, DictionaryStore, Document, Resolver, ScriptProfile, Segmenter, TablesBuilder,
};

const PASSAGE: &str = "如是我聞。一時佛在舍衛國祇樹給孤獨園，與大比丘眾千二百五十人俱。";

fn store() -> DictionaryStore {
    let mut builder = TablesBuilder::new();
    let chars: Vec<char> = PASSAGE.chars().collect();
    for start in 0..chars.len() {
        for len in [1usize, 2, 4] {
            if start + len <= chars.len() {
                let key: String = chars[start..start + len].iter().collect();
                builder.insert_primary(&key, DictionaryEntry::new("gloss", "a longer gloss"));
            }
        }
        builder.insert_fallback(&chars[start].to_string(), DictionaryEntry::new("char", "single character"));
    }
    DictionaryStore::preloaded(builder.finish().expect("bench tables build"))
}

fn document(paragraphs: usize) -> Document {
    let markup: String = (0..paragraphs)
        .map(|i| format!("<p id=\"p{i}\">{PASSAGE} <em>note</em></p>"))
        .collect();
    Document::parse(&markup).expect("bench markup parses")
}

fn bench_segmentation(c: &mut Criterion) {
    let profile = ScriptProfile::literary_chinese();
    for &paragraphs in &[10usize, 100] {
        let source = document(paragraphs);
        c.bench_with_input(
            BenchmarkId::new("segment", paragraphs),
            &source,
            |b, source| {
                b.iter(|| {
                    let mut doc = source.clone();
                    let stats = Segmenter::new(profile.batch_size())
                        .run_to_completion(&mut doc, &profile);
                    black_box(stats.units_created);
                });
            },
        );
    }
}

fn bench_resolution(c: &mut Criterion) {
    let profile = ScriptProfile::literary_chinese();
    let mut doc = document(20);
    Segmenter::new(profile.batch_size()).run_to_completion(&mut doc, &profile);
    let resolver = Resolver::new(store(), profile.window(), profile.lexicon_url());
    let positions: Vec<_> = {
        let mut out = Vec::new();
        let mut cursor = navigate::first(&doc, UnitFilter::SkipPunctuation);
        while let Some(node) = cursor {
            out.push(node);
            cursor = navigate::next(&doc, node, UnitFilter::SkipPunctuation);
        }
        out
    };

    c.bench_function("resolve::walk_passage", |b| {
        b.iter(|| {
            for &node in positions.iter().take(40) {
                black_box(resolver.resolve(&doc, node).rows.len());
            }
        });
    });
}

criterion_group!(benches, bench_segmentation, bench_resolution);
criterion_main!(benches);
