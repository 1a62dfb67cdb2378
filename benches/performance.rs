/// 合成した夢テキストでの注釈器ベンチマーク。
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dream_annotator::pipeline::category::KeywordClassifier;
use dream_annotator::pipeline::lexicon::Lexicon;
use dream_annotator::pipeline::sentiment::SentimentLabeler;
use dream_annotator::pipeline::topic::{TopicConfig, TopicModeler};

const FRAGMENTS: &[&str] = &[
    "I was flying over a quiet city at night",
    "a monster chased me through a dark forest",
    "my grandmother laughed and we were happy at the beach",
    "I could not find the exam room and felt nervous",
    "the house had strange doors that opened onto the sea",
    "everyone at school was crying and I felt lonely",
    "a normal day at work with my usual routine",
];

fn synthetic_dreams(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let first = FRAGMENTS[i % FRAGMENTS.len()];
            let second = FRAGMENTS[(i * 3 + 1) % FRAGMENTS.len()];
            format!("{first}, then {second}.")
        })
        .collect()
}

fn bench_keyword_classifier(c: &mut Criterion) {
    let texts = synthetic_dreams(2048);
    let classifier = KeywordClassifier::new(Lexicon::builtin()).expect("matcher builds");

    c.bench_function("classify_2k_dreams", |b| {
        b.iter(|| black_box(classifier.classify_all(&texts)).len());
    });
}

fn bench_sentiment(c: &mut Criterion) {
    let texts = synthetic_dreams(2048);
    let labeler = SentimentLabeler::default();

    c.bench_function("sentiment_2k_dreams", |b| {
        b.iter(|| black_box(labeler.label_all(&texts)).len());
    });
}

fn bench_topic_model(c: &mut Criterion) {
    let texts = synthetic_dreams(512);
    let modeler = TopicModeler::new(TopicConfig::default());

    let mut group = c.benchmark_group("topics");
    group.sample_size(10);
    group.bench_function("lda_fit_assign_512_dreams", |b| {
        b.iter(|| black_box(modeler.assign(&texts)).len());
    });

    // 語彙が大きいコーパスでは割り当てが学習より重くなりやすい
    let wide: Vec<String> = (0..1024)
        .map(|i| format!("{} symbol{i} marker{} token{}", FRAGMENTS[i % FRAGMENTS.len()], i * 7, i * 13))
        .collect();
    group.bench_function("lda_fit_assign_wide_vocabulary", |b| {
        b.iter(|| black_box(modeler.assign(&wide)).len());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_keyword_classifier,
    bench_sentiment,
    bench_topic_model
);
criterion_main!(benches);
