use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fusion_layers::{CrossAttentionLayer, LayerConfig, SelfAttentionLayer};

fn bench_self_attention(c: &mut Criterion) {
    let device = Device::Cpu;
    let batch = 4usize;
    let hidden = 512usize;
    let heads = 8usize;

    let mut group = c.benchmark_group("attention/self");
    for &seq in &[16usize, 64, 256] {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let layer =
            SelfAttentionLayer::new(LayerConfig::new(hidden, heads), vb).expect("layer init");
        let input = Tensor::randn(0f32, 1.0, (batch, seq, hidden), &device).expect("input");
        group.throughput(Throughput::Elements((batch * seq * hidden) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(seq),
            &(layer, input),
            |b, (layer, input)| {
                b.iter(|| {
                    let out = layer
                        .forward(black_box(input), None, false)
                        .expect("forward");
                    black_box(out);
                });
            },
        );
    }
    group.finish();
}

fn bench_cross_attention(c: &mut Criterion) {
    let device = Device::Cpu;
    let batch = 4usize;
    let hidden = 512usize;
    let heads = 8usize;
    let kv = 1024usize;
    let seq_q = 20usize;

    let mut group = c.benchmark_group("attention/cross");
    for &seq_kv in &[16usize, 36, 100] {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let layer = CrossAttentionLayer::new(LayerConfig::new(hidden, heads).with_kv_size(kv), vb)
            .expect("layer init");
        let queries = Tensor::randn(0f32, 1.0, (batch, seq_q, hidden), &device).expect("queries");
        let context = Tensor::randn(0f32, 1.0, (batch, seq_kv, kv), &device).expect("context");
        group.throughput(Throughput::Elements((batch * seq_q * hidden) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(seq_kv),
            &(layer, queries, context),
            |b, (layer, queries, context)| {
                b.iter(|| {
                    let out = layer
                        .forward(black_box(queries), black_box(context), None, false)
                        .expect("forward");
                    black_box(out);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_self_attention, bench_cross_attention);
criterion_main!(benches);
