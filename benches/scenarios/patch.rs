//! A realistic per-voice patch: two envelopes and an LFO feeding six
//! routes across four targets, the whole thing processed once per block.

use std::hint::black_box;

use criterion::Criterion;
use modgrid::bank::ValueBank;
use modgrid::envelope::{AdsrEnvelope, AdsrParams, DahdEnvelope, DahdParams};
use modgrid::matrix::{MatrixConfig, ModMatrix, Routing, RoutingTable};

const SR: f32 = 48_000.0;
const BLOCK: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
enum Source {
    #[default]
    None,
    AmpEnv,
    ModEnv,
    Lfo,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
enum Target {
    #[default]
    None,
    Cutoff,
    Resonance,
    Pitch,
    Amp,
}

struct VoiceCfg;
impl MatrixConfig for VoiceCfg {
    type SourceId = Source;
    type TargetId = Target;
    type CurveId = u32;
    type Extra = ();
}

pub fn bench_patch(c: &mut Criterion) {
    let mut bank = ValueBank::new();
    let cutoff = bank.alloc(1_000.0);
    let resonance = bank.alloc(0.3);
    let pitch = bank.alloc(0.0);
    let amp = bank.alloc(1.0);
    let amp_env_out = bank.alloc(0.0);
    let mod_env_out = bank.alloc(0.0);
    let lfo_out = bank.alloc(0.0);

    let mut matrix: ModMatrix<VoiceCfg> = ModMatrix::new();
    matrix.bind_target_base_value(Target::Cutoff, cutoff);
    matrix.bind_target_base_value(Target::Resonance, resonance);
    matrix.bind_target_base_value(Target::Pitch, pitch);
    matrix.bind_target_base_value(Target::Amp, amp);
    matrix.bind_source_value(Source::AmpEnv, amp_env_out);
    matrix.bind_source_value(Source::ModEnv, mod_env_out);
    matrix.bind_source_value(Source::Lfo, lfo_out);

    let mut table: RoutingTable<VoiceCfg> = RoutingTable::new();
    table.push(Routing::new(Source::ModEnv, Target::Cutoff, 3_000.0));
    table.push(Routing::new(Source::Lfo, Target::Cutoff, 400.0).via(Source::ModEnv));
    table.push(Routing::new(Source::Lfo, Target::Pitch, 0.1));
    table.push(Routing::new(Source::ModEnv, Target::Resonance, 0.2));
    table.push(Routing::new(Source::AmpEnv, Target::Amp, 1.0).multiplicative());
    table.push(Routing::new(Source::Lfo, Target::Amp, 0.15).multiplicative());

    matrix.prepare(&table, &bank, SR, BLOCK);

    let adsr = AdsrParams::default();
    let dahd = DahdParams::default();
    let mut amp_env: AdsrEnvelope<BLOCK> = AdsrEnvelope::new(SR);
    let mut mod_env: DahdEnvelope<BLOCK> = DahdEnvelope::new(SR);
    amp_env.attack();
    mod_env.attack(&dahd);

    let mut phase = 0.0f32;
    c.bench_function("scenarios/voice_block", |b| {
        b.iter(|| {
            phase += 0.02;
            amp_env.process_block(&adsr, true);
            mod_env.process_block(&dahd);
            bank.set(amp_env_out, amp_env.output());
            bank.set(mod_env_out, mod_env.output());
            bank.set(lfo_out, phase.sin());

            matrix.process(&table, &bank);
            black_box(matrix.target_value(&Target::Cutoff, &bank));
            black_box(matrix.target_value(&Target::Amp, &bank));
        })
    });
}
