/// Demonstrates ADSR envelope behavior block by block:
/// attack, decay, sustain, release and the end-of-cycle pulse.
use modgrid::envelope::{AdsrParams, SharedAdsr, Stage};

fn main() {
    println!("=== ADSR Envelope Demo ===\n");

    const BLOCK: usize = 16;
    let sample_rate = 48_000.0;

    let params = AdsrParams {
        attack: 0.1,
        decay: 0.1,
        sustain: 0.5,
        release: 0.1,
        ..Default::default()
    };

    println!("Envelope knobs (normalized, 2^x seconds encoding):");
    println!("  Attack:  {:.2}", params.attack);
    println!("  Decay:   {:.2}", params.decay);
    println!("  Sustain: {:.0}%", params.sustain * 100.0);
    println!("  Release: {:.2}\n", params.release);

    // gate messages travel over a lock-free queue, the way a MIDI thread
    // would talk to the audio thread
    let (mut env, mut gate): (SharedAdsr<BLOCK>, _) = SharedAdsr::new(sample_rate);
    gate.gate_on();

    println!("Stage timeline ({}-sample blocks at {} Hz):", BLOCK, sample_rate);

    let mut stage = Stage::Complete;
    let mut stage_blocks = 0u32;
    let mut eoc_seen = false;
    for block in 0..400 {
        if block == 200 {
            gate.gate_off();
        }
        env.process_block(&params);
        if env.stage() != stage {
            if stage_blocks > 0 {
                println!(
                    "  {:10} {:>4} blocks, ended at level {:.3}",
                    format!("{:?}:", stage),
                    stage_blocks,
                    env.output()
                );
            }
            stage = env.stage();
            stage_blocks = 0;
        }
        stage_blocks += 1;
        eoc_seen |= env.stage() == Stage::Eoc;
        if env.is_complete() {
            break;
        }
    }

    println!("\n=== Envelope Behavior ===");
    println!("- Attack:  ramps from 0.0 to 1.0");
    println!("- Decay:   ramps from 1.0 to the sustain level");
    println!("- Sustain: holds until the gate drops");
    println!("- Release: ramps from the current level to 0.0");
    println!(
        "- Eoc:     {} (pulse a host can recycle the voice on)",
        if eoc_seen { "signaled" } else { "missed!" }
    );
}
