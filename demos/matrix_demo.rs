/// Demonstrates the modulation matrix: bind sources and targets into a
/// value bank, describe routes, prepare once, process per block.
use modgrid::bank::ValueBank;
use modgrid::matrix::{MatrixConfig, ModMatrix, Routing, RoutingTable};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
enum Source {
    #[default]
    None,
    Lfo,
    ModWheel,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
enum Target {
    #[default]
    None,
    CutoffHz,
}

struct DemoCfg;
impl MatrixConfig for DemoCfg {
    type SourceId = Source;
    type TargetId = Target;
    type CurveId = u32;
    type Extra = ();

    fn target_range(target: &Target) -> Option<(f32, f32)> {
        match target {
            Target::CutoffHz => Some((20.0, 20_000.0)),
            Target::None => None,
        }
    }
}

fn main() {
    println!("=== Modulation Matrix Demo ===\n");

    let mut bank = ValueBank::new();
    let cutoff_base = bank.alloc(1_000.0);
    let lfo = bank.alloc(0.0);
    let wheel = bank.alloc(0.0);

    let mut matrix: ModMatrix<DemoCfg> = ModMatrix::new();
    matrix.bind_target_base_value(Target::CutoffHz, cutoff_base);
    matrix.bind_source_value(Source::Lfo, lfo);
    matrix.bind_source_value(Source::ModWheel, wheel);

    // one route: LFO sweeps the cutoff, the mod wheel gates the sweep
    let mut table: RoutingTable<DemoCfg> = RoutingTable::new();
    table.push(Routing::new(Source::Lfo, Target::CutoffHz, 800.0).via(Source::ModWheel));

    matrix.prepare(&table, &bank, 48_000.0, 16);

    println!("Route: Lfo (via ModWheel) -> CutoffHz, depth 800 Hz");
    println!("Base cutoff: 1000 Hz\n");
    println!("{:>6} {:>8} {:>8} {:>12}", "block", "lfo", "wheel", "cutoff Hz");

    for block in 0..12 {
        // host updates its modulation signals every block
        let lfo_value = (block as f32 * 0.7).sin();
        let wheel_value = (block as f32 / 11.0).min(1.0);
        bank.set(lfo, lfo_value);
        bank.set(wheel, wheel_value);

        matrix.process(&table, &bank);

        println!(
            "{:>6} {:>8.3} {:>8.2} {:>12.1}",
            block,
            lfo_value,
            wheel_value,
            matrix.target_value(&Target::CutoffHz, &bank)
        );
    }

    // rows can be silenced live, with no recompile
    table.update_active_at(0, false);
    matrix.process(&table, &bank);
    println!(
        "\nRoute deactivated: cutoff back at its base, {:.1} Hz",
        matrix.target_value(&Target::CutoffHz, &bank)
    );
}
