use cyclefit::core::clip::ClipData;
use cyclefit::core::phase::PhaseFunction;
use cyclefit::core::velocity::{VelocityParams, VelocityProfile};
use cyclefit::evo::evolution::{EvolutionSettings, PhaseEvolution};

/// Motion in the first and last second, complete rest in between.
fn rest_in_middle_clip() -> ClipData {
    let velocities = (0..90)
        .map(|i| {
            if (30..60).contains(&i) {
                vec![0.0]
            } else {
                vec![1.0 + (i as f32 * 0.4).sin().abs()]
            }
        })
        .collect();
    ClipData {
        framerate: 30.0,
        bone_names: vec!["root".into()],
        velocities,
        symmetry: Vec::new(),
    }
}

#[test]
fn rest_window_goes_inactive_between_active_neighbors() {
    let clip = rest_in_middle_clip();
    let mut params = VelocityParams::new(1);
    params.select_all();
    let profile = VelocityProfile::compute(&clip, &params);

    let settings = EvolutionSettings {
        window_sec: 1.0,
        ..EvolutionSettings::default()
    };
    let mut evolution = PhaseEvolution::new(&clip, settings, 31, &profile);
    let mut fun = PhaseFunction::new(90);
    evolution.tick(&profile, &mut fun);

    let active: Vec<bool> = evolution
        .populations()
        .iter()
        .map(|population| population.active)
        .collect();
    assert_eq!(active, vec![true, false, true]);
}

/// The inactive window's winner is degenerate: unit amplitude and frequency,
/// no slope, and shift/offset bridged from the winners of the neighboring
/// active windows as they stood at the start of the generation.
#[test]
fn rest_window_bridges_neighboring_winners() {
    let clip = rest_in_middle_clip();
    let mut params = VelocityParams::new(1);
    params.select_all();
    let profile = VelocityProfile::compute(&clip, &params);

    let settings = EvolutionSettings {
        window_sec: 1.0,
        ..EvolutionSettings::default()
    };
    let mut evolution = PhaseEvolution::new(&clip, settings, 37, &profile);
    let mut fun = PhaseFunction::new(90);
    for _ in 0..4 {
        evolution.tick(&profile, &mut fun);
    }

    let before = evolution.populations();
    let left = before[0].winner().genes;
    let right = before[2].winner().genes;
    evolution.tick(&profile, &mut fun);

    let bridged = evolution.populations()[1].winner().genes;
    assert_eq!(bridged[0], 1.0);
    assert_eq!(bridged[1], 1.0);
    assert!((bridged[2] - 0.5 * (left[2] + right[2])).abs() < 1e-6);
    assert!((bridged[3] - 0.5 * (left[3] + right[3])).abs() < 1e-6);
    assert_eq!(bridged[4], 0.0);
    assert_eq!(evolution.populations()[1].fitness(), 0.0);
}
