use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use powerflow_game::{initialize_game, GameId, GameSettings};
use std::hint::black_box;

/// Benchmark grid initialization (bus layout, spider-web topology, island repair).
fn bench_game_initialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("game_initialization");

    for n_buses in [6, 12, 24].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n_buses), n_buses, |b, &n_buses| {
            let settings = GameSettings { n_buses, ..GameSettings::default() };
            let players: Vec<String> = (0..4).map(|i| format!("player_{}", i)).collect();
            b.iter(|| {
                black_box(initialize_game(GameId::new(1), settings.clone(), &players));
            });
        });
    }

    group.finish();
}

/// Benchmark a full round: every human ends every phase, driving one
/// day-ahead auction through the solver.
fn bench_full_round(c: &mut Criterion) {
    use powerflow_game::{handle_message, maybe_conclude_phase, ToGameMessage};

    let mut group = c.benchmark_group("full_round");
    group.sample_size(20);

    for n_buses in [6, 12].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n_buses), n_buses, |b, &n_buses| {
            let settings = GameSettings { n_buses, ..GameSettings::default() };
            let players: Vec<String> = (0..4).map(|i| format!("player_{}", i)).collect();
            let initial = initialize_game(GameId::new(1), settings, &players);
            let human_ids: Vec<_> = initial.players.human_player_ids();

            b.iter_batched(
                || initial.clone(),
                |mut state| {
                    for &phase_cycle in &[0, 1, 2, 3] {
                        let _ = phase_cycle;
                        for &player_id in &human_ids {
                            let (next, _) = handle_message(state, ToGameMessage::EndTurn { player_id }).unwrap();
                            state = next;
                        }
                        while let Some(msg) = maybe_conclude_phase(&state) {
                            let (next, _) = handle_message(state, msg).unwrap();
                            state = next;
                        }
                    }
                    black_box(state)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark the market-coupling solver directly, at varying grid sizes.
fn bench_solver(c: &mut Criterion) {
    use powerflow_game::{AssetId, AssetType, BusId, PlayerId, Problem, ReferenceSolver, Solver, Transmission, TransmissionId};
    use powerflow_game::Asset;
    use powerflow_game::Bus;

    let mut group = c.benchmark_group("solver");

    for n_buses in [4, 8, 16].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n_buses), n_buses, |b, &n_buses| {
            let buses: Vec<Bus> = (0..n_buses).map(|i| Bus::new(BusId::new(i as i64), i as f64, 0.0, PlayerId::NPC)).collect();
            let lines: Vec<Transmission> = (0..n_buses - 1)
                .map(|i| {
                    Transmission::new(
                        TransmissionId::new(i as i64),
                        PlayerId::NPC,
                        BusId::new(i as i64),
                        BusId::new((i + 1) as i64),
                        0.01,
                        1,
                    )
                })
                .collect();
            let assets: Vec<(Asset, f64)> = (0..n_buses)
                .flat_map(|i| {
                    let gen = Asset::new(AssetId::new((i * 2) as i64), PlayerId::NPC, AssetType::Generator, BusId::new(i as i64), 20.0, 10.0, false, 3, 1);
                    let load = Asset::new(AssetId::new((i * 2 + 1) as i64), PlayerId::NPC, AssetType::Load, BusId::new(i as i64), 15.0, 400.0, false, 3, 1);
                    vec![(gen, 20.0), (load, 15.0)]
                })
                .collect();

            b.iter_batched(
                || Problem::build(buses.clone(), lines.clone(), assets.clone()),
                |problem| black_box(ReferenceSolver.solve(&problem)),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_game_initialization, bench_full_round, bench_solver);
criterion_main!(benches);
