use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal_macros::dec;
use stridekit::{
    PhaseCalculator, Pace, PlanConfig, PlanGenerator, ProfileInput, RaceInput, RaceKind, UserProfile,
    VolumeCalculator,
};

/// Performance benchmarks for plan generation
///
/// These benchmarks cover the full pipeline and its stages over plan
/// lengths from the 13-week minimum to a year-long build.

fn create_profile(weeks: i64, sessions_per_week: u8) -> UserProfile {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let race_date = start + Duration::days(weeks * 7 - 1);

    let intermediate_races = (4..weeks - 2)
        .step_by(6)
        .map(|week| RaceInput::new(start + Duration::days(week * 7 + 6), RaceKind::TenK))
        .collect();

    UserProfile::new(ProfileInput {
        start_date: start,
        main_race: RaceInput::new(race_date, RaceKind::Marathon),
        pace_5k: Pace::from_min_sec(4, 15),
        pace_10k: Pace::from_min_sec(4, 30),
        pace_half: Pace::from_min_sec(4, 45),
        pace_marathon: Pace::from_min_sec(5, 0),
        sessions_per_week,
        min_volume: dec!(30),
        max_volume: dec!(70),
        intermediate_races,
    })
    .unwrap()
}

fn bench_plan_generation(c: &mut Criterion) {
    let generator = PlanGenerator::default();
    let mut group = c.benchmark_group("Plan Generation");

    for &weeks in &[13i64, 26, 52] {
        let profile = create_profile(weeks, 5);
        group.bench_with_input(BenchmarkId::new("generate_plan", weeks), &profile, |b, profile| {
            b.iter(|| generator.generate_plan(black_box(profile)).unwrap());
        });
    }

    group.finish();
}

fn bench_pipeline_stages(c: &mut Criterion) {
    let config = PlanConfig::default();
    let profile = create_profile(52, 5);
    let phases = PhaseCalculator::from_config(&config).calculate(profile.start_date(), profile.race_date());
    let volumes = VolumeCalculator::from_config(&config);

    let mut group = c.benchmark_group("Pipeline Stages");

    group.bench_function("phase_partition", |b| {
        let calculator = PhaseCalculator::from_config(&config);
        b.iter(|| calculator.calculate(black_box(profile.start_date()), black_box(profile.race_date())));
    });

    group.bench_function("weekly_volumes", |b| {
        b.iter(|| volumes.calculate(black_box(profile.min_volume()), profile.max_volume(), &phases, &[]));
    });

    group.finish();
}

fn bench_adjust_plan(c: &mut Criterion) {
    let generator = PlanGenerator::default();
    let plan = generator.generate_plan(&create_profile(52, 6)).unwrap();
    let midpoint = plan.start_date() + Duration::weeks(26);

    c.bench_function("adjust_plan", |b| {
        b.iter(|| generator.adjust_plan(&plan, black_box(midpoint)).unwrap());
    });
}

criterion_group!(benches, bench_plan_generation, bench_pipeline_stages, bench_adjust_plan);
criterion_main!(benches);
