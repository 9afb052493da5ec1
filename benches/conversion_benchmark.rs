use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stride_coach::services::strava::StravaActivity;
use stride_coach::services::sync::{format_pace, workout_from_activity};

fn benchmark_conversion(c: &mut Criterion) {
    let activity = StravaActivity {
        id: 16906743520,
        name: "Lunch Run".to_string(),
        activity_type: "Run".to_string(),
        start_date: "2024-05-01T12:10:00Z".to_string(),
        distance: 12345.6,
        moving_time: 3456,
        elapsed_time: 3600,
        total_elevation_gain: 123.4,
        average_speed: 3.57,
        max_speed: 4.9,
        average_heartrate: 154.2,
        max_heartrate: 177.0,
        average_cadence: 171.8,
        average_watts: 268.3,
        calories: 812.0,
    };

    let mut group = c.benchmark_group("activity_conversion");

    group.bench_function("workout_from_activity", |b| {
        b.iter(|| workout_from_activity(black_box(&activity)))
    });

    group.bench_function("format_pace", |b| {
        b.iter(|| format_pace(black_box(3.57)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_conversion);
criterion_main!(benches);
