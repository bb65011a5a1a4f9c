// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::Point;
use understory_drag_gesture::config::DragConfig;
use understory_drag_gesture::direction::Direction;
use understory_drag_gesture::recognizer::DragGesture;
use understory_touch::active::ActiveTouches;
use understory_touch::event::{TouchBatch, TouchId};
use understory_touch::surface::TouchSurface;

const DIRECTIONS: [Direction; 4] = [
    Direction::Rightwards,
    Direction::Downwards,
    Direction::Leftwards,
    Direction::Upwards,
];

fn config(direction: Direction) -> DragConfig {
    DragConfig::default()
        .with_direction(direction)
        .with_distance_threshold(10.0)
        .with_composition_time(0)
        .without_time_constraints()
}

fn build_surface(recognizers: usize) -> TouchSurface<DragGesture> {
    let mut surface = TouchSurface::new();
    for i in 0..recognizers {
        surface.add_handler(DragGesture::new(config(DIRECTIONS[i % DIRECTIONS.len()])));
    }
    surface
}

/// One press, `moves` samples drifting right, one release.
fn stroke(start_ms: u64, id: TouchId, moves: u32) -> Vec<TouchBatch> {
    let mut batches = Vec::with_capacity(moves as usize + 2);
    batches.push(TouchBatch::press(start_ms, id, Point::ZERO));
    for i in 1..=moves {
        let x = f64::from(i) * 2.0;
        batches.push(TouchBatch::moved(start_ms + u64::from(i) * 8, id, Point::new(x, 0.5)));
    }
    let end = Point::new(f64::from(moves) * 2.0, 0.5);
    batches.push(TouchBatch::release(start_ms + u64::from(moves + 1) * 8, id, end));
    batches
}

fn bench_drag_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_drag_gesture");

    for &recognizers in &[1_usize, 4, 16, 64] {
        let batches = stroke(0, TouchId(1), 32);
        group.bench_function(format!("stroke(recognizers={recognizers},moves=32)"), |b| {
            b.iter_batched(
                || build_surface(recognizers),
                |mut surface| {
                    for batch in &batches {
                        black_box(surface.dispatch(batch));
                    }
                    surface
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.bench_function("repeated_strokes(recognizers=8,strokes=16)", |b| {
        let strokes: Vec<Vec<TouchBatch>> = (0..16)
            .map(|s| stroke(s * 1_000, TouchId(s as u32), 12))
            .collect();
        b.iter_batched(
            || build_surface(8),
            |mut surface| {
                for batch in strokes.iter().flatten() {
                    black_box(surface.dispatch(batch));
                }
                surface
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

fn bench_active_touches(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_touch");

    group.bench_function("active_touches_fill_and_drain(n=20)", |b| {
        b.iter(|| {
            let mut active = ActiveTouches::<20>::new();
            for id in 0..20_u32 {
                black_box(active.add_touch_point(TouchId(id), u64::from(id)));
            }
            black_box(active.most_recent_start_time());
            for id in (0..20_u32).rev() {
                black_box(active.remove_touch_point(TouchId(id)));
            }
            active
        });
    });

    group.finish();
}

criterion_group!(benches, bench_drag_dispatch, bench_active_touches);
criterion_main!(benches);
