//! Level ladder: ten levels separated by nine doubling thresholds.

use crate::contract::model::LevelProgress;

pub const MAX_LEVEL: u8 = 10;

/// Points a user must exceed to leave level `n` (index `n - 1`).
pub const LEVEL_THRESHOLDS: [i64; 9] = [200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];

/// Level for a cumulative points total. Reaching a threshold exactly is not enough;
/// it has to be passed. Negative totals count as zero.
pub fn resolve_level(total_points: i64) -> u8 {
    let total = total_points.max(0);
    let passed = LEVEL_THRESHOLDS.iter().filter(|t| total > **t).count();
    1 + passed as u8
}

pub fn level_progress(total_points: i64) -> LevelProgress {
    let total = total_points.max(0);
    let level = resolve_level(total);
    let idx = usize::from(level - 1);

    let floor = if idx == 0 { 0 } else { LEVEL_THRESHOLDS[idx - 1] };
    let next_threshold = LEVEL_THRESHOLDS.get(idx).copied();

    let progress = match next_threshold {
        Some(next) => ((total - floor) as f64 / (next - floor) as f64).clamp(0.0, 1.0),
        None => 1.0,
    };

    LevelProgress {
        level,
        floor,
        next_threshold,
        progress,
    }
}
