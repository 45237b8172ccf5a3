use crate::geometry::{self, to_multi, AREA_TOLERANCE};
use approx::abs_diff_eq;
use geo::{Area, MultiPolygon, Polygon};

/// A scene footprint with its coverage ratio against the full frame
#[derive(Debug, Clone, Copy)]
pub struct ScoredScene<'a> {
    pub footprint: &'a Polygon<f64>,
    pub coverage_ratio: f64,
}

/// Greedy minimum set cover of a frame by scene footprints
///
/// Each round picks the scene contributing the largest share of the still
/// uncovered frame area. Ties go to the scene with the larger coverage of the
/// whole frame, then to the earlier scene. Selection stops once the union of
/// picked footprints covers the frame, or when every scene has been picked, in
/// which case the cover is partial.
///
/// This is an approximation with no optimality guarantee; the result only
/// depends on the inputs. Returned indices are ascending.
pub fn minimal_cover(scenes: &[ScoredScene<'_>], frame: &MultiPolygon<f64>) -> Vec<usize> {
    let frame_area = frame.unsigned_area();
    let mut remaining_ratio: Vec<f64> = scenes.iter().map(|s| s.coverage_ratio).collect();
    let mut selected = vec![false; scenes.len()];
    let mut union = MultiPolygon::new(Vec::new());
    let mut cover = Vec::new();

    while let Some(best) = next_scene(scenes, &remaining_ratio, &selected) {
        selected[best] = true;
        cover.push(best);
        union = geometry::union(&union, &to_multi(scenes[best].footprint));

        let uncovered = geometry::difference(frame, &union);
        let uncovered_area = uncovered.unsigned_area();
        if frame_area == 0.0 || abs_diff_eq!(uncovered_area / frame_area, 0.0, epsilon = AREA_TOLERANCE) {
            log::debug!("Frame covered by {} of {} scenes", cover.len(), scenes.len());
            break;
        }

        for (i, scene) in scenes.iter().enumerate() {
            if !selected[i] {
                remaining_ratio[i] =
                    geometry::intersection_area(&to_multi(scene.footprint), &uncovered) / frame_area;
            }
        }
    }

    if cover.len() == scenes.len() && !scenes.is_empty() {
        log::debug!("All {} scenes selected for frame cover", scenes.len());
    }

    cover.sort_unstable();
    cover
}

/// Unselected scene with the largest remaining ratio, ties broken by original ratio
///
/// Ratios within `AREA_TOLERANCE` of each other count as tied, so round-off from
/// different boolean-op paths does not decide the order.
fn next_scene(scenes: &[ScoredScene<'_>], remaining_ratio: &[f64], selected: &[bool]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for i in (0..scenes.len()).filter(|&i| !selected[i]) {
        best = match best {
            None => Some(i),
            Some(b) => Some(if ranks_above(
                (remaining_ratio[i], scenes[i].coverage_ratio),
                (remaining_ratio[b], scenes[b].coverage_ratio),
            ) {
                i
            } else {
                b
            }),
        };
    }
    best
}

/// `true` when `(remaining, original)` ratios `a` strictly beat `b`
fn ranks_above(a: (f64, f64), b: (f64, f64)) -> bool {
    if !abs_diff_eq!(a.0, b.0, epsilon = AREA_TOLERANCE) {
        return a.0 > b.0;
    }
    !abs_diff_eq!(a.1, b.1, epsilon = AREA_TOLERANCE) && a.1 > b.1
}
