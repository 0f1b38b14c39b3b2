//! SIMD argmax over class scores using the `wide` crate.
//!
//! In the channel-major layout the scores of one class for consecutive slots
//! are contiguous, so eight slots are scored per step with `f32x8`. The
//! update rule matches the scalar argmax exactly: a strictly greater score
//! wins, a NaN leader is replaced by any number, ties keep the lower class.

use crate::tensor::{OutputTensor, RawGeometry};
use crate::util::SmartSightResult;
use wide::*;

const LANES: usize = 8;

/// Load 8 f32 values into f32x8.
#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// Calls `visit(geometry, class_id, score)` for every slot, in slot order,
/// with the best class among the first `limit` classes.
pub(crate) fn for_each_best_class<F>(
    tensor: OutputTensor<'_>,
    limit: usize,
    mut visit: F,
) -> SmartSightResult<()>
where
    F: FnMut(RawGeometry, usize, f32),
{
    let n = tensor.num_slots();
    if limit == 0 || n == 0 {
        return Ok(());
    }

    let cx = tensor.channel(0)?;
    let cy = tensor.channel(1)?;
    let w = tensor.channel(2)?;
    let h = tensor.channel(3)?;
    let classes = (0..limit)
        .map(|k| tensor.class_channel(k))
        .collect::<SmartSightResult<Vec<_>>>()?;

    let simd_end = n / LANES * LANES;
    let mut base = 0;
    while base < simd_end {
        let mut best = load_f32x8(&classes[0][base..]);
        let mut best_idx = f32x8::ZERO;
        for (k, row) in classes.iter().enumerate().skip(1) {
            let s = load_f32x8(&row[base..]);
            let leader_is_nan = best.simd_ne(best);
            let take = s.simd_gt(best) | (leader_is_nan & s.simd_eq(s));
            best = take.blend(s, best);
            best_idx = take.blend(f32x8::splat(k as f32), best_idx);
        }

        let scores = best.to_array();
        let idx = best_idx.to_array();
        for lane in 0..LANES {
            let slot = base + lane;
            let raw = RawGeometry {
                cx: cx[slot],
                cy: cy[slot],
                w: w[slot],
                h: h[slot],
            };
            visit(raw, idx[lane] as usize, scores[lane]);
        }
        base += LANES;
    }

    for slot in simd_end..n {
        let view = tensor.slot(slot)?;
        if let Some((class_id, score)) = view.best_class(limit) {
            visit(view.geometry(), class_id, score);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::for_each_best_class;
    use crate::tensor::OutputTensor;

    #[test]
    fn matches_scalar_argmax_with_ties_and_nan() {
        let n = 11;
        let c = 3;
        let mut data = vec![0.0f32; (4 + c) * n];
        for i in 0..n {
            data[i] = i as f32;
            let scores: [f32; 3] = match i % 4 {
                0 => [0.5, 0.5, 0.1],
                1 => [0.1, 0.7, 0.7],
                2 => [f32::NAN, 0.2, 0.3],
                _ => [0.9, f32::NAN, 0.95],
            };
            for (k, s) in scores.iter().enumerate() {
                data[(4 + k) * n + i] = *s;
            }
        }
        let tensor = OutputTensor::new(&data, n, c).unwrap();

        let mut simd = Vec::new();
        for_each_best_class(tensor, c, |raw, k, s| simd.push((raw.cx, k, s))).unwrap();

        assert_eq!(simd.len(), n);
        for (i, (cx, k, s)) in simd.into_iter().enumerate() {
            let (ek, es) = tensor.slot(i).unwrap().best_class(c).unwrap();
            assert_eq!(cx, i as f32);
            assert_eq!(k, ek, "slot {i}");
            assert_eq!(s.to_bits(), es.to_bits(), "slot {i}");
        }
    }
}
