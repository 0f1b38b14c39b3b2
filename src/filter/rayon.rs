//! Rayon-parallel candidate filtering (feature-gated).
//!
//! Slots are scored independently on the rayon pool. The indexed iterator
//! keeps slot order, so the output is identical to the sequential path.

use crate::detection::Detection;
use crate::filter::{CandidateFilter, PixelMapping};
use crate::labels::LabelTable;
use crate::tensor::OutputTensor;
use crate::util::SmartSightResult;
use rayon::prelude::*;

pub(crate) fn filter_par(
    filter: &CandidateFilter,
    tensor: OutputTensor<'_>,
    labels: &LabelTable,
    mapping: &PixelMapping,
    limit: usize,
) -> SmartSightResult<Vec<Detection>> {
    (0..tensor.num_slots())
        .into_par_iter()
        .map(|idx| -> SmartSightResult<Option<Detection>> {
            let slot = tensor.slot(idx)?;
            Ok(slot.best_class(limit).and_then(|(class_id, score)| {
                filter.admit(slot.geometry(), class_id, score, labels, mapping)
            }))
        })
        .filter_map(Result::transpose)
        .collect()
}
