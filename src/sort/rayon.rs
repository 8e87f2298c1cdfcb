use bevy::prelude::*;
use rayon::prelude::*;

use crate::{
    gaussian::f32::SplatPoint,
    sort::{
        SortEntry,
        back_to_front,
        view_depth,
    },
};


pub fn compute_keys(
    points: &[SplatPoint],
    model_view: &Mat4,
    entries: &mut [SortEntry],
) {
    points.par_iter()
        .zip(entries.par_iter_mut())
        .enumerate()
        .for_each(|(idx, (point, sort_entry))| {
            let depth = view_depth(model_view, point.position_vec3());
            *sort_entry = SortEntry::new(depth, idx as u32);
        });
}

pub fn sort_entries(entries: &mut [SortEntry]) {
    entries.par_sort_unstable_by(back_to_front);
}
