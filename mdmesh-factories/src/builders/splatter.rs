//! Point-cloud ("splatter") rendering of large workspaces.
//!
//! Boxes (or histogram cells) are ranked by normalized signal and only the
//! brightest [`BuildConfig::percent_to_use`] percent are kept. Their events
//! (or cell centres) are the candidate points; at most
//! [`BuildConfig::number_of_points`] of them are emitted, drawn with a seeded
//! sampler when there are more candidates than that. The output size is
//! bounded; coverage is best-effort. Four-dimensional workspaces contribute
//! only the time slice holding [`BuildConfig::time`] (default: the T minimum).

use super::{display_axes, to_point, BuildContext, BuiltMesh, MeshBuilder};
use crate::{BuildConfig, CellKind, ProgressAction, ProgressPhase, Result, UnstructuredGrid};
use mdmesh_core::{
    Dimension, MDEventWorkspace, MDHistoWorkspace, MDWorkspace, ThresholdRange, TimeMapper,
    TimeToTimeStep, WorkspaceHandle,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Builds a vertex cloud from workspaces with three or more display axes.
#[derive(Debug, Clone)]
pub struct SplatterBuilder {
    threshold: Box<dyn ThresholdRange>,
    config: BuildConfig,
}

/// A ranked source of candidate points.
struct Candidate {
    signal: f64,
    n_points: usize,
    source: usize,
}

impl SplatterBuilder {
    /// Creates the builder.
    #[must_use]
    pub fn new(threshold: &dyn ThresholdRange, config: BuildConfig) -> Self {
        Self {
            threshold: threshold.clone_box(),
            config,
        }
    }

    /// Keeps the brightest `percent_to_use` percent (at least one).
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn rank(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        if candidates.is_empty() {
            return candidates;
        }
        candidates.par_sort_unstable_by(|a, b| b.signal.total_cmp(&a.signal));
        let keep = ((candidates.len() as f64 * self.config.percent_to_use / 100.0).ceil() as usize)
            .clamp(1, candidates.len());
        candidates.truncate(keep);
        candidates
    }

    /// Positions of the emitted points among `total` candidates, ascending.
    fn sample(&self, total: usize) -> Vec<usize> {
        let budget = self.config.number_of_points;
        if total <= budget {
            return (0..total).collect();
        }
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut picked = rand::seq::index::sample(&mut rng, total, budget).into_vec();
        picked.sort_unstable();
        picked
    }

    fn event_candidates(
        &self,
        events: &MDEventWorkspace,
        axes: &[usize],
        context: &mut BuildContext,
        phase: &mut ProgressPhase<'_>,
    ) -> Vec<Candidate> {
        let boxes = events.leaf_boxes();
        let time_filter = axes.get(3).and_then(|&axis| {
            let dim = events.dimension(axis)?;
            Some((axis, self.config.time.unwrap_or_else(|| dim.minimum())))
        });
        let mut candidates = Vec::new();
        for (i, summary) in boxes.iter().enumerate() {
            phase.step(i + 1, boxes.len());
            if summary.n_events == 0 {
                continue;
            }
            if let Some((axis, time)) = time_filter {
                if !summary.contains(axis, time) {
                    continue;
                }
            }
            let signal = summary.normalized_signal(context.normalization);
            if context.visible(signal) {
                candidates.push(Candidate {
                    signal,
                    n_points: summary.n_events,
                    source: i,
                });
            }
        }
        candidates
    }

    /// Cells of a 4D workspace outside the configured time slice are skipped.
    fn histo_candidates(
        &self,
        histo: &MDHistoWorkspace,
        axes: &[usize],
        context: &mut BuildContext,
        phase: &mut ProgressPhase<'_>,
    ) -> Vec<Candidate> {
        let time_slice = axes.get(3).and_then(|&axis| {
            let dim = histo.dimension(axis)?;
            let time = self.config.time.unwrap_or_else(|| dim.minimum());
            let step = TimeToTimeStep.time_step(time, dim.minimum(), dim.maximum(), dim.n_bins());
            Some((axis, step))
        });
        let shape = histo.shape();
        let total = histo.len();
        let mut index = vec![0; shape.len()];
        let mut candidates = Vec::new();
        for linear in 0..total {
            phase.step(linear + 1, total);
            unravel_into(linear, &shape, &mut index);
            if let Some((axis, step)) = time_slice {
                if index[axis] != step {
                    continue;
                }
            }
            let signal = histo
                .normalized_signal_at(&index, context.normalization)
                .unwrap_or(f64::NAN);
            if context.visible(signal) {
                candidates.push(Candidate {
                    signal,
                    n_points: 1,
                    source: linear,
                });
            }
        }
        candidates
    }
}

impl MeshBuilder for SplatterBuilder {
    fn name(&self) -> &'static str {
        "Splatter"
    }

    fn try_build(
        &self,
        workspace: &WorkspaceHandle,
        progress: &mut dyn ProgressAction,
    ) -> Result<Option<BuiltMesh>> {
        let axes = display_axes(workspace);
        if axes.len() < 3 || (workspace.as_event().is_none() && workspace.as_histo().is_none()) {
            return Ok(None);
        }
        let mut context = BuildContext::prepare(self.threshold.as_ref(), workspace, &self.config)?;
        let spatial = &axes[..3];

        let candidates = {
            let mut phase = ProgressPhase::new(progress, 0.0, 0.5);
            match (workspace.as_event(), workspace.as_histo()) {
                (Some(events), _) => self.event_candidates(events, &axes, &mut context, &mut phase),
                (None, Some(histo)) => {
                    self.histo_candidates(histo, &axes, &mut context, &mut phase)
                }
                (None, None) => Vec::new(),
            }
        };
        let kept = self.rank(candidates);
        let total: usize = kept.iter().map(|c| c.n_points).sum();
        let picked = self.sample(total);

        let mut grid = UnstructuredGrid::new();
        grid.reserve(picked.len(), picked.len());
        let mut phase = ProgressPhase::new(progress, 0.5, 1.0);
        let dims = workspace.dimensions();
        let leaves = workspace.as_event().map(MDEventWorkspace::leaf_boxes);
        let shape: Vec<usize> = dims.iter().map(Dimension::n_bins).collect();
        let mut index = vec![0; dims.len()];

        // Walk the kept candidates and the sorted picks together.
        let mut picks = picked.iter().copied().peekable();
        let mut offset = 0;
        let mut done = 0;
        for candidate in &kept {
            let end = offset + candidate.n_points;
            while let Some(pick) = picks.next_if(|&p| p < end) {
                let local = pick - offset;
                let coords: [f64; 3] = match (&leaves, workspace.as_event()) {
                    (Some(leaves), Some(events)) => {
                        let center = &events.events_in(&leaves[candidate.source])[local].center;
                        to_point(spatial.iter().map(|&axis| center[axis]))
                    }
                    _ => {
                        unravel_into(candidate.source, &shape, &mut index);
                        to_point(spatial.iter().map(|&axis| dims[axis].bin_center(index[axis])))
                    }
                };
                let id = grid.push_point(context.transform.apply(coords));
                grid.push_cell(CellKind::Vertex, vec![id], candidate.signal)?;
                done += 1;
                phase.step(done, picked.len());
            }
            offset = end;
        }

        context.finish(self.name(), grid).map(Some)
    }

    fn clone_box(&self) -> Box<dyn MeshBuilder> {
        Box::new(self.clone())
    }
}

/// Full-rank index of a Fortran-order linear index.
fn unravel_into(mut linear: usize, shape: &[usize], index: &mut [usize]) {
    for (slot, &n) in index.iter_mut().zip(shape) {
        *slot = linear % n;
        linear /= n;
    }
}
