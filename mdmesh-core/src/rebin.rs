//! Histogramming a workspace onto a new set of axes.
//!
//! Target dimensions are matched to the source by id. Source dimensions that
//! the target does not name are integrated over; contributions that fall
//! outside the target limits are dropped.

use crate::workspace::{MDHistoWorkspace, MDWorkspace, WorkspaceInfo};
use crate::{Dimension, Error, Result};
use ndarray::Dimension as _;
use std::collections::HashSet;

/// Histograms `source` onto `target`.
///
/// Event sources deposit every event at its position. Histogram sources
/// deposit every non-NaN cell at its centre, carrying its error and event count.
///
/// # Errors
/// Returns [`Error::Config`] if a target id is unknown to the source or
/// appears twice.
pub fn rebin(source: &dyn MDWorkspace, target: &[Dimension]) -> Result<MDHistoWorkspace> {
    let mapping = map_dimensions(source, target)?;

    let info = WorkspaceInfo {
        name: format!("{}_rebinned", source.name()),
        ..source.info().clone()
    };
    let mut output = MDHistoWorkspace::new(info.name.clone(), target.to_vec()).with_info(info);

    let mut index = vec![0; target.len()];
    let mut dropped = 0usize;
    let mut deposit = |coords: &dyn Fn(usize) -> f64,
                       signal: f64,
                       error_sq: f64,
                       n_events: f64,
                       out: &mut MDHistoWorkspace|
     -> Result<()> {
        for (slot, (dim, &src)) in index.iter_mut().zip(target.iter().zip(&mapping)) {
            match dim.bin_index(coords(src)) {
                Some(bin) => *slot = bin,
                None => {
                    dropped += 1;
                    return Ok(());
                }
            }
        }
        out.accumulate(&index, signal, error_sq, n_events)
    };

    if let Some(events) = source.as_event() {
        for event in events.events() {
            deposit(
                &|d| event.center[d],
                event.signal,
                event.error_sq,
                1.0,
                &mut output,
            )?;
        }
    } else if let Some(histo) = source.as_histo() {
        let dims = histo.dimensions();
        for cell in ndarray::indices(histo.shape()) {
            let cell = cell.slice();
            let (Some(signal), Some(error_sq), Some(n_events)) = (
                histo.signal_at(cell),
                histo.error_sq_at(cell),
                histo.num_events_at(cell),
            ) else {
                continue;
            };
            if signal.is_nan() {
                continue;
            }
            deposit(
                &|d| dims[d].bin_center(cell[d]),
                signal,
                error_sq,
                n_events,
                &mut output,
            )?;
        }
    } else {
        return Err(Error::Config(format!(
            "workspace '{}' exposes neither histogram nor event data",
            source.name()
        )));
    }

    if dropped > 0 {
        log::debug!(
            "rebin of '{}' dropped {dropped} contributions outside the target limits",
            source.name()
        );
    }
    Ok(output)
}

/// Source dimension index for every target dimension.
fn map_dimensions(source: &dyn MDWorkspace, target: &[Dimension]) -> Result<Vec<usize>> {
    let mut seen = HashSet::new();
    target
        .iter()
        .map(|dim| {
            if !seen.insert(dim.id()) {
                return Err(Error::Config(format!(
                    "dimension '{}' appears twice in the rebinning target",
                    dim.id()
                )));
            }
            source
                .dimensions()
                .iter()
                .position(|d| d.id() == dim.id())
                .ok_or_else(|| {
                    Error::Config(format!(
                        "workspace '{}' has no dimension '{}'",
                        source.name(),
                        dim.id()
                    ))
                })
        })
        .collect()
}
