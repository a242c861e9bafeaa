//! mdmesh-presenter: Orchestration of workspace loading and rebinning.
//!
//! This crate decides when meshes must be rebuilt:
//! - **`RebinningActionManager`** - escalating recalculation requests
//! - **`InMemoryLoadingPresenter`** - metadata and meshes of a named workspace
//! - **`RebinningPresenter`** - rebinning onto user-chosen axes, then meshing
//! - **`RebinningSlot`** - a presenter that may not be configured yet
//! - **Progress monitors** - shared or channel-based progress reporting
//!
#![warn(missing_docs)]

mod action;
mod config;
mod error;
mod loading;
mod metadata;
mod progress;
mod rebinning;
mod slot;
mod view;

pub use action::{RebinningAction, RebinningActionManager};
pub use config::PresenterConfig;
pub use error::{PresenterError, Result};
pub use loading::{ChainBuilder, ExecuteOutcome, InMemoryLoadingPresenter};
pub use metadata::AXIS_TITLE_FIELDS;
pub use progress::{
    ChannelProgressAction, MonitorAction, ProgressMonitor, ProgressState, ProgressUpdate,
};
pub use rebinning::RebinningPresenter;
pub use slot::RebinningSlot;
pub use view::{
    LoadingViewState, MDLoadingView, MDRebinningView, RebinningViewState, ViewProgress,
};
