#![allow(clippy::float_cmp)]
use approx::assert_relative_eq;
use mdmesh_core::{
    BoxController, Dimension, GeometryXml, MDEvent, MDEventWorkspace, MDHistoWorkspace,
    MetadataJson, ThresholdConfig, WorkspaceKind, WorkspaceRegistry,
};
use mdmesh_factories::{FactoryChain, IgnoreProgress, GEOMETRY_XML_FIELD, METADATA_JSON_FIELD};
use mdmesh_presenter::{
    ChannelProgressAction, ExecuteOutcome, InMemoryLoadingPresenter, LoadingViewState,
    PresenterConfig, ProgressMonitor, RebinningPresenter, RebinningSlot, RebinningViewState,
};
use std::sync::mpsc::channel;
use std::sync::Arc;

fn event_registry() -> WorkspaceRegistry {
    let dims: Vec<Dimension> = ["h", "k", "l"]
        .iter()
        .map(|id| Dimension::new(*id, id.to_uppercase(), "r.l.u.", -1.0, 1.0, 4).unwrap())
        .collect();
    let events = (0..8)
        .map(|i| {
            let c = f64::from(i) / 4.0 - 0.9;
            MDEvent::new(1.0, 1.0, vec![c, c, c])
        })
        .collect();
    let controller = BoxController::default().with_split_threshold(2);
    let ws = MDEventWorkspace::new("hkl", dims, events, controller)
        .unwrap()
        .with_instrument("TOPAZ");
    let mut registry = WorkspaceRegistry::new();
    registry.insert(Arc::new(ws));
    registry
}

#[test]
fn test_loading_event_workspace_through_event_chain() {
    let mut presenter = InMemoryLoadingPresenter::new(
        LoadingViewState::default(),
        Arc::new(event_registry()),
        "hkl",
        WorkspaceKind::Event,
    );
    let monitor = ProgressMonitor::new();
    let mut loading = monitor.action("Loading");
    let (tx, rx) = channel();
    let mut drawing = ChannelProgressAction::new(tx, "Drawing");

    let product = presenter
        .execute(&FactoryChain::event, &mut loading, &mut drawing)
        .unwrap()
        .into_product()
        .unwrap();
    assert_eq!(product.builder, "EventBox");
    assert!(product.grid.n_cells() > 0);
    assert_eq!(monitor.snapshot().fraction, 1.0);
    drop(drawing);
    let last = rx.iter().last().unwrap();
    assert_eq!(last.fraction, 1.0);
    assert_eq!(last.text, "Drawing");

    let json = product.grid.field_data().get(METADATA_JSON_FIELD).unwrap();
    let metadata = MetadataJson::from_json_str(json).unwrap();
    assert_eq!(metadata.instrument, "TOPAZ");
    assert_relative_eq!(metadata.min_value, presenter.min_value().unwrap());
}

#[test]
fn test_field_data_geometry_round_trips() {
    let mut presenter = RebinningPresenter::new(
        RebinningViewState::new(""),
        &event_registry(),
        "hkl",
        PresenterConfig::default().with_threshold(ThresholdConfig::NoThreshold),
    )
    .unwrap();
    let outcome = presenter
        .execute(&FactoryChain::standard, &mut IgnoreProgress, &mut IgnoreProgress)
        .unwrap();
    let product = outcome.product().unwrap();
    assert_eq!(product.builder, "HistoHexahedron");
    // no threshold: every bin is drawn, empty ones included
    assert_eq!(product.grid.n_cells(), 64);
    let xml = product.grid.field_data().get(GEOMETRY_XML_FIELD).unwrap();
    let geometry = GeometryXml::parse(xml).unwrap();
    assert_eq!(geometry.x.as_ref().unwrap().id(), "h");
    assert_eq!(geometry.z.as_ref().unwrap().n_bins(), 4);
}

#[test]
fn test_slot_lifecycle() {
    let mut slot = RebinningSlot::default();
    assert!(slot.update_model().is_err());

    let dims = vec![
        Dimension::new("x", "X", "m", 0.0, 2.0, 2).unwrap(),
        Dimension::new("y", "Y", "m", 0.0, 2.0, 2).unwrap(),
    ];
    let mut registry = WorkspaceRegistry::new();
    registry.insert(Arc::new(MDHistoWorkspace::new("plane", dims).filled(1.0)));
    slot.install(
        RebinningPresenter::new(
            RebinningViewState::new(""),
            &registry,
            "plane",
            PresenterConfig::default(),
        )
        .unwrap(),
    );

    let first = slot
        .execute(&FactoryChain::standard, &mut IgnoreProgress, &mut IgnoreProgress)
        .unwrap();
    assert_eq!(first.product().unwrap().grid.n_cells(), 4);
    let second = slot
        .execute(&FactoryChain::standard, &mut IgnoreProgress, &mut IgnoreProgress)
        .unwrap();
    assert!(matches!(second, ExecuteOutcome::Unchanged));

    slot.presenter_mut().unwrap().view_mut().time = 1.0;
    let third = slot
        .execute(&FactoryChain::standard, &mut IgnoreProgress, &mut IgnoreProgress)
        .unwrap();
    assert!(third.product().is_some());
}
