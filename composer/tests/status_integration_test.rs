//! Status integration tests: composition trees, component queries and
//! concurrent access to a shared status.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use composer::status::{EntityKind, StatusCounts, StatusError, TransitionTable};
use composer::{
    ComposerConfig, ComposerStatus, Composite, Composition, RawComponent, SharedComposerStatus,
    TableFsmFactory,
};

fn shared_status() -> SharedComposerStatus {
    let mut config = ComposerConfig::default();
    config.lifecycle.component = TransitionTable::new("waiting")
        .with_transition("waiting", "instantiated", "running")
        .with_transition("running", "stopped", "waiting");
    ComposerStatus::new(Arc::new(TableFsmFactory::new(config.lifecycle))).shared()
}

fn application(prefix: &str, depth: usize) -> Composition {
    let mut composite = Composite::new(format!("{prefix}-leaf"))
        .with_uid(format!("{prefix}-{depth}"))
        .with_component(RawComponent::new("leaf", "leaf", "rust"));
    for level in (0..depth).rev() {
        composite = Composite::new(format!("{prefix}-level{level}"))
            .with_uid(format!("{prefix}-{level}"))
            .with_composite(composite)
            .with_composite(
                Composite::new("side").with_uid(format!("{prefix}-{level}-side")),
            );
    }
    Composition::new(prefix, composite).with_uid(prefix)
}

#[test]
fn test_nested_composition_round_trip() {
    let status = shared_status();
    let before = status.counts().unwrap();

    let composition = application("app", 4);
    status.add_composition(&composition).unwrap();
    assert!(status.has_composition("app").unwrap());
    // 4 levels with a side composite each, plus the leaf
    assert_eq!(status.counts().unwrap().composites, 9);
    assert_eq!(status.composite_state("app-4").unwrap(), "requested");

    status.remove_composition(&composition).unwrap();
    assert_eq!(status.counts().unwrap(), before);
    assert!(!status.has_composition("app").unwrap());
}

#[test]
fn test_second_composition_sharing_uids_is_rejected() {
    let status = shared_status();
    status.add_composition(&application("app", 2)).unwrap();

    let clash = Composition::new("other", application("app", 1).root).with_uid("other");
    let err = status.add_composition(&clash).unwrap_err();
    assert!(matches!(
        err,
        StatusError::DuplicateUid {
            kind: EntityKind::Composite,
            ..
        }
    ));
    assert!(!status.has_composition("other").unwrap());
    assert_eq!(status.counts().unwrap().compositions, 1);
}

#[test]
fn test_concurrent_component_registration() {
    let status = shared_status();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let status = Arc::clone(&status);
            thread::spawn(move || {
                for i in 0..25 {
                    let component = RawComponent::new(format!("c{i}"), "f", "python")
                        .with_uid(format!("{worker}-{i}"));
                    status.component_requested(&component).unwrap();
                    if i % 2 == 0 {
                        status.component_event(&component.uid, "instantiated").unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(status.counts().unwrap().components, 200);
    assert_eq!(status.get_components(Some("running")).unwrap().len(), 104);
    assert_eq!(status.get_components(Some("waiting")).unwrap().len(), 96);
}

#[test]
fn test_teardown_after_mixed_registrations() {
    let status = shared_status();
    status.agent_requested("node-python-auto01").unwrap();
    status
        .component_requested(&RawComponent::new("web", "web", "python"))
        .unwrap();
    status.add_composition(&application("app", 1)).unwrap();

    let counts = status.counts().unwrap();
    assert_eq!(
        counts,
        StatusCounts {
            agents: 1,
            components: 1,
            composites: 3,
            compositions: 1,
        }
    );

    status.teardown().unwrap();
    assert_eq!(status.counts().unwrap(), StatusCounts::default());
    assert!(status.get_agents().unwrap().is_empty());
}

#[test]
fn test_counts_while_compositions_change() {
    let status = shared_status();
    let (done_tx, done_rx) = mpsc::channel();

    let writer = {
        let status = Arc::clone(&status);
        let done = done_tx.clone();
        thread::spawn(move || {
            let composition = application("churn", 3);
            for _ in 0..2_000 {
                status.add_composition(&composition).unwrap();
                status.remove_composition(&composition).unwrap();
            }
            done.send("writer").unwrap();
        })
    };
    let reader = {
        let status = Arc::clone(&status);
        thread::spawn(move || {
            for _ in 0..2_000 {
                let counts = status.counts().unwrap();
                assert!(counts.compositions <= 1);
            }
            done_tx.send("reader").unwrap();
        })
    };

    // A lock-order inversion between the two threads hangs here
    for _ in 0..2 {
        done_rx
            .recv_timeout(Duration::from_secs(30))
            .expect("status access deadlocked");
    }
    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(status.counts().unwrap(), StatusCounts::default());
}
