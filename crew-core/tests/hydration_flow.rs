use std::sync::{Arc, Mutex};

use crew_core::{
    CapabilityGate, CapabilitySnapshot, CapabilityStore, CrewConfig, EventPat, GateOutcome,
    HydrationBridge, PermissionRequirement, StoreEventKind,
};

fn store_from_env_like_config() -> CapabilityStore {
    let mut config = CrewConfig::new();
    crew_core::config::load_config_from(
        &mut config,
        "CREW",
        vec![("CREW__CAPABILITIES__ADMIN_THRESHOLD".to_string(), "90".to_string())],
    );
    CapabilityStore::from_config(&config.snapshot())
}

/// Bootstrap, location switch, logout.
#[test]
fn page_lifecycle() {
    let store = store_from_env_like_config();
    let mut bridge = HydrationBridge::new(store.clone());
    let checklist = CapabilityGate::require("haccp:view");
    let admin_panel = CapabilityGate::require(PermissionRequirement::any_of(["admin:view"]));

    let renders = Arc::new(Mutex::new(Vec::new()));
    {
        let renders = Arc::clone(&renders);
        let gate = checklist.clone();
        let reader = store.clone();
        store.subscribe(move |_| {
            renders.lock().unwrap().push(gate.evaluate(&reader));
        });
    }

    // before the bridge runs: nothing gated is shown, nothing is denied either
    assert_eq!(checklist.evaluate(&store), GateOutcome::Pending);
    assert_eq!(admin_panel.evaluate(&store), GateOutcome::Pending);

    // server render payload
    let server_snapshot = Arc::new(
        CapabilitySnapshot::builder()
            .permissions(["haccp:view"])
            .role_level(10)
            .active_location_id(Some("kitchen-1"))
            .build(),
    );
    bridge.activate(Arc::clone(&server_snapshot));
    bridge.activate(Arc::clone(&server_snapshot));

    assert_eq!(checklist.evaluate(&store), GateOutcome::Granted);
    assert_eq!(admin_panel.evaluate(&store), GateOutcome::Denied);

    // location switch: refetch with a ticket
    let ticket = store.begin_fetch();
    store.hydrate_ticketed(
        ticket,
        CapabilitySnapshot::builder()
            .role_level(10)
            .active_location_id(Some("kitchen-2"))
            .build(),
    );
    assert_eq!(checklist.evaluate(&store), GateOutcome::Denied);
    assert_eq!(store.active_location_id().as_deref(), Some("kitchen-2"));

    // logout
    store.reset();
    bridge.deactivate();
    assert_eq!(checklist.evaluate(&store), GateOutcome::Pending);

    assert_eq!(
        *renders.lock().unwrap(),
        vec![GateOutcome::Granted, GateOutcome::Denied, GateOutcome::Pending]
    );
}

#[test]
fn admin_override_is_configured_once() {
    let store = store_from_env_like_config();
    store.hydrate(CapabilitySnapshot::new(Vec::<String>::new(), 95));

    assert!(store.can_token("anything"));
    assert_eq!(
        CapabilityGate::all_of(["inventory:delete", "shifts:publish"]).evaluate(&store),
        GateOutcome::Granted
    );
}

#[test]
fn only_hydrate_events_are_delivered_to_hydrate_subscribers() {
    let store = CapabilityStore::new();
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let k = Arc::clone(&kinds);
    store.subscribe_to(
        EventPat::Exact(StoreEventKind::Hydrated),
        move |event| k.lock().unwrap().push(event.kind()),
    );

    store.hydrate(CapabilitySnapshot::new(["a"], 0));
    store.reset();
    store.hydrate(CapabilitySnapshot::new(["b"], 0));

    assert_eq!(
        *kinds.lock().unwrap(),
        vec![StoreEventKind::Hydrated, StoreEventKind::Hydrated]
    );
}
