mod common;

use common::{ScriptedGenerator, NARRATION};
use shadow_core::rng::ScriptedRandom;
use shadow_core::rogue::{fallback_narration, RogueEngine, RogueEventKind, Severity};
use shadow_core::state::{AgentStatus, MemoryStore, Storage};
use shadow_core::GameConfig;

fn set_loyalty(store: &MemoryStore, codename: &str, loyalty: i32) {
    let mut agent = store.load_agent(codename).unwrap();
    agent.loyalty = loyalty;
    store.save_agent(&agent).unwrap();
}

#[tokio::test]
async fn quiet_roster_fires_nothing() {
    let store = common::seeded_store();
    let generator = ScriptedGenerator::new();
    let config = GameConfig::default();
    let mut rng = ScriptedRandom::constant(0.99);

    let events = RogueEngine::new(&store, &generator, &config).run(&mut rng).await.unwrap();
    assert!(events.is_empty());
    assert!(store.load_state().unwrap().rogue_events.is_empty());
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn silent_defection_spreads_through_the_network() {
    let store = common::seeded_store();
    set_loyalty(&store, "GHOST", 20);
    let generator = ScriptedGenerator::new();
    let config = GameConfig::default();
    let engine = RogueEngine::new(&store, &generator, &config);

    let mut rng = ScriptedRandom::constant(0.0);
    let events = engine.run(&mut rng).await.unwrap();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.kind, RogueEventKind::SilentDefection);
    assert_eq!(event.codename, "GHOST");
    assert_eq!(event.severity, Severity::Critical);
    assert_eq!(event.narration, NARRATION);
    assert_eq!(event.effects.all_loyalty_change, Some(-3));
    assert!(event.effects.compromised);

    let ghost = store.load_agent("GHOST").unwrap();
    assert_eq!(ghost.current_status, AgentStatus::Dark);
    for (codename, loyalty) in [("NIGHTHAWK", 69), ("CEDAR", 62), ("SABLE", 55), ("LOTUS", 77)] {
        let agent = store.load_agent(codename).unwrap();
        assert_eq!(agent.loyalty, loyalty, "{codename}");
        assert_eq!(agent.known_compromises, vec!["GHOST".to_string()], "{codename}");
    }
    assert_eq!(store.load_state().unwrap().compromised_assets, vec!["GHOST".to_string()]);

    // Bring GHOST back and let it happen again; nothing is recorded twice.
    let mut ghost = store.load_agent("GHOST").unwrap();
    ghost.current_status = AgentStatus::Active;
    store.save_agent(&ghost).unwrap();

    let mut rng = ScriptedRandom::new([0.99, 0.99, 0.0, 0.0]);
    let events = engine.run(&mut rng).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(store.load_agent("NIGHTHAWK").unwrap().loyalty, 66);
    assert_eq!(
        store.load_agent("NIGHTHAWK").unwrap().known_compromises,
        vec!["GHOST".to_string()]
    );
    let state = store.load_state().unwrap();
    assert_eq!(state.compromised_assets, vec!["GHOST".to_string()]);
    assert_eq!(state.rogue_events.len(), 2);
}

#[tokio::test]
async fn effects_from_this_pass_do_not_trigger_later_operatives() {
    let store = common::seeded_store();
    set_loyalty(&store, "GHOST", 20);
    set_loyalty(&store, "SABLE", 52);
    let generator = ScriptedGenerator::new();
    let config = GameConfig::default();
    let engine = RogueEngine::new(&store, &generator, &config);
    let mut rng = ScriptedRandom::constant(0.0);

    let events = engine.run(&mut rng).await.unwrap();
    let fired: Vec<(&str, RogueEventKind)> =
        events.iter().map(|e| (e.codename.as_str(), e.kind)).collect();
    assert_eq!(fired, vec![("GHOST", RogueEventKind::SilentDefection)]);

    // SABLE dropped below the loyalty threshold and learned of GHOST mid-pass.
    let sable = store.load_agent("SABLE").unwrap();
    assert_eq!(sable.loyalty, 49);
    assert_eq!(sable.known_compromises, vec!["GHOST".to_string()]);

    let events = engine.run(&mut rng).await.unwrap();
    let fired: Vec<(&str, RogueEventKind)> =
        events.iter().map(|e| (e.codename.as_str(), e.kind)).collect();
    assert_eq!(
        fired,
        vec![
            ("NIGHTHAWK", RogueEventKind::CompromiseWarning),
            ("CEDAR", RogueEventKind::CompromiseWarning),
            ("SABLE", RogueEventKind::DefectionWarning),
            ("LOTUS", RogueEventKind::CompromiseWarning),
        ]
    );
}

#[tokio::test]
async fn double_agent_stays_in_place_and_hidden() {
    let store = common::seeded_store();
    set_loyalty(&store, "GHOST", 20);
    let generator = ScriptedGenerator::new();
    let config = GameConfig::default();
    let mut rng = ScriptedRandom::new([0.0, 0.5]);

    let events = RogueEngine::new(&store, &generator, &config).run(&mut rng).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, RogueEventKind::DoubleAgentActivation);
    assert!(events[0].hidden);
    assert_eq!(events[0].title, "INTELLIGENCE ANOMALY DETECTED");

    assert_eq!(store.load_agent("GHOST").unwrap().current_status, AgentStatus::Active);
    let state = store.load_state().unwrap();
    assert_eq!(state.agency_exposure_level, 13);
    assert!(state.is_compromised("GHOST"));
}

#[tokio::test]
async fn unsanctioned_action_heats_the_home_region() {
    let store = common::seeded_store();
    set_loyalty(&store, "GHOST", 45);
    let generator = ScriptedGenerator::new();
    let config = GameConfig::default();
    let mut rng = ScriptedRandom::new([0.0, 0.6]);

    let events = RogueEngine::new(&store, &generator, &config).run(&mut rng).await.unwrap();
    assert_eq!(events[0].kind, RogueEventKind::UnsanctionedAction);
    assert_eq!(events[0].severity, Severity::Critical);

    assert_eq!(store.load_agent("GHOST").unwrap().loyalty, 40);
    let state = store.load_state().unwrap();
    assert_eq!(state.agency_exposure_level, 20);
    assert_eq!(state.regions["south_asia"].tension, 48);
}

#[tokio::test]
async fn external_contact_ends_the_checks_for_that_operative() {
    let store = common::seeded_store();
    let mut state = store.load_state().unwrap();
    state.update_region_tension("south_asia", 45);
    store.save_state(&state).unwrap();
    let mut ghost = store.load_agent("GHOST").unwrap();
    ghost.known_compromises = vec!["SABLE".to_string()];
    store.save_agent(&ghost).unwrap();

    let generator = ScriptedGenerator::new();
    let config = GameConfig::default();
    let mut rng = ScriptedRandom::new([0.5, 0.1, 0.0]);

    let events = RogueEngine::new(&store, &generator, &config).run(&mut rng).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, RogueEventKind::ExternalContact);
    assert_eq!(rng.remaining(), 1);

    assert_eq!(store.load_agent("GHOST").unwrap().loyalty, 45);
    assert_eq!(store.load_state().unwrap().agency_exposure_level, 13);
}

#[tokio::test]
async fn compromise_warning_names_the_first_known_compromise() {
    let store = common::seeded_store();
    let mut ghost = store.load_agent("GHOST").unwrap();
    ghost.loyalty = 60;
    ghost.known_compromises = vec!["SABLE".to_string(), "CEDAR".to_string()];
    store.save_agent(&ghost).unwrap();

    let generator = ScriptedGenerator::new();
    let config = GameConfig::default();
    let mut rng = ScriptedRandom::new([0.0]);

    let events = RogueEngine::new(&store, &generator, &config).run(&mut rng).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, RogueEventKind::CompromiseWarning);
    assert_eq!(events[0].effects.warned_about.as_deref(), Some("SABLE"));
    assert_eq!(store.load_agent("GHOST").unwrap().loyalty, 62);
}

#[tokio::test]
async fn outage_uses_fixed_narration() {
    let store = common::seeded_store();
    set_loyalty(&store, "GHOST", 45);
    let generator = ScriptedGenerator::failing();
    let config = GameConfig::default();
    let mut rng = ScriptedRandom::new([0.0, 0.0]);

    let events = RogueEngine::new(&store, &generator, &config).run(&mut rng).await.unwrap();
    assert_eq!(events[0].kind, RogueEventKind::DefectionWarning);
    assert_eq!(
        events[0].narration,
        fallback_narration(RogueEventKind::DefectionWarning, "GHOST")
    );
    assert_eq!(store.load_agent("GHOST").unwrap().loyalty, 48);
}

#[tokio::test]
async fn events_land_in_the_rogue_log_only() {
    let store = common::seeded_store();
    set_loyalty(&store, "GHOST", 45);
    let generator = ScriptedGenerator::new();
    let config = GameConfig::default();
    let mut rng = ScriptedRandom::new([0.0, 0.0]);

    let events = RogueEngine::new(&store, &generator, &config).run(&mut rng).await.unwrap();
    let state = store.load_state().unwrap();
    assert_eq!(state.rogue_events, events);
    assert_eq!(state.rogue_events[0].turn, 1);
    assert!(state.world_events.is_empty());
}
