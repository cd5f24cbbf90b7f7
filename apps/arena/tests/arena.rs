use stratus::domain::config::{ArenaConfig, BusConfig};
use stratus::events::{EventBus, ReceiverId};
use stratus_arena::Arena;
use stratus_arena::squad::SQUAD;

fn config(frames: u64) -> ArenaConfig {
    ArenaConfig { frames, frame_millis: 1, squad_size: 3, agent_health: 30, strike_damage: 9 }
}

#[test]
fn strikes_rotate_until_one_agent_stands() {
    let mut arena = Arena::builder().config(config(12)).build().unwrap();
    for _ in 0..12 {
        arena.step();
    }

    let rounds: Vec<_> = arena.squad().agents().iter().map(|agent| agent.rounds_seen()).collect();
    assert_eq!(rounds, vec![12, 10, 11], "downed agents stop receiving rounds");

    let report = arena.finish();
    assert_eq!(report.frames, 12);
    assert_eq!(report.casualties, vec![ReceiverId::new(3), ReceiverId::new(4)]);
    assert_eq!(report.survivors, 1);
    assert_eq!(report.damage_total, 99);
}

#[test]
fn downed_agents_are_torn_down_on_the_next_tick() {
    let mut arena = Arena::builder()
        .config(ArenaConfig { agent_health: 9, ..config(1) })
        .build()
        .unwrap();
    let bus = arena.bus().clone();
    let victim = arena.squad().agents()[1].receiver;

    assert_eq!(arena.step(), 1, "the AgentDowned dispatch runs in this frame's tick");
    assert!(!bus.is_connected(victim));
    assert!(!arena.squad().graph().contains(victim));
    assert!(!bus.is_owner_alive(arena.squad().agents()[1].owner));
    assert_eq!(arena.squad().casualties(), vec![victim]);
    assert_eq!(bus.subscriber_count::<stratus_arena::combat::AgentDowned>(SQUAD), 1);
    arena.finish();
}

#[test]
fn strict_bus_still_routes_every_event() {
    let bus = EventBus::with_config(&BusConfig { strict_receivers: true, ..BusConfig::default() }).unwrap();
    let mut arena = Arena::builder().config(config(3)).bus(bus).build().unwrap();
    for _ in 0..3 {
        arena.step();
    }

    let report = arena.finish();
    assert_eq!(report.damage_total, 27);
    assert!(report.casualties.is_empty());
}

#[test]
fn invalid_settings_are_rejected() {
    assert!(Arena::builder().squad_size(0).build().is_err());

    let bus = EventBus::new();
    bus.shutdown();
    assert!(Arena::builder().bus(bus).build().is_err());
}

#[tokio::test(flavor = "current_thread")]
async fn run_drives_configured_frames_and_shuts_down() {
    let arena = Arena::builder().config(config(3)).build().unwrap();
    let bus = arena.bus().clone();

    let report = arena.run().await;
    assert_eq!(report.frames, 3);
    assert_eq!(report.stats.tick, 3);
    assert!(bus.is_shutting_down());
}
