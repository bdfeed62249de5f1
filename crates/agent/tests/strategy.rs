//! Strategy lifecycle and restart-protocol tests against the simulated world.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};

use wayfarer::{
    Agent, AgentConfig, AgentError, Entity, EventKind, HighwayConfig, HighwayStrategy, Position,
    SimConfig, SimWorld, Strategy, WorldConnection,
};

fn setup(config: SimConfig) -> (Arc<Agent>, Arc<SimWorld>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let sim = Arc::new(SimWorld::new(config));
    let world: Arc<dyn WorldConnection> = Arc::clone(&sim) as Arc<dyn WorldConnection>;
    let agent = Agent::new(world, AgentConfig::default());
    (agent, sim)
}

fn highway_target() -> Position {
    Position::new(10_000.0, 120.0, 0.0)
}

#[tokio::test]
async fn rejects_targets_off_the_highway_plane() {
    let (agent, _sim) = setup(SimConfig::default());
    let result = HighwayStrategy::new(agent, HighwayConfig::new(Position::new(0.0, 64.0, 0.0)));
    assert!(matches!(result, Err(AgentError::InvalidCoordinate(_))));
}

#[tokio::test]
async fn start_and_stop_account_for_every_subscription() {
    let (agent, _sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();

    let strategy =
        HighwayStrategy::new(Arc::clone(&agent), HighwayConfig::new(highway_target())).unwrap();

    strategy.start().await.unwrap();
    assert!(strategy.is_running());
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 4);
    assert_eq!(
        strategy.action_names(),
        vec!["Goto Location", "Emergency Quit", "Efficient Eat", "Loot Finder"]
    );

    strategy.stop().await;
    assert!(!strategy.is_running());
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 0);

    // Stopping again is harmless, and a fresh start re-registers cleanly.
    strategy.stop().await;
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 0);
    strategy.start().await.unwrap();
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 4);
    strategy.stop().await;
}

#[tokio::test]
async fn starting_twice_keeps_a_single_subscription_set() {
    let (agent, _sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();

    let strategy =
        HighwayStrategy::new(Arc::clone(&agent), HighwayConfig::new(highway_target())).unwrap();
    strategy.start().await.unwrap();
    strategy.start().await.unwrap();
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 4);

    // And the whole set goes away on stop, nothing left behind.
    strategy.stop().await;
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 0);
}

#[tokio::test]
async fn shield_option_adds_a_fifth_action() {
    let (agent, _sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();

    let config = HighwayConfig {
        use_shield: true,
        ..HighwayConfig::new(highway_target())
    };
    let strategy = HighwayStrategy::new(Arc::clone(&agent), config).unwrap();
    strategy.start().await.unwrap();
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 5);
    assert_eq!(strategy.action_names().last(), Some(&"Always Shield"));
    strategy.stop().await;
}

#[tokio::test(start_paused = true)]
async fn restart_cycles_the_connection_and_rebuilds_the_action_set() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    let pump = tokio::spawn(Arc::clone(&agent).run());
    agent.wait_until_active(Duration::from_secs(60)).await.unwrap();

    let strategy =
        HighwayStrategy::new(Arc::clone(&agent), HighwayConfig::new(highway_target())).unwrap();
    strategy.start().await.unwrap();
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 4);

    strategy.restart(Duration::from_secs(1)).await;

    assert_eq!(sim.connect_count(), 2);
    assert!(agent.is_active());
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 4);

    // A second restart does not leak subscriptions either.
    strategy.restart(Duration::from_secs(1)).await;
    assert_eq!(sim.connect_count(), 3);
    assert_eq!(agent.bus().handler_count(EventKind::Tick), 4);

    agent.disconnect(true).await;
    pump.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn hostile_player_drives_a_supervised_restart() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    let pump = tokio::spawn(Arc::clone(&agent).run());
    agent.wait_until_active(Duration::from_secs(60)).await.unwrap();

    let config = HighwayConfig::new(highway_target()).debug();
    let strategy = HighwayStrategy::new(Arc::clone(&agent), config).unwrap();
    strategy.spawn_supervisor();
    strategy.start().await.unwrap();

    sim.add_entity(Entity::player(Position::new(3.0, 120.0, 3.0), "griefer"));

    // The next dispatched tick requests a restart; wait for the supervisor
    // to finish the reconnect cycle.
    let mut reconnected = false;
    for _ in 0..200 {
        if sim.connect_count() >= 2 {
            reconnected = true;
            break;
        }
        sleep(Duration::from_millis(500)).await;
    }
    assert!(reconnected, "supervisor never cycled the connection");

    // Once the threat is gone the strategy settles back into a running set.
    sim.clear_entities();
    let mut settled = false;
    for _ in 0..200 {
        if agent.is_active() && agent.bus().handler_count(EventKind::Tick) == 4 {
            settled = true;
            break;
        }
        sleep(Duration::from_millis(500)).await;
    }
    assert!(settled, "strategy never settled after the restart");

    agent.disconnect(true).await;
    pump.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn full_run_walks_to_the_target_and_shuts_down() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    let pump = tokio::spawn(Arc::clone(&agent).run());
    agent.wait_until_active(Duration::from_secs(60)).await.unwrap();

    // Close enough to arrive in under a minute of simulated walking.
    let target = Position::new(0.5, 120.0, 50.5);
    let strategy =
        HighwayStrategy::new(Arc::clone(&agent), HighwayConfig::new(target)).unwrap();
    strategy.start().await.unwrap();

    let mut shutdown = agent.shutdown_signal();
    timeout(Duration::from_secs(300), shutdown.changed())
        .await
        .expect("agent never arrived")
        .unwrap();

    assert!(!sim.is_connected());
    assert!(
        agent.position().is_none(),
        "snapshots are unavailable after shutdown"
    );
    pump.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn activation_timeout_fails_fast() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    // No event pump running, so the spawn events are never applied.

    let result = agent.wait_until_active(Duration::from_secs(60)).await;
    assert!(matches!(result, Err(AgentError::ActivationTimeout)));
    assert!(*agent.shutdown_signal().borrow());
    assert!(!sim.is_connected());
}
