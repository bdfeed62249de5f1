//! Behavior tests for the shipped actions against the simulated world.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::advance;

use wayfarer::{
    Agent, AgentConfig, AlwaysShield, EmergencyQuit, EmergencyQuitConfig, Entity, EventHandler,
    GotoLocation, Hand, ItemStack, LootFinder, Position, SimConfig, SimWorld, WorldConnection,
    WorldEvent, actions::EfficientEat,
};

fn setup(config: SimConfig) -> (Arc<Agent>, Arc<SimWorld>) {
    let sim = Arc::new(SimWorld::new(config));
    let world: Arc<dyn WorldConnection> = Arc::clone(&sim) as Arc<dyn WorldConnection>;
    let agent = Agent::new(world, AgentConfig::default());
    (agent, sim)
}

fn food_fixture() -> SimConfig {
    SimConfig {
        food_values: HashMap::from([
            ("berry".to_string(), 2),
            ("apple".to_string(), 4),
            ("steak".to_string(), 7),
            ("rotten_flesh".to_string(), 4),
        ]),
        inventory: vec![
            ItemStack::new(0, "berry", 1),
            ItemStack::new(1, "apple", 2),
            ItemStack::new(2, "steak", 3),
        ],
        ..SimConfig::default()
    }
}

const EAT_TICK: WorldEvent = WorldEvent::Tick { count: 18 };
const GOTO_TICK: WorldEvent = WorldEvent::Tick { count: 19 };

// ----------------------------------------------------------------------
// EfficientEat
// ----------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn eat_picks_highest_value_that_fits_the_deficit() {
    let (agent, sim) = setup(food_fixture());
    agent.connect().await.unwrap();
    sim.set_hunger(14); // deficit 6: steak (7) overshoots, apple (4) fits

    let eat = EfficientEat::new(Arc::clone(&agent));
    eat.handle(&EAT_TICK).await.unwrap();

    assert_eq!(agent.hunger(), Some(18));
    let inventory = agent.inventory().unwrap();
    assert!(!inventory.contains_key(&1), "apple should be consumed");
    assert!(inventory.contains_key(&2), "steak must not be touched");
}

#[tokio::test(start_paused = true)]
async fn eat_does_nothing_at_full_hunger() {
    let (agent, _sim) = setup(food_fixture());
    agent.connect().await.unwrap();

    let eat = EfficientEat::new(Arc::clone(&agent));
    eat.handle(&EAT_TICK).await.unwrap();

    assert_eq!(agent.hunger(), Some(20));
    assert_eq!(agent.inventory().unwrap().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn eat_abstains_when_every_food_would_overshoot() {
    let (agent, sim) = setup(food_fixture());
    agent.connect().await.unwrap();
    sim.set_inventory(vec![ItemStack::new(2, "steak", 3)]);
    sim.set_hunger(16); // deficit 4 < steak 7

    let eat = EfficientEat::new(Arc::clone(&agent));
    eat.handle(&EAT_TICK).await.unwrap();

    assert_eq!(agent.hunger(), Some(16));
    assert_eq!(agent.inventory().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn eat_ignores_blacklisted_food() {
    let (agent, sim) = setup(food_fixture());
    agent.connect().await.unwrap();
    sim.set_inventory(vec![ItemStack::new(0, "rotten_flesh", 4)]);
    sim.set_hunger(10);

    let eat = EfficientEat::new(Arc::clone(&agent));
    eat.handle(&EAT_TICK).await.unwrap();

    assert_eq!(agent.hunger(), Some(10));
}

#[tokio::test(start_paused = true)]
async fn panic_eating_overrides_the_overshoot_rule() {
    let (agent, sim) = setup(food_fixture());
    agent.connect().await.unwrap();
    sim.set_inventory(vec![ItemStack::new(2, "steak", 3)]);
    sim.set_hunger(4); // below the panic threshold; steak overshoots but gets eaten

    let eat = EfficientEat::new(Arc::clone(&agent));
    eat.handle(&EAT_TICK).await.unwrap();

    assert_eq!(agent.hunger(), Some(11));
}

#[tokio::test(start_paused = true)]
async fn eat_runs_only_on_its_tick_phase() {
    let (agent, sim) = setup(food_fixture());
    agent.connect().await.unwrap();
    sim.set_hunger(14);

    let eat = EfficientEat::new(Arc::clone(&agent));
    eat.handle(&WorldEvent::Tick { count: 3 }).await.unwrap();

    assert_eq!(agent.hunger(), Some(14));
}

// ----------------------------------------------------------------------
// EmergencyQuit
// ----------------------------------------------------------------------

fn hostile(position: Position) -> Entity {
    Entity::player(position, "griefer")
}

#[tokio::test(start_paused = true)]
async fn low_health_takes_precedence_over_hostile_players() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    sim.set_health(5);
    sim.add_entity(hostile(Position::new(10.0, 120.0, 10.0)));

    let (tx, mut rx) = mpsc::channel(4);
    let quit = EmergencyQuit::new(
        Arc::clone(&agent),
        EmergencyQuitConfig {
            reconnect_wait: Some(Duration::from_secs(5)),
            ..EmergencyQuitConfig::default()
        },
    )
    .with_restart_channel(tx);

    quit.handle(&WorldEvent::Tick { count: 0 }).await.unwrap();

    // Health short-circuits: shutdown disconnect, no restart request.
    assert!(*agent.shutdown_signal().borrow());
    assert!(!sim.is_connected());
    assert_eq!(sim.connect_count(), 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn hostile_player_requests_a_restart_when_configured() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    sim.add_entity(hostile(Position::new(10.0, 120.0, 10.0)));

    let (tx, mut rx) = mpsc::channel(4);
    let quit = EmergencyQuit::new(
        Arc::clone(&agent),
        EmergencyQuitConfig {
            reconnect_wait: Some(Duration::from_secs(30)),
            ..EmergencyQuitConfig::default()
        },
    )
    .with_restart_channel(tx);

    quit.handle(&WorldEvent::Tick { count: 0 }).await.unwrap();

    let request = rx.try_recv().expect("restart should be requested");
    assert_eq!(request.wait, Duration::from_secs(30));
    assert!(sim.is_connected(), "agent stays up until the supervisor acts");
    assert!(!*agent.shutdown_signal().borrow());
}

#[tokio::test(start_paused = true)]
async fn hostile_player_without_reconnect_policy_shuts_down() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    sim.add_entity(hostile(Position::new(10.0, 120.0, 10.0)));

    let quit = EmergencyQuit::new(Arc::clone(&agent), EmergencyQuitConfig::default());
    quit.handle(&WorldEvent::Tick { count: 0 }).await.unwrap();

    assert!(*agent.shutdown_signal().borrow());
    assert!(!sim.is_connected());
}

#[tokio::test(start_paused = true)]
async fn whitelisted_player_is_ignored() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    agent.whitelist_add("griefer");
    sim.add_entity(hostile(Position::new(10.0, 120.0, 10.0)));

    let quit = EmergencyQuit::new(Arc::clone(&agent), EmergencyQuitConfig::default());
    quit.handle(&WorldEvent::Tick { count: 0 }).await.unwrap();

    assert!(sim.is_connected());
    assert!(!*agent.shutdown_signal().borrow());
}

#[tokio::test(start_paused = true)]
async fn empty_food_supply_ends_the_session() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    // A pickaxe but nothing edible.
    sim.set_inventory(vec![ItemStack::new(0, "diamond_pickaxe", 779)]);

    let quit = EmergencyQuit::new(Arc::clone(&agent), EmergencyQuitConfig::default());
    quit.handle(&WorldEvent::Tick { count: 0 }).await.unwrap();

    assert!(*agent.shutdown_signal().borrow());
    assert!(!sim.is_connected());
}

#[tokio::test(start_paused = true)]
async fn stuck_detection_fires_once_at_the_threshold_and_resets() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    let goal = Position::new(5000.0, 120.0, 0.0);
    agent.set_walk_goal(Some(goal));

    let quit = EmergencyQuit::new(
        Arc::clone(&agent),
        EmergencyQuitConfig {
            check_players: false,
            check_food: false,
            ..EmergencyQuitConfig::default()
        },
    );
    let tick = WorldEvent::Tick { count: 0 };

    // First observation seeds the tracker; no trigger.
    quit.handle(&tick).await.unwrap();
    assert_eq!(sim.connect_count(), 1);

    advance(Duration::from_secs(30)).await;
    quit.handle(&tick).await.unwrap();
    assert_eq!(sim.connect_count(), 1, "not stuck before the threshold");

    advance(Duration::from_secs(30)).await;
    quit.handle(&tick).await.unwrap();
    assert_eq!(sim.connect_count(), 2, "stuck reconnect at the boundary");
    assert_eq!(sim.walk_target(), Some(goal), "walk goal reissued");

    // The timer restarted: another 59 seconds in place does not re-trigger.
    quit.handle(&tick).await.unwrap();
    advance(Duration::from_secs(59)).await;
    quit.handle(&tick).await.unwrap();
    assert_eq!(sim.connect_count(), 2);

    // Movement beyond tolerance resets the tracker.
    sim.set_position(Position::new(3.0, 120.0, 0.5));
    quit.handle(&tick).await.unwrap();
    advance(Duration::from_secs(59)).await;
    quit.handle(&tick).await.unwrap();
    assert_eq!(sim.connect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_intent_sticks_without_live_subscribers() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();

    // Nobody has called shutdown_signal() yet; the intent must still land.
    agent.disconnect(true).await;

    assert!(*agent.shutdown_signal().borrow());
    assert!(!sim.is_connected());
}

// ----------------------------------------------------------------------
// AlwaysShield
// ----------------------------------------------------------------------

const SHIELD_TICK: WorldEvent = WorldEvent::Tick { count: 19 };

#[tokio::test(start_paused = true)]
async fn shield_is_equipped_to_the_offhand_and_raised() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();

    let shield = AlwaysShield::new(Arc::clone(&agent));
    shield.handle(&SHIELD_TICK).await.unwrap();

    assert_eq!(
        agent.held_item(Hand::Off).map(|item| item.name),
        Some("shield".to_string())
    );
    assert!(sim.held_item_active());

    // Already equipped and active: another pass changes nothing.
    shield.handle(&SHIELD_TICK).await.unwrap();
    assert_eq!(
        agent.held_item(Hand::Off).map(|item| item.name),
        Some("shield".to_string())
    );
    assert!(sim.held_item_active());
}

#[tokio::test(start_paused = true)]
async fn no_shield_in_inventory_raises_nothing() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    sim.set_inventory(vec![ItemStack::new(0, "bread", 851)]);

    let shield = AlwaysShield::new(Arc::clone(&agent));
    shield.handle(&SHIELD_TICK).await.unwrap();

    assert!(agent.held_item(Hand::Off).is_none());
    assert!(!sim.held_item_active());
}

#[tokio::test(start_paused = true)]
async fn shield_runs_only_on_its_tick_phase() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();

    let shield = AlwaysShield::new(Arc::clone(&agent));
    shield.handle(&WorldEvent::Tick { count: 7 }).await.unwrap();

    assert!(agent.held_item(Hand::Off).is_none());
    assert!(!sim.held_item_active());
}

// ----------------------------------------------------------------------
// LootFinder
// ----------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn loot_sightings_are_deduplicated() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    sim.add_entity(Entity::item(
        Position::new(10.2, 120.0, 10.7),
        "netherite_ingot",
    ));

    let finder = LootFinder::new(Arc::clone(&agent));
    let tick = WorldEvent::Tick { count: 0 };
    finder.handle(&tick).await.unwrap();
    finder.handle(&tick).await.unwrap();
    assert_eq!(finder.sightings(), 1);

    // A different item at the same spot is a new sighting.
    sim.add_entity(Entity::item(Position::new(10.4, 120.0, 10.9), "elytra"));
    finder.handle(&tick).await.unwrap();
    assert_eq!(finder.sightings(), 2);
}

#[tokio::test(start_paused = true)]
async fn loot_finder_ignores_mundane_items_and_players() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    sim.add_entity(Entity::item(Position::new(1.0, 120.0, 1.0), "cobblestone"));
    sim.add_entity(Entity::player(
        Position::new(2.0, 120.0, 2.0),
        "netherite_fan",
    ));

    let finder = LootFinder::new(Arc::clone(&agent));
    finder.handle(&WorldEvent::Tick { count: 0 }).await.unwrap();
    assert_eq!(finder.sightings(), 0);
}

// ----------------------------------------------------------------------
// GotoLocation
// ----------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn goto_issues_pathfinding_then_arrives_within_tolerance() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    let target = Position::new(100.0, 120.0, 100.0);
    let goto = GotoLocation::new(Arc::clone(&agent), target, 1000.0, false);

    // Off-phase ticks do nothing.
    goto.handle(&WorldEvent::Tick { count: 5 }).await.unwrap();
    assert_eq!(sim.walk_target(), None);

    goto.handle(&GOTO_TICK).await.unwrap();
    assert_eq!(sim.walk_target(), Some(target));
    assert_eq!(agent.walk_goal(), Some(target));

    // 1.1 units off on x: not arrived yet.
    sim.set_position(Position::new(98.9, 120.0, 100.0));
    goto.handle(&GOTO_TICK).await.unwrap();
    assert!(sim.walk_target().is_some());

    // Within one unit on every axis: arrived, pathfinding halted.
    sim.set_position(Position::new(99.5, 119.5, 99.5));
    goto.handle(&GOTO_TICK).await.unwrap();
    assert_eq!(sim.walk_target(), None);
    assert!(sim.is_connected(), "exit_on_arrival=false keeps the session");
}

#[tokio::test(start_paused = true)]
async fn goto_disconnects_on_arrival_when_configured() {
    let (agent, sim) = setup(SimConfig::default());
    agent.connect().await.unwrap();
    let target = Position::new(10.0, 120.0, 10.0);
    let goto = GotoLocation::new(Arc::clone(&agent), target, 1000.0, true);

    goto.handle(&GOTO_TICK).await.unwrap();
    sim.set_position(Position::new(10.0, 120.0, 10.0));
    goto.handle(&GOTO_TICK).await.unwrap();

    assert!(!sim.is_connected());
    assert!(*agent.shutdown_signal().borrow());
}
