//! Minimal interactive shell for driving the agent by hand.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use wayfarer::{Agent, Position};

const HELP: &str = "commands: status | goto <x> <y> <z> | whitelist <name> | quit";

/// Reads commands from stdin until quit or agent shutdown.
pub async fn run(agent: Arc<Agent>) -> Result<()> {
    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shutdown = agent.shutdown_signal();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if handle_command(&agent, line.trim()).await? {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Returns `true` when the shell should exit.
async fn handle_command(agent: &Arc<Agent>, line: &str) -> Result<bool> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        None => {}
        Some("status") => {
            match agent.position() {
                Some(position) => println!(
                    "position {position}  health {:?}  hunger {:?}  dimension {}  phase {:?}",
                    agent.health(),
                    agent.hunger(),
                    agent
                        .dimension()
                        .map(|dimension| dimension.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                    agent.phase(),
                ),
                None => println!("not spawned (phase {:?})", agent.phase()),
            };
        }
        Some("goto") => {
            let coordinates: Vec<f64> = parts.filter_map(|part| part.parse().ok()).collect();
            match coordinates.as_slice() {
                [x, y, z] => {
                    let target = Position::new(*x, *y, *z);
                    println!("walking to {target}");
                    agent.walk_to(target).await?;
                }
                _ => println!("usage: goto <x> <y> <z>"),
            }
        }
        Some("whitelist") => match parts.next() {
            Some(name) => {
                agent.whitelist_add(name);
                println!("whitelisted '{name}'");
            }
            None => println!("usage: whitelist <name>"),
        },
        Some("quit") | Some("exit") => {
            agent.disconnect(true).await;
            return Ok(true);
        }
        Some(other) => println!("unknown command '{other}'. {HELP}"),
    }
    Ok(false)
}
