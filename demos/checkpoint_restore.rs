//! Checkpoint and Restore
//!
//! This example snapshots a node in the middle of an update handshake and
//! rebuilds it on a second engine, as a registry would after a restart.
//!
//! Key concepts:
//! - JSON snapshots for inspection, binary snapshots for storage
//! - The pending expected-event queue survives a restore
//! - Hooks and observers belong to the restoring engine, not the snapshot
//!
//! Run with: cargo run --example checkpoint_restore

use fleetfsm::config::{ConfigCache, MemoryReader};
use fleetfsm::{InstanceSnapshot, StateMachine};
use std::sync::Arc;

const NODE_GRAPH: &str = include_str!("../tests/fixtures/node.json");

fn engine() -> StateMachine {
    let cache = ConfigCache::with_reader(MemoryReader::new().with_document("node", NODE_GRAPH));
    StateMachine::builder().cache(Arc::new(cache)).build()
}

fn main() {
    println!("=== Checkpoint and Restore Example ===\n");

    let before = engine();
    let node = before.new_instance("node", "node-42", "Configured").unwrap();
    node.transition("update").unwrap();
    node.transition("online").unwrap();

    let snapshot = node.snapshot();
    println!("Snapshot {} (format v{})", snapshot.id, snapshot.version);
    println!("{}\n", snapshot.to_json().unwrap());

    let bytes = snapshot.to_binary().unwrap();
    println!("Binary snapshot is {} bytes", bytes.len());

    // Simulate a restart: a fresh engine with its own cache.
    let after = engine();
    let restored = after
        .restore_instance(&InstanceSnapshot::from_binary(&bytes).unwrap())
        .unwrap();
    println!(
        "Restored {} in {} / {}, waiting for {:?}",
        restored.instance_id(),
        restored.current_state(),
        restored.current_substate(),
        restored.expected_events()
    );

    restored.transition("ready").unwrap();
    println!("After ready: {}", restored.current_state());
    println!("History entries: {}", restored.history().len());

    println!("\n=== Example Complete ===");
}
