//! Node Lifecycle
//!
//! This example walks one fleet node through its configured lifecycle graph.
//!
//! Key concepts:
//! - Loading a graph document through a `ConfigCache`
//! - Sub-state transitions seeding an expected-event handshake
//! - Rejected events leaving the node untouched
//! - Manual override for a node stuck in `Faulty`
//!
//! Run with: cargo run --example node_lifecycle

use fleetfsm::config::{ConfigCache, MemoryReader};
use fleetfsm::{Event, Instance, StateMachine};
use std::sync::Arc;

const NODE_GRAPH: &str = include_str!("../tests/fixtures/node.json");

fn print_position(node: &Instance) {
    println!(
        "  {} is {} / {:?}, waiting for {:?}",
        node.instance_id(),
        node.current_state(),
        node.current_substate(),
        node.expected_events()
    );
}

fn main() {
    println!("=== Node Lifecycle Example ===\n");

    let cache = ConfigCache::with_reader(MemoryReader::new().with_document("node", NODE_GRAPH));
    let machine = StateMachine::builder()
        .cache(Arc::new(cache))
        .observer(|event: &Event| {
            println!(
                "  [event] {} : {}/{} -> {}/{}",
                event.name,
                event.old_state,
                event.old_substate,
                event.new_state,
                event.new_substate
            );
        })
        .on_entry("Faulty", || {
            println!("  [hook] raising alarm");
            Ok(())
        })
        .build();

    let node = machine
        .new_instance("node", "node-17", "Configured")
        .unwrap();
    print_position(&node);

    println!("\nSoftware update handshake:");
    node.transition("update").unwrap();
    print_position(&node);

    // The node has to come back online before it may report ready.
    match node.transition("offline") {
        Ok(()) => println!("  offline accepted"),
        Err(e) => println!("  rejected: {e}"),
    }

    node.transition("online").unwrap();
    node.transition("ready").unwrap();
    print_position(&node);

    println!("\nFault and manual recovery:");
    node.transition("fault").unwrap();
    node.enforce_state_transition("Configured", "on").unwrap();
    print_position(&node);

    println!("\nPath: {:?}", node.history().path());
    println!("\n=== Example Complete ===");
}
