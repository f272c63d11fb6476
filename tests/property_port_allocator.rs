//! Property tests for the deployment port pool.
//!
//! For every interleaving of allocate/release operations the set of held
//! ports must contain no duplicates and stay inside the configured range.

use hatchery::services::PortAllocator;
use proptest::prelude::*;

const BASE: u16 = 8100;
const MAX: u16 = 8110;

#[derive(Debug, Clone)]
enum Op {
    Allocate,
    Release(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Allocate),
        1 => any::<u8>().prop_map(Op::Release),
    ]
}

proptest! {
    #[test]
    fn held_ports_never_duplicate(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mut allocator = PortAllocator::new(BASE, MAX);
        let mut held: Vec<u16> = Vec::new();

        for op in ops {
            match op {
                Op::Allocate => {
                    if let Some(port) = allocator.allocate() {
                        prop_assert!(!held.contains(&port), "port {port} handed out twice");
                        prop_assert!((BASE..MAX).contains(&port), "port {port} out of range");
                        held.push(port);
                    } else {
                        // Exhaustion may only happen with the pool full.
                        prop_assert_eq!(held.len(), usize::from(MAX - BASE));
                    }
                }
                Op::Release(index) => {
                    if !held.is_empty() {
                        let position = usize::from(index) % held.len();
                        let port = held.swap_remove(position);
                        allocator.release(port);
                    }
                }
            }
        }

        prop_assert_eq!(held.len(), allocator.held_count());
        for port in &held {
            prop_assert!(allocator.is_held(*port));
        }
    }

    #[test]
    fn release_makes_port_allocatable_again(rounds in 1usize..50) {
        let mut allocator = PortAllocator::new(BASE, BASE + 1);
        for _ in 0..rounds {
            let port = allocator.allocate().expect("single-port pool must allocate");
            prop_assert_eq!(port, BASE);
            prop_assert!(allocator.allocate().is_none());
            allocator.release(port);
        }
        prop_assert_eq!(allocator.held_count(), 0);
    }
}
