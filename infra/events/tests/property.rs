pub mod fixtures;

use fixtures::*;
use proptest::prelude::*;
use stratus_event_bus::*;

proptest! {
    #[test]
    fn handlers_fire_once_each_in_connection_order(
        labels in proptest::collection::vec("[a-z]{1,6}", 1..16),
        duplicates in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let (bus, owner) = bus_with_owner();
        let journal = Journal::default();
        let handlers: Vec<_> = labels.iter().map(|label| journal.handler::<Ping>(label.as_str())).collect();

        for handler in &handlers {
            prop_assert!(bus.connect(PANEL, owner, handler));
        }
        for index in &duplicates {
            prop_assert!(!bus.connect(PANEL, owner, index.get(&handlers)));
        }

        bus.dispatch(PANEL, Ping);
        prop_assert_eq!(journal.entries(), labels);
    }

    #[test]
    fn only_live_owners_are_invoked(alive in proptest::collection::vec(any::<bool>(), 1..24)) {
        let bus = EventBus::new();
        let counter = Counter::default();
        let owners: Vec<_> = alive.iter().map(|_| bus.create_owner()).collect();
        for owner in &owners {
            bus.connect(PANEL, *owner, &counter.handler::<Ping>());
        }
        for (owner, keep) in owners.iter().zip(&alive) {
            if !keep {
                bus.invalidate_owner(*owner);
            }
        }

        let expected = alive.iter().filter(|keep| **keep).count();
        prop_assert_eq!(bus.try_dispatch(PANEL, Ping).unwrap(), expected);
        prop_assert_eq!(bus.subscriber_count::<Ping>(PANEL), expected);
        prop_assert_eq!(counter.get(), expected);
    }

    #[test]
    fn deferred_dispatches_fire_exactly_once_in_order(count in 0usize..64) {
        let (bus, owner) = bus_with_owner();
        let journal = Journal::default();
        bus.connect(PANEL, owner, &journal.damage_handler());

        for amount in 0..count {
            bus.dispatch_next_tick(PANEL, Damage(u32::try_from(amount).unwrap()));
        }
        prop_assert!(journal.entries().is_empty());
        prop_assert_eq!(bus.tick(), count);
        let expected: Vec<String> = (0..count).map(|amount| amount.to_string()).collect();
        prop_assert_eq!(journal.entries(), expected);
        prop_assert_eq!(bus.tick(), 0);
    }
}
