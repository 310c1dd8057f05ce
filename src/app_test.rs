use std::cell::Cell;
use std::rc::Rc;

use super::*;
use crate::orientation::SourceKind;

fn counted(source: SourceKind) -> (Subscription, Rc<Cell<usize>>) {
    let released = Rc::new(Cell::new(0));
    let counter = Rc::clone(&released);
    let sub = Subscription::new(source, move || counter.set(counter.get() + 1));
    (sub, released)
}

#[test]
fn empty_slot_is_inactive() {
    let slot = SubscriptionSlot::default();
    assert!(!slot.is_active());
}

#[test]
fn install_keeps_the_subscription_live() {
    let slot = SubscriptionSlot::default();
    let (sub, released) = counted(SourceKind::AbsoluteSensor);
    assert!(slot.install(sub));
    assert!(slot.is_active());
    assert_eq!(released.get(), 0);
}

#[test]
fn new_subscription_replaces_and_releases_the_previous_one() {
    let slot = SubscriptionSlot::default();
    let (first, first_released) = counted(SourceKind::LegacyEvent);
    let (second, second_released) = counted(SourceKind::AbsoluteSensor);
    assert!(slot.install(first));
    assert!(slot.install(second));
    assert_eq!(first_released.get(), 1);
    assert_eq!(second_released.get(), 0);
    assert_eq!(slot.current.borrow().as_ref().map(Subscription::source), Some(SourceKind::AbsoluteSensor));
}

#[test]
fn stop_releases_the_current_subscription_once() {
    let slot = SubscriptionSlot::default();
    let (sub, released) = counted(SourceKind::LegacyEvent);
    slot.install(sub);
    slot.stop();
    slot.stop();
    assert!(!slot.is_active());
    assert_eq!(released.get(), 1);
}

#[test]
fn subscription_completing_after_stop_is_released_immediately() {
    let slot = SubscriptionSlot::default();
    slot.stop();
    let (late, released) = counted(SourceKind::AbsoluteSensor);
    assert!(!slot.install(late));
    assert!(!slot.is_active());
    assert_eq!(released.get(), 1);
}

#[test]
fn dropping_the_slot_releases_the_live_subscription() {
    let (sub, released) = counted(SourceKind::LegacyEvent);
    {
        let slot = SubscriptionSlot::default();
        slot.install(sub);
    }
    assert_eq!(released.get(), 1);
}
