mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use busline_core::{MessageBus, Topic};
use common::{settle, wait_for};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
struct StatusReport {
    state: String,
    feed: f64,
}

#[test]
fn test_priority_order_on_publish() {
    let bus = MessageBus::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let high = log.clone();
    bus.subscribe_with_priority("temp", 10, move |v: f64| high.lock().push(("high", v)));
    let low = log.clone();
    bus.subscribe_with_priority("temp", 1, move |v: f64| low.lock().push(("low", v)));

    assert!(bus.start_processing_thread::<f64>());
    bus.publish("temp", 21.5_f64);

    assert!(wait_for(|| log.lock().len() == 2));
    assert_eq!(*log.lock(), vec![("high", 21.5), ("low", 21.5)]);
}

#[test]
fn test_global_and_topic_subscribers_fire_once() {
    let bus = MessageBus::new();
    let handled = Arc::new(Mutex::new(Vec::new()));
    let audited = Arc::new(Mutex::new(Vec::new()));

    let audit = audited.clone();
    bus.global_subscribe(move |cmd: String| audit.lock().push(cmd));
    let handler = handled.clone();
    bus.subscribe("cmd", move |cmd: String| handler.lock().push(cmd));

    bus.start();
    bus.publish("cmd", String::from("ping"));

    assert!(wait_for(|| handled.lock().len() == 1 && audited.lock().len() == 1));
    settle();
    assert_eq!(*handled.lock(), vec!["ping".to_string()]);
    assert_eq!(*audited.lock(), vec!["ping".to_string()]);
}

#[test]
fn test_global_runs_after_topic_subscribers() {
    let bus = MessageBus::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let global = order.clone();
    bus.global_subscribe(move |_: u8| global.lock().push("global"));
    let topic = order.clone();
    bus.subscribe_with_priority("io", -100, move |_: u8| topic.lock().push("topic"));

    bus.start();
    bus.publish("io", 1_u8);

    assert!(wait_for(|| order.lock().len() == 2));
    assert_eq!(*order.lock(), vec!["topic", "global"]);
}

#[test]
fn test_namespace_isolation() {
    let bus = MessageBus::new();
    let namespaced = Arc::new(AtomicUsize::new(0));
    let bare = Arc::new(AtomicUsize::new(0));

    let ns_hits = namespaced.clone();
    bus.subscribe(Topic::namespaced("ns", "x"), move |v: i32| {
        ns_hits.fetch_add(v as usize, Ordering::SeqCst);
    });
    let bare_hits = bare.clone();
    bus.subscribe("x", move |v: i32| {
        bare_hits.fetch_add(v as usize, Ordering::SeqCst);
    });

    bus.start();
    bus.publish(Topic::namespaced("ns", "x"), 1_i32);

    assert!(wait_for(|| namespaced.load(Ordering::SeqCst) == 1));
    settle();
    assert_eq!(bare.load(Ordering::SeqCst), 0);
    assert_eq!(bus.subscriber_count(Topic::namespaced("ns", "x")), 1);
    assert_eq!(bus.topics(), vec!["ns::x".to_string(), "x".to_string()]);
}

#[test]
fn test_namespace_subscription_is_not_a_wildcard() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let sink = hits.clone();
    bus.subscribe_to_namespace("grbl", 0, move |_: String| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    bus.start();

    bus.publish(Topic::namespaced("grbl", "status"), String::from("Idle"));
    settle();
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    bus.publish(Topic::namespace_wildcard("grbl"), String::from("Idle"));
    assert!(wait_for(|| hits.load(Ordering::SeqCst) == 1));
}

#[test]
fn test_exact_type_match_only() {
    let bus = MessageBus::new();
    let signed = Arc::new(AtomicUsize::new(0));
    let unsigned = Arc::new(AtomicUsize::new(0));

    let s = signed.clone();
    bus.subscribe("count", move |_: i32| {
        s.fetch_add(1, Ordering::SeqCst);
    });
    let u = unsigned.clone();
    bus.subscribe("count", move |_: u32| {
        u.fetch_add(1, Ordering::SeqCst);
    });

    bus.start();
    bus.publish("count", 5_u32);

    assert!(wait_for(|| unsigned.load(Ordering::SeqCst) == 1));
    settle();
    assert_eq!(signed.load(Ordering::SeqCst), 0);
    assert_eq!(bus.stats().mismatched, 1);
}

#[test]
fn test_struct_payload_delivered_unchanged() {
    let bus = MessageBus::new();
    let received = Arc::new(Mutex::new(None));

    let sink = received.clone();
    bus.subscribe("machine.status", move |report: StatusReport| {
        *sink.lock() = Some(report);
    });
    bus.start();

    let report = StatusReport {
        state: "Run".to_string(),
        feed: 1200.0,
    };
    bus.publish("machine.status", report.clone());

    assert!(wait_for(|| received.lock().is_some()));
    assert_eq!(received.lock().clone(), Some(report));
}

#[test]
fn test_duplicate_subscription_invoked_twice() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let sink = hits.clone();
        bus.subscribe("jog", move |_: char| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
    }
    bus.start();
    bus.publish("jog", 'X');

    assert!(wait_for(|| hits.load(Ordering::SeqCst) == 2));
    settle();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_removing_only_subscriber_leaves_globals() {
    let bus = MessageBus::new();
    let topic_hits = Arc::new(AtomicUsize::new(0));
    let global_hits = Arc::new(AtomicUsize::new(0));

    let t = topic_hits.clone();
    bus.subscribe("alarm", move |_: u32| {
        t.fetch_add(1, Ordering::SeqCst);
    });
    let g = global_hits.clone();
    bus.global_subscribe(move |_: u32| {
        g.fetch_add(1, Ordering::SeqCst);
    });
    bus.start();

    assert_eq!(bus.unsubscribe::<u32>("alarm"), 1);
    bus.publish("alarm", 9_u32);

    assert!(wait_for(|| global_hits.load(Ordering::SeqCst) == 1));
    settle();
    assert_eq!(topic_hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_publish_to_unknown_topic_is_dropped() {
    let bus = MessageBus::new();
    bus.start_processing_thread::<f32>();

    bus.publish("nobody-listens", 1.0_f32);
    assert!(wait_for(|| bus.pending::<f32>() == 0));

    let stats = bus.stats();
    assert_eq!(stats.published, 1);
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.dropped, 1);
}

#[test]
fn test_unsubscribed_type_does_not_accumulate_on_running_bus() {
    let bus = MessageBus::new();
    bus.subscribe("temp", |_: f64| {});
    bus.start();

    for n in 0..1_000_u128 {
        bus.publish("nobody", n);
    }
    settle();

    assert_eq!(bus.pending::<u128>(), 0);
    let stats = bus.stats();
    assert_eq!(stats.published, 1_000);
    assert_eq!(stats.dropped, 1_000);
    assert_eq!(stats.pending, 0);
}

#[test]
fn test_unsubscribed_type_queues_until_bus_runs() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    bus.publish("late", 7_u64);
    assert_eq!(bus.pending::<u64>(), 1);

    let sink = hits.clone();
    bus.subscribe("late", move |_: u64| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    bus.start();
    assert!(wait_for(|| hits.load(Ordering::SeqCst) == 1));
    assert_eq!(bus.stats().dropped, 0);
}

#[test]
fn test_namespaced_unsubscribe_leaves_bare_topic() {
    let bus = MessageBus::new();
    let namespaced = Arc::new(AtomicUsize::new(0));
    let bare = Arc::new(AtomicUsize::new(0));

    let n = namespaced.clone();
    bus.subscribe(Topic::namespaced("machine", "x"), move |_: i32| {
        n.fetch_add(1, Ordering::SeqCst);
    });
    let b = bare.clone();
    bus.subscribe("x", move |_: i32| {
        b.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(bus.unsubscribe::<i32>(Topic::namespaced("machine", "x")), 1);
    assert_eq!(bus.subscriber_count(Topic::namespaced("machine", "x")), 0);
    assert_eq!(bus.subscriber_count("x"), 1);
    assert_eq!(bus.topics(), vec!["x".to_string()]);

    bus.start();
    bus.publish(Topic::namespaced("machine", "x"), 1_i32);
    bus.publish("x", 2_i32);

    assert!(wait_for(|| bare.load(Ordering::SeqCst) == 1));
    settle();
    assert_eq!(namespaced.load(Ordering::SeqCst), 0);
}

#[test]
fn test_panicking_subscriber_does_not_stop_worker() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    bus.subscribe_with_priority("touch-plate", 5, |_: i64| panic!("touch plate contact lost"));
    let sink = hits.clone();
    bus.subscribe("touch-plate", move |_: i64| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    bus.start();

    bus.publish("touch-plate", 1_i64);
    bus.publish("touch-plate", 2_i64);

    assert!(wait_for(|| hits.load(Ordering::SeqCst) == 2));
    assert!(bus.is_processing::<i64>());
    assert_eq!(bus.stats().failed, 2);
}

#[test]
fn test_global_unsubscribe() {
    let bus = MessageBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let sink = hits.clone();
    bus.global_subscribe(move |_: bool| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(bus.global_subscriber_count(), 1);
    assert_eq!(bus.global_unsubscribe::<bool>(), 1);
    assert_eq!(bus.global_unsubscribe::<bool>(), 0);

    bus.start_processing_thread::<bool>();
    bus.publish("door", true);
    settle();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
