//! End-to-end gesture scenarios over a small widget tree.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use lattice_gesture::{
    GestureAction, GestureConfig, GestureContext, GestureState, Point, PointerAction, PointerEvent,
    PointerId, PointerKind, RecognizerKind, Rect, TimerDriver, WidgetId, WidgetTree, hit_test,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct MapTree {
    nodes: HashMap<WidgetId, (Option<Rect>, Vec<WidgetId>)>,
}

impl MapTree {
    fn node(mut self, id: u64, bounds: Option<Rect>, children: &[u64]) -> Self {
        let children = children.iter().copied().map(WidgetId).collect();
        self.nodes.insert(WidgetId(id), (bounds, children));
        self
    }
}

impl WidgetTree for MapTree {
    fn children(&self, widget: WidgetId) -> Vec<WidgetId> {
        self.nodes
            .get(&widget)
            .map(|(_, children)| children.clone())
            .unwrap_or_default()
    }

    fn bounds(&self, widget: WidgetId) -> Option<Rect> {
        self.nodes.get(&widget).and_then(|(bounds, _)| *bounds)
    }
}

const ROOT: WidgetId = WidgetId(0);

#[test]
fn test_pan_beats_tap_without_cancel() {
    init_tracing();

    let tree = MapTree::default()
        .node(0, Some(Rect::new(0.0, 0.0, 300.0, 300.0)), &[1])
        .node(1, Some(Rect::new(0.0, 0.0, 100.0, 100.0)), &[]);
    let widget = WidgetId(1);
    let context = GestureContext::default();
    let log: Rc<RefCell<Vec<(&str, Point)>>> = Rc::default();

    for (name, action) in [
        ("tap-down", GestureAction::TapDown),
        ("tap", GestureAction::Tap),
        ("tap-cancel", GestureAction::TapCancel),
        ("pan-down", GestureAction::PanDown),
        ("pan-update", GestureAction::PanUpdate),
    ] {
        let log = log.clone();
        context
            .register(widget, action, move |detail| {
                log.borrow_mut().push((name, detail.position))
            })
            .unwrap();
    }

    let t0 = Instant::now();
    let down = PointerEvent::new(42, PointerKind::Touch, PointerAction::Down, Point::new(10.0, 10.0), t0);
    let moved = PointerEvent::new(
        42,
        PointerKind::Touch,
        PointerAction::Move,
        Point::new(21.0, 10.0),
        t0 + Duration::from_millis(16),
    );
    context.handle_pointer_event(&tree, ROOT, &down).unwrap();
    context.handle_pointer_event(&tree, ROOT, &moved).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            ("pan-down", Point::new(10.0, 10.0)),
            ("pan-update", Point::new(21.0, 10.0)),
        ]
    );
    let tap = context
        .binding()
        .find_gesture_recognizer(widget, RecognizerKind::Tap)
        .unwrap();
    assert_eq!(tap.as_dyn().state(), GestureState::Ready);
    let pan = context
        .binding()
        .find_gesture_recognizer(widget, RecognizerKind::Pan)
        .unwrap();
    assert_eq!(pan.as_dyn().state(), GestureState::Accepted);

    // The tap-down timer was cancelled along with the tap.
    context.process_timers(t0 + Duration::from_secs(1));
    assert_eq!(log.borrow().len(), 2);
}

/// Root (0) holds 7 (no handler), 1 and 2, with 2 front-most. Widget 1 holds
/// 3 and 5, where 5 overflows its parent. Widget 4 has no bounds and hides
/// its child 6.
fn layered_tree() -> MapTree {
    MapTree::default()
        .node(0, Some(Rect::new(0.0, 0.0, 100.0, 100.0)), &[7, 1, 2])
        .node(7, Some(Rect::new(0.0, 0.0, 100.0, 100.0)), &[])
        .node(1, Some(Rect::new(0.0, 0.0, 60.0, 60.0)), &[3, 5])
        .node(3, Some(Rect::new(10.0, 10.0, 20.0, 20.0)), &[])
        .node(5, Some(Rect::new(70.0, 70.0, 20.0, 20.0)), &[])
        .node(2, Some(Rect::new(20.0, 20.0, 30.0, 30.0)), &[4])
        .node(4, None, &[6])
        .node(6, Some(Rect::new(25.0, 25.0, 5.0, 5.0)), &[])
}

fn context_with_handlers(widgets: &[u64]) -> GestureContext {
    let context = GestureContext::default();
    for &id in widgets {
        context.on_tap(WidgetId(id), |_| {}).unwrap();
    }
    context
}

#[test]
fn test_hit_test_orders_front_and_deepest_first() {
    let tree = layered_tree();
    let context = context_with_handlers(&[0, 1, 2, 3, 5, 6]);

    let result = hit_test(&tree, ROOT, Point::new(25.0, 25.0), context.binding());
    assert_eq!(
        result.widgets(),
        &[WidgetId(2), WidgetId(3), WidgetId(1), WidgetId(0)]
    );
    assert!(!result.contains(WidgetId(6)));
    assert!(!result.contains(WidgetId(7)));
}

#[test]
fn test_hit_test_reaches_overflowing_child() {
    let tree = layered_tree();
    let context = context_with_handlers(&[0, 1, 2, 3, 5, 6]);

    let result = hit_test(&tree, ROOT, Point::new(75.0, 75.0), context.binding());
    assert_eq!(result.widgets(), &[WidgetId(5), WidgetId(0)]);

    let miss = hit_test(&tree, ROOT, Point::new(150.0, 150.0), context.binding());
    assert!(miss.is_empty());
}

#[test]
fn test_tap_reaches_every_hit_widget_but_one_wins() {
    let tree = layered_tree();
    let context = GestureContext::default();
    let hits: Rc<RefCell<Vec<WidgetId>>> = Rc::default();
    for id in [1, 3] {
        let hits = hits.clone();
        context
            .on_tap(WidgetId(id), move |detail| hits.borrow_mut().push(detail.target))
            .unwrap();
    }

    let now = Instant::now();
    for action in [PointerAction::Down, PointerAction::Up] {
        let event = PointerEvent::new(1, PointerKind::Mouse, action, Point::new(15.0, 15.0), now);
        context.handle_pointer_event(&tree, ROOT, &event).unwrap();
    }

    // Both taps join the arena; the deepest sees the up first and claims it.
    assert_eq!(*hits.borrow(), vec![WidgetId(3)]);
    assert!(context.arena_manager().is_empty());
    assert!(!context.is_tracking(PointerId(1)));
}

#[test]
fn test_driver_wakes_host_for_long_press() {
    init_tracing();

    let config = GestureConfig::new().with_long_press_timeout(Duration::from_millis(20));
    let context = GestureContext::new(config).unwrap();
    let mut driver = TimerDriver::spawn().unwrap();
    context.attach_timer_driver(&driver);

    let tree = MapTree::default().node(0, Some(Rect::new(0.0, 0.0, 50.0, 50.0)), &[]);
    let pressed = Rc::new(RefCell::new(0));
    let counter = pressed.clone();
    context
        .on_long_press(ROOT, move |_| *counter.borrow_mut() += 1)
        .unwrap();

    let down = PointerEvent::new(5, PointerKind::Pen, PointerAction::Down, Point::new(5.0, 5.0), Instant::now());
    context.handle_pointer_event(&tree, ROOT, &down).unwrap();

    let wake = driver
        .wakeups()
        .recv_timeout(Duration::from_secs(5))
        .expect("driver should wake the host");
    assert_eq!(*pressed.borrow(), 0);
    context.process_timers(Instant::now().max(wake.deadline));
    assert_eq!(*pressed.borrow(), 1);

    driver.shutdown();
}
