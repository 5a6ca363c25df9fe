use std::sync::{Arc, Mutex};
use std::time::Duration;

use led_arbiter_core::*;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(Color, Instant)>>,
}

impl Recorder {
    fn colors(&self) -> Vec<Color> {
        self.calls.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }
}

impl IndicatorOutput for Recorder {
    fn set_color(&self, color: Color) {
        self.calls.lock().unwrap().push((color, Instant::now()));
    }
}

fn abc() -> CatalogCfg {
    CatalogCfg::new(vec![
        IndicatorCfg::new("a", PatternKind::AlternatingA),
        IndicatorCfg::new("b", PatternKind::AlternatingB),
        IndicatorCfg::new("c", PatternKind::AlternatingA),
    ])
}

fn engine(cfg: &CatalogCfg) -> (ArbitrationEngine, Arc<Recorder>) {
    let rec = Arc::new(Recorder::default());
    let engine = ArbitrationEngine::new(cfg, rec.clone(), Handle::current()).unwrap();
    (engine, rec)
}

fn status(engine: &ArbitrationEngine, id: &str) -> RunStatus {
    engine.state(id).unwrap().status()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn higher_priority_preempts_and_restores() {
    let (e, _rec) = engine(&abc());

    let t = e.activate("b").unwrap();
    assert_eq!(t.visible.as_deref(), Some("b"));
    assert_eq!(status(&e, "b"), RunStatus::Running);

    let t = e.activate("a").unwrap();
    assert_eq!(t.previous.as_deref(), Some("b"));
    assert_eq!(t.visible.as_deref(), Some("a"));
    assert_ne!(status(&e, "b"), RunStatus::Running);
    assert_eq!(status(&e, "a"), RunStatus::Running);
    assert_eq!(e.state("b").unwrap().stop_count(), 1);

    let t = e.deactivate("a").unwrap();
    assert_eq!(t.visible.as_deref(), Some("b"));
    assert_eq!(status(&e, "b"), RunStatus::Running);
    assert_eq!(e.state("b").unwrap().start_count(), 2);

    let t = e.deactivate("b").unwrap();
    assert_eq!(t.visible, None);
    assert!(e.catalog().iter().all(|s| !s.is_running()));

    settle().await;
    assert!(e.catalog().iter().all(|s| s.status() == RunStatus::Idle));
}

#[tokio::test(start_paused = true)]
async fn preempted_state_restarts_while_still_stopping() {
    let (e, rec) = engine(&abc());

    e.activate("b").unwrap();
    e.activate("a").unwrap();
    // Cancel is sent but b's task has not been polled yet.
    assert_eq!(status(&e, "b"), RunStatus::Stopping);
    assert_eq!(e.state("b").unwrap().stop_count(), 1);

    // b comes back before its first run has exited: a fresh run is spawned
    // without waiting for the old one.
    e.deactivate("a").unwrap();
    assert_eq!(status(&e, "b"), RunStatus::Running);
    assert_eq!(status(&e, "a"), RunStatus::Stopping);
    let b = e.state("b").unwrap();
    assert_eq!((b.start_count(), b.stop_count()), (2, 1));
    assert_eq!(e.state("a").unwrap().stop_count(), 1);

    // One Off per stop; the cancelled runs exit without emitting.
    settle().await;
    assert_eq!(rec.colors(), vec![Color::Off, Color::Off, Color::Green]);
    assert_eq!(status(&e, "a"), RunStatus::Idle);
    assert_eq!(status(&e, "b"), RunStatus::Running);
    assert_eq!(b.start_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn repeated_activate_starts_once() {
    let (e, _rec) = engine(&abc());

    e.activate("c").unwrap();
    let t = e.activate("c").unwrap();
    assert!(!t.changed());
    assert_eq!(e.state("c").unwrap().start_count(), 1);
    assert_eq!(e.active(), vec!["c".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn activate_while_running_keeps_single_run() {
    let (e, _rec) = engine(&abc());

    e.activate("a").unwrap();
    tokio::time::sleep(Duration::from_millis(3000)).await;
    e.activate("a").unwrap();

    assert_eq!(status(&e, "a"), RunStatus::Running);
    assert_eq!(e.state("a").unwrap().start_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn deactivate_on_empty_is_noop() {
    let (e, rec) = engine(&abc());

    let t = e.deactivate("a").unwrap();
    assert_eq!(t, Transition::default());
    assert_eq!(e.visible(), None);
    assert!(rec.colors().is_empty());
    assert!(e.catalog().iter().all(|s| s.start_count() == 0));
}

#[tokio::test(start_paused = true)]
async fn unknown_id_is_rejected_without_side_effects() {
    let (e, rec) = engine(&abc());
    e.activate("b").unwrap();

    let err = e.activate("x").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { ref id } if id == "x"));
    assert!(matches!(e.deactivate("x"), Err(Error::InvalidArgument { .. })));

    assert_eq!(e.active(), vec!["b".to_string()]);
    assert_eq!(e.visible().as_deref(), Some("b"));
    assert_eq!(e.state("b").unwrap().start_count(), 1);
    assert!(!rec.colors().contains(&Color::Off));
}

#[tokio::test(start_paused = true)]
async fn preemption_clears_device_before_new_pattern() {
    let (e, rec) = engine(&CatalogCfg::default());

    e.activate("eco").unwrap();
    tokio::time::sleep(Duration::from_millis(3000)).await;
    assert_eq!(rec.colors(), vec![Color::Red, Color::Blue]);

    e.activate("error").unwrap();
    settle().await;
    assert_eq!(
        rec.colors(),
        vec![Color::Red, Color::Blue, Color::Off, Color::Red]
    );
    assert_eq!(status(&e, "eco"), RunStatus::Idle);

    // eco restarts from its first step.
    e.deactivate("error").unwrap();
    settle().await;
    assert_eq!(
        rec.colors(),
        vec![Color::Red, Color::Blue, Color::Off, Color::Red, Color::Off, Color::Red]
    );
}

#[tokio::test(start_paused = true)]
async fn single_pulse_is_held_until_preempted() {
    let (e, rec) = engine(&CatalogCfg::default());

    e.activate("error").unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(rec.colors(), vec![Color::Red]);
    assert_eq!(status(&e, "error"), RunStatus::Running);

    // Lower-priority request must not re-fire the pulse.
    e.activate("random").unwrap();
    settle().await;
    assert_eq!(e.visible().as_deref(), Some("error"));
    assert_eq!(e.state("error").unwrap().start_count(), 1);
    assert_eq!(rec.colors(), vec![Color::Red]);

    e.deactivate("error").unwrap();
    settle().await;
    assert_eq!(status(&e, "error"), RunStatus::Idle);
    assert_eq!(e.visible().as_deref(), Some("random"));
    assert_eq!(rec.colors(), vec![Color::Red, Color::Off, Color::Green]);
}

#[tokio::test(start_paused = true)]
async fn stop_when_idle_still_clears() {
    let (e, rec) = engine(&abc());
    e.state("c").unwrap().stop();
    assert_eq!(rec.colors(), vec![Color::Off]);
    assert_eq!(status(&e, "c"), RunStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn toggle_and_release_all() {
    let (e, rec) = engine(&abc());

    e.toggle("c").unwrap();
    e.toggle("b").unwrap();
    assert_eq!(e.visible().as_deref(), Some("b"));
    e.toggle("b").unwrap();
    assert_eq!(e.visible().as_deref(), Some("c"));

    let t = e.release_all().unwrap();
    assert_eq!(t.previous.as_deref(), Some("c"));
    assert_eq!(t.visible, None);
    assert!(e.active().is_empty());
    assert_eq!(rec.colors().last(), Some(&Color::Off));
}

#[tokio::test(start_paused = true)]
async fn cancelled_pattern_emits_elapsed_prefix() {
    for cancel_ms in [100u64, 2500, 3700, 5000, 9100] {
        let rec = Arc::new(Recorder::default());
        let (tx, rx) = watch::channel(false);
        let pattern = PatternKind::AlternatingA.pattern();
        let expected: Vec<Color> = pattern
            .timeline()
            .take_while(|(at, _)| *at <= Duration::from_millis(cancel_ms))
            .map(|(_, c)| c)
            .collect();

        let out = rec.clone();
        let started = Instant::now();
        let task = tokio::spawn(async move { pattern.run(rx, &*out).await });
        tokio::time::sleep(Duration::from_millis(cancel_ms)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(rec.colors(), expected, "cancelled at {cancel_ms}ms");
        // Cancellation wakes the hold instead of waiting it out.
        assert!(Instant::now() - started < Duration::from_millis(cancel_ms + 10));
    }
}

#[tokio::test(start_paused = true)]
async fn pattern_emissions_follow_step_holds() {
    let rec = Arc::new(Recorder::default());
    let (tx, rx) = watch::channel(false);
    let pattern = PatternKind::AlternatingB.pattern();
    let out = rec.clone();
    let started = Instant::now();
    let task = tokio::spawn(async move { pattern.run(rx, &*out).await });

    tokio::time::sleep(Duration::from_millis(3200)).await;
    drop(tx);
    task.await.unwrap();

    let offsets: Vec<(Color, u128)> = rec
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|(c, at)| (*c, (*at - started).as_millis()))
        .collect();
    assert_eq!(
        offsets,
        vec![
            (Color::Green, 0),
            (Color::Off, 500),
            (Color::Green, 1500),
            (Color::Off, 2000),
            (Color::Green, 3000),
        ]
    );
}

#[test]
fn engine_rejects_invalid_catalog() {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let cfg = CatalogCfg::new(vec![
        IndicatorCfg::new("dup", PatternKind::AlternatingA),
        IndicatorCfg::new("dup", PatternKind::AlternatingB),
    ]);
    let res = ArbitrationEngine::new(&cfg, Arc::new(NullOutput), rt.handle().clone());
    assert!(matches!(res, Err(Error::Config { .. })));
}
