use super::*;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::sleep;

fn recording(delay_ms: u64) -> (Debouncer<u32>, UnboundedReceiver<(u32, Instant)>) {
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let debouncer = Debouncer::spawn(Duration::from_millis(delay_ms), move |value| {
        let _ = fired_tx.send((value, Instant::now()));
    });
    (debouncer, fired_rx)
}

#[tokio::test(start_paused = true)]
async fn burst_fires_once_with_last_value() {
    let start = Instant::now();
    let (debouncer, mut fired) = recording(1500);

    debouncer.push(1);
    sleep(Duration::from_millis(500)).await;
    debouncer.push(2);
    sleep(Duration::from_millis(500)).await;
    debouncer.push(3);

    let (value, at) = fired.recv().await.expect("one save should fire");
    assert_eq!(value, 3);
    let elapsed = at - start;
    assert!(
        elapsed >= Duration::from_millis(2500) && elapsed < Duration::from_millis(2510),
        "fired at {elapsed:?}"
    );

    sleep(Duration::from_secs(10)).await;
    assert!(fired.try_recv().is_err(), "burst fired more than once");
    debouncer.shutdown().await;
    assert!(fired.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn separate_windows_fire_separately() {
    let (debouncer, mut fired) = recording(100);

    debouncer.push(1);
    sleep(Duration::from_millis(250)).await;
    debouncer.push(2);
    sleep(Duration::from_millis(250)).await;

    assert_eq!(fired.try_recv().map(|(v, _)| v), Ok(1));
    assert_eq!(fired.try_recv().map(|(v, _)| v), Ok(2));
    debouncer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn nothing_fires_before_window_elapses() {
    let (debouncer, mut fired) = recording(1500);
    debouncer.push(7);
    sleep(Duration::from_millis(1499)).await;
    assert!(fired.try_recv().is_err());
    sleep(Duration::from_millis(2)).await;
    assert_eq!(fired.try_recv().map(|(v, _)| v), Ok(7));
    debouncer.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_pending_immediately() {
    let start = Instant::now();
    let (debouncer, mut fired) = recording(1500);
    debouncer.push(9);
    sleep(Duration::from_millis(10)).await;

    debouncer.shutdown().await;
    let (value, at) = fired.try_recv().expect("pending value should flush");
    assert_eq!(value, 9);
    assert!(at - start < Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn shutdown_without_pending_fires_nothing() {
    let (debouncer, mut fired) = recording(100);
    debouncer.push(1);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(fired.try_recv().map(|(v, _)| v), Ok(1));

    debouncer.shutdown().await;
    assert!(fired.try_recv().is_err());
}
