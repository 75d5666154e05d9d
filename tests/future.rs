//! End-to-end coverage of the future/promise fulfillment protocol.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_promise::{failed, new, ready, run, with_deadline, CancellationToken, Error};
use futures_lite::StreamExt;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn write_once_first_call_wins() {
    let (future, promise) = new::<u32>();
    promise.success(1);
    promise.success(2);
    promise.failure(Error::msg("late"));
    assert_eq!(future.wait().await.unwrap(), 1);
}

#[tokio::test]
async fn reads_are_idempotent() {
    let future = ready(7_u32);
    for _ in 0..10 {
        assert_eq!(future.wait().await.unwrap(), 7);
    }
}

#[tokio::test]
async fn concurrent_waiters_all_observe_the_same_result() {
    let (future, promise) = new::<u32>();

    let mut waiters = Vec::new();
    for _ in 0..8 {
        let future = future.clone();
        waiters.push(tokio::spawn(async move { future.wait().await }));
    }

    // let the waiters block before fulfilling
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!future.is_fulfilled());
    promise.success(99);

    for waiter in waiters {
        let result = timeout(WAIT, waiter).await.unwrap().unwrap();
        assert_eq!(result.unwrap(), 99);
    }
}

#[tokio::test]
async fn success_and_error_callbacks_are_exclusive() {
    let (future, promise) = new::<u32>();
    let (tx, mut rx) = mpsc::unbounded_channel();

    {
        let tx = tx.clone();
        future.on_success(move |value| {
            let _ = tx.send(format!("success:{value}"));
        });
    }
    {
        let tx = tx.clone();
        future.on_error(move |error| {
            let _ = tx.send(format!("error:{error}"));
        });
    }
    future.on_result(move |result| {
        let _ = tx.send(format!("result:{}", result.is_ok()));
    });

    promise.success(5);

    let mut events = vec![
        timeout(WAIT, rx.recv()).await.unwrap().unwrap(),
        timeout(WAIT, rx.recv()).await.unwrap().unwrap(),
    ];
    events.sort();
    assert_eq!(events, vec!["result:true", "success:5"]);

    // the error callback must stay silent
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn registration_after_fulfillment_still_fires() {
    let future = failed::<u32>(Error::msg("already done"));
    let (tx, mut rx) = mpsc::unbounded_channel();

    future.on_error(move |error| {
        let _ = tx.send(error.to_string());
    });

    let message = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(message, "already done");
}

#[tokio::test]
async fn callback_panics_are_contained() {
    let (future, promise) = new::<u32>();
    let (tx, mut rx) = mpsc::unbounded_channel();

    future.on_success(|_| panic!("misbehaving callback"));
    future.on_success(move |value| {
        let _ = tx.send(value);
    });

    promise.success(3);

    // the panicking callback affects neither its sibling nor the result
    assert_eq!(timeout(WAIT, rx.recv()).await.unwrap(), Some(3));
    assert_eq!(future.wait().await.unwrap(), 3);
}

#[tokio::test]
async fn operation_panics_become_errors_with_a_backtrace() {
    let future: async_promise::Future<u32> = run(|| async { panic!("boom") });
    let err = future.wait().await.unwrap_err();
    assert!(err.is_panic());
    let rendered = err.to_string();
    assert!(rendered.contains("boom"));
    assert!(rendered.contains("stack backtrace:"));
}

#[tokio::test]
async fn deadline_tokens_abort_the_wait_promptly() {
    let future = run(|| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(1_u32)
    });

    let started = Instant::now();
    let token = with_deadline(Duration::from_millis(5));
    let err = future.wait_with_token(&token).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_millis(250));

    // the future itself is unaffected by the abandoned wait
    assert_eq!(future.wait().await.unwrap(), 1);
}

#[tokio::test]
async fn cancel_runs_cleanup_exactly_once() {
    let (future, promise) = new::<u32>();
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    {
        let calls = calls.clone();
        promise.on_cancel(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(());
        });
    }

    future.cancel();
    future.cancel();
    future.cancel();

    timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(promise.is_cancelled());
}

#[tokio::test]
async fn cancelled_promise_can_still_fulfil() {
    let (future, promise) = new::<u32>();
    future.cancel();
    assert!(promise.is_cancelled());
    promise.failure(Error::Cancelled);
    assert!(future.wait().await.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn to_stream_yields_the_result_once() {
    let (future, promise) = new::<u32>();
    let mut stream = future.to_stream();
    promise.success(11);

    let first = timeout(WAIT, stream.next()).await.unwrap();
    assert_eq!(first.unwrap().unwrap(), 11);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn to_stream_with_token_surfaces_cancellation() {
    let (future, _promise) = new::<u32>();
    let token = CancellationToken::new();
    token.cancel();

    let mut stream = future.to_stream_with_token(&token);
    let first = timeout(WAIT, stream.next()).await.unwrap();
    assert!(first.unwrap().unwrap_err().is_cancelled());
}

#[tokio::test]
async fn token_aware_callbacks_get_an_independent_child() {
    let (future, promise) = new::<u32>();
    let parent = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    future.on_success_with_token(&parent, move |scope, value| {
        let _ = tx.send((scope, value));
    });
    promise.success(8);

    let (scope, value) = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(value, 8);

    // cancelling the callback's scope does not touch the registered token
    scope.cancel();
    assert!(!parent.is_cancelled());
}

#[tokio::test]
async fn futures_can_be_awaited_directly() {
    let future = ready("direct");
    assert_eq!(future.await.unwrap(), "direct");
}

#[tokio::test]
async fn try_result_never_blocks() {
    let (future, promise) = new::<u32>();
    assert!(future.try_result().is_none());
    promise.success(4);
    assert_eq!(future.try_result().unwrap().unwrap(), 4);
}
