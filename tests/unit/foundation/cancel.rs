use std::time::Duration;

use super::*;

#[test]
fn cancel_is_sticky_and_shared_by_clones() {
    let token = CancelToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());
    clone.check("compose").unwrap();

    token.cancel();
    token.cancel();
    assert!(clone.is_cancelled());
    let err = clone.check("compose").unwrap_err();
    assert!(err.is_cancelled());
    assert!(err.to_string().contains("compose"));
}

#[tokio::test]
async fn cancelled_future_wakes_waiters() {
    let token = CancelToken::new();
    let waiter = {
        let token = token.clone();
        tokio::spawn(async move { token.cancelled().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();
    tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("waiter should wake")
        .unwrap();
}

#[tokio::test]
async fn cancelled_resolves_immediately_after_fire() {
    let token = CancelToken::new();
    token.cancel();
    tokio::time::timeout(Duration::from_millis(100), token.cancelled())
        .await
        .expect("already-fired token resolves");
}
