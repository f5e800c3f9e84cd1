//! Bridges [`super::Future`] onto `futures::Future`, behind the `async`
//! Cargo feature. Not required by the blocking `get()`/`wait()` API; this is
//! for callers who want to `.await` a task result from `async fn` code,
//! mirroring `tarantool-module`'s own separate `fiber::r#async` module
//! rather than baking polling support into the core type unconditionally.

use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::Result;
use crate::future::promise::Future as TaskFuture;

impl<T> std::future::Future for TaskFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.poll_state(cx.waker())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::promise::channel;

    #[test]
    fn ready_future_polls_ready_immediately() {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);
        let (promise, mut future) = channel::<u32>();
        promise.set_value(5);
        let pinned = Pin::new(&mut future);
        assert!(matches!(pinned.poll(&mut cx), Poll::Ready(Ok(5))));
    }
}
