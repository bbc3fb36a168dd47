// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use crate::Clock;
use crate::clock::ClockState;

/// A future that completes once `duration` has passed on a [`Clock`].
///
/// Created by [`Clock::delay`]. Nothing is scheduled until the future is first polled, and
/// dropping the future cancels the wait.
#[derive(Debug)]
pub struct Delay {
    clock: Clock,
    duration: Duration,
    state: DelayState,
}

#[derive(Debug)]
enum DelayState {
    Idle,
    System(Pin<Box<tokio::time::Sleep>>),
    #[cfg(any(feature = "test-util", test))]
    Controlled(crate::timers::TimerKey),
    Done,
}

impl Delay {
    /// Creates a delay measured against `clock`.
    #[must_use]
    pub fn new(clock: &Clock, duration: Duration) -> Self {
        Self {
            clock: clock.clone(),
            duration,
            state: DelayState::Idle,
        }
    }

    /// The duration this delay waits for.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn start(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        if self.duration == Duration::ZERO {
            self.state = DelayState::Done;
            return Poll::Ready(());
        }

        match self.clock.state() {
            ClockState::System { .. } => {
                let mut sleep = Box::pin(tokio::time::sleep(self.duration));
                let poll = sleep.as_mut().poll(cx);
                self.state = if poll.is_ready() { DelayState::Done } else { DelayState::System(sleep) };
                poll
            }
            #[cfg(any(feature = "test-util", test))]
            ClockState::ClockControl(control) => {
                let Some(deadline) = control.instant().checked_add(self.duration) else {
                    // Past the representable range; this delay never completes.
                    self.duration = Duration::MAX;
                    return Poll::Pending;
                };

                let key = control.register_timer(deadline, cx.waker().clone());
                self.state = DelayState::Controlled(key);
                Poll::Pending
            }
        }
    }
}

impl Future for Delay {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        match &mut this.state {
            DelayState::Idle if this.duration == Duration::MAX => Poll::Pending,
            DelayState::Idle => this.start(cx),
            DelayState::System(sleep) => {
                let poll = sleep.as_mut().poll(cx);
                if poll.is_ready() {
                    this.state = DelayState::Done;
                }
                poll
            }
            #[cfg(any(feature = "test-util", test))]
            DelayState::Controlled(key) => {
                let key = *key;

                if key.deadline() <= this.clock.instant() {
                    if let ClockState::ClockControl(control) = this.clock.state() {
                        control.unregister_timer(key);
                    }
                    this.state = DelayState::Done;
                    Poll::Ready(())
                } else {
                    Poll::Pending
                }
            }
            DelayState::Done => Poll::Ready(()),
        }
    }
}

impl Drop for Delay {
    fn drop(&mut self) {
        #[cfg(any(feature = "test-util", test))]
        if let (DelayState::Controlled(key), ClockState::ClockControl(control)) = (&self.state, self.clock.state()) {
            control.unregister_timer(*key);
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::task::Waker;

    use super::*;
    use crate::ClockControl;

    fn poll_delay(delay: &mut Delay) -> Poll<()> {
        let mut cx = Context::from_waker(Waker::noop());
        Pin::new(delay).poll(&mut cx)
    }

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Delay: Send, Unpin);
    }

    #[tokio::test]
    async fn system_delay_waits() {
        let clock = Clock::new_system();
        let stopwatch = clock.stopwatch();

        clock.delay(Duration::from_millis(5)).await;

        assert!(stopwatch.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn controlled_delay_completes_after_advance() {
        let control = ClockControl::new();
        let clock = control.to_clock();
        let mut delay = clock.delay(Duration::from_millis(10));

        assert_eq!(poll_delay(&mut delay), Poll::Pending);
        assert_eq!(control.timers_len(), 1);

        control.advance(Duration::from_millis(5));
        assert_eq!(poll_delay(&mut delay), Poll::Pending);

        control.advance(Duration::from_millis(5));
        assert_eq!(poll_delay(&mut delay), Poll::Ready(()));
        assert_eq!(control.timers_len(), 0);
    }

    #[test]
    fn zero_delay_is_ready() {
        let clock = Clock::new_frozen();
        let mut delay = clock.delay(Duration::ZERO);

        assert_eq!(poll_delay(&mut delay), Poll::Ready(()));
    }

    #[test]
    fn drop_unregisters_timer() {
        let control = ClockControl::new();
        let clock = control.to_clock();
        let mut delay = clock.delay(Duration::from_secs(1));

        assert_eq!(poll_delay(&mut delay), Poll::Pending);
        assert_eq!(control.timers_len(), 1);

        drop(delay);
        assert_eq!(control.timers_len(), 0);
    }

    #[test]
    fn auto_advance_completes_delay() {
        futures::executor::block_on(async {
            let clock = ClockControl::new().auto_advance_timers(true).to_clock();

            clock.delay(Duration::from_secs(5)).await;

            assert_eq!(clock.elapsed(), Duration::from_secs(5));
        });
    }
}
