//! Captcha handshake between the bot engine and a human.
//!
//! When the engine hits a picture captcha during login it calls
//! [`LoginSolver::solve_pic_captcha`] from a background task. The solver keeps
//! the challenge image, raises the captcha alert and suspends the caller until
//! the input surface calls [`CaptchaSolver::submit_answer`].
//!
//! ```text
//!   Idle --solve_pic_captcha--> AwaitingAnswer --submit_answer--> Idle
//!                                      |
//!                                      +------abandon----------> Idle
//! ```
//!
//! Only one picture challenge may be outstanding. A second one is rejected
//! with [`CaptchaError::AlreadyPending`] while the first keeps waiting.

use crate::notification::{Notification, NotificationId, Notifier};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Errors of the captcha handshake
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptchaError {
    /// A picture challenge is already waiting for an answer.
    #[error("a captcha request is already awaiting an answer")]
    AlreadyPending,
    /// An answer was submitted while nothing was waiting for one.
    #[error("no captcha request is awaiting an answer")]
    NoPendingRequest,
    /// The request was dropped before an answer arrived.
    #[error("captcha request was abandoned")]
    Abandoned,
    /// The captcha alert could not be published.
    #[error("failed to publish captcha alert: {0}")]
    Notify(String),
}

/// Login challenge resolution, as requested by the bot engine.
#[async_trait]
pub trait LoginSolver: Send + Sync {
    /// Answer a picture captcha.
    ///
    /// # Errors
    ///
    /// Returns a `CaptchaError` if the request cannot be raised or is abandoned.
    async fn solve_pic_captcha(&self, bot_id: u64, image: Bytes) -> Result<String, CaptchaError>;

    /// Answer a slider captcha.
    ///
    /// # Errors
    ///
    /// Implementations may fail the same way as `solve_pic_captcha`.
    async fn solve_slider_captcha(&self, bot_id: u64, url: &str) -> Result<String, CaptchaError>;

    /// Confirm a login from an unrecognised device.
    ///
    /// # Errors
    ///
    /// Implementations may fail the same way as `solve_pic_captcha`.
    async fn solve_unsafe_device_login_verify(
        &self,
        bot_id: u64,
        url: &str,
    ) -> Result<String, CaptchaError>;
}

enum CaptchaState {
    Idle,
    AwaitingAnswer {
        request_id: u64,
        bot_id: u64,
        image: Bytes,
        responder: oneshot::Sender<String>,
    },
}

impl CaptchaState {
    /// A waiting slot whose caller went away counts as idle.
    fn is_live(&self) -> bool {
        match self {
            Self::Idle => false,
            Self::AwaitingAnswer { responder, .. } => !responder.is_closed(),
        }
    }
}

struct Slot {
    state: CaptchaState,
    next_request_id: u64,
}

/// Single-slot captcha handshake backed by a notification alert.
pub struct CaptchaSolver {
    slot: Mutex<Slot>,
    notifier: Arc<dyn Notifier>,
}

impl CaptchaSolver {
    /// Create an idle solver that raises alerts through `notifier`.
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: CaptchaState::Idle,
                next_request_id: 0,
            }),
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a picture challenge is waiting for an answer.
    #[must_use]
    pub fn is_awaiting(&self) -> bool {
        self.lock().state.is_live()
    }

    /// Image of the challenge waiting for an answer, for the input surface to display.
    #[must_use]
    pub fn pending_challenge(&self) -> Option<Bytes> {
        let slot = self.lock();
        if !slot.state.is_live() {
            return None;
        }
        match &slot.state {
            CaptchaState::AwaitingAnswer { image, .. } => Some(image.clone()),
            CaptchaState::Idle => None,
        }
    }

    /// Resolve the waiting challenge with `answer`, waking its caller.
    ///
    /// # Errors
    ///
    /// Returns `NoPendingRequest` if nothing is waiting (including a second
    /// submit for an already answered request), or `Abandoned` if the caller
    /// stopped waiting in the meantime. The captcha alert is cleared either way.
    pub fn submit_answer(&self, answer: impl Into<String>) -> Result<(), CaptchaError> {
        let (bot_id, responder) = {
            let mut slot = self.lock();
            let previous = std::mem::replace(&mut slot.state, CaptchaState::Idle);
            let CaptchaState::AwaitingAnswer {
                bot_id, responder, ..
            } = previous
            else {
                return Err(CaptchaError::NoPendingRequest);
            };
            // Cleared under the lock and before the caller wakes, so a follow-up
            // request always raises its alert after this cancel.
            self.clear_alert();
            (bot_id, responder)
        };

        responder
            .send(answer.into())
            .map_err(|_| CaptchaError::Abandoned)?;
        info!(bot_id, "Captcha answer submitted");
        Ok(())
    }

    /// Drop the waiting challenge; its caller returns `CaptchaError::Abandoned`.
    ///
    /// Returns whether a live request was dropped.
    pub fn abandon(&self) -> bool {
        let (previous, was_live) = {
            let mut slot = self.lock();
            let previous = std::mem::replace(&mut slot.state, CaptchaState::Idle);
            let was_live = previous.is_live();
            if matches!(previous, CaptchaState::AwaitingAnswer { .. }) {
                self.clear_alert();
            }
            (previous, was_live)
        };
        // Dropping the responder wakes the caller with `Abandoned`.
        drop(previous);
        if was_live {
            info!("Pending captcha request abandoned");
        }
        was_live
    }

    fn clear_alert(&self) {
        if let Err(e) = self.notifier.cancel(NotificationId::CAPTCHA) {
            warn!(error = %e, "Failed to clear captcha alert");
        }
    }

    fn begin(
        &self,
        bot_id: u64,
        image: Bytes,
    ) -> Result<(u64, oneshot::Receiver<String>), CaptchaError> {
        let mut slot = self.lock();
        if slot.state.is_live() {
            return Err(CaptchaError::AlreadyPending);
        }

        let request_id = slot.next_request_id;
        slot.next_request_id = slot.next_request_id.wrapping_add(1);

        let (responder, receiver) = oneshot::channel();
        slot.state = CaptchaState::AwaitingAnswer {
            request_id,
            bot_id,
            image,
            responder,
        };
        Ok((request_id, receiver))
    }

    fn rollback(&self, request_id: u64) {
        let mut slot = self.lock();
        if matches!(&slot.state, CaptchaState::AwaitingAnswer { request_id: current, .. } if *current == request_id)
        {
            slot.state = CaptchaState::Idle;
        }
    }
}

#[async_trait]
impl LoginSolver for CaptchaSolver {
    async fn solve_pic_captcha(&self, bot_id: u64, image: Bytes) -> Result<String, CaptchaError> {
        let (request_id, receiver) = self.begin(bot_id, image)?;
        info!(bot_id, request_id, "Captcha requested, waiting for answer");

        if let Err(e) = self.notifier.notify(Notification::captcha_alert()) {
            self.rollback(request_id);
            return Err(CaptchaError::Notify(e.to_string()));
        }

        receiver.await.map_err(|_| CaptchaError::Abandoned)
    }

    async fn solve_slider_captcha(&self, _bot_id: u64, _url: &str) -> Result<String, CaptchaError> {
        Ok(String::new())
    }

    async fn solve_unsafe_device_login_verify(
        &self,
        _bot_id: u64,
        _url: &str,
    ) -> Result<String, CaptchaError> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{MockNotifier, NotificationChannel};
    use std::time::Duration;

    /// Records calls as `notify #N` / `cancel #N`; `cancel` is slow, like a real host.
    #[derive(Default)]
    struct SlowCancelNotifier {
        calls: Mutex<Vec<String>>,
    }

    impl SlowCancelNotifier {
        fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn notify_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|call| call.starts_with("notify"))
                .count()
        }
    }

    impl Notifier for SlowCancelNotifier {
        fn notify(&self, notification: Notification) -> anyhow::Result<()> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(format!("notify {}", notification.id));
            Ok(())
        }

        fn cancel(&self, id: NotificationId) -> anyhow::Result<()> {
            std::thread::sleep(Duration::from_millis(50));
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(format!("cancel {id}"));
            Ok(())
        }
    }

    fn accepting_notifier() -> MockNotifier {
        let mut mock = MockNotifier::new();
        mock.expect_notify()
            .withf(|n| n.channel == NotificationChannel::Captcha)
            .returning(|_| Ok(()));
        mock.expect_cancel()
            .withf(|id| *id == NotificationId::CAPTCHA)
            .returning(|_| Ok(()));
        mock
    }

    async fn wait_until_awaiting(solver: &CaptchaSolver) {
        while !solver.is_awaiting() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn submitted_answer_is_returned() {
        let solver = Arc::new(CaptchaSolver::new(Arc::new(accepting_notifier())));
        let waiter = {
            let solver = Arc::clone(&solver);
            tokio::spawn(async move {
                solver
                    .solve_pic_captcha(1, Bytes::from_static(b"img"))
                    .await
            })
        };

        wait_until_awaiting(&solver).await;
        assert_eq!(solver.pending_challenge(), Some(Bytes::from_static(b"img")));
        assert_eq!(solver.submit_answer("1234"), Ok(()));

        let answer = match waiter.await {
            Ok(answer) => answer,
            Err(err) => panic!("captcha task failed: {err}"),
        };
        assert_eq!(answer, Ok("1234".to_string()));
        assert!(!solver.is_awaiting());
        assert_eq!(solver.pending_challenge(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn request_does_not_return_before_answer() {
        let solver = Arc::new(CaptchaSolver::new(Arc::new(accepting_notifier())));
        let request = solver.solve_pic_captcha(1, Bytes::from_static(b"img"));
        let timed = tokio::time::timeout(Duration::from_secs(3600), request).await;
        assert!(timed.is_err(), "request resolved without an answer");
    }

    #[tokio::test]
    async fn second_request_is_rejected() {
        let solver = Arc::new(CaptchaSolver::new(Arc::new(accepting_notifier())));
        let first = {
            let solver = Arc::clone(&solver);
            tokio::spawn(async move { solver.solve_pic_captcha(1, Bytes::from_static(b"a")).await })
        };
        wait_until_awaiting(&solver).await;

        let second = solver.solve_pic_captcha(1, Bytes::from_static(b"b")).await;
        assert_eq!(second, Err(CaptchaError::AlreadyPending));
        assert_eq!(solver.pending_challenge(), Some(Bytes::from_static(b"a")));

        assert_eq!(solver.submit_answer("abcd"), Ok(()));
        match first.await {
            Ok(answer) => assert_eq!(answer, Ok("abcd".to_string())),
            Err(err) => panic!("captcha task failed: {err}"),
        }
    }

    #[test]
    fn test_submit_without_request() {
        let solver = CaptchaSolver::new(Arc::new(MockNotifier::new()));
        assert_eq!(solver.submit_answer("x"), Err(CaptchaError::NoPendingRequest));
    }

    #[tokio::test]
    async fn double_submit_is_rejected() {
        let solver = Arc::new(CaptchaSolver::new(Arc::new(accepting_notifier())));
        let waiter = {
            let solver = Arc::clone(&solver);
            tokio::spawn(async move { solver.solve_pic_captcha(1, Bytes::new()).await })
        };
        wait_until_awaiting(&solver).await;

        assert_eq!(solver.submit_answer("one"), Ok(()));
        assert_eq!(solver.submit_answer("two"), Err(CaptchaError::NoPendingRequest));
        match waiter.await {
            Ok(answer) => assert_eq!(answer, Ok("one".to_string())),
            Err(err) => panic!("captcha task failed: {err}"),
        }
    }

    #[tokio::test]
    async fn abandon_wakes_caller() {
        let solver = Arc::new(CaptchaSolver::new(Arc::new(accepting_notifier())));
        let waiter = {
            let solver = Arc::clone(&solver);
            tokio::spawn(async move { solver.solve_pic_captcha(1, Bytes::new()).await })
        };
        wait_until_awaiting(&solver).await;

        assert!(solver.abandon());
        match waiter.await {
            Ok(answer) => assert_eq!(answer, Err(CaptchaError::Abandoned)),
            Err(err) => panic!("captcha task failed: {err}"),
        }
        assert!(!solver.abandon());
    }

    #[tokio::test]
    async fn dropped_caller_frees_the_slot() {
        let solver = Arc::new(CaptchaSolver::new(Arc::new(accepting_notifier())));
        let waiter = {
            let solver = Arc::clone(&solver);
            tokio::spawn(async move { solver.solve_pic_captcha(1, Bytes::new()).await })
        };
        wait_until_awaiting(&solver).await;
        waiter.abort();
        let _ = waiter.await;

        assert!(!solver.is_awaiting());
        let next = {
            let solver = Arc::clone(&solver);
            tokio::spawn(async move { solver.solve_pic_captcha(1, Bytes::new()).await })
        };
        wait_until_awaiting(&solver).await;
        assert_eq!(solver.submit_answer("ok"), Ok(()));
        match next.await {
            Ok(answer) => assert_eq!(answer, Ok("ok".to_string())),
            Err(err) => panic!("captcha task failed: {err}"),
        }
    }

    #[tokio::test]
    async fn notify_failure_rolls_back() {
        let mut mock = MockNotifier::new();
        mock.expect_notify()
            .returning(|_| Err(anyhow::anyhow!("notifications disabled")));
        let solver = CaptchaSolver::new(Arc::new(mock));

        let result = solver.solve_pic_captcha(1, Bytes::new()).await;
        assert!(matches!(result, Err(CaptchaError::Notify(_))));
        assert!(!solver.is_awaiting());
    }

    #[tokio::test]
    async fn unsupported_challenges_return_empty() {
        // No expectations: the mock panics if either call touches the notifier.
        let solver = CaptchaSolver::new(Arc::new(MockNotifier::new()));
        assert_eq!(
            solver.solve_slider_captcha(1, "https://example.com/slider").await,
            Ok(String::new())
        );
        assert_eq!(
            solver
                .solve_unsafe_device_login_verify(1, "https://example.com/verify")
                .await,
            Ok(String::new())
        );
        assert!(!solver.is_awaiting());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn follow_up_challenge_keeps_its_alert() {
        let notifier = Arc::new(SlowCancelNotifier::default());
        let solver = Arc::new(CaptchaSolver::new(notifier.clone()));

        // The engine asks again as soon as its first answer comes back.
        let engine = {
            let solver = Arc::clone(&solver);
            tokio::spawn(async move {
                let first = solver.solve_pic_captcha(1, Bytes::from_static(b"one")).await;
                let second = solver.solve_pic_captcha(1, Bytes::from_static(b"two")).await;
                (first, second)
            })
        };

        while notifier.notify_count() < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(solver.submit_answer("wrong"), Ok(()));

        while notifier.notify_count() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(solver.pending_challenge(), Some(Bytes::from_static(b"two")));
        assert_eq!(
            notifier.calls(),
            vec!["notify #2", "cancel #2", "notify #2"],
            "the second challenge's alert must stay up"
        );

        assert_eq!(solver.submit_answer("right"), Ok(()));
        match engine.await {
            Ok((first, second)) => {
                assert_eq!(first, Ok("wrong".to_string()));
                assert_eq!(second, Ok("right".to_string()));
            }
            Err(err) => panic!("engine task failed: {err}"),
        }
        assert_eq!(notifier.calls().last().map(String::as_str), Some("cancel #2"));
    }

    #[tokio::test]
    async fn answer_for_dropped_caller_clears_alert() {
        let notifier = Arc::new(SlowCancelNotifier::default());
        let solver = Arc::new(CaptchaSolver::new(notifier.clone()));
        let waiter = {
            let solver = Arc::clone(&solver);
            tokio::spawn(async move { solver.solve_pic_captcha(1, Bytes::new()).await })
        };
        wait_until_awaiting(&solver).await;
        waiter.abort();
        let _ = waiter.await;

        assert_eq!(solver.submit_answer("late"), Err(CaptchaError::Abandoned));
        assert_eq!(notifier.calls(), vec!["notify #2", "cancel #2"]);
    }
}
