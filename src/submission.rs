//! The submission handler: one form in, one rendered score or error notice out.
//!
//! Lifecycle of an attempt: `Idle -> Loading -> {Success | Failure} -> Idle`.
//! `Loading` is entered synchronously inside [`SubmissionHandler::submit`];
//! `Idle` is re-entered by a drop guard owned by the spawned attempt, so the
//! loading indicator is hidden exactly once no matter how the attempt ends.

use reqwest::Url;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ClientError, FailureKind, Result};
use crate::events::{Subscription, Trigger};
use crate::form::{FormSnapshot, FormSource};
use crate::risk::{RiskFormatter, RiskResult};
use crate::transport::{HttpTransport, ScoringTransport};
use crate::ui::{ErrorNotice, ResultsView};

/// Terminal state of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Rendered { value: f64, text: String },
    Failed { kind: FailureKind },
}

impl SubmissionOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, SubmissionOutcome::Rendered { .. })
    }
}

/// Everything the handler needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub endpoint: Url,
    pub formatter: RiskFormatter,
    pub scroll_into_view: bool,
}

impl HandlerSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            endpoint: config.endpoint.resolve()?,
            formatter: config.display.formatter(),
            scroll_into_view: config.display.scroll_into_view,
        })
    }
}

/// Hides the loading indicator when dropped.
struct LoadingGuard {
    view: Arc<dyn ResultsView>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.view.set_loading(false);
    }
}

/// State shared by every attempt a handler spawns.
struct Shared {
    transport: Arc<dyn ScoringTransport>,
    view: Arc<dyn ResultsView>,
    settings: HandlerSettings,
    runtime: Handle,
}

pub struct SubmissionHandler {
    shared: Arc<Shared>,
}

impl SubmissionHandler {
    /// Attempts are spawned on `runtime`, so `submit` may be called from
    /// threads that are not part of it (e.g. a UI thread firing a trigger).
    pub fn new(
        transport: Arc<dyn ScoringTransport>,
        view: Arc<dyn ResultsView>,
        settings: HandlerSettings,
        runtime: Handle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                view,
                settings,
                runtime,
            }),
        }
    }

    /// Build a handler posting over HTTP as configured, spawning on `runtime`.
    pub fn from_config(
        config: &Config,
        view: Arc<dyn ResultsView>,
        runtime: Handle,
    ) -> Result<Self> {
        let settings = HandlerSettings::from_config(config)?;
        let transport = HttpTransport::new(config.endpoint.timeout())?;
        Ok(Self::new(Arc::new(transport), view, settings, runtime))
    }

    pub fn settings(&self) -> &HandlerSettings {
        &self.shared.settings
    }

    /// Start one submission attempt.
    ///
    /// Shows the loading indicator and encodes the form before returning;
    /// the request itself runs on the handler's runtime. Overlapping calls
    /// are independent attempts.
    pub fn submit(&self, form: &FormSnapshot) -> SubmissionHandle {
        let attempt = Uuid::new_v4();
        let shared = Arc::clone(&self.shared);

        shared.view.set_loading(true);
        let guard = LoadingGuard {
            view: Arc::clone(&shared.view),
        };
        let body = form.encode();

        let span = info_span!("submission", attempt = %attempt);
        let runtime = shared.runtime.clone();
        let task = runtime.spawn(
            async move {
                let _guard = guard;
                info!(fields = form_len(&body), "submission started");
                let result = match body {
                    Ok(body) => shared.request(body).await,
                    Err(e) => Err(e),
                };
                shared.finish(result)
            }
            .instrument(span),
        );

        SubmissionHandle { attempt, task }
    }

    /// Subscribe to `trigger`: each event snapshots `source` and submits it.
    ///
    /// Handles for dispatched attempts arrive on the returned receiver; it
    /// may be dropped if the caller does not need to wait on them.
    pub fn bind<E: 'static>(
        self: &Arc<Self>,
        trigger: &Trigger<E>,
        source: Arc<dyn FormSource>,
    ) -> (Subscription, mpsc::UnboundedReceiver<SubmissionHandle>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler = Arc::clone(self);
        let subscription = trigger.subscribe(move |_| {
            let handle = handler.submit(&source.snapshot());
            // Receiver gone: the attempt simply runs detached.
            let _ = tx.send(handle);
        });
        (subscription, rx)
    }
}

fn form_len(body: &Result<String>) -> usize {
    match body {
        Ok(b) if b.is_empty() => 0,
        Ok(b) => b.split('&').count(),
        Err(_) => 0,
    }
}

impl Shared {
    async fn request(&self, body: String) -> Result<RiskResult> {
        let endpoint = &self.settings.endpoint;
        debug!(url = %endpoint, bytes = body.len(), "posting form");

        let response = self.transport.post_form(endpoint, body).await?;
        if response.is_success() {
            debug!(status = response.status, "response received");
        } else {
            warn!(
                status = response.status,
                "scoring endpoint returned non-success status; parsing body anyway"
            );
        }

        RiskResult::from_body(&response.body)
    }

    fn finish(&self, result: Result<RiskResult>) -> SubmissionOutcome {
        match result {
            Ok(risk) => {
                let text = self.settings.formatter.render(risk.readmission_30d);
                self.view.set_result_text(&text);
                self.view.set_results_visible(true);
                if self.settings.scroll_into_view {
                    self.view.scroll_results_into_view();
                }
                info!(readmission_30d = risk.readmission_30d, "submission rendered");
                SubmissionOutcome::Rendered {
                    value: risk.readmission_30d,
                    text,
                }
            }
            Err(err) => {
                let kind = err.failure_kind();
                log_failure(&err, kind);
                self.view.append_error(ErrorNotice::default());
                SubmissionOutcome::Failed { kind }
            }
        }
    }
}

fn log_failure(err: &ClientError, kind: FailureKind) {
    error!(kind = %kind, error = %err, "submission failed");
}

/// Handle to a running attempt. Dropping it detaches the attempt.
#[derive(Debug)]
pub struct SubmissionHandle {
    attempt: Uuid,
    task: JoinHandle<SubmissionOutcome>,
}

impl SubmissionHandle {
    pub fn attempt(&self) -> Uuid {
        self.attempt
    }

    /// Wait for the attempt to finalize.
    pub async fn outcome(self) -> SubmissionOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(attempt = %self.attempt, error = %e, "submission task aborted");
                SubmissionOutcome::Failed {
                    kind: FailureKind::Aborted,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{LocaleStyle, NumberFormat};
    use crate::transport::TransportResponse;
    use crate::ui::MemoryView;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Replies once per call from a queue of canned results.
    struct Canned {
        replies: Mutex<Vec<Result<TransportResponse>>>,
        bodies: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(replies: Vec<Result<TransportResponse>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                bodies: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ScoringTransport for Canned {
        async fn post_form(&self, _url: &Url, body: String) -> Result<TransportResponse> {
            self.bodies.lock().unwrap().push(body);
            self.replies.lock().unwrap().remove(0)
        }
    }

    /// Holds the request open until the test releases it.
    struct Gate {
        release: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl ScoringTransport for Gate {
        async fn post_form(&self, _url: &Url, _body: String) -> Result<TransportResponse> {
            let rx = self.release.lock().unwrap().take().unwrap();
            let _ = rx.await;
            Ok(ok_body(r#"{"readmission_30d": 0.1}"#))
        }
    }

    fn ok_body(body: &str) -> TransportResponse {
        TransportResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
        }
    }

    fn settings(format: NumberFormat) -> HandlerSettings {
        HandlerSettings {
            endpoint: Url::parse("http://localhost:8080/calcula").unwrap(),
            formatter: RiskFormatter::new(format, LocaleStyle::default()),
            scroll_into_view: false,
        }
    }

    #[tokio::test]
    async fn loading_is_shown_before_submit_returns() {
        let (tx, rx) = oneshot::channel();
        let transport = Arc::new(Gate {
            release: Mutex::new(Some(rx)),
        });
        let view = Arc::new(MemoryView::new());
        let handler = SubmissionHandler::new(
            transport,
            view.clone(),
            settings(NumberFormat::Raw),
            Handle::current(),
        );

        let handle = handler.submit(&FormSnapshot::from_pairs([("idade", "71")]));
        let state = view.snapshot();
        assert!(state.loading);
        assert_eq!(state.loading_hidden, 0);

        tx.send(()).unwrap();
        assert!(handle.outcome().await.is_rendered());
        assert!(!view.snapshot().loading);
    }

    #[tokio::test]
    async fn encodes_form_as_request_body() {
        let transport = Canned::new(vec![Ok(ok_body(r#"{"readmission_30d": 0.5}"#))]);
        let view = Arc::new(MemoryView::new());
        let handler = SubmissionHandler::new(
            transport.clone(),
            view,
            settings(NumberFormat::Raw),
            Handle::current(),
        );

        let form = FormSnapshot::from_pairs([("idade", "71"), ("sexo", ""), ("cid", "I44.2")]);
        handler.submit(&form).outcome().await;

        assert_eq!(
            *transport.bodies.lock().unwrap(),
            vec!["idade=71&sexo=&cid=I44.2".to_string()]
        );
    }

    #[tokio::test]
    async fn non_success_status_with_valid_body_still_renders() {
        let transport = Canned::new(vec![Ok(TransportResponse {
            status: 500,
            body: br#"{"readmission_30d": 0.3}"#.to_vec(),
        })]);
        let view = Arc::new(MemoryView::new());
        let handler = SubmissionHandler::new(
            transport,
            view.clone(),
            settings(NumberFormat::Raw),
            Handle::current(),
        );

        let outcome = handler.submit(&FormSnapshot::new()).outcome().await;
        assert_eq!(
            outcome,
            SubmissionOutcome::Rendered {
                value: 0.3,
                text: "0.3".into()
            }
        );
        assert!(view.snapshot().results_visible);
    }

    #[tokio::test]
    async fn scroll_runs_only_on_success_when_enabled() {
        let transport = Canned::new(vec![
            Ok(ok_body(r#"{"readmission_30d": 0.3}"#)),
            Ok(ok_body("not json")),
        ]);
        let view = Arc::new(MemoryView::new());
        let mut s = settings(NumberFormat::Raw);
        s.scroll_into_view = true;
        let handler =
            SubmissionHandler::new(transport, view.clone(), s, Handle::current());

        handler.submit(&FormSnapshot::new()).outcome().await;
        handler.submit(&FormSnapshot::new()).outcome().await;

        assert_eq!(view.snapshot().scrolled, 1);
    }

    #[test]
    fn trigger_fired_off_runtime_spawns_on_captured_handle() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let transport = Canned::new(vec![Ok(ok_body(r#"{"readmission_30d": 0.25}"#))]);
        let view = Arc::new(MemoryView::new());
        let handler = Arc::new(SubmissionHandler::new(
            transport,
            view.clone(),
            settings(NumberFormat::Raw),
            runtime.handle().clone(),
        ));
        let trigger: Trigger<()> = Trigger::new();
        let (_subscription, mut dispatched) =
            handler.bind(&trigger, Arc::new(FormSnapshot::from_pairs([("idade", "71")])));

        // Plain OS thread with no runtime context, like a UI event loop.
        let fired = {
            let trigger = trigger.clone();
            std::thread::spawn(move || trigger.fire(&())).join().unwrap()
        };
        assert_eq!(fired, 1);

        let handle = dispatched.try_recv().unwrap();
        let outcome = runtime.block_on(handle.outcome());
        assert_eq!(
            outcome,
            SubmissionOutcome::Rendered {
                value: 0.25,
                text: "0.25".into()
            }
        );
        assert_eq!(view.snapshot().loading_hidden, 1);
    }

    #[test]
    fn form_len_counts_pairs() {
        assert_eq!(form_len(&Ok(String::new())), 0);
        assert_eq!(form_len(&Ok("a=1&b=".into())), 2);
    }
}
