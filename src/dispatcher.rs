use crate::{
    config::Config,
    error::{LumiereError, Result},
    logger,
    models::{GenerationResult, ProviderFamily, SessionState},
    providers::{DeepInfraImages, ImageProvider, OpenAiImages},
    transport::{HttpTransport, ReqwestTransport},
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Lifecycle of a single generation attempt. Both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Idle,
    Requesting,
    Succeeded,
    Failed,
}

impl GenerationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationPhase::Succeeded | GenerationPhase::Failed)
    }
}

/// Turns a session snapshot into exactly one provider call.
#[derive(Clone)]
pub struct Dispatcher {
    openai: OpenAiImages,
    deepinfra: DeepInfraImages,
    transport: Arc<dyn HttpTransport>,
}

impl Dispatcher {
    pub fn new(config: &Config) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            openai: OpenAiImages::new(config.openai.clone()),
            deepinfra: DeepInfraImages::new(config.deepinfra.clone()),
            transport,
        }
    }

    pub fn provider(&self, family: ProviderFamily) -> &dyn ImageProvider {
        match family {
            ProviderFamily::OpenAi => &self.openai,
            ProviderFamily::DeepInfra => &self.deepinfra,
        }
    }

    /// Local checks that must pass before anything goes over the wire.
    pub fn validate(state: &SessionState) -> Result<()> {
        let model = state.model();
        if let Some(max) = model.max_prompt_chars() {
            let actual = state.prompt().chars().count();
            if actual > max {
                return Err(LumiereError::PromptTooLong { model, max, actual });
            }
        }
        Ok(())
    }

    pub async fn generate(&self, state: &SessionState) -> Result<GenerationResult> {
        let (phase, _) = watch::channel(GenerationPhase::Idle);
        self.generate_tracked(state, &phase).await
    }

    /// Runs the attempt on the tokio runtime so the caller can await or cancel it.
    pub fn spawn(&self, state: SessionState) -> GenerationTask {
        let phase = Arc::new(watch::channel(GenerationPhase::Idle).0);
        let receiver = phase.subscribe();
        let dispatcher = self.clone();
        let task_phase = Arc::clone(&phase);

        let handle =
            tokio::spawn(async move { dispatcher.generate_tracked(&state, &task_phase).await });

        GenerationTask {
            handle,
            phase,
            receiver,
        }
    }

    async fn generate_tracked(
        &self,
        state: &SessionState,
        phase: &watch::Sender<GenerationPhase>,
    ) -> Result<GenerationResult> {
        let request_id = Uuid::new_v4();
        let outcome = self.attempt(request_id, state, phase).await;

        match &outcome {
            Ok(result) => {
                log::info!(
                    "[req:{}] {} returned {} image(s)",
                    request_id,
                    result.model,
                    result.images.len()
                );
                phase.send_replace(GenerationPhase::Succeeded);
            }
            Err(e) => {
                log::error!("[req:{}] generation failed: {}", request_id, e);
                phase.send_replace(GenerationPhase::Failed);
            }
        }

        outcome
    }

    async fn attempt(
        &self,
        request_id: Uuid,
        state: &SessionState,
        phase: &watch::Sender<GenerationPhase>,
    ) -> Result<GenerationResult> {
        Self::validate(state)?;

        let model = state.model();
        let provider = self.provider(model.family());
        let request = provider.build_request(state)?;

        log::info!(
            "[req:{}] generating with {} via {} (prompt: {} chars, count: {}, size: {})",
            request_id,
            model,
            provider.name(),
            state.prompt().chars().count(),
            state.image_count(),
            state.image_size()
        );

        phase.send_replace(GenerationPhase::Requesting);
        let reply = {
            let _timer = logger::timer(&format!("{} request {}", provider.name(), request_id));
            self.transport.post_json(&request).await?
        };
        log::debug!("[req:{}] provider status {}", request_id, reply.status);

        let images = provider.parse_response(&reply)?;

        Ok(GenerationResult {
            request_id,
            model,
            images,
        })
    }
}

/// Handle to a spawned generation attempt.
pub struct GenerationTask {
    handle: JoinHandle<Result<GenerationResult>>,
    phase: Arc<watch::Sender<GenerationPhase>>,
    receiver: watch::Receiver<GenerationPhase>,
}

impl GenerationTask {
    pub fn phase(&self) -> GenerationPhase {
        *self.receiver.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationPhase> {
        self.receiver.clone()
    }

    /// Aborts the outbound call. An attempt that already finished keeps its outcome.
    pub fn cancel(&self) {
        self.handle.abort();
        self.phase.send_if_modified(|phase| {
            if phase.is_terminal() {
                false
            } else {
                *phase = GenerationPhase::Failed;
                true
            }
        });
    }

    pub async fn join(self) -> Result<GenerationResult> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(LumiereError::Cancelled),
            Err(e) => Err(LumiereError::GenerationFailed(format!(
                "generation task panicked: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageModel;
    use crate::transport::{HttpReply, ProviderRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingTransport {
        status: u16,
        body: String,
        delay: Option<Duration>,
        unreachable: bool,
        calls: AtomicUsize,
        last_request: Mutex<Option<ProviderRequest>>,
    }

    impl RecordingTransport {
        fn replying(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.to_string(),
                delay: None,
                unreachable: false,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                status: 200,
                body: r#"{"output":["late"]}"#.to_string(),
                delay: Some(delay),
                unreachable: false,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                status: 0,
                body: String::new(),
                delay: None,
                unreachable: true,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_body(&self) -> serde_json::Value {
            self.last_request
                .lock()
                .unwrap()
                .as_ref()
                .map(|request| request.body.clone())
                .unwrap()
        }
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn post_json(&self, request: &ProviderRequest) -> Result<HttpReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.unreachable {
                return Err(LumiereError::TransportError(
                    "connection refused".to_string(),
                ));
            }
            Ok(HttpReply {
                status: self.status,
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    fn dispatcher(transport: Arc<RecordingTransport>) -> Dispatcher {
        Dispatcher::with_transport(&Config::new(), transport)
    }

    #[tokio::test]
    async fn test_long_prompt_rejected_without_call() {
        let transport = RecordingTransport::replying(200, r#"{"data":[{"url":"x"}]}"#);
        let dispatcher = dispatcher(transport.clone());

        let state = SessionState::new().with_prompt("a".repeat(1001));
        match dispatcher.generate(&state).await {
            Err(LumiereError::PromptTooLong { max, actual, .. }) => {
                assert_eq!(max, 1000);
                assert_eq!(actual, 1001);
            }
            other => panic!("expected PromptTooLong, got {:?}", other),
        }

        let state = SessionState::new()
            .with_model(ImageModel::DallE3)
            .with_prompt("a".repeat(4001));
        match dispatcher.generate(&state).await {
            Err(LumiereError::PromptTooLong { max, .. }) => assert_eq!(max, 4000),
            other => panic!("expected PromptTooLong, got {:?}", other),
        }

        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_limits_are_inclusive_and_count_characters() {
        let transport = RecordingTransport::replying(200, r#"{"data":[{"url":"x"}]}"#);
        let dispatcher = dispatcher(transport.clone());

        let state = SessionState::new()
            .with_model(ImageModel::DallE3)
            .with_prompt("a".repeat(1500));
        assert!(dispatcher.generate(&state).await.is_ok());

        // 1000 otters are 4000 bytes but 1000 characters.
        let state = SessionState::new().with_prompt("🦦".repeat(1000));
        assert!(dispatcher.generate(&state).await.is_ok());

        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_sdxl_has_no_prompt_cap() {
        let transport = RecordingTransport::replying(200, r#"{"output":["x"]}"#);
        let dispatcher = dispatcher(transport.clone());
        let state = SessionState::new()
            .with_model(ImageModel::Sdxl)
            .with_prompt("a".repeat(5000));
        assert!(dispatcher.generate(&state).await.is_ok());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_openai_success_maps_urls_in_order() {
        let transport =
            RecordingTransport::replying(200, r#"{"data":[{"url":"x"},{"url":"y"}]}"#);
        let dispatcher = dispatcher(transport.clone());

        let result = dispatcher.generate(&SessionState::new()).await.unwrap();
        assert_eq!(result.images, vec!["x", "y"]);
        assert_eq!(result.model, ImageModel::DallE2);
        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.last_body()["n"], 4);
    }

    #[tokio::test]
    async fn test_dalle3_sends_single_image() {
        let transport = RecordingTransport::replying(200, r#"{"data":[{"url":"x"}]}"#);
        let dispatcher = dispatcher(transport.clone());
        let state = SessionState::new()
            .with_model(ImageModel::DallE3)
            .with_image_count(4);
        dispatcher.generate(&state).await.unwrap();
        assert_eq!(transport.last_body()["n"], 1);
    }

    #[tokio::test]
    async fn test_sdxl_success_and_fixed_dimensions() {
        let transport = RecordingTransport::replying(200, r#"{"output":["x","y","z"]}"#);
        let dispatcher = dispatcher(transport.clone());
        let state = SessionState::new()
            .with_model(ImageModel::Sdxl)
            .with_image_count(3)
            .with_image_size("256x256");

        let result = dispatcher.generate(&state).await.unwrap();
        assert_eq!(result.images, vec!["x", "y", "z"]);
        let body = transport.last_body();
        assert_eq!(body["input"]["width"], 1024);
        assert_eq!(body["input"]["height"], 1024);
        assert_eq!(body["input"]["num_outputs"], 3);
    }

    #[tokio::test]
    async fn test_failures_yield_no_images() {
        let cases = [
            (ImageModel::DallE2, 500, r#"{"data":[{"url":"x"}]}"#),
            (ImageModel::DallE2, 200, r#"{"data":[]}"#),
            (ImageModel::Sdxl, 500, r#"{"output":["x"]}"#),
            (ImageModel::Sdxl, 200, r#"{"output":[]}"#),
        ];

        for (model, status, body) in cases {
            let transport = RecordingTransport::replying(status, body);
            let dispatcher = dispatcher(transport.clone());
            let outcome = dispatcher
                .generate(&SessionState::new().with_model(model))
                .await;
            let err = outcome.expect_err("expected a failure");
            assert!(matches!(
                err,
                LumiereError::GenerationFailed(_) | LumiereError::NoImagesReturned
            ));
            assert_eq!(transport.calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_transport_error_is_a_generic_failure() {
        for model in ImageModel::ALL {
            let transport = RecordingTransport::unreachable();
            let dispatcher = dispatcher(transport.clone());
            let err = dispatcher
                .generate(&SessionState::new().with_model(model))
                .await
                .expect_err("expected a transport failure");

            assert!(matches!(err, LumiereError::TransportError(_)));
            assert_eq!(err.kind(), crate::error::ErrorKind::Provider);
            assert_eq!(
                err.user_message(),
                "Failed to generate the images, please try again."
            );
            assert_eq!(transport.calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_spawned_task_reports_phases() {
        let transport = RecordingTransport::replying(200, r#"{"data":[{"url":"x"}]}"#);
        let dispatcher = dispatcher(transport);

        let task = dispatcher.spawn(SessionState::new());
        let mut phases = task.subscribe();
        let result = task.join().await.unwrap();
        assert_eq!(result.images, vec!["x"]);
        assert_eq!(*phases.borrow_and_update(), GenerationPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_validation_failure_marks_task_failed() {
        let transport = RecordingTransport::replying(200, r#"{"data":[{"url":"x"}]}"#);
        let dispatcher = dispatcher(transport.clone());

        let task = dispatcher.spawn(SessionState::new().with_prompt("a".repeat(2000)));
        let phases = task.subscribe();
        assert!(matches!(
            task.join().await,
            Err(LumiereError::PromptTooLong { .. })
        ));
        assert_eq!(*phases.borrow(), GenerationPhase::Failed);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_in_flight_request() {
        let transport = RecordingTransport::slow(Duration::from_secs(30));
        let dispatcher = dispatcher(transport.clone());

        let task = dispatcher.spawn(SessionState::new().with_model(ImageModel::Sdxl));
        let mut phases = task.subscribe();
        phases
            .wait_for(|phase| *phase == GenerationPhase::Requesting)
            .await
            .unwrap();

        task.cancel();
        assert_eq!(task.phase(), GenerationPhase::Failed);
        assert!(matches!(task.join().await, Err(LumiereError::Cancelled)));
        assert_eq!(transport.calls(), 1);
    }
}
