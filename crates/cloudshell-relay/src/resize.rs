use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cloudshell_api::ConsoleClient;
use tokio::time::sleep;

use crate::geometry::WindowSize;

/// Debounce window before a resize request is sent.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(300);

/// Attempts per resize request before giving up.
pub const RESIZE_ATTEMPTS: u32 = 10;

/// Last-writer-wins gate for resize requests.
///
/// Each resize request bumps a per-session generation counter and captures
/// the new value. An attempt loop checks the counter before every try and
/// abandons silently once a newer request exists; the superseded HTTP call
/// already in flight is not cancelled, only its outcome ignored. At most one
/// request per debounce window reports success.
#[derive(Clone, Default)]
pub struct ResizeCoordinator {
    generation: Arc<AtomicU64>,
}

impl ResizeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new resize request and return its generation.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `generation` is still the newest request.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Run one debounced resize request against the control plane.
    ///
    /// Transient failures (503/504) retry with `1000 * attempt` ms of
    /// backoff; any other failure is logged and stops the loop. Errors are
    /// never propagated out of a resize attempt.
    pub async fn run(
        &self,
        client: &ConsoleClient,
        console_uri: &str,
        terminal_id: &str,
        generation: u64,
    ) {
        sleep(RESIZE_DEBOUNCE).await;

        for attempt in 1..=RESIZE_ATTEMPTS {
            if !self.is_current(generation) {
                return;
            }

            let size = WindowSize::current();
            let response = match client
                .resize_terminal(console_uri, terminal_id, size.cols, size.rows)
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    eprintln!("{err}");
                    return;
                }
            };

            if response.is_success() {
                return;
            }
            if response.is_transient() {
                sleep(Duration::from_millis(1000 * u64::from(attempt))).await;
                continue;
            }
            eprintln!("{}", response.error_message());
            return;
        }

        eprintln!("Failed to resize terminal.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ConsoleClient {
        ConsoleClient::new("test-token".to_string(), server.uri())
    }

    #[test]
    fn generations_are_monotonic_and_only_the_newest_is_current() {
        let coordinator = ResizeCoordinator::new();
        let first = coordinator.begin();
        let second = coordinator.begin();
        assert!(second > first);
        assert!(!coordinator.is_current(first));
        assert!(coordinator.is_current(second));
    }

    #[tokio::test]
    async fn a_superseded_resize_abandons_without_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/terminals/term-1/size$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let coordinator = ResizeCoordinator::new();
        let client = client_for(&server);
        let uri = server.uri();

        // Two resizes inside one debounce window: the first is superseded
        // before its debounce elapses and must stay silent.
        let first = coordinator.begin();
        let second = coordinator.begin();

        let older = {
            let coordinator = coordinator.clone();
            let client = client.clone();
            let uri = uri.clone();
            tokio::spawn(async move { coordinator.run(&client, &uri, "term-1", first).await })
        };
        let newer = {
            let coordinator = coordinator.clone();
            let client = client.clone();
            tokio::spawn(async move { coordinator.run(&client, &uri, "term-1", second).await })
        };

        older.await.unwrap();
        newer.await.unwrap();
        // The mock's expect(1) verifies only the newest request went out.
    }

    #[tokio::test]
    async fn transient_failures_retry_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/terminals/term-1/size$"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/terminals/term-1/size$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .with_priority(2)
            .mount(&server)
            .await;

        let coordinator = ResizeCoordinator::new();
        let generation = coordinator.begin();
        coordinator
            .run(&client_for(&server), &server.uri(), "term-1", generation)
            .await;
    }

    #[tokio::test]
    async fn non_transient_failures_stop_the_attempt_loop() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/terminals/term-1/size$"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "bad geometry" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let coordinator = ResizeCoordinator::new();
        let generation = coordinator.begin();
        coordinator
            .run(&client_for(&server), &server.uri(), "term-1", generation)
            .await;
        // expect(1) verifies the loop did not retry after the 400.
    }
}
