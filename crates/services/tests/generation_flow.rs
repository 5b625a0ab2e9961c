use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use services::{
    GenerationError, GenerationRequest, OrchestratorConfig, PageState, QuestionGenerator,
    QuestionOrchestrator, SessionStore,
};
use storage::repository::InMemoryRepository;
use study_core::model::{Difficulty, QuestionDraft, QuestionKind, QuestionRange, SourceKind};
use study_core::reducer::Action;

/// Generator whose latency, shortfalls and failures are scripted per page.
#[derive(Default)]
struct ScriptedGenerator {
    calls: Mutex<Vec<GenerationRequest>>,
    delays: HashMap<u32, Duration>,
    short_once: Mutex<HashMap<u32, usize>>,
    failures: Mutex<HashMap<u32, u32>>,
    include_shared: bool,
    malformed_page: Option<u32>,
}

impl ScriptedGenerator {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl QuestionGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };
        if let Some(delay) = self.delays.get(&request.page) {
            tokio::time::sleep(*delay).await;
        }

        let page = request.page;
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&page) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(GenerationError::HttpStatus {
                        status: 500,
                        message: "upstream unavailable".into(),
                    });
                }
            }
        }

        if self.malformed_page == Some(page) {
            return Ok(vec![QuestionDraft::new(
                "bad",
                QuestionKind::MultipleChoice,
                "No options?",
                "A",
                Difficulty::Easy,
            )]);
        }

        let count = self
            .short_once
            .lock()
            .unwrap()
            .remove(&page)
            .unwrap_or(request.items_per_page as usize + 2);

        let mut drafts = Vec::new();
        if self.include_shared {
            drafts.push(QuestionDraft::new(
                "shared",
                QuestionKind::TrueFalse,
                "Shared question",
                "True",
                Difficulty::Easy,
            ));
        }
        drafts.extend((0..count).map(|i| {
            QuestionDraft::new(
                format!("p{page}-c{call}-{i}"),
                QuestionKind::ShortAnswer,
                format!("Page {page} question {i}"),
                "answer",
                Difficulty::Medium,
            )
        }));
        Ok(drafts)
    }
}

/// Returns drafts without ids; the first request comes back short.
#[derive(Default)]
struct AnonymousGenerator {
    calls: Mutex<u32>,
}

#[async_trait]
impl QuestionGenerator for AnonymousGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        let count = if call == 1 { 3 } else { request.items_per_page };
        Ok((0..count)
            .map(|i| {
                QuestionDraft::new(
                    "",
                    QuestionKind::ShortAnswer,
                    format!("Call {call} question {i}"),
                    "answer",
                    Difficulty::Easy,
                )
            })
            .collect())
    }
}

async fn ready_store(min: u32, max: u32) -> SessionStore {
    let store = SessionStore::new(Arc::new(InMemoryRepository::new()));
    store.hydrate().await;
    store.dispatch(Action::SetSource(SourceKind::Text)).await;
    store
        .dispatch(Action::text_with_estimate("Mitochondria produce energy for the cell.", 200))
        .await;
    store
        .dispatch(Action::SetQuestionRange(QuestionRange::new(min, max).unwrap()))
        .await;
    store
}

fn orchestrator(store: &SessionStore, generator: Arc<ScriptedGenerator>) -> QuestionOrchestrator {
    QuestionOrchestrator::new(store.clone(), generator)
        .with_seed(11)
        .with_config(OrchestratorConfig {
            page_size: 10,
            ..OrchestratorConfig::default()
        })
}

fn page_of(prompt: &str) -> Option<u32> {
    prompt
        .strip_prefix("Page ")?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}

#[tokio::test(start_paused = true)]
async fn out_of_order_pages_assemble_in_page_order() {
    let store = ready_store(23, 23).await;
    let generator = Arc::new(ScriptedGenerator {
        delays: HashMap::from([
            (0, Duration::from_millis(300)),
            (1, Duration::from_millis(100)),
            (2, Duration::from_millis(0)),
        ]),
        include_shared: true,
        ..ScriptedGenerator::default()
    });
    let orchestrator = orchestrator(&store, generator.clone());

    let report = orchestrator.start().await.unwrap();
    assert_eq!(report.total, 23);
    assert_eq!(report.accumulated, 23);
    assert!(report.notices.is_empty());

    let session = store.snapshot();
    assert_eq!(session.questions().len(), 23);
    let ids: HashSet<_> = session.questions().iter().map(|q| q.id().clone()).collect();
    assert_eq!(ids.len(), 23);

    let pages: Vec<u32> = session
        .questions()
        .iter()
        .filter_map(|q| page_of(q.prompt()))
        .collect();
    assert!(pages.windows(2).all(|w| w[0] <= w[1]), "{pages:?}");
    assert_eq!(generator.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn degenerate_range_generates_exactly_that_many() {
    let store = ready_store(5, 5).await;
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = orchestrator(&store, generator.clone());

    orchestrator.start().await.unwrap();
    assert_eq!(store.snapshot().questions().len(), 5);
    let calls = generator.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].page, 0);
    assert_eq!(calls[0].items_per_page, 5);
    assert_eq!(calls[0].total_questions, 5);
}

#[tokio::test(start_paused = true)]
async fn partial_page_is_filled_on_submission() {
    let store = ready_store(20, 20).await;
    let generator = Arc::new(ScriptedGenerator {
        short_once: Mutex::new(HashMap::from([(1, 4)])),
        ..ScriptedGenerator::default()
    });
    let orchestrator = orchestrator(&store, generator.clone());

    let report = orchestrator.start().await.unwrap();
    assert_eq!(report.accumulated, 14);
    assert_eq!(report.notices.len(), 1);
    assert_eq!(report.notices[0].page, 1);

    let status = orchestrator.status().unwrap();
    assert_eq!(status.pages[1].state, PageState::Partial);
    assert_eq!(status.pages[1].filled, 4);

    let report = orchestrator.ensure_complete().await.unwrap();
    assert_eq!(report.accumulated, 20);
    assert_eq!(store.snapshot().questions().len(), 20);

    let calls = generator.calls.lock().unwrap().clone();
    let retry = calls.last().unwrap();
    assert_eq!(retry.page, 1);
    assert_eq!(retry.items_per_page, 6);
}

#[tokio::test(start_paused = true)]
async fn failed_page_is_retried_without_touching_merged_pages() {
    let store = ready_store(15, 15).await;
    let generator = Arc::new(ScriptedGenerator {
        failures: Mutex::new(HashMap::from([(0, 1)])),
        ..ScriptedGenerator::default()
    });
    let orchestrator = orchestrator(&store, generator.clone());

    let report = orchestrator.start().await.unwrap();
    assert_eq!(report.accumulated, 5);
    assert!(report.notices[0].message.contains("upstream unavailable"));
    assert!(matches!(
        orchestrator.status().unwrap().pages[0].state,
        PageState::Failed(_)
    ));
    let page_two: Vec<_> = store.snapshot().questions().to_vec();

    assert_eq!(orchestrator.generate_page(0).await.unwrap(), PageState::Generated);
    let session = store.snapshot();
    assert_eq!(session.questions().len(), 15);
    assert_eq!(&session.questions()[10..], page_two.as_slice());
}

#[tokio::test(start_paused = true)]
async fn persistent_failure_reports_incomplete() {
    let store = ready_store(12, 12).await;
    let generator = Arc::new(ScriptedGenerator {
        failures: Mutex::new(HashMap::from([(1, u32::MAX)])),
        ..ScriptedGenerator::default()
    });
    let orchestrator = orchestrator(&store, generator.clone());

    orchestrator.start().await.unwrap();
    let err = orchestrator.ensure_complete().await.unwrap_err();
    assert!(matches!(
        err,
        GenerationError::Incomplete {
            accumulated: 10,
            total: 12
        }
    ));
    assert_eq!(generator.call_count(), 2 + 3);
}

#[tokio::test(start_paused = true)]
async fn malformed_draft_fails_the_page() {
    let store = ready_store(5, 5).await;
    let generator = Arc::new(ScriptedGenerator {
        malformed_page: Some(0),
        ..ScriptedGenerator::default()
    });
    let orchestrator = orchestrator(&store, generator);

    let report = orchestrator.start().await.unwrap();
    assert_eq!(report.accumulated, 0);
    assert_eq!(report.notices.len(), 1);
    assert!(store.snapshot().questions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn generated_pages_are_not_requested_again() {
    let store = ready_store(10, 10).await;
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = orchestrator(&store, generator.clone());

    orchestrator.start().await.unwrap();
    assert_eq!(orchestrator.generate_page(0).await.unwrap(), PageState::Generated);
    orchestrator.ensure_complete().await.unwrap();
    assert_eq!(generator.call_count(), 1);

    assert!(matches!(
        orchestrator.generate_page(4).await,
        Err(GenerationError::InvalidPage { page: 4, pages: 1 })
    ));
}

#[tokio::test(start_paused = true)]
async fn new_text_discards_in_flight_pages() {
    let store = ready_store(10, 10).await;
    let generator = Arc::new(ScriptedGenerator {
        delays: HashMap::from([(0, Duration::from_secs(2))]),
        ..ScriptedGenerator::default()
    });
    let orchestrator = orchestrator(&store, generator);

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.start().await })
    };
    tokio::time::sleep(Duration::from_millis(500)).await;
    store
        .dispatch(Action::text_with_estimate("A different chapter entirely.", 200))
        .await;

    let result = running.await.unwrap();
    assert!(matches!(result, Err(GenerationError::Stale)));
    assert!(store.snapshot().questions().is_empty());
    assert!(orchestrator.status().is_none());
    assert!(matches!(
        orchestrator.ensure_complete().await,
        Err(GenerationError::NotStarted)
    ));
}

#[tokio::test]
async fn start_requires_text_and_range() {
    let store = SessionStore::new(Arc::new(InMemoryRepository::new()));
    let orchestrator = orchestrator(&store, Arc::new(ScriptedGenerator::default()));
    assert!(matches!(orchestrator.start().await, Err(GenerationError::MissingText)));

    store.dispatch(Action::text_with_estimate("Some text", 200)).await;
    assert!(matches!(orchestrator.start().await, Err(GenerationError::MissingRange)));
}

#[tokio::test(start_paused = true)]
async fn retried_page_without_ids_fills_up() {
    let store = ready_store(5, 5).await;
    let generator = Arc::new(AnonymousGenerator::default());
    let orchestrator = QuestionOrchestrator::new(store.clone(), generator.clone()).with_seed(3);

    let report = orchestrator.start().await.unwrap();
    assert_eq!(report.accumulated, 3);

    let report = orchestrator.ensure_complete().await.unwrap();
    assert_eq!(report.accumulated, 5);
    assert_eq!(*generator.calls.lock().unwrap(), 2);

    let ids: Vec<String> = store
        .snapshot()
        .questions()
        .iter()
        .map(|q| q.id().to_string())
        .collect();
    assert_eq!(ids, ["p1-q1", "p1-q2", "p1-q3", "p1-q4", "p1-q5"]);
}

#[tokio::test(start_paused = true)]
async fn cancel_forgets_the_run() {
    let store = ready_store(10, 10).await;
    let orchestrator = orchestrator(&store, Arc::new(ScriptedGenerator::default()));

    orchestrator.start().await.unwrap();
    assert!(orchestrator.status().is_some());

    orchestrator.cancel();
    assert!(orchestrator.status().is_none());
    assert!(matches!(
        orchestrator.generate_page(0).await,
        Err(GenerationError::NotStarted)
    ));
    assert_eq!(store.snapshot().questions().len(), 10);
}
