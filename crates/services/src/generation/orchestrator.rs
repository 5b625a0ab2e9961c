use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use rand::SeedableRng;
use rand::rngs::StdRng;
use study_core::model::{DEFAULT_PAGE_SIZE, Question, QuestionDraft, QuestionId, QuestionRange};
use study_core::reducer::Action;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::client::{GenerationRequest, QuestionGenerator};
use super::plan::GenerationPlan;
use crate::error::GenerationError;
use crate::store::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Pending,
    Loading,
    Generated,
    /// Merged, but fewer new questions than the page needs.
    Partial,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStatus {
    pub index: u32,
    pub capacity: u32,
    pub filled: u32,
    pub state: PageState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationStatus {
    pub total: u32,
    pub accumulated: u32,
    pub pages: Vec<PageStatus>,
}

impl GenerationStatus {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.accumulated >= self.total
    }
}

/// Transient, user-visible problem with one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationNotice {
    pub page: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    pub total: u32,
    pub accumulated: u32,
    pub notices: Vec<GenerationNotice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub page_size: u32,
    /// Polls spent waiting for pages loaded by another caller.
    pub poll_attempts: u32,
    /// First poll delay; doubles on every further poll.
    pub poll_base_delay: Duration,
    /// Retry rounds `ensure_complete` runs before giving up.
    pub max_attempts: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            poll_attempts: 5,
            poll_base_delay: Duration::from_millis(200),
            max_attempts: 3,
        }
    }
}

struct Slot {
    state: PageState,
    questions: Vec<Question>,
    /// Drafts received for this page so far, across every request.
    received: usize,
}

struct Run {
    epoch: u64,
    text: String,
    range: QuestionRange,
    plan: GenerationPlan,
    slots: Vec<Slot>,
}

impl Run {
    fn accumulated(&self) -> u32 {
        let count: usize = self.slots.iter().map(|slot| slot.questions.len()).sum();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn flatten(&self) -> Vec<Question> {
        self.slots
            .iter()
            .flat_map(|slot| slot.questions.iter().cloned())
            .collect()
    }

    fn status(&self) -> GenerationStatus {
        let pages = (0_u32..)
            .zip(&self.slots)
            .map(|(index, slot)| PageStatus {
                index,
                capacity: self.plan.page_capacity(index),
                filled: u32::try_from(slot.questions.len()).unwrap_or(u32::MAX),
                state: slot.state.clone(),
            })
            .collect();
        GenerationStatus {
            total: self.plan.total(),
            accumulated: self.accumulated(),
            pages,
        }
    }
}

/// Assembles a question set of randomized size from concurrently generated
/// pages.
///
/// Each page owns a slot; the session's question list is always the slots
/// flattened in page order, so arrival order never affects positions. Results
/// that arrive after the session moved on (new text, reset, regeneration) are
/// dropped.
#[derive(Clone)]
pub struct QuestionOrchestrator {
    store: SessionStore,
    generator: Arc<dyn QuestionGenerator>,
    config: OrchestratorConfig,
    run: Arc<Mutex<Option<Run>>>,
    merge_lock: Arc<AsyncMutex<()>>,
    rng: Arc<Mutex<StdRng>>,
}

impl QuestionOrchestrator {
    #[must_use]
    pub fn new(store: SessionStore, generator: Arc<dyn QuestionGenerator>) -> Self {
        Self {
            store,
            generator,
            config: OrchestratorConfig::default(),
            run: Arc::new(Mutex::new(None)),
            merge_lock: Arc::new(AsyncMutex::new(())),
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    #[must_use]
    pub fn config(&self) -> OrchestratorConfig {
        self.config
    }

    /// Progress of the current run, if any.
    #[must_use]
    pub fn status(&self) -> Option<GenerationStatus> {
        self.lock_run().as_ref().map(Run::status)
    }

    /// Draw a question count for the session's text and generate every page.
    ///
    /// Replaces any previous run.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::MissingText` or `MissingRange` when the session
    /// is not ready, and `Stale` when the session changes mid-run. Page
    /// failures are not errors; they appear as notices in the report.
    pub async fn start(&self) -> Result<GenerationReport, GenerationError> {
        let session = self.store.snapshot();
        let text = session.text().trim();
        if text.is_empty() {
            return Err(GenerationError::MissingText);
        }
        let range = session
            .question_range()
            .ok_or(GenerationError::MissingRange)?;

        let plan = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            GenerationPlan::draw(range, self.config.page_size, &mut *rng)
        };
        let epoch = session.epoch();
        let slots = (0..plan.page_count())
            .map(|_| Slot {
                state: PageState::Pending,
                questions: Vec::new(),
                received: 0,
            })
            .collect();
        *self.lock_run() = Some(Run {
            epoch,
            text: text.to_string(),
            range,
            plan,
            slots,
        });
        info!(
            total = plan.total(),
            pages = plan.page_count(),
            epoch,
            "starting question generation"
        );

        let pages: Vec<u32> = (0..plan.page_count()).collect();
        let notices = self.run_pages(epoch, &pages).await?;
        self.report(notices)
    }

    /// Generate a single page. Pages that are generated or already loading are
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns `NotStarted`, `InvalidPage`, or `Stale`.
    pub async fn generate_page(&self, index: u32) -> Result<PageState, GenerationError> {
        let epoch = self.current_epoch()?;
        self.run_pages(epoch, &[index]).await?;
        let guard = self.lock_run();
        let run = guard.as_ref().ok_or(GenerationError::NotStarted)?;
        run.slots
            .get(index as usize)
            .map(|slot| slot.state.clone())
            .ok_or(GenerationError::InvalidPage {
                page: index,
                pages: run.plan.page_count(),
            })
    }

    /// Make sure the full question count is available before submission.
    ///
    /// Waits for pages loading elsewhere, then regenerates every page that is
    /// not complete, for up to `max_attempts` rounds.
    ///
    /// # Errors
    ///
    /// Returns `Incomplete` when the count is still short after the last
    /// round, or `NotStarted` / `Stale`.
    pub async fn ensure_complete(&self) -> Result<GenerationReport, GenerationError> {
        let epoch = self.current_epoch()?;
        let mut notices = Vec::new();

        for attempt in 1..=self.config.max_attempts {
            if self.is_complete()? {
                break;
            }
            self.await_loading(epoch).await?;
            let retry = self.retryable_pages()?;
            if retry.is_empty() {
                continue;
            }
            debug!(attempt, pages = ?retry, "retrying incomplete pages");
            notices.extend(self.run_pages(epoch, &retry).await?);
        }

        let report = self.report(notices)?;
        if report.accumulated < report.total {
            warn!(
                accumulated = report.accumulated,
                total = report.total,
                "question generation incomplete"
            );
            return Err(GenerationError::Incomplete {
                accumulated: report.accumulated,
                total: report.total,
            });
        }
        Ok(report)
    }

    /// Forget the current run.
    pub fn cancel(&self) {
        *self.lock_run() = None;
    }

    async fn run_pages(
        &self,
        epoch: u64,
        pages: &[u32],
    ) -> Result<Vec<GenerationNotice>, GenerationError> {
        let mut in_flight = FuturesUnordered::new();
        for &index in pages {
            if let Some(request) = self.claim(epoch, index)? {
                let generator = Arc::clone(&self.generator);
                in_flight.push(async move { (index, generator.generate(request).await) });
            }
        }

        let mut notices = Vec::new();
        while let Some((index, result)) = in_flight.next().await {
            if let Some(notice) = self.merge(epoch, index, result).await? {
                notices.push(notice);
            }
        }
        Ok(notices)
    }

    /// Marks a page as loading and builds its request, or returns `None` when
    /// the page needs no work.
    fn claim(&self, epoch: u64, index: u32) -> Result<Option<GenerationRequest>, GenerationError> {
        self.check_epoch(epoch)?;
        let mut guard = self.lock_run();
        let run = guard.as_mut().ok_or(GenerationError::NotStarted)?;
        if run.epoch != epoch {
            return Err(GenerationError::Stale);
        }
        let pages = run.plan.page_count();
        let capacity = run.plan.page_capacity(index);
        let slot = run
            .slots
            .get_mut(index as usize)
            .ok_or(GenerationError::InvalidPage { page: index, pages })?;

        if matches!(slot.state, PageState::Generated | PageState::Loading) {
            return Ok(None);
        }
        slot.state = PageState::Loading;
        let filled = u32::try_from(slot.questions.len()).unwrap_or(u32::MAX);

        Ok(Some(GenerationRequest {
            text: run.text.clone(),
            question_range: run.range,
            page: index,
            items_per_page: capacity.saturating_sub(filled).max(1),
            total_questions: run.plan.total(),
        }))
    }

    async fn merge(
        &self,
        epoch: u64,
        index: u32,
        result: Result<Vec<QuestionDraft>, GenerationError>,
    ) -> Result<Option<GenerationNotice>, GenerationError> {
        let _merging = self.merge_lock.lock().await;
        if let Err(err) = self.check_epoch(epoch) {
            info!(page = index, "discarding generated page for a stale session");
            return Err(err);
        }

        let (questions, notice) = {
            let mut guard = self.lock_run();
            let run = guard.as_mut().ok_or(GenerationError::Stale)?;
            if run.epoch != epoch || index as usize >= run.slots.len() {
                return Err(GenerationError::Stale);
            }
            let validated = result.and_then(|drafts| {
                let slot = &mut run.slots[index as usize];
                let offset = slot.received;
                slot.received += drafts.len();
                validate_page(index, offset, drafts)
            });
            match validated {
                Ok(questions) => {
                    let notice = merge_into(run, index, questions);
                    (Some(run.flatten()), notice)
                }
                Err(err) => {
                    let message = err.to_string();
                    warn!(page = index, error = %message, "question page failed");
                    run.slots[index as usize].state = PageState::Failed(message.clone());
                    (
                        None,
                        Some(GenerationNotice {
                            page: index,
                            message,
                        }),
                    )
                }
            }
        };

        if let Some(questions) = questions {
            self.store
                .dispatch(Action::ApplyGeneratedQuestions { epoch, questions })
                .await;
        }
        Ok(notice)
    }

    async fn await_loading(&self, epoch: u64) -> Result<(), GenerationError> {
        let mut delay = self.config.poll_base_delay;
        for _ in 0..self.config.poll_attempts {
            self.check_epoch(epoch)?;
            let loading = {
                let guard = self.lock_run();
                let run = guard.as_ref().ok_or(GenerationError::NotStarted)?;
                run.slots
                    .iter()
                    .any(|slot| slot.state == PageState::Loading)
            };
            if !loading {
                return Ok(());
            }
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
        Ok(())
    }

    fn retryable_pages(&self) -> Result<Vec<u32>, GenerationError> {
        let guard = self.lock_run();
        let run = guard.as_ref().ok_or(GenerationError::NotStarted)?;
        Ok((0_u32..)
            .zip(&run.slots)
            .filter(|(_, slot)| {
                !matches!(slot.state, PageState::Generated | PageState::Loading)
            })
            .map(|(index, _)| index)
            .collect())
    }

    fn is_complete(&self) -> Result<bool, GenerationError> {
        self.status()
            .map(|status| status.is_complete())
            .ok_or(GenerationError::NotStarted)
    }

    fn report(&self, notices: Vec<GenerationNotice>) -> Result<GenerationReport, GenerationError> {
        let status = self.status().ok_or(GenerationError::NotStarted)?;
        Ok(GenerationReport {
            total: status.total,
            accumulated: status.accumulated,
            notices,
        })
    }

    fn current_epoch(&self) -> Result<u64, GenerationError> {
        let epoch = self
            .lock_run()
            .as_ref()
            .map(|run| run.epoch)
            .ok_or(GenerationError::NotStarted)?;
        self.check_epoch(epoch)?;
        Ok(epoch)
    }

    /// Abandons the run when the session has moved past `epoch`.
    fn check_epoch(&self, epoch: u64) -> Result<(), GenerationError> {
        if self.store.epoch() == epoch {
            return Ok(());
        }
        let mut guard = self.lock_run();
        if guard.as_ref().is_some_and(|run| run.epoch == epoch) {
            *guard = None;
        }
        Err(GenerationError::Stale)
    }

    fn lock_run(&self) -> MutexGuard<'_, Option<Run>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Validates every draft; one malformed draft fails the whole page.
///
/// Drafts without an id get one derived from the page and the draft's position
/// among all drafts the page has received, so retries never reuse an id.
fn validate_page(
    index: u32,
    offset: usize,
    drafts: Vec<QuestionDraft>,
) -> Result<Vec<Question>, GenerationError> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(position, mut draft)| {
            if draft.id.trim().is_empty() {
                draft.id = format!("p{}-q{}", index + 1, offset + position + 1);
            }
            draft.validate().map_err(GenerationError::from)
        })
        .collect()
}

/// Adds the page's new questions to its slot, skipping ids already present
/// anywhere in the run and trimming to the slot's remaining capacity.
fn merge_into(run: &mut Run, index: u32, questions: Vec<Question>) -> Option<GenerationNotice> {
    let capacity = run.plan.page_capacity(index) as usize;
    let mut seen: HashSet<QuestionId> = run
        .slots
        .iter()
        .flat_map(|slot| slot.questions.iter().map(|q| q.id().clone()))
        .collect();

    let slot = &mut run.slots[index as usize];
    let room = capacity.saturating_sub(slot.questions.len());
    let received = questions.len();
    let fresh: Vec<Question> = questions
        .into_iter()
        .filter(|q| seen.insert(q.id().clone()))
        .take(room)
        .collect();
    slot.questions.extend(fresh);

    if slot.questions.len() >= capacity {
        slot.state = PageState::Generated;
        debug!(page = index, received, "question page generated");
        None
    } else {
        slot.state = PageState::Partial;
        let message = format!(
            "page {} returned {} of {} questions",
            index + 1,
            slot.questions.len(),
            capacity
        );
        warn!(page = index, received, "{message}");
        Some(GenerationNotice {
            page: index,
            message,
        })
    }
}
