//! Batch driver: personas → questionnaires → sessions
//!
//! Every persona writes only to paths keyed by its own safe name, so personas
//! can run concurrently. Artifacts are written atomically, which makes
//! `skip_existing` a safe resume point after an interrupted batch.

use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::dialogue::{build_background, topics, CounterpartKind, DialogueOrchestrator, DialogueSettings};
use crate::error::{Error, Result};
use crate::gateway::{FailurePolicy, TextGenerator};
use crate::persona::{Persona, PersonaCatalog};
use crate::questionnaire::{AnswerSheet, QuestionSet, QuestionnaireRunner, Scale};
use crate::storage::{self, OutputLayout};

/// What happened to one persona
#[derive(Debug)]
pub enum PersonaOutcome {
    /// The artifact was generated and written
    Written(PathBuf),
    /// The artifact already existed and was left alone
    Skipped(PathBuf),
}

/// Per-persona results of one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failures: Vec<(String, Error)>,
}

impl BatchReport {
    fn record(&mut self, persona: String, outcome: Result<PersonaOutcome>) {
        match outcome {
            Ok(PersonaOutcome::Written(path)) => self.written.push(path),
            Ok(PersonaOutcome::Skipped(path)) => self.skipped.push(path),
            Err(e) => {
                error!(persona = %persona, error = %e.format_for_log(), "Persona failed");
                self.failures.push((persona, e));
            }
        }
    }

    /// Fail with the first persona error, if any
    pub fn into_result(self) -> Result<Self> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        let mut report = self;
        let (_, first) = report.failures.remove(0);
        Err(first)
    }
}

/// Knobs shared by every batch command
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub answer_temperature: f32,
    pub failure_policy: FailurePolicy,
    pub max_parallel: usize,
    pub skip_existing: bool,
    pub questions_dir: Option<PathBuf>,
    pub session: DialogueSettings,
    pub combined_session: DialogueSettings,
    pub background_cap: usize,
    pub combined_background_cap: usize,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            answer_temperature: config.questionnaire.temperature,
            failure_policy: config.generation.failure_policy,
            max_parallel: config.pipeline.max_parallel_personas,
            skip_existing: config.pipeline.skip_existing,
            questions_dir: config.questions_dir(),
            session: config.session_settings(),
            combined_session: config.combined_session_settings(),
            background_cap: config.dialogue.background_cap,
            combined_background_cap: config.dialogue.combined_background_cap,
        }
    }

    /// Override the round count of both session kinds
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.session.rounds = rounds;
        self.combined_session.rounds = rounds;
        self
    }
}

/// Drives questionnaires and sessions for a catalog of personas
pub struct Pipeline<'a> {
    generator: &'a dyn TextGenerator,
    layout: OutputLayout,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(generator: &'a dyn TextGenerator, output_dir: impl Into<PathBuf>, options: PipelineOptions) -> Self {
        Self {
            generator,
            layout: OutputLayout::new(output_dir),
            options,
        }
    }

    /// Answer one questionnaire per persona
    pub async fn interview(&self, catalog: &PersonaCatalog, scale: Scale) -> Result<BatchReport> {
        let questions = self.questions(scale)?;
        info!(scale = %scale, personas = catalog.len(), "Running questionnaire");

        self.for_each_persona(catalog, |persona| {
            let questions = &questions;
            async move {
                let path = self.layout.answer_sheet(scale, &persona.name);
                if self.skip(&path) {
                    return Ok(PersonaOutcome::Skipped(path));
                }
                let sheet = self.runner().run(persona, questions).await?;
                storage::write_json_atomic(&path, &sheet)?;
                Ok(PersonaOutcome::Written(path))
            }
        })
        .await
    }

    /// One single-scale session per persona, seeded by that scale's answers
    pub async fn converse(
        &self,
        catalog: &PersonaCatalog,
        scale: Scale,
        counterpart: CounterpartKind,
    ) -> Result<BatchReport> {
        let questions = self.questions(scale)?;
        let topics = topics::for_session(counterpart, &[scale]);
        info!(scale = %scale, counterpart = %counterpart, personas = catalog.len(), "Running sessions");

        self.for_each_persona(catalog, |persona| {
            let questions = &questions;
            let topics = &topics;
            async move {
                let path = self.layout.session(scale, counterpart, &persona.name);
                if self.skip(&path) {
                    return Ok(PersonaOutcome::Skipped(path));
                }

                // The sheet is the seed, so an existing one is always reused
                let sheet = self.answers_for(persona, questions, true).await?;
                let background = build_background(&persona.name, &[&sheet], self.options.background_cap);

                let orchestrator =
                    DialogueOrchestrator::new(self.generator, counterpart.profile(), self.options.session)
                        .with_failure_policy(self.options.failure_policy);
                let session = orchestrator.run(persona, &background, topics, vec![scale]).await?;

                storage::write_json_atomic(&path, &session.to_record())?;
                Ok(PersonaOutcome::Written(path))
            }
        })
        .await
    }

    /// All questionnaires, then one combined friend session, per persona
    pub async fn run_all(&self, catalog: &PersonaCatalog) -> Result<BatchReport> {
        let question_sets = Scale::all()
            .iter()
            .map(|scale| self.questions(*scale))
            .collect::<Result<Vec<_>>>()?;
        let counterpart = CounterpartKind::Friend;
        let topics = topics::for_session(counterpart, Scale::all());
        info!(personas = catalog.len(), "Running full pipeline");

        self.for_each_persona(catalog, |persona| {
            let question_sets = &question_sets;
            let topics = &topics;
            async move {
                let path = self.layout.combined_session(counterpart, &persona.name);
                if self.skip(&path) {
                    return Ok(PersonaOutcome::Skipped(path));
                }

                let mut sheets = Vec::with_capacity(question_sets.len());
                for questions in question_sets {
                    sheets.push(self.answers_for(persona, questions, self.options.skip_existing).await?);
                }

                let sources: Vec<&AnswerSheet> = sheets.iter().collect();
                let background =
                    build_background(&persona.name, &sources, self.options.combined_background_cap);

                let orchestrator = DialogueOrchestrator::new(
                    self.generator,
                    counterpart.profile(),
                    self.options.combined_session,
                )
                .with_failure_policy(self.options.failure_policy);
                let session = orchestrator
                    .run(persona, &background, topics, Scale::all().to_vec())
                    .await?;

                storage::write_json_atomic(&path, &session.to_record())?;
                Ok(PersonaOutcome::Written(path))
            }
        })
        .await
    }

    fn questions(&self, scale: Scale) -> Result<QuestionSet> {
        QuestionSet::for_scale(scale, self.options.questions_dir.as_deref())
    }

    fn runner(&self) -> QuestionnaireRunner<'a> {
        QuestionnaireRunner::new(self.generator)
            .with_temperature(self.options.answer_temperature)
            .with_failure_policy(self.options.failure_policy)
    }

    fn skip(&self, path: &Path) -> bool {
        let skip = self.options.skip_existing && path.exists();
        if skip {
            info!(path = %path.display(), "Output exists, skipping");
        }
        skip
    }

    /// Read the persona's sheet from disk when allowed, otherwise answer and persist it
    async fn answers_for(&self, persona: &Persona, questions: &QuestionSet, reuse: bool) -> Result<AnswerSheet> {
        let scale = questions.scale();
        let path = self.layout.answer_sheet(scale, &persona.name);

        if reuse && path.exists() {
            match AnswerSheet::load(&path, Some(scale)) {
                Ok(sheet) => {
                    debug!(persona = %persona.name, scale = %scale, "Reusing existing answers");
                    return Ok(sheet);
                }
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e.format_for_log(),
                    "Existing answers unreadable, answering again"
                ),
            }
        }

        let sheet = self.runner().run(persona, questions).await?;
        storage::write_json_atomic(&path, &sheet)?;
        Ok(sheet)
    }

    async fn for_each_persona<'p, F, Fut>(&self, catalog: &'p PersonaCatalog, work: F) -> Result<BatchReport>
    where
        F: Fn(&'p Persona) -> Fut,
        Fut: std::future::Future<Output = Result<PersonaOutcome>>,
    {
        let parallel = self.options.max_parallel.max(1);
        let outcomes: Vec<(String, Result<PersonaOutcome>)> = stream::iter(catalog.iter())
            .map(|persona| {
                let fut = work(persona);
                async move { (persona.name.clone(), fut.await) }
            })
            .buffer_unordered(parallel)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (persona, outcome) in outcomes {
            report.record(persona, outcome);
        }

        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Batch finished"
        );
        Ok(report)
    }
}
