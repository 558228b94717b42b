//! The five-step analysis workflow.
//!
//! A [`Wizard`] is the single source of truth for one analysis session: the
//! current [`Step`] plus everything gathered so far. Actions that are not
//! available in the current state are no-ops and report `false`; they are
//! meant to be shown disabled, not reported as errors.

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::core::{
    db::{NewProject, Project, ProjectStore, StoreError},
    generator::{GenerationRequest, ScenarioGenerator, clamp_target},
    geo::Coordinate,
    progress::ProcessingTask,
    region::{Region, RegionSelector},
    scenario::{Comment, Priority, Scenario, ScenarioStatus, StatusError},
    terrain::{TerrainRecord, TerrainSource},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    SelectArea = 1,
    ImportData = 2,
    RunAnalysis = 3,
    ViewResults = 4,
    Collaborate = 5,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::SelectArea,
        Step::ImportData,
        Step::RunAnalysis,
        Step::ViewResults,
        Step::Collaborate,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Step> {
        match self {
            Step::SelectArea => Some(Step::ImportData),
            Step::ImportData => Some(Step::RunAnalysis),
            Step::RunAnalysis => Some(Step::ViewResults),
            Step::ViewResults => Some(Step::Collaborate),
            Step::Collaborate => None,
        }
    }

    pub fn previous(self) -> Option<Step> {
        match self {
            Step::SelectArea => None,
            Step::ImportData => Some(Step::SelectArea),
            Step::RunAnalysis => Some(Step::ImportData),
            Step::ViewResults => Some(Step::RunAnalysis),
            Step::Collaborate => Some(Step::ViewResults),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::SelectArea => "Select Area",
            Step::ImportData => "Import Data",
            Step::RunAnalysis => "Run Analysis",
            Step::ViewResults => "View Results",
            Step::Collaborate => "Collaborate",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.number(), self.title())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub target_percent: u8,
    pub priority: Priority,
    /// Pause between progress updates while the analysis runs.
    pub step_delay: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            target_percent: 25,
            priority: Priority::Balanced,
            step_delay: Duration::from_millis(400),
        }
    }
}

#[derive(Debug, Default)]
struct Payload {
    selector: RegionSelector,
    region: Option<Region>,
    name: String,
    terrain: Option<TerrainRecord>,
    scenario: Option<Scenario>,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("the session has no scenario ready to save")]
    NotReady(Box<Wizard>),
    #[error("saving the project failed: {source}")]
    Store {
        session: Box<Wizard>,
        #[source]
        source: StoreError,
    },
}

impl SaveError {
    /// Gives back the session, scenario intact, so the save can be retried.
    pub fn into_session(self) -> Wizard {
        match self {
            SaveError::NotReady(session) => *session,
            SaveError::Store { session, .. } => *session,
        }
    }
}

#[derive(Debug)]
pub struct Wizard {
    step: Step,
    payload: Payload,
    settings: AnalysisSettings,
    progress: Arc<watch::Sender<u8>>,
    processing: Option<ProcessingTask>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new(AnalysisSettings::default())
    }
}

impl Wizard {
    pub fn new(mut settings: AnalysisSettings) -> Self {
        settings.target_percent = clamp_target(settings.target_percent);
        let (progress, _) = watch::channel(0);
        Self {
            step: Step::SelectArea,
            payload: Payload::default(),
            settings,
            progress: Arc::new(progress),
            processing: None,
        }
    }

    /// Reopens a saved project directly on the collaborate step.
    pub fn from_project(project: Project, mut settings: AnalysisSettings) -> Self {
        settings.target_percent = clamp_target(project.scenario.coverage_percent.round() as u8);
        let mut wizard = Self::new(settings);
        wizard.step = Step::Collaborate;
        wizard.payload.region = Some(project.scenario.region.clone());
        wizard.payload.name = project.region_label;
        wizard.payload.scenario = Some(project.scenario);
        tracing::info!(project = %project.id, "Project loaded into wizard");
        wizard
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn selector(&self) -> &RegionSelector {
        &self.payload.selector
    }

    pub fn region(&self) -> Option<&Region> {
        self.payload.region.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.payload.name
    }

    pub fn terrain(&self) -> Option<&TerrainRecord> {
        self.payload.terrain.as_ref()
    }

    pub fn scenario(&self) -> Option<&Scenario> {
        self.payload.scenario.as_ref()
    }

    /// Whether `step`'s completion predicate holds for the current payload.
    pub fn is_complete(&self, step: Step) -> bool {
        let p = &self.payload;
        match step {
            Step::SelectArea => p.region.is_some() && !p.name.trim().is_empty(),
            Step::ImportData => p.terrain.is_some(),
            Step::RunAnalysis | Step::ViewResults => p.scenario.is_some(),
            Step::Collaborate => false,
        }
    }

    pub fn can_advance(&self) -> bool {
        self.step.next().is_some() && self.is_complete(self.step)
    }

    pub fn next(&mut self) -> bool {
        if !self.can_advance() {
            return false;
        }
        if let Some(next) = self.step.next() {
            tracing::debug!(from = %self.step, to = %next, "Wizard advanced");
            self.step = next;
        }
        true
    }

    /// Steps back without re-checking anything; later progress is kept.
    /// An analysis interrupted mid-run is abandoned.
    pub fn back(&mut self) -> bool {
        match self.step.previous() {
            Some(previous) => {
                self.abandon_processing();
                self.step = previous;
                true
            }
            None => false,
        }
    }

    pub fn start_drawing(&mut self) -> bool {
        if self.step != Step::SelectArea {
            return false;
        }
        self.payload.selector.start();
        true
    }

    pub fn add_point(&mut self, point: Coordinate) -> bool {
        self.step == Step::SelectArea && self.payload.selector.add_point(point)
    }

    /// Confirms the drawn polygon. A new region invalidates terrain and scenario
    /// gathered for the previous one.
    pub fn finish_drawing(&mut self) -> bool {
        if self.step != Step::SelectArea {
            return false;
        }
        let Some(region) = self.payload.selector.finish() else {
            return false;
        };
        tracing::info!(
            points = region.points().len(),
            area_m2 = region.area_m2(),
            "Region confirmed"
        );
        self.payload.region = Some(region);
        self.payload.terrain = None;
        self.payload.scenario = None;
        true
    }

    pub fn cancel_drawing(&mut self) {
        self.payload.selector.cancel();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.payload.name = name.into();
    }

    pub fn set_target(&mut self, target_percent: u8) {
        self.settings.target_percent = clamp_target(target_percent);
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.settings.priority = priority;
    }

    pub fn can_import_terrain(&self) -> bool {
        self.step == Step::ImportData && self.payload.region.is_some()
    }

    pub async fn import_terrain<T: TerrainSource>(&mut self, source: &T) -> anyhow::Result<bool> {
        let Some(region) = self.payload.region.as_ref().filter(|_| self.can_import_terrain()) else {
            return Ok(false);
        };
        let record = source.survey(region).await?;
        tracing::info!(?record, "Terrain imported");
        self.payload.terrain = Some(record);
        Ok(true)
    }

    pub fn can_run_analysis(&self) -> bool {
        self.step == Step::RunAnalysis
            && self.processing.is_none()
            && self.payload.region.is_some()
            && self.payload.terrain.is_some()
    }

    /// Latest processing percentage. Subscribe before [`Wizard::run_analysis`]
    /// to follow it live.
    pub fn progress_updates(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.is_some()
    }

    /// Runs the generator behind the timed processing animation.
    ///
    /// Dropping the returned future leaves the pacing task parked in the
    /// session until [`Wizard::abandon_processing`] or [`Wizard::back`] aborts
    /// it, or the session is dropped.
    pub async fn run_analysis<G: ScenarioGenerator>(
        &mut self,
        generator: &G,
    ) -> anyhow::Result<bool> {
        if !self.can_run_analysis() {
            return Ok(false);
        }
        let Some(region) = self.payload.region.clone() else {
            return Ok(false);
        };
        let request =
            GenerationRequest::new(region, self.settings.target_percent, self.settings.priority);
        tracing::info!(
            target = request.target_percent,
            priority = request.priority.as_str(),
            "Analysis started"
        );

        let task = ProcessingTask::spawn(self.settings.step_delay, self.progress.clone());
        self.processing.insert(task).finished().await;

        let result = generator.generate(&request).await;
        self.processing = None;
        let scenario = result?;
        tracing::info!(
            scenario = %scenario.id,
            zones = scenario.green_zones.len(),
            "Analysis finished"
        );
        self.payload.scenario = Some(scenario);
        Ok(true)
    }

    pub fn abandon_processing(&mut self) {
        if self.processing.take().is_some() {
            tracing::warn!("Analysis abandoned");
        }
    }

    pub fn can_comment(&self) -> bool {
        matches!(self.step, Step::ViewResults | Step::Collaborate)
            && self.payload.scenario.is_some()
    }

    pub fn add_comment(&mut self, author: &str, text: &str) -> bool {
        if !self.can_comment() || text.trim().is_empty() {
            return false;
        }
        let author = if author.trim().is_empty() { "Anonymous" } else { author.trim() };
        match self.payload.scenario.as_mut() {
            Some(scenario) => {
                scenario.add_comment(Comment::new(author, text.trim()));
                true
            }
            None => false,
        }
    }

    /// `Ok(false)` when there is no scenario to change.
    pub fn set_status(&mut self, next: ScenarioStatus) -> Result<bool, StatusError> {
        match self.payload.scenario.as_mut() {
            Some(scenario) => scenario.transition(next).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn approve(&mut self) -> Result<bool, StatusError> {
        self.set_status(ScenarioStatus::Completed)
    }

    pub fn mark_shared(&mut self) -> Result<bool, StatusError> {
        self.set_status(ScenarioStatus::Shared)
    }

    pub fn can_save(&self) -> bool {
        self.step == Step::Collaborate && self.payload.scenario.is_some()
    }

    /// The create payload `save` would send.
    pub fn to_new_project(&self) -> Option<NewProject> {
        if !self.can_save() {
            return None;
        }
        let scenario = self.payload.scenario.clone()?;
        Some(NewProject {
            name: scenario.name.clone(),
            region_label: self.payload.name.clone(),
            status: scenario.status,
            scenario,
        })
    }

    /// Hands the scenario to the store. Success ends the session; failure
    /// returns it untouched inside the error.
    pub async fn save<S: ProjectStore>(self, store: &S) -> Result<Project, SaveError> {
        let Some(new_project) = self.to_new_project() else {
            return Err(SaveError::NotReady(Box::new(self)));
        };
        match store.create_project(&new_project).await {
            Ok(project) => {
                tracing::info!(project = %project.id, "Session saved");
                Ok(project)
            }
            Err(source) => {
                tracing::error!(error = %source, "Saving session failed");
                Err(SaveError::Store {
                    session: Box::new(self),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_numbered_one_to_five() {
        let numbers: Vec<u8> = Step::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(Step::Collaborate.next(), None);
        assert_eq!(Step::SelectArea.previous(), None);
        assert_eq!(Step::RunAnalysis.to_string(), "3. Run Analysis");
    }

    #[test]
    fn back_is_refused_on_first_step() {
        let mut wizard = Wizard::default();
        assert!(!wizard.back());
        assert_eq!(wizard.step(), Step::SelectArea);
    }

    #[test]
    fn whitespace_name_does_not_complete_selection() {
        let mut wizard = Wizard::default();
        wizard.start_drawing();
        for (lat, lng) in [(1.0, 1.0), (1.0, 1.01), (1.01, 1.01)] {
            wizard.add_point(Coordinate::new(lat, lng));
        }
        assert!(wizard.finish_drawing());
        wizard.set_name("   ");
        assert!(!wizard.can_advance());
        wizard.set_name("Old Mill");
        assert!(wizard.next());
    }
}
