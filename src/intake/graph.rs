//! Step graph: the validated, immutable configuration of one flow.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ConfigError, RouterError};

use super::answers::AnswerSet;
use super::field::FieldKind;
use super::router::RoleRouter;
use super::step::{FormStep, Next, StepId};

/// A flow's steps, its role router, and the page shown after submission.
///
/// Only obtainable through [`StepGraphBuilder::build`], so every graph in
/// circulation has passed the startup checks.
#[derive(Debug, Clone, Serialize)]
pub struct StepGraph {
    flow: String,
    entry: StepId,
    steps: IndexMap<StepId, FormStep>,
    router: RoleRouter,
    confirmation_path: String,
}

impl StepGraph {
    pub fn builder(flow: &str, entry: &str) -> StepGraphBuilder {
        StepGraphBuilder {
            flow: flow.to_string(),
            entry: StepId::from(entry),
            steps: Vec::new(),
            router: RoleRouter::new(),
            confirmation_path: "/".to_string(),
        }
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }

    pub fn entry(&self) -> &StepId {
        &self.entry
    }

    pub fn step(&self, id: &StepId) -> Option<&FormStep> {
        self.steps.get(id)
    }

    pub fn steps(&self) -> impl Iterator<Item = &FormStep> {
        self.steps.values()
    }

    pub fn router(&self) -> &RoleRouter {
        &self.router
    }

    pub fn confirmation_path(&self) -> &str {
        &self.confirmation_path
    }

    /// Id of the step that follows `step` given `answers`; `None` at a
    /// terminal step.
    pub fn next_step(
        &self,
        step: &FormStep,
        answers: &AnswerSet,
    ) -> Result<Option<StepId>, RouterError> {
        match &step.next {
            Next::Step { id } => Ok(Some(id.clone())),
            Next::Branch { field } => {
                let label = answers.text(field).unwrap_or_default();
                self.router.resolve(label).map(Some)
            }
            Next::Submit => Ok(None),
        }
    }

    /// Number of steps still ahead of `from` on the longest path.
    ///
    /// Branches already answered follow the chosen role; unanswered ones
    /// count their longest candidate.
    pub fn remaining_after(&self, from: &StepId, answers: &AnswerSet) -> usize {
        let Some(step) = self.steps.get(from) else {
            return 0;
        };
        match &step.next {
            Next::Step { id } => 1 + self.remaining_after(id, answers),
            Next::Branch { field } => {
                let chosen = answers
                    .text(field)
                    .and_then(|label| self.router.resolve(label).ok());
                match chosen {
                    Some(target) => 1 + self.remaining_after(&target, answers),
                    None => self
                        .successors(step)
                        .iter()
                        .map(|target| 1 + self.remaining_after(target, answers))
                        .max()
                        .unwrap_or(0),
                }
            }
            Next::Submit => 0,
        }
    }

    /// Every field name defined by the given steps.
    pub fn fields_of<'a>(&'a self, path: impl IntoIterator<Item = &'a StepId>) -> HashSet<&'a str> {
        path.into_iter()
            .filter_map(|id| self.steps.get(id))
            .flat_map(|step| step.fields.iter().map(|f| f.name.as_str()))
            .collect()
    }

    /// All possible successors of `step`, whatever the answers.
    fn successors(&self, step: &FormStep) -> Vec<StepId> {
        match &step.next {
            Next::Step { id } => vec![id.clone()],
            Next::Branch { field } => step
                .find_field(field)
                .map(|def| {
                    def.options
                        .iter()
                        .filter_map(|option| self.router.resolve(option).ok())
                        .collect()
                })
                .unwrap_or_default(),
            Next::Submit => Vec::new(),
        }
    }

    fn check_fields(&self) -> Result<(), ConfigError> {
        for step in self.steps.values() {
            let mut seen = HashSet::new();
            for def in &step.fields {
                if !seen.insert(def.name.as_str()) {
                    return Err(ConfigError::DuplicateField {
                        flow: self.flow.clone(),
                        step: step.id.clone(),
                        field: def.name.clone(),
                    });
                }
                if def.kind.is_select() && def.options.is_empty() {
                    return Err(ConfigError::MissingOptions {
                        flow: self.flow.clone(),
                        step: step.id.clone(),
                        field: def.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_transitions(&self) -> Result<(), ConfigError> {
        for step in self.steps.values() {
            match &step.next {
                Next::Step { id } => self.check_target(step, id)?,
                Next::Branch { field } => {
                    let invalid = |reason: &str| ConfigError::InvalidBranchField {
                        flow: self.flow.clone(),
                        step: step.id.clone(),
                        field: field.clone(),
                        reason: reason.to_string(),
                    };
                    let def = step
                        .find_field(field)
                        .ok_or_else(|| invalid("field is not defined on the step"))?;
                    if def.kind != FieldKind::SingleSelect {
                        return Err(invalid("field must be a single-select"));
                    }
                    if !def.required {
                        return Err(invalid("field must be required"));
                    }
                    for option in &def.options {
                        let target = self.router.resolve(option)?;
                        self.check_target(step, &target)?;
                    }
                }
                Next::Submit => {}
            }
        }
        Ok(())
    }

    fn check_target(&self, step: &FormStep, target: &StepId) -> Result<(), ConfigError> {
        if self.steps.contains_key(target) {
            Ok(())
        } else {
            Err(ConfigError::UnknownNextStep {
                flow: self.flow.clone(),
                step: step.id.clone(),
                target: target.clone(),
            })
        }
    }

    /// Depth-first walk from the entry: the forward graph must be acyclic
    /// and cover every step.
    fn check_shape(&self) -> Result<(), ConfigError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<StepId, Mark> = HashMap::new();
        // (step, expanded) pairs; a step is finished when popped expanded.
        let mut stack = vec![(self.entry.clone(), false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                marks.insert(id, Mark::Done);
                continue;
            }
            match marks.get(&id) {
                Some(Mark::Done) => continue,
                Some(Mark::Visiting) => {
                    return Err(ConfigError::CycleDetected {
                        flow: self.flow.clone(),
                        step: id,
                    });
                }
                None => {}
            }
            marks.insert(id.clone(), Mark::Visiting);
            stack.push((id.clone(), true));

            if let Some(step) = self.steps.get(&id) {
                for next in self.successors(step) {
                    match marks.get(&next) {
                        Some(Mark::Visiting) => {
                            return Err(ConfigError::CycleDetected {
                                flow: self.flow.clone(),
                                step: next,
                            });
                        }
                        Some(Mark::Done) => {}
                        None => stack.push((next, false)),
                    }
                }
            }
        }

        if let Some(step) = self.steps.keys().find(|id| !marks.contains_key(*id)) {
            return Err(ConfigError::UnreachableStep {
                flow: self.flow.clone(),
                step: step.clone(),
            });
        }
        Ok(())
    }
}

/// Collects step definitions and checks them as a whole on [`build`].
///
/// [`build`]: StepGraphBuilder::build
pub struct StepGraphBuilder {
    flow: String,
    entry: StepId,
    steps: Vec<FormStep>,
    router: RoleRouter,
    confirmation_path: String,
}

impl StepGraphBuilder {
    pub fn step(mut self, step: FormStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn router(mut self, router: RoleRouter) -> Self {
        self.router = router;
        self
    }

    /// Page the client navigates to after a successful submission.
    pub fn confirmation(mut self, path: &str) -> Self {
        self.confirmation_path = path.to_string();
        self
    }

    pub fn build(self) -> Result<StepGraph, ConfigError> {
        let mut steps = IndexMap::with_capacity(self.steps.len());
        for step in self.steps {
            if steps.contains_key(&step.id) {
                return Err(ConfigError::DuplicateStep {
                    flow: self.flow,
                    step: step.id,
                });
            }
            steps.insert(step.id.clone(), step);
        }

        if !steps.contains_key(&self.entry) {
            return Err(ConfigError::UnknownEntry {
                flow: self.flow,
                entry: self.entry,
            });
        }

        let graph = StepGraph {
            flow: self.flow,
            entry: self.entry,
            steps,
            router: self.router,
            confirmation_path: self.confirmation_path,
        };
        graph.check_fields()?;
        graph.check_transitions()?;
        graph.check_shape()?;
        Ok(graph)
    }
}
