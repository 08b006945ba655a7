//! Execution and navigation of solver commands.
//!
//! The controller owns one [`ExecutionSession`] at a time. `run` replaces the
//! session and asks the solver for a first batch; `next` and `prev` move
//! through the session's [`InstanceCache`], reaching the solver only when the
//! cache is exhausted and not yet proven terminal.
//!
//! Every solver request is stamped with a [`SolveTicket`]. A reply whose
//! ticket belongs to an abandoned session is dropped, so a late answer can
//! never leak instances into a session the user has moved on from.
//!
//! The controller talks to the UI only through [`Renderer`] and
//! [`TextSurface`], and returns [`Feedback`] messages for the caller to show.

use thiserror::Error;

use crate::cache::{Advance, InstanceCache, Retreat};
use crate::commands;
use crate::models::{
    EditorRange, Instance, NavDirection, SolveRequest, SolveResponse, SolverModelId,
};
use crate::secrets;
use crate::solver::{Solver, SolverError};

pub const NO_MORE_INSTANCES: &str = "No more satisfying instances!";
pub const NO_PREVIOUS_INSTANCES: &str = "No previous instances!";

/// Errors returned to the caller of a controller operation.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("There are no commands to execute")]
    NoCommandSelected,

    #[error("A command is already executing")]
    Busy,

    #[error(transparent)]
    Transport(#[from] SolverError),
}

/// Display class of a feedback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogClass {
    Error,
    Warning,
    /// The command reached the outcome the user is hoping for.
    Complete,
    /// The command reached the outcome that signals a modeling mistake.
    Wrong,
    Info,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub message: String,
    pub class: LogClass,
}

impl Feedback {
    fn new(message: impl Into<String>, class: LogClass) -> Self {
        Self {
            message: message.into(),
            class,
        }
    }
}

/// Kind of highlight placed on the text surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Error,
    Warning,
    Secret,
}

/// The graphical instance viewer.
///
/// For every displayed instance the controller calls `reset_positions`,
/// then `show`, then `new_instance_setup`.
pub trait Renderer {
    fn reset_positions(&mut self);
    fn show(&mut self, instance: &Instance);
    fn new_instance_setup(&mut self);
}

/// The source editor.
pub trait TextSurface {
    fn value(&self) -> String;
    /// Highlight a 0-based range.
    fn highlight(&mut self, range: EditorRange, kind: Highlight);
    /// Remove error and warning highlights. Secret highlights stay.
    fn clear_highlights(&mut self);
    /// Remove secret highlights.
    fn clear_secret_highlights(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TicketKind {
    Run,
    Fetch,
}

/// Stamp identifying which session a solver request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveTicket {
    epoch: u64,
    kind: TicketKind,
}

/// What `next` needs to do.
#[derive(Debug)]
pub enum NextStep {
    /// Navigation completed from cache.
    Done(Vec<Feedback>),
    /// The cache is exhausted; send `request` and pass the reply to
    /// [`ExecutionController::on_result`] with `ticket`.
    Fetch(SolveTicket, SolveRequest),
}

/// State of one command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionSession {
    epoch: u64,
    command_index: i32,
    command_label: String,
    cache: InstanceCache,
    last_model_id: Option<SolverModelId>,
    busy: bool,
}

impl ExecutionSession {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn command_index(&self) -> i32 {
        self.command_index
    }

    pub fn command_label(&self) -> &str {
        &self.command_label
    }

    pub fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    /// Model id returned by the last solver reply, used to chain derivations.
    pub fn last_model_id(&self) -> Option<&SolverModelId> {
        self.last_model_id.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// A fresh session for the next epoch. Only the derivation chain carries over.
    fn successor(&self) -> Self {
        Self {
            epoch: self.epoch + 1,
            last_model_id: self.last_model_id.clone(),
            ..Self::default()
        }
    }
}

pub struct ExecutionController<S, R, T> {
    solver: S,
    renderer: R,
    surface: T,
    from_private: bool,
    session: ExecutionSession,
}

impl<S: Solver, R: Renderer, T: TextSurface> ExecutionController<S, R, T> {
    pub fn new(solver: S, renderer: R, surface: T) -> Self {
        Self {
            solver,
            renderer,
            surface,
            from_private: false,
            session: ExecutionSession::default(),
        }
    }

    /// Continue the derivation chain of an already loaded model.
    pub fn with_last_model(mut self, model_id: impl Into<SolverModelId>) -> Self {
        self.session.last_model_id = Some(model_id.into());
        self
    }

    /// Mark the session as opened through a private link.
    pub fn from_private(mut self, from_private: bool) -> Self {
        self.from_private = from_private;
        self
    }

    pub fn session(&self) -> &ExecutionSession {
        &self.session
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn surface(&self) -> &T {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut T {
        &mut self.surface
    }

    // ============================================================
    // Run
    // ============================================================

    /// Start executing command `command_index` against the current text.
    ///
    /// Discards the previous session. The returned request must be sent with
    /// [`Solver::get_instances`] and its reply fed to [`on_result`](Self::on_result).
    pub fn begin_run(
        &mut self,
        command_index: i32,
    ) -> Result<(SolveTicket, SolveRequest), ExecutionError> {
        if command_index < 0 {
            return Err(ExecutionError::NoCommandSelected);
        }
        if self.session.busy {
            return Err(ExecutionError::Busy);
        }

        let code = self.surface.value();
        let mut session = self.session.successor();
        session.command_index = command_index;
        session.command_label = commands::command_label(&code, command_index as usize);
        session.busy = true;
        self.session = session;

        tracing::debug!(
            epoch = self.session.epoch,
            command = %self.session.command_label,
            "Executing command"
        );

        let ticket = SolveTicket {
            epoch: self.session.epoch,
            kind: TicketKind::Run,
        };
        Ok((ticket, self.request(code)))
    }

    /// Execute a command and report the outcome.
    pub async fn run(&mut self, command_index: i32) -> Result<Vec<Feedback>, ExecutionError> {
        let (ticket, request) = self.begin_run(command_index)?;
        let result = self.solver.get_instances(request).await;
        self.on_result(ticket, result)
    }

    // ============================================================
    // Navigation
    // ============================================================

    /// Move to the next instance from cache, or produce the fetch to send.
    pub fn begin_next(&mut self) -> Result<NextStep, ExecutionError> {
        if self.session.busy {
            return Err(ExecutionError::Busy);
        }

        match self.session.cache.advance() {
            Advance::Moved(instance) => {
                let instance = instance.clone();
                self.display(&instance);
                Ok(NextStep::Done(Vec::new()))
            }
            Advance::Exhausted => Ok(NextStep::Done(vec![Feedback::new(
                NO_MORE_INSTANCES,
                LogClass::Info,
            )])),
            Advance::Empty | Advance::FetchPending => Ok(NextStep::Done(Vec::new())),
            Advance::NeedsFetch => {
                self.session.busy = true;
                tracing::debug!(
                    epoch = self.session.epoch,
                    last_id = ?self.session.last_model_id,
                    "Instance cache exhausted, fetching next batch"
                );
                let ticket = SolveTicket {
                    epoch: self.session.epoch,
                    kind: TicketKind::Fetch,
                };
                Ok(NextStep::Fetch(ticket, self.request(self.surface.value())))
            }
        }
    }

    /// Show the next instance, fetching another batch when the cache runs out.
    pub async fn next(&mut self) -> Result<Vec<Feedback>, ExecutionError> {
        let before = self.session.cache.cursor();
        let feedback = match self.begin_next()? {
            NextStep::Done(feedback) => feedback,
            NextStep::Fetch(ticket, request) => {
                let result = self.solver.next_instances(request).await;
                self.on_result(ticket, result)?
            }
        };
        if self.session.cache.cursor() != before {
            self.report_navigation(NavDirection::Next).await;
        }
        Ok(feedback)
    }

    /// Show the previous instance. Always served from cache.
    pub async fn prev(&mut self) -> Result<Vec<Feedback>, ExecutionError> {
        if self.session.busy {
            return Err(ExecutionError::Busy);
        }

        let instance = match self.session.cache.retreat() {
            Retreat::Moved(instance) => instance.clone(),
            Retreat::AtStart => {
                if self.session.cache.current().is_none() {
                    return Ok(Vec::new());
                }
                return Ok(vec![Feedback::new(NO_PREVIOUS_INSTANCES, LogClass::Info)]);
            }
        };
        self.display(&instance);
        self.report_navigation(NavDirection::Previous).await;
        Ok(Vec::new())
    }

    // ============================================================
    // Session lifecycle
    // ============================================================

    /// Abandon any in-flight request. Its reply will be ignored.
    pub fn cancel(&mut self) {
        if self.session.busy {
            tracing::info!(epoch = self.session.epoch, "Cancelling in-flight solve");
        }
        self.session.epoch += 1;
        self.session.busy = false;
        self.session.cache.abort_fetch();
    }

    /// The source text changed: drop the session and refresh secret highlights.
    pub fn document_edited(&mut self) {
        self.session = self.session.successor();
        self.highlight_secrets();
    }

    /// Highlight every secret region of the current text.
    pub fn highlight_secrets(&mut self) {
        let code = self.surface.value();
        self.surface.clear_secret_highlights();
        for region in secrets::extract_secrets(&code) {
            self.surface
                .highlight(region.to_editor(&code), Highlight::Secret);
        }
    }

    // ============================================================
    // Solver replies
    // ============================================================

    /// Apply a solver reply.
    ///
    /// Replies for an abandoned session are dropped. Transport failures end
    /// the busy state and are returned; nothing is retried.
    pub fn on_result(
        &mut self,
        ticket: SolveTicket,
        result: Result<SolveResponse, SolverError>,
    ) -> Result<Vec<Feedback>, ExecutionError> {
        if ticket.epoch != self.session.epoch {
            tracing::warn!(
                ticket_epoch = ticket.epoch,
                session_epoch = self.session.epoch,
                "Dropping solver reply for an abandoned session"
            );
            return Ok(Vec::new());
        }
        self.session.busy = false;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Solver request failed: {}", e);
                self.session.cache.abort_fetch();
                return Err(e.into());
            }
        };

        self.session.last_model_id = Some(response.new_model_id.clone());
        let mut batch = response.into_batch();
        if batch.is_empty() {
            batch.push(Instance::unsatisfiable());
        }
        let head = batch[0].clone();

        match ticket.kind {
            TicketKind::Run => {
                self.session.cache.append(batch);
                Ok(self.report_run(&head))
            }
            TicketKind::Fetch => Ok(self.resume_next(&head, batch)),
        }
    }

    fn report_run(&mut self, outcome: &Instance) -> Vec<Feedback> {
        self.surface.clear_highlights();

        if let Some(error) = &outcome.alloy_error {
            if let Some(range) = error.range() {
                self.surface.highlight(range.to_editor(), Highlight::Error);
            }
            let message = format!(
                "There was a problem running the model!\n{}\nPlease validate your model.",
                error.describe()
            );
            tracing::warn!("{}", message);
            return vec![Feedback::new(message, LogClass::Error)];
        }

        let mut feedback = self.report_warning(outcome).into_iter().collect::<Vec<_>>();
        let satisfiable = !outcome.unsat;
        feedback.push(verdict(
            outcome.check,
            satisfiable,
            &self.session.command_label,
        ));

        if satisfiable {
            if let Some(instance) = self.session.cache.current().cloned() {
                self.display(&instance);
            }
        }
        feedback
    }

    fn resume_next(&mut self, head: &Instance, batch: Vec<Instance>) -> Vec<Feedback> {
        self.surface.clear_highlights();

        if let Some(error) = &head.alloy_error {
            self.session.cache.abort_fetch();
            return vec![Feedback::new(
                format!(
                    "There was a problem fetching more instances!\n{}",
                    error.describe()
                ),
                LogClass::Error,
            )];
        }

        let mut feedback = self.report_warning(head).into_iter().collect::<Vec<_>>();
        let added = self.session.cache.append(batch);

        if added > 0 {
            if let Advance::Moved(instance) = self.session.cache.advance() {
                let instance = instance.clone();
                self.display(&instance);
            }
        } else if self.session.cache.is_terminal() {
            feedback.push(Feedback::new(NO_MORE_INSTANCES, LogClass::Info));
        }
        feedback
    }

    fn report_warning(&mut self, outcome: &Instance) -> Option<Feedback> {
        let warning = outcome.warning_error.as_ref()?;
        if let Some(range) = warning.range() {
            self.surface.highlight(range.to_editor(), Highlight::Warning);
        }
        Some(Feedback::new(
            format!(
                "There is a possible problem with the model!\n{}\n",
                warning.describe()
            ),
            LogClass::Warning,
        ))
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn request(&self, code: String) -> SolveRequest {
        SolveRequest {
            code,
            command_index: self.session.command_index,
            from_private: self.from_private,
            last_id: self.session.last_model_id.clone(),
        }
    }

    fn display(&mut self, instance: &Instance) {
        self.renderer.reset_positions();
        self.renderer.show(instance);
        self.renderer.new_instance_setup();
    }

    async fn report_navigation(&self, direction: NavDirection) {
        let index = self.session.cache.cursor();
        if let Err(e) = self
            .solver
            .record_navigation(direction, index, self.session.last_model_id.clone())
            .await
        {
            tracing::warn!("Failed to record navigation: {}", e);
        }
    }
}

/// Result message keyed by `(is_check, is_satisfiable)`.
fn verdict(is_check: bool, satisfiable: bool, command: &str) -> Feedback {
    let (lead, tail, class) = match (is_check, satisfiable) {
        (true, false) => ("No counter-examples.", "may be valid.", LogClass::Complete),
        (false, false) => ("No instance found.", "may be inconsistent.", LogClass::Wrong),
        (true, true) => ("Counter-example found.", "is invalid.", LogClass::Wrong),
        (false, true) => ("Instance found.", "is consistent.", LogClass::Complete),
    };
    Feedback::new(format!("{} {} {}", lead, command, tail), class)
}
