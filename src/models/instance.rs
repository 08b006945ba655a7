use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id the solver assigns to the model row it records for an execution.
///
/// The solver decides the format, so the value is carried as an opaque
/// string and only ever echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolverModelId(String);

impl SolverModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SolverModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for SolverModelId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for SolverModelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A problem the solver reported against the submitted source.
///
/// Line and column numbers are **1-based**, as the solver reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SolverDiagnostic {
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column2: Option<u32>,
}

impl SolverDiagnostic {
    /// The reported range, if the solver located the problem.
    ///
    /// A missing end position collapses onto the start position.
    pub fn range(&self) -> Option<SourceRange> {
        let line = self.line?;
        let column = self.column.unwrap_or(1);
        Some(SourceRange {
            line,
            column,
            line2: self.line2.unwrap_or(line),
            column2: self.column2.unwrap_or(column),
        })
    }

    /// The message with the `(line:column)-(line2:column2)` suffix when located.
    pub fn describe(&self) -> String {
        match self.range() {
            Some(r) => format!(
                "{} ({}:{})-({}:{})",
                self.msg, r.line, r.column, r.line2, r.column2
            ),
            None => self.msg.clone(),
        }
    }
}

/// A 1-based source range from the solver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRange {
    pub line: u32,
    pub column: u32,
    pub line2: u32,
    pub column2: u32,
}

impl SourceRange {
    /// Convert to the 0-based coordinates the text surface expects.
    pub fn to_editor(self) -> EditorRange {
        EditorRange {
            start_line: self.line.saturating_sub(1),
            start_column: self.column.saturating_sub(1),
            end_line: self.line2.saturating_sub(1),
            end_column: self.column2.saturating_sub(1),
        }
    }
}

/// A 0-based range on the text surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditorRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// One solver outcome for the executed command.
///
/// - satisfiable: `unsat == false` and `instance` holds the solution states
/// - unsatisfiable: `unsat == true`, the marker that no further solution exists
/// - model error: `alloy_error` is set, the source could not be analysed
///
/// `check` tells whether the command was a `check` (looking for
/// counter-examples) rather than a `run`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Instance {
    #[serde(default)]
    pub unsat: bool,
    #[serde(default)]
    pub check: bool,
    /// Solution states; a static solution has exactly one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alloy_error: Option<SolverDiagnostic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_error: Option<SolverDiagnostic>,
}

impl Instance {
    pub fn satisfiable(states: Vec<serde_json::Value>) -> Self {
        Self {
            instance: states,
            ..Self::default()
        }
    }

    pub fn unsatisfiable() -> Self {
        Self {
            unsat: true,
            ..Self::default()
        }
    }

    pub fn model_error(diagnostic: SolverDiagnostic) -> Self {
        Self {
            alloy_error: Some(diagnostic),
            ..Self::default()
        }
    }

    pub fn with_check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    pub fn with_warning(mut self, warning: SolverDiagnostic) -> Self {
        self.warning_error = Some(warning);
        self
    }

    pub fn is_satisfiable(&self) -> bool {
        !self.unsat && self.alloy_error.is_none()
    }

    /// The state to hand to the renderer.
    pub fn graph(&self) -> Option<&serde_json::Value> {
        self.instance.first()
    }
}

/// A request to the solver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    #[serde(rename = "model")]
    pub code: String,
    pub command_index: i32,
    #[serde(default)]
    pub from_private: bool,
    #[serde(default)]
    pub last_id: Option<SolverModelId>,
}

/// The solver's reply: either a batch under `instances` or a single outcome
/// inlined at the top level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolveResponse {
    #[serde(rename = "newModelId")]
    pub new_model_id: SolverModelId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<Instance>>,
    #[serde(flatten)]
    pub single: Instance,
}

impl SolveResponse {
    pub fn single(new_model_id: impl Into<SolverModelId>, outcome: Instance) -> Self {
        Self {
            new_model_id: new_model_id.into(),
            instances: None,
            single: outcome,
        }
    }

    pub fn batch(new_model_id: impl Into<SolverModelId>, outcomes: Vec<Instance>) -> Self {
        Self {
            new_model_id: new_model_id.into(),
            instances: Some(outcomes),
            single: Instance::default(),
        }
    }

    /// Normalise either shape into an ordered batch.
    pub fn into_batch(self) -> Vec<Instance> {
        match self.instances {
            Some(batch) => batch,
            None => vec![self.single],
        }
    }
}

/// Direction of a navigation step, reported to the solver for telemetry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NavDirection {
    Next,
    Previous,
}

impl NavDirection {
    /// Wire code used by the solver's navigation log.
    pub fn code(&self) -> u8 {
        match self {
            Self::Next => 0,
            Self::Previous => 1,
        }
    }
}
