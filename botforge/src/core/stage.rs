//! Pipeline stage machine.
//!
//! Stages advance strictly one step at a time through [`Stage::ORDER`]. The only
//! other move is into [`Stage::Failed`], which is absorbing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One named step of the factory pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    Plan,
    RetrieveDocs,
    Generate,
    Test,
    Review,
    Package,
    Deploy,
    Done,
    Failed,
}

/// Rejected stage transition. Reaching this is a bug in the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("illegal stage transition {from} -> {to}")]
    IllegalTransition { from: Stage, to: Stage },
}

impl Stage {
    /// Success path, in execution order.
    pub const ORDER: [Stage; 9] = [
        Stage::Intake,
        Stage::Plan,
        Stage::RetrieveDocs,
        Stage::Generate,
        Stage::Test,
        Stage::Review,
        Stage::Package,
        Stage::Deploy,
        Stage::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Plan => "plan",
            Self::RetrieveDocs => "retrieve_docs",
            Self::Generate => "generate",
            Self::Test => "test",
            Self::Review => "review",
            Self::Package => "package",
            Self::Deploy => "deploy",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Position on the success path; `None` for [`Stage::Failed`].
    pub fn position(self) -> Option<usize> {
        Self::ORDER.iter().position(|s| *s == self)
    }

    /// The stage that follows `self` on the success path.
    pub fn successor(self) -> Option<Stage> {
        let pos = self.position()?;
        Self::ORDER.get(pos + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The single allowed-transition function.
    ///
    /// Forward moves must be exactly one step; any non-terminal stage may move to
    /// `Failed`; nothing leaves a terminal stage.
    pub fn check_transition(self, to: Stage) -> Result<(), StageError> {
        let allowed = match (self, to) {
            (Self::Done | Self::Failed, _) => false,
            (_, Self::Failed) => true,
            (from, to) => from.successor() == Some(to),
        };
        if allowed {
            Ok(())
        } else {
            Err(StageError::IllegalTransition { from: self, to })
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .iter()
            .chain(std::iter::once(&Self::Failed))
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Invalid stage: {}", s))
    }
}
