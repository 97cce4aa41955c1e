/// Every analytic stage from the graph engine onward either produces a
/// value or explains why it didn't. This replaces the "dict with an
/// `enabled` flag and maybe-null fields" shape of the original pipeline
/// with something the type system enforces.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Stage<T> {
    Enabled(T),
    Disabled { reason: String },
}

impl<T> Stage<T> {
    pub fn disabled(reason: impl Into<String>) -> Self {
        Stage::Disabled {
            reason: reason.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Stage::Enabled(_))
    }

    pub fn as_ref(&self) -> Stage<&T> {
        match self {
            Stage::Enabled(v) => Stage::Enabled(v),
            Stage::Disabled { reason } => Stage::Disabled {
                reason: reason.clone(),
            },
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Stage<U> {
        match self {
            Stage::Enabled(v) => Stage::Enabled(f(v)),
            Stage::Disabled { reason } => Stage::Disabled { reason },
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Stage::Enabled(v) => Some(v),
            Stage::Disabled { .. } => None,
        }
    }
}
