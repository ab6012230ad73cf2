use std::fmt;
use std::io;
use std::path::PathBuf;

/// A required collaborator was missing or could not be created.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// No primary stream was supplied.
    #[error("configuration error: no primary connection")]
    MissingPrimary,

    /// No drain was supplied.
    #[error("configuration error: no drain")]
    MissingDrain,

    /// The drain file could not be created.
    #[error("configuration error: cannot create drain {path}: {source}")]
    DrainOpen { path: PathBuf, source: io::Error },
}

pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// The teardown step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseStage {
    Drain,
    Primary,
}

impl fmt::Display for CloseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseStage::Drain => f.write_str("drain"),
            CloseStage::Primary => f.write_str("primary"),
        }
    }
}

/// Every failure from one close, in the order the stages ran.
#[derive(Debug)]
pub struct CloseError {
    failures: Vec<(CloseStage, io::Error)>,
}

impl CloseError {
    pub(crate) fn new() -> Self {
        Self {
            failures: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, stage: CloseStage, err: io::Error) {
        self.failures.push((stage, err));
    }

    pub(crate) fn into_result(self) -> std::result::Result<(), CloseError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn failures(&self) -> &[(CloseStage, io::Error)] {
        &self.failures
    }

    /// The failure recorded for `stage`, if that stage failed.
    pub fn stage(&self, stage: CloseStage) -> Option<&io::Error> {
        self.failures
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, err)| err)
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("close failed")?;
        for (i, (stage, err)) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{stage}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CloseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|(_, err)| err as &(dyn std::error::Error + 'static))
    }
}
