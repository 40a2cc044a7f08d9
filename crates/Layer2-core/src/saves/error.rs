//! Save 에러 타입

use super::lock::OperationKind;
use crate::git::GitError;
use thiserror::Error;

pub type SaveResult<T> = std::result::Result<T, SaveError>;

/// Failure of a save lifecycle operation
#[derive(Error, Debug)]
pub enum SaveError {
    /// 다른 작업 진행 중
    #[error("Operation in progress: {0}")]
    Busy(OperationKind),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 인증 필요
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Repository not initialized")]
    NotInitialized,

    /// git 명령 실패 (원본 stderr 포함)
    #[error("Failed to {operation}: {source}")]
    Git {
        operation: String,
        #[source]
        source: GitError,
    },

    /// 원격 저장소 접근 실패
    #[error("Remote unreachable: {0}")]
    Remote(String),

    #[error(transparent)]
    Config(#[from] cloudsave_foundation::Error),
}

impl SaveError {
    /// Wrap a git failure with the step that was being attempted
    pub fn git(operation: impl Into<String>, source: GitError) -> Self {
        Self::Git {
            operation: operation.into(),
            source,
        }
    }

    /// 재시도 가능 여부
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

/// Attach an operation label to a git result
pub(crate) trait GitContext<T> {
    fn context(self, operation: &str) -> SaveResult<T>;
}

impl<T> GitContext<T> for Result<T, GitError> {
    fn context(self, operation: &str) -> SaveResult<T> {
        self.map_err(|e| SaveError::git(operation, e))
    }
}
