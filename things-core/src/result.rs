use error_stack::Report;

pub type RepoResult<T> = Result<T, Report<ThingRepoError>>;
pub type OptRepoResult<T> = Result<Option<T>, Report<ThingRepoError>>;

#[derive(Debug, thiserror::Error)]
pub enum ThingRepoError {
    #[error("failed to get thing")]
    Get,
    #[error("failed to list things")]
    List,
    #[error("failed to create thing")]
    Create,
    #[error("failed to replace thing")]
    Replace,
    #[error("failed to delete thing")]
    Delete,
}
