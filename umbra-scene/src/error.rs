use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("bone palette has {count} matrices, at most {max} are supported")]
    TooManyBones { count: usize, max: usize },
}
