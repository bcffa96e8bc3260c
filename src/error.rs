use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("correctness mismatch ({combiner}): expected {expected}, observed {observed}")]
    Mismatch {
        combiner: &'static str,
        expected: String,
        observed: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
