use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    #[error("result contained no usable track points")]
    EmptyResult,
    #[error("malformed flight path row at line {line}: {content:?}")]
    MalformedRow { line: usize, content: String },
}
