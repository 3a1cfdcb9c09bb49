mod environment;
mod error;
mod extractors;

pub use environment::Environment;
pub use error::{AppError, ErrorResponse};
pub use extractors::{FormBody, JsonBody, RequestOrigin, ValidatedJson};
