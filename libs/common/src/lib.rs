pub mod error;
pub mod response;
pub mod utils;

pub use error::{AppError, Result};
pub use response::ApiResponse;
pub use utils::clamp_limit;
