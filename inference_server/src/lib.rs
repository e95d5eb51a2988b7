pub mod error;
pub mod metrics;
pub mod model;
pub mod provider;
pub mod routes;
pub mod state;

pub use error::{AppError, InferenceError, ModelLoadError};
pub use model::{ModelHandle, Prediction};
pub use provider::ModelProvider;
pub use routes::router;
pub use state::{AppState, SharedState};
