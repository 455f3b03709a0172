use thiserror::Error;

/// Failures surfaced by the soundscape engine.
///
/// None of these are fatal to the host: a failed `start()` leaves the engine
/// Idle and the caller simply gets no sound.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The audio context could not be constructed in this environment.
    #[error("audio context unavailable at {sample_rate} Hz")]
    ContextUnavailable { sample_rate: f64 },

    #[error("invalid soundscape config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reported by an external image generator.
#[derive(Debug, Error, PartialEq)]
pub enum GenerationError {
    #[error("image generator credential is missing")]
    MissingCredential,

    #[error("generator response contained no image")]
    NoImageInResponse,

    #[error("image request failed: {0}")]
    Request(String),
}
