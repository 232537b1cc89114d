// ABOUTME: Error type shared by all control-plane capability calls.
// ABOUTME: Backends map their own failures into these variants.

/// Errors from control-plane operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("control plane rejected the request: {0}")]
    Api(String),

    #[error("waiter failed: {0}")]
    Waiter(String),

    #[error("could not reach control plane: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}
