use serde::Serialize;

/// Envelope for every JSON response the service sends.
///
/// ```json
/// {
///   "success": true,
///   "data": { "job": "evaluate_assignment:4", "queued": true },
///   "message": "Evaluation queued"
/// }
/// ```
///
/// Errors carry `success: false` and a default `data` payload.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Error response. `data` falls back to `T::default()`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }
}
