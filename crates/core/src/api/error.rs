use thiserror::Error;

/// Failure of a dashboard API call.
///
/// Cloneable so a single in-flight request can hand the same outcome to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Rejected client-side; never sent to the network.
    #[error("validation error: {0}")]
    Validation(String),
    /// No response (connect failure, timeout, broken body).
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Http { status: u16, detail: Option<String> },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// What the caller was doing when the error happened; selects the wording of
/// the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    Recommendations,
    RecommendationDetail,
    Search,
    StockDetail,
    Tracking,
    Preferences,
    TierStatus,
    Login,
    Registration,
}

impl ErrorContext {
    fn action(&self) -> &'static str {
        match self {
            ErrorContext::Recommendations => "loading recommendations",
            ErrorContext::RecommendationDetail => "loading the recommendation",
            ErrorContext::Search => "searching stocks",
            ErrorContext::StockDetail => "loading the stock",
            ErrorContext::Tracking => "updating tracked stocks",
            ErrorContext::Preferences => "saving preferences",
            ErrorContext::TierStatus => "loading your plan status",
            ErrorContext::Login => "logging in",
            ErrorContext::Registration => "creating your account",
        }
    }
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Only transport failures, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Http { status, .. } => *status == 429 || *status >= 500,
            ApiError::Validation(_) | ApiError::Decode(_) => false,
        }
    }

    pub fn user_message(&self, ctx: ErrorContext) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Network(_) => {
                "Unable to reach the server. Please check your connection and try again."
                    .to_string()
            }
            ApiError::Http { status, detail } => http_message(*status, detail.as_deref(), ctx),
            ApiError::Decode(_) => generic_message(ctx),
        }
    }
}

fn http_message(status: u16, detail: Option<&str>, ctx: ErrorContext) -> String {
    match (status, ctx) {
        (400 | 409, ErrorContext::Registration) => match detail {
            Some("REGISTER_INVALID_PASSWORD") => {
                "Password does not meet the requirements.".to_string()
            }
            Some(d) if status == 409 || d == "REGISTER_USER_ALREADY_EXISTS" => {
                "An account with this email already exists.".to_string()
            }
            None if status == 409 => "An account with this email already exists.".to_string(),
            _ => "Registration failed. Please check your details and try again.".to_string(),
        },
        (400 | 401, ErrorContext::Login) => "Invalid email or password.".to_string(),
        (401, _) => "Your session has expired. Please log in again.".to_string(),
        (403, ErrorContext::RecommendationDetail) => {
            "This recommendation is not available on your current plan. Upgrade to premium for full access."
                .to_string()
        }
        (403, _) => "You do not have access to this resource.".to_string(),
        (404, ErrorContext::RecommendationDetail) => "Recommendation not found.".to_string(),
        (404, ErrorContext::StockDetail | ErrorContext::Tracking) => "Stock not found.".to_string(),
        (404, _) => "The requested resource was not found.".to_string(),
        // Tracking rejections carry a readable reason (already tracked, tier limit).
        (400, ErrorContext::Tracking) => detail
            .map(str::to_string)
            .unwrap_or_else(|| generic_message(ctx)),
        _ => generic_message(ctx),
    }
}

fn generic_message(ctx: ErrorContext) -> String {
    format!("Something went wrong while {}. Please try again.", ctx.action())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, detail: Option<&str>) -> ApiError {
        ApiError::Http {
            status,
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn network_error_asks_to_check_connection() {
        let msg = ApiError::Network("connection refused".into())
            .user_message(ErrorContext::Recommendations);
        assert!(msg.contains("check your connection"));
    }

    #[test]
    fn maps_status_codes_per_context() {
        assert_eq!(
            http(404, None).user_message(ErrorContext::RecommendationDetail),
            "Recommendation not found."
        );
        assert!(http(403, None)
            .user_message(ErrorContext::RecommendationDetail)
            .contains("premium"));
        assert_eq!(
            http(409, None).user_message(ErrorContext::Registration),
            "An account with this email already exists."
        );
        assert_eq!(
            http(400, Some("REGISTER_USER_ALREADY_EXISTS")).user_message(ErrorContext::Registration),
            "An account with this email already exists."
        );
        assert_eq!(
            http(400, Some("LOGIN_BAD_CREDENTIALS")).user_message(ErrorContext::Login),
            "Invalid email or password."
        );
    }

    #[test]
    fn tracking_rejection_surfaces_backend_reason() {
        let msg = http(400, Some("Stock is already being tracked")).user_message(ErrorContext::Tracking);
        assert_eq!(msg, "Stock is already being tracked");
    }

    #[test]
    fn server_errors_are_generic_and_retryable() {
        let err = http(503, Some("upstream down"));
        assert!(err.is_retryable());
        assert_eq!(
            err.user_message(ErrorContext::Search),
            "Something went wrong while searching stocks. Please try again."
        );
        assert!(!http(404, None).is_retryable());
        assert!(!ApiError::Validation("bad".into()).is_retryable());
    }
}
