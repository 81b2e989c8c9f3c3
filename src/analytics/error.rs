use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDateTime;
use derive_more::{Display, From};

#[derive(Debug, Display, From)]
pub enum AnalyticsError {
    /// Rejected before anything is fetched.
    #[display(fmt = "endDate {} must not be before startDate {}", end, start)]
    #[from(ignore)]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[display(fmt = "attendance store failure: {}", _0)]
    Store(sqlx::Error),

    #[display(fmt = "attendance event {} has unknown event type {:?}", event_id, event_type)]
    #[from(ignore)]
    MalformedEvent { event_id: u64, event_type: String },

    #[display(fmt = "{} must be a non-negative number, got {}", name, value)]
    #[from(ignore)]
    InvalidParameter { name: &'static str, value: f64 },

    #[display(fmt = "unsupported export format {:?}, only csv is supported", _0)]
    #[from(ignore)]
    UnsupportedFormat(String),

    #[display(fmt = "export failed: {}", _0)]
    #[from(ignore)]
    Export(String),
}

impl std::error::Error for AnalyticsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalyticsError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl ResponseError for AnalyticsError {
    fn status_code(&self) -> StatusCode {
        match self {
            AnalyticsError::InvalidRange { .. }
            | AnalyticsError::InvalidParameter { .. }
            | AnalyticsError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Analytics request failed");
            return HttpResponse::build(status).json(serde_json::json!({
                "message": "Internal Server Error"
            }));
        }

        HttpResponse::build(status).json(serde_json::json!({
            "message": self.to_string()
        }))
    }
}
