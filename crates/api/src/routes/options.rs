//! Category Option Routes

use axum::{extract::State, Json};
use feature_engine::{OneHotGroup, Superhost};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::SharedState;

/// Selectable values per categorical field
#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    /// Keyed by group name, sentinel first in each list
    pub groups: BTreeMap<OneHotGroup, Vec<String>>,
    pub host_is_superhost: Vec<&'static str>,
}

/// Get category options discovered from the schema
pub async fn get_options(State(state): State<SharedState>) -> Json<OptionsResponse> {
    let categories = state.context.schema().categories();
    let groups = OneHotGroup::ALL
        .into_iter()
        .map(|group| (group, categories.options(group)))
        .collect();

    Json(OptionsResponse {
        groups,
        host_is_superhost: vec![Superhost::Yes.as_str(), Superhost::No.as_str()],
    })
}

#[cfg(test)]
mod tests {
    use crate::{create_router, test_support};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_options_from_schema() {
        let app = create_router(test_support::state());
        let response = app
            .oneshot(Request::get("/api/v1/options").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let groups = &json["groups"];

        assert_eq!(groups["borough"], serde_json::json!(["other", "Manhattan"]));
        assert_eq!(
            groups["property_type"],
            serde_json::json!(["other", "Entire rental unit", "Private room in home"])
        );
        assert_eq!(
            groups["room_type"],
            serde_json::json!(["Entire home/apt", "Private room", "Shared room"])
        );
        assert_eq!(groups["host_response_time"], serde_json::json!(["other", "within an hour"]));
        assert_eq!(groups["host_neighbourhood"], serde_json::json!(["other"]));
        assert_eq!(json["host_is_superhost"], serde_json::json!(["yes", "no"]));
    }
}
