use axum::response::IntoResponse;

// Undocumented convenience route; points humans at the service name.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn root_returns_ok() {
        let response = root().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
