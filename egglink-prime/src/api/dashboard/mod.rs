use axum::{Router, response::Html, routing::get};

/// Device list page.
pub async fn dashboard_index() -> Html<&'static str> {
    Html(include_str!("templates/index.html"))
}

/// Per-device page. The device id is read back from the URL by the page
/// script, so one template serves every device.
pub async fn device_board() -> Html<&'static str> {
    Html(include_str!("templates/board.html"))
}

pub fn dashboard_router<T>() -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(dashboard_index))
        .route("/board/{*uid}", get(device_board))
}
