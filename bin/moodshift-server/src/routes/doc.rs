use utoipa::OpenApi;

use super::{convert, download, health, progress};

#[derive(OpenApi)]
#[openapi(info(
    title = "moodshift-server",
    description = "Audio style-transform API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(convert::ConvertApi::openapi());
    root.merge(progress::ProgressApi::openapi());
    root.merge(download::DownloadApi::openapi());
    root
}
