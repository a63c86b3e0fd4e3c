use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/images", image_routes(config))
}

fn image_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let uploads = OpenApiRouter::new()
        .routes(routes!(handlers::image::upload_gallery_image))
        .routes(routes!(handlers::image::upload_drawing))
        .routes(routes!(handlers::image::replace_drawing))
        .layer(handlers::image::image_upload_body_limit(
            config.storage.max_blob_size,
        ));

    OpenApiRouter::new()
        .routes(routes!(handlers::image::list_images))
        .routes(routes!(
            handlers::image::get_image,
            handlers::image::rename_image,
            handlers::image::delete_image
        ))
        .routes(routes!(handlers::image::get_image_base64))
        .routes(routes!(handlers::image::get_image_content))
        .merge(uploads)
}
