use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use log::{error, info};
use shared::{ErrorResponse, UploadResponse};

use crate::ingest::{read_upload, IngestionError, IngestionHandler};
use crate::storage::ImageStore;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/upload").route(web::post().to(upload_image)))
        // older clients post here; same contract
        .service(web::resource("/api/upload/upload").route(web::post().to(upload_image)))
        .service(web::resource("/api/upload/upload-image").route(web::post().to(upload_image)))
        .service(web::resource("/images/{image_id}").route(web::get().to(get_image)));
}

async fn upload_image(
    handler: web::Data<IngestionHandler>,
    payload: Multipart,
) -> Result<HttpResponse, IngestionError> {
    let form = read_upload(payload, handler.max_upload_bytes())
        .await
        .inspect_err(|e| info!("Rejected upload: {}", e))?;
    let outcome = handler.accept(form).await?;
    Ok(HttpResponse::Ok().json(UploadResponse::from(outcome)))
}

async fn get_image(store: web::Data<dyn ImageStore>, path: web::Path<i64>) -> HttpResponse {
    let image_id = path.into_inner();
    match store.get(image_id).await {
        Ok(Some(image)) => HttpResponse::Ok()
            .content_type(image.content_type)
            .body(image.image_data),
        Ok(None) => HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Image {} not found", image_id),
        }),
        Err(e) => {
            error!("Error retrieving image {}: {}", image_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to retrieve image".into(),
            })
        }
    }
}
