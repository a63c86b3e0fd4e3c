use base64::{Engine, engine::general_purpose::STANDARD};
use sea_orm::EntityTrait;
use serde_json::json;

use server::entity::image;

use crate::common::{TestApp, routes};

const PNG_A: &str = "iVBORw0KGgoAAAANSUhEUgAAAAUAAAAFCAIAAAACDbGyAAAACXBIWXMAAAsTAAALEwEAmpwYAAAAB3RJTUUH4gEcDCo5iYNs+gAAAB1pVFh0Q29tbWVudAAAAAAAQ3JlYXRlZCB3aXRoIEdJTVBkLmUHAAAAFElEQVQI12O0jN/KgASYGFABqXwAZtoBV6Sl3hIAAAAASUVORK5CYII=";
const PNG_B: &str = "iVBORw0KGgoAAAANSUhEUgAAAAUAAAAFCAIAAAACDbGyAAAACXBIWXMAAAsTAAALEwEAmpwYAAAAB3RJTUUH4gEcDQ4S1RUeKwAAAB1pVFh0Q29tbWVudAAAAAAAQ3JlYXRlZCB3aXRoIEdJTVBkLmUHAAAAFElEQVQI12NctNWSAQkwMaACUvkAfCkBmjyhGl4AAAAASUVORK5CYII=";

fn png_a() -> Vec<u8> {
    STANDARD.decode(PNG_A).unwrap()
}

mod gallery_upload {
    use super::*;

    #[tokio::test]
    async fn stores_blob_and_record() {
        let app = TestApp::spawn().await;
        let token = app.token(1);

        let res = app
            .upload_gallery("first-image.png", png_a(), Some(42), &token)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let path = res.body["path"].as_str().unwrap();
        assert!(path.starts_with("uploads/images/gallery/"), "{path}");
        assert!(path.ends_with("/first-image.png"), "{path}");
        assert_eq!(res.body["name"], "first-image.png");
        assert_eq!(res.body["type"], "gallery");
        assert_eq!(res.body["uploaded_to"], 42);
        assert_eq!(res.body["created_by"], 1);
        assert_eq!(res.body["updated_by"], 1);
        assert_eq!(
            res.body["url"].as_str().unwrap(),
            format!("http://images.test/{path}")
        );

        let stored = tokio::fs::read(app.blob_file(path)).await.unwrap();
        assert_eq!(stored, png_a());
    }

    #[tokio::test]
    async fn same_name_gets_numbered_suffix() {
        let app = TestApp::spawn().await;
        let token = app.token(1);

        let first = app.upload_gallery("dup.png", png_a(), None, &token).await;
        let second = app.upload_gallery("dup.png", png_a(), None, &token).await;

        assert_eq!(first.status, 201);
        assert_eq!(second.status, 201);
        assert!(first.body["path"].as_str().unwrap().ends_with("/dup.png"));
        assert!(second.body["path"].as_str().unwrap().ends_with("/dup-1.png"));
        assert_eq!(first.body["uploaded_to"], 0);
    }

    #[tokio::test]
    async fn rejects_disallowed_extension_and_empty_files() {
        let app = TestApp::spawn().await;
        let token = app.token(1);

        let res = app
            .upload_gallery("payload.exe", b"MZ".to_vec(), None, &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");

        let res = app.upload_gallery("empty.png", vec![], None, &token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");

        let res = app.get_with_token(routes::IMAGES, &token).await;
        assert_eq!(res.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn stored_file_is_served_at_its_path() {
        let app = TestApp::spawn().await;
        let token = app.token(1);

        let res = app.upload_gallery("served.png", png_a(), None, &token).await;
        let path = res.body["path"].as_str().unwrap();

        let served = app
            .client
            .get(app.url(&format!("/{path}")))
            .send()
            .await
            .unwrap();
        assert_eq!(served.status().as_u16(), 200);
        assert_eq!(served.bytes().await.unwrap().to_vec(), png_a());
    }
}

mod auth {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app.get_without_token(routes::IMAGES).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app.get_with_token(routes::IMAGES, "garbage").await;
        assert_eq!(res.status, 401);
        assert_eq!(res.code(), "TOKEN_INVALID");
    }
}

mod drawings {
    use super::*;

    #[tokio::test]
    async fn base64_round_trips() {
        let app = TestApp::spawn().await;
        let token = app.token(3);

        let id = app
            .create_drawing(&format!("data:image/png;base64,{PNG_A}"), &token)
            .await;

        let record = app.get_with_token(&routes::image(id), &token).await;
        assert_eq!(record.body["type"], "drawio");
        let name = record.body["name"].as_str().unwrap();
        assert!(name.starts_with("drawing-3-"), "{name}");
        assert!(name.ends_with(".png"), "{name}");

        let res = app.get_with_token(&routes::image_base64(id), &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["content"], PNG_A);
    }

    #[tokio::test]
    async fn replace_keeps_id_and_path() {
        let app = TestApp::spawn().await;
        let id = app.create_drawing(PNG_B, &app.token(3)).await;
        let before = app.get_with_token(&routes::image(id), &app.token(3)).await;

        let res = app
            .put_with_token(
                &routes::drawing_replace(id),
                &json!({ "image": format!("image/png;base64,{PNG_A}") }),
                &app.token(4),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.id(), id);
        assert_eq!(res.body["path"], before.body["path"]);
        assert_eq!(res.body["url"], before.body["url"]);
        assert_eq!(res.body["created_by"], 3);
        assert_eq!(res.body["updated_by"], 4);

        let content = app
            .get_with_token(&routes::image_base64(id), &app.token(3))
            .await;
        assert_eq!(content.body["content"], PNG_A);
    }

    #[tokio::test]
    async fn replace_rejects_gallery_images() {
        let app = TestApp::spawn().await;
        let token = app.token(1);
        let gallery = app.upload_gallery("g.png", png_a(), None, &token).await;

        let res = app
            .put_with_token(
                &routes::drawing_replace(gallery.id()),
                &json!({ "image": PNG_B }),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_base64_is_a_decode_error() {
        let app = TestApp::spawn().await;
        let token = app.token(1);

        let res = app
            .post_with_token(
                routes::DRAWING_UPLOAD,
                &json!({ "uploaded_to": 0, "image": "image/png;base64,@@not base64@@" }),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "DECODE_ERROR");

        let res = app
            .post_with_token(routes::DRAWING_UPLOAD, &json!({ "uploaded_to": 0 }), &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn removes_blob_then_record() {
        let app = TestApp::spawn().await;
        let token = app.token(1);
        let res = app.upload_gallery("gone.png", png_a(), None, &token).await;
        let id = res.id();
        let file = app.blob_file(res.body["path"].as_str().unwrap());
        assert!(file.exists());

        let res = app.delete_with_token(&routes::image(id), &token).await;
        assert_eq!(res.status, 204);
        assert!(!file.exists());
        assert!(
            image::Entity::find_by_id(id)
                .one(&app.db)
                .await
                .unwrap()
                .is_none()
        );

        let again = app.delete_with_token(&routes::image(id), &token).await;
        assert_eq!(again.status, 404);
        assert_eq!(again.code(), "NOT_FOUND");

        let base64 = app.get_with_token(&routes::image_base64(id), &token).await;
        assert_eq!(base64.status, 404);
    }

    #[tokio::test]
    async fn succeeds_when_blob_is_already_missing() {
        let app = TestApp::spawn().await;
        let token = app.token(1);
        let res = app.upload_gallery("lost.png", png_a(), None, &token).await;
        let id = res.id();
        tokio::fs::remove_file(app.blob_file(res.body["path"].as_str().unwrap()))
            .await
            .unwrap();

        let base64 = app.get_with_token(&routes::image_base64(id), &token).await;
        assert_eq!(base64.status, 404);

        let res = app.delete_with_token(&routes::image(id), &token).await;
        assert_eq!(res.status, 204);
    }
}

mod records {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_type_and_owner() {
        let app = TestApp::spawn().await;
        let token = app.token(1);
        for i in 0..3 {
            app.upload_gallery(&format!("g{i}.png"), png_a(), Some(7), &token)
                .await;
        }
        app.upload_gallery("other.png", png_a(), Some(8), &token)
            .await;
        app.create_drawing(PNG_A, &token).await;

        let res = app
            .get_with_token(
                &format!("{}?type=gallery&uploaded_to=7&per_page=2", routes::IMAGES),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);

        let res = app
            .get_with_token(&format!("{}?type=drawio", routes::IMAGES), &token)
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["type"], "drawio");
    }

    #[tokio::test]
    async fn rename_changes_only_the_name() {
        let app = TestApp::spawn().await;
        let created = app
            .upload_gallery("before.png", png_a(), None, &app.token(1))
            .await;

        let res = app
            .put_with_token(
                &routes::image(created.id()),
                &json!({ "name": "after.png" }),
                &app.token(2),
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["name"], "after.png");
        assert_eq!(res.body["path"], created.body["path"]);
        assert_eq!(res.body["updated_by"], 2);

        let res = app
            .put_with_token(
                &routes::image(created.id()),
                &json!({ "name": "../escape.png" }),
                &app.token(2),
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn content_is_streamed_with_guessed_type() {
        let app = TestApp::spawn().await;
        let token = app.token(1);
        let created = app.upload_gallery("pic.png", png_a(), None, &token).await;

        let res = app
            .client
            .get(app.url(&routes::image_content(created.id())))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
        assert_eq!(res.headers()["content-type"], "image/png");
        assert_eq!(res.bytes().await.unwrap().to_vec(), png_a());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let app = TestApp::spawn().await;
        let token = app.token(1);

        for path in [
            routes::image(999),
            routes::image_base64(999),
            routes::image_content(999),
        ] {
            let res = app.get_with_token(&path, &token).await;
            assert_eq!(res.status, 404, "{path}");
            assert_eq!(res.code(), "NOT_FOUND");
        }

        let res = app
            .put_with_token(&routes::drawing_replace(999), &json!({ "image": PNG_A }), &token)
            .await;
        assert_eq!(res.status, 404);
    }
}
