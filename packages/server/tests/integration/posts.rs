use chrono::{Duration, Utc};
use reqwest::multipart::{Form, Part};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

use yatube::entity::{comment, post};

use crate::common::{TestApp, routes};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n fake png body";

fn image_part(name: &str, data: &[u8]) -> Part {
    Part::bytes(data.to_vec())
        .file_name(name.to_string())
        .mime_str("image/png")
        .expect("Failed to set MIME type")
}

/// Number of uploaded files currently under `media/posts`.
fn stored_images(app: &TestApp) -> usize {
    std::fs::read_dir(app.media_root.join("posts"))
        .map(|dir| dir.count())
        .unwrap_or(0)
}

/// Make every `op` (INSERT or UPDATE) on the post table fail.
async fn reject_post_writes(app: &TestApp, op: &str) {
    app.db
        .execute_unprepared(&format!(
            "CREATE TRIGGER reject_post_{op} BEFORE {op} ON post \
             BEGIN SELECT RAISE(ABORT, 'post writes disabled'); END;"
        ))
        .await
        .expect("Failed to install trigger");
}

mod create {
    use super::*;

    #[tokio::test]
    async fn anonymous_user_is_sent_to_login() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::CREATE).await;

        res.assert_redirect("/auth/login/?next=/create/");
    }

    #[tokio::test]
    async fn create_form_offers_every_group() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        app.create_group("Cats", "cats").await;
        app.create_group("Dogs", "dogs").await;

        let res = app.get_as(routes::CREATE, &leo).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.template(), "posts/create_post.html");
        assert_eq!(res.context()["is_edit"], false);
        assert_eq!(res.context()["groups"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn valid_post_is_saved_for_the_submitter() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let group = app.create_group("Test group", "test-slug").await;
        let group_id = group.id.to_string();

        let res = app
            .post_form_as(
                routes::CREATE,
                &[("text", "A brand new post"), ("group", &group_id)],
                &leo,
            )
            .await;

        res.assert_redirect(&routes::profile("leo"));

        let posts = post::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text, "A brand new post");
        assert_eq!(posts[0].author_id, leo.id);
        assert_eq!(posts[0].group_id, Some(group.id));

        let listed = app.get(&routes::group("test-slug")).await;
        assert_eq!(listed.post_ids(), vec![posts[0].id as i64]);
    }

    #[tokio::test]
    async fn blank_text_redisplays_the_form() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;

        let res = app
            .post_form_as(routes::CREATE, &[("text", "   "), ("group", "")], &leo)
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.template(), "posts/create_post.html");
        assert!(res.context()["form"]["errors"]["text"].is_array());
        assert_eq!(post::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_group_is_an_invalid_choice() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;

        let res = app
            .post_form_as(routes::CREATE, &[("text", "Hello"), ("group", "999")], &leo)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.context()["form"]["errors"]["group"].is_array());
        assert_eq!(res.context()["form"]["fields"]["text"], "Hello");
        assert_eq!(post::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn uploaded_image_is_stored_under_the_media_root() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;

        let form = Form::new()
            .text("text", "With a picture")
            .text("group", "")
            .part("image", image_part("small.png", PNG_BYTES));
        let res = app.post_multipart_as(routes::CREATE, form, &leo).await;

        res.assert_redirect(&routes::profile("leo"));

        let saved = post::Entity::find().one(&app.db).await.unwrap().unwrap();
        let image = saved.image.expect("post should have an image");
        assert!(image.starts_with("posts/"), "unexpected path {image}");
        assert!(image.ends_with(".png"));

        let on_disk = std::fs::read(app.media_root.join(&image)).unwrap();
        assert_eq!(on_disk, PNG_BYTES);
    }

    #[tokio::test]
    async fn image_is_removed_when_the_post_cannot_be_saved() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        reject_post_writes(&app, "INSERT").await;

        let form = Form::new()
            .text("text", "With a picture")
            .part("image", image_part("small.png", PNG_BYTES));
        let res = app.post_multipart_as(routes::CREATE, form, &leo).await;

        assert_eq!(res.status, 500);
        assert_eq!(stored_images(&app), 0);
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;

        let form = Form::new().text("text", "Sneaky").part(
            "image",
            Part::bytes(b"plain text".to_vec()).file_name("notes.txt".to_string()),
        );
        let res = app.post_multipart_as(routes::CREATE, form, &leo).await;

        assert_eq!(res.status, 200);
        assert!(res.context()["form"]["errors"]["image"].is_array());
        assert_eq!(post::Entity::find().count(&app.db).await.unwrap(), 0);
    }
}

mod edit {
    use super::*;

    #[tokio::test]
    async fn author_sees_the_prefilled_form() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let post = app.create_post(&leo, "Original", None).await;

        let res = app.get_as(&routes::post_edit(post.id), &leo).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.template(), "posts/create_post.html");
        assert_eq!(res.context()["is_edit"], true);
        assert_eq!(res.context()["post_id"], post.id);
        assert_eq!(res.context()["form"]["fields"]["text"], "Original");
    }

    #[tokio::test]
    async fn author_edit_keeps_author_and_pub_date() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let group = app.create_group("Test group", "test-slug").await;
        let created = app.create_post(&leo, "Original", None).await;
        let before = post::Entity::find_by_id(created.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        let group_id = group.id.to_string();

        let res = app
            .post_form_as(
                &routes::post_edit(created.id),
                &[("text", "Edited"), ("group", &group_id)],
                &leo,
            )
            .await;

        res.assert_redirect(&routes::post(created.id));

        let after = post::Entity::find_by_id(created.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.text, "Edited");
        assert_eq!(after.group_id, Some(group.id));
        assert_eq!(after.author_id, before.author_id);
        assert_eq!(after.pub_date, before.pub_date);
        assert_eq!(post::Entity::find().count(&app.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn non_author_is_redirected_to_the_post() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let anna = app.create_user("anna").await;
        let post = app.create_post(&leo, "Original", None).await;

        let form_res = app.get_as(&routes::post_edit(post.id), &anna).await;
        form_res.assert_redirect(&routes::post(post.id));

        let res = app
            .post_form_as(&routes::post_edit(post.id), &[("text", "Hijacked")], &anna)
            .await;
        res.assert_redirect(&routes::post(post.id));

        let after = post::Entity::find_by_id(post.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.text, "Original");
    }

    #[tokio::test]
    async fn editing_a_missing_post_is_not_found() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;

        let res = app.get_as(&routes::post_edit(4242), &leo).await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn replacing_an_image_removes_the_old_file() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;

        let form = Form::new()
            .text("text", "Picture")
            .part("image", image_part("first.png", PNG_BYTES));
        app.post_multipart_as(routes::CREATE, form, &leo).await;
        let created = post::Entity::find().one(&app.db).await.unwrap().unwrap();
        let old_image = created.image.clone().unwrap();

        let form = Form::new()
            .text("text", "Picture")
            .part("image", image_part("second.png", b"\x89PNG second"));
        let res = app
            .post_multipart_as(&routes::post_edit(created.id), form, &leo)
            .await;
        res.assert_redirect(&routes::post(created.id));

        let updated = post::Entity::find_by_id(created.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        let new_image = updated.image.unwrap();
        assert_ne!(new_image, old_image);
        assert!(app.media_root.join(&new_image).exists());
        assert!(!app.media_root.join(&old_image).exists());
    }

    #[tokio::test]
    async fn failed_update_keeps_the_old_image_and_drops_the_new_one() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;

        let form = Form::new()
            .text("text", "Picture")
            .part("image", image_part("first.png", PNG_BYTES));
        app.post_multipart_as(routes::CREATE, form, &leo).await;
        let created = post::Entity::find().one(&app.db).await.unwrap().unwrap();
        let old_image = created.image.clone().unwrap();
        reject_post_writes(&app, "UPDATE").await;

        let form = Form::new()
            .text("text", "Picture")
            .part("image", image_part("second.png", b"\x89PNG second"));
        let res = app
            .post_multipart_as(&routes::post_edit(created.id), form, &leo)
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(stored_images(&app), 1);
        assert!(app.media_root.join(&old_image).exists());
    }

    #[tokio::test]
    async fn clear_checkbox_drops_the_image() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;

        let form = Form::new()
            .text("text", "Picture")
            .part("image", image_part("first.png", PNG_BYTES));
        app.post_multipart_as(routes::CREATE, form, &leo).await;
        let created = post::Entity::find().one(&app.db).await.unwrap().unwrap();

        let res = app
            .post_form_as(
                &routes::post_edit(created.id),
                &[("text", "No picture"), ("image-clear", "on")],
                &leo,
            )
            .await;
        res.assert_redirect(&routes::post(created.id));

        let updated = post::Entity::find_by_id(created.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.image, None);
    }
}

mod detail {
    use super::*;

    #[tokio::test]
    async fn detail_shows_post_author_and_comments() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let anna = app.create_user("anna").await;
        let post = app.create_post(&leo, "Hello there", None).await;
        app.create_post(&leo, "Another", None).await;
        app.create_comment(post.id, &anna, "Nice post").await;

        let res = app.get(&routes::post(post.id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.template(), "posts/post_detail.html");
        assert_eq!(res.context()["post"]["text"], "Hello there");
        assert_eq!(res.context()["author"]["username"], "leo");
        assert_eq!(res.context()["posts_count"], 2);
        assert_eq!(res.context()["comments"][0]["text"], "Nice post");
        assert_eq!(res.context()["comments"][0]["author"], "anna");
    }

    #[tokio::test]
    async fn comments_are_listed_newest_first() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let anna = app.create_user("anna").await;
        let post = app.create_post(&leo, "Hello there", None).await;
        let now = Utc::now();
        // Inserted newest first so id order disagrees with time order.
        app.create_comment_at(post.id, &anna, "second", now).await;
        app.create_comment_at(post.id, &leo, "first", now - Duration::hours(1))
            .await;

        let res = app.get(&routes::post(post.id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let comments = res.context()["comments"].as_array().unwrap().clone();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0]["text"], "second");
        assert_eq!(comments[1]["text"], "first");
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::post(4242)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.template(), "core/404.html");
    }

    #[tokio::test]
    async fn comment_on_the_detail_page_redisplays_it() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let post = app.create_post(&leo, "Hello", None).await;

        let res = app
            .post_form_as(&routes::post(post.id), &[("text", "First!")], &leo)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.template(), "posts/post_detail.html");
        assert_eq!(res.context()["comments"][0]["text"], "First!");
        assert_eq!(res.context()["form"]["fields"]["text"], "");
    }

    #[tokio::test]
    async fn blank_comment_on_the_detail_page_shows_errors() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let post = app.create_post(&leo, "Hello", None).await;

        let res = app
            .post_form_as(&routes::post(post.id), &[("text", "  ")], &leo)
            .await;

        assert_eq!(res.status, 200);
        assert!(res.context()["form"]["errors"]["text"].is_array());
        assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 0);
    }
}

mod comments {
    use super::*;

    #[tokio::test]
    async fn comment_is_added_and_redirects_to_the_post() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let anna = app.create_user("anna").await;
        let post = app.create_post(&leo, "Hello", None).await;

        let res = app
            .post_form_as(&routes::comment(post.id), &[("text", "Lovely")], &anna)
            .await;

        res.assert_redirect(&routes::post(post.id));

        let saved = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post.id))
            .all(&app.db)
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].author_id, anna.id);
        assert_eq!(saved[0].text, "Lovely");
    }

    #[tokio::test]
    async fn invalid_comment_is_dropped_silently() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let post = app.create_post(&leo, "Hello", None).await;

        let res = app
            .post_form_as(&routes::comment(post.id), &[("text", "")], &leo)
            .await;

        res.assert_redirect(&routes::post(post.id));
        assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn anonymous_comment_is_sent_to_login() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let post = app.create_post(&leo, "Hello", None).await;

        let res = app
            .post_form(&routes::comment(post.id), &[("text", "Hi")])
            .await;

        res.assert_redirect(&format!("/auth/login/?next=/posts/{}/comment/", post.id));
        assert_eq!(comment::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn comment_on_a_missing_post_is_not_found() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;

        let res = app
            .post_form_as(&routes::comment(4242), &[("text", "Hi")], &leo)
            .await;

        assert_eq!(res.status, 404);
    }
}
