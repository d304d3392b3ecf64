use sea_orm::{DbBackend, EntityTrait, FromQueryResult, PaginatorTrait, Statement};

use yatube::admin;
use yatube::config::SeedGroup;
use yatube::entity::{comment, follow, group, post, user};

use crate::common::{TestApp, routes};

mod deletion {
    use super::*;

    #[tokio::test]
    async fn deleting_a_group_keeps_its_posts() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let group = app.create_group("Test group", "test-slug").await;
        let post = app.create_post(&leo, "Grouped", Some(group.id)).await;

        assert!(admin::delete_group(&app.db, group.id).await.unwrap());

        let kept = post::Entity::find_by_id(post.id)
            .one(&app.db)
            .await
            .unwrap()
            .expect("post should survive its group");
        assert_eq!(kept.group_id, None);
        assert_eq!(app.get(&routes::group("test-slug")).await.status, 404);
    }

    #[tokio::test]
    async fn deleting_a_post_keeps_its_comments() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let post = app.create_post(&leo, "Doomed", None).await;
        let comment = app.create_comment(post.id, &leo, "Still here").await;

        assert!(admin::delete_post(&app.db, post.id).await.unwrap());
        assert!(!admin::delete_post(&app.db, post.id).await.unwrap());

        let kept = comment::Entity::find_by_id(comment.id)
            .one(&app.db)
            .await
            .unwrap()
            .expect("comment should survive its post");
        assert_eq!(kept.post_id, None);
        assert_eq!(app.get(&routes::post(post.id)).await.status, 404);
    }

    #[tokio::test]
    async fn deleting_a_user_removes_everything_they_own() {
        let app = TestApp::spawn().await;
        let leo = app.create_user("leo").await;
        let anna = app.create_user("anna").await;

        let leos_post = app.create_post(&leo, "By Leo", None).await;
        let annas_post = app.create_post(&anna, "By Anna", None).await;
        let on_leos_post = app.create_comment(leos_post.id, &anna, "Anna on Leo").await;
        app.create_comment(annas_post.id, &leo, "Leo on Anna").await;
        app.get_as(&routes::follow("anna"), &leo).await;
        app.get_as(&routes::follow("leo"), &anna).await;
        assert_eq!(follow::Entity::find().count(&app.db).await.unwrap(), 2);

        assert!(admin::delete_user(&app.db, leo.id).await.unwrap());

        assert!(user::Entity::find_by_id(leo.id).one(&app.db).await.unwrap().is_none());
        assert_eq!(follow::Entity::find().count(&app.db).await.unwrap(), 0);

        let posts = post::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, annas_post.id);

        let comments = comment::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(comments.len(), 1, "only Anna's comment should remain");
        assert_eq!(comments[0].id, on_leos_post.id);
        assert_eq!(comments[0].post_id, None);

        assert_eq!(app.get(&routes::profile("leo")).await.status, 404);
    }

    #[tokio::test]
    async fn deleting_a_missing_row_reports_false() {
        let app = TestApp::spawn().await;

        assert!(!admin::delete_group(&app.db, 99).await.unwrap());
        assert!(!admin::delete_user(&app.db, 99).await.unwrap());
    }
}

mod seeding {
    use super::*;

    #[tokio::test]
    async fn configured_groups_are_seeded_once() {
        let seeds = vec![SeedGroup {
            title: "Test group".to_string(),
            slug: "test-slug".to_string(),
            description: "Seeded".to_string(),
        }];
        let app = TestApp::spawn_with(|c| c.seed.groups = seeds.clone()).await;

        yatube::seed::seed_groups(&app.db, &seeds).await.unwrap();

        assert_eq!(group::Entity::find().count(&app.db).await.unwrap(), 1);
        let res = app.get(&routes::group("test-slug")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.context()["group"]["description"], "Seeded");
    }

    #[derive(Debug, FromQueryResult)]
    struct IndexColumn {
        name: String,
    }

    #[tokio::test]
    async fn listing_index_covers_the_full_sort_order() {
        let app = TestApp::spawn().await;

        let columns = IndexColumn::find_by_statement(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT name FROM pragma_index_info('idx_post_pub_date_id') ORDER BY seqno",
        ))
        .all(&app.db)
        .await
        .unwrap();

        let names: Vec<_> = columns.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["pub_date", "id"]);
    }
}
