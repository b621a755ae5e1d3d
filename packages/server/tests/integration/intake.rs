use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;

use server::entity::{assignment, assignment_user, submission, user};

use crate::common::{TestApp, routes};

mod assignment_submissions {
    use super::*;

    #[tokio::test]
    async fn student_can_submit_to_an_open_assignment() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 201, "submission failed: {}", res.text);
        assert_eq!(res.body["status"], "Pending");
        assert_eq!(res.body["problem_id"], ctx.problem_id);
        assert_eq!(res.body["dataset_id"], ctx.dataset_id);

        let row = submission::Entity::find_by_id(res.id())
            .one(&app.db)
            .await
            .unwrap()
            .expect("submission row should exist");
        assert_eq!(row.assignment_user_id, Some(ctx.enrollment_id));
        assert_eq!(row.user_id, ctx.student_id);
    }

    #[tokio::test]
    async fn closed_assignment_rejects_submission_without_a_row() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let mut row: assignment::ActiveModel = assignment::Entity::find_by_id(ctx.assignment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into();
        row.status = Set(assignment::STATUS_CLOSED.to_string());
        row.update(&app.db).await.unwrap();

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "PRECONDITION_FAILED");

        let count = submission::Entity::find().count(&app.db).await.unwrap();
        assert_eq!(count, 0, "no submission row may be created on rejection");
    }

    #[tokio::test]
    async fn draft_assignment_rejects_submission() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let mut row: assignment::ActiveModel = assignment::Entity::find_by_id(ctx.assignment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into();
        row.status = Set(assignment::STATUS_DRAFT.to_string());
        row.update(&app.db).await.unwrap();

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "PRECONDITION_FAILED");
    }

    #[tokio::test]
    async fn past_deadline_is_rejected_unless_late_submission_is_allowed() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let mut row: assignment::ActiveModel = assignment::Entity::find_by_id(ctx.assignment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into();
        row.end_time = Set(Utc::now() - Duration::minutes(5));
        row.update(&app.db).await.unwrap();

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "PRECONDITION_FAILED");

        let mut row: assignment::ActiveModel = assignment::Entity::find_by_id(ctx.assignment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into();
        row.allow_late_submission = Set(true);
        row.update(&app.db).await.unwrap();

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 201, "late submission failed: {}", res.text);
    }

    #[tokio::test]
    async fn student_must_start_the_assignment_first() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let mut row: assignment_user::ActiveModel =
            assignment_user::Entity::find_by_id(ctx.enrollment_id)
                .one(&app.db)
                .await
                .unwrap()
                .unwrap()
                .into();
        row.status = Set(assignment_user::STATUS_NOT_STARTED.to_string());
        row.started_at = Set(None);
        row.update(&app.db).await.unwrap();

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "PRECONDITION_FAILED");
    }

    #[tokio::test]
    async fn unenrolled_student_gets_not_found() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        let (_, outsider_token) = app.create_user("outsider", user::ROLE_STUDENT).await;

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &outsider_token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn problem_outside_the_assignment_gets_not_found() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        let other = app.seed_problem().await;

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, other.id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod practice_submissions {
    use super::*;

    #[tokio::test]
    async fn practice_submission_has_no_assignment_link() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let res = app
            .post_with_token(
                &routes::problem_submissions(ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 201, "submission failed: {}", res.text);
        let row = submission::Entity::find_by_id(res.id())
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.assignment_user_id, None);
    }

    #[tokio::test]
    async fn unknown_problem_gets_not_found() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let res = app
            .post_with_token(
                &routes::problem_submissions(999_999),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let res = app
            .post_without_token(
                &routes::problem_submissions(ctx.problem_id),
                &ctx.submission_body(),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod submission_validation {
    use super::*;

    #[tokio::test]
    async fn unknown_language_is_rejected() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let body = json!({
            "dataset_id": ctx.dataset_id,
            "language": "befunge",
            "source_code_ref": ctx.source_ref,
        });
        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &body,
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn disabled_language_is_rejected() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        app.seed_language("fortran", false).await;

        let body = json!({
            "dataset_id": ctx.dataset_id,
            "language": "fortran",
            "source_code_ref": ctx.source_ref,
        });
        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &body,
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn disallowed_pairing_is_rejected() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        app.seed_pairing(ctx.problem_id, ctx.language_id, false)
            .await;

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(
            res.body["message"]
                .as_str()
                .unwrap()
                .contains("not allowed"),
            "unexpected message: {}",
            res.text
        );
    }

    #[tokio::test]
    async fn dataset_of_another_problem_is_rejected() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        let other = app.seed_problem().await;
        let foreign_dataset = app.seed_dataset(other.id).await;

        let body = json!({
            "dataset_id": foreign_dataset,
            "language": "python",
            "source_code_ref": ctx.source_ref,
        });
        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &body,
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn empty_source_is_rejected() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        let empty_ref = app.put_blob(b"").await;

        let body = json!({
            "dataset_id": ctx.dataset_id,
            "language": "python",
            "source_code_ref": empty_ref,
        });
        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &body,
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn oversized_source_is_rejected() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        // Fixture problems cap source at 64 KiB.
        let big = vec![b'a'; 65 * 1024];
        let big_ref = app.put_blob(&big).await;

        let body = json!({
            "dataset_id": ctx.dataset_id,
            "language": "python",
            "source_code_ref": big_ref,
        });
        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &body,
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn unknown_blob_ref_is_rejected() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let body = json!({
            "dataset_id": ctx.dataset_id,
            "language": "python",
            "source_code_ref": "0".repeat(64),
        });
        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &body,
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod submission_queries {
    use super::*;

    #[tokio::test]
    async fn student_can_poll_their_own_submission() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let created = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;
        assert_eq!(created.status, 201);

        let res = app
            .get_with_token(&routes::submission(created.id()), &ctx.student_token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "Pending");
        assert!(res.body["test_case_results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_students_cannot_see_the_submission() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        let (_, other_token) = app.create_user("student2", user::ROLE_STUDENT).await;

        let created = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        let res = app
            .get_with_token(&routes::submission(created.id()), &other_token)
            .await;
        assert_eq!(res.status, 404);

        let res = app
            .get_with_token(&routes::submission(created.id()), &ctx.teacher_token)
            .await;
        assert_eq!(res.status, 200, "teachers can see any submission");
    }

    #[tokio::test]
    async fn students_only_list_their_own_submissions() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        let (other_id, other_token) = app.create_user("student2", user::ROLE_STUDENT).await;
        app.enroll(
            ctx.assignment_id,
            other_id,
            assignment_user::STATUS_IN_PROGRESS,
        )
        .await;

        app.post_with_token(
            &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
            &ctx.submission_body(),
            &ctx.student_token,
        )
        .await;
        app.post_with_token(
            &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
            &ctx.submission_body(),
            &other_token,
        )
        .await;

        let res = app
            .get_with_token(routes::SUBMISSIONS, &ctx.student_token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["pagination"]["total"], 1);

        let res = app
            .get_with_token(routes::SUBMISSIONS, &ctx.teacher_token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn system_error_is_masked_for_students() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let created = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;

        let mut row: submission::ActiveModel = submission::Entity::find_by_id(created.id())
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into();
        row.status = Set(common::SubmissionStatus::SystemError);
        row.error_code = Set(Some("WORKER_PROCESSING_FAILED".to_string()));
        row.error_message = Set(Some("redis timeout".to_string()));
        row.update(&app.db).await.unwrap();

        let res = app
            .get_with_token(&routes::submission(created.id()), &ctx.student_token)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "SystemError");
        assert_eq!(res.body["error_code"], "JUDGING_FAILED");
        assert!(res.text.find("WORKER_PROCESSING_FAILED").is_none());

        let res = app
            .get_with_token(&routes::submission(created.id()), &ctx.teacher_token)
            .await;
        assert_eq!(res.body["error_code"], "WORKER_PROCESSING_FAILED");
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let created = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;
        app.post_with_token(
            &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
            &ctx.submission_body(),
            &ctx.student_token,
        )
        .await;

        let mut row: submission::ActiveModel = submission::Entity::find_by_id(created.id())
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into();
        row.status = Set(common::SubmissionStatus::Passed);
        row.update(&app.db).await.unwrap();

        let res = app
            .get_with_token(
                &format!("{}?status=Passed", routes::SUBMISSIONS),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["id"], created.id());
    }

    #[tokio::test]
    async fn pending_submissions_are_not_enqueued_without_mq() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let res = app
            .post_with_token(
                &routes::assignment_submissions(ctx.assignment_id, ctx.problem_id),
                &ctx.submission_body(),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 201);

        let row = submission::Entity::find()
            .filter(submission::Column::Id.eq(res.id()))
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, common::SubmissionStatus::Pending);
    }
}
