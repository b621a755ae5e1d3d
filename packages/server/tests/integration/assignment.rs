use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;

use server::entity::{assignment, assignment_user, exam_activity_log, user};

use crate::common::{TestApp, routes};

async fn reset_enrollment(app: &TestApp, enrollment_id: i32, status: &str) {
    let mut row: assignment_user::ActiveModel =
        assignment_user::Entity::find_by_id(enrollment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into();
    row.status = Set(status.to_string());
    if status == assignment_user::STATUS_NOT_STARTED {
        row.started_at = Set(None);
    }
    row.update(&app.db).await.unwrap();
}

async fn set_assignment_status(app: &TestApp, assignment_id: i32, status: &str) {
    let mut row: assignment::ActiveModel = assignment::Entity::find_by_id(assignment_id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap()
        .into();
    row.status = Set(status.to_string());
    row.update(&app.db).await.unwrap();
}

mod starting {
    use super::*;

    #[tokio::test]
    async fn starting_freezes_max_score_from_problem_points() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        reset_enrollment(&app, ctx.enrollment_id, assignment_user::STATUS_NOT_STARTED).await;

        let other = app.seed_problem().await;
        app.add_problem(ctx.assignment_id, other.id, 50, 2).await;

        let res = app
            .post_with_token(
                &routes::assignment_start(ctx.assignment_id),
                &json!({}),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 200, "start failed: {}", res.text);
        assert_eq!(res.body["status"], "IN_PROGRESS");
        assert_eq!(res.body["max_score"], 150);

        let enrollment = assignment_user::Entity::find_by_id(ctx.enrollment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.status, assignment_user::STATUS_IN_PROGRESS);
        assert_eq!(enrollment.max_score, 150);
        assert!(enrollment.started_at.is_some());
    }

    #[tokio::test]
    async fn starting_twice_keeps_the_original_start_time() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        reset_enrollment(&app, ctx.enrollment_id, assignment_user::STATUS_NOT_STARTED).await;

        let first = app
            .post_with_token(
                &routes::assignment_start(ctx.assignment_id),
                &json!({}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(first.status, 200);

        let second = app
            .post_with_token(
                &routes::assignment_start(ctx.assignment_id),
                &json!({}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(second.status, 200);
        assert_eq!(second.body["status"], "IN_PROGRESS");
        assert_eq!(second.body["started_at"], first.body["started_at"]);
    }

    #[tokio::test]
    async fn draft_and_closed_assignments_cannot_be_started() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        reset_enrollment(&app, ctx.enrollment_id, assignment_user::STATUS_NOT_STARTED).await;

        set_assignment_status(&app, ctx.assignment_id, assignment::STATUS_DRAFT).await;
        let res = app
            .post_with_token(
                &routes::assignment_start(ctx.assignment_id),
                &json!({}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 409);

        set_assignment_status(&app, ctx.assignment_id, assignment::STATUS_CLOSED).await;
        let res = app
            .post_with_token(
                &routes::assignment_start(ctx.assignment_id),
                &json!({}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "PRECONDITION_FAILED");
    }

    #[tokio::test]
    async fn assignment_cannot_be_started_before_its_window() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        reset_enrollment(&app, ctx.enrollment_id, assignment_user::STATUS_NOT_STARTED).await;

        let mut row: assignment::ActiveModel = assignment::Entity::find_by_id(ctx.assignment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into();
        row.start_time = Set(Utc::now() + Duration::hours(1));
        row.end_time = Set(Utc::now() + Duration::hours(2));
        row.update(&app.db).await.unwrap();

        let res = app
            .post_with_token(
                &routes::assignment_start(ctx.assignment_id),
                &json!({}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "PRECONDITION_FAILED");
    }

    #[tokio::test]
    async fn submitted_assignment_cannot_be_restarted() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        reset_enrollment(&app, ctx.enrollment_id, assignment_user::STATUS_SUBMITTED).await;

        let res = app
            .post_with_token(
                &routes::assignment_start(ctx.assignment_id),
                &json!({}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn unenrolled_student_cannot_start() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        let (_, outsider_token) = app.create_user("outsider", user::ROLE_STUDENT).await;

        let res = app
            .post_with_token(
                &routes::assignment_start(ctx.assignment_id),
                &json!({}),
                &outsider_token,
            )
            .await;
        assert_eq!(res.status, 404);
    }
}

mod exam_activity {
    use super::*;

    async fn exam_fixture(app: &TestApp) -> crate::common::AssignmentContext {
        let ctx = app.seed_open_assignment().await;
        let mut row: assignment::ActiveModel = assignment::Entity::find_by_id(ctx.assignment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap()
            .into();
        row.kind = Set(assignment::KIND_EXAM.to_string());
        row.update(&app.db).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn tab_switches_are_logged_and_counted() {
        let app = TestApp::spawn().await;
        let ctx = exam_fixture(&app).await;

        for _ in 0..2 {
            let res = app
                .post_with_token(
                    &routes::assignment_activity(ctx.assignment_id),
                    &json!({"activity_type": "TAB_SWITCH", "suspicion_level": 3}),
                    &ctx.student_token,
                )
                .await;
            assert_eq!(res.status, 204, "activity failed: {}", res.text);
        }

        let enrollment = assignment_user::Entity::find_by_id(ctx.enrollment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.tab_switch_count, 2);
        assert_eq!(enrollment.captured_ai_count, 0);

        let logs = exam_activity_log::Entity::find()
            .filter(exam_activity_log::Column::AssignmentUserId.eq(ctx.enrollment_id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(logs, 2);
    }

    #[tokio::test]
    async fn ai_captures_bump_their_own_counter() {
        let app = TestApp::spawn().await;
        let ctx = exam_fixture(&app).await;

        let res = app
            .post_with_token(
                &routes::assignment_activity(ctx.assignment_id),
                &json!({"activity_type": "AI_CAPTURE", "suspicion_level": 8}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 204);

        let enrollment = assignment_user::Entity::find_by_id(ctx.enrollment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.captured_ai_count, 1);
        assert_eq!(enrollment.tab_switch_count, 0);
    }

    #[tokio::test]
    async fn unknown_activity_types_are_logged_without_counters() {
        let app = TestApp::spawn().await;
        let ctx = exam_fixture(&app).await;

        let res = app
            .post_with_token(
                &routes::assignment_activity(ctx.assignment_id),
                &json!({"activity_type": "CLIPBOARD_PASTE", "suspicion_level": 2}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 204);

        let enrollment = assignment_user::Entity::find_by_id(ctx.enrollment_id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.tab_switch_count, 0);
        assert_eq!(enrollment.captured_ai_count, 0);

        let logs = exam_activity_log::Entity::find()
            .filter(exam_activity_log::Column::AssignmentUserId.eq(ctx.enrollment_id))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(logs, 1);
    }

    #[tokio::test]
    async fn activity_logging_is_exam_only() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await; // HOMEWORK

        let res = app
            .post_with_token(
                &routes::assignment_activity(ctx.assignment_id),
                &json!({"activity_type": "TAB_SWITCH", "suspicion_level": 3}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn suspicion_level_is_bounded() {
        let app = TestApp::spawn().await;
        let ctx = exam_fixture(&app).await;

        let res = app
            .post_with_token(
                &routes::assignment_activity(ctx.assignment_id),
                &json!({"activity_type": "TAB_SWITCH", "suspicion_level": 11}),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 400);
    }
}

mod best_submission_listing {
    use super::*;

    #[tokio::test]
    async fn students_see_their_own_best_submissions_by_default() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;

        let res = app
            .get_with_token(
                &routes::best_submissions(ctx.assignment_id),
                &ctx.student_token,
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["user_id"], ctx.student_id);
        assert_eq!(res.body["status"], "IN_PROGRESS");
        assert!(res.body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn students_cannot_inspect_other_students() {
        let app = TestApp::spawn().await;
        let ctx = app.seed_open_assignment().await;
        let (other_id, _) = app.create_user("student2", user::ROLE_STUDENT).await;
        app.enroll(
            ctx.assignment_id,
            other_id,
            assignment_user::STATUS_IN_PROGRESS,
        )
        .await;

        let res = app
            .get_with_token(
                &routes::best_submissions_for(ctx.assignment_id, other_id),
                &ctx.student_token,
            )
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        let res = app
            .get_with_token(
                &routes::best_submissions_for(ctx.assignment_id, other_id),
                &ctx.teacher_token,
            )
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["user_id"], other_id);
    }
}
