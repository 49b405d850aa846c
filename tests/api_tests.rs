// tests/api_tests.rs

mod common;

use common::spawn_app;
use serde_json::{Value, json};

#[tokio::test]
async fn subject_crud_is_admin_only_for_writes() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (_, password) = app
        .create_user(&admin, "Rui", "rui@easyquiz.test", "PROFESSOR", &[])
        .await;
    let prof = app.token_for("rui@easyquiz.test", &password).await;

    let id = app.create_subject(&admin, "  Geography ").await;

    let fetched: Value = app
        .get(&prof, &format!("/disciplina/{}", id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["name"], "Geography");

    let forbidden = app
        .post(&prof, "/disciplina", json!({ "name": "Art" }))
        .await;
    assert_eq!(forbidden.status().as_u16(), 403);

    let empty = app.post(&admin, "/disciplina", json!({ "name": "" })).await;
    assert_eq!(empty.status().as_u16(), 400);

    let renamed = app
        .put(&admin, &format!("/disciplina/{}", id), json!({ "name": "World Geography" }))
        .await;
    assert_eq!(renamed.status().as_u16(), 200);
    let renamed: Value = renamed.json().await.unwrap();
    assert_eq!(renamed["name"], "World Geography");

    let list: Vec<Value> = app.get(&prof, "/disciplina").await.json().await.unwrap();
    assert_eq!(list.len(), 1);

    assert_eq!(
        app.delete(&prof, &format!("/disciplina/{}", id)).await.status().as_u16(),
        403
    );
    assert_eq!(
        app.delete(&admin, &format!("/disciplina/{}", id)).await.status().as_u16(),
        204
    );
    assert_eq!(
        app.get(&admin, &format!("/disciplina/{}", id)).await.status().as_u16(),
        404
    );
    assert_eq!(
        app.put(&admin, "/disciplina/9999", json!({ "name": "X" }))
            .await
            .status()
            .as_u16(),
        404
    );
}

#[tokio::test]
async fn deleting_subject_detaches_questions_and_drops_links() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let subject = app.create_subject(&admin, "Astronomy").await;
    let (prof_id, password) = app
        .create_user(&admin, "Sara", "sara@easyquiz.test", "PROFESSOR", &[subject])
        .await;
    let prof = app.token_for("sara@easyquiz.test", &password).await;

    let created: Value = app
        .post(
            &prof,
            "/questao",
            json!({
                "body": "Describe a supernova.",
                "difficulty": "MEDIUM",
                "type": "ESSAY",
                "subject_id": subject
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let question_id = created["id"].as_i64().unwrap();

    app.delete(&admin, &format!("/disciplina/{}", subject)).await;

    let view: Value = app
        .get(&prof, &format!("/questao/{}", question_id))
        .await
        .json()
        .await
        .unwrap();
    assert!(view["subject_id"].is_null());
    assert!(view["subject_name"].is_null());

    assert_eq!(
        app.count("SELECT COUNT(*) FROM professor_subjects WHERE professor_id = ?", prof_id)
            .await,
        0
    );
}

#[tokio::test]
async fn professor_subject_links() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let algebra = app.create_subject(&admin, "Algebra").await;
    let biology = app.create_subject(&admin, "Biology").await;
    let (prof_id, password) = app
        .create_user(&admin, "Tina", "tina@easyquiz.test", "PROFESSOR", &[algebra])
        .await;
    let prof = app.token_for("tina@easyquiz.test", &password).await;

    let body = json!({ "professor_id": prof_id, "subject_id": biology });

    assert_eq!(
        app.post(&prof, "/professordisciplina", body.clone())
            .await
            .status()
            .as_u16(),
        403
    );

    let created = app.post(&admin, "/professordisciplina", body.clone()).await;
    assert_eq!(created.status().as_u16(), 201);

    let duplicate = app.post(&admin, "/professordisciplina", body).await;
    assert_eq!(duplicate.status().as_u16(), 409);

    let unknown_subject = app
        .post(
            &admin,
            "/professordisciplina",
            json!({ "professor_id": prof_id, "subject_id": 9999 }),
        )
        .await;
    assert_eq!(unknown_subject.status().as_u16(), 404);

    let admin_target = app
        .post(
            &admin,
            "/professordisciplina",
            json!({ "professor_id": 1, "subject_id": algebra }),
        )
        .await;
    assert_eq!(admin_target.status().as_u16(), 400);
    assert_eq!(
        app.count("SELECT COUNT(*) FROM professor_subjects WHERE professor_id = ?", 1)
            .await,
        0
    );

    let unknown_professor = app
        .post(
            &admin,
            "/professordisciplina",
            json!({ "professor_id": 9999, "subject_id": algebra }),
        )
        .await;
    assert_eq!(unknown_professor.status().as_u16(), 404);

    let mine: Vec<Value> = app
        .get(&prof, &format!("/professordisciplina/professor/{}", prof_id))
        .await
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = mine.iter().map(|l| l["subject_name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Algebra", "Biology"]);

    let all: Vec<Value> = app
        .get(&admin, "/professordisciplina")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let path = format!("/professordisciplina/{}/{}", prof_id, biology);
    assert_eq!(app.delete(&admin, &path).await.status().as_u16(), 204);
    assert_eq!(app.delete(&admin, &path).await.status().as_u16(), 404);
}

#[tokio::test]
async fn answer_option_endpoints() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let subject = app.create_subject(&admin, "Chemistry").await;
    let (_, password) = app
        .create_user(&admin, "Vera", "vera@easyquiz.test", "PROFESSOR", &[subject])
        .await;
    let prof = app.token_for("vera@easyquiz.test", &password).await;
    let (_, other_password) = app
        .create_user(&admin, "Wagner", "wagner@easyquiz.test", "PROFESSOR", &[subject])
        .await;
    let other = app.token_for("wagner@easyquiz.test", &other_password).await;

    let question: Value = app
        .post(
            &prof,
            "/questao",
            json!({
                "body": "Symbol for sodium?",
                "difficulty": "EASY",
                "type": "MULTIPLE_CHOICE",
                "subject_id": subject,
                "options": [
                    {"text": "Na", "is_correct": true},
                    {"text": "So", "is_correct": false}
                ]
            }),
        )
        .await
        .json()
        .await
        .unwrap();
    let question_id = question["id"].as_i64().unwrap();

    let added = app
        .post(
            &prof,
            "/opcaoresposta",
            json!({ "question_id": question_id, "text": "Sd" }),
        )
        .await;
    assert_eq!(added.status().as_u16(), 201);
    let added: Value = added.json().await.unwrap();
    let option_id = added["id"].as_i64().unwrap();
    assert_eq!(added["is_correct"], false);

    let by_other = app
        .post(
            &other,
            "/opcaoresposta",
            json!({ "question_id": question_id, "text": "Nm" }),
        )
        .await;
    assert_eq!(by_other.status().as_u16(), 403);

    let missing_question = app
        .post(
            &prof,
            "/opcaoresposta",
            json!({ "question_id": 9999, "text": "Nm" }),
        )
        .await;
    assert_eq!(missing_question.status().as_u16(), 404);

    let updated = app
        .put(
            &prof,
            &format!("/opcaoresposta/{}", option_id),
            json!({ "text": "S", "is_correct": false }),
        )
        .await;
    assert_eq!(updated.status().as_u16(), 200);
    let updated: Value = updated.json().await.unwrap();
    assert_eq!(updated["text"], "S");

    let listed: Vec<Value> = app
        .get(&prof, &format!("/opcaoresposta/questao/{}", question_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);

    let fetched = app.get(&other, &format!("/opcaoresposta/{}", option_id)).await;
    assert_eq!(fetched.status().as_u16(), 200);

    assert_eq!(
        app.delete(&other, &format!("/opcaoresposta/{}", option_id))
            .await
            .status()
            .as_u16(),
        403
    );
    assert_eq!(
        app.delete(&prof, &format!("/opcaoresposta/{}", option_id))
            .await
            .status()
            .as_u16(),
        204
    );

    let all: Vec<Value> = app.get(&prof, "/opcaoresposta").await.json().await.unwrap();
    assert_eq!(all.len(), 2);
}

/// Creates a question as `token` and returns its id and its option ids in order.
async fn question_with_options(
    app: &common::TestApp,
    token: &str,
    question_type: &str,
    options: Value,
) -> (i64, Vec<i64>) {
    let response = app
        .post(
            token,
            "/questao",
            json!({
                "body": format!("A {} question", question_type),
                "difficulty": "EASY",
                "type": question_type,
                "options": options
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let view: Value = response.json().await.unwrap();
    let option_ids = view["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_i64().unwrap())
        .collect();
    (view["id"].as_i64().unwrap(), option_ids)
}

#[tokio::test]
async fn option_edits_keep_true_false_questions_valid() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (question_id, options) = question_with_options(
        &app,
        &admin,
        "TRUE_FALSE",
        json!([
            {"text": "True", "is_correct": true},
            {"text": "False", "is_correct": false}
        ]),
    )
    .await;

    let third = app
        .post(
            &admin,
            "/opcaoresposta",
            json!({ "question_id": question_id, "text": "Maybe", "is_correct": true }),
        )
        .await;
    assert_eq!(third.status().as_u16(), 400);

    let second_correct = app
        .put(
            &admin,
            &format!("/opcaoresposta/{}", options[1]),
            json!({ "text": "False", "is_correct": true }),
        )
        .await;
    assert_eq!(second_correct.status().as_u16(), 400);

    let removed = app
        .delete(&admin, &format!("/opcaoresposta/{}", options[1]))
        .await;
    assert_eq!(removed.status().as_u16(), 400);

    // Nothing changed: two options, one of them correct.
    assert_eq!(
        app.count("SELECT COUNT(*) FROM answer_options WHERE question_id = ?", question_id)
            .await,
        2
    );
    assert_eq!(
        app.count(
            "SELECT COUNT(*) FROM answer_options WHERE question_id = ? AND is_correct",
            question_id,
        )
        .await,
        1
    );

    // Renaming without touching the correct mark is fine.
    let renamed = app
        .put(
            &admin,
            &format!("/opcaoresposta/{}", options[0]),
            json!({ "text": "Verdadeiro", "is_correct": true }),
        )
        .await;
    assert_eq!(renamed.status().as_u16(), 200);
}

#[tokio::test]
async fn option_edits_keep_multiple_choice_questions_valid() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (question_id, options) = question_with_options(
        &app,
        &admin,
        "MULTIPLE_CHOICE",
        json!([
            {"text": "Red", "is_correct": true},
            {"text": "Green", "is_correct": false},
            {"text": "Blue", "is_correct": false}
        ]),
    )
    .await;
    let correct_path = format!("/opcaoresposta/{}", options[0]);

    let extra_correct = app
        .post(
            &admin,
            "/opcaoresposta",
            json!({ "question_id": question_id, "text": "Yellow", "is_correct": true }),
        )
        .await;
    assert_eq!(extra_correct.status().as_u16(), 400);

    let extra_wrong = app
        .post(
            &admin,
            "/opcaoresposta",
            json!({ "question_id": question_id, "text": "Yellow", "is_correct": false }),
        )
        .await;
    assert_eq!(extra_wrong.status().as_u16(), 201);

    let no_correct = app
        .put(&admin, &correct_path, json!({ "text": "Red", "is_correct": false }))
        .await;
    assert_eq!(no_correct.status().as_u16(), 400);

    assert_eq!(app.delete(&admin, &correct_path).await.status().as_u16(), 400);

    // Wrong options can go until only two are left.
    for id in &options[1..] {
        assert_eq!(
            app.delete(&admin, &format!("/opcaoresposta/{}", id))
                .await
                .status()
                .as_u16(),
            204
        );
    }
    let listed: Vec<Value> = app
        .get(&admin, &format!("/opcaoresposta/questao/{}", question_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);

    let last_wrong = listed
        .iter()
        .find(|o| o["is_correct"] == false)
        .and_then(|o| o["id"].as_i64())
        .unwrap();
    assert_eq!(
        app.delete(&admin, &format!("/opcaoresposta/{}", last_wrong))
            .await
            .status()
            .as_u16(),
        400
    );

    let view: Value = app
        .get(&admin, &format!("/questao/{}", question_id))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["correct_answer"], "Red");
}

#[tokio::test]
async fn essay_questions_take_no_options() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let essay: Value = app
        .post(
            &admin,
            "/questao",
            json!({
                "body": "Discuss entropy.",
                "difficulty": "HARD",
                "type": "ESSAY"
            }),
        )
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .post(
            &admin,
            "/opcaoresposta",
            json!({ "question_id": essay["id"], "text": "Anything", "is_correct": true }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn audit_log_endpoints() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    app.create_user(&admin, "Xavier", "xavier@easyquiz.test", "PROFESSOR", &[])
        .await;

    let logs: Vec<Value> = app.get(&admin, "/logcadastro").await.json().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["action"], "CREATE");
    assert_eq!(logs[0]["user_name"], "Xavier");

    let id = logs[0]["id"].as_i64().unwrap();
    let entry = app.get(&admin, &format!("/logcadastro/{}", id)).await;
    assert_eq!(entry.status().as_u16(), 200);

    assert_eq!(
        app.delete(&admin, &format!("/logcadastro/{}", id)).await.status().as_u16(),
        204
    );
    assert_eq!(
        app.get(&admin, &format!("/logcadastro/{}", id)).await.status().as_u16(),
        404
    );
}
