//! Drives the local control API over real HTTP.

mod common;

use classroom::api::ApiServer;
use classroom::config::Config;
use classroom::protocol::{ClassMessage, Id, StudentDoubt};
use common::{Participant, TestBackend};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn serve(participant: &Participant) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let server = ApiServer::new(participant.classroom.clone(), &Config::default());
    tokio::spawn(server.serve(listener));
    format!("http://{}", address)
}

#[tokio::test]
async fn forwarded_doubt_shows_up_in_teacher_state() {
    let dir = tempfile::tempdir().unwrap();
    let teacher = Participant::join(
        "Ms. Rao",
        r#"{"role":"teacher","topic":"Cells"}"#,
        TestBackend::new(),
        dir.path(),
    );
    let base = serve(&teacher).await;
    let client = reqwest::Client::new();

    let payload = ClassMessage::StudentDoubt(StudentDoubt {
        id: Some(Id::Number(7)),
        name: "Priya".to_string(),
        text: "Why is the sky blue?".to_string(),
        voice_generated: false,
    })
    .encode()
    .unwrap();
    let response = client
        .post(format!("{}/messages", base))
        .body(payload)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // Garbage is accepted and ignored.
    let response = client
        .post(format!("{}/messages", base))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let state: Value = client
        .get(format!("{}/state", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(state["role"], "teacher");
    assert_eq!(state["topic"], "Cells");
    assert_eq!(state["pending"].as_array().unwrap().len(), 1);
    assert_eq!(state["pending"][0]["text"], "Why is the sky blue?");
    assert_eq!(state["unread"], 1);

    let response = client
        .post(format!("{}/doubts/7/send", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn student_cannot_use_teacher_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let student = Participant::join(
        "Priya",
        r#"{"role":"student"}"#,
        TestBackend::new(),
        dir.path(),
    );
    let base = serve(&student).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/quiz/generate", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], true);

    let response = client
        .post(format!("{}/doubts", base))
        .json(&json!({ "text": "What is osmosis?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);

    let raised: Value = client
        .post(format!("{}/hand/toggle", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(raised["raised"], true);

    let response = client
        .post(format!("{}/doubts", base))
        .json(&json!({ "text": "What is osmosis?" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert!(matches!(
        student.outbox.drain().as_slice(),
        [ClassMessage::HandRaise(_), ClassMessage::StudentDoubt(_)]
    ));
}

#[tokio::test]
async fn teacher_controls_lecture_by_hand() {
    let dir = tempfile::tempdir().unwrap();
    let teacher = Participant::join(
        "Ms. Rao",
        r#"{"role":"teacher","topic":"Cells"}"#,
        TestBackend::new(),
        dir.path(),
    );
    let base = serve(&teacher).await;
    let client = reqwest::Client::new();
    let post = |path: &str| client.post(format!("{}{}", base, path));

    post("/lecture/load")
        .json(&json!({ "duration": 600.0 }))
        .send()
        .await
        .unwrap();
    post("/lecture/start").send().await.unwrap();

    let paused: Value = post("/lecture/pause").send().await.unwrap().json().await.unwrap();
    assert_eq!(paused["changed"], true);
    let played: Value = post("/lecture/play").send().await.unwrap().json().await.unwrap();
    assert_eq!(played["changed"], true);

    let lecture: Value = client
        .get(format!("{}/lecture", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(lecture["playing"], true);
    assert_eq!(teacher.playback.pauses(), 1);
    assert_eq!(teacher.playback.plays(), 2);
}
