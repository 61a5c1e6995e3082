use futures::channel::oneshot;
use rollcall::{endpoints::LoginError, Driver, DriverOutcome, Session};
use serde_json::json;
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn session(server: &MockServer) -> Session {
    Session::builder()
        .idp_base_url(server.uri())
        .app_base_url(server.uri())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn driver() -> Driver {
    Driver::new()
        .idle_interval(Duration::from_millis(10))
        .cooldown_interval(Duration::from_millis(10))
}

fn listing(titles_and_ids: &[(&str, u64)]) -> ResponseTemplate {
    let rollcalls: Vec<_> = titles_and_ids
        .iter()
        .map(|(title, id)| json!({"course_title": title, "rollcall_id": id}))
        .collect();

    ResponseTemplate::new(200).set_body_json(json!({ "rollcalls": rollcalls }))
}

async fn mount_listing_once(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/radar/rollcalls"))
        .respond_with(response)
        .up_to_n_times(1)
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/radar/rollcalls"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_code(server: &MockServer, id: u64, code: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/rollcall/{}/student_rollcalls", id).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "number_code": code })),
        )
        .mount(server)
        .await;
}

async fn never() { futures::future::pending::<()>().await }

#[tokio::test]
async fn keep_asking_until_something_turns_up() {
    let server = MockServer::start().await;
    mount_listing_once(&server, listing(&[])).await;
    mount_listing_once(&server, ResponseTemplate::new(500)).await;
    mount_listing(&server, listing(&[("University Physics", 141798)])).await;
    mount_code(&server, 141798, "0427").await;
    let session = session(&server);
    let mut reported = Vec::new();

    let got = driver()
        .poll(&session, never(), |codes| reported.push(codes.clone()))
        .await;

    match got {
        DriverOutcome::Completed(codes) => {
            assert_eq!(codes["University Physics"], Some(String::from("0427")));
            assert_eq!(reported, vec![codes]);
        },
        other => panic!("Unexpected outcome: {:?}", other),
    }
    let listing_requests = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/radar/rollcalls")
        .count();
    assert_eq!(listing_requests, 3);
}

#[tokio::test]
async fn continuous_mode_runs_until_shutdown() {
    let server = MockServer::start().await;
    mount_listing(&server, listing(&[("Calculus", 9)])).await;
    mount_code(&server, 9, "1234").await;
    let session = session(&server);
    let (tx, rx) = oneshot::channel::<()>();
    let mut tx = Some(tx);
    let mut cycles = 0;

    let got = driver()
        .continuous(true)
        .poll(
            &session,
            async move {
                let _ = rx.await;
            },
            |_| {
                cycles += 1;
                if cycles == 2 {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(());
                    }
                }
            },
        )
        .await;

    assert_eq!(got, DriverOutcome::Shutdown { cycles: 2 });
}

#[tokio::test]
async fn shutdown_while_idle() {
    let server = MockServer::start().await;
    mount_listing(&server, listing(&[])).await;
    let session = session(&server);

    let got = Driver::new()
        .idle_interval(Duration::from_secs(3600))
        .poll(&session, tokio::time::sleep(Duration::from_millis(200)), |_| {
            panic!("Nothing should be reported")
        })
        .await;

    assert_eq!(got, DriverOutcome::Shutdown { cycles: 0 });
}

#[tokio::test]
async fn failed_login_stops_before_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/authserver/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<input id="pwdEncryptSalt" value="rjaXQkmMhJcDnEpN">
               <input name="execution" value="e1s1">"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authserver/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string("<div id='errorMessage'>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/radar/rollcalls"))
        .respond_with(listing(&[]))
        .expect(0)
        .mount(&server)
        .await;
    let session = session(&server);

    let got = driver()
        .run(&session, "student", "wrong", never(), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(got, LoginError::Rejected), "{:?}", got);
}

#[tokio::test]
async fn log_in_then_poll() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/authserver/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<input id="pwdEncryptSalt" value="rjaXQkmMhJcDnEpN">
               <input name="execution" value="e1s1">"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authserver/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    mount_listing(&server, listing(&[("Linear Algebra", 5)])).await;
    Mock::given(method("GET"))
        .and(path("/api/rollcall/5/student_rollcalls"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let session = session(&server);

    let got = driver()
        .run(&session, "student", "hunter2", never(), |_| {})
        .await
        .unwrap();

    match got {
        DriverOutcome::Completed(codes) => {
            assert_eq!(codes.len(), 1);
            assert_eq!(codes["Linear Algebra"], None);
        },
        other => panic!("Unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn shutdown_during_login_skips_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/authserver/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/authserver/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/radar/rollcalls"))
        .respond_with(listing(&[]))
        .expect(0)
        .mount(&server)
        .await;
    let session = session(&server);

    let got = driver()
        .run(
            &session,
            "student",
            "hunter2",
            tokio::time::sleep(Duration::from_millis(100)),
            |_| panic!("Nothing should be reported"),
        )
        .await
        .unwrap();

    assert_eq!(got, DriverOutcome::Shutdown { cycles: 0 });
}
