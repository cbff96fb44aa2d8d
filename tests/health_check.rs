//! Smoke test for the liveness endpoint. The full server wiring is covered
//! by the auth integration suite; this only needs a listener, so the
//! database-backed `spawn_app` is deliberately not reused here.

use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use villabook::routes::health_check;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = HttpServer::new(|| {
        App::new().route("/health_check", web::get().to(health_check))
    })
    .listen(listener)
    .expect("Failed to create server")
    .run();

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.content_length(), Some(0));
}
