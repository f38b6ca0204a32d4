//! End-to-end dispatch against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port in a background thread
//! and drives both transport backends over real HTTP, so the future-based
//! and the callback-based paths are held to the same outcomes.

use std::io::{BufRead, BufReader, Write};
use std::net::SocketAddr;

use posts_core::{
    Backend, DispatchError, Dispatcher, EncodedBody, Encoding, FailureKind, Form, FormControl, HttpMethod, NewPost, PostsClient,
    RequestSpec,
};
use serde_json::json;

const BACKENDS: [Backend; 2] = [Backend::Future, Backend::Callback];

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// An address nothing listens on.
fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// A bare HTTP/1.1 server answering every request with 200 and a JSON
/// string of `len` characters.
fn start_large_body_server(len: usize) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let body = format!("\"{}\"", "a".repeat(len));

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes()).and_then(|()| stream.write_all(body.as_bytes()));
        }
    });

    addr
}

fn new_post(title: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        body: "c".to_string(),
        user_id: 1,
    }
}

#[tokio::test]
async fn create_list_delete_lifecycle() {
    for backend in BACKENDS {
        let addr = start_server();
        let client = PostsClient::new(&format!("http://{addr}"), Dispatcher::with_backend(backend, None));

        // Step 1: list: should be empty.
        let posts = client.list_posts().await.unwrap();
        assert!(posts.is_empty(), "{backend:?}: expected empty list");

        // Step 2: create as JSON.
        let created = client.create_post(&new_post("json"), Encoding::Json).await.unwrap();
        assert_eq!(created.title, "json");
        assert_eq!(created.user_id, Some(1));

        // Step 3: create as multipart.
        let created_mp = client.create_post(&new_post("multipart"), Encoding::Multipart).await.unwrap();
        assert_eq!(created_mp.title, "multipart");
        assert_eq!(created_mp.user_id, Some(1));

        // Step 4: create from a form; the unnamed control is not submitted.
        let form = Form::new()
            .control(FormControl::text("title", "form"))
            .control(FormControl::text("body", "from form"))
            .control(FormControl::unnamed("ignored"));
        let created_form = client.create_post_from_form(&form, Some(5)).await.unwrap();
        assert_eq!(created_form.body, "from form");
        assert_eq!(created_form.user_id, Some(5));

        // Step 5: list: three posts in creation order.
        let titles: Vec<String> = client.list_posts().await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["json", "multipart", "form"], "{backend:?}");

        // Step 6: delete.
        client.delete_post(created.id).await.unwrap();

        // Step 7: delete again: 404 with diagnostic.
        let err = client.delete_post(created.id).await.unwrap_err();
        assert_eq!(err.status(), Some(404), "{backend:?}");

        // Step 8: list: two left.
        assert_eq!(client.list_posts().await.unwrap().len(), 2);
    }
}

#[tokio::test]
async fn typo_path_settles_with_diagnostic_body() {
    for backend in BACKENDS {
        let addr = start_server();
        let err = Dispatcher::with_backend(backend, None)
            .dispatch(RequestSpec::get(format!("http://{addr}/pos")))
            .await
            .unwrap_err();
        let DispatchError::Application {
            status, diagnostic, ..
        } = err
        else {
            panic!("{backend:?}: expected application error");
        };
        assert_eq!(status, 404);
        assert_eq!(diagnostic, Some(json!({"error": "not found"})));
    }
}

#[tokio::test]
async fn rejected_create_carries_server_diagnostic() {
    for backend in BACKENDS {
        let addr = start_server();
        let spec = RequestSpec::post(
            format!("http://{addr}/posts"),
            EncodedBody::json(&json!({"body": "no title"})).unwrap(),
        );
        let err = Dispatcher::with_backend(backend, None).dispatch(spec).await.unwrap_err();
        let DispatchError::Application {
            status, diagnostic, ..
        } = err
        else {
            panic!("{backend:?}: expected application error");
        };
        assert_eq!(status, 422);
        assert_eq!(diagnostic.unwrap()["error"], "`title` is required");
    }
}

#[tokio::test]
async fn unreachable_server_is_network_failure() {
    for backend in BACKENDS {
        let addr = closed_addr();
        let err = Dispatcher::with_backend(backend, None)
            .dispatch(RequestSpec::get(format!("http://{addr}/posts")))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Network, "{backend:?}");
        assert_eq!(err.status(), None);
    }
}

#[tokio::test]
async fn concurrent_dispatches_across_backends() {
    let addr = start_server();
    let future_backend = Dispatcher::with_backend(Backend::Future, None);
    let callback_backend = Dispatcher::with_backend(Backend::Callback, None);

    let list = future_backend.dispatch(RequestSpec::get(format!("http://{addr}/posts")));
    let missing = callback_backend.dispatch(RequestSpec::get(format!("http://{addr}/posts/9")));
    let (list, missing) = tokio::join!(list, missing);

    assert_eq!(list.unwrap(), json!([]));
    assert_eq!(missing.unwrap_err().status(), Some(404));
}

#[tokio::test]
async fn large_bodies_decode_on_both_backends() {
    const LEN: usize = 11 * 1024 * 1024;
    let addr = start_large_body_server(LEN);
    for backend in BACKENDS {
        let value = Dispatcher::with_backend(backend, None)
            .dispatch(RequestSpec::get(format!("http://{addr}/big")))
            .await
            .unwrap();
        assert_eq!(value.as_str().map(str::len), Some(LEN), "{backend:?}");
    }
}

#[tokio::test]
async fn put_and_patch_round_trip_on_both_backends() {
    for backend in BACKENDS {
        let addr = start_server();
        let dispatcher = Dispatcher::with_backend(backend, None);
        for method in [HttpMethod::Put, HttpMethod::Patch] {
            // The service only routes GET and DELETE on a single post.
            let spec = RequestSpec::new(method, format!("http://{addr}/posts/1"))
                .body(EncodedBody::json(&json!({"title": "edited"})).unwrap());
            let err = dispatcher.dispatch(spec).await.unwrap_err();
            let DispatchError::Application {
                status, diagnostic, ..
            } = err
            else {
                panic!("{backend:?} {method}: expected application error");
            };
            assert_eq!(status, 405, "{backend:?} {method}");
            assert_eq!(diagnostic, Some(json!({})), "{backend:?} {method}");
        }
    }
}
