//! End-to-end tests: client → proxy → mock origin.

use std::time::{Duration, Instant};

use reqwest::StatusCode;

mod common;

use common::{MockResponse, CapturedRequest};

#[tokio::test]
async fn test_html_links_rewritten() {
    let (backend, _) = common::start_programmable_backend(|req: CapturedRequest| async move {
        let origin = format!("http://{}", req.header("host").unwrap_or_default());
        MockResponse::html(&format!(
            r#"<a href="{0}/about">About</a><img src="{0}"><a href="https://elsewhere.test/x">x</a>"#,
            origin
        ))
    })
    .await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let target = format!("http://{}", backend);
    let token = common::token_for(&target);
    let res = common::client()
        .get(common::proxy_url(proxy, &target))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let declared = res.content_length();
    let body = res.text().await.unwrap();
    assert_eq!(declared, Some(body.len() as u64));
    assert_eq!(
        body,
        format!(
            r#"<a href="/proxy/{0}/about">About</a><img src="/proxy/{0}/"><a href="https://elsewhere.test/x">x</a>"#,
            token
        )
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_relative_redirect_stays_in_proxy() {
    let (backend, _) =
        common::start_mock_backend(MockResponse::new(302).header("Location", "/login?next=%2F"))
            .await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let target = format!("http://{}", backend);
    let res = common::client()
        .get(format!("{}/account", common::proxy_url(proxy, &target)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        res.headers()["location"],
        format!("/proxy/{}/login?next=%2F", common::token_for(&target)).as_str()
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_path_relative_redirect_resolves_against_request_path() {
    let (backend, _) =
        common::start_mock_backend(MockResponse::new(303).header("Location", "next?step=2")).await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let target = format!("http://{}", backend);
    let res = common::client()
        .get(format!("{}/a/b", common::proxy_url(proxy, &target)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        res.headers()["location"],
        format!("/proxy/{}/a/next?step=2", common::token_for(&target)).as_str()
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_absolute_redirect_to_target_rewritten() {
    let (backend, _) = common::start_programmable_backend(|req: CapturedRequest| async move {
        let location = format!("http://{}/next?a=1#frag", req.header("host").unwrap_or_default());
        MockResponse::new(301).header("Location", &location)
    })
    .await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let target = format!("http://{}", backend);
    let res = common::client()
        .get(common::proxy_url(proxy, &target))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        res.headers()["location"],
        format!("/proxy/{}/next?a=1", common::token_for(&target)).as_str()
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_foreign_redirect_untouched() {
    let (backend, _) = common::start_mock_backend(
        MockResponse::new(302).header("Location", "https://accounts.other.test/auth"),
    )
    .await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let res = common::client()
        .get(common::proxy_url(proxy, &format!("http://{}", backend)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "https://accounts.other.test/auth");

    shutdown.trigger();
}

#[tokio::test]
async fn test_non_html_body_byte_identical() {
    let json = br#"{"link":"http://127.0.0.1/x","n":1}"#.to_vec();
    let (backend, _) = common::start_mock_backend(
        MockResponse::new(200)
            .header("Content-Type", "application/json")
            .header("X-Custom", "kept")
            .body(json.clone()),
    )
    .await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let res = common::client()
        .get(common::proxy_url(proxy, &format!("http://{}", backend)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-custom"], "kept");
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.bytes().await.unwrap().to_vec(), json);

    shutdown.trigger();
}

#[tokio::test]
async fn test_residual_path_and_query_forwarded_verbatim() {
    let (backend, mut seen) = common::start_mock_backend(MockResponse::new(204)).await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let target = format!("http://{}/ignored/base", backend);
    let res = common::client()
        .get(format!(
            "{}/a%2Fb//c.txt?q=hello%20world&x=1",
            common::proxy_url(proxy, &target)
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let req = seen.recv().await.unwrap();
    assert_eq!(req.method, "GET");
    assert_eq!(req.target, "/a%2Fb//c.txt?q=hello%20world&x=1");

    shutdown.trigger();
}

#[tokio::test]
async fn test_entry_link_requests_encoded_path() {
    let (backend, mut seen) = common::start_mock_backend(MockResponse::new(204)).await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let target = format!("http://{}/docs/index.html?lang=en", backend);
    let res = common::client()
        .get(common::proxy_url(proxy, &target))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let req = seen.recv().await.unwrap();
    assert_eq!(req.target, "/docs/index.html?lang=en");

    shutdown.trigger();
}

#[tokio::test]
async fn test_method_body_and_headers_forwarded() {
    let (backend, mut seen) = common::start_mock_backend(MockResponse::new(201)).await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let res = common::client()
        .post(format!("{}/submit", common::proxy_url(proxy, &format!("http://{}", backend))))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("X-Trace", "abc")
        .header("Proxy-Authorization", "Basic c2VjcmV0")
        .body("name=value&other=2")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let req = seen.recv().await.unwrap();
    assert_eq!(req.method, "POST");
    assert_eq!(req.target, "/submit");
    assert_eq!(req.body, b"name=value&other=2");
    assert_eq!(req.header("x-trace"), Some("abc"));
    assert_eq!(
        req.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(req.header("proxy-authorization"), None);
    assert_eq!(req.header("host"), Some(backend.to_string().as_str()));

    shutdown.trigger();
}

#[tokio::test]
async fn test_bad_tokens_rejected_without_upstream_contact() {
    let (backend, mut seen) = common::start_mock_backend(MockResponse::new(200)).await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;
    let client = common::client();

    let cases = [
        ("/proxy", "Missing target token."),
        ("/proxy/", "Missing target token."),
        ("/proxy/%21%21%21/x", "Invalid target URL encoding."),
        // "not a url"
        ("/proxy/bm90IGEgdXJs", "Invalid target URL."),
    ];
    for (path, message) in cases {
        let res = client
            .get(format!("http://{}{}", proxy, path))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(res.text().await.unwrap(), message, "{}", path);
    }

    assert!(seen.try_recv().is_err(), "backend {} was contacted", backend);
    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_proxy_error() {
    let refused = common::refused_addr().await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let res = common::client()
        .get(common::proxy_url(proxy, &format!("http://{}", refused)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text().await.unwrap(), "Proxy error.");

    shutdown.trigger();
}

#[tokio::test]
async fn test_stalled_upstream_times_out() {
    let stalled = common::start_stalled_backend().await;
    let mut config = common::test_config();
    config.timeouts.upstream_secs = 1;
    let (proxy, shutdown) = common::start_proxy(config).await;

    let started = Instant::now();
    let res = common::client()
        .get(common::proxy_url(proxy, &format!("http://{}", stalled)))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(started.elapsed() < Duration::from_secs(5));

    shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_requests_to_different_targets() {
    let (a, _) = common::start_mock_backend(MockResponse::new(200).body("from-a")).await;
    let (b, _) = common::start_mock_backend(MockResponse::new(200).body("from-b")).await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;
    let client = common::client();

    let mut handles = Vec::new();
    for i in 0..20 {
        let (addr, expected) = if i % 2 == 0 { (a, "from-a") } else { (b, "from-b") };
        let url = common::proxy_url(proxy, &format!("http://{}", addr));
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let body = client.get(url).send().await.unwrap().text().await.unwrap();
            assert_eq!(body, expected);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_header_returned() {
    let (backend, _) = common::start_mock_backend(MockResponse::new(200)).await;
    let (proxy, shutdown) = common::start_proxy(common::test_config()).await;

    let res = common::client()
        .get(common::proxy_url(proxy, &format!("http://{}", backend)))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "req-123");

    shutdown.trigger();
}
