//! End-to-end tests: real sockets between client, proxy and origin.

use std::time::Duration;

use forward_proxy::config::CacheConfig;

mod common;

fn small_cache() -> CacheConfig {
    CacheConfig {
        total_capacity_bytes: 4096,
        max_object_bytes: 1024,
    }
}

#[tokio::test]
async fn forwards_rewritten_request_to_origin() {
    let origin = common::start_origin(common::ok_response(b"hello")).await;
    let proxy = common::start_proxy(common::loopback_config(small_cache())).await;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: curl/8.0\r\nConnection: keep-alive\r\nAccept: */*\r\n\r\n",
        origin.url("/index.html"),
        origin.addr
    );
    let response = common::send_raw(proxy.addr, request.as_bytes()).await;
    assert_eq!(response, common::ok_response(b"hello"));

    let requests = origin.requests();
    assert_eq!(requests.len(), 1);
    let head = &requests[0];
    assert!(head.starts_with("GET /index.html HTTP/1.0\r\n"), "got {head:?}");
    assert!(head.contains("User-Agent: Mozilla/5.0"));
    assert!(head.contains("Connection: close\r\n"));
    assert!(head.contains("Proxy-Connection: close\r\n"));
    assert!(head.contains("Accept: */*\r\n"));
    assert!(!head.contains("curl/8.0"));
    assert!(!head.contains("keep-alive"));
    // The client supplied Host, so none is synthesized.
    assert!(!head.to_ascii_lowercase().contains("host:"));
}

#[tokio::test]
async fn synthesizes_host_when_client_sends_none() {
    let origin = common::start_origin(common::ok_response(b"x")).await;
    let proxy = common::start_proxy(common::loopback_config(small_cache())).await;

    let request = format!("GET {} HTTP/1.0\r\n\r\n", origin.url("/"));
    common::send_raw(proxy.addr, request.as_bytes()).await;

    let requests = origin.requests();
    assert!(requests[0].contains("Host: 127.0.0.1\r\n"), "got {:?}", requests[0]);
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let body = common::ok_response(b"cached body");
    let origin = common::start_origin(body.clone()).await;
    let proxy = common::start_proxy(common::loopback_config(small_cache())).await;

    let request = format!("GET {} HTTP/1.0\r\n\r\n", origin.url("/page"));
    let first = common::send_raw(proxy.addr, request.as_bytes()).await;
    let second = common::send_raw(proxy.addr, request.as_bytes()).await;

    assert_eq!(first, body);
    assert_eq!(second, body);
    assert_eq!(origin.connections(), 1);

    let key = format!("{}/page", origin.addr);
    assert!(proxy.cache.contains(&key));
    let stats = proxy.cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn oversized_response_is_relayed_but_not_cached() {
    let body = common::ok_response(&[b'z'; 2048]);
    let origin = common::start_origin(body.clone()).await;
    let proxy = common::start_proxy(common::loopback_config(small_cache())).await;

    let request = format!("GET {} HTTP/1.0\r\n\r\n", origin.url("/big"));
    assert_eq!(common::send_raw(proxy.addr, request.as_bytes()).await, body);
    assert_eq!(common::send_raw(proxy.addr, request.as_bytes()).await, body);

    assert_eq!(origin.connections(), 2);
    assert!(proxy.cache.is_empty());
}

#[tokio::test]
async fn cache_key_includes_port_and_path() {
    let first = common::start_origin(common::ok_response(b"one")).await;
    let second = common::start_origin(common::ok_response(b"two")).await;
    let proxy = common::start_proxy(common::loopback_config(small_cache())).await;

    for origin in [&first, &second] {
        let request = format!("GET {} HTTP/1.0\r\n\r\n", origin.url("/same"));
        common::send_raw(proxy.addr, request.as_bytes()).await;
    }

    let request = format!("GET {} HTTP/1.0\r\n\r\n", second.url("/same"));
    assert_eq!(
        common::send_raw(proxy.addr, request.as_bytes()).await,
        common::ok_response(b"two")
    );
    assert_eq!(proxy.cache.len(), 2);
}

#[tokio::test]
async fn malformed_and_unsupported_requests_close_silently() {
    let proxy = common::start_proxy(common::loopback_config(small_cache())).await;

    for request in [
        &b"garbage\r\n\r\n"[..],
        b"POST http://127.0.0.1:1/ HTTP/1.0\r\n\r\n",
        b"GET http://:80/ HTTP/1.0\r\n\r\n",
    ] {
        assert!(common::send_raw(proxy.addr, request).await.is_empty());
    }
    assert!(proxy.cache.is_empty());
}

#[tokio::test]
async fn error_responses_when_enabled() {
    let mut config = common::loopback_config(small_cache());
    config.forwarding.send_error_responses = true;
    let proxy = common::start_proxy(config).await;

    let response = common::send_raw(proxy.addr, b"PUT http://127.0.0.1:1/ HTTP/1.0\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.0 501 Not Implemented\r\n"));

    let response = common::send_raw(proxy.addr, b"GET\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.0 400 Bad Request\r\n"));
}

#[tokio::test]
async fn unreachable_origin_closes_connection() {
    // Bind and drop to find a port with nothing listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let proxy = common::start_proxy(common::loopback_config(small_cache())).await;

    let request = format!("GET http://127.0.0.1:{port}/ HTTP/1.0\r\n\r\n");
    assert!(common::send_raw(proxy.addr, request.as_bytes()).await.is_empty());
}

#[tokio::test]
async fn works_as_reqwest_http_proxy() {
    let origin = common::start_origin(common::ok_response(b"via proxy")).await;
    let proxy = common::start_proxy(common::loopback_config(small_cache())).await;

    let client = reqwest::Client::builder()
        .proxy(reqwest::Proxy::http(format!("http://{}", proxy.addr)).unwrap())
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();

    for _ in 0..2 {
        let res = client.get(origin.url("/reqwest")).send().await.expect("Proxy unreachable");
        assert_eq!(res.status(), 200);
        assert_eq!(res.text().await.unwrap(), "via proxy");
    }
    assert_eq!(origin.connections(), 1);
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let proxy = common::start_proxy(common::loopback_config(small_cache())).await;
    proxy.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let connected = tokio::net::TcpStream::connect(proxy.addr).await;
    assert!(connected.is_err());
}
