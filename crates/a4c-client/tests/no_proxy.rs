use std::{
    io::{Read, Write},
    net::TcpListener,
    thread,
};

use a4c_client::ProtocolClients;

#[test]
fn protocol_client_ignores_proxy_environment() {
    // Spin up a tiny HTTP server that serves a deterministic response.
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buffer = [0u8; 4096];
            let _ = stream.read(&mut buffer);

            let body = serde_json::json!({ "data": "DEPLOYED", "error": null }).to_string();

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
    });

    // Set proxy environment variables to invalid values. If reqwest respected them,
    // the request would fail before reaching our local server.
    unsafe {
        std::env::set_var("HTTP_PROXY", "http://127.0.0.1:9");
        std::env::set_var("HTTPS_PROXY", "http://127.0.0.1:9");
        std::env::set_var("ALL_PROXY", "http://127.0.0.1:9");
    }

    let base_url = format!("http://{addr}");
    let clients = ProtocolClients::from_url(base_url).expect("client construction");
    let status = clients
        .deployment_service()
        .deployment_status("demo", "demo-env")
        .expect("deployment status");

    assert_eq!(status, "DEPLOYED");

    unsafe {
        std::env::remove_var("HTTP_PROXY");
        std::env::remove_var("HTTPS_PROXY");
        std::env::remove_var("ALL_PROXY");
    }

    server.join().unwrap();
}
