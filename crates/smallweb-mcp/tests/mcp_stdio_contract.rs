use std::collections::BTreeSet;

#[test]
fn smallweb_stdio_lists_and_calls_gopher_fetch() {
    // True end-to-end check (spawns a child process + a loopback gopher server).
    // Skipped by default; set SMALLWEB_E2E=1 to run it.
    if std::env::var("SMALLWEB_E2E").ok().as_deref() != Some("1") {
        eprintln!("skipping: set SMALLWEB_E2E=1 to run this test");
        return;
    }

    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    rt.block_on(async {
        use rmcp::{
            model::CallToolRequestParam,
            service::ServiceExt,
            transport::{ConfigureCommandExt, TokioChildProcess},
        };
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 256];
            let _ = sock.read(&mut buf).await;
            sock.write_all(b"1Home\t/\tfloodgap.com\t70\r\n.\r\n").await.expect("write");
        });

        let tmp = tempfile::tempdir().expect("tempdir");
        let bin = assert_cmd::cargo::cargo_bin!("smallweb-mcp");
        let service = ()
            .serve(TokioChildProcess::new(tokio::process::Command::new(bin).configure(
                |cmd| {
                    cmd.arg("mcp-stdio");
                    cmd.env("GEMINI_TOFU_STORAGE_PATH", tmp.path().join("tofu"));
                    cmd.env("GEMINI_CLIENT_CERT_STORAGE_PATH", tmp.path().join("certs"));
                },
            ))?)
            .await?;

        let tools = service.list_tools(Default::default()).await?;
        let names: BTreeSet<String> = tools.tools.iter().map(|t| t.name.clone().into_owned()).collect();
        for must_have in ["gopher_fetch", "gemini_fetch"] {
            assert!(names.contains(must_have), "missing tool {must_have}");
        }

        let url = format!("gopher://{}:{}/1/", addr.ip(), addr.port());
        let resp = service
            .call_tool(CallToolRequestParam {
                name: "gopher_fetch".into(),
                arguments: Some(serde_json::json!({ "url": url }).as_object().cloned().unwrap()),
            })
            .await?;
        let text = resp.content.first().and_then(|c| c.as_text()).map(|t| t.text.clone()).unwrap_or_default();
        assert!(text.contains("\"kind\":\"menu\""), "unexpected response: {text}");

        Ok::<(), anyhow::Error>(())
    })
    .expect("e2e test failed");
}

#[test]
fn doctor_reports_ok_without_stdio_check() {
    use predicates::prelude::*;

    let bin = assert_cmd::cargo::cargo_bin!("smallweb-mcp");
    let tmp = tempfile::tempdir().expect("tempdir");

    let output = std::process::Command::new(bin)
        .args(["doctor", "--check-stdio", "false"])
        .env("GEMINI_TOFU_STORAGE_PATH", tmp.path().join("tofu"))
        .env("GEMINI_CLIENT_CERT_STORAGE_PATH", tmp.path().join("certs"))
        .output()
        .expect("run doctor");

    assert!(output.status.success(), "doctor should succeed in a writable tempdir");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(predicate::str::contains("\"kind\":\"doctor\"").eval(&stdout));
}

#[test]
fn version_prints_crate_version() {
    let bin = assert_cmd::cargo::cargo_bin!("smallweb-mcp");
    let output = std::process::Command::new(bin).args(["version", "--output", "text"]).output().expect("run version");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("smallweb-mcp"));
}
