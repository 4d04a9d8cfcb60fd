use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "smallweb")]
#[command(about = "Gopher/Gemini MCP fetch engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server over stdio (gopher_fetch / gemini_fetch tools).
    #[cfg(feature = "stdio")]
    McpStdio,
    /// Self-check: config, TOFU/cert directories, and (optionally) a stdio handshake.
    Doctor(DoctorCmd),
    /// Print the crate version.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Attempt a local stdio MCP handshake (list_tools) to prove the server can start.
    ///
    /// This is a self-check: it spawns a child `smallweb-mcp mcp-stdio` process and calls
    /// `list_tools`. It does not perform any network fetch, and it does not print secrets
    /// (smallweb has none to print -- there are no API keys in this taxonomy).
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    check_stdio: bool,
    /// Timeout for the stdio handshake (ms).
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[cfg(feature = "stdio")]
mod mcp {
    use std::sync::Arc;

    use rmcp::{
        handler::server::router::tool::ToolRouter as RmcpToolRouter,
        handler::server::wrapper::Parameters,
        model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
        tool, tool_handler, tool_router,
        transport::stdio,
        ErrorData as McpError, ServiceExt,
    };
    use schemars::JsonSchema;
    use serde::Deserialize;

    use smallweb_core::FetchResult;
    use smallweb_local::{Config, SmallwebEngine};

    /// Wrap a `FetchResult` as both structured content (machine consumers)
    /// and a text fallback (clients that only read `content[0].text`).
    fn tool_result(payload: &FetchResult) -> CallToolResult {
        let value = serde_json::to_value(payload).unwrap_or_else(|_| serde_json::json!({}));
        let mut r = CallToolResult::structured(value.clone());
        r.content = vec![Content::text(value.to_string())];
        r
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct GopherFetchArgs {
        /// Gopher URL to fetch, e.g. `gopher://gopher.floodgap.com/1/`.
        url: String,
    }

    #[derive(Debug, Deserialize, JsonSchema, Default)]
    struct GeminiFetchArgs {
        /// Gemini URL to fetch, e.g. `gemini://geminiprotocol.net/`.
        url: String,
    }

    #[derive(Clone)]
    pub(crate) struct SmallwebMcp {
        tool_router: RmcpToolRouter<Self>,
        engine: Arc<SmallwebEngine>,
    }

    #[tool_router]
    impl SmallwebMcp {
        pub(crate) fn new() -> Result<Self, McpError> {
            let config = Config::from_env();
            let engine = SmallwebEngine::new(config);
            Ok(Self { tool_router: Self::tool_router(), engine: Arc::new(engine) })
        }

        #[tool(description = "Fetch a gopher:// URL (menu, text, or binary-item metadata)")]
        async fn gopher_fetch(
            &self,
            Parameters(args): Parameters<Option<GopherFetchArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let args = args.unwrap_or_default();
            let result = self.engine.fetch_gopher(&args.url).await;
            Ok(tool_result(&result))
        }

        #[tool(description = "Fetch a gemini:// URL (gemtext, input prompt, redirect, or certificate request)")]
        async fn gemini_fetch(
            &self,
            Parameters(args): Parameters<Option<GeminiFetchArgs>>,
        ) -> Result<CallToolResult, McpError> {
            let args = args.unwrap_or_default();
            let result = self.engine.fetch_gemini(&args.url).await;
            Ok(tool_result(&result))
        }
    }

    #[tool_handler]
    impl rmcp::ServerHandler for SmallwebMcp {
        fn get_info(&self) -> ServerInfo {
            ServerInfo {
                instructions: Some(
                    "Gopher and Gemini fetch tools. Every fetch goes through TOFU-pinned TLS \
                     (Gemini) or plain TCP (Gopher), a host allowlist, a response-size cap, and \
                     a short-TTL cache. Failures are returned as structured error results, never \
                     as tool errors."
                        .to_string(),
                ),
                capabilities: ServerCapabilities::builder().enable_tools().build(),
                ..Default::default()
            }
        }
    }

    pub(crate) async fn serve_stdio() -> Result<(), McpError> {
        let svc = SmallwebMcp::new()?;
        let running = svc
            .serve(stdio())
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        running
            .waiting()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(())
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the MCP JSON-RPC wire protocol; logs must go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "stdio")]
        Commands::McpStdio => {
            mcp::serve_stdio().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Doctor(args) => run_doctor(args).await?,
        Commands::Version(args) => run_version(args),
    }

    Ok(())
}

async fn run_doctor(args: DoctorCmd) -> Result<()> {
    let config = smallweb_local::Config::from_env();

    let mut checks: Vec<serde_json::Value> = Vec::new();

    for (name, dir) in [
        ("gemini_tofu_storage_dir_writable", &config.gemini_tofu_storage_path),
        ("gemini_client_cert_storage_dir_writable", &config.gemini_client_cert_storage_path),
    ] {
        let parent = dir.parent().unwrap_or(dir.as_path());
        let ok = (|| -> std::io::Result<()> {
            std::fs::create_dir_all(parent)?;
            let probe = parent.join(format!(
                "smallweb-doctor-{}.probe",
                std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis()
            ));
            std::fs::write(&probe, b"ok")?;
            std::fs::remove_file(&probe)?;
            Ok(())
        })()
        .is_ok();
        checks.push(serde_json::json!({
            "name": name,
            "ok": ok,
            "message": if ok { "directory is writable" } else { "directory is not writable" },
        }));
    }

    checks.push(serde_json::json!({
        "name": "gopher_allowed_hosts",
        "ok": true,
        "message": match &config.gopher_allowed_hosts {
            Some(hosts) => format!("{} host(s) allowlisted", hosts.len()),
            None => "no allowlist; any host permitted".to_string(),
        },
    }));
    checks.push(serde_json::json!({
        "name": "gemini_allowed_hosts",
        "ok": true,
        "message": match &config.gemini_allowed_hosts {
            Some(hosts) => format!("{} host(s) allowlisted", hosts.len()),
            None => "no allowlist; any host permitted".to_string(),
        },
    }));

    let mut stdio_ok: Option<bool> = None;
    if args.check_stdio {
        #[cfg(feature = "stdio")]
        {
            stdio_ok = Some(check_stdio_handshake(args.timeout_ms).await.is_ok());
        }
        #[cfg(not(feature = "stdio"))]
        {
            stdio_ok = Some(false);
        }
        checks.push(serde_json::json!({
            "name": "stdio_handshake",
            "ok": stdio_ok.unwrap_or(false),
            "message": if stdio_ok.unwrap_or(false) {
                "mcp-stdio handshake succeeded"
            } else {
                "mcp-stdio handshake failed or timed out"
            },
        }));
    }

    let all_ok = checks.iter().all(|c| c.get("ok").and_then(|v| v.as_bool()).unwrap_or(false));
    let payload = serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": all_ok,
        "checks": checks,
    });

    match args.output.to_ascii_lowercase().as_str() {
        "text" => {
            for c in &checks {
                let name = c.get("name").and_then(|v| v.as_str()).unwrap_or("?");
                let ok = c.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
                println!("- {}: {}", name, if ok { "ok" } else { "fail" });
            }
        }
        _ => println!("{payload}"),
    }

    if !all_ok {
        anyhow::bail!("one or more doctor checks failed");
    }
    Ok(())
}

#[cfg(feature = "stdio")]
async fn check_stdio_handshake(timeout_ms: u64) -> Result<()> {
    use rmcp::service::ServiceExt;
    use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
    use tokio::process::Command;

    let exe = std::env::current_exe().unwrap_or_else(|_| std::path::PathBuf::from("smallweb-mcp"));
    let child = TokioChildProcess::new(Command::new(exe).configure(|cmd| {
        cmd.arg("mcp-stdio");
        cmd.env("RUST_LOG", "error");
    }))?;

    let service = ().serve(child).await?;
    let tools = tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), service.list_tools(Default::default())).await??;
    if tools.tools.is_empty() {
        anyhow::bail!("server advertised zero tools");
    }
    Ok(())
}

fn run_version(args: VersionCmd) {
    let v = serde_json::json!({
        "schema_version": 1,
        "kind": "version",
        "ok": true,
        "name": "smallweb-mcp",
        "version": env!("CARGO_PKG_VERSION"),
    });
    match args.output.to_ascii_lowercase().as_str() {
        "text" => println!("smallweb-mcp {}", env!("CARGO_PKG_VERSION")),
        _ => println!("{v}"),
    }
}
