//! A small admin page served over HTTP. Every request renders the page from a
//! fresh registry snapshot; the server keeps no state of its own.

use std::net::SocketAddr;

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Router,
};
use grafter::{Architecture, CommandRecord, Error, GraftHandle, GraftSummary, Registry};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{error::CliError, input};

#[derive(Debug, Default, Deserialize)]
pub struct AddParams {
    address: Option<String>,
    port: Option<String>,
    architecture: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommandParams {
    command: Option<String>,
    graft_index: Option<String>,
}

pub fn router(registry: Registry) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add", get(add))
        .route("/command", get(command))
        .with_state(registry)
}

/// Serves the admin page until ctrl-c.
pub async fn serve(registry: Registry, bind: SocketAddr) -> Result<(), CliError> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|source| CliError::Bind { addr: bind, source })?;
    info!(%bind, "admin page ready");

    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                warn!(%error, "could not listen for ctrl-c");
            }
        })
        .await?;
    Ok(())
}

async fn index(State(registry): State<Registry>) -> Html<String> {
    Html(render(&registry, "").await)
}

async fn add(State(registry): State<Registry>, Query(params): Query<AddParams>) -> Html<String> {
    let result = match add_graft(&registry, params).await {
        Ok(handle) => format!("Added graft {handle}"),
        Err(Error::Validation(reason)) => format!("Invalid graft specification: {reason}"),
        Err(error) => format!("Could not add graft: {error}"),
    };
    Html(render(&registry, &result).await)
}

async fn command(
    State(registry): State<Registry>,
    Query(params): Query<CommandParams>,
) -> Html<String> {
    let result = match command_graft(&registry, params).await {
        Ok(()) => "Commanded".to_owned(),
        Err(Error::Validation(reason)) => format!("Invalid command specification: {reason}"),
        Err(error) => format!("Could not command graft: {error}"),
    };
    Html(render(&registry, &result).await)
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, Error> {
    value
        .as_deref()
        .ok_or_else(|| Error::Validation(format!("missing {name}")))
}

async fn add_graft(registry: &Registry, params: AddParams) -> Result<GraftHandle, Error> {
    let address = input::address(required(&params.address, "address")?)?;
    let port = input::port(required(&params.port, "port")?)?;
    let architecture = input::architecture(params.architecture.as_deref().unwrap_or(""))?;
    registry.add_graft(&address, port, architecture).await
}

async fn command_graft(registry: &Registry, params: CommandParams) -> Result<(), Error> {
    let command = input::command(required(&params.command, "command")?)?;
    let handle = input::handle(required(&params.graft_index, "graft_index")?)?;
    registry.command_graft(handle, command).await
}

/// Everything the page shows, captured up front.
struct Snapshot {
    architectures: Vec<Architecture>,
    grafts: Vec<(GraftSummary, Vec<CommandRecord>)>,
}

impl Snapshot {
    async fn take(registry: &Registry) -> Self {
        let mut grafts = Vec::new();
        for graft in registry.list_grafts().await {
            // a graft deleted since the listing just drops out of the page
            if let Ok(records) = registry.list_responses(graft.handle).await {
                grafts.push((graft, records));
            }
        }
        Self {
            architectures: registry.architectures(),
            grafts,
        }
    }
}

async fn render(registry: &Registry, result: &str) -> String {
    render_page(&Snapshot::take(registry).await, result)
}

fn render_page(snapshot: &Snapshot, result: &str) -> String {
    let architecture_options: String = snapshot
        .architectures
        .iter()
        .map(|arch| format!(r#"<option value="{arch}">{arch}</option>"#))
        .collect();

    let mut graft_options = String::new();
    let mut responses = String::new();
    for (graft, records) in &snapshot.grafts {
        let address = escape(&graft.address);
        graft_options.push_str(&format!(
            r#"<option value="{}">{} {}</option>"#,
            graft.handle, address, graft.port
        ));
        responses.push_str(&format!("<div><h3>Graft {} {}</h3>", address, graft.port));
        for record in records {
            responses.push_str(&format!(
                "<div>Command: {} Response: <pre>{}</pre></div>",
                escape(record.command()),
                escape(record.response())
            ));
        }
        responses.push_str("</div>");
    }

    format!(
        r#"<html>
<head>
    <title>Graft Manager</title>
    <style>
    .section {{
        border: thin solid black;
        margin: 5px;
        }}
    </style>
</head>
<body>
    <h1>Graft Manager</h1>
    {result}
    <div class="section">
        <h2>Add Graft</h2>
        <form method="get" action="/add">
            <label>Address: <input type="textbox" name="address"></label>
            <br><label>Port: <input type="textbox" name="port"></label>
            <br>Architecture: <select name="architecture">{architecture_options}</select>
            <br><input type="submit" value="Add Graft">
        </form>
    </div>
    <div class="section">
        <h2>Command Graft</h2>
        <form method="get" action="/command">
            <label>Command: <input type="textbox" name="command"></label>
            <label>Graft: <select name="graft_index">{graft_options}</select></label>
            <br><input type="submit" value="Command Graft">
        </form>
    </div>
    <div class="section">
        <h2>Graft Responses <a href="/">REFRESH</a></h2>
        {responses}
    </div>
</body>
</html>
"#,
        result = escape(result),
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use grafter::{ChannelConfig, PayloadTable, PendingCommand};
    use rstest::rstest;

    use super::*;

    fn registry() -> Registry {
        Registry::new(PayloadTable::default(), ChannelConfig::default())
    }

    #[rstest]
    #[case("plain", "plain")]
    #[case("<script>", "&lt;script&gt;")]
    #[case(r#"a & "b" 'c'"#, "a &amp; &quot;b&quot; &#39;c&#39;")]
    fn escapes_html(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape(raw), expected);
    }

    #[test]
    fn page_lists_grafts_and_their_responses() {
        let record = PendingCommand::new("cat /etc/hostname\n".into()).complete("<box>\n".into());
        let snapshot = Snapshot {
            architectures: vec![Architecture::X86, Architecture::X64],
            grafts: vec![(
                GraftSummary {
                    handle: GraftHandle(7),
                    address: "10.0.0.2".into(),
                    port: 4444,
                    architecture: Architecture::X64,
                },
                vec![record],
            )],
        };

        let page = render_page(&snapshot, "Added graft 7");

        assert!(page.contains("Added graft 7"));
        assert!(page.contains(r#"<option value="X86">X86</option>"#));
        assert!(page.contains(r#"<option value="7">10.0.0.2 4444</option>"#));
        assert!(page.contains("<h3>Graft 10.0.0.2 4444</h3>"));
        assert!(page.contains("Command: cat /etc/hostname\n Response: <pre>&lt;box&gt;\n</pre>"));
    }

    #[tokio::test]
    async fn add_requires_every_field() {
        let params = AddParams {
            address: Some("127.0.0.1".into()),
            ..AddParams::default()
        };
        let error = add_graft(&registry(), params).await.unwrap_err();
        assert_eq!(error.to_string(), "invalid input: missing port");
    }

    #[tokio::test]
    async fn add_rejects_bad_ports_before_connecting() {
        let params = AddParams {
            address: Some("127.0.0.1".into()),
            port: Some("99999".into()),
            architecture: None,
        };
        assert!(matches!(
            add_graft(&registry(), params).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn add_connects_with_the_chosen_architecture() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let registry = registry();
        let params = AddParams {
            address: Some("127.0.0.1".into()),
            port: Some(port.to_string()),
            architecture: Some("x86".into()),
        };

        let handle = add_graft(&registry, params).await.unwrap();

        let grafts = registry.list_grafts().await;
        assert_eq!(grafts[0].handle, handle);
        assert_eq!(grafts[0].architecture, Architecture::X86);
    }

    #[tokio::test]
    async fn command_reports_unknown_grafts() {
        let params = CommandParams {
            command: Some("id".into()),
            graft_index: Some("3".into()),
        };
        assert!(matches!(
            command_graft(&registry(), params).await,
            Err(Error::NotFound(GraftHandle(3)))
        ));
    }

    #[tokio::test]
    async fn command_rejects_non_numeric_indexes() {
        let params = CommandParams {
            command: Some("id".into()),
            graft_index: Some("first".into()),
        };
        assert!(matches!(
            command_graft(&registry(), params).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn empty_registry_renders_an_empty_page() {
        let page = render(&registry(), "").await;
        assert!(page.contains("<h1>Graft Manager</h1>"));
        assert!(page.contains(r#"<select name="graft_index"></select>"#));
        assert!(!page.contains("<h3>"));
    }
}
