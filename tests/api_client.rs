// ApiClient against a one-shot local responder: each test serves exactly one
// canned HTTP response and checks what the client sent.

use dcron_cli::api::{ApiClient, SyncState};
use dcron_cli::config::Site;
use dcron_cli::cron::CronPattern;
use dcron_cli::selection::{Endpoint, Scheme};
use dcron_cli::Error;
use support::serve_once;

mod support;

fn client(port: u16, site: &Site) -> ApiClient {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    std::env::set_var("no_proxy", "127.0.0.1,localhost");
    let endpoint = Endpoint {
        scheme: Scheme::Http,
        server: "127.0.0.1".into(),
        port,
    };
    ApiClient::new(endpoint, site).unwrap()
}

fn anonymous() -> Site {
    Site::default()
}

fn pattern(s: &str) -> CronPattern {
    s.parse().unwrap()
}

#[test]
fn status_lists_nodes() {
    let (port, server) = serve_once(
        "200 OK",
        r#"[{"ip":"10.0.0.1","load":"12.5","state":"running","time":"2019-05-01T12:00:00+00:00"},{"ip":"10.0.0.2","load":3,"state":"running"}]"#,
    );

    let nodes = client(port, &anonymous()).status().unwrap();
    let request = server.join().unwrap();

    assert_eq!(request.request_line, "GET /status HTTP/1.1");
    assert_eq!(request.header("authorization"), None);
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].ip.as_deref(), Some("10.0.0.1"));
    assert_eq!(nodes[0].load, Some(12.5));
    assert_eq!(nodes[1].load, Some(3.0));
}

#[test]
fn credentials_are_sent_as_basic_auth() {
    let site = Site {
        username: Some("admin".into()),
        password: Some("secret".into()),
        ..Site::default()
    };
    let (port, server) = serve_once("200 OK", "[]");

    let jobs = client(port, &site).jobs().unwrap();
    let request = server.join().unwrap();

    assert!(jobs.is_empty());
    assert_eq!(request.request_line, "GET /jobs HTTP/1.1");
    assert_eq!(
        request.header("authorization"),
        Some("Basic YWRtaW46c2VjcmV0")
    );
}

#[test]
fn add_job_posts_cron_fields_disabled_by_default() {
    let (port, server) = serve_once("201 Created", "");

    client(port, &anonymous())
        .add_job(&pattern("0 2 * * *"), "backup.sh", false)
        .unwrap();
    let request = server.join().unwrap();

    assert_eq!(request.request_line, "POST /add_job HTTP/1.1");
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(
        request.body,
        "command=backup.sh&minute=0&hour=2&dom=*&month=*&dow=*&disabled=true"
    );
}

#[test]
fn add_job_enabled_omits_disabled_flag() {
    let (port, server) = serve_once("201 Created", "");

    client(port, &anonymous())
        .add_job(&pattern("* * * * *"), "ls", true)
        .unwrap();
    let request = server.join().unwrap();

    assert!(!request.body.contains("disabled"));
}

#[test]
fn run_job_expects_accepted() {
    let (port, server) = serve_once("200 OK", "nope");

    let err = client(port, &anonymous())
        .run_job(&pattern("* * * * *"), "ls")
        .unwrap_err();
    let request = server.join().unwrap();

    assert_eq!(request.request_line, "POST /run_job HTTP/1.1");
    match err {
        Error::UnexpectedStatus { status, body } => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(body, "nope");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn kill_and_remove_hit_their_paths() {
    let (port, server) = serve_once("202 Accepted", "");
    client(port, &anonymous())
        .kill_job(&pattern("* * * * *"), "ls")
        .unwrap();
    assert_eq!(
        server.join().unwrap().request_line,
        "POST /kill_job HTTP/1.1"
    );

    let (port, server) = serve_once("200 OK", "");
    client(port, &anonymous())
        .remove_job(&pattern("* * * * *"), "ls")
        .unwrap();
    assert_eq!(
        server.join().unwrap().request_line,
        "POST /remove_job HTTP/1.1"
    );
}

#[test]
fn cron_sync_reports_body_when_out_of_sync() {
    let (port, server) = serve_once("409 Conflict", "crontab differs");

    let sync = client(port, &anonymous()).cron_in_sync("127.0.0.1").unwrap();
    let request = server.join().unwrap();

    assert_eq!(request.request_line, "GET /cron_in_sync HTTP/1.1");
    assert_eq!(sync, SyncState::OutOfSync("crontab differs".into()));
}

#[test]
fn export_returns_raw_body_and_import_sends_payload() {
    let (port, server) = serve_once("200 OK", r#"[{"command":"ls"}]"#);
    let body = client(port, &anonymous()).export().unwrap();
    assert_eq!(server.join().unwrap().request_line, "GET /export HTTP/1.1");
    assert_eq!(body, br#"[{"command":"ls"}]"#.to_vec());

    let (port, server) = serve_once("200 OK", "");
    client(port, &anonymous()).import(r#"[{"a":1}]"#).unwrap();
    let request = server.join().unwrap();
    assert_eq!(request.request_line, "POST /import HTTP/1.1");
    assert_eq!(request.body, "payload=%5B%7B%22a%22%3A1%7D%5D");
}

#[test]
fn unreachable_node_is_a_remote_error() {
    let port = support::closed_port();

    let err = client(port, &anonymous()).jobs().unwrap_err();
    assert!(matches!(err, Error::Remote(_)), "{err:?}");
}
