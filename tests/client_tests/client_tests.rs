//! Client Tests
//!
//! End-to-end tests: an in-process emulator on an ephemeral port and the
//! blocking client talking to it over TCP.

use std::collections::BTreeMap;
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bigcell::client::{Client, ReadRowsQuery};
use bigcell::config::{Config, EMULATOR_HOST_ENV};
use bigcell::engine::Engine;
use bigcell::model::{prefix_row_set, ColumnFamily, GcRule, RowFilter};
use bigcell::network::{Server, ShutdownHandle};
use bigcell::protocol::{read_response, Status};
use bigcell::smoke;
use bigcell::BigcellError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start() -> Self {
        Self::start_with(Config::builder().listen_addr("127.0.0.1:0").build())
    }

    fn start_with(config: Config) -> Self {
        let engine = Arc::new(Engine::open(config.clone()).unwrap());
        let server = Server::bind(config, engine).unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            shutdown,
            handle: Some(handle),
        }
    }

    fn client(&self) -> Client {
        Client::connect(&self.addr.to_string(), "p", "i").unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn w_family() -> BTreeMap<String, ColumnFamily> {
    [("W".to_string(), ColumnFamily::new(Some(GcRule::max_versions(1))))]
        .into_iter()
        .collect()
}

fn keys(rows: &[bigcell::model::Row]) -> Vec<String> {
    rows.iter()
        .map(|row| String::from_utf8(row.key.clone()).unwrap())
        .collect()
}

// =============================================================================
// Connection Tests
// =============================================================================

#[test]
fn test_ping() {
    let server = TestServer::start();
    server.client().ping().unwrap();
}

#[test]
fn test_connect_to_closed_port_fails() {
    let result = Client::connect("127.0.0.1:1", "p", "i");
    assert!(matches!(result, Err(BigcellError::Network(_))));
}

#[test]
fn test_clones_share_one_connection() {
    let server = TestServer::start();
    let client = server.client();
    let clone = client.clone();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = clone.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    client.ping().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    client.ping().unwrap();
}

#[test]
fn test_garbage_frame_gets_error_response() {
    let server = TestServer::start();
    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream.write_all(&[0x7F, 0, 0, 0, 0]).unwrap();

    let response = read_response(&mut BufReader::new(stream)).unwrap();
    assert_eq!(response.status, Status::Error);
}

#[test]
fn test_connection_over_cap_is_rejected() {
    let server = TestServer::start_with(
        Config::builder()
            .listen_addr("127.0.0.1:0")
            .max_connections(1)
            .build(),
    );
    let first = server.client();
    first.ping().unwrap();

    let stream = TcpStream::connect(server.addr).unwrap();
    let mut reader = BufReader::new(stream);
    let response = read_response(&mut reader).unwrap();
    assert_eq!(response.status, Status::Error);
    assert_eq!(response.message(), "too many connections");
    assert!(matches!(read_response(&mut reader), Err(BigcellError::Io(_))));

    // The connection holding the slot keeps working
    first.ping().unwrap();
}

#[test]
fn test_from_env() {
    // Only test in this binary touching the variable
    let server = TestServer::start();
    let previous = std::env::var(EMULATOR_HOST_ENV).ok();

    std::env::remove_var(EMULATOR_HOST_ENV);
    assert!(matches!(
        Client::from_env("p", "i"),
        Err(BigcellError::Config(_))
    ));

    std::env::set_var(EMULATOR_HOST_ENV, "  ");
    assert!(matches!(
        Client::from_env("p", "i"),
        Err(BigcellError::Config(_))
    ));

    std::env::set_var(EMULATOR_HOST_ENV, server.addr.to_string());
    let client = Client::from_env("p", "i").unwrap();
    client.ping().unwrap();
    assert_eq!(client.addr(), server.addr.to_string());

    match previous {
        Some(value) => std::env::set_var(EMULATOR_HOST_ENV, value),
        None => std::env::remove_var(EMULATOR_HOST_ENV),
    }
}

// =============================================================================
// Table Administration Tests
// =============================================================================

#[test]
fn test_table_lifecycle() {
    let server = TestServer::start();
    let client = server.client();
    let table = client.table("orders");

    assert!(!table.exists().unwrap());
    table.create(w_family()).unwrap();
    assert!(table.exists().unwrap());
    assert!(table.create(w_family()).unwrap_err().is_already_exists());

    assert_eq!(client.list_tables().unwrap(), vec!["orders".to_string()]);

    table.delete().unwrap();
    assert!(!table.exists().unwrap());
    assert!(table.delete().unwrap_err().is_not_found());
}

#[test]
fn test_column_family_admin() {
    let server = TestServer::start();
    let table = server.client().table("t");
    table.create(w_family()).unwrap();

    table.create_column_family("extra", None).unwrap();
    table
        .update_column_family("extra", Some(GcRule::max_versions(3)))
        .unwrap();
    let families = table.column_families().unwrap();
    assert_eq!(families["extra"].gc_rule, Some(GcRule::max_versions(3)));

    table.drop_column_family("extra").unwrap();
    assert!(!table.column_families().unwrap().contains_key("extra"));
    assert!(table.drop_column_family("extra").unwrap_err().is_not_found());
}

// =============================================================================
// Data Tests
// =============================================================================

#[test]
fn test_direct_row_and_reads() {
    let server = TestServer::start();
    let table = server.client().table("t");
    table.create(w_family()).unwrap();

    for key in ["123#1", "123#2", "124#1"] {
        table.direct_row(key).set_cell("W", "col", key).commit().unwrap();
    }

    assert_eq!(table.read_rows(&ReadRowsQuery::all()).unwrap().len(), 3);
    let rows = table
        .read_rows(&ReadRowsQuery::rows(prefix_row_set("123")))
        .unwrap();
    assert_eq!(keys(&rows), vec!["123#1", "123#2"]);

    let limited = table.read_rows(&ReadRowsQuery::all().limit(1)).unwrap();
    assert_eq!(keys(&limited), vec!["123#1"]);

    assert!(table.read_row("124#1", None).unwrap().is_some());
    assert!(table.read_row("125#1", None).unwrap().is_none());
}

#[test]
fn test_set_cell_at_truncates_to_millis() {
    let server = TestServer::start();
    let table = server.client().table("t");
    table.create(w_family()).unwrap();

    let when = chrono::DateTime::from_timestamp(1_650_000_000, 123_456_789).unwrap();
    table
        .direct_row("r")
        .set_cell_at("W", "q", "v", when)
        .commit()
        .unwrap();

    let row = table.read_row("r", None).unwrap().unwrap();
    assert_eq!(
        row.latest("W", b"q").unwrap().timestamp_micros,
        1_650_000_000_123_000
    );
}

#[test]
fn test_unknown_family_fails_without_writing() {
    let server = TestServer::start();
    let table = server.client().table("t");
    table.create(w_family()).unwrap();

    let mut row = table.direct_row("r");
    row.set_cell("W", "ok", "1").set_cell("nope", "q", "2");
    assert!(row.commit().unwrap_err().is_not_found());
    assert!(table.read_row("r", None).unwrap().is_none());
}

#[test]
fn test_deletes() {
    let server = TestServer::start();
    let table = server.client().table("t");
    table.create(w_family()).unwrap();

    table
        .direct_row("r")
        .set_cell("W", "a", "1")
        .set_cell("W", "b", "2")
        .set_cell("W", "c", "3")
        .commit()
        .unwrap();

    table.direct_row("r").delete_cells("W", ["a", "b"]).commit().unwrap();
    let row = table.read_row("r", None).unwrap().unwrap();
    assert_eq!(row.cell_count(), 1);

    table.direct_row("r").delete().commit().unwrap();
    assert!(table.read_row("r", None).unwrap().is_none());
}

#[test]
fn test_mutate_rows_batch() {
    let server = TestServer::start();
    let table = server.client().table("t");
    table.create(w_family()).unwrap();

    let mut good = table.direct_row("good");
    good.set_cell("W", "q", "v");
    let mut bad = table.direct_row("bad");
    bad.set_cell("missing", "q", "v");

    let statuses = table.mutate_rows(&[good, bad]).unwrap();
    assert_eq!(statuses[0].status, Status::Ok);
    assert_eq!(statuses[1].status, Status::NotFound);
    assert_eq!(keys(&table.read_rows(&ReadRowsQuery::all()).unwrap()), vec!["good"]);
}

#[test]
fn test_truncate_and_drop_by_prefix() {
    let server = TestServer::start();
    let table = server.client().table("t");
    table.create(w_family()).unwrap();
    for key in ["a#1", "a#2", "b#1"] {
        table.direct_row(key).set_cell("W", "q", "v").commit().unwrap();
    }

    assert_eq!(table.drop_by_prefix("a#").unwrap(), 2);
    assert_eq!(table.truncate().unwrap(), 1);
    assert!(table.read_rows(&ReadRowsQuery::all()).unwrap().is_empty());
    assert!(table.exists().unwrap());
}

#[test]
fn test_conditional_row() {
    let server = TestServer::start();
    let table = server.client().table("t");
    table.create(w_family()).unwrap();
    table.direct_row("r").set_cell("W", "state", "on").commit().unwrap();

    let matched = table
        .conditional_row("r", Some(RowFilter::ValueEquals(b"on".to_vec())))
        .set_cell("W", "state", "off", true)
        .set_cell("W", "state", "still-on", false)
        .commit()
        .unwrap();
    assert!(matched);

    let row = table.read_row("r", None).unwrap().unwrap();
    assert_eq!(row.decode::<String>("W", b"state").unwrap(), "off");
}

#[test]
fn test_append_row() {
    let server = TestServer::start();
    let table = server.client().table("t");
    table.create(w_family()).unwrap();

    let mut append = table.append_row("r");
    append
        .append_cell_value("W", "log", "a")
        .increment_cell_value("W", "n", 2);
    append.commit().unwrap();

    let modified = table
        .append_row("r")
        .append_cell_value("W", "log", "b")
        .increment_cell_value("W", "n", -5)
        .commit()
        .unwrap();

    assert_eq!(modified.cell_value("W", b"log"), Some(&b"ab"[..]));
    assert_eq!(modified.decode::<i64>("W", b"n").unwrap(), -3);
}

// =============================================================================
// Walkthrough Tests
// =============================================================================

#[test]
fn test_smoke_walkthrough_passes() {
    let server = TestServer::start();
    let client = server.client();

    smoke::run(&client, smoke::DEFAULT_TABLE_ID).unwrap();

    // Second run takes the truncate path
    smoke::run(&client, smoke::DEFAULT_TABLE_ID).unwrap();
}

#[test]
fn test_smoke_walkthrough_survives_restart() {
    let temp_dir = TempDir::new().unwrap();
    let config = || {
        Config::builder()
            .listen_addr("127.0.0.1:0")
            .data_dir(temp_dir.path())
            .build()
    };

    {
        let server = TestServer::start_with(config());
        smoke::run(&server.client(), "persisted").unwrap();
    }

    let server = TestServer::start_with(config());
    let table = server.client().table("persisted");
    assert!(table.exists().unwrap());
    assert_eq!(table.read_rows(&ReadRowsQuery::all()).unwrap().len(), 3);
}
