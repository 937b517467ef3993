use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use extframe_protocol::{
    connect, connect_with_config, ClientConfig, ErrorKind, ExportKind, Outcome, ProtocolError,
    Result, Server, ServerConfig,
};
use extframe_store::{
    Cell, CellValue, ColumnSpec, ColumnType, MemoryStore, PartitionSink, PartitionSource,
    StoreError,
};
use extframe_transport::TcpTransport;
use extframe_wire::{Message, WireConfig};

fn serve_once(store: &Arc<MemoryStore>, config: ServerConfig) -> (SocketAddr, JoinHandle<Result<Outcome>>) {
    let server = Server::bind_with_config("127.0.0.1:0", config, Arc::clone(store))
        .expect("server should bind");
    let addr = server.local_addr();
    let handle = thread::spawn(move || server.serve_one());
    (addr, handle)
}

fn upload_rows(addr: SocketAddr, dataset: &str, partition: i32, rows: &[(f64, &str)]) {
    let mut up = connect(addr)
        .expect("client should connect")
        .upload()
        .expect("upload should start");
    up.begin_chunk(dataset, &[ColumnType::Numeric, ColumnType::String], partition)
        .expect("begin chunk");
    for (num, text) in rows {
        up.append_num(0, *num).expect("append num");
        up.append_str(1, text).expect("append str");
    }
    up.close_chunk().expect("close chunk");
}

#[test]
#[allow(clippy::approx_constant)]
fn ingest_then_export_mixed_columns() {
    let store = Arc::new(MemoryStore::new());

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let mut up = connect(addr).unwrap().upload().unwrap();
    up.begin_chunk("t", &[ColumnType::Numeric, ColumnType::String], 0)
        .unwrap();
    up.append_num(0, 3.14).unwrap();
    up.append_str(1, "x").unwrap();
    up.append_na(0).unwrap();
    up.append_str(1, "y").unwrap();
    up.close_chunk().unwrap();
    match server.join().unwrap().unwrap() {
        Outcome::Ingested(summary) => {
            assert_eq!(summary.rows, 2);
            assert_eq!(summary.appends, 4);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let part = connect(addr)
        .unwrap()
        .download("t", 0, &[ExportKind::Real, ExportKind::Str])
        .unwrap();
    server.join().unwrap().unwrap();

    assert_eq!(part.rows, 2);
    assert_eq!(
        part.cells,
        vec![
            vec![Cell::Real(3.14), Cell::Str("x".into())],
            vec![Cell::Null, Cell::Str("y".into())],
        ]
    );
}

#[test]
fn categorical_exports_domain_string() {
    let store = Arc::new(MemoryStore::new());
    store
        .declare_dataset("colors", vec![ColumnSpec::categorical("c", ["red", "blue"])])
        .unwrap();

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let mut up = connect(addr).unwrap().upload().unwrap();
    up.begin_chunk("colors", &[ColumnType::Categorical], 0).unwrap();
    up.append_str(0, "blue").unwrap();
    up.close_chunk().unwrap();
    server.join().unwrap().unwrap();

    let view = store.resolve("colors").unwrap();
    assert_eq!(view.columns()[0].domain, vec!["red", "blue"]);

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let part = connect(addr)
        .unwrap()
        .download("colors", 0, &[ExportKind::Str])
        .unwrap();
    server.join().unwrap().unwrap();
    assert_eq!(part.cells, vec![vec![Cell::Str("blue".into())]]);
}

#[test]
fn dropped_connection_publishes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let (addr, server) = serve_once(&store, ServerConfig::default());

    let mut up = connect(addr).unwrap().upload().unwrap();
    up.begin_chunk("t", &[ColumnType::Numeric], 0).unwrap();
    up.append_num(0, 1.0).unwrap();
    up.flush().unwrap();
    drop(up);

    let err = server.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(matches!(
        store.resolve("t"),
        Err(StoreError::DatasetNotFound(_))
    ));
}

#[test]
fn export_row_count_matches_ingest() {
    let store = Arc::new(MemoryStore::new());
    store
        .declare_dataset(
            "big",
            vec![ColumnSpec::integer("i"), ColumnSpec::new("s", ColumnType::String)],
        )
        .unwrap();
    let rows: Vec<(f64, String)> = (0..250).map(|i| (f64::from(i), format!("r{i}"))).collect();
    let borrowed: Vec<(f64, &str)> = rows.iter().map(|(n, s)| (*n, s.as_str())).collect();

    let (addr, server) = serve_once(&store, ServerConfig::default());
    upload_rows(addr, "big", 7, &borrowed);
    server.join().unwrap().unwrap();

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let part = connect(addr)
        .unwrap()
        .download("big", 7, &[ExportKind::Int, ExportKind::Str])
        .unwrap();
    match server.join().unwrap().unwrap() {
        Outcome::Exported(summary) => assert_eq!(summary.cells, 500),
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(part.rows, 250);
    assert_eq!(part.cells[249], vec![Cell::Int(249), Cell::Str("r249".into())]);
}

#[test]
fn out_of_range_column_closes_connection() {
    let store = Arc::new(MemoryStore::new());
    let (addr, server) = serve_once(&store, ServerConfig::default());

    let mut conn = TcpTransport::connect(addr).unwrap();
    let mut msg = Message::new();
    msg.put_i32(0).put_i32(2);
    msg.put_str("t").unwrap();
    msg.put_bytes(&[ColumnType::Numeric.code()]).unwrap();
    msg.put_i32(0).put_i32(3).put_i32(1).put_i32(5).put_f64(1.0);
    conn.write_all(msg.as_bytes()).unwrap();

    let err = server.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::ColumnOutOfRange {
            column: 5,
            columns: 1
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Protocol);

    let mut buf = [0u8; 4];
    assert!(!matches!(conn.read(&mut buf), Ok(n) if n > 0));
    assert!(!store.contains_partition("t", 0));
}

#[test]
fn unknown_request_type_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let (addr, server) = serve_once(&store, ServerConfig::default());

    let mut conn = TcpTransport::connect(addr).unwrap();
    conn.write_all(&9i32.to_ne_bytes()).unwrap();

    assert!(matches!(
        server.join().unwrap(),
        Err(ProtocolError::UnknownRequest(9))
    ));
}

#[test]
fn legacy_envelope_roundtrip() {
    let store = Arc::new(MemoryStore::new());
    let server_config = ServerConfig {
        legacy_envelope: true,
        ..ServerConfig::default()
    };
    let client_config = ClientConfig {
        legacy_envelope: true,
        ..ClientConfig::default()
    };

    let (addr, server) = serve_once(&store, server_config.clone());
    let mut up = connect_with_config(addr, client_config.clone())
        .unwrap()
        .upload()
        .unwrap();
    up.begin_chunk("legacy", &[ColumnType::String], 1).unwrap();
    up.append_str(0, "old").unwrap();
    up.close_chunk().unwrap();
    server.join().unwrap().unwrap();

    let (addr, server) = serve_once(&store, server_config);
    let part = connect_with_config(addr, client_config)
        .unwrap()
        .download("legacy", 1, &[ExportKind::Str])
        .unwrap();
    server.join().unwrap().unwrap();
    assert_eq!(part.cells, vec![vec![Cell::Str("old".into())]]);
}

#[test]
fn uuid_and_time_columns() {
    let store = Arc::new(MemoryStore::new());
    let id = "550e8400-e29b-41d4-a716-446655440000";

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let mut up = connect(addr).unwrap().upload().unwrap();
    up.begin_chunk("events", &[ColumnType::Uuid, ColumnType::Time], 0)
        .unwrap();
    up.append_str(0, id).unwrap();
    up.append_num(1, 1_700_000_000_000.0).unwrap();
    up.append_na(0).unwrap();
    up.append_na(1).unwrap();
    up.close_chunk().unwrap();
    server.join().unwrap().unwrap();

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let part = connect(addr)
        .unwrap()
        .download("events", 0, &[ExportKind::Str, ExportKind::Int])
        .unwrap();
    server.join().unwrap().unwrap();
    assert_eq!(
        part.cells,
        vec![
            vec![Cell::Str(id.into()), Cell::Int(1_700_000_000_000)],
            vec![Cell::Null, Cell::Null],
        ]
    );
}

#[test]
fn missing_partition_sends_no_header() {
    let store = Arc::new(MemoryStore::new());
    let (addr, server) = serve_once(&store, ServerConfig::default());

    let result = connect(addr)
        .unwrap()
        .download("absent", 0, &[ExportKind::Str]);
    assert!(result.is_err());

    let err = server.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn concurrent_uploads_each_publish() {
    let store = Arc::new(MemoryStore::new());
    let server = Server::bind("127.0.0.1:0", Arc::clone(&store)).unwrap();
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    let serving = thread::spawn(move || server.serve());

    let clients: Vec<_> = (0..8)
        .map(|p| {
            thread::spawn(move || {
                let text = format!("p{p}");
                upload_rows(addr, "shared", p, &[(f64::from(p), text.as_str())]);
            })
        })
        .collect();
    for client in clients {
        client.join().unwrap();
    }

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while store.partition_ids("shared").map(|ids| ids.len()).unwrap_or(0) < 8
        && std::time::Instant::now() < deadline
    {
        thread::sleep(std::time::Duration::from_millis(10));
    }
    assert_eq!(
        store.partition_ids("shared").unwrap(),
        (0..8).collect::<Vec<u32>>()
    );

    let part = connect(addr)
        .unwrap()
        .download("shared", 5, &[ExportKind::Real, ExportKind::Str])
        .unwrap();
    assert_eq!(part.cells, vec![vec![Cell::Real(5.0), Cell::Str("p5".into())]]);

    shutdown.shutdown();
    serving.join().unwrap().unwrap();
}

#[test]
fn export_gives_up_when_peer_stops_reading() {
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    let store = Arc::new(MemoryStore::new());
    let mut set = store.allocate("wide", &[ColumnType::String], 0).unwrap();
    let text = "x".repeat(1024);
    for _ in 0..20_000 {
        set.append(0, CellValue::Str(text.clone())).unwrap();
    }
    set.seal().unwrap();

    let config = ServerConfig {
        wire: WireConfig {
            write_timeout: Some(Duration::from_millis(200)),
            ..WireConfig::default()
        },
        ..ServerConfig::default()
    };
    let server = Server::bind_with_config("127.0.0.1:0", config, Arc::clone(&store)).unwrap();
    let addr = server.local_addr();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(server.serve_one());
    });

    let mut conn = TcpTransport::connect(addr).unwrap();
    let mut msg = Message::new();
    msg.put_i32(1);
    msg.put_str("wide").unwrap();
    msg.put_i32(0);
    conn.write_all(msg.as_bytes()).unwrap();

    let started = Instant::now();
    let result = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("export should stop once the write timeout expires");
    assert!(started.elapsed() < Duration::from_secs(10));
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    drop(conn);
}

#[test]
fn numeric_payload_is_stable_across_partitions() {
    let store = Arc::new(MemoryStore::new());
    for (partition, value) in [(0, 1.0), (1, 1.5)] {
        let (addr, server) = serve_once(&store, ServerConfig::default());
        upload_rows(addr, "t", partition, &[(value, "v")]);
        server.join().unwrap().unwrap();
    }

    let kinds: Vec<ExportKind> = store
        .resolve("t")
        .unwrap()
        .columns()
        .iter()
        .map(ExportKind::for_column)
        .collect();
    assert_eq!(kinds, vec![ExportKind::Real, ExportKind::Str]);

    for (partition, value) in [(0, 1.0), (1, 1.5)] {
        let (addr, server) = serve_once(&store, ServerConfig::default());
        let part = connect(addr).unwrap().download("t", partition, &kinds).unwrap();
        server.join().unwrap().unwrap();
        assert_eq!(part.cells, vec![vec![Cell::Real(value), Cell::Str("v".into())]]);
    }
}

#[test]
fn fractional_value_in_integer_column_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    store
        .declare_dataset("counts", vec![ColumnSpec::integer("n")])
        .unwrap();

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let mut up = connect(addr).unwrap().upload().unwrap();
    up.begin_chunk("counts", &[ColumnType::Numeric], 0).unwrap();
    up.append_num(0, 2.5).unwrap();
    up.close_chunk().unwrap();

    let err = server.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::Store(StoreError::TypeMismatch { column: 0, .. })
    ));
    assert!(!store.contains_partition("counts", 0));
}

#[test]
fn empty_column_type_roundtrip() {
    let store = Arc::new(MemoryStore::new());

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let mut up = connect(addr).unwrap().upload().unwrap();
    up.begin_chunk("sparse", &[ColumnType::Empty, ColumnType::String], 0)
        .unwrap();
    up.append_na(0).unwrap();
    up.append_str(1, "only").unwrap();
    up.close_chunk().unwrap();
    server.join().unwrap().unwrap();

    let (addr, server) = serve_once(&store, ServerConfig::default());
    let part = connect(addr)
        .unwrap()
        .download("sparse", 0, &[ExportKind::Str, ExportKind::Str])
        .unwrap();
    server.join().unwrap().unwrap();
    assert_eq!(part.cells, vec![vec![Cell::Null, Cell::Str("only".into())]]);
}
