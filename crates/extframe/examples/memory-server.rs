//! Serve one upload and one download against an in-memory store.
//!
//! Run with:
//!   cargo run --example memory-server
//!
//! In another terminal (port printed on start):
//!   cargo run --features cli -- upload 127.0.0.1:<port> --dataset demo \
//!     --partition 0 --file rows.json
//!   cargo run --features cli -- download 127.0.0.1:<port> --dataset demo \
//!     --partition 0 --columns real,str

use std::sync::Arc;

use extframe::protocol::{Outcome, Server};
use extframe::store::MemoryStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(MemoryStore::new());
    let server = Server::bind("127.0.0.1:0", Arc::clone(&store))?;
    eprintln!("Listening on {}", server.local_addr());

    for _ in 0..2 {
        match server.serve_one() {
            Ok(Outcome::Ingested(s)) => {
                eprintln!("Ingested {} rows into {}/{}", s.rows, s.dataset, s.partition)
            }
            Ok(Outcome::Exported(s)) => {
                eprintln!("Exported {} rows from {}/{}", s.rows, s.dataset, s.partition)
            }
            Err(e) => eprintln!("Connection failed: {e}"),
        }
    }

    eprintln!("Datasets: {:?}", store.dataset_names()?);
    Ok(())
}
