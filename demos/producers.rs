//! Three producers, one worker, results written per operation.
//!
//! ```text
//! RUST_LOG=sutra_rs=debug cargo run --example producers -- [output_dir] [tasks_per_producer]
//! ```

use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use sutra_rs::prelude::*;
use sutra_rs::telemetry::{ConsoleExporter, JsonExporter};
use tracing_subscriber::EnvFilter;

fn producer(service: Arc<TaskService>, kind: OpKind, count: usize) -> Result<Vec<TaskId>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| service.submit(kind, rng.gen_range(1.0..100.0)))
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));
    let per_producer = args
        .next()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(10);
    std::fs::create_dir_all(&out_dir)?;

    let service = Arc::new(TaskService::with_defaults()?);
    service.start()?;

    println!("=== Producers Demo ===\n");

    let kinds = [OpKind::Sine, OpKind::SquareRoot, OpKind::Square];
    let handles: Vec<_> = kinds
        .into_iter()
        .map(|kind| {
            let service = service.clone();
            (kind, thread::spawn(move || producer(service, kind, per_producer)))
        })
        .collect();

    for (kind, handle) in handles {
        let ids = handle
            .join()
            .map_err(|_| Error::executor("producer thread panicked"))??;

        let path = out_dir.join(format!("{}_results.txt", kind.name()));
        let mut file = BufWriter::new(File::create(&path)?);
        for id in ids {
            writeln!(file, "{}", service.fetch(id)?)?;
        }
        file.flush()?;
        println!("wrote {}", path.display());
    }

    service.stop()?;

    let snapshot = service.metrics();
    println!();
    ConsoleExporter::new(true).export(&snapshot)?;
    JsonExporter::new(out_dir.join("metrics.json")).export(&snapshot)?;

    println!("\n=== Demo Complete ===");
    Ok(())
}
