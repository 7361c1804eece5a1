use anyhow::Result;
use shuffle_core::{Blake3Hasher, Shuffler};
use std::fs;
use std::path::PathBuf;

const WORK_ROOT: &str = "./shuffle_work";

fn main() -> Result<()> {
    shuffle_core::init_tracing_once();

    let work_dir = PathBuf::from(WORK_ROOT);
    fs::create_dir_all(&work_dir)?;

    let hasher = Box::new(Blake3Hasher::new("demo-salt"));
    let mut shuffler = Shuffler::new(&work_dir, hasher, false);

    for i in 0..10_000u64 {
        let key = format!("record-{i}");
        let payload = format!("payload for {key}").into_bytes();
        shuffler.add(key.as_bytes(), payload)?;
    }

    println!("buckets: {:?}", shuffler.bucket_lengths());

    let mut count = 0usize;
    for record in shuffler.iterate() {
        let (_hkey, _payload) = record?;
        count += 1;
    }
    println!("re-emitted {count} records in deterministic shuffled order");

    fs::remove_dir_all(&work_dir).ok();
    Ok(())
}
