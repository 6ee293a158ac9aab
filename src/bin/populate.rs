//! Populates a `Table<i32, i32>` with `i -> -i` and verifies every entry.
//!
//! Usage: `populate [COUNT]` (default 500000). Set `RUST_LOG=debug` to see
//! table lifecycle logs.

use chunk_table::Table;
use log::{error, info};
use std::process::ExitCode;

const DEFAULT_COUNT: i32 = 500_000;

fn main() -> ExitCode {
    env_logger::builder().init();

    let count = match std::env::args().nth(1) {
        None => DEFAULT_COUNT,
        Some(arg) => match arg.parse::<i32>() {
            Ok(n) if n >= 0 => n,
            _ => {
                error!("invalid count {:?}: expected a non-negative integer", arg);
                return ExitCode::FAILURE;
            }
        },
    };

    let table: Table<i32, i32> = match Table::new() {
        Ok(table) => table,
        Err(e) => {
            error!("could not create table: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for i in 0..count {
        if let Err(e) = table.set(&i, &-i) {
            error!("set {} failed: {}", i, e);
        }
    }
    info!("load factor {:.1}, {:?}", table.load_factor(), table.chain_stats());

    let mut failures = 0usize;
    for i in 0..count {
        match table.get(&i) {
            None => {
                error!("not found: {}", i);
                failures += 1;
            }
            Some(v) if v != -i => {
                error!("wrong value for {}: {}", i, v);
                failures += 1;
            }
            Some(_) => {}
        }
    }

    println!("{} elements set and found!", count as usize - failures);
    let freed = table.free();
    println!("{} elements freed", freed);

    if failures == 0 && freed == count as usize {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
