/*
 * Created on Wed Jul 29 2026
 *
 * This file is a part of Skytable
 * Skytable (formerly known as TerrabaseDB or Skybase) is a free and open-source
 * NoSQL database written by Sayan Nandan ("the Author") with the
 * vision to provide flexibility in data modelling without compromising
 * on performance, queryability or scalability.
 *
 * Copyright (c) 2026, Sayan Nandan <ohsayan@outlook.com>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

#![deny(unused_crate_dependencies)]
#![deny(unused_imports)]

mod utils;
mod workload;

use crossbeam_channel::unbounded;
use ctrie::CtrieMap;
use libstress::Workpool;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::env;
use std::sync::{Arc, Barrier};
use std::thread;
use utils::partition_keyspace;
use workload::WorkerReport;

const DEFAULT_TOTAL_KEYS: u64 = 50_000;
const DEFAULT_OPS_PER_WORKER: usize = 20_000;

#[macro_export]
macro_rules! logstress {
    ($stressid:expr, $extra:expr) => {
        log::info!("Stress ({}): {}", $stressid, $extra);
    };
}

fn main() {
    env_logger::Builder::new()
        .parse_filters(&env::var("CTRIE_STRESS_LOG").unwrap_or_else(|_| "info".to_owned()))
        .init();
    warn!("The stress test checks correctness under load and DOES NOT show the true throughput");
    let worker_count = num_cpus::get() * 2;
    info!("This host will drive a maximum of {} workers", worker_count);

    stress_put_if_absent_has_one_winner(worker_count);
    stress_concurrent_disjoint_workload(worker_count);
    stress_snapshot_isolation(worker_count);

    info!("SUCCESS. Stress test complete!");
}

/// Every worker races to `put_if_absent` the same key; exactly one may ever
/// observe it absent, and every loser must see the eventual winner's value.
fn stress_put_if_absent_has_one_winner(worker_count: usize) {
    logstress!("A", "concurrent put_if_absent has exactly one winner");
    let map: Arc<CtrieMap<u64, usize>> = Arc::new(CtrieMap::new());
    let barrier = Arc::new(Barrier::new(worker_count));
    let handles: Vec<_> = (0..worker_count)
        .map(|tid| {
            let map = map.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                map.put_if_absent(1, tid)
            })
        })
        .collect();
    let results: Vec<Option<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_none()).count();
    assert_eq!(winners, 1, "exactly one worker should have observed the key absent");
    let final_value = map.get(&1).expect("key must be present once the race settles");
    for result in &results {
        if let Some(loser_saw) = result {
            assert_eq!(*loser_saw, final_value, "every loser must observe the winner's value");
        }
    }
    assert!(ctrie::introspect::check(&map).is_empty(), "structural invariants broken after the race");
}

struct WorkItem {
    range: utils::KeyRange,
    op_count: usize,
    seed: u64,
}

/// Partitions the keyspace across `worker_count` disjoint ranges and replays
/// a randomized insert/remove/put_if_absent/replace/remove_if workload
/// against each range concurrently, each worker checking itself against a
/// private oracle after every single operation (see [`workload::run_worker`]).
fn stress_concurrent_disjoint_workload(worker_count: usize) {
    logstress!("B", "concurrent disjoint-range workload vs. a per-worker oracle");
    let map: Arc<CtrieMap<u64, u64>> = Arc::new(CtrieMap::new());
    let ranges = partition_keyspace(DEFAULT_TOTAL_KEYS, worker_count);

    let (tx, rx) = unbounded::<WorkerReport>();
    let map_for_pool = map.clone();
    let workpool = Workpool::new(
        worker_count,
        move || map_for_pool.clone(),
        move |map: &mut Arc<CtrieMap<u64, u64>>, item: WorkItem| {
            let rng = StdRng::seed_from_u64(item.seed);
            let report = workload::run_worker(&*map, item.range, item.op_count, rng);
            tx.send(report).unwrap();
        },
        |_| {},
        false,
    );
    for (i, range) in ranges.into_iter().enumerate() {
        workpool.execute(WorkItem {
            range,
            op_count: DEFAULT_OPS_PER_WORKER,
            seed: i as u64 + 1,
        });
    }
    drop(workpool);

    let reports: Vec<WorkerReport> = rx.try_iter().collect();
    assert_eq!(reports.len(), worker_count, "every worker must report back");
    let total_ops: usize = reports.iter().map(|r| r.ops_run).sum();
    info!(
        "workload B: {} workers ran {} ops total, map.len() == {}",
        worker_count,
        total_ops,
        map.len()
    );
    assert!(ctrie::introspect::check(&map).is_empty(), "structural invariants broken after workload B");
}

/// Takes a snapshot mid-flight while other threads keep writing to the live
/// map; the snapshot must never observe a write issued after it was taken.
fn stress_snapshot_isolation(worker_count: usize) {
    logstress!("C", "snapshot isolation under concurrent writers");
    let live: Arc<CtrieMap<u64, u64>> = Arc::new(CtrieMap::new());
    for k in 0..1000 {
        live.insert(k, k);
    }
    let snap = Arc::new(live.snapshot());
    let before: Vec<Option<u64>> = (0..1000).map(|k| snap.get(&k)).collect();

    let handles: Vec<_> = (0..worker_count)
        .map(|tid| {
            let live = live.clone();
            thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(tid as u64 + 100);
                for _ in 0..5000 {
                    let k = rng.gen_range(0..1000);
                    live.insert(k, k + 1_000_000);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for (k, expected) in before.into_iter().enumerate() {
        assert_eq!(
            snap.get(&(k as u64)),
            expected,
            "snapshot observed a write issued after it was taken"
        );
    }
    for k in 0..1000u64 {
        assert!(live.get(&k).unwrap() >= 1_000_000, "live map should reflect the writers' updates");
    }
    assert!(ctrie::introspect::check(&live).is_empty(), "structural invariants broken on the live map");
    assert!(ctrie::introspect::check(&snap).is_empty(), "structural invariants broken on the snapshot");
}
