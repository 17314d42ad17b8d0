// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue configuration persistence: one `<name>.mqq` file per queue
//! under `config/queues/` (§6). The top-level `"type"` field names the
//! queue type and is what a hand-factory would dispatch on if this
//! crate ever needed to read partially-typed queue JSON; today
//! [`mq_core::Queue`] already carries the tag via `#[serde(tag =
//! "type")]`-free plain struct with an explicit `queue_type` field, so
//! loading is a single `serde_json` deserialize.

use crate::atomic::write_json_atomic;
use crate::error::StorageError;
use crate::paths;
use mq_core::Queue;
use std::path::Path;

pub fn save_queue(base: &Path, queue: &Queue) -> Result<(), StorageError> {
    write_json_atomic(&paths::queue_config_path(base, &queue.name), queue)
}

pub fn delete_queue(base: &Path, name: &str) -> std::io::Result<()> {
    let path = paths::queue_config_path(base, name);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Load every `*.mqq` file under `config/queues/`. A malformed file is
/// skipped and counted, the same tolerance `job_store::load_from_disk`
/// gives damaged job records.
pub fn load_all_queues(base: &Path) -> (Vec<Queue>, usize) {
    let dir = paths::queues_dir(base);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(_) => return (Vec::new(), 0),
    };

    let mut queues = Vec::new();
    let mut skipped = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(paths::QUEUE_CONFIG_EXTENSION) {
            continue;
        }
        match crate::atomic::read_json::<Queue>(&path) {
            Ok(queue) => queues.push(queue),
            Err(_) => skipped += 1,
        }
    }
    (queues, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mq_core::QueueType;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_all_round_trips() {
        let dir = tempdir().unwrap();
        let queue = Queue::new_local("local");
        save_queue(dir.path(), &queue).unwrap();

        let (queues, skipped) = load_all_queues(dir.path());
        assert_eq!(skipped, 0);
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0].name, "local");
        assert_eq!(queues[0].queue_type, QueueType::Local);
    }

    #[test]
    fn non_mqq_files_are_ignored() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(paths::queues_dir(dir.path())).unwrap();
        std::fs::write(paths::queues_dir(dir.path()).join("README.txt"), b"hi").unwrap();

        let (queues, skipped) = load_all_queues(dir.path());
        assert!(queues.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn delete_queue_removes_file() {
        let dir = tempdir().unwrap();
        let queue = Queue::new_local("gone");
        save_queue(dir.path(), &queue).unwrap();
        delete_queue(dir.path(), "gone").unwrap();
        let (queues, _) = load_all_queues(dir.path());
        assert!(queues.is_empty());
    }
}
