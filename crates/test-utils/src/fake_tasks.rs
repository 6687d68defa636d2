use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use assetpipe::task::TaskRegistry;

/// Shared, ordered record of which fake tasks ran.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Registry of tasks that only record their own name into a shared log.
/// Tasks named in `failing` return an error after recording.
pub fn recording_registry(names: &[&str], failing: &[&str]) -> (TaskRegistry, CallLog) {
    let log: CallLog = Arc::default();
    let failing: HashSet<String> = failing.iter().map(|s| s.to_string()).collect();
    let mut registry = TaskRegistry::new();

    for &name in names {
        let log = Arc::clone(&log);
        let owned = name.to_string();
        let fails = failing.contains(name);
        registry
            .register_fn(name, move |_| {
                log.lock().unwrap().push(owned.clone());
                if fails {
                    Err(anyhow!("{owned} failed on purpose"))
                } else {
                    Ok(())
                }
            })
            .expect("unique fake task names");
    }

    (registry, log)
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}
