use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-key async locks. The orchestrator keys them by
/// `{instance_id}:{employee_id}` so a scheduled run and an inbound reply
/// touching the same thread serialize instead of interleaving.
#[derive(Clone, Default)]
pub struct ConversationLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ConversationLocks {
    pub fn pair_key(instance_id: &str, employee_id: &str) -> String {
        format!("{instance_id}:{employee_id}")
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
