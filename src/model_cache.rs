use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Memoizes loaded models by identifier.
///
/// Each identifier gets one cell; concurrent callers for the same identifier
/// wait on a single load. A failed load leaves the cell empty, so the next
/// caller retries. Entries are never evicted.
pub struct ModelCache<M> {
    cells: Mutex<HashMap<String, Arc<OnceCell<Arc<M>>>>>,
}

impl<M> ModelCache<M> {
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_load<F, Fut, E>(&self, model_id: &str, load: F) -> Result<Arc<M>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<M, E>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry(model_id.to_string()).or_default())
        };

        cell.get_or_try_init(move || async move { load().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Identifiers whose load has completed
    pub async fn loaded(&self) -> Vec<String> {
        let cells = self.cells.lock().await;
        let mut ids: Vec<String> = cells
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_requests_share_one_load() {
        let cache: Arc<ModelCache<String>> = Arc::new(ModelCache::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let loads = Arc::clone(&loads);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_load("model-a", || async {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, anyhow::Error>("weights".to_string())
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut models = Vec::new();
        for handle in handles {
            models.push(handle.await.unwrap());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(models.iter().all(|m| Arc::ptr_eq(m, &models[0])));
        assert_eq!(cache.loaded().await, vec!["model-a".to_string()]);
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let cache: ModelCache<u32> = ModelCache::new();
        let first = cache
            .get_or_load("broken", || async { Err::<u32, _>("no such file") })
            .await;
        assert_eq!(first, Err("no such file"));
        assert!(cache.loaded().await.is_empty());

        let second = cache
            .get_or_load("broken", || async { Ok::<_, &str>(7) })
            .await
            .unwrap();
        assert_eq!(*second, 7);
    }

    #[tokio::test]
    async fn identifiers_are_cached_separately() {
        let cache: ModelCache<&'static str> = ModelCache::new();
        let a = cache.get_or_load("a", || async { Ok::<_, ()>("A") }).await.unwrap();
        let b = cache.get_or_load("b", || async { Ok::<_, ()>("B") }).await.unwrap();
        let again = cache.get_or_load("a", || async { Ok::<_, ()>("other") }).await.unwrap();
        assert_eq!((*a, *b, *again), ("A", "B", "A"));
    }
}
