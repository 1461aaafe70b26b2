//! Project persistence abstraction.

use crate::error::{SceneError, SceneResult};
use crate::serialize::ProjectFile;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use uuid::Uuid;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Trait for project storage backends.
///
/// Implementations can keep projects in memory, on the filesystem, or
/// behind a remote API. Documents are stored in their persisted form, so
/// backends never need to know about live scene graphs.
pub trait ProjectStore: Send + Sync {
    /// Load a project document.
    fn fetch(&self, id: &str) -> BoxFuture<'_, SceneResult<ProjectFile>>;

    /// Store a new project document under a generated id.
    fn create(&self, file: &ProjectFile) -> BoxFuture<'_, SceneResult<String>>;

    /// Overwrite an existing project document.
    fn update(&self, id: &str, file: &ProjectFile) -> BoxFuture<'_, SceneResult<()>>;

    /// Delete a project document.
    fn delete(&self, id: &str) -> BoxFuture<'_, SceneResult<()>>;

    /// Copy a stored document under a new id, returning the new id.
    fn duplicate(&self, id: &str) -> BoxFuture<'_, SceneResult<String>>;

    /// List ids and names of all stored projects.
    fn list(&self) -> BoxFuture<'_, SceneResult<Vec<(String, String)>>>;
}

/// In-memory store for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<String, ProjectFile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> SceneError {
    SceneError::Store(format!("lock error: {e}"))
}

impl ProjectStore for MemoryStore {
    fn fetch(&self, id: &str) -> BoxFuture<'_, SceneResult<ProjectFile>> {
        let id = id.to_string();
        Box::pin(async move {
            let projects = self.projects.read().map_err(lock_err)?;
            projects
                .get(&id)
                .cloned()
                .ok_or(SceneError::NotFound(id))
        })
    }

    fn create(&self, file: &ProjectFile) -> BoxFuture<'_, SceneResult<String>> {
        let file = file.clone();
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            let mut projects = self.projects.write().map_err(lock_err)?;
            projects.insert(id.clone(), file);
            Ok(id)
        })
    }

    fn update(&self, id: &str, file: &ProjectFile) -> BoxFuture<'_, SceneResult<()>> {
        let id = id.to_string();
        let file = file.clone();
        Box::pin(async move {
            let mut projects = self.projects.write().map_err(lock_err)?;
            if !projects.contains_key(&id) {
                return Err(SceneError::NotFound(id));
            }
            projects.insert(id, file);
            Ok(())
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, SceneResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut projects = self.projects.write().map_err(lock_err)?;
            projects
                .remove(&id)
                .map(|_| ())
                .ok_or(SceneError::NotFound(id))
        })
    }

    fn duplicate(&self, id: &str) -> BoxFuture<'_, SceneResult<String>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut projects = self.projects.write().map_err(lock_err)?;
            let mut file = projects
                .get(&id)
                .cloned()
                .ok_or(SceneError::NotFound(id))?;
            file.name = format!("{} copy", file.name);
            let new_id = Uuid::new_v4().to_string();
            projects.insert(new_id.clone(), file);
            Ok(new_id)
        })
    }

    fn list(&self) -> BoxFuture<'_, SceneResult<Vec<(String, String)>>> {
        Box::pin(async move {
            let projects = self.projects.read().map_err(lock_err)?;
            Ok(projects
                .iter()
                .map(|(id, file)| (id.clone(), file.name.clone()))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        // Simple blocking executor for tests
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {}
            }
        }
    }

    fn sample_file(name: &str) -> ProjectFile {
        Project::new(name).to_file()
    }

    #[test]
    fn create_and_fetch() {
        let store = MemoryStore::new();
        let file = sample_file("flow");

        let id = block_on(store.create(&file)).unwrap();
        let fetched = block_on(store.fetch(&id)).unwrap();

        assert_eq!(fetched, file);
    }

    #[test]
    fn fetch_unknown_is_not_found() {
        let store = MemoryStore::new();
        let result = block_on(store.fetch("nonexistent"));

        assert!(matches!(result, Err(SceneError::NotFound(_))));
    }

    #[test]
    fn update_requires_existing() {
        let store = MemoryStore::new();
        let file = sample_file("flow");

        assert!(block_on(store.update("missing", &file)).is_err());

        let id = block_on(store.create(&file)).unwrap();
        let mut renamed = file.clone();
        renamed.name = "renamed".to_string();
        block_on(store.update(&id, &renamed)).unwrap();

        assert_eq!(block_on(store.fetch(&id)).unwrap().name, "renamed");
    }

    #[test]
    fn duplicate_copies_under_new_id() {
        let store = MemoryStore::new();
        let id = block_on(store.create(&sample_file("flow"))).unwrap();

        let copy_id = block_on(store.duplicate(&id)).unwrap();
        assert_ne!(copy_id, id);

        let copy = block_on(store.fetch(&copy_id)).unwrap();
        assert_eq!(copy.name, "flow copy");
        assert_eq!(block_on(store.list()).unwrap().len(), 2);
    }

    #[test]
    fn delete_removes() {
        let store = MemoryStore::new();
        let id = block_on(store.create(&sample_file("flow"))).unwrap();

        block_on(store.delete(&id)).unwrap();
        assert!(block_on(store.fetch(&id)).is_err());
        assert!(block_on(store.delete(&id)).is_err());
    }
}
