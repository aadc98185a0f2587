use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{CoreError, ResourceRepository, UrlResource};

/// Simple in-memory repository for tests. Not thread-safe for high
/// concurrency beyond the internal mutex guarding the map.
pub struct InMemoryRepo {
    inner: Mutex<Inner>,
}

struct Inner {
    records: BTreeMap<u64, UrlResource>,
    next_id: u64,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRepository for InMemoryRepo {
    fn get(&self, id: u64) -> Result<Option<UrlResource>, CoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(inner.records.get(&id).cloned())
    }

    fn insert(&self, mut resource: UrlResource) -> Result<u64, CoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        let id = inner.next_id;
        inner.next_id += 1;
        resource.id = id;
        inner.records.insert(id, resource);
        Ok(id)
    }

    fn update(&self, resource: &UrlResource) -> Result<(), CoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        if !inner.records.contains_key(&resource.id) {
            return Err(CoreError::NotFound);
        }
        inner.records.insert(resource.id, resource.clone());
        Ok(())
    }

    fn delete(&self, id: u64) -> Result<(), CoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        match inner.records.remove(&id) {
            Some(_) => Ok(()),
            None => Err(CoreError::NotFound),
        }
    }

    fn list_by_course(&self, course: u64) -> Result<Vec<UrlResource>, CoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(inner
            .records
            .values()
            .filter(|r| r.course == course)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DisplayMode, DisplayOptions};

    fn mk_resource(course: u64) -> UrlResource {
        UrlResource {
            id: 0,
            course,
            name: "r".into(),
            intro: String::new(),
            external_url: "http://example.com".into(),
            display: DisplayMode::Auto,
            display_options: DisplayOptions::default(),
            parameters: BTreeMap::new(),
            time_open: 0,
            time_close: 0,
            time_modified: 0,
        }
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let repo = InMemoryRepo::new();
        let a = repo.insert(mk_resource(1)).unwrap();
        let b = repo.insert(mk_resource(1)).unwrap();
        assert!(b > a);
        let got = repo.get(a).unwrap().expect("present");
        assert_eq!(got.id, a);
    }

    #[test]
    fn update_missing_is_not_found() {
        let repo = InMemoryRepo::new();
        let mut r = mk_resource(1);
        r.id = 42;
        assert!(matches!(repo.update(&r), Err(CoreError::NotFound)));
    }

    #[test]
    fn delete_removes() {
        let repo = InMemoryRepo::new();
        let id = repo.insert(mk_resource(1)).unwrap();
        repo.delete(id).unwrap();
        assert!(repo.get(id).unwrap().is_none());
        assert!(matches!(repo.delete(id), Err(CoreError::NotFound)));
    }

    #[test]
    fn list_filters_by_course() {
        let repo = InMemoryRepo::new();
        repo.insert(mk_resource(1)).unwrap();
        repo.insert(mk_resource(1)).unwrap();
        repo.insert(mk_resource(2)).unwrap();
        assert_eq!(repo.list_by_course(1).unwrap().len(), 2);
        assert_eq!(repo.list_by_course(2).unwrap().len(), 1);
        assert!(repo.list_by_course(3).unwrap().is_empty());
    }
}
