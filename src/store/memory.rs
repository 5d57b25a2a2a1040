use dashmap::DashMap;
use wacore::store::error::Result;
use wacore::store::traits::SessionStorage;

/// Session storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: DashMap<String, String>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).map(|v| v.value().clone()))
    }

    fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_and_remove() {
        let storage = MemorySessionStorage::new();
        assert_eq!(storage.get_item("saved_msgs").unwrap(), None);

        storage.set_item("saved_msgs", "[]".into()).unwrap();
        storage.set_item("saved_msgs", "[{}]".into()).unwrap();
        assert_eq!(storage.get_item("saved_msgs").unwrap().as_deref(), Some("[{}]"));
        assert_eq!(storage.len(), 1);

        storage.remove_item("saved_msgs").unwrap();
        assert!(storage.is_empty());
    }
}
