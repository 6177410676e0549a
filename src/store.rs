use crate::log::{Error, ErrorKind};
use serde::Serialize;
use serde_json::{to_value, Map, Value};

/// Builds an object model that templates can be rendered against.
///
/// # Examples
///
/// ```
/// use vellum::{compile, render, Store};
///
/// let model = Store::new()
///     .with_must("name", "AB")
///     .with_must("tags", vec!["x", "y"]);
///
/// let template = compile("page", "{{ lowercase name }}: {{ tags }}").unwrap();
/// assert_eq!(render(&template, &model.into()).unwrap(), "ab: [x, y]");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Store {
    data: Map<String, Value>,
}

impl Store {
    /// Create a new Store.
    #[inline]
    pub fn new() -> Self {
        Self { data: Map::new() }
    }

    /// Insert the value into the Store.
    ///
    /// # Errors
    ///
    /// Returns an error if the serialization fails.
    pub fn insert<S, T>(&mut self, key: S, value: T) -> Result<(), Error>
    where
        S: Into<String>,
        T: Serialize,
    {
        let key = key.into();
        let value = to_value(value).map_err(|e| {
            Error::build(ErrorKind::Render)
                .with_reason(format!("value for `{key}` is unserializable"))
                .with_help(e.to_string())
        })?;

        self.data.insert(key, value);
        Ok(())
    }

    /// Insert the value into the Store.
    ///
    /// # Panics
    ///
    /// Will panic if the serialization fails.
    #[inline]
    pub fn insert_must<S, T>(&mut self, key: S, value: T)
    where
        S: Into<String>,
        T: Serialize,
    {
        if let Err(error) = self.insert(key, value) {
            panic!("{error}");
        }
    }

    /// Insert the value into the Store.
    ///
    /// Returns the Store, so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// Returns an error if the serialization fails.
    pub fn with<S, T>(mut self, key: S, value: T) -> Result<Self, Error>
    where
        S: Into<String>,
        T: Serialize,
    {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Insert the value into the Store.
    ///
    /// Returns the Store, so additional methods may be chained.
    ///
    /// # Panics
    ///
    /// Will panic if the serialization fails.
    #[inline]
    pub fn with_must<S, T>(mut self, key: S, value: T) -> Self
    where
        S: Into<String>,
        T: Serialize,
    {
        self.insert_must(key, value);
        self
    }

    /// Get the value of the given key, if any.
    #[inline]
    pub fn get(&self, index: &str) -> Option<&Value> {
        self.data.get(index)
    }

    /// Return the model as a [`Value`].
    #[inline]
    pub fn into_value(self) -> Value {
        Value::Object(self.data)
    }
}

impl From<Store> for Value {
    fn from(store: Store) -> Self {
        store.into_value()
    }
}
