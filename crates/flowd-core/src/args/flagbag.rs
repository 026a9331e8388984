//! The flag-bag abstraction the binder validates against. The concrete
//! CLI/HTTP dispatch tree that parses `argv`/JSON into a `FlagBag` is out
//! of scope for the core (spec.md §1); only this trait boundary lives
//! here.

pub trait FlagBag {
    fn get_string(&self, name: &str) -> Option<String>;
    fn get_bool(&self, name: &str) -> Option<bool>;
    fn get_int(&self, name: &str) -> Option<i64>;
    fn get_string_array(&self, name: &str) -> Option<Vec<String>>;
    /// Whether `name` was explicitly provided by the caller (as opposed
    /// to being absent and falling back to a schema default).
    fn provided(&self, name: &str) -> bool;
}

/// An in-memory `FlagBag` used by tests and by callers that have already
/// parsed flags into a simple map (e.g. the HTTP front end decoding a
/// JSON body).
#[derive(Debug, Clone, Default)]
pub struct MapFlagBag {
    strings: std::collections::BTreeMap<String, String>,
    bools: std::collections::BTreeMap<String, bool>,
    ints: std::collections::BTreeMap<String, i64>,
    arrays: std::collections::BTreeMap<String, Vec<String>>,
    provided: std::collections::BTreeSet<String>,
}

impl MapFlagBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.provided.insert(name.clone());
        self.strings.insert(name, value.into());
        self
    }

    pub fn with_bool(mut self, name: impl Into<String>, value: bool) -> Self {
        let name = name.into();
        self.provided.insert(name.clone());
        self.bools.insert(name, value);
        self
    }

    pub fn with_int(mut self, name: impl Into<String>, value: i64) -> Self {
        let name = name.into();
        self.provided.insert(name.clone());
        self.ints.insert(name, value);
        self
    }

    pub fn with_array(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        let name = name.into();
        self.provided.insert(name.clone());
        self.arrays.insert(name, values);
        self
    }
}

impl FlagBag for MapFlagBag {
    fn get_string(&self, name: &str) -> Option<String> {
        self.strings.get(name).cloned()
    }

    fn get_bool(&self, name: &str) -> Option<bool> {
        self.bools.get(name).copied()
    }

    fn get_int(&self, name: &str) -> Option<i64> {
        self.ints.get(name).copied()
    }

    fn get_string_array(&self, name: &str) -> Option<Vec<String>> {
        self.arrays.get(name).cloned()
    }

    fn provided(&self, name: &str) -> bool {
        self.provided.contains(name)
    }
}
