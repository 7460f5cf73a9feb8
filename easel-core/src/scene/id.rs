//! # Object IDs
//! Every object in a scene carries an opaque string id, unique within that scene and never changed
//! once assigned. Stored templates come with their own ids in whatever format their author used, so
//! the id is kept as a string rather than a number.

/// Length of freshly generated ids.
const FRESH_LEN: usize = 8;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);
impl ObjectId {
    /// A new random id. Uniqueness within a scene is the caller's job, see
    /// [`Scene::unique_id`](super::Scene::unique_id).
    #[must_use]
    pub fn fresh() -> Self {
        let mut simple = uuid::Uuid::new_v4().simple().to_string();
        simple.truncate(FRESH_LEN);
        Self(simple)
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl PartialEq<str> for ObjectId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
