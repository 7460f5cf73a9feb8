//! # Scene
//!
//! The ordered list of objects on a surface, bottom of the z-order first. The first object is the
//! background rectangle and an optional watermark sits on top of everything else.
//!
//! A scene round-trips through the persisted JSON description, `{"objects": [..]}`. That same
//! text is what history entries and the published `jsonLayers` fact are made of, so its
//! formatting must be deterministic.

pub mod id;
pub mod object;
pub mod paint;
pub mod transform;

pub use id::ObjectId;
pub use object::{ColorRole, DrawableObject, Interactivity, ObjectKind, Tags, TextBody};
pub use paint::{ColorStop, Gradient, GradientKind, Paint};
pub use transform::{Matrix, OriginX, OriginY, Placement};

#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    #[error("malformed scene description: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no object with id {0}")]
    NotFound(ObjectId),
}

#[derive(Clone, PartialEq, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub objects: Vec<DrawableObject>,
}

impl Scene {
    #[must_use]
    pub fn new(objects: Vec<DrawableObject>) -> Self {
        let mut scene = Self { objects };
        scene.assign_missing_ids();
        scene
    }
    /// Parse a persisted description. Objects that come without an id get a fresh one.
    pub fn from_json(description: &str) -> Result<Self, SceneError> {
        let mut scene: Self = serde_json::from_str(description)?;
        scene.assign_missing_ids();
        Ok(scene)
    }
    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string(self)?)
    }
    /// Serialize only the top-level objects for which `keep` holds.
    pub fn describe_filtered(
        &self,
        keep: impl Fn(&DrawableObject) -> bool,
    ) -> Result<String, SceneError> {
        #[derive(serde::Serialize)]
        struct Filtered<'a> {
            objects: Vec<&'a DrawableObject>,
        }
        let filtered = Filtered {
            objects: self.objects.iter().filter(|object| keep(object)).collect(),
        };
        Ok(serde_json::to_string(&filtered)?)
    }

    fn assign_missing_ids(&mut self) {
        let mut missing = 0usize;
        self.visit(&mut |object| {
            if object.id().is_none() {
                missing += 1;
            }
        });
        if missing == 0 {
            return;
        }
        log::debug!("assigning ids to {missing} objects");
        let mut fresh: Vec<ObjectId> = Vec::with_capacity(missing);
        for _ in 0..missing {
            let id = self.unique_id_excluding(&fresh);
            fresh.push(id);
        }
        let mut fresh = fresh.into_iter();
        self.visit_mut(&mut |object| {
            if object.tags.id.is_none() {
                object.tags.id = fresh.next();
            }
        });
    }

    /// An id no object in the scene (at any depth) carries.
    #[must_use]
    pub fn unique_id(&self) -> ObjectId {
        self.unique_id_excluding(&[])
    }
    fn unique_id_excluding(&self, reserved: &[ObjectId]) -> ObjectId {
        loop {
            let id = ObjectId::fresh();
            if !reserved.contains(&id) && self.find_by_id(&id).is_none() {
                return id;
            }
        }
    }

    /// Depth-first over every object, groups before their children.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a DrawableObject)) {
        for object in &self.objects {
            object.visit(f);
        }
    }
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut DrawableObject)) {
        for object in &mut self.objects {
            object.visit_mut(f);
        }
    }
    #[must_use]
    pub fn find(&self, predicate: impl Fn(&DrawableObject) -> bool) -> Option<&DrawableObject> {
        self.objects
            .iter()
            .find_map(|object| object.find(&predicate))
    }
    pub fn find_mut(
        &mut self,
        predicate: impl Fn(&DrawableObject) -> bool,
    ) -> Option<&mut DrawableObject> {
        self.objects
            .iter_mut()
            .find_map(|object| object.find_mut(&predicate))
    }
    /// Search at any depth.
    #[must_use]
    pub fn find_by_id(&self, id: &ObjectId) -> Option<&DrawableObject> {
        self.find(|object| object.id() == Some(id))
    }
    pub fn find_by_id_mut(&mut self, id: &ObjectId) -> Option<&mut DrawableObject> {
        self.find_mut(|object| object.id() == Some(id))
    }
    /// Search at any depth.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&DrawableObject> {
        self.find(|object| object.has_name(name))
    }
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut DrawableObject> {
        self.find_mut(|object| object.has_name(name))
    }
    /// Top-level index of the object with this id.
    #[must_use]
    pub fn position(&self, id: &ObjectId) -> Option<usize> {
        self.objects.iter().position(|object| object.id() == Some(id))
    }
    /// Top-level index of the first object with this role name.
    #[must_use]
    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.objects.iter().position(|object| object.has_name(name))
    }

    pub fn add(&mut self, object: DrawableObject) {
        self.objects.push(object);
    }
    /// Insert at `index`, clamped to the end.
    pub fn insert_at(&mut self, index: usize, object: DrawableObject) {
        let index = index.min(self.objects.len());
        self.objects.insert(index, object);
    }
    /// Remove a top-level object.
    pub fn remove(&mut self, id: &ObjectId) -> Result<DrawableObject, SceneError> {
        let index = self
            .position(id)
            .ok_or_else(|| SceneError::NotFound(id.clone()))?;
        Ok(self.objects.remove(index))
    }
    pub fn bring_to_front(&mut self, id: &ObjectId) -> Result<(), SceneError> {
        let object = self.remove(id)?;
        self.objects.push(object);
        Ok(())
    }
    pub fn send_to_back(&mut self, id: &ObjectId) -> Result<(), SceneError> {
        let object = self.remove(id)?;
        self.objects.insert(0, object);
        Ok(())
    }

    /// The background object, if the scene has one in first position.
    #[must_use]
    pub fn background(&self, role: &str) -> Option<&DrawableObject> {
        self.objects.first().filter(|object| object.has_name(role))
    }
    pub fn background_mut(&mut self, role: &str) -> Option<&mut DrawableObject> {
        self.objects.first_mut().filter(|object| object.has_name(role))
    }
    /// Move the object named `role` to the bottom of the z-order. Returns whether one exists.
    pub fn ensure_background_first(&mut self, role: &str) -> bool {
        match self.position_by_name(role) {
            Some(0) => true,
            Some(index) => {
                let background = self.objects.remove(index);
                self.objects.insert(0, background);
                true
            }
            None => false,
        }
    }
    /// Move the object named `role` to the top of the z-order, if it isn't already.
    pub fn ensure_on_top(&mut self, role: &str) {
        if let Some(index) = self.position_by_name(role) {
            if index + 1 != self.objects.len() {
                let object = self.objects.remove(index);
                self.objects.push(object);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{DrawableObject, ObjectId, Scene};

    #[test]
    fn missing_ids_are_assigned_uniquely() {
        let scene = Scene::from_json(
            r#"{"objects":[
                {"type":"rect","name":"bgRect","id":"bg","width":100,"height":100},
                {"type":"group","objects":[{"type":"circle","radius":4},{"type":"triangle","id":"t"}]},
                {"type":"line","x2":10}
            ]}"#,
        )
        .unwrap();
        let mut ids = Vec::new();
        scene.visit(&mut |object| ids.push(object.id().cloned().unwrap()));
        assert_eq!(ids.len(), 5);
        assert_eq!(ids[0], ObjectId::from("bg"));
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }
    #[test]
    fn malformed_is_an_error() {
        assert!(Scene::from_json("{\"objects\": [{\"type\": \"blob\"}]}").is_err());
        assert!(Scene::from_json("not json").is_err());
    }
    #[test]
    fn z_order_moves() {
        let mut scene = Scene::new(vec![
            DrawableObject::rect(1.0, 1.0).with_id("a"),
            DrawableObject::rect(1.0, 1.0).with_id("bg").named("bgRect"),
            DrawableObject::rect(1.0, 1.0).with_id("wm").named("watermark"),
            DrawableObject::rect(1.0, 1.0).with_id("c"),
        ]);
        assert!(scene.background("bgRect").is_none());
        assert!(scene.ensure_background_first("bgRect"));
        assert!(scene.background("bgRect").is_some());
        scene.ensure_on_top("watermark");
        let order: Vec<_> = scene
            .objects
            .iter()
            .map(|o| o.id().unwrap().to_string())
            .collect();
        assert_eq!(order, ["bg", "a", "c", "wm"]);
        scene.send_to_back(&ObjectId::from("c")).unwrap();
        assert_eq!(scene.position(&ObjectId::from("c")), Some(0));
        assert!(scene.remove(&ObjectId::from("nope")).is_err());
    }
    #[test]
    fn filtered_description_drops_objects() {
        let mut hidden = DrawableObject::rect(1.0, 1.0).with_id("wm");
        hidden.tags.exclude_from_history = true;
        let scene = Scene::new(vec![DrawableObject::rect(1.0, 1.0).with_id("a"), hidden]);
        let text = scene
            .describe_filtered(|o| !o.tags.exclude_from_history)
            .unwrap();
        let back = Scene::from_json(&text).unwrap();
        assert_eq!(back.objects.len(), 1);
        assert_eq!(back.to_json().unwrap(), text);
    }
}
