//! Labeled object records managed by the instance registry.

/// A labeled scene object tracked by the [`InstanceRegistry`](super::InstanceRegistry).
///
/// Each object is assigned exactly one instance id for its entire lifetime.
/// The id is never reassigned to another object, even after the object is
/// unregistered. Labels are ordered: when matching against a label
/// configuration, the first label with a configured entry wins.
#[derive(Debug, Clone)]
pub struct LabeledObject {
    instance_id: u32,
    /// Ordered labels describing this object.
    pub labels: Vec<String>,
    /// Disabled objects are cleared from (rather than set up in) ground
    /// truth generators when registered.
    pub enabled: bool,
}

impl LabeledObject {
    pub(crate) fn new(instance_id: u32, labels: Vec<String>) -> Self {
        Self {
            instance_id,
            labels,
            enabled: true,
        }
    }

    /// The stable instance id assigned at creation.
    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }
}
