//! Governed label and trigger annotation.
//!
//! A pod opts in by carrying the trigger annotation (any value). Opted-in pods
//! must carry the governed label with their own name as the value; all other
//! pods must not carry it at all.

use std::collections::BTreeMap;

/// Annotation whose presence requests the pod-name label.
pub const ADD_POD_NAME_LABEL_ANNOTATION: &str = "padok.fr/add-pod-name-label";

/// Label maintained by this controller. Value is always the pod name.
pub const POD_NAME_LABEL: &str = "padok.fr/pod-name";

/// Desired value of the governed label for a pod with these annotations.
///
/// `Some(name)` when the trigger annotation is present, whatever its value.
/// `None` means the label must be absent. A missing or empty annotation map
/// is the same as the annotation being absent.
pub fn desired_label_value(
    annotations: Option<&BTreeMap<String, String>>,
    name: &str,
) -> Option<String> {
    annotations
        .is_some_and(|a| a.contains_key(ADD_POD_NAME_LABEL_ANNOTATION))
        .then(|| name.to_string())
}

/// Minimal change to bring the governed label to its desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelAction {
    /// Already converged
    None,
    /// Add the label, or overwrite a wrong value
    Set(String),
    /// Drop the label
    Remove,
}

impl LabelAction {
    /// Apply to a label map, touching only the governed key.
    pub fn apply(&self, labels: &mut Option<BTreeMap<String, String>>) {
        match self {
            Self::None => {}
            Self::Set(value) => {
                labels
                    .get_or_insert_with(BTreeMap::new)
                    .insert(POD_NAME_LABEL.to_string(), value.clone());
            }
            Self::Remove => {
                if let Some(labels) = labels.as_mut() {
                    labels.remove(POD_NAME_LABEL);
                }
            }
        }
    }
}

/// Compare current labels against the desired value.
pub fn label_action(
    labels: Option<&BTreeMap<String, String>>,
    desired: Option<&str>,
) -> LabelAction {
    let current = labels.and_then(|l| l.get(POD_NAME_LABEL)).map(String::as_str);
    match (desired, current) {
        (Some(want), Some(have)) if want == have => LabelAction::None,
        (Some(want), _) => LabelAction::Set(want.to_string()),
        (None, None) => LabelAction::None,
        (None, Some(_)) => LabelAction::Remove,
    }
}
