//! Per-call view of a resource instance's state

use po_common::AttrValue;

/// Prior and planned state of one resource instance, plus what a handler observed
///
/// An empty id means the instance does not exist; [`ResourceData::into_state`]
/// then yields a null state, which removes the instance from Terraform state.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: String,
    prior: AttrValue,
    planned: AttrValue,
    observed: AttrValue,
}

fn id_of(state: &AttrValue) -> String {
    state
        .get("id")
        .and_then(AttrValue::as_str)
        .unwrap_or_default()
        .to_string()
}

impl ResourceData {
    /// Data for an instance with the given id
    pub fn new(id: impl Into<String>, prior: AttrValue, planned: AttrValue) -> Self {
        Self {
            id: id.into(),
            prior,
            planned,
            observed: AttrValue::Null,
        }
    }

    /// Data for creating a new instance from its planned state
    pub fn for_create(planned: AttrValue) -> Self {
        Self::new("", AttrValue::Null, planned)
    }

    /// Data for refreshing or deleting an instance from its current state
    pub fn for_read(state: AttrValue) -> Self {
        Self::new(id_of(&state), state.clone(), state)
    }

    /// Data for updating an instance in place
    pub fn for_update(prior: AttrValue, planned: AttrValue) -> Self {
        Self::new(id_of(&prior), prior, planned)
    }

    /// Id of the instance (`namespace/name`); empty when absent
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record the id of a newly created instance
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Forget the instance
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// State before this call
    pub fn prior(&self) -> &AttrValue {
        &self.prior
    }

    /// State this call should converge to
    pub fn planned(&self) -> &AttrValue {
        &self.planned
    }

    /// Value observed state is aligned with: the plan, or prior state when
    /// there is none
    pub fn reference(&self) -> &AttrValue {
        if self.planned.is_null() {
            &self.prior
        } else {
            &self.planned
        }
    }

    /// Whether a top-level attribute or block differs between prior and plan
    pub fn has_change(&self, key: &str) -> bool {
        self.prior.get(key) != self.planned.get(key)
    }

    /// Record the state read back from the cluster
    pub fn set_observed(&mut self, observed: AttrValue) {
        self.observed = observed;
    }

    /// Final state to hand back to Terraform
    ///
    /// Without an observed state the plan is used, with values still unknown
    /// set to null.
    pub fn into_state(self) -> AttrValue {
        if self.id.is_empty() {
            return AttrValue::Null;
        }
        let mut state = if self.observed.is_null() {
            self.planned.unknowns_to_null()
        } else {
            self.observed
        };
        state.insert("id", self.id);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn read_takes_id_from_state() {
        let state = AttrValue::from(json!({"id": "monitoring/main", "spec": [{"replicas": 3}]}));
        let data = ResourceData::for_read(state.clone());
        assert_eq!(data.id(), "monitoring/main");
        assert_eq!(data.reference(), &state);
        assert!(!data.has_change("spec"));
    }

    #[test]
    fn detects_block_changes() {
        let prior = AttrValue::from(json!({"id": "monitoring/main", "spec": [{"replicas": 3}]}));
        let planned = AttrValue::from(json!({"id": "monitoring/main", "spec": [{"replicas": 5}]}));
        let data = ResourceData::for_update(prior, planned);
        assert!(data.has_change("spec"));
        assert!(!data.has_change("metadata"));
    }

    #[test]
    fn cleared_id_yields_null_state() {
        let mut data = ResourceData::for_read(AttrValue::from(json!({"id": "monitoring/main"})));
        data.clear_id();
        assert!(data.into_state().is_null());
    }

    #[test]
    fn observed_state_carries_id() {
        let mut data = ResourceData::for_create(AttrValue::from(json!({"spec": [{}]})));
        data.set_id("default/rules");
        data.set_observed(AttrValue::from(json!({"spec": [{"groups": []}]})));
        assert_eq!(
            data.into_state(),
            AttrValue::from(json!({"id": "default/rules", "spec": [{"groups": []}]}))
        );
    }

    #[test]
    fn unobserved_state_falls_back_to_known_plan() {
        let mut planned = AttrValue::from(json!({"spec": [{"replicas": 2}]}));
        planned.insert("id", AttrValue::Unknown);
        planned.insert("metadata", AttrValue::from(vec![AttrValue::from(json!({"name": "main"}))]));
        if let Some(AttrValue::List(items)) = planned.get_mut("metadata") {
            items[0].insert("uid", AttrValue::Unknown);
        }

        let mut data = ResourceData::for_create(planned);
        data.set_id("monitoring/main");
        assert_eq!(
            data.into_state(),
            AttrValue::from(json!({
                "id": "monitoring/main",
                "metadata": [{"name": "main", "uid": null}],
                "spec": [{"replicas": 2}],
            }))
        );
    }
}
