use serde::{Deserialize, Serialize};

use crate::{
    action::{Action, Params},
    contract::ActionContract,
};

/// Output of one normalization call. Ephemeral; warnings are data for the
/// orchestrator to log, never logged here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationResult {
    /// Canonicalized parameters.
    pub params: Params,
    /// Non-fatal observations (e.g. a legacy alias shadowed by its
    /// canonical name).
    pub warnings: Vec<String>,
    /// Required keys still absent after aliasing and defaults. Non-empty
    /// means the action must fail closed before reaching any executor.
    pub missing_keys: Vec<String>,
}

impl NormalizationResult {
    /// Whether the action may proceed to routing.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_keys.is_empty()
    }
}

/// Applies a contract to raw action parameters.
///
/// Pure: the same action and contract always produce the same result, and
/// nothing is mutated or logged. Alias substitution runs first (canonical
/// wins when both names are present), then defaults, then the required-key
/// check. A missing contract is reported through `missing_keys`, naming the
/// unknown kind; this function never panics.
#[must_use]
pub fn normalize(action: &Action, contract: Option<&ActionContract>) -> NormalizationResult {
    let Some(contract) = contract else {
        return NormalizationResult {
            params: action.parameters.clone(),
            warnings: Vec::new(),
            missing_keys: vec![format!("contract for kind '{}'", action.kind)],
        };
    };

    let mut params = action.parameters.clone();
    let mut warnings = Vec::new();

    for (legacy, canonical) in &contract.alias_map {
        if params.contains_key(canonical) {
            if params.remove(legacy).is_some() {
                warnings.push(format!(
                    "'{legacy}' and '{canonical}' both supplied for '{}'; canonical '{canonical}' wins",
                    contract.kind
                ));
            }
        } else if let Some(value) = params.remove(legacy) {
            params.insert(canonical.clone(), value);
        }
    }

    for (key, value) in &contract.defaults {
        if !params.contains_key(key) {
            params.insert(key.clone(), value.clone());
        }
    }

    let missing_keys = contract
        .required
        .iter()
        .filter(|key| !params.contains_key(key.as_str()))
        .cloned()
        .collect();

    NormalizationResult {
        params,
        warnings,
        missing_keys,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractTable;
    use serde_json::json;

    fn craft(parameters: serde_json::Value) -> Action {
        let map = parameters
            .as_object()
            .cloned()
            .unwrap_or_default();
        Action::builder("craft_item").params(map).build()
    }

    #[test]
    fn aliases_and_defaults_apply() {
        let table = ContractTable::builtin();
        let action = craft(json!({ "item": "torch" }));
        let result = normalize(&action, table.get("craft_item"));
        assert_eq!(result.params.get("recipe"), Some(&json!("torch")));
        assert_eq!(result.params.get("qty"), Some(&json!(1)));
        assert!(result.params.get("item").is_none());
        assert!(result.missing_keys.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn empty_input_fails_closed() {
        let table = ContractTable::builtin();
        let action = craft(json!({}));
        let result = normalize(&action, table.get("craft_item"));
        assert_eq!(result.missing_keys, vec!["recipe".to_string()]);
        assert!(!result.is_complete());
    }

    #[test]
    fn canonical_wins_over_legacy_with_warning() {
        let table = ContractTable::builtin();
        let action = craft(json!({ "item": "stick", "recipe": "torch" }));
        let result = normalize(&action, table.get("craft_item"));
        assert_eq!(result.params.get("recipe"), Some(&json!("torch")));
        assert!(result.params.get("item").is_none());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn normalization_is_idempotent() {
        let table = ContractTable::builtin();
        let action = craft(json!({ "item": "torch" }));
        let first = normalize(&action, table.get("craft_item"));

        let renormalized = Action::builder("craft_item")
            .params(first.params.clone())
            .build();
        let second = normalize(&renormalized, table.get("craft_item"));
        assert_eq!(first.params, second.params);
        assert!(second.warnings.is_empty());
        assert!(second.missing_keys.is_empty());
    }

    #[test]
    fn unknown_kind_reports_missing_contract() {
        let action = Action::builder("levitate").build();
        let result = normalize(&action, None);
        assert_eq!(
            result.missing_keys,
            vec!["contract for kind 'levitate'".to_string()]
        );
    }

    #[test]
    fn deterministic_for_identical_input() {
        let table = ContractTable::builtin();
        let action = craft(json!({ "item": "torch", "quantity": 4 }));
        let first = normalize(&action, table.get("craft_item"));
        let second = normalize(&action, table.get("craft_item"));
        assert_eq!(first.params, second.params);
        assert_eq!(first.warnings, second.warnings);
        assert_eq!(first.missing_keys, second.missing_keys);
    }
}
