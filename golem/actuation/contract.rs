use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::json;

use golem_nav::types::LeasePriority;

/// Reserved parameter prefix carrying dispatch-internal hints (lease holder,
/// priority, scope). Stripped before any capability observes the parameters.
pub const RESERVED_PREFIX: &str = "__dispatch_";

/// Reserved key naming the lease holder for this action.
pub const RESERVED_HOLDER: &str = "__dispatch_holder";
/// Reserved key naming the lease priority label.
pub const RESERVED_PRIORITY: &str = "__dispatch_priority";
/// Reserved key naming the originating task scope.
pub const RESERVED_SCOPE: &str = "__dispatch_scope";

/// How an action kind routes at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Straight to the registered capability.
    Leaf,
    /// Capability, unless a semantic guard defers to the fixed handler.
    Guarded,
    /// Always the fixed in-process handler, regardless of registry state.
    Handler,
}

impl DispatchMode {
    /// Short human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::Guarded => "guarded",
            Self::Handler => "handler",
        }
    }
}

/// Static per-kind schema applied at the dispatch boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionContract {
    /// Action kind this contract matches.
    pub kind: String,
    /// Legacy parameter name to canonical name.
    pub alias_map: IndexMap<String, String>,
    /// Defaults applied for canonical keys absent after aliasing.
    pub defaults: IndexMap<String, serde_json::Value>,
    /// Keys that must be present after defaults.
    pub required: IndexSet<String>,
    /// Routing mode.
    pub dispatch_mode: DispatchMode,
    /// Whether executing this kind drives the shared movement resource and
    /// must therefore hold the navigation lease.
    pub requires_movement: bool,
    /// Lease priority used when no reserved hint overrides it.
    pub lease_priority: LeasePriority,
}

impl ActionContract {
    /// Creates a contract with no aliases, defaults, or required keys.
    #[must_use]
    pub fn new(kind: impl Into<String>, dispatch_mode: DispatchMode) -> Self {
        Self {
            kind: kind.into(),
            alias_map: IndexMap::new(),
            defaults: IndexMap::new(),
            required: IndexSet::new(),
            dispatch_mode,
            requires_movement: false,
            lease_priority: LeasePriority::Normal,
        }
    }

    /// Maps a legacy parameter name to its canonical name.
    #[must_use]
    pub fn with_alias(mut self, legacy: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.alias_map.insert(legacy.into(), canonical.into());
        self
    }

    /// Adds a default for a canonical key.
    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    /// Marks a canonical key required.
    #[must_use]
    pub fn with_required(mut self, key: impl Into<String>) -> Self {
        self.required.insert(key.into());
        self
    }

    /// Marks the kind as movement-driving at the given default priority.
    #[must_use]
    pub fn movement(mut self, priority: LeasePriority) -> Self {
        self.requires_movement = true;
        self.lease_priority = priority;
        self
    }
}

/// Lookup table from action kind to contract. Loaded once at process start;
/// immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct ContractTable {
    contracts: IndexMap<String, ActionContract>,
}

impl ContractTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a contract, replacing any previous one for the kind.
    pub fn insert(&mut self, contract: ActionContract) {
        self.contracts.insert(contract.kind.clone(), contract);
    }

    /// Contract for a kind, if one exists.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&ActionContract> {
        self.contracts.get(kind)
    }

    /// All known kinds, in insertion order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.contracts.keys().map(String::as_str).collect()
    }

    /// The production contract set.
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }
}

static BUILTIN: Lazy<ContractTable> = Lazy::new(|| {
    let mut table = ContractTable::new();

    table.insert(
        ActionContract::new("navigate", DispatchMode::Handler)
            .with_alias("pos", "target")
            .with_alias("destination", "target")
            .with_alias("goal", "target")
            .with_default("arrival_radius", json!(2.0))
            .with_required("target")
            .movement(LeasePriority::Normal),
    );

    table.insert(
        ActionContract::new("explore", DispatchMode::Handler)
            .with_alias("area", "target")
            .with_alias("radius", "distance")
            .with_default("target", json!("frontier"))
            .with_default("distance", json!(32.0))
            .movement(LeasePriority::Normal),
    );

    table.insert(
        ActionContract::new("collect_material", DispatchMode::Guarded)
            .with_alias("resource", "material")
            .with_alias("block", "material")
            .with_default("count", json!(1))
            .with_required("material")
            .movement(LeasePriority::Normal),
    );

    table.insert(
        ActionContract::new("craft_item", DispatchMode::Leaf)
            .with_alias("item", "recipe")
            .with_alias("quantity", "qty")
            .with_default("qty", json!(1))
            .with_required("recipe")
            .movement(LeasePriority::Normal),
    );

    table.insert(
        ActionContract::new("place_block", DispatchMode::Guarded)
            .with_alias("block", "block_type")
            .with_alias("position", "target")
            .with_default("count", json!(1))
            .with_required("block_type")
            .with_required("target")
            .movement(LeasePriority::Normal),
    );

    table.insert(
        ActionContract::new("dig_block", DispatchMode::Leaf)
            .with_alias("position", "target")
            .with_required("target")
            .movement(LeasePriority::Normal),
    );

    table.insert(
        ActionContract::new("use_item", DispatchMode::Leaf)
            .with_alias("item", "item_name")
            .with_required("item_name"),
    );

    table.insert(
        ActionContract::new("smelt_item", DispatchMode::Leaf)
            .with_alias("ore", "input")
            .with_default("count", json!(1))
            .with_required("input"),
    );

    table
});
