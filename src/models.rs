// src/models.rs

use bitflags::bitflags;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_true() -> bool {
    true
}

// --- ATTRIBUTE VALUES (project-level inputs) ---

/// A typed project attribute value. Untagged so that profile/project JSON
/// stays human-editable: `true`, `3`, `"2024-05-01"`, `"АБВ-12"`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum AttrValue {
    Flag(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl AttrValue {
    /// Renders the value the way naming formulas and ACL conditions see it.
    /// Dates always format as `yyyy-MM-dd`.
    pub fn display(&self) -> String {
        match self {
            Self::Flag(b) => b.to_string(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

// --- CONTEXT (inherited scope -> value mapping) ---

/// One entry of a generated node's context. Either a flat scalar (a project
/// attribute seeded into the root) or a nested record (a dictionary item or
/// table row contributed by a multiplicity expansion).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ContextValue {
    Record(BTreeMap<String, String>),
    Scalar(String),
}

impl ContextValue {
    /// Builds the standard `{Code, Name}` record for a dictionary item.
    pub fn item(code: &str, name: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert("Code".to_string(), code.to_string());
        map.insert("Name".to_string(), name.to_string());
        Self::Record(map)
    }
}

pub type Context = BTreeMap<String, ContextValue>;

// --- ACCESS CONTROL MODELS ---

bitflags! {
    /// Coarse-grained directory rights, mapped to concrete filesystem
    /// rights by the permission committer.
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AccessRights: u8 {
        const READ = 1;
        const WRITE = 2;
        const MODIFY = 4;
        const FULL_CONTROL = 8;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InheritanceMode {
    #[default]
    Keep,
    /// Break inheritance, copying the inherited entries as explicit ones.
    BreakCopy,
    /// Break inheritance and drop the inherited entries.
    BreakClear,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AclApplyMode {
    /// Add rules, keep whatever else is present.
    #[default]
    Additive,
    /// Make the explicit rule set exactly match the given list.
    Normalize,
    /// Leave permissions alone entirely.
    DoNotTouch,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionOperator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

/// One AND-term of a rule or binding condition, e.g. `Stages.Code == П`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AclCondition {
    /// Dotted attribute path resolved against the node context,
    /// e.g. `Stages.Code`.
    pub attribute_path: String,
    #[serde(default)]
    pub operator: ConditionOperator,
    pub value: String,
}

/// A resolved, flattened access rule as it is committed to a directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AclRule {
    /// `DOMAIN\Name` or a bare account/group name.
    pub identity: String,
    pub rights: AccessRights,
    #[serde(default)]
    pub deny: bool,
    /// Role description, display only.
    #[serde(default)]
    pub competence: String,
    /// Added by the user in the current session. Display only.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub user_added: bool,
    /// Loaded back from the directory on disk. Display only.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_disk: bool,
}

impl AclRule {
    pub fn new(identity: &str, rights: AccessRights, deny: bool) -> Self {
        Self {
            identity: identity.to_string(),
            rights,
            deny,
            competence: String::new(),
            user_added: false,
            from_disk: false,
        }
    }
}

/// A condition-gated rule attached to a structure template node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AclRuleDefinition {
    #[serde(default = "new_id")]
    pub id: String,
    /// AND semantics; an empty list is unconditionally true.
    #[serde(default)]
    pub conditions: Vec<AclCondition>,
    pub principal_identity: String,
    pub rights: AccessRights,
    #[serde(default)]
    pub deny: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// A reusable named rule set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AclTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub inheritance: InheritanceMode,
    #[serde(default)]
    pub rules: Vec<AclRule>,
}

/// Conditionally attaches an ACL template to nodes of a given type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AclBinding {
    pub template_id: String,
    /// `None` means the binding is purely condition-based and applies to
    /// nodes of any type.
    #[serde(default)]
    pub node_type_id: Option<String>,
    #[serde(default)]
    pub conditions: Vec<AclCondition>,
}

// --- SECURITY PRINCIPALS (identity picker data) ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrincipalKind {
    #[default]
    Group,
    User,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SecurityPrincipal {
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: PrincipalKind,
}

impl SecurityPrincipal {
    /// `DOMAIN\Name`, or just the name for local principals.
    pub fn full_name(&self) -> String {
        match &self.domain {
            Some(d) if !d.is_empty() => format!("{}\\{}", d, self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PrincipalCatalog {
    #[serde(default)]
    pub groups: Vec<SecurityPrincipal>,
    #[serde(default)]
    pub users: Vec<SecurityPrincipal>,
}

// --- PROFILE SCHEMA ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeType {
    #[default]
    String,
    Integer,
    Boolean,
    Date,
    Select,
    MultiSelect,
    Table,
}

/// A project-level field definition shown when a project is created.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub field_type: AttributeType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Backing dictionary for `Select`/`MultiSelect` fields.
    #[serde(default)]
    pub dictionary_key: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub is_project_attribute: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DictionaryItem {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DictionarySchema {
    /// Used in formulas and conditions, e.g. `{Stages.Code}`.
    pub key: String,
    pub display_name: String,
    /// Dynamic dictionaries are filled per project (as table rows) instead
    /// of being pre-populated in the profile.
    #[serde(default)]
    pub dynamic: bool,
    #[serde(default)]
    pub items: Vec<DictionaryItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NodeTypeSchema {
    pub type_id: String,
    pub display_name: String,
    #[serde(default)]
    pub default_formula: String,
    /// Template ids applied when nothing more specific matched.
    #[serde(default)]
    pub default_acl_templates: Vec<String>,
}

/// How many concrete nodes one template level expands into.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    #[default]
    Single,
    FromDictionary,
    FromTable,
}

/// One level of the recursive structure template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StructureNodeDefinition {
    #[serde(default = "new_id")]
    pub id: String,
    pub node_type_id: String,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub multiplicity: Multiplicity,
    /// Dictionary or table to draw items from.
    #[serde(default)]
    pub source_key: Option<String>,
    /// Pins a `Single` node to one dictionary item, making it inherit that
    /// item's context as if it were a selected entry.
    #[serde(default)]
    pub selected_item_code: Option<String>,
    #[serde(default)]
    pub naming_formula_override: Option<String>,
    /// Gating expression, e.g. `Stages.Code == П`. Unset or unparseable
    /// means "generate".
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub children: Vec<StructureNodeDefinition>,
    #[serde(default)]
    pub acl_rules: Vec<AclRuleDefinition>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StructureSchema {
    #[serde(default)]
    pub root_nodes: Vec<StructureNodeDefinition>,
}

/// A named, versioned generation profile. Authored externally; the core
/// only reads it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProfileSchema {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "ProfileSchema::default_version")]
    pub version: String,
    #[serde(default)]
    pub default_project_path: Option<String>,
    #[serde(default)]
    pub project_attributes: Vec<FieldSchema>,
    #[serde(default)]
    pub dictionaries: Vec<DictionarySchema>,
    #[serde(default)]
    pub node_types: Vec<NodeTypeSchema>,
    #[serde(default)]
    pub structure: StructureSchema,
    #[serde(default)]
    pub acl_templates: Vec<AclTemplate>,
    #[serde(default)]
    pub acl_bindings: Vec<AclBinding>,
}

impl Default for ProfileSchema {
    fn default() -> Self {
        Self {
            id: new_id(),
            name: String::new(),
            version: Self::default_version(),
            default_project_path: None,
            project_attributes: Vec::new(),
            dictionaries: Vec::new(),
            node_types: Vec::new(),
            structure: StructureSchema::default(),
            acl_templates: Vec::new(),
            acl_bindings: Vec::new(),
        }
    }
}

impl ProfileSchema {
    fn default_version() -> String {
        "1.0".to_string()
    }

    pub fn node_type(&self, type_id: &str) -> Option<&NodeTypeSchema> {
        self.node_types.iter().find(|nt| nt.type_id == type_id)
    }

    pub fn dictionary(&self, key: &str) -> Option<&DictionarySchema> {
        self.dictionaries.iter().find(|d| d.key == key)
    }

    pub fn template(&self, id: &str) -> Option<&AclTemplate> {
        self.acl_templates.iter().find(|t| t.id == id)
    }
}

// --- GENERATED TREE ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeOperation {
    #[default]
    None,
    Create,
    /// Reserved; never emitted by the current diff flow.
    Rename,
    Delete,
    UpdateAcl,
}

/// A concrete node of the generated tree. Built fresh per preview, mutated
/// in place by the diff pass and by user-driven override edits.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeneratedNode {
    #[serde(default)]
    pub node_type_id: String,
    pub name: String,
    pub full_path: PathBuf,
    /// Formula that produced `name`, kept for recomputation.
    #[serde(default)]
    pub name_formula: Option<String>,
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub children: Vec<GeneratedNode>,
    #[serde(default)]
    pub exists: bool,
    #[serde(default)]
    pub operation: NodeOperation,
    /// When false the folder is not created; cascades to all descendants.
    #[serde(default = "default_true")]
    pub included: bool,
    /// Set when the node's permissions were edited after the last apply.
    #[serde(default)]
    pub acl_dirty: bool,
    /// Absolute per-node rules. Non-empty overrides replace every computed
    /// rule for this node.
    #[serde(default)]
    pub acl_overrides: Vec<AclRule>,
    /// Rules the ACL engine resolved for this node, for preview and
    /// execution.
    #[serde(default)]
    pub planned_acl: Vec<AclRule>,
    /// Present on blocking warning nodes (e.g. an empty dictionary level
    /// that downstream ACL conditions depend on).
    #[serde(default)]
    pub validation_error: Option<String>,
    /// Id of the structure definition this node was expanded from.
    #[serde(default)]
    pub definition_id: Option<String>,
}

impl GeneratedNode {
    pub fn new(node_type_id: &str, name: &str, full_path: PathBuf) -> Self {
        Self {
            node_type_id: node_type_id.to_string(),
            name: name.to_string(),
            full_path,
            name_formula: None,
            context: Context::new(),
            children: Vec::new(),
            exists: false,
            operation: NodeOperation::None,
            included: true,
            acl_dirty: false,
            acl_overrides: Vec::new(),
            planned_acl: Vec::new(),
            validation_error: None,
            definition_id: None,
        }
    }

    /// Total node count of this subtree, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }

    pub fn count_by_operation(&self, op: NodeOperation) -> usize {
        let own = usize::from(self.operation == op);
        own + self
            .children
            .iter()
            .map(|c| c.count_by_operation(op))
            .sum::<usize>()
    }

    pub fn has_validation_errors(&self) -> bool {
        self.validation_error.is_some() || self.children.iter().any(Self::has_validation_errors)
    }
}

// --- PROJECT (persistence unit) ---

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProjectState {
    #[serde(default)]
    pub last_generated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub dirty: bool,
}

/// A project instance: attribute values, dictionary selections, table rows,
/// the target root path and the last saved structure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub attribute_values: BTreeMap<String, AttrValue>,
    /// Per-dictionary selected item codes.
    #[serde(default)]
    pub composition_selections: BTreeMap<String, Vec<String>>,
    /// Per-table row data; every row is a column -> value map.
    #[serde(default)]
    pub table_data: BTreeMap<String, Vec<BTreeMap<String, String>>>,
    pub root_path: PathBuf,
    #[serde(default)]
    pub saved_structure: Option<GeneratedNode>,
    #[serde(default)]
    pub state: ProjectState,
}

impl Project {
    pub fn new(name: &str, profile_id: &str, root_path: PathBuf) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            profile_id: profile_id.to_string(),
            attribute_values: BTreeMap::new(),
            composition_selections: BTreeMap::new(),
            table_data: BTreeMap::new(),
            root_path,
            saved_structure: None,
            state: ProjectState::default(),
        }
    }

    /// Selected item codes for a dictionary key, empty when nothing was
    /// selected.
    pub fn selections(&self, key: &str) -> &[String] {
        self.composition_selections
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn rows(&self, key: &str) -> &[BTreeMap<String, String>] {
        self.table_data
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_value_date_formats_iso() {
        let v: AttrValue = serde_json::from_str("\"2024-05-01\"").unwrap();
        assert_eq!(
            v,
            AttrValue::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        );
        assert_eq!(v.display(), "2024-05-01");
    }

    #[test]
    fn attr_value_plain_text_stays_text() {
        let v: AttrValue = serde_json::from_str("\"АБВ-12\"").unwrap();
        assert_eq!(v.display(), "АБВ-12");
    }

    #[test]
    fn attr_value_whole_number_displays_without_fraction() {
        let v: AttrValue = serde_json::from_str("3").unwrap();
        assert_eq!(v.display(), "3");
    }

    #[test]
    fn context_value_roundtrips_untagged() {
        let item = ContextValue::item("П", "Проектная документация");
        let json = serde_json::to_string(&item).unwrap();
        let back: ContextValue = serde_json::from_str(&json).unwrap();
        assert_eq!(item, back);

        let scalar = ContextValue::Scalar("X".into());
        let json = serde_json::to_string(&scalar).unwrap();
        let back: ContextValue = serde_json::from_str(&json).unwrap();
        assert_eq!(scalar, back);
    }

    #[test]
    fn access_rights_combine() {
        let rw = AccessRights::READ | AccessRights::WRITE;
        assert!(rw.contains(AccessRights::READ));
        assert!(!rw.contains(AccessRights::FULL_CONTROL));
    }

    #[test]
    fn principal_full_name_includes_domain() {
        let p = SecurityPrincipal {
            name: "GIP".into(),
            domain: Some("AGK".into()),
            description: String::new(),
            kind: PrincipalKind::Group,
        };
        assert_eq!(p.full_name(), "AGK\\GIP");
    }

    #[test]
    fn profile_deserializes_with_defaults() {
        let profile: ProfileSchema = serde_json::from_str(r#"{"name": "Test"}"#).unwrap();
        assert_eq!(profile.name, "Test");
        assert_eq!(profile.version, "1.0");
        assert!(profile.structure.root_nodes.is_empty());
    }
}
