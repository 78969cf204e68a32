// src/core/generator.rs
//
// Expands the profile's recursive structure template into a concrete
// `GeneratedNode` tree for one project. Multiplicity levels multiply:
// a dictionary level nested inside another dictionary level yields one
// node per combination of selected items, because every child inherits
// its parent's full context and adds its own item on top.

use crate::constants::DEFAULT_ROOT_FORMULA;
use crate::core::{acl_engine, conditions, naming};
use crate::models::{
    Context, ContextValue, GeneratedNode, Multiplicity, ProfileSchema, Project,
    StructureNodeDefinition,
};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Stale placeholder formulas written by old profile editors; treated the
/// same as "no override".
const LEGACY_PLACEHOLDERS: &[&str] = &["New Child", "New Folder"];

/// Generates the full preview tree for `project`. Pure with respect to the
/// filesystem; the planner reconciles the result against disk afterwards.
pub fn generate(project: &Project, profile: &ProfileSchema) -> GeneratedNode {
    let root_def = profile
        .structure
        .root_nodes
        .iter()
        .find(|def| def.is_root)
        .or_else(|| profile.structure.root_nodes.first());

    let formula = root_def
        .map(|def| effective_formula(def, profile))
        .unwrap_or_else(|| DEFAULT_ROOT_FORMULA.to_string());

    // The root context carries every project attribute as a flat scalar,
    // so formulas can write either {ProjectCode} or {Project.ProjectCode}.
    let mut context = Context::new();
    for (key, value) in &project.attribute_values {
        context.insert(key.clone(), ContextValue::Scalar(value.display()));
    }

    let mut name = naming::resolve_formula(&formula, &context, Some(project));
    if name.is_empty() {
        name = project.name.clone();
    }

    let mut root = GeneratedNode::new(
        root_def.map_or("ProjectRoot", |def| def.node_type_id.as_str()),
        &name,
        project.root_path.join(&name),
    );
    root.name_formula = Some(formula);
    root.context = context;
    root.definition_id = root_def.map(|def| def.id.clone());
    check_name(&mut root);
    root.planned_acl = acl_engine::calculate_rules(&root, root_def, profile);

    if let Some(root_def) = root_def {
        for child_def in &root_def.children {
            expand(child_def, &mut root, project, profile);
        }
    }

    log::debug!(
        "generated {} node(s) for project '{}'",
        root.count(),
        project.name
    );
    root
}

/// Expands one template level under `parent`, appending zero or more
/// children according to the level's multiplicity.
fn expand(
    def: &StructureNodeDefinition,
    parent: &mut GeneratedNode,
    project: &Project,
    profile: &ProfileSchema,
) {
    // A failed gating condition skips the whole subtree. An expression
    // that does not parse counts as "generate".
    if let Some(expression) = &def.condition {
        if let Some(condition) = conditions::parse_expression(expression) {
            if !conditions::evaluate(&condition, &parent.context) {
                log::debug!(
                    "condition '{}' not met under '{}', skipping subtree",
                    expression,
                    parent.name
                );
                return;
            }
        }
    }

    let formula = effective_formula(def, profile);

    let source_key = match (&def.multiplicity, &def.source_key) {
        (Multiplicity::Single, _) | (_, None) => {
            expand_single(def, &formula, parent, project, profile);
            return;
        }
        (_, Some(key)) => key,
    };

    let items = resolve_source_items(def, source_key, project, profile);

    if items.is_empty() {
        let blocking = blocking_acl_dependencies(def, profile);
        if !blocking.is_empty() {
            // The level cannot be silently skipped: descendant ACL rules
            // depend on values only this level can contribute.
            let display = profile
                .dictionary(source_key)
                .map_or(source_key.clone(), |d| d.display_name.clone());
            let mut warning = GeneratedNode::new(
                &def.node_type_id,
                &format!("[{}] selection required", display),
                parent.full_path.join(format!("[{}]", source_key)),
            );
            warning.definition_id = Some(def.id.clone());
            warning.validation_error = Some(format!(
                "ACL rules reference {}. Select at least one item for '{}'.",
                blocking.join(", "),
                display
            ));
            parent.children.push(warning);
            return;
        }

        // Safe to flatten: generate the children directly in the parent,
        // as if the empty level did not exist.
        log::debug!(
            "empty level '{}' flattened under '{}'",
            source_key,
            parent.name
        );
        for child_def in &def.children {
            expand(child_def, parent, project, profile);
        }
        return;
    }

    for record in items {
        let mut context = parent.context.clone();
        context.insert(source_key.clone(), ContextValue::Record(record.clone()));

        let mut name = naming::resolve_formula(&formula, &context, Some(project));
        if name.is_empty() {
            let code = record.get("Code").map(String::as_str).unwrap_or_default();
            let item_name = record.get("Name").map(String::as_str).unwrap_or_default();
            name = format!("{}_{}", code, item_name);
        }

        let mut node = GeneratedNode::new(&def.node_type_id, &name, parent.full_path.join(&name));
        node.name_formula = Some(formula.clone());
        node.context = context;
        node.definition_id = Some(def.id.clone());
        check_name(&mut node);
        node.planned_acl = acl_engine::calculate_rules(&node, Some(def), profile);

        for child_def in &def.children {
            expand(child_def, &mut node, project, profile);
        }
        parent.children.push(node);
    }
}

/// `Single` multiplicity: exactly one child. A pinned dictionary item makes
/// the fixed node act like a selected entry of that dictionary.
fn expand_single(
    def: &StructureNodeDefinition,
    formula: &str,
    parent: &mut GeneratedNode,
    project: &Project,
    profile: &ProfileSchema,
) {
    let mut context = parent.context.clone();

    if let (Some(key), Some(code)) = (&def.source_key, &def.selected_item_code) {
        let item = profile
            .dictionary(key)
            .and_then(|dict| dict.items.iter().find(|item| item.code == *code));
        if let Some(item) = item {
            context.insert(key.clone(), ContextValue::item(&item.code, &item.name));
        }
    }

    let mut name = naming::resolve_formula(formula, &context, Some(project));
    if name.is_empty() {
        name = def.node_type_id.clone();
    }

    let mut node = GeneratedNode::new(&def.node_type_id, &name, parent.full_path.join(&name));
    node.name_formula = Some(formula.to_string());
    node.context = context;
    node.definition_id = Some(def.id.clone());
    check_name(&mut node);
    node.planned_acl = acl_engine::calculate_rules(&node, Some(def), profile);

    for child_def in &def.children {
        expand(child_def, &mut node, project, profile);
    }
    parent.children.push(node);
}

/// Concrete items a multiplicity level expands into, as `{column: value}`
/// records. Dictionary levels draw from the project's selection list
/// (dynamic dictionaries from its table rows); table levels draw from the
/// project's table rows.
fn resolve_source_items(
    def: &StructureNodeDefinition,
    source_key: &str,
    project: &Project,
    profile: &ProfileSchema,
) -> Vec<BTreeMap<String, String>> {
    match def.multiplicity {
        Multiplicity::Single => Vec::new(),
        Multiplicity::FromDictionary => {
            let Some(dict) = profile.dictionary(source_key) else {
                log::warn!(
                    "structure references unknown dictionary '{}'",
                    source_key
                );
                return Vec::new();
            };
            if dict.dynamic {
                return project.rows(source_key).to_vec();
            }
            let selected = project.selections(source_key);
            dict.items
                .iter()
                .filter(|item| selected.contains(&item.code))
                .map(|item| {
                    let mut record = BTreeMap::new();
                    record.insert("Code".to_string(), item.code.clone());
                    record.insert("Name".to_string(), item.name.clone());
                    for (key, value) in &item.metadata {
                        record.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                    record
                })
                .collect()
        }
        Multiplicity::FromTable => project.rows(source_key).to_vec(),
    }
}

/// Formula for a template level: explicit override (ignoring legacy
/// placeholders), then the node type's default, then the type id itself.
fn effective_formula(def: &StructureNodeDefinition, profile: &ProfileSchema) -> String {
    if let Some(formula) = &def.naming_formula_override {
        if !formula.trim().is_empty() && !LEGACY_PLACEHOLDERS.contains(&formula.as_str()) {
            return formula.clone();
        }
    }
    if let Some(node_type) = profile.node_type(&def.node_type_id) {
        if !node_type.default_formula.trim().is_empty() {
            return node_type.default_formula.clone();
        }
    }
    def.node_type_id.clone()
}

/// Flags nodes whose resolved name cannot be used as a path component, so
/// the problem surfaces in the preview instead of at disk-write time.
fn check_name(node: &mut GeneratedNode) {
    if let Err(reason) = naming::validate_name(&node.name) {
        node.validation_error = Some(reason.to_string());
    }
}

/// Attribute paths in descendant ACL rules/bindings that reference
/// `def.source_key`. Non-empty means an empty level must block generation
/// instead of flattening.
fn blocking_acl_dependencies(
    def: &StructureNodeDefinition,
    profile: &ProfileSchema,
) -> Vec<String> {
    let Some(source_key) = &def.source_key else {
        return Vec::new();
    };
    let mut paths = BTreeSet::new();
    collect_acl_attribute_paths(&def.children, profile, &mut paths);

    let key = source_key.to_lowercase();
    paths
        .into_iter()
        .filter(|path| {
            let path = path.to_lowercase();
            path == key || path.starts_with(&format!("{}.", key))
        })
        .collect()
}

fn collect_acl_attribute_paths(
    defs: &[StructureNodeDefinition],
    profile: &ProfileSchema,
    paths: &mut BTreeSet<String>,
) {
    for def in defs {
        for rule in &def.acl_rules {
            for condition in &rule.conditions {
                if !condition.attribute_path.is_empty() {
                    paths.insert(condition.attribute_path.clone());
                }
            }
        }
        for binding in &profile.acl_bindings {
            let applies = match &binding.node_type_id {
                Some(type_id) => *type_id == def.node_type_id,
                None => true,
            };
            if applies {
                for condition in &binding.conditions {
                    if !condition.attribute_path.is_empty() {
                        paths.insert(condition.attribute_path.clone());
                    }
                }
            }
        }
        collect_acl_attribute_paths(&def.children, profile, paths);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AccessRights, AclCondition, AclRuleDefinition, AttrValue, ConditionOperator,
        DictionaryItem, DictionarySchema, NodeTypeSchema, StructureSchema,
    };
    use std::path::PathBuf;

    fn dictionary(key: &str, items: &[(&str, &str)]) -> DictionarySchema {
        DictionarySchema {
            key: key.into(),
            display_name: key.into(),
            dynamic: false,
            items: items
                .iter()
                .map(|(code, name)| DictionaryItem {
                    code: (*code).into(),
                    name: (*name).into(),
                    metadata: BTreeMap::new(),
                })
                .collect(),
        }
    }

    fn level(
        node_type: &str,
        multiplicity: Multiplicity,
        source_key: Option<&str>,
        formula: Option<&str>,
        children: Vec<StructureNodeDefinition>,
    ) -> StructureNodeDefinition {
        StructureNodeDefinition {
            id: format!("def-{}", node_type),
            node_type_id: node_type.into(),
            is_root: false,
            multiplicity,
            source_key: source_key.map(Into::into),
            selected_item_code: None,
            naming_formula_override: formula.map(Into::into),
            condition: None,
            children,
            acl_rules: vec![],
        }
    }

    /// Profile with a root and a Stages > Disciplines dictionary nesting,
    /// the worked example from the requirements.
    fn stages_profile() -> ProfileSchema {
        let disciplines = level(
            "Discipline",
            Multiplicity::FromDictionary,
            Some("Disciplines"),
            Some("{Disciplines.Code}_{Disciplines.Name}"),
            vec![],
        );
        let stages = level(
            "Stage",
            Multiplicity::FromDictionary,
            Some("Stages"),
            Some("{Stages.Code}_{Stages.Name}"),
            vec![disciplines],
        );
        let mut root = level("ProjectRoot", Multiplicity::Single, None, Some("{ProjectCode}"), vec![stages]);
        root.is_root = true;

        ProfileSchema {
            name: "test".into(),
            dictionaries: vec![
                dictionary("Stages", &[("П", "Проектная"), ("Р", "Рабочая")]),
                dictionary("Disciplines", &[("АР", "Архитектура"), ("КР", "Конструкции")]),
            ],
            structure: StructureSchema {
                root_nodes: vec![root],
            },
            ..Default::default()
        }
    }

    fn stages_project() -> Project {
        let mut project = Project::new("Мост", "p", PathBuf::from("/projects"));
        project
            .attribute_values
            .insert("ProjectCode".into(), AttrValue::Text("AGK-01".into()));
        project
            .composition_selections
            .insert("Stages".into(), vec!["П".into(), "Р".into()]);
        project
            .composition_selections
            .insert("Disciplines".into(), vec!["АР".into(), "КР".into()]);
        project
    }

    #[test]
    fn nested_dictionaries_multiply() {
        let root = generate(&stages_project(), &stages_profile());

        assert_eq!(root.name, "AGK-01");
        assert_eq!(root.full_path, PathBuf::from("/projects/AGK-01"));
        assert_eq!(root.children.len(), 2, "one node per selected stage");
        for stage in &root.children {
            assert_eq!(stage.children.len(), 2, "one node per selected discipline");
        }

        let paths: Vec<_> = root
            .children
            .iter()
            .flat_map(|s| s.children.iter().map(|d| d.full_path.clone()))
            .collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/projects/AGK-01/П_Проектная/АР_Архитектура"),
                PathBuf::from("/projects/AGK-01/П_Проектная/КР_Конструкции"),
                PathBuf::from("/projects/AGK-01/Р_Рабочая/АР_Архитектура"),
                PathBuf::from("/projects/AGK-01/Р_Рабочая/КР_Конструкции"),
            ]
        );
    }

    #[test]
    fn three_level_nesting_is_a_full_product() {
        let mut profile = stages_profile();
        profile
            .dictionaries
            .push(dictionary("Zones", &[("1", "A"), ("2", "B"), ("3", "C")]));
        // Nest a third dictionary level under disciplines.
        profile.structure.root_nodes[0].children[0].children[0]
            .children
            .push(level(
                "Zone",
                Multiplicity::FromDictionary,
                Some("Zones"),
                Some("{Zones.Code}"),
                vec![],
            ));

        let mut project = stages_project();
        project.composition_selections.insert(
            "Zones".into(),
            vec!["1".into(), "2".into(), "3".into()],
        );

        let root = generate(&project, &profile);
        let innermost: usize = root
            .children
            .iter()
            .flat_map(|s| &s.children)
            .map(|d| d.children.len())
            .sum();
        assert_eq!(innermost, 2 * 2 * 3);
    }

    #[test]
    fn context_inherits_all_ancestors() {
        let root = generate(&stages_project(), &stages_profile());
        let discipline = &root.children[0].children[0];
        assert_eq!(
            discipline.context.get("Stages"),
            Some(&ContextValue::item("П", "Проектная"))
        );
        assert_eq!(
            discipline.context.get("Disciplines"),
            Some(&ContextValue::item("АР", "Архитектура"))
        );
        assert_eq!(
            discipline.context.get("ProjectCode"),
            Some(&ContextValue::Scalar("AGK-01".into()))
        );
    }

    #[test]
    fn paths_are_built_from_the_parent() {
        let root = generate(&stages_project(), &stages_profile());
        for stage in &root.children {
            assert_eq!(stage.full_path, root.full_path.join(&stage.name));
            for discipline in &stage.children {
                assert_eq!(
                    discipline.full_path,
                    stage.full_path.join(&discipline.name)
                );
            }
        }
    }

    #[test]
    fn empty_level_flattens_when_nothing_depends_on_it() {
        let mut project = stages_project();
        project
            .composition_selections
            .insert("Stages".into(), vec![]);

        let root = generate(&project, &stages_profile());
        // Stage level disappears; disciplines attach to the root directly.
        assert_eq!(root.children.len(), 2);
        assert!(root
            .children
            .iter()
            .all(|c| c.node_type_id == "Discipline"));
        assert!(!root.has_validation_errors());
    }

    #[test]
    fn empty_level_blocks_when_acl_depends_on_it() {
        let mut profile = stages_profile();
        // A discipline-level rule conditioned on the stage code.
        profile.structure.root_nodes[0].children[0].children[0]
            .acl_rules
            .push(AclRuleDefinition {
                id: "r".into(),
                conditions: vec![AclCondition {
                    attribute_path: "Stages.Code".into(),
                    operator: ConditionOperator::Equals,
                    value: "П".into(),
                }],
                principal_identity: "AGK\\Architects".into(),
                rights: AccessRights::MODIFY,
                deny: false,
                description: None,
            });

        let mut project = stages_project();
        project
            .composition_selections
            .insert("Stages".into(), vec![]);

        let root = generate(&project, &profile);
        assert_eq!(root.children.len(), 1);
        let warning = &root.children[0];
        assert!(warning.validation_error.is_some());
        assert!(warning.children.is_empty(), "no descent past a blocked level");
        assert!(root.has_validation_errors());
    }

    #[test]
    fn pinned_single_node_inherits_item_context() {
        let mut profile = stages_profile();
        let mut pinned = level(
            "Stage",
            Multiplicity::Single,
            Some("Stages"),
            Some("{Stages.Code}_{Stages.Name}"),
            vec![],
        );
        pinned.selected_item_code = Some("П".into());
        profile.structure.root_nodes[0].children = vec![pinned];

        let root = generate(&stages_project(), &profile);
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "П_Проектная");
    }

    #[test]
    fn failed_condition_skips_subtree() {
        let mut profile = stages_profile();
        profile.structure.root_nodes[0].children[0].children[0].condition =
            Some("Stages.Code == П".into());

        let root = generate(&stages_project(), &profile);
        let stage_p = &root.children[0];
        let stage_r = &root.children[1];
        assert_eq!(stage_p.children.len(), 2);
        assert!(stage_r.children.is_empty());
    }

    #[test]
    fn unparseable_condition_generates_anyway() {
        let mut profile = stages_profile();
        profile.structure.root_nodes[0].children[0].condition = Some("not a condition".into());

        let root = generate(&stages_project(), &profile);
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn table_level_expands_per_row() {
        let mut profile = stages_profile();
        profile.structure.root_nodes[0].children = vec![level(
            "Building",
            Multiplicity::FromTable,
            Some("Buildings"),
            Some("{Buildings.Code}_{Buildings.Name}"),
            vec![],
        )];

        let mut project = stages_project();
        let rows = vec![
            BTreeMap::from([("Code".to_string(), "1".to_string()), ("Name".to_string(), "Корпус А".to_string())]),
            BTreeMap::from([("Code".to_string(), "2".to_string()), ("Name".to_string(), "Корпус Б".to_string())]),
        ];
        project.table_data.insert("Buildings".into(), rows);

        let root = generate(&project, &profile);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].name, "1_Корпус А");
        assert_eq!(root.children[1].name, "2_Корпус Б");
    }

    #[test]
    fn unresolved_formula_still_previews() {
        let mut profile = stages_profile();
        profile.structure.root_nodes[0].children[0].naming_formula_override =
            Some("{Broken.Token}".into());

        let root = generate(&stages_project(), &profile);
        assert_eq!(root.children[0].name, "!Broken.Token!");
    }

    #[test]
    fn planned_acl_is_attached_during_generation() {
        let mut profile = stages_profile();
        profile.structure.root_nodes[0].children[0]
            .acl_rules
            .push(AclRuleDefinition {
                id: "r".into(),
                conditions: vec![],
                principal_identity: "AGK\\Staff".into(),
                rights: AccessRights::READ,
                deny: false,
                description: None,
            });

        let root = generate(&stages_project(), &profile);
        assert_eq!(root.children[0].planned_acl.len(), 1);
        assert_eq!(root.children[0].planned_acl[0].identity, "AGK\\Staff");
    }

    #[test]
    fn legacy_placeholder_overrides_are_ignored() {
        let mut profile = stages_profile();
        profile.node_types.push(NodeTypeSchema {
            type_id: "Stage".into(),
            display_name: "Stage".into(),
            default_formula: "{Stages.Code}".into(),
            default_acl_templates: vec![],
        });
        profile.structure.root_nodes[0].children[0].naming_formula_override =
            Some("New Folder".into());

        let root = generate(&stages_project(), &profile);
        assert_eq!(root.children[0].name, "П");
    }
}
