// src/core/acl_engine.rs
//
// Resolves which identities get which rights on a generated node.
// Precedence, strictest first:
//   1. per-node overrides (absolute, short-circuit everything),
//   2. condition-gated rules on the node's structure definition,
//   3. condition-gated profile bindings filtered by node type,
//   4. the node type's default templates, only when 2 and 3 produced
//      nothing.
// An empty result is valid: committing it still breaks inheritance, which
// reads as "nobody but the executing principal".

use crate::core::conditions;
use crate::models::{AclRule, GeneratedNode, ProfileSchema, StructureNodeDefinition};

pub fn calculate_rules(
    node: &GeneratedNode,
    definition: Option<&StructureNodeDefinition>,
    profile: &ProfileSchema,
) -> Vec<AclRule> {
    if !node.acl_overrides.is_empty() {
        log::debug!(
            "node '{}': {} override rule(s) replace computed ACL",
            node.name,
            node.acl_overrides.len()
        );
        return node.acl_overrides.clone();
    }

    let mut rules = Vec::new();

    // Structure-level rule definitions on this node's template.
    if let Some(definition) = definition {
        for rule_def in &definition.acl_rules {
            if conditions::evaluate_all(&rule_def.conditions, &node.context) {
                let mut rule =
                    AclRule::new(&rule_def.principal_identity, rule_def.rights, rule_def.deny);
                rule.competence = rule_def.description.clone().unwrap_or_default();
                rules.push(rule);
            }
        }
    }

    // Profile-wide bindings by node type. Every satisfied binding appends
    // the whole rule set of its template.
    for binding in &profile.acl_bindings {
        let type_matches = match &binding.node_type_id {
            Some(type_id) => *type_id == node.node_type_id,
            None => true,
        };
        if !type_matches || !conditions::evaluate_all(&binding.conditions, &node.context) {
            continue;
        }
        match profile.template(&binding.template_id) {
            Some(template) => rules.extend(template.rules.iter().cloned()),
            None => log::warn!(
                "binding for node type '{}' references unknown template '{}'",
                node.node_type_id,
                binding.template_id
            ),
        }
    }

    // Node-type defaults are the last resort.
    if rules.is_empty() {
        if let Some(node_type) = profile.node_type(&node.node_type_id) {
            for template_id in &node_type.default_acl_templates {
                if let Some(template) = profile.template(template_id) {
                    rules.extend(template.rules.iter().cloned());
                }
            }
        }
    }

    rules
}
