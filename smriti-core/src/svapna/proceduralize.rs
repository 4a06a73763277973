//! PROCEDURALIZE — Vidhi extraction via anti-unification of
//! tool-call sequences (spec.md §4.10.4).

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Store;
use crate::types::{ParameterSpec, ProjectScope, Session, Turn, Vidhi, VidhiStep};

#[derive(Debug, Clone, Default)]
pub struct ProceduralizeResult {
    pub vidhis: Vec<Vidhi>,
}

struct SessionSequence {
    session_id: Uuid,
    steps: Vec<(String, serde_json::Value)>,
}

/// Extract, filter, group, and anti-unify tool-call sequences into
/// Vidhi candidates, upserting by `(tool-name sequence, project)`
/// (spec.md §4.10.4).
pub async fn proceduralize(
    store: &dyn Store,
    project: &str,
    sessions: &[(Session, Vec<Turn>)],
    min_sequence_length: usize,
    min_success_rate: f64,
) -> Result<ProceduralizeResult> {
    let mut qualifying = Vec::new();
    for (session, turns) in sessions {
        let mut steps = Vec::new();
        let mut successes = 0u64;
        let mut total = 0u64;
        for turn in turns {
            for call in &turn.tool_calls {
                steps.push((call.name.clone(), call.input.clone()));
                total += 1;
                if !call.is_error {
                    successes += 1;
                }
            }
        }
        if steps.len() < min_sequence_length || total == 0 {
            continue;
        }
        if (successes as f64 / total as f64) < min_success_rate {
            continue;
        }
        qualifying.push(SessionSequence { session_id: session.id, steps });
    }

    let mut groups: HashMap<Vec<String>, Vec<SessionSequence>> = HashMap::new();
    for seq in qualifying {
        let key: Vec<String> = seq.steps.iter().map(|(name, _)| name.clone()).collect();
        groups.entry(key).or_default().push(seq);
    }

    let mut result = ProceduralizeResult::default();
    let now = Utc::now();

    for (tool_names, group) in groups {
        let distinct_sessions: HashSet<Uuid> = group.iter().map(|s| s.session_id).collect();
        if distinct_sessions.len() < 3 {
            continue;
        }

        let (steps, parameter_schema) = anti_unify(&group);
        let name = vidhi_name(&tool_names);
        let triggers = derive_triggers(&tool_names, &group);
        let learned_from: Vec<Uuid> = distinct_sessions.into_iter().collect();

        let existing = store
            .list_vidhis(Some(project))
            .await?
            .into_iter()
            .find(|v| v.name == name);

        let vidhi = match existing {
            Some(mut vidhi) => {
                vidhi.steps = steps;
                vidhi.parameter_schema = parameter_schema;
                vidhi.triggers = triggers;
                vidhi.success_count += group.len() as u64;
                vidhi.updated_at = now;
                vidhi
            }
            None => Vidhi {
                id: Uuid::new_v4(),
                name: name.clone(),
                steps,
                triggers,
                parameter_schema,
                confidence: 1.0,
                success_count: group.len() as u64,
                failure_count: 0,
                learned_from,
                project: ProjectScope::from_str(project),
                created_at: now,
                updated_at: now,
            },
        };

        store.upsert_vidhi(&vidhi).await?;
        result.vidhis.push(vidhi);
    }

    Ok(result)
}

/// Pseudo-key used to anti-unify a non-object argument (a raw string
/// or array) as if it were a single-field object (spec.md §9, open
/// question resolution: "treat non-object arguments as a single
/// pseudo-key `_value`").
const NON_OBJECT_KEY: &str = "_value";

/// Anti-unify grouped per-session sequences step-by-step and
/// key-by-key (spec.md §4.10.4 step 4). A varying or
/// not-present-everywhere value becomes `${varK}`; a literal held in
/// common across every sequence is kept as-is.
fn anti_unify(group: &[SessionSequence]) -> (Vec<VidhiStep>, HashMap<String, ParameterSpec>) {
    let step_count = group[0].steps.len();
    let mut var_counter = 0u32;
    let mut steps = Vec::with_capacity(step_count);
    let mut schema = HashMap::new();

    for step_idx in 0..step_count {
        let tool_name = group[0].steps[step_idx].0.clone();
        let any_non_object = group.iter().any(|seq| !seq.steps[step_idx].1.is_object());

        let mut all_keys: BTreeSet<String> = BTreeSet::new();
        if any_non_object {
            all_keys.insert(NON_OBJECT_KEY.to_string());
        } else {
            for seq in group {
                if let Some(obj) = seq.steps[step_idx].1.as_object() {
                    all_keys.extend(obj.keys().cloned());
                }
            }
        }

        let mut template = serde_json::Map::new();
        for key in &all_keys {
            let values: Vec<Option<serde_json::Value>> = if any_non_object {
                group.iter().map(|seq| Some(seq.steps[step_idx].1.clone())).collect()
            } else {
                group
                    .iter()
                    .map(|seq| seq.steps[step_idx].1.as_object().and_then(|o| o.get(key)).cloned())
                    .collect()
            };

            let present_in_all = values.iter().all(Option::is_some);
            let uniform = values.iter().all(|v| *v == values[0]);

            if uniform && present_in_all {
                template.insert(key.clone(), values[0].clone().unwrap_or(serde_json::Value::Null));
            } else {
                let placeholder = format!("${{var{var_counter}}}");
                var_counter += 1;
                template.insert(key.clone(), serde_json::Value::String(placeholder));
                schema.insert(
                    key.clone(),
                    ParameterSpec {
                        param_type: infer_type(&values),
                        required: present_in_all,
                        description: "auto-detected variable".to_string(),
                    },
                );
            }
        }

        steps.push(VidhiStep {
            index: step_idx as u32,
            tool_name: tool_name.clone(),
            arg_template: serde_json::Value::Object(template),
            description: format!("Invoke {tool_name}"),
        });
    }

    (steps, schema)
}

fn infer_type(values: &[Option<serde_json::Value>]) -> String {
    for v in values.iter().flatten() {
        let kind = match v {
            serde_json::Value::String(_) => "string",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
            serde_json::Value::Null => "null",
        };
        return kind.to_string();
    }
    "string".to_string()
}

fn vidhi_name(tool_names: &[String]) -> String {
    let joined = tool_names.join("→");
    slugify(&joined, 64)
}

fn derive_triggers(tool_names: &[String], group: &[SessionSequence]) -> HashSet<String> {
    let mut triggers = HashSet::new();
    for pair in tool_names.windows(2) {
        triggers.insert(format!("{} then {}", pair[0], pair[1]));
        triggers.insert(format!("{} and {}", pair[0], pair[1]));
    }

    for seq in group {
        for (_, args) in &seq.steps {
            let mut strings = Vec::new();
            collect_strings(args, &mut strings);
            for s in strings {
                if let Some(ext) = file_extension(&s) {
                    triggers.insert(ext);
                }
            }
        }
    }

    triggers
}

fn collect_strings(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => out.push(s.clone()),
        serde_json::Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            for v in map.values() {
                collect_strings(v, out);
            }
        }
        _ => {}
    }
}

fn file_extension(text: &str) -> Option<String> {
    let dot = text.rfind('.')?;
    let ext = &text[dot + 1..];
    if !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(format!(".{ext}"))
    } else {
        None
    }
}

fn slugify(content: &str, max_len: usize) -> String {
    let mut slug = String::new();
    let mut last_was_dash = true;
    for ch in content.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("vidhi");
    }
    slug.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anti_unify_keeps_literal_and_parametrizes_varying_key() {
        let group = vec![
            SessionSequence {
                session_id: Uuid::new_v4(),
                steps: vec![
                    ("read".into(), serde_json::json!({"path": "a.txt", "encoding": "utf-8"})),
                    ("edit".into(), serde_json::json!({"path": "a.txt"})),
                ],
            },
            SessionSequence {
                session_id: Uuid::new_v4(),
                steps: vec![
                    ("read".into(), serde_json::json!({"path": "b.txt", "encoding": "utf-8"})),
                    ("edit".into(), serde_json::json!({"path": "b.txt"})),
                ],
            },
            SessionSequence {
                session_id: Uuid::new_v4(),
                steps: vec![
                    ("read".into(), serde_json::json!({"path": "c.txt", "encoding": "utf-8"})),
                    ("edit".into(), serde_json::json!({"path": "c.txt"})),
                ],
            },
        ];

        let (steps, schema) = anti_unify(&group);
        assert_eq!(steps.len(), 2);
        let first = &steps[0].arg_template;
        assert_eq!(first["encoding"], serde_json::json!("utf-8"));
        assert_eq!(first["path"], serde_json::json!("${var0}"));
        assert!(schema.contains_key("path"));
        assert!(!schema.contains_key("encoding"));
    }

    #[test]
    fn anti_unify_treats_non_object_args_as_pseudo_key() {
        let group = vec![
            SessionSequence {
                session_id: Uuid::new_v4(),
                steps: vec![("grep".into(), serde_json::json!("needle-a"))],
            },
            SessionSequence {
                session_id: Uuid::new_v4(),
                steps: vec![("grep".into(), serde_json::json!("needle-b"))],
            },
            SessionSequence {
                session_id: Uuid::new_v4(),
                steps: vec![("grep".into(), serde_json::json!("needle-c"))],
            },
        ];

        let (steps, schema) = anti_unify(&group);
        assert_eq!(steps[0].arg_template["_value"], serde_json::json!("${var0}"));
        assert!(schema.contains_key("_value"));
    }

    #[test]
    fn vidhi_name_joins_and_slugifies_tool_sequence() {
        assert_eq!(vidhi_name(&["read".into(), "edit".into()]), "read-edit");
    }

    #[test]
    fn file_extension_detects_common_suffixes() {
        assert_eq!(file_extension("main.rs"), Some(".rs".to_string()));
        assert_eq!(file_extension("no-extension-here"), None);
    }

    #[test]
    fn derive_triggers_includes_adjacent_pair_phrasings() {
        let triggers = derive_triggers(&["read".into(), "edit".into()], &[]);
        assert!(triggers.contains("read then edit"));
        assert!(triggers.contains("read and edit"));
    }
}
