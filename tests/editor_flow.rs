use std::collections::BTreeSet;
use std::io::Write;

use anyhow::{Context, Result};
use serde_json::json;
use tempfile::NamedTempFile;

use authz_bootstrap::models::{BootstrapData, EditorProfile, PermissionTree};
use authz_bootstrap::normalize::normalize_bootstrap;
use authz_bootstrap::{EditorTransform, FlatSelection};

fn bootstrap() -> BootstrapData {
    normalize_bootstrap(&json!({
        "columns": {
            "rh": {
                "funcionarios": {
                    "metadata": {"action": "cadastro.listar"},
                    "columns": [
                        {"code": "col_salario", "id": "501", "columnScope": ["view"]},
                        {"code": "nome", "id": "502"}
                    ]
                },
                "ferias": [
                    {"code": "periodo", "id": "601", "canEdit": false}
                ]
            }
        }
    }))
}

fn keys(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[test]
fn test_profile_round_trip_from_file() -> Result<()> {
    let mut file = NamedTempFile::new().context("failed to create temp profile")?;
    write!(
        file,
        "{}",
        json!({
            "id": "5b0c7c8e-3f0a-4c1e-9d57-2b8f4e0c1a11",
            "nome": "Analista RH",
            "permissoes": {
                "rh": {
                    "acessar": {"permitido": true},
                    "cadastro": {
                        "listar": {
                            "permitido": true,
                            "fields": {"salario": {"view": true}, "nome": {"view": false, "edit": true}}
                        },
                        "excluir": {"permitido": false}
                    },
                    "ferias": {"fields": {"periodo": true, "legado": true}}
                },
                "financeiro": {"permissoes": {"permitido": false}}
            }
        })
    )?;

    let profile = EditorProfile::from_path(file.path())?;
    assert!(profile.is_persisted());
    assert_eq!(profile.name, "Analista RH");

    let data = bootstrap();
    let editor = EditorTransform::new(&data.fields);
    let flat = editor.flatten(&profile.permissions);

    assert_eq!(flat.modules, keys(&["rh"]));
    assert_eq!(flat.actions, keys(&["rh.cadastro.listar"]));
    assert_eq!(flat.fields, keys(&["501", "502", "601"]));

    let rebuilt = editor.rebuild(&flat);
    assert_eq!(editor.flatten(&rebuilt), flat);
    assert_eq!(editor.rebuild(&editor.flatten(&rebuilt)), rebuilt);
    Ok(())
}

#[test]
fn test_rebuild_uses_column_scopes() -> Result<()> {
    let data = bootstrap();
    let editor = EditorTransform::new(&data.fields);
    let selection = FlatSelection {
        modules: BTreeSet::new(),
        actions: BTreeSet::new(),
        fields: keys(&["501", "502", "601", "stale-column"]),
    };

    let tree = editor.rebuild(&selection);
    let listar = tree.node("rh", "cadastro.listar").context("action node missing")?;
    assert_eq!(listar.permitted, None);
    assert_eq!(listar.fields["salario"].keys().collect::<Vec<_>>(), vec!["view"]);
    assert_eq!(listar.fields["nome"].keys().collect::<Vec<_>>(), vec!["edit", "view"]);

    let ferias = tree.node("rh", "ferias").context("ferias node missing")?;
    assert_eq!(ferias.fields["periodo"].keys().collect::<Vec<_>>(), vec!["view"]);

    assert_eq!(editor.flatten(&tree).fields, keys(&["501", "502", "601"]));
    Ok(())
}

#[test]
fn test_selection_file_decodes_with_defaults() -> Result<()> {
    let selection: FlatSelection = serde_json::from_value(json!({"actions": ["rh.cadastro.listar"]}))?;
    assert!(selection.modules.is_empty());
    assert_eq!(selection.len(), 1);

    let data = bootstrap();
    let tree = EditorTransform::new(&data.fields).rebuild(&selection);
    assert_eq!(
        serde_json::to_value(&tree)?,
        json!({"rh": {"cadastro": {"listar": {"permitido": true}}}})
    );
    Ok(())
}

#[test]
fn test_malformed_profile_reports_path() -> Result<()> {
    let err = EditorProfile::from_json(r#"{"id": "not-a-uuid"}"#).unwrap_err();
    assert_eq!(err.kind(), "decode");
    assert!(err.to_string().contains("id"));

    let empty = EditorProfile::from_json("{}")?;
    assert!(empty.permissions.is_empty());
    assert_eq!(empty, EditorProfile::default());
    assert_eq!(PermissionTree::new(), empty.permissions);
    Ok(())
}
