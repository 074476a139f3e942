use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::codegen::snake_case;

/// Relative path of the access-rights table inside a module
pub const ACCESS_FILE: &str = "security/ir.model.access.csv";

pub const ACCESS_HEADER: &str =
    "id,name,model_id:id,group_id:id,perm_read,perm_write,perm_create,perm_unlink";

/// Group granted access to new models unless configured otherwise
pub const DEFAULT_GROUP: &str = "base.group_user";

/// Read / write / create / unlink permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudLevel {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub unlink: bool,
}

impl CrudLevel {
    pub const FULL: CrudLevel = CrudLevel {
        read: true,
        write: true,
        create: true,
        unlink: true,
    };
    pub const NO_UNLINK: CrudLevel = CrudLevel {
        read: true,
        write: true,
        create: true,
        unlink: false,
    };
    pub const READONLY: CrudLevel = CrudLevel {
        read: true,
        write: false,
        create: false,
        unlink: false,
    };
}

/// One line of the access table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRule {
    pub id: String,
    pub name: String,
    pub model_id: String,
    pub group_id: String,
    pub crud: CrudLevel,
}

impl AccessRule {
    fn to_csv(&self) -> String {
        let flag = |value: bool| if value { "1" } else { "0" };
        [
            csv_field(&self.id),
            csv_field(&self.name),
            csv_field(&self.model_id),
            csv_field(&self.group_id),
            Cow::Borrowed(flag(self.crud.read)),
            Cow::Borrowed(flag(self.crud.write)),
            Cow::Borrowed(flag(self.crud.create)),
            Cow::Borrowed(flag(self.crud.unlink)),
        ]
        .join(",")
    }
}

/// Quotes a cell holding a separator, a quote or a line break
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Accumulates access rules and writes them as `ir.model.access.csv`
#[derive(Debug, Clone, Default)]
pub struct ModelAccessHelper {
    rules: Vec<AccessRule>,
}

impl ModelAccessHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// `access_<model>[_<suffix>]` for `model` and `group`
    pub fn add(&mut self, model: &str, group: &str, crud: CrudLevel, suffix: Option<&str>) {
        let model = snake_case(model);
        let id = match suffix {
            Some(suffix) => format!("access_{}_{}", model, suffix),
            None => format!("access_{}", model),
        };
        self.rules.push(AccessRule {
            name: id.clone(),
            id,
            model_id: format!("model_{}", model),
            group_id: group.to_string(),
            crud,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from(ACCESS_HEADER);
        out.push('\n');
        for rule in &self.rules {
            out.push_str(&rule.to_csv());
            out.push('\n');
        }
        out
    }

    /// Writes the table under `module_dir`; nothing is written for an empty table
    pub fn save(&self, module_dir: &Path) -> Result<Option<PathBuf>> {
        if self.is_empty() {
            return Ok(None);
        }
        let path = module_dir.join(ACCESS_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, self.to_csv())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builds_rows_from_model_names() {
        let mut helper = ModelAccessHelper::new();
        helper.add("helpdesk.ticket", DEFAULT_GROUP, CrudLevel::FULL, None);
        helper.add("helpdesk.ticket", "base.group_system", CrudLevel::READONLY, Some("manager"));
        assert_eq!(
            helper.to_csv(),
            "id,name,model_id:id,group_id:id,perm_read,perm_write,perm_create,perm_unlink\n\
             access_helpdesk_ticket,access_helpdesk_ticket,model_helpdesk_ticket,base.group_user,1,1,1,1\n\
             access_helpdesk_ticket_manager,access_helpdesk_ticket_manager,model_helpdesk_ticket,base.group_system,1,0,0,0\n"
        );
    }

    #[test]
    fn quotes_cells_with_separators() {
        let mut helper = ModelAccessHelper::new();
        helper.add("a.b", "base.group_user,\"x\"", CrudLevel::READONLY, None);
        assert!(helper
            .to_csv()
            .ends_with("model_a_b,\"base.group_user,\"\"x\"\"\",1,0,0,0\n"));
    }

    #[test]
    fn empty_table_is_not_written() {
        let dir = tempdir().unwrap();
        assert_eq!(ModelAccessHelper::new().save(dir.path()).unwrap(), None);
        assert!(!dir.path().join("security").exists());
    }

    #[test]
    fn saves_under_security() {
        let dir = tempdir().unwrap();
        let mut helper = ModelAccessHelper::new();
        helper.add("a.b", DEFAULT_GROUP, CrudLevel::NO_UNLINK, None);
        let path = helper.save(dir.path()).unwrap().unwrap();
        assert_eq!(path, dir.path().join(ACCESS_FILE));
        assert!(fs::read_to_string(path).unwrap().ends_with("model_a_b,base.group_user,1,1,1,0\n"));
    }
}
