use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use super::{Catalog, CatalogEntry, CatalogError, CatalogRegistry, QuestionDefinition};

pub const BUILTIN_CATALOGS: &str = include_str!("builtin.toml");

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    catalogs: Vec<CatalogTable>,
    #[serde(default)]
    aliases: Vec<AliasTable>,
}

#[derive(Debug, Deserialize)]
struct CatalogTable {
    service: String,
    #[serde(default)]
    questions: Vec<QuestionDefinition>,
}

#[derive(Debug, Deserialize)]
struct AliasTable {
    service: String,
    target: String,
}

pub fn from_path(path: &Path) -> Result<CatalogRegistry, CatalogError> {
    let raw = fs::read_to_string(path).map_err(|source| CatalogError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    from_toml_str(&raw, &path.display().to_string())
}

pub fn from_toml_str(raw: &str, origin: &str) -> Result<CatalogRegistry, CatalogError> {
    let file = toml::from_str::<CatalogFile>(raw)
        .map_err(|source| CatalogError::Parse { origin: origin.to_string(), source })?;

    let mut entries = BTreeMap::new();
    for table in file.catalogs {
        let catalog = Catalog::new(&table.service, table.questions)?;
        if entries.insert(table.service.clone(), CatalogEntry::Direct(Arc::new(catalog))).is_some()
        {
            return Err(CatalogError::DuplicateService(table.service));
        }
    }
    for alias in file.aliases {
        if entries.insert(alias.service.clone(), CatalogEntry::AliasOf(alias.target)).is_some() {
            return Err(CatalogError::DuplicateService(alias.service));
        }
    }

    CatalogRegistry::from_entries(entries)
}
