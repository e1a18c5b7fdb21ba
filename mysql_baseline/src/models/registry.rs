//! Model registry for mysql_baseline
//!
//! This module discovers model structs in source files. A model is a struct
//! carrying `#[baseline(table = "...")]`, usually next to
//! `#[derive(BaselineModel)]`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use syn::{parse_file, Attribute, Item, ItemStruct, LitStr};
use walkdir::WalkDir;

use crate::config::ModelsConfig;
use crate::error::{Error, Result};

/// A struct bound to a database table
pub trait TableModel {
    /// Logical table name, without prefix
    fn table_name() -> &'static str;
}

/// Registry for discovered models
pub struct ModelRegistry {
    models: HashMap<String, ModelInfo>,
    config: ModelsConfig,
}

/// Information about a registered model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub file_path: PathBuf,
    pub table_name: String,
}

impl ModelRegistry {
    /// Create a new model registry
    pub fn new(config: &ModelsConfig) -> Self {
        Self {
            models: HashMap::new(),
            config: config.clone(),
        }
    }

    /// Register a model type directly
    pub fn register<M: TableModel>(&mut self, name: &str) {
        self.models.insert(
            name.to_string(),
            ModelInfo {
                name: name.to_string(),
                file_path: PathBuf::new(),
                table_name: M::table_name().to_string(),
            },
        );
    }

    /// Scan the configured directories for model definitions
    pub fn scan(&mut self) -> Result<()> {
        let paths = self.config.paths.clone();

        for path in &paths {
            let base_path = Path::new(path);

            if !base_path.is_dir() {
                tracing::warn!(path = %path, "Model directory does not exist, skipping");
                continue;
            }

            for entry in WalkDir::new(base_path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if path.is_file() && path.extension().map_or(false, |ext| ext == "rs") {
                    self.process_file(path)?;
                }
            }
        }

        tracing::info!(models = self.models.len(), "Model scan finished");
        Ok(())
    }

    /// Process a Rust file and extract model definitions
    fn process_file(&mut self, file_path: &Path) -> Result<()> {
        let file_content = std::fs::read_to_string(file_path)?;
        let syntax = parse_file(&file_content).map_err(|e| {
            Error::SyntaxError(format!("Failed to parse {}: {}", file_path.display(), e))
        })?;

        self.process_items(file_path, &syntax.items)
    }

    fn process_items(&mut self, file_path: &Path, items: &[Item]) -> Result<()> {
        for item in items {
            match item {
                Item::Struct(item_struct) => {
                    if let Some(table_name) = extract_table_name(item_struct)? {
                        self.register_model(file_path, item_struct, table_name);
                    }
                }
                Item::Mod(module) => {
                    if let Some((_, items)) = &module.content {
                        self.process_items(file_path, items)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn register_model(&mut self, file_path: &Path, item_struct: &ItemStruct, table_name: String) {
        let name = item_struct.ident.to_string();
        tracing::debug!(model = %name, table = %table_name, "Registered model");

        self.models.insert(
            name.clone(),
            ModelInfo {
                name,
                file_path: file_path.to_owned(),
                table_name,
            },
        );
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.values()
    }

    /// Logical names of every tracked model table, sorted
    pub fn model_tables(&self) -> BTreeSet<String> {
        self.models
            .values()
            .map(|model| model.table_name.clone())
            .filter(|table| !self.config.ignore_tables.contains(table))
            .collect()
    }
}

/// Table name declared by `#[baseline(table = "...")]`
fn extract_table_name(item_struct: &ItemStruct) -> Result<Option<String>> {
    for attr in &item_struct.attrs {
        if let Some(table) = table_attribute(attr).map_err(|e| {
            Error::ModelRegistrationError(format!(
                "Invalid baseline attribute on {}: {}",
                item_struct.ident, e
            ))
        })? {
            return Ok(Some(logical_name(&table)));
        }
    }
    Ok(None)
}

fn table_attribute(attr: &Attribute) -> syn::Result<Option<String>> {
    if !attr.path().is_ident("baseline") {
        return Ok(None);
    }

    let mut table = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("table") {
            let value: LitStr = meta.value()?.parse()?;
            table = Some(value.value());
            Ok(())
        } else {
            Err(meta.error("unsupported baseline attribute"))
        }
    })?;
    Ok(table)
}

/// `{{%user}}` -> `user`
fn logical_name(table: &str) -> String {
    table
        .trim()
        .trim_start_matches("{{")
        .trim_start_matches('%')
        .trim_end_matches("}}")
        .to_string()
}
