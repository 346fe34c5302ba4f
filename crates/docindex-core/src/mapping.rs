//! Statically declared field mappings and the document contract.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Analyzed full-text field, searched by the free-text query.
    ///
    /// Highlighting expects a single string per document. An array value is
    /// still indexed and matched, but the embedded engine skips it when
    /// highlighting and Elasticsearch answers with one fragment per element,
    /// which fails the search as an unexpected fragment count.
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        analyzer: Option<String>,
    },
    /// Exact-match string.
    Keyword,
    Int32,
    Int64,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    pub kind: FieldKind,
}

/// Field declarations for one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMapping {
    key_field: String,
    fields: Vec<FieldMapping>,
}

impl IndexMapping {
    pub fn builder() -> MappingBuilder {
        MappingBuilder::default()
    }

    /// The one field holding the document's identifier.
    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn text_fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.fields.iter().filter(|f| matches!(f.kind, FieldKind::Text { .. }))
    }
}

#[derive(Debug, Default)]
pub struct MappingBuilder {
    keys: Vec<String>,
    fields: Vec<FieldMapping>,
}

impl MappingBuilder {
    /// Mark `name` as the identifier field. Exactly one call is required.
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.keys.push(name.into());
        self
    }

    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Text { analyzer: None })
    }

    pub fn text_with_analyzer(self, name: impl Into<String>, analyzer: impl Into<String>) -> Self {
        self.field(name, FieldKind::Text { analyzer: Some(analyzer.into()) })
    }

    /// Declare every name in `names` not listed in `excluded` as a text field,
    /// optionally with a named analyzer.
    pub fn strings(mut self, names: &[&str], analyzer: Option<&str>, excluded: &[&str]) -> Self {
        for name in names.iter().filter(|n| !excluded.contains(n)) {
            let kind = FieldKind::Text { analyzer: analyzer.map(str::to_string) };
            self = self.field(*name, kind);
        }
        self
    }

    pub fn keyword(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Keyword)
    }

    pub fn int32(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Int32)
    }

    pub fn int64(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Int64)
    }

    pub fn date(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Date)
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldMapping { name: name.into(), kind });
        self
    }

    pub fn build(self) -> Result<IndexMapping> {
        let key_field = match self.keys.as_slice() {
            [] => return Err(Error::mapping("no key field declared")),
            [key] => key.clone(),
            keys => return Err(Error::mapping(format!("more than one key field declared: {}", keys.join(", ")))),
        };
        if key_field.trim().is_empty() {
            return Err(Error::mapping("key field name is empty"));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(Error::mapping("field name is empty"));
            }
            if field.name.starts_with('_') {
                return Err(Error::mapping(format!("field '{}' uses the reserved '_' prefix", field.name)));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::mapping(format!("field '{}' declared twice", field.name)));
            }
            if let FieldKind::Text { analyzer: Some(a) } = &field.kind {
                if a.trim().is_empty() {
                    return Err(Error::mapping(format!("field '{}' has an empty analyzer name", field.name)));
                }
            }
        }

        Ok(IndexMapping { key_field, fields: self.fields })
    }
}

/// A type that can be stored in an index.
///
/// Documents serialize to a JSON object whose key field (see
/// [`IndexMapping::key_field`]) holds a string, integer or UUID.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn mapping() -> Result<IndexMapping>;

    fn index_name() -> String {
        default_index_name::<Self>()
    }
}

/// The lowercased, unqualified type name, e.g. `app::model::BlogPost` becomes
/// `blog_post`.
pub fn default_index_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    let short = base.rsplit("::").next().unwrap_or(base);

    let mut name = String::with_capacity(short.len() + 4);
    for (i, c) in short.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                name.push('_');
            }
            name.extend(c.to_lowercase());
        } else {
            name.push(c);
        }
    }
    name
}
