//! Named form and inline factories
//!
//! Rules refer to forms and inlines by name; the names resolve here.
//! The registry is filled at startup before any admin is registered.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::AppError;

/// Builds a fresh form definition
pub type FormFactory = Arc<dyn Fn() -> FormSpec + Send + Sync>;

/// Builds an inline definition
pub type InlineFactory = Arc<dyn Fn() -> InlineAdmin + Send + Sync>;

/// One form field and its widget attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, serde_json::Value>,
}

impl FormField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }
}

/// A form: an ordered list of fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSpec {
    pub name: String,
    pub fields: Vec<FormField>,
}

impl FormSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    /// Form with plain fields, in order
    pub fn with_fields(name: impl Into<String>, fields: &[&str]) -> Self {
        fields
            .iter()
            .fold(Self::new(name), |form, field| form.field(FormField::new(*field)))
    }

    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|field| field.name == name)
    }
}

/// Layout of an inline formset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InlineType {
    /// Each related object in its own block
    Stacked,
    /// Related objects as table rows
    Tabular,
}

/// Related rows edited inside the parent's form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineAdmin {
    pub model_name: String,
    /// Foreign key on the related model pointing at the parent
    pub fk_name: String,
    pub inline_type: InlineType,
    pub fields: Vec<String>,
    /// Number of empty extra forms
    pub extra: usize,
}

impl InlineAdmin {
    pub fn new(model_name: impl Into<String>, fk_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            fk_name: fk_name.into(),
            inline_type: InlineType::Tabular,
            fields: Vec::new(),
            extra: 3,
        }
    }

    pub fn with_type(mut self, inline_type: InlineType) -> Self {
        self.inline_type = inline_type;
        self
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|field| field.to_string()).collect();
        self
    }

    pub fn with_extra(mut self, extra: usize) -> Self {
        self.extra = extra;
        self
    }
}

/// Registry of named forms and inlines
#[derive(Clone, Default)]
pub struct AdminRegistry {
    forms: HashMap<String, FormFactory>,
    inlines: HashMap<String, InlineFactory>,
}

impl AdminRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_form<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> FormSpec + Send + Sync + 'static,
    {
        self.forms.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn register_inline<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> InlineAdmin + Send + Sync + 'static,
    {
        self.inlines.insert(name.into(), Arc::new(factory));
        self
    }

    /// # Errors
    /// `Lookup` when no form is registered under `name`
    pub fn form(&self, name: &str) -> Result<FormFactory, AppError> {
        self.forms
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::Lookup(format!("form not registered: {name}")))
    }

    /// # Errors
    /// `Lookup` when no inline is registered under `name`
    pub fn inline(&self, name: &str) -> Result<InlineFactory, AppError> {
        self.inlines
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::Lookup(format!("inline not registered: {name}")))
    }
}

impl std::fmt::Debug for AdminRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut forms: Vec<&String> = self.forms.keys().collect();
        let mut inlines: Vec<&String> = self.inlines.keys().collect();
        forms.sort();
        inlines.sort();
        f.debug_struct("AdminRegistry")
            .field("forms", &forms)
            .field("inlines", &inlines)
            .finish()
    }
}
