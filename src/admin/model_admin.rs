//! Model admin definitions
//!
//! A `ModelAdmin` is built once, optionally overridden by its rule, and
//! read-only afterwards.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::registry::{AdminRegistry, FormFactory, FormSpec, InlineAdmin};
use super::rules::{AdminRule, Fieldset, RuleTable};
use crate::error::AppError;

/// How one model is listed, searched and edited in the admin
#[derive(Clone)]
pub struct ModelAdmin {
    app: String,
    name: String,
    fieldsets: Vec<Fieldset>,
    list_display: Vec<String>,
    list_filter: Vec<String>,
    search_fields: Vec<String>,
    exclude: Vec<String>,
    raw_id_fields: Vec<String>,
    prepopulated_fields: BTreeMap<String, Vec<String>>,
    readonly_fields: Vec<String>,
    field_overrides: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    form: FormFactory,
    inlines: Vec<InlineAdmin>,
    attributes: BTreeMap<String, serde_json::Value>,
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl ModelAdmin {
    /// Admin `name` of app `app`, listing only `id`, with an empty form
    pub fn new(app: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let form_name = format!("{}Form", name.trim_end_matches("Admin"));
        Self {
            app: app.into(),
            name,
            fieldsets: Vec::new(),
            list_display: vec!["id".to_string()],
            list_filter: Vec::new(),
            search_fields: Vec::new(),
            exclude: Vec::new(),
            raw_id_fields: Vec::new(),
            prepopulated_fields: BTreeMap::new(),
            readonly_fields: Vec::new(),
            field_overrides: BTreeMap::new(),
            form: Arc::new(move || FormSpec::new(form_name.clone())),
            inlines: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn list_display(mut self, fields: &[&str]) -> Self {
        self.list_display = to_strings(fields);
        self
    }

    pub fn list_filter(mut self, fields: &[&str]) -> Self {
        self.list_filter = to_strings(fields);
        self
    }

    pub fn search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = to_strings(fields);
        self
    }

    pub fn exclude(mut self, fields: &[&str]) -> Self {
        self.exclude = to_strings(fields);
        self
    }

    pub fn raw_id_fields(mut self, fields: &[&str]) -> Self {
        self.raw_id_fields = to_strings(fields);
        self
    }

    pub fn readonly_fields(mut self, fields: &[&str]) -> Self {
        self.readonly_fields = to_strings(fields);
        self
    }

    pub fn prepopulated(mut self, field: &str, sources: &[&str]) -> Self {
        self.prepopulated_fields
            .insert(field.to_string(), to_strings(sources));
        self
    }

    pub fn fieldset(mut self, fieldset: Fieldset) -> Self {
        self.fieldsets.push(fieldset);
        self
    }

    pub fn form<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> FormSpec + Send + Sync + 'static,
    {
        self.form = Arc::new(factory);
        self
    }

    pub fn inline(mut self, inline: InlineAdmin) -> Self {
        self.inlines.push(inline);
        self
    }

    /// Produce the admin with `rule` applied.
    ///
    /// List-valued attributes are replaced, not merged. Form and inline
    /// names resolve through `registry`.
    ///
    /// # Errors
    /// `Lookup` when a form or inline name is not registered
    pub fn with_rule(mut self, rule: &AdminRule, registry: &AdminRegistry) -> Result<Self, AppError> {
        if let Some(fieldsets) = &rule.fieldsets {
            self.fieldsets = fieldsets.clone();
        }
        if let Some(list_display) = &rule.list_display {
            self.list_display = list_display.clone();
        }
        if let Some(list_filter) = &rule.list_filter {
            self.list_filter = list_filter.clone();
        }
        if let Some(search_fields) = &rule.search_fields {
            self.search_fields = search_fields.clone();
        }
        if let Some(exclude) = &rule.exclude {
            self.exclude = exclude.clone();
        }
        if let Some(raw_id_fields) = &rule.raw_id_fields {
            self.raw_id_fields = raw_id_fields.clone();
        }
        if let Some(prepopulated_fields) = &rule.prepopulated_fields {
            self.prepopulated_fields = prepopulated_fields.clone();
        }
        if let Some(readonly_fields) = &rule.readonly_fields {
            self.readonly_fields = readonly_fields.clone();
        }
        if let Some(field_overrides) = &rule.field_overrides {
            self.field_overrides = field_overrides.clone();
        }
        if let Some(form) = &rule.form {
            self.form = registry.form(form)?;
        }
        if let Some(inlines) = &rule.inlines {
            self.inlines = inlines
                .iter()
                .map(|name| registry.inline(name).map(|factory| factory()))
                .collect::<Result<Vec<_>, _>>()?;
        }
        for (key, value) in &rule.extra {
            self.attributes.insert(key.clone(), value.clone());
        }

        Ok(self)
    }

    /// Rule table key of this admin
    pub fn key(&self) -> String {
        RuleTable::key(&self.app, &self.name)
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fieldsets(&self) -> &[Fieldset] {
        &self.fieldsets
    }

    pub fn get_list_display(&self) -> &[String] {
        &self.list_display
    }

    pub fn get_list_filter(&self) -> &[String] {
        &self.list_filter
    }

    pub fn get_search_fields(&self) -> &[String] {
        &self.search_fields
    }

    pub fn get_exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn get_raw_id_fields(&self) -> &[String] {
        &self.raw_id_fields
    }

    pub fn get_readonly_fields(&self) -> &[String] {
        &self.readonly_fields
    }

    pub fn prepopulated_fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.prepopulated_fields
    }

    pub fn inlines(&self) -> &[InlineAdmin] {
        &self.inlines
    }

    /// Passthrough attribute from the rule table
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Build the edit form: excluded fields removed, field overrides
    /// applied to the fields that exist
    pub fn build_form(&self) -> FormSpec {
        let mut form = (self.form)();
        form.fields
            .retain(|field| !self.exclude.contains(&field.name));

        for (field_name, attrs) in &self.field_overrides {
            match form.get_mut(field_name) {
                Some(field) => {
                    for (key, value) in attrs {
                        field.attrs.insert(key.clone(), value.clone());
                    }
                }
                None => tracing::debug!(
                    admin = %self.key(),
                    field = %field_name,
                    "Field override skipped; field not on form"
                ),
            }
        }

        form
    }

    /// Values of the `list_display` columns for one record
    pub fn changelist_row<T: Serialize>(&self, obj: &T) -> Result<Vec<serde_json::Value>, AppError> {
        let value = serde_json::to_value(obj).map_err(|e| AppError::Internal(e.into()))?;
        Ok(self
            .list_display
            .iter()
            .map(|field| value.get(field).cloned().unwrap_or(serde_json::Value::Null))
            .collect())
    }

    /// Case-insensitive substring search over `search_fields`
    pub fn matches_search<T: Serialize>(&self, obj: &T, query: &str) -> Result<bool, AppError> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(true);
        }

        let value = serde_json::to_value(obj).map_err(|e| AppError::Internal(e.into()))?;
        Ok(self.search_fields.iter().any(|field| {
            value
                .get(field)
                .and_then(serde_json::Value::as_str)
                .is_some_and(|text| text.to_lowercase().contains(&query))
        }))
    }
}

impl std::fmt::Debug for ModelAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAdmin")
            .field("app", &self.app)
            .field("name", &self.name)
            .field("list_display", &self.list_display)
            .field("list_filter", &self.list_filter)
            .field("search_fields", &self.search_fields)
            .field("exclude", &self.exclude)
            .field("inlines", &self.inlines)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}
