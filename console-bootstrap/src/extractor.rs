//! Reads the console's current start-server settings out of its rendered form.
//!
//! Each field is looked up by a small typed rule instead of one document-wide
//! pattern: an [`ExtractionRule::InputValue`] reads `<input name value>` and an
//! [`ExtractionRule::SelectedOption`] reads the selected `<option>` of a
//! `<select name>`. Rules run in order and a later hit overwrites an earlier
//! one for the same field.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// Field name to the value the console currently shows for it.
pub type FormState = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRule {
    /// `<input name="X" value="Y">`
    InputValue,
    /// `<select name="X">` ... `<option value="Y" selected>`
    SelectedOption,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub field: String,
    pub rule: ExtractionRule,
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<FieldRule>,
}

fn input_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("input[name]").expect("valid input selector"))
}

fn select_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("select[name]").expect("valid select selector"))
}

fn selected_option_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("option[selected]").expect("valid option selector"))
}

fn named(element: &ElementRef<'_>, field: &str) -> bool {
    element.value().attr("name") == Some(field)
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, field: impl Into<String>, rule: ExtractionRule) -> Self {
        self.rules.push(FieldRule {
            field: field.into(),
            rule,
        });
        self
    }

    /// Input rule then select rule for every name, so a selected option wins
    /// over an input of the same name.
    pub fn for_fields<S: AsRef<str>>(names: &[S]) -> Self {
        names.iter().fold(Self::new(), |rules, name| {
            rules
                .with_rule(name.as_ref(), ExtractionRule::InputValue)
                .with_rule(name.as_ref(), ExtractionRule::SelectedOption)
        })
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn evaluate(&self, html: &str) -> FormState {
        let document = Html::parse_document(html);
        let mut state = FormState::new();

        for field_rule in &self.rules {
            let found = match field_rule.rule {
                ExtractionRule::InputValue => input_value(&document, &field_rule.field),
                ExtractionRule::SelectedOption => selected_option(&document, &field_rule.field),
            };
            if let Some(value) = found {
                state.insert(field_rule.field.clone(), value);
            }
        }

        debug!(
            "Extracted {} field(s) with {} rule(s) from {} bytes of markup",
            state.len(),
            self.rules.len(),
            html.len()
        );
        state
    }
}

/// Value of the last `<input>` named `field`.
fn input_value(document: &Html, field: &str) -> Option<String> {
    document
        .select(input_selector())
        .filter(|input| named(input, field))
        .filter_map(|input| input.value().attr("value"))
        .last()
        .map(|value| value.to_string())
}

/// Selected option of the last `<select>` named `field` that has one.
fn selected_option(document: &Html, field: &str) -> Option<String> {
    document
        .select(select_selector())
        .filter(|select| named(select, field))
        .filter_map(|select| {
            select
                .select(selected_option_selector())
                .next()
                .and_then(|option| option.value().attr("value"))
        })
        .last()
        .map(|value| value.to_string())
}

/// Extracts the current value of every name in `expected_names` that the
/// markup carries. Names not listed are ignored.
pub fn extract<S: AsRef<str>>(html: &str, expected_names: &[S]) -> FormState {
    RuleSet::for_fields(expected_names).evaluate(html)
}
