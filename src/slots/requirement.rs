use crate::slots::error::SlotError;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// One member of a category's demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementEntry {
    /// A specific named slot.
    Named(String),
    /// That many fungible numbered slots.
    Count(u32),
}

/// Per-category demand for named slots and numbered slot counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotRequirement {
    categories: BTreeMap<String, Vec<RequirementEntry>>,
}

impl SlotRequirement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mentions a category without asking for anything in it.
    pub fn with_named(mut self, category: impl Into<String>, slot: impl Into<String>) -> Self {
        self.categories
            .entry(category.into())
            .or_default()
            .push(RequirementEntry::Named(slot.into()));
        self
    }

    pub fn with_count(mut self, category: impl Into<String>, count: u32) -> Self {
        self.categories
            .entry(category.into())
            .or_default()
            .push(RequirementEntry::Count(count));
        self
    }

    /// Parses the mapping literal, e.g. `{addons: [left, right, 2]}`.
    pub fn parse(text: &str) -> Result<Self, SlotError> {
        match SlotSelector::parse(text)? {
            SlotSelector::Detailed(requirement) => Ok(requirement),
            SlotSelector::Categories(_) => Err(SlotError::invalid(
                "slots have to be declared as `{category: [slots]}`",
            )),
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[RequirementEntry])> {
        self.categories
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    pub fn entries(&self, category: &str) -> Option<&[RequirementEntry]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn validate(&self) -> Result<(), SlotError> {
        for (category, entries) in &self.categories {
            validate_name(category, "category")?;
            for entry in entries {
                if let RequirementEntry::Named(slot) = entry {
                    validate_name(slot, "slot")?;
                }
            }
        }
        Ok(())
    }
}

/// Sum of the counts listed for one category.
pub(crate) fn total_count(entries: &[RequirementEntry]) -> u32 {
    entries
        .iter()
        .filter_map(|entry| match entry {
            RequirementEntry::Count(count) => Some(*count),
            RequirementEntry::Named(_) => None,
        })
        .fold(0u32, |acc, count| acc.saturating_add(count))
}

pub(crate) fn named_slots(entries: &[RequirementEntry]) -> impl Iterator<Item = &str> {
    entries.iter().filter_map(|entry| match entry {
        RequirementEntry::Named(name) => Some(name.as_str()),
        RequirementEntry::Count(_) => None,
    })
}

/// What an operation should act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSelector {
    Detailed(SlotRequirement),
    /// Whole categories. Attach fills every vacant slot, drop and delete
    /// act on every slot.
    Categories(Vec<String>),
}

impl SlotSelector {
    pub fn categories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SlotSelector::Categories(names.into_iter().map(Into::into).collect())
    }

    pub fn parse(text: &str) -> Result<Self, SlotError> {
        let value: Value = serde_yaml::from_str(text)
            .map_err(|err| SlotError::invalid(format!("unreadable slot literal: {}", err)))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, SlotError> {
        match value {
            Value::Mapping(map) => {
                let mut requirement = SlotRequirement::new();
                for (key, entries) in map {
                    let Value::String(category) = key else {
                        return Err(SlotError::invalid(format!(
                            "category name must be a string, got {}",
                            render(key)
                        )));
                    };
                    validate_name(category, "category")?;
                    let Value::Sequence(items) = entries else {
                        return Err(SlotError::invalid(format!(
                            "slots for '{}' must be a list, got {}",
                            category,
                            render(entries)
                        )));
                    };
                    let list = requirement.categories.entry(category.clone()).or_default();
                    for item in items {
                        list.push(parse_entry(category, item)?);
                    }
                }
                Ok(SlotSelector::Detailed(requirement))
            }
            Value::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(name) => validate_name(name, "category").map(|()| name.clone()),
                    other => Err(SlotError::invalid(format!(
                        "category name must be a string, got {}",
                        render(other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(SlotSelector::Categories),
            other => Err(SlotError::invalid(format!(
                "slots have to be declared as `{{category: [slots]}}` or `[categories]`, got {}",
                render(other)
            ))),
        }
    }

    pub fn category_names(&self) -> Vec<&str> {
        match self {
            SlotSelector::Detailed(requirement) => {
                requirement.categories().map(|(name, _)| name).collect()
            }
            SlotSelector::Categories(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), SlotError> {
        match self {
            SlotSelector::Detailed(requirement) => requirement.validate(),
            SlotSelector::Categories(names) => names
                .iter()
                .try_for_each(|name| validate_name(name, "category")),
        }
    }
}

impl From<SlotRequirement> for SlotSelector {
    fn from(requirement: SlotRequirement) -> Self {
        SlotSelector::Detailed(requirement)
    }
}

fn parse_entry(category: &str, item: &Value) -> Result<RequirementEntry, SlotError> {
    match item {
        Value::String(name) => {
            validate_name(name, "slot")?;
            Ok(RequirementEntry::Named(name.clone()))
        }
        Value::Number(number) => number
            .as_u64()
            .and_then(|count| u32::try_from(count).ok())
            .map(RequirementEntry::Count)
            .ok_or_else(|| {
                SlotError::invalid(format!(
                    "slot count in '{}' must be a non-negative integer, got {}",
                    category, number
                ))
            }),
        other => Err(SlotError::invalid(format!(
            "slot in '{}' must be a name or a count, got {}",
            category,
            render(other)
        ))),
    }
}

fn validate_name(name: &str, what: &str) -> Result<(), SlotError> {
    if name.trim().is_empty() {
        return Err(SlotError::invalid(format!("{} name must not be empty", what)));
    }
    Ok(())
}

fn render(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|text| text.trim().to_string())
        .unwrap_or_else(|_| "<unprintable>".to_string())
}
