//! Structured meal plans and their plain-text rendering.
//!
//! Plans come from a model, so every field is optional and numbers may arrive
//! as strings. Missing values render as `?`.

use std::fmt::Write as _;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub days: Option<Vec<Day>>,
    #[serde(default)]
    pub shopping_list: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Day {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub totals: Option<Totals>,
    #[serde(default)]
    pub meals: Option<Vec<Meal>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Totals {
    #[serde(default)]
    pub calories: Option<Value>,
    #[serde(default)]
    pub protein_g: Option<Value>,
    #[serde(default)]
    pub carbs_g: Option<Value>,
    #[serde(default)]
    pub fat_g: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meal {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub calories: Option<Value>,
    #[serde(default)]
    pub protein_g: Option<Value>,
    #[serde(default)]
    pub carbs_g: Option<Value>,
    #[serde(default)]
    pub fat_g: Option<Value>,
    #[serde(default)]
    pub prep_time_min: Option<Value>,
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Plan {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl Day {
    /// The day's label, or `Day N` for the zero-based `index`.
    pub fn title(&self, index: usize) -> String {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => format!("Day {}", index + 1),
        }
    }
}

// Totals only fall back when a value is absent; a real zero is shown.
fn present_or_unknown(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "?".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// Meal figures also treat zero and empty strings as unknown.
fn truthy_or_unknown(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => "?".to_string(),
        Some(Value::String(s)) if s.is_empty() => "?".to_string(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => "?".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn totals_line(totals: Option<&Totals>) -> String {
    format!(
        "Totals: {} kcal · P {}g · C {}g · F {}g",
        present_or_unknown(totals.and_then(|t| t.calories.as_ref())),
        present_or_unknown(totals.and_then(|t| t.protein_g.as_ref())),
        present_or_unknown(totals.and_then(|t| t.carbs_g.as_ref())),
        present_or_unknown(totals.and_then(|t| t.fat_g.as_ref())),
    )
}

fn meal_line(meal: &Meal) -> String {
    format!(
        "{} kcal · P {}g · C {}g · F {}g · ⏱ {} min",
        truthy_or_unknown(meal.calories.as_ref()),
        truthy_or_unknown(meal.protein_g.as_ref()),
        truthy_or_unknown(meal.carbs_g.as_ref()),
        truthy_or_unknown(meal.fat_g.as_ref()),
        truthy_or_unknown(meal.prep_time_min.as_ref()),
    )
}

/// Render a plan for the terminal.
pub fn render_text(plan: &Plan) -> String {
    let Some(days) = &plan.days else {
        return "No plan.\n".to_string();
    };

    let mut out = String::new();
    for (idx, day) in days.iter().enumerate() {
        let _ = writeln!(out, "== {} ==", day.title(idx));
        let _ = writeln!(out, "{}", totals_line(day.totals.as_ref()));
        for meal in day.meals.iter().flatten() {
            let _ = writeln!(out, "- {}", meal.name.as_deref().unwrap_or_default());
            let _ = writeln!(out, "  {}", meal_line(meal));
            let _ = writeln!(out, "  Ingredients:");
            for item in meal.ingredients.iter().flatten() {
                let _ = writeln!(out, "    * {item}");
            }
            let _ = writeln!(out, "  Instructions:");
            for line in meal.instructions.as_deref().unwrap_or_default().lines() {
                let _ = writeln!(out, "    {line}");
            }
        }
        out.push('\n');
    }

    if let Some(items) = plan.shopping_list.as_ref().filter(|items| !items.is_empty()) {
        out.push_str("== Shopping List ==\n");
        for item in items {
            let _ = writeln!(out, "* {item}");
        }
        out.push('\n');
    }

    if let Some(notes) = plan.notes.as_deref().filter(|notes| !notes.is_empty()) {
        let _ = writeln!(out, "== Notes ==\n{notes}");
    }

    out
}

/// Prose version of the plan for reading aloud, one sentence per fact.
pub fn spoken_script(plan: &Plan) -> String {
    let Some(days) = &plan.days else {
        return "No plan.".to_string();
    };

    let mut sentences = Vec::new();
    for (idx, day) in days.iter().enumerate() {
        let calories = present_or_unknown(day.totals.as_ref().and_then(|t| t.calories.as_ref()));
        if calories == "?" {
            sentences.push(format!("{}.", day.title(idx)));
        } else {
            sentences.push(format!("{}, about {calories} calories.", day.title(idx)));
        }
        for meal in day.meals.iter().flatten() {
            let Some(name) = meal.name.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };
            let prep = truthy_or_unknown(meal.prep_time_min.as_ref());
            if prep == "?" {
                sentences.push(format!("{name}."));
            } else {
                sentences.push(format!("{name}, ready in {prep} minutes."));
            }
        }
    }
    if let Some(notes) = plan.notes.as_deref().filter(|notes| !notes.trim().is_empty()) {
        sentences.push(notes.trim().to_string());
    }
    sentences.join(" ")
}
