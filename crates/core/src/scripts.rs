//! Built-in script templates.
//!
//! Templates carry `{placeholder}` variables such as `{child_name}` and
//! `{age}` that are filled in from the submission.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::pipeline::{Script, ValidationError};

/// A script template from the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub text: &'static str,
}

/// The template catalogue, in display order.
pub const SCRIPT_TEMPLATES: &[ScriptTemplate] = &[
    ScriptTemplate {
        id: "script1",
        title: "After 10 lessons: CEFR Pre-A1",
        text: "Hello mum! My name is {child_name}! I am {age} years old. I like football and \
               singing. I go to the park and play football with my friends.",
    },
    ScriptTemplate {
        id: "script2",
        title: "After 50 lessons: CEFR A1",
        text: "Hello mum! It's me, {child_name}. I love playing football with my friends. \
               Yesterday, I played football and volleyball for 2 hours.",
    },
    ScriptTemplate {
        id: "script3",
        title: "After 100 lessons: CEFR A2",
        text: "Hello mum! It's me, {child_name}. I am getting better at English, and my football \
               is also getting better. Did you know that I love volleyball too? When I'm older, I \
               want to become an English teacher, or a professional football player. Thank you \
               for giving me English lessons to help me with my dream!",
    },
];

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Look up a template by id.
pub fn find_template(id: &str) -> Option<&'static ScriptTemplate> {
    SCRIPT_TEMPLATES.iter().find(|t| t.id == id)
}

/// Substitute known variables in `text`.
///
/// Unknown placeholders, and variables with a blank value, are left as-is.
pub fn render(text: &str, vars: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            match vars.get(&caps[1]).map(|v| v.trim()) {
                Some(value) if !value.is_empty() => value.to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Where the text of a script comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptSource {
    /// A template from the catalogue plus its variables.
    Template {
        template_id: String,
        #[serde(default)]
        vars: HashMap<String, String>,
    },
    /// Literal text.
    Literal { text: String },
}

impl ScriptSource {
    /// Resolve the source into a labelled script.
    ///
    /// Templates are labelled with their id; literal scripts with `label`.
    pub fn resolve(&self, label: &str) -> Result<Script, ValidationError> {
        match self {
            Self::Literal { text } => Ok(Script::new(label, text.trim())),
            Self::Template { template_id, vars } => {
                let template = find_template(template_id)
                    .ok_or_else(|| ValidationError::UnknownTemplate(template_id.clone()))?;
                Ok(Script::new(template.id, render(template.text, vars)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_known_variables() {
        let text = render(
            "My name is {child_name}! I am {age} years old.",
            &vars(&[("child_name", "Mia"), ("age", "7")]),
        );
        assert_eq!(text, "My name is Mia! I am 7 years old.");
    }

    #[test]
    fn test_render_keeps_unknown_and_blank() {
        let text = render(
            "{child_name} likes {sport}",
            &vars(&[("child_name", "  "), ("age", "7")]),
        );
        assert_eq!(text, "{child_name} likes {sport}");
    }

    #[test]
    fn test_catalogue_ids_are_unique() {
        for (i, a) in SCRIPT_TEMPLATES.iter().enumerate() {
            for b in &SCRIPT_TEMPLATES[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
        assert!(find_template("script2").is_some());
        assert!(find_template("nope").is_none());
    }

    #[test]
    fn test_resolve_sources() {
        let literal = ScriptSource::Literal {
            text: " Hi there ".to_string(),
        };
        assert_eq!(literal.resolve("s").unwrap(), Script::new("s", "Hi there"));

        let template = ScriptSource::Template {
            template_id: "script1".to_string(),
            vars: vars(&[("child_name", "Leo"), ("age", "6")]),
        };
        let script = template.resolve("ignored").unwrap();
        assert_eq!(script.label, "script1");
        assert!(script.text.starts_with("Hello mum! My name is Leo! I am 6 years old."));

        let unknown = ScriptSource::Template {
            template_id: "script9".to_string(),
            vars: HashMap::new(),
        };
        assert_eq!(
            unknown.resolve("x"),
            Err(ValidationError::UnknownTemplate("script9".to_string()))
        );
    }

    #[test]
    fn test_script_source_json() {
        let source: ScriptSource =
            serde_json::from_str(r#"{"template_id": "script3", "vars": {"child_name": "Ana"}}"#)
                .unwrap();
        assert!(matches!(source, ScriptSource::Template { .. }));

        let source: ScriptSource = serde_json::from_str(r#"{"text": "Hello"}"#).unwrap();
        assert!(matches!(source, ScriptSource::Literal { .. }));
    }
}
