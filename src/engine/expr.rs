// ABOUTME: Compiled step parameter expressions and their resolution against a context
// ABOUTME: String parameters with {{name}} markers become templates of text and context references

use serde_json::{Map, Value};

use super::context::ExecutionContext;

/// One piece of a templated string parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Text(String),
    /// `marker` keeps the original `{{ ... }}` text so an unresolved
    /// reference can be emitted verbatim.
    ContextReference { name: String, marker: String },
}

/// A step parameter after load-time compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Literal(Value),
    Template(Vec<TemplateSegment>),
}

impl ParamValue {
    /// Compile a raw document value. Only strings containing at least one
    /// well-formed `{{name}}` marker become templates.
    pub fn compile(value: Value) -> Self {
        match value {
            Value::String(text) if text.contains("{{") => {
                let segments = parse_template(&text);
                let has_reference = segments
                    .iter()
                    .any(|segment| matches!(segment, TemplateSegment::ContextReference { .. }));

                if has_reference {
                    ParamValue::Template(segments)
                } else {
                    ParamValue::Literal(Value::String(text))
                }
            }
            other => ParamValue::Literal(other),
        }
    }

    /// Resolve against `context`. Missing names are left as their marker text.
    pub fn resolve(&self, context: &ExecutionContext) -> Value {
        match self {
            ParamValue::Literal(value) => value.clone(),
            ParamValue::Template(segments) => {
                let mut rendered = String::new();
                for segment in segments {
                    match segment {
                        TemplateSegment::Text(text) => rendered.push_str(text),
                        TemplateSegment::ContextReference { name, marker } => {
                            match context.render(name) {
                                Some(value) => rendered.push_str(&value),
                                None => rendered.push_str(marker),
                            }
                        }
                    }
                }
                Value::String(rendered)
            }
        }
    }

    /// Context names this parameter reads.
    pub fn references(&self) -> Vec<&str> {
        match self {
            ParamValue::Literal(_) => Vec::new(),
            ParamValue::Template(segments) => segments
                .iter()
                .filter_map(|segment| match segment {
                    TemplateSegment::ContextReference { name, .. } => Some(name.as_str()),
                    TemplateSegment::Text(_) => None,
                })
                .collect(),
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        ParamValue::compile(value)
    }
}

/// Resolve every parameter of a step, preserving declaration order.
pub fn resolve_params<'a, I>(params: I, context: &ExecutionContext) -> Map<String, Value>
where
    I: IntoIterator<Item = (&'a String, &'a ParamValue)>,
{
    params
        .into_iter()
        .map(|(key, param)| (key.clone(), param.resolve(context)))
        .collect()
}

fn parse_template(text: &str) -> Vec<TemplateSegment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };

        let name = after_open[..end].trim();
        let marker = &rest[start..start + 2 + end + 2];
        literal.push_str(&rest[..start]);

        if is_reference_name(name) {
            if !literal.is_empty() {
                segments.push(TemplateSegment::Text(std::mem::take(&mut literal)));
            }
            segments.push(TemplateSegment::ContextReference {
                name: name.to_string(),
                marker: marker.to_string(),
            });
        } else {
            literal.push_str(marker);
        }

        rest = &rest[start + 2 + end + 2..];
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        segments.push(TemplateSegment::Text(literal));
    }

    segments
}

fn is_reference_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
