//! Reusable query templates.
//!
//! A template skeleton is query text with numbered placeholder markers in
//! snippet syntax: `${1:metric}`. The text after the colon names one of the
//! template's declared parameters.

/// What kind of value a template parameter holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Metric,
    Range,
    LabelName,
    LabelValue,
    Number,
}

impl ParamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamKind::Metric => "metric",
            ParamKind::Range => "range",
            ParamKind::LabelName => "label name",
            ParamKind::LabelValue => "label value",
            ParamKind::Number => "number",
        }
    }
}

/// A named template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateParam {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: &'static str,
    pub optional: bool,
}

/// A named, multi-placeholder query skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub skeleton: &'static str,
    pub parameters: &'static [TemplateParam],
}

/// A piece of a parsed skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Placeholder { index: u32, name: &'a str },
}

impl Template {
    /// Split the skeleton into literal text and placeholders.
    pub fn segments(&self) -> Vec<Segment<'static>> {
        parse_skeleton(self.skeleton)
    }

    /// Look up a declared parameter by name.
    pub fn param(&self, name: &str) -> Option<&'static TemplateParam> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// The skeleton with every placeholder replaced by its default.
    pub fn render_defaults(&self) -> String {
        self.render(|param| param.default.to_string())
    }

    /// Snippet text for editors: `${1:http_requests_total}`.
    pub fn snippet(&self) -> String {
        let mut out = String::with_capacity(self.skeleton.len());
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(&escape_snippet(text)),
                Segment::Placeholder { index, name } => {
                    let default = self.param(name).map(|p| p.default).unwrap_or(name);
                    out.push_str(&format!("${{{}:{}}}", index, escape_snippet(default)));
                }
            }
        }
        out
    }

    fn render(&self, value: impl Fn(&TemplateParam) -> String) -> String {
        let mut out = String::with_capacity(self.skeleton.len());
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder { name, .. } => match self.param(name) {
                    Some(param) => out.push_str(&value(param)),
                    None => out.push_str(name),
                },
            }
        }
        out
    }
}

/// Parse `${n:name}` markers out of a skeleton.
///
/// Malformed markers are kept as literal text.
pub fn parse_skeleton(skeleton: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(found) = skeleton[cursor..].find("${") {
        let marker_start = cursor + found;
        match parse_marker(&skeleton[marker_start..]) {
            Some((index, name, len)) => {
                if marker_start > literal_start {
                    segments.push(Segment::Literal(&skeleton[literal_start..marker_start]));
                }
                segments.push(Segment::Placeholder { index, name });
                cursor = marker_start + len;
                literal_start = cursor;
            }
            None => cursor = marker_start + 2,
        }
    }

    if literal_start < skeleton.len() {
        segments.push(Segment::Literal(&skeleton[literal_start..]));
    }
    segments
}

/// Parse one marker at the start of `text`; returns (index, name, byte length).
fn parse_marker(text: &str) -> Option<(u32, &str, usize)> {
    let body = text.strip_prefix("${")?;
    let colon = body.find(':')?;
    let close = body.find('}')?;
    if close < colon {
        return None;
    }
    let index = body[..colon].parse().ok()?;
    let name = &body[colon + 1..close];
    if name.is_empty() {
        return None;
    }
    Some((index, name, 2 + close + 1))
}

fn escape_snippet(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('$', "\\$")
        .replace('}', "\\}")
}
