use crate::config::LiveConfig;
use crate::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Output of [`preprocess_diagram`]: the diagram body with front-matter and directives stripped,
/// plus everything that was pulled out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessResult {
    pub code: String,
    pub title: Option<String>,
    /// Config fragments in source order (front-matter first).
    pub fragments: Vec<ConfigFragment>,
    /// Positional flags; `offset` is a byte offset into `code`.
    pub flags: Vec<FlagDirective>,
}

impl PreprocessResult {
    /// Folds every fragment into `config`, later fragments winning key by key.
    pub fn apply_fragments(&self, config: &mut LiveConfig) -> Result<()> {
        for fragment in &self.fragments {
            fragment.apply_to(config)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigFragment {
    Init(Map<String, Value>),
    Config(Map<String, Value>),
}

impl ConfigFragment {
    pub fn apply_to(&self, config: &mut LiveConfig) -> Result<()> {
        match self {
            Self::Init(map) => config.apply_init(map),
            Self::Config(map) => config.apply_config(map),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveFlag {
    Wrap,
    NoWrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagDirective {
    pub offset: usize,
    pub flag: DirectiveFlag,
}

pub fn preprocess_diagram(input: &str) -> Result<PreprocessResult> {
    let cleaned = cleanup_text(input);
    let (without_frontmatter, title, frontmatter_config) = process_frontmatter(&cleaned)?;

    let mut fragments = Vec::new();
    if let Some(map) = frontmatter_config {
        fragments.push(ConfigFragment::Init(map));
    }

    let (code, directives) = extract_directives(&without_frontmatter)?;
    let mut flags = Vec::new();
    for (offset, directive) in directives {
        match classify_directive(directive)? {
            Some(Classified::Fragment(f)) => fragments.push(f),
            Some(Classified::Flag(flag)) => flags.push(FlagDirective { offset, flag }),
            None => {}
        }
    }

    Ok(PreprocessResult {
        code,
        title,
        fragments,
        flags,
    })
}

fn cleanup_text(input: &str) -> String {
    static CRLF_RE: OnceLock<Regex> = OnceLock::new();
    let crlf_re = CRLF_RE.get_or_init(|| Regex::new(r"\r\n?").expect("valid regex"));
    crlf_re.replace_all(input, "\n").into_owned()
}

fn process_frontmatter(input: &str) -> Result<(String, Option<String>, Option<Map<String, Value>>)> {
    static FRONTMATTER_RE: OnceLock<Regex> = OnceLock::new();
    let frontmatter_re = FRONTMATTER_RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*-{3}[ \t]*\n(.*?)\n-{3}[ \t]*(?:\n|$)").expect("valid regex")
    });
    let Some(caps) = frontmatter_re.captures(input) else {
        return Ok((input.to_string(), None, None));
    };
    let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
        return Ok((input.to_string(), None, None));
    };

    let raw_yaml: serde_yaml::Value = serde_yaml::from_str(body.as_str())
        .map_err(|e| Error::config(format!("invalid YAML front-matter: {e}")))?;
    let parsed = serde_json::to_value(raw_yaml)
        .map_err(|e| Error::config(format!("invalid YAML front-matter: {e}")))?;

    let mut title = None;
    let mut config = None;
    if let Value::Object(obj) = parsed {
        if let Some(Value::String(t)) = obj.get("title") {
            title = Some(t.trim().to_string());
        }
        match obj.get("config") {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                let mut map = map.clone();
                sanitize_map(&mut map);
                config = Some(map);
            }
            Some(_) => return Err(Error::config("front-matter `config` must be an object")),
        }
    }

    // Keep the stripped lines as blank lines so parser positions still match the source.
    let mut stripped = "\n".repeat(whole.as_str().matches('\n').count());
    stripped.push_str(&input[whole.end()..]);
    Ok((stripped, title, config))
}

#[derive(Debug, Clone)]
struct Directive {
    ty: String,
    args: Option<Value>,
}

enum Classified {
    Fragment(ConfigFragment),
    Flag(DirectiveFlag),
}

/// Removes every `%%{ ... }%%` block, returning the residual text and the parsed directives
/// keyed by the byte offset (in the residual text) where each one stood.
fn extract_directives(text: &str) -> Result<(String, Vec<(usize, Directive)>)> {
    let mut out = String::with_capacity(text.len());
    let mut directives = Vec::new();
    let mut pos = 0;

    while let Some(rel) = text[pos..].find("%%{") {
        let start = pos + rel;
        out.push_str(&text[pos..start]);
        let content_start = start + 3;
        let Some(rel_end) = text[content_start..].find("}%%") else {
            return Err(Error::config("unterminated directive; missing `}%%`"));
        };
        let content_end = content_start + rel_end;
        let raw = &text[content_start..content_end];

        if let Some(d) = parse_directive(raw)? {
            directives.push((out.len(), d));
        }
        for _ in 0..raw.matches('\n').count() {
            out.push('\n');
        }

        pos = content_end + 3;
    }
    out.push_str(&text[pos..]);

    Ok((out, directives))
}

fn parse_directive(raw: &str) -> Result<Option<Directive>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let mut chars = raw.chars().peekable();
    let mut ty = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            ty.push(c);
            chars.next();
            continue;
        }
        break;
    }
    if ty.is_empty() {
        return Err(Error::config(format!("directive has no name: `{raw}`")));
    }

    while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
        chars.next();
    }

    let args = if matches!(chars.peek(), Some(':')) {
        chars.next();
        let rest: String = chars.collect();
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else if rest.starts_with('{') || rest.starts_with('[') {
            // Directive payloads are commonly written with single quotes.
            let json = rest.replace('\'', "\"");
            Some(serde_json::from_str::<Value>(&json).map_err(|e| {
                Error::config(format!("directive `{ty}` payload is not valid JSON: {e}"))
            })?)
        } else {
            Some(Value::String(rest.to_string()))
        }
    } else {
        let rest: String = chars.collect();
        if !rest.trim().is_empty() {
            return Err(Error::config(format!(
                "unexpected text after directive `{ty}`: `{}`",
                rest.trim()
            )));
        }
        None
    };

    Ok(Some(Directive { ty, args }))
}

fn classify_directive(d: Directive) -> Result<Option<Classified>> {
    let object = |ty: &str, args: Option<Value>| -> Result<Map<String, Value>> {
        match args {
            None => Ok(Map::new()),
            Some(Value::Object(mut map)) => {
                sanitize_map(&mut map);
                Ok(map)
            }
            Some(_) => Err(Error::config(format!(
                "directive `{ty}` expects an object payload"
            ))),
        }
    };

    let classified = match d.ty.as_str() {
        "init" | "initialize" => Classified::Fragment(ConfigFragment::Init(object(&d.ty, d.args)?)),
        "config" => Classified::Fragment(ConfigFragment::Config(object(&d.ty, d.args)?)),
        "wrap" if d.args.is_none() => Classified::Flag(DirectiveFlag::Wrap),
        "nowrap" if d.args.is_none() => Classified::Flag(DirectiveFlag::NoWrap),
        other => {
            tracing::debug!(directive = other, "ignoring unsupported directive");
            return Ok(None);
        }
    };
    Ok(Some(classified))
}

fn sanitize_map(map: &mut Map<String, Value>) {
    map.remove("secure");
    map.retain(|k, _| !k.starts_with("__"));
    for (_, v) in map.iter_mut() {
        sanitize_value(v);
    }
}

fn sanitize_value(value: &mut Value) {
    match value {
        Value::Object(map) => sanitize_map(map),
        Value::Array(arr) => {
            for v in arr {
                sanitize_value(v);
            }
        }
        Value::String(s) => {
            let blocked = s.contains('<') || s.contains('>') || s.contains("url(data:");
            if blocked {
                *s = String::new();
            }
        }
        _ => {}
    }
}
