use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use tracing::trace;

use super::TemplateEngine;
use super::TemplateModel;
use crate::constants::ERROR_PATH;
use crate::constants::NOT_FOUND_PATH;
use crate::utils::normalize_path;
use crate::Result;
use crate::TemplateError;

const ERROR_TEMPLATE: &str = r#"<html>
<head><title>Error</title></head>
<body>
<h2>$message</h2>
$errorReport
</body>
</html>
"#;

const NOT_FOUND_TEMPLATE: &str = r#"<html>
<head><title>Page Not Found</title></head>
<body>
<h2>Page Not Found</h2>
<p>The requested page $!requestPath could not be found.</p>
</body>
</html>
"#;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Reference {
        path: Vec<String>,
        silent: bool,
        source: String,
    },
}

#[derive(Debug)]
struct Parsed {
    segments: Vec<Segment>,
    // segments stop where the error was found
    error: Option<(usize, String)>,
}

/// Minimal reference-substituting template engine.
///
/// Understands `$name`, `${name}`, dotted lookups (`$user.name`, `$items.0`),
/// quiet references (`$!name`, rendering nothing when unresolved) and `\$` as
/// a literal dollar. Unresolved references are written out verbatim.
///
/// Templates come from in-memory registrations first, then from files under
/// the template root. Parsed templates are cached when caching is on.
pub struct SimpleTemplateEngine {
    root: PathBuf,
    sources: HashMap<String, String>,
    cache_enabled: bool,
    cache: RwLock<HashMap<String, Arc<Parsed>>>,
}

impl std::fmt::Debug for SimpleTemplateEngine {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SimpleTemplateEngine")
            .field("root", &self.root)
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("cache_enabled", &self.cache_enabled)
            .finish()
    }
}

impl SimpleTemplateEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut sources = HashMap::new();
        sources.insert(ERROR_PATH.to_string(), ERROR_TEMPLATE.to_string());
        sources.insert(NOT_FOUND_PATH.to_string(), NOT_FOUND_TEMPLATE.to_string());
        Self {
            root: root.into(),
            sources,
            cache_enabled: false,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_cache(
        mut self,
        enabled: bool,
    ) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Registers an in-memory template, shadowing any file at `path`
    pub fn with_template(
        mut self,
        path: &str,
        source: impl Into<String>,
    ) -> Self {
        self.sources.insert(normalize_path(path), source.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_path(
        &self,
        path: &str,
    ) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn load(
        &self,
        path: &str,
    ) -> Result<Arc<Parsed>> {
        let path = normalize_path(path);
        if self.cache_enabled {
            if let Some(parsed) = self.cache.read().get(&path) {
                return Ok(parsed.clone());
            }
        }

        let source = match self.sources.get(&path) {
            Some(source) => source.clone(),
            None => {
                let file = self.file_path(&path);
                if !file.is_file() {
                    return Err(TemplateError::NotFound(path).into());
                }
                debug!(template = %path, file = %file.display(), "loading template");
                std::fs::read_to_string(&file).map_err(TemplateError::Io)?
            }
        };

        let parsed = Arc::new(parse(&source));
        if self.cache_enabled {
            self.cache.write().insert(path, parsed.clone());
        }
        Ok(parsed)
    }
}

impl TemplateEngine for SimpleTemplateEngine {
    fn has_template(
        &self,
        path: &str,
    ) -> bool {
        let path = normalize_path(path);
        self.sources.contains_key(&path) || self.file_path(&path).is_file()
    }

    fn merge(
        &self,
        path: &str,
        model: &TemplateModel,
        out: &mut String,
    ) -> Result<()> {
        let parsed = self.load(path)?;
        for segment in &parsed.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Reference {
                    path: keys,
                    silent,
                    source,
                } => match resolve(model, keys) {
                    Some(value) => write_value(value, out),
                    None if *silent => {}
                    None => {
                        trace!(template = %path, reference = %source, "unresolved reference");
                        out.push_str(source);
                    }
                },
            }
        }

        match &parsed.error {
            Some((line, message)) => Err(TemplateError::Parse {
                template: normalize_path(path),
                line: *line,
                message: message.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }

    fn clear_cache(&self) {
        self.cache.write().clear();
    }
}

fn resolve<'a>(
    model: &'a TemplateModel,
    keys: &[String],
) -> Option<&'a Value> {
    let (first, rest) = keys.split_first()?;
    let mut value = model.get(first)?;
    for key in rest {
        value = match value {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

fn write_value(
    value: &Value,
    out: &mut String,
) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn parse(source: &str) -> Parsed {
    let chars: Vec<char> = source.chars().collect();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
        }

        if c == '\\' && chars.get(i + 1) == Some(&'$') {
            text.push('$');
            i += 2;
            continue;
        }
        if c != '$' {
            text.push(c);
            i += 1;
            continue;
        }

        let start = i;
        let mut j = i + 1;
        let silent = chars.get(j) == Some(&'!');
        if silent {
            j += 1;
        }

        if chars.get(j) == Some(&'{') {
            let Some(close) = chars[j + 1..].iter().position(|c| *c == '}') else {
                flush(&mut text, &mut segments);
                return Parsed {
                    segments,
                    error: Some((line, "unclosed reference, expected '}'".to_string())),
                };
            };
            let inner: String = chars[j + 1..j + 1 + close].iter().collect();
            let keys: Vec<String> = inner.trim().split('.').map(str::to_string).collect();
            if keys.iter().any(|k| k.is_empty() || !k.chars().all(is_ident_char)) {
                flush(&mut text, &mut segments);
                return Parsed {
                    segments,
                    error: Some((line, format!("invalid reference '{}'", inner))),
                };
            }
            let end = j + 1 + close + 1;
            flush(&mut text, &mut segments);
            segments.push(Segment::Reference {
                path: keys,
                silent,
                source: chars[start..end].iter().collect(),
            });
            i = end;
            continue;
        }

        if !chars.get(j).copied().is_some_and(is_ident_start) {
            text.push('$');
            i += 1;
            continue;
        }

        let mut keys = Vec::new();
        loop {
            let key_start = j;
            while chars.get(j).copied().is_some_and(is_ident_char) {
                j += 1;
            }
            keys.push(chars[key_start..j].iter().collect::<String>());
            // a dot continues the reference only when an identifier follows
            if chars.get(j) == Some(&'.') && chars.get(j + 1).copied().is_some_and(is_ident_char) {
                j += 1;
            } else {
                break;
            }
        }
        flush(&mut text, &mut segments);
        segments.push(Segment::Reference {
            path: keys,
            silent,
            source: chars[start..j].iter().collect(),
        });
        i = j;
    }

    flush(&mut text, &mut segments);
    Parsed { segments, error: None }
}

fn flush(
    text: &mut String,
    segments: &mut Vec<Segment>,
) {
    if !text.is_empty() {
        segments.push(Segment::Text(std::mem::take(text)));
    }
}
