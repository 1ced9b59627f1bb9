//! Path template compilation.
//!
//! A template mixes literal text with `{name}` (one non-slash segment) and
//! `{name:pattern}` (custom regex) tokens. Each token becomes a named capture
//! group; literal text is escaped. Terminal routes anchor both ends, subrouters
//! anchor only the start so they can consume a prefix.

use std::sync::Arc;

use regex::Regex;

use super::RouterError;

const DEFAULT_VAR_PATTERN: &str = "[^/]+";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Anchor {
    /// `^...$`: the whole remainder must match.
    Full,
    /// `^...`: only a leading prefix must match.
    Prefix,
}

/// One successful match: where it ended and the captured variables in
/// template order.
#[derive(Debug)]
pub(crate) struct TemplateMatch {
    pub end: usize,
    pub vars: Vec<(Arc<str>, String)>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledTemplate {
    source: String,
    regex: Regex,
    /// (variable name, capture group name), left to right.
    vars: Vec<(Arc<str>, String)>,
}

impl CompiledTemplate {
    pub(crate) fn compile(template: &str, anchor: Anchor) -> Result<Self, RouterError> {
        let invalid = |reason: &'static str| RouterError::InvalidTemplate {
            template: template.to_string(),
            reason,
        };

        let mut pattern = String::with_capacity(template.len() + 8);
        pattern.push('^');
        let mut vars = Vec::with_capacity(template.matches('{').count());
        let mut literal = String::new();
        let mut chars = template.char_indices();

        while let Some((start, c)) = chars.next() {
            match c {
                '{' => {
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();

                    // Custom patterns may contain their own braces (`{id:[0-9]{3}}`).
                    let mut depth = 1usize;
                    let mut end = None;
                    for (i, c) in chars.by_ref() {
                        match c {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    end = Some(i);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    let end = end.ok_or_else(|| invalid("unclosed '{'"))?;
                    let token = &template[start + 1..end];
                    let (name, var_pattern) = match token.split_once(':') {
                        Some((name, p)) => (name.trim(), p),
                        None => (token.trim(), DEFAULT_VAR_PATTERN),
                    };
                    if name.is_empty() {
                        return Err(invalid("empty variable name"));
                    }
                    if var_pattern.is_empty() {
                        return Err(invalid("empty variable pattern"));
                    }

                    let group = format!("kr_var{}", vars.len());
                    pattern.push_str("(?P<");
                    pattern.push_str(&group);
                    pattern.push('>');
                    pattern.push_str(var_pattern);
                    pattern.push(')');
                    vars.push((Arc::from(name), group));
                }
                '}' => return Err(invalid("unbalanced '}'")),
                other => literal.push(other),
            }
        }
        pattern.push_str(&regex::escape(&literal));
        if anchor == Anchor::Full {
            pattern.push('$');
        }

        let regex = Regex::new(&pattern).map_err(|source| RouterError::InvalidPattern {
            template: template.to_string(),
            source,
        })?;

        Ok(Self {
            source: template.to_string(),
            regex,
            vars,
        })
    }

    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    #[cfg(test)]
    pub(crate) fn var_names(&self) -> Vec<&str> {
        self.vars.iter().map(|(name, _)| name.as_ref()).collect()
    }

    pub(crate) fn matches(&self, path: &str) -> Option<TemplateMatch> {
        let caps = self.regex.captures(path)?;
        let end = caps.get(0).map_or(0, |m| m.end());
        let vars = self
            .vars
            .iter()
            .map(|(name, group)| {
                let value = caps.name(group).map_or("", |m| m.as_str());
                (Arc::clone(name), value.to_string())
            })
            .collect();
        Some(TemplateMatch { end, vars })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_path() {
        let t = CompiledTemplate::compile("/", Anchor::Full).unwrap();
        assert!(t.matches("/").is_some());
        assert!(t.matches("/x").is_none());
        assert!(t.var_names().is_empty());
    }

    #[test]
    fn test_parameterized_path() {
        let t = CompiledTemplate::compile("/items/{id}", Anchor::Full).unwrap();
        let m = t.matches("/items/123").unwrap();
        assert_eq!(m.vars, vec![(Arc::from("id"), "123".to_string())]);
        assert!(t.matches("/items/1/2").is_none());
    }

    #[test]
    fn test_custom_pattern_with_nested_braces_and_groups() {
        let t = CompiledTemplate::compile("/v/{code:([a-z])[0-9]{2}}/{rest:.*}", Anchor::Full)
            .unwrap();
        let m = t.matches("/v/a12/x/y").unwrap();
        assert_eq!(t.var_names(), vec!["code", "rest"]);
        assert_eq!(m.vars[0].1, "a12");
        assert_eq!(m.vars[1].1, "x/y");
        assert!(t.matches("/v/a1/x").is_none());
    }

    #[test]
    fn test_literals_are_escaped() {
        let t = CompiledTemplate::compile("/apps.example.com/v1", Anchor::Full).unwrap();
        assert!(t.matches("/apps.example.com/v1").is_some());
        assert!(t.matches("/appsXexampleXcom/v1").is_none());
    }

    #[test]
    fn test_prefix_anchor_reports_consumed_length() {
        let t = CompiledTemplate::compile("/ns/{ns}", Anchor::Prefix).unwrap();
        let m = t.matches("/ns/default/pods").unwrap();
        assert_eq!(m.end, "/ns/default".len());
        assert!(t.matches("/other/ns/default").is_none());
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(
            CompiledTemplate::compile("/a/{id", Anchor::Full),
            Err(RouterError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            CompiledTemplate::compile("/a/id}", Anchor::Full),
            Err(RouterError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            CompiledTemplate::compile("/a/{:x}", Anchor::Full),
            Err(RouterError::InvalidTemplate { .. })
        ));
        assert!(matches!(
            CompiledTemplate::compile("/a/{id:(}", Anchor::Full),
            Err(RouterError::InvalidPattern { .. })
        ));
    }
}
