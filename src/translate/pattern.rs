//! Pattern rule compilation. A rule whose regex does not compile, or whose
//! template references a group the regex does not have, is malformed and
//! gets dropped from the catalog with a warning.

use regex::Regex;

use super::PatternRule;

#[derive(Debug)]
pub enum RuleError {
    InvalidPattern(regex::Error),
    UnknownGroup(String),
    UnterminatedGroup,
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::InvalidPattern(e) => write!(f, "invalid pattern: {e}"),
            RuleError::UnknownGroup(name) => {
                write!(f, "replacement references unknown group: {name}")
            }
            RuleError::UnterminatedGroup => write!(f, "replacement has an unterminated ${{...}}"),
        }
    }
}

impl std::error::Error for RuleError {}

impl From<regex::Error> for RuleError {
    fn from(e: regex::Error) -> Self {
        RuleError::InvalidPattern(e)
    }
}

/// A validated, ready-to-run pattern rule.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    regex: Regex,
    replacement: String,
}

impl CompiledRule {
    pub fn compile(rule: &PatternRule) -> Result<Self, RuleError> {
        let regex = Regex::new(&rule.pattern)?;
        for group in template_groups(&rule.replacement)? {
            if !has_group(&regex, group) {
                return Err(RuleError::UnknownGroup(group.to_string()));
            }
        }
        Ok(Self {
            regex,
            replacement: rule.replacement.clone(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// Substitutes the first match. None when the rule does not match.
    pub fn apply(&self, text: &str) -> Option<String> {
        if !self.regex.is_match(text) {
            return None;
        }
        Some(self.regex.replace(text, self.replacement.as_str()).into_owned())
    }
}

fn has_group(regex: &Regex, group: &str) -> bool {
    match group.parse::<usize>() {
        Ok(index) => index < regex.captures_len(),
        Err(_) => regex.capture_names().flatten().any(|name| name == group),
    }
}

/// Group references in a replacement template, using the same reading as
/// `regex::Captures::expand`: `$$` is a literal dollar, `${name}` is braced,
/// `$name` takes the longest run of `[A-Za-z0-9_]`.
fn template_groups(template: &str) -> Result<Vec<&str>, RuleError> {
    let mut groups = Vec::new();
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        rest = &rest[pos + 1..];
        if let Some(after) = rest.strip_prefix('$') {
            rest = after;
        } else if let Some(after) = rest.strip_prefix('{') {
            let close = after.find('}').ok_or(RuleError::UnterminatedGroup)?;
            groups.push(&after[..close]);
            rest = &after[close + 1..];
        } else {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            if len > 0 {
                groups.push(&rest[..len]);
            }
            rest = &rest[len..];
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn applies_numbered_groups() {
        let rule = CompiledRule::compile(&PatternRule::new(
            r"^Страница (\d+) из (\d+)$",
            "Page $1 of $2",
        ))
        .unwrap();
        assert_eq!(rule.apply("Страница 3 из 10").as_deref(), Some("Page 3 of 10"));
        assert_eq!(rule.apply("Страница три"), None);
    }

    #[test]
    fn applies_named_groups() {
        let rule = CompiledRule::compile(&PatternRule::new(
            r"^Привет, (?P<name>.+)!$",
            "Hello, ${name}!",
        ))
        .unwrap();
        assert_eq!(rule.apply("Привет, Аня!").as_deref(), Some("Hello, Аня!"));
    }

    #[rstest]
    #[case(r"^(\d+ комментари", "$1 comments")]
    #[case(r"^(\d+) лайков$", "$2 likes")]
    #[case(r"^(\d+) лайков$", "$1likes")]
    #[case(r"^(?P<n>\d+) лайков$", "${count} likes")]
    #[case(r"^(\d+) лайков$", "${1 likes")]
    fn rejects_malformed_rules(#[case] pattern: &str, #[case] replacement: &str) {
        assert!(CompiledRule::compile(&PatternRule::new(pattern, replacement)).is_err());
    }

    #[test]
    fn literal_dollar_is_not_a_group() {
        let rule = CompiledRule::compile(&PatternRule::new(r"^Цена (\d+)$", "Price $$$1")).unwrap();
        assert_eq!(rule.apply("Цена 5").as_deref(), Some("Price $5"));
    }
}
