//! Rule compilation.
//!
//! A handler declares *what* it responds to with a [`RuleSpec`] and/or a
//! list of command words. [`RuleCompiler`] turns those declarations into
//! anchored regular expressions, once, at bind time.
//!
//! # Placeholders
//!
//! | Placeholder | Expands to                                   |
//! |-------------|----------------------------------------------|
//! | `$nickname` | the bot's nick, regex-escaped                |
//! | `$nick`     | the bot's nick followed by `,` or `:` and spaces |
//!
//! `$nickname` is replaced first so that it is never read as `$nick`.
//!
//! # Shapes
//!
//! | Declaration                  | Compiled pattern                                 |
//! |------------------------------|--------------------------------------------------|
//! | `pattern`                    | `pattern`                                        |
//! | `prefix`, `pattern`          | `prefix` `pattern`                               |
//! | `commands`, `pattern`        | `P(c1\|c2)(?: +(pattern))?`                      |
//! | `prefix`, `commands`, `pattern` | `prefix(c1\|c2)(?: +\|$)pattern`             |
//! | command list                 | `P(c1\|c2)(?: +(.+))?`                           |
//!
//! `P` is the configured command prefix, escaped. Command words are always
//! capture group 1. Every pattern must match the whole text.

use std::fmt;

use regex::{Captures, Regex};

use crate::error::RuleError;
use crate::settings::BotSettings;

// ============================================================================
// Rule Spec
// ============================================================================

/// A declarative rule, before placeholder substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSpec {
    /// A single pattern.
    Pattern(String),
    /// An addressing prefix followed by a pattern.
    Prefixed {
        /// Prefix, placeholders substituted.
        prefix: String,
        /// Pattern, taken literally.
        pattern: String,
    },
    /// Prefixed command words with an optional argument pattern.
    Commands {
        /// Command words.
        commands: Vec<String>,
        /// Argument pattern, captured as group 2.
        pattern: String,
    },
    /// An addressing prefix, command words, then a pattern.
    PrefixedCommands {
        /// Prefix, placeholders substituted.
        prefix: String,
        /// Command words.
        commands: Vec<String>,
        /// Pattern following the command.
        pattern: String,
    },
}

impl RuleSpec {
    /// A single pattern.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(pattern.into())
    }

    /// An addressing prefix followed by a pattern.
    pub fn prefixed(prefix: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Prefixed {
            prefix: prefix.into(),
            pattern: pattern.into(),
        }
    }

    /// Command words with an argument pattern.
    pub fn commands<I, S>(commands: I, pattern: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Commands {
            commands: commands.into_iter().map(Into::into).collect(),
            pattern: pattern.into(),
        }
    }

    /// An addressing prefix, command words, then a pattern.
    pub fn prefixed_commands<I, S>(
        prefix: impl Into<String>,
        commands: I,
        pattern: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::PrefixedCommands {
            prefix: prefix.into(),
            commands: commands.into_iter().map(Into::into).collect(),
            pattern: pattern.into(),
        }
    }
}

impl From<&str> for RuleSpec {
    fn from(pattern: &str) -> Self {
        Self::pattern(pattern)
    }
}

impl From<String> for RuleSpec {
    fn from(pattern: String) -> Self {
        Self::Pattern(pattern)
    }
}

// ============================================================================
// Compiled Rule
// ============================================================================

/// A compiled, anchored rule.
///
/// Point-capable rules carry a second pattern that also accepts a trailing
/// `-> nick` (or `→ nick`) redirect. The redirect form is tried first; on
/// either form the last capture group holds the redirect target, empty when
/// there is none.
#[derive(Clone)]
pub struct Rule {
    source: String,
    plain: Regex,
    redirect: Option<Regex>,
}

impl Rule {
    /// The pattern after placeholder substitution, before anchoring.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns `true` if this rule accepts a redirect suffix.
    pub fn is_point(&self) -> bool {
        self.redirect.is_some()
    }

    /// Full-matches `text` against the rule.
    pub fn matches(&self, text: &str) -> Option<RuleMatch> {
        if let Some(redirect) = &self.redirect {
            if let Some(caps) = redirect.captures(text) {
                return Some(RuleMatch::from_point(&caps));
            }
            return self.plain.captures(text).map(|c| RuleMatch::from_point(&c));
        }
        self.plain.captures(text).map(|c| RuleMatch::from_plain(&c))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("source", &self.source)
            .field("point", &self.is_point())
            .finish()
    }
}

/// The capture groups of a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleMatch {
    groups: Vec<Option<String>>,
    redirect: Option<String>,
}

impl RuleMatch {
    fn captured(caps: &Captures<'_>) -> Vec<Option<String>> {
        caps.iter()
            .map(|m| m.map(|m| m.as_str().to_string()))
            .collect()
    }

    fn from_plain(caps: &Captures<'_>) -> Self {
        Self {
            groups: Self::captured(caps),
            redirect: None,
        }
    }

    fn from_point(caps: &Captures<'_>) -> Self {
        let groups = Self::captured(caps);
        let redirect = groups
            .last()
            .and_then(Option::as_deref)
            .filter(|target| !target.is_empty())
            .map(str::to_string);
        Self { groups, redirect }
    }

    /// Capture group `n`; group 0 is the whole text.
    pub fn group(&self, n: usize) -> Option<&str> {
        self.groups.get(n).and_then(Option::as_deref)
    }

    /// Every capture group, including group 0.
    pub fn groups(&self) -> &[Option<String>] {
        &self.groups
    }

    /// The redirect target, if the text ended in `-> nick`.
    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles rule declarations against one bot identity.
#[derive(Debug, Clone)]
pub struct RuleCompiler {
    nick: String,
    prefix: String,
}

impl RuleCompiler {
    /// Creates a compiler for the given bot settings.
    pub fn new(settings: &BotSettings) -> Self {
        Self {
            nick: settings.nick.clone(),
            prefix: settings.prefix.clone(),
        }
    }

    /// The bot nick rules are compiled against.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Replaces `$nickname` and `$nick` in `pattern`.
    pub fn substitute(&self, pattern: &str) -> String {
        let nick = regex::escape(&self.nick);
        pattern
            .replace("$nickname", &nick)
            .replace("$nick", &format!("{nick}[,:] +"))
    }

    /// Builds the unanchored pattern text for a rule.
    pub fn expand(&self, handler: &str, spec: &RuleSpec) -> Result<String, RuleError> {
        Ok(match spec {
            RuleSpec::Pattern(pattern) => self.substitute(pattern),
            RuleSpec::Prefixed { prefix, pattern } => {
                format!("{}{pattern}", self.substitute(prefix))
            }
            RuleSpec::Commands { commands, pattern } => format!(
                "{}({})(?: +({pattern}))?",
                regex::escape(&self.prefix),
                alternation(handler, commands)?
            ),
            RuleSpec::PrefixedCommands {
                prefix,
                commands,
                pattern,
            } => format!(
                "{}({})(?: +|$){pattern}",
                self.substitute(prefix),
                alternation(handler, commands)?
            ),
        })
    }

    /// Builds the unanchored pattern text for a bare command list.
    pub fn expand_commands(&self, handler: &str, commands: &[String]) -> Result<String, RuleError> {
        Ok(format!(
            "{}({})(?: +(.+))?",
            regex::escape(&self.prefix),
            alternation(handler, commands)?
        ))
    }

    /// Compiles a rule declaration.
    pub fn compile(&self, handler: &str, spec: &RuleSpec, point: bool) -> Result<Rule, RuleError> {
        let source = self.expand(handler, spec)?;
        build(handler, source, point)
    }

    /// Compiles a bare command list.
    pub fn compile_commands(
        &self,
        handler: &str,
        commands: &[String],
        point: bool,
    ) -> Result<Rule, RuleError> {
        let source = self.expand_commands(handler, commands)?;
        build(handler, source, point)
    }
}

fn alternation(handler: &str, commands: &[String]) -> Result<String, RuleError> {
    if commands.is_empty() {
        return Err(RuleError::EmptyCommands {
            handler: handler.to_string(),
        });
    }
    Ok(commands.join("|"))
}

fn anchored(handler: &str, pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| RuleError::InvalidPattern {
        handler: handler.to_string(),
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn build(handler: &str, source: String, point: bool) -> Result<Rule, RuleError> {
    if !point {
        let plain = anchored(handler, &source)?;
        return Ok(Rule {
            source,
            plain,
            redirect: None,
        });
    }

    // Validate the bare pattern first so errors point at the user's text.
    anchored(handler, &source)?;
    let plain = anchored(handler, &format!("{source}()"))?;
    let redirect = anchored(handler, &format!(r"{source}\s(?:->|→)\s(\S*)"))?;
    Ok(Rule {
        source,
        plain,
        redirect: Some(redirect),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler() -> RuleCompiler {
        RuleCompiler::new(&BotSettings::new("tern").with_prefix("."))
    }

    #[test]
    fn test_substitution_order() {
        let c = RuleCompiler::new(&BotSettings::new("t.bot"));
        assert_eq!(c.substitute("$nickname!"), r"t\.bot!");
        assert_eq!(c.substitute("$nick hi"), r"t\.bot[,:] + hi");
    }

    #[test]
    fn test_single_pattern() {
        let rule = compiler()
            .compile("hello", &RuleSpec::pattern("(?i)hi,? $nickname"), false)
            .unwrap();
        assert!(rule.matches("hi tern").is_some());
        assert!(rule.matches("Hi, tern").is_some());
        assert!(rule.matches("hi ternary").is_none());
    }

    #[test]
    fn test_full_match_only() {
        let rule = compiler()
            .compile("ping", &RuleSpec::pattern("ping"), false)
            .unwrap();
        assert!(rule.matches("ping").is_some());
        assert!(rule.matches("ping pong").is_none());
        assert!(rule.matches("a ping").is_none());
    }

    #[test]
    fn test_prefixed_pattern() {
        let rule = compiler()
            .compile("hi", &RuleSpec::prefixed("$nick", "hello (.*)"), false)
            .unwrap();
        let m = rule.matches("tern: hello world").unwrap();
        assert_eq!(m.group(1), Some("world"));
        assert!(rule.matches("tern,  hello you").is_some());
        assert!(rule.matches("tern hello you").is_none());
    }

    #[test]
    fn test_commands_with_pattern() {
        let rule = compiler()
            .compile("seen", &RuleSpec::commands(["seen", "last"], r"(\S+)"), false)
            .unwrap();
        let m = rule.matches(".seen alice").unwrap();
        assert_eq!(m.group(1), Some("seen"));
        assert_eq!(m.group(2), Some("alice"));

        let m = rule.matches(".last").unwrap();
        assert_eq!(m.group(1), Some("last"));
        assert_eq!(m.group(2), None);

        assert!(rule.matches("seen alice").is_none());
    }

    #[test]
    fn test_prefixed_commands() {
        let rule = compiler()
            .compile(
                "reload",
                &RuleSpec::prefixed_commands("$nick", ["reload"], r"(\S+)?"),
                false,
            )
            .unwrap();
        let m = rule.matches("tern: reload weather").unwrap();
        assert_eq!(m.group(1), Some("reload"));
        assert_eq!(m.group(2), Some("weather"));

        let m = rule.matches("tern: reload").unwrap();
        assert_eq!(m.group(2), None);

        assert!(rule.matches("tern: reloadweather").is_none());
    }

    #[test]
    fn test_prefixed_commands_keep_required_pattern() {
        let rule = compiler()
            .compile(
                "tell",
                &RuleSpec::prefixed_commands("$nick", ["tell"], r"(\S+) (.+)"),
                false,
            )
            .unwrap();
        assert!(rule.matches("tern: tell").is_none());
        let m = rule.matches("tern: tell bob hi there").unwrap();
        assert_eq!(m.group(2), Some("bob"));
        assert_eq!(m.group(3), Some("hi there"));
    }

    #[test]
    fn test_command_list() {
        let commands = vec!["ping".to_string(), "p".to_string()];
        let rule = compiler().compile_commands("ping", &commands, false).unwrap();
        let m = rule.matches(".ping").unwrap();
        assert_eq!(m.group(1), Some("ping"));
        assert_eq!(m.group(2), None);

        let m = rule.matches(".p now please").unwrap();
        assert_eq!(m.group(1), Some("p"));
        assert_eq!(m.group(2), Some("now please"));

        assert!(rule.matches(".pingx").is_none());
    }

    #[test]
    fn test_prefix_is_literal() {
        let c = RuleCompiler::new(&BotSettings::new("tern").with_prefix("?"));
        let rule = c.compile_commands("help", &["help".to_string()], false).unwrap();
        assert!(rule.matches("?help").is_some());
        assert!(rule.matches("help").is_none());
    }

    #[test]
    fn test_point_redirect() {
        let rule = compiler()
            .compile("foo", &RuleSpec::pattern(r"\.(foo)\s(.*)"), true)
            .unwrap();
        assert!(rule.is_point());

        let m = rule.matches(".foo bar").unwrap();
        assert_eq!(m.group(1), Some("foo"));
        assert_eq!(m.group(2), Some("bar"));
        assert_eq!(m.redirect(), None);

        let m = rule.matches(".foo bar -> alice").unwrap();
        assert_eq!(m.group(2), Some("bar"));
        assert_eq!(m.redirect(), Some("alice"));

        let m = rule.matches(".foo bar → bob").unwrap();
        assert_eq!(m.redirect(), Some("bob"));
    }

    #[test]
    fn test_empty_commands_rejected() {
        let err = compiler().compile_commands("x", &[], false).unwrap_err();
        assert!(matches!(err, RuleError::EmptyCommands { .. }));

        let err = compiler()
            .compile("x", &RuleSpec::commands(Vec::<String>::new(), "(.*)"), false)
            .unwrap_err();
        assert!(matches!(err, RuleError::EmptyCommands { .. }));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = compiler()
            .compile("broken", &RuleSpec::pattern("(unclosed"), false)
            .unwrap_err();
        match err {
            RuleError::InvalidPattern {
                handler, pattern, ..
            } => {
                assert_eq!(handler, "broken");
                assert_eq!(pattern, "(unclosed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
