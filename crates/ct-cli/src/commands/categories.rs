//! Categories command for inspecting the configured match order.

use std::io::Write;

use anyhow::{Context, Result};
use ct_core::RuleSet;

use crate::Config;

/// Writes each category followed by its matchers, in match order.
pub fn write_rules<W: Write>(writer: &mut W, rules: &RuleSet) -> Result<()> {
    for (idx, rule) in rules.rules().iter().enumerate() {
        writeln!(writer, "{}. {}", idx + 1, rule.name())?;
        for matcher in rule.matchers() {
            writeln!(writer, "     {matcher}")?;
        }
    }
    writeln!(writer, "{}. (uncategorized)", rules.len() + 1)?;
    writeln!(writer, "     events matching no category above")?;
    Ok(())
}

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let rules = config.rules().context("invalid category configuration")?;
    write_rules(writer, &rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_core::{CategorySpec, Field, MatcherSpec};
    use insta::assert_snapshot;

    #[test]
    fn lists_rules_in_match_order() {
        let config = Config {
            categories: vec![
                CategorySpec::new(
                    "Meetings",
                    vec![
                        MatcherSpec::contains("Standup"),
                        MatcherSpec::regex("retro").ignoring_case(),
                    ],
                ),
                CategorySpec::new(
                    "Reviews",
                    vec![MatcherSpec::contains("PR").on(Field::Description)],
                ),
            ],
            ..Config::default()
        };

        let mut out = Vec::new();
        run(&mut out, &config).unwrap();
        let output = String::from_utf8(out).unwrap();
        assert_snapshot!(output, @r#"
1. Meetings
     summary contains "Standup"
     summary matches /retro/ (ignore case)
2. Reviews
     description contains "PR"
3. (uncategorized)
     events matching no category above
"#);
    }

    #[test]
    fn invalid_rules_are_reported() {
        let config = Config {
            categories: vec![CategorySpec::new("Empty", vec![])],
            ..Config::default()
        };

        let mut out = Vec::new();
        let err = run(&mut out, &config).unwrap_err();
        assert_eq!(err.to_string(), "invalid category configuration");
        assert!(format!("{err:#}").contains("has no matchers"));
    }
}
