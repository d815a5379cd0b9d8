use crate::ports::channels::{ChannelDelegate, DelegateError};
use crate::types::channels::Principal;

use std::collections::HashMap;

/// Named segments captured from a channel template such as
/// `notifications.{id}`.
#[derive(Debug, Default)]
pub struct ChannelParams<'a> {
    values: HashMap<&'a str, &'a str>,
}

impl<'a> ChannelParams<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.values.get(name).copied()
    }
}

pub type RuleCheck = fn(&ChannelParams<'_>, &Principal) -> Result<bool, RuleError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    InvalidParameter(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct ChannelRule {
    pub pattern: &'static str,
    pub check: RuleCheck,
}

/// Static lookup table of channel templates, consulted in order.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<ChannelRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<ChannelRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ChannelRule] {
        &self.rules
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(vec![
            ChannelRule {
                pattern: "notifications.{id}",
                check: owner_only,
            },
            ChannelRule {
                pattern: "users.{id}",
                check: owner_only,
            },
        ])
    }
}

impl ChannelDelegate for RuleTable {
    fn authorize(&self, channel: &str, principal: &Principal) -> Result<bool, DelegateError> {
        for rule in &self.rules {
            let Some(params) = match_pattern(rule.pattern, channel) else {
                continue;
            };
            return (rule.check)(&params, principal).map_err(|err| match err {
                RuleError::InvalidParameter(name) => DelegateError::InvalidParameter {
                    channel: channel.to_string(),
                    name: name.to_string(),
                },
            });
        }
        Err(DelegateError::NoMatchingRule(channel.to_string()))
    }
}

fn owner_only(params: &ChannelParams<'_>, principal: &Principal) -> Result<bool, RuleError> {
    let id = params
        .get("id")
        .and_then(|raw| raw.parse::<u64>().ok())
        .ok_or(RuleError::InvalidParameter("id"))?;
    Ok(principal.user_id() == Some(id))
}

pub(crate) fn match_pattern<'a>(pattern: &'static str, channel: &'a str) -> Option<ChannelParams<'a>> {
    let mut pattern_parts = pattern.split('.');
    let mut channel_parts = channel.split('.');
    let mut params = ChannelParams::default();

    loop {
        match (pattern_parts.next(), channel_parts.next()) {
            (None, None) => return Some(params),
            (Some(expected), Some(actual)) => {
                if let Some(name) = expected
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    if actual.is_empty() {
                        return None;
                    }
                    params.values.insert(name, actual);
                } else if expected != actual {
                    return None;
                }
            }
            _ => return None,
        }
    }
}
