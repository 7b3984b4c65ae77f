//! Transactional email templates. Rendering only; delivery belongs to the
//! email provider.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    Welcome,
    AccountApproved,
    AccountRejected,
    NewComment,
}

impl EmailTemplate {
    fn source(self) -> (&'static str, &'static str) {
        match self {
            EmailTemplate::Welcome => (
                "Welcome to UniShorts, {{username}}",
                "Hi {{username}},\n\nThanks for signing up. Your account is waiting for approval by a moderator; we will email you once it is reviewed.\n\nUniShorts",
            ),
            EmailTemplate::AccountApproved => (
                "Your UniShorts account is approved",
                "Hi {{username}},\n\nYour account has been approved. You can now upload films at {{app_url}}.\n\nUniShorts",
            ),
            EmailTemplate::AccountRejected => (
                "Your UniShorts account was not approved",
                "Hi {{username}},\n\nYour account request was not approved.\nReason: {{reason}}\n\nUniShorts",
            ),
            EmailTemplate::NewComment => (
                "New comment on {{film_title}}",
                "Hi {{username}},\n\n{{commenter}} commented on \"{{film_title}}\":\n\n{{comment}}\n\nReply at {{film_url}}\n\nUniShorts",
            ),
        }
    }

    /// Placeholder names used by subject and body.
    pub fn variables(self) -> BTreeSet<&'static str> {
        let (subject, body) = self.source();
        PLACEHOLDER
            .captures_iter(subject)
            .chain(PLACEHOLDER.captures_iter(body))
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub fn render(template: EmailTemplate, to: &str, vars: &HashMap<String, String>) -> AppResult<RenderedEmail> {
    let to = to.trim();
    if !looks_like_address(to) {
        return Err(AppError::user("invalid_recipient", format!("not an email address: {:?}", to)));
    }
    let missing: Vec<&str> = template.variables().into_iter().filter(|v| !vars.contains_key(*v)).collect();
    if !missing.is_empty() {
        return Err(AppError::user("missing_template_vars", format!("missing: {}", missing.join(", "))));
    }
    let (subject, body) = template.source();
    Ok(RenderedEmail { to: to.to_string(), subject: fill(subject, vars), body: fill(body, vars) })
}

fn fill(text: &str, vars: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |c: &Captures| vars.get(&c[1]).cloned().unwrap_or_default())
        .into_owned()
}

fn looks_like_address(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') && !s.contains(char::is_whitespace),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn renders_subject_and_body() {
        let out = render(
            EmailTemplate::NewComment,
            "ana@uni.edu",
            &vars(&[("username", "ana"), ("commenter", "ben"), ("film_title", "Dusk"), ("comment", "loved it"), ("film_url", "https://x/film/1")]),
        ).unwrap();
        assert_eq!(out.subject, "New comment on Dusk");
        assert!(out.body.contains("ben commented on \"Dusk\""));
        assert!(out.body.contains("Reply at https://x/film/1"));
    }

    #[test]
    fn lists_missing_variables() {
        let err = render(EmailTemplate::AccountRejected, "ana@uni.edu", &vars(&[("username", "ana")])).unwrap_err();
        assert_eq!(err.code_str(), "missing_template_vars");
        assert!(err.message().contains("reason"));
    }

    #[test]
    fn rejects_bad_recipient() {
        for to in ["", "nobody", "a@b", "@uni.edu", "a b@uni.edu"] {
            let err = render(EmailTemplate::Welcome, to, &vars(&[("username", "x")])).unwrap_err();
            assert_eq!(err.code_str(), "invalid_recipient", "{to}");
        }
    }

    #[test]
    fn variables_are_discovered() {
        assert_eq!(EmailTemplate::AccountApproved.variables().into_iter().collect::<Vec<_>>(), vec!["app_url", "username"]);
    }
}
