//! Account context and URL building for the vendor REST API.
//!
//! This module provides [`AccountContext`], the explicit credential bundle
//! handed over by the authentication layer, and [`UrlBuilder`] which turns
//! endpoint templates into concrete URLs.

use std::fmt;

use crate::cloud::CloudError;
use crate::protocol_constants::DEFAULT_TIER;
use crate::utils::redact;

/// Credentials and identifiers of the signed-in account.
///
/// Produced by the authentication collaborator after login/2FA and passed
/// explicitly to every component that talks to the REST API.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountContext {
    token: String,
    account_id: u64,
    tier: String,
}

impl AccountContext {
    /// Creates a context for the given bearer token and account.
    pub fn new(token: impl Into<String>, account_id: u64) -> Self {
        Self {
            token: token.into(),
            account_id,
            tier: DEFAULT_TIER.to_string(),
        }
    }

    /// Sets the account tier used to select the regional REST host.
    ///
    /// An empty tier falls back to the default.
    #[must_use]
    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        let tier = tier.into();
        if !tier.trim().is_empty() {
            self.tier = tier;
        }
        self
    }

    /// Returns the bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the account identifier.
    #[must_use]
    pub fn account_id(&self) -> u64 {
        self.account_id
    }

    /// Returns the account tier.
    #[must_use]
    pub fn tier(&self) -> &str {
        &self.tier
    }

    /// Checks that a usable token and account id are present.
    ///
    /// # Errors
    ///
    /// Returns [`CloudError::MissingCredentials`] if the token is blank or the
    /// account id is zero.
    pub fn ensure_authenticated(&self) -> Result<(), CloudError> {
        if self.token.trim().is_empty() || self.account_id == 0 {
            return Err(CloudError::MissingCredentials);
        }
        Ok(())
    }
}

impl fmt::Debug for AccountContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountContext")
            .field("token", &redact(&self.token))
            .field("account_id", &self.account_id)
            .field("tier", &self.tier)
            .finish()
    }
}

/// Builder for REST URLs from `{{placeholder}}` templates.
///
/// Account-level placeholders (`tier`, `account_id`) are filled
/// from the [`AccountContext`]; request-level ones are added with
/// [`UrlBuilder::param`].
pub struct UrlBuilder {
    base: String,
    params: Vec<(&'static str, String)>,
}

impl UrlBuilder {
    /// Creates a builder for the given base template and account.
    pub fn new(base: impl Into<String>, account: &AccountContext) -> Self {
        Self {
            base: base.into(),
            params: vec![
                ("tier", account.tier().to_string()),
                ("account_id", account.account_id().to_string()),
            ],
        }
    }

    /// Adds a request-level placeholder value.
    #[must_use]
    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self
    }

    /// Returns the base URL with account placeholders substituted.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.substitute(&self.base)
    }

    /// Returns the full URL for a path template.
    #[must_use]
    pub fn build(&self, path: &str) -> String {
        self.substitute(&format!("{}{}", self.base, path))
    }

    fn substitute(&self, template: &str) -> String {
        let mut url = template.to_string();
        for (key, value) in &self.params {
            url = url.replace(&format!("{{{{{}}}}}", key), value);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol_constants::{COMMAND_STATUS_PATH, REST_BASE_URL};

    #[test]
    fn missing_token_is_rejected() {
        let ctx = AccountContext::new("  ", 12);
        assert!(matches!(
            ctx.ensure_authenticated(),
            Err(CloudError::MissingCredentials)
        ));
    }

    #[test]
    fn missing_account_is_rejected() {
        let ctx = AccountContext::new("token", 0);
        assert!(ctx.ensure_authenticated().is_err());
    }

    #[test]
    fn blank_tier_keeps_default() {
        let ctx = AccountContext::new("token", 1).with_tier("");
        assert_eq!(ctx.tier(), "prod");
    }

    #[test]
    fn debug_output_redacts_token() {
        let ctx = AccountContext::new("super-secret-token", 1);
        let out = format!("{:?}", ctx);
        assert!(!out.contains("super-secret"));
        assert!(out.contains("****oken"));
    }

    #[test]
    fn url_builder_substitutes_account_and_request_params() {
        let ctx = AccountContext::new("token", 77).with_tier("u011");
        let url = UrlBuilder::new(REST_BASE_URL, &ctx)
            .param("network_id", 5)
            .param("command_id", 900)
            .build(COMMAND_STATUS_PATH);
        assert_eq!(
            url,
            "https://rest-u011.immedia-semi.com/network/5/command/900"
        );
    }

    #[test]
    fn url_builder_replaces_every_occurrence() {
        let ctx = AccountContext::new("token", 3);
        let url = UrlBuilder::new("http://host/", &ctx).build("a/{{account_id}}/b/{{account_id}}");
        assert_eq!(url, "http://host/a/3/b/3");
    }
}
