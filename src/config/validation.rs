use crate::config::types::{ComponentsConfig, Config, OutputConfig, UserAgentConfig};
use crate::scheduler::RequestArgs;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_first_url(&config.first_url)?;
    validate_request_args(&config.request)?;
    config
        .data
        .check()
        .map_err(|e| ConfigError::Validation(format!("[data]: {}", e)))?;
    validate_components(&config.components)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// The first URL must be an absolute HTTP(S) URL with a host
pub fn validate_first_url(first_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(first_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid first-url '{}': {}", first_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "first-url '{}' must use the HTTP or HTTPS scheme",
            first_url
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "first-url '{}' has no host",
            first_url
        )));
    }

    Ok(())
}

/// Validates frontier parameters
fn validate_request_args(args: &RequestArgs) -> Result<(), ConfigError> {
    let domains = args.accepted_domains.as_ref().ok_or_else(|| {
        ConfigError::Validation("accepted-domains must be present (it may be empty)".to_string())
    })?;

    for domain in domains {
        validate_domain_string(domain)?;
    }

    Ok(())
}

/// Validates component counts
fn validate_components(config: &ComponentsConfig) -> Result<(), ConfigError> {
    for (name, number) in [
        ("downloaders", config.downloaders),
        ("analyzers", config.analyzers),
        ("pipelines", config.pipelines),
    ] {
        if number < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, number
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates an accepted primary domain
pub fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::Validation(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    // Must contain at least one dot (e.g., example.com, not just "example")
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact-email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Email domain must contain a dot: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_first_url() {
        assert!(validate_first_url("http://example.com/").is_ok());
        assert!(validate_first_url("https://127.0.0.1:8080/index.html").is_ok());

        assert!(matches!(
            validate_first_url("not a url"),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_first_url("ftp://example.com/"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_request_args() {
        let args = RequestArgs {
            accepted_domains: Some(vec!["example.com".to_string()]),
            max_depth: 1,
        };
        assert!(validate_request_args(&args).is_ok());

        let args = RequestArgs {
            accepted_domains: None,
            max_depth: 1,
        };
        assert!(validate_request_args(&args).is_err());

        let args = RequestArgs {
            accepted_domains: Some(vec!["example".to_string()]),
            max_depth: 1,
        };
        assert!(validate_request_args(&args).is_err());
    }

    #[test]
    fn test_validate_components() {
        assert!(validate_components(&ComponentsConfig::default()).is_ok());
        assert!(validate_components(&ComponentsConfig {
            analyzers: 0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_validate_domain_string() {
        assert!(validate_domain_string("example.com").is_ok());
        assert!(validate_domain_string("sub.example.com").is_ok());
        assert!(validate_domain_string("127.0.0.1").is_ok());

        assert!(validate_domain_string("").is_err());
        assert!(validate_domain_string("example").is_err());
        assert!(validate_domain_string(".example.com").is_err());
        assert!(validate_domain_string("example.com.").is_err());
        assert!(validate_domain_string("exa mple.com").is_err());
        assert!(validate_domain_string("example..com").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }
}
