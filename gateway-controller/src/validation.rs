use regex::Regex;
use thiserror::Error;

// DNS-1123 subdomain, the format Gateway API names and domains must satisfy.
const DNS_1123_SUBDOMAIN: &str =
    r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$";

#[derive(Clone, Debug, Error, PartialEq)]
pub enum InvalidControllerName {
    #[error("controller name must take the form <domain>/<namespace>/<name>")]
    MalformedPath,

    #[error("controller name domain must be a DNS subdomain")]
    BadDomain,

    #[error("controller name namespace {0} does not match the controller namespace {1}")]
    ForeignNamespace(String, String),

    #[error("controller name segment must be a DNS subdomain")]
    BadSegment,
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("{0} is not a DNS subdomain")]
pub struct InvalidResourceName(String);

/// Validates the `<domain>/<namespace>/<name>` controller identity; the
/// namespace segment must name the namespace the controller runs in, since
/// cross-namespace controllers are not supported.
pub(crate) fn validate_controller_name(
    value: &str,
    pod_namespace: &str,
) -> Result<(), InvalidControllerName> {
    let mut segments = value.split('/');
    let (domain, namespace, name) = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(domain), Some(namespace), Some(name), None) => (domain, namespace, name),
        _ => return Err(InvalidControllerName::MalformedPath),
    };

    let subdomain = Regex::new(DNS_1123_SUBDOMAIN).expect("should_compile");
    if !subdomain.is_match(domain) {
        return Err(InvalidControllerName::BadDomain);
    }
    if !subdomain.is_match(namespace) || !subdomain.is_match(name) {
        return Err(InvalidControllerName::BadSegment);
    }
    if namespace != pod_namespace {
        return Err(InvalidControllerName::ForeignNamespace(
            namespace.to_string(),
            pod_namespace.to_string(),
        ));
    }

    Ok(())
}

pub(crate) fn validate_resource_name(value: &str) -> Result<(), InvalidResourceName> {
    let subdomain = Regex::new(DNS_1123_SUBDOMAIN).expect("should_compile");
    if value.len() > 253 || !subdomain.is_match(value) {
        return Err(InvalidResourceName(value.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_controller_name() {
        assert!(validate_controller_name("gateway.example.com/test/gateway-controller", "test")
            .is_ok());
    }

    #[test]
    fn controller_name_needs_three_segments() {
        assert_eq!(
            validate_controller_name("gateway.example.com/test", "test"),
            Err(InvalidControllerName::MalformedPath)
        );
        assert_eq!(
            validate_controller_name("gateway.example.com/test/a/b", "test"),
            Err(InvalidControllerName::MalformedPath)
        );
    }

    #[test]
    fn controller_name_rejects_bad_domain() {
        assert_eq!(
            validate_controller_name("Bad_Domain/test/controller", "test"),
            Err(InvalidControllerName::BadDomain)
        );
    }

    #[test]
    fn controller_name_rejects_foreign_namespace() {
        assert_eq!(
            validate_controller_name("gateway.example.com/other/controller", "test"),
            Err(InvalidControllerName::ForeignNamespace(
                "other".to_string(),
                "test".to_string()
            ))
        );
    }

    #[test]
    fn valid_resource_names() {
        assert!(validate_resource_name("nginx").is_ok());
        assert!(validate_resource_name("test-class").is_ok());
        assert!(validate_resource_name("a.b.c").is_ok());
    }

    #[test]
    fn invalid_resource_names() {
        assert!(validate_resource_name("").is_err());
        assert!(validate_resource_name("-leading").is_err());
        assert!(validate_resource_name("trailing-").is_err());
        assert!(validate_resource_name("UpperCase").is_err());
        assert!(validate_resource_name("under_score").is_err());
    }
}
