use crate::types::Email;

/// Checks an email against the allowed sign-in domains.
///
/// - Comparison is case-insensitive and exact: `school.edu` does not admit
///   `mail.school.edu`
/// - A leading `@` on a configured domain is ignored
/// - An empty list means no restriction is configured
#[must_use]
pub fn is_allowed_domain(email: &Email, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let domain = email.domain();
    allowed
        .iter()
        .map(|d| normalize_domain(d))
        .any(|d| d.eq_ignore_ascii_case(domain))
}

/// Configured domain with surrounding whitespace and a leading `@` removed.
#[must_use]
pub fn normalize_domain(domain: &str) -> &str {
    domain.trim().trim_start_matches('@').trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        s.parse().unwrap()
    }

    fn domains(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_allowed_domain() {
        let allowed = domains(&["school.edu", "g.school.edu"]);
        assert!(is_allowed_domain(&email("ana@school.edu"), &allowed));
        assert!(is_allowed_domain(&email("ana@G.School.edu"), &allowed));
    }

    #[test]
    fn test_rejected_domain() {
        let allowed = domains(&["school.edu"]);
        assert!(!is_allowed_domain(&email("ana@gmail.com"), &allowed));
        assert!(!is_allowed_domain(&email("ana@mail.school.edu"), &allowed));
        assert!(!is_allowed_domain(&email("ana@school.edu.evil.com"), &allowed));
    }

    #[test]
    fn test_configured_with_at_sign() {
        let allowed = domains(&[" @school.edu "]);
        assert!(is_allowed_domain(&email("ana@school.edu"), &allowed));
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain(" school.edu"), "school.edu");
        assert_eq!(normalize_domain("@school.edu "), "school.edu");
        assert_eq!(normalize_domain("school.edu"), "school.edu");
    }

    #[test]
    fn test_no_restriction() {
        assert!(is_allowed_domain(&email("ana@anywhere.org"), &[]));
    }
}
