//! Competitor identity resolution.
//!
//! Free-text competitor entries arrive as a bare name, a bare domain, or
//! "Name, domain.com". Everything downstream (cache keys, dedup, report
//! filtering) compares competitors by canonical key only.

use std::collections::HashSet;

use crate::types::CompetitorIdentity;

/// A parsed competitor line before canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitorLine {
    pub name: String,
    pub domain: Option<String>,
}

/// Parse one competitor line. Extracts an optional domain via a `label.tld`
/// match and derives a display name from the domain (title-cased host label)
/// when no explicit name precedes it. Returns None for blank lines.
pub fn parse_line(line: &str) -> Option<CompetitorLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let domain_re =
        regex::Regex::new(r"(?i)(?:[a-z0-9][a-z0-9-]*\.)+[a-z]{2,}").expect("valid regex");
    let found = domain_re.find(trimmed);
    let domain = found.map(|m| normalize_domain(m.as_str()));

    let prefix = match found {
        Some(m) => &trimmed[..m.start()],
        None => trimmed,
    };
    let mut name = prefix.trim();
    for scheme in ["https://", "http://"] {
        if let Some(stripped) = name.strip_suffix(scheme) {
            name = stripped;
        }
    }
    let name = name.trim().trim_end_matches([',', ';']).trim();

    let name = if name.is_empty() {
        match &domain {
            Some(d) => title_case_label(d),
            None => return None,
        }
    } else {
        name.to_string()
    };

    Some(CompetitorLine { name, domain })
}

/// Reduce a free-text competitor entry to a stable canonical key.
///
/// Pure and idempotent. `"OpenAI"`, `"openai.com"`, and
/// `"OpenAI, openai.com"` all canonicalize to `"openai"`. A punctuation-only
/// entry yields an empty key; callers drop those from the working set.
pub fn canonicalize(raw: &str) -> String {
    let Some(line) = parse_line(raw) else {
        return String::new();
    };
    let target = line.domain.unwrap_or(line.name);

    let mut key = target.to_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = key.strip_prefix(scheme) {
            key = rest.to_string();
        }
    }
    if let Some(rest) = key.strip_prefix("www.") {
        key = rest.to_string();
    }
    // First path segment only
    if let Some(segment) = key.split('/').next() {
        key = segment.to_string();
    }
    // For a domain, the host label before the first dot is the identity
    if looks_like_domain(&key) {
        if let Some(label) = key.split('.').next() {
            key = label.to_string();
        }
    }
    key.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Parse, canonicalize, and merge a newline-separated competitor list.
/// Duplicates under canonicalization collapse to the first-seen display
/// name/domain pair; entries with an empty canonical key are dropped.
pub fn dedup_competitors(raw: &str) -> Vec<CompetitorIdentity> {
    let mut seen = HashSet::new();
    let mut identities = Vec::new();

    for line in raw.lines() {
        let Some(parsed) = parse_line(line) else {
            continue;
        };
        let key = canonicalize(line);
        if key.is_empty() {
            continue;
        }
        if seen.insert(key.clone()) {
            identities.push(CompetitorIdentity {
                display_name: parsed.name,
                domain: parsed.domain,
                canonical_key: key,
            });
        }
    }

    identities
}

/// Fill in missing domains from a newline-separated URL list. A URL whose
/// canonical key matches an identity that has no domain yet contributes its
/// host as that identity's domain. Existing domains are never overwritten.
pub fn attach_domains(identities: &mut [CompetitorIdentity], urls: &str) {
    for line in urls.lines() {
        let Some(parsed) = parse_line(line) else {
            continue;
        };
        let Some(domain) = parsed.domain else {
            continue;
        };
        let key = canonicalize(line);
        if key.is_empty() {
            continue;
        }
        for identity in identities.iter_mut() {
            if identity.canonical_key == key && identity.domain.is_none() {
                identity.domain = Some(domain.clone());
            }
        }
    }
}

fn normalize_domain(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let host = lower.strip_prefix("www.").unwrap_or(&lower);
    host.trim_end_matches('.').to_string()
}

fn looks_like_domain(s: &str) -> bool {
    let domain_re =
        regex::Regex::new(r"^(?i)(?:[a-z0-9][a-z0-9-]*\.)+[a-z]{2,}$").expect("valid regex");
    domain_re.is_match(s)
}

/// Title-case the host label before the first dot: "openai.com" → "Openai".
fn title_case_label(domain: &str) -> String {
    let label = domain.split('.').next().unwrap_or(domain);
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_name_domain_pair_agree() {
        assert_eq!(canonicalize("OpenAI"), "openai");
        assert_eq!(canonicalize("openai.com"), "openai");
        assert_eq!(canonicalize("OpenAI, openai.com"), "openai");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        for input in ["OpenAI", "openai.com", "https://www.openai.com/about", "Acme Corp"] {
            let once = canonicalize(input);
            assert_eq!(canonicalize(&once), once, "not idempotent for {input}");
        }
    }

    #[test]
    fn canonicalize_strips_protocol_and_path() {
        assert_eq!(canonicalize("https://www.openai.com/pricing"), "openai");
        assert_eq!(canonicalize("http://stripe.com"), "stripe");
    }

    #[test]
    fn canonicalize_punctuation_only_is_empty() {
        assert_eq!(canonicalize("***"), "");
        assert_eq!(canonicalize("- , -"), "");
    }

    #[test]
    fn parse_line_extracts_domain_and_name() {
        let parsed = parse_line("Anthropic, anthropic.com").unwrap();
        assert_eq!(parsed.name, "Anthropic");
        assert_eq!(parsed.domain.as_deref(), Some("anthropic.com"));
    }

    #[test]
    fn parse_line_titlecases_bare_domain() {
        let parsed = parse_line("stripe.com").unwrap();
        assert_eq!(parsed.name, "Stripe");
        assert_eq!(parsed.domain.as_deref(), Some("stripe.com"));
    }

    #[test]
    fn parse_line_strips_url_scaffolding() {
        let parsed = parse_line("OpenAI, https://www.openai.com").unwrap();
        assert_eq!(parsed.name, "OpenAI");
        assert_eq!(parsed.domain.as_deref(), Some("openai.com"));
    }

    #[test]
    fn parse_line_blank_is_none() {
        assert!(parse_line("   ").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn dedup_keeps_first_seen_display_form() {
        let identities = dedup_competitors("OpenAI\nopenai.com\nOpenai");
        assert_eq!(identities.len(), 1);
        assert_eq!(identities[0].display_name, "OpenAI");
        assert_eq!(identities[0].canonical_key, "openai");
        // First-seen pair had no domain; later variants do not backfill it
        assert!(identities[0].domain.is_none());
    }

    #[test]
    fn dedup_drops_empty_keys() {
        let identities = dedup_competitors("Acme\n***\n\nStripe, stripe.com");
        assert_eq!(identities.len(), 2);
        assert_eq!(identities[0].canonical_key, "acme");
        assert_eq!(identities[1].canonical_key, "stripe");
    }

    #[test]
    fn attach_domains_fills_missing_only() {
        let mut identities = dedup_competitors("OpenAI\nStripe, stripe.com");
        attach_domains(&mut identities, "https://openai.com\nhttps://stripe.dev");
        assert_eq!(identities[0].domain.as_deref(), Some("openai.com"));
        // Existing domain untouched even though stripe.dev shares the key
        assert_eq!(identities[1].domain.as_deref(), Some("stripe.com"));
    }
}
