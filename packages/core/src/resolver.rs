//! Path-based tenant resolution.
//!
//! Extracts a leading numeric tenant segment from a raw request path and
//! splits it from the routable remainder. Resolution is pure and total:
//! absence of a tenant segment is a first-class "untenanted" outcome, not an
//! error. The resolver never touches the tenant directory; turning a
//! candidate id into a [`TenantRecord`](crate::tenant::TenantRecord) is the
//! request pipeline's job.

use regex::Regex;

use crate::tenant::TenantId;

/// Default minimum digit count for a tenant segment.
pub const DEFAULT_MIN_TENANT_DIGITS: u32 = 7;

/// Policy for recognizing a tenant segment in a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Minimum number of leading digits required to treat a path segment as
    /// a tenant identifier. Shorter digit runs are routed untenanted.
    pub min_digits: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_digits: DEFAULT_MIN_TENANT_DIGITS,
        }
    }
}

/// Rejected resolver configurations.
///
/// Surfaced when the resolver is built, so an ambiguous or degenerate
/// pattern can never reach runtime.
#[derive(Debug, thiserror::Error)]
pub enum ResolverConfigError {
    /// A zero minimum would match every path, making the tenant segment
    /// pattern ambiguous with ordinary routes.
    #[error("minimum tenant digit count must be at least 1")]
    ZeroMinDigits,
    /// The derived segment pattern failed to compile.
    #[error("tenant segment pattern is invalid")]
    Pattern(#[from] regex::Error),
}

/// Outcome of resolving a raw request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolution {
    /// Candidate external tenant id, or `None` for an untenanted request.
    pub tenant_id: Option<TenantId>,
    /// The matched segment including its leading separator (e.g.
    /// `"/1234567"`), or empty when untenanted.
    pub mount_prefix: String,
    /// The routable remainder. `"/"` when the tenant segment consumed the
    /// whole path; the original path unchanged when untenanted.
    pub remaining_path: String,
}

impl PathResolution {
    fn untenanted(path: &str) -> Self {
        Self {
            tenant_id: None,
            mount_prefix: String::new(),
            remaining_path: if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            },
        }
    }
}

/// Recognizes tenant segments at the start of request paths.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    pattern: Regex,
}

impl TenantResolver {
    /// Builds a resolver from the given policy.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverConfigError`] for degenerate configurations
    /// (`min_digits == 0`) or an uncompilable pattern.
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolverConfigError> {
        if config.min_digits == 0 {
            return Err(ResolverConfigError::ZeroMinDigits);
        }
        // Anchored: a leading digit run of at least min_digits, terminated
        // by `/` or end-of-string.
        let pattern = Regex::new(&format!(r"^/([0-9]{{{},}})(?:/|$)", config.min_digits))?;
        Ok(Self { pattern })
    }

    /// Builds a resolver with the default policy.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverConfigError`] if the default pattern fails to
    /// compile.
    pub fn with_defaults() -> Result<Self, ResolverConfigError> {
        Self::new(&ResolverConfig::default())
    }

    /// Splits `raw_path` into a candidate tenant id and the routable
    /// remainder.
    ///
    /// Total: every input yields a [`PathResolution`]. A digit run that does
    /// not fit the id type is treated as an ordinary (untenanted) segment.
    #[must_use]
    pub fn resolve(&self, raw_path: &str) -> PathResolution {
        let Some(captures) = self.pattern.captures(raw_path) else {
            return PathResolution::untenanted(raw_path);
        };
        // Capture group 1 is guaranteed present when the pattern matches.
        let Some(digits) = captures.get(1) else {
            return PathResolution::untenanted(raw_path);
        };
        let Ok(raw_id) = digits.as_str().parse::<u64>() else {
            return PathResolution::untenanted(raw_path);
        };

        let prefix_len = 1 + digits.as_str().len();
        let remainder = &raw_path[prefix_len..];
        PathResolution {
            tenant_id: Some(TenantId::new(raw_id)),
            mount_prefix: raw_path[..prefix_len].to_string(),
            remaining_path: if remainder.is_empty() {
                "/".to_string()
            } else {
                remainder.to_string()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn resolver() -> TenantResolver {
        TenantResolver::with_defaults().unwrap()
    }

    #[test]
    fn extracts_leading_tenant_segment() {
        let resolution = resolver().resolve("/1234567/boards/9");
        assert_eq!(resolution.tenant_id, Some(TenantId::new(1_234_567)));
        assert_eq!(resolution.mount_prefix, "/1234567");
        assert_eq!(resolution.remaining_path, "/boards/9");
    }

    #[test]
    fn tenant_segment_alone_leaves_root_remainder() {
        let resolution = resolver().resolve("/1234567");
        assert_eq!(resolution.tenant_id, Some(TenantId::new(1_234_567)));
        assert_eq!(resolution.mount_prefix, "/1234567");
        assert_eq!(resolution.remaining_path, "/");
    }

    #[test]
    fn non_numeric_path_is_untenanted_and_unchanged() {
        let resolution = resolver().resolve("/boards/9");
        assert_eq!(resolution.tenant_id, None);
        assert_eq!(resolution.mount_prefix, "");
        assert_eq!(resolution.remaining_path, "/boards/9");
    }

    #[test]
    fn short_digit_run_is_untenanted() {
        // Six digits, below the default minimum of seven.
        let resolution = resolver().resolve("/123456/boards");
        assert_eq!(resolution.tenant_id, None);
        assert_eq!(resolution.remaining_path, "/123456/boards");
    }

    #[test]
    fn digits_followed_by_non_separator_are_untenanted() {
        let resolution = resolver().resolve("/1234567abc");
        assert_eq!(resolution.tenant_id, None);
        assert_eq!(resolution.remaining_path, "/1234567abc");
    }

    #[test]
    fn root_and_empty_paths_are_untenanted_root() {
        for raw in ["/", ""] {
            let resolution = resolver().resolve(raw);
            assert_eq!(resolution.tenant_id, None);
            assert_eq!(resolution.remaining_path, "/");
        }
    }

    #[test]
    fn digit_run_overflowing_id_type_is_untenanted() {
        // 21 digits cannot fit in u64; resolve stays total.
        let raw = "/123456789012345678901/x";
        let resolution = resolver().resolve(raw);
        assert_eq!(resolution.tenant_id, None);
        assert_eq!(resolution.remaining_path, raw);
    }

    #[test]
    fn custom_minimum_digit_policy() {
        let resolver = TenantResolver::new(&ResolverConfig { min_digits: 3 }).unwrap();
        let resolution = resolver.resolve("/123/x");
        assert_eq!(resolution.tenant_id, Some(TenantId::new(123)));
        assert_eq!(resolution.remaining_path, "/x");
    }

    #[test]
    fn zero_minimum_is_rejected_at_construction() {
        let err = TenantResolver::new(&ResolverConfig { min_digits: 0 }).unwrap_err();
        assert!(matches!(err, ResolverConfigError::ZeroMinDigits));
    }

    proptest! {
        #[test]
        fn extracts_exactly_the_leading_digit_run(
            id in 1_000_000u64..=999_999_999_999u64,
            rest in "(/[a-z0-9]{1,8}){0,4}",
        ) {
            let raw = format!("/{id}{rest}");
            let resolution = resolver().resolve(&raw);

            prop_assert_eq!(resolution.tenant_id, Some(TenantId::new(id)));
            prop_assert_eq!(resolution.mount_prefix, format!("/{id}"));
            let expected_rest = if rest.is_empty() { "/".to_string() } else { rest };
            prop_assert_eq!(resolution.remaining_path, expected_rest);
        }

        #[test]
        fn untenanted_paths_pass_through_unchanged(
            head in "[a-z][a-z0-9]{0,8}",
            rest in "(/[a-z0-9]{1,8}){0,3}",
        ) {
            let raw = format!("/{head}{rest}");
            let resolution = resolver().resolve(&raw);

            prop_assert_eq!(resolution.tenant_id, None);
            prop_assert_eq!(resolution.remaining_path, raw);
        }
    }
}
