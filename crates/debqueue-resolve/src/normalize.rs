//! Package family normalization.
//!
//! Kernel packages carry their flavor and build number in the name
//! (`kernel5-generic-123`). All of them share one recipe, so the name is
//! collapsed to its family (`kernel5`) before anything else looks at it.
//! The accepted shape is `kernel<digits>[-acl]-<lowercase>-<digits>...`.

const KERNEL_PREFIX: &str = "kernel";
const ACL_SUFFIX: &str = "-acl";

/// Returns the canonical family identifier for a raw package name.
///
/// Names outside the kernel pattern are returned unchanged. Applying the
/// function to its own output is a no-op.
#[must_use]
pub fn family_name(raw: &str) -> &str {
    kernel_family_len(raw).map_or(raw, |len| &raw[..len])
}

/// Length of the family prefix if `raw` is a versioned kernel name.
fn kernel_family_len(raw: &str) -> Option<usize> {
    let rest = raw.strip_prefix(KERNEL_PREFIX)?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let base = KERNEL_PREFIX.len() + digits;
    let tail = &raw[base..];

    if let Some(after_acl) = tail.strip_prefix(ACL_SUFFIX) {
        if is_flavor_and_build(after_acl) {
            return Some(base + ACL_SUFFIX.len());
        }
    }
    is_flavor_and_build(tail).then_some(base)
}

/// Matches `-<lowercase letters>-<digit>` at the start of `s`.
fn is_flavor_and_build(s: &str) -> bool {
    let Some(s) = s.strip_prefix('-') else {
        return false;
    };
    let letters = s.bytes().take_while(u8::is_ascii_lowercase).count();
    if letters == 0 {
        return false;
    }
    s[letters..]
        .strip_prefix('-')
        .is_some_and(|build| build.starts_with(|c: char| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_flavored_kernel() {
        assert_eq!(family_name("kernel5-generic-123"), "kernel5");
        assert_eq!(family_name("kernel10-lowlatency-42-extra"), "kernel10");
    }

    #[test]
    fn keeps_acl_variant() {
        assert_eq!(family_name("kernel5-acl-generic-1"), "kernel5-acl");
    }

    #[test]
    fn acl_as_flavor_falls_back_to_plain_family() {
        assert_eq!(family_name("kernel5-acl-12"), "kernel5");
    }

    #[test]
    fn leaves_other_names_alone() {
        for name in [
            "libfoo",
            "kernel5",
            "kernel-generic-1",
            "kernel5-generic",
            "kernel5-Generic-1",
            "kernel5-generic-x",
            "mykernel5-generic-1",
        ] {
            assert_eq!(family_name(name), name);
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        for name in ["kernel5-generic-123", "kernel5-acl-generic-1", "app"] {
            let once = family_name(name);
            assert_eq!(family_name(once), once);
        }
    }
}
